//! Application configuration loaded from `config.toml`.
//!
//! The file names the office timezone, the employees to register on first run, the
//! notification recipients and the SMTP settings. SMTP settings may be overridden from
//! the environment (`SMTP_HOST`, `SMTP_PORT`, `SMTP_USER`, `SMTP_PASSWORD`,
//! `FROM_EMAIL`, `FROM_NAME`) so secrets can stay out of the file.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Top-level structure of `config.toml`
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// IANA timezone the office observes, used to resolve "today"
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Optional database URL; `DATABASE_URL` takes precedence
    #[serde(default)]
    pub database_url: Option<String>,
    /// Employees registered at startup if missing
    #[serde(default)]
    pub employees: Vec<EmployeeConfig>,
    /// Who receives alerts and follow-ups
    #[serde(default)]
    pub recipients: Vec<RecipientConfig>,
    /// Outgoing mail settings
    #[serde(default)]
    pub email: EmailConfig,
}

/// An employee to seed into the registry
#[derive(Debug, Deserialize, Clone)]
pub struct EmployeeConfig {
    /// Employee name, case-sensitive
    pub name: String,
    /// Initial key flag; ignored once the employee exists
    #[serde(default)]
    pub has_key: bool,
}

/// A notification recipient
#[derive(Debug, Deserialize, Clone)]
pub struct RecipientConfig {
    /// Destination address
    pub email: String,
    /// Optional display name
    #[serde(default)]
    pub name: Option<String>,
}

/// SMTP settings
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// STARTTLS when true, implicit TLS when false
    pub use_tls: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_email: String::new(),
            from_name: "Office Key Tracker".to_string(),
            use_tls: true,
        }
    }
}

impl EmailConfig {
    /// Whether enough is configured to attempt delivery.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.smtp_host.is_empty()
            && !self.smtp_user.is_empty()
            && !self.smtp_password.is_empty()
            && !self.from_email.is_empty()
    }
}

fn default_timezone() -> String {
    "Europe/London".to_string()
}

impl AppConfig {
    /// The configured timezone.
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| Error::Config {
            message: format!("Unknown timezone '{}': {e}", self.timezone),
        })
    }

    /// Database URL from `DATABASE_URL`, then the config file, then the default.
    #[must_use]
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .ok()
            .or_else(|| self.database_url.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
    }

    /// Applies SMTP overrides using `lookup` to read variables.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let email = &mut self.email;
        if let Some(host) = lookup("SMTP_HOST") {
            email.smtp_host = host;
        }
        if let Some(port) = lookup("SMTP_PORT") {
            email.smtp_port = port.parse().map_err(|e| Error::Config {
                message: format!("Invalid SMTP_PORT '{port}': {e}"),
            })?;
        }
        if let Some(user) = lookup("SMTP_USER") {
            email.smtp_user = user;
        }
        if let Some(password) = lookup("SMTP_PASSWORD") {
            email.smtp_password = password;
        }
        if let Some(from_email) = lookup("FROM_EMAIL") {
            email.from_email = from_email;
        }
        if let Some(from_name) = lookup("FROM_NAME") {
            email.from_name = from_name;
        }
        Ok(())
    }

    /// Applies SMTP overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads `config.toml` (or the file named by `CONFIG_PATH`) and applies environment
/// overrides.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = load_config(&path)?;
    config.apply_env_overrides()?;
    config.timezone()?;
    info!(
        "Loaded configuration from {} ({} employees, {} recipients)",
        path,
        config.employees.len(),
        config.recipients.len()
    );
    Ok(config)
}
