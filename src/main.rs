#![allow(clippy::result_large_err)]

use dotenvy::dotenv;
use office_key_tracker::{
    config::{app::load_app_configuration, database},
    context::AppContext,
    core::{employee, scheduler},
    errors::Result,
    notify::{DisabledNotifier, EmailNotifier, SharedNotifier},
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the background heartbeat runs when no requests arrive.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = load_app_configuration()?;
    let timezone = app_config.timezone()?;
    info!(%timezone, "Successfully processed application configuration.");

    // 4. Initialize database
    let db = database::create_connection(&app_config.database_url()).await?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Register configured employees that are not yet known
    for seed in &app_config.employees {
        employee::ensure_employee(&db, &seed.name, seed.has_key).await?;
    }
    info!(count = app_config.employees.len(), "Employees seeded.");

    // 6. Pick the notifier
    let notifier: SharedNotifier =
        if app_config.email.is_complete() && !app_config.recipients.is_empty() {
            Arc::new(EmailNotifier::new(&app_config.email, &app_config.recipients)?)
        } else {
            warn!("Email is not fully configured; alerts will not be delivered.");
            Arc::new(DisabledNotifier)
        };

    let ctx = AppContext::with_system_clock(db, notifier, timezone);

    // 7. Keep the monthly jobs current until shutdown
    let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = scheduler::run_heartbeat(&ctx).await;
                if let Some(populate) = &result.populate {
                    info!(key = %populate.key, inserted = populate.inserted_count(), "Populate ran.");
                }
                if let Some(cleanup) = &result.cleanup {
                    info!(key = %cleanup.key, deleted = cleanup.deleted, "Cleanup ran.");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    Ok(())
}
