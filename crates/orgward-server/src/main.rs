//! Orgward server entry point: configuration, database startup,
//! migrations, and reference-data seeding.

use orgward_db::{run_migrations, seed_reference_data, DbConfig, DbManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("orgward=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting Orgward server...");

    let config = DbConfig::from_env();
    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Database connection failed");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Migrations failed");
        std::process::exit(1);
    }
    if let Err(e) = seed_reference_data(manager.client()).await {
        tracing::error!(error = %e, "Reference-data seeding failed");
        std::process::exit(1);
    }

    tracing::info!("Orgward server ready");

    // TODO: mount the HTTP router once the transport layer lands.

    tracing::info!("Orgward server stopped.");
}
