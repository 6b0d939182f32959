//! Tillpoint provisioning tool.
//!
//! Connects to the database, applies migrations, and seeds the built-in
//! permission catalog. Run once per deployment; every step is idempotent.

use tracing_subscriber::{EnvFilter, fmt};

use tillpoint_core::config::AppConfig;
use tillpoint_core::error::AppError;
use tillpoint_database::repositories::CatalogRepository;
use tillpoint_policy::CatalogSeeder;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Provisioning failed: {e}");
        std::process::exit(1);
    }
}

/// Load configuration from file and environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("TILLPOINT_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Tillpoint provision v{}", env!("CARGO_PKG_VERSION"));

    let pool = tillpoint_database::connection::create_pool(&config.database).await?;

    tillpoint_database::migration::run_migrations(&pool).await?;

    let seeder = CatalogSeeder::new(CatalogRepository::new(pool.clone()));
    let summary = seeder.seed().await?;
    tracing::info!(
        modules = summary.modules,
        actions = summary.actions,
        edges = summary.edges,
        "Catalog seeding complete"
    );

    if config.policy.purge_expired_on_provision {
        let repo =
            tillpoint_database::repositories::IndividualPermissionRepository::new(pool.clone());
        let purged = repo.purge_expired(chrono::Utc::now()).await?;
        tracing::info!(purged, "Purged expired individual permissions");
    }

    pool.close().await;
    Ok(())
}
