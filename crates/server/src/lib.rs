pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod settings;
pub mod state;

pub use config::{Config, Environment};
pub use db::create_pool;
pub use error::{AppError, AppResult};
pub use repositories::SubscriptionStore;
pub use settings::{Settings, SettingsError};
pub use state::AppState;

/// Run the monitor until interrupted.
pub async fn run(env: Environment, data_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new(env, data_path);

    // Ensure data directory exists
    std::fs::create_dir_all(&config.data_path)?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    let settings = Settings::load_or_create(&config.settings_path()).await?;
    let state = AppState::new(pool, config, settings).await?;

    state.start_monitor();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down, waiting for the running tick (Ctrl-C again to force)");

    tokio::select! {
        _ = state.scheduler.shutdown_and_wait(false) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Forced shutdown");
        }
    }

    Ok(())
}
