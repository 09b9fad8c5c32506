//! filedepot エントリポイント

use anyhow::Context;
use filedepot::{config::Config, db, logging, server, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let config = Config::from_env();
    info!("Starting filedepot");

    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to open database")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    std::fs::create_dir_all(&config.storage.root).with_context(|| {
        format!(
            "Failed to create uploads directory {}",
            config.storage.root.display()
        )
    })?;
    std::fs::create_dir_all(&config.storage.temp_root).with_context(|| {
        format!(
            "Failed to create temp directory {}",
            config.storage.temp_root.display()
        )
    })?;

    let state = AppState::new(pool, config.storage.clone(), config.limits);
    server::run(state, &config.bind_addr).await
}
