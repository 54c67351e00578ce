use anyhow::Context;
use campusrelay::{AppState, config::{self, Config}, db, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    config::init_tracing(config.log_json);

    let db_pool = db::connect(&config.database_url, 16)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    let app = router(AppState::new(db_pool, &config));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    tracing::info!(address = %config.bind_address, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
