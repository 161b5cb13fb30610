mod api;
mod background;
mod db;
mod identity;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tally_compute::{Engine, SchedulerConfig};
use tally_storage::{ExpressionStore, MemoryStore, PgStore, UserStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::identity::JwtIdentity;
use crate::state::AppState;

fn load_config() -> tally_core::Config {
    tally_core::config::load_dotenv();
    tally_core::Config::from_env()
}

/// One backend serves both ports.
fn split_store<S>(store: Arc<S>) -> (Arc<dyn ExpressionStore>, Arc<dyn UserStore>)
where
    S: ExpressionStore + UserStore + 'static,
{
    (store.clone(), store)
}

async fn serve(config: &tally_core::Config) -> anyhow::Result<()> {
    let (expressions, users) = match db::init_pg_pool(&config.postgres).await {
        Some(pool) => split_store(Arc::new(PgStore::new(pool))),
        None => split_store(Arc::new(MemoryStore::new())),
    };

    let engine = Arc::new(Engine::new(SchedulerConfig::from_core(
        &config.operations,
        &config.scheduler,
    )));

    background::spawn_lease_reaper(
        engine.clone(),
        Duration::from_secs(config.scheduler.lease_reap_interval_secs),
    );
    background::spawn_queue_logger(
        engine.clone(),
        Duration::from_secs(config.scheduler.queue_log_interval_secs),
    );

    let state = Arc::new(AppState {
        engine,
        expressions,
        users,
        identity: Arc::new(JwtIdentity::new(&config.auth.jwt_secret, config.auth.token_ttl_hours)),
        password_cost: config.auth.password_cost,
    });
    let app = router::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    info!("API docs at http://localhost:{}/docs", config.server.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("server error")?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    config.validate().context("invalid configuration")?;
    config.log_summary();

    serve(&config).await
}
