use anyhow::Result;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use common::kv::{RedisConfig, RedisPool};
use directory::routes;
use directory::state::{AppState, ServerConfig};
use directory::store::RedisRepository;
use directory::token::{TokenConfig, TokenService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting directory service");

    let server_config = ServerConfig::from_env()?;

    // Initialize the redis-backed document store
    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config).await?;
    if redis_pool.health_check().await? {
        info!("Redis connection successful");
    } else {
        anyhow::bail!("Failed to connect to redis");
    }

    // The signing secret is process-wide configuration injected once here,
    // never runtime-mutable state
    let token_config = TokenConfig::from_env()?;
    let tokens = TokenService::new(&token_config);

    let app_state = AppState {
        repository: Arc::new(RedisRepository::new(redis_pool)),
        tokens,
        allow_anonymous: server_config.allow_anonymous,
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind_addr).await?;
    info!(
        "Directory service listening on {}",
        server_config.bind_addr
    );

    axum::serve(listener, app).await?;

    Ok(())
}
