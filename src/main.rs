//! Chat relay server entry point.
//!
//! Wires the production adapters together: Redis for the session store and
//! event queue, PostgreSQL for the permissions backend, axum for the
//! WebSocket transport. A missing or unreachable queue is fatal; a database
//! that is down at boot is not (the pool connects lazily and failed access
//! checks deny joins until it recovers).

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use chat_relay::adapters::access::PostgresAccessChecker;
use chat_relay::adapters::http::{self, RelayState};
use chat_relay::adapters::queue::RedisEventQueue;
use chat_relay::adapters::session::RedisSessionResolver;
use chat_relay::application::ChatRelay;
use chat_relay::config::AppConfig;
use chat_relay::ports::{EventQueue, SessionError};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("chat-relay failed to start: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Permissions backend. The pool is lazy: an unreachable database logs
    // per failed access check (joins deny) instead of blocking startup.
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .connect_lazy(&config.database.url)?;
    let access = Arc::new(PostgresAccessChecker::new(pool));

    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let session_conn = tokio::time::timeout(
        config.redis.timeout(),
        redis_client.get_multiplexed_async_connection(),
    )
    .await
    .map_err(|_| SessionError::Store("timed out connecting to Redis".to_string()))??;
    let sessions = Arc::new(RedisSessionResolver::new(
        session_conn,
        config.session.key_prefix.clone(),
    ));

    let relay = Arc::new(ChatRelay::new(access));

    // Queue unavailable is fatal: without it the relay has nothing to do.
    let queue = RedisEventQueue::new(redis_client, config.queue.channel.clone());
    queue.consume(relay.clone()).await?;

    let state = RelayState::new(relay, sessions, config.session.cookie_name.clone());
    let app = http::router(state, &config.server.ws_path);

    let addr = config.server.socket_addr();
    tracing::info!(%addr, path = %config.server.ws_path, "chat relay listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
