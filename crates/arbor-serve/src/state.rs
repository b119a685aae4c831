//! Application state and configuration.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arbor_store::{PoolConfig, PostStore};

/// Application configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:5000").
    pub bind_addr: String,

    /// PostgreSQL connection URL.
    pub database_url: String,

    /// Upper bound on pooled database connections.
    pub max_connections: u32,

    /// How long a request may wait for a free connection.
    pub acquire_timeout: Duration,

    /// Per-session statement timeout.
    pub statement_timeout: Duration,

    /// GET requests slower than this are logged as warnings.
    pub slow_request_threshold: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `ARBOR_DATABASE_URL` (or `DATABASE_URL`): PostgreSQL URL
    ///
    /// Optional environment variables:
    /// - `ARBOR_BIND_ADDR`: bind address (default: "0.0.0.0:5000")
    /// - `ARBOR_MAX_CONNECTIONS`: pool size (default: 100)
    /// - `ARBOR_ACQUIRE_TIMEOUT_MS`: pool acquire timeout (default: 5000)
    /// - `ARBOR_STATEMENT_TIMEOUT_MS`: statement timeout (default: 10000)
    /// - `ARBOR_SLOW_REQUEST_MS`: slow-GET warning threshold (default: 400)
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("ARBOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let database_url = std::env::var("ARBOR_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                anyhow::anyhow!("ARBOR_DATABASE_URL (or DATABASE_URL) environment variable is required")
            })?;

        let max_connections: u32 = env_parse("ARBOR_MAX_CONNECTIONS", 100)?;
        let acquire_timeout = Duration::from_millis(env_parse("ARBOR_ACQUIRE_TIMEOUT_MS", 5_000)?);
        let statement_timeout =
            Duration::from_millis(env_parse("ARBOR_STATEMENT_TIMEOUT_MS", 10_000)?);
        let slow_request_threshold =
            Duration::from_millis(env_parse("ARBOR_SLOW_REQUEST_MS", 400)?);

        tracing::info!(
            bind_addr = %bind_addr,
            max_connections,
            slow_request_ms = slow_request_threshold.as_millis() as u64,
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            database_url,
            max_connections,
            acquire_timeout,
            statement_timeout,
            slow_request_threshold,
        })
    }

    /// Pool settings derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            acquire_timeout: self.acquire_timeout,
            statement_timeout: self.statement_timeout,
        }
    }
}

/// Parse an optional environment variable, falling back to a default.
fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The post store over the shared connection pool.
    pub store: PostStore,

    /// Application configuration.
    pub config: Arc<Config>,
}

impl AppState {
    /// Connect the pool, bring the schema up to date, and build the state.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = arbor_store::connect(&config.pool_config()).await?;
        arbor_store::init_schema(&pool).await?;

        Ok(Self {
            store: PostStore::new(pool),
            config: Arc::new(config),
        })
    }
}
