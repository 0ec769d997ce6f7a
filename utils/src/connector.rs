use deadpool_redis::{CreatePoolError, Pool, PoolConfig, Runtime};

const DEFAULT_POOL_SIZE: usize = 16;

/// Builds the redis:// URL for the given connection settings.
///
/// Credentials are percent-encoded, so passwords may contain `@`, `:` or `/`.
pub fn redis_url(
    host: &str,
    port: u16,
    db: u16,
    username: &Option<String>,
    password: &Option<String>,
) -> String {
    let username = username.as_deref().map(urlencoding::encode);
    let password = password.as_deref().map(urlencoding::encode);
    let auth = match (username, password) {
        (Some(user), Some(pass)) => format!("{user}:{pass}@"),
        (None, Some(pass)) => format!(":{pass}@"),
        (Some(user), None) => format!("{user}@"),
        (None, None) => String::new(),
    };
    format!("redis://{auth}{host}:{port}/{db}")
}

/// Creates a lazily-connecting pool; no connection is opened until first use.
pub fn create_redis_pool(
    host: &str,
    port: u16,
    db: u16,
    username: &Option<String>,
    password: &Option<String>,
    pool_size: Option<usize>,
) -> Result<Pool, CreatePoolError> {
    let mut cfg = deadpool_redis::Config::from_url(redis_url(host, port, db, username, password));
    cfg.pool = Some(PoolConfig::new(pool_size.unwrap_or(DEFAULT_POOL_SIZE)));
    cfg.create_pool(Some(Runtime::Tokio1))
}
