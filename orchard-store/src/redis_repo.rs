use tracing::info;

/// Fixed-window request counter shared by every API instance.
#[derive(Clone)]
pub struct RateLimiter {
    client: redis::Client,
    limit: i64,
    window_seconds: i64,
}

impl RateLimiter {
    pub fn new(connection_string: &str, limit: i64, window_seconds: i64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Rate limiting at {} requests per {}s", limit, window_seconds);
        Ok(Self {
            client,
            limit,
            window_seconds,
        })
    }

    /// `true` while `key` is within its allowance for the current window.
    pub async fn check_rate_limit(&self, key: &str) -> redis::RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, self.window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= self.limit)
    }
}
