use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Pacing applied by the batch fetcher between upstream calls.
#[async_trait]
pub trait BackoffPolicy: Send + Sync {
    /// Wait before the expensive cash-flow request for `symbol`.
    async fn courtesy_delay(&self, symbol: &str);

    /// Wait after `symbol` was rejected with a rate-limit signal.
    async fn rate_limit_cooldown(&self, symbol: &str);
}

/// Random courtesy delay within `[jitter_min, jitter_max]`, fixed cooldown.
#[derive(Debug, Clone)]
pub struct JitteredBackoff {
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    pub cooldown: Duration,
}

impl JitteredBackoff {
    pub fn new(jitter_min: Duration, jitter_max: Duration, cooldown: Duration) -> Self {
        Self {
            jitter_min: jitter_min.min(jitter_max),
            jitter_max,
            cooldown,
        }
    }

    fn sample_jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if min >= max {
            return self.jitter_min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for JitteredBackoff {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(500),
            Duration::from_millis(1500),
            Duration::from_secs(5),
        )
    }
}

#[async_trait]
impl BackoffPolicy for JitteredBackoff {
    async fn courtesy_delay(&self, _symbol: &str) {
        let delay = self.sample_jitter();
        tokio::time::sleep(delay).await;
    }

    async fn rate_limit_cooldown(&self, symbol: &str) {
        tracing::warn!(
            "Rate limited on {}, cooling down for {}s",
            symbol,
            self.cooldown.as_secs_f64()
        );
        tokio::time::sleep(self.cooldown).await;
    }
}

/// No waiting at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

#[async_trait]
impl BackoffPolicy for NoBackoff {
    async fn courtesy_delay(&self, _symbol: &str) {}

    async fn rate_limit_cooldown(&self, _symbol: &str) {}
}
