//! Cooperative pacing between external calls.

use std::time::Duration;

use async_trait::async_trait;

/// Awaited between successive external calls and between keywords.
#[async_trait]
pub trait WaitPolicy: Send + Sync {
    async fn wait(&self);
}

/// Sleep a fixed duration.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

#[async_trait]
impl WaitPolicy for FixedDelay {
    async fn wait(&self) {
        if !self.0.is_zero() {
            tokio::time::sleep(self.0).await;
        }
    }
}

/// Never waits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWait;

#[async_trait]
impl WaitPolicy for NoWait {
    async fn wait(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_delay_sleeps() {
        let start = std::time::Instant::now();
        FixedDelay::from_millis(40).wait().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn no_wait_returns_immediately() {
        let start = std::time::Instant::now();
        NoWait.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
