//! Retry the whole assignment while partition leaders are being elected.
//!
//! Partition metadata may change between attempts, so nothing from a failed
//! attempt is reused: the closure recomputes everything from scratch.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Error, Result};

/// Delay before the computation is attempted again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Run `f` until it succeeds or fails with anything but a transient cluster
/// error.
///
/// There is no attempt limit: a group that cannot be assigned cannot consume
/// either, so waiting for the cluster to recover is all that is left to do.
pub async fn retry_transient<F, Fut, T>(
    config: &BackoffConfig,
    request_name: &str,
    mut f: F,
) -> Result<T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T>> + Send,
    T: Send,
{
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        match f().await {
            Err(Error::Cluster(e)) if e.is_transient() => {
                warn!(
                    e=%e,
                    request_name,
                    attempt,
                    delay_ms = config.delay.as_millis() as u64,
                    "transient cluster error, retrying",
                );
                tokio::time::sleep(config.delay).await;
            }
            res => return res,
        }
    }
}
