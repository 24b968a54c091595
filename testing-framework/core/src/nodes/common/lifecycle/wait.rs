use std::{future::Future, time::Duration};

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::nodes::account::AccountError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error("{message} (waited {timeout:?})")]
    Timeout { message: String, timeout: Duration },
    #[error("condition probe failed: {source}")]
    Probe {
        #[source]
        source: AccountError,
    },
}

/// Polls `condition` until it reports true or `timeout` elapses.
///
/// The condition is always evaluated at least once. A probe error aborts the
/// wait immediately.
pub async fn wait_until<F, Fut>(
    mut condition: F,
    timeout: Duration,
    poll_interval: Duration,
    err_msg: &str,
) -> Result<(), WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, AccountError>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if condition()
            .await
            .map_err(|source| WaitError::Probe { source })?
        {
            return Ok(());
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(?timeout, message = err_msg, "wait condition timed out");
            return Err(WaitError::Timeout {
                message: err_msg.to_owned(),
                timeout,
            });
        }

        sleep(poll_interval.min(deadline - now)).await;
    }
}
