use std::time::Duration;

use tracing::debug;

use super::wait::{DEFAULT_POLL_INTERVAL, WaitError, wait_until};
use crate::nodes::account::{AccountError, NodeAccount};

/// Watches a remote log for content written after the monitor was opened.
pub struct LogMonitor<'a> {
    account: &'a dyn NodeAccount,
    path: String,
    offset: u64,
}

impl<'a> LogMonitor<'a> {
    /// Records the current size of `path`; a missing log starts at zero.
    pub async fn open(account: &'a dyn NodeAccount, path: &str) -> LogMonitor<'a> {
        let offset = match account.ssh_output(&format!("wc -c < {path}")).await {
            Ok(output) => output.trim().parse::<u64>().unwrap_or(0),
            Err(err) => {
                debug!(path, error = %err, "log not readable yet; monitoring from start");
                0
            }
        };

        debug!(host = account.hostname(), path, offset, "monitoring log");

        Self {
            account,
            path: path.to_owned(),
            offset,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Waits until `pattern` appears literally in the log past the recorded
    /// offset.
    pub async fn wait_until(
        &self,
        pattern: &str,
        timeout: Duration,
        err_msg: &str,
    ) -> Result<(), WaitError> {
        wait_until(
            || self.contains(pattern),
            timeout,
            DEFAULT_POLL_INTERVAL,
            err_msg,
        )
        .await
    }

    async fn contains(&self, pattern: &str) -> Result<bool, AccountError> {
        let command = format!("tail -c +{} {}", self.offset + 1, self.path);
        match self.account.ssh_output(&command).await {
            Ok(content) => Ok(content.contains(pattern)),
            Err(err) if err.is_command_failure() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
