use std::{path::Path, time::Duration};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::debug;

use super::{AccountError, DEFAULT_COMMAND_TIMEOUT, NodeAccount, Signal, run_command};
use crate::nodes::common::lifecycle::kill::{shell_alive, shell_signal};

/// Runs node commands on the local host through `sh -c`.
#[derive(Clone, Debug)]
pub struct LocalAccount {
    hostname: String,
    command_timeout: Duration,
}

impl LocalAccount {
    #[must_use]
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> AccountError {
        AccountError::Io {
            host: self.hostname.clone(),
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Default for LocalAccount {
    fn default() -> Self {
        Self::new("localhost")
    }
}

#[async_trait]
impl NodeAccount for LocalAccount {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), AccountError> {
        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(parent, source))?;
        }

        debug!(host = %self.hostname, path = %path.display(), bytes = content.len(), "writing file");
        fs::write(path, content)
            .await
            .map_err(|source| self.io_error(path, source))
    }

    async fn ssh_output(&self, command: &str) -> Result<String, AccountError> {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_command(cmd, &self.hostname, command, None, self.command_timeout).await
    }

    async fn signal(&self, pid: u32, signal: Signal) -> Result<(), AccountError> {
        shell_signal(self, pid, signal).await
    }

    async fn alive(&self, pid: u32) -> Result<bool, AccountError> {
        shell_alive(self, pid).await
    }

    async fn copy_from(&self, remote: &str, local: &Path) -> Result<(), AccountError> {
        fs::copy(remote, local)
            .await
            .map(|_| ())
            .map_err(|source| self.io_error(Path::new(remote), source))
    }
}
