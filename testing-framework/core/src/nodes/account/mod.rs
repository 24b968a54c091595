mod local;
mod ssh;

use std::{fmt, io, path::PathBuf, process::Stdio, sync::Arc, time::Duration};

use async_trait::async_trait;
pub use local::LocalAccount;
pub use ssh::SshAccount;
use thiserror::Error;
use tokio::{io::AsyncWriteExt as _, process::Command, time::timeout};
use tracing::debug;

use crate::nodes::common::lifecycle::monitor::LogMonitor;

pub(crate) const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// Signals the harness sends to worker processes.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Term => "TERM",
            Self::Kill => "KILL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG{}", self.name())
    }
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("failed to spawn `{command}` for {host}: {source}")]
    Spawn {
        host: String,
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("`{command}` on {host} exited with code {code:?}: {stderr}")]
    Failed {
        host: String,
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("`{command}` on {host} timed out after {timeout:?}")]
    Timeout {
        host: String,
        command: String,
        timeout: Duration,
    },
    #[error("i/o failure on {host} for {}: {source}", path.display())]
    Io {
        host: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AccountError {
    /// True when the remote command ran and reported failure, as opposed to
    /// the transport itself breaking.
    #[must_use]
    pub const fn is_command_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Remote execution capability of a single test node.
#[async_trait]
pub trait NodeAccount: Send + Sync {
    fn hostname(&self) -> &str;

    async fn create_file(&self, path: &str, content: &str) -> Result<(), AccountError>;

    /// Runs `command` through the node's shell and returns its stdout. A
    /// non-zero exit status is an error.
    async fn ssh_output(&self, command: &str) -> Result<String, AccountError>;

    async fn signal(&self, pid: u32, signal: Signal) -> Result<(), AccountError>;

    async fn alive(&self, pid: u32) -> Result<bool, AccountError>;

    /// Copies a file from the node to the local host.
    async fn copy_from(&self, remote: &str, local: &std::path::Path) -> Result<(), AccountError>;

    async fn ssh(&self, command: &str) -> Result<(), AccountError> {
        self.ssh_output(command).await.map(|_| ())
    }

    /// Runs `command` and returns its non-empty stdout lines.
    async fn ssh_capture(&self, command: &str) -> Result<Vec<String>, AccountError> {
        let output = self.ssh_output(command).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToOwned::to_owned)
            .collect())
    }
}

/// Cheap-clone handle to a node owned by a service.
///
/// Two handles are the same node only when they share the account, so
/// distinct accounts with one hostname stay distinct nodes.
#[derive(Clone)]
pub struct Node {
    name: String,
    account: Arc<dyn NodeAccount>,
}

impl Node {
    pub fn new(account: impl NodeAccount + 'static) -> Self {
        Self::from_arc(Arc::new(account))
    }

    pub fn from_arc(account: Arc<dyn NodeAccount>) -> Self {
        Self {
            name: account.hostname().to_owned(),
            account,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn account(&self) -> &dyn NodeAccount {
        self.account.as_ref()
    }

    /// Starts watching `path` for lines written from now on.
    pub async fn monitor_log(&self, path: &str) -> LogMonitor<'_> {
        LogMonitor::open(self.account(), path).await
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.account, &other.account)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("name", &self.name).finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Runs a prepared command with a deadline, optionally feeding `input` to its
/// stdin, and returns stdout.
pub(crate) async fn run_command(
    mut command: Command,
    host: &str,
    description: &str,
    input: Option<&str>,
    deadline: Duration,
) -> Result<String, AccountError> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(host, command = description, "running node command");

    let spawn_error = |source| AccountError::Spawn {
        host: host.to_owned(),
        command: description.to_owned(),
        source,
    };

    let mut child = command.spawn().map_err(spawn_error)?;

    if let Some(input) = input {
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .await
                .map_err(spawn_error)?;
        }
    }

    let output = timeout(deadline, child.wait_with_output())
        .await
        .map_err(|_| AccountError::Timeout {
            host: host.to_owned(),
            command: description.to_owned(),
            timeout: deadline,
        })?
        .map_err(spawn_error)?;

    if !output.status.success() {
        return Err(AccountError::Failed {
            host: host.to_owned(),
            command: description.to_owned(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
