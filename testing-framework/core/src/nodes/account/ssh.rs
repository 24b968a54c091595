use std::{path::Path, time::Duration};

use async_trait::async_trait;
use copycat_testing_env as tf_env;
use tokio::process::Command;

use super::{AccountError, DEFAULT_COMMAND_TIMEOUT, NodeAccount, Signal, run_command};
use crate::nodes::common::lifecycle::kill::{shell_alive, shell_signal};

/// Runs node commands over the `ssh` CLI and copies files with `scp`.
#[derive(Clone, Debug)]
pub struct SshAccount {
    host: String,
    user: Option<String>,
    port: Option<u16>,
    identity: Option<std::path::PathBuf>,
    command_timeout: Duration,
}

impl SshAccount {
    /// Account for `host` using the `COPYCAT_SSH_*` defaults.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: tf_env::copycat_ssh_user(),
            port: tf_env::copycat_ssh_port(),
            identity: tf_env::copycat_ssh_identity(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<std::path::PathBuf>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    fn common_options(&self, command: &mut Command, port_flag: &str) {
        command
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=no");
        if let Some(port) = self.port {
            command.arg(port_flag).arg(port.to_string());
        }
        if let Some(identity) = &self.identity {
            command.arg("-i").arg(identity);
        }
    }

    fn ssh_command(&self, remote: &str) -> Command {
        let mut command = Command::new("ssh");
        self.common_options(&mut command, "-p");
        command.arg(self.destination()).arg(remote);
        command
    }
}

#[async_trait]
impl NodeAccount for SshAccount {
    fn hostname(&self) -> &str {
        &self.host
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), AccountError> {
        let remote = format!("mkdir -p \"$(dirname {path})\" && cat > {path}");
        run_command(
            self.ssh_command(&remote),
            &self.host,
            &remote,
            Some(content),
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn ssh_output(&self, command: &str) -> Result<String, AccountError> {
        run_command(
            self.ssh_command(command),
            &self.host,
            command,
            None,
            self.command_timeout,
        )
        .await
    }

    async fn signal(&self, pid: u32, signal: Signal) -> Result<(), AccountError> {
        shell_signal(self, pid, signal).await
    }

    async fn alive(&self, pid: u32) -> Result<bool, AccountError> {
        shell_alive(self, pid).await
    }

    async fn copy_from(&self, remote: &str, local: &Path) -> Result<(), AccountError> {
        let mut command = Command::new("scp");
        self.common_options(&mut command, "-P");
        command
            .arg(format!("{}:{remote}", self.destination()))
            .arg(local);

        let description = format!("scp {remote} {}", local.display());
        run_command(command, &self.host, &description, None, self.command_timeout)
            .await
            .map(|_| ())
    }
}
