use std::{
    collections::BTreeMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use copycat_testing_core::nodes::{AccountError, NodeAccount, Signal};

use super::STARTUP_MARKER;

/// What a launched worker does on the scripted node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum LaunchBehavior {
    /// Logs the startup marker and keeps running.
    Healthy,
    /// Keeps running but never logs the startup marker.
    Silent,
    /// Logs the startup marker, then dies before anyone looks at its pid.
    Crash,
}

#[derive(Debug)]
struct ScriptedState {
    files: BTreeMap<String, String>,
    processes: BTreeMap<u32, bool>,
    next_pid: u32,
    commands: Vec<String>,
    signals: Vec<(u32, Signal)>,
    launch: LaunchBehavior,
    ignore_term: bool,
    fail_signals: bool,
    time_out_reads: bool,
}

/// In-memory node that understands the handful of shell commands the
/// Copycat services issue and models a process table.
#[derive(Clone, Debug)]
pub(crate) struct ScriptedAccount {
    hostname: String,
    state: Arc<Mutex<ScriptedState>>,
}

impl ScriptedAccount {
    pub(crate) fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            state: Arc::new(Mutex::new(ScriptedState {
                files: BTreeMap::new(),
                processes: BTreeMap::new(),
                next_pid: 1000,
                commands: Vec::new(),
                signals: Vec::new(),
                launch: LaunchBehavior::Healthy,
                ignore_term: false,
                fail_signals: false,
                time_out_reads: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, ScriptedState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set_launch(&self, behavior: LaunchBehavior) {
        self.state().launch = behavior;
    }

    pub(crate) fn ignore_term(&self) {
        self.state().ignore_term = true;
    }

    pub(crate) fn fail_signals(&self) {
        self.state().fail_signals = true;
    }

    /// Makes every later `cat` fail in transport, as an unreachable node
    /// would.
    pub(crate) fn time_out_reads(&self) {
        self.state().time_out_reads = true;
    }

    pub(crate) fn put_file(&self, path: &str, content: &str) {
        self.state()
            .files
            .insert(path.to_owned(), content.to_owned());
    }

    pub(crate) fn file(&self, path: &str) -> Option<String> {
        self.state().files.get(path).cloned()
    }

    pub(crate) fn spawn_process(&self) -> u32 {
        let mut state = self.state();
        state.next_pid += 1;
        let pid = state.next_pid;
        state.processes.insert(pid, true);
        pid
    }

    /// Kills a process behind the services' back.
    pub(crate) fn crash(&self, pid: u32) {
        self.state().processes.insert(pid, false);
    }

    pub(crate) fn is_running(&self, pid: u32) -> bool {
        self.state().processes.get(&pid).copied().unwrap_or(false)
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub(crate) fn launch_commands(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|command| command.contains(" & echo $! > "))
            .collect()
    }

    pub(crate) fn signals(&self) -> Vec<(u32, Signal)> {
        self.state().signals.clone()
    }

    fn failed(&self, command: &str, stderr: &str) -> AccountError {
        AccountError::Failed {
            host: self.hostname.clone(),
            command: command.to_owned(),
            code: Some(1),
            stderr: stderr.to_owned(),
        }
    }

    fn launch(state: &mut ScriptedState, command: &str) {
        let log = command
            .split("1>> ")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or_default()
            .to_owned();
        let pid_file = command
            .rsplit("> ")
            .next()
            .unwrap_or_default()
            .trim()
            .to_owned();

        state.next_pid += 1;
        let pid = state.next_pid;
        state
            .processes
            .insert(pid, state.launch != LaunchBehavior::Crash);
        state.files.insert(pid_file, format!("{pid}\n"));

        let entry = state.files.entry(log).or_default();
        entry.push_str("INFO Kafka version : 0.9.0\n");
        if state.launch != LaunchBehavior::Silent {
            entry.push_str(&format!("INFO {STARTUP_MARKER}\n"));
        }
    }
}

#[async_trait]
impl NodeAccount for ScriptedAccount {
    fn hostname(&self) -> &str {
        &self.hostname
    }

    async fn create_file(&self, path: &str, content: &str) -> Result<(), AccountError> {
        self.put_file(path, content);
        Ok(())
    }

    async fn ssh_output(&self, command: &str) -> Result<String, AccountError> {
        let mut state = self.state();
        state.commands.push(command.to_owned());

        if command.contains(" & echo $! > ") {
            Self::launch(&mut state, command);
            return Ok(String::new());
        }

        let words: Vec<&str> = command.split_whitespace().collect();
        match words.as_slice() {
            ["cat", _] if state.time_out_reads => Err(AccountError::Timeout {
                host: self.hostname.clone(),
                command: command.to_owned(),
                timeout: std::time::Duration::from_secs(60),
            }),
            ["cat", path] => state
                .files
                .get(*path)
                .cloned()
                .ok_or_else(|| self.failed(command, "No such file or directory")),
            ["rm", flag, paths @ ..] if flag.starts_with('-') => {
                for path in paths {
                    state.files.remove(*path);
                }
                Ok(String::new())
            }
            ["wc", "-c", "<", path] => state
                .files
                .get(*path)
                .map(|content| format!("{}\n", content.len()))
                .ok_or_else(|| self.failed(command, "No such file or directory")),
            ["tail", "-c", start, path] => {
                let start = start
                    .trim_start_matches('+')
                    .parse::<usize>()
                    .unwrap_or(1)
                    .saturating_sub(1);
                state
                    .files
                    .get(*path)
                    .map(|content| content.get(start..).unwrap_or_default().to_owned())
                    .ok_or_else(|| self.failed(command, "No such file or directory"))
            }
            _ => Ok(String::new()),
        }
    }

    async fn signal(&self, pid: u32, signal: Signal) -> Result<(), AccountError> {
        let mut state = self.state();
        let command = format!("kill -{} {pid}", signal.name());
        state.signals.push((pid, signal));

        if state.fail_signals {
            return Err(self.failed(&command, "Operation not permitted"));
        }
        if !state.processes.get(&pid).copied().unwrap_or(false) {
            return Err(self.failed(&command, "No such process"));
        }
        if signal == Signal::Kill || !state.ignore_term {
            state.processes.insert(pid, false);
        }
        Ok(())
    }

    async fn alive(&self, pid: u32) -> Result<bool, AccountError> {
        Ok(self.is_running(pid))
    }

    async fn copy_from(&self, remote: &str, local: &Path) -> Result<(), AccountError> {
        let content = self
            .file(remote)
            .ok_or_else(|| self.failed(remote, "No such file or directory"))?;
        std::fs::write(local, content).map_err(|source| AccountError::Io {
            host: self.hostname.clone(),
            path: local.to_path_buf(),
            source,
        })
    }
}

pub(crate) const WORKER_TEMPLATE: &str =
    "bootstrap.servers={{ bootstrap_servers }}\nkey.converter=org.apache.kafka.copycat.json.JsonConverter\n";

pub(crate) fn broker() -> super::BrokerHandle {
    super::BrokerHandle::new("broker1:9092")
}

pub(crate) fn test_layout() -> super::CopycatLayout {
    super::CopycatLayout::default()
        .with_startup_timeout(std::time::Duration::from_millis(200))
        .with_stop_timeout(std::time::Duration::from_millis(200))
}

pub(crate) fn connector_templates(count: usize) -> Vec<String> {
    (0..count)
        .map(|index| format!("name=connector-{index}\ntopic=test-{index}\n"))
        .collect()
}
