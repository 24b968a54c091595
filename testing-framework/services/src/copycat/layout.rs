use std::time::Duration;

use copycat_testing_core::adjust_timeout;
use copycat_testing_env as tf_env;

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Which launcher script starts the worker.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkerMode {
    Standalone,
    Distributed,
}

impl WorkerMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standalone => "standalone",
            Self::Distributed => "distributed",
        }
    }

    const fn script(self) -> &'static str {
        match self {
            Self::Standalone => "copycat-standalone.sh",
            Self::Distributed => "copycat-distributed.sh",
        }
    }
}

/// Remote file locations, launcher paths and lifecycle timeouts for a
/// Copycat worker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CopycatLayout {
    root: String,
    kafka_home: String,
    startup_timeout: Duration,
    stop_timeout: Duration,
    preserve_logs: bool,
}

impl Default for CopycatLayout {
    fn default() -> Self {
        Self {
            root: tf_env::DEFAULT_REMOTE_ROOT.to_owned(),
            kafka_home: tf_env::DEFAULT_KAFKA_HOME.to_owned(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            preserve_logs: false,
        }
    }
}

impl CopycatLayout {
    /// Layout with every `COPYCAT_*` override applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            root: tf_env::copycat_remote_root().display().to_string(),
            kafka_home: tf_env::copycat_kafka_home().display().to_string(),
            startup_timeout: tf_env::copycat_startup_timeout_secs()
                .map_or(DEFAULT_STARTUP_TIMEOUT, Duration::from_secs),
            stop_timeout: tf_env::copycat_stop_timeout_secs()
                .map_or(DEFAULT_STOP_TIMEOUT, Duration::from_secs),
            preserve_logs: tf_env::copycat_preserve_logs(),
        }
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    #[must_use]
    pub fn with_kafka_home(mut self, kafka_home: impl Into<String>) -> Self {
        self.kafka_home = kafka_home.into();
        self
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_preserve_logs(mut self, preserve: bool) -> Self {
        self.preserve_logs = preserve;
        self
    }

    fn path(&self, file: &str) -> String {
        format!("{}/{file}", self.root.trim_end_matches('/'))
    }

    #[must_use]
    pub fn worker_config(&self) -> String {
        self.path("copycat.properties")
    }

    #[must_use]
    pub fn connector_config(&self, index: usize) -> String {
        self.path(&format!("copycat-connector-{index}.properties"))
    }

    #[must_use]
    pub fn pid_file(&self) -> String {
        self.path("copycat.pid")
    }

    #[must_use]
    pub fn log_file(&self) -> String {
        self.path("copycat.log")
    }

    #[must_use]
    pub fn launcher(&self, mode: WorkerMode) -> String {
        format!("{}/bin/{}", self.kafka_home.trim_end_matches('/'), mode.script())
    }

    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        adjust_timeout(self.startup_timeout)
    }

    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        adjust_timeout(self.stop_timeout)
    }

    #[must_use]
    pub const fn preserve_logs(&self) -> bool {
        self.preserve_logs
    }

    /// Backgrounds the launcher with output appended to the log and records
    /// its pid.
    #[must_use]
    pub fn launch_command(&self, mode: WorkerMode, connector_configs: &[String]) -> String {
        let log = self.log_file();
        let mut args = vec![self.launcher(mode), self.worker_config()];
        args.extend(connector_configs.iter().cloned());

        format!(
            "{} 1>> {log} 2>> {log} & echo $! > {}",
            args.join(" "),
            self.pid_file()
        )
    }
}
