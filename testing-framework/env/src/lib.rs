use std::{env, path::PathBuf};

pub const DEFAULT_KAFKA_HOME: &str = "/opt/kafka";
pub const DEFAULT_REMOTE_ROOT: &str = "/mnt";

fn enabled(key: &str) -> bool {
    env::var(key).is_ok_and(|s| s == "true")
}

#[must_use]
pub fn slow_test_env() -> bool {
    enabled("SLOW_TEST_ENV")
}

/// Install root of the Kafka distribution on the test nodes.
#[must_use]
pub fn copycat_kafka_home() -> PathBuf {
    env::var_os("COPYCAT_KAFKA_HOME")
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_KAFKA_HOME), PathBuf::from)
}

/// Directory holding worker configs, pid and log files on the test nodes.
#[must_use]
pub fn copycat_remote_root() -> PathBuf {
    env::var_os("COPYCAT_REMOTE_ROOT")
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_REMOTE_ROOT), PathBuf::from)
}

#[must_use]
pub fn copycat_startup_timeout_secs() -> Option<u64> {
    env::var("COPYCAT_STARTUP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

#[must_use]
pub fn copycat_stop_timeout_secs() -> Option<u64> {
    env::var("COPYCAT_STOP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
}

/// Keep the worker log on cleanup. Only `true` enables it.
#[must_use]
pub fn copycat_preserve_logs() -> bool {
    enabled("COPYCAT_PRESERVE_LOGS")
}

#[must_use]
pub fn copycat_ssh_user() -> Option<String> {
    env::var("COPYCAT_SSH_USER").ok().filter(|v| !v.is_empty())
}

#[must_use]
pub fn copycat_ssh_port() -> Option<u16> {
    env::var("COPYCAT_SSH_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
}

#[must_use]
pub fn copycat_ssh_identity() -> Option<PathBuf> {
    env::var("COPYCAT_SSH_IDENTITY").ok().map(PathBuf::from)
}

#[must_use]
pub fn rust_log() -> Option<String> {
    env::var("RUST_LOG").ok()
}
