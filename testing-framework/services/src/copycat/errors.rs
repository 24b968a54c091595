use copycat_testing_core::nodes::{AccountError, WaitError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("worker configs not set; call set_configs before starting")]
    ConfigsNotSet,
    #[error("failed to render {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("{operation} failed on {node}: {source}")]
    Remote {
        operation: &'static str,
        node: String,
        #[source]
        source: AccountError,
    },
    #[error("copycat startup failed on {node}: {source}")]
    Startup {
        node: String,
        #[source]
        source: WaitError,
    },
    #[error("copycat process {pid} on {node} did not exit: {source}")]
    ProcessExit {
        node: String,
        pid: u32,
        #[source]
        source: WaitError,
    },
    #[error("no process ids recorded on {node}")]
    NoProcessIds { node: String },
    #[error(transparent)]
    Account(#[from] AccountError),
}
