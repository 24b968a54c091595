mod base;
mod distributed;
mod errors;
mod layout;
mod policy;
mod standalone;
mod template;

#[cfg(test)]
mod testing;

pub use base::{LOG_NAME, STARTUP_MARKER, ServiceBase};
pub use distributed::{
    ConnectorSubmission, DEFAULT_CONFIGS_TOPIC, DEFAULT_OFFSETS_TOPIC, DistributedService,
};
pub use errors::ServiceError;
pub use layout::{CopycatLayout, WorkerMode};
use serde::Serialize;
pub use standalone::StandaloneService;
pub use template::{TemplateContext, render};

/// Connection details of the broker cluster the workers talk to.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct BrokerHandle {
    bootstrap_servers: String,
}

impl BrokerHandle {
    #[must_use]
    pub fn new(bootstrap_servers: impl Into<String>) -> Self {
        Self {
            bootstrap_servers: bootstrap_servers.into(),
        }
    }

    #[must_use]
    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }
}
