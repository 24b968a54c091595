use async_trait::async_trait;
use copycat_testing_core::{
    nodes::Node,
    scenario::{LogSpec, Service},
};

use super::{
    BrokerHandle,
    base::ServiceBase,
    errors::ServiceError,
    layout::{CopycatLayout, WorkerMode},
};

/// Runs Copycat in standalone mode on a single node.
#[derive(Debug)]
pub struct StandaloneService {
    base: ServiceBase,
}

impl StandaloneService {
    pub fn new(broker: BrokerHandle, node: Node, files: Vec<String>) -> Self {
        Self {
            base: ServiceBase::new(broker, vec![node], files),
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: CopycatLayout) -> Self {
        self.base.set_layout(layout);
        self
    }

    /// The only node of this service.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.base.nodes()[0]
    }

    pub fn set_configs(
        &mut self,
        worker_template: impl Into<String>,
        connector_templates: Vec<String>,
    ) {
        self.base.set_configs(worker_template, connector_templates);
    }

    pub async fn pids(&self, node: &Node) -> Vec<u32> {
        self.base.pids(node).await
    }

    #[must_use]
    pub fn config_filenames(&self) -> Vec<String> {
        self.base.config_filenames()
    }
}

#[async_trait]
impl Service for StandaloneService {
    type Error = ServiceError;

    fn nodes(&self) -> &[Node] {
        self.base.nodes()
    }

    fn logs(&self) -> Vec<LogSpec> {
        self.base.logs()
    }

    async fn start_node(&mut self, node: &Node) -> Result<(), ServiceError> {
        let context = self.base.template_context(node, None);
        self.base
            .launch(node, WorkerMode::Standalone, true, &context)
            .await
    }

    async fn stop_node(&self, node: &Node, clean_shutdown: bool) -> Result<(), ServiceError> {
        self.base.stop_node(node, clean_shutdown).await
    }

    async fn clean_node(&self, node: &Node) -> Result<(), ServiceError> {
        self.base.clean_node(node).await
    }
}
