use async_trait::async_trait;
use copycat_testing_core::{
    nodes::Node,
    scenario::{LogSpec, Service},
};
use tracing::debug;

use super::{
    BrokerHandle,
    base::ServiceBase,
    errors::ServiceError,
    layout::{CopycatLayout, WorkerMode},
};

pub const DEFAULT_OFFSETS_TOPIC: &str = "copycat-offsets";
pub const DEFAULT_CONFIGS_TOPIC: &str = "copycat-configs";

/// Whether connector configs have been handed to the cluster yet.
///
/// Moves from `Pending` to `Submitted` once, after the first successful
/// start, and never back.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ConnectorSubmission {
    #[default]
    Pending,
    Submitted,
}

/// Runs Copycat in distributed mode across several nodes sharing the
/// offsets and configs topics.
#[derive(Debug)]
pub struct DistributedService {
    base: ServiceBase,
    offsets_topic: String,
    configs_topic: String,
    submission: ConnectorSubmission,
}

impl DistributedService {
    pub fn new(broker: BrokerHandle, nodes: Vec<Node>, files: Vec<String>) -> Self {
        Self {
            base: ServiceBase::new(broker, nodes, files),
            offsets_topic: DEFAULT_OFFSETS_TOPIC.to_owned(),
            configs_topic: DEFAULT_CONFIGS_TOPIC.to_owned(),
            submission: ConnectorSubmission::Pending,
        }
    }

    #[must_use]
    pub fn with_topics(
        mut self,
        offsets_topic: impl Into<String>,
        configs_topic: impl Into<String>,
    ) -> Self {
        self.offsets_topic = offsets_topic.into();
        self.configs_topic = configs_topic.into();
        self
    }

    #[must_use]
    pub fn with_layout(mut self, layout: CopycatLayout) -> Self {
        self.base.set_layout(layout);
        self
    }

    #[must_use]
    pub fn offsets_topic(&self) -> &str {
        &self.offsets_topic
    }

    #[must_use]
    pub fn configs_topic(&self) -> &str {
        &self.configs_topic
    }

    #[must_use]
    pub const fn submission(&self) -> ConnectorSubmission {
        self.submission
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

    /// Connectors go out only with the very first start, and only from the
    /// first node, so the cluster never sees them twice.
    fn submits_connectors(&self, node: &Node) -> bool {
        self.submission == ConnectorSubmission::Pending
            && self.base.nodes().first().is_some_and(|first| first == node)
    }
}

#[async_trait]
impl Service for DistributedService {
    type Error = ServiceError;

    fn nodes(&self) -> &[Node] {
        self.base.nodes()
    }

    fn logs(&self) -> Vec<LogSpec> {
        self.base.logs()
    }

    async fn start_node(&mut self, node: &Node) -> Result<(), ServiceError> {
        let submit = self.submits_connectors(node);
        let context = self.base.template_context(
            node,
            Some((self.offsets_topic.as_str(), self.configs_topic.as_str())),
        );
        self.base
            .launch(node, WorkerMode::Distributed, submit, &context)
            .await?;

        if self.submission == ConnectorSubmission::Pending {
            debug!(node = %node, "connector submission window closed");
            self.submission = ConnectorSubmission::Submitted;
        }
        Ok(())
    }

    async fn stop_node(&self, node: &Node, clean_shutdown: bool) -> Result<(), ServiceError> {
        self.base.stop_node(node, clean_shutdown).await
    }

    async fn clean_node(&self, node: &Node) -> Result<(), ServiceError> {
        self.base.clean_node(node).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copycat::testing::{
        LaunchBehavior, ScriptedAccount, broker, connector_templates, test_layout,
    };

    type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

    const CONNECTOR_0: &str = "/mnt/copycat-connector-0.properties";
    const CONNECTOR_1: &str = "/mnt/copycat-connector-1.properties";

    fn cluster(names: &[&str]) -> (Vec<ScriptedAccount>, DistributedService) {
        let accounts: Vec<ScriptedAccount> = names
            .iter()
            .map(|name| ScriptedAccount::new(name))
            .collect();
        let nodes = accounts
            .iter()
            .map(|account| Node::new(account.clone()))
            .collect();
        let mut service =
            DistributedService::new(broker(), nodes, Vec::new()).with_layout(test_layout());
        service.set_configs(
            "group.id=copycat-cluster\noffset.storage.topic={{ offsets_topic }}\nconfig.storage.topic={{ configs_topic }}\n",
            connector_templates(2),
        );
        (accounts, service)
    }

    fn submitted(command: &str) -> bool {
        command.contains(CONNECTOR_0) || command.contains(CONNECTOR_1)
    }

    #[tokio::test]
    async fn only_first_start_on_first_node_submits_connectors() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1", "worker2", "worker3"]);
        let nodes = service.nodes().to_vec();

        service.start_node(&nodes[0]).await?;
        service.start_node(&nodes[1]).await?;

        let first = accounts[0].launch_commands();
        assert_eq!(first.len(), 1);
        assert!(first[0].contains(&format!("{CONNECTOR_0} {CONNECTOR_1} ")));
        assert!(first[0].starts_with("/opt/kafka/bin/copycat-distributed.sh "));

        let second = accounts[1].launch_commands();
        assert_eq!(second.len(), 1);
        assert!(!submitted(&second[0]));
        assert_eq!(service.submission(), ConnectorSubmission::Submitted);
        Ok(())
    }

    #[tokio::test]
    async fn restart_never_resubmits_connectors() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1", "worker2"]);
        service.start().await?;

        service.restart().await?;

        let launches = accounts[0].launch_commands();
        assert_eq!(launches.len(), 2);
        assert!(submitted(&launches[0]));
        assert!(!submitted(&launches[1]));
        Ok(())
    }

    #[tokio::test]
    async fn failed_first_start_keeps_submission_pending() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1", "worker2"]);
        let first = service.nodes()[0].clone();
        accounts[0].set_launch(LaunchBehavior::Silent);

        service
            .start_node(&first)
            .await
            .expect_err("startup must time out");
        assert_eq!(service.submission(), ConnectorSubmission::Pending);

        accounts[0].set_launch(LaunchBehavior::Healthy);
        service.start_node(&first).await?;

        let launches = accounts[0].launch_commands();
        assert!(submitted(&launches[1]));
        assert_eq!(service.submission(), ConnectorSubmission::Submitted);
        Ok(())
    }

    #[tokio::test]
    async fn starting_a_later_node_first_closes_the_submission_window() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1", "worker2"]);
        let nodes = service.nodes().to_vec();

        service.start_node(&nodes[1]).await?;
        service.start_node(&nodes[0]).await?;

        assert!(!submitted(&accounts[1].launch_commands()[0]));
        assert!(!submitted(&accounts[0].launch_commands()[0]));
        Ok(())
    }

    #[tokio::test]
    async fn worker_configs_name_the_shared_topics() -> TestResult {
        let (accounts, service) = cluster(&["worker1"]);
        let mut service = service.with_topics("it-offsets", "it-configs");
        assert_eq!(service.offsets_topic(), "it-offsets");
        assert_eq!(service.configs_topic(), "it-configs");

        service.start().await?;

        let worker = accounts[0]
            .file("/mnt/copycat.properties")
            .ok_or("worker config missing")?;
        assert!(worker.contains("offset.storage.topic=it-offsets\n"));
        assert!(worker.contains("config.storage.topic=it-configs\n"));
        Ok(())
    }

    #[tokio::test]
    async fn default_topics_are_rendered() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1"]);
        assert_eq!(service.offsets_topic(), DEFAULT_OFFSETS_TOPIC);

        service.start().await?;

        let worker = accounts[0]
            .file("/mnt/copycat.properties")
            .ok_or("worker config missing")?;
        assert!(worker.contains(&format!("config.storage.topic={DEFAULT_CONFIGS_TOPIC}\n")));
        Ok(())
    }

    #[tokio::test]
    async fn nodes_sharing_a_hostname_submit_once() -> TestResult {
        let (accounts, mut service) = cluster(&["localhost", "localhost"]);
        let nodes = service.nodes().to_vec();

        service.start_node(&nodes[1]).await?;
        service.start_node(&nodes[0]).await?;

        assert!(!submitted(&accounts[1].launch_commands()[0]));
        assert!(!submitted(&accounts[0].launch_commands()[0]));
        Ok(())
    }

    #[tokio::test]
    async fn restart_stops_at_first_failing_node() -> TestResult {
        let (accounts, mut service) = cluster(&["worker1", "worker2", "worker3"]);
        service.start().await?;
        let third = service.nodes()[2].clone();
        let untouched_pid = service.pids(&third).await[0];
        accounts[1].set_launch(LaunchBehavior::Silent);

        let err = service.restart().await.expect_err("second node must fail");

        assert!(matches!(err, ServiceError::Startup { .. }));
        assert_eq!(accounts[0].launch_commands().len(), 2);
        assert_eq!(accounts[1].launch_commands().len(), 2);
        assert_eq!(accounts[2].launch_commands().len(), 1);
        assert!(accounts[2].signals().is_empty());
        assert!(accounts[2].is_running(untouched_pid));
        Ok(())
    }
}
