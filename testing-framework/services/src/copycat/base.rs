use std::num::NonZeroU32;

use copycat_testing_core::{
    nodes::{Node, Signal, common::lifecycle::wait::DEFAULT_POLL_INTERVAL, wait_until},
    scenario::LogSpec,
};
use tracing::{debug, info, warn};

use super::{
    BrokerHandle,
    errors::ServiceError,
    layout::{CopycatLayout, WorkerMode},
    policy::{best_effort, fail_loud},
    template::{TemplateContext, render},
};

/// Line the worker logs once it has finished starting up.
pub const STARTUP_MARKER: &str = "Copycat started";

pub const LOG_NAME: &str = "kafka_log";

#[derive(Clone, Debug)]
struct WorkerConfigs {
    worker: String,
    connectors: Vec<String>,
}

/// State and lifecycle operations shared by the standalone and distributed
/// Copycat services.
#[derive(Debug)]
pub struct ServiceBase {
    broker: BrokerHandle,
    nodes: Vec<Node>,
    files: Vec<String>,
    layout: CopycatLayout,
    configs: Option<WorkerConfigs>,
}

impl ServiceBase {
    pub fn new(broker: BrokerHandle, nodes: Vec<Node>, files: Vec<String>) -> Self {
        Self {
            broker,
            nodes,
            files,
            layout: CopycatLayout::from_env(),
            configs: None,
        }
    }

    pub(crate) fn set_layout(&mut self, layout: CopycatLayout) {
        self.layout = layout;
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Sets the worker and connector config templates. They are not known at
    /// construction time because they usually reference the broker service.
    pub fn set_configs(
        &mut self,
        worker_template: impl Into<String>,
        connector_templates: Vec<String>,
    ) {
        self.configs = Some(WorkerConfigs {
            worker: worker_template.into(),
            connectors: connector_templates,
        });
    }

    #[must_use]
    pub fn logs(&self) -> Vec<LogSpec> {
        vec![LogSpec {
            name: LOG_NAME,
            path: self.layout.log_file(),
            collect_default: true,
        }]
    }

    /// Remote paths of the connector configs, one per connector template.
    #[must_use]
    pub fn config_filenames(&self) -> Vec<String> {
        let count = self
            .configs
            .as_ref()
            .map_or(0, |configs| configs.connectors.len());
        (0..count)
            .map(|index| self.layout.connector_config(index))
            .collect()
    }

    /// Process ids recorded in the node's pid file.
    ///
    /// Any failure to read or parse the file yields no pids, and so does a
    /// zero pid, which would address the whole process group. Recorded pids
    /// whose process is confirmed gone are dropped.
    pub async fn pids(&self, node: &Node) -> Vec<u32> {
        let pid_file = self.layout.pid_file();
        let lines = best_effort(
            node,
            "read pid file",
            node.account().ssh_capture(&format!("cat {pid_file}")).await,
        );

        let recorded = match lines
            .iter()
            .map(|line| line.parse::<NonZeroU32>().map(NonZeroU32::get))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(pids) => pids,
            Err(err) => {
                debug!(node = %node, path = %pid_file, error = %err, "pid file is not numeric");
                return Vec::new();
            }
        };

        let mut pids = Vec::with_capacity(recorded.len());
        for pid in recorded {
            match node.account().alive(pid).await {
                Ok(false) => debug!(node = %node, pid, "recorded pid is no longer running"),
                Ok(true) => pids.push(pid),
                Err(err) => {
                    warn!(node = %node, pid, error = %err, "liveness probe failed; keeping recorded pid");
                    pids.push(pid);
                }
            }
        }
        pids
    }

    /// Signals every worker process on `node`, waits for each to exit and
    /// removes the pid file.
    pub async fn stop_node(&self, node: &Node, clean_shutdown: bool) -> Result<(), ServiceError> {
        let pids = self.pids(node).await;
        let signal = if clean_shutdown {
            Signal::Term
        } else {
            Signal::Kill
        };

        info!(node = %node, ?pids, %signal, "stopping copycat process");

        for &pid in &pids {
            fail_loud(node, "signal process", node.account().signal(pid, signal).await)?;
        }

        let account = node.account();
        for &pid in &pids {
            wait_until(
                move || async move { account.alive(pid).await.map(|alive| !alive) },
                self.layout.stop_timeout(),
                DEFAULT_POLL_INTERVAL,
                "Copycat process took too long to exit",
            )
            .await
            .map_err(|source| ServiceError::ProcessExit {
                node: node.name().to_owned(),
                pid,
                source,
            })?;
        }

        fail_loud(
            node,
            "remove pid file",
            node.account()
                .ssh(&format!("rm -f {}", self.layout.pid_file()))
                .await,
        )
    }

    /// Forcefully resets `node`: kills whatever is still running and removes
    /// every file the service created or was handed.
    ///
    /// Files are removed even when a kill fails; the first kill failure is
    /// still returned.
    pub async fn clean_node(&self, node: &Node) -> Result<(), ServiceError> {
        let pids = self.pids(node).await;
        if !pids.is_empty() {
            warn!(node = %node, ?pids, "copycat was still alive at cleanup time; killing forcefully");
        }

        let mut kill_result = Ok(());
        for &pid in &pids {
            let result = fail_loud(
                node,
                "kill process",
                node.account().signal(pid, Signal::Kill).await,
            );
            if kill_result.is_ok() {
                kill_result = result;
            }
        }

        let mut paths = vec![self.layout.pid_file()];
        if self.layout.preserve_logs() {
            info!(node = %node, log = %self.layout.log_file(), "preserve flag set; keeping copycat log");
        } else {
            paths.push(self.layout.log_file());
        }
        paths.push(self.layout.worker_config());
        paths.extend(self.config_filenames());
        paths.extend(self.files.iter().cloned());

        info!(node = %node, files = paths.len(), "cleaning copycat node");
        let removed = fail_loud(
            node,
            "remove copycat files",
            node.account()
                .ssh(&format!("rm -rf {}", paths.join(" ")))
                .await,
        );

        kill_result.and(removed)
    }

    /// Writes the configs to `node`, launches the worker and waits for it to
    /// report startup.
    pub(crate) async fn launch(
        &self,
        node: &Node,
        mode: WorkerMode,
        submit_connectors: bool,
        context: &TemplateContext<'_>,
    ) -> Result<(), ServiceError> {
        let configs = self.configs.as_ref().ok_or(ServiceError::ConfigsNotSet)?;
        let account = node.account();

        let worker = render("worker config", &configs.worker, context)?;
        fail_loud(
            node,
            "write worker config",
            account
                .create_file(&self.layout.worker_config(), &worker)
                .await,
        )?;

        let mut remote_connector_configs = Vec::with_capacity(configs.connectors.len());
        for (index, template) in configs.connectors.iter().enumerate() {
            let target = self.layout.connector_config(index);
            let rendered = render(&format!("connector config {index}"), template, context)?;
            fail_loud(
                node,
                "write connector config",
                account.create_file(&target, &rendered).await,
            )?;
            remote_connector_configs.push(target);
        }

        let submitted: &[String] = if submit_connectors {
            &remote_connector_configs
        } else {
            &[]
        };
        let command = self.layout.launch_command(mode, submitted);

        info!(node = %node, mode = mode.label(), connectors = submitted.len(), "starting copycat process");

        let monitor = node.monitor_log(&self.layout.log_file()).await;
        fail_loud(node, "launch copycat", account.ssh(&command).await)?;
        monitor
            .wait_until(
                STARTUP_MARKER,
                self.layout.startup_timeout(),
                "Never saw message indicating Copycat finished startup",
            )
            .await
            .map_err(|source| ServiceError::Startup {
                node: node.name().to_owned(),
                source,
            })?;

        if self.pids(node).await.is_empty() {
            return Err(ServiceError::NoProcessIds {
                node: node.name().to_owned(),
            });
        }

        Ok(())
    }

    pub(crate) fn template_context<'a>(
        &'a self,
        node: &'a Node,
        topics: Option<(&'a str, &'a str)>,
    ) -> TemplateContext<'a> {
        TemplateContext {
            bootstrap_servers: self.broker.bootstrap_servers(),
            node: node.name(),
            offsets_topic: topics.map(|(offsets, _)| offsets),
            configs_topic: topics.map(|(_, configs)| configs),
        }
    }
}
