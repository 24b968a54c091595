use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::nodes::{AccountError, Node};

/// A log file a service exposes as a test artifact.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogSpec {
    pub name: &'static str,
    pub path: String,
    pub collect_default: bool,
}

/// Lifecycle surface of a multi-node service under test.
///
/// Implementors provide the per-node operations; whole-service operations
/// walk `nodes()` strictly in order and stop at the first failure without
/// compensating for nodes already handled.
#[async_trait]
pub trait Service: Send + Sync {
    type Error: std::error::Error + From<AccountError> + Send + Sync + 'static;

    fn nodes(&self) -> &[Node];

    fn logs(&self) -> Vec<LogSpec>;

    async fn start_node(&mut self, node: &Node) -> Result<(), Self::Error>;

    async fn stop_node(&self, node: &Node, clean_shutdown: bool) -> Result<(), Self::Error>;

    async fn clean_node(&self, node: &Node) -> Result<(), Self::Error>;

    async fn start(&mut self) -> Result<(), Self::Error> {
        let nodes = self.nodes().to_vec();
        for node in &nodes {
            self.start_node(node).await?;
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), Self::Error> {
        for node in self.nodes() {
            self.stop_node(node, true).await?;
        }
        Ok(())
    }

    /// Gracefully stops then starts every node, one node at a time.
    async fn restart(&mut self) -> Result<(), Self::Error> {
        let nodes = self.nodes().to_vec();
        for node in &nodes {
            info!(node = %node, "restarting node");
            self.stop_node(node, true).await?;
            self.start_node(node).await?;
        }
        Ok(())
    }

    async fn clean(&self) -> Result<(), Self::Error> {
        for node in self.nodes() {
            self.clean_node(node).await?;
        }
        Ok(())
    }

    /// Copies every default-collected log of every node into
    /// `dest/<node>/<file name>`.
    async fn collect_logs(&self, dest: &Path) -> Result<Vec<PathBuf>, Self::Error> {
        let logs = self.logs();
        let mut collected = Vec::new();

        for node in self.nodes() {
            let node_dir = dest.join(node.name());
            fs::create_dir_all(&node_dir)
                .await
                .map_err(|source| AccountError::Io {
                    host: node.name().to_owned(),
                    path: node_dir.clone(),
                    source,
                })?;

            for log in logs.iter().filter(|log| log.collect_default) {
                let file_name = Path::new(&log.path)
                    .file_name()
                    .map_or_else(|| PathBuf::from(log.name), PathBuf::from);
                let target = node_dir.join(file_name);

                debug!(node = %node, log = log.name, target = %target.display(), "collecting log");
                node.account().copy_from(&log.path, &target).await?;
                collected.push(target);
            }
        }

        Ok(collected)
    }
}
