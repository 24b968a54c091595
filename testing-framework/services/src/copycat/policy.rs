//! The two ways remote failures are handled by the Copycat services.
//!
//! Reads of node state are best effort: a failure reads as "nothing there".
//! Writes and signals fail loud: a failure aborts the lifecycle call.

use copycat_testing_core::nodes::{AccountError, Node};
use tracing::{debug, warn};

use super::errors::ServiceError;

pub(crate) fn best_effort<T: Default>(
    node: &Node,
    operation: &'static str,
    result: Result<T, AccountError>,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) if err.is_command_failure() => {
            debug!(node = %node, operation, error = %err, "treating failed read as empty");
            T::default()
        }
        Err(err) => {
            warn!(node = %node, operation, error = %err, "transport failure while reading node state; treating as empty");
            T::default()
        }
    }
}

pub(crate) fn fail_loud<T>(
    node: &Node,
    operation: &'static str,
    result: Result<T, AccountError>,
) -> Result<T, ServiceError> {
    result.map_err(|source| ServiceError::Remote {
        operation,
        node: node.name().to_owned(),
        source,
    })
}
