pub mod account;
pub mod common;

pub use account::{AccountError, LocalAccount, Node, NodeAccount, Signal, SshAccount};
pub use common::lifecycle::{
    monitor::LogMonitor,
    wait::{WaitError, wait_until},
};
