mod service;

pub use service::{LogSpec, Service};
