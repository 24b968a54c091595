pub mod copycat;

pub use copycat::{
    BrokerHandle, CopycatLayout, DistributedService, ServiceBase, ServiceError, StandaloneService,
    WorkerMode,
};
