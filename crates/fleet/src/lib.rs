#![deny(clippy::await_holding_lock)]

#[macro_use]
pub mod internal;

pub use crate::internal::common::ids::{CoreId, ImplId};
pub use crate::internal::common::setup::setup_logging;
pub use crate::internal::common::{Map, Set};

pub use crate::internal::common::error::FleetError;
pub use crate::internal::manager::{FleetPlugins, ResourceManager};
pub use crate::internal::pool::Partition;
pub use crate::internal::shutdown::{ShutdownListener, WorkerNode};
pub use crate::internal::updates::{BusyAck, PendingReduction, ResourceUpdate, ResourceUser};
pub use crate::internal::worker::{Worker, WorkerInfo, WorkerKind};

pub type Error = FleetError;
pub type Result<T> = std::result::Result<T, Error>;

pub mod resources {
    pub use crate::internal::resources::{
        ComputingUnits, Processor, ProcessorList, ProcessorProperty, ProcessorType,
        ResourceDescription,
    };
}

pub mod cores {
    pub use crate::internal::cores::{
        CoreElement, CoreElementDefinition, CoreRegistry, CoreSlots, Implementation,
        ImplementationDefinition, SlotMatrix, TaskType,
    };
}

pub mod cloud {
    pub use crate::internal::cloud::{
        CloudImageDescription, CloudInstanceTypeDescription, CloudManager, CloudProvider,
        CloudResourceDescription, Connector, ConnectorResult, Cost, InstanceTypeConfig,
        NO_TYPE_NAME, ResourceCreationListener, ResourceCreationRequest, TypeComposition,
    };
}

pub mod config {
    pub use crate::internal::config::{
        CloudBounds, FleetConfig, FleetConfigBuilder, ProviderConfig, ProviderConfigBuilder,
        StaticWorkerConfig, get_shutdown_timeout,
    };
}
