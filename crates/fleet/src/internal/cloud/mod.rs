pub mod connector;
pub mod image;
pub mod instance_type;
pub mod manager;
pub mod provider;
pub mod request;

pub use connector::{Connector, ConnectorResult};
pub use image::{CloudImageDescription, CloudImageManager};
pub use instance_type::{
    CloudInstanceTypeDescription, CloudTypeManager, InstanceTypeConfig, NO_TYPE_NAME,
};
pub use manager::{CloudManager, Cost};
pub use provider::CloudProvider;
pub use request::{
    CloudResourceDescription, ResourceCreationListener, ResourceCreationRequest, TypeComposition,
};
