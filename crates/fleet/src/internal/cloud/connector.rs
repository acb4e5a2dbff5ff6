use std::time::Duration;

use crate::internal::cloud::request::{CloudResourceDescription, ResourceCreationRequest};

pub type ConnectorResult<T> = anyhow::Result<T>;

/// Plugin that talks to the API of one cloud provider.
///
/// `turn_on` only starts the provisioning. The connector reports the outcome later through
/// [`ResourceManager::add_cloud_worker`](crate::ResourceManager::add_cloud_worker) or
/// [`ResourceManager::refused_cloud_request`](crate::ResourceManager::refused_cloud_request),
/// usually from its own thread.
pub trait Connector: Send + Sync {
    fn turn_on(&self, request: &ResourceCreationRequest) -> ConnectorResult<()>;

    /// Releases `reduction` of the machines behind `worker`. Machines listed in the
    /// composition of `reduction` are destroyed, an empty composition only shrinks them.
    fn terminate(&self, worker: &str, reduction: &CloudResourceDescription)
    -> ConnectorResult<()>;

    fn terminate_all(&self) -> ConnectorResult<()>;

    /// Called once the runtime stops asking for new machines.
    fn stop_reached(&self) {}

    /// Expected time until a machine requested now becomes available.
    fn next_creation_time(&self) -> ConnectorResult<Duration>;

    /// Billing granularity of the provider.
    fn time_slot(&self) -> ConnectorResult<Duration>;

    fn current_cost_per_hour(&self) -> f64;

    /// Accumulated cost since the connector was created.
    fn total_cost(&self) -> f64;
}
