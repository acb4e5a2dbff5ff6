use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::internal::cloud::{CloudImageDescription, InstanceTypeConfig};
use crate::internal::resources::ResourceDescription;

/// Maximum time to wait for workers to confirm a stop, `None` waits forever.
pub fn get_shutdown_timeout() -> Option<Duration> {
    get_duration_from_env("FLEET_SHUTDOWN_TIMEOUT_MS")
}

fn get_duration_from_env(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticWorkerConfig {
    pub name: String,
    pub description: ResourceDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(pattern = "owned")]
pub struct ProviderConfig {
    #[builder(setter(into))]
    pub name: String,
    #[builder(default)]
    #[serde(default)]
    pub limit_of_vms: Option<u32>,
    #[builder(default)]
    #[serde(default)]
    pub images: Vec<CloudImageDescription>,
    #[builder(default)]
    #[serde(default)]
    pub instance_types: Vec<InstanceTypeConfig>,
    /// Names of the catalogue images this runtime may use, empty means all of them
    #[builder(default)]
    #[serde(default)]
    pub use_images: Vec<String>,
    /// Names of the catalogue instance types this runtime may use, empty means all of them
    #[builder(default)]
    #[serde(default)]
    pub use_types: Vec<String>,
}

/// Raw elasticity bounds as written by the user, clamped by the cloud manager.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudBounds {
    pub min_vms: Option<i64>,
    pub initial_vms: Option<i64>,
    pub max_vms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(pattern = "owned")]
pub struct FleetConfig {
    #[builder(default)]
    #[serde(default)]
    pub workers: Vec<StaticWorkerConfig>,
    #[builder(default)]
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[builder(default)]
    #[serde(default)]
    pub bounds: CloudBounds,
    #[builder(default = "get_shutdown_timeout()")]
    #[serde(default = "get_shutdown_timeout")]
    pub shutdown_timeout: Option<Duration>,
}
