use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::internal::cloud::image::CloudImageDescription;
use crate::internal::cloud::instance_type::CloudInstanceTypeDescription;
use crate::internal::common::Map;
use crate::internal::cores::SlotMatrix;
use crate::internal::resources::ResourceDescription;

/// Instance type name -> number of machines of that type.
pub type TypeComposition = Map<String, u32>;

/// Cloud capacity booted from one image: the instance types it is made of, how many
/// machines of each type and the resulting capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudResourceDescription {
    instance_type: CloudInstanceTypeDescription,
    image: CloudImageDescription,
    description: ResourceDescription,
    composition: TypeComposition,
}

impl CloudResourceDescription {
    /// Capacity of the type with the OS, software, queues and price of the image.
    pub fn new(instance_type: CloudInstanceTypeDescription, image: CloudImageDescription) -> Self {
        let mut description = instance_type.description().clone();
        if image.os_type.is_some() {
            description.os_type = image.os_type.clone();
        }
        if image.os_distribution.is_some() {
            description.os_distribution = image.os_distribution.clone();
        }
        if image.os_version.is_some() {
            description.os_version = image.os_version.clone();
        }
        for software in &image.software {
            if !description.app_software.contains(software) {
                description.app_software.push(software.clone());
            }
        }
        for queue in &image.queues {
            if !description.host_queues.contains(queue) {
                description.host_queues.push(queue.clone());
            }
        }
        if image.price_per_unit.is_some() {
            description.price_per_unit = image.price_per_unit;
            description.price_time_unit = image.price_time_unit;
        }
        description.value += image.price_per_unit.unwrap_or(0.0);
        let mut composition = TypeComposition::default();
        composition.insert(instance_type.name().to_string(), 1);
        CloudResourceDescription {
            instance_type,
            image,
            description,
            composition,
        }
    }

    /// Same image and instance type with the given capacity and no machines, for
    /// reductions that shrink a machine without destroying it.
    pub fn partial(&self, description: ResourceDescription) -> Self {
        CloudResourceDescription {
            instance_type: self.instance_type.clone(),
            image: self.image.clone(),
            description,
            composition: TypeComposition::default(),
        }
    }

    /// Replaces the machines described, keeping the capacity.
    pub fn with_composition(mut self, composition: TypeComposition) -> Self {
        self.composition = composition;
        self
    }

    /// Adds the machines and capacity of `other`.
    pub fn increase(&mut self, other: &CloudResourceDescription) {
        for (name, count) in &other.composition {
            *self.composition.entry(name.clone()).or_insert(0) += count;
        }
        self.description.increase_dynamic(&other.description);
    }

    pub fn instance_type(&self) -> &CloudInstanceTypeDescription {
        &self.instance_type
    }

    pub fn image(&self) -> &CloudImageDescription {
        &self.image
    }

    pub fn description(&self) -> &ResourceDescription {
        &self.description
    }

    pub fn composition(&self) -> &TypeComposition {
        &self.composition
    }

    /// Number of machines described.
    pub fn vm_count(&self) -> u32 {
        self.composition.values().sum()
    }

    /// Cost per hour of one machine.
    pub fn cost_per_hour(&self) -> f64 {
        self.description.value
    }
}

/// Notified when a machine asked for through a creation request joins the fleet.
pub trait ResourceCreationListener: Send + Sync {
    fn notify_resource_creation(&self, worker: &str, requested: &CloudResourceDescription);
}

#[derive(Clone)]
pub struct ResourceCreationRequest {
    id: String,
    provider: String,
    requested: CloudResourceDescription,
    slots: SlotMatrix,
    requested_at: Instant,
    listener: Option<Arc<dyn ResourceCreationListener>>,
}

impl fmt::Debug for ResourceCreationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCreationRequest")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("type", &self.requested.instance_type().name())
            .field("image", &self.requested.image().name)
            .finish()
    }
}

impl ResourceCreationRequest {
    pub(crate) fn new(
        provider: &str,
        requested: CloudResourceDescription,
        slots: SlotMatrix,
        listener: Option<Arc<dyn ResourceCreationListener>>,
    ) -> Self {
        ResourceCreationRequest {
            id: format!("fleet{:016x}", rand::random::<u64>()),
            provider: provider.to_string(),
            requested,
            slots,
            requested_at: Instant::now(),
            listener,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn requested(&self) -> &CloudResourceDescription {
        &self.requested
    }

    /// Slots the machine will contribute once it is created.
    pub fn slots(&self) -> &SlotMatrix {
        &self.slots
    }

    pub(crate) fn slots_mut(&mut self) -> &mut SlotMatrix {
        &mut self.slots
    }

    pub fn requested_at(&self) -> Instant {
        self.requested_at
    }

    pub(crate) fn listener(&self) -> Option<&Arc<dyn ResourceCreationListener>> {
        self.listener.as_ref()
    }

    pub(crate) fn summary(&self) -> RequestSummary {
        RequestSummary {
            id: self.id.clone(),
            provider: self.provider.clone(),
            instance_type: self.requested.instance_type().name().to_string(),
            image: self.requested.image().name.clone(),
            vms: self.requested.vm_count(),
            pending_for_secs: self.requested_at.elapsed().as_secs_f64(),
            core_slots: self.slots.core_slots().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct RequestSummary {
    id: String,
    provider: String,
    instance_type: String,
    image: String,
    vms: u32,
    pending_for_secs: f64,
    core_slots: Vec<u32>,
}
