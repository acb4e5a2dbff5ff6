use serde::{Deserialize, Serialize};

use crate::CoreId;
use crate::internal::common::Map;
use crate::internal::common::data_structures::sorted_keys;
use crate::internal::cores::{CoreRegistry, SlotMatrix};
use crate::internal::resources::ResourceDescription;

pub const NO_TYPE_NAME: &str = "NO TYPE";

#[derive(Debug, Clone, PartialEq)]
pub struct CloudInstanceTypeDescription {
    name: String,
    description: ResourceDescription,
    slots: SlotMatrix,
}

impl CloudInstanceTypeDescription {
    pub fn new(name: impl Into<String>, description: ResourceDescription) -> Self {
        CloudInstanceTypeDescription {
            name: name.into(),
            description,
            slots: SlotMatrix::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &ResourceDescription {
        &self.description
    }

    /// Simultaneous slots per core element and implementation on one instance.
    pub fn slots(&self) -> &SlotMatrix {
        &self.slots
    }
}

/// Serialized form of an instance type in the provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceTypeConfig {
    pub name: String,
    pub description: ResourceDescription,
}

/// Instance type catalogue of a cloud provider.
#[derive(Debug, Default)]
pub struct CloudTypeManager {
    types: Map<String, CloudInstanceTypeDescription>,
}

impl CloudTypeManager {
    pub fn add(
        &mut self,
        mut instance_type: CloudInstanceTypeDescription,
        registry: &CoreRegistry,
    ) {
        instance_type.slots = SlotMatrix::compute(&instance_type.description, registry);
        self.types.insert(instance_type.name.clone(), instance_type);
    }

    pub fn get(&self, name: &str) -> Option<&CloudInstanceTypeDescription> {
        self.types.get(name)
    }

    /// Types in name order.
    pub fn all(&self) -> Vec<&CloudInstanceTypeDescription> {
        sorted_keys(&self.types)
            .iter()
            .map(|name| &self.types[name])
            .collect()
    }

    /// Types whose capacity contains `requested`.
    ///
    /// An empty catalogue yields a single synthetic type wrapping the request itself.
    pub fn compatible_types(
        &self,
        requested: &ResourceDescription,
    ) -> Vec<CloudInstanceTypeDescription> {
        if self.types.is_empty() {
            return vec![CloudInstanceTypeDescription::new(
                NO_TYPE_NAME,
                requested.clone(),
            )];
        }
        self.all()
            .into_iter()
            .filter(|t| t.description.contains(requested))
            .cloned()
            .collect()
    }

    pub fn core_elements_updated(&mut self, registry: &CoreRegistry, cores: &[CoreId]) {
        for instance_type in self.types.values_mut() {
            instance_type
                .slots
                .update_cores(&instance_type.description, registry, cores);
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
