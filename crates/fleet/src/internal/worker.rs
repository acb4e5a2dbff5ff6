use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::CoreId;
use crate::internal::cores::{CoreRegistry, SlotMatrix};
use crate::internal::resources::ResourceDescription;
use crate::internal::shutdown::WorkerNode;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct WorkerFlags: u32 {
        // Phase one of the shutdown was issued, no new work may be started on the worker
        const EXECUTION_DISABLED = 0b00000001;
        // Stop was requested, waiting for the node to confirm
        const STOPPING = 0b00000010;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerKind {
    /// Comes from the fixed configuration and is never elastically destroyed
    Static,
    Dynamic,
    Cloud { provider: String },
}

impl WorkerKind {
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, WorkerKind::Static)
    }

    pub fn provider(&self) -> Option<&str> {
        match self {
            WorkerKind::Cloud { provider } => Some(provider.as_str()),
            _ => None,
        }
    }
}

pub struct Worker {
    name: String,
    kind: WorkerKind,
    description: ResourceDescription,
    slots: SlotMatrix,
    node: Option<Arc<dyn WorkerNode>>,

    pub(crate) flags: WorkerFlags,
    // Assigned by the pool, breaks ties between workers with the same cost
    pub(crate) sequence: u64,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("description", &self.description)
            .finish()
    }
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        kind: WorkerKind,
        description: ResourceDescription,
        node: Option<Arc<dyn WorkerNode>>,
    ) -> Self {
        Worker {
            name: name.into(),
            kind,
            description,
            slots: SlotMatrix::default(),
            node,
            flags: WorkerFlags::empty(),
            sequence: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &WorkerKind {
        &self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind.is_dynamic()
    }

    pub fn description(&self) -> &ResourceDescription {
        &self.description
    }

    pub fn slots(&self) -> &SlotMatrix {
        &self.slots
    }

    pub fn node(&self) -> Option<&Arc<dyn WorkerNode>> {
        self.node.as_ref()
    }

    /// Cost per hour, dynamic workers are kept critical cheapest first.
    pub fn cost_per_hour(&self) -> f64 {
        self.description.value
    }

    pub fn executable_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.slots.executable_cores()
    }

    pub fn should_be_stopped(&self) -> bool {
        self.description.is_dynamic_useless()
    }

    pub fn is_execution_disabled(&self) -> bool {
        self.flags.contains(WorkerFlags::EXECUTION_DISABLED)
    }

    pub(crate) fn update_slots(&mut self, registry: &CoreRegistry) {
        self.slots = SlotMatrix::compute(&self.description, registry);
    }

    pub(crate) fn update_cores(&mut self, registry: &CoreRegistry, cores: &[CoreId]) {
        self.slots.update_cores(&self.description, registry, cores);
    }

    pub(crate) fn description_mut(&mut self) -> &mut ResourceDescription {
        &mut self.description
    }

    pub fn info(&self) -> WorkerInfo {
        WorkerInfo {
            name: self.name.clone(),
            kind: self.kind.clone(),
            description: self.description.clone(),
            core_slots: self.slots.core_slots().to_vec(),
        }
    }

    pub(crate) fn dump(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "kind": self.kind,
            "flags": self.flags.bits(),
            "sequence": self.sequence,
            "cost_per_hour": self.cost_per_hour(),
            "core_slots": self.slots.core_slots().to_vec(),
            "description": self.description,
        })
    }
}

/// Snapshot of a worker handed to the resource user.
///
/// Notifications are delivered outside of the fleet lock, so the user never sees
/// the live worker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerInfo {
    pub name: String,
    pub kind: WorkerKind,
    pub description: ResourceDescription,
    pub core_slots: Vec<u32>,
}
