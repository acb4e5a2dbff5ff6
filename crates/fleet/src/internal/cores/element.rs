use serde::{Deserialize, Serialize};

use crate::internal::resources::ResourceDescription;
use crate::{CoreId, ImplId};

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    #[default]
    Method,
    Service,
    Http,
}

/// Implementation as provided by the application loader, before it gets an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationDefinition {
    pub signature: String,
    pub requirements: ResourceDescription,
    #[serde(default)]
    pub task_type: TaskType,
}

impl ImplementationDefinition {
    pub fn method(signature: impl Into<String>, requirements: ResourceDescription) -> Self {
        ImplementationDefinition {
            signature: signature.into(),
            requirements,
            task_type: TaskType::Method,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Implementation {
    pub(crate) core_id: CoreId,
    pub(crate) impl_id: ImplId,
    pub(crate) signature: String,
    pub(crate) requirements: ResourceDescription,
    pub(crate) task_type: TaskType,
}

impl Implementation {
    pub fn core_id(&self) -> CoreId {
        self.core_id
    }

    pub fn impl_id(&self) -> ImplId {
        self.impl_id
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn requirements(&self) -> &ResourceDescription {
        &self.requirements
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Only method implementations run on fleet workers.
    pub fn can_run_on(&self, description: &ResourceDescription) -> bool {
        self.task_type == TaskType::Method && description.contains(&self.requirements)
    }

    pub fn simultaneous_on(&self, description: &ResourceDescription) -> u32 {
        if self.task_type == TaskType::Method {
            description.can_host_simultaneously(&self.requirements)
        } else {
            0
        }
    }
}

/// Core element as provided by the application loader (upsert form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreElementDefinition {
    pub signature: String,
    #[serde(default)]
    pub implementations: Vec<ImplementationDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreElement {
    pub(crate) id: CoreId,
    pub(crate) signature: String,
    pub(crate) implementations: Vec<Implementation>,
}

impl CoreElement {
    pub(crate) fn new(id: CoreId, signature: String) -> Self {
        CoreElement {
            id,
            signature,
            implementations: Vec::new(),
        }
    }

    pub fn id(&self) -> CoreId {
        self.id
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn implementations(&self) -> &[Implementation] {
        &self.implementations
    }

    pub fn implementation(&self, impl_id: ImplId) -> Option<&Implementation> {
        self.implementations.get(usize::from(impl_id))
    }

    pub fn has_implementation(&self, signature: &str) -> bool {
        self.implementations.iter().any(|i| i.signature == signature)
    }

    pub(crate) fn push_implementation(&mut self, definition: ImplementationDefinition) -> ImplId {
        let impl_id = ImplId::new(self.implementations.len() as u32);
        self.implementations.push(Implementation {
            core_id: self.id,
            impl_id,
            signature: definition.signature,
            requirements: definition.requirements,
            task_type: definition.task_type,
        });
        impl_id
    }

    pub fn is_executable_on(&self, description: &ResourceDescription) -> bool {
        self.implementations.iter().any(|i| i.can_run_on(description))
    }
}
