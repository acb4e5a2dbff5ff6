pub mod element;
pub mod registry;
pub mod slots;

pub use element::{
    CoreElement, CoreElementDefinition, Implementation, ImplementationDefinition, TaskType,
};
pub use registry::CoreRegistry;
pub use slots::{CoreSlots, SlotMatrix};
