use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::internal::common::Map;
use crate::internal::common::index::IndexVec;
use crate::internal::cores::element::{
    CoreElement, CoreElementDefinition, Implementation, ImplementationDefinition,
};
use crate::internal::resources::ResourceDescription;
use crate::{CoreId, FleetError, ImplId};

#[derive(Default, Debug)]
struct RegistryState {
    cores: IndexVec<CoreId, CoreElement>,
    signatures: Map<String, CoreId>,
}

impl RegistryState {
    fn allocate(&mut self, signature: String) -> CoreId {
        let core_id = CoreId::new(self.cores.len() as u32);
        self.signatures.insert(signature.clone(), core_id);
        self.cores.push(CoreElement::new(core_id, signature));
        core_id
    }
}

/// Table of the core elements known to the runtime and their implementations.
///
/// Core ids are dense and never reused; implementation lists only grow. The registry is
/// shared between the fleet components as an `Arc<CoreRegistry>`.
#[derive(Default, Debug)]
pub struct CoreRegistry {
    state: RwLock<RegistryState>,
}

impl CoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a core element without implementations.
    ///
    /// Returns `None` when the signature is empty or already registered.
    pub fn register_core_element(&self, signature: &str) -> Option<CoreElement> {
        if signature.is_empty() {
            log::warn!("Ignoring core element with an empty signature");
            return None;
        }
        let mut state = self.write();
        if state.signatures.contains_key(signature) {
            log::warn!("Core element {signature} is already registered");
            return None;
        }
        let core_id = state.allocate(signature.to_string());
        log::debug!("Registered core element {signature} as {core_id}");
        Some(state.cores[core_id].clone())
    }

    /// Registers a core element or merges new implementations into an existing one.
    ///
    /// Implementations are matched by their signature; already known implementations are
    /// left untouched.
    pub fn register_core_element_definition(
        &self,
        definition: CoreElementDefinition,
    ) -> Option<CoreElement> {
        if definition.signature.is_empty() {
            log::warn!("Ignoring core element definition with an empty signature");
            return None;
        }
        let mut state = self.write();
        let existing = state.signatures.get(&definition.signature).copied();
        let core_id = match existing {
            Some(core_id) => core_id,
            None => state.allocate(definition.signature.clone()),
        };
        let core = &mut state.cores[core_id];
        for implementation in definition.implementations {
            if implementation.signature.is_empty() {
                log::warn!(
                    "Ignoring implementation with an empty signature of {}",
                    core.signature
                );
                continue;
            }
            if core.has_implementation(&implementation.signature) {
                continue;
            }
            let impl_id = core.push_implementation(implementation);
            log::debug!(
                "Core element {} ({core_id}) got implementation {impl_id}",
                core.signature
            );
        }
        Some(core.clone())
    }

    /// Appends implementations to an existing core element, assigning sequential ids.
    pub fn add_implementations(
        &self,
        core_id: CoreId,
        implementations: Vec<ImplementationDefinition>,
    ) -> crate::Result<CoreElement> {
        if let Some(implementation) = implementations.iter().find(|i| i.signature.is_empty()) {
            return Err(FleetError::InvalidImplementation(format!(
                "implementation of core {core_id} with requirements {:?} has no signature",
                implementation.requirements
            )));
        }
        let mut state = self.write();
        let core = state
            .cores
            .get_mut(usize::from(core_id))
            .ok_or(FleetError::UnknownCore(core_id))?;
        for implementation in implementations {
            core.push_implementation(implementation);
        }
        Ok(core.clone())
    }

    pub fn lookup(&self, signature: &str) -> crate::Result<CoreElement> {
        let state = self.read();
        match state.signatures.get(signature) {
            Some(core_id) => Ok(state.cores[*core_id].clone()),
            None => {
                log::error!("Core element {signature} was requested but it is not registered");
                Err(FleetError::UnknownSignature(signature.to_string()))
            }
        }
    }

    pub fn get(&self, core_id: CoreId) -> Option<CoreElement> {
        self.read().cores.get_at(core_id).cloned()
    }

    pub fn implementations(&self, core_id: CoreId) -> crate::Result<Vec<Implementation>> {
        self.read()
            .cores
            .get_at(core_id)
            .map(|core| core.implementations.clone())
            .ok_or(FleetError::UnknownCore(core_id))
    }

    pub fn implementation_signature(&self, core_id: CoreId, impl_id: ImplId) -> Option<String> {
        self.read()
            .cores
            .get_at(core_id)
            .and_then(|core| core.implementation(impl_id))
            .map(|i| i.signature.clone())
    }

    /// Core elements with at least one implementation runnable on `description`.
    pub fn find_executable_cores(&self, description: &ResourceDescription) -> Vec<CoreElement> {
        self.read()
            .cores
            .iter()
            .filter(|core| core.is_executable_on(description))
            .cloned()
            .collect()
    }

    pub fn signatures_to_id(&self) -> Map<String, CoreId> {
        self.read().signatures.clone()
    }

    pub fn core_elements(&self) -> Vec<CoreElement> {
        self.read().cores.to_vec()
    }

    pub fn count(&self) -> usize {
        self.read().cores.len()
    }

    pub fn clear(&self) {
        let mut state = self.write();
        state.cores.clear();
        state.signatures.clear();
    }

    /// Runs `f` over the registered core elements without cloning them.
    pub(crate) fn with_cores<R>(&self, f: impl FnOnce(&IndexVec<CoreId, CoreElement>) -> R) -> R {
        f(&self.read().cores)
    }
}
