use crate::internal::common::index::IndexVec;
use crate::internal::cores::element::CoreElement;
use crate::internal::cores::registry::CoreRegistry;
use crate::internal::resources::ResourceDescription;
use crate::{CoreId, ImplId};

pub type CoreSlots = IndexVec<CoreId, u32>;

/// How many instances of each implementation fit simultaneously into a resource.
///
/// `per_core[c]` is the maximum over the implementations of core `c`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotMatrix {
    per_impl: IndexVec<CoreId, Vec<u32>>,
    per_core: CoreSlots,
}

impl SlotMatrix {
    pub fn compute(description: &ResourceDescription, registry: &CoreRegistry) -> Self {
        registry.with_cores(|cores| {
            let mut matrix = SlotMatrix::default();
            for core in cores.iter() {
                matrix.push_core(description, core);
            }
            matrix
        })
    }

    fn push_core(&mut self, description: &ResourceDescription, core: &CoreElement) {
        let row: Vec<u32> = core
            .implementations()
            .iter()
            .map(|i| i.simultaneous_on(description))
            .collect();
        self.per_core.push(row.iter().copied().max().unwrap_or(0));
        self.per_impl.push(row);
    }

    fn set_core(&mut self, description: &ResourceDescription, core: &CoreElement) {
        let row: Vec<u32> = core
            .implementations()
            .iter()
            .map(|i| i.simultaneous_on(description))
            .collect();
        self.per_core[core.id()] = row.iter().copied().max().unwrap_or(0);
        self.per_impl[core.id()] = row;
    }

    /// Grows the matrix to the current registry size and recomputes the given cores.
    pub fn update_cores(
        &mut self,
        description: &ResourceDescription,
        registry: &CoreRegistry,
        updated: &[CoreId],
    ) {
        registry.with_cores(|cores| {
            self.per_core.resize(cores.len(), 0);
            self.per_impl.resize(cores.len(), Vec::new());
            for core_id in updated {
                if let Some(core) = cores.get_at(*core_id) {
                    self.set_core(description, core);
                }
            }
        })
    }

    #[inline]
    pub fn core(&self, core_id: CoreId) -> u32 {
        self.per_core.get_at(core_id).copied().unwrap_or(0)
    }

    #[inline]
    pub fn implementation(&self, core_id: CoreId, impl_id: ImplId) -> u32 {
        self.per_impl
            .get_at(core_id)
            .and_then(|row| row.get(usize::from(impl_id)))
            .copied()
            .unwrap_or(0)
    }

    pub fn core_slots(&self) -> &CoreSlots {
        &self.per_core
    }

    pub fn rows(&self) -> &IndexVec<CoreId, Vec<u32>> {
        &self.per_impl
    }

    pub fn core_count(&self) -> usize {
        self.per_core.len()
    }

    pub fn executable_cores(&self) -> impl Iterator<Item = CoreId> + '_ {
        self.per_core
            .iter()
            .enumerate()
            .filter(|(_, slots)| **slots > 0)
            .map(|(idx, _)| CoreId::new(idx as u32))
    }
}
