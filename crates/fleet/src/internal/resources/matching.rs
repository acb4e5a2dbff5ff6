use crate::internal::resources::description::{Processor, ProcessorType, ResourceDescription};

/// Strings match when they are equal or when either side is unassigned.
#[inline]
fn compatible(candidate: &Option<String>, required: &Option<String>) -> bool {
    match (candidate, required) {
        (Some(c), Some(r)) => c == r,
        _ => true,
    }
}

/// Numeric capacities match when the candidate has at least the required amount
/// or when either side is unassigned.
#[inline]
fn included<T: PartialOrd>(candidate: Option<T>, required: Option<T>) -> bool {
    match (candidate, required) {
        (Some(c), Some(r)) => c >= r,
        _ => true,
    }
}

#[inline]
fn is_subset(candidate: &[String], required: &[String]) -> bool {
    required.iter().all(|r| candidate.contains(r))
}

impl Processor {
    /// Everything but the number of computing units matches.
    pub fn is_compatible_with(&self, required: &Processor) -> bool {
        compatible(&self.name, &required.name)
            && compatible(&self.architecture, &required.architecture)
            && included(self.speed, required.speed)
            && self.kind == required.kind
            && included(self.internal_memory, required.internal_memory)
            && compatible(&self.property.key, &required.property.key)
            && compatible(&self.property.value, &required.property.value)
    }

    fn contains(&self, required: &Processor) -> bool {
        self.is_compatible_with(required) && self.computing_units >= required.computing_units
    }
}

impl ResourceDescription {
    pub(crate) fn memory_fits(&self, required: &ResourceDescription) -> bool {
        included(self.memory_size, required.memory_size)
            && compatible(&self.memory_type, &required.memory_type)
    }

    pub(crate) fn storage_fits(&self, required: &ResourceDescription) -> bool {
        included(self.storage_size, required.storage_size)
            && compatible(&self.storage_type, &required.storage_type)
            && included(self.storage_bandwidth, required.storage_bandwidth)
    }

    pub(crate) fn os_fits(&self, required: &ResourceDescription) -> bool {
        compatible(&self.os_type, &required.os_type)
            && compatible(&self.os_distribution, &required.os_distribution)
            && compatible(&self.os_version, &required.os_version)
    }

    /// Every assigned attribute of `required` is matched or exceeded by `self`.
    pub fn contains(&self, required: &ResourceDescription) -> bool {
        self.os_fits(required)
            && is_subset(&self.host_queues, &required.host_queues)
            && is_subset(&self.app_software, &required.app_software)
            && required
                .processors
                .iter()
                .all(|r| self.processors.iter().any(|p| p.contains(r)))
            && self.memory_fits(required)
            && self.storage_fits(required)
    }

    /// How many instances of `required` can run inside `self` at the same time.
    ///
    /// Each numeric dimension is floor-divided and the minimum is taken. A requirement
    /// that does not constrain any numeric dimension fits exactly once.
    pub fn can_host_simultaneously(&self, required: &ResourceDescription) -> u32 {
        if !self.contains(required) {
            return 0;
        }
        let mut min: Option<u32> = None;
        let mut restrict = |ratio: u32| {
            min = Some(min.map_or(ratio, |m| m.min(ratio)));
        };

        for kind in [ProcessorType::Cpu, ProcessorType::Gpu, ProcessorType::Fpga] {
            let needed = required.total_computing_units(kind);
            if needed >= 1 {
                restrict(self.total_computing_units(kind) / needed);
            }
        }

        for r in required.processors.iter().filter(|r| r.computing_units > 0) {
            let best = self
                .processors
                .iter()
                .filter(|p| p.is_compatible_with(r))
                .map(|p| p.computing_units / r.computing_units)
                .max()
                .unwrap_or(0);
            restrict(best);
        }

        if let (Some(own), Some(needed)) = (self.memory_size, required.memory_size) {
            if needed > 0.0 {
                restrict((own / needed).floor() as u32);
            }
        }
        if let (Some(own), Some(needed)) = (self.storage_size, required.storage_size) {
            if needed > 0.0 {
                restrict((own / needed).floor() as u32);
            }
        }

        min.unwrap_or(1)
    }
}
