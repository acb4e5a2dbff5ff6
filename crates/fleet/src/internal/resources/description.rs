use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub type ComputingUnits = u32;

#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProcessorType {
    #[default]
    Cpu,
    Gpu,
    Fpga,
    Other,
}

/// Custom key/value tag of a processor (e.g. `"vendor" = "intel"`).
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProcessorProperty {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Processor {
    pub name: Option<String>,
    pub architecture: Option<String>,
    pub kind: ProcessorType,
    /// GHz
    pub speed: Option<f64>,
    /// GB
    pub internal_memory: Option<f64>,
    #[serde(default)]
    pub property: ProcessorProperty,
    pub computing_units: ComputingUnits,
}

impl Default for Processor {
    fn default() -> Self {
        Processor {
            name: None,
            architecture: None,
            kind: ProcessorType::Cpu,
            speed: None,
            internal_memory: None,
            property: Default::default(),
            computing_units: 1,
        }
    }
}

impl Processor {
    pub fn new(kind: ProcessorType, computing_units: ComputingUnits) -> Self {
        Processor {
            kind,
            computing_units,
            ..Default::default()
        }
    }
}

pub type ProcessorList = SmallVec<[Processor; 2]>;

/// Capability profile of a worker or requirement profile of an implementation.
///
/// `None` stands for an unassigned attribute; an unassigned attribute never restricts matching,
/// on either side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceDescription {
    pub processors: ProcessorList,

    /// GB
    pub memory_size: Option<f64>,
    pub memory_type: Option<String>,

    /// GB
    pub storage_size: Option<f64>,
    pub storage_type: Option<String>,
    /// MB/s
    pub storage_bandwidth: Option<u32>,

    pub os_type: Option<String>,
    pub os_distribution: Option<String>,
    pub os_version: Option<String>,

    pub app_software: Vec<String>,
    pub host_queues: Vec<String>,

    pub price_per_unit: Option<f64>,
    /// Minutes
    pub price_time_unit: Option<u32>,
    /// Seconds
    pub wall_clock_limit: Option<u32>,

    /// Cost per hour of the resource, used to order dynamic workers
    pub value: f64,
}

impl ResourceDescription {
    /// Single CPU processor with the given number of computing units.
    pub fn cpus(computing_units: ComputingUnits) -> Self {
        ResourceDescription {
            processors: smallvec::smallvec![Processor::new(ProcessorType::Cpu, computing_units)],
            ..Default::default()
        }
    }

    pub fn total_computing_units(&self, kind: ProcessorType) -> ComputingUnits {
        self.processors
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.computing_units)
            .sum()
    }

    pub fn add_processor(&mut self, processor: Processor) {
        self.processors.push(processor);
    }

    /// Adds the dynamic capacity (computing units, memory, storage bandwidth) of `other`.
    ///
    /// Units of a processor in `other` are merged into the first compatible processor,
    /// processors without a compatible counterpart are appended.
    pub fn increase_dynamic(&mut self, other: &ResourceDescription) {
        for p in &other.processors {
            match self
                .processors
                .iter_mut()
                .find(|own| own.is_compatible_with(p))
            {
                Some(own) => own.computing_units += p.computing_units,
                None => self.processors.push(p.clone()),
            }
        }
        if let (Some(own), Some(extra)) = (self.memory_size.as_mut(), other.memory_size) {
            *own += extra;
        }
        if let (Some(own), Some(extra)) = (self.storage_bandwidth.as_mut(), other.storage_bandwidth)
        {
            *own += extra;
        }
    }

    /// Removes the dynamic capacity of `other` and returns what was actually removed.
    ///
    /// Returns `None` and leaves `self` untouched when `other` does not fit into the
    /// current capacity.
    pub fn reduce_dynamic(&mut self, other: &ResourceDescription) -> Option<ResourceDescription> {
        let mut remaining = self.clone();
        let mut reduced = ResourceDescription::default();

        for p in &other.processors {
            let index = remaining.processors.iter().position(|own| {
                own.is_compatible_with(p) && own.computing_units >= p.computing_units
            })?;
            let own = &mut remaining.processors[index];
            let mut removed = own.clone();
            removed.computing_units = p.computing_units;
            reduced.processors.push(removed);
            own.computing_units -= p.computing_units;
            if own.computing_units == 0 {
                remaining.processors.remove(index);
            }
        }

        if !remaining.memory_fits(other) || !remaining.storage_fits(other) {
            return None;
        }
        reduced.memory_type = remaining.memory_type.clone();
        if let (Some(own), Some(amount)) = (remaining.memory_size.as_mut(), other.memory_size) {
            *own -= amount;
            reduced.memory_size = Some(amount);
        }
        reduced.storage_type = remaining.storage_type.clone();
        if let (Some(own), Some(amount)) =
            (remaining.storage_bandwidth.as_mut(), other.storage_bandwidth)
        {
            *own -= amount;
            reduced.storage_bandwidth = Some(amount);
        }

        *self = remaining;
        Some(reduced)
    }

    /// True when there is no dynamic capacity left to run anything.
    pub fn is_dynamic_useless(&self) -> bool {
        self.memory_size.unwrap_or(0.0) <= 0.0
            && self.total_computing_units(ProcessorType::Cpu) < 1
            && self.total_computing_units(ProcessorType::Gpu) < 1
            && self.storage_bandwidth.unwrap_or(0) == 0
    }

    /// Capacity needed to run `amount` copies of this description at once.
    pub fn multiply(&self, amount: u32) -> ResourceDescription {
        let mut result = ResourceDescription {
            processors: self.processors.clone(),
            memory_size: self.memory_size.map(|m| m * amount as f64),
            memory_type: self.memory_type.clone(),
            storage_size: self.storage_size.map(|s| s * amount as f64),
            storage_type: self.storage_type.clone(),
            storage_bandwidth: self.storage_bandwidth.map(|b| b * amount),
            ..Default::default()
        };
        for p in result.processors.iter_mut() {
            p.computing_units *= amount;
        }
        result
    }
}
