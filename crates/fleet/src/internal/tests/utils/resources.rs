use crate::internal::resources::{Processor, ProcessorType, ResourceDescription};
pub use ResourceDescriptionBuilder as ResBuilder;

#[derive(Default, Clone)]
pub struct ResourceDescriptionBuilder {
    description: ResourceDescription,
}

impl ResourceDescriptionBuilder {
    fn processor(mut self, kind: ProcessorType, units: u32) -> Self {
        self.description
            .add_processor(Processor::new(kind, units));
        self
    }

    pub fn cpus(self, units: u32) -> Self {
        self.processor(ProcessorType::Cpu, units)
    }

    pub fn gpus(self, units: u32) -> Self {
        self.processor(ProcessorType::Gpu, units)
    }

    pub fn fpgas(self, units: u32) -> Self {
        self.processor(ProcessorType::Fpga, units)
    }

    pub fn memory(mut self, size: f64) -> Self {
        self.description.memory_size = Some(size);
        self
    }

    pub fn storage(mut self, size: f64) -> Self {
        self.description.storage_size = Some(size);
        self
    }

    pub fn os(mut self, kind: &str, distribution: Option<&str>, version: Option<&str>) -> Self {
        self.description.os_type = Some(kind.to_string());
        self.description.os_distribution = distribution.map(|d| d.to_string());
        self.description.os_version = version.map(|v| v.to_string());
        self
    }

    pub fn software(mut self, software: &[&str]) -> Self {
        self.description.app_software = software.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn queues(mut self, queues: &[&str]) -> Self {
        self.description.host_queues = queues.iter().map(|q| q.to_string()).collect();
        self
    }

    pub fn value(mut self, value: f64) -> Self {
        self.description.value = value;
        self
    }

    pub fn finish(self) -> ResourceDescription {
        self.description
    }
}
