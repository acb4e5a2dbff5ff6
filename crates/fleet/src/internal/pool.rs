use std::cmp::Ordering;

use serde_json::json;

use crate::internal::common::data_structures::sorted_keys;
use crate::internal::common::{Map, Set};
use crate::internal::cores::CoreSlots;
use crate::internal::worker::Worker;
use crate::{CoreId, ImplId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Static,
    Critical,
    NonCritical,
}

/// Known workers split into three disjoint partitions.
///
/// After every recomputation, every core element executable by some worker of the pool is
/// executable by the static and critical workers alone, so non-critical workers can always
/// be released without losing coverage.
#[derive(Default, Debug)]
pub struct WorkerPool {
    static_workers: Map<String, Worker>,
    critical: Map<String, Worker>,
    non_critical: Map<String, Worker>,
    sequence: u64,
}

fn by_priority(a: &Worker, b: &Worker) -> Ordering {
    a.cost_per_hour()
        .total_cmp(&b.cost_per_hour())
        .then(a.sequence.cmp(&b.sequence))
}

impl WorkerPool {
    fn next_sequence(&mut self) -> u64 {
        let value = self.sequence;
        self.sequence += 1;
        value
    }

    pub fn add_static(&mut self, mut worker: Worker) {
        assert!(!self.contains(worker.name()), "Worker {} already in the pool", worker.name());
        worker.sequence = self.next_sequence();
        self.static_workers.insert(worker.name().to_string(), worker);
    }

    /// New dynamic workers are critical until the next recomputation.
    pub fn add_dynamic(&mut self, mut worker: Worker) {
        assert!(!self.contains(worker.name()), "Worker {} already in the pool", worker.name());
        worker.sequence = self.next_sequence();
        self.critical.insert(worker.name().to_string(), worker);
    }

    pub fn remove(&mut self, name: &str) -> Option<Worker> {
        self.static_workers
            .remove(name)
            .or_else(|| self.critical.remove(name))
            .or_else(|| self.non_critical.remove(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.partition_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Worker> {
        self.static_workers
            .get(name)
            .or_else(|| self.critical.get(name))
            .or_else(|| self.non_critical.get(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Worker> {
        if let Some(w) = self.static_workers.get_mut(name) {
            return Some(w);
        }
        if let Some(w) = self.critical.get_mut(name) {
            return Some(w);
        }
        self.non_critical.get_mut(name)
    }

    pub fn partition_of(&self, name: &str) -> Option<Partition> {
        if self.static_workers.contains_key(name) {
            Some(Partition::Static)
        } else if self.critical.contains_key(name) {
            Some(Partition::Critical)
        } else if self.non_critical.contains_key(name) {
            Some(Partition::NonCritical)
        } else {
            None
        }
    }

    /// Re-runs the coverage algorithm over all dynamic workers.
    ///
    /// Dynamic workers are visited cheapest first (insertion order breaks ties); a worker is
    /// critical iff it runs a core element that neither the static workers nor the already
    /// accepted critical workers cover. Non-critical workers are promoted back when they
    /// become necessary again.
    pub fn recompute_critical_set(&mut self) {
        trace_time!("pool", "recompute_critical_set", {
            let mut covered: Set<CoreId> = Set::default();
            for worker in self.static_workers.values() {
                covered.extend(worker.executable_cores());
            }

            let was_critical: Set<String> = self.critical.keys().cloned().collect();
            let mut dynamic: Vec<Worker> = self
                .critical
                .drain()
                .chain(self.non_critical.drain())
                .map(|(_, w)| w)
                .collect();
            dynamic.sort_by(by_priority);

            for worker in dynamic {
                let mut needed = false;
                for core_id in worker.executable_cores() {
                    needed |= covered.insert(core_id);
                }
                let name = worker.name().to_string();
                if needed {
                    if !was_critical.contains(&name) {
                        log::debug!("Worker {name} promoted to critical");
                    }
                    self.critical.insert(name, worker);
                } else {
                    if was_critical.contains(&name) {
                        log::debug!("Worker {name} is no longer critical");
                    }
                    self.non_critical.insert(name, worker);
                }
            }
        })
    }

    /// Checks that after losing `loss[core][impl]` slots the critical workers alone still
    /// provide slots for every affected implementation.
    pub fn is_reduction_safe(&self, loss: &[Vec<u32>]) -> bool {
        for (core_idx, row) in loss.iter().enumerate() {
            let core_id = CoreId::new(core_idx as u32);
            for (impl_idx, lost) in row.iter().enumerate() {
                if *lost == 0 {
                    continue;
                }
                let impl_id = ImplId::new(impl_idx as u32);
                let available: u32 = self
                    .critical
                    .values()
                    .map(|w| w.slots().implementation(core_id, impl_id))
                    .sum();
                if available <= *lost {
                    log::debug!(
                        "Reduction of {lost} slots of {core_id}/{impl_id} is not safe, critical workers provide {available}"
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Sum of the per-core slots of all workers.
    pub fn core_slots(&self, core_count: usize) -> CoreSlots {
        let mut slots = CoreSlots::filled(0, core_count);
        for worker in self.all_workers() {
            for (idx, count) in worker.slots().core_slots().iter().enumerate().take(core_count) {
                slots[CoreId::new(idx as u32)] += count;
            }
        }
        slots
    }

    pub fn all_workers(&self) -> impl Iterator<Item = &Worker> {
        self.static_workers
            .values()
            .chain(self.critical.values())
            .chain(self.non_critical.values())
    }

    pub fn all_workers_mut(&mut self) -> impl Iterator<Item = &mut Worker> {
        self.static_workers
            .values_mut()
            .chain(self.critical.values_mut())
            .chain(self.non_critical.values_mut())
    }

    pub fn static_workers(&self) -> impl Iterator<Item = &Worker> {
        self.static_workers.values()
    }

    pub fn dynamic_workers(&self) -> impl Iterator<Item = &Worker> {
        self.critical.values().chain(self.non_critical.values())
    }

    pub fn critical_workers(&self) -> impl Iterator<Item = &Worker> {
        self.critical.values()
    }

    pub fn non_critical_workers(&self) -> impl Iterator<Item = &Worker> {
        self.non_critical.values()
    }

    pub fn executable_cores(&self, name: &str) -> Option<Vec<CoreId>> {
        self.get(name).map(|w| w.executable_cores().collect())
    }

    pub fn len(&self) -> usize {
        self.static_workers.len() + self.critical.len() + self.non_critical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn dump(&self) -> serde_json::Value {
        let dump_partition = |workers: &Map<String, Worker>| -> Vec<serde_json::Value> {
            sorted_keys(workers)
                .iter()
                .map(|name| workers[name].dump())
                .collect()
        };
        json!({
            "static": dump_partition(&self.static_workers),
            "critical": dump_partition(&self.critical),
            "non_critical": dump_partition(&self.non_critical),
        })
    }
}
