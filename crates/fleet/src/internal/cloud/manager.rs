use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use derive_more::{Add, AddAssign, Sum};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::CoreId;
use crate::internal::cloud::connector::Connector;
use crate::internal::cloud::provider::CloudProvider;
use crate::internal::cloud::request::{ResourceCreationListener, ResourceCreationRequest};
use crate::internal::common::Map;
use crate::internal::common::data_structures::sorted_keys;
use crate::internal::cores::CoreRegistry;
use crate::internal::resources::ResourceDescription;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize, Add, AddAssign, Sum,
)]
pub struct Cost(f64);

impl Cost {
    pub fn new(value: f64) -> Self {
        Cost(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Elasticity bounds on the number of cloud VMs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VmBounds {
    min: u32,
    initial: u32,
    max: u32,
}

impl Default for VmBounds {
    fn default() -> Self {
        VmBounds {
            min: 0,
            initial: 0,
            max: u32::MAX,
        }
    }
}

fn clamp_bound(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Owner of all cloud providers and of the elasticity bounds.
#[derive(Default)]
pub struct CloudManager {
    providers: RwLock<Map<String, Arc<CloudProvider>>>,
    bounds: Mutex<VmBounds>,
    use_cloud: AtomicBool,
}

impl CloudManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn bounds(&self) -> std::sync::MutexGuard<'_, VmBounds> {
        self.bounds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_cloud_enabled(&self) -> bool {
        self.use_cloud.load(Ordering::SeqCst)
    }

    /// `None` keeps the current value, zero or negative values become 0.
    pub fn set_min_vms(&self, min: Option<i64>) {
        let Some(min) = min else { return };
        let mut bounds = self.bounds();
        bounds.min = clamp_bound(min);
        if bounds.min > bounds.max {
            log::warn!(
                "Cloud: MaxVMs ({}) is lower than MinVMs ({}). The current MaxVMs value is ignored until MinVMs is lower than it",
                bounds.max,
                bounds.min
            );
        }
    }

    pub fn set_max_vms(&self, max: Option<i64>) {
        let Some(max) = max else { return };
        let mut bounds = self.bounds();
        bounds.max = clamp_bound(max);
        if bounds.min > bounds.max {
            log::warn!(
                "Cloud: MaxVMs ({}) is lower than MinVMs ({}). The current MaxVMs value is ignored until MinVMs is lower than it",
                bounds.max,
                bounds.min
            );
        }
    }

    pub fn set_initial_vms(&self, initial: Option<i64>) {
        let Some(initial) = initial else { return };
        self.bounds().initial = clamp_bound(initial);
    }

    pub fn set_bounds(&self, min: Option<i64>, initial: Option<i64>, max: Option<i64>) {
        self.set_min_vms(min);
        self.set_max_vms(max);
        self.set_initial_vms(initial);
    }

    pub fn min_vms(&self) -> u32 {
        self.bounds().min
    }

    /// Configured maximum, or the minimum while the maximum is lower than it.
    pub fn max_vms(&self) -> u32 {
        let bounds = self.bounds();
        bounds.max.max(bounds.min)
    }

    pub fn initial_vms(&self) -> u32 {
        let bounds = self.bounds();
        bounds.initial.min(bounds.max).max(bounds.min)
    }

    /// Registers a provider and turns the cloud on.
    ///
    /// Returns `None` when a provider with the same name is already registered; the
    /// existing provider is kept.
    pub fn register_provider(
        &self,
        name: &str,
        limit_of_vms: Option<u32>,
        connector: Arc<dyn Connector>,
    ) -> Option<Arc<CloudProvider>> {
        let mut providers = self.providers.write().unwrap_or_else(PoisonError::into_inner);
        if providers.contains_key(name) {
            log::warn!("Cloud provider {name} is already registered, ignoring the new definition");
            return None;
        }
        let provider = Arc::new(CloudProvider::new(name, limit_of_vms, connector));
        providers.insert(name.to_string(), provider.clone());
        self.use_cloud.store(true, Ordering::SeqCst);
        log::info!("Cloud provider {name} registered");
        Some(provider)
    }

    pub fn provider(&self, name: &str) -> Option<Arc<CloudProvider>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Providers in name order.
    pub fn providers(&self) -> Vec<Arc<CloudProvider>> {
        let providers = self.providers.read().unwrap_or_else(PoisonError::into_inner);
        sorted_keys(&*providers)
            .iter()
            .map(|name| providers[name].clone())
            .collect()
    }

    pub fn current_vm_count(&self) -> u32 {
        self.providers().iter().map(|p| p.current_vm_count()).sum()
    }

    /// True while the fleet may still grow by one more VM.
    pub fn can_create_more(&self) -> bool {
        self.is_cloud_enabled() && self.current_vm_count() < self.max_vms()
    }

    /// Requests the cheapest machine able to run `amount` copies of `requirements`.
    pub fn ask_for_resources(
        &self,
        amount: u32,
        requirements: &ResourceDescription,
        contained: bool,
        listener: Option<Arc<dyn ResourceCreationListener>>,
        registry: &CoreRegistry,
    ) -> Option<ResourceCreationRequest> {
        if !self.can_create_more() {
            log::debug!("Cloud cannot grow, {} VMs already running", self.current_vm_count());
            return None;
        }
        let (provider, description) = self
            .providers()
            .into_iter()
            .filter(|p| p.can_host_more_instances())
            .filter_map(|p| {
                p.best_increase(amount, requirements, contained)
                    .map(|description| (p, description))
            })
            .min_by(|(_, a), (_, b)| a.cost_per_hour().total_cmp(&b.cost_per_hour()))?;
        provider.request_resource_creation(description, listener, registry)
    }

    pub fn pending_requests(&self) -> Vec<ResourceCreationRequest> {
        self.providers()
            .iter()
            .flat_map(|p| p.pending_requests())
            .collect()
    }

    /// Per-core slots that will exist once all pending requests are created.
    pub fn pending_core_counts(&self, core_count: usize) -> Vec<u32> {
        let mut counts = vec![0; core_count];
        for provider in self.providers() {
            for (total, count) in counts.iter_mut().zip(provider.pending_core_counts(core_count)) {
                *total += count;
            }
        }
        counts
    }

    pub fn core_elements_updated(&self, registry: &CoreRegistry, cores: &[CoreId]) {
        for provider in self.providers() {
            provider.core_elements_updated(registry, cores);
        }
    }

    pub fn current_cost_per_hour(&self) -> Cost {
        self.providers()
            .iter()
            .map(|p| Cost(p.current_cost_per_hour()))
            .sum()
    }

    pub fn total_cost(&self) -> Cost {
        self.providers().iter().map(|p| Cost(p.total_cost())).sum()
    }

    /// Shortest expected creation time over all providers.
    pub fn next_creation_time(&self) -> crate::Result<Option<Duration>> {
        let mut best: Option<Duration> = None;
        for provider in self.providers() {
            let time = provider.next_creation_time()?;
            best = Some(best.map_or(time, |b| b.min(time)));
        }
        Ok(best)
    }

    pub fn time_slot(&self) -> crate::Result<Option<Duration>> {
        let mut best: Option<Duration> = None;
        for provider in self.providers() {
            let slot = provider.time_slot()?;
            best = Some(best.map_or(slot, |b| b.min(slot)));
        }
        Ok(best)
    }

    pub fn stop_reached(&self) {
        for provider in self.providers() {
            provider.stop_reached();
        }
    }

    /// Terminates the machines of every provider. Failures are logged and do not stop the
    /// remaining providers; the number of failed providers is returned.
    pub fn terminate_all(&self) -> usize {
        let mut failed = 0;
        for provider in self.providers() {
            if let Err(error) = provider.terminate_all() {
                log::error!(
                    "Could not terminate machines of provider {}: {error:#}",
                    provider.name()
                );
                failed += 1;
            }
        }
        failed
    }

    /// Forgets every provider and resets the bounds. Machines are left alone.
    pub fn clear(&self) {
        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.bounds() = VmBounds::default();
        self.use_cloud.store(false, Ordering::SeqCst);
    }

    pub(crate) fn dump(&self) -> serde_json::Value {
        json!({
            "enabled": self.is_cloud_enabled(),
            "min_vms": self.min_vms(),
            "initial_vms": self.initial_vms(),
            "max_vms": self.max_vms(),
            "current_vms": self.current_vm_count(),
            "current_cost_per_hour": self.current_cost_per_hour(),
            "total_cost": self.total_cost(),
            "providers": self.providers().iter().map(|p| p.dump()).collect::<Vec<_>>(),
        })
    }
}
