use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use serde_json::json;

use crate::CoreId;
use crate::internal::cloud::connector::{Connector, ConnectorResult};
use crate::internal::cloud::image::{CloudImageDescription, CloudImageManager};
use crate::internal::cloud::instance_type::{CloudInstanceTypeDescription, CloudTypeManager};
use crate::internal::cloud::request::{
    CloudResourceDescription, ResourceCreationListener, ResourceCreationRequest, TypeComposition,
};
use crate::internal::common::Map;
use crate::internal::common::data_structures::sorted_keys;
use crate::internal::cores::{CoreRegistry, SlotMatrix};
use crate::internal::resources::ResourceDescription;

#[derive(Default)]
struct ProviderState {
    current_vms: u32,
    pending: Vec<ResourceCreationRequest>,
    // Worker name -> machines the worker runs on
    hosted: Map<String, TypeComposition>,
}

impl ProviderState {
    fn take_pending(&mut self, request_id: &str) -> Option<ResourceCreationRequest> {
        let index = self.pending.iter().position(|r| r.id() == request_id)?;
        Some(self.pending.remove(index))
    }
}

/// One elastic provider: its catalogues, its connector and the machines it is responsible for.
pub struct CloudProvider {
    name: String,
    limit_of_vms: Option<u32>,
    connector: Arc<dyn Connector>,
    images: RwLock<CloudImageManager>,
    types: RwLock<CloudTypeManager>,
    state: Mutex<ProviderState>,
}

impl CloudProvider {
    pub fn new(
        name: impl Into<String>,
        limit_of_vms: Option<u32>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        CloudProvider {
            name: name.into(),
            limit_of_vms,
            connector,
            images: Default::default(),
            types: Default::default(),
            state: Default::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn limit_of_vms(&self) -> Option<u32> {
        self.limit_of_vms
    }

    pub fn add_image(&self, image: CloudImageDescription) {
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(image);
    }

    pub fn add_instance_type(
        &self,
        instance_type: CloudInstanceTypeDescription,
        registry: &CoreRegistry,
    ) {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .add(instance_type, registry);
    }

    pub fn image(&self, name: &str) -> Option<CloudImageDescription> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn instance_type(&self, name: &str) -> Option<CloudInstanceTypeDescription> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn all_images(&self) -> Vec<CloudImageDescription> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .all()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn all_types(&self) -> Vec<CloudInstanceTypeDescription> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .all()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn compatible_images(
        &self,
        requested: &ResourceDescription,
    ) -> Vec<CloudImageDescription> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .compatible_images(requested)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn compatible_types(
        &self,
        requested: &ResourceDescription,
    ) -> Vec<CloudInstanceTypeDescription> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .compatible_types(requested)
    }

    pub fn current_vm_count(&self) -> u32 {
        self.lock().current_vms
    }

    fn has_room(&self, state: &ProviderState) -> bool {
        self.limit_of_vms
            .is_none_or(|limit| state.current_vms < limit)
    }

    pub fn can_host_more_instances(&self) -> bool {
        self.has_room(&self.lock())
    }

    /// Asks the connector for a new machine.
    ///
    /// The request is pending until the connector confirms or refuses it. Returns `None`
    /// and leaves the provider untouched when the VM limit is reached or the connector
    /// rejects the request right away.
    pub fn request_resource_creation(
        &self,
        requested: CloudResourceDescription,
        listener: Option<Arc<dyn ResourceCreationListener>>,
        registry: &CoreRegistry,
    ) -> Option<ResourceCreationRequest> {
        let slots = SlotMatrix::compute(requested.description(), registry);
        let request = ResourceCreationRequest::new(&self.name, requested, slots, listener);
        {
            let mut state = self.lock();
            if !self.has_room(&state) {
                log::warn!(
                    "Provider {} reached its limit of {} VMs, request refused",
                    self.name,
                    state.current_vms
                );
                return None;
            }
            state.current_vms += request.requested().vm_count();
            state.pending.push(request.clone());
        }

        if let Err(error) = self.connector.turn_on(&request) {
            log::warn!(
                "Provider {} could not start creating {}: {error:#}",
                self.name,
                request.id()
            );
            let mut state = self.lock();
            if let Some(request) = state.take_pending(request.id()) {
                state.current_vms = state
                    .current_vms
                    .saturating_sub(request.requested().vm_count());
            }
            return None;
        }
        log::info!(
            "Provider {} is creating {} ({} from {})",
            self.name,
            request.id(),
            request.requested().instance_type().name(),
            request.requested().image().name
        );
        Some(request)
    }

    /// The connector failed to create the machine of a pending request.
    pub fn refused_creation(&self, request_id: &str) -> Option<ResourceCreationRequest> {
        let mut state = self.lock();
        let request = state.take_pending(request_id);
        match &request {
            Some(request) => {
                state.current_vms = state
                    .current_vms
                    .saturating_sub(request.requested().vm_count());
            }
            None => log::warn!(
                "Provider {} refused unknown creation request {request_id}",
                self.name
            ),
        }
        request
    }

    /// The machines of a pending request are up and `granted` joins the fleet as (or is
    /// added to) `worker`.
    ///
    /// The VM count follows what the connector actually granted, which may differ from
    /// what was requested.
    pub fn confirmed_creation(
        &self,
        request_id: &str,
        worker: &str,
        granted: &CloudResourceDescription,
    ) -> Option<ResourceCreationRequest> {
        let mut state = self.lock();
        let request = state.take_pending(request_id);
        match &request {
            Some(request) => {
                state.current_vms = state
                    .current_vms
                    .saturating_sub(request.requested().vm_count())
                    + granted.vm_count();
                let hosted = state.hosted.entry(worker.to_string()).or_default();
                for (name, count) in granted.composition() {
                    *hosted.entry(name.clone()).or_insert(0) += count;
                }
            }
            None => log::warn!(
                "Provider {} confirmed unknown creation request {request_id}",
                self.name
            ),
        }
        request
    }

    /// Releases the machines in the composition of `reduction` and forwards the reduction
    /// to the connector. The worker stops being hosted once it runs on no machine.
    pub fn request_resource_reduction(&self, worker: &str, reduction: &CloudResourceDescription) {
        {
            let mut state = self.lock();
            state.current_vms = state.current_vms.saturating_sub(reduction.vm_count());
            match state.hosted.get_mut(worker) {
                Some(hosted) => {
                    for (name, count) in reduction.composition() {
                        match hosted.get_mut(name) {
                            Some(current) if *current > *count => *current -= count,
                            Some(_) => {
                                hosted.remove(name);
                            }
                            None => log::warn!(
                                "Worker {worker} of provider {} has no {name} machine to release",
                                self.name
                            ),
                        }
                    }
                    if hosted.is_empty() {
                        state.hosted.remove(worker);
                    }
                }
                None => log::warn!("Worker {worker} is not hosted by provider {}", self.name),
            }
        }
        if let Err(error) = self.connector.terminate(worker, reduction) {
            log::error!(
                "Provider {} failed to release resources of {worker}: {error:#}",
                self.name
            );
        }
    }

    /// Best machine to add `amount` simultaneous executions of `requirements`.
    ///
    /// With `contained`, only types that do not exceed `amount` are considered. Types are
    /// ranked by their distance from `amount` and then by cost; the first compatible image
    /// (in name order) is used.
    pub fn best_increase(
        &self,
        amount: u32,
        requirements: &ResourceDescription,
        contained: bool,
    ) -> Option<CloudResourceDescription> {
        let image = self.compatible_images(requirements).into_iter().next()?;
        self.compatible_types(requirements)
            .into_iter()
            .map(|t| {
                let slots = t.description().can_host_simultaneously(requirements);
                (slots, t)
            })
            .filter(|(slots, _)| *slots > 0 && (!contained || *slots <= amount))
            .min_by(|(slots_a, a), (slots_b, b)| {
                slots_a
                    .abs_diff(amount)
                    .cmp(&slots_b.abs_diff(amount))
                    .then(a.description().value.total_cmp(&b.description().value))
            })
            .map(|(_, t)| CloudResourceDescription::new(t, image))
    }

    pub fn pending_requests(&self) -> Vec<ResourceCreationRequest> {
        self.lock().pending.clone()
    }

    /// Per-core slots that the pending requests add once created.
    pub fn pending_core_counts(&self, core_count: usize) -> Vec<u32> {
        let state = self.lock();
        let mut counts = vec![0; core_count];
        for request in &state.pending {
            for (idx, count) in counts.iter_mut().enumerate() {
                *count += request.slots().core(CoreId::new(idx as u32));
            }
        }
        counts
    }

    pub fn hosted_workers(&self) -> Vec<String> {
        sorted_keys(&self.lock().hosted)
    }

    /// Machines behind a hosted worker.
    pub fn hosted_composition(&self, worker: &str) -> Option<TypeComposition> {
        self.lock().hosted.get(worker).cloned()
    }

    pub fn core_elements_updated(&self, registry: &CoreRegistry, cores: &[CoreId]) {
        self.types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .core_elements_updated(registry, cores);
        let mut state = self.lock();
        for request in state.pending.iter_mut() {
            let description = request.requested().description().clone();
            request.slots_mut().update_cores(&description, registry, cores);
        }
    }

    pub fn terminate_all(&self) -> ConnectorResult<()> {
        self.connector.terminate_all()?;
        let mut state = self.lock();
        state.current_vms = 0;
        state.pending.clear();
        state.hosted.clear();
        Ok(())
    }

    pub fn stop_reached(&self) {
        self.connector.stop_reached();
    }

    pub fn next_creation_time(&self) -> ConnectorResult<Duration> {
        self.connector.next_creation_time()
    }

    pub fn time_slot(&self) -> ConnectorResult<Duration> {
        self.connector.time_slot()
    }

    pub fn current_cost_per_hour(&self) -> f64 {
        self.connector.current_cost_per_hour()
    }

    pub fn total_cost(&self) -> f64 {
        self.connector.total_cost()
    }

    pub(crate) fn dump(&self) -> serde_json::Value {
        let state = self.lock();
        let hosted: Map<&String, u32> = state
            .hosted
            .iter()
            .map(|(name, composition)| (name, composition.values().sum()))
            .collect();
        json!({
            "name": self.name,
            "limit_of_vms": self.limit_of_vms,
            "current_vms": state.current_vms,
            "pending": state.pending.iter().map(|r| r.summary()).collect::<Vec<_>>(),
            "hosted": hosted,
            "images": self.all_images().iter().map(|i| i.name.clone()).collect::<Vec<_>>(),
            "types": self.all_types().iter().map(|t| t.name().to_string()).collect::<Vec<_>>(),
        })
    }
}
