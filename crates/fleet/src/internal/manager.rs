use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::json;

use crate::internal::cloud::{
    CloudImageDescription, CloudInstanceTypeDescription, CloudManager, CloudResourceDescription,
    Connector, Cost, ResourceCreationListener, ResourceCreationRequest,
};
use crate::internal::common::Map;
use crate::internal::config::{FleetConfig, ProviderConfig};
use crate::internal::cores::{CoreRegistry, CoreSlots, SlotMatrix};
use crate::internal::pool::{Partition, WorkerPool};
use crate::internal::resources::ResourceDescription;
use crate::internal::shutdown::{ShutdownListener, WorkerNode};
use crate::internal::updates::{BusyAck, PendingReduction, ResourceUpdate, ResourceUser};
use crate::internal::worker::{Worker, WorkerFlags, WorkerInfo, WorkerKind};
use crate::{CoreId, FleetError, ImplId};

/// Runtime-provided handles needed to turn a configuration into a live fleet.
#[derive(Default, Clone)]
pub struct FleetPlugins {
    /// Provider name -> connector
    pub connectors: Map<String, Arc<dyn Connector>>,
    /// Static worker name -> node handle
    pub nodes: Map<String, Arc<dyn WorkerNode>>,
}

#[derive(Default)]
struct FleetState {
    pool: WorkerPool,
    // Sum of the per-core slots of every pooled worker
    slots: CoreSlots,
}

fn add_worker_slots(slots: &mut CoreSlots, worker: &Worker) {
    let worker_slots = worker.slots().core_slots();
    if slots.len() < worker_slots.len() {
        slots.resize(worker_slots.len(), 0);
    }
    for (total, count) in slots.iter_mut().zip(worker_slots.iter()) {
        *total += count;
    }
}

fn remove_worker_slots(slots: &mut CoreSlots, worker: &Worker) {
    for (total, count) in slots.iter_mut().zip(worker.slots().core_slots().iter()) {
        *total -= count;
    }
}

impl FleetState {
    fn worker(&self, name: &str) -> &Worker {
        self.pool
            .get(name)
            .unwrap_or_else(|| panic!("Worker {name} not found"))
    }

    /// Applies `f` to a dynamic worker as one step: its slots are taken out of the totals,
    /// the change is applied, the slots are derived again and put back and the critical set
    /// is recomputed.
    fn modify_dynamic<R>(
        &mut self,
        registry: &CoreRegistry,
        name: &str,
        f: impl FnOnce(&mut Worker) -> R,
    ) -> (R, WorkerInfo) {
        let FleetState { pool, slots } = self;
        let worker = pool
            .get_mut(name)
            .unwrap_or_else(|| panic!("Worker {name} not found"));
        assert!(worker.is_dynamic(), "Worker {name} is not a dynamic worker");
        remove_worker_slots(slots, worker);
        let result = f(&mut *worker);
        worker.update_slots(registry);
        add_worker_slots(slots, worker);
        let info = worker.info();
        pool.recompute_critical_set();
        (result, info)
    }
}

/// Façade over the worker pool and the cloud.
///
/// Keeps the per-core slot totals in sync with the pool and relays every capacity change
/// to the [`ResourceUser`]. Operations naming a worker that is not in the pool panic, they
/// mean that the caller and the fleet disagree about its content.
pub struct ResourceManager {
    registry: Arc<CoreRegistry>,
    state: Mutex<FleetState>,
    cloud: CloudManager,
    user: Arc<dyn ResourceUser>,
    shutdown_timeout: Option<Duration>,
}

impl ResourceManager {
    pub fn new(registry: Arc<CoreRegistry>, user: Arc<dyn ResourceUser>) -> Self {
        ResourceManager {
            registry,
            state: Default::default(),
            cloud: CloudManager::new(),
            user,
            shutdown_timeout: None,
        }
    }

    /// Builds the fleet from a validated configuration.
    ///
    /// Entries referring to something that does not exist (a provider without connector,
    /// an image or type missing from the catalogue, a duplicated worker) are skipped with
    /// a warning. Fails only when no compute resource is left at all.
    pub fn load(
        config: FleetConfig,
        registry: Arc<CoreRegistry>,
        user: Arc<dyn ResourceUser>,
        plugins: &FleetPlugins,
    ) -> crate::Result<Self> {
        let mut manager = ResourceManager::new(registry, user);
        manager.shutdown_timeout = config.shutdown_timeout;
        manager.cloud.set_bounds(
            config.bounds.min_vms,
            config.bounds.initial_vms,
            config.bounds.max_vms,
        );

        for worker in config.workers {
            if manager.worker(&worker.name).is_some() {
                log::warn!("Worker {} is defined twice, skipping it", worker.name);
                continue;
            }
            let node = plugins.nodes.get(&worker.name).cloned();
            manager.add_static_worker(Worker::new(
                worker.name,
                WorkerKind::Static,
                worker.description,
                node,
            ));
        }
        for provider in config.providers {
            manager.load_provider(provider, plugins);
        }

        if manager.worker_count() == 0 && !manager.cloud.is_cloud_enabled() {
            return Err(FleetError::ConfigurationError(
                "No computational resource available".to_string(),
            ));
        }
        log::info!(
            "Fleet loaded with {} static workers and {} cloud providers",
            manager.worker_count(),
            manager.cloud.providers().len()
        );
        Ok(manager)
    }

    fn load_provider(&self, config: ProviderConfig, plugins: &FleetPlugins) {
        let Some(connector) = plugins.connectors.get(&config.name).cloned() else {
            log::warn!("No connector for cloud provider {}, skipping it", config.name);
            return;
        };
        let Some(provider) = self
            .cloud
            .register_provider(&config.name, config.limit_of_vms, connector)
        else {
            return;
        };

        for name in &config.use_images {
            if !config.images.iter().any(|i| &i.name == name) {
                log::warn!(
                    "Image {name} is not in the catalogue of provider {}, skipping it",
                    config.name
                );
            }
        }
        for name in &config.use_types {
            if !config.instance_types.iter().any(|t| &t.name == name) {
                log::warn!(
                    "Instance type {name} is not in the catalogue of provider {}, skipping it",
                    config.name
                );
            }
        }

        let images: Vec<CloudImageDescription> = config
            .images
            .into_iter()
            .filter(|i| config.use_images.is_empty() || config.use_images.contains(&i.name))
            .collect();
        if images.is_empty() {
            log::warn!("Cloud provider {} has no usable image", config.name);
        }
        for image in images {
            provider.add_image(image);
        }
        for instance_type in config.instance_types {
            if config.use_types.is_empty() || config.use_types.contains(&instance_type.name) {
                let description = CloudInstanceTypeDescription::new(
                    instance_type.name,
                    instance_type.description,
                );
                provider.add_instance_type(description, &self.registry);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registry(&self) -> &Arc<CoreRegistry> {
        &self.registry
    }

    pub fn cloud(&self) -> &CloudManager {
        &self.cloud
    }

    fn notify(&self, info: &WorkerInfo, update: ResourceUpdate) {
        log::debug!("Resource {} updated: {}", info.name, update.kind_name());
        self.user.updated_resource(info, update);
    }

    pub fn add_static_worker(&self, mut worker: Worker) {
        assert!(
            !worker.is_dynamic(),
            "Worker {} is not a static worker",
            worker.name()
        );
        worker.update_slots(&self.registry);
        if worker.executable_cores().next().is_none() && self.registry.count() > 0 {
            log::warn!(
                "Worker {} cannot run any registered core element",
                worker.name()
            );
        }
        let info = worker.info();
        {
            let mut state = self.lock();
            add_worker_slots(&mut state.slots, &worker);
            state.pool.add_static(worker);
            state.pool.recompute_critical_set();
        }
        log::info!("Static worker {} added to the pool", info.name);
        self.notify(
            &info,
            ResourceUpdate::PerformedIncrease(info.description.clone()),
        );
    }

    /// Adds a dynamic worker, or grows it by `granted` when it is already in the pool.
    pub fn add_dynamic_worker(&self, mut worker: Worker, granted: ResourceDescription) {
        assert!(
            worker.is_dynamic(),
            "Worker {} is not a dynamic worker",
            worker.name()
        );
        let info = {
            let mut state = self.lock();
            if state.pool.contains(worker.name()) {
                let extension = granted.clone();
                let ((), info) = state.modify_dynamic(&self.registry, worker.name(), |w| {
                    w.description_mut().increase_dynamic(&extension)
                });
                info
            } else {
                worker.update_slots(&self.registry);
                let info = worker.info();
                add_worker_slots(&mut state.slots, &worker);
                state.pool.add_dynamic(worker);
                state.pool.recompute_critical_set();
                log::info!("Dynamic worker {} added to the pool", info.name);
                info
            }
        };
        self.notify(&info, ResourceUpdate::PerformedIncrease(granted));
    }

    pub fn increase_dynamic_worker(&self, name: &str, extension: ResourceDescription) {
        let ((), info) = self.lock().modify_dynamic(&self.registry, name, |w| {
            w.description_mut().increase_dynamic(&extension)
        });
        log::info!("Worker {name} increased");
        self.notify(&info, ResourceUpdate::PerformedIncrease(extension));
    }

    /// Removes `reduction` from a dynamic worker and returns what was actually removed.
    ///
    /// A reduction that does not fit into the worker is rejected with a warning.
    pub fn reduce_dynamic_worker(
        &self,
        name: &str,
        reduction: &ResourceDescription,
    ) -> Option<ResourceDescription> {
        let (reduced, info) = self.lock().modify_dynamic(&self.registry, name, |w| {
            w.description_mut().reduce_dynamic(reduction)
        });
        match reduced {
            Some(reduced) => {
                log::info!("Worker {name} reduced");
                self.notify(&info, ResourceUpdate::PerformedReduction(reduced.clone()));
                Some(reduced)
            }
            None => {
                log::warn!("Reduction of worker {name} exceeds its capacity, ignoring it");
                None
            }
        }
    }

    /// Checks that releasing `reduction` of a dynamic worker keeps every implementation it
    /// runs covered by the critical workers.
    pub fn is_reduction_safe(&self, name: &str, reduction: &ResourceDescription) -> bool {
        let state = self.lock();
        let worker = state.worker(name);
        match state.pool.partition_of(name) {
            Some(Partition::NonCritical) => return true,
            Some(Partition::Static) => return false,
            _ => {}
        }
        let mut remaining = worker.description().clone();
        if remaining.reduce_dynamic(reduction).is_none() {
            return false;
        }
        let after = SlotMatrix::compute(&remaining, &self.registry);
        let loss: Vec<Vec<u32>> = worker
            .slots()
            .rows()
            .iter()
            .enumerate()
            .map(|(core_idx, row)| {
                let core_id = CoreId::new(core_idx as u32);
                row.iter()
                    .enumerate()
                    .map(|(impl_idx, before)| {
                        let impl_id = ImplId::new(impl_idx as u32);
                        before.saturating_sub(after.implementation(core_id, impl_id))
                    })
                    .collect()
            })
            .collect();
        state.pool.is_reduction_safe(&loss)
    }

    /// Asks the resource user to release `reduction` of a dynamic worker.
    ///
    /// Nothing changes in the pool; a reduction that would leave some implementation
    /// without critical capacity is rejected with a warning.
    pub fn request_reduction(&self, name: &str, reduction: ResourceDescription) -> bool {
        if !self.is_reduction_safe(name, &reduction) {
            log::warn!("Reduction of worker {name} would starve a core element, ignoring it");
            return false;
        }
        let info = self.lock().worker(name).info();
        self.notify(
            &info,
            ResourceUpdate::PendingReduction(PendingReduction {
                worker: name.to_string(),
                reduction,
            }),
        );
        true
    }

    /// Asks the resource user to release the whole worker.
    pub fn request_whole_worker_reduction(&self, name: &str) {
        let info = self.lock().worker(name).info();
        let reduction = info.description.clone();
        self.notify(
            &info,
            ResourceUpdate::PendingReduction(PendingReduction {
                worker: name.to_string(),
                reduction,
            }),
        );
    }

    /// Turns a pending reduction into a performed one once its resources were freed.
    pub fn confirm_reduction(&self, pending: PendingReduction) {
        let info = self.lock().worker(&pending.worker).info();
        self.notify(&info, ResourceUpdate::PerformedReduction(pending.reduction));
    }

    /// Connector-initiated reduction: `reduction` is already gone from the worker, so it is
    /// applied right away without asking the resource user first.
    pub fn notify_worker_reduction(
        &self,
        name: &str,
        reduction: &ResourceDescription,
    ) -> Option<ResourceDescription> {
        log::info!("Worker {name} lost resources outside of the fleet");
        self.reduce_dynamic_worker(name, reduction)
    }

    /// Connector-initiated loss of a whole dynamic worker. The emptied worker stays in the
    /// pool until [`ResourceManager::terminate_if_empty`] drops it.
    pub fn notify_whole_worker_reduction(&self, name: &str) -> Option<ResourceDescription> {
        let reduction = self.lock().worker(name).description().clone();
        self.notify_worker_reduction(name, &reduction)
    }

    /// The node behind a worker restarted. Its capacity stays in the pool.
    pub fn notify_restart(&self, name: &str) {
        let info = self.lock().worker(name).info();
        log::info!("Worker {name} restarted");
        self.user.restarted_resource(&info);
    }

    /// Drops every worker and provider without notifying anybody.
    pub fn clear(&self) {
        *self.lock() = FleetState::default();
        self.cloud.clear();
        log::info!("Fleet cleared");
    }

    /// Drops a dynamic worker from the pool once it has no capacity left.
    pub fn terminate_if_empty(&self, name: &str) -> bool {
        let mut state = self.lock();
        let worker = state.worker(name);
        if !worker.is_dynamic() || !worker.should_be_stopped() {
            return false;
        }
        if let Some(worker) = state.pool.remove(name) {
            remove_worker_slots(&mut state.slots, &worker);
            state.pool.recompute_critical_set();
            log::info!("Worker {name} removed from the pool");
        }
        true
    }

    fn cloud_provider_of(&self, name: &str) -> String {
        match self.lock().worker(name).kind() {
            WorkerKind::Cloud { provider } => provider.clone(),
            _ => panic!("Worker {name} is not a cloud worker"),
        }
    }

    /// Reduces a cloud worker, drops it when empty and lets its provider release the
    /// machines listed in `reduction`. A worker left empty releases every machine it
    /// still runs on.
    pub fn reduce_cloud_worker(
        &self,
        name: &str,
        reduction: &CloudResourceDescription,
    ) -> Option<ResourceDescription> {
        let provider_name = self.cloud_provider_of(name);
        let reduced = self.reduce_dynamic_worker(name, reduction.description())?;
        let terminated = self.terminate_if_empty(name);
        let Some(provider) = self.cloud.provider(&provider_name) else {
            log::warn!("Cloud provider {provider_name} of worker {name} is not registered");
            return Some(reduced);
        };
        let released = match provider.hosted_composition(name) {
            Some(composition) if terminated => reduction.clone().with_composition(composition),
            _ => reduction.clone(),
        };
        provider.request_resource_reduction(name, &released);
        Some(reduced)
    }

    /// Removes any worker from the pool.
    pub fn remove_worker(&self, name: &str) -> WorkerInfo {
        let mut state = self.lock();
        let worker = state
            .pool
            .remove(name)
            .unwrap_or_else(|| panic!("Worker {name} not found"));
        remove_worker_slots(&mut state.slots, &worker);
        state.pool.recompute_critical_set();
        log::info!("Worker {name} removed from the pool");
        worker.info()
    }

    pub fn notify_idle(&self, name: &str, amount: ResourceDescription) {
        let info = self.lock().worker(name).info();
        log::info!("Worker {name} has idle resources");
        self.notify(&info, ResourceUpdate::IdleResources(amount));
    }

    /// Tells the resource user that idle resources are needed again and waits until it
    /// acknowledges, at most `timeout` when given.
    pub async fn notify_busy_again(
        &self,
        name: &str,
        amount: ResourceDescription,
        timeout: Option<Duration>,
    ) -> crate::Result<()> {
        let info = self.lock().worker(name).info();
        log::info!("Worker {name} reacquires resources");
        let (ack, receiver) = BusyAck::new();
        self.notify(&info, ResourceUpdate::BusyResources(amount, ack));
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, receiver)
                .await
                .map_err(|_| FleetError::AcknowledgeTimeout(timeout))?,
            None => receiver.await,
        };
        result.map_err(|_| FleetError::AcknowledgeDropped)
    }

    /// Brings slot vectors, the critical set and the cloud catalogues up to date after
    /// `cores` were registered or got new implementations.
    pub fn core_elements_updated(&self, cores: &[CoreId]) {
        let core_count = self.registry.count();
        {
            let mut state = self.lock();
            let FleetState { pool, slots } = &mut *state;
            slots.resize(core_count, 0);
            for worker in pool.all_workers_mut() {
                worker.update_cores(&self.registry, cores);
            }
            for core_id in cores {
                if usize::from(*core_id) < core_count {
                    slots[*core_id] = pool.all_workers().map(|w| w.slots().core(*core_id)).sum();
                }
            }
            pool.recompute_critical_set();
        }
        self.cloud.core_elements_updated(&self.registry, cores);
    }

    /// Connector callback: the machines of `request_id` are up and join the fleet as
    /// `worker`, or extend it when it is already in the pool.
    pub fn add_cloud_worker(
        &self,
        request_id: &str,
        worker: Worker,
        granted: CloudResourceDescription,
    ) -> bool {
        let Some(provider_name) = worker.kind().provider().map(|p| p.to_string()) else {
            panic!("Worker {} is not a cloud worker", worker.name());
        };
        let Some(provider) = self.cloud.provider(&provider_name) else {
            log::warn!(
                "Cloud provider {provider_name} is not registered, ignoring worker {}",
                worker.name()
            );
            return false;
        };
        let name = worker.name().to_string();
        let Some(request) = provider.confirmed_creation(request_id, &name, &granted) else {
            return false;
        };
        self.add_dynamic_worker(worker, granted.description().clone());
        if let Some(listener) = request.listener() {
            listener.notify_resource_creation(&name, request.requested());
        }
        true
    }

    /// Connector callback: the machines of `request_id` were attached to the cloud worker
    /// `name` that is already in the pool.
    pub fn increase_cloud_worker(
        &self,
        request_id: &str,
        name: &str,
        extension: CloudResourceDescription,
    ) -> bool {
        let provider_name = self.cloud_provider_of(name);
        let Some(provider) = self.cloud.provider(&provider_name) else {
            log::warn!("Cloud provider {provider_name} of worker {name} is not registered");
            return false;
        };
        let Some(request) = provider.confirmed_creation(request_id, name, &extension) else {
            return false;
        };
        self.increase_dynamic_worker(name, extension.description().clone());
        if let Some(listener) = request.listener() {
            listener.notify_resource_creation(name, request.requested());
        }
        true
    }

    /// Connector callback: the machine of `request_id` could not be created.
    pub fn refused_cloud_request(&self, provider: &str, request_id: &str) -> bool {
        match self.cloud.provider(provider) {
            Some(provider) => provider.refused_creation(request_id).is_some(),
            None => {
                log::warn!("Cloud provider {provider} is not registered");
                false
            }
        }
    }

    /// Requests the cheapest machine able to run `amount` copies of `requirements`.
    pub fn ask_for_resources(
        &self,
        amount: u32,
        requirements: &ResourceDescription,
        contained: bool,
        listener: Option<Arc<dyn ResourceCreationListener>>,
    ) -> Option<ResourceCreationRequest> {
        self.cloud
            .ask_for_resources(amount, requirements, contained, listener, &self.registry)
    }

    /// Requests `count` machines of the first type and image of the first provider.
    /// Returns how many requests were accepted.
    pub fn request_cloud_resources(
        &self,
        count: usize,
        listener: Option<Arc<dyn ResourceCreationListener>>,
    ) -> usize {
        let Some(provider) = self.cloud.providers().into_iter().next() else {
            log::warn!("No cloud provider available, cannot request resources");
            return 0;
        };
        let Some(image) = provider.all_images().into_iter().next() else {
            log::warn!("Cloud provider {} has no image", provider.name());
            return 0;
        };
        let Some(instance_type) = provider.all_types().into_iter().next() else {
            log::warn!("Cloud provider {} has no instance type", provider.name());
            return 0;
        };
        let description = CloudResourceDescription::new(instance_type, image);
        let mut submitted = 0;
        for i in 1..=count {
            if provider
                .request_resource_creation(description.clone(), listener.clone(), &self.registry)
                .is_some()
            {
                submitted += 1;
                log::info!("Submitted request for new resources ({i}/{count})");
            }
        }
        submitted
    }

    /// Asks the resource user to release up to `count` whole cloud workers.
    pub fn free_cloud_resources(&self, count: usize) -> usize {
        let mut freed = 0;
        for provider in self.cloud.providers() {
            for name in provider.hosted_workers() {
                if freed >= count {
                    return freed;
                }
                if self.worker(&name).is_none() {
                    continue;
                }
                self.request_whole_worker_reduction(&name);
                freed += 1;
                log::info!("Submitted request to destroy resources {name} ({freed}/{count})");
            }
        }
        if freed < count {
            log::info!("No remaining workers to destroy, skipping the rest of requests");
        }
        freed
    }

    /// Slots per core of the pool plus the slots of pending cloud requests.
    pub fn total_slots(&self) -> Vec<u32> {
        let core_count = self.registry.count();
        let pending = self.cloud.pending_core_counts(core_count);
        let state = self.lock();
        pending
            .into_iter()
            .enumerate()
            .map(|(idx, count)| count + state.slots.get(idx).copied().unwrap_or(0))
            .collect()
    }

    /// Slots per core of the workers in the pool.
    pub fn available_slots(&self) -> Vec<u32> {
        let core_count = self.registry.count();
        let state = self.lock();
        (0..core_count)
            .map(|idx| state.slots.get(idx).copied().unwrap_or(0))
            .collect()
    }

    pub fn worker(&self, name: &str) -> Option<WorkerInfo> {
        self.lock().pool.get(name).map(|w| w.info())
    }

    pub fn partition_of(&self, name: &str) -> Option<Partition> {
        self.lock().pool.partition_of(name)
    }

    pub fn executable_cores(&self, name: &str) -> Vec<CoreId> {
        self.lock()
            .pool
            .executable_cores(name)
            .unwrap_or_else(|| panic!("Worker {name} not found"))
    }

    fn collect<'a>(workers: impl Iterator<Item = &'a Worker>) -> Vec<WorkerInfo> {
        let mut infos: Vec<WorkerInfo> = workers.map(|w| w.info()).collect();
        infos.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub fn all_workers(&self) -> Vec<WorkerInfo> {
        Self::collect(self.lock().pool.all_workers())
    }

    pub fn static_workers(&self) -> Vec<WorkerInfo> {
        Self::collect(self.lock().pool.static_workers())
    }

    pub fn dynamic_workers(&self) -> Vec<WorkerInfo> {
        Self::collect(self.lock().pool.dynamic_workers())
    }

    pub fn critical_workers(&self) -> Vec<WorkerInfo> {
        Self::collect(self.lock().pool.critical_workers())
    }

    pub fn non_critical_workers(&self) -> Vec<WorkerInfo> {
        Self::collect(self.lock().pool.non_critical_workers())
    }

    pub fn worker_count(&self) -> usize {
        self.lock().pool.len()
    }

    pub fn current_cost_per_hour(&self) -> Cost {
        self.cloud.current_cost_per_hour()
    }

    pub fn total_cost(&self) -> Cost {
        self.cloud.total_cost()
    }

    pub fn dump(&self) -> serde_json::Value {
        let (pool, slots) = {
            let state = self.lock();
            (state.pool.dump(), state.slots.to_vec())
        };
        json!({
            "slots": slots,
            "pool": pool,
            "cloud": self.cloud.dump(),
        })
    }

    /// Two-phase shutdown of the whole fleet.
    ///
    /// Every node first gets its execution disabled and its tracing and debug data
    /// retrieved. Then all nodes are stopped and the call waits until each one confirms,
    /// bounded by the configured shutdown timeout. Cloud machines are terminated
    /// afterwards even when the wait failed.
    pub async fn stop_nodes(&self) -> crate::Result<()> {
        let nodes: Vec<(String, Arc<dyn WorkerNode>)> = {
            let mut state = self.lock();
            state
                .pool
                .all_workers_mut()
                .filter_map(|w| {
                    w.flags.insert(WorkerFlags::EXECUTION_DISABLED);
                    w.node().map(|n| (w.name().to_string(), n.clone()))
                })
                .collect()
        };

        for (name, node) in &nodes {
            log::debug!("Disabling execution on {name}");
            node.disable_execution();
            node.retrieve_tracing_and_debug_data();
        }

        {
            let mut state = self.lock();
            for (name, _) in &nodes {
                if let Some(worker) = state.pool.get_mut(name) {
                    worker.flags.insert(WorkerFlags::STOPPING);
                }
            }
        }
        let listener = ShutdownListener::new();
        for (name, node) in &nodes {
            log::debug!("Stopping {name}");
            node.stop(listener.clone());
        }
        let result = listener.wait_for(nodes.len(), self.shutdown_timeout).await;
        match &result {
            Ok(()) => log::info!("All {} worker nodes stopped", nodes.len()),
            Err(error) => log::error!("Worker nodes did not stop cleanly: {error}"),
        }

        if self.cloud.is_cloud_enabled() {
            self.cloud.stop_reached();
            let failed = self.cloud.terminate_all();
            if failed > 0 {
                log::error!("{failed} cloud provider(s) could not terminate their machines");
            }
        }
        result
    }
}
