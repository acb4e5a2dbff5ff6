use tokio::sync::oneshot;

use crate::internal::resources::ResourceDescription;
use crate::internal::worker::WorkerInfo;

/// Consumer of capacity changes, usually the task scheduler.
///
/// Called synchronously and outside of the fleet lock, so an implementation may call back
/// into the [`ResourceManager`](crate::ResourceManager).
pub trait ResourceUser: Send + Sync {
    fn updated_resource(&self, worker: &WorkerInfo, update: ResourceUpdate);

    /// The node behind `worker` restarted and lost the state it held.
    fn restarted_resource(&self, worker: &WorkerInfo) {
        log::debug!("Ignoring restart of worker {}", worker.name);
    }
}

/// Reduction asked for but not performed yet.
///
/// The resource user decides when the capacity is actually released and hands the token
/// back through [`ResourceManager::confirm_reduction`](crate::ResourceManager::confirm_reduction).
#[derive(Debug, Clone, PartialEq)]
pub struct PendingReduction {
    pub(crate) worker: String,
    pub(crate) reduction: ResourceDescription,
}

impl PendingReduction {
    pub fn worker(&self) -> &str {
        &self.worker
    }

    pub fn reduction(&self) -> &ResourceDescription {
        &self.reduction
    }
}

/// Acknowledgement the resource user owes for [`ResourceUpdate::BusyResources`].
#[derive(Debug)]
pub struct BusyAck(oneshot::Sender<()>);

impl BusyAck {
    pub(crate) fn new() -> (Self, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        (BusyAck(sender), receiver)
    }

    pub fn acknowledge(self) {
        if self.0.send(()).is_err() {
            log::debug!("Busy resources acknowledged after the notifier stopped waiting");
        }
    }
}

#[derive(Debug)]
pub enum ResourceUpdate {
    PerformedIncrease(ResourceDescription),
    PendingReduction(PendingReduction),
    PerformedReduction(ResourceDescription),
    IdleResources(ResourceDescription),
    BusyResources(ResourceDescription, BusyAck),
}

impl ResourceUpdate {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceUpdate::PerformedIncrease(_) => "PerformedIncrease",
            ResourceUpdate::PendingReduction(_) => "PendingReduction",
            ResourceUpdate::PerformedReduction(_) => "PerformedReduction",
            ResourceUpdate::IdleResources(_) => "IdleResources",
            ResourceUpdate::BusyResources(..) => "BusyResources",
        }
    }

    pub fn modification(&self) -> &ResourceDescription {
        match self {
            ResourceUpdate::PerformedIncrease(d)
            | ResourceUpdate::PerformedReduction(d)
            | ResourceUpdate::IdleResources(d)
            | ResourceUpdate::BusyResources(d, _) => d,
            ResourceUpdate::PendingReduction(p) => &p.reduction,
        }
    }
}
