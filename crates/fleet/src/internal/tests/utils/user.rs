use std::sync::Mutex;

use crate::internal::resources::ResourceDescription;
use crate::internal::updates::{BusyAck, PendingReduction, ResourceUpdate, ResourceUser};
use crate::internal::worker::WorkerInfo;

#[derive(Debug, Clone, PartialEq)]
pub struct UserEvent {
    pub worker: String,
    pub kind: &'static str,
    pub modification: ResourceDescription,
}

/// Resource user that remembers every notification.
#[derive(Default)]
pub struct RecordingUser {
    hold_busy_acks: bool,
    events: Mutex<Vec<UserEvent>>,
    pending: Mutex<Vec<PendingReduction>>,
    held_acks: Mutex<Vec<BusyAck>>,
    restarted: Mutex<Vec<String>>,
}

impl RecordingUser {
    /// Busy notifications are not acknowledged until [`RecordingUser::release_acks`].
    pub fn holding_acks() -> Self {
        RecordingUser {
            hold_busy_acks: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<UserEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<(String, &'static str)> {
        self.events()
            .into_iter()
            .map(|e| (e.worker, e.kind))
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    pub fn take_pending(&self) -> Vec<PendingReduction> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }

    pub fn release_acks(&self) {
        for ack in self.held_acks.lock().unwrap().drain(..) {
            ack.acknowledge();
        }
    }

    pub fn restarted(&self) -> Vec<String> {
        self.restarted.lock().unwrap().clone()
    }

    pub fn drop_acks(&self) {
        self.held_acks.lock().unwrap().clear();
    }
}

impl ResourceUser for RecordingUser {
    fn updated_resource(&self, worker: &WorkerInfo, update: ResourceUpdate) {
        self.events.lock().unwrap().push(UserEvent {
            worker: worker.name.clone(),
            kind: update.kind_name(),
            modification: update.modification().clone(),
        });
        match update {
            ResourceUpdate::PendingReduction(pending) => {
                self.pending.lock().unwrap().push(pending)
            }
            ResourceUpdate::BusyResources(_, ack) => {
                if self.hold_busy_acks {
                    self.held_acks.lock().unwrap().push(ack);
                } else {
                    ack.acknowledge();
                }
            }
            _ => {}
        }
    }

    fn restarted_resource(&self, worker: &WorkerInfo) {
        self.restarted.lock().unwrap().push(worker.name.clone());
    }
}
