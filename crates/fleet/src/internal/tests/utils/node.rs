use std::sync::Mutex;

use crate::internal::shutdown::{ShutdownListener, WorkerNode};

/// Node that records the shutdown calls and confirms the stop right away unless hanging.
#[derive(Default)]
pub struct TestNode {
    hang: bool,
    calls: Mutex<Vec<&'static str>>,
}

impl TestNode {
    pub fn hanging() -> Self {
        TestNode {
            hang: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl WorkerNode for TestNode {
    fn disable_execution(&self) {
        self.calls.lock().unwrap().push("disable_execution");
    }

    fn retrieve_tracing_and_debug_data(&self) {
        self.calls.lock().unwrap().push("retrieve_tracing_and_debug_data");
    }

    fn stop(&self, listener: ShutdownListener) {
        self.calls.lock().unwrap().push("stop");
        if !self.hang {
            listener.notify_end();
        }
    }
}
