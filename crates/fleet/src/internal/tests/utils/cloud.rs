use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::internal::cloud::{
    CloudImageDescription, CloudInstanceTypeDescription, CloudResourceDescription, Connector,
    ConnectorResult, ResourceCreationListener, ResourceCreationRequest,
};
use crate::internal::resources::ResourceDescription;

/// Connector that records calls instead of talking to a cloud.
pub struct TestConnector {
    reject: AtomicBool,
    fail_terminate_all: AtomicBool,
    cost_per_hour: f64,
    creation_time: Duration,
    calls: Mutex<Vec<String>>,
}

impl Default for TestConnector {
    fn default() -> Self {
        TestConnector {
            reject: AtomicBool::new(false),
            fail_terminate_all: AtomicBool::new(false),
            cost_per_hour: 1.0,
            creation_time: Duration::from_secs(60),
            calls: Default::default(),
        }
    }
}

impl TestConnector {
    pub fn new(cost_per_hour: f64, creation_time: Duration) -> Self {
        TestConnector {
            cost_per_hour,
            creation_time,
            ..Default::default()
        }
    }

    pub fn set_reject(&self, value: bool) {
        self.reject.store(value, Ordering::SeqCst);
    }

    pub fn set_fail_terminate_all(&self, value: bool) {
        self.fail_terminate_all.store(value, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Connector for TestConnector {
    fn turn_on(&self, request: &ResourceCreationRequest) -> ConnectorResult<()> {
        if self.reject.load(Ordering::SeqCst) {
            anyhow::bail!("Quota exceeded");
        }
        self.record(format!(
            "turn_on {} {}",
            request.requested().instance_type().name(),
            request.requested().image().name
        ));
        Ok(())
    }

    fn terminate(
        &self,
        worker: &str,
        reduction: &CloudResourceDescription,
    ) -> ConnectorResult<()> {
        self.record(format!("terminate {worker} x{}", reduction.vm_count()));
        Ok(())
    }

    fn terminate_all(&self) -> ConnectorResult<()> {
        if self.fail_terminate_all.load(Ordering::SeqCst) {
            anyhow::bail!("Cloud API unreachable");
        }
        self.record("terminate_all".to_string());
        Ok(())
    }

    fn stop_reached(&self) {
        self.record("stop_reached".to_string());
    }

    fn next_creation_time(&self) -> ConnectorResult<Duration> {
        Ok(self.creation_time)
    }

    fn time_slot(&self) -> ConnectorResult<Duration> {
        Ok(Duration::from_secs(3600))
    }

    fn current_cost_per_hour(&self) -> f64 {
        self.cost_per_hour
    }

    fn total_cost(&self) -> f64 {
        self.cost_per_hour * 2.0
    }
}

#[derive(Default)]
pub struct RecordingListener {
    created: Mutex<Vec<(String, String)>>,
}

impl RecordingListener {
    /// Pairs of worker name and instance type name.
    pub fn created(&self) -> Vec<(String, String)> {
        self.created.lock().unwrap().clone()
    }
}

impl ResourceCreationListener for RecordingListener {
    fn notify_resource_creation(&self, worker: &str, requested: &CloudResourceDescription) {
        self.created
            .lock()
            .unwrap()
            .push((worker.to_string(), requested.instance_type().name().to_string()));
    }
}

pub fn image(name: &str, software: &[&str]) -> CloudImageDescription {
    CloudImageDescription {
        software: software.iter().map(|s| s.to_string()).collect(),
        ..CloudImageDescription::new(name)
    }
}

pub fn instance_type(name: &str, description: ResourceDescription) -> CloudInstanceTypeDescription {
    CloudInstanceTypeDescription::new(name, description)
}
