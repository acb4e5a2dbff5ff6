use std::time::Instant;

/// Logs how long a fleet operation took, at the debug level of the `fleet::timing`
/// target.
pub struct OperationTimer<'a> {
    component: &'a str,
    operation: &'static str,
    started: Instant,
}

impl<'a> OperationTimer<'a> {
    pub fn new(component: &'a str, operation: &'static str) -> Self {
        tracing::debug!(target: "fleet::timing", component, operation, "started");
        Self {
            component,
            operation,
            started: Instant::now(),
        }
    }
}

impl Drop for OperationTimer<'_> {
    fn drop(&mut self) {
        tracing::debug!(
            target: "fleet::timing",
            component = self.component,
            operation = self.operation,
            elapsed_us = self.started.elapsed().as_micros() as u64,
            "finished"
        );
    }
}

macro_rules! trace_time {
    ($component:tt, $operation:tt, $block:expr) => {{
        let _timer =
            $crate::internal::common::trace::OperationTimer::new($component, $operation);
        $block
    }};
}
