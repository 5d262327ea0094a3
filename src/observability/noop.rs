use super::traits::{Observer, RunEvent};

/// Observer that drops every event
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline(always)]
    fn record_event(&self, _event: &RunEvent) {}

    fn name(&self) -> &str {
        "noop"
    }
}
