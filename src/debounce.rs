use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lets at most one paste run be in flight. A trigger that arrives while a run
/// is active is dropped instead of queued.
#[derive(Debug, Default)]
pub struct DebounceGate {
    in_flight: AtomicBool,
}

/// Releases the gate when dropped. Owned, so it can move into the worker
/// thread that performs the run.
#[derive(Debug)]
pub struct GateGuard {
    gate: Arc<DebounceGate>,
}

impl DebounceGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn try_enter(self: &Arc<Self>) -> Option<GateGuard> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard {
                gate: Arc::clone(self),
            })
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}
