use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// Cooperative cancellation for long router batches.
///
/// Searches poll the budget while running and stop with [`crate::Error::Cancelled`]
/// once the deadline passed or the shared flag was raised. Results finished before
/// that point stay valid.
#[derive(Debug, Clone, Default)]
pub struct SearchBudget {
    deadline: Option<Instant>,
    cancelled: Option<Arc<AtomicBool>>,
}

impl SearchBudget {
    /// Never exhausted
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            cancelled: None,
        }
    }

    /// Also stop once `flag` is set to `true`
    pub fn with_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = Some(flag);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        if let Some(flag) = &self.cancelled {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}
