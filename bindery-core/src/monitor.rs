use crate::{Cancel, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Registry of the statement currently executing on a transaction, so that another task can
/// interrupt it.
#[derive(Default)]
pub struct StatementMonitor {
    active: Mutex<Option<Arc<dyn Cancel>>>,
}

impl StatementMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `canceller` as the running statement until the returned guard is dropped.
    pub fn register(&self, canceller: Arc<dyn Cancel>) -> ActiveStatement<'_> {
        *self.active.lock() = Some(canceller);
        ActiveStatement { monitor: self }
    }

    pub fn is_active(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Interrupts the running statement, returns whether there was one.
    pub fn cancel(&self) -> Result<bool> {
        let active = self.active.lock().clone();
        match active {
            Some(canceller) => {
                log::debug!("Cancelling the running statement");
                canceller.cancel()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Keeps a statement registered in a [`StatementMonitor`].
pub struct ActiveStatement<'a> {
    monitor: &'a StatementMonitor,
}

impl Drop for ActiveStatement<'_> {
    fn drop(&mut self) {
        self.monitor.active.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Cancel for Counter {
        fn cancel(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn guard_unregisters() {
        let monitor = StatementMonitor::new();
        let counter = Arc::new(Counter::default());
        {
            let _guard = monitor.register(counter.clone());
            assert!(monitor.is_active());
            assert!(monitor.cancel().unwrap());
        }
        assert!(!monitor.is_active());
        assert!(!monitor.cancel().unwrap());
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }
}
