/// Collection lifecycle: Active → Disposing → Disposed.
///
/// The state only ever moves forward. Disposal is serialized by a lock and
/// the state is re-checked under it, so concurrent `dispose` calls run the
/// teardown exactly once and all of them return normally.
use crate::error::{CollectionError, CollectionResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LifecycleState {
    /// Usable.
    Active = 0,
    /// Teardown in progress.
    Disposing = 1,
    /// Torn down; every operation fails.
    Disposed = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Active,
            1 => LifecycleState::Disposing,
            _ => LifecycleState::Disposed,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Active => write!(f, "active"),
            LifecycleState::Disposing => write!(f, "disposing"),
            LifecycleState::Disposed => write!(f, "disposed"),
        }
    }
}

/// Monotonic tri-state lifecycle with serialized disposal.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
    dispose_lock: Mutex<()>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// A new, active lifecycle.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Active as u8),
            dispose_lock: Mutex::new(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the lifecycle is still active.
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Whether disposal has completed.
    pub fn is_disposed(&self) -> bool {
        self.state() == LifecycleState::Disposed
    }

    /// Whether disposal is in progress.
    pub fn is_disposing(&self) -> bool {
        self.state() == LifecycleState::Disposing
    }

    /// Fail unless the lifecycle is active.
    pub fn ensure_active(&self) -> CollectionResult<()> {
        match self.state() {
            LifecycleState::Active => Ok(()),
            LifecycleState::Disposing => Err(CollectionError::Disposing),
            LifecycleState::Disposed => Err(CollectionError::Disposed),
        }
    }

    /// Run `teardown` once while in the Disposing state, then mark Disposed.
    ///
    /// Returns `false` without running anything if disposal already started.
    pub fn dispose_with(&self, teardown: impl FnOnce()) -> bool {
        if self.state() != LifecycleState::Active {
            return false;
        }

        let _guard = self.dispose_lock.lock();
        if self
            .state
            .compare_exchange(
                LifecycleState::Active as u8,
                LifecycleState::Disposing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        teardown();

        self.state
            .store(LifecycleState::Disposed as u8, Ordering::Release);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_transitions() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.ensure_active().is_ok());

        let mut seen = None;
        assert!(lifecycle.dispose_with(|| {
            seen = Some(lifecycle.state());
        }));
        assert_eq!(seen, Some(LifecycleState::Disposing));
        assert!(lifecycle.is_disposed());
        assert!(matches!(
            lifecycle.ensure_active(),
            Err(CollectionError::Disposed)
        ));
    }

    #[test]
    fn test_disposing_fault_during_teardown() {
        let lifecycle = Lifecycle::new();
        lifecycle.dispose_with(|| {
            assert!(lifecycle.is_disposing());
            assert!(matches!(
                lifecycle.ensure_active(),
                Err(CollectionError::Disposing)
            ));
            // Reentrant dispose is a no-op.
            assert!(!lifecycle.dispose_with(|| unreachable!()));
        });
    }

    #[test]
    fn test_concurrent_dispose_runs_once() {
        for _ in 0..50 {
            let lifecycle = Arc::new(Lifecycle::new());
            let runs = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let lifecycle = Arc::clone(&lifecycle);
                    let runs = Arc::clone(&runs);
                    thread::spawn(move || {
                        lifecycle.dispose_with(|| {
                            runs.fetch_add(1, Ordering::SeqCst);
                        });
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(runs.load(Ordering::SeqCst), 1);
            assert!(lifecycle.is_disposed());
        }
    }
}
