//! Capacity-one gate serializing registry access within a process.
//!
//! The file lock is only contended by one thread per process at a time; the
//! gate is what guarantees that.

use std::sync::{Condvar, Mutex, MutexGuard};

/// A counting gate with a single permit.
///
/// Each [`crate::Registry`] owns one by default. Registries that share a
/// store inside one process may share a gate through an `Arc`.
#[derive(Debug, Default)]
pub struct Gate {
    held: Mutex<bool>,
    released: Condvar,
}

impl Gate {
    /// Create a gate in the available state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the permit is free, then take it.
    pub fn acquire(&self) -> GateGuard<'_> {
        let mut held = self.state();
        while *held {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(|poison| poison.into_inner());
        }
        *held = true;
        GateGuard { gate: self }
    }

    /// Take the permit if it is free right now.
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        let mut held = self.state();
        if *held {
            return None;
        }
        *held = true;
        Some(GateGuard { gate: self })
    }

    /// Return the permit.
    ///
    /// Releasing an available gate is a no-op. Returns whether the permit
    /// was actually returned.
    pub fn release(&self) -> bool {
        let mut held = self.state();
        if !*held {
            return false;
        }
        *held = false;
        drop(held);
        self.released.notify_one();
        true
    }

    pub fn is_available(&self) -> bool {
        !*self.state()
    }

    // A panic while holding the inner mutex cannot leave the flag half
    // written, so a poisoned lock is still usable.
    fn state(&self) -> MutexGuard<'_, bool> {
        self.held.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}

/// Holds the gate's permit until dropped.
#[derive(Debug)]
#[must_use = "the gate is released as soon as the guard is dropped"]
pub struct GateGuard<'a> {
    gate: &'a Gate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_new_gate_is_available() {
        let gate = Gate::new();
        assert!(gate.is_available());
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let gate = Gate::new();
        {
            let _guard = gate.acquire();
            assert!(!gate.is_available());
            assert!(gate.try_acquire().is_none());
        }
        assert!(gate.is_available());
    }

    #[test]
    fn test_release_on_available_gate_is_noop() {
        let gate = Gate::new();
        assert!(!gate.release());
        assert!(!gate.release());
        assert!(gate.is_available());

        let guard = gate.acquire();
        assert!(gate.release());
        // Guard drop after an explicit release must not flip the state again
        drop(guard);
        assert!(gate.is_available());
    }

    #[test]
    fn test_released_after_panic_while_held() {
        let gate = Arc::new(Gate::new());
        let worker = Arc::clone(&gate);

        let result = thread::spawn(move || {
            let _guard = worker.acquire();
            panic!("store call failed");
        })
        .join();

        assert!(result.is_err());
        assert!(gate.is_available());
    }

    #[test]
    fn test_serializes_threads() {
        let gate = Arc::new(Gate::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    for _ in 0..5 {
                        let _guard = gate.acquire();
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(1));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(gate.is_available());
    }
}
