//! Bounded admission for concurrent pipeline runs.
//!
//! A fixed-capacity counting gate owned by the orchestrator. Runs block at
//! admission until a slot frees; slots are released through an RAII permit
//! so a panicking run cannot leak capacity. Admission order is best-effort
//! FIFO under the condvar's scheduling.

use parking_lot::{Condvar, Mutex};

/// Counting gate that bounds how many runs may be in flight at once.
pub struct AdmissionGate {
    capacity: usize,
    in_flight: Mutex<usize>,
    freed: Condvar,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` runs.
    ///
    /// A capacity of zero would deadlock every caller; it is clamped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: Mutex::new(0),
            freed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }

    /// Block until a slot is free, then claim it.
    ///
    /// The slot is returned when the permit drops.
    pub fn admit(&self) -> SlotPermit<'_> {
        let mut count = self.in_flight.lock();
        while *count >= self.capacity {
            self.freed.wait(&mut count);
        }
        *count += 1;
        SlotPermit { gate: self }
    }

    fn free(&self) {
        let mut count = self.in_flight.lock();
        *count -= 1;
        drop(count);
        self.freed.notify_one();
    }
}

/// RAII handle for one admission slot.
pub struct SlotPermit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for SlotPermit<'_> {
    fn drop(&mut self) {
        self.gate.free();
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
    fn zero_capacity_is_clamped() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
        // Must not deadlock.
        let permit = gate.admit();
        assert_eq!(gate.in_flight(), 1);
        drop(permit);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn dropping_permit_frees_slot() {
        let gate = AdmissionGate::new(2);
        let a = gate.admit();
        let b = gate.admit();
        assert_eq!(gate.in_flight(), 2);
        drop(a);
        assert_eq!(gate.in_flight(), 1);
        drop(b);
        assert_eq!(gate.in_flight(), 0);
    }

    #[test]
    fn flood_never_exceeds_ceiling() {
        const CEILING: usize = 3;
        const RUNS: usize = 12;

        let gate = Arc::new(AdmissionGate::new(CEILING));
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..RUNS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let current = Arc::clone(&current);
                let peak = Arc::clone(&peak);
                thread::spawn(move || {
                    let _permit = gate.admit();
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(20));
                    current.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= CEILING);
        assert_eq!(gate.in_flight(), 0);
    }
}
