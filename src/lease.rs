//! Scoped resource tracking.
//!
//! Every per-call resource (a [`JobDescriptor`](crate::JobDescriptor) or a
//! converted [`ValueList`](crate::ValueList)) holds a [`Lease`] taken from
//! the client's [`ResourceLedger`]. The lease is released when the owning
//! value is dropped, so a ledger with `outstanding() == 0` after a call
//! proves nothing leaked on that path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Kind of resource a lease stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A scan job descriptor.
    Descriptor,
    /// A converted UDF argument list.
    ArgList,
}

#[derive(Debug, Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
}

/// Shared acquire/release counters.
///
/// Cloning a ledger shares the counters.
///
/// # Examples
///
/// ```
/// use scan_jobs::lease::{ResourceKind, ResourceLedger};
///
/// let ledger = ResourceLedger::new();
/// {
///     let _lease = ledger.acquire(ResourceKind::ArgList);
///     assert_eq!(ledger.outstanding(), 1);
/// }
/// assert_eq!(ledger.outstanding(), 0);
/// assert_eq!(ledger.acquired(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    counters: Arc<Counters>,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an acquisition and returns the lease that releases it.
    pub fn acquire(&self, kind: ResourceKind) -> Lease {
        self.counters.acquired.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(?kind, "resource acquired");
        Lease {
            kind,
            counters: Arc::clone(&self.counters),
        }
    }

    /// Total acquisitions so far.
    pub fn acquired(&self) -> u64 {
        self.counters.acquired.load(Ordering::Acquire)
    }

    /// Total releases so far.
    pub fn released(&self) -> u64 {
        self.counters.released.load(Ordering::Acquire)
    }

    /// Acquisitions not yet released.
    pub fn outstanding(&self) -> u64 {
        self.acquired().saturating_sub(self.released())
    }
}

/// A held resource. Released exactly once, on drop.
#[derive(Debug)]
pub struct Lease {
    kind: ResourceKind,
    counters: Arc<Counters>,
}

impl Lease {
    /// The kind of resource held.
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }
}

impl Clone for Lease {
    // A copy of a tracked resource is a new acquisition.
    fn clone(&self) -> Self {
        self.counters.acquired.fetch_add(1, Ordering::AcqRel);
        Self {
            kind: self.kind,
            counters: Arc::clone(&self.counters),
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::AcqRel);
        tracing::trace!(kind = ?self.kind, "resource released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_once() {
        let ledger = ResourceLedger::new();
        let lease = ledger.acquire(ResourceKind::Descriptor);
        assert_eq!(lease.kind(), ResourceKind::Descriptor);
        assert_eq!(ledger.outstanding(), 1);
        drop(lease);
        assert_eq!(ledger.acquired(), 1);
        assert_eq!(ledger.released(), 1);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn clone_counts_as_acquisition() {
        let ledger = ResourceLedger::new();
        let lease = ledger.acquire(ResourceKind::ArgList);
        let copy = lease.clone();
        assert_eq!(ledger.outstanding(), 2);
        drop(lease);
        assert_eq!(ledger.outstanding(), 1);
        drop(copy);
        assert_eq!(ledger.outstanding(), 0);
    }

    #[test]
    fn cloned_ledger_shares_counters() {
        let ledger = ResourceLedger::new();
        let other = ledger.clone();
        let _lease = other.acquire(ResourceKind::ArgList);
        assert_eq!(ledger.outstanding(), 1);
    }
}
