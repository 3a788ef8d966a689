//! Lightweight process-local metrics for one handoff run.
//!
//! Атомарные счётчики по шагам жизненного цикла:
//! - snapshots (create/remove)
//! - clones (create/delete)
//! - proxy mount/unmount (ok/failed)
//! - degraded steps (поглощённые ошибки augmentation-шагов)

use std::sync::atomic::{AtomicU64, Ordering};

static SNAPSHOTS_CREATED: AtomicU64 = AtomicU64::new(0);
static SNAPSHOTS_REMOVED: AtomicU64 = AtomicU64::new(0);
static CLONES_CREATED: AtomicU64 = AtomicU64::new(0);
static CLONES_DELETED: AtomicU64 = AtomicU64::new(0);
static MOUNTS_OK: AtomicU64 = AtomicU64::new(0);
static MOUNTS_FAILED: AtomicU64 = AtomicU64::new(0);
static UNMOUNTS_OK: AtomicU64 = AtomicU64::new(0);
static UNMOUNTS_FAILED: AtomicU64 = AtomicU64::new(0);
static DEGRADED_STEPS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub snapshots_created: u64,
    pub snapshots_removed: u64,
    pub clones_created: u64,
    pub clones_deleted: u64,
    pub mounts_ok: u64,
    pub mounts_failed: u64,
    pub unmounts_ok: u64,
    pub unmounts_failed: u64,
    pub degraded_steps: u64,
}

impl MetricsSnapshot {
    /// One-line summary for the end-of-run log.
    pub fn summary(&self) -> String {
        format!(
            "snapshots +{}/-{} clones +{}/-{} mounts {}ok/{}failed unmounts {}ok/{}failed degraded {}",
            self.snapshots_created,
            self.snapshots_removed,
            self.clones_created,
            self.clones_deleted,
            self.mounts_ok,
            self.mounts_failed,
            self.unmounts_ok,
            self.unmounts_failed,
            self.degraded_steps,
        )
    }
}

pub fn record_snapshot_created() {
    SNAPSHOTS_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_snapshot_removed() {
    SNAPSHOTS_REMOVED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_clone_created() {
    CLONES_CREATED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_clone_deleted() {
    CLONES_DELETED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_mount(ok: bool) {
    if ok {
        MOUNTS_OK.fetch_add(1, Ordering::Relaxed);
    } else {
        MOUNTS_FAILED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_unmount(ok: bool) {
    if ok {
        UNMOUNTS_OK.fetch_add(1, Ordering::Relaxed);
    } else {
        UNMOUNTS_FAILED.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_degraded_step() {
    DEGRADED_STEPS.fetch_add(1, Ordering::Relaxed);
}

pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        snapshots_created: SNAPSHOTS_CREATED.load(Ordering::Relaxed),
        snapshots_removed: SNAPSHOTS_REMOVED.load(Ordering::Relaxed),
        clones_created: CLONES_CREATED.load(Ordering::Relaxed),
        clones_deleted: CLONES_DELETED.load(Ordering::Relaxed),
        mounts_ok: MOUNTS_OK.load(Ordering::Relaxed),
        mounts_failed: MOUNTS_FAILED.load(Ordering::Relaxed),
        unmounts_ok: UNMOUNTS_OK.load(Ordering::Relaxed),
        unmounts_failed: UNMOUNTS_FAILED.load(Ordering::Relaxed),
        degraded_steps: DEGRADED_STEPS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    for c in [
        &SNAPSHOTS_CREATED,
        &SNAPSHOTS_REMOVED,
        &CLONES_CREATED,
        &CLONES_DELETED,
        &MOUNTS_OK,
        &MOUNTS_FAILED,
        &UNMOUNTS_OK,
        &UNMOUNTS_FAILED,
        &DEGRADED_STEPS,
    ] {
        c.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_every_counter() {
        let s = MetricsSnapshot {
            snapshots_created: 1,
            clones_created: 1,
            mounts_failed: 1,
            degraded_steps: 1,
            ..MetricsSnapshot::default()
        };
        assert_eq!(
            s.summary(),
            "snapshots +1/-0 clones +1/-0 mounts 0ok/1failed unmounts 0ok/0failed degraded 1"
        );
    }
}
