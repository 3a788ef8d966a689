//! Primary path: HELLO, CREATE_SNAP, REMOVE_SNAP.

use log::{debug, info};
use std::io::Write;

use super::{Absorbed, CreateRequest, Handoff, Outcome, RemoveRequest};
use crate::array::{FaultKind, LunPath, StorageArray};
use crate::metrics;
use crate::proxy::ProxyMounter;
use crate::store::CloneRecord;

impl<'a, A: StorageArray + ?Sized, M: ProxyMounter + ?Sized> Handoff<'a, A, M> {
    /// HELLO: prints `OK` when the LUN exists, `Lun <serial> not found` otherwise.
    pub fn hello(&self, serial: &str, out: &mut dyn Write) -> Outcome {
        match self.source_path(serial) {
            Outcome::Ok(path) => {
                debug!("hello: lun {} is {} ({})", serial, path, self.array.kind());
                emit(out, "OK")
            }
            Outcome::Degraded(r) | Outcome::Fatal(r) => {
                let _ = emit(out, &format!("Lun {} not found", serial));
                Outcome::Fatal(r)
            }
        }
    }

    /// CREATE_SNAP.
    ///
    /// Snapshot failures are fatal. Once the snapshot exists its name is
    /// printed and the protect sequence (protected category only) can at
    /// worst degrade the result.
    pub fn create_snapshot(&self, req: &CreateRequest, out: &mut dyn Write) -> Outcome {
        if let Outcome::Degraded(r) | Outcome::Fatal(r) =
            self.take_snapshot(&req.serial, &req.snap_name)
        {
            return Outcome::Fatal(r);
        }
        if let Outcome::Degraded(r) | Outcome::Fatal(r) = emit(out, &req.snap_name) {
            return Outcome::Fatal(r);
        }

        if !req.is_protected() {
            debug!(
                "category '{}' is not '{}', snapshot {} is not cloned",
                req.category, req.protect_category, req.snap_name
            );
            return Outcome::Ok(());
        }
        info!(
            "protecting snapshot {} of lun {} (category '{}')",
            req.snap_name, req.serial, req.category
        );
        self.protect(req)
    }

    /// Replace the outstanding clone of `req.serial` with a clone of the new snapshot.
    fn protect(&self, req: &CreateRequest) -> Outcome {
        let mut absorbed = Absorbed::new();
        absorbed.take("unmount-proxy", self.unmount_proxy(&req.serial, &req.proxy_host));
        absorbed.take("delete-clone", self.delete_clone(&req.serial));
        let clone_serial = absorbed.take(
            "create-clone",
            self.create_clone(&req.serial, &req.snap_name, &req.access_group),
        );
        if let Some(clone_serial) = clone_serial {
            absorbed.take(
                "mount-proxy",
                self.mount_proxy(&clone_serial, &req.proxy_host, &req.access_group),
            );
        }
        absorbed.finish()
    }

    /// REMOVE_SNAP.
    ///
    /// Removing the protected snapshot tears its clone down first. An
    /// unknown source LUN is fatal; a failed array delete degrades the
    /// result unless strict removal is on.
    pub fn remove_snapshot(&self, req: &RemoveRequest) -> Outcome {
        if req.snap_name.is_empty() {
            return Outcome::Fatal("empty snapshot name".to_string());
        }

        let mut absorbed = Absorbed::new();
        if let Some(rec) = absorbed.take("lookup-clone", self.lookup(&req.serial)) {
            if rec.protects(&req.snap_name) {
                info!(
                    "snapshot {} of lun {} is protected by clone {}, tearing it down",
                    req.snap_name, req.serial, rec.clone_serial
                );
                absorbed.take("unmount-proxy", self.unmount_proxy(&req.serial, &req.proxy_host));
                absorbed.take("delete-clone", self.delete_clone(&req.serial));
            } else if rec.has_clone() {
                debug!(
                    "clone {} of lun {} belongs to snapshot {}, left in place",
                    rec.clone_serial, req.serial, rec.snapshot_name
                );
            }
        }

        let path = match self.source_path(&req.serial) {
            Outcome::Ok(p) => p,
            other => return other.map(|_| ()),
        };
        let removed = self.drop_snapshot(&path, &req.snap_name);
        if removed.is_fatal() && self.strict_remove {
            return removed;
        }
        absorbed.take("delete-snapshot", removed.degrade());
        absorbed.finish()
    }

    pub(super) fn source_path(&self, serial: &str) -> Outcome<LunPath> {
        match self.array.resolve_path(serial) {
            Ok(Some(path)) => Outcome::Ok(path),
            Ok(None) => Outcome::Fatal(format!("Lun {} not found", serial)),
            Err(f) => Outcome::Fatal(format!("lookup of lun {}: {}", serial, f)),
        }
    }

    pub(super) fn lookup(&self, serial: &str) -> Outcome<CloneRecord> {
        match self.clones.get(serial) {
            Ok(rec) => Outcome::Ok(rec),
            Err(e) => Outcome::Fatal(format!("read clone record of {}: {:#}", serial, e)),
        }
    }

    fn take_snapshot(&self, serial: &str, name: &str) -> Outcome<LunPath> {
        if name.is_empty() {
            return Outcome::Fatal("empty snapshot name".to_string());
        }
        let path = match self.source_path(serial) {
            Outcome::Ok(p) => p,
            other => return other,
        };
        match self.array.create_snapshot(path.volume(), name) {
            Ok(()) => info!("snapshot {} of volume {} created", name, path.volume()),
            Err(f) if f.is(FaultKind::AlreadyExists) => {
                info!("snapshot {} of volume {} already exists", name, path.volume())
            }
            Err(f) => return Outcome::Fatal(f.to_string()),
        }
        metrics::record_snapshot_created();
        Outcome::Ok(path)
    }

    fn drop_snapshot(&self, path: &LunPath, name: &str) -> Outcome {
        match self.array.delete_snapshot(path.volume(), name) {
            Ok(()) => info!("snapshot {} of volume {} deleted", name, path.volume()),
            Err(f) if f.is(FaultKind::NotFound) => {
                info!("snapshot {} of volume {} already removed", name, path.volume())
            }
            Err(f) => return Outcome::Fatal(f.to_string()),
        }
        metrics::record_snapshot_removed();
        Outcome::Ok(())
    }
}

/// Result token for the invoking orchestrator (stdout, one line).
fn emit(out: &mut dyn Write, line: &str) -> Outcome {
    match writeln!(out, "{}", line).and_then(|_| out.flush()) {
        Ok(()) => Outcome::Ok(()),
        Err(e) => Outcome::Fatal(format!("write result token: {}", e)),
    }
}
