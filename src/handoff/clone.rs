//! Clone creation and teardown.

use log::{debug, info};

use super::{Handoff, Outcome};
use crate::array::{clone_volume_name, FaultKind, StorageArray};
use crate::metrics;
use crate::proxy::ProxyMounter;
use crate::store::CloneRecord;

impl<'a, A: StorageArray + ?Sized, M: ProxyMounter + ?Sized> Handoff<'a, A, M> {
    /// Clone `snap` into its own volume, expose it to `access_group` and
    /// record it. Returns the clone serial.
    ///
    /// Nothing is recorded unless the clone serial was resolved.
    pub fn create_clone(&self, serial: &str, snap: &str, access_group: &str) -> Outcome<String> {
        if snap.is_empty() {
            return Outcome::Degraded("empty snapshot name".to_string());
        }
        let source = match self.source_path(serial) {
            Outcome::Ok(p) => p,
            Outcome::Degraded(r) | Outcome::Fatal(r) => return Outcome::Degraded(r),
        };
        if source.lun().is_empty() {
            return Outcome::Degraded(format!("no lun in path {}", source));
        }

        let clone_volume = clone_volume_name(source.volume(), snap);
        match self.array.clone_volume(source.volume(), snap, &clone_volume) {
            Ok(()) => info!(
                "volume {} cloned from {}@{}",
                clone_volume,
                source.volume(),
                snap
            ),
            // retried run: the clone is there but was never recorded
            Err(f) if f.is(FaultKind::AlreadyExists) => {
                info!("clone volume {} already exists, reusing it", clone_volume)
            }
            Err(f) => return Outcome::Degraded(f.to_string()),
        }

        let clone_path = source.on_volume(&clone_volume);
        match self.array.map_lun(&clone_path, access_group) {
            Ok(()) => {}
            Err(f) if f.is(FaultKind::AlreadyExists) => {
                debug!("{} already mapped to '{}'", clone_path, access_group)
            }
            Err(f) => {
                return Outcome::Degraded(format!("{}; clone volume {} left unmapped", f, clone_volume))
            }
        }
        match self.array.online_lun(&clone_path) {
            Ok(()) => {}
            Err(f) if f.is(FaultKind::AlreadyOnline) => debug!("{} already online", clone_path),
            Err(f) => {
                return Outcome::Degraded(format!("{}; clone volume {} left offline", f, clone_volume))
            }
        }

        let clone_serial = match self.array.resolve_serial(&clone_path) {
            Ok(Some(s)) if !s.is_empty() => s,
            Ok(_) => {
                return Outcome::Degraded(format!(
                    "no serial for cloned lun {}, clone left untracked",
                    clone_path
                ))
            }
            Err(f) => {
                return Outcome::Degraded(format!("{}; clone {} left untracked", f, clone_path))
            }
        };

        let rec = CloneRecord {
            source_serial: serial.to_string(),
            clone_serial: clone_serial.clone(),
            snapshot_name: snap.to_string(),
            access_group: access_group.to_string(),
        };
        if let Err(e) = self.clones.put(&rec) {
            return Outcome::Fatal(format!(
                "record clone {} of {}: {:#}",
                clone_serial, serial, e
            ));
        }
        metrics::record_clone_created();
        info!(
            "clone {} ({}) of lun {} mapped to '{}'",
            clone_serial, clone_path, serial, access_group
        );
        Outcome::Ok(clone_serial)
    }

    /// Forget and destroy the outstanding clone of `serial`.
    ///
    /// The record is deleted before the array is touched; a failed offline
    /// or destroy leaves an untracked clone volume behind.
    pub fn delete_clone(&self, serial: &str) -> Outcome {
        let rec = match self.lookup(serial) {
            Outcome::Ok(r) => r,
            other => return other.map(|_| ()),
        };
        if let Err(e) = self.clones.delete(serial) {
            return Outcome::Fatal(format!("delete clone record of {}: {:#}", serial, e));
        }
        if !rec.has_clone() {
            debug!("no clone on record for lun {}", serial);
            return Outcome::Ok(());
        }

        info!("deleting clone {} of lun {}", rec.clone_serial, serial);
        let path = match self.array.resolve_path(&rec.clone_serial) {
            Ok(Some(p)) => p,
            Ok(None) => {
                return Outcome::Degraded(format!("cloned lun {} not found", rec.clone_serial))
            }
            Err(f) => return Outcome::Degraded(f.to_string()),
        };
        match self.array.offline_volume(path.volume()) {
            Ok(()) => {}
            Err(f) if f.is(FaultKind::AlreadyOffline) => {
                debug!("volume {} already offline", path.volume())
            }
            Err(f) => {
                return Outcome::Degraded(format!(
                    "{}; clone volume {} left behind",
                    f,
                    path.volume()
                ))
            }
        }
        if let Err(f) = self.array.destroy_volume(path.volume()) {
            return Outcome::Degraded(format!("{}; clone volume {} left behind", f, path.volume()));
        }
        metrics::record_clone_deleted();
        info!("clone volume {} destroyed", path.volume());
        Outcome::Ok(())
    }
}
