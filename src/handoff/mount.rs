use log::{info, warn};

use super::{Handoff, Outcome};
use crate::array::StorageArray;
use crate::metrics;
use crate::proxy::ProxyMounter;
use crate::store::Credentials;

impl<'a, A: StorageArray + ?Sized, M: ProxyMounter + ?Sized> Handoff<'a, A, M> {
    /// Attach `clone_serial` to the proxy host.
    pub fn mount_proxy(&self, clone_serial: &str, proxy_host: &str, access_group: &str) -> Outcome {
        let login = match self.proxy_login(proxy_host) {
            Outcome::Ok(l) => l,
            other => return other.map(|_| ()),
        };
        let serials = [clone_serial.to_string()];
        let report = match self.mounter.mount(proxy_host, &login, &serials) {
            Ok(r) => r,
            Err(e) => {
                metrics::record_mount(false);
                return Outcome::Degraded(format!("mount helper: {:#}", e));
            }
        };
        metrics::record_mount(report.success());
        if !report.success() {
            return Outcome::Degraded(format!(
                "mount of {} on {} failed (status {}): {}",
                clone_serial,
                proxy_host,
                report.status_text(),
                report.last_line()
            ));
        }
        info!(
            "clone {} mounted on {} (access group '{}')",
            clone_serial, proxy_host, access_group
        );
        Outcome::Ok(())
    }

    /// Detach the outstanding clone of `serial` from the proxy host.
    /// No clone on record is a no-op.
    pub fn unmount_proxy(&self, serial: &str, proxy_host: &str) -> Outcome {
        let rec = match self.lookup(serial) {
            Outcome::Ok(r) => r,
            other => return other.map(|_| ()),
        };
        if !rec.has_clone() {
            info!("no clone on record for lun {}, nothing to unmount", serial);
            return Outcome::Ok(());
        }
        let login = match self.proxy_login(proxy_host) {
            Outcome::Ok(l) => l,
            other => return other.map(|_| ()),
        };
        let serials = [rec.clone_serial.clone()];
        let report = match self.mounter.unmount(proxy_host, &login, &serials) {
            Ok(r) => r,
            Err(e) => {
                metrics::record_unmount(false);
                return Outcome::Degraded(format!("unmount helper: {:#}", e));
            }
        };
        metrics::record_unmount(report.success());
        if !report.success() {
            return Outcome::Degraded(format!(
                "unmount of {} from {} failed (status {}): {}",
                rec.clone_serial,
                proxy_host,
                report.status_text(),
                report.last_line()
            ));
        }
        info!("clone {} unmounted from {}", rec.clone_serial, proxy_host);
        Outcome::Ok(())
    }

    fn proxy_login(&self, proxy_host: &str) -> Outcome<Credentials> {
        match self.creds.get(proxy_host) {
            Ok(login) => {
                if login.is_empty() {
                    warn!("no credentials stored for proxy host '{}'", proxy_host);
                }
                Outcome::Ok(login)
            }
            Err(e) => Outcome::Fatal(format!("credentials of {}: {:#}", proxy_host, e)),
        }
    }
}
