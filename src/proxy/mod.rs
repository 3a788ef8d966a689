//! proxy - attaching cloned LUNs to a proxy backup host.
//!
//! Монтирование выполняет внешний helper (VADP perl-скрипты); мы видим только
//! код выхода и объединённый вывод.

use anyhow::Result;

use crate::store::Credentials;

pub mod vadp;

pub use vadp::VadpHelper;

/// Result of one helper run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperReport {
    /// stdout followed by stderr.
    pub output: String,
    /// Exit code; None when the helper was killed by a signal.
    pub status: Option<i32>,
}

impl HelperReport {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// "0", "2", ... or "signal".
    pub fn status_text(&self) -> String {
        self.status
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }

    /// Last non-empty line of output (для логов).
    pub fn last_line(&self) -> &str {
        self.output
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// Mount/unmount cloned volumes on a proxy host.
///
/// `Err` means the helper could not be run at all; a helper that ran and
/// failed is an `Ok` report with a non-zero status.
pub trait ProxyMounter {
    fn mount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport>;

    fn unmount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport>;
}
