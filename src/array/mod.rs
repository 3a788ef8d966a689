//! array - storage array control channel.
//!
//! `StorageArray` - единый интерфейс для оркестратора; реализации:
//! - `NoopArray`  - всё успешно, ничего не делает (sample/dry-run)
//! - `OntapArray` - NetApp ZAPI (XML over HTTP(S))
//!
//! Адаптер только классифицирует ответ массива (`FaultKind`); какие ответы
//! считать успехом ("already exists", "already online", ...) решает оркестратор.

use std::fmt;

pub mod noop;
pub mod ontap;
pub mod zapi;

pub use noop::NoopArray;
pub use ontap::OntapArray;

/// Classification of a failed array call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    AlreadyExists,
    AlreadyOnline,
    AlreadyOffline,
    NotFound,
    Transport,
    Other,
}

/// A failed array operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayFault {
    pub op: String,
    pub kind: FaultKind,
    pub reason: String,
}

impl ArrayFault {
    pub fn new(op: &str, kind: FaultKind, reason: impl Into<String>) -> Self {
        Self {
            op: op.to_string(),
            kind,
            reason: reason.into(),
        }
    }

    pub fn transport(op: &str, reason: impl Into<String>) -> Self {
        Self::new(op, FaultKind::Transport, reason)
    }

    pub fn is(&self, kind: FaultKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for ArrayFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({:?}): {}", self.op, self.kind, self.reason)
    }
}

impl std::error::Error for ArrayFault {}

pub type ArrayResult<T> = std::result::Result<T, ArrayFault>;

/// LUN path on the array: `/vol/<volume>/<lun>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LunPath {
    volume: String,
    lun: String,
}

impl LunPath {
    /// Parse `/vol/<volume>/<lun>`; None when the volume component is missing.
    pub fn parse(path: &str) -> Option<Self> {
        // "/vol/some_vol/lun_name" -> ["", "vol", "some_vol", "lun_name"]
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() < 3 || parts[2].is_empty() {
            return None;
        }
        Some(Self {
            volume: parts[2].to_string(),
            lun: parts[3..].join("/"),
        })
    }

    pub fn new(volume: &str, lun: &str) -> Self {
        Self {
            volume: volume.to_string(),
            lun: lun.to_string(),
        }
    }

    pub fn volume(&self) -> &str {
        &self.volume
    }

    pub fn lun(&self) -> &str {
        &self.lun
    }

    /// Same LUN name on another volume (путь LUN'а внутри клона).
    pub fn on_volume(&self, volume: &str) -> Self {
        Self::new(volume, &self.lun)
    }
}

impl fmt::Display for LunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/vol/{}/{}", self.volume, self.lun)
    }
}

/// Name of the volume cloned from `snapshot` of `volume`.
///
/// Anything outside `[A-Za-z0-9_]` becomes `_`:
/// `("vol1", "snap-2024-01-01")` -> `vol1_snap_2024_01_01`.
pub fn clone_volume_name(volume: &str, snapshot: &str) -> String {
    format!("{}_{}", volume, snapshot)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Storage array capability used by the handoff orchestrator.
pub trait StorageArray {
    /// Short label for logs ("ontap", "noop", ...).
    fn kind(&self) -> &'static str;

    /// Serial -> LUN path. `Ok(None)` when no LUN has that serial.
    fn resolve_path(&self, serial: &str) -> ArrayResult<Option<LunPath>>;

    /// LUN path -> serial. `Ok(None)` when the path is unknown.
    fn resolve_serial(&self, path: &LunPath) -> ArrayResult<Option<String>>;

    fn create_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()>;

    fn delete_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()>;

    fn clone_volume(
        &self,
        parent_volume: &str,
        parent_snapshot: &str,
        clone_volume: &str,
    ) -> ArrayResult<()>;

    fn map_lun(&self, path: &LunPath, access_group: &str) -> ArrayResult<()>;

    fn online_lun(&self, path: &LunPath) -> ArrayResult<()>;

    fn offline_volume(&self, volume: &str) -> ArrayResult<()>;

    fn destroy_volume(&self, volume: &str) -> ArrayResult<()>;
}
