//! handoff - snapshot/clone lifecycle orchestrator.
//!
//! Операции одного вызова процесса:
//! - HELLO       - проверка, что LUN с данным serial существует
//! - CREATE_SNAP - снапшот тома; для protected-категории: unmount старого клона,
//!                 удаление старого клона, клон нового снапшота, map+online, mount на proxy
//! - REMOVE_SNAP - если удаляется защищённый снапшот: unmount + удаление клона; затем
//!                 удаление снапшота на массиве
//!
//! Раскладка:
//! - outcome.rs  - Outcome (Ok | Degraded | Fatal) и политика поглощения ошибок
//! - snapshot.rs - hello / create_snapshot / remove_snapshot (primary path)
//! - clone.rs    - create_clone / delete_clone
//! - mount.rs    - mount_proxy / unmount_proxy
//!
//! Состояние между вызовами - только `CloneStore` (одна запись на source serial).

use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

use crate::array::StorageArray;
use crate::proxy::ProxyMounter;
use crate::store::{CloneStore, CredStore};

mod clone;
mod mount;
pub mod outcome;
mod snapshot;

pub use outcome::{Absorbed, Outcome, EXIT_EINVAL, EXIT_FAILURE, EXIT_OK};

/// Operation selector passed by the backup orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Hello,
    CreateSnap,
    RemoveSnap,
}

impl FromStr for Operation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "HELLO" => Ok(Operation::Hello),
            "CREATE_SNAP" => Ok(Operation::CreateSnap),
            "REMOVE_SNAP" => Ok(Operation::RemoveSnap),
            other => Err(anyhow!("Invalid operation: {}", other)),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Hello => "HELLO",
            Operation::CreateSnap => "CREATE_SNAP",
            Operation::RemoveSnap => "REMOVE_SNAP",
        })
    }
}

/// Parameters of CREATE_SNAP.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    pub serial: String,
    pub snap_name: String,
    pub access_group: String,
    pub proxy_host: String,
    pub category: String,
    pub protect_category: String,
}

impl CreateRequest {
    /// Snapshot category matches the protected one => clone and mount it.
    pub fn is_protected(&self) -> bool {
        self.category == self.protect_category
    }
}

/// Parameters of REMOVE_SNAP.
#[derive(Debug, Clone, Default)]
pub struct RemoveRequest {
    pub serial: String,
    pub snap_name: String,
    pub proxy_host: String,
}

/// The orchestrator. Borrowed collaborators, no state of its own.
pub struct Handoff<'a, A: StorageArray + ?Sized, M: ProxyMounter + ?Sized> {
    array: &'a A,
    mounter: &'a M,
    clones: &'a CloneStore,
    creds: &'a CredStore,
    strict_remove: bool,
}

impl<'a, A: StorageArray + ?Sized, M: ProxyMounter + ?Sized> Handoff<'a, A, M> {
    pub fn new(array: &'a A, mounter: &'a M, clones: &'a CloneStore, creds: &'a CredStore) -> Self {
        Self {
            array,
            mounter,
            clones,
            creds,
            strict_remove: false,
        }
    }

    /// REMOVE_SNAP: treat an array delete failure as fatal (exit 1).
    pub fn with_strict_remove(mut self, on: bool) -> Self {
        self.strict_remove = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_selector() {
        assert_eq!("HELLO".parse::<Operation>().unwrap(), Operation::Hello);
        assert_eq!("CREATE_SNAP".parse::<Operation>().unwrap(), Operation::CreateSnap);
        assert_eq!("REMOVE_SNAP".parse::<Operation>().unwrap(), Operation::RemoveSnap);
        assert!("SNAP".parse::<Operation>().is_err());
        assert!("hello".parse::<Operation>().is_err());
        assert_eq!(Operation::RemoveSnap.to_string(), "REMOVE_SNAP");
    }

    #[test]
    fn protected_category_gate() {
        let mut r = CreateRequest {
            category: "daily".into(),
            protect_category: "daily".into(),
            ..CreateRequest::default()
        };
        assert!(r.is_protected());
        r.category = "manual".into();
        assert!(!r.is_protected());
    }
}
