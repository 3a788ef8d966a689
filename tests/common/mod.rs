//! Общие фикстуры интеграционных тестов: временный каталог, записывающий
//! fake-массив и fake-mounter с общим журналом вызовов.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};

use snapclone::array::{ArrayFault, ArrayResult, FaultKind, LunPath, StorageArray};
use snapclone::handoff::Handoff;
use snapclone::proxy::{HelperReport, ProxyMounter};
use snapclone::store::{CloneStore, CredStore, Credentials};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("sctest-{prefix}-{pid}-{t}-{id}"))
}

/// Shared call log of the fakes, in invocation order.
pub type Journal = Rc<RefCell<Vec<String>>>;

/// In-memory array: serial -> path, snapshots, cloned volumes.
pub struct FakeArray {
    journal: Journal,
    luns: RefCell<BTreeMap<String, String>>,
    snapshots: RefCell<BTreeSet<(String, String)>>,
    volumes: RefCell<BTreeSet<String>>,
    faults: RefCell<BTreeMap<&'static str, FaultKind>>,
    no_clone_serial: Cell<bool>,
}

impl FakeArray {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            luns: RefCell::new(BTreeMap::new()),
            snapshots: RefCell::new(BTreeSet::new()),
            volumes: RefCell::new(BTreeSet::new()),
            faults: RefCell::new(BTreeMap::new()),
            no_clone_serial: Cell::new(false),
        }
    }

    pub fn add_lun(&self, serial: &str, path: &str) {
        self.luns
            .borrow_mut()
            .insert(serial.to_string(), path.to_string());
        if let Some(p) = LunPath::parse(path) {
            self.volumes.borrow_mut().insert(p.volume().to_string());
        }
    }

    pub fn add_snapshot(&self, volume: &str, name: &str) {
        self.snapshots
            .borrow_mut()
            .insert((volume.to_string(), name.to_string()));
    }

    pub fn has_snapshot(&self, volume: &str, name: &str) -> bool {
        self.snapshots
            .borrow()
            .contains(&(volume.to_string(), name.to_string()))
    }

    pub fn add_volume(&self, volume: &str) {
        self.volumes.borrow_mut().insert(volume.to_string());
    }

    pub fn has_volume(&self, volume: &str) -> bool {
        self.volumes.borrow().contains(volume)
    }

    /// Every later call of `op` fails with `kind`.
    pub fn fail(&self, op: &'static str, kind: FaultKind) {
        self.faults.borrow_mut().insert(op, kind);
    }

    pub fn heal(&self, op: &'static str) {
        self.faults.borrow_mut().remove(op);
    }

    /// resolve_serial finds nothing for cloned LUNs.
    pub fn hide_clone_serials(&self, on: bool) {
        self.no_clone_serial.set(on);
    }

    fn call(&self, op: &'static str, args: &[&str]) -> ArrayResult<()> {
        self.journal
            .borrow_mut()
            .push(format!("{} {}", op, args.join(" ")));
        match self.faults.borrow().get(op) {
            Some(kind) => Err(ArrayFault::new(op, *kind, "injected fault")),
            None => Ok(()),
        }
    }
}

/// Serial the fake assigns to the LUN of a cloned volume.
pub fn clone_serial_of(volume: &str) -> String {
    format!("C-{}", volume)
}

impl StorageArray for FakeArray {
    fn kind(&self) -> &'static str {
        "fake"
    }

    fn resolve_path(&self, serial: &str) -> ArrayResult<Option<LunPath>> {
        self.call("resolve_path", &[serial])?;
        Ok(self
            .luns
            .borrow()
            .get(serial)
            .and_then(|p| LunPath::parse(p)))
    }

    fn resolve_serial(&self, path: &LunPath) -> ArrayResult<Option<String>> {
        let shown = path.to_string();
        self.call("resolve_serial", &[shown.as_str()])?;
        if let Some((serial, _)) = self.luns.borrow().iter().find(|(_, p)| **p == shown) {
            return Ok(Some(serial.clone()));
        }
        if self.no_clone_serial.get() || !self.has_volume(path.volume()) {
            return Ok(None);
        }
        let serial = clone_serial_of(path.volume());
        self.luns.borrow_mut().insert(serial.clone(), shown);
        Ok(Some(serial))
    }

    fn create_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        self.call("create_snapshot", &[volume, name])?;
        let fresh = self
            .snapshots
            .borrow_mut()
            .insert((volume.to_string(), name.to_string()));
        if !fresh {
            return Err(ArrayFault::new(
                "create_snapshot",
                FaultKind::AlreadyExists,
                "Snapshot copy name already exists",
            ));
        }
        Ok(())
    }

    fn delete_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        self.call("delete_snapshot", &[volume, name])?;
        let existed = self
            .snapshots
            .borrow_mut()
            .remove(&(volume.to_string(), name.to_string()));
        if !existed {
            return Err(ArrayFault::new(
                "delete_snapshot",
                FaultKind::NotFound,
                "Snapshot copy does not exist",
            ));
        }
        Ok(())
    }

    fn clone_volume(&self, parent_volume: &str, parent_snapshot: &str, clone_volume: &str) -> ArrayResult<()> {
        self.call("clone_volume", &[parent_volume, parent_snapshot, clone_volume])?;
        if !self.has_snapshot(parent_volume, parent_snapshot) {
            return Err(ArrayFault::new(
                "clone_volume",
                FaultKind::NotFound,
                "parent snapshot not found",
            ));
        }
        if !self.volumes.borrow_mut().insert(clone_volume.to_string()) {
            return Err(ArrayFault::new(
                "clone_volume",
                FaultKind::AlreadyExists,
                "volume already exists",
            ));
        }
        Ok(())
    }

    fn map_lun(&self, path: &LunPath, access_group: &str) -> ArrayResult<()> {
        let shown = path.to_string();
        self.call("map_lun", &[shown.as_str(), access_group])
    }

    fn online_lun(&self, path: &LunPath) -> ArrayResult<()> {
        let shown = path.to_string();
        self.call("online_lun", &[shown.as_str()])
    }

    fn offline_volume(&self, volume: &str) -> ArrayResult<()> {
        self.call("offline_volume", &[volume])
    }

    fn destroy_volume(&self, volume: &str) -> ArrayResult<()> {
        self.call("destroy_volume", &[volume])?;
        self.volumes.borrow_mut().remove(volume);
        let prefix = format!("/vol/{}/", volume);
        self.luns.borrow_mut().retain(|_, p| !p.starts_with(&prefix));
        Ok(())
    }
}

/// Records mount/unmount requests; exit status is configurable.
pub struct FakeMounter {
    journal: Journal,
    status: Cell<i32>,
    spawn_fails: Cell<bool>,
}

impl FakeMounter {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            status: Cell::new(0),
            spawn_fails: Cell::new(false),
        }
    }

    pub fn exit_with(&self, status: i32) {
        self.status.set(status);
    }

    pub fn fail_spawn(&self, on: bool) {
        self.spawn_fails.set(on);
    }

    fn run(&self, what: &str, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        self.journal.borrow_mut().push(format!(
            "{} {} {} {}",
            what,
            host,
            login.user,
            serials.join(",")
        ));
        if self.spawn_fails.get() {
            return Err(anyhow!("No such file or directory"));
        }
        let status = self.status.get();
        Ok(HelperReport {
            output: format!("{} done with status {}\n", what, status),
            status: Some(status),
        })
    }
}

impl ProxyMounter for FakeMounter {
    fn mount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        self.run("mount", host, login, serials)
    }

    fn unmount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        self.run("unmount", host, login, serials)
    }
}

/// Fakes plus real stores in a fresh directory.
pub struct Rig {
    pub root: PathBuf,
    pub journal: Journal,
    pub array: FakeArray,
    pub mounter: FakeMounter,
    pub clones: CloneStore,
    pub creds: CredStore,
}

impl Rig {
    pub fn new(prefix: &str) -> Result<Self> {
        let root = unique_root(prefix);
        std::fs::create_dir_all(&root)?;
        let journal: Journal = Rc::new(RefCell::new(Vec::new()));
        let clones = CloneStore::open(&root.join("script_db"))?;
        let creds = CredStore::open(&root.join("cred_db"), None)?;
        Ok(Self {
            root,
            array: FakeArray::new(journal.clone()),
            mounter: FakeMounter::new(journal.clone()),
            journal,
            clones,
            creds,
        })
    }

    pub fn handoff(&self) -> Handoff<'_, FakeArray, FakeMounter> {
        Handoff::new(&self.array, &self.mounter, &self.clones, &self.creds)
    }

    /// Calls that change something (lookups filtered out).
    pub fn actions(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .filter(|c| !c.starts_with("resolve_"))
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.journal.borrow_mut().clear();
    }
}
