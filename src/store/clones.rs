//! store/clones - clone tracking store.
//!
//! Одна активная запись на source serial: какой клон (serial) сделан из какого
//! снапшота и в какую access group он выставлен. Нужна, чтобы позже
//! размонтировать и удалить клон при удалении защищённого снапшота.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use super::table::RecordTable;

const MAGIC: &[u8; 8] = b"SCCLONE1";
const FIELDS: u32 = 3;

/// Outstanding clone of a source volume.
///
/// An empty `clone_serial` means "no clone outstanding" and is what
/// [`CloneStore::get`] returns for unknown sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloneRecord {
    pub source_serial: String,
    pub clone_serial: String,
    pub snapshot_name: String,
    pub access_group: String,
}

impl CloneRecord {
    pub fn empty(source_serial: &str) -> Self {
        Self {
            source_serial: source_serial.to_string(),
            ..Self::default()
        }
    }

    pub fn has_clone(&self) -> bool {
        !self.clone_serial.is_empty()
    }

    /// Is `snapshot` the snapshot this record's clone was made from?
    pub fn protects(&self, snapshot: &str) -> bool {
        !snapshot.is_empty() && self.snapshot_name == snapshot
    }
}

pub struct CloneStore {
    table: RecordTable,
}

impl CloneStore {
    /// Open the store; creates the backing table if absent, never drops data.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            table: RecordTable::open_or_create(path, MAGIC, FIELDS)?,
        })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    /// Upsert the record for `rec.source_serial`.
    pub fn put(&self, rec: &CloneRecord) -> Result<()> {
        self.table.put(
            &rec.source_serial,
            &[&rec.clone_serial, &rec.snapshot_name, &rec.access_group],
        )
    }

    /// Record for `source_serial`, or the empty record when none exists.
    pub fn get(&self, source_serial: &str) -> Result<CloneRecord> {
        let rec = match self.table.get(source_serial)? {
            Some(mut fields) if fields.len() == FIELDS as usize => {
                let access_group = fields.pop().unwrap_or_default();
                let snapshot_name = fields.pop().unwrap_or_default();
                let clone_serial = fields.pop().unwrap_or_default();
                CloneRecord {
                    source_serial: source_serial.to_string(),
                    clone_serial,
                    snapshot_name,
                    access_group,
                }
            }
            _ => CloneRecord::empty(source_serial),
        };
        Ok(rec)
    }

    /// Remove the record; no-op when absent.
    pub fn delete(&self, source_serial: &str) -> Result<bool> {
        self.table.delete(source_serial)
    }

    pub fn list(&self) -> Result<Vec<CloneRecord>> {
        let rows = self.table.list()?;
        Ok(rows
            .into_iter()
            .map(|(source_serial, mut f)| {
                f.resize(FIELDS as usize, String::new());
                CloneRecord {
                    source_serial,
                    clone_serial: std::mem::take(&mut f[0]),
                    snapshot_name: std::mem::take(&mut f[1]),
                    access_group: std::mem::take(&mut f[2]),
                }
            })
            .collect())
    }
}
