//! store/table - маленькая keyed-таблица строковых записей в одном файле.
//!
//! Формат файла (LE):
//! - Header (16 B):
//!   [magic8][version u32=1][field_count u32]
//! - Body: последовательность записей
//!   [len u32][crc32 u32][payload len bytes]
//!   payload = key + field_count полей, каждое [u16 len][UTF-8 bytes]
//!
//! Политика:
//! - put/delete/reset - атомарная перезапись файла (tmp+rename) под exclusive lock.
//! - get/list        - чтение под shared lock.
//! - Обрезанный хвост игнорируется (частичная запись), CRC mismatch - ошибка.
//! - Ключ уникален: put заменяет существующую запись (last-writer-wins).

use anyhow::{anyhow, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::lock::StoreLock;

const VERSION: u32 = 1;
const HDR_SIZE: usize = 16;
const REC_HDR_SIZE: usize = 8;

/// One decoded record: key + fields in declaration order.
pub type Row = (String, Vec<String>);

#[cfg(unix)]
fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    use std::fs::File;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let dir = File::open(parent)?;
            dir.sync_all()?;
        }
    }
    Ok(())
}
#[cfg(not(unix))]
fn fsync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[derive(Debug, Clone)]
pub struct RecordTable {
    path: PathBuf,
    magic: [u8; 8],
    fields: u32,
}

impl RecordTable {
    /// Open the table, creating an empty one if the file does not exist.
    /// Existing data is never touched here.
    pub fn open_or_create(path: &Path, magic: &[u8; 8], fields: u32) -> Result<Self> {
        let table = Self {
            path: path.to_path_buf(),
            magic: *magic,
            fields,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create store dir {}", parent.display()))?;
            }
        }

        let _lk = StoreLock::exclusive(path)?;
        if path.exists() {
            // Validate header of the existing table.
            table.read_rows()?;
        } else {
            table.write_rows(&BTreeMap::new())?;
        }
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a row by key.
    pub fn get(&self, key: &str) -> Result<Option<Vec<String>>> {
        let _lk = StoreLock::shared(&self.path)?;
        let mut rows = self.read_rows()?;
        Ok(rows.remove(key))
    }

    /// All rows ordered by key.
    pub fn list(&self) -> Result<Vec<Row>> {
        let _lk = StoreLock::shared(&self.path)?;
        Ok(self.read_rows()?.into_iter().collect())
    }

    /// Upsert: replaces any existing row for `key`.
    pub fn put(&self, key: &str, fields: &[&str]) -> Result<()> {
        if fields.len() != self.fields as usize {
            return Err(anyhow!(
                "{}: expected {} fields, got {}",
                self.path.display(),
                self.fields,
                fields.len()
            ));
        }
        check_len(key)?;
        for f in fields {
            check_len(f)?;
        }

        let _lk = StoreLock::exclusive(&self.path)?;
        let mut rows = self.read_rows()?;
        rows.insert(
            key.to_string(),
            fields.iter().map(|s| s.to_string()).collect(),
        );
        self.write_rows(&rows)
    }

    /// Remove the row for `key`. Returns whether it existed; absent key is a no-op.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let _lk = StoreLock::exclusive(&self.path)?;
        let mut rows = self.read_rows()?;
        if rows.remove(key).is_none() {
            return Ok(false);
        }
        self.write_rows(&rows)?;
        Ok(true)
    }

    /// Drop every row (destructive).
    pub fn reset(&self) -> Result<()> {
        let _lk = StoreLock::exclusive(&self.path)?;
        self.write_rows(&BTreeMap::new())
    }

    // ---------------- internals (caller holds the lock) ----------------

    fn read_rows(&self) -> Result<BTreeMap<String, Vec<String>>> {
        let mut f = OpenOptions::new()
            .read(true)
            .open(&self.path)
            .with_context(|| format!("open table {}", self.path.display()))?;
        let mut buf = Vec::new();
        f.read_to_end(&mut buf)
            .with_context(|| format!("read table {}", self.path.display()))?;

        if buf.len() < HDR_SIZE {
            return Err(anyhow!("table {} too small (< header)", self.path.display()));
        }
        if buf[0..8] != self.magic {
            return Err(anyhow!("bad table magic at {}", self.path.display()));
        }
        let ver = LittleEndian::read_u32(&buf[8..12]);
        if ver != VERSION {
            return Err(anyhow!("unsupported table version {}", ver));
        }
        let fields = LittleEndian::read_u32(&buf[12..16]);
        if fields != self.fields {
            return Err(anyhow!(
                "table {} has {} fields, expected {}",
                self.path.display(),
                fields,
                self.fields
            ));
        }

        let mut rows = BTreeMap::new();
        let mut pos = HDR_SIZE;
        while pos + REC_HDR_SIZE <= buf.len() {
            let len = LittleEndian::read_u32(&buf[pos..pos + 4]) as usize;
            let crc = LittleEndian::read_u32(&buf[pos + 4..pos + 8]);
            let start = pos + REC_HDR_SIZE;
            if start + len > buf.len() {
                // truncated tail
                break;
            }
            let payload = &buf[start..start + len];
            if crc32fast::hash(payload) != crc {
                return Err(anyhow!(
                    "table {}: record at offset {} failed crc check",
                    self.path.display(),
                    pos
                ));
            }
            let (key, values) = decode_row(payload, self.fields as usize)
                .with_context(|| format!("decode record at offset {}", pos))?;
            rows.insert(key, values);
            pos = start + len;
        }
        Ok(rows)
    }

    fn write_rows(&self, rows: &BTreeMap<String, Vec<String>>) -> Result<()> {
        let mut out = Vec::with_capacity(HDR_SIZE + rows.len() * 64);
        out.extend_from_slice(&self.magic);
        let mut buf4 = [0u8; 4];
        LittleEndian::write_u32(&mut buf4, VERSION);
        out.extend_from_slice(&buf4);
        LittleEndian::write_u32(&mut buf4, self.fields);
        out.extend_from_slice(&buf4);

        // BTreeMap => детерминированный порядок по ключу
        for (key, values) in rows {
            let payload = encode_row(key, values);
            LittleEndian::write_u32(&mut buf4, payload.len() as u32);
            out.extend_from_slice(&buf4);
            LittleEndian::write_u32(&mut buf4, crc32fast::hash(&payload));
            out.extend_from_slice(&buf4);
            out.extend_from_slice(&payload);
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);
        {
            let mut tf = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp)
                .with_context(|| format!("open tmp {}", tmp.display()))?;
            tf.write_all(&out)?;
            tf.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        let _ = fsync_parent_dir(&self.path);
        Ok(())
    }
}

fn check_len(s: &str) -> Result<()> {
    if s.len() > u16::MAX as usize {
        return Err(anyhow!("field too long ({} B)", s.len()));
    }
    Ok(())
}

fn encode_row(key: &str, values: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf2 = [0u8; 2];
    for s in std::iter::once(key).chain(values.iter().map(|v| v.as_str())) {
        LittleEndian::write_u16(&mut buf2, s.len() as u16);
        out.extend_from_slice(&buf2);
        out.extend_from_slice(s.as_bytes());
    }
    out
}

fn decode_row(payload: &[u8], fields: usize) -> Result<Row> {
    let mut pos = 0usize;
    let mut next = || -> Result<String> {
        if pos + 2 > payload.len() {
            return Err(anyhow!("record too short"));
        }
        let len = LittleEndian::read_u16(&payload[pos..pos + 2]) as usize;
        pos += 2;
        if pos + len > payload.len() {
            return Err(anyhow!("record field overruns payload"));
        }
        let s = std::str::from_utf8(&payload[pos..pos + len])
            .map_err(|e| anyhow!("field utf8: {}", e))?
            .to_string();
        pos += len;
        Ok(s)
    };
    let key = next()?;
    let mut values = Vec::with_capacity(fields);
    for _ in 0..fields {
        values.push(next()?);
    }
    Ok((key, values))
}
