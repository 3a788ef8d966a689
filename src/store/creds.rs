//! store/creds - host -> (user, password) credential table.
//!
//! В отличие от clone store, `setup()` деструктивен: сбрасывает все записи.
//! Пароль хранится как "plain:<pw>" или "gcm:<base64>" (если задан ключ, см. crypto).

use anyhow::{anyhow, Result};
use log::debug;
use std::fmt;
use std::path::Path;
use zeroize::Zeroize;

use super::table::RecordTable;
use crate::crypto::SealKey;

const MAGIC: &[u8; 8] = b"SCCREDS1";
const FIELDS: u32 = 2;

const PLAIN_PREFIX: &str = "plain:";
const SEALED_PREFIX: &str = "gcm:";

/// Login for a host. Empty strings when the host is unknown.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: &str, password: &str) -> Self {
        Self {
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.password.zeroize();
    }
}

/// Listing entry (see `snapclone_cred list`).
#[derive(Debug, Clone)]
pub struct CredEntry {
    pub host: String,
    pub user: String,
    pub sealed: bool,
    pub password: Option<String>,
}

pub struct CredStore {
    table: RecordTable,
    key: Option<SealKey>,
}

impl CredStore {
    pub fn open(path: &Path, key: Option<SealKey>) -> Result<Self> {
        Ok(Self {
            table: RecordTable::open_or_create(path, MAGIC, FIELDS)?,
            key,
        })
    }

    pub fn path(&self) -> &Path {
        self.table.path()
    }

    pub fn is_sealing(&self) -> bool {
        self.key.is_some()
    }

    /// Drop every stored credential and start with an empty table.
    pub fn setup(&self) -> Result<()> {
        self.table.reset()
    }

    /// Add or replace the login for `host`.
    pub fn put(&self, host: &str, user: &str, password: &str) -> Result<()> {
        let secret = match &self.key {
            Some(k) => format!("{}{}", SEALED_PREFIX, k.seal(host, password)?),
            None => format!("{}{}", PLAIN_PREFIX, password),
        };
        self.table.put(host, &[user, &secret])
    }

    pub fn delete(&self, host: &str) -> Result<bool> {
        self.table.delete(host)
    }

    /// Login for `host`; unknown hosts yield empty credentials.
    pub fn get(&self, host: &str) -> Result<Credentials> {
        let Some(fields) = self.table.get(host)? else {
            debug!("no credentials stored for host '{}'", host);
            return Ok(Credentials::default());
        };
        let user = fields.first().cloned().unwrap_or_default();
        let secret = fields.get(1).map(|s| s.as_str()).unwrap_or_default();
        let password = self.reveal(host, secret)?;
        Ok(Credentials { user, password })
    }

    /// All entries; passwords are revealed only when `reveal` is set.
    pub fn list(&self, reveal: bool) -> Result<Vec<CredEntry>> {
        let mut out = Vec::new();
        for (host, fields) in self.table.list()? {
            let user = fields.first().cloned().unwrap_or_default();
            let secret = fields.get(1).map(|s| s.as_str()).unwrap_or_default();
            let sealed = secret.starts_with(SEALED_PREFIX);
            let password = if reveal {
                Some(self.reveal(&host, secret)?)
            } else {
                None
            };
            out.push(CredEntry {
                host,
                user,
                sealed,
                password,
            });
        }
        Ok(out)
    }

    fn reveal(&self, host: &str, secret: &str) -> Result<String> {
        if let Some(sealed) = secret.strip_prefix(SEALED_PREFIX) {
            return match &self.key {
                Some(k) => k.open(host, sealed),
                None => Err(anyhow!(
                    "credential for '{}' is sealed but no key is configured",
                    host
                )),
            };
        }
        Ok(secret
            .strip_prefix(PLAIN_PREFIX)
            .unwrap_or(secret)
            .to_string())
    }
}
