//! Centralized configuration for the snapshot handoff handler.
//!
//! Goals:
//! - One explicit struct built at process start, passed by reference (no global path state).
//! - `HandoffConfig::from_env()` reads SNAPCLONE_* variables; CLI flags override via builder setters.
//! - Paths of the stores and VADP helper scripts derive from `work_dir` unless set explicitly.
//!
//! ENV:
//!   SNAPCLONE_WORK_DIR, SNAPCLONE_CRED_DB, SNAPCLONE_CLONE_DB,
//!   SNAPCLONE_HELPER_INTERPRETER,
//!   SNAPCLONE_ARRAY_KIND (ontap|noop), SNAPCLONE_ARRAY_PORT, SNAPCLONE_ARRAY_TRANSPORT (https|http),
//!   SNAPCLONE_ARRAY_VSERVER, SNAPCLONE_ARRAY_INSECURE, SNAPCLONE_ARRAY_TIMEOUT_SECS,
//!   SNAPCLONE_STRICT_REMOVE

use anyhow::{anyhow, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_WORK_DIR: &str = "/opt/snapclone";
pub const DEFAULT_ARRAY_ADDRESS: &str = "chief-netapp1";
pub const CRED_DB_FILE: &str = "cred_db";
pub const CLONE_DB_FILE: &str = "script_db";
pub const VADP_SETUP_SCRIPT: &str = "vadp_setup.pl";
pub const VADP_CLEANUP_SCRIPT: &str = "vadp_cleanup.pl";

/// Which `StorageArray` implementation to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Ontap,
    Noop,
}

impl FromStr for ArrayKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ontap" | "netapp" | "netapp-cmode" => Ok(ArrayKind::Ontap),
            "noop" | "empty" | "none" => Ok(ArrayKind::Noop),
            other => Err(anyhow!("unknown array kind '{}' (expected ontap|noop)", other)),
        }
    }
}

impl fmt::Display for ArrayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArrayKind::Ontap => "ontap",
            ArrayKind::Noop => "noop",
        })
    }
}

/// Storage array connection settings.
#[derive(Clone, Debug)]
pub struct ArrayConfig {
    pub kind: ArrayKind,
    /// Host name or IP of the array (also the credential store key for its login).
    pub address: String,
    pub port: u16,
    /// "https" (default) or "http".
    pub transport: String,
    /// Optional vserver (SVM) to tunnel ZAPI calls to.
    pub vserver: Option<String>,
    pub accept_invalid_certs: bool,
    /// None = no timeout; the invoking orchestrator enforces wall-clock limits.
    pub timeout_secs: Option<u64>,
    /// Explicit login; when empty the credential store is consulted.
    pub user: String,
    pub password: String,
}

impl Default for ArrayConfig {
    fn default() -> Self {
        Self {
            kind: ArrayKind::Ontap,
            address: DEFAULT_ARRAY_ADDRESS.to_string(),
            port: 443,
            transport: "https".to_string(),
            vserver: None,
            accept_invalid_certs: false,
            timeout_secs: None,
            user: String::new(),
            password: String::new(),
        }
    }
}

/// Top-level configuration of one handoff invocation.
#[derive(Clone, Debug)]
pub struct HandoffConfig {
    /// Directory holding the stores and the VADP scripts.
    pub work_dir: PathBuf,
    /// Explicit store paths (None => <work_dir>/cred_db, <work_dir>/script_db).
    pub cred_db: Option<PathBuf>,
    pub clone_db: Option<PathBuf>,
    /// Interpreter for the mount helper scripts (perl).
    pub helper_interpreter: PathBuf,
    pub array: ArrayConfig,
    /// REMOVE_SNAP: fail the invocation when the array delete fails.
    pub strict_remove: bool,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            cred_db: None,
            clone_db: None,
            helper_interpreter: PathBuf::from("perl"),
            array: ArrayConfig::default(),
            strict_remove: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "yes" || s == "on"
    })
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl HandoffConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_nonempty("SNAPCLONE_WORK_DIR") {
            cfg.work_dir = PathBuf::from(v);
        }
        if let Some(v) = env_nonempty("SNAPCLONE_CRED_DB") {
            cfg.cred_db = Some(PathBuf::from(v));
        }
        if let Some(v) = env_nonempty("SNAPCLONE_CLONE_DB") {
            cfg.clone_db = Some(PathBuf::from(v));
        }
        if let Some(v) = env_nonempty("SNAPCLONE_HELPER_INTERPRETER") {
            cfg.helper_interpreter = PathBuf::from(v);
        }

        // ----- array -----
        if let Some(v) = env_nonempty("SNAPCLONE_ARRAY_KIND") {
            match v.parse() {
                Ok(k) => cfg.array.kind = k,
                Err(e) => log::warn!("ignoring SNAPCLONE_ARRAY_KIND: {}", e),
            }
        }
        if let Some(v) = env_nonempty("SNAPCLONE_ARRAY_PORT") {
            if let Ok(n) = v.parse::<u16>() {
                cfg.array.port = n;
            }
        }
        if let Some(v) = env_nonempty("SNAPCLONE_ARRAY_TRANSPORT") {
            cfg.array.transport = v.to_ascii_lowercase();
        }
        if let Some(v) = env_nonempty("SNAPCLONE_ARRAY_VSERVER") {
            cfg.array.vserver = Some(v);
        }
        if let Some(on) = env_flag("SNAPCLONE_ARRAY_INSECURE") {
            cfg.array.accept_invalid_certs = on;
        }
        if let Some(v) = env_nonempty("SNAPCLONE_ARRAY_TIMEOUT_SECS") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.array.timeout_secs = if n == 0 { None } else { Some(n) };
            }
        }

        if let Some(on) = env_flag("SNAPCLONE_STRICT_REMOVE") {
            cfg.strict_remove = on;
        }

        cfg
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_work_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn with_cred_db<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.cred_db = path.map(Into::into);
        self
    }

    pub fn with_clone_db<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.clone_db = path.map(Into::into);
        self
    }

    pub fn with_helper_interpreter<P: Into<PathBuf>>(mut self, exe: P) -> Self {
        self.helper_interpreter = exe.into();
        self
    }

    pub fn with_array_kind(mut self, kind: ArrayKind) -> Self {
        self.array.kind = kind;
        self
    }

    pub fn with_array_address<S: Into<String>>(mut self, address: S) -> Self {
        self.array.address = address.into();
        self
    }

    pub fn with_array_port(mut self, port: u16) -> Self {
        self.array.port = port;
        self
    }

    pub fn with_array_transport<S: Into<String>>(mut self, transport: S) -> Self {
        self.array.transport = transport.into();
        self
    }

    pub fn with_array_login<S: Into<String>>(mut self, user: S, password: S) -> Self {
        self.array.user = user.into();
        self.array.password = password.into();
        self
    }

    pub fn with_strict_remove(mut self, on: bool) -> Self {
        self.strict_remove = on;
        self
    }

    /// Finish the builder, validating what can be checked up front.
    pub fn build(self) -> Result<Self> {
        match self.array.transport.as_str() {
            "https" | "http" => {}
            other => return Err(anyhow!("unsupported array transport '{}'", other)),
        }
        if self.array.address.trim().is_empty() {
            return Err(anyhow!("storage array address must not be empty"));
        }
        Ok(self)
    }

    // ----- derived paths -----

    pub fn cred_db_path(&self) -> PathBuf {
        self.cred_db
            .clone()
            .unwrap_or_else(|| self.work_dir.join(CRED_DB_FILE))
    }

    pub fn clone_db_path(&self) -> PathBuf {
        self.clone_db
            .clone()
            .unwrap_or_else(|| self.work_dir.join(CLONE_DB_FILE))
    }

    pub fn setup_script(&self) -> PathBuf {
        self.work_dir.join(VADP_SETUP_SCRIPT)
    }

    pub fn cleanup_script(&self) -> PathBuf {
        self.work_dir.join(VADP_CLEANUP_SCRIPT)
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl fmt::Display for HandoffConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HandoffConfig {{ \
             work_dir: {}, \
             cred_db: {}, \
             clone_db: {}, \
             helper: {}, \
             array: {}://{}:{} ({}), \
             vserver: {}, \
             insecure: {}, \
             timeout: {}, \
             strict_remove: {} \
             }}",
            self.work_dir.display(),
            self.cred_db_path().display(),
            self.clone_db_path().display(),
            self.helper_interpreter.display(),
            self.array.transport,
            self.array.address,
            self.array.port,
            self.array.kind,
            self.array.vserver.as_deref().unwrap_or("-"),
            self.array.accept_invalid_certs,
            self.array
                .timeout_secs
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "none".to_string()),
            self.strict_remove,
        )
    }
}
