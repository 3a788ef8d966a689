use anyhow::{Context, Result};
use log::{error, info, warn};

use snapclone::array::{NoopArray, OntapArray, StorageArray};
use snapclone::config::{ArrayKind, HandoffConfig};
use snapclone::crypto::SealKey;
use snapclone::handoff::{Handoff, Operation, Outcome};
use snapclone::proxy::VadpHelper;
use snapclone::store::{CloneStore, CredStore, Credentials};

use super::cli::Cli;

/// Env defaults overridden by the command line.
pub fn config_from_cli(cli: &Cli) -> Result<HandoffConfig> {
    let mut cfg = HandoffConfig::from_env()
        .with_array_address(cli.storage_array.as_str())
        .with_array_login(cli.username.as_str(), cli.password.as_str());
    if let Some(dir) = &cli.work_dir {
        cfg = cfg.with_work_dir(dir.clone());
    }
    if let Some(kind) = &cli.array_kind {
        cfg = cfg.with_array_kind(kind.parse()?);
    }
    if cli.strict_remove {
        cfg = cfg.with_strict_remove(true);
    }
    cfg.build()
}

/// Everything one invocation works with.
pub struct Session {
    pub clones: CloneStore,
    pub creds: CredStore,
    pub array: Box<dyn StorageArray>,
    pub mounter: VadpHelper,
    strict_remove: bool,
}

impl Session {
    pub fn open(cfg: &HandoffConfig) -> Result<Self> {
        let key = SealKey::from_env()?;
        let creds = CredStore::open(&cfg.cred_db_path(), key)?;
        let clones = CloneStore::open(&cfg.clone_db_path())?;
        let array = connect_array(cfg, &creds)?;
        Ok(Self {
            clones,
            creds,
            array,
            mounter: VadpHelper::from_config(cfg),
            strict_remove: cfg.strict_remove,
        })
    }

    pub fn handoff(&self) -> Handoff<'_, dyn StorageArray, VadpHelper> {
        Handoff::new(self.array.as_ref(), &self.mounter, &self.clones, &self.creds)
            .with_strict_remove(self.strict_remove)
    }
}

fn connect_array(cfg: &HandoffConfig, creds: &CredStore) -> Result<Box<dyn StorageArray>> {
    match cfg.array.kind {
        ArrayKind::Noop => {
            info!("using no-op storage array");
            Ok(Box::new(NoopArray::new()))
        }
        ArrayKind::Ontap => {
            let login = if cfg.array.user.is_empty() || cfg.array.password.is_empty() {
                let login = creds
                    .get(&cfg.array.address)
                    .with_context(|| format!("login of storage array {}", cfg.array.address))?;
                if login.is_empty() {
                    warn!(
                        "no login for storage array '{}' in {}",
                        cfg.array.address,
                        creds.path().display()
                    );
                }
                login
            } else {
                Credentials::new(&cfg.array.user, &cfg.array.password)
            };
            Ok(Box::new(OntapArray::connect(&cfg.array, login)?))
        }
    }
}

/// Log the final outcome and turn it into the process exit status.
pub fn finish(op: Operation, outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Ok(()) => info!("{} done", op),
        Outcome::Degraded(r) => warn!("{} done, degraded: {}", op, r),
        Outcome::Fatal(r) => error!("{} failed: {}", op, r),
    }
    outcome.exit_code()
}
