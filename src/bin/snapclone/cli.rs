use clap::Parser;
use std::path::PathBuf;

use snapclone::config::DEFAULT_ARRAY_ADDRESS;

/// Snapshot handoff handler, one operation per invocation.
///
/// Флаги совпадают с тем, что передаёт backup-оркестратор; результат
/// (имя снапшота или OK) печатается в stdout, логи идут в stderr.
#[derive(Parser, Debug)]
#[command(name = "snapclone", version, about = "Snapshot/clone handoff for proxy backups")]
pub struct Cli {
    /// HELLO | CREATE_SNAP | REMOVE_SNAP (missing -> Invalid operation)
    #[arg(long, default_value = "")]
    pub operation: String,
    /// Serial number of the source LUN
    #[arg(long, default_value = "")]
    pub serial: String,
    #[arg(long, default_value = "")]
    pub snap_name: String,
    /// Accepted for compatibility, not used
    #[arg(long)]
    pub issue_time: Option<String>,
    /// Category of the snapshot being created
    #[arg(long, default_value = "manual")]
    pub category: String,
    /// Category whose snapshots are cloned and mounted on the proxy
    #[arg(long, default_value = "daily")]
    pub protect_category: String,
    /// Initiator group the clone is mapped to
    #[arg(long, default_value = "")]
    pub access_group: String,
    #[arg(long, default_value = "")]
    pub proxy_host: String,
    /// Storage array host (also the credential store key of its login)
    #[arg(long, default_value = DEFAULT_ARRAY_ADDRESS)]
    pub storage_array: String,
    /// Array login; looked up in the credential store when empty
    #[arg(long, default_value = "")]
    pub username: String,
    #[arg(long, default_value = "")]
    pub password: String,
    /// Directory with cred_db, script_db and the VADP scripts
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
    /// ontap | noop (overrides SNAPCLONE_ARRAY_KIND)
    #[arg(long)]
    pub array_kind: Option<String>,
    /// Fail REMOVE_SNAP when the array delete fails
    #[arg(long, default_value_t = false)]
    pub strict_remove: bool,
}
