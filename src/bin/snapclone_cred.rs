//! snapclone_cred - управление таблицей логинов (host -> user, password)
//! и просмотр clone tracking store.
//!
//! Ключ запечатывания паролей берётся из SNAPCLONE_CRED_KEY_HEX /
//! SNAPCLONE_CRED_KEY_BASE64 / SNAPCLONE_CRED_PASSPHRASE (если заданы).

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{error, info, warn};
use std::io::BufRead;
use std::path::PathBuf;

use snapclone::config::HandoffConfig;
use snapclone::crypto::SealKey;
use snapclone::store::{CloneStore, CredStore};

#[derive(Parser, Debug)]
#[command(name = "snapclone_cred", version, about = "Credential store for snapclone")]
struct Cli {
    /// Work directory (default: SNAPCLONE_WORK_DIR or /opt/snapclone)
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,
    /// Explicit credential db path (default: <work_dir>/cred_db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Drop all stored credentials and create an empty table
    Setup {
        /// Required: setup is destructive
        #[arg(long)]
        yes: bool,
    },
    /// Add or replace the login of a host (password from stdin if omitted)
    Put {
        #[arg(long)]
        host: String,
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Remove the login of a host
    Del {
        #[arg(long)]
        host: String,
    },
    /// Print the login of a host
    Get {
        #[arg(long)]
        host: String,
        #[arg(long)]
        show_password: bool,
    },
    /// List stored hosts
    List {
        #[arg(long)]
        json: bool,
        #[arg(long)]
        show_passwords: bool,
    },
    /// List outstanding clones from the clone tracking store
    Clones {
        #[arg(long)]
        json: bool,
    },
}

fn init_logger() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut cfg = HandoffConfig::from_env();
    if let Some(dir) = cli.work_dir {
        cfg = cfg.with_work_dir(dir);
    }
    if cli.db.is_some() {
        cfg = cfg.with_cred_db(cli.db);
    }

    let open_creds = || -> Result<CredStore> {
        let key = SealKey::from_env()?;
        CredStore::open(&cfg.cred_db_path(), key)
    };

    match cli.cmd {
        Cmd::Setup { yes } => {
            let store = open_creds()?;
            if !yes {
                return Err(anyhow!(
                    "setup drops every stored credential in {}; pass --yes",
                    store.path().display()
                ));
            }
            store.setup()?;
            info!("credential table reset at {}", store.path().display());
        }
        Cmd::Put {
            host,
            user,
            password,
        } => {
            let store = open_creds()?;
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            store.put(&host, &user, &password)?;
            info!(
                "stored login of {} ({})",
                host,
                if store.is_sealing() { "sealed" } else { "plain" }
            );
        }
        Cmd::Del { host } => {
            let store = open_creds()?;
            if store.delete(&host)? {
                info!("removed login of {}", host);
            } else {
                warn!("no login stored for {}", host);
            }
        }
        Cmd::Get {
            host,
            show_password,
        } => {
            let login = open_creds()?.get(&host)?;
            if login.is_empty() {
                println!("NOT FOUND '{}'", host);
            } else if show_password {
                println!("{} {} {}", host, login.user, login.password);
            } else {
                println!("{} {}", host, login.user);
            }
        }
        Cmd::List {
            json,
            show_passwords,
        } => {
            let entries = open_creds()?.list(show_passwords)?;
            if json {
                let arr: Vec<serde_json::Value> = entries
                    .iter()
                    .map(|e| {
                        serde_json::json!({
                            "host": e.host,
                            "user": e.user,
                            "sealed": e.sealed,
                            "password": e.password,
                        })
                    })
                    .collect();
                let s = serde_json::to_string_pretty(&arr).unwrap_or_else(|_| "[]".to_string());
                println!("{s}");
            } else {
                for e in &entries {
                    match &e.password {
                        Some(p) => println!("{}\t{}\t{}", e.host, e.user, p),
                        None => println!(
                            "{}\t{}\t{}",
                            e.host,
                            e.user,
                            if e.sealed { "(sealed)" } else { "(plain)" }
                        ),
                    }
                }
            }
        }
        Cmd::Clones { json } => exec_clones(&cfg, json)?,
    }
    Ok(())
}

fn exec_clones(cfg: &HandoffConfig, json: bool) -> Result<()> {
    let store = CloneStore::open(&cfg.clone_db_path())?;
    let records = store.list()?;
    if json {
        let s = serde_json::to_string_pretty(&records).unwrap_or_else(|_| "[]".to_string());
        println!("{s}");
        return Ok(());
    }
    for r in &records {
        println!(
            "{}\t{}\t{}\t{}",
            r.source_serial, r.clone_serial, r.snapshot_name, r.access_group
        );
    }
    Ok(())
}

fn read_password() -> Result<String> {
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
