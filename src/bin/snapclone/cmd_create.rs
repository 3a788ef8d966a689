use anyhow::Result;
use log::debug;

use snapclone::config::HandoffConfig;
use snapclone::handoff::{CreateRequest, Outcome};

use super::cli::Cli;
use super::util::Session;

pub fn exec(cfg: &HandoffConfig, cli: &Cli) -> Result<Outcome> {
    let req = CreateRequest {
        serial: cli.serial.clone(),
        snap_name: cli.snap_name.clone(),
        access_group: cli.access_group.clone(),
        proxy_host: cli.proxy_host.clone(),
        category: cli.category.clone(),
        protect_category: cli.protect_category.clone(),
    };
    if let Some(t) = &cli.issue_time {
        debug!("issue time {} (ignored)", t);
    }
    let session = Session::open(cfg)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Ok(session.handoff().create_snapshot(&req, &mut out))
}
