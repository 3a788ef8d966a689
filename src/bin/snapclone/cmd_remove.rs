use anyhow::Result;

use snapclone::config::HandoffConfig;
use snapclone::handoff::{Outcome, RemoveRequest};

use super::cli::Cli;
use super::util::Session;

pub fn exec(cfg: &HandoffConfig, cli: &Cli) -> Result<Outcome> {
    let req = RemoveRequest {
        serial: cli.serial.clone(),
        snap_name: cli.snap_name.clone(),
        proxy_host: cli.proxy_host.clone(),
    };
    let session = Session::open(cfg)?;
    Ok(session.handoff().remove_snapshot(&req))
}
