use anyhow::Result;

use snapclone::config::HandoffConfig;
use snapclone::handoff::Outcome;

use super::util::Session;

pub fn exec(cfg: &HandoffConfig, serial: &str) -> Result<Outcome> {
    let session = Session::open(cfg)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Ok(session.handoff().hello(serial, &mut out))
}
