use anyhow::Result;
use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, error, info};

use snapclone::handoff::{Operation, EXIT_EINVAL, EXIT_FAILURE};
use snapclone::metrics;

mod cli;
mod cmd_create;
mod cmd_hello;
mod cmd_remove;
mod util;

fn init_logger() {
    // Уровень из RUST_LOG, иначе info. Логи в stderr: stdout занят результатом.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    match run() {
        Ok(code) => {
            debug!("run metrics: {}", metrics::snapshot().summary());
            std::process::exit(code);
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run() -> Result<i32> {
    let cli = cli::Cli::parse();
    let op = match cli.operation.parse::<Operation>() {
        Ok(op) => op,
        Err(e) => {
            println!("{}", e);
            return Ok(EXIT_EINVAL);
        }
    };
    let cfg = util::config_from_cli(&cli)?;
    info!("{} serial={} snap='{}'", op, cli.serial, cli.snap_name);
    debug!("{}", cfg);

    let outcome = match op {
        Operation::Hello => cmd_hello::exec(&cfg, &cli.serial)?,
        Operation::CreateSnap => cmd_create::exec(&cfg, &cli)?,
        Operation::RemoveSnap => cmd_remove::exec(&cfg, &cli)?,
    };
    Ok(util::finish(op, &outcome))
}
