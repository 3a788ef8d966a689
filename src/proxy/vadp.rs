//! VadpHelper - запуск vadp_setup.pl / vadp_cleanup.pl.
//!
//! Command line:
//!   <interpreter> <script> --server <host> --username <user> --password <pw> --luns <s1,s2,..>
//!
//! Пароль в логах маскируется.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{HelperReport, ProxyMounter};
use crate::config::HandoffConfig;
use crate::store::Credentials;

#[derive(Debug, Clone)]
pub struct VadpHelper {
    interpreter: PathBuf,
    setup_script: PathBuf,
    cleanup_script: PathBuf,
}

impl VadpHelper {
    pub fn new(interpreter: &Path, setup_script: &Path, cleanup_script: &Path) -> Self {
        Self {
            interpreter: interpreter.to_path_buf(),
            setup_script: setup_script.to_path_buf(),
            cleanup_script: cleanup_script.to_path_buf(),
        }
    }

    pub fn from_config(cfg: &HandoffConfig) -> Self {
        Self::new(
            &cfg.helper_interpreter,
            &cfg.setup_script(),
            &cfg.cleanup_script(),
        )
    }

    fn args(host: &str, login: &Credentials, serials: &[String], password: &str) -> Vec<String> {
        vec![
            "--server".to_string(),
            host.to_string(),
            "--username".to_string(),
            login.user.clone(),
            "--password".to_string(),
            password.to_string(),
            "--luns".to_string(),
            serials.join(","),
        ]
    }

    fn run(&self, script: &Path, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        let shown = Self::args(host, login, serials, "***");
        debug!(
            "helper command: {} \"{}\" {}",
            self.interpreter.display(),
            script.display(),
            shown.join(" ")
        );

        let out = Command::new(&self.interpreter)
            .arg(script)
            .args(Self::args(host, login, serials, &login.password))
            .stdin(Stdio::null())
            .output()
            .with_context(|| {
                format!(
                    "spawn helper {} {}",
                    self.interpreter.display(),
                    script.display()
                )
            })?;

        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(HelperReport {
            output,
            status: out.status.code(),
        })
    }
}

impl ProxyMounter for VadpHelper {
    fn mount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        self.run(&self.setup_script, host, login, serials)
    }

    fn unmount(&self, host: &str, login: &Credentials, serials: &[String]) -> Result<HelperReport> {
        self.run(&self.cleanup_script, host, login, serials)
    }
}
