//! NoopArray - массив-заглушка: все операции успешны и ничего не делают.
//!
//! Полезен как пример/dry-run: клон "создаётся" со случайным serial,
//! поэтому монтирование на proxy-хосте ожидаемо завершится ошибкой.

use log::debug;
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::{ArrayResult, LunPath, StorageArray};

const NOOP_VOLUME: &str = "noop";
const CLONE_SERIAL_LEN: usize = 10;

#[derive(Debug, Default, Clone)]
pub struct NoopArray;

impl NoopArray {
    pub fn new() -> Self {
        Self
    }
}

/// Random upper-case alphanumeric serial, e.g. `Q7K2M9X0AB`.
pub fn random_serial() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_uppercase())
        .take(CLONE_SERIAL_LEN)
        .collect()
}

impl StorageArray for NoopArray {
    fn kind(&self) -> &'static str {
        "noop"
    }

    fn resolve_path(&self, serial: &str) -> ArrayResult<Option<LunPath>> {
        Ok(Some(LunPath::new(NOOP_VOLUME, serial)))
    }

    fn resolve_serial(&self, path: &LunPath) -> ArrayResult<Option<String>> {
        let serial = random_serial();
        debug!("noop: {} -> serial {}", path, serial);
        Ok(Some(serial))
    }

    fn create_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        debug!("noop: snapshot-create {}@{}", volume, name);
        Ok(())
    }

    fn delete_snapshot(&self, volume: &str, name: &str) -> ArrayResult<()> {
        debug!("noop: snapshot-delete {}@{}", volume, name);
        Ok(())
    }

    fn clone_volume(&self, parent_volume: &str, parent_snapshot: &str, clone_volume: &str) -> ArrayResult<()> {
        debug!(
            "noop: volume-clone-create {}@{} -> {}",
            parent_volume, parent_snapshot, clone_volume
        );
        Ok(())
    }

    fn map_lun(&self, path: &LunPath, access_group: &str) -> ArrayResult<()> {
        debug!("noop: lun-map {} -> {}", path, access_group);
        Ok(())
    }

    fn online_lun(&self, path: &LunPath) -> ArrayResult<()> {
        debug!("noop: lun-online {}", path);
        Ok(())
    }

    fn offline_volume(&self, volume: &str) -> ArrayResult<()> {
        debug!("noop: volume-offline {}", volume);
        Ok(())
    }

    fn destroy_volume(&self, volume: &str) -> ArrayResult<()> {
        debug!("noop: volume-destroy {}", volume);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_serial_shape() {
        let s = random_serial();
        assert_eq!(s.len(), CLONE_SERIAL_LEN);
        assert!(s
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn noop_always_resolves() {
        let a = NoopArray::new();
        let p = a.resolve_path("LUN42").unwrap().unwrap();
        assert_eq!(p.to_string(), "/vol/noop/LUN42");
        assert!(a.create_snapshot(p.volume(), "s").is_ok());
    }
}
