mod common;

use anyhow::Result;

use common::{clone_serial_of, Rig};
use snapclone::array::FaultKind;
use snapclone::handoff::{CreateRequest, Outcome, RemoveRequest, EXIT_FAILURE, EXIT_OK};

fn rig(prefix: &str) -> Result<Rig> {
    let rig = Rig::new(prefix)?;
    rig.array.add_lun("LUN42", "/vol/vol1/lun42");
    rig.creds.put("proxyA", "backup", "s3cret")?;
    Ok(rig)
}

/// Protected snapshot with its clone mounted, journal cleared.
fn protect(rig: &Rig, snap: &str) -> Result<()> {
    let req = CreateRequest {
        serial: "LUN42".into(),
        snap_name: snap.into(),
        access_group: "proxy_igroup".into(),
        proxy_host: "proxyA".into(),
        category: "daily".into(),
        protect_category: "daily".into(),
    };
    let mut out = Vec::new();
    let outcome = rig.handoff().create_snapshot(&req, &mut out);
    assert!(outcome.is_ok(), "{:?}", outcome);
    rig.clear_journal();
    Ok(())
}

fn remove(snap: &str) -> RemoveRequest {
    RemoveRequest {
        serial: "LUN42".into(),
        snap_name: snap.into(),
        proxy_host: "proxyA".into(),
    }
}

#[test]
fn removing_protected_snapshot_tears_clone_down() -> Result<()> {
    let rig = rig("remove-scenario")?;
    protect(&rig, "snap-2024-01-01")?;
    let clone = clone_serial_of("vol1_snap_2024_01_01");

    let outcome = rig.handoff().remove_snapshot(&remove("snap-2024-01-01"));
    assert_eq!(outcome, Outcome::Ok(()));
    assert_eq!(outcome.exit_code(), EXIT_OK);
    assert_eq!(
        rig.actions(),
        vec![
            format!("unmount proxyA backup {}", clone),
            "offline_volume vol1_snap_2024_01_01".to_string(),
            "destroy_volume vol1_snap_2024_01_01".to_string(),
            "delete_snapshot vol1 snap-2024-01-01".to_string(),
        ]
    );
    assert!(!rig.clones.get("LUN42")?.has_clone());
    assert!(rig.clones.list()?.is_empty());
    assert!(!rig.array.has_snapshot("vol1", "snap-2024-01-01"));
    Ok(())
}

#[test]
fn removing_other_snapshot_leaves_clone_alone() -> Result<()> {
    let rig = rig("remove-other")?;
    protect(&rig, "snap-a")?;
    rig.array.add_snapshot("vol1", "snap-old");

    let outcome = rig.handoff().remove_snapshot(&remove("snap-old"));
    assert!(outcome.is_ok());
    assert_eq!(rig.actions(), vec!["delete_snapshot vol1 snap-old".to_string()]);

    let rec = rig.clones.get("LUN42")?;
    assert_eq!(rec.snapshot_name, "snap-a");
    assert_eq!(rec.clone_serial, clone_serial_of("vol1_snap_a"));
    assert!(rig.array.has_volume("vol1_snap_a"));
    Ok(())
}

#[test]
fn teardown_without_record_touches_nothing() -> Result<()> {
    let rig = rig("remove-no-record")?;
    let h = rig.handoff();

    assert!(h.unmount_proxy("LUN42", "proxyA").is_ok());
    assert!(h.delete_clone("LUN42").is_ok());
    assert!(rig.actions().is_empty());

    rig.array.add_snapshot("vol1", "snap-z");
    assert!(h.remove_snapshot(&remove("snap-z")).is_ok());
    assert_eq!(rig.actions(), vec!["delete_snapshot vol1 snap-z".to_string()]);
    Ok(())
}

#[test]
fn already_removed_snapshot_is_success() -> Result<()> {
    let rig = rig("remove-gone")?;
    let outcome = rig.handoff().remove_snapshot(&remove("never-existed"));
    assert_eq!(outcome, Outcome::Ok(()));
    Ok(())
}

#[test]
fn failed_clone_destroy_still_forgets_record() -> Result<()> {
    let rig = rig("remove-orphan")?;
    protect(&rig, "snap-o")?;
    rig.array.fail("destroy_volume", FaultKind::Other);

    let outcome = rig.handoff().remove_snapshot(&remove("snap-o"));
    assert!(outcome.is_degraded());
    assert!(outcome.reason().unwrap_or_default().contains("delete-clone"));
    assert_eq!(outcome.exit_code(), EXIT_OK);
    assert!(!rig.clones.get("LUN42")?.has_clone());
    // the orphan clone volume is left on the array
    assert!(rig.array.has_volume("vol1_snap_o"));
    assert!(!rig.array.has_snapshot("vol1", "snap-o"));
    Ok(())
}

#[test]
fn array_delete_failure_degrades_unless_strict() -> Result<()> {
    let rig = rig("remove-delete-fails")?;
    rig.array.add_snapshot("vol1", "snap-d");
    rig.array.fail("delete_snapshot", FaultKind::Other);

    let outcome = rig.handoff().remove_snapshot(&remove("snap-d"));
    assert!(outcome.is_degraded());
    assert_eq!(outcome.exit_code(), EXIT_OK);

    let strict = rig.handoff().with_strict_remove(true);
    let outcome = strict.remove_snapshot(&remove("snap-d"));
    assert!(outcome.is_fatal());
    assert_eq!(outcome.exit_code(), EXIT_FAILURE);
    Ok(())
}

#[test]
fn unknown_source_is_fatal() -> Result<()> {
    let rig = rig("remove-unknown")?;
    let mut req = remove("snap-u");
    req.serial = "NOPE".into();

    let outcome = rig.handoff().remove_snapshot(&req);
    assert!(outcome.is_fatal());
    assert_eq!(outcome.exit_code(), EXIT_FAILURE);
    assert!(rig.actions().is_empty());

    let strict = rig.handoff().with_strict_remove(true);
    assert!(strict.remove_snapshot(&req).is_fatal());
    Ok(())
}

#[test]
fn empty_snapshot_name_is_fatal() -> Result<()> {
    let rig = rig("remove-empty")?;
    protect(&rig, "snap-e")?;

    let outcome = rig.handoff().remove_snapshot(&remove(""));
    assert!(outcome.is_fatal());
    assert!(rig.journal.borrow().is_empty());
    assert!(rig.clones.get("LUN42")?.has_clone());
    Ok(())
}
