use std::process::Command;

use anyhow::Result;

use snapclone::handoff::EXIT_EINVAL;

fn snapclone(args: &[&str]) -> Result<(i32, String)> {
    let out = Command::new(env!("CARGO_BIN_EXE_snapclone"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()?;
    let code = out.status.code().unwrap_or(-1);
    Ok((code, String::from_utf8_lossy(&out.stdout).into_owned()))
}

#[test]
fn missing_operation_is_einval() -> Result<()> {
    let (code, stdout) = snapclone(&["--serial", "LUN42"])?;
    assert_eq!(code, EXIT_EINVAL);
    assert_eq!(stdout, "Invalid operation: \n");
    Ok(())
}

#[test]
fn unknown_operation_is_einval() -> Result<()> {
    let (code, stdout) = snapclone(&["--operation", "SNAP", "--serial", "LUN42"])?;
    assert_eq!(code, EXIT_EINVAL);
    assert_eq!(stdout, "Invalid operation: SNAP\n");
    Ok(())
}
