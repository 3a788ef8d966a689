mod common;

use anyhow::Result;

use common::unique_root;
use snapclone::crypto::SealKey;
use snapclone::store::{CredStore, Credentials};

#[test]
fn unknown_host_yields_empty_login() -> Result<()> {
    let root = unique_root("creds-empty");
    let store = CredStore::open(&root.join("cred_db"), None)?;

    let login = store.get("nobody")?;
    assert!(login.is_empty());
    assert_eq!(login, Credentials::default());
    Ok(())
}

#[test]
fn put_upserts_and_delete_removes() -> Result<()> {
    let root = unique_root("creds-upsert");
    let store = CredStore::open(&root.join("cred_db"), None)?;

    store.put("proxyA", "backup", "one")?;
    store.put("proxyA", "backup2", "two")?;
    store.put("chief-netapp1", "admin", "filer")?;

    assert_eq!(store.get("proxyA")?, Credentials::new("backup2", "two"));
    let hosts: Vec<String> = store.list(false)?.into_iter().map(|e| e.host).collect();
    assert_eq!(hosts, vec!["chief-netapp1".to_string(), "proxyA".to_string()]);

    assert!(store.delete("proxyA")?);
    assert!(store.get("proxyA")?.is_empty());
    Ok(())
}

#[test]
fn setup_drops_everything() -> Result<()> {
    let root = unique_root("creds-setup");
    let path = root.join("cred_db");
    {
        let store = CredStore::open(&path, None)?;
        store.put("proxyA", "backup", "pw")?;
    }
    let store = CredStore::open(&path, None)?;
    assert!(!store.get("proxyA")?.is_empty());

    store.setup()?;
    assert!(store.list(false)?.is_empty());
    assert!(store.get("proxyA")?.is_empty());
    Ok(())
}

#[test]
fn sealed_passwords_need_the_key() -> Result<()> {
    let root = unique_root("creds-sealed");
    let path = root.join("cred_db");
    {
        let store = CredStore::open(&path, Some(SealKey::from_passphrase("correct horse")))?;
        assert!(store.is_sealing());
        store.put("proxyA", "backup", "s3cret")?;
    }

    // the file never holds the password in clear
    let raw = std::fs::read(&path)?;
    assert!(!raw.windows(6).any(|w| w == b"s3cret"));

    let keyed = CredStore::open(&path, Some(SealKey::from_passphrase("correct horse")))?;
    assert_eq!(keyed.get("proxyA")?, Credentials::new("backup", "s3cret"));
    let listed = keyed.list(true)?;
    assert!(listed[0].sealed);
    assert_eq!(listed[0].password.as_deref(), Some("s3cret"));

    let keyless = CredStore::open(&path, None)?;
    assert!(keyless.get("proxyA").is_err());
    // listing without revealing still works
    assert_eq!(keyless.list(false)?.len(), 1);

    let wrong = CredStore::open(&path, Some(SealKey::from_passphrase("battery staple")))?;
    assert!(wrong.get("proxyA").is_err());
    Ok(())
}

#[test]
fn password_is_masked_in_debug() {
    let login = Credentials::new("backup", "s3cret");
    let shown = format!("{:?}", login);
    assert!(shown.contains("backup"));
    assert!(!shown.contains("s3cret"));
}
