//! Drives `GpgEncryptor` through `PassDriver` against a fake gpg script that
//! records its arguments and rot13s its input.
#![cfg(unix)]

use std::{fs, os::unix::fs::PermissionsExt, path::Path, time::Duration};

use passdrv_core::{SecretDriver, SecretError};
use passdrv_storage::{DriverConfig, EngineError, Encryptor, GpgEncryptor, PassDriver};

const FAKE_GPG: &str = r#"#!/bin/sh
printf '%s\n' "$*" >> "__LOG__"
case "$1" in
  --decrypt)
    case "$2" in *slow*) sleep 5 ;; esac
    [ -f "$2" ] || exit 2
    tr 'A-Za-z' 'N-ZA-Mn-za-m' < "$2"
    ;;
  --encrypt)
    [ "$2" = "-r" ] || exit 3
    [ -n "$3" ] || exit 4
    [ "$4" = "-o" ] || exit 5
    tr 'A-Za-z' 'N-ZA-Mn-za-m' > "$5"
    ;;
  *)
    exit 1
    ;;
esac
"#;

fn install_fake_gpg(dir: &Path) -> std::path::PathBuf {
    let log = dir.join("gpg.log");
    let script = dir.join("fake-gpg");
    fs::write(&script, FAKE_GPG.replace("__LOG__", &log.to_string_lossy())).expect("write script");
    let mut perms = fs::metadata(&script).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).expect("chmod");
    script
}

// Single test so no other test forks while the script is being written.
#[tokio::test]
async fn gpg_protocol_end_to_end() {
    let tools = tempfile::tempdir().expect("tempdir");
    let store_dir = tempfile::tempdir().expect("tempdir");
    let root = fs::canonicalize(store_dir.path()).expect("canonical root");
    let script = install_fake_gpg(tools.path());

    let engine = GpgEncryptor::with_program(&script).with_timeout(Duration::from_secs(10));
    let driver = PassDriver::new(DriverConfig::new(&root, "alice@example.com"), engine);

    driver.store("web/github", b"Secret").await.expect("store");
    let on_disk = fs::read(root.join("web/github")).expect("ciphertext");
    assert_eq!(on_disk, b"Frperg");
    assert_eq!(driver.lookup("web/github").await.expect("lookup"), b"Secret");

    let err = driver
        .store("web/github", b"again")
        .await
        .expect_err("duplicate");
    assert_eq!(err, SecretError::secret_id_exists("web/github"));

    let err = driver.lookup("missing").await.expect_err("missing");
    assert_eq!(err, SecretError::no_secret_data("missing"));

    let log = fs::read_to_string(tools.path().join("gpg.log")).expect("log");
    let lines: Vec<&str> = log.lines().collect();
    // store checks with a decrypt first, then encrypts into the staging dir
    assert_eq!(
        lines[0],
        format!("--decrypt {}", root.join("web/github").display())
    );
    assert!(lines[1].starts_with(&format!(
        "--encrypt -r alice@example.com -o {}",
        root.join(".passdrv-staging").display()
    )));
    assert_eq!(
        lines[2],
        format!("--decrypt {}", root.join("web/github").display())
    );

    // Encryption failures surface as engine errors and leave nothing behind.
    let keyless = PassDriver::new(
        DriverConfig::new(&root, ""),
        GpgEncryptor::with_program(&script),
    );
    let err = keyless.store("db", b"v").await.expect_err("no recipient");
    assert!(matches!(err, SecretError::Engine { .. }));
    assert_eq!(driver.list().await.expect("list"), vec!["web"]);

    fs::write(root.join("slow"), "x").expect("write slow");
    let impatient = GpgEncryptor::with_program(&script).with_timeout(Duration::from_millis(200));
    let err = impatient
        .decrypt(&root.join("slow"))
        .await
        .expect_err("timeout");
    assert_eq!(err, EngineError::Timeout(Duration::from_millis(200)));
}
