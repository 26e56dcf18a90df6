use std::fs;
use std::process::Command;

#[test]
fn failed_command_exits_non_zero_and_reports_once() {
    let dir = tempfile::tempdir().unwrap();
    let session = dir.path().join("session.json");
    fs::write(
        &session,
        r#"{"user_id":"u1","email":"admin@club.test","organization_id":"org-a",
            "claims":{"role":"admin"}}"#,
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_clubdesk"))
        .arg("--db")
        .arg(dir.path().join("club.sqlite"))
        .arg("--session")
        .arg(&session)
        .args(["player", "remove", "ghost", "--yes"])
        .env("CLUBDESK_LOG", "off")
        .env_remove("RUST_LOG")
        .env("HOME", dir.path())
        .current_dir(dir.path())
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("player ghost not found").count(), 1, "{stderr}");
    assert!(stderr.contains("[ERROR]"), "{stderr}");
}

#[test]
fn database_directory_errors_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();
    let err = clubdesk::store::Store::open(&blocker.join("club.sqlite"))
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("create db dir"), "{err:#}");
}
