use std::collections::HashMap;

use easyapi_security::{Authenticator, Credential, DEFAULT_ID_LEN};

fn credentials() -> HashMap<String, Credential> {
    HashMap::from([
        (
            "alice".to_string(),
            Credential {
                key: "alice-key".to_string(),
                access: vec!["*".to_string()],
            },
        ),
        (
            "bob".to_string(),
            Credential {
                key: "bob-key".to_string(),
                access: vec!["sum".to_string()],
            },
        ),
    ])
}

fn entries(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

// ── Authentication ───────────────────────────────────────────────────────

#[test]
fn authenticate_checks_the_key() {
    let auth = Authenticator::in_memory(credentials());
    assert!(auth.authenticate("alice", "alice-key"));
    assert!(!auth.authenticate("alice", "wrong"));
    assert!(!auth.authenticate("nobody", "alice-key"));
    assert!(!auth.authenticate("", ""));
}

// ── Access control ───────────────────────────────────────────────────────

#[test]
fn wildcard_grants_everything() {
    let auth = Authenticator::in_memory(credentials());
    assert!(auth.allows("alice", "sum"));
    assert!(auth.allows("alice", "anything"));
    assert_eq!(
        auth.access_filter("alice", entries(&["sum", "blast", "corex"])),
        entries(&["sum", "blast", "corex"])
    );
}

#[test]
fn access_sets_filter_the_listing() {
    let auth = Authenticator::in_memory(credentials());
    assert!(auth.allows("bob", "sum"));
    assert!(!auth.allows("bob", "blast"));
    assert_eq!(
        auth.access_filter("bob", entries(&["sum", "blast", "corex"])),
        entries(&["sum"])
    );
}

#[test]
fn unknown_callers_see_nothing() {
    let auth = Authenticator::in_memory(credentials());
    assert!(auth.access_filter("nobody", entries(&["sum"])).is_empty());
    assert!(!auth.allows("nobody", "sum"));
}

// ── Credential creation ──────────────────────────────────────────────────

#[test]
fn create_generates_an_alphanumeric_id_and_uuid_key() {
    let auth = Authenticator::in_memory(HashMap::new());
    let (id, key) = auth.create(DEFAULT_ID_LEN, vec!["sum".to_string()]).unwrap();
    assert_eq!(id.len(), 12);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    assert!(uuid::Uuid::parse_str(&key).is_ok());
    assert!(auth.authenticate(&id, &key));
    assert!(auth.allows(&id, "sum"));
    assert!(!auth.allows(&id, "other"));
}

#[test]
fn remove_revokes_a_credential() {
    let auth = Authenticator::in_memory(credentials());
    auth.remove("bob").unwrap();
    assert!(!auth.authenticate("bob", "bob-key"));
    assert!(auth.remove("bob").is_err());
}

// ── File-backed store ────────────────────────────────────────────────────

#[test]
fn file_store_reads_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(
        &path,
        r#"{"alice": {"key": "alice-key", "access": ["*"]}}"#,
    )
    .unwrap();

    let auth = Authenticator::from_file(path.clone()).unwrap();
    assert!(auth.authenticate("alice", "alice-key"));
    assert_eq!(auth.len(), 1);
}

#[test]
fn file_store_is_missing_or_malformed() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Authenticator::from_file(dir.path().join("absent.json")).is_err());

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "not json").unwrap();
    assert!(Authenticator::from_file(path).is_err());
}

#[test]
fn key_rotation_takes_effect_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(
        &path,
        r#"{"alice": {"key": "old-key", "access": ["*"]}}"#,
    )
    .unwrap();
    let auth = Authenticator::from_file(path.clone()).unwrap();
    assert!(auth.authenticate("alice", "old-key"));

    // Rotate behind the authenticator's back; the next check re-reads.
    std::fs::write(
        &path,
        r#"{"alice": {"key": "new-key", "access": ["*"]}}"#,
    )
    .unwrap();
    assert!(!auth.authenticate("alice", "old-key"));
    assert!(auth.authenticate("alice", "new-key"));
}

#[test]
fn file_store_persists_created_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    std::fs::write(&path, "{}").unwrap();

    let auth = Authenticator::from_file(path.clone()).unwrap();
    let (id, key) = auth.create(8, vec!["*".to_string()]).unwrap();
    assert_eq!(id.len(), 8);

    // A fresh authenticator over the same file sees the new credential.
    let reloaded = Authenticator::from_file(path).unwrap();
    assert!(reloaded.authenticate(&id, &key));

    reloaded.remove(&id).unwrap();
    assert!(!auth.authenticate(&id, &key));
}
