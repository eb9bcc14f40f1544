//! Integration tests for the connvault credential store.

use std::fs;
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use connvault::config::VaultConfig;
use connvault::crypto::EncryptionKey;
use connvault::errors::{Missing, VaultError};
use connvault::vault::{
    AdditionalParams, ConnectionType, CredentialStore, NewConnection, ParamValue,
    DECRYPTION_ERROR_SENTINEL,
};
use serde_json::Value;
use tempfile::TempDir;
use zeroize::Zeroizing;

/// Helper: a store over a fresh temp dir with a fixed key.
fn store_with_key(byte: u8) -> (TempDir, CredentialStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = CredentialStore::new(dir.path().join("connections.json"), EncryptionKey::new([byte; 32]));
    (dir, store)
}

fn store() -> (TempDir, CredentialStore) {
    store_with_key(0x5C)
}

fn postgres(host: &str, password: &str) -> NewConnection {
    NewConnection {
        host: host.to_string(),
        port: 5432,
        database_name: "shop".to_string(),
        username: "ro".to_string(),
        password: Zeroizing::new(password.to_string()),
        connection_type: ConnectionType::Postgresql,
        ssl_enabled: true,
        is_readonly: true,
        additional_params: AdditionalParams::new(),
    }
}

fn read_document(store: &CredentialStore) -> Value {
    let text = fs::read_to_string(store.path()).expect("store document exists");
    serde_json::from_str(&text).expect("store document is JSON")
}

// ---------------------------------------------------------------------------
// End-to-end scenario
// ---------------------------------------------------------------------------

#[test]
fn save_get_delete_list_scenario() {
    let (_dir, store) = store();

    let saved = store
        .save("SHOP", "main", postgres("db.example.com", "s3cr3t"))
        .unwrap();
    assert_eq!(saved.host, "db.example.com");
    assert_eq!(saved.port, 5432);
    assert_eq!(saved.connection_type, ConnectionType::Postgresql);

    let view = store.get("SHOP", "main", true).unwrap();
    assert_eq!(view.password.as_deref(), Some("s3cr3t"));
    assert_eq!(view.username, "ro");

    store.delete("SHOP", "main").unwrap();

    let err = store.get("SHOP", "main", false).unwrap_err();
    assert!(err.is_not_found());

    let rows = store.list(None).unwrap();
    assert!(rows.iter().all(|r| r.project_name != "SHOP"));
}

// ---------------------------------------------------------------------------
// get
// ---------------------------------------------------------------------------

#[test]
fn get_without_include_password_omits_password() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db", "pw")).unwrap();

    let view = store.get("SHOP", "main", false).unwrap();
    assert!(view.password.is_none());

    let json = serde_json::to_value(&view).unwrap();
    assert!(json.get("password").is_none());
    assert!(json.get("password_encrypted").is_none());
}

#[test]
fn get_never_exposes_ciphertext() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db", "pw")).unwrap();

    let json = serde_json::to_value(store.get("SHOP", "main", true).unwrap()).unwrap();
    assert!(json.get("password_encrypted").is_none());
    assert!(json.get("iv").is_none());
    assert_eq!(json["password"], "pw");
}

#[test]
fn not_found_distinguishes_project_from_connection() {
    let (_dir, store) = store();
    store.save("known_project", "main", postgres("db", "pw")).unwrap();

    let unknown_project = store.get("unknown_project", "main", false).unwrap_err();
    match unknown_project {
        VaultError::NotFound(Missing::Project(ref p)) => assert_eq!(p, "unknown_project"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(unknown_project.to_string().contains("unknown_project"));

    let unknown_conn = store.get("known_project", "unknown_conn", false).unwrap_err();
    assert!(matches!(
        unknown_conn,
        VaultError::NotFound(Missing::Connection { .. })
    ));
    let msg = unknown_conn.to_string();
    assert!(msg.contains("unknown_conn"));
    assert!(msg.contains("known_project"));
}

#[test]
fn get_with_wrong_key_returns_sentinel_and_other_fields() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("connections.json");

    let writer = CredentialStore::new(&path, EncryptionKey::new([0x01; 32]));
    writer.save("SHOP", "main", postgres("db.example.com", "s3cr3t")).unwrap();

    // Simulates a restart with a different (e.g. regenerated) key.
    let reader = CredentialStore::new(&path, EncryptionKey::new([0x02; 32]));
    let view = reader.get("SHOP", "main", true).unwrap();

    assert_eq!(view.password.as_deref(), Some(DECRYPTION_ERROR_SENTINEL));
    assert!(view.password_unreadable());
    assert_eq!(view.host, "db.example.com");
    assert_eq!(view.port, 5432);
    assert_eq!(view.database_name, "shop");
}

#[test]
fn get_with_corrupted_ciphertext_returns_sentinel() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db", "s3cr3t")).unwrap();

    // Flip the ciphertext on disk.
    let mut doc = read_document(&store);
    doc["SHOP"]["main"]["password_encrypted"]["encrypted"] =
        Value::String("00".repeat(16));
    fs::write(store.path(), serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let view = store.get("SHOP", "main", true).unwrap();
    assert_eq!(view.password.as_deref(), Some(DECRYPTION_ERROR_SENTINEL));
    assert_eq!(view.database_name, "shop");
}

#[test]
fn truncated_ciphertext_hex_affects_only_that_record() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db.example.com", "s3cr3t")).unwrap();
    store.save("OTHER", "main", postgres("other.example.com", "pw2")).unwrap();

    // Drop the last hex digit so the field no longer decodes.
    let mut doc = read_document(&store);
    let mut hex = doc["SHOP"]["main"]["password_encrypted"]["encrypted"]
        .as_str()
        .unwrap()
        .to_string();
    hex.pop();
    doc["SHOP"]["main"]["password_encrypted"]["encrypted"] = Value::String(hex);
    fs::write(store.path(), serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    let view = store.get("SHOP", "main", true).unwrap();
    assert_eq!(view.password.as_deref(), Some(DECRYPTION_ERROR_SENTINEL));
    assert_eq!(view.host, "db.example.com");

    let report = store.test("SHOP", "main").unwrap();
    assert!(!report.well_formed);
    assert!(report.issues.iter().any(|i| i.contains("not valid hex")));

    assert_eq!(store.list(None).unwrap().len(), 2);
    let other = store.get("OTHER", "main", true).unwrap();
    assert_eq!(other.password.as_deref(), Some("pw2"));

    store.save("THIRD", "main", postgres("h", "pw3")).unwrap();
    store.delete("OTHER", "main").unwrap();
    assert_eq!(store.list(None).unwrap().len(), 2);
}

#[test]
fn legacy_nested_params_do_not_block_the_store() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db", "pw")).unwrap();

    let mut doc = read_document(&store);
    doc["SHOP"]["main"]["additional_params"] =
        serde_json::json!({ "pool": { "max": 5 }, "charset": null });
    fs::write(store.path(), serde_json::to_string_pretty(&doc).unwrap()).unwrap();

    assert_eq!(store.list(None).unwrap().len(), 1);
    let view = store.get("SHOP", "main", true).unwrap();
    assert_eq!(view.password.as_deref(), Some("pw"));
    assert_eq!(
        view.additional_params.get("pool"),
        Some(&ParamValue::Other(serde_json::json!({ "max": 5 })))
    );
}

#[test]
fn store_built_from_config_reads_what_another_handle_wrote() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vault").join("connections.json");
    let config = VaultConfig::new(&path, EncryptionKey::new([0x07; 32]));

    let writer = CredentialStore::from_config(&config);
    assert_eq!(writer.path(), path.as_path());
    writer.save("SHOP", "main", postgres("db", "pw")).unwrap();

    let reader = CredentialStore::from_config(&config);
    assert_eq!(
        reader.get("SHOP", "main", true).unwrap().password.as_deref(),
        Some("pw")
    );
}

// ---------------------------------------------------------------------------
// save
// ---------------------------------------------------------------------------

#[test]
fn overwrite_keeps_one_record_with_new_fields() {
    let (_dir, store) = store();
    store.save("P", "C", postgres("old-host", "old-pw")).unwrap();
    let created_before = store.get("P", "C", false).unwrap().created_at;

    let second_call = Utc::now();
    store.save("P", "C", postgres("new-host", "new-pw")).unwrap();

    let rows = store.list(Some("P")).unwrap();
    assert_eq!(rows.len(), 1);

    let view = store.get("P", "C", true).unwrap();
    assert_eq!(view.host, "new-host");
    assert_eq!(view.password.as_deref(), Some("new-pw"));
    assert!(view.updated_at >= second_call);
    // created_at survives the overwrite.
    assert_eq!(view.created_at, created_before);
}

#[test]
fn saved_document_contains_no_plaintext_password() {
    let (_dir, store) = store();
    store
        .save("SHOP", "main", postgres("db", "very-distinctive-password"))
        .unwrap();

    let text = fs::read_to_string(store.path()).unwrap();
    assert!(!text.contains("very-distinctive-password"));

    let doc = read_document(&store);
    let enc = &doc["SHOP"]["main"]["password_encrypted"];
    assert!(enc["encrypted"].is_string());
    assert!(enc["iv"].is_string());
    assert!(enc["mac"].is_string());
}

#[test]
fn additional_params_are_persisted() {
    let (_dir, store) = store();
    let mut input = postgres("db", "pw");
    input
        .additional_params
        .insert("sslmode".into(), ParamValue::Text("require".into()));
    input
        .additional_params
        .insert("connect_timeout".into(), ParamValue::Integer(10));
    store.save("P", "main", input).unwrap();

    let view = store.get("P", "main", false).unwrap();
    assert_eq!(
        view.additional_params.get("connect_timeout"),
        Some(&ParamValue::Integer(10))
    );
    assert_eq!(
        view.additional_params.get("sslmode"),
        Some(&ParamValue::Text("require".into()))
    );
}

#[test]
fn save_fails_on_unreadable_document_and_leaves_it_untouched() {
    let (_dir, store) = store();
    fs::write(store.path(), "{ definitely not json").unwrap();

    let err = store.save("P", "main", postgres("db", "pw")).unwrap_err();
    assert!(matches!(err, VaultError::InvalidStoreFormat { .. }));
    assert_eq!(
        fs::read_to_string(store.path()).unwrap(),
        "{ definitely not json"
    );
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_on_absent_store_is_empty() {
    let (_dir, store) = store();
    assert!(store.list(None).unwrap().is_empty());
    assert!(!store.path().exists(), "reads must not create the document");
}

#[test]
fn list_filters_by_project() {
    let (_dir, store) = store();
    store.save("A", "main", postgres("a1", "pw")).unwrap();
    store.save("A", "replica", postgres("a2", "pw")).unwrap();
    store.save("B", "main", postgres("b1", "pw")).unwrap();

    let a = store.list(Some("A")).unwrap();
    assert_eq!(a.len(), 2);
    assert!(a.iter().all(|r| r.project_name == "A"));

    assert!(store.list(Some("missing")).unwrap().is_empty());
    assert_eq!(store.list(None).unwrap().len(), 3);
}

#[test]
fn list_is_ordered_by_project_then_connection() {
    let (_dir, store) = store();
    store.save("zeta", "main", postgres("h", "pw")).unwrap();
    store.save("alpha", "replica", postgres("h", "pw")).unwrap();
    store.save("alpha", "main", postgres("h", "pw")).unwrap();

    let keys: Vec<(String, String)> = store
        .list(None)
        .unwrap()
        .into_iter()
        .map(|r| (r.project_name, r.connection_name))
        .collect();

    assert_eq!(
        keys,
        vec![
            ("alpha".to_string(), "main".to_string()),
            ("alpha".to_string(), "replica".to_string()),
            ("zeta".to_string(), "main".to_string()),
        ]
    );
}

// ---------------------------------------------------------------------------
// delete
// ---------------------------------------------------------------------------

#[test]
fn delete_unknown_entries_fails_with_not_found() {
    let (_dir, store) = store();
    store.save("P", "main", postgres("h", "pw")).unwrap();

    assert!(matches!(
        store.delete("Q", "main"),
        Err(VaultError::NotFound(Missing::Project(_)))
    ));
    assert!(matches!(
        store.delete("P", "other"),
        Err(VaultError::NotFound(Missing::Connection { .. }))
    ));
}

#[test]
fn no_empty_project_buckets_after_save_delete_sequences() {
    let (_dir, store) = store();
    let ops: &[(&str, &str, bool)] = &[
        ("A", "x", true),
        ("A", "y", true),
        ("B", "x", true),
        ("A", "x", false),
        ("B", "x", false),
        ("A", "y", false),
        ("C", "z", true),
    ];

    for &(project, connection, is_save) in ops {
        if is_save {
            store.save(project, connection, postgres("h", "pw")).unwrap();
        } else {
            store.delete(project, connection).unwrap();
        }

        let doc = read_document(&store);
        for (name, connections) in doc.as_object().unwrap() {
            assert!(
                !connections.as_object().unwrap().is_empty(),
                "project {name} left empty"
            );
        }
    }

    let doc = read_document(&store);
    let projects: Vec<&String> = doc.as_object().unwrap().keys().collect();
    assert_eq!(projects, vec!["C"]);
}

// ---------------------------------------------------------------------------
// test
// ---------------------------------------------------------------------------

#[test]
fn test_reports_parameters_and_disclaimer() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db.example.com", "pw")).unwrap();

    let report = store.test("SHOP", "main").unwrap();
    assert!(report.well_formed);
    assert!(report.issues.is_empty());
    assert!(!report.live_check_performed);
    assert_eq!(report.host, "db.example.com");
    assert!(report.note.contains("No connection"));

    assert!(store.test("SHOP", "nope").unwrap_err().is_not_found());
}

#[test]
fn test_flags_damaged_ciphertext_without_decrypting() {
    let (_dir, store) = store();
    store.save("SHOP", "main", postgres("db", "pw")).unwrap();

    let mut doc = read_document(&store);
    doc["SHOP"]["main"]["password_encrypted"]["iv"] = Value::String("abcd".into());
    fs::write(store.path(), serde_json::to_string(&doc).unwrap()).unwrap();

    let report = store.test("SHOP", "main").unwrap();
    assert!(!report.well_formed);
    assert!(report.issues.iter().any(|i| i.contains("IV")));
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_saves_do_not_lose_updates() {
    let (_dir, store) = store();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .save("SHARED", &format!("conn-{i}"), postgres("h", "pw"))
                    .unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list(Some("SHARED")).unwrap().len(), 8);
}
