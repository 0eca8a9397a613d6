//! End-to-end coverage for the SQLCipher repositories and the bootstrapped
//! vault.
//!
//! Repository tests run against an isolated, migrated database. Store tests
//! boot a full [`credstore_infra::AppContext`] and restart it over the same
//! database file to exercise key resolution and rotation.

mod support;

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use credstore_core::{CanaryRepository, CredentialRepository, PermissionRepository, SetRequest};
use credstore_domain::{
    codes, CredStoreError, CredentialAttributes, CredentialName, CredentialType, CredentialValue,
    CredentialVersion, EncryptionKeyCanary, OperationSet, PermissionEntry,
    PermissionOperation::{Delete, Read, ReadAcl, Write, WriteAcl},
};
use credstore_infra::database::{
    SqlCipherCanaryRepository, SqlCipherCredentialRepository, SqlCipherPermissionRepository,
};
use support::{hex_descriptor, hex_key, TestDatabase, TestStore};
use uuid::Uuid;

const ALICE: &str = "uaa-user:alice";
const BOB: &str = "uaa-user:bob";

fn version(name: &str, key_id: Uuid, minutes: i64) -> CredentialVersion {
    let created = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid timestamp")
        + ChronoDuration::minutes(minutes);
    CredentialVersion {
        uuid: Uuid::new_v4(),
        name: CredentialName::parse(name).expect("valid name"),
        credential_type: CredentialType::Password,
        key_id,
        encrypted_value: vec![1, 2, 3, minutes as u8],
        nonce: Uuid::new_v4().as_bytes()[..12].to_vec(),
        encrypted_generation_parameters: None,
        generation_parameters_nonce: None,
        attributes: CredentialAttributes::default(),
        version_created_at: created,
        updated_at: created,
    }
}

fn certificate(name: &str, ca_name: &str, minutes: i64) -> CredentialVersion {
    CredentialVersion {
        credential_type: CredentialType::Certificate,
        attributes: CredentialAttributes {
            ca_name: Some(ca_name.to_string()),
            certificate: Some("-----BEGIN CERTIFICATE-----".to_string()),
            ..CredentialAttributes::default()
        },
        ..version(name, Uuid::new_v4(), minutes)
    }
}

/// `next` as a later version of the name `previous` was stored under.
fn after(previous: &CredentialVersion, mut next: CredentialVersion) -> CredentialVersion {
    next.name.uuid = previous.name.uuid;
    next
}

fn password(value: &str) -> CredentialValue {
    CredentialValue::Password(value.to_string())
}

// ============================================================================
// Repositories
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn versions_share_one_case_insensitive_name_and_sort_newest_first() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let key_id = Uuid::new_v4();

    let first = repo.save(version("/App/DB", key_id, 0), vec![]).await.unwrap();
    let second = repo.save(after(&first, version("/app/db", key_id, 5)), vec![]).await.unwrap();
    // Same timestamp as `second`; insertion order breaks the tie.
    let third = repo.save(after(&first, version("/APP/db", key_id, 5)), vec![]).await.unwrap();

    assert_eq!(second.name, first.name, "later saves reuse the stored name");
    assert_eq!(third.name.name, "/App/DB");

    let all = repo.find_all_versions("/app/DB").await.unwrap();
    let uuids: Vec<Uuid> = all.iter().map(|v| v.uuid).collect();
    assert_eq!(uuids, vec![third.uuid, second.uuid, first.uuid]);

    let latest = repo.find_most_recent("/APP/DB").await.unwrap().expect("latest version");
    assert_eq!(latest.uuid, third.uuid);
    assert_eq!(latest.version_created_at, third.version_created_at);

    let by_uuid = repo.find_by_uuid(first.uuid).await.unwrap().expect("version by uuid");
    assert_eq!(by_uuid, first);

    assert!(repo.find_most_recent("/missing").await.unwrap().is_none());
    assert!(repo.find_by_uuid(Uuid::new_v4()).await.unwrap().is_none());
    assert_eq!(repo.all_names().await.unwrap(), vec!["/App/DB".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn saving_under_a_new_identity_does_not_take_over_an_existing_name() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let permissions = SqlCipherPermissionRepository::new(Arc::clone(&db.manager));

    let owned = CredentialVersion {
        credential_type: CredentialType::Value,
        ..version("/x", Uuid::new_v4(), 0)
    };
    let first = repo
        .save(owned, vec![PermissionEntry::new(ALICE, OperationSet::all().operations())])
        .await
        .unwrap();

    // A second first-writer that never saw `/x`, with its own name uuid.
    let racer = version("/X", Uuid::new_v4(), 1);
    assert_ne!(racer.name.uuid, first.name.uuid);
    let err = repo
        .save(racer, vec![PermissionEntry::new(BOB, OperationSet::all().operations())])
        .await
        .unwrap_err();
    assert!(matches!(err, CredStoreError::Conflict { .. }), "got {err:?}");
    assert_eq!(err.reason_code(), codes::CREDENTIAL_ALREADY_EXISTS);

    let latest = repo.find_most_recent("/x").await.unwrap().expect("first version kept");
    assert_eq!(latest.uuid, first.uuid);
    assert_eq!(latest.credential_type, CredentialType::Value);
    assert_eq!(repo.find_all_versions("/x").await.unwrap().len(), 1);
    assert!(permissions.find_operations("/x", BOB).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn unrecognised_stored_type_is_a_configuration_error() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));

    let saved = repo.save(version("/y", Uuid::new_v4(), 0), vec![]).await.unwrap();
    {
        let conn = db.manager.get_connection().expect("connection");
        conn.execute(
            "UPDATE credential_version SET type = 'bogus' WHERE uuid = ?1",
            &[&saved.uuid.to_string()],
        )
        .expect("type rewritten");
    }

    let err = repo.find_most_recent("/y").await.unwrap_err();
    assert!(matches!(err, CredStoreError::Config { .. }), "got {err:?}");
    assert_eq!(err.reason_code(), codes::UNKNOWN_CREDENTIAL_TYPE);

    let err = repo.find_by_uuid(saved.uuid).await.unwrap_err();
    assert_eq!(err.reason_code(), codes::UNKNOWN_CREDENTIAL_TYPE);
}

#[tokio::test(flavor = "multi_thread")]
async fn searches_return_one_summary_per_name() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let key_id = Uuid::new_v4();

    let web = repo.save(version("/deploy/web/password", key_id, 0), vec![]).await.unwrap();
    repo.save(after(&web, version("/deploy/web/password", key_id, 10)), vec![]).await.unwrap();
    repo.save(version("/deploy/worker/token", key_id, 5), vec![]).await.unwrap();
    repo.save(version("/deployment", key_id, 1), vec![]).await.unwrap();

    let containing = repo.find_containing_name("WEB").await.unwrap();
    assert_eq!(containing.len(), 1);
    assert_eq!(containing[0].name, "/deploy/web/password");
    assert_eq!(
        containing[0].version_created_at,
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 10, 0).single().unwrap()
    );

    let under: Vec<String> = repo
        .find_starting_with_path("/Deploy/")
        .await
        .unwrap()
        .into_iter()
        .map(|summary| summary.name)
        .collect();
    assert_eq!(under, vec!["/deploy/web/password", "/deploy/worker/token"]);

    let prefixed = repo.find_starting_with_path("/deploy").await.unwrap();
    assert_eq!(prefixed.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn certificates_are_found_by_their_latest_signing_ca() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));

    repo.save(certificate("/leaf/b", "/root-ca", 0), vec![]).await.unwrap();
    repo.save(certificate("/leaf/a", "/ROOT-CA", 0), vec![]).await.unwrap();
    let moved = repo.save(certificate("/leaf/moved", "/root-ca", 0), vec![]).await.unwrap();
    repo.save(after(&moved, certificate("/leaf/moved", "/other-ca", 1)), vec![]).await.unwrap();

    let names = repo.find_certificate_names_by_ca_name("/root-ca").await.unwrap();
    assert_eq!(names, vec!["/leaf/a".to_string(), "/leaf/b".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn grants_merge_into_existing_entries() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let permissions = SqlCipherPermissionRepository::new(Arc::clone(&db.manager));

    let saved = repo
        .save(
            version("/svc", Uuid::new_v4(), 0),
            vec![PermissionEntry::new(ALICE, OperationSet::all().operations())],
        )
        .await
        .unwrap();
    repo.save(
        after(&saved, version("/svc", Uuid::new_v4(), 1)),
        vec![PermissionEntry::new(BOB, [Read])],
    )
    .await
    .unwrap();

    let entries = permissions
        .merge(saved.name.uuid, vec![PermissionEntry::new(BOB, [Write, ReadAcl])])
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].actor, ALICE);
    assert_eq!(entries[1].actor, BOB);
    assert_eq!(entries[1].operations.operations(), vec![Read, Write, ReadAcl]);

    let bob = permissions.find_operations("/SVC", BOB).await.unwrap().expect("bob has an entry");
    assert!(bob.contains(Write) && !bob.contains(Delete) && !bob.contains(WriteAcl));
    assert!(permissions.find_operations("/svc", "uaa-user:mallory").await.unwrap().is_none());

    assert!(permissions.delete(saved.name.uuid, BOB).await.unwrap());
    assert!(!permissions.delete(saved.name.uuid, BOB).await.unwrap());
    assert_eq!(permissions.find_all(saved.name.uuid).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn names_granting_an_operation_come_back_in_one_sorted_list() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let permissions = SqlCipherPermissionRepository::new(Arc::clone(&db.manager));

    let owner = PermissionEntry::new(ALICE, OperationSet::all().operations());
    for (name, bob) in [("/c", [Write]), ("/b", [Read]), ("/a", [Read])] {
        let grants = vec![owner.clone(), PermissionEntry::new(BOB, bob)];
        repo.save(version(name, Uuid::new_v4(), 0), grants).await.unwrap();
    }

    let readable = permissions.find_names_granting(BOB, Read).await.unwrap();
    assert_eq!(readable, vec!["/a".to_string(), "/b".to_string()]);
    let writable = permissions.find_names_granting(BOB, Write).await.unwrap();
    assert_eq!(writable, vec!["/c".to_string()]);
    assert_eq!(permissions.find_names_granting(ALICE, WriteAcl).await.unwrap().len(), 3);
    assert!(permissions.find_names_granting("uaa-user:mallory", Read).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn deleting_a_name_removes_versions_and_entries() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let permissions = SqlCipherPermissionRepository::new(Arc::clone(&db.manager));

    let first = repo
        .save(version("/doomed", Uuid::new_v4(), 0), vec![PermissionEntry::new(ALICE, [Read])])
        .await
        .unwrap();
    repo.save(after(&first, version("/doomed", Uuid::new_v4(), 1)), vec![]).await.unwrap();
    repo.save(version("/kept", Uuid::new_v4(), 0), vec![]).await.unwrap();

    assert!(repo.delete("/DOOMED").await.unwrap());
    assert!(!repo.delete("/doomed").await.unwrap());

    assert!(repo.find_name("/doomed").await.unwrap().is_none());
    assert!(repo.find_by_uuid(first.uuid).await.unwrap().is_none());
    assert!(permissions.find_all(first.name.uuid).await.unwrap().is_empty());
    assert_eq!(repo.all_names().await.unwrap(), vec!["/kept".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn encryption_updates_are_compare_and_set() {
    let db = TestDatabase::new();
    let repo = SqlCipherCredentialRepository::new(Arc::clone(&db.manager));
    let (old_key, other_key, new_key) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    for minutes in 0..5 {
        repo.save(version(&format!("/rotate/{minutes}"), old_key, minutes), vec![]).await.unwrap();
    }
    repo.save(version("/rotate/other", other_key, 9), vec![]).await.unwrap();

    let counts = repo.count_by_key_id().await.unwrap();
    assert_eq!(counts.get(&old_key), Some(&5));
    assert_eq!(counts.get(&other_key), Some(&1));

    let batch = repo.find_by_key_ids(&[old_key], 3).await.unwrap();
    assert_eq!(batch.len(), 3);
    assert!(batch.iter().all(|v| v.key_id == old_key));
    assert!(repo.find_by_key_ids(&[], 3).await.unwrap().is_empty());

    let original = batch[0].clone();
    let mut rotated = original.clone();
    rotated.key_id = new_key;
    rotated.encrypted_value = vec![9, 9, 9];
    rotated.nonce = vec![7; 12];
    rotated.updated_at = Utc::now();

    assert!(repo.update_encryption(&rotated, old_key, &original.nonce).await.unwrap());
    // The row no longer carries the old stamp.
    assert!(!repo.update_encryption(&rotated, old_key, &original.nonce).await.unwrap());

    let stored = repo.find_by_uuid(original.uuid).await.unwrap().expect("rotated version");
    assert_eq!(stored.key_id, new_key);
    assert_eq!(stored.encrypted_value, vec![9, 9, 9]);
    assert_eq!(stored.version_created_at, original.version_created_at);

    let remaining = repo.find_by_key_ids(&[old_key, other_key], 50).await.unwrap();
    assert_eq!(remaining.len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn canaries_round_trip_and_delete_in_bulk() {
    let db = TestDatabase::new();
    let canaries = SqlCipherCanaryRepository::new(Arc::clone(&db.manager));

    let hex = EncryptionKeyCanary {
        uuid: Uuid::new_v4(),
        encrypted_value: vec![1; 32],
        nonce: vec![2; 12],
        salt: None,
    };
    let password = EncryptionKeyCanary {
        uuid: Uuid::new_v4(),
        encrypted_value: vec![3; 32],
        nonce: vec![4; 12],
        salt: Some("BQUFBQUFBQUFBQUFBQUFBQ".to_string()),
    };
    canaries.save(hex.clone()).await.unwrap();
    canaries.save(password.clone()).await.unwrap();

    let mut stored = canaries.find_all().await.unwrap();
    stored.sort_by_key(|c| c.salt.is_some());
    assert_eq!(stored, vec![hex.clone(), password.clone()]);

    assert_eq!(canaries.delete(&[]).await.unwrap(), 0);
    assert_eq!(canaries.delete(&[hex.uuid, Uuid::new_v4()]).await.unwrap(), 1);
    assert_eq!(canaries.find_all().await.unwrap(), vec![password]);
}

// ============================================================================
// Bootstrapped store
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn vault_round_trips_credentials_through_sqlcipher() {
    let store = TestStore::new();
    let ctx = store.start(vec![hex_descriptor(&hex_key(), true)]).await.unwrap();

    let saved = ctx
        .vault
        .save_credential(ALICE, SetRequest::new("deploy/db", password("hunter2")))
        .await
        .unwrap();
    assert_eq!(saved.name, "/deploy/db");

    let read = ctx.vault.find_most_recent(ALICE, "/DEPLOY/db").await.unwrap();
    assert_eq!(read.value, password("hunter2"));
    assert_eq!(read.uuid, saved.uuid);

    let err = ctx.vault.find_most_recent(BOB, "/deploy/db").await.unwrap_err();
    assert_eq!(err.reason_code(), codes::CREDENTIAL_INVALID_ACCESS);

    ctx.vault.grant(ALICE, "/deploy/db", vec![PermissionEntry::new(BOB, [Read])]).await.unwrap();
    let shared = ctx.vault.find_most_recent(BOB, "/deploy/db").await.unwrap();
    assert_eq!(shared.value, password("hunter2"));

    let paths = ctx.vault.list_paths_under(ALICE, "/").await.unwrap();
    assert!(paths.contains("/deploy/"));

    ctx.vault.delete(ALICE, "/deploy/db").await.unwrap();
    let gone = ctx.vault.find_most_recent(ALICE, "/deploy/db").await.unwrap_err();
    assert!(matches!(gone, CredStoreError::NotFound(_)));

    let batches = store.audit.batches();
    assert!(batches.iter().any(|b| b.requester == BOB && !b.success));
    assert!(batches.last().is_some_and(|b| b.requester == ALICE && b.success));
}

#[tokio::test(flavor = "multi_thread")]
async fn rotation_after_restart_moves_versions_to_the_new_key() {
    let store = TestStore::new();
    let (old, new) = (hex_key(), hex_key());

    let before = store.start(vec![hex_descriptor(&old, true)]).await.unwrap();
    for i in 0..7 {
        before
            .vault
            .save_credential(
                ALICE,
                SetRequest::new(format!("/rotate/{i}"), password(&format!("pw-{i}"))),
            )
            .await
            .unwrap();
    }
    let old_id = before.encryptor.active_key_id();
    drop(before);

    let after = store
        .start(vec![hex_descriptor(&old, false), hex_descriptor(&new, true)])
        .await
        .unwrap();
    let new_id = after.encryptor.active_key_id();
    assert_ne!(old_id, new_id);

    let report = after.vault.run_key_rotation().await.unwrap();
    assert_eq!(report.rotated, 7);
    assert_eq!(report.conflicts, 0);
    assert_eq!(report.remaining_unknown, 0);

    let repo = SqlCipherCredentialRepository::new(Arc::clone(&after.db));
    let counts = repo.count_by_key_id().await.unwrap();
    assert_eq!(counts.get(&new_id), Some(&7));
    assert!(!counts.contains_key(&old_id));

    let read = after.vault.find_most_recent(ALICE, "/rotate/3").await.unwrap();
    assert_eq!(read.value, password("pw-3"));
    drop(after);

    // The old key is no longer needed once everything has moved.
    let only_new = store.start(vec![hex_descriptor(&new, true)]).await.unwrap();
    let read = only_new.vault.find_most_recent(ALICE, "/rotate/6").await.unwrap();
    assert_eq!(read.value, password("pw-6"));
}

#[tokio::test(flavor = "multi_thread")]
async fn startup_rejects_an_invalid_key_list() {
    let store = TestStore::new();

    let err = match store.start(vec![hex_descriptor(&hex_key(), false)]).await {
        Ok(_) => panic!("a key list without an active key must not start"),
        Err(err) => err,
    };
    assert_eq!(err.reason_code(), codes::MISSING_ACTIVE_KEY);
}
