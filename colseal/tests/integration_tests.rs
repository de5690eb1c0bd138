//! Integration tests for colseal with FileKeyProvider and StaticKeyProvider.

use colseal::blind_index::normalize;
use colseal::cipher::CipherVault;
use colseal::compress::CompressionMode;
use colseal::error::Error;
use colseal::key_provider::StaticKeyProvider;
use colseal::search::ColumnIdent;
use colseal::wire::OuterEnvelope;
use colseal_key_file::FileKeyProvider;
use proptest::prelude::*;
use secrecy::SecretVec;
use tempfile::TempDir;

fn static_provider(default: &str) -> StaticKeyProvider {
    StaticKeyProvider::new(
        [
            ("v1".to_string(), SecretVec::new(vec![0u8; 32])),
            ("v2".to_string(), SecretVec::new(vec![1u8; 32])),
        ],
        default,
    )
    .expect("default key must be present")
}

#[test]
fn test_end_to_end_with_file_provider() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let provider = FileKeyProvider::init(temp_dir.path()).expect("Failed to initialize keys");

    let vault = CipherVault::new(&provider).expect("Failed to build vault");

    let plaintext = b"alice@example.com";
    let ciphertext = vault.seal(plaintext).expect("Encryption failed");
    let decrypted = vault.open(&ciphertext).expect("Decryption failed");

    assert_eq!(plaintext, &decrypted[..]);
}

#[test]
fn test_sealed_value_with_file_provider() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let provider = FileKeyProvider::init(temp_dir.path()).expect("Failed to initialize keys");
    let vault = CipherVault::new(&provider).expect("Failed to build vault");

    let value = normalize::email("Alice@Example.com");
    let sealed = vault.seal_indexed(value.as_bytes()).expect("Sealing failed");

    assert_eq!(sealed.key_id, "v1");
    assert_eq!(vault.open(&sealed.ciphertext).unwrap(), value.as_bytes());

    // Search with the same normalizer finds the stored tag
    let tags = vault.blind_index_all(normalize::email(" ALICE@example.COM ").as_bytes()).unwrap();
    assert!(tags.iter().any(|(id, tag)| id == &sealed.key_id && *tag == sealed.blind_index));
}

#[test]
fn test_key_rotation_with_file_provider() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let provider = FileKeyProvider::init(temp_dir.path()).expect("Failed to initialize keys");
    let vault = CipherVault::new(&provider).expect("Failed to build vault");

    let plaintext = b"alice@example.com";
    let old_sealed = vault.seal_indexed(plaintext).expect("Sealing failed");
    assert_eq!(old_sealed.key_id, "v1");

    // Provision v2 and make it the default; the old key stays active
    provider.add_key("v2").expect("Failed to add key");
    provider.set_default("v2").expect("Failed to set default");

    let rotated_vault = CipherVault::new(&provider).expect("Failed to rebuild vault");
    assert_eq!(rotated_vault.default_key_id(), "v2");
    assert!(rotated_vault.needs_rotation(&old_sealed.ciphertext));

    // Old ciphertext still opens, and its tag still matches a v1 search tag
    assert_eq!(rotated_vault.open(&old_sealed.ciphertext).unwrap(), plaintext);
    let tags = rotated_vault.blind_index_all(plaintext).unwrap();
    assert!(tags.iter().any(|(id, tag)| id == "v1" && *tag == old_sealed.blind_index));

    // Rotating re-seals and re-indexes under v2 consistently
    let new_sealed = rotated_vault.rotate_indexed(&old_sealed.ciphertext).unwrap();
    assert_eq!(new_sealed.key_id, "v2");
    assert!(!rotated_vault.needs_rotation(&new_sealed.ciphertext));
    assert_eq!(rotated_vault.open(&new_sealed.ciphertext).unwrap(), plaintext);
    assert!(tags.iter().any(|(id, tag)| id == "v2" && *tag == new_sealed.blind_index));
}

// The concrete scenario: K_v1 = 32 zero bytes, K_v2 = 32 bytes of 0x01,
// default v1; seal "hello", rebuild with default v2, rotate, reopen.
#[test]
fn test_rotation_scenario_static_keys() {
    let vault_v1 = CipherVault::new(&static_provider("v1")).unwrap();

    let ciphertext = vault_v1.seal_with("v1", b"hello").unwrap();
    assert_eq!(vault_v1.open(&ciphertext).unwrap(), b"hello");

    let vault_v2 = CipherVault::new(&static_provider("v2")).unwrap();
    let rotated = vault_v2.rotate(&ciphertext).unwrap();

    let envelope = OuterEnvelope::from_bytes(&rotated).unwrap();
    assert_eq!(envelope.key_id(), "v2");
    assert_eq!(vault_v2.open(&rotated).unwrap(), b"hello");
}

#[test]
fn test_search_predicate_end_to_end() {
    let vault = CipherVault::new(&static_provider("v1")).unwrap();
    let column = ColumnIdent::new("email_idx");

    let value = normalize::email("Alice@Example.com");
    let predicate = vault.equality_predicate(&column, value.as_bytes(), 1).unwrap();

    assert_eq!(predicate.column().as_str(), "email_idx");
    assert_eq!(predicate.param_offset(), 1);
    assert_eq!(predicate.tags().len(), 2);

    // The tag stored at write time is among the predicate's tags
    let sealed = vault.seal_indexed(value.as_bytes()).unwrap();
    assert!(predicate
        .tags()
        .iter()
        .any(|(id, tag)| id == &sealed.key_id && *tag == sealed.blind_index));
}

#[test]
fn test_nullable_column_flow() {
    let vault = CipherVault::new(&static_provider("v1")).unwrap();

    // A NULL column stays NULL through every operation
    assert!(vault.seal_indexed_opt(None).unwrap().is_none());
    assert!(vault.open_opt(None).unwrap().is_none());
    assert!(vault.rotate_opt(None).unwrap().is_none());

    let sealed = vault.seal_indexed_opt(Some(b"present")).unwrap().unwrap();
    assert_eq!(vault.open_opt(Some(&sealed.ciphertext)).unwrap().unwrap(), b"present");
}

#[test]
fn test_teardown_is_shared_across_clones() {
    let vault = CipherVault::new(&static_provider("v1")).unwrap();
    let worker = vault.clone();

    vault.close();

    assert!(matches!(worker.seal(b"x"), Err(Error::UsedAfterTeardown)));
    assert!(matches!(worker.blind_index_all(b"x"), Err(Error::UsedAfterTeardown)));
}

proptest! {
    #[test]
    fn prop_round_trip(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let vault = CipherVault::new(&static_provider("v1")).unwrap();

        let ciphertext = vault.seal(&plaintext).unwrap();
        prop_assert_eq!(vault.open(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn prop_round_trip_compressed(plaintext in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let vault =
            CipherVault::with_compression(&static_provider("v1"), CompressionMode::Zstd).unwrap();

        let ciphertext = vault.seal(&plaintext).unwrap();
        prop_assert_eq!(vault.open(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn prop_blind_index_deterministic(value in proptest::collection::vec(any::<u8>(), 0..256)) {
        let vault = CipherVault::new(&static_provider("v1")).unwrap();

        let tag1 = vault.blind_index("v1", &value).unwrap();
        let tag2 = vault.blind_index("v1", &value).unwrap();
        prop_assert_eq!(tag1, tag2);

        let other = vault.blind_index("v2", &value).unwrap();
        prop_assert_ne!(tag1, other);
    }
}
