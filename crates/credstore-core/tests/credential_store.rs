use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::ExposeSecret;

use credstore_core::crypto::{KeyPolicy, MasterPassword, MultiKeyCipher};
use credstore_core::props::{MemoryPropertyStore, PropertyStore};
use credstore_core::vault::{MemoryVault, SharedVault, VaultSlot};
use credstore_core::{CredError, Result, Scope, ScopedCredentialStore, StoreState};

fn slot() -> VaultSlot {
    VaultSlot::for_identity("alice")
}

fn scoped(
    vault: &Arc<SharedVault>,
    props: &Arc<MemoryPropertyStore>,
    policy: KeyPolicy,
) -> ScopedCredentialStore {
    ScopedCredentialStore::new(Scope::Global, slot(), vault.clone(), props.clone(), policy)
}

fn vault_password(vault: &SharedVault) -> Option<String> {
    vault
        .lock()
        .get(&slot())
        .expect("vault read should succeed")
        .map(|password| password.expose().to_string())
}

fn ring_for(password: &str) -> MultiKeyCipher {
    MultiKeyCipher::new(&MasterPassword::from(password.to_string()), &KeyPolicy::default())
        .expect("ring should build")
}

/// Property store whose writes can be switched off.
#[derive(Default)]
struct FlakyProps {
    inner: MemoryPropertyStore,
    fail_writes: AtomicBool,
}

impl PropertyStore for FlakyProps {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.inner.get_string(key)
    }

    fn set_property(&self, key: &str, value: Option<&str>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CredError::Property("disk full".to_string()));
        }
        self.inner.set_property(key, value)
    }

    fn keys_with_suffix(&self, suffix: &str) -> Result<Vec<String>> {
        self.inner.keys_with_suffix(suffix)
    }

    fn remove_property(&self, key: &str) -> Result<()> {
        self.inner.remove_property(key)
    }
}

#[test]
fn test_round_trip_many_secrets() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());

    let cases = [
        ("acct1", "sekret1"),
        ("sip.acc42", "p@ss w0rd"),
        ("xmpp", "päßwörd ✓"),
        ("empty", ""),
        ("long", "0123456789abcdef0123456789abcdef!"),
    ];
    for (prefix, secret) in cases {
        assert!(store.store_password(prefix, Some(secret)));
    }
    for (prefix, secret) in cases {
        let loaded = store.load_password(prefix).expect("secret should load");
        assert_eq!(loaded.expose_secret(), secret);
    }
}

#[test]
fn test_records_from_short_key_ring_stay_readable() {
    let vault = Arc::new(SharedVault::new(MemoryVault::with_secret(&slot(), "master")));
    let props = Arc::new(MemoryPropertyStore::new());

    let restricted = scoped(&vault, &props, KeyPolicy::restricted(128));
    assert!(restricted.store_password("acct1", Some("sekret1")));
    drop(restricted);

    let full = scoped(&vault, &props, KeyPolicy::default());
    let loaded = full.load_password("acct1").expect("secret should load");
    assert_eq!(loaded.expose_secret(), "sekret1");
}

#[test]
fn test_ciphertext_bound_to_prefix() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());

    assert!(store.store_password("acct1", Some("sekret1")));
    assert!(store.store_password("other", Some("x")));
    let ciphertext = props
        .get_string("acct1.ENCRYPTED_PASSWORD")
        .unwrap()
        .expect("record should exist");

    for target in ["acct2", "other"] {
        props
            .set_property(&format!("{}.ENCRYPTED_PASSWORD", target), Some(&ciphertext))
            .unwrap();
        assert!(
            store.load_password(target).is_none(),
            "ciphertext of acct1 must not load as {}",
            target
        );
    }
}

#[test]
fn test_migration_is_idempotent() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    props
        .set_property("acct2.PASSWORD", Some(&STANDARD.encode("legacyPlain")))
        .unwrap();
    let store = scoped(&vault, &props, KeyPolicy::default());

    let first = store.migrate_legacy_plaintext().unwrap();
    assert_eq!(first.migrated, 1);
    let snapshot = props.snapshot();

    let second = store.migrate_legacy_plaintext().unwrap();
    assert!(second.is_noop());
    assert_eq!(props.snapshot(), snapshot);
}

#[test]
fn test_rotation_preserves_plaintext() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());

    assert!(store.store_password("acct1", Some("sekret1")));
    assert!(store.store_password("acct2", Some("sekret2")));
    let old_password = vault_password(&vault).expect("password should exist");

    store.rotate_master_password().expect("rotation should succeed");

    let new_password = vault_password(&vault).expect("password should exist");
    assert_ne!(old_password, new_password);
    assert_eq!(store.load_password("acct1").unwrap().expose_secret(), "sekret1");
    assert_eq!(store.load_password("acct2").unwrap().expose_secret(), "sekret2");

    let old_ring = ring_for(&old_password);
    for key in ["acct1.ENCRYPTED_PASSWORD", "acct2.ENCRYPTED_PASSWORD"] {
        let ciphertext = props.get_string(key).unwrap().unwrap();
        let prefix = key.trim_end_matches(".ENCRYPTED_PASSWORD");
        assert!(old_ring
            .decrypt_matching(&ciphertext, |value| value.starts_with(prefix))
            .is_err());
    }
}

#[test]
fn test_first_rotation_adds_spice_to_unspiced_records() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let legacy_ring = MultiKeyCipher::new(&MasterPassword::legacy_default(), &KeyPolicy::default())
        .unwrap();
    props
        .set_property(
            "acct1.ENCRYPTED_PASSWORD",
            Some(&legacy_ring.encrypt("sekret1").unwrap()),
        )
        .unwrap();
    let store = scoped(&vault, &props, KeyPolicy::default());

    let loaded = store.load_password("acct1").expect("secret should load");
    assert_eq!(loaded.expose_secret(), "sekret1");

    let ring = ring_for(&vault_password(&vault).unwrap());
    let ciphertext = props.get_string("acct1.ENCRYPTED_PASSWORD").unwrap().unwrap();
    assert_eq!(ring.decrypt(&ciphertext).unwrap().as_str(), "acct1sekret1");
}

#[test]
fn test_scenario_fresh_vault() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());
    assert!(vault_password(&vault).is_none());

    assert!(store.store_password("acct1", Some("sekret1")));

    let password = vault_password(&vault).expect("password should be created");
    assert_eq!(password.len(), 64);
    assert!(password.chars().all(|c| c.is_ascii_alphabetic()));
    let record = props.get_string("acct1.ENCRYPTED_PASSWORD").unwrap().unwrap();
    assert!(!record.is_empty());
    assert_eq!(store.load_password("acct1").unwrap().expose_secret(), "sekret1");
}

#[test]
fn test_scenario_legacy_plaintext_migrated_on_bootstrap() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    props
        .set_property("acct2.PASSWORD", Some(&STANDARD.encode("legacyPlain")))
        .unwrap();
    let store = scoped(&vault, &props, KeyPolicy::default());

    assert!(store.store_password("acct1", Some("sekret1")));

    assert!(props.get_string("acct2.PASSWORD").unwrap().is_none());
    assert!(props.get_string("acct2.ENCRYPTED_PASSWORD").unwrap().is_some());
    assert_eq!(
        store.load_password("acct2").unwrap().expose_secret(),
        "legacyPlain"
    );
}

#[test]
fn test_concurrent_scopes_share_one_password() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let global_props = Arc::new(MemoryPropertyStore::new());
    let user_props = Arc::new(MemoryPropertyStore::new());
    let slot = VaultSlot::for_identity("shared");

    let global = Arc::new(ScopedCredentialStore::new(
        Scope::Global,
        slot.clone(),
        vault.clone(),
        global_props.clone(),
        KeyPolicy::default(),
    ));
    let user = Arc::new(ScopedCredentialStore::new(
        Scope::User,
        slot.clone(),
        vault.clone(),
        user_props.clone(),
        KeyPolicy::default(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = if i % 2 == 0 { global.clone() } else { user.clone() };
            thread::spawn(move || {
                let prefix = format!("acct{}", i);
                let secret = format!("sekret{}", i);
                assert!(store.store_password(&prefix, Some(&secret)));
                let loaded = store.load_password(&prefix).expect("secret should load");
                assert_eq!(loaded.expose_secret(), secret.as_str());
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread should not panic");
    }

    let password = vault
        .lock()
        .get(&slot)
        .unwrap()
        .expect("password should exist");
    let ring = ring_for(password.expose());
    for (props, parity) in [(&global_props, 0), (&user_props, 1)] {
        for i in (parity..8).step_by(2) {
            let ciphertext = props
                .get_string(&format!("acct{}.ENCRYPTED_PASSWORD", i))
                .unwrap()
                .unwrap();
            assert_eq!(
                ring.decrypt(&ciphertext).unwrap().as_str(),
                format!("acct{}sekret{}", i, i)
            );
        }
    }
}

#[test]
fn test_undecryptable_record_aborts_rotation_before_vault_write() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());
    assert!(store.store_password("acct1", Some("sekret1")));
    let old_password = vault_password(&vault).unwrap();

    props
        .set_property("broken.ENCRYPTED_PASSWORD", Some("not base64!"))
        .unwrap();
    let result = store.rotate_master_password();

    assert!(matches!(result, Err(CredError::Rotation(_))));
    assert_eq!(store.state(), StoreState::Uninitialized);
    assert_eq!(vault_password(&vault).unwrap(), old_password);
    assert_eq!(store.load_password("acct1").unwrap().expose_secret(), "sekret1");
}

#[test]
fn test_failed_record_write_resets_store() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(FlakyProps::default());
    let store = ScopedCredentialStore::new(
        Scope::User,
        slot(),
        vault.clone(),
        props.clone(),
        KeyPolicy::default(),
    );
    assert!(store.store_password("acct1", Some("sekret1")));
    let old_password = vault_password(&vault).unwrap();

    props.fail_writes.store(true, Ordering::SeqCst);
    let result = store.rotate_master_password();

    assert!(matches!(result, Err(CredError::Rotation(_))));
    assert_eq!(store.state(), StoreState::Uninitialized);
    assert_ne!(vault_password(&vault).unwrap(), old_password);
}

#[test]
fn test_read_only_vault_fails_store() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new().read_only()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::default());

    assert!(!store.store_password("acct1", Some("sekret1")));
    assert_eq!(store.state(), StoreState::Uninitialized);
    assert!(props.is_empty());
}

#[test]
fn test_no_usable_key_fails_store() {
    let vault = Arc::new(SharedVault::new(MemoryVault::new()));
    let props = Arc::new(MemoryPropertyStore::new());
    let store = scoped(&vault, &props, KeyPolicy::restricted(64));

    assert!(!store.store_password("acct1", Some("sekret1")));
    assert!(vault_password(&vault).is_none());
}
