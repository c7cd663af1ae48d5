//! Multi-database registry behavior: creation, naming validation, and the
//! locking-protocol entry points exposed to the RPC server.

use cabinet::key::KeyType;
use cabinet::meta::Meta;
use cabinet::registry::Registry;
use cabinet::resp::KeyArg;
use cabinet::CabinetError;

#[test]
fn separate_databases_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();

    registry.create("ints", Meta::new(KeyType::I32, false)).unwrap();
    registry
        .create("strings", Meta::new(KeyType::String, false))
        .unwrap();

    registry
        .with_exclusive("ints", |c| c.set(&KeyArg::U32(1), b"one"))
        .unwrap();
    registry
        .with_exclusive("strings", |c| {
            c.set(&KeyArg::Bytes(b"k".to_vec()), b"value")
        })
        .unwrap();

    assert_eq!(
        registry.with_shared("ints", |c| c.get(&KeyArg::U32(1))).unwrap(),
        Some(b"one".to_vec())
    );
    assert_eq!(
        registry
            .with_shared("strings", |c| c.get(&KeyArg::Bytes(b"k".to_vec())))
            .unwrap(),
        Some(b"value".to_vec())
    );
}

#[test]
fn mismatched_key_variant_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();
    registry.create("ints", Meta::new(KeyType::I32, false)).unwrap();

    let err = registry.with_exclusive("ints", |c| c.set(&KeyArg::U64(1), b"x"));
    assert!(err.is_err());
}

#[test]
fn drop_clears_but_keeps_database() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();
    registry.create("db1", Meta::new(KeyType::I32, false)).unwrap();
    registry
        .with_exclusive("db1", |c| c.set(&KeyArg::U32(1), b"a"))
        .unwrap();
    registry.with_exclusive("db1", |c| c.flush()).unwrap();

    registry.drop_db("db1").unwrap();

    assert_eq!(
        registry.with_shared("db1", |c| c.get(&KeyArg::U32(1))).unwrap(),
        None
    );
    assert!(dir.path().join("db1").join("meta").exists());
}

#[test]
fn server_info_reports_every_database() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();
    registry.create("a", Meta::new(KeyType::I32, false)).unwrap();
    registry.create("b", Meta::new(KeyType::I64, false)).unwrap();

    let info = registry.server_info();
    assert_eq!(info.len(), 2);
    assert_eq!(info["a"].key_type, KeyType::I32);
    assert_eq!(info["b"].key_type, KeyType::I64);
}

#[test]
fn bad_names_are_rejected_before_touching_disk() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Registry::open(dir.path()).unwrap();

    match registry.create("has/slash", Meta::new(KeyType::I32, false)) {
        Err(CabinetError::BadDbName(_)) => {}
        other => panic!("expected BadDbName, got {:?}", other),
    }
}
