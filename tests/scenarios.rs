//! End-to-end scenarios against a `u32`-keyed database, taken directly
//! from the literal examples in the storage engine's specification.

use cabinet::Cabinet;

#[test]
fn scenario_set_then_get_unflushed() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    db.set(1, b"a").unwrap();

    assert_eq!(db.get(&1).unwrap(), Some(b"a".to_vec()));
    assert_eq!(db.entry_count(), 1);
    assert_eq!(db.data_bytes(), 1);
    assert_eq!(db.data_file_size(), 0);
}

#[test]
fn scenario_flush_updates_file_size() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    db.set(1, b"a").unwrap();
    db.flush().unwrap();

    assert_eq!(db.data_file_size(), 1);
    assert_eq!(db.data_bytes(), 1);
}

#[test]
fn scenario_overwrite_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    db.set(1, b"a").unwrap();
    db.flush().unwrap();

    db.set(2, b"bb").unwrap();
    db.delete(&1).unwrap();
    db.flush().unwrap();

    assert_eq!(db.get(&1).unwrap(), None);
    assert_eq!(db.get(&2).unwrap(), Some(b"bb".to_vec()));
    assert_eq!(db.entry_count(), 1);
    assert_eq!(db.data_bytes(), 2);
    assert_eq!(db.data_file_size(), 3);
}

#[test]
fn scenario_compact_reclaims_space() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    db.set(1, b"a").unwrap();
    db.flush().unwrap();
    db.set(2, b"bb").unwrap();
    db.delete(&1).unwrap();
    db.flush().unwrap();

    db.compact().unwrap();

    assert_eq!(db.data_bytes(), 2);
    assert_eq!(db.data_file_size(), 2);
}

#[test]
fn scenario_ten_thousand_keys_survive_close_open() {
    let dir = tempfile::tempdir().unwrap();
    let values: Vec<Vec<u8>> = (0u32..10_000)
        .map(|i| vec![(i % 251) as u8; 1 + (i as usize * 37) % (20 * 1024)])
        .collect();

    {
        let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();
        for (i, v) in values.iter().enumerate() {
            db.set(i as u32, v).unwrap();
        }
        db.close().unwrap();
    }

    let db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();
    assert_eq!(db.entry_count(), 10_000);
    for (i, v) in values.iter().enumerate() {
        assert_eq!(db.get(&(i as u32)).unwrap().as_ref(), Some(v));
    }
}

#[test]
fn scenario_delete_overwrite_compact_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    for i in 0u32..10_000 {
        db.set(i, format!("value-{}", i).as_bytes()).unwrap();
    }
    db.flush().unwrap();

    // Delete the middle 20%.
    for i in 4_000u32..6_000 {
        db.delete(&i).unwrap();
    }
    // Overwrite the last 20% with different bytes.
    for i in 8_000u32..10_000 {
        db.set(i, format!("rewritten-{}", i).as_bytes()).unwrap();
    }
    db.flush().unwrap();
    db.compact().unwrap();

    for i in 0u32..4_000 {
        assert_eq!(
            db.get(&i).unwrap(),
            Some(format!("value-{}", i).into_bytes())
        );
    }
    for i in 4_000u32..6_000 {
        assert_eq!(db.get(&i).unwrap(), None);
    }
    for i in 6_000u32..8_000 {
        assert_eq!(
            db.get(&i).unwrap(),
            Some(format!("value-{}", i).into_bytes())
        );
    }
    for i in 8_000u32..10_000 {
        assert_eq!(
            db.get(&i).unwrap(),
            Some(format!("rewritten-{}", i).into_bytes())
        );
    }
}
