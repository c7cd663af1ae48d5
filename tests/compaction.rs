//! Focused compaction behavior beyond the basic reclaim-space case already
//! covered in `tests/scenarios.rs`.

use cabinet::Cabinet;

#[test]
fn compact_on_a_database_with_no_dead_space_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    for i in 0u32..50 {
        db.set(i, format!("v{}", i).as_bytes()).unwrap();
    }
    db.flush().unwrap();

    let bytes_before = db.data_bytes();
    let size_before = db.data_file_size();
    let count_before = db.entry_count();

    db.compact().unwrap();

    assert_eq!(db.data_bytes(), bytes_before);
    assert_eq!(db.data_file_size(), size_before);
    assert_eq!(db.entry_count(), count_before);
    for i in 0u32..50 {
        assert_eq!(db.get(&i).unwrap(), Some(format!("v{}", i).into_bytes()));
    }
}

#[test]
fn compacting_away_every_key_leaves_an_empty_but_usable_database() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    for i in 0u32..20 {
        db.set(i, b"x").unwrap();
    }
    db.flush().unwrap();
    for i in 0u32..20 {
        db.delete(&i).unwrap();
    }
    db.flush().unwrap();
    db.compact().unwrap();

    assert_eq!(db.entry_count(), 0);
    assert_eq!(db.data_bytes(), 0);
    assert_eq!(db.data_file_size(), 0);

    db.set(100, b"fresh").unwrap();
    db.flush().unwrap();
    assert_eq!(db.get(&100).unwrap(), Some(b"fresh".to_vec()));
}

#[test]
fn compact_survives_close_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();
        for i in 0u32..500 {
            db.set(i, vec![7u8; 100].as_slice()).unwrap();
        }
        db.flush().unwrap();
        for i in (0u32..500).step_by(2) {
            db.delete(&i).unwrap();
        }
        db.flush().unwrap();
        db.compact().unwrap();
        db.close().unwrap();
    }

    let db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();
    assert_eq!(db.entry_count(), 250);
    for i in 0u32..500 {
        if i % 2 == 0 {
            assert_eq!(db.get(&i).unwrap(), None);
        } else {
            assert_eq!(db.get(&i).unwrap(), Some(vec![7u8; 100]));
        }
    }
}

#[test]
fn repeated_overwrites_then_compact_keeps_only_latest_value() {
    let dir = tempfile::tempdir().unwrap();
    let mut db: Cabinet<u32> = Cabinet::open(dir.path()).unwrap();

    for generation in 0..10 {
        db.set(1, format!("gen-{}", generation).as_bytes()).unwrap();
        db.flush().unwrap();
    }
    db.compact().unwrap();

    assert_eq!(db.get(&1).unwrap(), Some(b"gen-9".to_vec()));
    assert_eq!(db.entry_count(), 1);
    assert_eq!(db.data_bytes(), "gen-9".len() as u64);
}
