//! The service-layer registry: a process-wide map from database name to
//! engine, implementing a two-level locking protocol.
//!
//! The registry lock is held in shared mode for any operation naming an
//! existing database, exclusive for `Create`/`Drop`. The per-database
//! lock is held shared for reads (`Get`/`BatchGet`/`GetDbInfo`) and
//! exclusive for writes (`Set`/`Delete`/batch variants/`Flush`/`Compact`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::engine::Cabinet;
use crate::key::{KeyType, StringKey};
use crate::meta::Meta;
use crate::resp::{DbInfo, KeyArg};
use crate::{CabinetError, Result};

/// The key-variant axis, erased behind [`AnyCabinet`].
enum CabinetVariant {
    /// A database with `u32` keys.
    U32(Cabinet<u32>),
    /// A database with `u64` keys.
    U64(Cabinet<u64>),
    /// A database with byte-string keys.
    String(Cabinet<StringKey>),
}

/// Erases the key-variant axis so the registry can hold databases of
/// different key types behind one type, while still retaining the `Meta`
/// a database was opened or created with (the engine itself has no notion
/// of its own metadata).
pub struct AnyCabinet {
    variant: CabinetVariant,
    key_type: KeyType,
    compressed: bool,
}

impl AnyCabinet {
    fn open(dir: &Path, meta: Meta) -> Result<Self> {
        let variant = match meta.key_type {
            KeyType::I32 => CabinetVariant::U32(Cabinet::open(dir)?),
            KeyType::I64 => CabinetVariant::U64(Cabinet::open(dir)?),
            KeyType::String => CabinetVariant::String(Cabinet::open(dir)?),
        };
        Ok(AnyCabinet {
            variant,
            key_type: meta.key_type,
            compressed: meta.compressed,
        })
    }

    fn create(dir: &Path, meta: Meta) -> Result<Self> {
        let variant = match meta.key_type {
            KeyType::I32 => CabinetVariant::U32(Cabinet::create(dir, meta)?),
            KeyType::I64 => CabinetVariant::U64(Cabinet::create(dir, meta)?),
            KeyType::String => CabinetVariant::String(Cabinet::create(dir, meta)?),
        };
        Ok(AnyCabinet {
            variant,
            key_type: meta.key_type,
            compressed: meta.compressed,
        })
    }

    /// Current metadata + counters for this database.
    pub fn info(&self) -> DbInfo {
        let (entry_count, data_bytes, data_file_size) = match &self.variant {
            CabinetVariant::U32(c) => (c.entry_count(), c.data_bytes(), c.data_file_size()),
            CabinetVariant::U64(c) => (c.entry_count(), c.data_bytes(), c.data_file_size()),
            CabinetVariant::String(c) => (c.entry_count(), c.data_bytes(), c.data_file_size()),
        };
        DbInfo {
            key_type: self.key_type,
            compressed: self.compressed,
            entry_count,
            data_bytes,
            data_file_size,
        }
    }

    /// Gets a value, converting the wire key to this database's static
    /// key type. Returns [`CabinetError::BadDbName`] if `key`'s variant
    /// does not match the database's key type, reusing that variant
    /// since this, like a malformed name, is a request-shape error the
    /// service layer rejects before it reaches the engine.
    pub fn get(&self, key: &KeyArg) -> Result<Option<Vec<u8>>> {
        match (&self.variant, key) {
            (CabinetVariant::U32(c), KeyArg::U32(k)) => c.get(k),
            (CabinetVariant::U64(c), KeyArg::U64(k)) => c.get(k),
            (CabinetVariant::String(c), KeyArg::Bytes(k)) => c.get(&StringKey(k.clone())),
            _ => Err(key_type_mismatch()),
        }
    }

    /// Sets a value.
    pub fn set(&mut self, key: &KeyArg, value: &[u8]) -> Result<()> {
        match (&mut self.variant, key) {
            (CabinetVariant::U32(c), KeyArg::U32(k)) => c.set(*k, value),
            (CabinetVariant::U64(c), KeyArg::U64(k)) => c.set(*k, value),
            (CabinetVariant::String(c), KeyArg::Bytes(k)) => c.set(StringKey(k.clone()), value),
            _ => Err(key_type_mismatch()),
        }
    }

    /// Deletes a key.
    pub fn delete(&mut self, key: &KeyArg) -> Result<()> {
        match (&mut self.variant, key) {
            (CabinetVariant::U32(c), KeyArg::U32(k)) => c.delete(k),
            (CabinetVariant::U64(c), KeyArg::U64(k)) => c.delete(k),
            (CabinetVariant::String(c), KeyArg::Bytes(k)) => c.delete(&StringKey(k.clone())),
            _ => Err(key_type_mismatch()),
        }
    }

    /// Flushes pending state to disk.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.variant {
            CabinetVariant::U32(c) => c.flush(),
            CabinetVariant::U64(c) => c.flush(),
            CabinetVariant::String(c) => c.flush(),
        }
    }

    /// Compacts both logs.
    pub fn compact(&mut self) -> Result<()> {
        match &mut self.variant {
            CabinetVariant::U32(c) => c.compact(),
            CabinetVariant::U64(c) => c.compact(),
            CabinetVariant::String(c) => c.compact(),
        }
    }

    /// Clears all entries, keeping the directory and meta file.
    pub fn wipe(&mut self) -> Result<()> {
        match &mut self.variant {
            CabinetVariant::U32(c) => c.wipe(),
            CabinetVariant::U64(c) => c.wipe(),
            CabinetVariant::String(c) => c.wipe(),
        }
    }
}

fn key_type_mismatch() -> CabinetError {
    CabinetError::BadDbName("key variant does not match database's key type".into())
}

/// Validates a database name: non-empty, no path separator.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') {
        return Err(CabinetError::BadDbName(name.to_string()));
    }
    Ok(())
}

/// The process-wide registry of open databases.
pub struct Registry {
    root: PathBuf,
    databases: RwLock<HashMap<String, Arc<RwLock<AnyCabinet>>>>,
}

impl Registry {
    /// Opens every existing database directory under `root` (each one a
    /// subdirectory containing a `meta` file) and returns a registry ready
    /// to serve requests.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| CabinetError::open(&root, e))?;

        let mut databases = HashMap::new();
        for entry in std::fs::read_dir(&root).map_err(|e| CabinetError::open(&root, e))? {
            let entry = entry.map_err(|e| CabinetError::read(&root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let dir = entry.path();
            if !dir.join("meta").exists() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = Meta::read(&dir)?;
            let cabinet = AnyCabinet::open(&dir, meta)?;
            databases.insert(name, Arc::new(RwLock::new(cabinet)));
        }

        Ok(Registry {
            root,
            databases: RwLock::new(databases),
        })
    }

    fn dir_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Creates a new database. Holds the registry lock exclusively; no
    /// per-database lock exists yet.
    pub fn create(&self, name: &str, meta: Meta) -> Result<()> {
        validate_name(name)?;
        let mut databases = self.databases.write().unwrap();
        if databases.contains_key(name) {
            return Err(CabinetError::DbExists(name.to_string()));
        }
        let cabinet = AnyCabinet::create(&self.dir_for(name), meta)?;
        databases.insert(name.to_string(), Arc::new(RwLock::new(cabinet)));
        Ok(())
    }

    /// Drops (clears) a database's contents. Holds the registry lock in
    /// shared mode; `Drop` needs no per-database lock since it replaces
    /// the whole engine instance atomically.
    pub fn drop_db(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        let databases = self.databases.read().unwrap();
        let handle = databases
            .get(name)
            .ok_or_else(|| CabinetError::DbNotExist(name.to_string()))?
            .clone();
        drop(databases);
        let result = handle.write().unwrap().wipe();
        result
    }

    /// Runs `f` against a database's engine with the per-database lock
    /// held shared, after taking the registry lock shared.
    pub fn with_shared<R>(&self, name: &str, f: impl FnOnce(&AnyCabinet) -> Result<R>) -> Result<R> {
        validate_name(name)?;
        let databases = self.databases.read().unwrap();
        let handle = databases
            .get(name)
            .ok_or_else(|| CabinetError::DbNotExist(name.to_string()))?
            .clone();
        drop(databases);
        let guard = handle.read().unwrap();
        f(&guard)
    }

    /// Runs `f` against a database's engine with the per-database lock
    /// held exclusively, after taking the registry lock shared.
    pub fn with_exclusive<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut AnyCabinet) -> Result<R>,
    ) -> Result<R> {
        validate_name(name)?;
        let databases = self.databases.read().unwrap();
        let handle = databases
            .get(name)
            .ok_or_else(|| CabinetError::DbNotExist(name.to_string()))?
            .clone();
        drop(databases);
        let mut guard = handle.write().unwrap();
        f(&mut guard)
    }

    /// Metadata + counters for every open database, for `GetServerInfo`.
    pub fn server_info(&self) -> HashMap<String, DbInfo> {
        let databases = self.databases.read().unwrap();
        databases
            .iter()
            .map(|(name, handle)| (name.clone(), handle.read().unwrap().info()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_set_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        registry
            .create("db1", Meta::new(KeyType::I32, false))
            .unwrap();

        registry
            .with_exclusive("db1", |c| c.set(&KeyArg::U32(1), b"a"))
            .unwrap();

        let value = registry
            .with_shared("db1", |c| c.get(&KeyArg::U32(1)))
            .unwrap();
        assert_eq!(value, Some(b"a".to_vec()));
    }

    #[test]
    fn rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        assert!(registry
            .create("a/b", Meta::new(KeyType::I32, false))
            .is_err());
        assert!(registry
            .create("", Meta::new(KeyType::I32, false))
            .is_err());
    }

    #[test]
    fn duplicate_create_fails() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        registry
            .create("db1", Meta::new(KeyType::I32, false))
            .unwrap();
        assert!(registry
            .create("db1", Meta::new(KeyType::I32, false))
            .is_err());
    }

    #[test]
    fn unknown_database_is_not_exist() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        let err = registry.with_shared("nope", |c| c.get(&KeyArg::U32(1)));
        assert!(matches!(err, Err(CabinetError::DbNotExist(_))));
    }

    #[test]
    fn info_reports_compressed_flag() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::open(dir.path()).unwrap();
        registry
            .create("plain", Meta::new(KeyType::I32, false))
            .unwrap();
        registry
            .create("packed", Meta::new(KeyType::I32, true))
            .unwrap();

        let plain = registry.with_shared("plain", |c| Ok(c.info())).unwrap();
        let packed = registry.with_shared("packed", |c| Ok(c.info())).unwrap();
        assert!(!plain.compressed);
        assert!(packed.compressed);
    }

    #[test]
    fn reopen_recovers_existing_databases() {
        let dir = tempfile::tempdir().unwrap();
        {
            let registry = Registry::open(dir.path()).unwrap();
            registry
                .create("db1", Meta::new(KeyType::I64, false))
                .unwrap();
            registry
                .with_exclusive("db1", |c| c.set(&KeyArg::U64(7), b"seven"))
                .unwrap();
            registry.with_exclusive("db1", |c| c.flush()).unwrap();
        }

        let registry = Registry::open(dir.path()).unwrap();
        let value = registry
            .with_shared("db1", |c| c.get(&KeyArg::U64(7)))
            .unwrap();
        assert_eq!(value, Some(b"seven".to_vec()));
    }
}
