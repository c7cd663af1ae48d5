//! The Cabinet storage engine: one database directory holding a data log,
//! an index log, and a meta file, reconstructed into an in-memory index on
//! open and written through a pending buffer that is folded into durable
//! files on flush.
//!
//! The engine is **not internally synchronized**; callers (the registry in
//! [`crate::registry`]) must hold the per-database lock in the mode
//! appropriate to the operation.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::block::BlockInfo;
use crate::key::KeyCodec;
use crate::meta::Meta;
use crate::{CabinetError, Result};

/// Capacity of the pending value buffer, in bytes.
pub const BUF_CAPACITY: usize = 4 * 1024 * 1024;

/// A single open database, statically typed over its key variant.
pub struct Cabinet<K: KeyCodec> {
    dir: PathBuf,
    data: File,
    data_file_length: u64,
    actual_bytes: u64,

    orig: HashMap<K, BlockInfo>,
    ins: HashMap<K, BlockInfo>,
    del: HashSet<K>,

    buf: Box<[u8; BUF_CAPACITY]>,
    buf_pos: usize,
}

impl<K: KeyCodec> Cabinet<K> {
    /// Opens (creating if necessary) the database at `dir`, replaying its
    /// index log to rebuild the authoritative in-memory index.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = normalize(dir.as_ref());
        fs::create_dir_all(&dir).map_err(|e| CabinetError::open(&dir, e))?;

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(dir.join("data"))
            .map_err(|e| CabinetError::open(dir.join("data"), e))?;
        let data_file_length = data
            .metadata()
            .map_err(|e| CabinetError::stat(dir.join("data"), e))?
            .len();

        let index_path = dir.join("index");
        if !index_path.exists() {
            OpenOptions::new()
                .write(true)
                .create(true)
                .open(&index_path)
                .map_err(|e| CabinetError::open(&index_path, e))?;
        }

        let mut orig = HashMap::new();
        let mut actual_bytes = 0u64;
        replay_index::<K>(&index_path, &mut orig, &mut actual_bytes)?;

        Ok(Cabinet {
            dir,
            data,
            data_file_length,
            actual_bytes,
            orig,
            ins: HashMap::new(),
            del: HashSet::new(),
            buf: vec![0u8; BUF_CAPACITY].into_boxed_slice().try_into().unwrap(),
            buf_pos: 0,
        })
    }

    /// Creates a fresh database directory, writing its meta file, then
    /// opens it. Fails with [`CabinetError::DbExists`] if the directory
    /// already contains a meta file.
    pub fn create(dir: impl AsRef<Path>, meta: Meta) -> Result<Self> {
        let dir = normalize(dir.as_ref());
        if dir.join("meta").exists() {
            return Err(CabinetError::DbExists(
                dir.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            ));
        }
        fs::create_dir_all(&dir).map_err(|e| CabinetError::open(&dir, e))?;
        meta.write(&dir)?;
        Self::open(dir)
    }

    /// Number of live keys currently visible: `|orig| + |ins| - |del|`.
    pub fn entry_count(&self) -> usize {
        self.orig.len() + self.ins.len() - self.del.len()
    }

    /// Byte length of the data log.
    pub fn data_file_size(&self) -> u64 {
        self.data_file_length
    }

    /// Sum of value sizes of all live keys.
    pub fn data_bytes(&self) -> u64 {
        self.actual_bytes
    }

    /// Writes `value` under `key`, buffering in memory until the next flush
    /// (explicit, threshold-triggered, or forced by an oversize value).
    pub fn set(&mut self, key: K, value: &[u8]) -> Result<()> {
        self.delete(&key)?;

        let n = value.len();

        if self.buf_pos + n > BUF_CAPACITY {
            self.flush()?;
        }

        if n > BUF_CAPACITY {
            // Oversize path: write straight to the data log tail.
            let position = self.data_file_length;
            self.data
                .write_all_at(value, position)
                .map_err(|e| CabinetError::write(&self.dir, e))?;
            self.data_file_length += n as u64;
            self.del.remove(&key);
            self.ins.insert(
                key,
                BlockInfo {
                    position,
                    size: n as u32,
                },
            );
            self.actual_bytes += n as u64;
            self.flush()?;
        } else {
            self.buf[self.buf_pos..self.buf_pos + n].copy_from_slice(value);
            self.ins.insert(
                key.clone(),
                BlockInfo {
                    position: self.data_file_length + self.buf_pos as u64,
                    size: n as u32,
                },
            );
            self.buf_pos += n;
            self.del.remove(&key);
            self.actual_bytes += n as u64;
        }

        Ok(())
    }

    /// Looks up `key`, returning its value bytes if present.
    pub fn get(&self, key: &K) -> Result<Option<Vec<u8>>> {
        if let Some(b) = self.ins.get(key) {
            return self.read_block(*b).map(Some);
        }
        if self.del.contains(key) {
            return Ok(None);
        }
        if let Some(b) = self.orig.get(key) {
            return self.read_block(*b).map(Some);
        }
        Ok(None)
    }

    fn read_block(&self, b: BlockInfo) -> Result<Vec<u8>> {
        if b.size == 0 {
            return Ok(Vec::new());
        }
        let mut out = vec![0u8; b.size as usize];
        if b.position < self.data_file_length {
            self.data
                .read_exact_at(&mut out, b.position)
                .map_err(|e| CabinetError::read(&self.dir, e))?;
        } else {
            let start = (b.position - self.data_file_length) as usize;
            out.copy_from_slice(&self.buf[start..start + b.size as usize]);
        }
        Ok(out)
    }

    /// Marks `key` for deletion on the next flush. A no-op if the key is
    /// already absent or already pending deletion.
    pub fn delete(&mut self, key: &K) -> Result<()> {
        if let Some(b) = self.ins.remove(key) {
            self.del.insert(key.clone());
            self.actual_bytes -= b.size as u64;
        } else if self.del.contains(key) {
            // already pending deletion
        } else if let Some(b) = self.orig.remove(key) {
            self.del.insert(key.clone());
            self.actual_bytes -= b.size as u64;
        }
        Ok(())
    }

    /// Persists pending inserts/deletes to the index log and data log,
    /// folding them into the authoritative index. A no-op if nothing is
    /// pending.
    pub fn flush(&mut self) -> Result<()> {
        if self.buf_pos == 0 && self.ins.is_empty() && self.del.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir).map_err(|e| CabinetError::open(&self.dir, e))?;

        let mut data_sync_pending = false;
        if self.buf_pos > 0 {
            self.data
                .write_all_at(&self.buf[..self.buf_pos], self.data_file_length)
                .map_err(|e| CabinetError::write(&self.dir, e))?;
            self.data_file_length += self.buf_pos as u64;
            self.buf_pos = 0;
            data_sync_pending = true;
        }

        let index_path = self.dir.join("index");
        let mut index_file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&index_path)
            .map_err(|e| CabinetError::open(&index_path, e))?;

        let mut record = Vec::new();
        for (k, b) in &self.ins {
            record.clear();
            k.encode(&mut record);
            b.encode(&mut record);
            index_file
                .write_all(&record)
                .map_err(|e| CabinetError::write(&index_path, e))?;
        }
        for (k, b) in self.ins.drain() {
            self.orig.insert(k, b);
        }

        for k in &self.del {
            record.clear();
            k.encode(&mut record);
            BlockInfo::TOMBSTONE.encode(&mut record);
            index_file
                .write_all(&record)
                .map_err(|e| CabinetError::write(&index_path, e))?;
        }
        for k in self.del.drain() {
            self.orig.remove(&k);
        }

        index_file
            .sync_all()
            .map_err(|e| CabinetError::write(&index_path, e))?;
        drop(index_file);

        if data_sync_pending {
            self.data
                .sync_all()
                .map_err(|e| CabinetError::write(&self.dir, e))?;
        }

        debug!(
            "flushed {:?}: entries={}, data_file_size={}",
            self.dir,
            self.orig.len(),
            self.data_file_length
        );

        Ok(())
    }

    /// Rewrites both logs to contain only live values, reclaiming dead
    /// space. Not safe against concurrent writers on the same database;
    /// the caller must hold the per-database lock exclusively.
    pub fn compact(&mut self) -> Result<()> {
        self.flush()?;

        let pid = std::process::id();
        let tmp_index_path = self.dir.join(format!("tmp-index.{}", pid));
        let tmp_data_path = self.dir.join(format!("tmp-data.{}", pid));

        let mut tmp_index = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_index_path)
            .map_err(|e| CabinetError::open(&tmp_index_path, e))?;
        let tmp_data = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_data_path)
            .map_err(|e| CabinetError::open(&tmp_data_path, e))?;

        let mut new_orig = HashMap::with_capacity(self.orig.len());
        let mut running_offset = 0u64;
        let mut record = Vec::new();

        for (k, b) in &self.orig {
            let value = self.read_block(*b)?;
            tmp_data
                .write_all_at(&value, running_offset)
                .map_err(|e| CabinetError::write(&tmp_data_path, e))?;

            let new_block = BlockInfo {
                position: running_offset,
                size: b.size,
            };
            record.clear();
            k.encode(&mut record);
            new_block.encode(&mut record);
            tmp_index
                .write_all(&record)
                .map_err(|e| CabinetError::write(&tmp_index_path, e))?;

            new_orig.insert(k.clone(), new_block);
            running_offset += b.size as u64;
        }

        tmp_index
            .sync_all()
            .map_err(|e| CabinetError::write(&tmp_index_path, e))?;
        tmp_data
            .sync_all()
            .map_err(|e| CabinetError::write(&tmp_data_path, e))?;
        drop(tmp_index);
        drop(tmp_data);

        // Close the current data log descriptor by replacing it with a
        // placeholder before the rename, then reopen from the new file.
        let index_path = self.dir.join("index");
        let data_path = self.dir.join("data");
        fs::rename(&tmp_index_path, &index_path)
            .map_err(|e| CabinetError::write(&index_path, e))?;
        fs::rename(&tmp_data_path, &data_path).map_err(|e| CabinetError::write(&data_path, e))?;

        self.data = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&data_path)
            .map_err(|e| CabinetError::open(&data_path, e))?;

        info!(
            "compacted {:?}: entries={}, data_file_size={}",
            self.dir,
            new_orig.len(),
            running_offset
        );

        self.orig = new_orig;
        self.data_file_length = running_offset;
        self.actual_bytes = running_offset;

        Ok(())
    }

    /// Flushes pending state, then truncates both logs to zero length and
    /// reopens them, discarding all entries while retaining the directory
    /// and meta file.
    pub fn wipe(&mut self) -> Result<()> {
        self.close()?;

        let data_path = self.dir.join("data");
        let index_path = self.dir.join("index");

        let data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&data_path)
            .map_err(|e| CabinetError::truncate(&data_path, e))?;
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&index_path)
            .map_err(|e| CabinetError::truncate(&index_path, e))?;

        self.data = data;
        self.data_file_length = 0;
        self.actual_bytes = 0;
        self.orig.clear();
        self.ins.clear();
        self.del.clear();
        self.buf_pos = 0;

        Ok(())
    }

    /// Flushes pending state and closes the database. `orig`/counters are
    /// cleared; reopening with [`Cabinet::open`] replays the index log.
    pub fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.orig.clear();
        self.ins.clear();
        self.del.clear();
        self.buf_pos = 0;
        self.data_file_length = self
            .data
            .metadata()
            .map_err(|e| CabinetError::stat(&self.dir, e))?
            .len();
        self.actual_bytes = 0;
        Ok(())
    }
}

/// Normalizes a database directory path before use.
fn normalize(path: &Path) -> PathBuf {
    path.to_path_buf()
}

fn replay_index<K: KeyCodec>(
    index_path: &Path,
    orig: &mut HashMap<K, BlockInfo>,
    actual_bytes: &mut u64,
) -> Result<()> {
    let file = File::open(index_path).map_err(|e| CabinetError::open(index_path, e))?;
    let mut reader = BufReader::new(file);

    loop {
        let key = match K::decode(&mut reader) {
            Ok(Some(k)) => k,
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(CabinetError::read(index_path, e)),
        };
        let block = match BlockInfo::decode(&mut reader) {
            Ok(Some(b)) => b,
            Ok(None) => break,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(CabinetError::read(index_path, e)),
        };

        if block.is_tombstone() {
            if let Some(old) = orig.remove(&key) {
                *actual_bytes -= old.size as u64;
            }
        } else {
            match orig.insert(key, block) {
                Some(old) => *actual_bytes = *actual_bytes - old.size as u64 + block.size as u64,
                None => *actual_bytes += block.size as u64,
            }
        }
    }

    Ok(())
}
