//! The meta file: a short text record naming a database's key type and
//! reserved compression flag, stored at `<root>/<name>/meta`.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::key::KeyType;
use crate::{CabinetError, Result};

/// Parsed contents of a database's meta file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meta {
    /// Which key variant this database was created with.
    pub key_type: KeyType,
    /// Reserved compression flag. Parsed and stored but never consulted
    /// by the storage engine; values are always written and read uncompressed.
    pub compressed: bool,
}

impl Meta {
    /// Creates a new meta record.
    pub fn new(key_type: KeyType, compressed: bool) -> Self {
        Meta {
            key_type,
            compressed,
        }
    }

    /// Reads and parses the meta file at `dir/meta`.
    pub fn read(dir: &Path) -> Result<Self> {
        let text = fs::read_to_string(dir.join("meta"))?;
        text.trim().parse()
    }

    /// Writes this meta record to `dir/meta`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::write(dir.join("meta"), self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {}",
            self.key_type,
            if self.compressed { 1 } else { 0 }
        )
    }
}

impl FromStr for Meta {
    type Err = CabinetError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let key_type = parts
            .next()
            .ok_or_else(|| CabinetError::FileCorrupt("empty meta file".into()))?
            .parse()?;
        let compressed = match parts.next() {
            Some("0") | None => false,
            Some("1") => true,
            Some(other) => {
                return Err(CabinetError::FileCorrupt(format!(
                    "invalid compress flag {:?} in meta file",
                    other
                )))
            }
        };
        Ok(Meta {
            key_type,
            compressed,
        })
    }
}
