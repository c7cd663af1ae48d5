//! [`BlockInfo`]: the (position, size) pair locating a value in the data log.

use std::io::{self, Read};

/// Sentinel position marking a tombstone record.
pub const TOMBSTONE_POSITION: u64 = u64::MAX;
/// Sentinel size marking a tombstone record.
pub const TOMBSTONE_SIZE: u32 = u32::MAX;

/// Where a value lives in the data log, or a tombstone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Byte offset into the data log, or a pending-buffer offset past
    /// `data_file_length` (see `engine`'s pending-state invariant).
    pub position: u64,
    /// Size in bytes of the value.
    pub size: u32,
}

impl BlockInfo {
    /// The canonical tombstone value.
    pub const TOMBSTONE: BlockInfo = BlockInfo {
        position: TOMBSTONE_POSITION,
        size: TOMBSTONE_SIZE,
    };

    /// Whether this is a tombstone record.
    pub fn is_tombstone(&self) -> bool {
        self.position == TOMBSTONE_POSITION && self.size == TOMBSTONE_SIZE
    }

    /// Index-log wire layout: 4 LE bytes size, then 8 LE bytes position.
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.size.to_le_bytes());
        out.extend_from_slice(&self.position.to_le_bytes());
    }

    /// Parses one `BlockInfo`. Returns `Ok(None)` only on a clean EOF
    /// before any byte was consumed; a short read past that point is a
    /// torn record and is surfaced as `UnexpectedEof`, which the index
    /// replay in `engine` treats as "stop here, this is the expected tail
    /// of a crash mid-flush."
    pub fn decode(r: &mut impl Read) -> io::Result<Option<Self>> {
        let mut size_buf = [0u8; 4];
        let mut read = 0;
        while read < 4 {
            match r.read(&mut size_buf[read..]) {
                Ok(0) if read == 0 => return Ok(None),
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "torn BlockInfo size field",
                    ))
                }
                Ok(n) => read += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        let size = u32::from_le_bytes(size_buf);

        let mut pos_buf = [0u8; 8];
        r.read_exact(&mut pos_buf)?;
        let position = u64::from_le_bytes(pos_buf);

        Ok(Some(BlockInfo { position, size }))
    }
}
