//! Pure planning for one write-behind flush cycle.
//!
//! A cycle reads a length snapshot `N` of the pending list, decodes the
//! first `N` entries into a [`FlushBatch`] and, once the batch is committed,
//! trims exactly that prefix. Entries appended after the snapshot are never
//! part of the batch and survive the trim.

use crate::cache::{deserialize_user, SerializationError};
use crate::users::NewUser;

/// A queue entry that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    /// Position of the entry inside the batch snapshot.
    pub index: usize,
    pub error: SerializationError,
    /// The undecoded bytes, kept so they can be parked for inspection.
    pub payload: Vec<u8>,
}

/// The decoded prefix of the pending list taken by one flush cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushBatch {
    covered: u64,
    rows: Vec<NewUser>,
    malformed: Vec<MalformedEntry>,
}

impl FlushBatch {
    /// Decodes raw queue entries, preserving their order.
    ///
    /// Entries that fail to decode are reported in [`FlushBatch::malformed`]
    /// with their raw bytes and still count toward the covered prefix, so a
    /// single bad payload cannot pin the queue forever.
    pub fn from_entries(entries: &[Vec<u8>]) -> Self {
        let mut rows = Vec::with_capacity(entries.len());
        let mut malformed = Vec::new();

        for (index, bytes) in entries.iter().enumerate() {
            match deserialize_user(bytes) {
                Ok(user) => rows.push(user.to_new_user()),
                Err(error) => malformed.push(MalformedEntry {
                    index,
                    error,
                    payload: bytes.clone(),
                }),
            }
        }

        Self {
            covered: entries.len() as u64,
            rows,
            malformed,
        }
    }

    /// Number of queue entries this batch covers (decoded or not).
    pub fn covered(&self) -> u64 {
        self.covered
    }

    /// Rows to insert, in queue order.
    pub fn rows(&self) -> &[NewUser] {
        &self.rows
    }

    /// Entries that could not be decoded.
    pub fn malformed(&self) -> &[MalformedEntry] {
        &self.malformed
    }

    /// LTRIM bounds that drop exactly the covered prefix.
    pub fn trim_range(&self) -> (i64, i64) {
        (self.covered as i64, -1)
    }
}

/// LRANGE bounds that read the first `len` entries of the pending list.
pub fn snapshot_range(len: u64) -> (i64, i64) {
    (0, len as i64 - 1)
}
