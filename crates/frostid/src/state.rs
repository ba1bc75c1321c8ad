use crate::{StateStore, StorageError};

/// A point-in-time copy of a generator's progress, suitable for persistence.
///
/// `last_timestamp_ms` is absolute wall-clock milliseconds since the Unix
/// epoch (zero means the generator has not issued anything yet), `sequence`
/// the counter within that millisecond. Snapshots are plain values: a store
/// or validator never observes a live reference into the generator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub last_timestamp_ms: u64,
    pub sequence: u16,
}

impl GenerationState {
    /// Version tag written as the first byte of every encoded snapshot,
    /// allowing the format to grow without breaking old snapshots.
    pub const SCHEMA_VERSION: u8 = 1;

    /// Encoded size: version byte, big-endian timestamp, big-endian sequence.
    pub const ENCODED_LEN: usize = 11;

    pub const fn new(last_timestamp_ms: u64, sequence: u16) -> Self {
        Self {
            last_timestamp_ms,
            sequence,
        }
    }

    /// Serializes the snapshot into the versioned fixed-width format.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut buf = [0u8; Self::ENCODED_LEN];
        buf[0] = Self::SCHEMA_VERSION;
        buf[1..9].copy_from_slice(&self.last_timestamp_ms.to_be_bytes());
        buf[9..11].copy_from_slice(&self.sequence.to_be_bytes());
        buf
    }

    /// Deserializes a snapshot previously produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Truncated`] for short buffers,
    /// [`StorageError::UnsupportedSchema`] for unknown versions and
    /// [`StorageError::Corrupt`] for values outside their field ranges.
    pub fn decode(bytes: &[u8]) -> Result<Self, StorageError> {
        let Some(&version) = bytes.first() else {
            return Err(StorageError::Truncated {
                expected: Self::ENCODED_LEN,
                actual: 0,
            });
        };
        if version != Self::SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchema {
                found: version,
                expected: Self::SCHEMA_VERSION,
            });
        }
        if bytes.len() < Self::ENCODED_LEN {
            return Err(StorageError::Truncated {
                expected: Self::ENCODED_LEN,
                actual: bytes.len(),
            });
        }
        if bytes.len() > Self::ENCODED_LEN {
            return Err(StorageError::Corrupt {
                reason: "trailing bytes after snapshot",
            });
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[1..9]);
        let mut seq = [0u8; 2];
        seq.copy_from_slice(&bytes[9..11]);

        let state = Self::new(u64::from_be_bytes(ts), u16::from_be_bytes(seq));
        if u64::from(state.sequence) > crate::SnowflakeId::max_sequence() {
            return Err(StorageError::Corrupt {
                reason: "sequence exceeds the 12-bit field",
            });
        }
        Ok(state)
    }

    /// Encodes and writes this snapshot through a [`StateStore`].
    ///
    /// Meant to be called opportunistically (periodic snapshot, graceful
    /// shutdown), never on the generation hot path.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure. Generation keeps working from memory.
    pub fn persist<S: StateStore + ?Sized>(&self, store: &S) -> Result<(), StorageError> {
        store.save(&self.encode())
    }

    /// Reads and decodes the snapshot held by a [`StateStore`], if any.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure or a decode failure.
    pub fn load_from<S: StateStore + ?Sized>(store: &S) -> Result<Option<Self>, StorageError> {
        match store.load()? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}
