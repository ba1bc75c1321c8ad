use crate::{Error, Result, SnowflakeId};

/// The immutable identity of one generator instance.
///
/// The epoch is generator-local: it is part of the identity, fixed for the
/// lifetime of a (datacenter, worker) pair. Changing the epoch after
/// identifiers have been issued for that pair re-opens already-used
/// (timestamp, sequence) space and breaks the uniqueness guarantee, which is
/// why the fields are private and there are no setters. A fleet that wants
/// fleet-wide relative ordering should configure the same epoch everywhere.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorIdentity {
    epoch_ms: u64,
    datacenter_id: u64,
    worker_id: u64,
}

impl GeneratorIdentity {
    /// Validates and builds a generator identity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatacenterIdOutOfRange`] or
    /// [`Error::WorkerIdOutOfRange`] if either ID exceeds its 5-bit field.
    ///
    /// # Example
    ///
    /// ```
    /// use frostid::{DEFAULT_EPOCH_MS, GeneratorIdentity};
    ///
    /// let identity = GeneratorIdentity::new(DEFAULT_EPOCH_MS, 1, 2)?;
    /// assert_eq!(identity.datacenter_id(), 1);
    /// assert_eq!(identity.worker_id(), 2);
    /// # Ok::<(), frostid::Error>(())
    /// ```
    pub fn new(epoch_ms: u64, datacenter_id: u64, worker_id: u64) -> Result<Self> {
        if datacenter_id > SnowflakeId::max_datacenter_id() {
            return Err(Error::DatacenterIdOutOfRange(datacenter_id));
        }
        if worker_id > SnowflakeId::max_worker_id() {
            return Err(Error::WorkerIdOutOfRange(worker_id));
        }
        Ok(Self {
            epoch_ms,
            datacenter_id,
            worker_id,
        })
    }

    /// The reference zero-point for the 41-bit timestamp field, in
    /// milliseconds since the Unix epoch.
    pub const fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    /// The operator-assigned datacenter partition (0..=31).
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    /// The operator-assigned worker partition within the datacenter (0..=31).
    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }
}
