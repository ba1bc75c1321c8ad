use crate::StorageError;

/// Durable persistence hook for generator snapshots.
///
/// The concrete backend (file, KV store, database row) lives outside this
/// crate; only the byte-level contract is fixed here. `save` receives an
/// encoded [`GenerationState`] and `load` returns the most recently saved
/// bytes, if any. Neither is ever called on the generation hot path.
///
/// A snapshot loaded after a backwards clock step may carry a timestamp from
/// the future. Generators adopt it verbatim, so the very first generation
/// call reports the regression instead of silently reusing identifier space.
///
/// [`GenerationState`]: crate::GenerationState
pub trait StateStore {
    /// Persists an encoded snapshot, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend fails. Callers should
    /// surface this: generation keeps working, but crash recovery is degraded
    /// until a save succeeds again.
    fn save(&self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Returns the most recently saved snapshot bytes, or `None` if nothing
    /// was ever saved.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the backend fails.
    fn load(&self) -> Result<Option<Vec<u8>>, StorageError>;
}

impl<S: StateStore + ?Sized> StateStore for &S {
    fn save(&self, bytes: &[u8]) -> Result<(), StorageError> {
        (**self).save(bytes)
    }

    fn load(&self) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).load()
    }
}
