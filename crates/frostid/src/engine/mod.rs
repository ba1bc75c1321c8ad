mod atomic;
mod basic;
mod interface;
mod lock;
mod mutex;
mod status;
#[cfg(test)]
mod tests;
mod wait;

pub use atomic::*;
pub use basic::*;
pub use interface::*;
pub use lock::*;
pub use status::*;
pub use wait::*;

use crate::{ClockSource, Error, GenerationState, GeneratorIdentity, Result, SnowflakeId, StorageError};

/// Rejects identities whose epoch the clock has not reached yet. Run once per
/// constructor so a generator with an uncomputable timestamp delta never
/// exists.
pub(crate) fn check_epoch(identity: &GeneratorIdentity, clock: &impl ClockSource) -> Result<()> {
    let now_ms = clock.now_millis();
    if identity.epoch_ms() > now_ms {
        return Err(Error::EpochAheadOfClock {
            epoch_ms: identity.epoch_ms(),
            now_ms,
        });
    }
    Ok(())
}

/// Reads the clock and converts it to a delta past the epoch, failing when
/// time ran backwards relative to the last issued delta. The packed state is
/// untouched by a failed read, so callers may retry once the clock catches
/// up.
pub(crate) fn observe_clock(
    identity: &GeneratorIdentity,
    clock: &impl ClockSource,
    last_delta: u64,
) -> Result<u64> {
    let now_ms = clock.now_millis();
    match now_ms.checked_sub(identity.epoch_ms()) {
        Some(delta) if delta >= last_delta => Ok(delta),
        _ => Err(cold_clock_regression(identity.epoch_ms() + last_delta, now_ms)),
    }
}

#[cold]
#[inline(never)]
fn cold_clock_regression(last_ms: u64, now_ms: u64) -> Error {
    Error::ClockRegression {
        drift_ms: last_ms - now_ms,
    }
}

/// Packs a persisted snapshot into the generator's state word. The word
/// carries the timestamp as a delta past the epoch; a snapshot taken before
/// the epoch cannot have come from this identity.
pub(crate) fn seed_word(
    identity: &GeneratorIdentity,
    state: &GenerationState,
) -> Result<SnowflakeId> {
    let delta = if state.last_timestamp_ms == 0 {
        0
    } else {
        state
            .last_timestamp_ms
            .checked_sub(identity.epoch_ms())
            .ok_or(StorageError::Corrupt {
                reason: "snapshot predates the configured epoch",
            })?
    };
    Ok(SnowflakeId::from_components(
        delta,
        identity.datacenter_id(),
        identity.worker_id(),
        u64::from(state.sequence),
    ))
}

/// Inverse of [`seed_word`]: converts the packed state word back into an
/// absolute-time snapshot. A generator that has not issued anything yet maps
/// to the zero state.
pub(crate) fn word_to_state(identity: &GeneratorIdentity, word: SnowflakeId) -> GenerationState {
    if word.timestamp() == 0 && word.sequence() == 0 {
        return GenerationState::default();
    }
    GenerationState::new(
        identity.epoch_ms() + word.timestamp(),
        word.sequence() as u16,
    )
}
