//! Small timestamp helpers shared by the job and task stores.

use chrono::{DateTime, Utc};

/// Current wall-clock time, as a single seam so tests can see where
/// "now" is read without reaching for a full clock-injection abstraction.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds between two timestamps, clamped to zero (never negative,
/// even if the clock moved backwards between reads).
pub fn duration_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}
