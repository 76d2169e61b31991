use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::cache::MessageState;

/// True iff `state.changed_at + max_age + lenience < now`.
///
/// Pure given its inputs. `lenience` is a grace margin for callers that must
/// not expire an entry the instant before it would be delivered; pruning
/// passes zero.
pub fn is_expired_at(
    state: &MessageState,
    max_age: Duration,
    lenience: Duration,
    now: DateTime<Utc>,
) -> bool {
    let threshold = state
        .changed_at
        .checked_add_signed(to_delta(max_age))
        .and_then(|t| t.checked_add_signed(to_delta(lenience)));
    match threshold {
        Some(t) => t < now,
        // Out of chrono's range: such an entry can never expire.
        None => false,
    }
}

/// Wall-clock convenience with zero lenience.
pub fn is_expired(state: &MessageState, max_age: Duration) -> bool {
    is_expired_at(state, max_age, Duration::ZERO, Utc::now())
}

fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
