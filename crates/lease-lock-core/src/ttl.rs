//! Lease time-to-live values.

use std::time::Duration;

/// Remaining lifetime of a lease as observed by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseTtl {
    /// The lease expires after this duration. Zero means gone or not ours.
    Remaining(Duration),
    /// The lease is held without an expiry.
    Persistent,
}

impl LeaseTtl {
    pub const ZERO: Self = Self::Remaining(Duration::ZERO);

    pub fn is_zero(&self) -> bool {
        matches!(self, Self::Remaining(d) if d.is_zero())
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Persistent)
    }

    /// Returns the remaining duration, or `None` for a persistent lease.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            Self::Remaining(d) => Some(*d),
            Self::Persistent => None,
        }
    }
}

/// Longest TTL a lease may be given: 100 years. Longer values are rejected
/// with `InvalidTtl` before any store round trip.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Converts a lease TTL to whole milliseconds for stores with millisecond
/// expiry resolution.
///
/// Non-zero durations shorter than a millisecond round up to 1, so a positive
/// TTL never becomes "expire now".
pub fn expiry_millis(ttl: Duration) -> i64 {
    let millis = ttl.as_millis();
    if millis == 0 && !ttl.is_zero() {
        1
    } else {
        i64::try_from(millis).unwrap_or(i64::MAX)
    }
}
