//! TTL Module
//!
//! Normalizes the accepted TTL inputs and turns them into absolute expiry
//! instants.

use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::CacheError;

/// Lifetime of an entry stored without a TTL: one year.
pub const FOREVER_SECONDS: i64 = 31_536_000;

/// Latest expiry ever written (9999-12-31T23:59:59Z).
pub const MAX_EXPIRATION: i64 = 253_402_300_799;

// == Ttl ==
/// How long an entry should live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ttl {
    /// No expiry requested; stored for [`FOREVER_SECONDS`]
    #[default]
    Forever,
    /// Seconds from now; zero or negative deletes the entry
    Seconds(i64),
    /// A duration, truncated to whole seconds
    Duration(TimeDelta),
}

// == Expiration ==
/// Absolute outcome of applying a TTL at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// The entry must not be stored
    Expired,
    /// The entry expires at this UNIX timestamp
    At(i64),
}

impl Ttl {
    /// Whole seconds of the TTL, `None` for [`Ttl::Forever`].
    pub fn seconds(&self) -> Option<i64> {
        match self {
            Ttl::Forever => None,
            Ttl::Seconds(secs) => Some(*secs),
            Ttl::Duration(delta) => Some(delta.num_seconds()),
        }
    }

    /// Resolves the TTL against `now`.
    pub fn expiration(&self, now: i64) -> Expiration {
        match self.seconds() {
            None => Expiration::At(clamp(now.saturating_add(FOREVER_SECONDS))),
            Some(secs) if secs <= 0 => Expiration::Expired,
            Some(secs) => Expiration::At(clamp(now.saturating_add(secs))),
        }
    }
}

fn clamp(timestamp: i64) -> i64 {
    timestamp.min(MAX_EXPIRATION)
}

impl From<i64> for Ttl {
    fn from(secs: i64) -> Self {
        Ttl::Seconds(secs)
    }
}

impl From<i32> for Ttl {
    fn from(secs: i32) -> Self {
        Ttl::Seconds(i64::from(secs))
    }
}

impl From<u32> for Ttl {
    fn from(secs: u32) -> Self {
        Ttl::Seconds(i64::from(secs))
    }
}

impl From<u64> for Ttl {
    fn from(secs: u64) -> Self {
        Ttl::Seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Seconds(i64::try_from(duration.as_secs()).unwrap_or(i64::MAX))
    }
}

impl From<TimeDelta> for Ttl {
    fn from(delta: TimeDelta) -> Self {
        Ttl::Duration(delta)
    }
}

impl<T: Into<Ttl>> From<Option<T>> for Ttl {
    fn from(ttl: Option<T>) -> Self {
        ttl.map(Into::into).unwrap_or(Ttl::Forever)
    }
}

impl FromStr for Ttl {
    type Err = CacheError;

    /// Parses a signed integer count of seconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(Ttl::Seconds)
            .map_err(|_| CacheError::InvalidTtl(format!("\"{}\" is not a number of seconds", s)))
    }
}
