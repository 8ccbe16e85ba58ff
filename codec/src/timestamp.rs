//! Wall-clock instants as seconds and nanoseconds since the Unix epoch.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds in one second.
pub(crate) const NANOS_PER_SEC: u32 = 1_000_000_000;

/// An instant in time: whole seconds since the Unix epoch plus a forward
/// fraction in nanoseconds.
///
/// Seconds may be negative for instants before the epoch; the fraction
/// always counts forward, so `nanos` stays below one billion and the derived
/// `(secs, nanos)` ordering is chronological.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    /// The Unix epoch itself, the type's default.
    pub const EPOCH: Self = Self { secs: 0, nanos: 0 };

    /// Builds an instant from seconds and nanoseconds, carrying surplus
    /// nanoseconds into the seconds.
    ///
    /// Panics if the carried seconds overflow `i64`.
    pub fn new(secs: i64, nanos: u32) -> Self {
        let carry = (nanos / NANOS_PER_SEC) as i64;
        Self {
            secs: secs.checked_add(carry).expect("timestamp seconds overflow"),
            nanos: nanos % NANOS_PER_SEC,
        }
    }

    /// Whole seconds since the epoch.
    pub const fn secs(&self) -> i64 {
        self.secs
    }

    /// Forward fraction of a second in nanoseconds, below one billion.
    pub const fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    /// Constructor for decoded parts already validated to be in range.
    pub(crate) const fn from_parts(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    /// True when the compact eight-byte wire form holds this instant.
    pub(crate) const fn compact_wire(&self) -> bool {
        self.secs >= 0 && self.secs <= u32::MAX as i64
    }
}

impl From<SystemTime> for Timestamp {
    /// Converts a system time, saturating at the representable range.
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self {
                secs: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
                nanos: d.subsec_nanos(),
            },
            Err(e) => {
                // Before the epoch: the backward distance re-expressed with
                // a forward-counting fraction.
                let d = e.duration();
                let mut secs = -i64::try_from(d.as_secs()).unwrap_or(i64::MAX);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = NANOS_PER_SEC - nanos;
                }
                Self { secs, nanos }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_carries_surplus_nanos() {
        let ts = Timestamp::new(5, 2_500_000_000);
        assert_eq!(ts.secs(), 7);
        assert_eq!(ts.subsec_nanos(), 500_000_000);
    }

    #[test]
    fn test_ordering_across_epoch() {
        let before = Timestamp::new(-1, 999_999_999);
        let after = Timestamp::new(0, 1);
        assert!(before < Timestamp::EPOCH);
        assert!(Timestamp::EPOCH < after);
    }

    #[test]
    fn test_from_system_time() {
        let t = UNIX_EPOCH + Duration::new(12, 34);
        assert_eq!(Timestamp::from(t), Timestamp::new(12, 34));

        let t = UNIX_EPOCH - Duration::new(3, 500_000_000);
        assert_eq!(Timestamp::from(t), Timestamp::new(-4, 500_000_000));
    }
}
