//! Tick-encoded timestamps.
//!
//! A tick is 100 nanoseconds; tick zero is midnight, January 1st of year 1
//! (UTC). The `LastModified` metadata written by earlier releases of this
//! task uses the same encoding, so blobs uploaded before keep comparing
//! correctly.

use crate::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use time::OffsetDateTime;

const NANOS_PER_TICK: i128 = 100;
/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
/// Last tick of 9999-12-31.
const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// A UTC timestamp with 100ns resolution.
///
/// Ordering is chronological. Converting from a finer-grained timestamp
/// truncates towards the past, so a timestamp always compares equal to the
/// ticks written for it earlier.
///
/// ```
/// use blobsync_sync::Ticks;
///
/// let ticks: Ticks = "638355968000000000".parse().unwrap();
/// assert_eq!(ticks.to_datetime().unwrap().unix_timestamp(), 1_700_000_000);
/// assert!(Ticks::MIN < ticks);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticks(i64);
impl Ticks {
    /// The earliest representable timestamp; older than any real file.
    pub const MIN: Ticks = Ticks(0);
    pub const MAX: Ticks = Ticks(MAX_TICKS);

    pub fn new(ticks: i64) -> Option<Self> {
        (0..=MAX_TICKS).contains(&ticks).then_some(Self(ticks))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Convert a datetime, truncating to tick precision. Datetimes outside
    /// the representable range saturate.
    pub fn from_datetime(datetime: OffsetDateTime) -> Self {
        let ticks = datetime.unix_timestamp_nanos().div_euclid(NANOS_PER_TICK) + i128::from(UNIX_EPOCH_TICKS);
        Self(ticks.clamp(0, i128::from(MAX_TICKS)) as i64)
    }

    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        let nanos = i128::from(self.0 - UNIX_EPOCH_TICKS) * NANOS_PER_TICK;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}
impl From<SystemTime> for Ticks {
    fn from(time: SystemTime) -> Self {
        Self::from_datetime(OffsetDateTime::from(time))
    }
}
impl From<OffsetDateTime> for Ticks {
    fn from(datetime: OffsetDateTime) -> Self {
        Self::from_datetime(datetime)
    }
}
impl FromStr for Ticks {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::from(ErrorKind::InvalidTicks(s.to_string())))
    }
}
impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
