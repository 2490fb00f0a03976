//! Virtual Time
//!
//! Absolute simulation time as integer nanoseconds since simulation start.
//! Integer representation keeps event ordering and chunk boundaries exact
//! and bit-for-bit reproducible across runs.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

/// An instant on the virtual timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimTime(u64);

impl SimTime {
    /// Simulation start
    pub const ZERO: SimTime = SimTime(0);

    /// Build from whole nanoseconds
    pub fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Build from seconds, rounded to the nearest nanosecond
    pub fn from_secs_f64(secs: f64) -> Self {
        Self(Duration::from_secs_f64(secs).as_nanos() as u64)
    }

    /// Whole nanoseconds since simulation start
    pub fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Seconds since simulation start
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> SimTime {
        SimTime(self.0 + rhs.as_nanos() as u64)
    }
}

impl AddAssign<Duration> for SimTime {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.as_nanos() as u64;
    }
}

impl Sub for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Duration {
        Duration::from_nanos(self.0 - rhs.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9}s", self.as_secs_f64())
    }
}
