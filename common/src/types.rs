//! Common Types for the LTE eNodeB simulation
//!
//! Defines fundamental identifiers and radio parameters used throughout the
//! PHY model.

use serde::{Deserialize, Serialize};
use num_derive::{FromPrimitive, ToPrimitive};

/// Radio Network Temporary Identifier (RNTI)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rnti(pub u16);

impl Rnti {
    /// Create a new RNTI
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the RNTI value
    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Cell Identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub u16);

/// Identifier of a transmission source as seen on the channel.
///
/// Every signal carries the identity of its originating cell; a receiver
/// compares it against its serving source to tell the signal of interest
/// apart from interference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u16);

impl From<CellId> for SourceId {
    fn from(cell: CellId) -> Self {
        Self(cell.0)
    }
}

/// LTE channel bandwidth classes.
///
/// The discriminant is the number of downlink resource blocks, which is also
/// the number of frequency bands in the spectrum model (one band per RB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive, Serialize, Deserialize)]
pub enum Bandwidth {
    /// 1.4 MHz
    Bw1_4 = 6,
    /// 3 MHz
    Bw3 = 15,
    /// 5 MHz
    Bw5 = 25,
    /// 10 MHz
    Bw10 = 50,
    /// 15 MHz
    Bw15 = 75,
    /// 20 MHz
    Bw20 = 100,
}

impl Bandwidth {
    /// Number of downlink resource blocks
    pub fn num_rbs(&self) -> u16 {
        *self as u16
    }

    /// Occupied bandwidth in Hz (resource blocks only, guard bands excluded)
    pub fn occupied_hz(&self) -> f64 {
        f64::from(self.num_rbs()) * RB_BANDWIDTH_HZ
    }
}

/// Bandwidth of one resource block in Hz (12 subcarriers at 15 kHz)
pub const RB_BANDWIDTH_HZ: f64 = 180_000.0;
