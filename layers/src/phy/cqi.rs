//! CQI Feedback Generation
//!
//! Maps an averaged per-band linear SINR to quantized channel-quality
//! indices for the uplink feedback report. The mapping is a fixed,
//! monotonic, saturating threshold table; the same SINR vector always
//! yields the same report.

use super::spectrum::SpectrumValue;
use common::units::linear_to_db;
use serde::{Deserialize, Serialize};

/// Highest CQI index
pub const CQI_MAX: u8 = 15;

/// Reserved index for SINR below the usable range
pub const CQI_OUT_OF_RANGE: u8 = 0;

/// Minimum SINR in dB required for CQI index 1..=15.
///
/// Standard link-level mapping for a 10% BLER target; values below the
/// first entry report CQI 0, values above the last saturate at 15.
const CQI_SINR_THRESHOLDS_DB: [f64; CQI_MAX as usize] = [
    -6.7, -4.7, -2.3, 0.2, 2.4, 4.3, 5.9, 8.1, 10.3, 11.7, 14.1, 16.3, 18.7, 21.0, 22.7,
];

/// Uplink channel-quality feedback report, one index per band
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UlCqiReport {
    pub cqi: Vec<u8>,
}

/// Stateless SINR-to-CQI quantizer
pub struct CqiFeedbackGenerator;

impl CqiFeedbackGenerator {
    /// Quantize an averaged linear SINR vector into a CQI report
    pub fn generate(sinr: &SpectrumValue) -> UlCqiReport {
        let cqi = sinr
            .values()
            .iter()
            .map(|&linear| Self::quantize(linear))
            .collect();
        UlCqiReport { cqi }
    }

    /// Highest index whose threshold the SINR meets; saturating at both ends
    fn quantize(linear_sinr: f64) -> u8 {
        let sinr_db = linear_to_db(linear_sinr);
        CQI_SINR_THRESHOLDS_DB
            .iter()
            .take_while(|&&threshold| sinr_db >= threshold)
            .count() as u8
    }
}
