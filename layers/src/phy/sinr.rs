//! SINR Chunk Processing
//!
//! Chunk consumers implement [`SinrChunkProcessor`]; a receiver may attach
//! any number of them (CQI-oriented, trace-oriented, ...) to its
//! interference tracker and they all see every chunk.

use super::spectrum::SpectrumValue;
use std::time::Duration;

/// Consumer of SINR chunks produced during one reception of interest
pub trait SinrChunkProcessor {
    /// Fold in one chunk: a per-band SINR that held for `duration`
    fn accept(&mut self, sinr: &SpectrumValue, duration: Duration);

    /// Close the current reception: return the duration-weighted average
    /// SINR and reset the accumulator for the next reception. `None` when
    /// no weight was accumulated (all chunks had zero duration, or none
    /// arrived).
    fn finalize(&mut self) -> Option<SpectrumValue>;
}

/// Time-weighted mean of all chunks of a reception:
/// Σ(sinr_i · duration_i) / Σ duration_i, per band.
#[derive(Default)]
pub struct AverageSinrProcessor {
    weighted_sum: Option<SpectrumValue>,
    total_secs: f64,
}

impl AverageSinrProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SinrChunkProcessor for AverageSinrProcessor {
    fn accept(&mut self, sinr: &SpectrumValue, duration: Duration) {
        let weight = duration.as_secs_f64();
        let weighted = sinr * weight;
        match &mut self.weighted_sum {
            Some(sum) => *sum += &weighted,
            None => self.weighted_sum = Some(weighted),
        }
        self.total_secs += weight;
    }

    fn finalize(&mut self) -> Option<SpectrumValue> {
        let sum = self.weighted_sum.take()?;
        let total = std::mem::take(&mut self.total_secs);
        if total > 0.0 {
            Some(&sum / total)
        } else {
            None
        }
    }
}
