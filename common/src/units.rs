//! Power Unit Conversions
//!
//! All interfaces that accept power in logarithmic units (dB, dBm) convert
//! to linear scale here, once, at the boundary. Internal PSD and SINR
//! arithmetic is strictly linear.

use tracing::trace;

/// Boltzmann noise reference at 290 K, in dBm/Hz
pub const KT0_DBM_PER_HZ: f64 = -174.0;

/// Convert a ratio in dB to linear scale
pub fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 10.0)
}

/// Convert a linear ratio to dB
pub fn linear_to_db(linear: f64) -> f64 {
    10.0 * linear.log10()
}

/// Convert a power in dBm to Watts
pub fn dbm_to_watts(dbm: f64) -> f64 {
    10f64.powf((dbm - 30.0) / 10.0)
}

/// Convert a power in Watts to dBm
pub fn watts_to_dbm(watts: f64) -> f64 {
    10.0 * watts.log10() + 30.0
}

/// Thermal noise power spectral density in W/Hz for a receiver with the
/// given noise figure in dB.
pub fn noise_psd_w_per_hz(noise_figure_db: f64) -> f64 {
    let psd = dbm_to_watts(KT0_DBM_PER_HZ + noise_figure_db);
    trace!("Noise PSD for NF {} dB: {:e} W/Hz", noise_figure_db, psd);
    psd
}
