//! LTE Power Spectral Density Builders
//!
//! Helpers that turn cell configuration into spectrum-domain quantities:
//! the downlink spectrum model (one 180 kHz band per resource block), the
//! receiver noise floor, and the transmit PSD for a resource-block
//! allocation. Logarithmic units are converted to linear here; everything
//! downstream is linear W/Hz.

use super::spectrum::{Band, SpectrumModel, SpectrumValue};
use common::types::{Bandwidth, RB_BANDWIDTH_HZ};
use common::units::{dbm_to_watts, noise_psd_w_per_hz};
use std::rc::Rc;
use tracing::debug;

/// Build the downlink spectrum model for a carrier.
///
/// Bands are laid out contiguously around the carrier center frequency,
/// one per resource block.
pub fn downlink_spectrum_model(carrier_hz: f64, bandwidth: Bandwidth) -> Rc<SpectrumModel> {
    let num_rbs = bandwidth.num_rbs() as usize;
    let lowest = carrier_hz - (num_rbs as f64 / 2.0) * RB_BANDWIDTH_HZ;

    let bands = (0..num_rbs)
        .map(|rb| {
            let low_hz = lowest + rb as f64 * RB_BANDWIDTH_HZ;
            Band {
                low_hz,
                center_hz: low_hz + RB_BANDWIDTH_HZ / 2.0,
                high_hz: low_hz + RB_BANDWIDTH_HZ,
            }
        })
        .collect();

    debug!("Downlink spectrum model: {} RBs around {} Hz", num_rbs, carrier_hz);
    SpectrumModel::new(bands)
}

/// Thermal noise PSD over a model, flat in W/Hz, from the receiver noise
/// figure in dB.
pub fn noise_power_spectral_density(
    model: &Rc<SpectrumModel>,
    noise_figure_db: f64,
) -> SpectrumValue {
    SpectrumValue::constant(model, noise_psd_w_per_hz(noise_figure_db))
}

/// Transmit PSD for a resource-block allocation.
///
/// Total transmit power (dBm, converted to Watts) is split evenly across
/// the allocated resource blocks; each allocated band carries the resulting
/// power density in W/Hz and every other band is exactly zero.
pub fn tx_power_spectral_density(
    model: &Rc<SpectrumModel>,
    tx_power_dbm: f64,
    allocated_rbs: &[u16],
) -> SpectrumValue {
    let mut psd = SpectrumValue::zeros(model);
    if allocated_rbs.is_empty() {
        return psd;
    }

    let power_w = dbm_to_watts(tx_power_dbm);
    let density = power_w / (allocated_rbs.len() as f64 * RB_BANDWIDTH_HZ);
    for &rb in allocated_rbs {
        let band = rb as usize;
        assert!(
            band < model.num_bands(),
            "allocated RB {} outside spectrum model with {} bands",
            rb,
            model.num_bands()
        );
        psd[band] = density;
    }
    psd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downlink_model_layout() {
        let model = downlink_spectrum_model(2.12e9, Bandwidth::Bw1_4);
        assert_eq!(model.num_bands(), 6);

        let bands = model.bands();
        // Contiguous, centered on the carrier
        assert!((bands[0].high_hz - bands[1].low_hz).abs() < 1e-6);
        let mid = (bands[0].low_hz + bands[5].high_hz) / 2.0;
        assert!((mid - 2.12e9).abs() < 1e-3);
        assert!((bands[0].width_hz() - RB_BANDWIDTH_HZ).abs() < 1e-9);
    }

    #[test]
    fn test_noise_psd_is_flat() {
        let model = downlink_spectrum_model(2.12e9, Bandwidth::Bw3);
        let noise = noise_power_spectral_density(&model, 9.0);
        assert_eq!(noise.len(), 15);
        assert!(noise.values().iter().all(|&v| v == noise[0]));
        assert!(noise[0] > 3e-20 && noise[0] < 4e-20);
    }

    #[test]
    fn test_tx_psd_conserves_power() {
        let model = downlink_spectrum_model(2.12e9, Bandwidth::Bw5);
        let psd = tx_power_spectral_density(&model, 30.0, &[0, 1, 2, 3]);

        // 30 dBm = 1 W split over 4 RBs of 180 kHz
        let per_band = 1.0 / (4.0 * RB_BANDWIDTH_HZ);
        assert!((psd[0] - per_band).abs() < 1e-12);
        assert_eq!(psd[4], 0.0);

        let total_w: f64 = psd.values().iter().map(|v| v * RB_BANDWIDTH_HZ).sum();
        assert!((total_w - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_allocation_is_silent() {
        let model = downlink_spectrum_model(2.12e9, Bandwidth::Bw1_4);
        let psd = tx_power_spectral_density(&model, 43.0, &[]);
        assert!(psd.values().iter().all(|&v| v == 0.0));
    }
}
