//! Interference Tracking and SINR Chunking
//!
//! The [`InterferenceTracker`] folds a stream of time-overlapping signal
//! arrivals into per-band SINR chunks. It maintains a running interference
//! sum (noise plus every active signal that is not the signal of interest);
//! whenever the active composition changes while a reception of interest is
//! in progress, the period since the previous change is closed as one chunk
//! and delivered to every registered [`SinrChunkProcessor`].
//!
//! All operations take the current virtual time explicitly and must be
//! invoked in nondecreasing time order, which the event scheduler
//! guarantees.

use super::sinr::SinrChunkProcessor;
use super::spectrum::{SpectrumModel, SpectrumValue};
use super::PhyError;
use bytes::Bytes;
use common::types::SourceId;
use sim::SimTime;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, trace};

/// One physical transmission event as seen by a receiver
#[derive(Debug, Clone)]
pub struct Signal {
    /// Originating source (cell) identity
    pub source: SourceId,
    /// Received power spectral density in W/Hz
    pub psd: SpectrumValue,
    /// Length of the reception window
    pub duration: Duration,
    /// Data-plane payload, delivered upward if this is the signal of
    /// interest and its reception completes
    pub pdu: Option<Bytes>,
}

/// The reception currently designated as "of interest"
struct ReceptionOfInterest {
    source: SourceId,
    psd: SpectrumValue,
    last_boundary: SimTime,
}

/// Mutable accumulator owned by one tracker.
///
/// Invariant: `running_sum == noise + Σ psd` over every entry of `active`,
/// maintained incrementally at signal-start and signal-end events.
struct InterferenceState {
    noise: SpectrumValue,
    active: HashMap<SourceId, SpectrumValue>,
    running_sum: SpectrumValue,
}

/// Per-receiver interference accumulation engine.
///
/// Exactly one tracker exists per receiving endpoint; its state is never
/// shared.
pub struct InterferenceTracker {
    state: InterferenceState,
    rx: Option<ReceptionOfInterest>,
    processors: Vec<Rc<RefCell<dyn SinrChunkProcessor>>>,
}

impl InterferenceTracker {
    /// Create a tracker with the ambient noise PSD
    pub fn new(noise: SpectrumValue) -> Self {
        Self {
            state: InterferenceState {
                running_sum: noise.clone(),
                active: HashMap::new(),
                noise,
            },
            rx: None,
            processors: Vec::new(),
        }
    }

    /// Model all PSDs handled by this tracker are defined over
    pub fn model(&self) -> &Rc<SpectrumModel> {
        self.state.noise.model()
    }

    /// Replace the ambient noise PSD; takes effect from the current instant
    pub fn set_noise_psd(&mut self, now: SimTime, noise: SpectrumValue) {
        self.close_chunk(now);
        self.state.running_sum -= &self.state.noise;
        self.state.running_sum += &noise;
        self.state.noise = noise;
    }

    /// Register a chunk consumer; every chunk goes to every processor
    pub fn add_sinr_processor(&mut self, processor: Rc<RefCell<dyn SinrChunkProcessor>>) {
        self.processors.push(processor);
    }

    /// True while a reception of interest is outstanding
    pub fn rx_in_progress(&self) -> bool {
        self.rx.is_some()
    }

    /// A new interfering signal starts at `now`
    pub fn add_signal(
        &mut self,
        now: SimTime,
        source: SourceId,
        psd: SpectrumValue,
    ) -> Result<(), PhyError> {
        if self.state.active.contains_key(&source) {
            return Err(PhyError::DuplicateSignal(source));
        }
        trace!("Signal from {:?} starts at {}", source, now);
        self.close_chunk(now);
        self.state.running_sum += &psd;
        self.state.active.insert(source, psd);
        Ok(())
    }

    /// The interfering signal from `source` ends at `now`
    pub fn remove_signal(&mut self, now: SimTime, source: SourceId) -> Result<(), PhyError> {
        let psd = self
            .state
            .active
            .remove(&source)
            .ok_or(PhyError::UnknownSignal(source))?;
        trace!("Signal from {:?} ends at {}", source, now);
        self.close_chunk(now);
        self.state.running_sum -= &psd;
        Ok(())
    }

    /// The signal of interest starts at `now`.
    ///
    /// Only one reception of interest may be outstanding; a second one is a
    /// caller contract violation and is reported, not silently adopted.
    pub fn start_rx(
        &mut self,
        now: SimTime,
        source: SourceId,
        psd: SpectrumValue,
    ) -> Result<(), PhyError> {
        if self.rx.is_some() {
            return Err(PhyError::OverlappingReception);
        }
        debug!("Reception of interest from {:?} starts at {}", source, now);
        self.rx = Some(ReceptionOfInterest {
            source,
            psd,
            last_boundary: now,
        });
        Ok(())
    }

    /// The signal of interest ends at `now`; the final chunk is closed and
    /// the source identity is returned so the receiver can report
    /// completion.
    pub fn end_rx(&mut self, now: SimTime) -> Result<SourceId, PhyError> {
        self.close_chunk(now);
        let rx = self.rx.take().ok_or(PhyError::NoActiveReception)?;
        debug!("Reception of interest from {:?} ends at {}", rx.source, now);
        Ok(rx.source)
    }

    /// Close the chunk in progress, if one is open and has nonzero length.
    ///
    /// SINR is the signal-of-interest PSD over the running interference sum
    /// (which already includes noise), elementwise. Two events at the same
    /// instant produce no chunk; the boundary simply stays put.
    fn close_chunk(&mut self, now: SimTime) {
        let Some(rx) = &mut self.rx else {
            // Interference bookkeeping continues without a reception of
            // interest, but nothing is emitted.
            return;
        };
        if now <= rx.last_boundary {
            return;
        }
        let duration = now - rx.last_boundary;
        let sinr = &rx.psd / &self.state.running_sum;
        trace!(
            "Chunk [{} .. {}] ({:?}): sinr {}",
            rx.last_boundary,
            now,
            duration,
            sinr
        );
        rx.last_boundary = now;
        for processor in &self.processors {
            processor.borrow_mut().accept(&sinr, duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::sinr::AverageSinrProcessor;
    use crate::phy::spectrum::Band;

    fn two_band_model() -> Rc<SpectrumModel> {
        SpectrumModel::new(vec![
            Band { low_hz: 2.400e9, center_hz: 2.410e9, high_hz: 2.420e9 },
            Band { low_hz: 2.420e9, center_hz: 2.431e9, high_hz: 2.442e9 },
        ])
    }

    fn value(model: &Rc<SpectrumModel>, v: [f64; 2]) -> SpectrumValue {
        SpectrumValue::from_values(model, v.to_vec())
    }

    fn tracker_with_averager(
        noise: SpectrumValue,
    ) -> (InterferenceTracker, Rc<RefCell<AverageSinrProcessor>>) {
        let mut tracker = InterferenceTracker::new(noise);
        let averager = Rc::new(RefCell::new(AverageSinrProcessor::new()));
        tracker.add_sinr_processor(averager.clone());
        (tracker, averager)
    }

    #[test]
    fn test_single_interferer_chunk_sinr() {
        let model = two_band_model();
        let noise = value(&model, [1e-19, 2e-19]);
        let (mut tracker, averager) = tracker_with_averager(noise);

        tracker
            .add_signal(SimTime::from_secs_f64(0.0), SourceId(2), value(&model, [4e-19, 6e-19]))
            .unwrap();
        tracker
            .start_rx(SimTime::from_secs_f64(1.0), SourceId(1), value(&model, [1e-18, 1.6e-18]))
            .unwrap();
        tracker.end_rx(SimTime::from_secs_f64(2.0)).unwrap();

        // One chunk, SINR = S / (N + I) per band
        let avg = averager.borrow_mut().finalize().unwrap();
        assert!((avg[0] - 2.0).abs() < 1e-7);
        assert!((avg[1] - 2.0).abs() < 1e-7);
    }

    #[test]
    fn test_weighted_average_over_composition_changes() {
        let model = two_band_model();
        let noise = value(&model, [1e-19, 1e-19]);
        let (mut tracker, averager) = tracker_with_averager(noise);

        let s = value(&model, [9e-19, 9e-19]);
        tracker.start_rx(SimTime::from_secs_f64(0.0), SourceId(1), s).unwrap();

        // First half: noise only, SINR = 9. Second half: +8e-19, SINR = 1.
        tracker
            .add_signal(SimTime::from_secs_f64(0.5), SourceId(2), value(&model, [8e-19, 8e-19]))
            .unwrap();
        tracker.end_rx(SimTime::from_secs_f64(1.0)).unwrap();

        let avg = averager.borrow_mut().finalize().unwrap();
        assert!((avg[0] - 5.0).abs() < 1e-7);
        assert!((avg[1] - 5.0).abs() < 1e-7);
    }

    #[test]
    fn test_zero_duration_events_emit_no_chunk() {
        let model = two_band_model();
        let noise = value(&model, [1e-19, 1e-19]);
        let (mut tracker, averager) = tracker_with_averager(noise);

        let t = SimTime::from_secs_f64(1.0);
        tracker.start_rx(t, SourceId(1), value(&model, [1e-18, 1e-18])).unwrap();
        // Same-instant composition changes move no time forward
        tracker.add_signal(t, SourceId(2), value(&model, [4e-19, 4e-19])).unwrap();
        tracker.remove_signal(t, SourceId(2)).unwrap();
        // Ending at the same instant produces zero chunks in total
        tracker.end_rx(t).unwrap();

        assert!(averager.borrow_mut().finalize().is_none());
    }

    #[test]
    fn test_background_tracking_without_rx() {
        let model = two_band_model();
        let noise = value(&model, [1e-19, 1e-19]);
        let (mut tracker, averager) = tracker_with_averager(noise);

        tracker
            .add_signal(SimTime::from_secs_f64(0.0), SourceId(2), value(&model, [5e-19, 5e-19]))
            .unwrap();
        tracker.remove_signal(SimTime::from_secs_f64(3.0), SourceId(2)).unwrap();

        // Bookkeeping ran, but no reception of interest means no chunks
        assert!(averager.borrow_mut().finalize().is_none());

        // A later reception still sees a consistent running sum (noise only)
        tracker
            .start_rx(SimTime::from_secs_f64(4.0), SourceId(1), value(&model, [2e-19, 2e-19]))
            .unwrap();
        tracker.end_rx(SimTime::from_secs_f64(5.0)).unwrap();
        let avg = averager.borrow_mut().finalize().unwrap();
        assert!((avg[0] - 2.0).abs() < 1e-7);
    }

    #[test]
    fn test_overlapping_reception_is_an_error() {
        let model = two_band_model();
        let (mut tracker, _avg) = tracker_with_averager(value(&model, [1e-19, 1e-19]));

        tracker
            .start_rx(SimTime::from_secs_f64(0.0), SourceId(1), value(&model, [1e-18, 1e-18]))
            .unwrap();
        let second = tracker.start_rx(
            SimTime::from_secs_f64(0.5),
            SourceId(3),
            value(&model, [1e-18, 1e-18]),
        );
        assert!(matches!(second, Err(PhyError::OverlappingReception)));

        // The first reception is untouched
        assert!(tracker.rx_in_progress());
        assert_eq!(tracker.end_rx(SimTime::from_secs_f64(1.0)).unwrap(), SourceId(1));
    }

    #[test]
    fn test_unknown_and_duplicate_signals_are_errors() {
        let model = two_band_model();
        let (mut tracker, _avg) = tracker_with_averager(value(&model, [1e-19, 1e-19]));

        let unknown = tracker.remove_signal(SimTime::from_secs_f64(0.0), SourceId(7));
        assert!(matches!(unknown, Err(PhyError::UnknownSignal(SourceId(7)))));

        tracker
            .add_signal(SimTime::from_secs_f64(0.0), SourceId(7), value(&model, [1e-19, 1e-19]))
            .unwrap();
        let duplicate =
            tracker.add_signal(SimTime::from_secs_f64(0.5), SourceId(7), value(&model, [1e-19, 1e-19]));
        assert!(matches!(duplicate, Err(PhyError::DuplicateSignal(SourceId(7)))));
    }

    /// Reference scenario: four interferers with overlapping windows around
    /// a one-second reception of interest. Chunk boundaries fall at every
    /// composition change and the duration-weighted average matches the
    /// closed-form value.
    #[test]
    fn test_reference_interference_scenario() {
        let model = two_band_model();
        let noise = value(&model, [5.000000000000e-19, 4.545454545455e-19]);
        let (mut tracker, averager) = tracker_with_averager(noise);

        let s = value(&model, [1.255943215755e-15, 7.204059965732e-16]);
        let i1 = value(&model, [5.000000000000e-18, 1.437398936440e-18]);
        let i2 = value(&model, [5.000000000000e-16, 5.722388235428e-16]);
        let i3 = value(&model, [1.581138830084e-16, 7.204059965732e-17]);
        let i4 = value(&model, [7.924465962306e-17, 5.722388235428e-17]);

        let at = SimTime::from_secs_f64;
        tracker.add_signal(at(0.0), SourceId(200), i1).unwrap();
        tracker.add_signal(at(0.7), SourceId(300), i2).unwrap();
        tracker.start_rx(at(1.0), SourceId(100), s).unwrap();
        tracker.add_signal(at(1.2), SourceId(400), i3).unwrap();
        tracker.add_signal(at(1.5), SourceId(500), i4).unwrap();
        tracker.remove_signal(at(1.6), SourceId(500)).unwrap();
        tracker.remove_signal(at(1.7), SourceId(300)).unwrap();
        assert_eq!(tracker.end_rx(at(2.0)).unwrap(), SourceId(100));

        let avg = averager.borrow_mut().finalize().unwrap();
        assert!((avg[0] - 3.72589167251055).abs() < 1e-7, "band 0: {}", avg[0]);
        assert!((avg[1] - 3.72255684126076).abs() < 1e-7, "band 1: {}", avg[1]);
    }
}
