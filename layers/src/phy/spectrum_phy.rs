//! Receiving Spectrum PHY
//!
//! One `SpectrumPhy` per receiving endpoint. It maps the propagation
//! boundary onto the interference tracker: `start_rx` registers an
//! arriving signal (as the reception of interest when it comes from the
//! serving source, as interference otherwise) and self-schedules the
//! matching end event `signal.duration` later. When a reception of
//! interest completes, the averaging processor is finalized and the
//! completion callback is invoked with the result.

use super::interference::{InterferenceTracker, Signal};
use super::sinr::{AverageSinrProcessor, SinrChunkProcessor};
use super::spectrum::{SpectrumModel, SpectrumValue};
use super::PhyError;
use bytes::Bytes;
use common::types::SourceId;
use sim::Simulator;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace};

/// Invoked when a reception of interest completes: source, time-averaged
/// SINR (if any chunk carried weight) and the signal's payload.
///
/// The callback runs outside the `SpectrumPhy` borrow, so it may call back
/// into this PHY (e.g. to reconfigure it) but not re-enter `finish_rx`.
pub type RxCompleteCallback = Box<dyn FnMut(SourceId, Option<SpectrumValue>, Option<Bytes>)>;

/// Per-endpoint receiver owning one interference tracker
pub struct SpectrumPhy {
    sim: Rc<Simulator>,
    serving: Option<SourceId>,
    tracker: InterferenceTracker,
    averager: Rc<RefCell<AverageSinrProcessor>>,
    on_rx_complete: Option<RxCompleteCallback>,
}

impl SpectrumPhy {
    /// Create a receiver with the ambient noise PSD; a duration-weighted
    /// averaging processor is attached from the start
    pub fn new(sim: Rc<Simulator>, noise: SpectrumValue) -> Rc<RefCell<Self>> {
        let averager = Rc::new(RefCell::new(AverageSinrProcessor::new()));
        let mut tracker = InterferenceTracker::new(noise);
        tracker.add_sinr_processor(averager.clone());
        Rc::new(RefCell::new(Self {
            sim,
            serving: None,
            tracker,
            averager,
            on_rx_complete: None,
        }))
    }

    /// Model all signals at this receiver are defined over
    pub fn model(&self) -> &Rc<SpectrumModel> {
        self.tracker.model()
    }

    /// Designate the source whose signals are the signal of interest
    pub fn set_serving_source(&mut self, source: SourceId) {
        self.serving = Some(source);
    }

    /// Replace the ambient noise PSD from the current instant on
    pub fn set_noise_psd(&mut self, noise: SpectrumValue) {
        let now = self.sim.now();
        self.tracker.set_noise_psd(now, noise);
    }

    /// Attach a further chunk consumer alongside the built-in averager
    pub fn add_sinr_processor(&mut self, processor: Rc<RefCell<dyn SinrChunkProcessor>>) {
        self.tracker.add_sinr_processor(processor);
    }

    /// Install the reception-complete callback
    pub fn set_rx_complete(&mut self, callback: RxCompleteCallback) {
        self.on_rx_complete = Some(callback);
    }

    /// True while a reception of interest is outstanding
    pub fn rx_in_progress(&self) -> bool {
        self.tracker.rx_in_progress()
    }

    /// A signal starts arriving now.
    ///
    /// The matching end event is scheduled `signal.duration` from now.
    /// Starting a second reception of interest while one is outstanding is
    /// a contract violation reported to the caller; the first reception is
    /// left untouched.
    pub fn start_rx(this: &Rc<RefCell<Self>>, signal: Signal) -> Result<(), PhyError> {
        let Signal {
            source,
            psd,
            duration,
            pdu,
        } = signal;

        let mut phy = this.borrow_mut();
        let now = phy.sim.now();
        let of_interest = phy.serving == Some(source);
        trace!(
            "start_rx from {:?} at {} for {:?} (of_interest={})",
            source,
            now,
            duration,
            of_interest
        );

        if of_interest {
            phy.tracker.start_rx(now, source, psd)?;
            let handle = Rc::clone(this);
            phy.sim.schedule(duration, move || Self::finish_rx(&handle, pdu));
        } else {
            phy.tracker.add_signal(now, source, psd)?;
            let handle = Rc::clone(this);
            phy.sim.schedule(duration, move || {
                let mut phy = handle.borrow_mut();
                let now = phy.sim.now();
                if let Err(e) = phy.tracker.remove_signal(now, source) {
                    panic!("interference bookkeeping corrupted: {e}");
                }
            });
        }
        Ok(())
    }

    /// End of the reception of interest: close the final chunk, finalize
    /// the average and report completion upward.
    fn finish_rx(this: &Rc<RefCell<Self>>, pdu: Option<Bytes>) {
        let (source, average, mut callback) = {
            let mut phy = this.borrow_mut();
            let now = phy.sim.now();
            let source = match phy.tracker.end_rx(now) {
                Ok(source) => source,
                Err(e) => panic!("reception bookkeeping corrupted: {e}"),
            };
            let average = phy.averager.borrow_mut().finalize();
            (source, average, phy.on_rx_complete.take())
        };

        debug!("Reception from {:?} complete", source);
        if let Some(cb) = callback.as_mut() {
            cb(source, average, pdu);
        }

        // Reinstall unless the callback replaced itself meanwhile
        let mut phy = this.borrow_mut();
        if phy.on_rx_complete.is_none() {
            phy.on_rx_complete = callback;
        }
    }
}
