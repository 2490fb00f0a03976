//! eNodeB PHY
//!
//! The base-station side of the physical layer: the frame/subframe timing
//! state machine, terminal attachment, transmit-PSD construction and ideal
//! control-message delivery. Timing boundaries are events on the shared
//! scheduler; each `start_subframe` gives the upper layer its subframe
//! indication and, when a PDU is queued, starts a one-TTI downlink
//! transmission shaped by the upper layer's resource allocation.

use super::control::{IdealControlMessage, UlCqiMessage};
use super::cqi::UlCqiReport;
use super::frame::{FrameClock, FramePhase, FrameTiming};
use super::interference::Signal;
use super::psd::tx_power_spectral_density;
use super::registry::UeRegistry;
use super::spectrum::{SpectrumModel, SpectrumValue};
use super::spectrum_phy::SpectrumPhy;
use super::ue::UePhy;
use super::PhyError;
use bytes::Bytes;
use common::types::{CellId, Rnti};
use sim::Simulator;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Per-resource-block assignment supplied by the upper layer for one
/// subframe's downlink transmission
#[derive(Debug, Clone, Default)]
pub struct ResourceAllocation {
    /// Resource blocks carrying the transmission; one spectrum band each
    pub rb_indices: Vec<u16>,
}

/// Upper-layer (MAC) boundary consumed by the eNodeB PHY
pub trait EnbPhySapUser {
    /// A new subframe has started
    fn subframe_indication(&mut self, frame: u32, subframe: u8);

    /// Take the PDU queued for transmission in this subframe, if any
    fn dequeue_outgoing_pdu(&mut self) -> Option<Bytes>;

    /// The resource allocation for the PDU just dequeued
    fn resource_allocation(&mut self) -> ResourceAllocation;

    /// A PDU completed reception on the uplink
    fn received_pdu(&mut self, pdu: Bytes);

    /// Channel-quality feedback arrived from a terminal
    fn ul_cqi_report(&mut self, rnti: Rnti, report: UlCqiReport);
}

/// Downstream propagation boundary: whoever models the channel takes the
/// signal from here and delivers it to receivers at computed times
pub trait DownlinkChannel {
    fn transmit(&mut self, signal: Signal);
}

/// eNodeB PHY configuration
#[derive(Debug, Clone)]
pub struct EnbPhyConfig {
    /// Cell identity; doubles as the source identity of every downlink
    /// signal this PHY transmits
    pub cell_id: CellId,
    /// Total transmit power in dBm, split across allocated resource blocks
    pub tx_power_dbm: f64,
    /// Frame timing
    pub timing: FrameTiming,
}

/// The eNodeB physical layer
pub struct EnbPhy {
    config: EnbPhyConfig,
    sim: Rc<Simulator>,
    model: Rc<SpectrumModel>,
    clock: FrameClock,
    registry: UeRegistry,
    sap_user: Option<Rc<RefCell<dyn EnbPhySapUser>>>,
    channel: Option<Rc<RefCell<dyn DownlinkChannel>>>,
}

impl EnbPhy {
    pub fn new(
        sim: Rc<Simulator>,
        model: Rc<SpectrumModel>,
        config: EnbPhyConfig,
    ) -> Rc<RefCell<Self>> {
        let clock = FrameClock::new(config.timing);
        Rc::new(RefCell::new(Self {
            config,
            sim,
            model,
            clock,
            registry: UeRegistry::new(),
            sap_user: None,
            channel: None,
        }))
    }

    pub fn set_sap_user(&mut self, sap_user: Rc<RefCell<dyn EnbPhySapUser>>) {
        self.sap_user = Some(sap_user);
    }

    pub fn set_channel(&mut self, channel: Rc<RefCell<dyn DownlinkChannel>>) {
        self.channel = Some(channel);
    }

    pub fn cell_id(&self) -> CellId {
        self.config.cell_id
    }

    pub fn model(&self) -> &Rc<SpectrumModel> {
        &self.model
    }

    pub fn frame(&self) -> u32 {
        self.clock.frame()
    }

    pub fn subframe(&self) -> u8 {
        self.clock.subframe()
    }

    pub fn phase(&self) -> FramePhase {
        self.clock.phase()
    }

    pub fn num_attached(&self) -> usize {
        self.registry.len()
    }

    /// Register a terminal under `rnti`; fails on a duplicate without
    /// touching the registry
    pub fn attach(&mut self, rnti: Rnti, ue: Rc<RefCell<UePhy>>) -> Result<(), PhyError> {
        self.registry.attach(rnti, ue)
    }

    /// Remove the terminal registered under `rnti`
    pub fn detach(&mut self, rnti: Rnti) -> Result<(), PhyError> {
        self.registry.detach(rnti)
    }

    /// Deliver a control message with zero propagation delay.
    ///
    /// Without a target the message goes to every attached terminal in
    /// attachment order. With a target it goes only to that terminal if it
    /// is currently attached; terminals attach and detach asynchronously
    /// relative to message flight, so a miss is a silent drop, not an
    /// error.
    pub fn send_ideal_control_message(&self, msg: IdealControlMessage, target: Option<Rnti>) {
        match target {
            Some(rnti) => match self.registry.get(rnti) {
                Some(ue) => ue.borrow_mut().receive_ideal_control_message(msg),
                None => {
                    debug!("Dropping control message for detached RNTI {}", rnti.value())
                }
            },
            None => {
                for (_, ue) in self.registry.iter() {
                    ue.borrow_mut().receive_ideal_control_message(msg.clone());
                }
            }
        }
    }

    /// A control message arrived from a terminal
    pub fn receive_ideal_control_message(this: &Rc<RefCell<Self>>, msg: IdealControlMessage) {
        match msg {
            IdealControlMessage::UlCqi(UlCqiMessage { rnti, report }) => {
                trace!("UL CQI from RNTI {}: {:?}", rnti.value(), report.cqi);
                let sap_user = this.borrow().sap_user.clone();
                if let Some(sap_user) = sap_user {
                    sap_user.borrow_mut().ul_cqi_report(rnti, report);
                }
            }
            IdealControlMessage::DlDci(dci) => {
                warn!(
                    "Ignoring downlink DCI addressed to RNTI {} at the eNodeB",
                    dci.rnti.value()
                );
            }
        }
    }

    /// Wire an uplink receiver so completed uplink receptions hand their
    /// PDU to the upper layer
    pub fn connect_ul_phy(this: &Rc<RefCell<Self>>, ul_phy: &Rc<RefCell<SpectrumPhy>>) {
        let enb = Rc::downgrade(this);
        ul_phy
            .borrow_mut()
            .set_rx_complete(Box::new(move |source, _avg, pdu| {
                let Some(this) = enb.upgrade() else {
                    return;
                };
                let Some(pdu) = pdu else {
                    trace!("Uplink reception from {:?} carried no PDU", source);
                    return;
                };
                let sap_user = this.borrow().sap_user.clone();
                if let Some(sap_user) = sap_user {
                    sap_user.borrow_mut().received_pdu(pdu);
                }
            }));
    }

    /// Transmit PSD for an allocation: allocated resource blocks carry the
    /// configured power converted to linear density, the rest are zero
    pub fn build_tx_psd(&self, allocation: &ResourceAllocation) -> SpectrumValue {
        tx_power_spectral_density(&self.model, self.config.tx_power_dbm, &allocation.rb_indices)
    }

    /// Begin the frame cycle at the current virtual time; runs until the
    /// simulator is stopped or torn down
    pub fn start(this: &Rc<RefCell<Self>>) {
        let sim = this.borrow().sim.clone();
        let handle = Rc::clone(this);
        sim.schedule_now(move || Self::start_frame(&handle));
    }

    fn start_frame(this: &Rc<RefCell<Self>>) {
        let frame = this.borrow_mut().clock.begin_frame();
        debug!("Starting frame {}", frame);
        Self::start_subframe(this);
    }

    fn start_subframe(this: &Rc<RefCell<Self>>) {
        let (frame, subframe, sap_user, sim, tti) = {
            let mut phy = this.borrow_mut();
            let (frame, subframe) = phy.clock.begin_subframe();
            (
                frame,
                subframe,
                phy.sap_user.clone(),
                phy.sim.clone(),
                phy.config.timing.subframe_duration,
            )
        };
        trace!("Starting subframe {}.{}", frame, subframe);

        // The upper layer runs outside our borrow so it may call back into
        // this PHY (e.g. to send ideal control messages).
        if let Some(sap_user) = sap_user {
            sap_user.borrow_mut().subframe_indication(frame, subframe);

            let pdu = sap_user.borrow_mut().dequeue_outgoing_pdu();
            if let Some(pdu) = pdu {
                let allocation = sap_user.borrow_mut().resource_allocation();
                let (signal, channel) = {
                    let phy = this.borrow();
                    let signal = Signal {
                        source: phy.config.cell_id.into(),
                        psd: phy.build_tx_psd(&allocation),
                        duration: tti,
                        pdu: Some(pdu),
                    };
                    (signal, phy.channel.clone())
                };
                match channel {
                    Some(channel) => {
                        debug!(
                            "Transmitting in subframe {}.{} on RBs {:?}",
                            frame, subframe, allocation.rb_indices
                        );
                        channel.borrow_mut().transmit(signal);
                    }
                    None => warn!("PDU queued but no downlink channel is connected"),
                }
            }
        }

        let handle = Rc::clone(this);
        sim.schedule(tti, move || Self::end_subframe(&handle));
    }

    fn end_subframe(this: &Rc<RefCell<Self>>) {
        let last = this.borrow_mut().clock.end_subframe();
        // Receive-completion callbacks fire as their own events; nothing to
        // collect here.
        if last {
            Self::end_frame(this);
        } else {
            Self::start_subframe(this);
        }
    }

    fn end_frame(this: &Rc<RefCell<Self>>) {
        let (frame, sim) = {
            let mut phy = this.borrow_mut();
            phy.clock.end_frame();
            (phy.clock.frame(), phy.sim.clone())
        };
        debug!("Frame {} complete", frame);
        // Fires at the end of the last subframe, so the next frame begins
        // exactly one frame duration after the previous one began.
        let handle = Rc::clone(this);
        sim.schedule_now(move || Self::start_frame(&handle));
    }
}
