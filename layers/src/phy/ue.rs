//! UE PHY
//!
//! The terminal side of the physical layer: a downlink receiver plus the
//! channel-quality feedback path. When a downlink reception of interest
//! completes, the PDU goes up to the terminal's own upper layer and the
//! averaged SINR is quantized into a CQI report that travels back to the
//! serving eNodeB as a zero-delay ideal control message.

use super::control::{DlDciMessage, IdealControlMessage, UlCqiMessage};
use super::cqi::{CqiFeedbackGenerator, UlCqiReport};
use super::enb::EnbPhy;
use super::spectrum::SpectrumValue;
use super::spectrum_phy::SpectrumPhy;
use bytes::Bytes;
use common::types::Rnti;
use sim::Simulator;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Upper-layer boundary consumed by the UE PHY
pub trait UePhySapUser {
    /// A PDU completed reception on the downlink
    fn received_pdu(&mut self, pdu: Bytes);
}

/// The terminal physical layer
pub struct UePhy {
    rnti: Rnti,
    sim: Rc<Simulator>,
    dl_phy: Rc<RefCell<SpectrumPhy>>,
    // Uplink direction of the feedback loop; weak because the eNodeB's
    // registry holds the strong handle to this UE
    enb: Option<Weak<RefCell<EnbPhy>>>,
    sap_user: Option<Rc<RefCell<dyn UePhySapUser>>>,
    last_dci: Option<DlDciMessage>,
    last_report: Option<UlCqiReport>,
}

impl UePhy {
    /// Create a terminal PHY with the given downlink noise floor
    pub fn new(rnti: Rnti, sim: Rc<Simulator>, noise: SpectrumValue) -> Rc<RefCell<Self>> {
        let dl_phy = SpectrumPhy::new(sim.clone(), noise);
        Rc::new(RefCell::new(Self {
            rnti,
            sim,
            dl_phy,
            enb: None,
            sap_user: None,
            last_dci: None,
            last_report: None,
        }))
    }

    /// Point this terminal at its serving eNodeB: downlink signals from
    /// that cell become the signal of interest and completed receptions
    /// feed CQI back to it. Attachment to the registry is a separate step.
    pub fn connect(this: &Rc<RefCell<Self>>, enb: &Rc<RefCell<EnbPhy>>) {
        let serving = enb.borrow().cell_id().into();
        let weak_self = Rc::downgrade(this);
        {
            let mut ue = this.borrow_mut();
            ue.enb = Some(Rc::downgrade(enb));
            let mut dl = ue.dl_phy.borrow_mut();
            dl.set_serving_source(serving);
            dl.set_rx_complete(Box::new(move |_source, average, pdu| {
                if let Some(ue) = weak_self.upgrade() {
                    Self::rx_complete(&ue, average, pdu);
                }
            }));
        }
    }

    pub fn set_sap_user(&mut self, sap_user: Rc<RefCell<dyn UePhySapUser>>) {
        self.sap_user = Some(sap_user);
    }

    pub fn rnti(&self) -> Rnti {
        self.rnti
    }

    /// Downlink receiver handle, for the channel model to deliver into
    pub fn dl_phy(&self) -> &Rc<RefCell<SpectrumPhy>> {
        &self.dl_phy
    }

    /// Most recent downlink allocation addressed to this terminal
    pub fn last_dci(&self) -> Option<&DlDciMessage> {
        self.last_dci.as_ref()
    }

    /// Most recent CQI report generated by this terminal
    pub fn last_report(&self) -> Option<&UlCqiReport> {
        self.last_report.as_ref()
    }

    /// A control message arrived from the eNodeB
    pub fn receive_ideal_control_message(&mut self, msg: IdealControlMessage) {
        match msg {
            IdealControlMessage::DlDci(dci) if dci.rnti == self.rnti => {
                trace!(
                    "RNTI {}: DCI on RBs {:?}",
                    self.rnti.value(),
                    dci.rb_indices
                );
                self.last_dci = Some(dci);
            }
            IdealControlMessage::DlDci(_) => {
                // Broadcast DCI addressed to another terminal
            }
            IdealControlMessage::UlCqi(_) => {
                debug!("Ignoring uplink CQI message at a terminal");
            }
        }
    }

    /// Downlink reception of interest completed: deliver data up, quantize
    /// the averaged SINR and return it to the eNodeB
    fn rx_complete(
        this: &Rc<RefCell<Self>>,
        average: Option<SpectrumValue>,
        pdu: Option<Bytes>,
    ) {
        let (rnti, sim, sap_user, enb) = {
            let ue = this.borrow();
            (ue.rnti, ue.sim.clone(), ue.sap_user.clone(), ue.enb.clone())
        };

        if let Some(pdu) = pdu {
            match sap_user {
                Some(sap_user) => sap_user.borrow_mut().received_pdu(pdu),
                None => debug!("RNTI {}: dropping PDU, no upper layer", rnti.value()),
            }
        }

        let Some(average) = average else {
            return;
        };
        let report = CqiFeedbackGenerator::generate(&average);
        debug!("RNTI {}: CQI {:?}", rnti.value(), report.cqi);
        this.borrow_mut().last_report = Some(report.clone());

        if let Some(enb) = enb {
            // Zero-delay delivery as its own event keeps the feedback path
            // free of nested component borrows.
            sim.schedule_now(move || {
                if let Some(enb) = enb.upgrade() {
                    EnbPhy::receive_ideal_control_message(
                        &enb,
                        IdealControlMessage::UlCqi(UlCqiMessage { rnti, report }),
                    );
                }
            });
        }
    }
}
