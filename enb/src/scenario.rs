//! Scenario Wiring
//!
//! Builds a complete downlink simulation from configuration: one eNodeB,
//! N attached terminals behind a fixed propagation loss, a round-robin MAC
//! stub feeding the PHY one PDU per subframe, and the ideal downlink
//! channel that delivers each transmission to every terminal.

use crate::config::SimConfig;
use anyhow::Context;
use bytes::Bytes;
use common::types::{CellId, Rnti};
use common::units::db_to_linear;
use layers::phy::{
    DlDciMessage, DownlinkChannel, EnbPhy, EnbPhyConfig, EnbPhySapUser, FrameTiming,
    IdealControlMessage, ResourceAllocation, Signal, SpectrumPhy, UePhy, UePhySapUser,
    UlCqiReport,
};
use layers::phy::psd::{downlink_spectrum_model, noise_power_spectral_density};
use sim::{SimTime, Simulator};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Round-robin MAC stub driving the eNodeB PHY.
///
/// Every subframe it picks the next attached terminal, announces the
/// full-band allocation as a DCI ideal message, and queues one numbered
/// PDU for transmission.
struct RoundRobinMac {
    enb: Weak<RefCell<EnbPhy>>,
    ues: Vec<Rnti>,
    num_rbs: u16,
    max_frames: u32,
    next_ue: usize,
    next_seq: u32,
    pending: Option<ResourceAllocation>,
    pdus_sent: u32,
    cqi_reports: Vec<(Rnti, UlCqiReport)>,
}

impl RoundRobinMac {
    fn new(enb: Weak<RefCell<EnbPhy>>, ues: Vec<Rnti>, num_rbs: u16, max_frames: u32) -> Self {
        Self {
            enb,
            ues,
            num_rbs,
            max_frames,
            next_ue: 0,
            next_seq: 0,
            pending: None,
            pdus_sent: 0,
            cqi_reports: Vec::new(),
        }
    }
}

impl EnbPhySapUser for RoundRobinMac {
    fn subframe_indication(&mut self, frame: u32, subframe: u8) {
        // Past the configured horizon the cell goes quiet; the run winds
        // down with no new transmissions in flight.
        if self.ues.is_empty() || frame > self.max_frames {
            return;
        }
        let rnti = self.ues[self.next_ue % self.ues.len()];
        self.next_ue += 1;

        let rb_indices: Vec<u16> = (0..self.num_rbs).collect();
        debug!(
            "Scheduling RNTI {} over {} RBs in subframe {}.{}",
            rnti.value(),
            rb_indices.len(),
            frame,
            subframe
        );

        if let Some(enb) = self.enb.upgrade() {
            enb.borrow().send_ideal_control_message(
                IdealControlMessage::DlDci(DlDciMessage {
                    rnti,
                    rb_indices: rb_indices.clone(),
                    mcs: 4,
                }),
                Some(rnti),
            );
        }
        self.pending = Some(ResourceAllocation { rb_indices });
    }

    fn dequeue_outgoing_pdu(&mut self) -> Option<Bytes> {
        self.pending.as_ref()?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pdus_sent += 1;
        Some(Bytes::from(format!("pdu-{seq}").into_bytes()))
    }

    fn resource_allocation(&mut self) -> ResourceAllocation {
        self.pending.take().unwrap_or_default()
    }

    fn received_pdu(&mut self, pdu: Bytes) {
        debug!("MAC received uplink PDU of {} bytes", pdu.len());
    }

    fn ul_cqi_report(&mut self, rnti: Rnti, report: UlCqiReport) {
        debug!("CQI from RNTI {}: {:?}", rnti.value(), report.cqi);
        self.cqi_reports.push((rnti, report));
    }
}

/// Terminal upper layer that just counts what arrives
struct UeUpperLayer {
    rnti: Rnti,
    pdus_received: u64,
}

impl UePhySapUser for UeUpperLayer {
    fn received_pdu(&mut self, pdu: Bytes) {
        debug!(
            "RNTI {} received {} byte PDU",
            self.rnti.value(),
            pdu.len()
        );
        self.pdus_received += 1;
    }
}

/// Ideal downlink channel: a fixed propagation loss, zero delay, delivery
/// to every attached terminal
struct IdealDownlinkChannel {
    sim: Rc<Simulator>,
    gain_linear: f64,
    ues: Vec<Rc<RefCell<UePhy>>>,
}

impl DownlinkChannel for IdealDownlinkChannel {
    fn transmit(&mut self, signal: Signal) {
        for ue in &self.ues {
            let attenuated = Signal {
                psd: &signal.psd * self.gain_linear,
                ..signal.clone()
            };
            let ue = ue.clone();
            self.sim.schedule_now(move || {
                let dl_phy = ue.borrow().dl_phy().clone();
                if let Err(e) = SpectrumPhy::start_rx(&dl_phy, attenuated) {
                    panic!("downlink reception contract violated: {e}");
                }
            });
        }
    }
}

/// What a finished run produced
#[derive(Debug)]
pub struct RunSummary {
    pub frames_completed: u32,
    pub pdus_sent: u32,
    pub pdus_delivered: u64,
    pub cqi_reports: usize,
}

/// A fully wired simulation
pub struct Scenario {
    simulator: Rc<Simulator>,
    enb: Rc<RefCell<EnbPhy>>,
    mac: Rc<RefCell<RoundRobinMac>>,
    ue_upper_layers: Vec<Rc<RefCell<UeUpperLayer>>>,
    frames: u32,
}

impl Scenario {
    /// Wire up eNodeB, terminals, channel and MAC stub from configuration
    pub fn build(config: &SimConfig) -> anyhow::Result<Self> {
        let bandwidth = config.bandwidth()?;
        if config.run.ues == 0 {
            anyhow::bail!("at least one UE is required");
        }

        let simulator = Simulator::new();
        let model = downlink_spectrum_model(config.cell.carrier_frequency_hz, bandwidth);

        let enb = EnbPhy::new(
            simulator.clone(),
            model.clone(),
            EnbPhyConfig {
                cell_id: CellId(config.cell.cell_id),
                tx_power_dbm: config.cell.tx_power_dbm,
                timing: FrameTiming::default(),
            },
        );

        let mut ues = Vec::new();
        let mut ue_upper_layers = Vec::new();
        let mut rntis = Vec::new();
        for index in 0..config.run.ues {
            let rnti = Rnti(index + 1);
            let noise = noise_power_spectral_density(&model, config.cell.noise_figure_db);
            let ue = UePhy::new(rnti, simulator.clone(), noise);
            UePhy::connect(&ue, &enb);

            let upper = Rc::new(RefCell::new(UeUpperLayer {
                rnti,
                pdus_received: 0,
            }));
            ue.borrow_mut().set_sap_user(upper.clone());

            enb.borrow_mut()
                .attach(rnti, ue.clone())
                .with_context(|| format!("attaching RNTI {}", rnti.value()))?;

            rntis.push(rnti);
            ue_upper_layers.push(upper);
            ues.push(ue);
        }

        let mac = Rc::new(RefCell::new(RoundRobinMac::new(
            Rc::downgrade(&enb),
            rntis,
            bandwidth.num_rbs(),
            config.run.frames,
        )));
        enb.borrow_mut().set_sap_user(mac.clone());

        let channel = Rc::new(RefCell::new(IdealDownlinkChannel {
            sim: simulator.clone(),
            gain_linear: db_to_linear(-config.cell.propagation_loss_db),
            ues,
        }));
        enb.borrow_mut().set_channel(channel);

        info!(
            "Scenario ready: cell {} with {} RBs, {} UEs, {} dB path loss",
            config.cell.cell_id,
            bandwidth.num_rbs(),
            config.run.ues,
            config.cell.propagation_loss_db
        );

        Ok(Self {
            simulator,
            enb,
            mac,
            ue_upper_layers,
            frames: config.run.frames,
        })
    }

    /// Run the configured number of frames and summarize
    pub fn run(self) -> RunSummary {
        EnbPhy::start(&self.enb);

        let horizon =
            SimTime::ZERO + FrameTiming::default().frame_duration() * self.frames;
        // The last frame's end events land exactly on the horizon; the
        // following frame starts there too but the MAC keeps it silent.
        self.simulator.stop_at(horizon);
        self.simulator.run();

        // The frame counter points at the frame that was starting when the
        // horizon hit.
        let frames_completed = self.enb.borrow().frame().saturating_sub(1);

        let mac = self.mac.borrow();
        RunSummary {
            frames_completed,
            pdus_sent: mac.pdus_sent,
            pdus_delivered: self
                .ue_upper_layers
                .iter()
                .map(|u| u.borrow().pdus_received)
                .sum(),
            cqi_reports: mac.cqi_reports.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.cell.num_rbs = 6;
        config.run.frames = 2;
        config.run.ues = 2;
        config
    }

    #[test]
    fn test_two_frame_run_delivers_data_and_feedback() {
        let summary = Scenario::build(&small_config()).unwrap().run();

        assert_eq!(summary.frames_completed, 2);
        // One PDU per subframe, two frames of ten subframes
        assert_eq!(summary.pdus_sent, 20);
        // Every transmission reaches both terminals; only the serving-cell
        // signal carries data, so each PDU is delivered once per UE
        assert_eq!(summary.pdus_delivered, 40);
        // Each delivered reception generates one CQI report
        assert_eq!(summary.cqi_reports, 40);
    }

    #[test]
    fn test_zero_ues_is_rejected() {
        let mut config = small_config();
        config.run.ues = 0;
        assert!(Scenario::build(&config).is_err());
    }
}
