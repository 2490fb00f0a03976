//! Ideal Control Messages
//!
//! Control-plane messages exchanged between the eNodeB and its terminals
//! outside the modeled spectrum: delivered with zero simulated propagation
//! delay, in attachment order, to every currently attached terminal (or to
//! one addressed terminal).

use super::cqi::UlCqiReport;
use common::types::Rnti;

/// Downlink control information: the resource-block allocation a terminal
/// should expect its data on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlDciMessage {
    /// Addressed terminal
    pub rnti: Rnti,
    /// Allocated resource blocks
    pub rb_indices: Vec<u16>,
    /// Modulation and coding scheme index
    pub mcs: u8,
}

/// Uplink channel-quality feedback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UlCqiMessage {
    /// Reporting terminal
    pub rnti: Rnti,
    /// Per-band CQI
    pub report: UlCqiReport,
}

/// Control message delivered outside the modeled spectrum
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdealControlMessage {
    /// eNodeB to terminal: downlink allocation
    DlDci(DlDciMessage),
    /// Terminal to eNodeB: channel-quality feedback
    UlCqi(UlCqiMessage),
}
