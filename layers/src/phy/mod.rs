//! Physical Layer (PHY) Submodules
//!
//! Models the LTE physical layer inside a discrete-event simulation: the
//! spectrum data model, the interference/SINR accumulation engine, CQI
//! feedback generation, and the eNodeB frame timing state machine with its
//! attached terminals.

pub mod spectrum;
pub mod psd;
pub mod interference;
pub mod sinr;
pub mod cqi;
pub mod frame;
pub mod spectrum_phy;
pub mod registry;
pub mod control;
pub mod enb;
pub mod ue;

// Re-export commonly used types
pub use spectrum::{Band, SpectrumModel, SpectrumValue};
pub use interference::{InterferenceTracker, Signal};
pub use sinr::{AverageSinrProcessor, SinrChunkProcessor};
pub use cqi::{CqiFeedbackGenerator, UlCqiReport};
pub use frame::{FrameClock, FramePhase, FrameTiming};
pub use spectrum_phy::SpectrumPhy;
pub use registry::UeRegistry;
pub use control::{DlDciMessage, IdealControlMessage, UlCqiMessage};
pub use enb::{DownlinkChannel, EnbPhy, EnbPhyConfig, EnbPhySapUser, ResourceAllocation};
pub use ue::{UePhy, UePhySapUser};

use common::types::{Rnti, SourceId};
use thiserror::Error;

/// Errors raised by the PHY layer.
///
/// Attachment errors are recoverable and leave state untouched. The signal
/// and reception variants indicate a violated caller contract; continuing a
/// run after one of them would silently corrupt SINR figures, so callers are
/// expected to abort.
#[derive(Error, Debug)]
pub enum PhyError {
    #[error("RNTI {0:?} is already attached")]
    DuplicateAttachment(Rnti),

    #[error("RNTI {0:?} is not attached")]
    UnknownAttachment(Rnti),

    #[error("a reception of interest is already in progress")]
    OverlappingReception,

    #[error("source {0:?} already has an active signal")]
    DuplicateSignal(SourceId),

    #[error("source {0:?} has no active signal")]
    UnknownSignal(SourceId),

    #[error("no reception of interest is in progress")]
    NoActiveReception,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}
