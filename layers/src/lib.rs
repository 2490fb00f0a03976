//! Protocol Stack Layers Library
//!
//! This crate implements the physical layer of the LTE eNodeB simulation:
//! spectrum bookkeeping, interference and SINR accumulation, CQI feedback,
//! and the frame timing state machine.

pub mod phy;
