//! Attached-Terminal Registry
//!
//! Maps RNTI to the attached terminal PHY. Entries keep their attachment
//! order so broadcast delivery is deterministic across runs.

use super::ue::UePhy;
use super::PhyError;
use common::types::Rnti;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::info;

/// Registry of terminals attached to one eNodeB
#[derive(Default)]
pub struct UeRegistry {
    // Insertion-ordered; lookups scan, which is fine at cell scale
    entries: Vec<(Rnti, Rc<RefCell<UePhy>>)>,
}

impl UeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a terminal; fails without side effects if the RNTI is taken
    pub fn attach(&mut self, rnti: Rnti, phy: Rc<RefCell<UePhy>>) -> Result<(), PhyError> {
        if self.contains(rnti) {
            return Err(PhyError::DuplicateAttachment(rnti));
        }
        info!("Attaching UE with RNTI {}", rnti.value());
        self.entries.push((rnti, phy));
        Ok(())
    }

    /// Remove a terminal; fails without side effects if the RNTI is absent
    pub fn detach(&mut self, rnti: Rnti) -> Result<(), PhyError> {
        let index = self
            .entries
            .iter()
            .position(|(id, _)| *id == rnti)
            .ok_or(PhyError::UnknownAttachment(rnti))?;
        info!("Detaching UE with RNTI {}", rnti.value());
        self.entries.remove(index);
        Ok(())
    }

    /// Handle of an attached terminal, if present
    pub fn get(&self, rnti: Rnti) -> Option<&Rc<RefCell<UePhy>>> {
        self.entries
            .iter()
            .find(|(id, _)| *id == rnti)
            .map(|(_, phy)| phy)
    }

    pub fn contains(&self, rnti: Rnti) -> bool {
        self.entries.iter().any(|(id, _)| *id == rnti)
    }

    /// Terminals in attachment order
    pub fn iter(&self) -> impl Iterator<Item = (Rnti, &Rc<RefCell<UePhy>>)> {
        self.entries.iter().map(|(id, phy)| (*id, phy))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::psd::{downlink_spectrum_model, noise_power_spectral_density};
    use common::types::Bandwidth;
    use sim::Simulator;

    fn ue(sim: &Rc<Simulator>, rnti: u16) -> Rc<RefCell<UePhy>> {
        let model = downlink_spectrum_model(2.12e9, Bandwidth::Bw1_4);
        let noise = noise_power_spectral_density(&model, 9.0);
        UePhy::new(Rnti(rnti), sim.clone(), noise)
    }

    #[test]
    fn test_iteration_follows_attachment_order() {
        let sim = Simulator::new();
        let mut registry = UeRegistry::new();

        for rnti in [3u16, 1, 2] {
            registry.attach(Rnti(rnti), ue(&sim, rnti)).unwrap();
        }
        let order: Vec<u16> = registry.iter().map(|(rnti, _)| rnti.value()).collect();
        assert_eq!(order, vec![3, 1, 2]);

        // Detach and re-attach moves the terminal to the back
        registry.detach(Rnti(1)).unwrap();
        registry.attach(Rnti(1), ue(&sim, 1)).unwrap();
        let order: Vec<u16> = registry.iter().map(|(rnti, _)| rnti.value()).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_lookup() {
        let sim = Simulator::new();
        let mut registry = UeRegistry::new();
        registry.attach(Rnti(5), ue(&sim, 5)).unwrap();

        assert!(registry.contains(Rnti(5)));
        assert!(registry.get(Rnti(5)).is_some());
        assert!(registry.get(Rnti(6)).is_none());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
