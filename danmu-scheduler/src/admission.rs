//! Probabilistic load shedding for incoming comments

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Admits or drops due comments depending on how many are on screen.
///
/// The acceptance probability is `2.0 - active / max_active` and is left
/// unclamped on purpose. Values above 1.0 are headroom: admission is certain
/// while fewer than `max_active` comments are on screen, and the odds fall
/// linearly to zero at twice that count.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    max_active: usize,
    rng: StdRng,
}

impl AdmissionController {
    /// Creates a controller seeded from the operating system
    pub fn new(max_active: usize) -> Self {
        Self::with_rng(max_active, StdRng::from_entropy())
    }

    /// Creates a controller with a fixed seed (useful for deterministic runs)
    pub fn from_seed(max_active: usize, seed: u64) -> Self {
        Self::with_rng(max_active, StdRng::seed_from_u64(seed))
    }

    fn with_rng(max_active: usize, rng: StdRng) -> Self {
        Self {
            max_active: max_active.max(1),
            rng,
        }
    }

    pub fn max_active(&self) -> usize {
        self.max_active
    }

    pub fn set_max_active(&mut self, max_active: usize) {
        self.max_active = max_active.max(1);
    }

    /// Probability that a comment arriving now is admitted
    pub fn acceptance_probability(&self, active: usize) -> f64 {
        acceptance_probability(active, self.max_active)
    }

    /// Draws whether a comment arriving now is admitted.
    ///
    /// Rejected comments are gone for good; there is no retry.
    pub fn admit(&mut self, active: usize) -> bool {
        let probability = self.acceptance_probability(active);
        if probability <= 0.0 {
            return false;
        }
        self.rng.gen::<f64>() <= probability
    }
}

/// `2.0 - active / max_active`, see [`AdmissionController`]
pub fn acceptance_probability(active: usize, max_active: usize) -> f64 {
    2.0 - active as f64 / max_active.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptance_probability() {
        assert_eq!(acceptance_probability(0, 50), 2.0);
        assert_eq!(acceptance_probability(50, 50), 1.0);
        assert_eq!(acceptance_probability(75, 50), 0.5);
        assert_eq!(acceptance_probability(100, 50), 0.0);
        assert!(acceptance_probability(150, 50) < 0.0);
    }

    #[test]
    fn test_admits_below_capacity() {
        let mut admission = AdmissionController::from_seed(50, 7);
        for active in 0..=50 {
            assert!(admission.admit(active));
        }
    }

    #[test]
    fn test_rejects_at_twice_capacity() {
        let mut admission = AdmissionController::from_seed(10, 7);
        assert_eq!(admission.acceptance_probability(20), 0.0);
        for _ in 0..1000 {
            assert!(!admission.admit(20));
            assert!(!admission.admit(35));
        }
    }

    #[test]
    fn test_sheds_roughly_half_at_one_and_a_half_capacity() {
        let mut admission = AdmissionController::from_seed(100, 42);
        let admitted = (0..10_000).filter(|_| admission.admit(150)).count();
        assert!((4_000..6_000).contains(&admitted), "admitted {admitted}");
    }

    #[test]
    fn test_set_max_active() {
        let mut admission = AdmissionController::from_seed(10, 1);
        admission.set_max_active(0);
        assert_eq!(admission.max_active(), 1);

        admission.set_max_active(40);
        assert_eq!(admission.acceptance_probability(20), 1.5);
    }
}
