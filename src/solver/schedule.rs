// src/solver/schedule.rs
//! Patience-Based Training Schedule
//!
//! Two independent policies share one trigger shape: the relative change of
//! the last two recorded losses,
//! ```text
//! relChange = |loss[-2] - loss[-1]| / loss[-2]
//! ```
//! A counter increments whenever the change falls below the policy's
//! `min_delta` and resets to zero otherwise; the policy fires while the
//! counter exceeds its patience. One policy signals early stopping, the
//! other halves the learning rate with a floor.
//!
//! The two policies are evaluated every epoch in a fixed order (stop before
//! decay) and are configured independently: the stock configuration uses
//! `min_delta = 0.01` for stopping and `0.05` for decay even though both
//! policies share the `0.05` definition default.
//!
//! Loss values are taken at face value: non-finite entries flow into the
//! relative-change computation unguarded. Callers who want to police losses
//! can use [`crate::error::validation::validate_finite`] before recording
//! them.

/// Shared default for `min_delta` in both policy definitions
pub const DEFAULT_MIN_DELTA: f64 = 0.05;

/// Learning-rate floor applied by the decay policy
pub const MIN_LEARNING_RATE: f64 = 1e-6;

/// A plateau counter with a relative-change threshold
#[derive(Debug, Clone)]
pub struct PatiencePolicy {
    patience: u32,
    min_delta: f64,
    counter: u32,
}

impl PatiencePolicy {
    pub fn new(patience: u32, min_delta: f64) -> Self {
        PatiencePolicy {
            patience,
            min_delta,
            counter: 0,
        }
    }

    /// Observe the loss history after an epoch and report whether the policy
    /// fires.
    ///
    /// With fewer than two recorded losses the counter resets (treated as
    /// "changed enough").
    pub fn observe(&mut self, hist_loss: &[f64]) -> bool {
        let n = hist_loss.len();
        if n > 1 {
            let prev = hist_loss[n - 2];
            let last = hist_loss[n - 1];
            if (prev - last).abs() / prev < self.min_delta {
                self.counter += 1;
            } else {
                self.counter = 0;
            }
        } else {
            self.counter = 0;
        }
        self.counter > self.patience
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn min_delta(&self) -> f64 {
        self.min_delta
    }

    pub fn reset(&mut self) {
        self.counter = 0;
    }
}

/// The two per-epoch policies of the training loop: early stop and
/// learning-rate decay.
#[derive(Debug, Clone)]
pub struct AdaptiveSchedule {
    stop: PatiencePolicy,
    decay: PatiencePolicy,
    min_lr: f64,
}

impl AdaptiveSchedule {
    pub fn new(stop: PatiencePolicy, decay: PatiencePolicy, min_lr: f64) -> Self {
        AdaptiveSchedule {
            stop,
            decay,
            min_lr,
        }
    }

    /// Whether training should terminate after the current epoch
    pub fn should_stop(&mut self, hist_loss: &[f64]) -> bool {
        self.stop.observe(hist_loss)
    }

    /// The learning rate to use for the next epoch: halved while the decay
    /// policy fires, floored at `min_lr`, otherwise unchanged.
    pub fn decayed_lr(&mut self, hist_loss: &[f64], lr: f64) -> f64 {
        if self.decay.observe(hist_loss) {
            (lr / 2.0).max(self.min_lr)
        } else {
            lr
        }
    }

    pub fn stop_counter(&self) -> u32 {
        self.stop.counter()
    }

    pub fn decay_counter(&self) -> u32 {
        self.decay.counter()
    }
}

impl Default for AdaptiveSchedule {
    fn default() -> Self {
        // Stock thresholds: stop at 0.01, decay at 0.05.
        AdaptiveSchedule::new(
            PatiencePolicy::new(5, 0.01),
            PatiencePolicy::new(3, DEFAULT_MIN_DELTA),
            MIN_LEARNING_RATE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A loss history whose successive relative changes all exceed `delta`
    fn fast_decreasing(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 * 0.5f64.powi(i as i32)).collect()
    }

    #[test]
    fn test_counters_stay_zero_on_fast_progress() {
        let mut schedule = AdaptiveSchedule::default();
        let losses = fast_decreasing(20);

        for k in 1..=losses.len() {
            assert!(!schedule.should_stop(&losses[..k]));
            let lr = schedule.decayed_lr(&losses[..k], 0.01);
            assert_eq!(lr, 0.01);
            assert_eq!(schedule.stop_counter(), 0);
            assert_eq!(schedule.decay_counter(), 0);
        }
    }

    #[test]
    fn test_counter_tracks_consecutive_plateau_epochs() {
        let mut policy = PatiencePolicy::new(10, 0.05);

        // Flat history: every epoch after the first is below threshold.
        let losses: Vec<f64> = vec![1.0; 8];
        for k in 1..=losses.len() {
            policy.observe(&losses[..k]);
            assert_eq!(policy.counter(), (k - 1) as u32);
        }
    }

    #[test]
    fn test_counter_resets_on_large_move() {
        let mut policy = PatiencePolicy::new(10, 0.05);

        let mut losses = vec![1.0, 1.0, 1.0, 1.0];
        for k in 1..=losses.len() {
            policy.observe(&losses[..k]);
        }
        assert_eq!(policy.counter(), 3);

        // A 50% drop is far above threshold: counter goes back to zero.
        losses.push(0.5);
        policy.observe(&losses);
        assert_eq!(policy.counter(), 0);
    }

    #[test]
    fn test_single_observation_is_noop() {
        let mut policy = PatiencePolicy::new(0, 0.05);
        assert!(!policy.observe(&[1.0]));
        assert_eq!(policy.counter(), 0);
    }

    #[test]
    fn test_early_stop_fires_after_patience_exceeded() {
        let mut schedule = AdaptiveSchedule::default();

        // Stop patience is 5: the sixth consecutive plateau epoch fires.
        let losses: Vec<f64> = vec![1.0; 8];
        let mut fired_at = None;
        for k in 1..=losses.len() {
            if schedule.should_stop(&losses[..k]) {
                fired_at = Some(k);
                break;
            }
        }
        assert_eq!(fired_at, Some(7)); // first plateau at k = 2, sixth at k = 7
    }

    #[test]
    fn test_lr_floor_under_repeated_decay() {
        let mut schedule = AdaptiveSchedule::default();
        let losses: Vec<f64> = vec![1.0; 100];

        let mut lr = 0.01;
        for k in 1..=losses.len() {
            lr = schedule.decayed_lr(&losses[..k], lr);
            assert!(lr >= MIN_LEARNING_RATE);
        }
        assert_eq!(lr, MIN_LEARNING_RATE);
    }

    #[test]
    fn test_thresholds_are_independent() {
        let mut schedule = AdaptiveSchedule::default();

        // Relative change of 3% per epoch: below the decay threshold (5%),
        // above the stop threshold (1%).
        let mut losses = vec![1.0];
        for _ in 0..20 {
            losses.push(losses.last().unwrap() * 0.97);
        }

        let mut stopped = false;
        let mut lr = 0.01;
        for k in 1..=losses.len() {
            stopped = stopped || schedule.should_stop(&losses[..k]);
            lr = schedule.decayed_lr(&losses[..k], lr);
        }
        assert!(!stopped, "3% moves must not trigger the 1% stop policy");
        assert!(lr < 0.01, "3% moves must trigger the 5% decay policy");
    }

    #[test]
    fn test_decay_keeps_halving_while_plateaued() {
        let mut schedule = AdaptiveSchedule::default();
        let losses: Vec<f64> = vec![1.0; 7];

        let mut lr = 0.01;
        let mut rates = Vec::new();
        for k in 1..=losses.len() {
            lr = schedule.decayed_lr(&losses[..k], lr);
            rates.push(lr);
        }
        // Decay patience is 3: fires from the fourth plateau epoch (k = 5)
        // and keeps halving afterwards.
        assert_eq!(rates, vec![0.01, 0.01, 0.01, 0.01, 0.005, 0.0025, 0.00125]);
    }
}
