// src/train/history.rs
use chrono::{DateTime, Utc};

/// One row of the run history, appended after every completed epoch
#[derive(Debug, Clone)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Wall-clock seconds since training started
    pub elapsed_secs: f64,
    /// Current trained initial value
    pub y0: f32,
    /// Initial control converted to observable coordinates
    pub z0: Vec<f32>,
    pub test_loss: f64,
    pub learning_rate: f64,
}

/// Accumulating record of one training run.
///
/// The static problem parameters are captured once at the start; one
/// [`EpochRecord`] is appended per epoch and never removed.
#[derive(Debug, Clone)]
pub struct RunHistory {
    pub x0: Vec<f32>,
    pub total_time: f64,
    pub num_time_interval: usize,
    pub psi: f64,
    pub gamma: f64,
    pub started_at: DateTime<Utc>,
    pub epochs: Vec<EpochRecord>,
}

impl RunHistory {
    pub fn new(
        x0: Vec<f32>,
        total_time: f64,
        num_time_interval: usize,
        psi: f64,
        gamma: f64,
    ) -> Self {
        RunHistory {
            x0,
            total_time,
            num_time_interval,
            psi,
            gamma,
            started_at: Utc::now(),
            epochs: Vec::new(),
        }
    }

    pub fn push(&mut self, record: EpochRecord) {
        self.epochs.push(record);
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn final_y0(&self) -> Option<f32> {
        self.epochs.last().map(|r| r.y0)
    }

    pub fn final_loss(&self) -> Option<f64> {
        self.epochs.last().map(|r| r.test_loss)
    }

    pub fn final_learning_rate(&self) -> Option<f64> {
        self.epochs.last().map(|r| r.learning_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_accumulates() {
        let mut history = RunHistory::new(vec![0.0, 0.0], 1.0, 20, 0.03, 1.0);
        assert!(history.is_empty());
        assert_eq!(history.final_loss(), None);

        for epoch in 1..=3 {
            history.push(EpochRecord {
                epoch,
                elapsed_secs: epoch as f64,
                y0: epoch as f32,
                z0: vec![0.0, 0.0],
                test_loss: 1.0 / epoch as f64,
                learning_rate: 0.01,
            });
        }

        assert_eq!(history.len(), 3);
        assert_eq!(history.final_y0(), Some(3.0));
        assert_eq!(history.final_loss(), Some(1.0 / 3.0));
        assert_eq!(history.num_time_interval, 20);
    }
}
