// src/train/trainer.rs
//! Minibatch Training Loop
//!
//! Drives gradient updates of the solver's trainable parameters against the
//! terminal-condition loss
//! ```text
//! L = E[(g(0, Y_N) - Y_N)²]
//! ```
//! and orchestrates epochs: train batches, test batches, the per-epoch
//! history record, and the patience-based stop/decay policies.

use crate::equation::Equation;
use crate::error::BsdeResult;
use crate::math_utils::{RunningMean, Timer};
use crate::solver::{AdaptiveSchedule, DeepBsde, PatiencePolicy, RecordFlags, Trajectory};
use crate::train::history::{EpochRecord, RunHistory};
use candle_nn::{loss, AdamW, Optimizer, ParamsAdamW};
use ndarray::Array2;

/// Training-loop configuration.
///
/// The stop and decay thresholds intentionally differ (`0.01` vs `0.05`);
/// both are independently tunable.
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    pub learning_rate: f64,
    pub stop_patience: u32,
    pub stop_min_delta: f64,
    pub decay_patience: u32,
    pub decay_min_delta: f64,
    pub min_learning_rate: f64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        TrainerOptions {
            learning_rate: 0.01,
            stop_patience: 5,
            stop_min_delta: 0.01,
            decay_patience: 3,
            decay_min_delta: 0.05,
            min_learning_rate: 1e-6,
        }
    }
}

/// Owns a [`DeepBsde`] model, its optimizer and the schedule controller.
pub struct Trainer<E: Equation> {
    model: DeepBsde<E>,
    optimizer: AdamW,
    lr: f64,
    schedule: AdaptiveSchedule,
    train_loss: RunningMean,
    test_loss: RunningMean,
    use_fast_transform: bool,
    last_trajectory: Option<Trajectory>,
}

impl<E: Equation> Trainer<E> {
    pub fn new(model: DeepBsde<E>, options: TrainerOptions) -> BsdeResult<Self> {
        // Weight decay 0 turns AdamW into plain Adam.
        let params = ParamsAdamW {
            lr: options.learning_rate,
            weight_decay: 0.0,
            ..Default::default()
        };
        let optimizer = AdamW::new(model.trainable_vars(), params)?;

        // Capability check for the diagnostic control transform, resolved
        // once instead of probing per epoch.
        let use_fast_transform = model.equation().supports_control_transform();

        let schedule = AdaptiveSchedule::new(
            PatiencePolicy::new(options.stop_patience, options.stop_min_delta),
            PatiencePolicy::new(options.decay_patience, options.decay_min_delta),
            options.min_learning_rate,
        );

        Ok(Trainer {
            model,
            optimizer,
            lr: options.learning_rate,
            schedule,
            train_loss: RunningMean::new(),
            test_loss: RunningMean::new(),
            use_fast_transform,
            last_trajectory: None,
        })
    }

    pub fn model(&self) -> &DeepBsde<E> {
        &self.model
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    /// Trajectory recorded by the most recent test step
    pub fn last_trajectory(&self) -> Option<&Trajectory> {
        self.last_trajectory.as_ref()
    }

    /// One gradient step on a training batch; returns the batch loss.
    pub fn train_step(&mut self, batch: &Array2<f32>) -> BsdeResult<f64> {
        let pass = self.model.forward(batch, true, RecordFlags::NONE)?;
        let target = self.model.equation().g_tf(0.0, &pass.value)?;
        let loss = loss::mse(&pass.value, &target)?;
        self.optimizer.backward_step(&loss)?;

        let scalar = loss.to_scalar::<f32>()? as f64;
        self.train_loss.update(scalar);
        Ok(scalar)
    }

    /// Evaluation pass on a test batch: same forward and loss, trajectory
    /// recording enabled, no parameter updates.
    pub fn test_step(&mut self, batch: &Array2<f32>) -> BsdeResult<f64> {
        let pass = self.model.forward(batch, false, RecordFlags::TRAJECTORY)?;
        let target = self.model.equation().g_tf(0.0, &pass.value)?;
        let loss = loss::mse(&pass.value, &target)?;

        let scalar = loss.to_scalar::<f32>()? as f64;
        self.test_loss.update(scalar);
        self.last_trajectory = pass.trajectory;
        Ok(scalar)
    }

    /// The initial control in observable coordinates.
    ///
    /// When the control is expressed against the state gradient, `z0` is
    /// mapped through the diffusion coefficient at `x0`; the equation's fast
    /// transform is used when available, a dense mat-mul otherwise.
    pub fn converted_z0(&self) -> BsdeResult<Vec<f32>> {
        let z0 = self.model.z0_tensor();
        if self.model.zdx() && self.model.dimz() == self.model.dimx() {
            let sigma = self.model.equation().sigma_x(self.model.x0_tensor())?;
            let converted = if self.use_fast_transform {
                self.model.equation().z_t_matmul_sigma_x(z0, &sigma)?
            } else {
                z0.matmul(&sigma)?
            };
            Ok(converted.flatten_all()?.to_vec1::<f32>()?)
        } else {
            Ok(z0.flatten_all()?.to_vec1::<f32>()?)
        }
    }

    /// Run the full training loop.
    ///
    /// Per epoch: every training batch, then every test batch, one history
    /// record, the early-stop check, then the learning-rate decay check.
    /// Terminates when the stop policy fires or `epochs` are exhausted.
    ///
    /// # Errors
    ///
    /// Any computational error (shape mismatch, backend failure) aborts the
    /// loop and propagates; no retries.
    pub fn fit(
        &mut self,
        train_ds: &[Array2<f32>],
        test_ds: &[Array2<f32>],
        epochs: usize,
    ) -> BsdeResult<RunHistory> {
        let timer = Timer::new();
        let mut history = RunHistory::new(
            self.model.x0_vec()?,
            self.model.equation().total_time(),
            self.model.equation().num_time_interval(),
            self.model.equation().psi(),
            self.model.equation().gamma(),
        );
        let mut hist_loss: Vec<f64> = Vec::new();

        for epoch in 0..epochs {
            for batch in train_ds {
                self.train_step(batch)?;
            }
            for batch in test_ds {
                self.test_step(batch)?;
            }

            let elapsed = timer.elapsed_secs();
            let test_loss = self.test_loss.result();
            hist_loss.push(test_loss);

            let y0 = self.model.y0_value()?;
            let z0 = self.converted_z0()?;

            log::info!(
                "Epoch: {} Elapsed time: {:.2}s y0: {:.6} z0: {:?} Test loss: {:.6e} lr: {:.2e}",
                epoch + 1,
                elapsed,
                y0,
                z0,
                test_loss,
                self.lr
            );

            history.push(EpochRecord {
                epoch: epoch + 1,
                elapsed_secs: elapsed,
                y0,
                z0,
                test_loss,
                learning_rate: self.lr,
            });

            if self.schedule.should_stop(&hist_loss) {
                log::info!("Early stopping at plateau");
                break;
            }
            let new_lr = self.schedule.decayed_lr(&hist_loss, self.lr);
            if new_lr != self.lr {
                self.lr = new_lr;
                self.optimizer.set_learning_rate(new_lr);
            }

            self.train_loss.reset();
            self.test_loss.reset();
        }

        Ok(history)
    }
}
