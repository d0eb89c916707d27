// src/solver/deep_bsde.rs
//! Deep BSDE Time-Stepper
//!
//! # Mathematical Framework
//!
//! For a forward-backward SDE system
//! ```text
//! X_{t+1} = F(X_t, ΔW_t)
//! Y_{t+1} = G(t, X_t, Y_t, Z_t, ΔW_t)
//! ```
//! the solver learns the initial value `y0`, the initial control `z0` and the
//! control function `z_t = N(X_t, t, Y_t)` (a feed-forward approximator) by
//! propagating a batch of noise samples through the discrete recursion and
//! training against the terminal condition.
//!
//! # Update Order
//!
//! The value and control updates are staggered by one step: the state is
//! advanced with the noise increment that was already consumed by the
//! preceding value update, so every control decision is adapted to the
//! information available at its own time index. Concretely, for
//! `t = 1 .. N-1`:
//! ```text
//! x_t   = F(x_{t-1}, ΔW_{t-1})          (reuses the previous increment)
//! z_t   = N(x_t, t·Δt, y_t)
//! y_{t+1} = G(t·Δt, x_t, y_t, z_t, ΔW_t)
//! ```
//! and the terminal state advance happens after the final value update
//! without recomputing a control.

use crate::equation::Equation;
use crate::error::{BsdeError, BsdeResult};
use crate::net::ControlNet;
use bitflags::bitflags;
use candle_core::{DType, Device, IndexOp, Tensor, Var};
use candle_nn::{VarBuilder, VarMap};
use ndarray::Array2;

bitflags! {
    /// Selects which per-step series a forward pass materializes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordFlags: u32 {
        const NONE    = 0;
        const STATE   = 1 << 0;
        const VALUE   = 1 << 1;
        const CONTROL = 1 << 2;
        const POLICY  = 1 << 3;
        const TIME    = 1 << 4;
        const TRAJECTORY = Self::STATE.bits()
            | Self::VALUE.bits()
            | Self::CONTROL.bits()
            | Self::POLICY.bits()
            | Self::TIME.bits();
    }
}

/// Mode switches for the solver
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Express the control against the state gradient (`dimz = dimx`) rather
    /// than against the noise (`dimz = dimw`)
    pub zdx: bool,
    /// Train `z0` as an independent parameter instead of computing it from
    /// the zero-time features each pass
    pub separate_z0: bool,
    /// Lower clamp bound on the effective control
    pub lb: Option<f64>,
    /// Upper clamp bound on the effective control
    pub ub: Option<f64>,
}

impl Default for SolverOptions {
    fn default() -> Self {
        SolverOptions {
            zdx: true,
            separate_z0: true,
            lb: None,
            ub: None,
        }
    }
}

/// Per-step batch means recorded during a diagnostic forward pass.
///
/// For `N` time intervals: `states`, `values` and `times` hold `N + 1`
/// entries, `controls` and `policies` hold `N`.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub states: Vec<Vec<f32>>,
    pub values: Vec<f32>,
    pub controls: Vec<Vec<f32>>,
    pub policies: Vec<Vec<f32>>,
    pub times: Vec<f32>,
}

/// Result of one forward pass
pub struct ForwardPass {
    /// Terminal value `(batch, 1)`
    pub value: Tensor,
    /// Terminal state `(batch, dimx)`
    pub state: Tensor,
    /// Last computed control `(batch, dimz)`
    pub control: Tensor,
    /// Recorded series, present when recording was requested
    pub trajectory: Option<Trajectory>,
}

/// The trainable deep BSDE model: initial value, initial control and the
/// control network, plus the recursion that ties them to an [`Equation`].
pub struct DeepBsde<E: Equation> {
    bsde: E,
    dimw: usize,
    dimx: usize,
    dimz: usize,
    num_time_interval: usize,
    total_time: f64,
    delta_t: f64,
    zdx: bool,
    separate_z0: bool,
    lb: Option<f64>,
    ub: Option<f64>,
    x0: Tensor,
    y0: Var,
    z0: Var,
    net: ControlNet,
    varmap: VarMap,
    device: Device,
}

impl<E: Equation> DeepBsde<E> {
    pub fn new(bsde: E, y0_init: f64, options: SolverOptions) -> BsdeResult<Self> {
        let device = Device::Cpu;
        let dimw = bsde.dim();
        let dimx = bsde.dimx();
        let num_time_interval = bsde.num_time_interval();
        let total_time = bsde.total_time();
        let delta_t = bsde.delta_t();
        let dimz = if options.zdx { dimx } else { dimw };

        if bsde.x_init().len() != dimx {
            return Err(BsdeError::InvalidConfiguration {
                field: "x_init".to_string(),
                reason: format!(
                    "expected {} components, got {}",
                    dimx,
                    bsde.x_init().len()
                ),
            });
        }

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let net = ControlNet::new(dimx, dimz, vb.pp("control_net"))?;

        let x0 = Tensor::from_vec(bsde.x_init().to_vec(), (1, dimx), &device)?;
        let y0 = Var::from_tensor(&Tensor::full(y0_init as f32, (1, 1), &device)?)?;
        let z0 = Var::from_tensor(&Tensor::zeros((1, dimz), DType::F32, &device)?)?;

        Ok(DeepBsde {
            bsde,
            dimw,
            dimx,
            dimz,
            num_time_interval,
            total_time,
            delta_t,
            zdx: options.zdx,
            separate_z0: options.separate_z0,
            lb: options.lb,
            ub: options.ub,
            x0,
            y0,
            z0,
            net,
            varmap,
            device,
        })
    }

    pub fn equation(&self) -> &E {
        &self.bsde
    }

    pub fn dimw(&self) -> usize {
        self.dimw
    }

    pub fn dimx(&self) -> usize {
        self.dimx
    }

    pub fn dimz(&self) -> usize {
        self.dimz
    }

    pub fn num_time_interval(&self) -> usize {
        self.num_time_interval
    }

    pub fn zdx(&self) -> bool {
        self.zdx
    }

    pub fn separate_z0(&self) -> bool {
        self.separate_z0
    }

    pub fn x0_tensor(&self) -> &Tensor {
        &self.x0
    }

    pub fn x0_vec(&self) -> BsdeResult<Vec<f32>> {
        Ok(self.x0.flatten_all()?.to_vec1::<f32>()?)
    }

    pub fn z0_tensor(&self) -> &Tensor {
        self.z0.as_tensor()
    }

    /// Current scalar value of the trained `y0`
    pub fn y0_value(&self) -> BsdeResult<f32> {
        Ok(self.y0.as_tensor().flatten_all()?.to_vec1::<f32>()?[0])
    }

    /// Current components of the raw `z0` parameter
    pub fn z0_value(&self) -> BsdeResult<Vec<f32>> {
        Ok(self.z0.as_tensor().flatten_all()?.to_vec1::<f32>()?)
    }

    /// All parameters subject to gradient updates: the control network,
    /// `y0`, and `z0` when it is a separate parameter.
    pub fn trainable_vars(&self) -> Vec<Var> {
        let mut vars = self.varmap.all_vars();
        vars.push(self.y0.clone());
        if self.separate_z0 {
            vars.push(self.z0.clone());
        }
        vars
    }

    fn batch_mean_rows(t: &Tensor) -> BsdeResult<Vec<f32>> {
        Ok(t.mean(0)?.flatten_all()?.to_vec1::<f32>()?)
    }

    fn batch_mean_scalar(t: &Tensor) -> BsdeResult<f32> {
        Ok(t.mean_all()?.to_scalar::<f32>()?)
    }

    /// Run the time-stepping recursion on one noise batch.
    ///
    /// `inputs` holds one Brownian-increment sample per row, laid out as
    /// `(batch, dimw * num_time_interval)`. `train` selects the
    /// normalization statistics of the control net; `record` selects the
    /// per-step series to materialize (means over the batch).
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the noise batch cannot be laid out as
    /// `(batch, dimw, num_time_interval)`.
    pub fn forward(
        &self,
        inputs: &Array2<f32>,
        train: bool,
        record: RecordFlags,
    ) -> BsdeResult<ForwardPass> {
        let (batch, width) = inputs.dim();
        if width != self.dimw * self.num_time_interval {
            return Err(BsdeError::ShapeMismatch {
                expected: format!("({}, {}, {})", batch, self.dimw, self.num_time_interval),
                actual: format!("({}, {})", batch, width),
                context: "noise sample".to_string(),
            });
        }

        let data: Vec<f32> = inputs.iter().copied().collect();
        let dw_sample = Tensor::from_vec(
            data,
            (batch, self.dimw, self.num_time_interval),
            &self.device,
        )?;

        let mut traj = if record.is_empty() {
            None
        } else {
            Some(Trajectory::default())
        };

        // t = 0: broadcast the initial state/value, resolve the initial control.
        let mut x = self.x0.expand((batch, self.dimx))?;
        let mut y = self.y0.as_tensor().expand((batch, 1))?;
        let mut z = if self.separate_z0 {
            self.z0.as_tensor().expand((batch, self.dimz))?.contiguous()?
        } else {
            let t0 = Tensor::zeros((batch, 1), DType::F32, &self.device)?;
            let features = Tensor::cat(&[&x, &t0, &y], 1)?;
            let z = self.net.forward(&features, train)?;
            // Diagnostic snapshot of the first row; not a gradient path.
            self.z0.set(&z.i(0..1)?)?;
            z
        };

        let mut dw = dw_sample.i((.., .., 0))?.contiguous()?;

        if let Some(traj) = traj.as_mut() {
            if record.contains(RecordFlags::STATE) {
                traj.states.push(Self::batch_mean_rows(&x)?);
            }
            if record.contains(RecordFlags::VALUE) {
                traj.values.push(Self::batch_mean_scalar(&y)?);
            }
            if record.contains(RecordFlags::CONTROL) {
                traj.controls.push(Self::batch_mean_rows(&z)?);
            }
            if record.contains(RecordFlags::TIME) {
                traj.times.push(0.0);
            }
        }

        let time0 = Tensor::zeros((batch, 1), DType::F32, &self.device)?;
        let (y_next, pi) = self
            .bsde
            .next_y(&time0, &x, &y, &z, &dw, self.lb, self.ub, self.zdx)?;
        y = y_next;

        if let Some(traj) = traj.as_mut() {
            if record.contains(RecordFlags::VALUE) {
                traj.values.push(Self::batch_mean_scalar(&y)?);
            }
            if record.contains(RecordFlags::POLICY) {
                traj.policies.push(Self::batch_mean_rows(&pi)?);
            }
        }

        // Iterate forward. The state advances with the increment the value
        // update just consumed, then the control is refreshed.
        for t in 1..self.num_time_interval {
            let t_val = t as f64 * self.delta_t;
            let time = Tensor::full(t_val as f32, (batch, 1), &self.device)?;

            x = self.bsde.next_x(&x, &dw)?;
            let features = Tensor::cat(&[&x, &time, &y], 1)?;
            z = self.net.forward(&features, train)?;
            dw = dw_sample.i((.., .., t))?.contiguous()?;
            let (y_next, pi) = self
                .bsde
                .next_y(&time, &x, &y, &z, &dw, self.lb, self.ub, self.zdx)?;
            y = y_next;

            if let Some(traj) = traj.as_mut() {
                if record.contains(RecordFlags::STATE) {
                    traj.states.push(Self::batch_mean_rows(&x)?);
                }
                if record.contains(RecordFlags::VALUE) {
                    traj.values.push(Self::batch_mean_scalar(&y)?);
                }
                if record.contains(RecordFlags::CONTROL) {
                    traj.controls.push(Self::batch_mean_rows(&z)?);
                }
                if record.contains(RecordFlags::POLICY) {
                    traj.policies.push(Self::batch_mean_rows(&pi)?);
                }
                if record.contains(RecordFlags::TIME) {
                    traj.times.push(t_val as f32);
                }
            }
        }

        // Terminal state advance; no further control is computed.
        x = self.bsde.next_x(&x, &dw)?;
        if let Some(traj) = traj.as_mut() {
            if record.contains(RecordFlags::STATE) {
                traj.states.push(Self::batch_mean_rows(&x)?);
            }
            if record.contains(RecordFlags::TIME) {
                traj.times.push(self.total_time as f32);
            }
        }

        Ok(ForwardPass {
            value: y,
            state: x,
            control: z,
            trajectory: traj,
        })
    }
}
