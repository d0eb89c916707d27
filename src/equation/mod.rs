// src/equation/mod.rs
//! Problem definitions consumed by the solver.
//!
//! An [`Equation`] supplies the forward state dynamics, the backward value
//! update and the terminal condition of a forward-backward SDE system. The
//! solver treats it as an opaque collaborator: it reads the static constants
//! once at construction and calls the transition functions inside the
//! time-stepping recursion.

use crate::error::{BsdeError, BsdeResult};
use candle_core::Tensor;

pub mod diffusion;
pub mod merton;

pub use diffusion::PureDiffusion;
pub use merton::{MertonMarket, MertonParams};

/// A forward-backward SDE problem.
///
/// All batch-valued operations take and return rank-2 `f32` tensors with the
/// batch on dimension 0.
pub trait Equation {
    /// Dimension of the driving Brownian motion
    fn dim(&self) -> usize;

    /// Dimension of the forward state process
    fn dimx(&self) -> usize;

    /// Number of discrete time intervals over `[0, total_time]`
    fn num_time_interval(&self) -> usize;

    /// Time horizon T
    fn total_time(&self) -> f64;

    /// Step size of the uniform time grid
    fn delta_t(&self) -> f64 {
        self.total_time() / self.num_time_interval() as f64
    }

    /// Initial state vector, length `dimx`
    fn x_init(&self) -> &[f32];

    /// Problem constant ψ, captured once into the run history
    fn psi(&self) -> f64;

    /// Problem constant γ, captured once into the run history
    fn gamma(&self) -> f64;

    /// One forward step of the state process.
    ///
    /// `x`: `(batch, dimx)`, `dw`: `(batch, dimw)`; returns `(batch, dimx)`.
    fn next_x(&self, x: &Tensor, dw: &Tensor) -> BsdeResult<Tensor>;

    /// One backward step of the value process.
    ///
    /// Consumes the current time `(batch, 1)`, state, value `(batch, 1)`,
    /// control `(batch, dimz)` and noise increment, with optional elementwise
    /// clamp bounds on the effective control. `zdx` selects whether the
    /// control is expressed against the state gradient (`dimz = dimx`) or
    /// directly against the noise (`dimz = dimw`).
    ///
    /// Returns the next value `(batch, 1)` and the policy proxy `pi`.
    #[allow(clippy::too_many_arguments)]
    fn next_y(
        &self,
        time: &Tensor,
        x: &Tensor,
        y: &Tensor,
        z: &Tensor,
        dw: &Tensor,
        lb: Option<f64>,
        ub: Option<f64>,
        zdx: bool,
    ) -> BsdeResult<(Tensor, Tensor)>;

    /// Terminal condition: maps a predicted terminal value `(batch, 1)` to
    /// the loss target `(batch, 1)`.
    fn g_tf(&self, time: f64, y: &Tensor) -> BsdeResult<Tensor>;

    /// Diffusion coefficient at `x`, shape `(dimx, dimw)`.
    ///
    /// Only used for the diagnostic conversion of the initial control into
    /// noise coordinates.
    fn sigma_x(&self, x: &Tensor) -> BsdeResult<Tensor>;

    /// Whether [`Equation::z_t_matmul_sigma_x`] is implemented.
    ///
    /// Resolved once when a trainer is constructed; callers fall back to a
    /// dense mat-mul when this returns `false`.
    fn supports_control_transform(&self) -> bool {
        false
    }

    /// Problem-specific fast path for `z0ᵀ · σ_x`.
    ///
    /// `z`: `(1, dimx)`, `sigma_x`: `(dimx, dimw)`; returns `(1, dimw)`.
    fn z_t_matmul_sigma_x(&self, _z: &Tensor, _sigma_x: &Tensor) -> BsdeResult<Tensor> {
        Err(BsdeError::UnsupportedOperation {
            operation: "z_t_matmul_sigma_x".to_string(),
            context: "equation does not provide a control transform".to_string(),
        })
    }
}
