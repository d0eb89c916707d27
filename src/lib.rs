//! # deep-bsde: Deep-Learning BSDE Solver for Stochastic Control
//!
//! A Rust library for solving backward stochastic differential equations
//! (BSDEs) arising from stochastic optimal-control problems — dynamic
//! portfolio optimization in particular — with a deep time-stepping scheme.
//!
//! ## Key Features
//!
//! - **Deep BSDE recursion**: forward propagation of (state, value, control)
//!   triples over a discrete time grid, with the exact staggered update
//!   order the scheme requires
//! - **Trainable initial conditions**: the initial value `y0` and initial
//!   control `z0` are learned jointly with the control network
//! - **Adaptive training**: independent patience policies for early stopping
//!   and learning-rate decay over the per-epoch loss trace
//! - **Reproducible sampling**: seeded, parallel Brownian-increment batches
//! - **Pluggable problems**: any type implementing [`Equation`] supplies the
//!   dynamics, the value update and the terminal condition
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deep_bsde::equation::{MertonMarket, MertonParams};
//! use deep_bsde::rng::NoiseSampler;
//! use deep_bsde::solver::{DeepBsde, SolverOptions};
//! use deep_bsde::train::{Trainer, TrainerOptions};
//!
//! let market = MertonMarket::new(MertonParams::default()).unwrap();
//! let sampler = NoiseSampler::new(
//!     2,                 // noise dimension
//!     20,                // time intervals
//!     0.05,              // delta t
//!     42,                // seed
//! ).unwrap();
//!
//! let model = DeepBsde::new(market, 1.0, SolverOptions::default()).unwrap();
//! let mut trainer = Trainer::new(model, TrainerOptions::default()).unwrap();
//!
//! let train_ds = sampler.sample_dataset(8, 256, 0).unwrap();
//! let test_ds = sampler.sample_dataset(2, 256, 100).unwrap();
//! let history = trainer.fit(&train_ds, &test_ds, 50).unwrap();
//! println!("learned y0: {:?}", history.final_y0());
//! ```
//!
//! ## Mathematical Foundation
//!
//! The solver discretizes a forward-backward SDE system on a uniform grid
//! and treats the backward component's initial value and control function as
//! learnable: a feed-forward network maps `(state, time, value)` to the
//! control at each step, and all parameters are trained by stochastic
//! gradient descent on the squared terminal-condition residual.

// Module declarations
pub mod analytics;
pub mod equation;
pub mod error;
pub mod math_utils;
pub mod net;
pub mod output;
pub mod rng;
pub mod solver;
pub mod train;

// Re-export commonly used types for convenience
pub use equation::Equation;
pub use error::{BsdeError, BsdeResult};
pub use solver::{DeepBsde, RecordFlags, SolverOptions, Trajectory};
pub use train::{RunHistory, Trainer, TrainerOptions};
