// src/solver/mod.rs
pub mod deep_bsde;
pub mod schedule;

pub use deep_bsde::{DeepBsde, ForwardPass, RecordFlags, SolverOptions, Trajectory};
pub use schedule::{AdaptiveSchedule, PatiencePolicy};
