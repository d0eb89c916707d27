// src/equation/diffusion.rs
//! Pure-Diffusion Replication Problem
//!
//! The simplest forward-backward system the solver accepts: the state is a
//! driftless unit-diffusion random walk and the value is the running gain of
//! the control against the same increments,
//! ```text
//! X_{t+1} = X_t + ΔW_t
//! Y_{t+1} = Y_t + Z_t·ΔW_t
//! ```
//! with identity terminal condition. With zero noise the terminal value is
//! exactly the initial value, whatever the controls — which makes this model
//! the reference fixture for exercising the recursion itself.

use super::Equation;
use crate::error::{validation::*, BsdeResult};
use candle_core::{DType, Tensor};

pub struct PureDiffusion {
    dimx: usize,
    num_time_interval: usize,
    total_time: f64,
    x0: Vec<f32>,
}

impl PureDiffusion {
    pub fn new(dimx: usize, num_time_interval: usize, total_time: f64) -> BsdeResult<Self> {
        validate_positive("dimx", dimx as f64)?;
        validate_intervals(num_time_interval)?;
        validate_positive("total_time", total_time)?;
        Ok(PureDiffusion {
            dimx,
            num_time_interval,
            total_time,
            x0: vec![0.0; dimx],
        })
    }
}

impl Equation for PureDiffusion {
    fn dim(&self) -> usize {
        self.dimx
    }

    fn dimx(&self) -> usize {
        self.dimx
    }

    fn num_time_interval(&self) -> usize {
        self.num_time_interval
    }

    fn total_time(&self) -> f64 {
        self.total_time
    }

    fn x_init(&self) -> &[f32] {
        &self.x0
    }

    fn psi(&self) -> f64 {
        0.0
    }

    fn gamma(&self) -> f64 {
        0.0
    }

    fn next_x(&self, x: &Tensor, dw: &Tensor) -> BsdeResult<Tensor> {
        Ok(x.add(dw)?)
    }

    fn next_y(
        &self,
        _time: &Tensor,
        _x: &Tensor,
        y: &Tensor,
        z: &Tensor,
        dw: &Tensor,
        lb: Option<f64>,
        ub: Option<f64>,
        _zdx: bool, // state and noise coordinates coincide under unit diffusion
    ) -> BsdeResult<(Tensor, Tensor)> {
        let zeta = match (lb, ub) {
            (None, None) => z.clone(),
            (lo, hi) => z.clamp(
                lo.unwrap_or(f64::NEG_INFINITY),
                hi.unwrap_or(f64::INFINITY),
            )?,
        };
        let gain = (&zeta * dw)?.sum_keepdim(1)?;
        let y_next = y.add(&gain)?;
        Ok((y_next, zeta))
    }

    fn g_tf(&self, _time: f64, y: &Tensor) -> BsdeResult<Tensor> {
        Ok(y.clone())
    }

    fn sigma_x(&self, _x: &Tensor) -> BsdeResult<Tensor> {
        Ok(Tensor::eye(self.dimx, DType::F32, &candle_core::Device::Cpu)?)
    }
}
