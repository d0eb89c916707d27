// src/net.rs
//! Feed-Forward Control Approximator
//!
//! Maps a `(batch, dimx + 2)` feature matrix `[state, time, value]` to a
//! `(batch, dimz)` control matrix. The stack is a batch-normalization layer
//! over the input statistics, `4 + ⌊ln(dimz)⌋` dense layers of width
//! `dimz + 20` with ELU activation, and a linear projection to `dimz`; the
//! output is divided by `dimz`.
//!
//! The module is a stateless transform of its trainable parameters: all
//! weights live in the [`candle_nn::VarMap`] supplied at construction.

use candle_core::{Result as CandleResult, Tensor};
use candle_nn::{
    batch_norm, linear, BatchNorm, BatchNormConfig, Linear, Module, ModuleT, VarBuilder,
};

pub struct ControlNet {
    bn: BatchNorm,
    hidden: Vec<Linear>,
    out: Linear,
    dimz: usize,
}

impl ControlNet {
    /// Number of hidden layers for a control of width `dimz`
    pub fn depth(dimz: usize) -> usize {
        4 + (dimz as f64).ln().floor() as usize
    }

    pub fn new(dimx: usize, dimz: usize, vb: VarBuilder) -> CandleResult<Self> {
        let n_inputs = dimx + 2; // [x, t, y]
        let n_nodes = dimz + 20;

        let bn = batch_norm(n_inputs, BatchNormConfig::default(), vb.pp("bn"))?;

        let depth = Self::depth(dimz);
        let mut hidden = Vec::with_capacity(depth);
        let mut width = n_inputs;
        for i in 0..depth {
            hidden.push(linear(width, n_nodes, vb.pp(format!("dense{}", i)))?);
            width = n_nodes;
        }
        let out = linear(width, dimz, vb.pp("out"))?;

        Ok(ControlNet {
            bn,
            hidden,
            out,
            dimz,
        })
    }

    /// Batch transform `(batch, dimx + 2) -> (batch, dimz)`.
    ///
    /// `train` selects batch statistics (training) or running statistics
    /// (evaluation) in the normalization layer.
    pub fn forward(&self, features: &Tensor, train: bool) -> CandleResult<Tensor> {
        let mut h = self.bn.forward_t(features, train)?;
        for layer in &self.hidden {
            h = layer.forward(&h)?.elu(1.0)?;
        }
        let z = self.out.forward(&h)?;
        z * (1.0 / self.dimz as f64)
    }
}
