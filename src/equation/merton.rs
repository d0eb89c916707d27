// src/equation/merton.rs
//! Merton-Style Terminal-Wealth Tracking Problem
//!
//! # Mathematical Framework
//!
//! A market of `d` correlated log-normal assets with constant coefficients:
//! ```text
//! dX_t = (μ - ½ diag(Σ)) dt + L dW_t        (log-prices, Σ = L Lᵀ)
//! ```
//!
//! Wealth is controlled through the exposure vector ζ (dollar exposure in
//! noise coordinates):
//! ```text
//! dY_t = [r Y_t + ζ_t·θ] dt + ζ_t·dW_t,     θ = L⁻¹(μ - r𝟙)
//! ```
//!
//! The investor tracks the terminal target `c = w₀ e^{ψT}`; the terminal
//! condition is the risk-tolerance relaxation
//! ```text
//! g(y) = y + (c - y)/γ
//! ```
//! so the training loss `E[(g(Y_T) - Y_T)²] = E[(c - Y_T)²]/γ²` is the
//! γ-scaled tracking error. In a complete market the optimum is the riskless
//! replication `Y_0 = c e^{-rT}`, ζ ≡ 0 (see `analytics::merton_analytic`).
//!
//! # Control Coordinates
//!
//! With `zdx` enabled the learned control is expressed against the state
//! gradient (`dimz = dimx`) and converted to noise coordinates through the
//! constant diffusion factor, `ζ = z L`; otherwise the control already lives
//! in noise coordinates (`dimz = dimw`).

use super::Equation;
use crate::error::{validation::*, BsdeError, BsdeResult};
use candle_core::{Device, Tensor};
use nalgebra::DMatrix;

#[derive(Clone, Debug)]
pub struct MertonParams {
    pub w0: f64,          // Initial wealth
    pub r: f64,           // Risk-free rate
    pub mu: Vec<f64>,     // Asset drifts
    pub sigma: Vec<f64>,  // Asset volatilities
    pub rho: f64,         // Common pairwise correlation
    pub psi: f64,         // Target log-growth rate of wealth
    pub gamma: f64,       // Risk tolerance in the terminal map
    pub total_time: f64,  // Horizon T
    pub num_time_interval: usize,
}

impl Default for MertonParams {
    fn default() -> Self {
        MertonParams {
            w0: 1.0,
            r: 0.02,
            mu: vec![0.06, 0.08],
            sigma: vec![0.2, 0.3],
            rho: 0.3,
            psi: 0.03,
            gamma: 1.0,
            total_time: 1.0,
            num_time_interval: 20,
        }
    }
}

pub struct MertonMarket {
    params: MertonParams,
    d: usize,
    x0: Vec<f32>,
    /// Lower-triangular Cholesky factor of the asset covariance, `(d, d)`
    chol: Tensor,
    /// Per-step log-price drift `(μ - ½ diag Σ) Δt`, `(1, d)`
    log_drift_dt: Tensor,
    /// Market price of risk `θ = L⁻¹(μ - r𝟙)`, `(d, 1)`
    theta: Tensor,
    target: f64,
    delta_t: f64,
}

impl MertonMarket {
    pub fn new(params: MertonParams) -> BsdeResult<Self> {
        Self::validate_params(&params)?;
        let d = params.mu.len();
        let device = Device::Cpu;

        // Covariance Σ = D ρ D with unit-diagonal correlation ρ.
        let mut cov = DMatrix::<f64>::zeros(d, d);
        for i in 0..d {
            for j in 0..d {
                let corr = if i == j { 1.0 } else { params.rho };
                cov[(i, j)] = corr * params.sigma[i] * params.sigma[j];
            }
        }
        let chol = nalgebra::Cholesky::new(cov).ok_or(BsdeError::InvalidParameters {
            parameter: "rho".to_string(),
            value: params.rho,
            constraint: "correlation matrix must be positive definite".to_string(),
        })?;
        let l = chol.l();

        let excess = DMatrix::<f64>::from_fn(d, 1, |i, _| params.mu[i] - params.r);
        let theta = l
            .solve_lower_triangular(&excess)
            .ok_or(BsdeError::NumericalInstability {
                method: "MertonMarket::new".to_string(),
                reason: "singular diffusion factor while solving for the market price of risk"
                    .to_string(),
            })?;

        // nalgebra stores column-major; flatten row-major for the tensor layout.
        let mut l_rows = Vec::with_capacity(d * d);
        for i in 0..d {
            for j in 0..d {
                l_rows.push(l[(i, j)] as f32);
            }
        }
        let theta_rows: Vec<f32> = (0..d).map(|i| theta[(i, 0)] as f32).collect();

        let delta_t = params.total_time / params.num_time_interval as f64;
        let drift: Vec<f32> = (0..d)
            .map(|i| ((params.mu[i] - 0.5 * params.sigma[i] * params.sigma[i]) * delta_t) as f32)
            .collect();

        let target = params.w0 * (params.psi * params.total_time).exp();

        Ok(MertonMarket {
            d,
            x0: vec![0.0; d],
            chol: Tensor::from_vec(l_rows, (d, d), &device)?,
            log_drift_dt: Tensor::from_vec(drift, (1, d), &device)?,
            theta: Tensor::from_vec(theta_rows, (d, 1), &device)?,
            target,
            delta_t,
            params,
        })
    }

    fn validate_params(params: &MertonParams) -> BsdeResult<()> {
        validate_positive("w0", params.w0)?;
        validate_finite("r", params.r)?;
        validate_correlation("rho", params.rho)?;
        validate_finite("psi", params.psi)?;
        validate_positive("gamma", params.gamma)?;
        validate_positive("total_time", params.total_time)?;
        validate_intervals(params.num_time_interval)?;

        if params.mu.is_empty() {
            return Err(BsdeError::InvalidConfiguration {
                field: "mu".to_string(),
                reason: "at least one asset is required".to_string(),
            });
        }
        if params.mu.len() != params.sigma.len() {
            return Err(BsdeError::InvalidConfiguration {
                field: "sigma".to_string(),
                reason: format!(
                    "expected one volatility per asset ({} drifts, {} volatilities)",
                    params.mu.len(),
                    params.sigma.len()
                ),
            });
        }
        for (i, &mu) in params.mu.iter().enumerate() {
            validate_finite(&format!("mu[{}]", i), mu)?;
        }
        for (i, &sigma) in params.sigma.iter().enumerate() {
            validate_positive(&format!("sigma[{}]", i), sigma)?;
        }
        Ok(())
    }

    pub fn params(&self) -> &MertonParams {
        &self.params
    }

    /// Terminal wealth target `c = w₀ e^{ψT}`
    pub fn target_wealth(&self) -> f64 {
        self.target
    }

    /// Clamp the exposure to the configured bounds, elementwise
    fn clamp_exposure(zeta: &Tensor, lb: Option<f64>, ub: Option<f64>) -> BsdeResult<Tensor> {
        let clamped = match (lb, ub) {
            (None, None) => zeta.clone(),
            (lo, hi) => zeta.clamp(
                lo.unwrap_or(f64::NEG_INFINITY),
                hi.unwrap_or(f64::INFINITY),
            )?,
        };
        Ok(clamped)
    }
}

impl Equation for MertonMarket {
    fn dim(&self) -> usize {
        self.d
    }

    fn dimx(&self) -> usize {
        self.d
    }

    fn num_time_interval(&self) -> usize {
        self.params.num_time_interval
    }

    fn total_time(&self) -> f64 {
        self.params.total_time
    }

    fn delta_t(&self) -> f64 {
        self.delta_t
    }

    fn x_init(&self) -> &[f32] {
        &self.x0
    }

    fn psi(&self) -> f64 {
        self.params.psi
    }

    fn gamma(&self) -> f64 {
        self.params.gamma
    }

    fn next_x(&self, x: &Tensor, dw: &Tensor) -> BsdeResult<Tensor> {
        // Exact log-space step: x' = x + (μ - ½ diag Σ)Δt + dW Lᵀ
        let diffusion = dw.matmul(&self.chol.t()?)?;
        Ok(x.broadcast_add(&self.log_drift_dt)?.add(&diffusion)?)
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
        zdx: bool,
    ) -> BsdeResult<(Tensor, Tensor)> {
        // Exposure in noise coordinates.
        let zeta = if zdx { z.matmul(&self.chol)? } else { z.clone() };
        let zeta = Self::clamp_exposure(&zeta, lb, ub)?;

        let risky_drift = zeta.matmul(&self.theta)?; // (batch, 1)
        let gain = (&zeta * dw)?.sum_keepdim(1)?;

        let y_next = ((y * (1.0 + self.params.r * self.delta_t))?
            + (risky_drift * self.delta_t)?)?
            .add(&gain)?;

        // Portfolio weights as the policy proxy; diagnostic only.
        let pi = zeta.broadcast_div(y)?;
        Ok((y_next, pi))
    }

    fn g_tf(&self, _time: f64, y: &Tensor) -> BsdeResult<Tensor> {
        // g(y) = y + (c - y)/γ
        let gamma = self.params.gamma;
        Ok(y.affine(1.0 - 1.0 / gamma, self.target / gamma)?)
    }

    fn sigma_x(&self, _x: &Tensor) -> BsdeResult<Tensor> {
        Ok(self.chol.clone())
    }

    fn supports_control_transform(&self) -> bool {
        true
    }

    fn z_t_matmul_sigma_x(&self, z: &Tensor, _sigma_x: &Tensor) -> BsdeResult<Tensor> {
        // The diffusion is constant, so the transform is a single product
        // with the cached factor.
        Ok(z.matmul(&self.chol)?)
    }
}
