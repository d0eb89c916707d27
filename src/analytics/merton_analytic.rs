// src/analytics/merton_analytic.rs
//! Closed-Form Companions for the Merton Market
//!
//! # Mathematical Foundation
//!
//! Used to validate trained solutions of the terminal-wealth tracking
//! problem. In a complete market with riskless rate `r`, a deterministic
//! terminal claim `c` is replicated without risk, so the optimal tracking
//! solution is
//! ```text
//! Y₀* = c e^{-rT},   ζ* ≡ 0
//! ```
//! The classical Merton fraction is reported as a reference point for the
//! learned policy proxy.

/// Terminal wealth target of the tracking problem
///
/// # Formula
/// ```text
/// c = w₀ e^{ψT}
/// ```
pub fn target_wealth(w0: f64, psi: f64, t: f64) -> f64 {
    w0 * (psi * t).exp()
}

/// Riskless replication cost of a deterministic terminal claim
///
/// # Formula
/// ```text
/// Y₀* = c e^{-rT}
/// ```
/// This is the value the trained `y0` should converge to.
pub fn replication_cost(target: f64, r: f64, t: f64) -> f64 {
    target * (-r * t).exp()
}

/// Classical Merton fraction for a single risky asset
///
/// # Formula
/// ```text
/// π* = (μ - r) / (γ σ²)
/// ```
///
/// # Interpretation
/// - Constant optimal fraction of wealth in the risky asset for a CRRA
///   investor with relative risk aversion γ
/// - Independent of wealth and horizon under constant coefficients
pub fn merton_fraction(mu: f64, r: f64, sigma: f64, gamma: f64) -> f64 {
    (mu - r) / (gamma * sigma * sigma)
}
