// src/error.rs
use std::fmt;

/// Custom error types for the deep-bsde library
#[derive(Debug, Clone)]
pub enum BsdeError {
    /// Invalid parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid configuration
    InvalidConfiguration { field: String, reason: String },

    /// Noise-sample tensor cannot be laid out as (batch, noise-dim, intervals)
    ShapeMismatch {
        expected: String,
        actual: String,
        context: String,
    },

    /// Numerical instability or divergence
    NumericalInstability { method: String, reason: String },

    /// Unsupported operation
    UnsupportedOperation { operation: String, context: String },

    /// Error raised by the tensor/autodiff backend
    Backend { reason: String },
}

impl fmt::Display for BsdeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BsdeError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            BsdeError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            BsdeError::ShapeMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "Shape mismatch in {}: expected {}, got {}",
                    context, expected, actual
                )
            }
            BsdeError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
            BsdeError::UnsupportedOperation { operation, context } => {
                write!(
                    f,
                    "Unsupported operation '{}' in context: {}",
                    operation, context
                )
            }
            BsdeError::Backend { reason } => {
                write!(f, "Backend error: {}", reason)
            }
        }
    }
}

impl std::error::Error for BsdeError {}

impl From<candle_core::Error> for BsdeError {
    fn from(err: candle_core::Error) -> Self {
        BsdeError::Backend {
            reason: err.to_string(),
        }
    }
}

/// Result type alias for deep-bsde operations
pub type BsdeResult<T> = Result<T, BsdeError>;

/// Validation utilities
pub mod validation {
    use super::{BsdeError, BsdeResult};

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> BsdeResult<()> {
        if value <= 0.0 {
            Err(BsdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> BsdeResult<()> {
        if value < 0.0 {
            Err(BsdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is within a range
    pub fn validate_range(name: &str, value: f64, min: f64, max: f64) -> BsdeResult<()> {
        if value < min || value > max {
            Err(BsdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: format!("must be in range [{}, {}]", min, max),
            })
        } else {
            Ok(())
        }
    }

    /// Validate correlation parameter
    pub fn validate_correlation(name: &str, rho: f64) -> BsdeResult<()> {
        validate_range(name, rho, -1.0, 1.0)
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> BsdeResult<()> {
        if !value.is_finite() {
            Err(BsdeError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate batch size
    pub fn validate_batch_size(batch_size: usize) -> BsdeResult<()> {
        if batch_size == 0 {
            Err(BsdeError::InvalidConfiguration {
                field: "batch_size".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if batch_size > 10_000_000 {
            Err(BsdeError::InvalidConfiguration {
                field: "batch_size".to_string(),
                reason: "exceeds maximum allowed (10 million)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate time-interval count
    pub fn validate_intervals(num_time_interval: usize) -> BsdeResult<()> {
        if num_time_interval == 0 {
            Err(BsdeError::InvalidConfiguration {
                field: "num_time_interval".to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else if num_time_interval > 100_000 {
            Err(BsdeError::InvalidConfiguration {
                field: "num_time_interval".to_string(),
                reason: "exceeds maximum allowed (100,000)".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
