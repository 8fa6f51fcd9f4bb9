//! Error type shared by every stage of the distance pipeline.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PahmmError {
    /// Divergence time must be strictly positive and finite.
    #[error("invalid divergence time {0}: the calculation needs a positive time")]
    InvalidTime(f64),
    #[error("divergence time has not been set before running the algorithm")]
    TimeNotSet,
    /// A probability turned into NaN or an infinity while building the model.
    #[error("numeric domain error: {0}")]
    NumericDomain(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("the rolling-buffer matrix keeps no traceback or posterior information")]
    MissingTraceback,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PahmmError>;

/// Return `Err(NumericDomain)` if `value` is not finite.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PahmmError::NumericDomain(format!("{} is {}", what, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn finite_check() {
        assert!(ensure_finite(-3.2, "x").is_ok());
        match ensure_finite(f64::NAN, "gap opening") {
            Err(PahmmError::NumericDomain(msg)) => assert!(msg.contains("gap opening")),
            other => panic!("{:?}", other),
        }
        assert!(ensure_finite(f64::NEG_INFINITY, "y").is_err());
    }
}
