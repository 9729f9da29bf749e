//! Error types for density aggregation.
//!
//! The aggregation core is total over well-formed input: the only failures
//! are rejected configuration values and I/O or serialization at the edges
//! (snapshot files, GPX loading).

use thiserror::Error;

/// Errors produced by configuration validation, the engine, and snapshot I/O.
#[derive(Error, Debug)]
pub enum DensityError {
    #[error("precision must be a positive number no larger than MAX_PRECISION, got {0}")]
    InvalidPrecision(f64),

    #[error("max density must be at least 1, got {0}")]
    InvalidMaxDensity(u32),

    #[error("jitter must be between 0 and max density, got {0}")]
    InvalidJitter(f64),

    #[error("track not found: {0}")]
    TrackNotFound(String),

    #[error("failed to parse GPX file: {0}")]
    Gpx(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DensityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DensityError::InvalidPrecision(-1.0);
        assert!(err.to_string().contains("-1"));

        let err = DensityError::TrackNotFound("morning-run".to_string());
        assert!(err.to_string().contains("morning-run"));
    }

    #[test]
    fn test_io_error_converts() {
        fn open_missing() -> Result<std::fs::File> {
            Ok(std::fs::File::open("/definitely/not/here.json")?)
        }
        assert!(matches!(open_missing(), Err(DensityError::Io(_))));
    }
}
