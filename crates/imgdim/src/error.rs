//! Error types for imgdim

use std::fmt;
use std::time::Duration;

/// Result type alias for imgdim operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache construction and dimension lookups
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Cache capacity must be at least 1
    InvalidCapacity(usize),

    /// Width or height is negative or not finite
    InvalidDimensions {
        /// Rejected width
        width: f64,
        /// Rejected height
        height: f64,
    },

    /// Lookup configuration is unusable
    InvalidConfig(String),

    /// Image source could not be parsed
    InvalidSource(String),

    /// Remote prober could not measure the image
    Probe(String),

    /// Remote prober did not answer in time
    ProbeTimeout(Duration),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(cap) => {
                write!(f, "Invalid cache capacity: {} (must be at least 1)", cap)
            }
            Error::InvalidDimensions { width, height } => {
                write!(f, "Invalid dimensions: {}x{}", width, height)
            }
            Error::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::InvalidSource(src) => write!(f, "Invalid image source: {:?}", src),
            Error::Probe(msg) => write!(f, "Probe failed: {}", msg),
            Error::ProbeTimeout(limit) => write!(f, "Probe timed out after {:?}", limit),
        }
    }
}

impl std::error::Error for Error {}
