//! Error types for the forcing and projection core
//!
//! Every failure is either a configuration problem caught before the first step,
//! or a failure reported by an external collaborator (force provider, inflow
//! reader, neighbouring slab) that is passed through to the caller unchanged.

use thiserror::Error;

/// Result alias used throughout the crate
pub type ForcingResult<T> = Result<T, ForcingError>;

/// Errors raised while configuring or stepping a subdomain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForcingError {
    /// A configuration value is missing, out of range, or conflicts with another
    #[error("invalid configuration for `{param}`: {message}")]
    InvalidConfig {
        /// Name of the offending option
        param: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// The fringe window derived from the configured fractions has no usable width
    #[error("degenerate fringe window: start={start}, mid={mid}, end={end}")]
    DegenerateFringe {
        /// Unwrapped 1-based fringe start index
        start: i64,
        /// Unwrapped 1-based plateau index
        mid: i64,
        /// Unwrapped 1-based exit-plane index
        end: i64,
    },

    /// The vertical extent cannot be split across the requested number of slabs
    #[error("decomposition error: {0}")]
    Decomposition(String),

    /// Array shapes supplied by a collaborator do not match the local grid
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which array was checked
        what: &'static str,
        /// Expected number of values
        expected: usize,
        /// Number of values received
        actual: usize,
    },

    /// An external force provider failed
    #[error("force provider `{name}` failed: {message}")]
    Provider {
        /// Provider name as registered
        name: String,
        /// Provider-supplied description
        message: String,
    },

    /// The inflow plane source failed to produce a plane
    #[error("inflow source error: {0}")]
    InflowSource(String),

    /// A neighbouring slab went away during halo exchange
    #[error("halo exchange on rank {rank} failed: {message}")]
    HaloExchange {
        /// Rank of the slab that observed the failure
        rank: usize,
        /// Description of the failure
        message: String,
    },
}

impl ForcingError {
    /// Shorthand for [`ForcingError::InvalidConfig`]
    pub fn config(param: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param,
            message: message.into(),
        }
    }

    /// Shorthand for [`ForcingError::Provider`]
    pub fn provider(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            name: name.into(),
            message: message.into(),
        }
    }
}
