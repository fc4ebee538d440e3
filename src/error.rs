//! Error types for the diode clipper.
//!
//! This module provides a unified error type [`ClipperError`] that covers
//! configuration, channel addressing, buffer layout and stream I/O failures.
//! Numerical non-convergence is deliberately absent: a sample that hits the
//! iteration cap still returns its best estimate.

use thiserror::Error;

/// Result type alias using [`ClipperError`].
pub type Result<T> = std::result::Result<T, ClipperError>;

/// Unified error type for all clipper operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipperError {
    // ============ Configuration Errors ============
    /// Sample rate or channel count rejected by `configure`
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Invalid circuit or solver parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // ============ Processing Errors ============
    /// Channel index outside the configured channel state
    #[error("Channel {channel} out of range (configured channels: {num_channels})")]
    IndexOutOfRange { channel: usize, num_channels: usize },

    /// Input sample is NaN or infinite
    #[error("Non-finite input sample {value} on channel {channel}")]
    NonFiniteInput { channel: usize, value: f64 },

    /// Block buffers disagree in channel count or length
    #[error("Buffer mismatch: {message}")]
    BufferMismatch { message: String },

    // ============ I/O Errors ============
    /// Error reading audio input
    #[error("Audio input error: {message}")]
    AudioInputError { message: String },

    /// Error writing audio output
    #[error("Audio output error: {message}")]
    AudioOutputError { message: String },
}

impl ClipperError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a buffer mismatch error
    pub fn buffer_mismatch(message: impl Into<String>) -> Self {
        Self::BufferMismatch {
            message: message.into(),
        }
    }
}

/// Reject values that are NaN, infinite, zero or negative.
pub(crate) fn ensure_positive(param: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ClipperError::invalid_parameter(
            param,
            format!("must be finite and positive, got {value}"),
        ))
    }
}
