//! Error types for ddbridge operations

use thiserror::Error;

/// ddbridge specific errors
#[derive(Debug, Error)]
pub enum DdBridgeError {
    /// Failed to open the card device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The ID ioctl failed
    #[error("Failed to read card id: {0}")]
    IdFailed(#[source] std::io::Error),

    /// The FLASHIO ioctl failed
    #[error("Flash transfer on link {link} failed: {source}")]
    TransferFailed {
        link: u32,
        #[source]
        source: std::io::Error,
    },

    /// Transfer exceeds what the driver accepts in one ioctl
    #[error("Transfer of {len} bytes exceeds the driver limit of {max}")]
    TransferTooLarge { len: usize, max: usize },

    /// Invalid option value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for ddbridge operations
pub type Result<T> = std::result::Result<T, DdBridgeError>;
