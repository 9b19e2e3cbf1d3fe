//! Error types for slicelink operations
//!
//! All fallible operations in this crate return `Result<T, SliceLinkError>`.
//! The slice-transform subsystem itself never fails outward; errors only
//! arise on the protocol and codec side.

use thiserror::Error;

/// Unified error type for protocol parsing, codec conversion and network I/O
#[derive(Error, Debug)]
pub enum SliceLinkError {
    /// Malformed message header (bad name field, undecodable content)
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// CRC checksum mismatch on a received message body
    ///
    /// The frame is dropped but the stream stays aligned; the byte count
    /// consumed from the socket is unaffected by the failure.
    #[error("CRC mismatch: expected {expected:#x}, got {actual:#x}")]
    CrcMismatch {
        /// CRC declared in the message header
        expected: u64,
        /// CRC calculated over the received body
        actual: u64,
    },

    /// Message or field size does not match the declared/expected size
    #[error("Invalid message size: expected {expected}, got {actual}")]
    InvalidSize {
        /// Expected size in bytes
        expected: usize,
        /// Actual size in bytes
        actual: usize,
    },

    /// Declared body size exceeds the maximum this client will buffer
    #[error("Message body too large: {size} bytes (max: {max})")]
    BodyTooLarge {
        /// Declared body size in bytes
        size: usize,
        /// Maximum accepted size in bytes
        max: usize,
    },

    /// Pixel format outside the closed codec whitelist
    ///
    /// The wire-image codec supports a fixed set of scalar-type /
    /// component-count combinations; anything else is rejected rather than
    /// guessed at.
    #[error("Unsupported pixel format: {components} component(s) of {scalar}")]
    UnsupportedFormat {
        /// Component count of the offending image
        components: usize,
        /// Scalar type name of the offending image
        scalar: &'static str,
    },

    /// I/O error during network communication
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid UTF-8 in a string field (device name, type name)
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result type alias for slicelink operations
pub type Result<T> = std::result::Result<T, SliceLinkError>;
