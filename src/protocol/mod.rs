//! OpenIGTLink wire protocol
//!
//! Core protocol structures: the fixed 58-byte header, the CRC-64 body
//! checksum, the message-body codec trait and the two message types this
//! system decodes.

pub mod crc;
pub mod header;
pub mod message;
pub mod types;

pub use crc::{calculate_crc, verify_crc};
pub use header::{DeviceName, Header, Timestamp, TypeName};
pub use message::{encode_frame, encode_frame_at, MessageBody};
pub use types::{ImageMessage, UsStatusMessage};
