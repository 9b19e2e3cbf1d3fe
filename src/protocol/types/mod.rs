//! Decodable message types
//!
//! The streaming client decodes exactly two body types: IMAGE frames and
//! the CX_US_ST probe-status broadcast. Everything else on the wire is
//! consumed and skipped by its declared body size.

pub mod image;
pub mod ustatus;

pub use image::{CoordinateSystem, Endian, ImageMessage, ScalarType};
pub use ustatus::{ProbeType, UsStatusMessage};
