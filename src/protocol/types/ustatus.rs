//! CX_US_ST message body codec
//!
//! Ultrasound probe status as broadcast by the video grabber alongside the
//! IMAGE stream: probe geometry (sector/linear, depth range, width) and the
//! probe origin in image coordinates. Fixed 52-byte big-endian body.

use crate::error::{Result, SliceLinkError};
use crate::protocol::message::MessageBody;
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// Probe geometry class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeType {
    Unknown = 0,
    Sector = 1,
    Linear = 2,
}

impl ProbeType {
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => ProbeType::Sector,
            2 => ProbeType::Linear,
            _ => ProbeType::Unknown,
        }
    }
}

/// Decoded CX_US_ST message body
#[derive(Debug, Clone, PartialEq)]
pub struct UsStatusMessage {
    pub probe_type: ProbeType,
    /// Probe origin in image coordinates (pixels)
    pub origin: [f64; 3],
    /// Start of the imaging depth range (mm from the origin)
    pub depth_start: f64,
    /// End of the imaging depth range (mm from the origin)
    pub depth_end: f64,
    /// Sector angle (radians) for sector probes, aperture width (mm) for
    /// linear probes
    pub width: f64,
}

/// Fixed body size in bytes
const US_STATUS_BODY_SIZE: usize = 52;

impl MessageBody for UsStatusMessage {
    const TYPE_NAME: &'static str = "CX_US_ST";

    fn encode_body(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(US_STATUS_BODY_SIZE);
        buf.put_i32(self.probe_type as i32);
        for &o in &self.origin {
            buf.put_f64(o);
        }
        buf.put_f64(self.depth_start);
        buf.put_f64(self.depth_end);
        buf.put_f64(self.width);
        Ok(buf)
    }

    fn decode_body(mut data: &[u8]) -> Result<Self> {
        if data.len() != US_STATUS_BODY_SIZE {
            return Err(SliceLinkError::InvalidSize {
                expected: US_STATUS_BODY_SIZE,
                actual: data.len(),
            });
        }

        let probe_type = ProbeType::from_i32(data.get_i32());
        let origin = [data.get_f64(), data.get_f64(), data.get_f64()];
        let depth_start = data.get_f64();
        let depth_end = data.get_f64();
        let width = data.get_f64();

        Ok(UsStatusMessage {
            probe_type,
            origin,
            depth_start,
            depth_end,
            width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UsStatusMessage {
        UsStatusMessage {
            probe_type: ProbeType::Sector,
            origin: [160.0, 0.0, 0.0],
            depth_start: 10.0,
            depth_end: 120.0,
            width: 0.8,
        }
    }

    #[test]
    fn test_type_name() {
        assert_eq!(UsStatusMessage::TYPE_NAME, "CX_US_ST");
    }

    #[test]
    fn test_body_roundtrip() {
        let original = sample();
        let encoded = original.encode_body().unwrap();
        assert_eq!(encoded.len(), US_STATUS_BODY_SIZE);

        let decoded = UsStatusMessage::decode_body(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_unknown_probe_type_decodes() {
        let mut encoded = sample().encode_body().unwrap();
        encoded[0..4].copy_from_slice(&99i32.to_be_bytes());
        let decoded = UsStatusMessage::decode_body(&encoded).unwrap();
        assert_eq!(decoded.probe_type, ProbeType::Unknown);
    }

    #[test]
    fn test_decode_wrong_size() {
        assert!(matches!(
            UsStatusMessage::decode_body(&[0u8; 51]),
            Err(SliceLinkError::InvalidSize { .. })
        ));
    }
}
