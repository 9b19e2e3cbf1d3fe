//! OpenIGTLink message header
//!
//! The header is a fixed 58-byte structure preceding every message:
//! version (2), type name (12, null-padded), device name (20, null-padded),
//! timestamp (8), body size (8), CRC (8). All numeric fields big-endian.

use crate::error::{Result, SliceLinkError};
use bytes::{Buf, BufMut, BytesMut};

/// Fixed-size, null-padded ASCII name field
///
/// Used at width 12 for the message type and width 20 for the device name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddedName<const N: usize>([u8; N]);

/// Message type name (12 bytes on the wire)
pub type TypeName = PaddedName<12>;

/// Device name (20 bytes on the wire)
pub type DeviceName = PaddedName<20>;

impl<const N: usize> PaddedName<N> {
    /// Create from a string, rejecting anything longer than `N` bytes
    pub fn new(name: &str) -> Result<Self> {
        if name.len() > N {
            return Err(SliceLinkError::InvalidHeader(format!(
                "Name too long: {} bytes (max: {})",
                name.len(),
                N
            )));
        }
        let mut bytes = [0u8; N];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(PaddedName(bytes))
    }

    /// The name with trailing null padding stripped
    pub fn as_str(&self) -> Result<&str> {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(N);
        Ok(std::str::from_utf8(&self.0[..len])?)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> From<[u8; N]> for PaddedName<N> {
    fn from(bytes: [u8; N]) -> Self {
        PaddedName(bytes)
    }
}

/// Wire timestamp: upper 32 bits whole seconds since the Unix epoch, lower
/// 32 bits a binary fraction of a second
///
/// The streaming side of this crate works in `f64` seconds, so the
/// conversions in both directions live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: u32,
    pub fraction: u32,
}

impl Timestamp {
    pub fn new(seconds: u32, fraction: u32) -> Self {
        Timestamp { seconds, fraction }
    }

    /// Zero timestamp ("no timestamp")
    pub fn zero() -> Self {
        Timestamp {
            seconds: 0,
            fraction: 0,
        }
    }

    /// Current system time
    pub fn now() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let fraction = ((now.subsec_nanos() as u64) * 0x1_0000_0000 / 1_000_000_000) as u32;
        Timestamp {
            seconds: now.as_secs() as u32,
            fraction,
        }
    }

    /// Pack into the 64-bit wire representation
    pub fn to_u64(self) -> u64 {
        ((self.seconds as u64) << 32) | (self.fraction as u64)
    }

    /// Unpack from the 64-bit wire representation
    pub fn from_u64(value: u64) -> Self {
        Timestamp {
            seconds: (value >> 32) as u32,
            fraction: (value & 0xFFFF_FFFF) as u32,
        }
    }

    /// Seconds since the epoch as `f64`
    pub fn to_f64(self) -> f64 {
        self.seconds as f64 + (self.fraction as f64) / (u32::MAX as f64 + 1.0)
    }

    /// Build from `f64` seconds since the epoch; negative input clamps to zero
    pub fn from_f64(seconds: f64) -> Self {
        let seconds = seconds.max(0.0);
        let whole = seconds.floor();
        let frac = ((seconds - whole) * (u32::MAX as f64 + 1.0)) as u32;
        Timestamp {
            seconds: whole as u32,
            fraction: frac,
        }
    }
}

/// The 58-byte message header
#[derive(Debug, Clone)]
pub struct Header {
    /// Protocol version (2 for every message this crate produces)
    pub version: u16,
    pub type_name: TypeName,
    pub device_name: DeviceName,
    pub timestamp: Timestamp,
    /// Body size in bytes, as declared by the sender
    pub body_size: u64,
    /// CRC-64 of the body
    pub crc: u64,
}

impl Header {
    /// Header size in bytes
    pub const SIZE: usize = 58;

    /// Decode a header from at least 58 buffered bytes
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(SliceLinkError::InvalidSize {
                expected: Self::SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = std::io::Cursor::new(buf);
        let version = cursor.get_u16();

        let mut type_bytes = [0u8; 12];
        cursor.copy_to_slice(&mut type_bytes);
        let mut device_bytes = [0u8; 20];
        cursor.copy_to_slice(&mut device_bytes);

        let timestamp = Timestamp::from_u64(cursor.get_u64());
        let body_size = cursor.get_u64();
        let crc = cursor.get_u64();

        Ok(Header {
            version,
            type_name: TypeName::from(type_bytes),
            device_name: DeviceName::from(device_bytes),
            timestamp,
            body_size,
            crc,
        })
    }

    /// Encode into the 58-byte wire form
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u16(self.version);
        buf.put_slice(self.type_name.as_bytes());
        buf.put_slice(self.device_name.as_bytes());
        buf.put_u64(self.timestamp.to_u64());
        buf.put_u64(self.body_size);
        buf.put_u64(self.crc);
        buf.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_name_roundtrip() {
        let name = TypeName::new("IMAGE").unwrap();
        assert_eq!(name.as_str().unwrap(), "IMAGE");
    }

    #[test]
    fn test_padded_name_too_long() {
        assert!(TypeName::new("THIRTEEN_BYTES").is_err());
        assert!(DeviceName::new("exactly_twenty_chars").is_ok());
        assert!(DeviceName::new("twenty_one_characters").is_err());
    }

    #[test]
    fn test_timestamp_f64_roundtrip() {
        let ts = Timestamp::new(1_700_000_000, 0x8000_0000); // x.5 seconds
        assert!((ts.to_f64() - 1_700_000_000.5).abs() < 1e-6);

        let back = Timestamp::from_f64(ts.to_f64());
        assert_eq!(back.seconds, ts.seconds);
        assert!((back.fraction as i64 - ts.fraction as i64).abs() < 16);
    }

    #[test]
    fn test_timestamp_u64_roundtrip() {
        let ts = Timestamp::new(1234567890, 0xABCD_EF12);
        assert_eq!(Timestamp::from_u64(ts.to_u64()), ts);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header {
            version: 2,
            type_name: TypeName::new("CX_US_ST").unwrap(),
            device_name: DeviceName::new("Sonix[BGR]").unwrap(),
            timestamp: Timestamp::new(1234567890, 0x1234_5678),
            body_size: 52,
            crc: 0xDEAD_BEEF_CAFE_BABE,
        };

        let encoded = header.encode();
        assert_eq!(encoded.len(), Header::SIZE);

        let decoded = Header::decode(&encoded).unwrap();
        assert_eq!(decoded.version, header.version);
        assert_eq!(decoded.type_name, header.type_name);
        assert_eq!(decoded.device_name, header.device_name);
        assert_eq!(decoded.timestamp, header.timestamp);
        assert_eq!(decoded.body_size, header.body_size);
        assert_eq!(decoded.crc, header.crc);
    }

    #[test]
    fn test_header_decode_short_buffer() {
        let result = Header::decode(&[0u8; 30]);
        assert!(matches!(result, Err(SliceLinkError::InvalidSize { .. })));
    }

    #[test]
    fn test_big_endian_layout() {
        let header = Header {
            version: 0x0102,
            type_name: TypeName::new("IMAGE").unwrap(),
            device_name: DeviceName::new("Dev").unwrap(),
            timestamp: Timestamp::from_u64(0x0102_0304_0506_0708),
            body_size: 0x0910_1112_1314_1516,
            crc: 0,
        };
        let encoded = header.encode();
        assert_eq!(&encoded[0..2], &[0x01, 0x02]);
        // timestamp starts after version + 12 + 20 name bytes
        assert_eq!(&encoded[34..38], &[0x01, 0x02, 0x03, 0x04]);
    }
}
