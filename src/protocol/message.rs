//! Message-body trait and frame assembly
//!
//! Each decodable message type implements [`MessageBody`]; the streaming
//! parser dispatches on the header's type-name string and hands the body
//! bytes to the matching `decode_body`. [`encode_frame`] builds a complete
//! wire frame (header + CRC + body) and is what senders and the test
//! suites use to synthesize byte streams.

use crate::error::Result;
use crate::protocol::crc::calculate_crc;
use crate::protocol::header::{DeviceName, Header, Timestamp, TypeName};

/// Codec interface for one OpenIGTLink message type
pub trait MessageBody: Sized {
    /// Wire type-name string, e.g. `"IMAGE"` or `"CX_US_ST"`
    const TYPE_NAME: &'static str;

    /// Encode the message body (without header)
    fn encode_body(&self) -> Result<Vec<u8>>;

    /// Decode the message body (without header)
    fn decode_body(data: &[u8]) -> Result<Self>;
}

/// Assemble a complete frame: header with body size and CRC filled in,
/// followed by the encoded body
pub fn encode_frame<T: MessageBody>(body: &T, device_name: &str) -> Result<Vec<u8>> {
    encode_frame_at(body, device_name, Timestamp::now())
}

/// [`encode_frame`] with an explicit timestamp, for senders that stamp
/// frames from their own clock (and for deterministic tests)
pub fn encode_frame_at<T: MessageBody>(
    body: &T,
    device_name: &str,
    timestamp: Timestamp,
) -> Result<Vec<u8>> {
    let body_bytes = body.encode_body()?;
    let header = Header {
        version: 2,
        type_name: TypeName::new(T::TYPE_NAME)?,
        device_name: DeviceName::new(device_name)?,
        timestamp,
        body_size: body_bytes.len() as u64,
        crc: calculate_crc(&body_bytes),
    };

    let mut frame = Vec::with_capacity(Header::SIZE + body_bytes.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(&body_bytes);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SliceLinkError;

    struct Blob(Vec<u8>);

    impl MessageBody for Blob {
        const TYPE_NAME: &'static str = "BLOB";

        fn encode_body(&self) -> Result<Vec<u8>> {
            Ok(self.0.clone())
        }

        fn decode_body(data: &[u8]) -> Result<Self> {
            Ok(Blob(data.to_vec()))
        }
    }

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(&Blob(vec![1, 2, 3, 4, 5]), "UnitTest").unwrap();
        assert_eq!(frame.len(), Header::SIZE + 5);

        let header = Header::decode(&frame).unwrap();
        assert_eq!(header.type_name.as_str().unwrap(), "BLOB");
        assert_eq!(header.device_name.as_str().unwrap(), "UnitTest");
        assert_eq!(header.body_size, 5);
        assert_eq!(header.crc, calculate_crc(&[1, 2, 3, 4, 5]));
    }

    #[test]
    fn test_frame_rejects_long_device_name() {
        let result = encode_frame(&Blob(Vec::new()), "a_device_name_that_is_too_long");
        assert!(matches!(result, Err(SliceLinkError::InvalidHeader(_))));
    }
}
