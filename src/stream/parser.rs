//! Incremental framing state machine
//!
//! [`FrameParser`] reconstructs messages from a TCP byte stream delivered
//! in arbitrary chunks. It never blocks and never un-consumes: if fewer
//! bytes are buffered than the next step needs it reports "need more data"
//! and keeps its state. Header bytes are consumed exactly once; the parsed
//! header is carried across calls until the body arrives.
//!
//! Only IMAGE and CX_US_ST bodies are decoded. Any other type is skipped
//! by its declared body size, which keeps the stream aligned without
//! knowing the format. A CRC or body-decode failure likewise drops the
//! frame and realigns on the next header.

use crate::error::{Result, SliceLinkError};
use crate::protocol::crc::calculate_crc;
use crate::protocol::header::Header;
use crate::protocol::message::MessageBody;
use crate::protocol::types::{ImageMessage, UsStatusMessage};
use bytes::{Buf, BytesMut};
use tracing::{trace, warn};

/// Largest body this parser will buffer (guards a malformed size field)
pub const MAX_BODY_SIZE: usize = 1 << 28;

/// Header fields a consumer needs alongside the decoded body
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMeta {
    /// Device name as sent (may still carry a `[FMT]` color tag)
    pub device_name: String,
    /// Wire timestamp in seconds (sender's clock, uncalibrated)
    pub timestamp: f64,
}

/// A successfully decoded frame
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingFrame {
    Image(FrameMeta, ImageMessage),
    ProbeStatus(FrameMeta, UsStatusMessage),
}

/// Counters for frames that did not produce an [`IncomingFrame`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames decoded and returned
    pub decoded: u64,
    /// Foreign message types skipped by declared size
    pub skipped: u64,
    /// Bodies dropped on CRC mismatch
    pub crc_failures: u64,
    /// Bodies of known type that failed to decode
    pub decode_failures: u64,
}

enum State {
    AwaitingHeader,
    Body(Header),
}

/// Streaming message parser
pub struct FrameParser {
    buf: BytesMut,
    state: State,
    verify_crc: bool,
    stats: ParserStats,
}

impl FrameParser {
    pub fn new() -> Self {
        FrameParser {
            buf: BytesMut::new(),
            state: State::AwaitingHeader,
            verify_crc: true,
            stats: ParserStats::default(),
        }
    }

    /// Enable or disable CRC verification of received bodies
    pub fn set_verify_crc(&mut self, verify: bool) {
        self.verify_crc = verify;
    }

    /// Append received bytes to the parse buffer
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Try to produce the next decodable frame
    ///
    /// Returns `Ok(None)` when more bytes are needed. Dropped and skipped
    /// frames are consumed internally; the call only surfaces frames the
    /// consumer can use. Errors are fatal framing problems (a body larger
    /// than [`MAX_BODY_SIZE`]) after which the stream cannot be trusted.
    pub fn next_frame(&mut self) -> Result<Option<IncomingFrame>> {
        loop {
            match &self.state {
                State::AwaitingHeader => {
                    if self.buf.len() < Header::SIZE {
                        return Ok(None);
                    }
                    let header = Header::decode(&self.buf[..Header::SIZE])?;
                    self.buf.advance(Header::SIZE);

                    let body_size = header.body_size as usize;
                    if body_size > MAX_BODY_SIZE {
                        return Err(SliceLinkError::BodyTooLarge {
                            size: body_size,
                            max: MAX_BODY_SIZE,
                        });
                    }
                    self.state = State::Body(header);
                }
                State::Body(header) => {
                    let body_size = header.body_size as usize;
                    if self.buf.len() < body_size {
                        return Ok(None);
                    }
                    let header = match std::mem::replace(&mut self.state, State::AwaitingHeader) {
                        State::Body(h) => h,
                        State::AwaitingHeader => unreachable!(),
                    };
                    let body = self.buf.split_to(body_size);

                    if let Some(frame) = self.dispatch(&header, &body) {
                        self.stats.decoded += 1;
                        return Ok(Some(frame));
                    }
                }
            }
        }
    }

    /// Parser counters
    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Bytes currently buffered but not yet consumed by a frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn dispatch(&mut self, header: &Header, body: &[u8]) -> Option<IncomingFrame> {
        let type_name = header.type_name.as_str().unwrap_or("").to_string();
        let device_name = header.device_name.as_str().unwrap_or("").to_string();

        if self.verify_crc {
            let actual = calculate_crc(body);
            if actual != header.crc {
                let err = SliceLinkError::CrcMismatch {
                    expected: header.crc,
                    actual,
                };
                warn!(
                    msg_type = %type_name,
                    device_name = %device_name,
                    error = %err,
                    "Dropping frame"
                );
                self.stats.crc_failures += 1;
                return None;
            }
        }

        let meta = FrameMeta {
            device_name,
            timestamp: header.timestamp.to_f64(),
        };

        match type_name.as_str() {
            t if t == ImageMessage::TYPE_NAME => match ImageMessage::decode_body(body) {
                Ok(msg) => Some(IncomingFrame::Image(meta, msg)),
                Err(e) => {
                    warn!(error = %e, "Failed to decode IMAGE body, dropping frame");
                    self.stats.decode_failures += 1;
                    None
                }
            },
            t if t == UsStatusMessage::TYPE_NAME => match UsStatusMessage::decode_body(body) {
                Ok(msg) => Some(IncomingFrame::ProbeStatus(meta, msg)),
                Err(e) => {
                    warn!(error = %e, "Failed to decode CX_US_ST body, dropping frame");
                    self.stats.decode_failures += 1;
                    None
                }
            },
            other => {
                trace!(msg_type = %other, bytes = body.len(), "Skipping foreign message type");
                self.stats.skipped += 1;
                None
            }
        }
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}
