//! Video streaming client
//!
//! Framing state machine, frame queues, timestamp calibration and the
//! per-connection worker thread that ties them together.

pub mod calibration;
pub mod client;
pub mod parser;
pub mod queue;

pub use calibration::TimestampSync;
pub use client::{
    ClientConfig, ConnectionState, ImageFrame, ProbeStatusFrame, StreamEvent, VideoStreamClient,
};
pub use parser::{FrameMeta, FrameParser, IncomingFrame, ParserStats};
pub use queue::{FrameQueue, QueueStats};
