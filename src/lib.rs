//! Slice-Plane Navigation and OpenIGTLink Video Streaming
//!
//! This library implements the intraoperative-navigation core of an
//! image-guided surgery system: deriving 2D cutting-plane transforms from
//! tracked-tool poses, and streaming ultrasound video over the OpenIGTLink
//! protocol.
//!
//! # Features
//!
//! - **Slice-plane computation** - axial/sagittal/coronal and tool-driven
//!   oblique planes with gravity stabilization and view offset
//! - **Event-driven update pipeline** - a proxy that recomputes and
//!   republishes the slice transform on every tool-pose change
//! - **OpenIGTLink streaming client** - incremental frame parsing,
//!   CRC validation, timestamp drift calibration, thread-safe frame queues
//! - **Wire image codec** - closed-whitelist conversion between wire
//!   frames and owned images, including device-name color-format tags
//!
//! # Quick Start
//!
//! ## Slicing against a tracked tool
//!
//! ```
//! use slicelink::geometry::Vector3;
//! use slicelink::slice::{
//!     ClinicalApplication, NavigationContext, PlaneType, PoseSample, SliceProxy,
//! };
//! use nalgebra::Isometry3;
//!
//! let context = NavigationContext::new();
//! let proxy = SliceProxy::new(context);
//! proxy.initialize_from_plane(
//!     PlaneType::Axial,
//!     false,
//!     Vector3::new(0.0, 0.0, -1.0),
//!     false,
//!     1.0,
//!     0.5,
//!     ClinicalApplication::Radiological,
//! );
//!
//! let conn = proxy.connect_changed(|s_m_r| {
//!     // hand the new slice transform to the renderer
//!     let _ = s_m_r;
//! });
//!
//! proxy.tool_transform_updated(PoseSample {
//!     pr_m_t: Isometry3::identity(),
//!     timestamp_ms: 0.0,
//! });
//! proxy.disconnect_changed(conn);
//! ```
//!
//! ## Receiving an ultrasound stream
//!
//! ```no_run
//! use slicelink::convert::decode_image;
//! use slicelink::stream::{ClientConfig, StreamEvent, VideoStreamClient};
//!
//! let mut client = VideoStreamClient::start(ClientConfig::new("127.0.0.1:18944"))?;
//! let events = client.subscribe();
//!
//! while let Ok(event) = events.recv() {
//!     if event == StreamEvent::ImageAvailable {
//!         if let Some(frame) = client.last_image_message() {
//!             let image = decode_image(&frame.message, &frame.device_name)?;
//!             println!("frame {}x{} at t={}", image.size[0], image.size[1], frame.timestamp);
//!         }
//!     }
//! }
//! client.stop();
//! # Ok::<(), slicelink::SliceLinkError>(())
//! ```
//!
//! # Architecture
//!
//! - **`slice`** - `SliceComputer` (pure plane math) and `SliceProxy`
//!   (event wiring, center policy, `sMr` publication)
//! - **`protocol`** - 58-byte header, CRC-64, IMAGE and CX_US_ST codecs
//! - **`stream`** - framing state machine, frame queues, timestamp
//!   calibration, the per-connection worker thread
//! - **`convert`** / **`image`** - wire ↔ internal image conversion and
//!   probe-geometry assembly
//! - **`event`** / **`geometry`** - observer lists and nalgebra-based
//!   spatial primitives shared by the above
//!
//! # Error Handling
//!
//! Fallible operations return `Result<T, SliceLinkError>`. The slice
//! subsystem itself never fails: degenerate configurations fall back to a
//! deterministic default basis. The streaming client reports socket
//! failures as connection-state events and drops (but survives) individual
//! bad frames.

pub mod convert;
pub mod error;
pub mod event;
pub mod geometry;
pub mod image;
pub mod protocol;
pub mod slice;
pub mod stream;

pub use error::{Result, SliceLinkError};
