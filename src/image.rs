//! Internal image and probe-geometry representations
//!
//! These are the receive-side owned types: a decoded video frame after
//! codec conversion, and the ultrasound probe geometry assembled from the
//! status/image message pair. Both own their storage — nothing here
//! references a wire buffer.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SliceLinkError};
use crate::protocol::types::image::ScalarType;
use crate::protocol::types::ustatus::ProbeType;

/// An owned image with spatial metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Stream/device name, cleaned of any embedded format tag
    pub name: String,
    /// Grid size [columns, rows, slices]
    pub size: [usize; 3],
    /// Voxel spacing in mm
    pub spacing: [f64; 3],
    /// 1 (grayscale) or 3 (RGB, channel order fixed)
    pub components: usize,
    pub scalar_type: ScalarType,
    /// Pixel data, row-major, interleaved components
    pub data: Vec<u8>,
}

impl Image {
    pub fn new(
        name: impl Into<String>,
        size: [usize; 3],
        spacing: [f64; 3],
        components: usize,
        scalar_type: ScalarType,
        data: Vec<u8>,
    ) -> Result<Self> {
        let expected = size[0] * size[1] * size[2] * components * scalar_type.size();
        if data.len() != expected {
            return Err(SliceLinkError::InvalidSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Image {
            name: name.into(),
            size,
            spacing,
            components,
            scalar_type,
            data,
        })
    }

    /// Number of pixels (not bytes)
    pub fn num_pixels(&self) -> usize {
        self.size[0] * self.size[1] * self.size[2]
    }
}

/// Ultrasound probe geometry, merged from wire messages onto a configured
/// baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeGeometry {
    pub probe_type: ProbeType,
    /// Probe origin in image coordinates (pixels)
    pub origin: [f64; 3],
    /// Imaging depth range in mm
    pub depth_start: f64,
    pub depth_end: f64,
    /// Sector angle (radians) or linear aperture (mm)
    pub width: f64,
    /// Pixel spacing of the video frames, mm/px
    pub spacing: [f64; 3],
    /// Frame size in pixels [columns, rows]
    pub size: [usize; 2],
    /// Temporal calibration offset in seconds, configured out-of-band and
    /// never carried by the wire messages
    pub temporal_calibration: f64,
}

impl Default for ProbeGeometry {
    fn default() -> Self {
        ProbeGeometry {
            probe_type: ProbeType::Unknown,
            origin: [0.0; 3],
            depth_start: 0.0,
            depth_end: 0.0,
            width: 0.0,
            spacing: [1.0, 1.0, 1.0],
            size: [0, 0],
            temporal_calibration: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_validates_buffer_length() {
        let ok = Image::new("us", [4, 4, 1], [1.0; 3], 1, ScalarType::Uint8, vec![0; 16]);
        assert!(ok.is_ok());

        let bad = Image::new("us", [4, 4, 1], [1.0; 3], 3, ScalarType::Uint8, vec![0; 16]);
        assert!(matches!(bad, Err(SliceLinkError::InvalidSize { .. })));
    }

    #[test]
    fn test_num_pixels() {
        let img = Image::new(
            "us",
            [8, 4, 2],
            [1.0; 3],
            1,
            ScalarType::Uint16,
            vec![0; 8 * 4 * 2 * 2],
        )
        .unwrap();
        assert_eq!(img.num_pixels(), 64);
    }
}
