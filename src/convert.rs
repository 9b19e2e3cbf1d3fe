//! Wire ↔ internal image conversion
//!
//! Stateless codec between the wire messages and the owned internal types.
//! The format support is a closed whitelist on both directions; anything
//! outside it is rejected, not guessed at.
//!
//! Video grabbers tag their channel order in the device name, e.g.
//! `ImageSenderSonix[BGR]` or `GrabberServer[ARGB]`: a bracketed run of one
//! to four letters. The tag is stripped from the cleaned name and drives
//! channel reordering to RGB; a missing or malformed tag means identity
//! order. Decoded pixel data is always a deep copy — the wire message's
//! buffer is reused for the next received frame.

use tracing::warn;

use crate::error::{Result, SliceLinkError};
use crate::image::{Image, ProbeGeometry};
use crate::protocol::types::image::{ImageMessage, ScalarType};
use crate::protocol::types::ustatus::UsStatusMessage;

/// Split a wire device name into the cleaned name and the embedded
/// color-format tag, if one is present
pub fn parse_color_tag(device_name: &str) -> (String, Option<String>) {
    let bytes = device_name.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'[' {
            continue;
        }
        // up to four letters then a closing bracket
        let rest = &bytes[start + 1..];
        if let Some(end) = rest.iter().position(|&c| c == b']') {
            if (1..=4).contains(&end) && rest[..end].iter().all(|c| c.is_ascii_alphabetic()) {
                let tag = device_name[start + 1..start + 1 + end].to_string();
                let mut clean = String::with_capacity(device_name.len());
                clean.push_str(&device_name[..start]);
                clean.push_str(&device_name[start + end + 2..]);
                return (clean, Some(tag));
            }
        }
    }
    (device_name.to_string(), None)
}

/// Per-pixel source indices for the R, G and B channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelOrder {
    r: usize,
    g: usize,
    b: usize,
}

impl ChannelOrder {
    const IDENTITY: ChannelOrder = ChannelOrder { r: 0, g: 1, b: 2 };

    /// Resolve a tag like `"BGR"` or `"ARGB"` against a component count;
    /// malformed tags fall back to identity
    fn from_tag(tag: &str, components: usize) -> ChannelOrder {
        let find = |ch: char| {
            tag.chars()
                .position(|c| c.eq_ignore_ascii_case(&ch))
                .filter(|&idx| idx < components)
        };
        match (find('R'), find('G'), find('B')) {
            (Some(r), Some(g), Some(b)) => ChannelOrder { r, g, b },
            _ => {
                warn!(tag, "Malformed color tag, assuming RGB order");
                ChannelOrder::IDENTITY
            }
        }
    }
}

/// Decode a wire image into an owned [`Image`]
///
/// `wire_device_name` is the device name as received (tag included).
/// Single-channel 8/16-bit images pass through; 3- and 4-component 8-bit
/// images are reordered to RGB, dropping any alpha channel.
pub fn decode_image(msg: &ImageMessage, wire_device_name: &str) -> Result<Image> {
    let (name, tag) = parse_color_tag(wire_device_name);
    let size = [
        msg.subvol_size[0] as usize,
        msg.subvol_size[1] as usize,
        msg.subvol_size[2] as usize,
    ];
    let spacing = msg.spacing();

    match (msg.num_components as usize, msg.scalar_type) {
        (1, ScalarType::Uint8) | (1, ScalarType::Uint16) => Image::new(
            name,
            size,
            spacing,
            1,
            msg.scalar_type,
            // deep copy: the wire buffer is overwritten by the next frame
            msg.data.clone(),
        ),
        (components @ (3 | 4), ScalarType::Uint8) => {
            let order = tag
                .map(|t| ChannelOrder::from_tag(&t, components))
                .unwrap_or(ChannelOrder::IDENTITY);

            let pixels = size[0] * size[1] * size[2];
            let mut rgb = Vec::with_capacity(pixels * 3);
            for p in 0..pixels {
                let base = p * components;
                rgb.push(msg.data[base + order.r]);
                rgb.push(msg.data[base + order.g]);
                rgb.push(msg.data[base + order.b]);
            }
            Image::new(name, size, spacing, 3, ScalarType::Uint8, rgb)
        }
        (components, scalar) => Err(SliceLinkError::UnsupportedFormat {
            components,
            scalar: scalar.name(),
        }),
    }
}

/// Encode an internal image as a wire IMAGE message
///
/// Supported: single-channel 8-bit, single-channel 16-bit, 3-component
/// 8-bit RGB and 4-component 8-bit RGBA. Anything else is an error the
/// caller must check (and skip the frame).
pub fn encode_image(img: &Image) -> Result<ImageMessage> {
    let size = wire_size(img.size)?;
    let msg = match (img.components, img.scalar_type) {
        (1, ScalarType::Uint8) | (1, ScalarType::Uint16) => {
            ImageMessage::new(img.scalar_type, size, img.data.clone())?
        }
        (3, ScalarType::Uint8) => ImageMessage::rgb(img.scalar_type, size, img.data.clone())?,
        (4, ScalarType::Uint8) => ImageMessage::rgba(img.scalar_type, size, img.data.clone())?,
        (components, scalar) => {
            return Err(SliceLinkError::UnsupportedFormat {
                components,
                scalar: scalar.name(),
            })
        }
    };
    Ok(msg.with_spacing([
        img.spacing[0] as f32,
        img.spacing[1] as f32,
        img.spacing[2] as f32,
    ]))
}

fn wire_size(size: [usize; 3]) -> Result<[u16; 3]> {
    let mut wire = [0u16; 3];
    for (out, &dim) in wire.iter_mut().zip(size.iter()) {
        *out = u16::try_from(dim).map_err(|_| SliceLinkError::InvalidSize {
            expected: u16::MAX as usize,
            actual: dim,
        })?;
    }
    Ok(wire)
}

/// Merge probe geometry from a status/image message pair onto a baseline
///
/// Probe fields (type, origin, depth range, width) come from the status
/// message; image geometry (spacing, frame size) from the paired image
/// message. Fields carried by neither — notably the temporal calibration —
/// keep their baseline values.
pub fn merge_probe_status(
    status: &UsStatusMessage,
    image: &ImageMessage,
    base: &ProbeGeometry,
) -> ProbeGeometry {
    let spacing = image.spacing();
    ProbeGeometry {
        probe_type: status.probe_type,
        origin: status.origin,
        depth_start: status.depth_start,
        depth_end: status.depth_end,
        width: status.width,
        spacing,
        size: [
            image.subvol_size[0] as usize,
            image.subvol_size[1] as usize,
        ],
        temporal_calibration: base.temporal_calibration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::ustatus::ProbeType;

    #[test]
    fn test_parse_color_tag_variants() {
        assert_eq!(
            parse_color_tag("ImageSenderSonix[BGR]"),
            ("ImageSenderSonix".to_string(), Some("BGR".to_string()))
        );
        assert_eq!(
            parse_color_tag("GrabberServer[ARGB]"),
            ("GrabberServer".to_string(), Some("ARGB".to_string()))
        );
        // no tag
        assert_eq!(parse_color_tag("PlainDevice"), ("PlainDevice".to_string(), None));
        // malformed: too long, digits, unclosed
        assert_eq!(parse_color_tag("Dev[TOOLONG]"), ("Dev[TOOLONG]".to_string(), None));
        assert_eq!(parse_color_tag("Dev[B2R]"), ("Dev[B2R]".to_string(), None));
        assert_eq!(parse_color_tag("Dev[BGR"), ("Dev[BGR".to_string(), None));
        // empty brackets
        assert_eq!(parse_color_tag("Dev[]"), ("Dev[]".to_string(), None));
    }

    #[test]
    fn test_decode_grayscale_passthrough() {
        let msg = ImageMessage::new(ScalarType::Uint8, [4, 2, 1], (0u8..8).collect()).unwrap();
        let img = decode_image(&msg, "Probe").unwrap();
        assert_eq!(img.components, 1);
        assert_eq!(img.size, [4, 2, 1]);
        assert_eq!(img.data, (0u8..8).collect::<Vec<_>>());
        assert_eq!(img.name, "Probe");
    }

    #[test]
    fn test_decode_bgr_reorders() {
        // one pixel, B=1 G=2 R=3 on the wire
        let msg = ImageMessage::rgb(ScalarType::Uint8, [1, 1, 1], vec![1, 2, 3]).unwrap();
        let img = decode_image(&msg, "Cam[BGR]").unwrap();
        assert_eq!(img.name, "Cam");
        assert_eq!(img.components, 3);
        assert_eq!(img.data, vec![3, 2, 1]); // now R, G, B
    }

    #[test]
    fn test_decode_argb_drops_alpha() {
        // one pixel: A=9 R=10 G=11 B=12
        let msg = ImageMessage::rgba(ScalarType::Uint8, [1, 1, 1], vec![9, 10, 11, 12]).unwrap();
        let img = decode_image(&msg, "Grabber[ARGB]").unwrap();
        assert_eq!(img.components, 3);
        assert_eq!(img.data, vec![10, 11, 12]);
    }

    #[test]
    fn test_decode_rgba_without_tag_assumes_rgb_order() {
        let msg = ImageMessage::rgba(ScalarType::Uint8, [1, 1, 1], vec![10, 11, 12, 255]).unwrap();
        let img = decode_image(&msg, "Grabber").unwrap();
        assert_eq!(img.data, vec![10, 11, 12]);
    }

    #[test]
    fn test_decode_malformed_tag_falls_back_to_identity() {
        let msg = ImageMessage::rgb(ScalarType::Uint8, [1, 1, 1], vec![1, 2, 3]).unwrap();
        // XYZ has no R/G/B letters: identity order, tag still stripped
        let img = decode_image(&msg, "Cam[XYZ]").unwrap();
        assert_eq!(img.name, "Cam");
        assert_eq!(img.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_decode_rejects_unsupported_format() {
        let msg = ImageMessage::new(
            ScalarType::Float32,
            [2, 2, 1],
            vec![0u8; 2 * 2 * 4],
        )
        .unwrap();
        assert!(matches!(
            decode_image(&msg, "Probe"),
            Err(SliceLinkError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_encode_whitelist() {
        let gray = Image::new("us", [4, 4, 1], [0.5, 0.5, 1.0], 1, ScalarType::Uint8, vec![0; 16])
            .unwrap();
        let msg = encode_image(&gray).unwrap();
        assert_eq!(msg.num_components, 1);
        let spacing = msg.spacing();
        assert!((spacing[0] - 0.5).abs() < 1e-6);

        let float = Image::new(
            "us",
            [2, 2, 1],
            [1.0; 3],
            1,
            ScalarType::Float64,
            vec![0; 2 * 2 * 8],
        )
        .unwrap();
        assert!(matches!(
            encode_image(&float),
            Err(SliceLinkError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_encode_decode_roundtrip_rgb() {
        let img = Image::new(
            "us",
            [2, 1, 1],
            [1.0; 3],
            3,
            ScalarType::Uint8,
            vec![1, 2, 3, 4, 5, 6],
        )
        .unwrap();
        let msg = encode_image(&img).unwrap();
        let back = decode_image(&msg, "us").unwrap();
        assert_eq!(back.data, img.data);
        assert_eq!(back.size, img.size);
    }

    #[test]
    fn test_merge_preserves_temporal_calibration() {
        let status = UsStatusMessage {
            probe_type: ProbeType::Linear,
            origin: [160.0, 2.0, 0.0],
            depth_start: 5.0,
            depth_end: 80.0,
            width: 38.0,
        };
        let image = ImageMessage::new(ScalarType::Uint8, [320, 240, 1], vec![0; 320 * 240])
            .unwrap()
            .with_spacing([0.25, 0.25, 1.0]);

        let base = ProbeGeometry {
            temporal_calibration: 0.120,
            ..ProbeGeometry::default()
        };

        let merged = merge_probe_status(&status, &image, &base);
        assert_eq!(merged.probe_type, ProbeType::Linear);
        assert_eq!(merged.size, [320, 240]);
        assert!((merged.spacing[0] - 0.25).abs() < 1e-6);
        assert!((merged.depth_end - 80.0).abs() < 1e-12);
        // not carried by either message: kept from the baseline
        assert!((merged.temporal_calibration - 0.120).abs() < 1e-12);
    }
}
