//! IMAGE message body codec
//!
//! The IMAGE body starts with a 72-byte sub-header — version, component
//! count, scalar type, endianness, coordinate convention, grid size, a 3x4
//! orientation matrix (whose column norms carry the voxel spacing) and the
//! transmitted sub-volume — followed by the raw pixel payload.

use crate::error::{Result, SliceLinkError};
use crate::protocol::message::MessageBody;
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

/// Pixel scalar type, with the wire enum values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarType {
    Int8 = 2,
    Uint8 = 3,
    Int16 = 4,
    Uint16 = 5,
    Int32 = 6,
    Uint32 = 7,
    Float32 = 10,
    Float64 = 11,
}

impl ScalarType {
    /// Size of one scalar in bytes
    pub fn size(&self) -> usize {
        match self {
            ScalarType::Int8 | ScalarType::Uint8 => 1,
            ScalarType::Int16 | ScalarType::Uint16 => 2,
            ScalarType::Int32 | ScalarType::Uint32 | ScalarType::Float32 => 4,
            ScalarType::Float64 => 8,
        }
    }

    /// Wire name, used in error reporting
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int8 => "int8",
            ScalarType::Uint8 => "uint8",
            ScalarType::Int16 => "int16",
            ScalarType::Uint16 => "uint16",
            ScalarType::Int32 => "int32",
            ScalarType::Uint32 => "uint32",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
        }
    }

    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            2 => Ok(ScalarType::Int8),
            3 => Ok(ScalarType::Uint8),
            4 => Ok(ScalarType::Int16),
            5 => Ok(ScalarType::Uint16),
            6 => Ok(ScalarType::Int32),
            7 => Ok(ScalarType::Uint32),
            10 => Ok(ScalarType::Float32),
            11 => Ok(ScalarType::Float64),
            _ => Err(SliceLinkError::InvalidHeader(format!(
                "Unknown scalar type: {value}"
            ))),
        }
    }
}

/// Byte order of the pixel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big = 1,
    Little = 2,
}

impl Endian {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Endian::Big),
            2 => Ok(Endian::Little),
            _ => Err(SliceLinkError::InvalidHeader(format!(
                "Unknown endian flag: {value}"
            ))),
        }
    }
}

/// Anatomical coordinate convention of the image axes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    Ras = 1,
    Lps = 2,
}

impl CoordinateSystem {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(CoordinateSystem::Ras),
            2 => Ok(CoordinateSystem::Lps),
            _ => Err(SliceLinkError::InvalidHeader(format!(
                "Unknown coordinate system: {value}"
            ))),
        }
    }
}

/// Decoded IMAGE message body
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMessage {
    pub version: u16,
    /// 1 = grayscale, 3 = RGB, 4 = RGBA
    pub num_components: u8,
    pub scalar_type: ScalarType,
    pub endian: Endian,
    pub coordinate: CoordinateSystem,
    /// Full image grid size [columns, rows, slices]
    pub size: [u16; 3],
    /// Row-major upper 3x4 of the image-to-patient matrix; the norms of the
    /// first three columns are the voxel spacings
    pub matrix: [[f32; 4]; 3],
    /// Offset of the transmitted sub-volume within the full grid
    pub subvol_offset: [u16; 3],
    /// Size of the transmitted sub-volume
    pub subvol_size: [u16; 3],
    /// Raw pixel payload for the sub-volume
    pub data: Vec<u8>,
}

/// Sub-header size in bytes
const IMAGE_HEADER_SIZE: usize = 72;

impl ImageMessage {
    /// Single-component image covering the full grid
    pub fn new(scalar_type: ScalarType, size: [u16; 3], data: Vec<u8>) -> Result<Self> {
        Self::with_components(scalar_type, size, 1, data)
    }

    /// Three-component (RGB) image covering the full grid
    pub fn rgb(scalar_type: ScalarType, size: [u16; 3], data: Vec<u8>) -> Result<Self> {
        Self::with_components(scalar_type, size, 3, data)
    }

    /// Four-component (RGBA) image covering the full grid
    pub fn rgba(scalar_type: ScalarType, size: [u16; 3], data: Vec<u8>) -> Result<Self> {
        Self::with_components(scalar_type, size, 4, data)
    }

    fn with_components(
        scalar_type: ScalarType,
        size: [u16; 3],
        num_components: u8,
        data: Vec<u8>,
    ) -> Result<Self> {
        let expected = (size[0] as usize)
            * (size[1] as usize)
            * (size[2] as usize)
            * (num_components as usize)
            * scalar_type.size();
        if data.len() != expected {
            return Err(SliceLinkError::InvalidSize {
                expected,
                actual: data.len(),
            });
        }

        Ok(ImageMessage {
            version: 1,
            num_components,
            scalar_type,
            endian: Endian::Big,
            coordinate: CoordinateSystem::Ras,
            size,
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            subvol_offset: [0, 0, 0],
            subvol_size: size,
            data,
        })
    }

    /// Set the voxel spacing by scaling the matrix columns
    pub fn with_spacing(mut self, spacing: [f32; 3]) -> Self {
        for (col, s) in spacing.iter().enumerate() {
            let norm = ((self.matrix[0][col] as f64).powi(2)
                + (self.matrix[1][col] as f64).powi(2)
                + (self.matrix[2][col] as f64).powi(2))
            .sqrt();
            if norm > 0.0 {
                for row in 0..3 {
                    self.matrix[row][col] = ((self.matrix[row][col] as f64) / norm * (*s as f64)) as f32;
                }
            }
        }
        self
    }

    /// Voxel spacing, read back from the matrix column norms
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [0.0f64; 3];
        for (col, s) in spacing.iter_mut().enumerate() {
            *s = ((self.matrix[0][col] as f64).powi(2)
                + (self.matrix[1][col] as f64).powi(2)
                + (self.matrix[2][col] as f64).powi(2))
            .sqrt();
        }
        spacing
    }

    /// Expected payload length of the transmitted sub-volume
    pub fn expected_data_len(&self) -> usize {
        (self.subvol_size[0] as usize)
            * (self.subvol_size[1] as usize)
            * (self.subvol_size[2] as usize)
            * (self.num_components as usize)
            * self.scalar_type.size()
    }
}

impl MessageBody for ImageMessage {
    const TYPE_NAME: &'static str = "IMAGE";

    fn encode_body(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(IMAGE_HEADER_SIZE + self.data.len());
        buf.put_u16(self.version);
        buf.put_u8(self.num_components);
        buf.put_u8(self.scalar_type as u8);
        buf.put_u8(self.endian as u8);
        buf.put_u8(self.coordinate as u8);
        for &s in &self.size {
            buf.put_u16(s);
        }
        for row in &self.matrix {
            for &v in row {
                buf.put_f32(v);
            }
        }
        for &o in &self.subvol_offset {
            buf.put_u16(o);
        }
        for &s in &self.subvol_size {
            buf.put_u16(s);
        }
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    fn decode_body(mut data: &[u8]) -> Result<Self> {
        if data.len() < IMAGE_HEADER_SIZE {
            return Err(SliceLinkError::InvalidSize {
                expected: IMAGE_HEADER_SIZE,
                actual: data.len(),
            });
        }

        let version = data.get_u16();
        let num_components = data.get_u8();
        let scalar_type = ScalarType::from_u8(data.get_u8())?;
        let endian = Endian::from_u8(data.get_u8())?;
        let coordinate = CoordinateSystem::from_u8(data.get_u8())?;
        let size = [data.get_u16(), data.get_u16(), data.get_u16()];

        let mut matrix = [[0.0f32; 4]; 3];
        for row in &mut matrix {
            for v in row {
                *v = data.get_f32();
            }
        }

        let subvol_offset = [data.get_u16(), data.get_u16(), data.get_u16()];
        let subvol_size = [data.get_u16(), data.get_u16(), data.get_u16()];
        let payload = data.to_vec();

        let msg = ImageMessage {
            version,
            num_components,
            scalar_type,
            endian,
            coordinate,
            size,
            matrix,
            subvol_offset,
            subvol_size,
            data: payload,
        };

        let expected = msg.expected_data_len();
        if msg.data.len() != expected {
            return Err(SliceLinkError::InvalidSize {
                expected,
                actual: msg.data.len(),
            });
        }
        Ok(msg)
    }
}
