//! Request descriptors and frame encoding.
//!
//! Every command the controller can issue is one [`Request`] variant. A
//! variant knows its opcode and how to lay out its fixed payload; the frame
//! around it (plain sync word, opcode, length) is the same for all of them.

use heapless::Vec;

use crate::frame::{EncodeError, HEADER_SIZE, MAX_REQUEST_FRAME, MAX_REQUEST_PAYLOAD, SYNC_NO_CHECKSUM};
use crate::line::{FeatureMode, FeatureSet, LineModeFlags};

// Request opcodes
pub const REQ_RESOLUTION: u8 = 12;
pub const REQ_VERSION: u8 = 14;
pub const REQ_BRIGHTNESS: u8 = 16;
pub const REQ_SERVOS: u8 = 18;
pub const REQ_LED: u8 = 20;
pub const REQ_LAMP: u8 = 22;
pub const REQ_FRAME_RATE: u8 = 24;
pub const REQ_BLOCKS: u8 = 32;
pub const REQ_LINE_FEATURES: u8 = 48;
pub const REQ_LINE_MODE: u8 = 54;
pub const REQ_VECTOR: u8 = 56;
pub const REQ_NEXT_TURN: u8 = 58;
pub const REQ_DEFAULT_TURN: u8 = 60;
pub const REQ_REVERSE_VECTOR: u8 = 62;
pub const REQ_PIXEL_COLOR: u8 = 112;

/// Filter mask selecting which color signatures a block query reports.
///
/// Signatures 1-7 map to bits 0-6; bit 7 selects color codes (multi-tag
/// signatures). [`SignatureMap::ALL`] accepts everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignatureMap(u8);

impl SignatureMap {
    /// Reject every signature
    pub const NONE: Self = Self(0);
    /// Accept every signature and color codes
    pub const ALL: Self = Self(0xFF);
    /// Accept color-code blocks (combined signatures)
    pub const COLOR_CODES: Self = Self(0x80);

    /// Mask accepting a single signature (1-7)
    ///
    /// Out-of-range numbers produce an empty mask.
    pub fn signature(number: u8) -> Self {
        match number {
            1..=7 => Self(1 << (number - 1)),
            _ => Self::NONE,
        }
    }

    /// Raw wire value
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl core::ops::BitOr for SignatureMap {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A command to send to the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Request {
    /// Query hardware and firmware version
    Version,
    /// Query the frame resolution of the running program
    Resolution,
    /// Set relative exposure of the image sensor
    Brightness(u8),
    /// Set both RC servo outputs (0-511 each)
    Servos { s0: u16, s1: u16 },
    /// Override the RGB LED color
    Led { red: u8, green: u8, blue: u8 },
    /// Switch the white illumination LEDs and the RGB LED lamp
    Lamp { upper: bool, lower: bool },
    /// Query the current capture rate in frames per second
    FrameRate,
    /// Query detected color blocks
    Blocks {
        signatures: SignatureMap,
        max_blocks: u8,
    },
    /// Query line-tracking features
    LineFeatures {
        mode: FeatureMode,
        filter: FeatureSet,
    },
    /// Configure the line-tracking algorithm
    LineMode(LineModeFlags),
    /// Choose the branch angle for the next intersection only
    NextTurn { angle: i16 },
    /// Choose the default branch angle for intersections
    DefaultTurn { angle: i16 },
    /// Manually select the vector to track (manual-select mode)
    Vector { index: u8 },
    /// Swap head and tail of the tracked vector
    ReverseVector,
    /// Query the average color of the 5x5 pixel square at (x, y)
    PixelColor { x: u16, y: u16, saturate: bool },
}

impl Request {
    /// Opcode carried in the frame's type byte
    pub fn opcode(&self) -> u8 {
        match self {
            Request::Version => REQ_VERSION,
            Request::Resolution => REQ_RESOLUTION,
            Request::Brightness(_) => REQ_BRIGHTNESS,
            Request::Servos { .. } => REQ_SERVOS,
            Request::Led { .. } => REQ_LED,
            Request::Lamp { .. } => REQ_LAMP,
            Request::FrameRate => REQ_FRAME_RATE,
            Request::Blocks { .. } => REQ_BLOCKS,
            Request::LineFeatures { .. } => REQ_LINE_FEATURES,
            Request::LineMode(_) => REQ_LINE_MODE,
            Request::NextTurn { .. } => REQ_NEXT_TURN,
            Request::DefaultTurn { .. } => REQ_DEFAULT_TURN,
            Request::Vector { .. } => REQ_VECTOR,
            Request::ReverseVector => REQ_REVERSE_VECTOR,
            Request::PixelColor { .. } => REQ_PIXEL_COLOR,
        }
    }

    /// Fill the fixed payload layout; returns the byte count used.
    fn payload(&self) -> ([u8; MAX_REQUEST_PAYLOAD], usize) {
        let mut bytes = [0u8; MAX_REQUEST_PAYLOAD];
        let len = match *self {
            Request::Version | Request::FrameRate | Request::ReverseVector => 0,
            Request::Resolution => {
                // One reserved byte, always zero
                bytes[0] = 0;
                1
            }
            Request::Brightness(level) => {
                bytes[0] = level;
                1
            }
            Request::Servos { s0, s1 } => {
                bytes[0..2].copy_from_slice(&s0.to_le_bytes());
                bytes[2..4].copy_from_slice(&s1.to_le_bytes());
                4
            }
            Request::Led { red, green, blue } => {
                bytes[0] = red;
                bytes[1] = green;
                bytes[2] = blue;
                3
            }
            Request::Lamp { upper, lower } => {
                bytes[0] = u8::from(upper);
                bytes[1] = u8::from(lower);
                2
            }
            Request::Blocks {
                signatures,
                max_blocks,
            } => {
                bytes[0] = signatures.bits();
                bytes[1] = max_blocks;
                2
            }
            Request::LineFeatures { mode, filter } => {
                bytes[0] = mode.wire_value();
                bytes[1] = filter.bits();
                2
            }
            Request::LineMode(flags) => {
                bytes[0] = flags.bits();
                1
            }
            Request::NextTurn { angle } | Request::DefaultTurn { angle } => {
                bytes[0..2].copy_from_slice(&angle.to_le_bytes());
                2
            }
            Request::Vector { index } => {
                bytes[0] = index;
                1
            }
            Request::PixelColor { x, y, saturate } => {
                bytes[0..2].copy_from_slice(&x.to_le_bytes());
                bytes[2..4].copy_from_slice(&y.to_le_bytes());
                bytes[4] = u8::from(saturate);
                5
            }
        };
        (bytes, len)
    }

    /// Encode the complete request frame into a byte buffer
    ///
    /// Returns the number of bytes written. Requests always use the plain
    /// sync word; no checksum is appended.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, EncodeError> {
        let (payload, len) = self.payload();
        let total = HEADER_SIZE + len;
        if buffer.len() < total {
            return Err(EncodeError::BufferTooSmall);
        }

        buffer[0..2].copy_from_slice(&SYNC_NO_CHECKSUM.to_le_bytes());
        buffer[2] = self.opcode();
        buffer[3] = len as u8;
        buffer[4..total].copy_from_slice(&payload[..len]);

        Ok(total)
    }

    /// Encode the complete request frame into a heapless Vec
    pub fn encode_to_vec(&self) -> Vec<u8, MAX_REQUEST_FRAME> {
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        // Cannot fail: the buffer is sized for the largest frame
        let len = self.encode(&mut buffer).unwrap_or(MAX_REQUEST_FRAME);
        let mut vec = Vec::new();
        let _ = vec.extend_from_slice(&buffer[..len]);
        vec
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_version_request() {
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = Request::Version.encode(&mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..4], &[0xAE, 0xC1, 14, 0]);
    }

    #[test]
    fn test_encode_resolution_carries_reserved_byte() {
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = Request::Resolution.encode(&mut buffer).unwrap();

        assert_eq!(len, 5);
        assert_eq!(&buffer[..5], &[0xAE, 0xC1, 12, 1, 0]);
    }

    #[test]
    fn test_encode_servos_little_endian() {
        let request = Request::Servos { s0: 0x01FF, s1: 0x0002 };
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = request.encode(&mut buffer).unwrap();

        assert_eq!(len, 8);
        assert_eq!(&buffer[..8], &[0xAE, 0xC1, 18, 4, 0xFF, 0x01, 0x02, 0x00]);
    }

    #[test]
    fn test_encode_pixel_color_full_layout() {
        let request = Request::PixelColor {
            x: 300,
            y: 100,
            saturate: true,
        };
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = request.encode(&mut buffer).unwrap();

        assert_eq!(len, 9);
        assert_eq!(&buffer[..4], &[0xAE, 0xC1, 112, 5]);
        assert_eq!(&buffer[4..6], &300u16.to_le_bytes());
        assert_eq!(&buffer[6..8], &100u16.to_le_bytes());
        assert_eq!(buffer[8], 1);
    }

    #[test]
    fn test_encode_next_turn_negative_angle() {
        let request = Request::NextTurn { angle: -90 };
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = request.encode(&mut buffer).unwrap();

        assert_eq!(len, 6);
        assert_eq!(&buffer[4..6], &(-90i16).to_le_bytes());
    }

    #[test]
    fn test_encode_buffer_too_small() {
        let mut buffer = [0u8; 3];
        let result = Request::Version.encode(&mut buffer);
        assert_eq!(result, Err(EncodeError::BufferTooSmall));
    }

    #[test]
    fn test_encode_to_vec_matches_encode() {
        let request = Request::Blocks {
            signatures: SignatureMap::ALL,
            max_blocks: 10,
        };
        let mut buffer = [0u8; MAX_REQUEST_FRAME];
        let len = request.encode(&mut buffer).unwrap();

        let vec = request.encode_to_vec();
        assert_eq!(&vec[..], &buffer[..len]);
    }

    #[test]
    fn test_signature_map() {
        assert_eq!(SignatureMap::signature(1).bits(), 0x01);
        assert_eq!(SignatureMap::signature(7).bits(), 0x40);
        assert_eq!(SignatureMap::signature(8).bits(), 0x00);
        assert_eq!(
            (SignatureMap::signature(1) | SignatureMap::signature(5)).bits(),
            0x11
        );
    }
}
