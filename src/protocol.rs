// Copyright 2025 Dustin McAfee
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Remote Framebuffer (RFB) protocol constants and structures used by Tight.
//!
//! This module holds the pieces of the RFB wire format the codec touches:
//! the rectangle header that precedes every encoded rectangle, the pixel
//! format description used at the encoder's output boundary, the Tight
//! compression-control byte, and the compact length field.
//!
//! # Tight Record Layout
//!
//! ```text
//! +------------------+
//! | compression_ctl  |  1 byte (4 reset bits + 4 subencoding bits)
//! +------------------+
//! | [filter id]      |  1 byte, only when the explicit filter flag is set
//! +------------------+
//! | [palette]        |  1 byte count-1, then count pixels (palette filter only)
//! +------------------+
//! | [compact length] |  1-3 bytes, only when the payload is compressed
//! +------------------+
//! | payload          |  raw (< 12 bytes) or one sync-flushed zlib block
//! +------------------+
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, TightError};

// Encoding Types

/// Encoding type: Tight.
///
/// Rectangle-oriented, palette-aware encoding multiplexed over four
/// persistent zlib streams.
pub const ENCODING_TIGHT: i32 = 7;

/// Pseudo-encoding: `LastRect`.
///
/// Terminates a framebuffer update whose rectangle count was sent as
/// `0xFFFF` because the encoder could not predict it in advance.
pub const ENCODING_LAST_RECT: i32 = -224;

/// Pseudo-encoding: Compression Level 0 (no compression, fastest).
///
/// Requests the server to use minimal or no compression for encodings
/// that support adjustable compression levels (e.g., Zlib, Tight).
pub const ENCODING_COMPRESS_LEVEL_0: i32 = -256;

/// Pseudo-encoding: Compression Level 9 (maximum compression, slowest).
///
/// Requests the server to use maximum compression, trading CPU time
/// for reduced bandwidth usage.
pub const ENCODING_COMPRESS_LEVEL_9: i32 = -247;

/// Message type: Server sends a framebuffer update.
pub const SERVER_MSG_FRAMEBUFFER_UPDATE: u8 = 0;

/// Rectangle count announced when the update is terminated by `LastRect`.
pub const UNKNOWN_RECT_COUNT: u16 = 0xFFFF;

/// Size of a rectangle header on the wire.
pub const RECT_HEADER_SIZE: usize = 12;

// Tight compression control (upper nibble of the control byte)

/// Tight: explicit filter id follows the control byte.
pub const TIGHT_EXPLICIT_FILTER: u8 = 0x04;

/// Tight: solid fill subencoding.
pub const TIGHT_FILL: u8 = 0x08;

/// Tight: JPEG subencoding (recognized, never produced nor decoded).
pub const TIGHT_JPEG: u8 = 0x09;

/// Tight: highest defined subencoding value.
pub const TIGHT_MAX_SUBENCODING: u8 = 0x09;

// Tight filter ids

/// Tight filter: plain copy of RGB data.
pub const TIGHT_FILTER_COPY: u8 = 0x00;

/// Tight filter: palette indices (1 bit per pixel for 2 colors, else 1 byte).
pub const TIGHT_FILTER_PALETTE: u8 = 0x01;

/// Tight filter: gradient prediction residuals.
pub const TIGHT_FILTER_GRADIENT: u8 = 0x02;

// Zlib stream ids

/// Zlib stream for full-color (copy filter) data.
pub const STREAM_ID_FULL_COLOR: u8 = 0;
/// Zlib stream for two-color bitmaps.
pub const STREAM_ID_MONO: u8 = 1;
/// Zlib stream for palette indices.
pub const STREAM_ID_INDEXED: u8 = 2;
/// Zlib stream for gradient-filtered data.
pub const STREAM_ID_GRADIENT: u8 = 3;

/// Number of independent zlib streams per connection.
pub const TIGHT_STREAM_COUNT: usize = 4;

/// Payloads shorter than this are sent raw, without a length field.
pub const TIGHT_MIN_TO_COMPRESS: usize = 12;

/// Widest rectangle a Tight record may describe.
pub const TIGHT_MAX_RECT_WIDTH: u16 = 2048;

/// Largest value the 3-byte compact length can carry.
pub const TIGHT_MAX_COMPACT_LENGTH: usize = 0x3F_FFFF;

/// Maximum number of palette entries.
pub const TIGHT_MAX_PALETTE: usize = 256;

/// Subencoding selected by the upper nibble of a control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subencoding {
    /// Solid fill; one pixel follows.
    Fill,
    /// JPEG image; unsupported by this codec.
    Jpeg,
    /// Basic compression on one of the four zlib streams.
    Basic {
        /// Zlib stream id (0-3).
        stream: u8,
        /// Whether a filter id byte follows.
        explicit_filter: bool,
    },
}

/// A decoded Tight compression-control byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte {
    /// Per-stream reset bits (bit N resets stream N).
    pub reset_mask: u8,
    /// The subencoding carried in the upper nibble.
    pub subencoding: Subencoding,
}

impl ControlByte {
    /// Builds a control byte for a solid fill.
    #[must_use]
    pub fn fill(reset_mask: u8) -> Self {
        Self {
            reset_mask: reset_mask & 0x0F,
            subencoding: Subencoding::Fill,
        }
    }

    /// Builds a control byte for basic compression on `stream`.
    #[must_use]
    pub fn basic(reset_mask: u8, stream: u8, explicit_filter: bool) -> Self {
        Self {
            reset_mask: reset_mask & 0x0F,
            subencoding: Subencoding::Basic {
                stream: stream & 0x03,
                explicit_filter,
            },
        }
    }

    /// Parses a control byte.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Format`] if the subencoding is beyond the
    /// defined range.
    pub fn parse(byte: u8) -> Result<Self> {
        let reset_mask = byte & 0x0F;
        let kind = byte >> 4;
        let subencoding = match kind {
            TIGHT_FILL => Subencoding::Fill,
            TIGHT_JPEG => Subencoding::Jpeg,
            k if k > TIGHT_MAX_SUBENCODING => {
                return Err(TightError::Format(format!(
                    "invalid Tight subencoding {k:#x} (control byte {byte:#04x})"
                )));
            }
            k => Subencoding::Basic {
                stream: k & 0x03,
                explicit_filter: k & TIGHT_EXPLICIT_FILTER != 0,
            },
        };
        Ok(Self {
            reset_mask,
            subencoding,
        })
    }

    /// Serializes the control byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        let kind = match self.subencoding {
            Subencoding::Fill => TIGHT_FILL,
            Subencoding::Jpeg => TIGHT_JPEG,
            Subencoding::Basic {
                stream,
                explicit_filter,
            } => {
                let filter = if explicit_filter {
                    TIGHT_EXPLICIT_FILTER
                } else {
                    0
                };
                (stream & 0x03) | filter
            }
        };
        (kind << 4) | (self.reset_mask & 0x0F)
    }
}

/// Write compact length encoding (1-3 bytes).
///
/// - 0-127: 1 byte (0xxxxxxx)
/// - 128-16383: 2 bytes (1xxxxxxx 0yyyyyyy)
/// - 16384-4194303: 3 bytes (1xxxxxxx 1yyyyyyy zzzzzzzz)
///
/// # Errors
///
/// Returns [`TightError::Resource`] if `len` exceeds
/// [`TIGHT_MAX_COMPACT_LENGTH`].
#[allow(clippy::cast_possible_truncation)] // Compact length uses 7-bit groups packed in u8
pub fn write_compact_length(buf: &mut BytesMut, len: usize) -> Result<()> {
    if len > TIGHT_MAX_COMPACT_LENGTH {
        return Err(TightError::Resource(format!(
            "compressed payload of {len} bytes exceeds the compact length limit"
        )));
    }
    if len < 128 {
        buf.put_u8(len as u8);
    } else if len < 16384 {
        buf.put_u8(((len & 0x7F) | 0x80) as u8);
        buf.put_u8(((len >> 7) & 0x7F) as u8);
    } else {
        buf.put_u8(((len & 0x7F) | 0x80) as u8);
        buf.put_u8((((len >> 7) & 0x7F) | 0x80) as u8);
        buf.put_u8((len >> 14) as u8);
    }
    Ok(())
}

/// Represents the pixel format of the VNC framebuffer.
///
/// This struct defines how pixel data is interpreted, including color depth,
/// endianness, and RGB component details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelFormat {
    /// Number of bits per pixel.
    pub bits_per_pixel: u8,
    /// Depth of the pixel in bits.
    pub depth: u8,
    /// Flag indicating if the pixel data is big-endian (1) or little-endian (0).
    pub big_endian_flag: u8,
    /// Flag indicating if the pixel format is true-colour (1) or colormapped (0).
    pub true_colour_flag: u8,
    /// Maximum red color value.
    pub red_max: u16,
    /// Maximum green color value.
    pub green_max: u16,
    /// Maximum blue color value.
    pub blue_max: u16,
    /// Number of shifts to apply to get the red color component.
    pub red_shift: u8,
    /// Number of shifts to apply to get the green color component.
    pub green_shift: u8,
    /// Number of shifts to apply to get the blue color component.
    pub blue_shift: u8,
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::rgb888()
    }
}

impl PixelFormat {
    /// Creates the 32-bit, depth 24 format matching the codec's internal
    /// `0x00RRGGBB` pixel layout.
    #[must_use]
    pub fn rgb888() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 16,
            green_shift: 8,
            blue_shift: 0,
        }
    }

    /// Creates a standard 32-bit RGBA pixel format (red in the lowest byte).
    #[must_use]
    pub fn rgba32() -> Self {
        Self {
            bits_per_pixel: 32,
            depth: 24,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 255,
            green_max: 255,
            blue_max: 255,
            red_shift: 0,
            green_shift: 8,
            blue_shift: 16,
        }
    }

    /// Creates a 16-bit RGB565 pixel format.
    ///
    /// RGB565 uses 5 bits for red, 6 bits for green, and 5 bits for blue.
    #[must_use]
    pub fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            depth: 16,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 31,
            green_max: 63,
            blue_max: 31,
            red_shift: 11,
            green_shift: 5,
            blue_shift: 0,
        }
    }

    /// Creates an 8-bit BGR233 pixel format.
    ///
    /// BGR233 uses 2 bits for blue, 3 bits for green, and 3 bits for red.
    #[must_use]
    pub fn bgr233() -> Self {
        Self {
            bits_per_pixel: 8,
            depth: 8,
            big_endian_flag: 0,
            true_colour_flag: 1,
            red_max: 7,
            green_max: 7,
            blue_max: 3,
            red_shift: 0,
            green_shift: 3,
            blue_shift: 6,
        }
    }

    /// Returns `true` if Tight sends pixels of this format as 3 bytes
    /// (R, G, B) instead of the native `bits_per_pixel / 8` bytes.
    #[must_use]
    pub fn uses_tight_pixel24(&self) -> bool {
        self.bits_per_pixel == 32
            && self.depth == 24
            && self.true_colour_flag != 0
            && self.red_max == 255
            && self.green_max == 255
            && self.blue_max == 255
    }

    /// Validates that this pixel format can be produced by the encoder.
    ///
    /// Only true-colour formats with 8, 16 or 32 bits per pixel are accepted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !matches!(self.bits_per_pixel, 8 | 16 | 32) {
            return false;
        }
        if self.depth == 0 || self.depth > 32 || self.true_colour_flag == 0 {
            return false;
        }

        #[allow(clippy::cast_possible_truncation)]
        // leading_zeros() returns max 16, result always fits in u8
        let bits_needed = |max: u16| -> u8 {
            if max == 0 {
                0
            } else {
                (16 - max.leading_zeros()) as u8
            }
        };

        let total = bits_needed(self.red_max)
            + bits_needed(self.green_max)
            + bits_needed(self.blue_max);
        total <= self.depth
            && self.red_shift < 32
            && self.green_shift < 32
            && self.blue_shift < 32
    }
}

/// Represents a rectangle header in a framebuffer update message.
///
/// Each framebuffer update can contain multiple rectangles, each with its own
/// encoding type. The rectangle header specifies the position, dimensions,
/// and encoding of the pixel data that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rectangle {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width of the rectangle in pixels.
    pub width: u16,
    /// Height of the rectangle in pixels.
    pub height: u16,
    /// The encoding type used for this rectangle's pixel data.
    pub encoding: i32,
}

impl Rectangle {
    /// Writes the rectangle header to a byte buffer.
    ///
    /// The header format is:
    /// - 2 bytes: x position
    /// - 2 bytes: y position
    /// - 2 bytes: width
    /// - 2 bytes: height
    /// - 4 bytes: encoding type (signed 32-bit integer)
    pub fn write_header(&self, buf: &mut BytesMut) {
        buf.put_u16(self.x);
        buf.put_u16(self.y);
        buf.put_u16(self.width);
        buf.put_u16(self.height);
        buf.put_i32(self.encoding);
    }

    /// Parses a 12-byte rectangle header.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::InvalidOperation`] if fewer than 12 bytes are given.
    pub fn read_header(mut bytes: &[u8]) -> Result<Self> {
        if bytes.len() < RECT_HEADER_SIZE {
            return Err(TightError::InvalidOperation(format!(
                "rectangle header needs {RECT_HEADER_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            x: bytes.get_u16(),
            y: bytes.get_u16(),
            width: bytes.get_u16(),
            height: bytes.get_u16(),
            encoding: bytes.get_i32(),
        })
    }

    /// Returns `true` for the `LastRect` terminator.
    #[must_use]
    pub fn is_last_rect(&self) -> bool {
        self.encoding == ENCODING_LAST_RECT
    }
}

/// Writes the `FramebufferUpdate` message header announcing `rect_count`
/// rectangles (use [`UNKNOWN_RECT_COUNT`] when terminating with `LastRect`).
pub fn write_update_header(buf: &mut BytesMut, rect_count: u16) {
    buf.put_u8(SERVER_MSG_FRAMEBUFFER_UPDATE);
    buf.put_u8(0); // padding
    buf.put_u16(rect_count);
}

/// Writes the `LastRect` pseudo-rectangle that terminates an update.
pub fn write_last_rect(buf: &mut BytesMut) {
    Rectangle {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
        encoding: ENCODING_LAST_RECT,
    }
    .write_header(buf);
}

/// Derives the Tight compression level from a client's `SetEncodings` list.
///
/// The `CompressLevel` pseudo-encodings (-256..=-247) select levels 0-9.
/// If several are listed the last one wins.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // range checked above
pub fn compress_level_from_encodings(encodings: &[i32]) -> Option<u8> {
    encodings
        .iter()
        .rev()
        .find(|&&e| (ENCODING_COMPRESS_LEVEL_0..=ENCODING_COMPRESS_LEVEL_9).contains(&e))
        .map(|&e| (e - ENCODING_COMPRESS_LEVEL_0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_byte_fill() {
        let ctl = ControlByte::parse(0x80).unwrap();
        assert_eq!(ctl.subencoding, Subencoding::Fill);
        assert_eq!(ctl.reset_mask, 0);
        assert_eq!(ControlByte::fill(0).to_byte(), 0x80);
    }

    #[test]
    fn test_control_byte_basic_with_resets() {
        // stream 2, explicit filter, reset streams 0 and 3
        let ctl = ControlByte::parse(0x69).unwrap();
        assert_eq!(ctl.reset_mask, 0x09);
        assert_eq!(
            ctl.subencoding,
            Subencoding::Basic {
                stream: 2,
                explicit_filter: true
            }
        );
        assert_eq!(ctl.to_byte(), 0x69);
    }

    #[test]
    fn test_control_byte_invalid() {
        assert!(ControlByte::parse(0xA0).is_err());
        assert!(ControlByte::parse(0xF3).is_err());
        assert_eq!(ControlByte::parse(0x90).unwrap().subencoding, Subencoding::Jpeg);
    }

    #[test]
    fn test_compact_length() {
        let mut buf = BytesMut::new();
        write_compact_length(&mut buf, 100).unwrap();
        assert_eq!(&buf[..], &[100]);

        buf.clear();
        write_compact_length(&mut buf, 300).unwrap();
        assert_eq!(&buf[..], &[0xAC, 0x02]);

        buf.clear();
        write_compact_length(&mut buf, 20000).unwrap();
        assert_eq!(&buf[..], &[0xA0, 0x9C, 0x01]);

        assert!(write_compact_length(&mut buf, TIGHT_MAX_COMPACT_LENGTH + 1).is_err());
    }

    #[test]
    fn test_rectangle_header_round_trip() {
        let rect = Rectangle {
            x: 1,
            y: 2,
            width: 300,
            height: 400,
            encoding: ENCODING_TIGHT,
        };
        let mut buf = BytesMut::new();
        rect.write_header(&mut buf);
        assert_eq!(buf.len(), RECT_HEADER_SIZE);
        assert_eq!(Rectangle::read_header(&buf).unwrap(), rect);
        assert!(Rectangle::read_header(&buf[..11]).is_err());
    }

    #[test]
    fn test_last_rect() {
        let mut buf = BytesMut::new();
        write_last_rect(&mut buf);
        let rect = Rectangle::read_header(&buf).unwrap();
        assert!(rect.is_last_rect());
        assert_eq!(&buf[8..], &(-224i32).to_be_bytes());
    }

    #[test]
    fn test_compress_level_from_encodings() {
        assert_eq!(compress_level_from_encodings(&[ENCODING_TIGHT]), None);
        assert_eq!(
            compress_level_from_encodings(&[ENCODING_TIGHT, -250, 0]),
            Some(6)
        );
        assert_eq!(compress_level_from_encodings(&[-256, -247]), Some(9));
    }

    #[test]
    fn test_pixel24_detection() {
        assert!(PixelFormat::rgb888().uses_tight_pixel24());
        assert!(PixelFormat::rgba32().uses_tight_pixel24());
        assert!(!PixelFormat::rgb565().uses_tight_pixel24());
        assert!(PixelFormat::rgb565().is_valid());
        assert!(PixelFormat::bgr233().is_valid());
    }
}
