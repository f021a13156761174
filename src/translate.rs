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

//! Pixel translation at the encoder's output boundary.
//!
//! Every algorithm in the codec works on `0x00RRGGBB` values. Only when a
//! color or a full-color payload is written to the wire does it get
//! converted, in one of two ways:
//!
//! - **Tight 24-bit pixels**: when the client format is 32 bpp, depth 24
//!   with 8-bit components, Tight sends 3 bytes (R, G, B) per pixel.
//! - **Native pixels**: otherwise the value is rescaled to the client's
//!   component maxima, shifted into place and written as
//!   `bits_per_pixel / 8` bytes in the client's byte order.
//!
//! # Supported Formats
//!
//! - **32bpp**: any shift combination, either endianness
//! - **16bpp**: RGB565, RGB555, BGR565, BGR555
//! - **8bpp**: BGR233 and other true-colour layouts

use crate::protocol::PixelFormat;
use bytes::{BufMut, BytesMut};

/// Splits an internal `0x00RRGGBB` pixel into components.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Each component is masked to 8 bits
pub fn split_rgb(pixel: u32) -> (u8, u8, u8) {
    ((pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8)
}

/// Joins components into an internal `0x00RRGGBB` pixel.
#[inline]
#[must_use]
pub fn join_rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Number of bytes one pixel occupies on the wire for `format`.
#[must_use]
pub fn wire_pixel_size(format: &PixelFormat) -> usize {
    if format.uses_tight_pixel24() {
        3
    } else {
        (format.bits_per_pixel / 8).max(1) as usize
    }
}

/// Writes one internal pixel in the client's wire format.
pub fn put_wire_pixel(dst: &mut BytesMut, pixel: u32, format: &PixelFormat) {
    let (r, g, b) = split_rgb(pixel);
    if format.uses_tight_pixel24() {
        dst.put_u8(r);
        dst.put_u8(g);
        dst.put_u8(b);
    } else {
        pack_pixel(dst, r, g, b, format);
    }
}

/// Translates internal pixels into the client's wire format.
///
/// # Arguments
///
/// * `src` - Row-major `0x00RRGGBB` pixels
/// * `format` - The client's requested pixel format
///
/// # Returns
///
/// A `BytesMut` containing `src.len() * wire_pixel_size(format)` bytes.
#[must_use]
pub fn translate_pixels(src: &[u32], format: &PixelFormat) -> BytesMut {
    let mut dst = BytesMut::with_capacity(src.len() * wire_pixel_size(format));
    if format.uses_tight_pixel24() {
        for &pixel in src {
            let (r, g, b) = split_rgb(pixel);
            dst.put_slice(&[r, g, b]);
        }
    } else {
        for &pixel in src {
            let (r, g, b) = split_rgb(pixel);
            pack_pixel(&mut dst, r, g, b, format);
        }
    }
    dst
}

/// Packs RGB components into the client's pixel format and writes to the buffer.
///
/// # Arguments
///
/// * `dst` - Destination buffer to write the packed pixel
/// * `r` - Red component (0-255)
/// * `g` - Green component (0-255)
/// * `b` - Blue component (0-255)
/// * `format` - The pixel format for packing
#[allow(clippy::cast_possible_truncation)] // Pixel value is truncated to the format's width
fn pack_pixel(dst: &mut BytesMut, r: u8, g: u8, b: u8, format: &PixelFormat) {
    // Scale components from 8-bit to client's color depth
    let r_scaled = downscale_component(r, format.red_max);
    let g_scaled = downscale_component(g, format.green_max);
    let b_scaled = downscale_component(b, format.blue_max);

    // Combine components with shifts
    let pixel_value = (u32::from(r_scaled) << format.red_shift)
        | (u32::from(g_scaled) << format.green_shift)
        | (u32::from(b_scaled) << format.blue_shift);

    // Write pixel value based on bitsPerPixel and endianness
    match format.bits_per_pixel {
        16 => {
            let bytes = if format.big_endian_flag != 0 {
                (pixel_value as u16).to_be_bytes()
            } else {
                (pixel_value as u16).to_le_bytes()
            };
            dst.extend_from_slice(&bytes);
        }
        32 => {
            let bytes = if format.big_endian_flag != 0 {
                pixel_value.to_be_bytes()
            } else {
                pixel_value.to_le_bytes()
            };
            dst.extend_from_slice(&bytes);
        }
        _ => {
            dst.put_u8(pixel_value as u8);
        }
    }
}

/// Downscales a color component from 8-bit (0-255) to the format-specific range.
///
/// # Arguments
///
/// * `value` - The component value in 0-255 range
/// * `max` - The maximum value for this component in the destination format
///
/// # Returns
///
/// The downscaled value in 0..max range.
#[inline]
#[allow(clippy::cast_possible_truncation)] // Result is at most `max`
fn downscale_component(value: u8, max: u16) -> u16 {
    if max == 0 {
        return 0;
    }
    if max == 255 {
        return u16::from(value);
    }

    // Downscale: value * max / 255
    ((u32::from(value) * u32::from(max)) / 255) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_join() {
        assert_eq!(split_rgb(0x00AB_CDEF), (0xAB, 0xCD, 0xEF));
        assert_eq!(join_rgb(0x12, 0x34, 0x56), 0x0012_3456);
    }

    #[test]
    fn test_pixel24_is_rgb_order() {
        let format = PixelFormat::rgba32();
        let dst = translate_pixels(&[0x00FF_8000, 0x0000_00FF], &format);
        assert_eq!(&dst[..], &[0xFF, 0x80, 0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(wire_pixel_size(&format), 3);
    }

    #[test]
    fn test_rgb888_to_rgb565() {
        let format = PixelFormat::rgb565();

        // Pure red: R=255, G=0, B=0
        let dst = translate_pixels(&[0x00FF_0000], &format);

        // In RGB565: red=(255*31/255)<<11 = 31<<11 = 0xF800
        assert_eq!(dst.len(), 2);
        let value = u16::from_le_bytes([dst[0], dst[1]]);
        assert_eq!(value, 0xF800);
    }

    #[test]
    fn test_big_endian_native_32() {
        let format = PixelFormat {
            depth: 32,
            big_endian_flag: 1,
            ..PixelFormat::rgb888()
        };
        assert!(!format.uses_tight_pixel24());
        let mut dst = BytesMut::new();
        put_wire_pixel(&mut dst, 0x0011_2233, &format);
        assert_eq!(&dst[..], &[0x00, 0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_bgr233() {
        let format = PixelFormat::bgr233();
        let mut dst = BytesMut::new();
        // White packs into every bit.
        put_wire_pixel(&mut dst, 0x00FF_FFFF, &format);
        assert_eq!(&dst[..], &[0xFF]);
        assert_eq!(wire_pixel_size(&format), 1);
    }

    #[test]
    fn test_downscale_component() {
        // 8-bit (0-255) to 5-bit (0-31)
        assert_eq!(downscale_component(0, 31), 0);
        assert_eq!(downscale_component(255, 31), 31);
        assert_eq!(downscale_component(128, 31), 15); // ~half

        // Identity: 8-bit to 8-bit
        assert_eq!(downscale_component(128, 255), 128);
    }
}
