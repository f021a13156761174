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

//! Bit packing for the Tight filters.
//!
//! - Mono: 1 bit per pixel, MSB first, each row padded to a whole byte. A set
//!   bit selects the foreground (palette entry 1).
//! - Indexed: 1 byte per pixel holding the palette index.
//! - RGB24 and gradient: 3 bytes (R, G, B) per pixel with no padding. The
//!   gradient filter stores each component's difference from the prediction
//!   `left + up - up_left`, clamped to 0..=255.

use super::palette::PaletteTable;
use crate::error::{Result, TightError};
use crate::translate::{join_rgb, split_rgb};

/// Bytes in one packed mono row of `w` pixels.
#[inline]
#[must_use]
pub fn mono_row_bytes(w: usize) -> usize {
    w.div_ceil(8)
}

fn check_len(what: &str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(TightError::Format(format!(
            "{what} data is {got} bytes, expected {expected}"
        )));
    }
    Ok(())
}

/// Packs a two-color block into a bitmap. Pixels equal to `background`
/// become 0 bits, everything else 1 bits.
#[must_use]
pub fn pack_mono(pixels: &[u32], w: usize, h: usize, background: u32) -> Vec<u8> {
    let row_bytes = mono_row_bytes(w);
    let mut bitmap = vec![0u8; row_bytes * h];
    if w == 0 {
        return bitmap;
    }

    for (src, dst) in pixels.chunks_exact(w).zip(bitmap.chunks_exact_mut(row_bytes)) {
        for (x, &pixel) in src.iter().enumerate() {
            if pixel != background {
                dst[x / 8] |= 0x80u8 >> (x % 8);
            }
        }
    }
    bitmap
}

/// Expands a bitmap into pixels, picking `palette[1]` for set bits and
/// `palette[0]` otherwise.
///
/// # Errors
///
/// Returns [`TightError::Format`] if `data` is not exactly one padded bitmap
/// of `w` x `h` pixels.
pub fn unpack_mono(data: &[u8], w: usize, h: usize, palette: [u32; 2]) -> Result<Vec<u32>> {
    let row_bytes = mono_row_bytes(w);
    check_len("mono", data.len(), row_bytes * h)?;

    let mut pixels = Vec::with_capacity(w * h);
    if w == 0 {
        return Ok(pixels);
    }
    for row in data.chunks_exact(row_bytes) {
        pixels.extend((0..w).map(|x| {
            let bit = (row[x / 8] >> (7 - x % 8)) & 1;
            palette[usize::from(bit)]
        }));
    }
    Ok(pixels)
}

/// Maps every pixel to its palette index.
///
/// # Errors
///
/// Returns [`TightError::InvalidOperation`] if a pixel is missing from the
/// palette, which means the palette was built from different pixels.
pub fn pack_indexed(pixels: &[u32], palette: &PaletteTable) -> Result<Vec<u8>> {
    pixels
        .iter()
        .map(|&pixel| {
            palette.index_of(pixel).ok_or_else(|| {
                TightError::InvalidOperation(format!("color {pixel:#08x} is not in the palette"))
            })
        })
        .collect()
}

/// Looks up each index in `palette`.
///
/// # Errors
///
/// Returns [`TightError::Format`] for an index past the end of the palette.
pub fn unpack_indexed(data: &[u8], palette: &[u32]) -> Result<Vec<u32>> {
    data.iter()
        .map(|&index| {
            palette.get(usize::from(index)).copied().ok_or_else(|| {
                TightError::Format(format!(
                    "palette index {index} out of range for {} colors",
                    palette.len()
                ))
            })
        })
        .collect()
}

/// Expands 3-byte RGB data into pixels.
///
/// # Errors
///
/// Returns [`TightError::Format`] if the length is not a multiple of 3.
pub fn unpack_rgb24(data: &[u8]) -> Result<Vec<u32>> {
    if data.len() % 3 != 0 {
        return Err(TightError::Format(format!(
            "RGB data length {} is not a multiple of 3",
            data.len()
        )));
    }
    Ok(data
        .chunks_exact(3)
        .map(|c| join_rgb(c[0], c[1], c[2]))
        .collect())
}

#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // Clamped to the u8 range
fn predict(left: u8, up: u8, up_left: u8) -> u8 {
    (i32::from(left) + i32::from(up) - i32::from(up_left)).clamp(0, 255) as u8
}

/// Applies the gradient filter, producing 3 residual bytes per pixel.
#[must_use]
pub fn filter_gradient(pixels: &[u32], w: usize, h: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(w * h * 3);
    let mut prev_row = vec![0u8; w * 3];
    if w == 0 {
        return out;
    }

    for row in pixels.chunks_exact(w).take(h) {
        let mut left = [0u8; 3];
        let mut up_left = [0u8; 3];
        for (x, &pixel) in row.iter().enumerate() {
            let (r, g, b) = split_rgb(pixel);
            let here = [r, g, b];
            for c in 0..3 {
                let up = prev_row[x * 3 + c];
                let residual = here[c].wrapping_sub(predict(left[c], up, up_left[c]));
                out.push(residual);
                up_left[c] = up;
                left[c] = here[c];
                prev_row[x * 3 + c] = here[c];
            }
        }
    }
    out
}

/// Reverses [`filter_gradient`].
///
/// # Errors
///
/// Returns [`TightError::Format`] if `data` is not exactly `w * h * 3` bytes.
pub fn unfilter_gradient(data: &[u8], w: usize, h: usize) -> Result<Vec<u32>> {
    check_len("gradient", data.len(), w * h * 3)?;

    let mut pixels = Vec::with_capacity(w * h);
    let mut prev_row = vec![0u8; w * 3];
    if w == 0 {
        return Ok(pixels);
    }

    for row in data.chunks_exact(w * 3) {
        let mut left = [0u8; 3];
        let mut up_left = [0u8; 3];
        for x in 0..w {
            let mut here = [0u8; 3];
            for c in 0..3 {
                let up = prev_row[x * 3 + c];
                here[c] = row[x * 3 + c].wrapping_add(predict(left[c], up, up_left[c]));
                up_left[c] = up;
                left[c] = here[c];
                prev_row[x * 3 + c] = here[c];
            }
            pixels.push(join_rgb(here[0], here[1], here[2]));
        }
    }
    Ok(pixels)
}
