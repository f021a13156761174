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

//! Smooth-image detection for the gradient filter.
//!
//! Short horizontal runs are sampled along the block's diagonals and the
//! absolute differences between neighboring components are histogrammed. A
//! photo-like block has many small differences that thin out steadily as they
//! grow; its mean squared difference is then compared with the profile's
//! threshold.

use super::profile::CompressionProfile;
use crate::translate::split_rgb;

const DETECT_SUBROW_WIDTH: usize = 7;
const DETECT_MIN_WIDTH: usize = 8;
const DETECT_MIN_HEIGHT: usize = 8;

/// Mean squared neighbor difference of a block, or 0 when the histogram
/// does not look like continuous-tone content.
#[must_use]
pub fn smoothness_error(pixels: &[u32], w: usize, h: usize) -> u64 {
    let mut diff_stat = [0u64; 256];
    let mut pixel_count: u64 = 0;

    let (mut x, mut y) = (0usize, 0usize);
    while y < h && x < w {
        let mut d = 0;
        while d < h - y && d + x + DETECT_SUBROW_WIDTH < w {
            let row = (y + d) * w;
            let (r, g, b) = split_rgb(pixels[row + x + d]);
            let mut left = [r, g, b];
            for dx in 1..=DETECT_SUBROW_WIDTH {
                let (r, g, b) = split_rgb(pixels[row + x + d + dx]);
                let here = [r, g, b];
                for c in 0..3 {
                    diff_stat[usize::from(here[c].abs_diff(left[c]))] += 1;
                    left[c] = here[c];
                }
                pixel_count += 1;
            }
            d += 1;
        }
        if w > h {
            x += h;
            y = 0;
        } else {
            x = 0;
            y += w;
        }
    }

    if pixel_count == 0 || diff_stat[0] * 33 / pixel_count >= 95 {
        return 0;
    }

    let mut total: u64 = 0;
    for c in 1..8 {
        total += diff_stat[c] * (c * c) as u64;
        if diff_stat[c] == 0 || diff_stat[c] > diff_stat[c - 1] * 2 {
            return 0;
        }
    }
    for (c, &count) in diff_stat.iter().enumerate().skip(8) {
        total += count * (c * c) as u64;
    }

    let samples = pixel_count * 3 - diff_stat[0];
    if samples == 0 {
        return 0;
    }
    total / samples
}

/// Returns `true` if the block should be sent with the gradient filter.
#[must_use]
pub fn is_smooth(pixels: &[u32], w: usize, h: usize, profile: &CompressionProfile) -> bool {
    if profile.gradient_threshold24 == 0
        || w < DETECT_MIN_WIDTH
        || h < DETECT_MIN_HEIGHT
        || w * h < profile.gradient_min_rect_size
    {
        return false;
    }
    let error = smoothness_error(pixels, w, h);
    let smooth = error < u64::from(profile.gradient_threshold24);

    #[cfg(feature = "debug-logging")]
    log::info!("Tight: {w}x{h} smoothness error {error}, smooth={smooth}");

    smooth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::join_rgb;

    /// Vertical ramp with small horizontal noise, like a photo's sky.
    fn ramp(w: usize, h: usize) -> Vec<u32> {
        let mut state = 0x1234_5678u32;
        (0..w * h)
            .map(|i| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                let v = ((i / w) * 2 + (state % 10) as usize) as u8;
                join_rgb(v, v.wrapping_add(20), v.wrapping_add(40))
            })
            .collect()
    }

    #[test]
    fn test_flat_block_is_not_smooth() {
        let pixels = vec![0x0012_3456; 64 * 64];
        assert_eq!(smoothness_error(&pixels, 64, 64), 0);
        assert!(!is_smooth(&pixels, 64, 64, CompressionProfile::for_level(9)));
    }

    #[test]
    fn test_noise_is_not_smooth() {
        let mut state = 0x1234_5678u32;
        let pixels: Vec<u32> = (0..64 * 64)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                state & 0x00FF_FFFF
            })
            .collect();
        assert!(!is_smooth(&pixels, 64, 64, CompressionProfile::for_level(9)));
    }

    #[test]
    fn test_ramp_is_smooth() {
        let pixels = ramp(96, 96);
        let error = smoothness_error(&pixels, 96, 96);
        assert!(error > 0 && error < 500, "error {error}");
        assert!(is_smooth(&pixels, 96, 96, CompressionProfile::for_level(9)));
    }

    #[test]
    fn test_disabled_levels_and_small_blocks() {
        let pixels = ramp(96, 96);
        assert!(!is_smooth(&pixels, 96, 96, CompressionProfile::for_level(4)));
        let small = ramp(7, 100);
        assert!(!is_smooth(&small, 7, 100, CompressionProfile::for_level(9)));
    }
}
