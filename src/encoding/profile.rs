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

//! Compression profiles for Tight compression levels 0-9.

use crate::protocol::TIGHT_MAX_PALETTE;

/// Tuning parameters selected by the client's compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionProfile {
    /// Largest number of pixels in one encoded subrectangle.
    pub max_rect_size: usize,
    /// Widest encoded subrectangle.
    pub max_rect_width: u16,
    /// Smallest area for which a two-color palette is still worth it.
    pub mono_min_rect_size: usize,
    /// Smallest area the gradient filter is considered for.
    pub gradient_min_rect_size: usize,
    /// Deflate level for palette indices (stream 2).
    pub idx_zlib_level: u8,
    /// Deflate level for two-color bitmaps (stream 1).
    pub mono_zlib_level: u8,
    /// Deflate level for full-color data (stream 0).
    pub raw_zlib_level: u8,
    /// Deflate level for gradient residuals (stream 3).
    pub gradient_zlib_level: u8,
    /// Smoothness threshold for 16-bit data (kept for completeness).
    pub gradient_threshold: u32,
    /// Smoothness threshold for 24-bit data; 0 disables the gradient filter.
    pub gradient_threshold24: u32,
    /// The palette may hold at most `area / idx_max_colors_divisor` colors.
    pub idx_max_colors_divisor: usize,
}

#[allow(clippy::too_many_arguments)]
const fn profile(
    max_rect_size: usize,
    max_rect_width: u16,
    mono_min_rect_size: usize,
    gradient_min_rect_size: usize,
    zlib_levels: [u8; 4],
    gradient_threshold: u32,
    gradient_threshold24: u32,
    idx_max_colors_divisor: usize,
) -> CompressionProfile {
    CompressionProfile {
        max_rect_size,
        max_rect_width,
        mono_min_rect_size,
        gradient_min_rect_size,
        idx_zlib_level: zlib_levels[0],
        mono_zlib_level: zlib_levels[1],
        raw_zlib_level: zlib_levels[2],
        gradient_zlib_level: zlib_levels[3],
        gradient_threshold,
        gradient_threshold24,
        idx_max_colors_divisor,
    }
}

/// Profiles indexed by compression level.
///
/// Zlib levels are listed as `[indexed, mono, raw, gradient]`.
pub const PROFILES: [CompressionProfile; 10] = [
    profile(512, 32, 6, 65536, [0, 0, 0, 0], 0, 0, 4),
    profile(2048, 128, 6, 65536, [1, 1, 1, 0], 0, 0, 8),
    profile(6144, 256, 8, 65536, [3, 3, 2, 0], 0, 0, 24),
    profile(10240, 1024, 12, 65536, [5, 5, 3, 0], 0, 0, 32),
    profile(16384, 2048, 12, 65536, [6, 6, 4, 0], 0, 0, 32),
    profile(32768, 2048, 12, 4096, [7, 7, 5, 4], 150, 380, 32),
    profile(65536, 2048, 16, 4096, [7, 7, 6, 4], 170, 420, 48),
    profile(65536, 2048, 16, 4096, [8, 8, 7, 5], 180, 450, 64),
    profile(65536, 2048, 32, 8192, [9, 9, 8, 6], 190, 475, 64),
    profile(65536, 2048, 32, 8192, [9, 9, 9, 6], 200, 500, 96),
];

/// Level used when the client does not ask for one.
pub const DEFAULT_COMPRESS_LEVEL: u8 = 6;

impl CompressionProfile {
    /// Returns the profile for `level`, clamping anything above 9.
    #[must_use]
    pub fn for_level(level: u8) -> &'static Self {
        &PROFILES[usize::from(level.min(9))]
    }

    /// Largest palette worth building for a `w` x `h` block.
    ///
    /// Zero means the palette path is disabled and the block goes straight to
    /// full color.
    #[must_use]
    pub fn max_palette_colors(&self, w: usize, h: usize) -> usize {
        let area = w * h;
        let mut max_colors = area / self.idx_max_colors_divisor;
        if max_colors < 2 && area >= self.mono_min_rect_size {
            max_colors = 2;
        }
        max_colors.min(TIGHT_MAX_PALETTE)
    }

    /// Tallest subrectangle of width `w` that stays within `max_rect_size`.
    #[must_use]
    pub fn max_rows_for_width(&self, w: u16) -> usize {
        let width = usize::from(w.min(self.max_rect_width)).max(1);
        (self.max_rect_size / width).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_clamp() {
        assert_eq!(CompressionProfile::for_level(42), &PROFILES[9]);
        assert_eq!(CompressionProfile::for_level(0).max_rect_size, 512);
    }

    #[test]
    fn test_max_palette_colors() {
        let p = CompressionProfile::for_level(6);
        // 100x100 / 48
        assert_eq!(p.max_palette_colors(100, 100), 208);
        // Large blocks are capped at 256.
        assert_eq!(p.max_palette_colors(300, 218), 256);
        // Tiny block: floor of 2 once the mono minimum is met.
        assert_eq!(p.max_palette_colors(4, 4), 2);
        assert_eq!(p.max_palette_colors(3, 3), 0);
    }

    #[test]
    fn test_max_rows() {
        let p = CompressionProfile::for_level(6);
        assert_eq!(p.max_rows_for_width(300), 218);
        assert_eq!(p.max_rows_for_width(4000), 32);
        assert_eq!(CompressionProfile::for_level(0).max_rows_for_width(100), 16);
    }
}
