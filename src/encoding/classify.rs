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

//! Color-count classification of a pixel block.

use super::palette::PaletteTable;

/// How a block of pixels should be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No pixels at all.
    Empty,
    /// Every pixel has this color.
    Solid(u32),
    /// Exactly two colors.
    TwoColor {
        /// The more frequent color (ties go to the first pixel's color).
        background: u32,
        /// The other color.
        foreground: u32,
    },
    /// Up to the palette capacity; the colors are in
    /// [`Classifier::palette`].
    Palette,
    /// Too many colors, or the palette was disabled for this block.
    TrueColor,
}

/// Reusable classifier owning the palette scratch table.
#[derive(Debug, Default)]
pub struct Classifier {
    palette: PaletteTable,
}

impl Classifier {
    /// Creates a classifier with an empty palette.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Palette built by the most recent [`Classification::Palette`] result.
    #[must_use]
    pub fn palette(&self) -> &PaletteTable {
        &self.palette
    }

    /// Classifies row-major `pixels`, allowing at most `max_colors` palette
    /// entries.
    pub fn classify(&mut self, pixels: &[u32], max_colors: usize) -> Classification {
        let Some((&c0, rest)) = pixels.split_first() else {
            return Classification::Empty;
        };

        let Some(first_diff) = rest.iter().position(|&p| p != c0) else {
            return Classification::Solid(c0);
        };

        if max_colors < 2 {
            return Classification::TrueColor;
        }

        // Index of the first pixel that is not c0.
        let mut i = first_diff + 1;
        let c1 = pixels[i];
        let mut n0 = i;
        let mut n1 = 1;
        i += 1;
        while i < pixels.len() {
            let ci = pixels[i];
            if ci == c0 {
                n0 += 1;
            } else if ci == c1 {
                n1 += 1;
            } else {
                break;
            }
            i += 1;
        }

        if i >= pixels.len() {
            let (background, foreground) = if n0 >= n1 { (c0, c1) } else { (c1, c0) };
            self.palette.reset(2);
            self.palette.insert(background, n0.max(n1));
            self.palette.insert(foreground, n0.min(n1));
            return Classification::TwoColor {
                background,
                foreground,
            };
        }

        self.palette.reset(max_colors);
        self.palette.insert(c0, n0);
        self.palette.insert(c1, n1);

        // Remaining pixels are inserted run by run.
        let mut run_color = pixels[i];
        let mut run_len = 1;
        for &p in &pixels[i + 1..] {
            if p == run_color {
                run_len += 1;
            } else {
                if self.palette.insert(run_color, run_len).is_none() {
                    return Classification::TrueColor;
                }
                run_color = p;
                run_len = 1;
            }
        }
        if self.palette.insert(run_color, run_len).is_none() {
            return Classification::TrueColor;
        }

        #[cfg(feature = "debug-logging")]
        log::info!(
            "Tight: {} pixels classified as {}-color palette",
            pixels.len(),
            self.palette.len()
        );

        Classification::Palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_solid() {
        let mut c = Classifier::new();
        assert_eq!(c.classify(&[], 256), Classification::Empty);
        assert_eq!(c.classify(&[5; 100], 256), Classification::Solid(5));
        assert_eq!(c.classify(&[5], 0), Classification::Solid(5));
    }

    #[test]
    fn test_two_color_majority_is_background() {
        let mut c = Classifier::new();
        let mut pixels = vec![1u32; 90];
        pixels.extend(std::iter::repeat(2).take(10));
        assert_eq!(
            c.classify(&pixels, 256),
            Classification::TwoColor {
                background: 1,
                foreground: 2
            }
        );

        // Minority color first.
        let mut pixels = vec![2u32; 3];
        pixels.extend(std::iter::repeat(1).take(10));
        assert_eq!(
            c.classify(&pixels, 256),
            Classification::TwoColor {
                background: 1,
                foreground: 2
            }
        );
    }

    #[test]
    fn test_two_color_counts_include_first_foreground() {
        let mut c = Classifier::new();
        // 2 of each: c0 keeps the tie.
        assert_eq!(
            c.classify(&[7, 8, 8, 7], 256),
            Classification::TwoColor {
                background: 7,
                foreground: 8
            }
        );
        // One c0, then three c1: c1 wins.
        assert_eq!(
            c.classify(&[7, 8, 8, 8], 256),
            Classification::TwoColor {
                background: 8,
                foreground: 7
            }
        );
    }

    #[test]
    fn test_palette_counts_and_order() {
        let mut c = Classifier::new();
        let pixels = [1, 2, 3, 3, 3, 1, 4, 3, 1, 3];
        assert_eq!(c.classify(&pixels, 256), Classification::Palette);
        let entries: Vec<_> = c.palette().entries().collect();
        assert_eq!(entries, vec![(3, 5), (1, 3), (2, 1), (4, 1)]);
    }

    #[test]
    fn test_palette_overflow_is_true_color() {
        let mut c = Classifier::new();
        let pixels: Vec<u32> = (0..300).collect();
        assert_eq!(c.classify(&pixels, 256), Classification::TrueColor);
        assert_eq!(c.classify(&[1, 2, 3], 2), Classification::TrueColor);
        assert_eq!(c.classify(&[1, 2, 1], 0), Classification::TrueColor);
    }
}
