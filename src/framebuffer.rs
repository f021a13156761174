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

//! Borrowed framebuffer views.
//!
//! The codec never owns pixel storage. The encoder reads from a
//! [`FramebufferView`] and the decoder writes into a [`FramebufferMut`], both
//! of which borrow a caller-owned slice of `0x00RRGGBB` pixels whose row
//! stride may exceed the visible width.

use crate::error::{Result, TightError};

/// A rectangle in framebuffer coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// X coordinate of the top-left corner.
    pub x: u16,
    /// Y coordinate of the top-left corner.
    pub y: u16,
    /// Width in pixels.
    pub w: u16,
    /// Height in pixels.
    pub h: u16,
}

impl Rect {
    /// Creates a rectangle.
    #[must_use]
    pub const fn new(x: u16, y: u16, w: u16, h: u16) -> Self {
        Self { x, y, w, h }
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> usize {
        self.w as usize * self.h as usize
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// One past the rightmost column.
    #[must_use]
    pub fn right(&self) -> u32 {
        u32::from(self.x) + u32::from(self.w)
    }

    /// One past the bottom row.
    #[must_use]
    pub fn bottom(&self) -> u32 {
        u32::from(self.y) + u32::from(self.h)
    }
}

fn check_layout(len: usize, width: u16, height: u16, stride: usize) -> Result<()> {
    if stride < width as usize {
        return Err(TightError::InvalidOperation(format!(
            "stride {stride} is smaller than width {width}"
        )));
    }
    let required = if height == 0 || width == 0 {
        0
    } else {
        stride * (height as usize - 1) + width as usize
    };
    if len < required {
        return Err(TightError::Resource(format!(
            "framebuffer holds {len} pixels, {width}x{height} with stride {stride} needs {required}"
        )));
    }
    Ok(())
}

fn check_bounds(rect: &Rect, width: u16, height: u16) -> Result<()> {
    if rect.right() > u32::from(width) || rect.bottom() > u32::from(height) {
        return Err(TightError::Bounds {
            x: rect.x,
            y: rect.y,
            w: rect.w,
            h: rect.h,
            fb_width: width,
            fb_height: height,
        });
    }
    Ok(())
}

/// Read-only view of a caller-owned framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct FramebufferView<'a> {
    pixels: &'a [u32],
    width: u16,
    height: u16,
    stride: usize,
}

impl<'a> FramebufferView<'a> {
    /// Wraps `pixels` as a `width` x `height` framebuffer with `stride`
    /// pixels per row.
    ///
    /// # Errors
    ///
    /// Fails if the stride is narrower than the width or the slice is too
    /// short for the declared layout.
    pub fn new(pixels: &'a [u32], width: u16, height: u16, stride: usize) -> Result<Self> {
        check_layout(pixels.len(), width, height, stride)?;
        Ok(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    /// Framebuffer width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Framebuffer height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Checks that `rect` lies inside the framebuffer.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Bounds`] otherwise.
    pub fn check_rect(&self, rect: &Rect) -> Result<()> {
        check_bounds(rect, self.width, self.height)
    }

    /// `w` pixels of row `y` starting at column `x`.
    #[must_use]
    pub fn row(&self, x: usize, y: usize, w: usize) -> &'a [u32] {
        let start = y * self.stride + x;
        &self.pixels[start..start + w]
    }

    /// Replaces the contents of `out` with the pixels of `rect`, tightly
    /// packed in row-major order. `rect` must be in bounds.
    pub fn extract(&self, rect: &Rect, out: &mut Vec<u32>) {
        out.clear();
        out.reserve(rect.area());
        for y in 0..rect.h as usize {
            out.extend_from_slice(self.row(rect.x as usize, rect.y as usize + y, rect.w as usize));
        }
    }
}

/// Writable view of a caller-owned framebuffer.
#[derive(Debug)]
pub struct FramebufferMut<'a> {
    pixels: &'a mut [u32],
    width: u16,
    height: u16,
    stride: usize,
}

impl<'a> FramebufferMut<'a> {
    /// Wraps `pixels` as a writable `width` x `height` framebuffer.
    ///
    /// # Errors
    ///
    /// Fails if the stride is narrower than the width or the slice is too
    /// short for the declared layout.
    pub fn new(pixels: &'a mut [u32], width: u16, height: u16, stride: usize) -> Result<Self> {
        check_layout(pixels.len(), width, height, stride)?;
        Ok(Self {
            pixels,
            width,
            height,
            stride,
        })
    }

    /// Framebuffer width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Framebuffer height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Checks that `rect` lies inside the framebuffer.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Bounds`] otherwise.
    pub fn check_rect(&self, rect: &Rect) -> Result<()> {
        check_bounds(rect, self.width, self.height)
    }

    /// Read-only view of the same pixels.
    #[must_use]
    pub fn as_view(&self) -> FramebufferView<'_> {
        FramebufferView {
            pixels: &*self.pixels,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    /// Fills `rect` with `color`. The rectangle must already be bounds-checked.
    pub fn fill_rect(&mut self, rect: &Rect, color: u32) {
        for y in 0..rect.h as usize {
            let start = (rect.y as usize + y) * self.stride + rect.x as usize;
            self.pixels[start..start + rect.w as usize].fill(color);
        }
    }

    /// Copies tightly packed row-major `pixels` into `rect`.
    /// The rectangle must already be bounds-checked.
    pub fn put_rect(&mut self, rect: &Rect, pixels: &[u32]) {
        let w = rect.w as usize;
        if w == 0 {
            return;
        }
        for (y, src) in pixels.chunks_exact(w).take(rect.h as usize).enumerate() {
            let start = (rect.y as usize + y) * self.stride + rect.x as usize;
            self.pixels[start..start + w].copy_from_slice(src);
        }
    }

    /// Gives the borrowed pixels back to the caller.
    #[must_use]
    pub fn into_inner(self) -> &'a mut [u32] {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_validation() {
        let pixels = vec![0u32; 10 * 4];
        assert!(FramebufferView::new(&pixels, 8, 4, 10).is_ok());
        assert!(FramebufferView::new(&pixels, 8, 4, 7).is_err());
        assert!(FramebufferView::new(&pixels, 8, 5, 10).is_err());
        // Last row only needs `width` pixels, not a full stride.
        assert!(FramebufferView::new(&pixels[..38], 8, 4, 10).is_ok());
    }

    #[test]
    fn test_extract_with_stride() {
        let mut pixels = vec![0u32; 6 * 3];
        for y in 0..3 {
            for x in 0..6 {
                pixels[y * 6 + x] = (y * 10 + x) as u32;
            }
        }
        let fb = FramebufferView::new(&pixels, 4, 3, 6).unwrap();
        let mut out = vec![99];
        fb.extract(&Rect::new(1, 1, 2, 2), &mut out);
        assert_eq!(out, vec![11, 12, 21, 22]);
        assert!(fb.check_rect(&Rect::new(3, 0, 2, 1)).is_err());
        assert!(fb.check_rect(&Rect::new(2, 0, 2, 3)).is_ok());
    }

    #[test]
    fn test_fill_and_put() {
        let mut pixels = vec![0u32; 5 * 4];
        let mut fb = FramebufferMut::new(&mut pixels, 4, 4, 5).unwrap();
        fb.fill_rect(&Rect::new(1, 1, 2, 2), 7);
        fb.put_rect(&Rect::new(0, 3, 2, 1), &[1, 2]);
        let view = fb.as_view();
        assert_eq!(view.row(1, 1, 2), &[7, 7]);
        assert_eq!(view.row(1, 2, 3), &[7, 7, 0]);
        assert_eq!(view.row(0, 3, 2), &[1, 2]);
        // Padding column untouched.
        let raw = fb.into_inner();
        assert_eq!(raw[4], 0);
    }
}
