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

//! Rectangle partitioning for the Tight encoder.
//!
//! A large update rectangle is scanned in 16x16 tiles looking for solid-color
//! areas. The first usable one is grown to its maximal extent and sent as a
//! single fill record; the regions above, left, right and below it are then
//! handled in that order. Regions without solid areas are cut into
//! subrectangles no larger than the active [`CompressionProfile`] allows.
//!
//! The search runs on an explicit work-list instead of recursion, so a
//! pathological image cannot grow the call stack.

use super::profile::CompressionProfile;
use crate::framebuffer::{FramebufferView, Rect};

/// Rectangles smaller than this are never searched for solid areas.
pub const MIN_SPLIT_RECT_SIZE: usize = 4096;

/// A solid area must cover at least this many pixels to be split out,
/// unless it covers the whole rectangle.
pub const MIN_SOLID_SUBRECT_SIZE: usize = 2048;

/// Edge of the scan tiles.
pub const MAX_SPLIT_TILE_SIZE: u32 = 16;

/// One unit of encoder output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece {
    /// A solid-color area found by the search.
    Fill {
        /// Area covered.
        rect: Rect,
        /// Its color.
        color: u32,
    },
    /// A subrectangle within the profile's limits, to be classified and
    /// encoded on its own.
    Subrect(Rect),
}

impl Piece {
    /// The area this piece covers.
    #[must_use]
    pub fn rect(&self) -> Rect {
        match *self {
            Piece::Fill { rect, .. } | Piece::Subrect(rect) => rect,
        }
    }
}

/// Pending work, kept on a LIFO stack.
#[derive(Debug, Clone, Copy)]
enum Task {
    Search(Region),
    Simple(Region),
    Fill(Region, u32),
}

/// A rectangle in `u32` coordinates so tile arithmetic cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Region {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

impl Region {
    fn from_rect(rect: Rect) -> Self {
        Self {
            x: u32::from(rect.x),
            y: u32::from(rect.y),
            w: u32::from(rect.w),
            h: u32::from(rect.h),
        }
    }

    #[allow(clippy::cast_possible_truncation)] // Regions never leave the framebuffer
    fn to_rect(self) -> Rect {
        Rect::new(self.x as u16, self.y as u16, self.w as u16, self.h as u16)
    }

    fn area(self) -> usize {
        self.w as usize * self.h as usize
    }
}

/// Exact number of records [`partition`] will produce for `rect`, or `None`
/// when the solid-area search may run and the count is not known up front.
///
/// An empty rectangle produces no records.
#[must_use]
pub fn fragment_count(rect: Rect, profile: &CompressionProfile, last_rect_enabled: bool) -> Option<usize> {
    if rect.is_empty() {
        return Some(0);
    }
    if last_rect_enabled && rect.area() >= MIN_SPLIT_RECT_SIZE {
        return None;
    }
    let w = usize::from(rect.w);
    let h = usize::from(rect.h);
    let max_width = usize::from(profile.max_rect_width);
    if w > max_width || w * h > profile.max_rect_size {
        let sub_width = w.min(max_width);
        let sub_height = profile.max_rect_size / sub_width;
        Some(((w - 1) / max_width + 1) * ((h - 1) / sub_height + 1))
    } else {
        Some(1)
    }
}

/// Number of records [`partition`] will produce for `rect`, or 0 when the
/// count cannot be known in advance and the update must be terminated with
/// a `LastRect` marker instead.
///
/// An empty rectangle also yields 0. With `last_rect_enabled` unset the
/// count is always known, so 0 then only ever means "no records".
#[must_use]
pub fn estimate_fragment_count(rect: Rect, profile: &CompressionProfile, last_rect_enabled: bool) -> usize {
    fragment_count(rect, profile, last_rect_enabled).unwrap_or(0)
}

/// Splits `rect` into the pieces the encoder sends, in wire order.
///
/// The solid-area search only runs when `last_rect_enabled` is set, since
/// its output count is not known up front. `rect` must lie inside `fb`.
#[must_use]
pub fn partition(
    fb: &FramebufferView<'_>,
    rect: Rect,
    profile: &CompressionProfile,
    last_rect_enabled: bool,
) -> Vec<Piece> {
    let mut pieces = Vec::new();
    if rect.is_empty() {
        return pieces;
    }

    let root = Region::from_rect(rect);
    if !last_rect_enabled || root.area() < MIN_SPLIT_RECT_SIZE {
        split_simple(root, profile, &mut pieces);
        return pieces;
    }

    let mut stack = vec![Task::Search(root)];
    let mut planned = Vec::new();
    while let Some(task) = stack.pop() {
        match task {
            Task::Simple(region) => split_simple(region, profile, &mut pieces),
            Task::Fill(region, color) => pieces.push(Piece::Fill {
                rect: region.to_rect(),
                color,
            }),
            Task::Search(region) => {
                if region.area() < MIN_SPLIT_RECT_SIZE {
                    split_simple(region, profile, &mut pieces);
                    continue;
                }
                planned.clear();
                search(fb, region, profile, &mut planned);
                stack.extend(planned.drain(..).rev());
            }
        }
    }

    #[cfg(feature = "debug-logging")]
    log::info!(
        "Tight: {}x{} at ({}, {}) partitioned into {} pieces",
        rect.w,
        rect.h,
        rect.x,
        rect.y,
        pieces.len()
    );

    pieces
}

/// Scans `region` for a solid area and appends the resulting tasks in wire
/// order.
fn search(fb: &FramebufferView<'_>, region: Region, profile: &CompressionProfile, out: &mut Vec<Task>) {
    let Region { x, mut y, w, mut h } = region;
    #[allow(clippy::cast_possible_truncation)] // At most max_rect_size rows
    let max_rows = profile.max_rows_for_width(region.to_rect().w) as u32;

    let mut dy = y;
    while dy < y + h {
        // Flush the upper part once it reaches the size limit.
        if dy - y >= max_rows {
            out.push(Task::Simple(Region { x, y, w, h: max_rows }));
            y += max_rows;
            h -= max_rows;
        }
        let dh = MAX_SPLIT_TILE_SIZE.min(y + h - dy);

        let mut dx = x;
        while dx < x + w {
            let dw = MAX_SPLIT_TILE_SIZE.min(x + w - dx);
            dx += dw;
            let tile_x = dx - dw;

            let Some(color) = check_solid_tile(fb, tile_x, dy, dw, dh, None) else {
                continue;
            };

            let (w_best, h_best) =
                find_best_solid_area(fb, tile_x, dy, w - (tile_x - x), h - (dy - y), color);
            let best_area = w_best as usize * h_best as usize;
            if best_area != w as usize * h as usize && best_area < MIN_SOLID_SUBRECT_SIZE {
                continue;
            }

            let current = Region { x, y, w, h };
            let solid = extend_solid_area(
                fb,
                current,
                color,
                Region {
                    x: tile_x,
                    y: dy,
                    w: w_best,
                    h: h_best,
                },
            );

            #[cfg(feature = "debug-logging")]
            log::info!(
                "Tight: solid area {}x{} at ({}, {}) color {color:#08x}",
                solid.w,
                solid.h,
                solid.x,
                solid.y
            );

            if solid.y != y {
                out.push(Task::Simple(Region {
                    x,
                    y,
                    w,
                    h: solid.y - y,
                }));
            }
            if solid.x != x {
                out.push(Task::Search(Region {
                    x,
                    y: solid.y,
                    w: solid.x - x,
                    h: solid.h,
                }));
            }
            out.push(Task::Fill(solid, color));
            if solid.x + solid.w != x + w {
                out.push(Task::Search(Region {
                    x: solid.x + solid.w,
                    y: solid.y,
                    w: x + w - (solid.x + solid.w),
                    h: solid.h,
                }));
            }
            if solid.y + solid.h != y + h {
                out.push(Task::Search(Region {
                    x,
                    y: solid.y + solid.h,
                    w,
                    h: y + h - (solid.y + solid.h),
                }));
            }
            return;
        }
        dy += MAX_SPLIT_TILE_SIZE;
    }

    out.push(Task::Simple(Region { x, y, w, h }));
}

/// Cuts `region` into subrectangles within the profile's width and area
/// limits.
fn split_simple(region: Region, profile: &CompressionProfile, pieces: &mut Vec<Piece>) {
    let max_width = u32::from(profile.max_rect_width);
    if region.w <= max_width && region.area() <= profile.max_rect_size {
        pieces.push(Piece::Subrect(region.to_rect()));
        return;
    }

    let sub_width = region.w.min(max_width);
    #[allow(clippy::cast_possible_truncation)] // max_rect_size is at most 65536
    let sub_height = (profile.max_rect_size / sub_width as usize).max(1) as u32;

    let mut dy = 0;
    while dy < region.h {
        let rh = sub_height.min(region.h - dy);
        let mut dx = 0;
        while dx < region.w {
            let rw = max_width.min(region.w - dx);
            pieces.push(Piece::Subrect(
                Region {
                    x: region.x + dx,
                    y: region.y + dy,
                    w: rw,
                    h: rh,
                }
                .to_rect(),
            ));
            dx += max_width;
        }
        dy += sub_height;
    }
}

/// Returns the tile's color if every pixel matches (and matches `need`,
/// when given).
fn check_solid_tile(
    fb: &FramebufferView<'_>,
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    need: Option<u32>,
) -> Option<u32> {
    let (x, y, w) = (x as usize, y as usize, w as usize);
    let first_row = fb.row(x, y, w);
    let color = *first_row.first()?;
    if need.is_some_and(|c| c != color) {
        return None;
    }
    if first_row.iter().any(|&p| p != color) {
        return None;
    }
    for dy in 1..h as usize {
        if fb.row(x, y + dy, w) != first_row {
            return None;
        }
    }
    Some(color)
}

/// Widest-times-tallest solid block of `color` anchored at (`x`, `y`),
/// measured in whole tiles within a `w` x `h` bound.
fn find_best_solid_area(fb: &FramebufferView<'_>, x: u32, y: u32, w: u32, h: u32, color: u32) -> (u32, u32) {
    let (mut w_best, mut h_best) = (0u32, 0u32);
    let mut w_prev = w;

    let mut dy = y;
    while dy < y + h {
        let dh = MAX_SPLIT_TILE_SIZE.min(y + h - dy);
        let dw = MAX_SPLIT_TILE_SIZE.min(w_prev);
        if check_solid_tile(fb, x, dy, dw, dh, Some(color)).is_none() {
            break;
        }

        let mut dx = x + dw;
        while dx < x + w_prev {
            let dw = MAX_SPLIT_TILE_SIZE.min(x + w_prev - dx);
            if check_solid_tile(fb, dx, dy, dw, dh, Some(color)).is_none() {
                break;
            }
            dx += dw;
        }

        w_prev = dx - x;
        let height = dy + dh - y;
        if w_prev as usize * height as usize > w_best as usize * h_best as usize {
            w_best = w_prev;
            h_best = height;
        }
        dy += MAX_SPLIT_TILE_SIZE;
    }

    (w_best, h_best)
}

/// Grows `solid` one row or column at a time (up, down, left, right) while
/// it stays inside `bound` and keeps `color`.
fn extend_solid_area(fb: &FramebufferView<'_>, bound: Region, color: u32, mut solid: Region) -> Region {
    while solid.y > bound.y && check_solid_tile(fb, solid.x, solid.y - 1, solid.w, 1, Some(color)).is_some() {
        solid.y -= 1;
        solid.h += 1;
    }
    while solid.y + solid.h < bound.y + bound.h
        && check_solid_tile(fb, solid.x, solid.y + solid.h, solid.w, 1, Some(color)).is_some()
    {
        solid.h += 1;
    }
    while solid.x > bound.x && check_solid_tile(fb, solid.x - 1, solid.y, 1, solid.h, Some(color)).is_some() {
        solid.x -= 1;
        solid.w += 1;
    }
    while solid.x + solid.w < bound.x + bound.w
        && check_solid_tile(fb, solid.x + solid.w, solid.y, 1, solid.h, Some(color)).is_some()
    {
        solid.w += 1;
    }
    solid
}
