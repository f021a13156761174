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

//! Frequency-ranked palette with hashed color lookup.
//!
//! Entries stay sorted by descending pixel count. Colors are found through a
//! 256-bucket hash whose collisions are chained through an arena of nodes, so
//! both insertion and the later index lookups during packing avoid a linear
//! scan of the palette.

use crate::protocol::TIGHT_MAX_PALETTE;

const HASH_BUCKETS: usize = 256;

#[derive(Debug, Clone, Copy)]
struct Entry {
    color: u32,
    count: usize,
    node: usize,
}

#[derive(Debug, Clone, Copy)]
struct Node {
    color: u32,
    /// Position of this color in `entries`.
    slot: usize,
    next: Option<usize>,
}

#[inline]
fn hash_key(color: u32) -> usize {
    (((color >> 16) + (color >> 24)) & 0xFF) as usize
}

/// Palette of up to 256 colors ordered by descending frequency.
#[derive(Debug, Clone)]
pub struct PaletteTable {
    entries: Vec<Entry>,
    nodes: Vec<Node>,
    buckets: Box<[Option<usize>; HASH_BUCKETS]>,
    max_colors: usize,
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteTable {
    /// Creates an empty table allowing the full 256 colors.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(TIGHT_MAX_PALETTE),
            nodes: Vec::with_capacity(TIGHT_MAX_PALETTE),
            buckets: Box::new([None; HASH_BUCKETS]),
            max_colors: TIGHT_MAX_PALETTE,
        }
    }

    /// Clears the table and sets its capacity to `max_colors` (at most 256).
    pub fn reset(&mut self, max_colors: usize) {
        self.entries.clear();
        self.nodes.clear();
        self.buckets.fill(None);
        self.max_colors = max_colors.min(TIGHT_MAX_PALETTE);
    }

    /// Adds `count` pixels of `color`.
    ///
    /// Returns the number of colors now in the table, or `None` when a new
    /// color would exceed the capacity. On overflow the table is emptied and
    /// the caller should fall back to full color.
    pub fn insert(&mut self, color: u32, count: usize) -> Option<usize> {
        let key = hash_key(color);

        let mut last = None;
        let mut cursor = self.buckets[key];
        while let Some(node_id) = cursor {
            let node = self.nodes[node_id];
            if node.color == color {
                self.bump(node_id, count);
                return Some(self.entries.len());
            }
            last = Some(node_id);
            cursor = node.next;
        }

        if self.entries.len() >= self.max_colors {
            self.entries.clear();
            self.nodes.clear();
            self.buckets.fill(None);
            return None;
        }

        // New colors go after every entry with an equal or higher count.
        let mut slot = self.entries.len();
        while slot > 0 && self.entries[slot - 1].count < count {
            slot -= 1;
        }

        let node_id = self.nodes.len();
        self.nodes.push(Node {
            color,
            slot,
            next: None,
        });
        match last {
            Some(prev) => self.nodes[prev].next = Some(node_id),
            None => self.buckets[key] = Some(node_id),
        }

        self.entries.insert(
            slot,
            Entry {
                color,
                count,
                node: node_id,
            },
        );
        for (pos, entry) in self.entries.iter().enumerate().skip(slot + 1) {
            self.nodes[entry.node].slot = pos;
        }

        Some(self.entries.len())
    }

    /// Raises an existing entry's count and moves it ahead of entries with
    /// strictly fewer pixels.
    fn bump(&mut self, node_id: usize, count: usize) {
        let from = self.nodes[node_id].slot;
        let total = self.entries[from].count + count;

        let mut to = from;
        while to > 0 && self.entries[to - 1].count < total {
            to -= 1;
        }
        self.entries[from].count = total;
        if to != from {
            self.entries[to..=from].rotate_right(1);
            for pos in to..=from {
                let node = self.entries[pos].node;
                self.nodes[node].slot = pos;
            }
        }
    }

    /// Number of colors in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Palette index of `color`, if present.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)] // Slots are below 256
    pub fn index_of(&self, color: u32) -> Option<u8> {
        let mut cursor = self.buckets[hash_key(color)];
        while let Some(node_id) = cursor {
            let node = &self.nodes[node_id];
            if node.color == color {
                return Some(node.slot as u8);
            }
            cursor = node.next;
        }
        None
    }

    /// Colors in palette order.
    pub fn colors(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|e| e.color)
    }

    /// `(color, pixel count)` pairs in palette order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.entries.iter().map(|e| (e.color, e.count))
    }
}
