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

//! Helpers shared by the Tight encoder and decoder.

use std::fmt;

/// The kind of Tight record, as far as statistics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// Solid fill.
    Fill,
    /// Two-color bitmap on stream 1.
    Mono,
    /// Palette indices on stream 2.
    Indexed,
    /// Copy filter on stream 0.
    FullColor,
    /// Gradient filter on stream 3.
    Gradient,
}

/// Running counters for one encoder or decoder.
///
/// `raw_bytes` counts filtered payload bytes before compression and
/// `wire_bytes` counts the bytes that actually crossed the wire for those
/// payloads (length fields included, record headers excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecStats {
    /// Solid fill records.
    pub fill_records: u64,
    /// Two-color records.
    pub mono_records: u64,
    /// Indexed palette records.
    pub indexed_records: u64,
    /// Full-color records.
    pub full_color_records: u64,
    /// Gradient records.
    pub gradient_records: u64,
    /// Payload bytes before compression.
    pub raw_bytes: u64,
    /// Payload bytes on the wire.
    pub wire_bytes: u64,
}

impl CodecStats {
    /// Counts one record.
    pub fn record(&mut self, kind: RecordKind, raw_bytes: usize, wire_bytes: usize) {
        match kind {
            RecordKind::Fill => self.fill_records += 1,
            RecordKind::Mono => self.mono_records += 1,
            RecordKind::Indexed => self.indexed_records += 1,
            RecordKind::FullColor => self.full_color_records += 1,
            RecordKind::Gradient => self.gradient_records += 1,
        }
        self.raw_bytes += raw_bytes as u64;
        self.wire_bytes += wire_bytes as u64;
    }

    /// Total records of every kind.
    #[must_use]
    pub fn records(&self) -> u64 {
        self.fill_records
            + self.mono_records
            + self.indexed_records
            + self.full_color_records
            + self.gradient_records
    }

    /// Raw-to-wire ratio, or `None` before any payload was counted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Ratio is informational
    pub fn compression_ratio(&self) -> Option<f64> {
        if self.wire_bytes == 0 {
            None
        } else {
            Some(self.raw_bytes as f64 / self.wire_bytes as f64)
        }
    }
}

impl fmt::Display for CodecStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records (fill={}, mono={}, indexed={}, full={}, gradient={}), {} -> {} bytes",
            self.records(),
            self.fill_records,
            self.mono_records,
            self.indexed_records,
            self.full_color_records,
            self.gradient_records,
            self.raw_bytes,
            self.wire_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let mut stats = CodecStats::default();
        assert_eq!(stats.compression_ratio(), None);
        stats.record(RecordKind::Fill, 3, 3);
        stats.record(RecordKind::Indexed, 1000, 100);
        stats.record(RecordKind::Indexed, 500, 97);
        assert_eq!(stats.records(), 3);
        assert_eq!(stats.indexed_records, 2);
        assert_eq!(stats.raw_bytes, 1503);
        assert_eq!(stats.wire_bytes, 200);
        let ratio = stats.compression_ratio().unwrap();
        assert!((ratio - 7.515).abs() < 1e-9);
        assert!(stats.to_string().starts_with("3 records (fill=1"));
    }
}
