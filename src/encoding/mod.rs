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

//! Tight encoder and the building blocks it shares with the decoder.
//!
//! The pipeline for one update rectangle is
//! [`partition`] -> [`classify`] -> [`pack`] / [`smooth`] -> [`crate::stream`].

pub mod classify;
pub mod common;
pub mod pack;
pub mod palette;
pub mod partition;
pub mod profile;
pub mod smooth;
pub mod tight;

// Re-export common types
pub use classify::{Classification, Classifier};
pub use common::{CodecStats, RecordKind};
pub use palette::PaletteTable;
pub use partition::Piece;
pub use profile::{CompressionProfile, DEFAULT_COMPRESS_LEVEL, PROFILES};
pub use tight::{TightEncoder, TightEncoderConfig};
