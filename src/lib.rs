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

//! # tightcodec
//!
//! A pure Rust implementation of the Tight encoding of the RFB (VNC) protocol.
//!
//! The encoder splits an update rectangle into solid fills and size-bounded
//! subrectangles, picks the cheapest representation for each one and
//! compresses the result on four persistent zlib streams. The decoder is a
//! resumable state machine that parses the same wire format from a transport
//! delivering bytes in arbitrary pieces.
//!
//! ## Features
//!
//! - **All Tight subencodings except JPEG**: solid fill, two-color bitmap,
//!   indexed palette (up to 256 colors), full color and gradient
//! - **Persistent streams**: per-connection deflate/inflate contexts with
//!   selective reset
//! - **Client pixel formats**: 8/16/32-bit true color on the encoder side
//! - **Async I/O**: Tokio adapters for reading and writing whole updates
//! - **Memory safe**: no unsafe code
//!
//! ## Quick Start
//!
//! ```
//! use tightcodec::{FramebufferView, Rect, TightDecoder, TightEncoder};
//!
//! # fn main() -> tightcodec::Result<()> {
//! let pixels = vec![0x00FF_0000u32; 64 * 64];
//! let fb = FramebufferView::new(&pixels, 64, 64, 64)?;
//!
//! let mut encoder = TightEncoder::default();
//! let mut wire = Vec::new();
//! encoder.encode(&fb, Rect::new(0, 0, 64, 64), &mut wire)?;
//!
//! let mut out = vec![0u32; 64 * 64];
//! let mut decoder = TightDecoder::new();
//! decoder.bind_framebuffer(&mut out, 64, 64, 64)?;
//! let mut needed = decoder.begin_rectangle(0, 0, 64, 64)?;
//! let mut body = &wire[12..];
//! while needed > 0 {
//!     let (chunk, rest) = body.split_at(needed);
//!     needed = decoder.continue_decoding(chunk)?;
//!     body = rest;
//! }
//! drop(decoder);
//! assert_eq!(out, pixels);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  FramebufferView (caller-owned pixels)   │
//! └──────────────────┬───────────────────────┘
//!                    ▼
//! ┌──────────────────────────────────────────┐
//! │  TightEncoder                            │
//! │   partition -> classify -> pack/filter   │
//! │   -> CompressStreams (4 zlib slots)      │
//! └──────────────────┬───────────────────────┘
//!                    ▼  ByteSink / AsyncWrite
//!                 wire bytes
//!                    ▼  continue_decoding / AsyncRead
//! ┌──────────────────────────────────────────┐
//! │  TightDecoder                            │
//! │   state machine -> DecompressStreams     │
//! │   -> unpack -> FramebufferMut            │
//! └──────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decoding;
pub mod encoding;
pub mod error;
pub mod framebuffer;
pub mod io;
pub mod protocol;
pub mod sink;
pub mod stream;
pub mod translate;

// Re-exports
pub use decoding::{DecodeState, TightDecoder};
pub use encoding::{CodecStats, CompressionProfile, TightEncoder, TightEncoderConfig};
pub use error::{Result, TightError};
pub use framebuffer::{FramebufferMut, FramebufferView, Rect};
pub use protocol::{PixelFormat, Rectangle};
pub use sink::{ByteSink, IoSink};
