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

//! The four persistent zlib streams of a Tight connection.
//!
//! Each side of a connection owns one set of four slots. A slot's dictionary
//! carries over from one rectangle to the next and is only discarded when a
//! control byte's reset mask names it, so the encoder and decoder must see
//! exactly the same sequence of payloads per slot.
//!
//! Every payload is compressed with a single `deflate` call using
//! `Z_SYNC_FLUSH`, which lets the peer inflate it as soon as it arrives.

use bytes::{BufMut, BytesMut};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};

use crate::error::{Result, TightError};
use crate::protocol::{write_compact_length, TIGHT_MIN_TO_COMPRESS, TIGHT_STREAM_COUNT};

/// zlib header plus an empty stored block from the sync flush, with margin.
const DEFLATE_OVERHEAD: usize = 64;

/// Output room for deflating `len` bytes in one call. This is zlib's
/// conservative `deflateBound`, which also covers the level 1 expansion of
/// incompressible data.
fn deflate_bound(len: usize) -> usize {
    len + (len >> 3) + (len >> 6) + 5 + DEFLATE_OVERHEAD
}

/// Extra room given to the inflate output so an oversized block is detected
/// instead of silently truncated.
const INFLATE_SLACK: usize = 16;

fn slot_index(slot: u8) -> Result<usize> {
    let index = slot as usize;
    if index >= TIGHT_STREAM_COUNT {
        return Err(TightError::InvalidOperation(format!(
            "invalid zlib stream id {slot}"
        )));
    }
    Ok(index)
}

#[derive(Debug)]
struct DeflateSlot {
    stream: Compress,
    level: u8,
    /// Last level `set_level` refused, so the warning is logged once.
    refused: Option<u8>,
}

impl DeflateSlot {
    /// Moves the slot to `level` in place, keeping the dictionary.
    ///
    /// zlib refuses a switch between levels with different match strategies
    /// once data has gone through the stream. The slot then stays at its
    /// current level: the output is still a valid continuation of the same
    /// stream, so the peer stays in sync. The change is retried on later
    /// payloads and succeeds after the slot is reset.
    fn change_level(&mut self, slot: u8, level: u8) {
        match self.stream.set_level(Compression::new(u32::from(level))) {
            Ok(()) => {
                log::debug!("Tight: deflate stream {slot} level {} -> {level}", self.level);
                self.level = level;
                self.refused = None;
            }
            Err(e) => {
                if self.refused != Some(level) {
                    log::warn!(
                        "Tight: deflate stream {slot} stays at level {} (cannot switch to {level}: {e})",
                        self.level
                    );
                    self.refused = Some(level);
                }
            }
        }
    }
}

/// Encoder-side stream slots.
#[derive(Debug, Default)]
pub struct CompressStreams {
    slots: [Option<DeflateSlot>; TIGHT_STREAM_COUNT],
}

impl CompressStreams {
    /// Creates four inactive slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `slot` has been initialized.
    #[must_use]
    pub fn is_active(&self, slot: u8) -> bool {
        self.slots
            .get(slot as usize)
            .is_some_and(Option::is_some)
    }

    /// Resets every initialized slot whose bit is set in `mask`.
    ///
    /// The deflate context keeps its level but loses its dictionary, matching
    /// what the decoder does when it sees the same bit.
    pub fn reset(&mut self, mask: u8) {
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if mask & (1 << id) == 0 {
                continue;
            }
            if let Some(slot) = slot.as_mut() {
                slot.stream.reset();
                log::debug!("Tight: reset deflate stream {id}");
            }
        }
    }

    /// Compresses `input` on `slot` and appends the framed result to `out`.
    ///
    /// Payloads shorter than [`TIGHT_MIN_TO_COMPRESS`] are appended raw with
    /// no length field. Anything else is deflated at `level` and written as a
    /// compact length followed by the compressed block.
    ///
    /// Returns the number of bytes appended to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Compression`] if deflate does not consume all
    /// input in one call or produces no output, and
    /// [`TightError::Resource`] if the block is too large for a compact length.
    pub fn compress(&mut self, slot: u8, level: u8, input: &[u8], out: &mut BytesMut) -> Result<usize> {
        let before_len = out.len();
        if input.len() < TIGHT_MIN_TO_COMPRESS {
            out.put_slice(input);
            return Ok(out.len() - before_len);
        }

        let compressed = self.deflate(slot, level, input)?;
        write_compact_length(out, compressed.len())?;
        out.put_slice(&compressed);
        Ok(out.len() - before_len)
    }

    #[allow(clippy::cast_possible_truncation)] // Zlib totals are bounded by the buffer sizes
    fn deflate(&mut self, slot: u8, level: u8, input: &[u8]) -> Result<Vec<u8>> {
        let index = slot_index(slot)?;
        let level = level.min(9);

        let entry = match &mut self.slots[index] {
            Some(entry) => {
                if entry.level != level {
                    entry.change_level(slot, level);
                }
                entry
            }
            empty @ None => {
                log::debug!("Tight: initializing deflate stream {slot} at level {level}");
                empty.insert(DeflateSlot {
                    stream: Compress::new(Compression::new(u32::from(level)), true),
                    level,
                    refused: None,
                })
            }
        };

        let capacity = deflate_bound(input.len());
        let mut output = vec![0u8; capacity];

        let before_in = entry.stream.total_in();
        let before_out = entry.stream.total_out();

        entry
            .stream
            .compress(input, &mut output, FlushCompress::Sync)
            .map_err(|e| TightError::Compression(format!("stream {slot}: deflate failed: {e}")))?;

        let consumed = (entry.stream.total_in() - before_in) as usize;
        let produced = (entry.stream.total_out() - before_out) as usize;

        if consumed != input.len() || produced == 0 || produced >= capacity {
            return Err(TightError::Compression(format!(
                "stream {slot}: incomplete deflate (consumed {consumed}/{}, produced {produced})",
                input.len()
            )));
        }

        output.truncate(produced);
        Ok(output)
    }
}

/// Decoder-side stream slots.
#[derive(Debug, Default)]
pub struct DecompressStreams {
    slots: [Option<Decompress>; TIGHT_STREAM_COUNT],
}

impl DecompressStreams {
    /// Creates four inactive slots.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `slot` has been initialized.
    #[must_use]
    pub fn is_active(&self, slot: u8) -> bool {
        self.slots
            .get(slot as usize)
            .is_some_and(Option::is_some)
    }

    /// Ends every slot whose bit is set in `mask`. The next payload on such a
    /// slot starts a fresh inflate context.
    pub fn reset(&mut self, mask: u8) {
        for (id, slot) in self.slots.iter_mut().enumerate() {
            if mask & (1 << id) != 0 && slot.take().is_some() {
                log::debug!("Tight: reset inflate stream {id}");
            }
        }
    }

    /// Inflates one sync-flushed block from `slot` into exactly `expected` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Compression`] if inflate fails, leaves input
    /// unconsumed, or produces any size other than `expected`.
    #[allow(clippy::cast_possible_truncation)] // Zlib totals are bounded by the buffer sizes
    pub fn inflate(&mut self, slot: u8, input: &[u8], expected: usize) -> Result<Vec<u8>> {
        let index = slot_index(slot)?;
        let stream = self.slots[index].get_or_insert_with(|| {
            log::debug!("Tight: initializing inflate stream {slot}");
            Decompress::new(true)
        });

        let mut output = vec![0u8; expected + INFLATE_SLACK];
        let before_in = stream.total_in();
        let before_out = stream.total_out();

        stream
            .decompress(input, &mut output, FlushDecompress::Sync)
            .map_err(|e| TightError::Compression(format!("stream {slot}: inflate failed: {e}")))?;

        let consumed = (stream.total_in() - before_in) as usize;
        let produced = (stream.total_out() - before_out) as usize;

        if consumed != input.len() || produced != expected {
            return Err(TightError::Compression(format!(
                "stream {slot}: inflated {produced} bytes from {consumed}/{} input, expected {expected}",
                input.len()
            )));
        }

        output.truncate(produced);
        Ok(output)
    }
}
