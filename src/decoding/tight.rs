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

//! Resumable Tight decoder.
//!
//! The decoder never reads from a transport itself. Each step reports how
//! many bytes it needs next, and the caller hands over exactly that many:
//!
//! ```text
//! ControlByte -> FillColor(3) -> Done
//! ControlByte -> FilterId(1) -> ColorCount(1) -> PaletteEntries(3n) -> payload
//! ControlByte -> FilterId(1) -> payload
//! ControlByte -> payload
//!
//! payload: RawPayload(size) -> Done                        (size < 12)
//!          Length1 [-> Length2 [-> Length3]] -> CompressedPayload(len) -> Done
//! ```
//!
//! Pixels are decoded from the 3-byte RGB form and written as `0x00RRGGBB`
//! into a caller-owned framebuffer.

use bytes::BytesMut;

use crate::encoding::common::{CodecStats, RecordKind};
use crate::encoding::pack::{mono_row_bytes, unfilter_gradient, unpack_indexed, unpack_mono, unpack_rgb24};
use crate::error::{Result, TightError};
use crate::framebuffer::{FramebufferMut, FramebufferView, Rect};
use crate::protocol::{
    ControlByte, Subencoding, TIGHT_FILTER_COPY, TIGHT_FILTER_GRADIENT, TIGHT_FILTER_PALETTE,
    TIGHT_MAX_RECT_WIDTH, TIGHT_MIN_TO_COMPRESS,
};
use crate::stream::DecompressStreams;
use crate::translate::join_rgb;

/// Where the decoder is within the current rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// No rectangle has been started.
    Idle,
    /// Waiting for the compression control byte.
    ControlByte,
    /// Waiting for the 3-byte fill color.
    FillColor,
    /// Waiting for the filter id.
    FilterId,
    /// Waiting for the palette size byte.
    ColorCount,
    /// Waiting for `3 * n` bytes of palette colors.
    PaletteEntries,
    /// Waiting for the first compact length byte.
    Length1,
    /// Waiting for the second compact length byte.
    Length2,
    /// Waiting for the third compact length byte.
    Length3,
    /// Waiting for an uncompressed payload.
    RawPayload,
    /// Waiting for a deflate block.
    CompressedPayload,
    /// The rectangle is complete.
    Done,
    /// A fatal error occurred. The connection must be dropped.
    Failed,
}

impl DecodeState {
    /// Returns `true` while a rectangle is partially decoded.
    #[must_use]
    pub fn in_progress(self) -> bool {
        !matches!(self, Self::Idle | Self::Done | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    Copy,
    Palette,
    Gradient,
}

/// Decoder for one connection's Tight rectangles.
///
/// The inflate streams persist across rectangles. Rectangles must be fed in
/// the order the server sent them.
#[derive(Debug)]
pub struct TightDecoder<'fb> {
    framebuffer: Option<FramebufferMut<'fb>>,
    streams: DecompressStreams,
    state: DecodeState,
    needed: usize,
    rect: Rect,
    stream: u8,
    filter: Filter,
    palette: Vec<u32>,
    raw_len: usize,
    compressed_len: usize,
    length_bytes: usize,
    last_error: Option<String>,
    stats: CodecStats,
}

impl Default for TightDecoder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'fb> TightDecoder<'fb> {
    /// Creates a decoder with no framebuffer bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            framebuffer: None,
            streams: DecompressStreams::new(),
            state: DecodeState::Idle,
            needed: 0,
            rect: Rect::default(),
            stream: 0,
            filter: Filter::Copy,
            palette: Vec::with_capacity(256),
            raw_len: 0,
            compressed_len: 0,
            length_bytes: 0,
            last_error: None,
            stats: CodecStats::default(),
        }
    }

    /// Binds the framebuffer that decoded pixels are written into.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::InvalidOperation`] while a rectangle is being
    /// decoded, and [`TightError::Bounds`] if the buffer is too small for
    /// the declared layout.
    pub fn bind_framebuffer(
        &mut self,
        pixels: &'fb mut [u32],
        width: u16,
        height: u16,
        stride: usize,
    ) -> Result<()> {
        if self.state.in_progress() {
            return Err(self.misuse("cannot rebind the framebuffer in the middle of a rectangle"));
        }
        self.framebuffer = Some(FramebufferMut::new(pixels, width, height, stride)?);
        Ok(())
    }

    /// Unbinds and returns the framebuffer. A partially decoded rectangle is
    /// abandoned.
    pub fn release_framebuffer(&mut self) -> Option<&'fb mut [u32]> {
        if self.state.in_progress() {
            log::warn!("Tight: framebuffer released with a rectangle in progress");
            self.state = DecodeState::Idle;
            self.needed = 0;
        }
        self.framebuffer.take().map(FramebufferMut::into_inner)
    }

    /// Read-only view of the bound framebuffer.
    #[must_use]
    pub fn framebuffer(&self) -> Option<FramebufferView<'_>> {
        self.framebuffer.as_ref().map(FramebufferMut::as_view)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Bytes the next [`continue_decoding`](Self::continue_decoding) call
    /// must receive. 0 once the rectangle is done.
    #[must_use]
    pub fn bytes_needed(&self) -> usize {
        self.needed
    }

    /// Returns `true` once the current rectangle has been fully applied.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state == DecodeState::Done
    }

    /// Message of the most recent error.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Counters for everything decoded so far.
    #[must_use]
    pub fn stats(&self) -> &CodecStats {
        &self.stats
    }

    /// Drops the inflate streams in `mask` without waiting for a control
    /// byte to request it.
    pub fn reset_streams(&mut self, mask: u8) {
        self.streams.reset(mask);
    }

    /// Starts decoding a `w` x `h` rectangle at (`x`, `y`).
    ///
    /// Returns the number of bytes needed next, or 0 for an empty rectangle
    /// (which is complete immediately).
    ///
    /// # Errors
    ///
    /// Returns [`TightError::InvalidOperation`] without a bound framebuffer,
    /// after a failure, or while another rectangle is incomplete. Bounds and
    /// width violations are fatal and are detected before any byte is read.
    pub fn begin_rectangle(&mut self, x: u16, y: u16, w: u16, h: u16) -> Result<usize> {
        if self.state == DecodeState::Failed {
            return Err(self.misuse("decoder has failed; the connection must be reset"));
        }
        if self.state.in_progress() {
            return Err(self.misuse("previous rectangle is not complete"));
        }
        let rect = Rect::new(x, y, w, h);
        let Some(fb) = self.framebuffer.as_ref() else {
            return Err(self.misuse("no framebuffer bound"));
        };

        if let Err(e) = fb.check_rect(&rect) {
            return Err(self.fail(e));
        }
        if w > TIGHT_MAX_RECT_WIDTH {
            return Err(self.fail(TightError::Format(format!(
                "rectangle too wide ({w} > {TIGHT_MAX_RECT_WIDTH})"
            ))));
        }

        self.rect = rect;
        self.palette.clear();
        if rect.is_empty() {
            self.state = DecodeState::Done;
            self.needed = 0;
        } else {
            self.state = DecodeState::ControlByte;
            self.needed = 1;
        }
        Ok(self.needed)
    }

    /// Feeds exactly [`bytes_needed`](Self::bytes_needed) bytes and advances
    /// one step. Returns the number of bytes needed next, 0 when done.
    ///
    /// # Errors
    ///
    /// A chunk of the wrong size, or a call while no rectangle is in
    /// progress, is [`TightError::InvalidOperation`] and leaves the state
    /// untouched. Every other error moves the decoder to
    /// [`DecodeState::Failed`].
    pub fn continue_decoding(&mut self, bytes: &[u8]) -> Result<usize> {
        if !self.state.in_progress() {
            let state = self.state;
            return Err(self.misuse(&format!("no rectangle in progress (state {state:?})")));
        }
        if bytes.len() != self.needed {
            let needed = self.needed;
            return Err(self.misuse(&format!("expected {needed} bytes, got {}", bytes.len())));
        }

        #[cfg(feature = "debug-logging")]
        log::info!("Tight: {:?} consuming {} bytes", self.state, bytes.len());

        match self.step(bytes) {
            Ok(needed) => {
                self.needed = needed;
                Ok(needed)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Consumes as many whole steps as `buf` holds, splitting them off the
    /// front. Returns the number of bytes needed next, 0 when done.
    ///
    /// # Errors
    ///
    /// Same as [`continue_decoding`](Self::continue_decoding).
    pub fn feed(&mut self, buf: &mut BytesMut) -> Result<usize> {
        while self.state.in_progress() && buf.len() >= self.needed {
            let chunk = buf.split_to(self.needed);
            self.continue_decoding(&chunk)?;
        }
        Ok(self.needed)
    }

    fn misuse(&mut self, message: &str) -> TightError {
        self.last_error = Some(message.to_string());
        TightError::InvalidOperation(message.to_string())
    }

    fn fail(&mut self, error: TightError) -> TightError {
        log::error!(
            "Tight: decoding {}x{} at ({}, {}) failed: {error}",
            self.rect.w,
            self.rect.h,
            self.rect.x,
            self.rect.y
        );
        self.last_error = Some(error.to_string());
        self.state = DecodeState::Failed;
        self.needed = 0;
        error
    }

    fn step(&mut self, bytes: &[u8]) -> Result<usize> {
        match self.state {
            DecodeState::ControlByte => self.read_control(bytes[0]),
            DecodeState::FillColor => {
                let color = join_rgb(bytes[0], bytes[1], bytes[2]);
                let rect = self.rect;
                self.framebuffer_mut()?.fill_rect(&rect, color);
                self.stats.record(RecordKind::Fill, 3, 3);
                self.finish(RecordKind::Fill);
                Ok(0)
            }
            DecodeState::FilterId => self.read_filter(bytes[0]),
            DecodeState::ColorCount => {
                let count = usize::from(bytes[0]) + 1;
                self.state = DecodeState::PaletteEntries;
                Ok(count * 3)
            }
            DecodeState::PaletteEntries => {
                self.palette.clear();
                self.palette
                    .extend(bytes.chunks_exact(3).map(|c| join_rgb(c[0], c[1], c[2])));
                Ok(self.payload_size())
            }
            DecodeState::Length1 => {
                self.compressed_len = usize::from(bytes[0] & 0x7F);
                self.length_step(bytes[0], DecodeState::Length2)
            }
            DecodeState::Length2 => {
                self.compressed_len |= usize::from(bytes[0] & 0x7F) << 7;
                self.length_step(bytes[0], DecodeState::Length3)
            }
            DecodeState::Length3 => {
                self.compressed_len |= usize::from(bytes[0]) << 14;
                self.begin_compressed()
            }
            DecodeState::RawPayload => {
                self.apply(bytes)?;
                let kind = self.record_kind();
                self.stats.record(kind, self.raw_len, bytes.len());
                self.finish(kind);
                Ok(0)
            }
            DecodeState::CompressedPayload => {
                let data = self.streams.inflate(self.stream, bytes, self.raw_len)?;
                self.apply(&data)?;
                let kind = self.record_kind();
                self.stats
                    .record(kind, self.raw_len, self.length_bytes + bytes.len());
                self.finish(kind);
                Ok(0)
            }
            DecodeState::Idle | DecodeState::Done | DecodeState::Failed => Err(
                TightError::InvalidOperation(format!("no step in state {:?}", self.state)),
            ),
        }
    }

    fn read_control(&mut self, byte: u8) -> Result<usize> {
        let control = ControlByte::parse(byte)?;
        if control.reset_mask != 0 {
            self.streams.reset(control.reset_mask);
        }

        match control.subencoding {
            Subencoding::Fill => {
                self.state = DecodeState::FillColor;
                Ok(3)
            }
            Subencoding::Jpeg => Err(TightError::Format(format!(
                "JPEG subencoding is not supported (control byte {byte:#04x})"
            ))),
            Subencoding::Basic {
                stream,
                explicit_filter,
            } => {
                self.stream = stream;
                if explicit_filter {
                    self.state = DecodeState::FilterId;
                    Ok(1)
                } else {
                    self.filter = Filter::Copy;
                    Ok(self.payload_size())
                }
            }
        }
    }

    fn read_filter(&mut self, id: u8) -> Result<usize> {
        match id {
            TIGHT_FILTER_COPY => {
                self.filter = Filter::Copy;
                Ok(self.payload_size())
            }
            TIGHT_FILTER_PALETTE => {
                self.filter = Filter::Palette;
                self.state = DecodeState::ColorCount;
                Ok(1)
            }
            TIGHT_FILTER_GRADIENT => {
                self.filter = Filter::Gradient;
                Ok(self.payload_size())
            }
            other => Err(TightError::Format(format!("unknown Tight filter id {other}"))),
        }
    }

    /// Sizes the filtered payload and picks the raw or compressed path.
    fn payload_size(&mut self) -> usize {
        let (w, h) = (usize::from(self.rect.w), usize::from(self.rect.h));
        self.raw_len = match self.filter {
            Filter::Palette if self.palette.len() == 2 => mono_row_bytes(w) * h,
            Filter::Palette => w * h,
            Filter::Copy | Filter::Gradient => w * h * 3,
        };
        self.length_bytes = 0;

        if self.raw_len < TIGHT_MIN_TO_COMPRESS {
            self.state = DecodeState::RawPayload;
            self.raw_len
        } else {
            self.state = DecodeState::Length1;
            1
        }
    }

    fn length_step(&mut self, byte: u8, next: DecodeState) -> Result<usize> {
        self.length_bytes += 1;
        if byte & 0x80 != 0 {
            self.state = next;
            Ok(1)
        } else {
            self.begin_compressed()
        }
    }

    fn begin_compressed(&mut self) -> Result<usize> {
        if self.state == DecodeState::Length3 {
            self.length_bytes += 1;
        }
        if self.compressed_len == 0 {
            return Err(TightError::Format("zero-length compressed payload".to_string()));
        }
        self.state = DecodeState::CompressedPayload;
        Ok(self.compressed_len)
    }

    fn apply(&mut self, data: &[u8]) -> Result<()> {
        let (w, h) = (usize::from(self.rect.w), usize::from(self.rect.h));
        let pixels = match self.filter {
            Filter::Copy => unpack_rgb24(data)?,
            Filter::Gradient => unfilter_gradient(data, w, h)?,
            Filter::Palette if self.palette.len() == 2 => {
                unpack_mono(data, w, h, [self.palette[0], self.palette[1]])?
            }
            Filter::Palette => unpack_indexed(data, &self.palette)?,
        };
        if pixels.len() != w * h {
            return Err(TightError::Format(format!(
                "payload decoded to {} pixels, expected {}",
                pixels.len(),
                w * h
            )));
        }
        let rect = self.rect;
        self.framebuffer_mut()?.put_rect(&rect, &pixels);
        Ok(())
    }

    fn record_kind(&self) -> RecordKind {
        match self.filter {
            Filter::Copy => RecordKind::FullColor,
            Filter::Gradient => RecordKind::Gradient,
            Filter::Palette if self.palette.len() == 2 => RecordKind::Mono,
            Filter::Palette => RecordKind::Indexed,
        }
    }

    fn framebuffer_mut(&mut self) -> Result<&mut FramebufferMut<'fb>> {
        self.framebuffer
            .as_mut()
            .ok_or_else(|| TightError::InvalidOperation("no framebuffer bound".to_string()))
    }

    fn finish(&mut self, kind: RecordKind) {
        log::debug!(
            "Tight: decoded {}x{} at ({}, {}) as {kind:?}",
            self.rect.w,
            self.rect.h,
            self.rect.x,
            self.rect.y
        );
        self.state = DecodeState::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feeds `data` one step at a time, returning the number of steps taken.
    fn drive(decoder: &mut TightDecoder<'_>, mut data: &[u8]) -> Result<usize> {
        let mut steps = 0;
        while decoder.bytes_needed() > 0 {
            let (chunk, rest) = data.split_at(decoder.bytes_needed());
            decoder.continue_decoding(chunk)?;
            data = rest;
            steps += 1;
        }
        assert!(data.is_empty(), "{} bytes left over", data.len());
        Ok(steps)
    }

    #[test]
    fn test_fill() {
        let mut pixels = vec![0u32; 16];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 4, 4, 4).unwrap();
        assert_eq!(decoder.begin_rectangle(1, 1, 2, 2).unwrap(), 1);
        assert_eq!(drive(&mut decoder, &[0x80, 0xFF, 0x00, 0x00]).unwrap(), 2);
        assert!(decoder.is_done());
        assert_eq!(decoder.stats().fill_records, 1);

        let pixels = decoder.release_framebuffer().unwrap();
        assert_eq!(pixels[5], 0x00FF_0000);
        assert_eq!(pixels[10], 0x00FF_0000);
        assert_eq!(pixels[0], 0);
        assert_eq!(pixels[15], 0);
    }

    #[test]
    fn test_raw_mono() {
        let mut pixels = vec![0u32; 8];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 8, 1, 8).unwrap();
        decoder.begin_rectangle(0, 0, 8, 1).unwrap();
        let record = [0x50, 1, 1, 0, 0, 1, 0, 0, 2, 0b0001_0000];
        drive(&mut decoder, &record).unwrap();
        assert_eq!(decoder.stats().mono_records, 1);
        let pixels = decoder.release_framebuffer().unwrap();
        assert_eq!(pixels.to_vec(), vec![1, 1, 1, 2, 1, 1, 1, 1]);
    }

    #[test]
    fn test_single_entry_palette() {
        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        drive(&mut decoder, &[0x60, 1, 0, 9, 8, 7, 0, 0, 0, 0]).unwrap();
        let pixels = decoder.release_framebuffer().unwrap();
        assert!(pixels.iter().all(|&p| p == 0x0009_0807));
    }

    #[test]
    fn test_palette_index_out_of_range() {
        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        let record = [0x60, 1, 2, 1, 1, 1, 2, 2, 2, 3, 3, 3, 0, 1, 2, 3];
        let err = drive(&mut decoder, &record).unwrap_err();
        assert!(matches!(err, TightError::Format(_)));
        assert_eq!(decoder.state(), DecodeState::Failed);
        assert!(decoder.last_error().unwrap().contains("index 3"));
    }

    #[test]
    fn test_jpeg_and_invalid_control() {
        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        assert!(matches!(decoder.continue_decoding(&[0x90]), Err(TightError::Format(_))));
        assert_eq!(decoder.state(), DecodeState::Failed);
        assert!(decoder.last_error().unwrap().contains("JPEG"));

        // Nothing can be resumed after a failure.
        let err = decoder.begin_rectangle(0, 0, 1, 1).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(decoder.state(), DecodeState::Failed);

        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        assert!(decoder.continue_decoding(&[0xA0]).is_err());
    }

    #[test]
    fn test_unknown_filter() {
        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        decoder.continue_decoding(&[0x40]).unwrap();
        assert!(matches!(decoder.continue_decoding(&[3]), Err(TightError::Format(_))));
    }

    #[test]
    fn test_wrong_chunk_size_is_recoverable() {
        let mut pixels = vec![0u32; 4];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        decoder.begin_rectangle(0, 0, 2, 2).unwrap();
        decoder.continue_decoding(&[0x80]).unwrap();

        let err = decoder.continue_decoding(&[1, 2]).unwrap_err();
        assert!(matches!(err, TightError::InvalidOperation(_)));
        assert_eq!(decoder.state(), DecodeState::FillColor);
        assert_eq!(decoder.bytes_needed(), 3);

        assert_eq!(decoder.continue_decoding(&[1, 2, 3]).unwrap(), 0);
        assert!(decoder.is_done());
    }

    #[test]
    fn test_bounds_checked_before_reading() {
        let mut pixels = vec![0u32; 16];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 4, 4, 4).unwrap();
        let err = decoder.begin_rectangle(3, 3, 2, 1).unwrap_err();
        assert!(matches!(err, TightError::Bounds { .. }));
        assert_eq!(decoder.state(), DecodeState::Failed);
        assert_eq!(decoder.bytes_needed(), 0);
    }

    #[test]
    fn test_too_wide() {
        let mut pixels = vec![0u32; 2049];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 2049, 1, 2049).unwrap();
        let err = decoder.begin_rectangle(0, 0, 2049, 1).unwrap_err();
        assert!(matches!(err, TightError::Format(_)));
    }

    #[test]
    fn test_empty_rect_and_misuse() {
        let mut decoder = TightDecoder::new();
        assert!(matches!(
            decoder.begin_rectangle(0, 0, 0, 0),
            Err(TightError::InvalidOperation(_))
        ));
        assert_eq!(decoder.last_error(), Some("no framebuffer bound"));

        let mut pixels = vec![0u32; 4];
        decoder.bind_framebuffer(&mut pixels, 2, 2, 2).unwrap();
        assert_eq!(decoder.begin_rectangle(2, 2, 0, 0).unwrap(), 0);
        assert!(decoder.is_done());
        assert!(decoder.continue_decoding(&[]).is_err());
    }

    #[test]
    fn test_zero_compressed_length() {
        let mut pixels = vec![0u32; 16];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 4, 4, 4).unwrap();
        decoder.begin_rectangle(0, 0, 4, 4).unwrap();
        // Copy filter, 48 bytes raw: a length follows.
        assert_eq!(decoder.continue_decoding(&[0x00]).unwrap(), 1);
        assert_eq!(decoder.state(), DecodeState::Length1);
        assert!(matches!(decoder.continue_decoding(&[0x00]), Err(TightError::Format(_))));
    }

    #[test]
    fn test_length_continuation() {
        let mut pixels = vec![0u32; 64 * 64];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 64, 64, 64).unwrap();
        decoder.begin_rectangle(0, 0, 64, 64).unwrap();
        decoder.continue_decoding(&[0x00]).unwrap();
        assert_eq!(decoder.continue_decoding(&[0x81]).unwrap(), 1);
        assert_eq!(decoder.continue_decoding(&[0x81]).unwrap(), 1);
        assert_eq!(decoder.state(), DecodeState::Length3);
        // 1 + (1 << 7) + (1 << 14)
        assert_eq!(decoder.continue_decoding(&[0x01]).unwrap(), 16_513);
        assert_eq!(decoder.state(), DecodeState::CompressedPayload);
    }

    #[test]
    fn test_feed_whole_record() {
        let mut pixels = vec![0u32; 16];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut pixels, 4, 4, 4).unwrap();
        decoder.begin_rectangle(0, 0, 4, 4).unwrap();

        let mut buf = BytesMut::from(&[0x80, 0x01][..]);
        assert_eq!(decoder.feed(&mut buf).unwrap(), 3);
        assert_eq!(buf.len(), 1);
        buf.extend_from_slice(&[0x02, 0x03, 0xEE]);
        assert_eq!(decoder.feed(&mut buf).unwrap(), 0);
        assert_eq!(&buf[..], &[0xEE]);
        assert!(decoder.is_done());
    }
}
