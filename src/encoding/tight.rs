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

//! VNC Tight encoder.
//!
//! Each update rectangle is partitioned into solid fills and size-bounded
//! subrectangles. Every subrectangle is classified by its color count and
//! sent through the matching path:
//!
//! - Solid fill (1 color): control byte `0x8_` and one pixel
//! - Mono rect (2 colors): 1-bit bitmap on stream 1
//! - Indexed palette (3-256 colors): 8-bit indices on stream 2
//! - Gradient (smooth true color): prediction residuals on stream 3
//! - Full color: raw pixels on stream 0
//!
//! The four deflate streams persist for the lifetime of the encoder, so one
//! `TightEncoder` must be used per client connection.

use bytes::{BufMut, BytesMut};

use super::classify::{Classification, Classifier};
use super::common::{CodecStats, RecordKind};
use super::pack::{filter_gradient, pack_indexed, pack_mono};
use super::partition::{estimate_fragment_count, fragment_count, partition, Piece};
use super::profile::{CompressionProfile, DEFAULT_COMPRESS_LEVEL};
use super::smooth::is_smooth;
use crate::error::{Result, TightError};
use crate::framebuffer::{FramebufferView, Rect};
use crate::protocol::{
    write_last_rect, write_update_header, ControlByte, PixelFormat, Rectangle, ENCODING_TIGHT,
    STREAM_ID_FULL_COLOR, STREAM_ID_GRADIENT, STREAM_ID_INDEXED, STREAM_ID_MONO,
    TIGHT_FILTER_GRADIENT, TIGHT_FILTER_PALETTE, UNKNOWN_RECT_COUNT,
};
use crate::sink::ByteSink;
use crate::stream::CompressStreams;
use crate::translate::{put_wire_pixel, translate_pixels};

/// Encoder settings negotiated with one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TightEncoderConfig {
    /// Compression level 0-9 selecting a [`CompressionProfile`].
    pub compress_level: u8,
    /// Screen width, used to size scratch buffers.
    pub screen_width: u16,
    /// Screen height, used to size scratch buffers.
    pub screen_height: u16,
    /// The client's pixel format.
    ///
    /// [`TightDecoder`](crate::TightDecoder) only reads the 3-byte RGB form
    /// sent for 32 bpp depth-24 formats. Records written in a native 8 or
    /// 16 bpp format are for real VNC clients and do not round-trip here.
    pub pixel_format: PixelFormat,
    /// Allow the gradient filter for smooth true-color content.
    pub enable_gradient: bool,
    /// The client understands `LastRect`, so the solid-area search may
    /// produce an unpredictable number of records.
    pub enable_last_rect: bool,
}

impl Default for TightEncoderConfig {
    fn default() -> Self {
        Self {
            compress_level: DEFAULT_COMPRESS_LEVEL,
            screen_width: 0,
            screen_height: 0,
            pixel_format: PixelFormat::rgb888(),
            enable_gradient: true,
            enable_last_rect: true,
        }
    }
}

/// Stateful Tight encoder for one connection.
#[derive(Debug)]
pub struct TightEncoder {
    config: TightEncoderConfig,
    profile: &'static CompressionProfile,
    streams: CompressStreams,
    classifier: Classifier,
    pending_reset: u8,
    pixels: Vec<u32>,
    record: BytesMut,
    stats: CodecStats,
}

impl Default for TightEncoder {
    fn default() -> Self {
        Self::new(TightEncoderConfig::default())
    }
}

impl TightEncoder {
    /// Creates an encoder. Levels above 9 are clamped.
    #[must_use]
    pub fn new(config: TightEncoderConfig) -> Self {
        let mut encoder = Self {
            profile: CompressionProfile::for_level(DEFAULT_COMPRESS_LEVEL),
            config,
            streams: CompressStreams::new(),
            classifier: Classifier::new(),
            pending_reset: 0,
            pixels: Vec::new(),
            record: BytesMut::new(),
            stats: CodecStats::default(),
        };
        let (level, width, height) = (
            encoder.config.compress_level,
            encoder.config.screen_width,
            encoder.config.screen_height,
        );
        encoder.configure(level, width, height);
        encoder
    }

    /// Selects the compression profile and screen size.
    ///
    /// The deflate streams survive a level change; each is switched to its
    /// new level in place the next time it is used. A stream whose deflate
    /// context refuses the switch keeps its old level until it is reset.
    pub fn configure(&mut self, compress_level: u8, screen_width: u16, screen_height: u16) {
        let level = if compress_level > 9 {
            log::warn!("Tight: compression level {compress_level} out of range, using 9");
            9
        } else {
            compress_level
        };
        self.config.compress_level = level;
        self.config.screen_width = screen_width;
        self.config.screen_height = screen_height;
        self.profile = CompressionProfile::for_level(level);

        let scratch = (usize::from(screen_width) * usize::from(screen_height)).min(self.profile.max_rect_size);
        self.pixels.reserve(scratch.saturating_sub(self.pixels.len()));

        log::debug!("Tight: configured level {level} for {screen_width}x{screen_height}");
    }

    /// Changes the client pixel format used for colors and full-color data.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::InvalidOperation`] for formats the encoder
    /// cannot produce (color-mapped, or not 8/16/32 bits per pixel).
    pub fn set_pixel_format(&mut self, format: PixelFormat) -> Result<()> {
        if !format.is_valid() {
            return Err(TightError::InvalidOperation(format!(
                "unsupported pixel format: {}bpp depth {}",
                format.bits_per_pixel, format.depth
            )));
        }
        self.config.pixel_format = format;
        Ok(())
    }

    /// Enables or disables the `LastRect` framing (and with it the
    /// solid-area search).
    pub fn set_last_rect(&mut self, enabled: bool) {
        self.config.enable_last_rect = enabled;
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &TightEncoderConfig {
        &self.config
    }

    /// Active compression profile.
    #[must_use]
    pub fn profile(&self) -> &'static CompressionProfile {
        self.profile
    }

    /// Counters for everything encoded so far.
    #[must_use]
    pub fn stats(&self) -> &CodecStats {
        &self.stats
    }

    /// Number of records [`encode`](Self::encode) will emit for `rect`, or 0
    /// when the update must be terminated with `LastRect` instead.
    ///
    /// Empty rectangles also yield 0; use
    /// [`fragment_count`](Self::fragment_count) to tell the two apart.
    #[must_use]
    pub fn estimate_fragment_count(&self, rect: Rect) -> usize {
        estimate_fragment_count(rect, self.profile, self.config.enable_last_rect)
    }

    /// Exact number of records [`encode`](Self::encode) will emit for
    /// `rect`, or `None` when the count is only known after encoding.
    #[must_use]
    pub fn fragment_count(&self, rect: Rect) -> Option<usize> {
        fragment_count(rect, self.profile, self.config.enable_last_rect)
    }

    /// Marks the streams in `mask` for reset. The next record carries the
    /// bits and the encoder resets those streams before using any of them.
    pub fn request_reset(&mut self, mask: u8) {
        self.pending_reset |= mask & 0x0F;
    }

    /// Marks all four streams for reset.
    pub fn reset_all(&mut self) {
        self.request_reset(0x0F);
    }

    /// Encodes `rect` of `fb` and writes the resulting records, each with
    /// its own rectangle header, to `sink`.
    ///
    /// Returns the number of records written. A 0x0 rectangle writes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`TightError::Bounds`] if `rect` is outside `fb`, and any
    /// compression or sink error. After a compression error the streams no
    /// longer match the client's and the connection must be dropped.
    pub fn encode<S: ByteSink + ?Sized>(
        &mut self,
        fb: &FramebufferView<'_>,
        rect: Rect,
        sink: &mut S,
    ) -> Result<usize> {
        fb.check_rect(&rect)?;
        if rect.is_empty() {
            return Ok(0);
        }

        let pieces = partition(fb, rect, self.profile, self.config.enable_last_rect);
        for piece in &pieces {
            self.record.clear();
            match *piece {
                Piece::Fill { rect, color } => self.encode_fill(rect, color),
                Piece::Subrect(rect) => self.encode_subrect(fb, rect)?,
            }
            sink.write(&self.record)?;
        }

        log::debug!(
            "Tight: encoded {}x{} at ({}, {}) as {} records",
            rect.w,
            rect.h,
            rect.x,
            rect.y,
            pieces.len()
        );
        Ok(pieces.len())
    }

    /// Encodes a complete `FramebufferUpdate` message for `rects`.
    ///
    /// The rectangle count is announced up front when every rectangle's
    /// fragment count is known; otherwise `0xFFFF` is sent and the message
    /// ends with a `LastRect` marker. Empty rectangles are skipped.
    ///
    /// Returns the number of Tight records written.
    ///
    /// # Errors
    ///
    /// Same as [`encode`](Self::encode).
    pub fn encode_update<S: ByteSink + ?Sized>(
        &mut self,
        fb: &FramebufferView<'_>,
        rects: &[Rect],
        sink: &mut S,
    ) -> Result<usize> {
        let announced = rects
            .iter()
            .try_fold(0usize, |total, rect| Some(total + self.fragment_count(*rect)?));
        let header_count = announced
            .and_then(|n| u16::try_from(n).ok())
            .filter(|&n| n != UNKNOWN_RECT_COUNT);

        let mut header = BytesMut::with_capacity(4);
        write_update_header(&mut header, header_count.unwrap_or(UNKNOWN_RECT_COUNT));
        sink.write(&header)?;

        let mut written = 0;
        for rect in rects.iter().filter(|r| !r.is_empty()) {
            written += self.encode(fb, *rect, sink)?;
        }

        if header_count.is_none() {
            let mut marker = BytesMut::with_capacity(12);
            write_last_rect(&mut marker);
            sink.write(&marker)?;
        }

        log::debug!("Tight: update with {written} records, {}", self.stats);
        Ok(written)
    }

    /// Takes the pending reset bits and resets those deflate streams.
    fn take_reset(&mut self) -> u8 {
        let mask = std::mem::take(&mut self.pending_reset);
        if mask != 0 {
            self.streams.reset(mask);
        }
        mask
    }

    fn write_header(&mut self, rect: Rect) {
        Rectangle {
            x: rect.x,
            y: rect.y,
            width: rect.w,
            height: rect.h,
            encoding: ENCODING_TIGHT,
        }
        .write_header(&mut self.record);
    }

    fn encode_fill(&mut self, rect: Rect, color: u32) {
        self.write_header(rect);
        let reset = self.take_reset();
        self.record.put_u8(ControlByte::fill(reset).to_byte());
        let before = self.record.len();
        put_wire_pixel(&mut self.record, color, &self.config.pixel_format);
        let pixel_len = self.record.len() - before;
        self.stats.record(RecordKind::Fill, pixel_len, pixel_len);

        #[cfg(feature = "debug-logging")]
        log::info!("Tight: fill {}x{} at ({}, {}) color {color:#08x}", rect.w, rect.h, rect.x, rect.y);
    }

    fn encode_subrect(&mut self, fb: &FramebufferView<'_>, rect: Rect) -> Result<()> {
        let (w, h) = (usize::from(rect.w), usize::from(rect.h));
        fb.extract(&rect, &mut self.pixels);

        let max_colors = self.profile.max_palette_colors(w, h);
        let pixels = std::mem::take(&mut self.pixels);
        let result = match self.classifier.classify(&pixels, max_colors) {
            Classification::Empty => Ok(()),
            Classification::Solid(color) => {
                self.encode_fill(rect, color);
                Ok(())
            }
            Classification::TwoColor {
                background,
                foreground,
            } => self.encode_mono(rect, &pixels, background, foreground),
            Classification::Palette => self.encode_indexed(rect, &pixels),
            Classification::TrueColor => {
                if self.config.enable_gradient
                    && self.config.pixel_format.uses_tight_pixel24()
                    && is_smooth(&pixels, w, h, self.profile)
                {
                    self.encode_gradient(rect, &pixels)
                } else {
                    self.encode_full_color(rect, &pixels)
                }
            }
        };
        self.pixels = pixels;
        result
    }

    /// Writes the rectangle header, control byte and optional filter id of a
    /// basic-compression record.
    fn begin_basic(&mut self, rect: Rect, stream: u8, filter: Option<u8>) {
        self.write_header(rect);
        let reset = self.take_reset();
        self.record
            .put_u8(ControlByte::basic(reset, stream, filter.is_some()).to_byte());
        if let Some(filter) = filter {
            self.record.put_u8(filter);
        }
    }

    fn finish_payload(&mut self, kind: RecordKind, stream: u8, level: u8, data: &[u8]) -> Result<()> {
        let wire = self.streams.compress(stream, level, data, &mut self.record)?;
        self.stats.record(kind, data.len(), wire);
        log::debug!("Tight: {kind:?} record on stream {stream}: {} -> {wire} bytes", data.len());
        Ok(())
    }

    fn encode_mono(&mut self, rect: Rect, pixels: &[u32], background: u32, foreground: u32) -> Result<()> {
        self.begin_basic(rect, STREAM_ID_MONO, Some(TIGHT_FILTER_PALETTE));
        self.record.put_u8(1);
        put_wire_pixel(&mut self.record, background, &self.config.pixel_format);
        put_wire_pixel(&mut self.record, foreground, &self.config.pixel_format);

        let bitmap = pack_mono(pixels, usize::from(rect.w), usize::from(rect.h), background);
        self.finish_payload(RecordKind::Mono, STREAM_ID_MONO, self.profile.mono_zlib_level, &bitmap)
    }

    #[allow(clippy::cast_possible_truncation)] // Palette size is 3..=256
    fn encode_indexed(&mut self, rect: Rect, pixels: &[u32]) -> Result<()> {
        self.begin_basic(rect, STREAM_ID_INDEXED, Some(TIGHT_FILTER_PALETTE));
        let palette = self.classifier.palette();
        self.record.put_u8((palette.len() - 1) as u8);
        for color in palette.colors() {
            put_wire_pixel(&mut self.record, color, &self.config.pixel_format);
        }

        let indices = pack_indexed(pixels, palette)?;
        self.finish_payload(RecordKind::Indexed, STREAM_ID_INDEXED, self.profile.idx_zlib_level, &indices)
    }

    fn encode_gradient(&mut self, rect: Rect, pixels: &[u32]) -> Result<()> {
        self.begin_basic(rect, STREAM_ID_GRADIENT, Some(TIGHT_FILTER_GRADIENT));
        let residuals = filter_gradient(pixels, usize::from(rect.w), usize::from(rect.h));
        self.finish_payload(
            RecordKind::Gradient,
            STREAM_ID_GRADIENT,
            self.profile.gradient_zlib_level,
            &residuals,
        )
    }

    fn encode_full_color(&mut self, rect: Rect, pixels: &[u32]) -> Result<()> {
        self.begin_basic(rect, STREAM_ID_FULL_COLOR, None);
        let data = translate_pixels(pixels, &self.config.pixel_format);
        self.finish_payload(RecordKind::FullColor, STREAM_ID_FULL_COLOR, self.profile.raw_zlib_level, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_one(pixels: &[u32], w: u16, h: u16, config: TightEncoderConfig) -> (BytesMut, usize) {
        let fb = FramebufferView::new(pixels, w, h, usize::from(w)).unwrap();
        let mut encoder = TightEncoder::new(config);
        let mut out = BytesMut::new();
        let n = encoder.encode(&fb, Rect::new(0, 0, w, h), &mut out).unwrap();
        (out, n)
    }

    #[test]
    fn test_solid_fill_record() {
        let pixels = vec![0x00FF_0000; 64 * 64];
        let (out, n) = encode_one(&pixels, 64, 64, TightEncoderConfig::default());
        assert_eq!(n, 1);
        assert_eq!(out.len(), 12 + 1 + 3);
        assert_eq!(&out[8..12], &ENCODING_TIGHT.to_be_bytes());
        assert_eq!(&out[12..], &[0x80, 0xFF, 0x00, 0x00]);
    }

    #[test]
    fn test_fill_in_native_format() {
        let pixels = vec![0x00FF_0000; 16];
        let config = TightEncoderConfig {
            pixel_format: PixelFormat::rgb565(),
            ..TightEncoderConfig::default()
        };
        let (out, _) = encode_one(&pixels, 4, 4, config);
        // RGB565 little-endian red.
        assert_eq!(&out[12..], &[0x80, 0x00, 0xF8]);
    }

    #[test]
    fn test_small_mono_is_raw() {
        // 8x2: bitmap is two bytes, sent without length or compression.
        let mut pixels = [1u32; 16];
        pixels[3] = 2;
        let (out, _) = encode_one(&pixels, 8, 2, TightEncoderConfig::default());
        let body = &out[12..];
        assert_eq!(body[0], 0x50);
        assert_eq!(body[1], TIGHT_FILTER_PALETTE);
        assert_eq!(body[2], 1);
        assert_eq!(&body[3..6], &[0, 0, 1]);
        assert_eq!(&body[6..9], &[0, 0, 2]);
        assert_eq!(&body[9..], &[0b0001_0000, 0]);
    }

    #[test]
    fn test_reset_bits_ride_on_next_record() {
        let pixels = vec![0x0000_00FF; 16];
        let fb = FramebufferView::new(&pixels, 4, 4, 4).unwrap();
        let mut encoder = TightEncoder::default();
        encoder.request_reset(0x05);
        let mut out = BytesMut::new();
        encoder.encode(&fb, Rect::new(0, 0, 4, 4), &mut out).unwrap();
        assert_eq!(out[12], 0x85);

        out.clear();
        encoder.encode(&fb, Rect::new(0, 0, 4, 4), &mut out).unwrap();
        assert_eq!(out[12], 0x80);

        encoder.reset_all();
        out.clear();
        encoder.encode(&fb, Rect::new(0, 0, 4, 4), &mut out).unwrap();
        assert_eq!(out[12], 0x8F);
    }

    #[test]
    fn test_empty_and_out_of_bounds() {
        let pixels = vec![0u32; 16];
        let fb = FramebufferView::new(&pixels, 4, 4, 4).unwrap();
        let mut encoder = TightEncoder::default();
        let mut out = BytesMut::new();
        assert_eq!(encoder.encode(&fb, Rect::new(2, 2, 0, 0), &mut out).unwrap(), 0);
        assert!(out.is_empty());
        assert!(matches!(
            encoder.encode(&fb, Rect::new(2, 2, 3, 1), &mut out),
            Err(TightError::Bounds { .. })
        ));
    }

    #[test]
    fn test_level_clamp_and_pixel_format() {
        let mut encoder = TightEncoder::default();
        encoder.configure(12, 640, 480);
        assert_eq!(encoder.config().compress_level, 9);
        assert_eq!(encoder.profile(), CompressionProfile::for_level(9));

        let mut bad = PixelFormat::rgb888();
        bad.true_colour_flag = 0;
        assert!(encoder.set_pixel_format(bad).is_err());
        assert!(encoder.set_pixel_format(PixelFormat::bgr233()).is_ok());
    }

    #[test]
    fn test_update_with_known_count() {
        let pixels = vec![0x0012_3456; 32 * 32];
        let fb = FramebufferView::new(&pixels, 32, 32, 32).unwrap();
        let mut encoder = TightEncoder::default();
        let mut out = BytesMut::new();
        let rects = [Rect::new(0, 0, 16, 16), Rect::new(16, 16, 16, 16)];
        let n = encoder.encode_update(&fb, &rects, &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&out[..4], &[0, 0, 0, 2]);
        assert_eq!(out.len(), 4 + 2 * 16);
        assert_eq!(encoder.stats().fill_records, 2);
    }

    #[test]
    fn test_update_with_last_rect() {
        let pixels = vec![0x0012_3456; 64 * 64];
        let fb = FramebufferView::new(&pixels, 64, 64, 64).unwrap();
        let mut encoder = TightEncoder::default();
        let mut out = BytesMut::new();
        encoder
            .encode_update(&fb, &[Rect::new(0, 0, 64, 64)], &mut out)
            .unwrap();
        assert_eq!(&out[..4], &[0, 0, 0xFF, 0xFF]);
        let tail = &out[out.len() - 12..];
        assert_eq!(&tail[8..], &(-224i32).to_be_bytes());
    }
}
