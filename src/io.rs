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

//! Async adapters between the codec and a Tokio transport.
//!
//! The decoder side reads exactly the byte counts the state machine asks for,
//! so a transport that delivers data in arbitrary pieces is handled by
//! `read_exact`. An I/O error in the middle of a rectangle leaves the decoder
//! mid-rectangle; the connection is expected to be dropped.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::decoding::TightDecoder;
use crate::encoding::TightEncoder;
use crate::error::{Result, TightError};
use crate::framebuffer::{FramebufferView, Rect};
use crate::protocol::{
    Rectangle, ENCODING_TIGHT, RECT_HEADER_SIZE, SERVER_MSG_FRAMEBUFFER_UPDATE, UNKNOWN_RECT_COUNT,
};

/// Decodes one Tight rectangle body (no header) from `reader` into the
/// decoder's framebuffer.
///
/// Returns the number of bytes consumed.
///
/// # Errors
///
/// Returns any decoder error, or [`TightError::Io`] if the transport fails
/// or ends early.
pub async fn read_tight_rect<R: AsyncRead + Unpin>(
    reader: &mut R,
    decoder: &mut TightDecoder<'_>,
    rect: Rect,
) -> Result<usize> {
    let mut needed = decoder.begin_rectangle(rect.x, rect.y, rect.w, rect.h)?;
    let mut chunk = Vec::new();
    let mut consumed = 0;

    while needed > 0 {
        chunk.resize(needed, 0);
        reader.read_exact(&mut chunk).await?;
        consumed += needed;
        needed = decoder.continue_decoding(&chunk)?;
    }
    Ok(consumed)
}

/// Reads one rectangle header and, unless it is a `LastRect` marker, the
/// Tight body that follows it.
///
/// # Errors
///
/// Returns [`TightError::Format`] for a rectangle that is not Tight-encoded,
/// plus everything [`read_tight_rect`] can return.
pub async fn read_update_rect<R: AsyncRead + Unpin>(
    reader: &mut R,
    decoder: &mut TightDecoder<'_>,
) -> Result<Rectangle> {
    let mut header = [0u8; RECT_HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let rect = Rectangle::read_header(&header)?;

    if rect.is_last_rect() {
        return Ok(rect);
    }
    if rect.encoding != ENCODING_TIGHT {
        return Err(TightError::Format(format!(
            "unexpected encoding {} for rectangle at ({}, {})",
            rect.encoding, rect.x, rect.y
        )));
    }

    read_tight_rect(
        reader,
        decoder,
        Rect::new(rect.x, rect.y, rect.width, rect.height),
    )
    .await?;
    Ok(rect)
}

/// Reads one complete `FramebufferUpdate` message.
///
/// Handles both an announced rectangle count and the `0xFFFF` count that is
/// terminated by `LastRect`. Returns the number of Tight rectangles decoded.
///
/// # Errors
///
/// Returns [`TightError::Format`] if the message is not a framebuffer
/// update, plus everything [`read_update_rect`] can return.
pub async fn read_update<R: AsyncRead + Unpin>(
    reader: &mut R,
    decoder: &mut TightDecoder<'_>,
) -> Result<usize> {
    let mut header = [0u8; 4];
    reader.read_exact(&mut header).await?;
    if header[0] != SERVER_MSG_FRAMEBUFFER_UPDATE {
        return Err(TightError::Format(format!(
            "expected FramebufferUpdate, got message type {}",
            header[0]
        )));
    }
    let count = u16::from_be_bytes([header[2], header[3]]);

    let mut decoded = 0;
    loop {
        if count != UNKNOWN_RECT_COUNT && decoded == usize::from(count) {
            break;
        }
        let rect = read_update_rect(reader, decoder).await?;
        if rect.is_last_rect() {
            break;
        }
        decoded += 1;
    }

    log::debug!("Tight: read update with {decoded} rectangles, {}", decoder.stats());
    Ok(decoded)
}

/// Encodes `rects` of `fb` as one `FramebufferUpdate` message and writes it
/// to `writer`.
///
/// Returns the number of Tight records sent.
///
/// # Errors
///
/// Returns any encoder error, or [`TightError::Io`] if the write fails.
pub async fn write_update<W: AsyncWrite + Unpin>(
    writer: &mut W,
    encoder: &mut TightEncoder,
    fb: &FramebufferView<'_>,
    rects: &[Rect],
) -> Result<usize> {
    let mut buf = BytesMut::new();
    let records = encoder.encode_update(fb, rects, &mut buf)?;
    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(records)
}
