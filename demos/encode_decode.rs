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

//! Encodes a test pattern at every compression level and decodes it again.
//!
//! Usage:
//!   cargo run --example encode_decode

use bytes::BytesMut;
use std::error::Error;
use tightcodec::protocol::{Rectangle, RECT_HEADER_SIZE};
use tightcodec::{FramebufferView, Rect, TightDecoder, TightEncoder, TightEncoderConfig};

const WIDTH: u16 = 800;
const HEIGHT: u16 = 600;

fn test_pattern() -> Vec<u32> {
    let (w, h) = (usize::from(WIDTH), usize::from(HEIGHT));
    let mut pixels = vec![0u32; w * h];
    for y in 0..h {
        for x in 0..w {
            let r = (x * 255 / w) as u32; // R: horizontal gradient
            let g = (y * 255 / h) as u32; // G: vertical gradient
            pixels[y * w + x] = (r << 16) | (g << 8) | 128;
        }
    }
    // A solid window with some two-tone "text" in it
    for y in 100..400 {
        for x in 150..650 {
            pixels[y * w + x] = if y > 150 && y < 200 && (x + y) % 3 == 0 {
                0x0000_0000
            } else {
                0x00EE_EEEE
            };
        }
    }
    pixels
}

fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let pixels = test_pattern();
    let fb = FramebufferView::new(&pixels, WIDTH, HEIGHT, usize::from(WIDTH))?;
    let full = Rect::new(0, 0, WIDTH, HEIGHT);

    for level in 0..=9 {
        let mut encoder = TightEncoder::new(TightEncoderConfig {
            compress_level: level,
            screen_width: WIDTH,
            screen_height: HEIGHT,
            ..TightEncoderConfig::default()
        });
        let mut wire = BytesMut::new();
        let records = encoder.encode(&fb, full, &mut wire)?;

        let mut decoded = vec![0u32; pixels.len()];
        let mut decoder = TightDecoder::new();
        decoder.bind_framebuffer(&mut decoded, WIDTH, HEIGHT, usize::from(WIDTH))?;
        while !wire.is_empty() {
            let header = wire.split_to(RECT_HEADER_SIZE);
            let rect = Rectangle::read_header(&header)?;
            decoder.begin_rectangle(rect.x, rect.y, rect.width, rect.height)?;
            decoder.feed(&mut wire)?;
        }
        let decoder_stats = *decoder.stats();
        drop(decoder);

        println!(
            "level {level}: {records} records, {} (decoded {} records, exact: {})",
            encoder.stats(),
            decoder_stats.records(),
            decoded == pixels
        );
    }

    Ok(())
}
