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

//! Streams a few framebuffer updates through an in-memory pipe.
//!
//! The server half writes complete `FramebufferUpdate` messages while the
//! client half decodes them as bytes arrive.
//!
//! Usage:
//!   cargo run --example async_pipe

use std::error::Error;
use tightcodec::io::{read_update, write_update};
use tightcodec::{FramebufferView, Rect, TightDecoder, TightEncoder};

const WIDTH: u16 = 320;
const HEIGHT: u16 = 240;

fn frame(n: u32) -> Vec<u32> {
    let (w, h) = (u32::from(WIDTH), u32::from(HEIGHT));
    (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if (x / 32 + y / 32 + n) % 2 == 0 {
                0x0030_3060
            } else {
                ((x * 255 / w) << 16) | ((y * 255 / h) << 8) | (n * 40 % 256)
            }
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logging
    env_logger::init();

    let (mut server, mut client) = tokio::io::duplex(1024);
    let frames: Vec<Vec<u32>> = (0..3).map(frame).collect();
    let expected = frames.clone();

    let writer = tokio::spawn(async move {
        let mut encoder = TightEncoder::default();
        encoder.configure(6, WIDTH, HEIGHT);
        for pixels in &frames {
            let fb = FramebufferView::new(pixels, WIDTH, HEIGHT, usize::from(WIDTH))?;
            let rects = [
                Rect::new(0, 0, WIDTH, HEIGHT / 2),
                Rect::new(0, HEIGHT / 2, WIDTH, HEIGHT / 2),
            ];
            write_update(&mut server, &mut encoder, &fb, &rects).await?;
        }
        println!("server: {}", encoder.stats());
        Ok::<_, tightcodec::TightError>(())
    });

    let mut screen = vec![0u32; usize::from(WIDTH) * usize::from(HEIGHT)];
    let mut decoder = TightDecoder::new();
    decoder.bind_framebuffer(&mut screen, WIDTH, HEIGHT, usize::from(WIDTH))?;
    for (n, pixels) in expected.iter().enumerate() {
        let rects = read_update(&mut client, &mut decoder).await?;
        let width = usize::from(WIDTH);
        let matches = decoder.framebuffer().is_some_and(|fb| {
            pixels
                .chunks_exact(width)
                .enumerate()
                .all(|(y, row)| fb.row(0, y, width) == row)
        });
        println!("client: frame {n} with {rects} rectangles, exact: {matches}");
    }
    println!("client: {}", decoder.stats());

    writer.await??;
    Ok(())
}
