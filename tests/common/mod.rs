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

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use bytes::BytesMut;
use tightcodec::protocol::{Rectangle, RECT_HEADER_SIZE};
use tightcodec::TightDecoder;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

/// Xorshift32, so test images are reproducible without a rand dependency.
pub struct Noise(u32);

impl Noise {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

/// Vertical ramp with small horizontal noise. Smooth enough for the
/// gradient filter at level 9.
pub fn ramp(w: usize, h: usize) -> Vec<u32> {
    let mut noise = Noise::new(0x1234_5678);
    (0..w * h)
        .map(|i| {
            let v = ((i / w) * 2 + (noise.next_u32() % 10) as usize) as u8;
            rgb(v, v.wrapping_add(20), v.wrapping_add(40))
        })
        .collect()
}

/// Every pixel a random 24-bit color.
pub fn random_colors(w: usize, h: usize, seed: u32) -> Vec<u32> {
    let mut noise = Noise::new(seed);
    (0..w * h).map(|_| noise.next_u32() & 0x00FF_FFFF).collect()
}

/// Decodes back-to-back records (12-byte header + Tight body) until `wire`
/// is exhausted or a `LastRect` marker is seen. Returns the record count.
pub fn decode_records(decoder: &mut TightDecoder<'_>, wire: &[u8]) -> usize {
    let mut buf = BytesMut::from(wire);
    let mut records = 0;
    while !buf.is_empty() {
        let header = buf.split_to(RECT_HEADER_SIZE);
        let rect = Rectangle::read_header(&header).unwrap();
        if rect.is_last_rect() {
            break;
        }
        decoder
            .begin_rectangle(rect.x, rect.y, rect.width, rect.height)
            .unwrap();
        assert_eq!(decoder.feed(&mut buf).unwrap(), 0, "record {records} truncated");
        assert!(decoder.is_done());
        records += 1;
    }
    records
}

/// Same as [`decode_records`], but hands the wire over `piece` bytes at a
/// time as a transport would.
pub fn decode_records_chunked(decoder: &mut TightDecoder<'_>, wire: &[u8], piece: usize) -> usize {
    let mut pending = wire.chunks(piece);
    let mut buf = BytesMut::new();
    let mut records = 0;
    loop {
        while buf.len() < RECT_HEADER_SIZE {
            match pending.next() {
                Some(p) => buf.extend_from_slice(p),
                None => {
                    assert!(buf.is_empty(), "trailing partial header");
                    return records;
                }
            }
        }
        let header = buf.split_to(RECT_HEADER_SIZE);
        let rect = Rectangle::read_header(&header).unwrap();
        if rect.is_last_rect() {
            return records;
        }
        decoder
            .begin_rectangle(rect.x, rect.y, rect.width, rect.height)
            .unwrap();
        while decoder.feed(&mut buf).unwrap() > 0 {
            let p = pending.next().expect("wire ended inside a record");
            buf.extend_from_slice(p);
        }
        assert!(decoder.is_done());
        records += 1;
    }
}
