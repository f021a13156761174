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

//! Error types for the Tight codec.

use std::io;
use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, TightError>;

/// Errors that can occur while encoding or decoding Tight rectangles.
#[derive(Debug, Error)]
pub enum TightError {
    /// I/O error from a byte sink or an async transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed wire data (control byte, filter id, subencoding, lengths).
    #[error("Format error: {0}")]
    Format(String),

    /// Rectangle does not fit inside the framebuffer.
    #[error("Rectangle {w}x{h} at ({x}, {y}) exceeds framebuffer {fb_width}x{fb_height}")]
    Bounds {
        /// X coordinate of the rectangle.
        x: u16,
        /// Y coordinate of the rectangle.
        y: u16,
        /// Width of the rectangle.
        w: u16,
        /// Height of the rectangle.
        h: u16,
        /// Framebuffer width.
        fb_width: u16,
        /// Framebuffer height.
        fb_height: u16,
    },

    /// Zlib stream initialization, deflate or inflate failure.
    #[error("Compression error: {0}")]
    Compression(String),

    /// A declared buffer size cannot be honored.
    #[error("Resource error: {0}")]
    Resource(String),

    /// The API was used out of order (wrong chunk size, no framebuffer bound, ...).
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

impl TightError {
    /// Returns `true` if the owning connection must be torn down.
    ///
    /// Stream state can no longer be trusted after any of these errors, so
    /// only misuse of the API itself is recoverable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TightError::InvalidOperation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(TightError::Format("bad".into()).is_fatal());
        assert!(TightError::Compression("zlib".into()).is_fatal());
        assert!(!TightError::InvalidOperation("oops".into()).is_fatal());
    }

    #[test]
    fn test_bounds_message() {
        let err = TightError::Bounds {
            x: 10,
            y: 20,
            w: 30,
            h: 40,
            fb_width: 32,
            fb_height: 32,
        };
        assert_eq!(
            err.to_string(),
            "Rectangle 30x40 at (10, 20) exceeds framebuffer 32x32"
        );
    }
}
