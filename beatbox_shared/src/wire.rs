//! Line-framed wire codec shared by every peer.
//!
//! A frame is the bincode encoding of [`Frame`], base64 encoded and written
//! as one `\n` terminated line. A shared pattern travels as two consecutive
//! frames on one connection: a [`Frame::Label`] followed by a
//! [`Frame::Pattern`]. Nothing in the bytes ties the two together, so the
//! relay must keep each sender's frames in order and must not interleave
//! another sender's frames between them.

use std::io::{self, BufRead, Read, Write};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on one encoded line, newline excluded
pub const MAX_LINE_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Display label chosen by the sender
    Label(String),
    /// Flattened pattern grid, row-major
    Pattern(Vec<bool>),
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("frame is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("frame could not be decoded: {0}")]
    Format(#[from] bincode::Error),
    #[error("frame exceeds {limit} bytes")]
    TooLong { limit: usize },
}

impl WireError {
    /// I/O failures mean the connection itself is gone. Everything else
    /// affected one line only and the stream is still in sync.
    pub fn is_transport(&self) -> bool {
        matches!(self, WireError::Io(_))
    }
}

pub fn encode_frame(frame: &Frame) -> Result<String, WireError> {
    let serialized = bincode::serialize(frame)?;
    Ok(BASE64.encode(serialized))
}

pub fn decode_frame(line: &[u8]) -> Result<Frame, WireError> {
    let decoded = BASE64.decode(line)?;
    Ok(bincode::deserialize(&decoded)?)
}

/// Writes one frame. The caller flushes once the whole message is out.
pub fn write_frame<W: Write>(writer: &mut W, frame: &Frame) -> Result<(), WireError> {
    let encoded = encode_frame(frame)?;
    writeln!(writer, "{}", encoded)?;
    Ok(())
}

/// Reads the next frame, skipping blank lines.
///
/// Returns `Ok(None)` on a clean end of stream. An oversized line is
/// consumed up to its newline before `TooLong` is returned, so the next call
/// starts on a frame boundary.
pub fn read_frame<R: BufRead>(reader: &mut R) -> Result<Option<Frame>, WireError> {
    let mut line = Vec::new();
    loop {
        line.clear();
        let read = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }

        let terminated = line.last() == Some(&b'\n');
        if !terminated && line.len() > MAX_LINE_LEN {
            reader.skip_until(b'\n')?;
            return Err(WireError::TooLong {
                limit: MAX_LINE_LEN,
            });
        }

        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        return decode_frame(trimmed).map(Some);
    }
}
