//! Incremental decoder for the response byte stream.
//!
//! Units are JSON objects tagged by `"type"`, either concatenated or separated
//! by newlines. Chunk boundaries carry no meaning: bytes are buffered until a
//! complete unit is available.

use bytes::{Buf, BytesMut};
use serde_json::Value;

use canvas_core::stream::FrameEvent;

use crate::error::DecodeError;

pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

/// Outcome for one unit taken off the buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    Event(FrameEvent),
    Skipped(DecodeError),
}

#[derive(Debug)]
pub struct FrameDecoder {
    buffer: BytesMut,
    max_buffer: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER)
    }
}

impl FrameDecoder {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            max_buffer,
        }
    }

    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Buffer `chunk` and decode every complete unit now available.
    ///
    /// Only fatal conditions are returned as `Err`; broken units come back as
    /// [`Decoded::Skipped`].
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<Decoded>, DecodeError> {
        self.buffer.extend_from_slice(chunk);
        let mut out = Vec::new();

        loop {
            self.skip_whitespace();
            if self.buffer.is_empty() {
                break;
            }

            let (next, consumed) = {
                let mut units =
                    serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
                let next = units.next();
                (next, units.byte_offset())
            };
            match next {
                Some(Ok(value)) => {
                    self.buffer.advance(consumed);
                    out.push(narrow(value));
                }
                Some(Err(e)) if e.is_eof() => break,
                Some(Err(e)) => match self.buffer.iter().position(|b| *b == b'\n') {
                    Some(newline) => {
                        self.buffer.advance(newline + 1);
                        out.push(Decoded::Skipped(DecodeError::Malformed(e.to_string())));
                    }
                    None => break,
                },
                None => break,
            }
        }

        if self.buffer.len() > self.max_buffer {
            let limit = self.max_buffer;
            self.buffer.clear();
            return Err(DecodeError::Overflow { limit });
        }
        Ok(out)
    }

    /// Signal end of stream. Anything still buffered is a truncated unit.
    pub fn finish(&mut self) -> Result<(), DecodeError> {
        self.skip_whitespace();
        let pending = self.buffer.len();
        self.buffer.clear();
        if pending > 0 {
            return Err(DecodeError::Truncated { pending });
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn skip_whitespace(&mut self) {
        let n = self
            .buffer
            .iter()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.buffer.advance(n);
    }
}

/// Narrow a decoded JSON value to a known event, once.
fn narrow(value: Value) -> Decoded {
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned);
    match tag.as_deref() {
        Some("token" | "artifact" | "error") => {}
        Some(other) => return Decoded::Skipped(DecodeError::Unrecognized(other.to_owned())),
        None => return Decoded::Skipped(DecodeError::Unrecognized("<missing type>".into())),
    }
    match serde_json::from_value::<FrameEvent>(value) {
        Ok(FrameEvent::Artifact { artifact }) => match artifact.validate() {
            Ok(()) => Decoded::Event(FrameEvent::Artifact { artifact }),
            Err(violation) => Decoded::Skipped(DecodeError::InvalidArtifact(violation)),
        },
        Ok(event) => Decoded::Event(event),
        Err(e) => Decoded::Skipped(DecodeError::Malformed(e.to_string())),
    }
}
