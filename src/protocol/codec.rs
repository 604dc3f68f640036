//! Length-prefixed frame codec.
//!
//! Every message on the wire is the ASCII decimal byte length of its body,
//! a `:` delimiter, then the UTF-8 body itself:
//!
//! ```text
//! 31:[0,1,"WebDriver:GetTitle",{}]
//! ```
//!
//! There are no other delimiters and no padding. A blank header or a zero
//! length carries no message and is skipped.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Header delimiter.
const DELIMITER: u8 = b':';

/// Longest accepted length header (digits of `usize::MAX`).
const MAX_HEADER_LEN: usize = 20;

/// Largest accepted frame body.
pub const MAX_FRAME_LEN: usize = 512 * 1024 * 1024;

// ============================================================================
// Encoding
// ============================================================================

/// Encodes a message body into a frame.
///
/// # Example
///
/// ```
/// use firefox_marionette::protocol::codec::encode;
///
/// assert_eq!(encode("[1,2]"), b"5:[1,2]");
/// ```
#[must_use]
pub fn encode(body: &str) -> Vec<u8> {
    let header = body.len().to_string();
    let mut frame = Vec::with_capacity(header.len() + 1 + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.push(DELIMITER);
    frame.extend_from_slice(body.as_bytes());
    frame
}

// ============================================================================
// FrameReader
// ============================================================================

/// Streaming frame decoder over an async byte source.
///
/// Reads the header byte by byte, then exactly the declared number of body
/// bytes. A short read suspends until more input arrives.
pub struct FrameReader<R> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a byte source.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Reads the next message.
    ///
    /// Returns `Ok(None)` on a clean end of stream between frames.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] on a malformed header, oversized frame,
    ///   truncated frame or a body that is not UTF-8
    /// - [`Error::Io`] on socket failure
    pub async fn read_frame(&mut self) -> Result<Option<String>> {
        loop {
            let Some(header) = self.read_header().await? else {
                return Ok(None);
            };

            let header = header.trim();
            if header.is_empty() {
                trace!("Skipping blank frame header");
                continue;
            }

            let len: usize = header
                .parse()
                .map_err(|_| Error::protocol(format!("Invalid frame header: {header:?}")))?;

            if len == 0 {
                trace!("Skipping empty frame");
                continue;
            }

            if len > MAX_FRAME_LEN {
                return Err(Error::protocol(format!(
                    "Frame too large: {len} bytes (max {MAX_FRAME_LEN})"
                )));
            }

            let mut body = vec![0u8; len];
            self.reader
                .read_exact(&mut body)
                .await
                .map_err(|e| match e.kind() {
                    ErrorKind::UnexpectedEof => {
                        Error::protocol(format!("Stream ended inside a {len} byte frame"))
                    }
                    _ => Error::Io(e),
                })?;

            let text = String::from_utf8(body)
                .map_err(|e| Error::protocol(format!("Frame body is not UTF-8: {e}")))?;

            trace!(len, "Frame decoded");
            return Ok(Some(text));
        }
    }

    /// Reads header bytes up to the delimiter.
    async fn read_header(&mut self) -> Result<Option<String>> {
        let mut header = String::new();

        loop {
            let byte = match self.reader.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    if header.is_empty() {
                        return Ok(None);
                    }
                    return Err(Error::protocol("Stream ended inside a frame header"));
                }
                Err(e) => return Err(Error::Io(e)),
            };

            if byte == DELIMITER {
                return Ok(Some(header));
            }

            if header.len() >= MAX_HEADER_LEN {
                return Err(Error::protocol("Frame header too long"));
            }

            header.push(char::from(byte));
        }
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}

// ============================================================================
// Tests
// ============================================================================
