//! Received frame and captured payload types.

use crate::error::{CoreError, Result};
use std::borrow::Cow;

/// Substring that marks a frame as carrying pair data.
pub const PAIRS_MARKER: &str = "pairs";

/// A message received from the feed.
///
/// Websocket clients hand back either text or binary data. Some client paths
/// deliver a batch of messages at once, which is kept as a `Sequence` until
/// it is normalized with [`Frame::into_first`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Sequence(Vec<Frame>),
}

impl Frame {
    /// Whether the frame carries no data at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Frame::Text(text) => text.is_empty(),
            Frame::Binary(bytes) => bytes.is_empty(),
            Frame::Sequence(frames) => frames.is_empty(),
        }
    }

    /// Collapse a sequence to its first element. Scalars are returned as is.
    pub fn into_first(self) -> Result<Frame> {
        match self {
            Frame::Sequence(frames) => frames
                .into_iter()
                .next()
                .ok_or(CoreError::EmptySequence),
            other => Ok(other),
        }
    }

    /// Text view of the frame. Undecodable byte sequences are dropped.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            Frame::Text(text) => Cow::Borrowed(text.as_str()),
            Frame::Binary(bytes) => decode_ignoring_invalid(bytes),
            Frame::Sequence(frames) => Cow::Owned(
                frames
                    .iter()
                    .map(|f| f.text().into_owned())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
        }
    }

    /// Whether the text view of the frame contains `marker`.
    pub fn contains_marker(&self, marker: &str) -> bool {
        self.text().contains(marker)
    }

    /// Size of the frame data in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
            Frame::Sequence(frames) => frames.iter().map(Frame::len).sum(),
        }
    }
}

/// The first qualifying frame of a capture run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPayload {
    frame: Frame,
}

impl FeedPayload {
    pub fn new(frame: Frame) -> Self {
        Self { frame }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Payload as text, dropping undecodable byte sequences.
    pub fn text(&self) -> Cow<'_, str> {
        self.frame.text()
    }

    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }
}

impl From<Frame> for FeedPayload {
    fn from(frame: Frame) -> Self {
        Self::new(frame)
    }
}

/// Decode UTF-8, skipping invalid sequences instead of replacing them.
///
/// Surrounding printable runs stay adjacent, which keeps long identifiers
/// intact when a single stray byte sits inside them.
pub fn decode_ignoring_invalid(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let mut out = String::with_capacity(bytes.len());
            let mut rest = bytes;
            loop {
                match std::str::from_utf8(rest) {
                    Ok(text) => {
                        out.push_str(text);
                        break;
                    }
                    Err(e) => {
                        let valid = e.valid_up_to();
                        // Safe: the prefix was just validated.
                        out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                        match e.error_len() {
                            Some(skip) => rest = &rest[valid + skip..],
                            None => break,
                        }
                    }
                }
            }
            Cow::Owned(out)
        }
    }
}
