//! Core domain types for the dexfeed pipeline.
//!
//! This crate provides the types passed between the pipeline stages:
//! - `Frame`: a received websocket message (text, binary or a sequence)
//! - `FeedPayload`: the first qualifying frame of a capture
//! - `ExtractedToken`, `TokenKind`: classified identifiers
//! - `CandidateList`: the capped, ordered identifier list handed to enrichment

pub mod error;
pub mod frame;
pub mod token;

pub use error::{CoreError, Result};
pub use frame::{FeedPayload, Frame, PAIRS_MARKER};
pub use token::{CandidateList, ExtractedToken, TokenKind, MAX_CANDIDATES};
