//! Identifier extraction for the dexfeed pipeline.
//!
//! Recovers blockchain addresses and suffix-tagged token identifiers from
//! the noisy text of a captured feed payload.

pub mod error;
pub mod extractor;

pub use error::{ExtractError, ExtractResult};
pub use extractor::{sanitize, TokenExtractor, MIN_TOKEN_LEN};
