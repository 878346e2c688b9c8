//! Heuristic identifier extraction from raw payload text.
//!
//! The feed's pair frames are a binary encoding where identifiers sit inside
//! long runs of printable characters. Extraction:
//! 1. Decode to text, dropping undecodable bytes
//! 2. Replace everything outside printable ASCII with spaces
//! 3. Keep whitespace-separated tokens of at least [`MIN_TOKEN_LEN`] chars
//! 4. Classify each token (first matching rule wins):
//!    URL noise is skipped, then EVM address, `pump` suffix, `bonk` suffix,
//!    and finally the trailing 44 characters as a base-58 address
//! 5. Keep encounter order, cap at [`MAX_CANDIDATES`]

use crate::error::{ExtractError, ExtractResult};
use dexfeed_core::frame::decode_ignoring_invalid;
use dexfeed_core::{CandidateList, ExtractedToken, FeedPayload, TokenKind, MAX_CANDIDATES};
use regex::Regex;
use tracing::{debug, warn};

/// Shorter tokens are framing noise.
pub const MIN_TOKEN_LEN: usize = 65;

/// Substrings marking a token as a URL rather than an identifier.
const URL_NOISE: [&str; 4] = ["https", "http", "//", ".com"];

/// Length of a base-58 address taken from the end of a token.
const BASE58_TAIL_LEN: usize = 44;

/// Upstream framing sometimes leaves this byte in front of an identifier.
const PADDING_PREFIX: char = 'V';

/// Replace every character outside printable ASCII (32..=126) with a space.
///
/// One character in, one character out, so printable runs keep their
/// positions relative to each other.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { ' ' })
        .collect()
}

/// Pure payload-to-identifiers extractor.
#[derive(Debug, Clone)]
pub struct TokenExtractor {
    evm: Regex,
    pump: Regex,
    bonk: Regex,
    min_token_len: usize,
}

impl TokenExtractor {
    pub fn new() -> ExtractResult<Self> {
        Self::with_min_token_len(MIN_TOKEN_LEN)
    }

    pub fn with_min_token_len(min_token_len: usize) -> ExtractResult<Self> {
        Ok(Self {
            evm: Regex::new(r"0x[0-9a-fA-F]{40,}")?,
            pump: Regex::new(r"(?i).{0,40}pump")?,
            bonk: Regex::new(r"(?i).{0,40}bonk")?,
            min_token_len,
        })
    }

    /// Extract identifiers from a captured payload.
    pub fn extract(&self, payload: &FeedPayload) -> CandidateList {
        self.extract_text(&payload.text())
    }

    /// Extract identifiers from raw bytes.
    pub fn extract_bytes(&self, bytes: &[u8]) -> CandidateList {
        self.extract_text(&decode_ignoring_invalid(bytes))
    }

    /// Extract identifiers from payload text.
    pub fn extract_text(&self, text: &str) -> CandidateList {
        let sanitized = sanitize(text);
        let mut candidates = CandidateList::new();
        let mut long_tokens = 0usize;

        for token in sanitized
            .split_whitespace()
            .filter(|t| t.chars().count() >= self.min_token_len)
        {
            long_tokens += 1;
            match self.classify(token) {
                Ok(Some(extracted)) => {
                    if !candidates.push(extracted) {
                        debug!(max = MAX_CANDIDATES, "Candidate list full");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, token, "Skipping token"),
            }
        }

        debug!(long_tokens, extracted = candidates.len(), "Extraction complete");
        candidates
    }

    /// Classify one sanitized token.
    ///
    /// Returns `Ok(None)` for URL noise.
    pub fn classify(&self, token: &str) -> ExtractResult<Option<ExtractedToken>> {
        if let Some(index) = token.find(|c: char| !(' '..='~').contains(&c)) {
            return Err(ExtractError::Unsanitized { index });
        }

        let lower = token.to_ascii_lowercase();

        if URL_NOISE.iter().any(|noise| lower.contains(noise)) {
            return Ok(None);
        }

        if lower.contains("0x") {
            // Last run wins when a token holds several.
            if let Some(address) = self.evm.find_iter(token).last() {
                return Ok(Some(ExtractedToken::new(
                    address.as_str(),
                    TokenKind::EvmAddress,
                )));
            }
        }

        if lower.contains("pump") {
            if let Some(capture) = self.pump.find(token) {
                // Every leading pad goes here; bonk and the tail drop one.
                return Ok(Some(ExtractedToken::new(
                    capture.as_str().trim_start_matches(PADDING_PREFIX),
                    TokenKind::PumpSuffixed,
                )));
            }
        }

        if lower.contains("bonk") {
            if let Some(capture) = self.bonk.find(token) {
                return Ok(Some(ExtractedToken::new(
                    strip_padding(capture.as_str()),
                    TokenKind::BonkSuffixed,
                )));
            }
        }

        let tail = &token[token.len().saturating_sub(BASE58_TAIL_LEN)..];
        Ok(Some(ExtractedToken::new(
            strip_padding(tail),
            TokenKind::Base58Address,
        )))
    }
}

fn strip_padding(value: &str) -> &str {
    value.strip_prefix(PADDING_PREFIX).unwrap_or(value)
}
