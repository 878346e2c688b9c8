//! Extracted identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of identifiers kept from a single capture.
pub const MAX_CANDIDATES: usize = 70;

/// Classification of an extracted identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// `0x` followed by at least 40 hex digits.
    EvmAddress,
    /// Identifier ending in the `pump` suffix.
    PumpSuffixed,
    /// Identifier ending in the `bonk` suffix.
    BonkSuffixed,
    /// Trailing 44 characters of a long blob (base-58 style address).
    Base58Address,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EvmAddress => "evm_address",
            TokenKind::PumpSuffixed => "pump_suffixed",
            TokenKind::BonkSuffixed => "bonk_suffixed",
            TokenKind::Base58Address => "base58_address",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identifier recovered from a feed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedToken {
    pub value: String,
    pub kind: TokenKind,
}

impl ExtractedToken {
    pub fn new(value: impl Into<String>, kind: TokenKind) -> Self {
        Self {
            value: value.into(),
            kind,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ExtractedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordered identifiers from one capture, at most [`MAX_CANDIDATES`] long.
///
/// Order follows encounter order in the payload. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    tokens: Vec<ExtractedToken>,
}

impl CandidateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from tokens, truncating to the cap.
    pub fn from_tokens(mut tokens: Vec<ExtractedToken>) -> Self {
        tokens.truncate(MAX_CANDIDATES);
        Self { tokens }
    }

    /// Append a token. Returns `false` once the list is full.
    pub fn push(&mut self, token: ExtractedToken) -> bool {
        if self.is_full() {
            return false;
        }
        self.tokens.push(token);
        true
    }

    pub fn is_full(&self) -> bool {
        self.tokens.len() >= MAX_CANDIDATES
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractedToken> {
        self.tokens.iter()
    }

    /// Identifier strings in order.
    pub fn values(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.value.clone()).collect()
    }
}

impl IntoIterator for CandidateList {
    type Item = ExtractedToken;
    type IntoIter = std::vec::IntoIter<ExtractedToken>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}
