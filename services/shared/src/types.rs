/// Type-safe wrappers for promo-code primitives
///
/// These types enforce normalization and shape limits at construction time so
/// the engine and the stores only ever see codes in their canonical form.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Promo code is empty")]
    EmptyCode,

    #[error("Promo code too long: {length} chars (max {max})")]
    CodeTooLong { length: usize, max: usize },

    #[error("Code length out of range: {length} (min: {min}, max: {max})")]
    CodeLengthOutOfRange { length: usize, min: usize, max: usize },

    #[error("Invalid prefix character: {0:?}")]
    InvalidPrefixCharacter(char),

    #[error("Cannot draw {requested} distinct codes from {available} possible bodies")]
    CodeSpaceTooSmall { requested: usize, available: usize },
}

/// Canonical form of a promo code: trimmed and uppercased
///
/// Every lookup and every insert goes through this type, which is what makes
/// `" stab7kq2 "` and `"STAB7KQ2"` the same code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromoCodeValue(String);

impl PromoCodeValue {
    /// Normalize raw client input
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        let length = normalized.chars().count();
        if length > MAX_STORED_CODE_LENGTH {
            return Err(ValidationError::CodeTooLong {
                length,
                max: MAX_STORED_CODE_LENGTH,
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<&str> for PromoCodeValue {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::fmt::Display for PromoCodeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Prefix prepended to generated code bodies
///
/// Stored uppercased so generated codes are already canonical. Only ASCII
/// letters, digits, `-` and `_` are accepted; an empty prefix is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodePrefix(String);

impl CodePrefix {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let normalized = raw.trim().to_uppercase();

        if let Some(bad) = normalized
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ValidationError::InvalidPrefixCharacter(bad));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Number of random characters after the prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLength(usize);

impl CodeLength {
    pub fn new(length: usize) -> Result<Self, ValidationError> {
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&length) {
            return Err(ValidationError::CodeLengthOutOfRange {
                length,
                min: MIN_CODE_LENGTH,
                max: MAX_CODE_LENGTH,
            });
        }
        Ok(Self(length))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for CodeLength {
    fn default() -> Self {
        Self(DEFAULT_CODE_LENGTH)
    }
}

impl TryFrom<usize> for CodeLength {
    type Error = ValidationError;

    fn try_from(length: usize) -> Result<Self, Self::Error> {
        Self::new(length)
    }
}
