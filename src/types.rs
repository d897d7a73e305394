//! Value types shared by both resolvers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Autonomous System Number
///
/// Always positive. Displays as `AS<n>`, which is also the form the lookup
/// service accepts in queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Asn(u32);

/// Error returned when text or an integer is not a valid ASN
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AsnParseError {
    /// The text is not a decimal number (optionally prefixed with `AS`)
    #[error("invalid ASN: {0:?}")]
    Invalid(String),

    /// ASN zero is reserved and never announced
    #[error("ASN must be positive")]
    Zero,
}

impl Asn {
    /// Create an ASN, rejecting zero
    pub fn new(value: u32) -> Result<Self, AsnParseError> {
        if value == 0 {
            return Err(AsnParseError::Zero);
        }
        Ok(Self(value))
    }

    /// The numeric value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Asn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AS{}", self.0)
    }
}

impl FromStr for Asn {
    type Err = AsnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("AS")
            .or_else(|| trimmed.strip_prefix("as"))
            .or_else(|| trimmed.strip_prefix("As"))
            .unwrap_or(trimmed);

        // u32::from_str accepts a leading '+', the service never sends one
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AsnParseError::Invalid(s.to_string()));
        }

        let value = digits
            .parse::<u32>()
            .map_err(|_| AsnParseError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<u32> for Asn {
    type Error = AsnParseError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Asn> for u32 {
    fn from(asn: Asn) -> Self {
        asn.0
    }
}

/// Organization or AS name as published by the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsName(String);

impl AsName {
    /// Wrap a name, trimming surrounding whitespace
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    /// The name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether no name is known
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AsName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
