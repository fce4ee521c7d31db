//! Identity number type

use crate::identity::checksum;
use crate::identity::error::IdentityError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A checksum-valid RUN/RUT number
///
/// Only constructed through `checksum::parse` (or `FromStr`), so the check
/// character always matches the body. Displays as `12345678-5`; serializes as
/// the same string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityNumber {
    body: String,
    check: char,
}

impl IdentityNumber {
    pub(crate) fn from_parts(body: String, check: char) -> Self {
        Self { body, check }
    }

    /// Numeric body without separators
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Check character (`0`-`9` or `K`)
    pub fn check_char(&self) -> char {
        self.check
    }

    /// Human-readable form, `12.345.678-5`
    pub fn formatted(&self) -> String {
        checksum::format(&self.to_string())
    }
}

impl fmt::Display for IdentityNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.body, self.check)
    }
}

impl FromStr for IdentityNumber {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        checksum::parse(s)
    }
}

impl TryFrom<String> for IdentityNumber {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        checksum::parse(&value)
    }
}

impl From<IdentityNumber> for String {
    fn from(value: IdentityNumber) -> Self {
        value.to_string()
    }
}
