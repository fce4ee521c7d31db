//! Modulo-11 check character for RUN/RUT numbers
//!
//! The body is weighted right-to-left with 2,3,4,5,6,7 (cycling); the check
//! character is `11 - (sum mod 11)`, written `0` for 11 and `K` for 10.
//! None of these functions panic: bad input maps to `false`, `None`, an
//! unchanged string or an `IdentityError`.

use crate::identity::error::IdentityError;
use crate::identity::types::IdentityNumber;

/// Longest body accepted (numbers currently issued stay below 100 million)
pub const MAX_BODY_DIGITS: usize = 8;

const WEIGHTS: [u32; 6] = [2, 3, 4, 5, 6, 7];

/// Keep only digits and the check letter, uppercased
pub fn clean(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'k' || *c == 'K')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// True iff the cleaned input is `{1-8 digits}{digit|K}`
pub fn has_format(input: &str) -> bool {
    split_cleaned(&clean(input)).is_some()
}

/// Check character for a digit-only body; `None` for an empty or non-numeric body
pub fn compute_check_digit(body: &str) -> Option<char> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let sum: u64 = body
        .bytes()
        .rev()
        .zip(WEIGHTS.iter().cycle())
        .map(|(digit, weight)| u64::from(digit - b'0') * u64::from(*weight))
        .sum();

    match 11 - (sum % 11) {
        11 => Some('0'),
        10 => Some('K'),
        d => char::from_digit(d as u32, 10),
    }
}

/// True iff the input is well-formed and its check character matches the body
pub fn validate(input: &str) -> bool {
    match split_cleaned(&clean(input)) {
        Some((body, check)) => compute_check_digit(body) == Some(check),
        None => false,
    }
}

/// Render as `12.345.678-5`; input of the wrong shape is returned unchanged
///
/// Formatting does not require a matching check character.
pub fn format(input: &str) -> String {
    let cleaned = clean(input);
    match split_cleaned(&cleaned) {
        Some((body, check)) => format!("{}-{}", group_thousands(body), check),
        None => input.to_string(),
    }
}

/// Parse into a checksum-valid `IdentityNumber`
pub fn parse(input: &str) -> Result<IdentityNumber, IdentityError> {
    let cleaned = clean(input);
    if cleaned.is_empty() {
        return Err(IdentityError::Empty);
    }

    let (body, check) = split_cleaned(&cleaned).ok_or_else(|| IdentityError::Malformed {
        input: input.trim().to_string(),
    })?;

    let expected = compute_check_digit(body).ok_or_else(|| IdentityError::Malformed {
        input: input.trim().to_string(),
    })?;
    if expected != check {
        return Err(IdentityError::ChecksumMismatch {
            expected,
            found: check,
        });
    }

    Ok(IdentityNumber::from_parts(body.to_string(), check))
}

// Cleaned input is ASCII, so byte slicing is safe
fn split_cleaned(cleaned: &str) -> Option<(&str, char)> {
    let check = cleaned.chars().last()?;
    let body = &cleaned[..cleaned.len() - 1];
    if body.is_empty() || body.len() > MAX_BODY_DIGITS || !body.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((body, check))
}

fn group_thousands(body: &str) -> String {
    let mut grouped = String::with_capacity(body.len() + body.len() / 3);
    for (i, c) in body.chars().enumerate() {
        if i > 0 && (body.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    grouped
}
