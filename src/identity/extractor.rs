//! Identity extraction from scanned payloads
//!
//! A payload is scanned with several pattern families, each producing
//! candidate substrings. Candidates are ordered by family priority (from the
//! `ExtractionPolicy`), then by position in the text, deduplicated, and the
//! first whose checksum holds is returned. There is no unchecked fallback:
//! if nothing validates the result is `None`.
//!
//! When the whole payload is an http(s) URL (newer ID cards encode a
//! verification link), its `RUN`/`RUT` query parameters are tried before any
//! free-text pattern.

use crate::identity::checksum;
use crate::identity::types::IdentityNumber;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static EXPLICIT_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,3}(?:\.\d{3}){1,2}|\d{5,8})\s?-\s?[0-9Kk]\b")
        .expect("explicit separator pattern is valid")
});

static LABELED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:RUN|RUT|R\.U\.[NT]\.?)\s*(?:N[°ºo]\.?\s*)?[:=#]?\s*(?P<rut>(?:\d{1,3}(?:\.\d{3}){1,2}|\d{5,8})\s?-?\s?[0-9K])\b",
    )
    .expect("labeled pattern is valid")
});

static URL_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[?&](?:run|rut)=(?P<rut>[0-9.kK-]{2,14})")
        .expect("url parameter pattern is valid")
});

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[Kk]?").expect("digit run pattern is valid"));

static PUNCTUATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}[.\s]\d{3}[.\s]\d{3}[.\s]?[0-9Kk]\b")
        .expect("punctuated pattern is valid")
});

/// Query parameter names carrying the identity number in card verification URLs
const URL_KEYS: [&str; 2] = ["run", "rut"];

/// Pattern families, in the order they are tried by default
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternFamily {
    /// Body and check character joined by a hyphen: `12.345.678-5`, `12345678-5`
    ExplicitSeparator,
    /// Preceded by a label: `RUN: 12.345.678-5`, `RUT=123456785`
    Labeled,
    /// Embedded as `?RUN=` / `&rut=` in a URL inside the text
    UrlParam,
    /// Unpunctuated digits with a trailing check: `123456785`, `8765432K`
    Contiguous,
    /// Dotted or spaced groups without a hyphen: `12.345.678 5`
    Punctuated,
}

/// Candidate priority used by an `IdentityExtractor`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionPolicy {
    /// Families to try, highest priority first; omitted families are skipped
    pub order: Vec<PatternFamily>,
    /// Inspect query parameters when the whole payload is a URL
    pub url_params_first: bool,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            order: vec![
                PatternFamily::ExplicitSeparator,
                PatternFamily::Labeled,
                PatternFamily::UrlParam,
                PatternFamily::Contiguous,
                PatternFamily::Punctuated,
            ],
            url_params_first: true,
        }
    }
}

impl ExtractionPolicy {
    /// Policy trying the given families in order
    pub fn with_order(order: Vec<PatternFamily>) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }
}

/// A substring that might be an identity number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub family: PatternFamily,
    /// Byte offset in the normalized text
    pub position: usize,
    pub text: String,
}

impl Candidate {
    /// Alphanumeric, uppercased form used for deduplication and validation
    pub fn compact(&self) -> String {
        self.text
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    /// Split into body and trailing check character and verify the checksum
    pub fn to_identity(&self) -> Option<IdentityNumber> {
        let compact = self.compact();
        let check = compact.chars().last()?;
        let body = &compact[..compact.len() - 1];
        checksum::parse(&format!("{}-{}", body, check)).ok()
    }
}

/// A successful extraction and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedIdentity {
    pub identity: IdentityNumber,
    /// `None` when the number came from the query string of a URL payload
    pub family: Option<PatternFamily>,
    pub position: usize,
}

/// Finds the checksum-valid identity number in a scanned payload
#[derive(Debug, Clone, Default)]
pub struct IdentityExtractor {
    policy: ExtractionPolicy,
}

impl IdentityExtractor {
    pub fn new(policy: ExtractionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ExtractionPolicy {
        &self.policy
    }

    /// First checksum-valid identity number in `text`
    pub fn extract(&self, text: &str) -> Option<IdentityNumber> {
        self.extract_details(text).map(|found| found.identity)
    }

    /// Like `extract`, also reporting the family and position of the match
    pub fn extract_details(&self, text: &str) -> Option<ExtractedIdentity> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.policy.url_params_first {
            if let Some(identity) = from_url_query(trimmed) {
                return Some(ExtractedIdentity {
                    identity,
                    family: None,
                    position: 0,
                });
            }
        }

        self.candidates(text).into_iter().find_map(|candidate| {
            candidate.to_identity().map(|identity| ExtractedIdentity {
                identity,
                family: Some(candidate.family),
                position: candidate.position,
            })
        })
    }

    /// All candidates in priority order, deduplicated, before checksum validation
    pub fn candidates(&self, text: &str) -> Vec<Candidate> {
        let normalized = normalize(text);
        let mut seen: Vec<String> = Vec::new();
        let mut candidates = Vec::new();

        for family in &self.policy.order {
            for candidate in family_candidates(*family, &normalized) {
                let key = candidate.compact();
                if !seen.contains(&key) {
                    seen.push(key);
                    candidates.push(candidate);
                }
            }
        }

        candidates
    }
}

/// Replace control characters and non-breaking spaces, collapse whitespace
pub fn normalize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() || c == '\u{00A0}' {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn family_candidates(family: PatternFamily, text: &str) -> Vec<Candidate> {
    let candidate = |position: usize, matched: &str| Candidate {
        family,
        position,
        text: matched.to_string(),
    };

    match family {
        PatternFamily::ExplicitSeparator => EXPLICIT_SEPARATOR
            .find_iter(text)
            .map(|m| candidate(m.start(), m.as_str()))
            .collect(),
        PatternFamily::Labeled => LABELED
            .captures_iter(text)
            .filter_map(|caps| caps.name("rut"))
            .map(|m| candidate(m.start(), m.as_str()))
            .collect(),
        PatternFamily::UrlParam => URL_PARAM
            .captures_iter(text)
            .filter_map(|caps| caps.name("rut"))
            .map(|m| candidate(m.start(), m.as_str()))
            .collect(),
        PatternFamily::Contiguous => DIGIT_RUN
            .find_iter(text)
            .flat_map(|m| {
                contiguous_windows(m.as_str())
                    .into_iter()
                    .map(move |window| (m.start(), window))
            })
            .map(|(position, window)| candidate(position, window))
            .collect(),
        PatternFamily::Punctuated => PUNCTUATED
            .find_iter(text)
            .map(|m| candidate(m.start(), m.as_str()))
            .collect(),
    }
}

// A maximal digit run (optionally ending in K) may hold body + check with no
// separator. Older PDF417 cards start with a fixed-width RUN field glued to
// the next field, so long runs also yield their 9- and 8-character prefixes.
fn contiguous_windows(run: &str) -> Vec<&str> {
    if let Some(digits) = run.strip_suffix(|c: char| c == 'K' || c == 'k') {
        return if (7..=8).contains(&digits.len()) {
            vec![run]
        } else {
            Vec::new()
        };
    }

    match run.len() {
        8 | 9 => vec![run],
        n if n > 9 => vec![&run[..9], &run[..8]],
        _ => Vec::new(),
    }
}

fn from_url_query(text: &str) -> Option<IdentityNumber> {
    let url = reqwest::Url::parse(text).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    url.query_pairs()
        .filter(|(key, _)| URL_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)))
        .find_map(|(_, value)| checksum::parse(&value).ok())
}
