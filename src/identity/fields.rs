//! Best-effort secondary fields from labeled scan payloads
//!
//! Names and birth date are informational only; nothing here affects whether
//! a payload yields a valid identity number.

use crate::identity::extractor::normalize;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

// Each value runs until the next known label (see `trim_at_label`)
static GIVEN_NAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bNOMBRES?\s*[:=]\s*(?P<value>[^:=]+)").expect("names pattern is valid")
});

static SURNAMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAPELLIDOS\s*[:=]\s*(?P<value>[^:=]+)").expect("surnames pattern is valid")
});

static PATERNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAPELLIDO\s+PATERNO\s*[:=]\s*(?P<value>[^:=]+)")
        .expect("paternal surname pattern is valid")
});

static MATERNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bAPELLIDO\s+MATERNO\s*[:=]\s*(?P<value>[^:=]+)")
        .expect("maternal surname pattern is valid")
});

static BIRTH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:FECHA\s+DE\s+NACIMIENTO|NACIMIENTO|F\.\s*NAC\.?|DOB)\s*[:=]?\s*(?P<value>\d{1,4}[./-]\d{1,2}[./-]\d{1,4})",
    )
    .expect("birth date pattern is valid")
});

static NEXT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s(?:RUN|RUT|NOMBRES?|APELLIDOS?|FECHA|NACIMIENTO|F\.\s*NAC|DOB|SEXO|NACIONALIDAD|DOCUMENTO)\b.*$",
    )
    .expect("label boundary pattern is valid")
});

const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Secondary fields found next to the identity number
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_names: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paternal_surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maternal_surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Birth date as printed, kept when it could not be parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date_raw: Option<String>,
}

impl ScannedFields {
    pub fn is_empty(&self) -> bool {
        self.given_names.is_none()
            && self.paternal_surname.is_none()
            && self.maternal_surname.is_none()
            && self.birth_date_raw.is_none()
    }

    /// Given names followed by surnames, or `None` when nothing was found
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [
            self.given_names.as_deref(),
            self.paternal_surname.as_deref(),
            self.maternal_surname.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Pull whatever labeled fields are present in `text`
pub fn extract_fields(text: &str) -> ScannedFields {
    let normalized = normalize(text);
    let mut fields = ScannedFields {
        given_names: labeled_value(&GIVEN_NAMES, &normalized),
        ..ScannedFields::default()
    };

    if let Some(surnames) = labeled_value(&SURNAMES, &normalized) {
        let mut parts = surnames.splitn(2, ' ');
        fields.paternal_surname = parts.next().map(str::to_string);
        fields.maternal_surname = parts.next().map(|s| s.trim().to_string());
    }

    if let Some(paternal) = labeled_value(&PATERNAL, &normalized) {
        fields.paternal_surname = Some(paternal);
    }
    if let Some(maternal) = labeled_value(&MATERNAL, &normalized) {
        fields.maternal_surname = Some(maternal);
    }

    if let Some(raw) = BIRTH_DATE
        .captures(&normalized)
        .and_then(|caps| caps.name("value"))
        .map(|m| m.as_str().to_string())
    {
        fields.birth_date = parse_date(&raw);
        fields.birth_date_raw = Some(raw);
    }

    fields
}

fn labeled_value(pattern: &Regex, text: &str) -> Option<String> {
    let value = pattern.captures(text)?.name("value")?.as_str();
    let value = trim_at_label(value);
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn trim_at_label(value: &str) -> &str {
    let end = NEXT_LABEL.find(value).map_or(value.len(), |m| m.start());
    value[..end].trim()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
