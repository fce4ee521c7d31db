//! Validation utilities for CLI arguments and configuration values

use std::str::FromStr;

/// Validate a strictly positive millisecond value (dedup window, frame interval)
pub fn validate_positive_millis(value: i64) -> Result<u64, String> {
    match u64::try_from(value) {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate a backend API base URL (http or https only)
pub fn validate_api_url(value: &str) -> Result<String, String> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| format!("Invalid API URL '{}': {}", value, e))?;

    match url.scheme() {
        "http" | "https" => Ok(value.trim_end_matches('/').to_string()),
        other => Err(format!(
            "API URL '{}' must use http or https, not '{}'",
            value, other
        )),
    }
}

/// Parse a list of names into typed values, rejecting duplicates
pub fn parse_unique_list<T>(values: &[String]) -> Result<Vec<T>, String>
where
    T: FromStr + PartialEq,
{
    let mut parsed: Vec<T> = Vec::with_capacity(values.len());
    for raw in values {
        let name = raw.trim();
        let value = T::from_str(name).map_err(|_| format!("Unknown value '{}'", name))?;
        if parsed.contains(&value) {
            return Err(format!("Value '{}' is listed more than once", name));
        }
        parsed.push(value);
    }
    Ok(parsed)
}
