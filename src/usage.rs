//! Upstream flight API quota usage.
//!
//! Newer backends answer `GET /api/flights/api-usage` with JSON matching
//! [`ApiUsage`]. Older ones send a sentence such as
//! `"API calls this month: 150 / Max: 2000 (7%)"`. [`UsageResponse`] accepts
//! either and always yields an [`ApiUsage`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Monthly cap assumed when a legacy reply omits it.
pub const DEFAULT_MONTHLY_CAP: u64 = 2000;

/// Quota usage for the current month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUsage {
    pub calls_this_month: u64,
    pub max_calls_per_month: u64,
    /// Whole percent of the cap used.
    pub percent_used: u8,
}

impl ApiUsage {
    /// Build from counts, deriving the percentage.
    #[must_use]
    pub fn new(calls_this_month: u64, max_calls_per_month: u64) -> Self {
        Self {
            calls_this_month,
            max_calls_per_month,
            percent_used: percent(calls_this_month, max_calls_per_month),
        }
    }

    #[must_use]
    pub fn has_quota_remaining(&self) -> bool {
        self.calls_this_month < self.max_calls_per_month
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.max_calls_per_month
            .saturating_sub(self.calls_this_month)
    }
}

fn percent(calls: u64, max: u64) -> u8 {
    if max == 0 {
        return 100;
    }
    let pct = calls.saturating_mul(100) / max;
    u8::try_from(pct.min(100)).unwrap_or(100)
}

/// A usage reply in either wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UsageResponse {
    Structured(ApiUsage),
    Legacy(String),
}

impl UsageResponse {
    /// Classify a raw response body.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_else(|_| Self::Legacy(body.to_string()))
    }

    pub fn into_usage(self) -> Result<ApiUsage> {
        match self {
            Self::Structured(usage) => Ok(usage),
            Self::Legacy(text) => parse_legacy_usage(&text),
        }
    }
}

/// Parse the legacy usage sentence.
///
/// A missing call count reads as 0 and a missing cap as
/// [`DEFAULT_MONTHLY_CAP`]. A stated percentage wins over the computed one.
/// Text carrying none of the three markers is rejected.
pub fn parse_legacy_usage(text: &str) -> Result<ApiUsage> {
    let calls = number_after(text, "API calls this month:");
    let max = number_after(text, "Max:");
    let stated_percent = text
        .rfind('%')
        .and_then(|end| {
            let start = text[..end].rfind('(')? + 1;
            text[start..end].trim().parse::<u64>().ok()
        })
        .map(|p| u8::try_from(p.min(100)).unwrap_or(100));

    if calls.is_none() && max.is_none() && stated_percent.is_none() {
        return Err(Error::UnexpectedResponse(format!(
            "unrecognised API usage reply: {}",
            text.trim()
        )));
    }

    let mut usage = ApiUsage::new(calls.unwrap_or(0), max.unwrap_or(DEFAULT_MONTHLY_CAP));
    if let Some(pct) = stated_percent {
        usage.percent_used = pct;
    }
    Ok(usage)
}

fn number_after(text: &str, marker: &str) -> Option<u64> {
    let rest = &text[text.find(marker)? + marker.len()..];
    let digits: String = rest
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_sentence() {
        let usage = parse_legacy_usage("API calls this month: 150 / Max: 2000 (7%)").unwrap();
        assert_eq!(usage.calls_this_month, 150);
        assert_eq!(usage.max_calls_per_month, 2000);
        assert_eq!(usage.percent_used, 7);
        assert!(usage.has_quota_remaining());
        assert_eq!(usage.remaining(), 1850);
    }

    #[test]
    fn test_legacy_defaults() {
        let usage = parse_legacy_usage("API calls this month: 500").unwrap();
        assert_eq!(usage.max_calls_per_month, DEFAULT_MONTHLY_CAP);
        assert_eq!(usage.percent_used, 25);

        let usage = parse_legacy_usage("Max: 100 (0%)").unwrap();
        assert_eq!(usage.calls_this_month, 0);
    }

    #[test]
    fn test_legacy_garbage_is_rejected() {
        assert!(parse_legacy_usage("service unavailable").is_err());
    }

    #[test]
    fn test_structured_body_wins() {
        let body = r#"{"callsThisMonth":2000,"maxCallsPerMonth":2000,"percentUsed":100}"#;
        let usage = UsageResponse::from_body(body).into_usage().unwrap();
        assert_eq!(usage, ApiUsage::new(2000, 2000));
        assert!(!usage.has_quota_remaining());
    }

    #[test]
    fn test_json_string_body_is_legacy() {
        let body = r#""API calls this month: 10 / Max: 1000 (1%)""#;
        let usage = UsageResponse::from_body(body).into_usage().unwrap();
        assert_eq!(usage.calls_this_month, 10);
        assert_eq!(usage.max_calls_per_month, 1000);
    }
}
