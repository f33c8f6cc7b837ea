//! Billing period parsing (`YYYY-MM`).

use crate::error::{Result, ServiceError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static PERIOD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("period pattern is valid"));

pub const PERIOD_FORMAT_HINT: &str = "periodo must use the YYYY-MM format (e.g. 2025-01)";

/// A validated billing period. Only the shape is checked, not the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Period(String);

impl Period {
    pub fn parse(raw: &str) -> Result<Self> {
        // `\d` is Unicode aware; the period ends up in SQL so only ASCII digits pass.
        if PERIOD_PATTERN.is_match(raw) && raw.is_ascii() {
            Ok(Self(raw.to_string()))
        } else {
            Err(ServiceError::Validation(format!(
                "{PERIOD_FORMAT_HINT}, got '{raw}'"
            )))
        }
    }

    /// Parses an optional query parameter; `None` means no filter was requested.
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>> {
        raw.map(Self::parse).transpose()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
