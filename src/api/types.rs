//! API query and error types.

use serde::{Deserialize, Serialize};

use crate::model::{DateRange, RegionKind};

/// `kind` selects the region family; omitted means `US_STATE`.
#[derive(Debug, Deserialize)]
pub struct KindQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub kind: Option<String>,
    pub code: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub kind: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopProducersQuery {
    pub kind: Option<String>,
    pub limit: Option<usize>,
}

/// Body of a 400 response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn parse_kind(raw: Option<&str>) -> Result<RegionKind, String> {
    raw.map_or(Ok(RegionKind::UsState), str::parse)
}

pub fn require_code(raw: Option<&str>) -> Result<&str, String> {
    raw.map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| "`code` is required".to_string())
}

/// Builds the date range, rejecting `start` after `end`.
pub fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, String> {
    let range = DateRange::new(start.map(str::to_string), end.map(str::to_string));
    match (&range.start, &range.end) {
        (Some(s), Some(e)) if s > e => Err(format!("`start` ({s}) must be <= `end` ({e})")),
        _ => Ok(range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults_to_us_states() {
        assert_eq!(parse_kind(None), Ok(RegionKind::UsState));
        assert_eq!(parse_kind(Some("ca_province")), Ok(RegionKind::CaProvince));
        assert!(parse_kind(Some("EU_COUNTRY")).is_err());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(parse_range(Some("2024-01"), Some("2023-01")).is_err());
        assert!(parse_range(Some("2023-01"), None).is_ok());
    }
}
