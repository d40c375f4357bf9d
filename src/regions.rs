//! Static catalog of supported US states and Canadian provinces.

use crate::model::{RegionKind, RegionRef};

/// US producing states served by the EIA crude production series, plus the
/// federal offshore and PADD aggregates the EIA reports alongside them.
const US_STATES: &[(&str, &str)] = &[
    ("AK", "Alaska"),
    ("AL", "Alabama"),
    ("AR", "Arkansas"),
    ("AZ", "Arizona"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("FL", "Florida"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("MI", "Michigan"),
    ("MS", "Mississippi"),
    ("MT", "Montana"),
    ("ND", "North Dakota"),
    ("NE", "Nebraska"),
    ("NM", "New Mexico"),
    ("NV", "Nevada"),
    ("NY", "New York"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("PA", "Pennsylvania"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VA", "Virginia"),
    ("WV", "West Virginia"),
    ("WY", "Wyoming"),
    ("GOM", "Federal Offshore--Gulf of Mexico"),
    ("PADD1", "PADD 1 (East Coast)"),
];

const CA_PROVINCES: &[(&str, &str)] = &[
    ("AB", "Alberta"),
    ("BC", "British Columbia"),
    ("MB", "Manitoba"),
    ("NB", "New Brunswick"),
    ("NL", "Newfoundland and Labrador"),
    ("NS", "Nova Scotia"),
    ("NT", "Northwest Territories"),
    ("NU", "Nunavut"),
    ("ON", "Ontario"),
    ("PE", "Prince Edward Island"),
    ("QC", "Quebec"),
    ("SK", "Saskatchewan"),
    ("YT", "Yukon"),
];

fn table(kind: RegionKind) -> &'static [(&'static str, &'static str)] {
    match kind {
        RegionKind::UsState => US_STATES,
        RegionKind::CaProvince => CA_PROVINCES,
    }
}

/// Returns every region of `kind` in catalog order.
pub fn list(kind: RegionKind) -> Vec<RegionRef> {
    table(kind)
        .iter()
        .map(|(code, name)| RegionRef {
            kind,
            code: (*code).to_string(),
            name: (*name).to_string(),
        })
        .collect()
}

pub fn list_us_states() -> Vec<RegionRef> {
    list(RegionKind::UsState)
}

pub fn list_ca_provinces() -> Vec<RegionRef> {
    list(RegionKind::CaProvince)
}

/// Resolves a region code (case-insensitive) to its catalog entry.
pub fn resolve(kind: RegionKind, code: &str) -> Option<RegionRef> {
    let code = code.trim();
    table(kind)
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(c, name)| RegionRef {
            kind,
            code: (*c).to_string(),
            name: (*name).to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn codes_are_unique_within_kind() {
        for kind in [RegionKind::UsState, RegionKind::CaProvince] {
            let regions = list(kind);
            let codes: HashSet<_> = regions.iter().map(|r| r.code.as_str()).collect();
            assert_eq!(codes.len(), regions.len(), "duplicate code in {kind}");
        }
    }

    #[test]
    fn catalog_sizes() {
        assert_eq!(list_us_states().len(), 32);
        assert_eq!(list_ca_provinces().len(), 13);
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let tx = resolve(RegionKind::UsState, "tx");
        assert_eq!(tx.as_ref().map(|r| r.name.as_str()), Some("Texas"));
        assert_eq!(tx.as_ref().map(|r| r.code.as_str()), Some("TX"));
    }

    #[test]
    fn resolve_respects_kind() {
        // "AB" is a province, not a state
        assert!(resolve(RegionKind::UsState, "AB").is_none());
        assert!(resolve(RegionKind::CaProvince, "AB").is_some());
    }
}
