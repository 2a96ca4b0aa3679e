//! Jurisdiction resolver.
//!
//! A jurisdiction matches when every location predicate it sets equals the
//! corresponding location field; unset predicates are wildcards. Matches are
//! ranked by priority, then specificity, then id.

use tracing::debug;

use super::types::TaxJurisdiction;
use crate::core::*;

/// Matching jurisdictions, best ranked first.
pub fn resolve_jurisdictions<'a>(
    jurisdictions: &'a [TaxJurisdiction],
    location: &LocationDescriptor,
) -> Vec<&'a TaxJurisdiction> {
    let mut matched: Vec<&TaxJurisdiction> = jurisdictions
        .iter()
        .filter(|j| j.is_active && matches_location(j, location))
        .collect();
    matched.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.specificity().cmp(&a.specificity()))
            .then(a.id.cmp(&b.id))
    });
    debug!(
        matched = ?matched.iter().map(|j| j.id).collect::<Vec<_>>(),
        "resolved tax jurisdictions"
    );
    matched
}

/// Whether every predicate the jurisdiction sets holds for `location`.
pub fn matches_location(jurisdiction: &TaxJurisdiction, location: &LocationDescriptor) -> bool {
    field_matches(&jurisdiction.country_code, &location.country_code, codes_equal)
        && field_matches(&jurisdiction.state_code, &location.state_code, codes_equal)
        && field_matches(&jurisdiction.city_name, &location.city_name, codes_equal)
        && field_matches(&jurisdiction.postal_code, &location.postal_code, postal_equal)
}

fn field_matches(
    predicate: &Option<String>,
    value: &Option<String>,
    eq: fn(&str, &str) -> bool,
) -> bool {
    match (predicate, value) {
        (None, _) => true,
        (Some(p), Some(v)) => eq(p, v),
        (Some(_), None) => false,
    }
}

fn codes_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn postal_equal(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}
