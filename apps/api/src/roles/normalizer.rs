//! Role Normalizer: maps free-text role strings onto the closed taxonomy.
//!
//! Pure, total and deterministic: no I/O, no errors. Anything that cannot be placed in
//! exactly one category becomes `NormalizedRole::Unrecognized`.

use std::fmt;

use serde::{Serialize, Serializer};

use super::taxonomy::RoleTaxonomy;

pub const UNRECOGNIZED: &str = "Unrecognized";

/// A value from the closed role taxonomy, or the explicit sentinel for garbage input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NormalizedRole {
    Category(String),
    Unrecognized,
}

impl NormalizedRole {
    pub fn as_str(&self) -> &str {
        match self {
            NormalizedRole::Category(name) => name,
            NormalizedRole::Unrecognized => UNRECOGNIZED,
        }
    }

    /// Role compatibility: both sides recognized and equal.
    /// `Unrecognized` never matches anything, itself included.
    pub fn is_compatible_with(&self, other: &NormalizedRole) -> bool {
        match (self, other) {
            (NormalizedRole::Category(a), NormalizedRole::Category(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for NormalizedRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NormalizedRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// How a raw role string was resolved. Returned by `explain` for the taxonomy endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RoleResolution {
    pub input: String,
    pub normalized: NormalizedRole,
    /// The synonym (normalized form) that decided the category, if any.
    pub matched_synonym: Option<String>,
    /// Non-empty when the input names several categories at once.
    pub ambiguous_between: Vec<String>,
}

/// Lowercases, turns punctuation into spaces and collapses whitespace.
/// `" D.N. "` → `"d n"`, `"Co-ordinator"` → `"co ordinator"`.
pub fn normalize_text(raw: &str) -> String {
    let mut mapped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_alphanumeric() {
            mapped.extend(c.to_lowercase());
        } else {
            mapped.push(' ');
        }
    }
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes a free-text role into the taxonomy.
pub fn normalize(taxonomy: &RoleTaxonomy, raw_role: &str) -> NormalizedRole {
    explain(taxonomy, raw_role).normalized
}

/// Two raw roles are compatible iff they normalize to the same recognized category.
#[cfg(test)]
pub fn roles_match(taxonomy: &RoleTaxonomy, a: &str, b: &str) -> bool {
    normalize(taxonomy, a).is_compatible_with(&normalize(taxonomy, b))
}

/// Full resolution, including which synonym matched and any ambiguity.
///
/// 1. Exact lookup of the whole normalized string.
/// 2. Otherwise, whole-word phrase search: every synonym occurrence is a span, longer
///    spans claim their words first, overlapping shorter spans are discarded. Exactly
///    one surviving category wins; zero or several resolve to `Unrecognized`.
pub fn explain(taxonomy: &RoleTaxonomy, raw_role: &str) -> RoleResolution {
    let text = normalize_text(raw_role);
    let unrecognized = |ambiguous_between: Vec<String>| RoleResolution {
        input: raw_role.to_string(),
        normalized: NormalizedRole::Unrecognized,
        matched_synonym: None,
        ambiguous_between,
    };

    if text.is_empty() {
        return unrecognized(vec![]);
    }

    if let Some(position) = taxonomy.lookup(&text) {
        return RoleResolution {
            input: raw_role.to_string(),
            normalized: NormalizedRole::Category(taxonomy.category_name(position).to_string()),
            matched_synonym: Some(text),
            ambiguous_between: vec![],
        };
    }

    let words: Vec<&str> = text.split(' ').collect();
    let mut spans: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, category)
    let window = taxonomy.max_phrase_words().min(words.len());
    for len in (1..=window).rev() {
        for start in 0..=(words.len() - len) {
            let phrase = words[start..start + len].join(" ");
            if let Some(position) = taxonomy.lookup(&phrase) {
                spans.push((start, start + len, position));
            }
        }
    }

    // Spans were pushed longest first; keep those that do not overlap a kept span.
    let mut claimed = vec![false; words.len()];
    let mut kept: Vec<(usize, usize, usize)> = Vec::new();
    for (start, end, position) in spans {
        if claimed[start..end].iter().any(|c| *c) {
            continue;
        }
        claimed[start..end].iter_mut().for_each(|c| *c = true);
        kept.push((start, end, position));
    }

    let mut positions: Vec<usize> = kept.iter().map(|(_, _, p)| *p).collect();
    positions.sort_unstable();
    positions.dedup();

    match positions.as_slice() {
        [] => unrecognized(vec![]),
        [position] => {
            let matched = kept
                .iter()
                .find(|(_, _, p)| p == position)
                .map(|(start, end, _)| words[*start..*end].join(" "));
            RoleResolution {
                input: raw_role.to_string(),
                normalized: NormalizedRole::Category(
                    taxonomy.category_name(*position).to_string(),
                ),
                matched_synonym: matched,
                ambiguous_between: vec![],
            }
        }
        several => unrecognized(
            several
                .iter()
                .map(|p| taxonomy.category_name(*p).to_string())
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> RoleTaxonomy {
        RoleTaxonomy::default()
    }

    fn category(name: &str) -> NormalizedRole {
        NormalizedRole::Category(name.to_string())
    }

    #[test]
    fn test_normalize_text_strips_punctuation_and_case() {
        assert_eq!(normalize_text("  Dental   NURSE "), "dental nurse");
        assert_eq!(normalize_text("Treatment Co-ordinator"), "treatment co ordinator");
        assert_eq!(normalize_text("D.N."), "d n");
        assert_eq!(normalize_text("   "), "");
    }

    #[test]
    fn test_normalize_text_lowercases_non_ascii() {
        assert_eq!(normalize_text("ZAHNÄRZTIN"), "zahnärztin");
        assert_eq!(normalize_text("Técnico  DENTAL"), "técnico dental");
    }

    #[test]
    fn test_accented_synonyms_match_case_insensitively() {
        let rows: &[(&str, &[&str])] = &[("Dentist", &["Zahnärztin"])];
        let t = RoleTaxonomy::new("custom-2", rows).unwrap();
        assert_eq!(normalize(&t, "ZAHNÄRZTIN"), category("Dentist"));
    }

    #[test]
    fn test_abbreviation_maps_to_canonical() {
        let t = taxonomy();
        assert_eq!(normalize(&t, "DN"), category("Dental Nurse"));
        assert_eq!(normalize(&t, "tdn"), category("Trainee Dental Nurse"));
        assert_eq!(normalize(&t, "GDP"), category("Dentist"));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let t = taxonomy();
        assert_eq!(normalize(&t, " dn "), normalize(&t, "DN"));
        assert_eq!(normalize(&t, "dental   nurse"), normalize(&t, "Dental Nurse"));
    }

    #[test]
    fn test_idempotent_on_canonical_names() {
        let t = taxonomy();
        for c in &t.categories {
            let once = normalize(&t, &c.name);
            assert_eq!(once, category(&c.name));
            assert_eq!(normalize(&t, once.as_str()), once);
        }
    }

    #[test]
    fn test_unrecognized_is_total() {
        let t = taxonomy();
        assert_eq!(normalize(&t, ""), NormalizedRole::Unrecognized);
        assert_eq!(normalize(&t, "astronaut"), NormalizedRole::Unrecognized);
        assert_eq!(normalize(&t, "!!!"), NormalizedRole::Unrecognized);
    }

    #[test]
    fn test_phrase_search_finds_role_inside_longer_text() {
        let t = taxonomy();
        assert_eq!(
            normalize(&t, "Experienced Dental Nurse (GDC registered)"),
            category("Dental Nurse")
        );
        assert_eq!(normalize(&t, "Senior DN"), category("Dental Nurse"));
    }

    #[test]
    fn test_longer_phrase_wins_over_contained_synonym() {
        let t = taxonomy();
        assert_eq!(
            normalize(&t, "Part-time trainee dental nurse"),
            category("Trainee Dental Nurse")
        );
        assert_eq!(
            normalize(&t, "Hygienist / Therapist"),
            category("Dental Therapist")
        );
    }

    #[test]
    fn test_two_distinct_roles_are_ambiguous() {
        let t = taxonomy();
        let resolution = explain(&t, "Dental Nurse / Receptionist");
        assert_eq!(resolution.normalized, NormalizedRole::Unrecognized);
        assert_eq!(
            resolution.ambiguous_between,
            vec!["Dental Nurse".to_string(), "Receptionist".to_string()]
        );
    }

    #[test]
    fn test_explain_reports_matched_synonym() {
        let t = taxonomy();
        let resolution = explain(&t, "Senior DN");
        assert_eq!(resolution.matched_synonym.as_deref(), Some("dn"));
        assert!(resolution.ambiguous_between.is_empty());
    }

    #[test]
    fn test_unrecognized_never_compatible() {
        let unknown = NormalizedRole::Unrecognized;
        assert!(!unknown.is_compatible_with(&NormalizedRole::Unrecognized));
        assert!(!unknown.is_compatible_with(&category("Dentist")));
        assert!(category("Dentist").is_compatible_with(&category("Dentist")));
        assert!(!category("Dentist").is_compatible_with(&category("Dental Nurse")));
    }

    #[test]
    fn test_roles_match_across_synonyms() {
        let t = taxonomy();
        assert!(roles_match(&t, "DN", "Dental Nurse"));
        assert!(!roles_match(&t, "Receptionist", "Dentist"));
        assert!(!roles_match(&t, "astronaut", "astronaut"));
    }

    #[test]
    fn test_injected_taxonomy_is_respected() {
        let rows: &[(&str, &[&str])] = &[("Radiographer", &["rad", "x ray tech"])];
        let t = RoleTaxonomy::new("custom-1", rows).unwrap();
        assert_eq!(normalize(&t, "X-Ray Tech"), category("Radiographer"));
        assert_eq!(normalize(&t, "DN"), NormalizedRole::Unrecognized);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&category("Dentist")).unwrap();
        assert_eq!(json, "\"Dentist\"");
        let json = serde_json::to_string(&NormalizedRole::Unrecognized).unwrap();
        assert_eq!(json, "\"Unrecognized\"");
    }
}
