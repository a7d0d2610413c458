//! Role taxonomy: the closed set of job categories and the synonyms that map onto them.
//!
//! This table is the only piece of matching logic that needs human upkeep. Keep it flat:
//! one canonical category per row, followed by every spelling recruiters actually type.
//! Synonyms are written in their normalized form (lowercase, single spaces, no punctuation).

use std::collections::HashMap;

use serde::Serialize;

use super::normalizer::normalize_text;

/// Bump whenever a row is added, removed or a synonym moves between categories.
pub const DEFAULT_TAXONOMY_VERSION: &str = "2";

/// Ordered (canonical category, synonyms) rows of the default taxonomy.
pub const DEFAULT_ROLE_TABLE: &[(&str, &[&str])] = &[
    (
        "Dentist",
        &[
            "dentist",
            "dentists",
            "associate dentist",
            "gdp",
            "general dental practitioner",
            "dental surgeon",
            "dental practitioner",
            "principal dentist",
            "locum dentist",
            "nhs dentist",
            "private dentist",
        ],
    ),
    (
        "Dental Nurse",
        &[
            "dn",
            "dental nurse",
            "dental nurses",
            "qualified dental nurse",
            "qualified dn",
            "registered dental nurse",
            "nurse",
            "dental nursing",
            "lead dental nurse",
            "head nurse",
            "senior dental nurse",
            "locum dental nurse",
        ],
    ),
    (
        "Trainee Dental Nurse",
        &[
            "tdn",
            "trainee dn",
            "trainee dental nurse",
            "trainee nurse",
            "student dental nurse",
            "apprentice dental nurse",
        ],
    ),
    (
        "Dental Hygienist",
        &["hygienist", "dental hygienist", "hyg", "rdh"],
    ),
    (
        "Dental Therapist",
        &[
            "therapist",
            "dental therapist",
            "hygienist therapist",
            "hygiene therapist",
            "dental hygiene therapist",
            "dt",
        ],
    ),
    (
        "Orthodontic Therapist",
        &["orthodontic therapist", "ortho therapist", "oht"],
    ),
    (
        "Receptionist",
        &[
            "receptionist",
            "dental receptionist",
            "front of house",
            "foh",
            "reception",
            "patient coordinator",
        ],
    ),
    (
        "Practice Manager",
        &[
            "practice manager",
            "pm",
            "dental practice manager",
            "assistant practice manager",
            "operations manager",
            "clinic manager",
        ],
    ),
    (
        "Treatment Coordinator",
        &["treatment coordinator", "tc", "treatment co ordinator"],
    ),
    (
        "Dental Technician",
        &["dental technician", "dental tech", "technician", "lab technician"],
    ),
];

/// One taxonomy row, as exposed to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct RoleCategory {
    pub name: String,
    pub synonyms: Vec<String>,
}

/// An injectable, versioned role taxonomy.
///
/// Built from an ordered list of rows; the synonym index is derived once at construction.
/// Every canonical name is also indexed as its own synonym so that normalizing an
/// already-canonical string is a no-op.
#[derive(Debug, Clone, Serialize)]
pub struct RoleTaxonomy {
    pub version: String,
    pub categories: Vec<RoleCategory>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    /// Longest synonym measured in words; bounds the phrase search window.
    #[serde(skip)]
    max_phrase_words: usize,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("synonym '{synonym}' is claimed by both '{first}' and '{second}'")]
    DuplicateSynonym {
        synonym: String,
        first: String,
        second: String,
    },

    #[error("category name cannot be empty")]
    EmptyCategory,
}

impl RoleTaxonomy {
    /// Builds a taxonomy from ordered rows. A synonym may belong to exactly one category.
    pub fn new(
        version: impl Into<String>,
        rows: &[(&str, &[&str])],
    ) -> Result<Self, TaxonomyError> {
        let mut categories = Vec::with_capacity(rows.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut max_phrase_words = 1;

        for (position, (name, synonyms)) in rows.iter().enumerate() {
            let canonical = name.trim();
            if canonical.is_empty() {
                return Err(TaxonomyError::EmptyCategory);
            }

            let mut keys: Vec<String> = synonyms.iter().map(|s| normalize_text(s)).collect();
            keys.push(normalize_text(canonical));

            let mut stored = Vec::new();
            for key in keys.into_iter().filter(|k| !k.is_empty()) {
                match index.get(&key) {
                    Some(&existing) if existing == position => continue,
                    Some(&existing) => {
                        return Err(TaxonomyError::DuplicateSynonym {
                            synonym: key,
                            first: categories
                                .get(existing)
                                .map(|c: &RoleCategory| c.name.clone())
                                .unwrap_or_default(),
                            second: canonical.to_string(),
                        });
                    }
                    None => {
                        max_phrase_words = max_phrase_words.max(key.split(' ').count());
                        index.insert(key.clone(), position);
                        stored.push(key);
                    }
                }
            }

            categories.push(RoleCategory {
                name: canonical.to_string(),
                synonyms: stored,
            });
        }

        Ok(Self {
            version: version.into(),
            categories,
            index,
            max_phrase_words,
        })
    }

    /// Looks up an already-normalized phrase. Returns the category position.
    pub(crate) fn lookup(&self, normalized_phrase: &str) -> Option<usize> {
        self.index.get(normalized_phrase).copied()
    }

    pub(crate) fn category_name(&self, position: usize) -> &str {
        &self.categories[position].name
    }

    pub(crate) fn max_phrase_words(&self) -> usize {
        self.max_phrase_words
    }
}

impl Default for RoleTaxonomy {
    fn default() -> Self {
        match Self::new(DEFAULT_TAXONOMY_VERSION, DEFAULT_ROLE_TABLE) {
            Ok(taxonomy) => taxonomy,
            // The static table is covered by `test_default_table_is_consistent`.
            Err(e) => unreachable!("default role table is inconsistent: {e}"),
        }
    }
}
