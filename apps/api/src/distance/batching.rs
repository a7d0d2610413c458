//! Sub-batch planning for the Distance Matrix API.
//!
//! The provider bills per element (origin × destination), so batches are built as full
//! rectangles: origins are grouped by their exact destination set and every element in
//! a batch corresponds to a requested pair. No element is paid for that nobody asked for.

use std::collections::{BTreeMap, BTreeSet};

use crate::commute::postcode::PostcodePair;
use crate::config::DistanceSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_origins: usize,
    pub max_destinations: usize,
    pub max_elements: usize,
}

impl From<&DistanceSettings> for BatchLimits {
    fn from(settings: &DistanceSettings) -> Self {
        Self {
            max_origins: settings.max_origins_per_request.max(1),
            max_destinations: settings.max_destinations_per_request.max(1),
            max_elements: settings.max_elements_per_request.max(1),
        }
    }
}

/// One provider request: every origin paired with every destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub origins: Vec<String>,
    pub destinations: Vec<String>,
}

impl Batch {
    #[cfg(test)]
    pub fn element_count(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }

    pub fn pairs(&self) -> Vec<PostcodePair> {
        self.origins
            .iter()
            .flat_map(|o| self.destinations.iter().map(move |d| PostcodePair::new(o, d)))
            .collect()
    }
}

/// Splits deduplicated pairs into provider-sized batches. Deterministic for a given input set.
pub fn plan_batches<'a, I>(pairs: I, limits: BatchLimits) -> Vec<Batch>
where
    I: IntoIterator<Item = &'a PostcodePair>,
{
    let mut by_origin: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for pair in pairs {
        by_origin
            .entry(pair.origin())
            .or_default()
            .insert(pair.destination());
    }

    // Origins sharing an identical destination set can share rectangles.
    let mut by_destinations: BTreeMap<Vec<&str>, Vec<&str>> = BTreeMap::new();
    for (origin, destinations) in by_origin {
        by_destinations
            .entry(destinations.into_iter().collect())
            .or_default()
            .push(origin);
    }

    let destination_chunk = limits.max_destinations.min(limits.max_elements);
    let mut batches = Vec::new();
    for (destinations, origins) in by_destinations {
        for dest_chunk in destinations.chunks(destination_chunk) {
            let origin_chunk = limits
                .max_origins
                .min(limits.max_elements / dest_chunk.len())
                .max(1);
            for origin_chunk in origins.chunks(origin_chunk) {
                batches.push(Batch {
                    origins: origin_chunk.iter().map(|s| s.to_string()).collect(),
                    destinations: dest_chunk.iter().map(|s| s.to_string()).collect(),
                });
            }
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const GOOGLE_LIMITS: BatchLimits = BatchLimits {
        max_origins: 25,
        max_destinations: 25,
        max_elements: 100,
    };

    fn cross_product(origins: usize, destinations: usize) -> Vec<PostcodePair> {
        let mut pairs = Vec::new();
        for o in 0..origins {
            for d in 0..destinations {
                pairs.push(PostcodePair::new(&format!("O{o}"), &format!("D{d}")));
            }
        }
        pairs
    }

    fn assert_within_limits(batches: &[Batch], limits: BatchLimits) {
        for batch in batches {
            assert!(batch.origins.len() <= limits.max_origins);
            assert!(batch.destinations.len() <= limits.max_destinations);
            assert!(batch.element_count() <= limits.max_elements);
        }
    }

    #[test]
    fn test_small_cross_product_fits_one_batch() {
        let pairs = cross_product(10, 10);
        let batches = plan_batches(&pairs, GOOGLE_LIMITS);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].element_count(), 100);
    }

    #[test]
    fn test_large_cross_product_is_split_without_waste() {
        let pairs = cross_product(30, 30);
        let batches = plan_batches(&pairs, GOOGLE_LIMITS);

        assert_within_limits(&batches, GOOGLE_LIMITS);
        let total: usize = batches.iter().map(Batch::element_count).sum();
        assert_eq!(total, 900);

        let covered: HashSet<PostcodePair> = batches.iter().flat_map(Batch::pairs).collect();
        let expected: HashSet<PostcodePair> = pairs.into_iter().collect();
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_irregular_pairs_only_request_what_was_asked() {
        let pairs = vec![
            PostcodePair::new("A1", "X1"),
            PostcodePair::new("A1", "Y1"),
            PostcodePair::new("B1", "X1"),
        ];
        let batches = plan_batches(&pairs, GOOGLE_LIMITS);

        let total: usize = batches.iter().map(Batch::element_count).sum();
        assert_eq!(total, 3);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn test_many_origins_one_destination_respects_origin_limit() {
        let pairs = cross_product(30, 1);
        let batches = plan_batches(&pairs, GOOGLE_LIMITS);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].origins.len(), 25);
        assert_eq!(batches[1].origins.len(), 5);
    }

    #[test]
    fn test_plan_is_deterministic() {
        let mut pairs = cross_product(7, 13);
        let first = plan_batches(&pairs, GOOGLE_LIMITS);
        pairs.reverse();
        let second = plan_batches(&pairs, GOOGLE_LIMITS);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_plans_nothing() {
        let pairs: Vec<PostcodePair> = vec![];
        assert!(plan_batches(&pairs, GOOGLE_LIMITS).is_empty());
    }
}
