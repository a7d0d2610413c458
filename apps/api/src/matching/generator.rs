//! Match Generator: candidate × client pairings ranked by commute time.
//!
//! Flow: pre-filter → cross product → distinct postcode pairs → commute cache →
//!       distance resolver for misses → role compatibility → 80-minute cutoff → sort.
//!
//! Strict rules enforced here and nowhere else:
//! - no record with `commute_minutes > MAX_COMMUTE_MINUTES` ever leaves this module;
//! - output is sorted by commute ascending, then (candidate_id, client_id);
//! - commute minutes come only from the cache or the distance resolver. A pair that
//!   cannot be resolved is dropped, never estimated.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::commute::postcode::PostcodePair;
use crate::distance::error::DistanceError;
use crate::distance::resolver::DistanceResolver;
use crate::matching::models::{MatchCandidate, MatchClient, MatchRecord};
use crate::roles::normalizer::{normalize, NormalizedRole};
use crate::roles::taxonomy::RoleTaxonomy;

/// Absolute business rule. Not configurable.
pub const MAX_COMMUTE_MINUTES: u32 = 80;

/// Call-level failures. Per-pair problems never surface here; they only shrink the list.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Distance provider is not configured: {0}")]
    Configuration(String),

    #[error("Distance provider unavailable: none of {failed} commute lookups succeeded ({last_error})")]
    ProviderOutage { failed: usize, last_error: String },
}

/// Runs one match generation.
///
/// Read-only with respect to candidates and clients; the only side effect is commute
/// cache population by the resolver. Pairs still unresolved at `deadline` are omitted.
pub async fn generate_matches(
    resolver: &DistanceResolver,
    taxonomy: &RoleTaxonomy,
    candidates: &[MatchCandidate],
    clients: &[MatchClient],
    deadline: Option<Instant>,
) -> Result<Vec<MatchRecord>, MatchError> {
    // 1. Pre-filter: a pairing needs a postcode on both sides and a role on the client.
    let candidates: Vec<&MatchCandidate> = candidates
        .iter()
        .filter(|c| !c.postcode.trim().is_empty())
        .collect();
    let clients: Vec<&MatchClient> = clients
        .iter()
        .filter(|c| !c.postcode.trim().is_empty() && !c.role.trim().is_empty())
        .collect();

    if candidates.is_empty() || clients.is_empty() {
        info!("Match generation skipped: no matchable candidates or clients");
        return Ok(vec![]);
    }

    // 2. Cross product keyed by normalized postcode pair.
    let mut cross: Vec<(usize, usize, PostcodePair)> =
        Vec::with_capacity(candidates.len() * clients.len());
    for (ci, candidate) in candidates.iter().enumerate() {
        for (li, client) in clients.iter().enumerate() {
            cross.push((ci, li, PostcodePair::new(&candidate.postcode, &client.postcode)));
        }
    }
    let keys: Vec<PostcodePair> = cross
        .iter()
        .map(|(_, _, pair)| pair.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // 3. Cache first, resolver for misses.
    let cache = resolver.cache();
    let mut minutes: HashMap<PostcodePair, u32> = match cache.get_many(&keys).await {
        Ok(hits) => hits,
        Err(e) => {
            warn!("Commute cache read failed, treating all {} pairs as misses: {e}", keys.len());
            HashMap::new()
        }
    };
    let cache_hits = minutes.len();
    let misses: Vec<PostcodePair> = keys
        .iter()
        .filter(|k| !minutes.contains_key(*k))
        .cloned()
        .collect();

    info!(
        "Match generation: {} candidates x {} clients = {} pairs, {} distinct postcode pairs ({} cached, {} to resolve)",
        candidates.len(),
        clients.len(),
        cross.len(),
        keys.len(),
        cache_hits,
        misses.len()
    );

    if !misses.is_empty() {
        let resolution = resolver
            .resolve_until(&misses, deadline)
            .await
            .map_err(|e| match e {
                DistanceError::Configuration(msg) => MatchError::Configuration(msg),
                other => MatchError::ProviderOutage {
                    failed: misses.len(),
                    last_error: other.to_string(),
                },
            })?;

        if cache_hits == 0 {
            check_total_outage(&resolution)?;
        }

        for (pair, outcome) in resolution {
            if let Ok(m) = outcome {
                minutes.insert(pair, m);
            }
        }
    }

    // 4. Role compatibility, normalized once per entity.
    let candidate_roles: Vec<NormalizedRole> = candidates
        .iter()
        .map(|c| normalize(taxonomy, &c.role))
        .collect();
    let client_roles: Vec<NormalizedRole> = clients
        .iter()
        .map(|c| normalize(taxonomy, &c.role))
        .collect();

    // 5. Unresolved pairs and anything over the cutoff are dropped.
    let mut records: Vec<MatchRecord> = cross
        .into_iter()
        .filter_map(|(ci, li, pair)| {
            let commute_minutes = *minutes.get(&pair)?;
            (commute_minutes <= MAX_COMMUTE_MINUTES).then(|| MatchRecord {
                candidate_id: candidates[ci].id.clone(),
                client_id: clients[li].id.clone(),
                commute_minutes,
                role_match: candidate_roles[ci].is_compatible_with(&client_roles[li]),
            })
        })
        .collect();

    // 6. Total, deterministic order.
    sort_matches(&mut records);

    info!(
        "Match generation produced {} matches ({} role matches)",
        records.len(),
        records.iter().filter(|r| r.role_match).count()
    );

    Ok(records)
}

/// Commute ascending, then candidate id, then client id (both lexical).
pub fn sort_matches(records: &mut [MatchRecord]) {
    records.sort_by(|a, b| {
        a.commute_minutes
            .cmp(&b.commute_minutes)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
}

/// Fails the call when the provider answered nothing at all and every failure was a
/// provider-side outage. Invalid postcodes and deadline misses are ordinary per-pair results.
fn check_total_outage(
    resolution: &HashMap<PostcodePair, Result<u32, DistanceError>>,
) -> Result<(), MatchError> {
    let mut last_error = None;
    for outcome in resolution.values() {
        match outcome {
            Ok(_) => return Ok(()),
            Err(e @ (DistanceError::ProviderUnavailable(_) | DistanceError::QuotaExceeded(_))) => {
                last_error = Some(e)
            }
            Err(_) => return Ok(()),
        }
    }

    match last_error {
        Some(e) => Err(MatchError::ProviderOutage {
            failed: resolution.len(),
            last_error: e.to_string(),
        }),
        None => Ok(()),
    }
}
