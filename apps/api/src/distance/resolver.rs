//! Distance Resolver: turns a list of postcode pairs into commute minutes.
//!
//! Flow: deduplicate → plan provider-sized batches → run batches under a shared
//! concurrency limit and requests-per-second ceiling → retry the failed pairs of a
//! batch with exponential backoff → write every success into the commute cache.
//!
//! Partial success always beats total failure: a batch that exhausts its retries marks
//! only its own pairs as failed. The one exception is a configuration error, which aborts
//! the whole call because no pair can possibly succeed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::commute::cache::CommuteCache;
use crate::commute::postcode::PostcodePair;
use crate::distance::batching::{plan_batches, Batch, BatchLimits};
use crate::distance::client::{DistanceMatrixClient, PairOutcome};
use crate::distance::error::DistanceError;
use crate::distance::rate_limit::RateLimiter;

pub type Resolution = HashMap<PostcodePair, PairOutcome>;

type Settled = mpsc::UnboundedSender<(PostcodePair, PairOutcome)>;

fn settle(settled: &Settled, pair: PostcodePair, outcome: PairOutcome) {
    // The receiver only goes away once the caller has stopped listening.
    let _ = settled.send((pair, outcome));
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub quota_multiplier: u32,
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base × 2^(retry-1), stretched further
    /// when the provider reported a quota problem.
    pub fn backoff(&self, retry: u32, last_error: &DistanceError) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        match last_error {
            DistanceError::QuotaExceeded(_) => delay.saturating_mul(self.quota_multiplier.max(1)),
            _ => delay,
        }
    }
}

/// Cheap to clone; clones share the rate limiter, the concurrency permits and the cache.
#[derive(Clone)]
pub struct DistanceResolver {
    client: DistanceMatrixClient,
    cache: CommuteCache,
    limiter: Arc<RateLimiter>,
    permits: Arc<Semaphore>,
    policy: RetryPolicy,
    limits: BatchLimits,
}

impl DistanceResolver {
    pub fn new(client: DistanceMatrixClient, cache: CommuteCache) -> Self {
        let settings = client.settings();
        let limiter = Arc::new(RateLimiter::per_second(settings.requests_per_second));
        let permits = Arc::new(Semaphore::new(settings.max_concurrency.max(1)));
        let policy = RetryPolicy {
            max_attempts: settings.max_attempts.max(1),
            base_delay: settings.backoff_base,
            quota_multiplier: settings.quota_backoff_multiplier,
        };
        let limits = BatchLimits::from(settings);

        Self {
            client,
            cache,
            limiter,
            permits,
            policy,
            limits,
        }
    }

    pub fn cache(&self) -> &CommuteCache {
        &self.cache
    }

    /// Resolves every pair with no deadline.
    #[cfg(test)]
    pub async fn resolve(&self, pairs: &[PostcodePair]) -> Result<Resolution, DistanceError> {
        self.resolve_until(pairs, None).await
    }

    /// Resolves every distinct pair in `pairs`. Each distinct pair appears exactly once in
    /// the result. Pairs still outstanding at `deadline` are reported as `DeadlineExceeded`;
    /// pairs a batch settled before the deadline are kept even if that batch was cut short.
    pub async fn resolve_until(
        &self,
        pairs: &[PostcodePair],
        deadline: Option<Instant>,
    ) -> Result<Resolution, DistanceError> {
        let unique: BTreeSet<PostcodePair> = pairs.iter().cloned().collect();
        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        self.client.ensure_configured()?;

        let batches = plan_batches(&unique, self.limits);
        debug!(
            "Distance plan: {} requested, {} distinct, {} batches",
            pairs.len(),
            unique.len(),
            batches.len()
        );

        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        for batch in batches {
            let resolver = self.clone();
            let settled = settled_tx.clone();
            tasks.spawn(async move { resolver.run_batch(batch, settled).await });
        }
        drop(settled_tx);

        let mut deadline_hit = false;
        loop {
            let joined = match deadline {
                Some(deadline) => match timeout_at(deadline, tasks.join_next()).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        warn!(
                            "Distance resolution deadline reached with {} batches outstanding",
                            tasks.len()
                        );
                        deadline_hit = true;
                        tasks.abort_all();
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = joined else { break };
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(fatal)) => {
                    tasks.abort_all();
                    return Err(fatal);
                }
                Err(e) => warn!("Distance batch task did not complete: {e}"),
            }
        }

        // Every outcome a batch settled was sent before the batch could be aborted.
        let mut results: Resolution = HashMap::with_capacity(unique.len());
        while let Ok((pair, outcome)) = settled_rx.try_recv() {
            results.insert(pair, outcome);
        }

        for pair in unique {
            results.entry(pair).or_insert_with(|| {
                if deadline_hit {
                    Err(DistanceError::DeadlineExceeded)
                } else {
                    Err(DistanceError::ProviderUnavailable(
                        "batch did not complete".into(),
                    ))
                }
            });
        }

        let resolved = results.values().filter(|r| r.is_ok()).count();
        info!(
            "Distance resolution: {} requested, {} distinct, {} resolved, {} failed",
            pairs.len(),
            results.len(),
            resolved,
            results.len() - resolved
        );

        Ok(results)
    }

    /// Runs one planned batch, sending each pair's outcome through `settled` as soon as it
    /// is final. Retries re-plan the still-pending pairs so a retry only pays for pairs
    /// that are still outstanding.
    async fn run_batch(self, batch: Batch, settled: Settled) -> Result<(), DistanceError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| DistanceError::ProviderUnavailable(format!("resolver shut down: {e}")))?;

        let mut pending = batch.pairs();
        let mut last_error = DistanceError::ProviderUnavailable("no attempt made".into());

        for attempt in 1..=self.policy.max_attempts {
            if pending.is_empty() {
                break;
            }
            if attempt > 1 {
                let delay = self.policy.backoff(attempt - 1, &last_error);
                warn!(
                    "Distance batch attempt {} failed ({}), retrying {} pairs after {}ms...",
                    attempt - 1,
                    last_error,
                    pending.len(),
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let mut retry = Vec::new();
            for request in plan_batches(&pending, self.limits) {
                let requested = request.pairs();
                self.limiter.acquire().await;

                match self.client.travel_minutes(&requested).await {
                    Ok(mut outcomes) => {
                        let mut fresh = Vec::new();
                        for pair in requested {
                            let outcome = outcomes.remove(&pair).unwrap_or_else(|| {
                                Err(DistanceError::ProviderUnavailable(format!(
                                    "{pair}: missing from response"
                                )))
                            });
                            match outcome {
                                Ok(minutes) => {
                                    fresh.push((pair.clone(), minutes));
                                    settle(&settled, pair, Ok(minutes));
                                }
                                Err(e) if e.is_retryable() => {
                                    last_error = e;
                                    retry.push(pair);
                                }
                                Err(e) => settle(&settled, pair, Err(e)),
                            }
                        }
                        self.store(&fresh).await;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) if e.is_retryable() => {
                        last_error = e;
                        retry.extend(requested);
                    }
                    Err(e) => {
                        for pair in requested {
                            settle(&settled, pair, Err(e.clone()));
                        }
                    }
                }
            }
            pending = retry;
        }

        if !pending.is_empty() {
            warn!(
                "Distance batch gave up on {} pairs after {} attempts: {}",
                pending.len(),
                self.policy.max_attempts,
                last_error
            );
            for pair in pending {
                settle(&settled, pair, Err(last_error.clone()));
            }
        }

        Ok(())
    }

    /// Cache writes are best effort: the result is still returned if the store is down.
    async fn store(&self, fresh: &[(PostcodePair, u32)]) {
        for (pair, minutes) in fresh {
            if let Err(e) = self.cache.put(pair, *minutes).await {
                warn!("Failed to cache commute for {pair}: {e}");
            }
        }
    }
}
