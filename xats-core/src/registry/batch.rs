// xats-core/src/registry/batch.rs
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};
use xats_common::error::{ReportedError, Result, XatsError};
use xats_common::model::ResolvedReference;
use xats_common::CancelSignal;

use super::RegistryResolver;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Wall-clock time of the whole batch.
    pub total_time_ms: f64,
    /// Mean time spent on a single reference.
    pub average_time_ms: f64,
    pub total_bytes: u64,
}

/// Outcome of [`RegistryResolver::resolve_many`]. `resolved` keeps input order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResolution {
    pub resolved: Vec<ResolvedReference>,
    pub errors: Vec<ReportedError>,
    pub stats: ResolutionStats,
}

struct Outcome {
    index: usize,
    raw: String,
    result: Result<(ResolvedReference, bool)>,
    elapsed: Duration,
}

impl RegistryResolver {
    /// Resolves every reference, never stopping at a failure. At most
    /// `concurrency` references are in flight at once.
    #[instrument(skip_all, fields(count = refs.len()))]
    pub async fn resolve_many(&self, refs: &[String], cancel: &CancelSignal) -> BatchResolution {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<Outcome> = JoinSet::new();

        for (index, raw) in refs.iter().enumerate() {
            let resolver = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let raw = raw.clone();
            tasks.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                // Timed while the permit is held, so queueing is not counted.
                let (result, elapsed) = match permit {
                    Some(_permit) if !cancel.is_cancelled() => {
                        let unit_start = Instant::now();
                        let result = resolver.lookup(&raw);
                        (result, unit_start.elapsed())
                    }
                    Some(_) => (Err(XatsError::Cancelled), Duration::ZERO),
                    None if cancel.is_cancelled() => (Err(XatsError::Cancelled), Duration::ZERO),
                    None => (
                        Err(XatsError::Generic("resolution semaphore closed".to_string())),
                        Duration::ZERO,
                    ),
                };
                Outcome {
                    index,
                    raw,
                    result,
                    elapsed,
                }
            });
        }

        let mut outcomes: Vec<Outcome> = Vec::with_capacity(refs.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!("A resolution task panicked: {}", e),
            }
        }
        outcomes.sort_by_key(|o| o.index);

        let mut batch = BatchResolution::default();
        let mut busy = Duration::ZERO;
        for outcome in outcomes {
            busy += outcome.elapsed;
            match outcome.result {
                Ok((resolved, hit)) => {
                    if hit {
                        batch.stats.cache_hits += 1;
                    } else {
                        batch.stats.cache_misses += 1;
                    }
                    batch.stats.total_bytes += resolved.size();
                    batch.resolved.push(resolved);
                }
                Err(e) => {
                    warn!("Failed to resolve {}: {}", outcome.raw, e);
                    batch.stats.cache_misses += 1;
                    batch.errors.push(ReportedError::new(outcome.raw, &e));
                }
            }
        }

        let stats = &mut batch.stats;
        stats.total = refs.len();
        stats.successful = batch.resolved.len();
        stats.failed = batch.errors.len();
        stats.total_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        if stats.total > 0 {
            stats.average_time_ms = busy.as_secs_f64() * 1000.0 / stats.total as f64;
        }
        debug!(
            "Batch resolved {}/{} references ({} cache hits)",
            stats.successful, stats.total, stats.cache_hits
        );
        batch
    }
}
