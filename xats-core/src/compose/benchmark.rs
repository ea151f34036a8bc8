// xats-core/src/compose/benchmark.rs
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};
use xats_common::model::CompositionLimits;
use xats_common::CancelSignal;

use super::resolver::{ms, CompositionMetrics, CompositionResolver};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkReport {
    /// Runs actually completed; fewer than requested when cancelled.
    pub iterations: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub last_metrics: CompositionMetrics,
    pub last_error_count: usize,
}

impl CompositionResolver {
    /// Composes `root` repeatedly, each run with its own fragment cache.
    #[instrument(skip(self, root, limits, cancel), fields(base = %base_path.display()))]
    pub async fn benchmark(
        &self,
        root: &Value,
        base_path: &Path,
        limits: &CompositionLimits,
        iterations: usize,
        cancel: &CancelSignal,
    ) -> BenchmarkReport {
        let mut report = BenchmarkReport {
            min_ms: f64::MAX,
            ..BenchmarkReport::default()
        };
        let mut total = 0.0;

        for run in 0..iterations.max(1) {
            if cancel.is_cancelled() {
                debug!("Benchmark cancelled after {} runs", run);
                break;
            }
            let started = Instant::now();
            let result = self.resolve_fragments(root, base_path, limits, cancel).await;
            let elapsed = ms(started.elapsed());

            total += elapsed;
            report.iterations += 1;
            report.min_ms = report.min_ms.min(elapsed);
            report.max_ms = report.max_ms.max(elapsed);
            report.last_error_count = result.errors.len();
            report.last_metrics = result.metrics;
        }

        if report.iterations == 0 {
            report.min_ms = 0.0;
        } else {
            report.mean_ms = total / report.iterations as f64;
        }
        debug!(
            "Benchmark: {} runs, min {:.3}ms, mean {:.3}ms, max {:.3}ms",
            report.iterations, report.min_ms, report.mean_ms, report.max_ms
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use xats_aio::FsFragmentLoader;

    use super::*;

    #[tokio::test]
    async fn reports_every_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("ch1.json"),
            json!({"id": "ch1", "language": "en"}).to_string(),
        )
        .unwrap();
        let resolver = CompositionResolver::new(Arc::new(FsFragmentLoader::new()));
        let report = resolver
            .benchmark(
                &json!([{"$ref": "ch1.json"}]),
                dir.path(),
                &CompositionLimits::default(),
                3,
                &CancelSignal::never(),
            )
            .await;

        assert_eq!(report.iterations, 3);
        assert_eq!(report.last_error_count, 0);
        assert_eq!(report.last_metrics.total_files, 1);
        assert!(report.min_ms <= report.max_ms);
        assert!(report.mean_ms > 0.0);
    }

    #[tokio::test]
    async fn cancelled_benchmark_runs_nothing() {
        let (handle, signal) = xats_common::cancel_pair();
        handle.cancel();
        let resolver = CompositionResolver::new(Arc::new(FsFragmentLoader::new()));
        let report = resolver
            .benchmark(&json!({}), Path::new("."), &CompositionLimits::default(), 5, &signal)
            .await;
        assert_eq!(report.iterations, 0);
        assert_eq!(report.min_ms, 0.0);
    }
}
