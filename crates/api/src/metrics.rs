use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// How a graph request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Graph,
    NothingExtracted,
    DocumentError,
    ModelError,
    RenderError,
}

#[derive(Default)]
pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    graphs_rendered: AtomicUsize,
    nothing_extracted: AtomicUsize,
    document_failures: AtomicUsize,
    model_failures: AtomicUsize,
    render_failures: AtomicUsize,
    cache_hits: AtomicUsize,

    // Timing (in microseconds)
    total_model_time_us: AtomicU64,
    model_calls: AtomicUsize,

    // Counts
    total_entities_extracted: AtomicUsize,
    total_relationships_extracted: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, outcome: RequestOutcome) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            RequestOutcome::Graph => &self.graphs_rendered,
            RequestOutcome::NothingExtracted => &self.nothing_extracted,
            RequestOutcome::DocumentError => &self.document_failures,
            RequestOutcome::ModelError => &self.model_failures,
            RequestOutcome::RenderError => &self.render_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_call(&self, duration: Duration) {
        self.total_model_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.model_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_extraction(&self, entities: usize, relationships: usize) {
        self.total_entities_extracted.fetch_add(entities, Ordering::Relaxed);
        self.total_relationships_extracted.fetch_add(relationships, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            graphs_rendered: self.graphs_rendered.load(Ordering::Relaxed),
            nothing_extracted: self.nothing_extracted.load(Ordering::Relaxed),
            document_failures: self.document_failures.load(Ordering::Relaxed),
            model_failures: self.model_failures.load(Ordering::Relaxed),
            render_failures: self.render_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            model_calls: self.model_calls.load(Ordering::Relaxed),
            avg_model_time_ms: self.avg_time_ms(&self.total_model_time_us, &self.model_calls),
            total_entities_extracted: self.total_entities_extracted.load(Ordering::Relaxed),
            total_relationships_extracted: self.total_relationships_extracted.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub graphs_rendered: usize,
    pub nothing_extracted: usize,
    pub document_failures: usize,
    pub model_failures: usize,
    pub render_failures: usize,
    pub cache_hits: usize,
    pub model_calls: usize,
    pub avg_model_time_ms: f64,
    pub total_entities_extracted: usize,
    pub total_relationships_extracted: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcomes_are_counted_separately() {
        let metrics = Metrics::new();
        metrics.record_request(RequestOutcome::Graph);
        metrics.record_request(RequestOutcome::NothingExtracted);
        metrics.record_request(RequestOutcome::ModelError);
        metrics.record_request(RequestOutcome::RenderError);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.graphs_rendered, 1);
        assert_eq!(snapshot.nothing_extracted, 1);
        assert_eq!(snapshot.model_failures, 1);
        assert_eq!(snapshot.render_failures, 1);
        assert_eq!(snapshot.document_failures, 0);
    }

    #[test]
    fn test_average_model_time() {
        let metrics = Metrics::new();
        assert_eq!(metrics.snapshot().avg_model_time_ms, 0.0);

        metrics.record_model_call(Duration::from_millis(10));
        metrics.record_model_call(Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.model_calls, 2);
        assert!((snapshot.avg_model_time_ms - 20.0).abs() < 1e-9);
    }
}
