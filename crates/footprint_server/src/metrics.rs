use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use footprint::{JoinMode, Lookup};
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

/// Prometheus collectors for the footprint service.
///
/// Wrapped in an `Arc` and shared by every request handler.
pub struct Metrics {
    pub registry: Registry,
    /// Pipeline runs started (cache misses that reached the sources).
    pub pipeline_runs_total: IntCounter,
    pub pipeline_failures_total: IntCounter,
    /// Runs that served buildings without assessment attributes.
    pub degraded_joins_total: IntCounter,
    pub cache_hits_total: IntCounter,
    pub cache_misses_total: IntCounter,
    /// Records in the currently cached dataset.
    pub cached_records: IntGauge,
    pub filter_requests_total: IntCounter,
    pub resolver_failures_total: IntCounter,
    /// Filters that could not be evaluated and fell back to the unfiltered set.
    pub lenient_filters_total: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("footprint".into()), None)?;

        macro_rules! reg {
            ($metric:expr) => {{
                let collector = $metric?;
                registry.register(Box::new(collector.clone()))?;
                collector
            }};
        }

        Ok(Self {
            pipeline_runs_total: reg!(IntCounter::new(
                "pipeline_runs_total",
                "Total number of fetch/ingest/join pipeline runs"
            )),
            pipeline_failures_total: reg!(IntCounter::new(
                "pipeline_failures_total",
                "Total number of pipeline runs that failed"
            )),
            degraded_joins_total: reg!(IntCounter::new(
                "degraded_joins_total",
                "Total number of runs that fell back to building data only"
            )),
            cache_hits_total: reg!(IntCounter::new(
                "cache_hits_total",
                "Requests served from the region cache"
            )),
            cache_misses_total: reg!(IntCounter::new(
                "cache_misses_total",
                "Requests that had to rebuild the region cache"
            )),
            cached_records: reg!(IntGauge::new(
                "cached_records",
                "Number of joined records in the region cache"
            )),
            filter_requests_total: reg!(IntCounter::new(
                "filter_requests_total",
                "Total number of filter_buildings requests"
            )),
            resolver_failures_total: reg!(IntCounter::new(
                "resolver_failures_total",
                "Queries the filter resolver could not turn into a valid filter"
            )),
            lenient_filters_total: reg!(IntCounter::new(
                "lenient_filters_total",
                "Filters that failed to evaluate and returned the unfiltered set"
            )),
            registry,
        })
    }

    pub fn record_lookup(&self, lookup: Lookup) {
        match lookup {
            Lookup::Hit => self.cache_hits_total.inc(),
            Lookup::Miss => self.cache_misses_total.inc(),
        }
    }

    /// Records the result of a completed pipeline run.
    pub fn record_run(&self, mode: &JoinMode, records: usize) {
        if matches!(mode, JoinMode::Degraded(_)) {
            self.degraded_joins_total.inc();
        }
        self.cached_records.set(records as i64);
    }

    /// Serves the registry on `/metrics`.
    pub fn router(&self) -> Router {
        let registry = self.registry.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move {
                    let mut buffer = Vec::new();
                    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
                        tracing::error!(error = %e, "Failed to encode metrics");
                        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                    match String::from_utf8(buffer) {
                        Ok(body) => body.into_response(),
                        Err(e) => {
                            tracing::error!(error = %e, "Metrics buffer is not valid UTF-8");
                            StatusCode::INTERNAL_SERVER_ERROR.into_response()
                        }
                    }
                }
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use footprint::join::DegradedReason;

    #[test]
    fn run_and_lookup_update_collectors() {
        let metrics = Metrics::new().unwrap();
        metrics.record_lookup(Lookup::Miss);
        metrics.record_lookup(Lookup::Hit);
        metrics.record_lookup(Lookup::Hit);
        metrics.record_run(&JoinMode::Degraded(DegradedReason::NoAssessments), 12);

        assert_eq!(metrics.cache_hits_total.get(), 2);
        assert_eq!(metrics.cache_misses_total.get(), 1);
        assert_eq!(metrics.degraded_joins_total.get(), 1);
        assert_eq!(metrics.cached_records.get(), 12);

        let names: Vec<_> = metrics
            .registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"footprint_cache_hits_total".to_string()));
    }
}
