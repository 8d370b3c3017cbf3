use crate::config::Config;
use crate::llm::HuggingFaceResolver;
use crate::metrics::Metrics;
use crate::socrata::{http_client, SocrataSource};
use anyhow::Context;
use footprint::schema::{ASSESSMENTS, BUILDINGS};
use footprint::{
    BoundingBox, CacheEntry, FilterResolver, Lookup, Pipeline, PipelineError, RegionCache,
};
use std::sync::Arc;

/// Everything a request handler needs.
pub struct AppState {
    pub region: BoundingBox,
    pub pipeline: Pipeline,
    pub resolver: Arc<dyn FilterResolver>,
    pub cache: RegionCache,
    pub metrics: Arc<Metrics>,
    pub cors_enabled: bool,
}

impl AppState {
    pub fn new(
        region: BoundingBox,
        pipeline: Pipeline,
        resolver: Arc<dyn FilterResolver>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            region,
            pipeline,
            resolver,
            cache: RegionCache::new(),
            metrics,
            cors_enabled: false,
        }
    }

    /// Wires the SODA sources and the inference resolver from `config`.
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> anyhow::Result<Self> {
        let client =
            http_client(config.upstream_timeout()).context("Failed to create HTTP client")?;

        let pipeline = Pipeline::new(
            Arc::new(SocrataSource::new(
                client.clone(),
                &config.buildings_api_url,
                &BUILDINGS,
            )),
            Arc::new(SocrataSource::new(
                client.clone(),
                &config.assessments_api_url,
                &ASSESSMENTS,
            )),
        )
        .with_page_size(config.source_page_size)
        .with_record_limit(config.source_record_limit);

        if config.hugging_face_api_key.is_none() {
            tracing::warn!("HUGGING_FACE_API_KEY is not set; filtered queries will fail");
        }
        let resolver = Arc::new(HuggingFaceResolver::new(
            client,
            &config.hugging_face_api_url,
            config.hugging_face_api_key.clone(),
        ));

        let mut state = Self::new(config.region(), pipeline, resolver, metrics);
        state.cors_enabled = config.cors;
        Ok(state)
    }

    /// The joined dataset for the configured region, from the cache or
    /// from a fresh pipeline run.
    pub async fn base_dataset(&self) -> Result<Arc<CacheEntry>, PipelineError> {
        let region = self.region;
        let result = self
            .cache
            .get_or_load(region, || async move {
                self.metrics.pipeline_runs_total.inc();
                let result = self.pipeline.run(region).await;
                match &result {
                    Ok(dataset) => self.metrics.record_run(&dataset.mode, dataset.len()),
                    Err(e) => {
                        self.metrics.pipeline_failures_total.inc();
                        self.metrics.cached_records.set(0);
                        tracing::error!(error = %e, region = %region, "Pipeline run failed");
                    }
                }
                result
            })
            .await;

        match result {
            Ok((entry, lookup)) => {
                self.metrics.record_lookup(lookup);
                if lookup == Lookup::Hit {
                    tracing::debug!(version = entry.version, "Using cached base data");
                }
                Ok(entry)
            }
            Err(e) => {
                self.metrics.record_lookup(Lookup::Miss);
                Err(e)
            }
        }
    }
}
