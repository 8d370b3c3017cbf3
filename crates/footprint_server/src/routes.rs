use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use footprint::{apply_filter, FeatureCollection, FilterOutcome, ResolveError};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

const NO_BUILDINGS: &str = "No building data found for the specified area";
const NO_MATCHES: &str = "No buildings matched the filter criteria";

pub fn build_router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/buildings", get(buildings))
        .route("/api/filter_buildings", get(filter_buildings))
        .with_state(state.clone())
        .layer(TraceLayer::new_for_http());

    if state.cors_enabled {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    router
}

async fn index() -> &'static str {
    "Backend is running!"
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let cache = state.cache.current().map(|entry| {
        json!({
            "version": entry.version,
            "fetched_at": entry.fetched_at.to_rfc3339(),
            "records": entry.dataset.len(),
        })
    });
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cache": cache,
    }))
}

async fn buildings(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let entry = state.base_dataset().await?;
    let collection =
        FeatureCollection::new(&entry.dataset.records).with_empty_message(NO_BUILDINGS);
    tracing::info!(features = collection.len(), "Serving base data");
    Ok(Json(collection).into_response())
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    query: Option<String>,
}

async fn filter_buildings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Result<Response, ApiError> {
    state.metrics.filter_requests_total.inc();
    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let spec = state
        .resolver
        .resolve(query)
        .await
        .and_then(|spec| {
            spec.validate()?;
            Ok(spec)
        })
        .map_err(|e| {
            state.metrics.resolver_failures_total.inc();
            tracing::warn!(query, error = %e, "Could not resolve filter");
            e
        })?;
    tracing::info!(query, filter = %spec, "Applying filter");

    let entry = state.base_dataset().await?;
    let outcome = apply_filter(&entry.dataset.records, &spec).map_err(ResolveError::from)?;
    if let FilterOutcome::Lenient { .. } = outcome {
        state.metrics.lenient_filters_total.inc();
    }

    let collection = FeatureCollection::new(outcome.records()).with_empty_message(NO_MATCHES);
    tracing::info!(features = collection.len(), "Filtering complete");
    Ok(Json(collection).into_response())
}
