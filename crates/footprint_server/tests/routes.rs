use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use footprint::ingest::RawRecord;
use footprint::resolver::{parse_completion, FilterResolver};
use footprint::schema::{SourceSchema, ASSESSMENTS, BUILDINGS};
use footprint::source::{PageRequest, RecordSource};
use footprint::{
    Attribute, BoundingBox, FetchError, FilterSpec, FilterValue, Operator, Pipeline, ResolveError,
};
use footprint_server::{build_router, AppState, Metrics};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

struct FakeSource {
    schema: &'static SourceSchema,
    records: Vec<Value>,
    fail: bool,
    pages: AtomicUsize,
}

impl FakeSource {
    fn new(schema: &'static SourceSchema, records: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            schema,
            records,
            fail: false,
            pages: AtomicUsize::new(0),
        })
    }

    fn failing(schema: &'static SourceSchema) -> Arc<Self> {
        Arc::new(Self {
            schema,
            records: Vec::new(),
            fail: true,
            pages: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    fn schema(&self) -> &'static SourceSchema {
        self.schema
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(FetchError::Transport {
                source_name: self.schema.name,
                message: "connection refused".into(),
            });
        }
        Ok(self
            .records
            .iter()
            .skip(request.offset)
            .take(request.limit)
            .filter_map(|v| v.as_object().cloned())
            .collect())
    }
}

/// Answers from canned model completions; unknown queries fail like an
/// unreachable inference API.
struct CannedResolver;

#[async_trait]
impl FilterResolver for CannedResolver {
    async fn resolve(&self, query: &str) -> Result<FilterSpec, ResolveError> {
        if query == "height contains 3" {
            // A resolver handing back a typed spec the model never should have produced.
            return Ok(FilterSpec {
                attribute: Attribute::Height,
                operator: Operator::Contains,
                value: FilterValue::Number(3.0),
            });
        }
        let completion = match query {
            "tall buildings" => r#"{"attribute": "height", "operator": ">", "value": 100}"#,
            "residential" => {
                "```json\n{\"attribute\": \"land_use_designation\", \"operator\": \"contains\", \"value\": \"resid\"}\n```"
            }
            "skyscrapers" => r#"{"attribute": "height", "operator": ">", "value": 1000}"#,
            "red roofs" => r#"{"attribute": "roof_colour", "operator": "=", "value": "red"}"#,
            _ => return Err(ResolveError::Transport("service unavailable".into())),
        };
        parse_completion(completion)
    }
}

fn square(x0: f64, y0: f64) -> Value {
    let d = 0.0005;
    json!({
        "type": "Polygon",
        "coordinates": [[[x0, y0], [x0 + d, y0], [x0 + d, y0 + d], [x0, y0 + d], [x0, y0]]]
    })
}

fn building_rows() -> Vec<Value> {
    vec![
        json!({"struct_id": "1", "grd_elev_min_z": 1040.0, "rooftop_elev_z": 1090.0, "polygon": square(-114.075, 51.040)}),
        json!({"struct_id": "2", "grd_elev_min_z": 1040.0, "rooftop_elev_z": 1190.0, "polygon": square(-114.065, 51.045)}),
        json!({"struct_id": "3", "polygon": square(-114.055, 51.050)}),
    ]
}

fn assessment_rows() -> Vec<Value> {
    vec![json!({
        "roll_number": "201",
        "address": "200 BARCLAY PR SW",
        "assessed_value": 3400000,
        "land_use_designation": "Residential - Contextual One / Two Dwelling",
        "year_of_construction": 2004,
        "multipolygon": {"type": "MultiPolygon", "coordinates": [[[
            [-114.0652, 51.0448], [-114.0640, 51.0448], [-114.0640, 51.0460], [-114.0652, 51.0460], [-114.0652, 51.0448]
        ]]]}
    })]
}

struct Harness {
    router: axum::Router,
    buildings: Arc<FakeSource>,
    state: Arc<AppState>,
}

fn harness(buildings: Arc<FakeSource>, assessments: Arc<FakeSource>) -> Harness {
    let metrics = Arc::new(Metrics::new().expect("metrics"));
    let state = Arc::new(AppState::new(
        BoundingBox::default(),
        Pipeline::new(buildings.clone(), assessments),
        Arc::new(CannedResolver),
        metrics,
    ));
    Harness {
        router: build_router(state.clone()),
        buildings,
        state,
    }
}

fn default_harness() -> Harness {
    harness(
        FakeSource::new(&BUILDINGS, building_rows()),
        FakeSource::new(&ASSESSMENTS, assessment_rows()),
    )
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("collect body").to_bytes();
    (status, bytes.to_vec())
}

async fn get_json(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let (status, bytes) = get(router, uri).await;
    (status, serde_json::from_slice(&bytes).expect("valid JSON response"))
}

fn feature_ids(collection: &Value) -> Vec<&str> {
    collection["features"]
        .as_array()
        .expect("features array")
        .iter()
        .map(|f| f["id"].as_str().expect("feature id"))
        .collect()
}

#[tokio::test]
async fn index_reports_running() {
    let h = default_harness();
    let (status, body) = get(&h.router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Backend is running!");
}

#[tokio::test]
async fn buildings_returns_joined_features_and_caches() {
    let h = default_harness();

    let (status, json) = get_json(&h.router, "/api/buildings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(feature_ids(&json), vec!["1", "2", "3"]);

    let tall = &json["features"][1]["properties"];
    assert_eq!(tall["height"], 150.0);
    assert_eq!(tall["roll_number"], "201");
    assert_eq!(json["features"][0]["properties"]["roll_number"], Value::Null);
    assert_eq!(json["features"][2]["properties"]["height"], Value::Null);

    let (status, _) = get_json(&h.router, "/api/buildings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.buildings.pages.load(Ordering::SeqCst), 1);
    assert_eq!(h.state.metrics.cache_hits_total.get(), 1);
    assert_eq!(h.state.metrics.pipeline_runs_total.get(), 1);

    let (_, health) = get_json(&h.router, "/health").await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["cache"]["version"], 1);
    assert_eq!(health["cache"]["records"], 3);
}

#[tokio::test]
async fn empty_region_is_ok_with_message() {
    let h = harness(
        FakeSource::new(&BUILDINGS, Vec::new()),
        FakeSource::new(&ASSESSMENTS, assessment_rows()),
    );
    let (status, json) = get_json(&h.router, "/api/buildings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["features"], json!([]));
    assert_eq!(json["message"], "No building data found for the specified area");
}

#[tokio::test]
async fn source_failure_is_500_and_not_cached() {
    let h = harness(
        FakeSource::new(&BUILDINGS, building_rows()),
        FakeSource::failing(&ASSESSMENTS),
    );
    let (status, json) = get_json(&h.router, "/api/buildings").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("assessments"));
    assert!(h.state.cache.current().is_none());
    assert_eq!(h.state.metrics.pipeline_failures_total.get(), 1);

    let (_, health) = get_json(&h.router, "/health").await;
    assert_eq!(health["cache"], Value::Null);
}

#[tokio::test]
async fn missing_or_blank_query_is_400() {
    let h = default_harness();
    for uri in ["/api/filter_buildings", "/api/filter_buildings?query=", "/api/filter_buildings?query=%20%20"] {
        let (status, json) = get_json(&h.router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["error"], "Missing 'query' parameter");
    }
    assert_eq!(h.buildings.pages.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn resolver_failures_are_500_before_any_fetch() {
    let h = default_harness();

    let (status, json) = get_json(&h.router, "/api/filter_buildings?query=anything").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("LLM processing failed"));

    let (status, _) = get_json(&h.router, "/api/filter_buildings?query=red%20roofs").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(h.buildings.pages.load(Ordering::SeqCst), 0);
    assert_eq!(h.state.metrics.resolver_failures_total.get(), 2);
}

#[tokio::test]
async fn filters_apply_to_cached_data() {
    let h = default_harness();

    let (status, json) = get_json(&h.router, "/api/filter_buildings?query=tall%20buildings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&json), vec!["2"]);

    let (status, json) = get_json(&h.router, "/api/filter_buildings?query=residential").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(feature_ids(&json), vec!["2"]);
    assert_eq!(
        json["features"][0]["properties"]["land_use_designation"],
        "Residential - Contextual One / Two Dwelling"
    );

    assert_eq!(h.buildings.pages.load(Ordering::SeqCst), 1);
    assert_eq!(h.state.metrics.filter_requests_total.get(), 2);
}

#[tokio::test]
async fn no_match_is_ok_with_message() {
    let h = default_harness();
    let (status, json) = get_json(&h.router, "/api/filter_buildings?query=skyscrapers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["features"], json!([]));
    assert_eq!(json["message"], "No buildings matched the filter criteria");
}

#[tokio::test]
async fn unsupported_resolver_spec_is_rejected_not_lenient() {
    let h = default_harness();
    let (status, json) = get_json(&h.router, "/api/filter_buildings?query=height%20contains%203").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("contains"));
    assert_eq!(h.buildings.pages.load(Ordering::SeqCst), 0);
    assert_eq!(h.state.metrics.resolver_failures_total.get(), 1);
    assert_eq!(h.state.metrics.lenient_filters_total.get(), 0);
}
