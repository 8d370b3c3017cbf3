use clap::Parser;
use footprint::BoundingBox;
use std::{net::SocketAddr, time::Duration};

/// `footprint_server` - serves Calgary building footprints joined with
/// property assessments, optionally filtered by a plain-language query.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, allow_negative_numbers = true)]
pub struct Config {
    /// Listen address for the HTTP API.
    #[arg(long, env = "FOOTPRINT_LISTEN_ADDR", default_value = "127.0.0.1:5000")]
    pub listen_addr: SocketAddr,

    /// Listen address for the Prometheus metrics server.
    #[arg(long, env = "FOOTPRINT_METRICS_LISTEN_ADDR", default_value = "127.0.0.1:9095")]
    pub metrics_listen_addr: SocketAddr,

    /// SODA endpoint of the building roof outline dataset.
    #[arg(
        long,
        env = "BUILDINGS_API_URL",
        default_value = "https://data.calgary.ca/resource/cchr-krqg.json"
    )]
    pub buildings_api_url: String,

    /// SODA endpoint of the property assessment dataset.
    #[arg(
        long,
        env = "ASSESSMENTS_API_URL",
        default_value = "https://data.calgary.ca/resource/4bsw-nn7w.json"
    )]
    pub assessments_api_url: String,

    /// Hosted text-generation model used to turn queries into filters.
    #[arg(
        long,
        env = "HUGGING_FACE_API_URL",
        default_value = "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.1"
    )]
    pub hugging_face_api_url: String,

    /// Bearer token for the inference API. Filtered queries fail without it.
    #[arg(long, env = "HUGGING_FACE_API_KEY", hide_env_values = true)]
    pub hugging_face_api_key: Option<String>,

    #[arg(long, env = "BBOX_NORTH", default_value_t = 51.0575)]
    pub bbox_north: f64,

    #[arg(long, env = "BBOX_EAST", default_value_t = -114.040)]
    pub bbox_east: f64,

    #[arg(long, env = "BBOX_SOUTH", default_value_t = 51.0375)]
    pub bbox_south: f64,

    #[arg(long, env = "BBOX_WEST", default_value_t = -114.080)]
    pub bbox_west: f64,

    /// Records requested per upstream page.
    #[arg(long, env = "SOURCE_PAGE_SIZE", default_value_t = footprint::source::DEFAULT_PAGE_SIZE)]
    pub source_page_size: usize,

    /// Optional cap on records taken from each source.
    #[arg(long, env = "SOURCE_RECORD_LIMIT")]
    pub source_record_limit: Option<usize>,

    /// Total timeout, in seconds, for each upstream HTTP request.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Send permissive CORS headers.
    #[arg(
        long,
        env = "FOOTPRINT_CORS",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub cors: bool,
}

impl Config {
    pub fn region(&self) -> BoundingBox {
        BoundingBox::new(self.bbox_north, self.bbox_east, self.bbox_south, self.bbox_west)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}
