//! Socrata Open Data API (SODA) record source.

use async_trait::async_trait;
use footprint::ingest::RawRecord;
use footprint::schema::SourceSchema;
use footprint::source::{PageRequest, RecordSource};
use footprint::FetchError;
use reqwest::Client;
use std::{fmt, time::Duration};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client for every upstream call.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT.min(timeout))
        .timeout(timeout)
        .build()
}

/// One SODA dataset endpoint, e.g. `https://data.calgary.ca/resource/cchr-krqg.json`.
pub struct SocrataSource {
    client: Client,
    endpoint: String,
    schema: &'static SourceSchema,
}

impl SocrataSource {
    pub fn new(client: Client, endpoint: impl Into<String>, schema: &'static SourceSchema) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            schema,
        }
    }

    fn query_params(&self, request: &PageRequest) -> [(&'static str, String); 4] {
        [
            ("$limit", request.limit.to_string()),
            ("$offset", request.offset.to_string()),
            (
                "$where",
                request.region.within_box_clause(self.schema.geometry_column),
            ),
            ("$select", self.schema.select_fields()),
        ]
    }
}

impl fmt::Debug for SocrataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocrataSource")
            .field("endpoint", &self.endpoint)
            .field("source", &self.schema.name)
            .finish()
    }
}

#[async_trait]
impl RecordSource for SocrataSource {
    fn schema(&self) -> &'static SourceSchema {
        self.schema
    }

    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<RawRecord>, FetchError> {
        let source_name = self.schema.name;
        let response = self
            .client
            .get(&self.endpoint)
            .query(&self.query_params(request))
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                source_name,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name,
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<RawRecord>>()
            .await
            .map_err(|e| FetchError::Decode {
                source_name,
                message: e.to_string(),
            })
    }
}
