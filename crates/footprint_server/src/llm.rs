//! Hugging Face inference resolver.

use async_trait::async_trait;
use footprint::resolver::{parse_completion, FilterResolver};
use footprint::{FilterSpec, ResolveError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_NEW_TOKENS: u32 = 50;

#[derive(Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Serialize)]
struct InferenceParameters {
    max_new_tokens: u32,
    return_full_text: bool,
}

#[derive(Deserialize)]
struct Generation {
    generated_text: String,
}

/// Instruction sent to the model for `query`.
pub fn prompt(query: &str) -> String {
    format!(
        r#"Extract filter parameters from the following user query about building data.
The available filterable attributes are: 'height' (numeric, in meters), 'assessed_value' (numeric), 'land_use_designation' (text), 'year_of_construction' (numeric year).
Return ONLY a JSON object with the keys 'attribute', 'operator', and 'value'.
- 'attribute' must be one of the available attributes.
- 'operator' must be one of: '>', '<', '=', 'contains'. Use '=' for exact matches on text or numbers, and 'contains' for partial text matches.
- 'value' should be the numeric or string value to filter by.

User Query: "{query}"

JSON:
"#
    )
}

/// Pulls the generated text out of a text-generation response body.
fn completion_text(body: &[u8]) -> Result<String, ResolveError> {
    let generations: Vec<Generation> =
        serde_json::from_slice(body).map_err(|_| ResolveError::UnexpectedFormat)?;
    generations
        .into_iter()
        .next()
        .map(|g| g.generated_text)
        .ok_or(ResolveError::UnexpectedFormat)
}

pub struct HuggingFaceResolver {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HuggingFaceResolver {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

impl fmt::Debug for HuggingFaceResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HuggingFaceResolver")
            .field("endpoint", &self.endpoint)
            .field("has_api_key", &self.api_key.is_some())
            .finish()
    }
}

#[async_trait]
impl FilterResolver for HuggingFaceResolver {
    async fn resolve(&self, query: &str) -> Result<FilterSpec, ResolveError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ResolveError::Transport("HUGGING_FACE_API_KEY is not set".into()));
        };

        tracing::info!(query, "Sending query to inference API");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&InferenceRequest {
                inputs: prompt(query),
                parameters: InferenceParameters {
                    max_new_tokens: MAX_NEW_TOKENS,
                    return_full_text: false,
                },
            })
            .send()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Transport(format!(
                "inference API returned {status}"
            )));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| ResolveError::Transport(e.to_string()))?;

        let text = completion_text(&body)?;
        tracing::debug!(completion = %text, "Model completion");
        parse_completion(&text)
    }
}
