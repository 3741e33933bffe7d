//! Sanity HTTP API client.

use async_trait::async_trait;
use basketry_core::DocumentId;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, error, instrument};
use url::Url;

use super::{ContentStore, SanityError};
use crate::config::SanityConfig;

/// Sanity client scoped to one project dataset.
#[derive(Clone)]
pub struct SanityClient {
    client: Client,
    /// Versioned API root, e.g. `https://abc123.api.sanity.io/v2024-11-01/`.
    api_base: Url,
    dataset: String,
    token: SecretString,
}

impl std::fmt::Debug for SanityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanityClient")
            .field("api_base", &self.api_base.as_str())
            .field("dataset", &self.dataset)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct MutateResponse {
    #[serde(rename = "transactionId")]
    transaction_id: Option<String>,
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    id: DocumentId,
}

impl SanityClient {
    /// Create a new Sanity client.
    ///
    /// # Errors
    ///
    /// Returns error if the API base URL is invalid or the HTTP client fails
    /// to build.
    pub fn new(config: &SanityConfig) -> Result<Self, SanityError> {
        let api_base = Url::parse(&config.api_base())
            .map_err(|e| SanityError::Parse(format!("Invalid Sanity API base: {e}")))?;
        let client = Client::builder().build()?;

        Ok(Self {
            client,
            api_base,
            dataset: config.dataset.clone(),
            token: config.api_token.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> Result<Url, SanityError> {
        self.api_base
            .join(&format!("data/{action}/{}", self.dataset))
            .map_err(|e| SanityError::Parse(format!("Invalid endpoint {action}: {e}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SanityError> {
        let response = request
            .bearer_auth(self.token.expose_secret())
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body).unwrap_or(body);
            error!(status = status.as_u16(), %message, "Sanity API error");
            return Err(SanityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SanityError::Parse(e.to_string()))
    }
}

/// Pull a readable message out of a Sanity error body.
///
/// Sanity returns either `{"error": {"description": ..}}` or
/// `{"error": "..", "message": ".."}` depending on the endpoint.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/description")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ContentStore for SanityClient {
    #[instrument(skip(self, query, params))]
    async fn fetch(&self, query: &str, params: &[(&str, Value)]) -> Result<Value, SanityError> {
        let mut url = self.endpoint("query")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${name}"), &value.to_string());
            }
        }

        let response: QueryResponse = self.send(self.client.get(url)).await?;
        Ok(response.result)
    }

    #[instrument(skip(self, document))]
    async fn create(&self, document: Value) -> Result<DocumentId, SanityError> {
        let mut url = self.endpoint("mutate")?;
        url.query_pairs_mut().append_pair("returnIds", "true");

        let body = json!({ "mutations": [{ "create": document }] });
        let response: MutateResponse = self.send(self.client.post(url).json(&body)).await?;

        let id = response
            .results
            .into_iter()
            .next()
            .map(|result| result.id)
            .ok_or(SanityError::EmptyMutationResult)?;

        debug!(
            document_id = %id,
            transaction_id = response.transaction_id.as_deref().unwrap_or_default(),
            "Sanity document created"
        );
        Ok(id)
    }
}
