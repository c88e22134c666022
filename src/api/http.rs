use crate::{
    api::traits::GenerationApi,
    config::ToonifyConfig,
    error::{Result, ToonifyError},
    models::{
        AuthToken, DeleteResponse, Generation, GenerationId, GenerationStatus, HistoryResponse,
        PollResponse, SubmitRequest, SubmitResponse,
    },
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

/// JSON-over-HTTPS client for the generation service.
pub struct HttpGenerationApi {
    client: Client,
    base_url: Url,
}

impl HttpGenerationApi {
    pub fn new(config: &ToonifyConfig) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(config.base_url())
            .map_err(|e| ToonifyError::ConfigError(format!("Invalid API URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ToonifyError::ConfigError(format!(
                "API URL cannot be used as a base: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ToonifyError::ConfigError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn build_headers(&self, token: &AuthToken) -> Result<reqwest::header::HeaderMap> {
        let mut headers = reqwest::header::HeaderMap::new();
        let bearer: reqwest::header::HeaderValue = format!("Bearer {}", token.expose())
            .parse()
            .map_err(|_| ToonifyError::AuthError("Auth token is not a valid header value".into()))?;
        headers.insert(reqwest::header::AUTHORIZATION, bearer);
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
        let body = response.text().await.map_err(|e| {
            ToonifyError::TransportError(format!("{} response could not be read: {}", action, e))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            log::debug!("Undecodable {} response: {}", action, body);
            ToonifyError::ProtocolError(format!("Malformed {} response: {}", action, e))
        })
    }

    async fn ensure_success(response: Response, action: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status, &body, action))
    }
}

/// Maps a non-2xx status to the crate error taxonomy.
pub fn classify_failure(status: StatusCode, body: &str, action: &str) -> ToonifyError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.trim())
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ToonifyError::AuthError(format!("{} rejected credentials ({})", action, detail))
        }
        _ => ToonifyError::TransportError(format!("{} failed with {}", action, detail)),
    }
}

#[async_trait]
impl GenerationApi for HttpGenerationApi {
    async fn submit(&self, request: SubmitRequest, token: &AuthToken) -> Result<SubmitResponse> {
        log::info!("Submitting generation with variant: {}", request.variant);

        let response = self
            .client
            .post(self.endpoint(&["generate"]))
            .headers(self.build_headers(token)?)
            .json(&request)
            .send()
            .await
            .map_err(|e| ToonifyError::TransportError(format!("Submit request failed: {}", e)))?;

        let response = Self::ensure_success(response, "Submit").await?;
        Self::read_json(response, "submit").await
    }

    async fn poll(&self, job_id: &GenerationId, token: &AuthToken) -> Result<PollResponse> {
        let response = self
            .client
            .get(self.endpoint(&["status", job_id.as_str()]))
            .headers(self.build_headers(token)?)
            .send()
            .await
            .map_err(|e| ToonifyError::TransportError(format!("Status request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PollResponse::with_status(GenerationStatus::NotFound));
        }

        let response = Self::ensure_success(response, "Status check").await?;
        Self::read_json(response, "status").await
    }

    async fn history(&self, token: &AuthToken) -> Result<Vec<Generation>> {
        let response = self
            .client
            .get(self.endpoint(&["generations"]))
            .headers(self.build_headers(token)?)
            .send()
            .await
            .map_err(|e| ToonifyError::TransportError(format!("History request failed: {}", e)))?;

        let response = Self::ensure_success(response, "History fetch").await?;
        let history: HistoryResponse = Self::read_json(response, "history").await?;
        Ok(history.into_generations())
    }

    async fn delete(&self, job_id: &GenerationId, token: &AuthToken) -> Result<DeleteResponse> {
        let response = self
            .client
            .delete(self.endpoint(&["generations", job_id.as_str()]))
            .headers(self.build_headers(token)?)
            .send()
            .await
            .map_err(|e| ToonifyError::TransportError(format!("Delete request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(classify_failure(status, "", "Delete"));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Ok(DeleteResponse {
                success: false,
                message: Some(format!("Delete failed: {} {}", status, body.trim())),
            });
        }

        let body = response.text().await.unwrap_or_default();
        if body.trim().is_empty() {
            return Ok(DeleteResponse {
                success: true,
                message: None,
            });
        }
        serde_json::from_str(&body)
            .map_err(|e| ToonifyError::ProtocolError(format!("Malformed delete response: {}", e)))
    }
}
