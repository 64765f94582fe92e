use std::pin::Pin;
use std::time::Instant;

use futures::Stream;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;

use crate::config::{ApiType, ClientConfig};
use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::sse::process_sse;
use crate::types::{ChatCompletionChunk, ChatCompletionRequest};

/// A boxed stream of chat completion chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk>> + Send>>;

/// Client for the OpenAI chat completions API, or an Azure OpenAI deployment of it.
#[derive(Debug, Clone)]
pub struct OpenAI {
    config: ClientConfig,
    client: ReqwestClient,
}

impl OpenAI {
    /// Create a new client from `config`.
    ///
    /// The configured timeout bounds each request from connect to the last byte of the body.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self { config, client })
    }

    /// Create a new client configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("text/event-stream"),
        );
        let (name, value) = match self.config.api_type {
            ApiType::OpenAI => (header::AUTHORIZATION, format!("Bearer {}", self.config.api_key)),
            ApiType::Azure { .. } => (
                header::HeaderName::from_static("api-key"),
                self.config.api_key.clone(),
            ),
        };
        let mut value = HeaderValue::from_str(&value).map_err(|_| {
            Error::authentication("API key contains characters not allowed in a header")
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status = response.status();
        let status_code = status.as_u16();

        // Azure reports its request id under a different header.
        let request_id = ["x-request-id", "apim-request-id"]
            .iter()
            .find_map(|name| response.headers().get(*name))
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
            param: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_message = detail
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| error_body.clone());
        let error_param = detail.as_ref().and_then(|e| e.param.clone());

        // Map HTTP status code to appropriate error type
        match status_code {
            400 => Error::bad_request(error_message, error_param),
            401 => Error::authentication(error_message),
            403 => Error::permission(error_message),
            404 => Error::not_found(error_message),
            408 => Error::timeout(error_message, None),
            429 => Error::rate_limit(error_message, retry_after),
            500 => Error::internal_server(error_message, request_id),
            502..=504 => Error::service_unavailable(error_message, retry_after),
            _ => Error::api(status_code, error_type, error_message, request_id),
        }
    }

    /// Send a chat completion request and get a streaming response.
    ///
    /// The request is sent with `stream` forced on.  Returns a stream of chunks that ends at
    /// the server's end-of-stream marker.
    pub async fn stream(&self, request: &ChatCompletionRequest) -> Result<ChunkStream> {
        let url = self.config.chat_completions_url(&request.model)?;
        let headers = self.default_headers()?;
        let mut request = request.clone();
        request.stream = true;

        tracing::debug!(
            url = %url,
            model = %request.model,
            messages = request.messages.len(),
            "sending chat completion request"
        );
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::timeout(
                        format!("Request timed out: {e}"),
                        Some(self.config.timeout.as_secs_f64()),
                    )
                } else if e.is_connect() {
                    Error::connection(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::http_client(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            CLIENT_REQUEST_ERRORS.click();
            let err = Self::process_error_response(response).await;
            tracing::debug!(
                status = status.as_u16(),
                request_id = err.request_id(),
                error = %err,
                "chat completion request failed"
            );
            return Err(err);
        }

        // Get the byte stream from the response
        let stream = response.bytes_stream();

        Ok(Box::pin(process_sse(stream)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_creation() {
        let client = OpenAI::new(ClientConfig::openai("test-key")).unwrap();
        assert_eq!(client.config().api_key, "test-key");
        assert_eq!(client.config().timeout, crate::config::DEFAULT_TIMEOUT);

        let client = OpenAI::new(
            ClientConfig::azure("test-key", "https://example.openai.azure.com", None)
                .with_timeout(Duration::from_secs(30)),
        )
        .unwrap();
        assert!(client.config().is_azure());
        assert_eq!(client.config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn openai_headers_use_bearer_token() {
        let client = OpenAI::new(ClientConfig::openai("sk-test")).unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers[header::AUTHORIZATION], "Bearer sk-test");
        assert!(headers[header::AUTHORIZATION].is_sensitive());
        assert!(headers.get("api-key").is_none());
        assert_eq!(headers[header::ACCEPT], "text/event-stream");
    }

    #[test]
    fn azure_headers_use_api_key() {
        let client = OpenAI::new(ClientConfig::azure(
            "azure-key",
            "https://example.openai.azure.com",
            Some("deployment".to_string()),
        ))
        .unwrap();
        let headers = client.default_headers().unwrap();
        assert_eq!(headers["api-key"], "azure-key");
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn api_key_with_newline_rejected() {
        let client = OpenAI::new(ClientConfig::openai("sk-\ntest")).unwrap();
        assert!(client.default_headers().unwrap_err().is_authentication());
    }
}
