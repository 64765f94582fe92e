//! Client configuration.
//!
//! The client talks to one of two providers: OpenAI proper, or an Azure OpenAI resource.  Which
//! one is decided by the environment:
//!
//! - `OPENAI_API_KEY`: the key for either provider (required).
//! - `OPENAI_AZURE_ENDPOINT`: when set, route to this Azure OpenAI endpoint.
//! - `OPENAI_AZURE_MODEL`: the Azure deployment name; defaults to the model name.
//! - `OPENAI_BASE_URL`: base URL for OpenAI-compatible servers (ignored for Azure).
//! - `OPENAI_MODEL`: the model identifier; defaults to [`DEFAULT_MODEL`].

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Model used when `OPENAI_MODEL` is unset.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Base URL of the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// API version sent to Azure OpenAI.
pub const AZURE_API_VERSION: &str = "2023-05-15";

/// Deadline applied to the whole request, connect through last chunk.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const API_KEY_VAR: &str = "OPENAI_API_KEY";
const AZURE_ENDPOINT_VAR: &str = "OPENAI_AZURE_ENDPOINT";
const AZURE_DEPLOYMENT_VAR: &str = "OPENAI_AZURE_MODEL";
const BASE_URL_VAR: &str = "OPENAI_BASE_URL";
const MODEL_VAR: &str = "OPENAI_MODEL";

/// Which provider the client routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiType {
    /// OpenAI or an OpenAI-compatible server; bearer-token auth.
    OpenAI,
    /// Azure OpenAI; `api-key` auth and deployment-scoped URLs.
    Azure {
        /// Deployment that serves every model.  `None` maps each model to a deployment of the
        /// same name.
        deployment: Option<String>,
        /// The `api-version` query parameter.
        api_version: String,
    },
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The API key.
    pub api_key: String,
    /// Base URL (OpenAI) or resource endpoint (Azure).
    pub base_url: String,
    /// Provider routing.
    pub api_type: ApiType,
    /// Overall request deadline.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Configuration for the OpenAI API.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_type: ApiType::OpenAI,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configuration for an Azure OpenAI endpoint.
    pub fn azure(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: Option<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: endpoint.into(),
            api_type: ApiType::Azure {
                deployment,
                api_version: AZURE_API_VERSION.to_string(),
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps variable names to values.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let api_key = get(API_KEY_VAR).ok_or_else(|| {
            Error::authentication(format!("{API_KEY_VAR} environment variable not set"))
        })?;
        let config = match get(AZURE_ENDPOINT_VAR) {
            Some(endpoint) => Self::azure(api_key, endpoint, get(AZURE_DEPLOYMENT_VAR)),
            None => {
                let mut config = Self::openai(api_key);
                if let Some(base_url) = get(BASE_URL_VAR) {
                    config.base_url = base_url;
                }
                config
            }
        };
        Ok(config)
    }

    /// Override the request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether requests go to Azure OpenAI.
    pub fn is_azure(&self) -> bool {
        matches!(self.api_type, ApiType::Azure { .. })
    }

    /// The Azure deployment that serves `model`.
    pub fn deployment_for<'a>(&'a self, model: &'a str) -> &'a str {
        match &self.api_type {
            ApiType::Azure {
                deployment: Some(deployment),
                ..
            } => deployment.as_str(),
            _ => model,
        }
    }

    /// The chat completions URL for `model`.
    pub fn chat_completions_url(&self, model: &str) -> Result<Url> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::url(format!("{} cannot be a base URL", self.base_url), None))?;
            segments.pop_if_empty();
            if let ApiType::Azure { .. } = self.api_type {
                segments.extend(["openai", "deployments", self.deployment_for(model)]);
            }
            segments.extend(["chat", "completions"]);
        }
        if let ApiType::Azure { api_version, .. } = &self.api_type {
            url.query_pairs_mut().append_pair("api-version", api_version);
        }
        Ok(url)
    }
}

/// The model to request: `OPENAI_MODEL`, or [`DEFAULT_MODEL`].
pub fn model_from_env() -> String {
    model_from_lookup(|name| env::var(name).ok())
}

/// The model to request, resolved through `lookup`.
pub fn model_from_lookup<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(MODEL_VAR)
        .filter(|model| !model.is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn missing_api_key() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.is_authentication());

        let err = ClientConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "")])).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn openai_from_lookup() {
        let config = ClientConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_type, ApiType::OpenAI);
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(
            config.chat_completions_url("gpt-4").unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn base_url_override() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(
            config.chat_completions_url("gpt-4").unwrap().as_str(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn azure_with_deployment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "azure-key"),
            ("OPENAI_AZURE_ENDPOINT", "https://example.openai.azure.com/"),
            ("OPENAI_AZURE_MODEL", "my-gpt35"),
            ("OPENAI_BASE_URL", "http://ignored"),
        ]))
        .unwrap();
        assert!(config.is_azure());
        assert_eq!(config.deployment_for("gpt-3.5-turbo"), "my-gpt35");
        assert_eq!(
            config.chat_completions_url("gpt-3.5-turbo").unwrap().as_str(),
            "https://example.openai.azure.com/openai/deployments/my-gpt35/chat/completions?api-version=2023-05-15"
        );
    }

    #[test]
    fn azure_deployment_defaults_to_model() {
        let config = ClientConfig::azure("azure-key", "https://example.openai.azure.com", None);
        assert_eq!(config.deployment_for("gpt-4"), "gpt-4");
        assert_eq!(
            config.chat_completions_url("gpt-4").unwrap().path(),
            "/openai/deployments/gpt-4/chat/completions"
        );
    }

    #[test]
    fn unparseable_endpoint() {
        let config = ClientConfig::openai("sk-test").with_base_url("not a url");
        assert!(config.chat_completions_url("gpt-4").is_err());
    }

    #[test]
    fn model_resolution() {
        assert_eq!(model_from_lookup(lookup(&[])), DEFAULT_MODEL);
        assert_eq!(model_from_lookup(lookup(&[("OPENAI_MODEL", "")])), DEFAULT_MODEL);
        assert_eq!(
            model_from_lookup(lookup(&[("OPENAI_MODEL", "gpt-4o")])),
            "gpt-4o"
        );
    }
}
