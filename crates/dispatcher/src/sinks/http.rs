//! HttpSink - POSTs each batch to a bulk endpoint

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use contracts::{BatchSink, ContractError};
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use tracing::{debug, instrument};

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Base URL, e.g. `http://localhost:9200`
    pub url: String,
    /// Request path appended to the URL
    pub path: String,
    /// Append `refresh=true` to every request
    pub refresh: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Content-Type header
    pub content_type: String,
}

impl HttpSinkConfig {
    /// Create config with defaults for the given base URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: "_bulk".to_string(),
            refresh: true,
            timeout: Duration::from_secs(60),
            content_type: "application/x-ndjson".to_string(),
        }
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let url = params
            .get("url")
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "missing 'url' parameter".to_string())?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(format!("invalid url '{}': expected http(s) scheme", url));
        }

        let mut config = Self::new(url.clone());

        if let Some(path) = params.get("path") {
            config.path = path.clone();
        }

        if let Some(refresh) = params.get("refresh") {
            config.refresh = refresh
                .parse()
                .map_err(|_| format!("invalid refresh flag '{}'", refresh))?;
        }

        if let Some(timeout) = params.get("timeout_secs") {
            let secs: u64 = timeout
                .parse()
                .map_err(|_| format!("invalid timeout_secs '{}'", timeout))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(content_type) = params.get("content_type") {
            config.content_type = content_type.clone();
        }

        Ok(config)
    }

    /// Full request URL without query string
    pub fn endpoint(&self) -> String {
        let base = self.url.trim_end_matches('/');
        let path = self.path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }
}

/// Sink that POSTs batches over HTTP
///
/// Any transport error or non-2xx status is a delivery error.
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSink {
    /// Create a new HttpSink
    #[instrument(name = "http_sink_new", skip(name, config), fields(url = %config.url))]
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        let endpoint = config.endpoint();
        debug!(sink = %name, endpoint = %endpoint, "HttpSink ready");

        Ok(Self {
            name,
            config,
            endpoint,
            client,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = HttpSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(&name, e))?;
        Self::new(name, config)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BatchSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn destination(&self) -> &str {
        &self.config.url
    }

    #[instrument(
        name = "http_sink_deliver",
        skip(self, payload),
        fields(sink = %self.name, bytes = payload.len())
    )]
    async fn deliver(&mut self, payload: &[u8], compressed: bool) -> Result<usize, ContractError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, self.config.content_type.as_str())
            .body(Bytes::copy_from_slice(payload));

        if compressed {
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if self.config.refresh {
            request = request.query(&[("refresh", "true")]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ContractError::sink_connection(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(512).collect();
            return Err(ContractError::sink_write(
                &self.name,
                format!("{} returned {}: {}", self.endpoint, status, snippet.trim()),
            ));
        }

        Ok(payload.len())
    }

    #[instrument(name = "http_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "HttpSink closed");
        Ok(())
    }
}
