//! HTTP client for the console REST API

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Session expired or missing; the console sends the user to login
    #[error("unauthorized: {method} {path}")]
    Unauthorized { method: String, path: String },
    #[error("API request failed: {status}")]
    Status { status: StatusCode },
}

/// HTTP client wrapper for console API calls
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
    organization: Option<String>,
}

impl ApiClient {
    /// Create a client for `base_url` (scheme and host, optional path prefix)
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .with_context(|| format!("Invalid base URL: {}", base_url))?;

        let client = Client::builder()
            .user_agent(format!("cloudcache/{}", crate::VERSION))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            csrf_token: None,
            organization: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut client = Self::new(&config.effective_base_url())?;
        client.csrf_token = config.csrf_token.clone();
        client.organization = config.organization.clone();
        Ok(client)
    }

    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        request = request.header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.csrf_token {
            request = request.header("Csrf-Token", token);
        }
        if let Some(org) = &self.organization {
            request = request.header("Organization", org);
        }
        request
    }

    /// GET `path` with query parameters
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<Value> {
        tracing::debug!("GET {} {:?}", path, query);
        let request = self.client.get(self.url(path)).query(query);
        self.send("GET", path, request).await
    }

    /// PUT a JSON body to `path`
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", path);
        let request = self.client.put(self.url(path)).json(body);
        self.send("PUT", path, request).await
    }

    /// POST a JSON body to `path`
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", path);
        let request = self.client.post(self.url(path)).json(body);
        self.send("POST", path, request).await
    }

    /// DELETE `path`, with a JSON body for bulk deletes
    pub async fn delete(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("DELETE {}", path);
        let mut request = self.client.delete(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send("DELETE", path, request).await
    }

    async fn send(&self, method: &str, path: &str, request: RequestBuilder) -> Result<Value> {
        let response = self
            .headers(request)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("{} {} returned 401", method, path);
            return Err(ApiError::Unauthorized {
                method: method.to_string(),
                path: path.to_string(),
            }
            .into());
        }

        if !status.is_success() {
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::Status { status }.into());
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// True when `error` came from a 401 response
pub fn is_unauthorized(error: &anyhow::Error) -> bool {
    matches!(
        error.downcast_ref::<ApiError>(),
        Some(ApiError::Unauthorized { .. })
    )
}

/// Format an API error for display
pub fn format_api_error(error: &anyhow::Error) -> String {
    match error.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized { .. }) => {
            return "Session expired. Log in again and refresh the CSRF token.".to_string();
        }
        Some(ApiError::Status { status }) => {
            return match status.as_u16() {
                400 => "Invalid request. Check your parameters.".to_string(),
                403 => "Permission denied for this organization.".to_string(),
                404 => "Resource not found.".to_string(),
                409 => "Resource conflict. The resource may already exist or be in use."
                    .to_string(),
                429 => "Rate limit exceeded. Please try again later.".to_string(),
                500..=599 => "Service temporarily unavailable. Please try again.".to_string(),
                _ => "Request failed. Check your network connection and try again.".to_string(),
            };
        }
        None => {}
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
