//! HTTP utilities for REST API calls

use crate::error::{ApiError, Result};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use url::Url;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header carrying the JSON filter of a list request
pub const FILTER_HEADER: &str = "X-Filter";

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
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

/// HTTP client wrapper for API calls
#[derive(Debug, Clone)]
pub struct ApiHttpClient {
    client: Client,
}

impl ApiHttpClient {
    /// Create a new HTTP client
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let request = self.client.request(method, url);
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Make a GET request, with an optional `X-Filter` header
    pub async fn get(&self, url: Url, token: Option<&str>, filter: Option<&str>) -> Result<Value> {
        tracing::debug!("GET {}", url);

        let mut request = self.request(Method::GET, url, token);
        if let Some(filter) = filter {
            tracing::debug!("{}: {}", FILTER_HEADER, filter);
            request = request.header(FILTER_HEADER, filter);
        }

        self.send(request).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: Url, token: Option<&str>, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);
        self.send(self.request(Method::POST, url, token).json(body))
            .await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, url: Url, token: Option<&str>, body: &Value) -> Result<Value> {
        tracing::debug!("PUT {}", url);
        self.send(self.request(Method::PUT, url, token).json(body))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: Url, token: Option<&str>) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        self.send(self.request(Method::DELETE, url, token)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(ApiError::from_response(status.as_u16(), &body).into());
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&body)?)
    }
}
