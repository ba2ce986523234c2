//! HTTP session transport.
//!
//! One [`SessionTransport`] holds the cookies and headers of a single
//! authenticated session and issues every protocol request through the same
//! connection pool. Keep-alive runs as pool-level idle activity so it never
//! races an in-flight long-poll on an active request.

use std::collections::HashMap;
use std::sync::Mutex;

use reqwest::multipart::Form;
use reqwest::{Client, Response};
use thiserror::Error;

use crate::config::ClientConfig;

/// Transport-level failures. Timeouts and connection failures are
/// recoverable by design: callers retry the same request after a fixed
/// backoff instead of tearing the session down.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("unexpected http status {0}")]
    Status(u16),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connection(err.to_string())
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Cookie-carrying HTTP session for one authenticated login.
pub struct SessionTransport {
    client: Client,
    /// Cookies observed on responses, kept for persistence and for the
    /// upload ticket. The jar inside `client` handles replay itself.
    seen_cookies: Mutex<HashMap<String, String>>,
}

impl SessionTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .timeout(config.request_timeout)
            .tcp_keepalive(config.keepalive)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            seen_cookies: Mutex::new(HashMap::new()),
        })
    }

    fn record_cookies(&self, response: &Response) {
        let mut seen = self.seen_cookies.lock().unwrap();
        for cookie in response.cookies() {
            seen.insert(cookie.name().to_string(), cookie.value().to_string());
        }
    }

    fn check_status(response: Response) -> Result<Response, TransportError> {
        let status = response.status();
        if status.is_success() || status.is_redirection() {
            Ok(response)
        } else {
            Err(TransportError::Status(status.as_u16()))
        }
    }

    pub async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        let response = self.client.get(url).send().await?;
        self.record_cookies(&response);
        let response = Self::check_status(response)?;
        Ok(response.text().await?)
    }

    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let response = self.client.get(url).send().await?;
        self.record_cookies(&response);
        let response = Self::check_status(response)?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let response = self
            .client
            .post(url)
            .header("content-type", "application/json;charset=UTF-8")
            .body(body.to_string())
            .send()
            .await?;
        self.record_cookies(&response);
        let response = Self::check_status(response)?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }

    /// POST with an empty body; some contact endpoints take all their
    /// arguments in the query string.
    pub async fn post_empty(&self, url: &str) -> Result<serde_json::Value, TransportError> {
        let response = self.client.post(url).send().await?;
        self.record_cookies(&response);
        let response = Self::check_status(response)?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }

    pub async fn post_multipart(
        &self,
        url: &str,
        form: Form,
    ) -> Result<serde_json::Value, TransportError> {
        let response = self.client.post(url).multipart(form).send().await?;
        self.record_cookies(&response);
        let response = Self::check_status(response)?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }

    pub async fn post_form(
        &self,
        url: &str,
        fields: &[(&str, &str)],
    ) -> Result<u16, TransportError> {
        let response = self.client.post(url).form(fields).send().await?;
        self.record_cookies(&response);
        Ok(response.status().as_u16())
    }

    /// One session cookie by name, if it has been observed.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.seen_cookies.lock().unwrap().get(name).cloned()
    }

    /// All session cookies observed so far, for persistence after login.
    pub fn session_cookies(&self) -> Vec<(String, String)> {
        let seen = self.seen_cookies.lock().unwrap();
        let mut cookies: Vec<(String, String)> =
            seen.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        cookies.sort();
        cookies
    }
}
