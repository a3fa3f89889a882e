// src/utils/http.rs

//! HTTP client utilities.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, COOKIE, USER_AGENT};

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Per-request overrides on top of the client defaults.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub auth_token: Option<String>,
}

/// A fetched HTML document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
    pub truncated: bool,
}

/// Fetch a page, keeping at most `max_bytes` of its body.
///
/// Non-success statuses are errors.
pub async fn fetch_page_async(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
    max_bytes: usize,
) -> Result<FetchedPage> {
    let mut request = client.get(url);
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }
    if let Some(agent) = &options.user_agent {
        request = request.header(USER_AGENT, agent);
    }
    for (name, value) in &options.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if !options.cookies.is_empty() {
        let cookie = options
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        request = request.header(COOKIE, cookie);
    }
    if let Some(token) = &options.auth_token {
        request = request.header(AUTHORIZATION, format!("Bearer {token}"));
    }

    let mut response = request.send().await?.error_for_status()?;
    let status = response.status().as_u16();
    let final_url = response.url().to_string();

    let mut bytes = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = response.chunk().await? {
        let room = max_bytes.saturating_sub(bytes.len());
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    if truncated {
        log::warn!("Body of {} truncated at {} bytes", final_url, max_bytes);
    }

    Ok(FetchedPage {
        url: final_url,
        status,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_async_client() {
        assert!(create_async_client(&CrawlerConfig::default()).is_ok());
    }

    #[test]
    fn test_fetch_options_default_is_empty() {
        let options = FetchOptions::default();
        assert!(options.timeout.is_none());
        assert!(options.headers.is_empty());
        assert!(options.cookies.is_empty());
    }
}
