// src/services/remote.rs

//! Client for an upstream tool server.
//!
//! Every operation is forwarded as `POST {endpoint}/tools/{operation}` with
//! the operation's parameters as the JSON body.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::CrawlTools;
use crate::error::{AppError, Result};
use crate::models::{
    BatchCrawlArgs, CrawlRequest, CrawlResponse, DeepCrawlArgs, EntityReport, ExtractEntitiesArgs,
    FileProcessRequest, GoogleBatchSearchRequest, GoogleSearchRequest, IntelligentExtractArgs,
    OperationName, Params, SearchAndCrawlArgs, SearchAndCrawlReport, SiteMap,
    StructuredExtractionRequest, UpstreamConfig,
};
use crate::utils::text::preview;

/// Longest upstream error body echoed into an error message.
const ERROR_BODY_PREVIEW: usize = 500;

#[derive(Debug, Clone)]
pub struct RemoteTools {
    client: Client,
    base: Url,
    api_key: Option<String>,
}

impl RemoteTools {
    /// Build a client when an endpoint is configured.
    pub fn from_config(config: &UpstreamConfig, user_agent: &str) -> Result<Option<Self>> {
        let Some(endpoint) = config.endpoint.as_deref() else {
            return Ok(None);
        };

        let mut base = Url::parse(endpoint)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            client,
            base,
            api_key: config.api_key.clone(),
        }))
    }

    pub fn endpoint(&self) -> &str {
        self.base.as_str()
    }

    fn tool_url(&self, operation: OperationName) -> Result<Url> {
        Ok(self.base.join(&format!("tools/{}", operation.as_str()))?)
    }

    /// Invoke `operation` upstream and return its JSON result.
    pub async fn call<P>(&self, operation: OperationName, params: &P) -> Result<Value>
    where
        P: Serialize + ?Sized + Sync,
    {
        let url = self.tool_url(operation)?;
        log::debug!("Forwarding {} to {}", operation, url);

        let mut request = self.client.post(url).json(params);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Upstream {} answered {}", operation, status);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message: preview(body.trim(), ERROR_BODY_PREVIEW),
            });
        }
        Ok(response.json().await?)
    }

    async fn call_as<P, T>(&self, operation: OperationName, params: &P) -> Result<T>
    where
        P: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let value = self.call(operation, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[async_trait]
impl CrawlTools for RemoteTools {
    async fn crawl_url(&self, request: CrawlRequest) -> Result<CrawlResponse> {
        self.call_as(OperationName::CrawlUrl, &request).await
    }

    async fn crawl_url_with_fallback(&self, request: CrawlRequest) -> Result<CrawlResponse> {
        self.call_as(OperationName::CrawlUrlWithFallback, &request)
            .await
    }

    async fn deep_crawl_site(&self, args: DeepCrawlArgs) -> Result<SiteMap> {
        self.call_as(OperationName::DeepCrawlSite, &args).await
    }

    async fn intelligent_extract(&self, args: IntelligentExtractArgs) -> Result<Value> {
        self.call(OperationName::IntelligentExtract, &args).await
    }

    async fn extract_entities(&self, args: ExtractEntitiesArgs) -> Result<EntityReport> {
        self.call_as(OperationName::ExtractEntities, &args).await
    }

    async fn extract_structured_data(
        &self,
        request: StructuredExtractionRequest,
    ) -> Result<CrawlResponse> {
        self.call_as(OperationName::ExtractStructuredData, &request)
            .await
    }

    async fn process_file(&self, request: FileProcessRequest) -> Result<Value> {
        self.call(OperationName::ProcessFile, &request).await
    }

    async fn extract_youtube_transcript(&self, params: Params) -> Result<Value> {
        self.call(OperationName::ExtractYoutubeTranscript, &params)
            .await
    }

    async fn batch_extract_youtube_transcripts(&self, params: Params) -> Result<Value> {
        self.call(OperationName::BatchExtractYoutubeTranscripts, &params)
            .await
    }

    async fn search_google(&self, request: GoogleSearchRequest) -> Result<Value> {
        self.call(OperationName::SearchGoogle, &request).await
    }

    async fn batch_search_google(&self, request: GoogleBatchSearchRequest) -> Result<Value> {
        self.call(OperationName::BatchSearchGoogle, &request).await
    }

    async fn search_and_crawl(&self, args: SearchAndCrawlArgs) -> Result<SearchAndCrawlReport> {
        self.call_as(OperationName::SearchAndCrawl, &args).await
    }

    async fn batch_crawl(&self, args: BatchCrawlArgs) -> Result<Vec<CrawlResponse>> {
        self.call_as(OperationName::BatchCrawl, &args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upstream(endpoint: Option<&str>) -> UpstreamConfig {
        UpstreamConfig {
            endpoint: endpoint.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_endpoint_means_no_client() {
        assert!(
            RemoteTools::from_config(&upstream(None), "agent")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_tool_url_keeps_base_path() {
        let remote = RemoteTools::from_config(&upstream(Some("http://tools.local:8000/api")), "agent")
            .unwrap()
            .unwrap();
        assert_eq!(remote.endpoint(), "http://tools.local:8000/api/");
        assert_eq!(
            remote
                .tool_url(OperationName::ExtractYoutubeTranscript)
                .unwrap()
                .as_str(),
            "http://tools.local:8000/api/tools/extract_youtube_transcript"
        );
    }

    #[test]
    fn test_invalid_endpoint_is_error() {
        assert!(matches!(
            RemoteTools::from_config(&upstream(Some("::nope")), "agent"),
            Err(AppError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_operation_failure() {
        let remote = RemoteTools::from_config(&upstream(Some("http://127.0.0.1:9")), "agent")
            .unwrap()
            .unwrap();
        let err = remote
            .search_google(GoogleSearchRequest::new("rust"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::OperationFailure);
    }
}
