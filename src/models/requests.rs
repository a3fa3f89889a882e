// src/models/requests.rs

//! Typed parameter models for the gateway's operations.
//!
//! Request objects (`*Request`) ignore fields they do not know, the way a
//! structured request model does. Keyword argument sets (`*Args`) reject
//! unknown fields, the way a call with an unexpected keyword fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Params;

/// Traversal order for multi-page crawls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlStrategy {
    Bfs,
    Dfs,
    BestFirst,
}

impl CrawlStrategy {
    /// Unrecognized names fall back to breadth-first.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "dfs" => CrawlStrategy::Dfs,
            "best_first" => CrawlStrategy::BestFirst,
            _ => CrawlStrategy::Bfs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlStrategy::Bfs => "bfs",
            CrawlStrategy::Dfs => "dfs",
            CrawlStrategy::BestFirst => "best_first",
        }
    }
}

/// Request model for crawling operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlRequest {
    /// URL to crawl
    pub url: String,

    /// CSS selector scoping the extracted content
    #[serde(default)]
    pub css_selector: Option<String>,

    /// XPath selector (accepted for compatibility, not evaluated natively)
    #[serde(default)]
    pub xpath: Option<String>,

    #[serde(default)]
    pub extract_media: bool,

    #[serde(default)]
    pub take_screenshot: bool,

    #[serde(default = "defaults::yes")]
    pub generate_markdown: bool,

    #[serde(default)]
    pub wait_for_selector: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::crawl_timeout")]
    pub timeout: u64,

    // Deep crawling
    /// Maximum crawling depth (None for single page)
    #[serde(default)]
    pub max_depth: Option<u32>,

    #[serde(default = "defaults::crawl_max_pages")]
    pub max_pages: Option<u32>,

    #[serde(default)]
    pub include_external: bool,

    #[serde(default = "defaults::strategy")]
    pub crawl_strategy: String,

    /// URL pattern filter (e.g., '*docs*')
    #[serde(default)]
    pub url_pattern: Option<String>,

    #[serde(default = "defaults::score_threshold")]
    pub score_threshold: f64,

    // Content processing
    #[serde(default)]
    pub content_filter: Option<String>,

    #[serde(default)]
    pub filter_query: Option<String>,

    #[serde(default)]
    pub chunk_content: bool,

    #[serde(default = "defaults::chunk_strategy")]
    pub chunk_strategy: String,

    /// Maximum chunk size in words
    #[serde(default = "defaults::chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "defaults::overlap_rate")]
    pub overlap_rate: f64,

    // Browser configuration
    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default = "defaults::yes")]
    pub enable_caching: bool,

    #[serde(default = "defaults::cache_mode")]
    pub cache_mode: String,

    // JavaScript and interaction
    #[serde(default)]
    pub execute_js: Option<String>,

    #[serde(default)]
    pub wait_for_js: bool,

    #[serde(default)]
    pub simulate_user: bool,

    // Authentication
    #[serde(default)]
    pub auth_token: Option<String>,

    #[serde(default)]
    pub cookies: Option<BTreeMap<String, String>>,
}

impl CrawlRequest {
    /// A request for `url` with every other field at its default.
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            css_selector: None,
            xpath: None,
            extract_media: false,
            take_screenshot: false,
            generate_markdown: true,
            wait_for_selector: None,
            timeout: defaults::crawl_timeout(),
            max_depth: None,
            max_pages: defaults::crawl_max_pages(),
            include_external: false,
            crawl_strategy: defaults::strategy(),
            url_pattern: None,
            score_threshold: defaults::score_threshold(),
            content_filter: None,
            filter_query: None,
            chunk_content: false,
            chunk_strategy: defaults::chunk_strategy(),
            chunk_size: defaults::chunk_size(),
            overlap_rate: defaults::overlap_rate(),
            user_agent: None,
            headers: None,
            enable_caching: true,
            cache_mode: defaults::cache_mode(),
            execute_js: None,
            wait_for_js: false,
            simulate_user: false,
            auth_token: None,
            cookies: None,
        }
    }

    pub fn strategy(&self) -> CrawlStrategy {
        CrawlStrategy::from_name(&self.crawl_strategy)
    }

    /// Deep crawl requested with a positive depth.
    pub fn deep_depth(&self) -> Option<u32> {
        self.max_depth.filter(|depth| *depth > 0)
    }
}

/// Request model for structured data extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredExtractionRequest {
    pub url: String,

    /// JSON schema describing the fields to extract
    pub schema: Params,

    /// 'css' or 'llm'
    #[serde(default = "defaults::extraction_type")]
    pub extraction_type: String,

    #[serde(default)]
    pub css_selectors: Option<BTreeMap<String, String>>,

    #[serde(default = "defaults::llm_provider_opt")]
    pub llm_provider: Option<String>,

    #[serde(default = "defaults::llm_model_opt")]
    pub llm_model: Option<String>,
}

/// Request model for document processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProcessRequest {
    pub url: String,

    #[serde(default = "defaults::max_size_mb")]
    pub max_size_mb: u32,

    #[serde(default = "defaults::yes")]
    pub extract_all_from_zip: bool,

    #[serde(default = "defaults::yes")]
    pub include_metadata: bool,
}

/// Request model for a single web search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleSearchRequest {
    pub query: String,

    #[serde(default = "defaults::num_results")]
    pub num_results: u32,

    #[serde(default)]
    pub search_genre: Option<String>,

    #[serde(default = "defaults::language")]
    pub language: String,

    #[serde(default = "defaults::region")]
    pub region: String,

    #[serde(default)]
    pub recent_days: Option<u32>,

    #[serde(default = "defaults::yes")]
    pub safe_search: bool,
}

impl GoogleSearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: defaults::num_results(),
            search_genre: None,
            language: defaults::language(),
            region: defaults::region(),
            recent_days: None,
            safe_search: true,
        }
    }
}

/// Request model for several web searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleBatchSearchRequest {
    pub queries: Vec<String>,

    #[serde(default = "defaults::num_results")]
    pub num_results_per_query: u32,

    #[serde(default = "defaults::search_concurrency")]
    pub max_concurrent: u32,

    #[serde(default)]
    pub search_genre: Option<String>,

    #[serde(default = "defaults::language")]
    pub language: String,

    #[serde(default = "defaults::region")]
    pub region: String,

    #[serde(default)]
    pub recent_days: Option<u32>,
}

/// Arguments of `deep_crawl_site`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeepCrawlArgs {
    pub url: String,

    #[serde(default = "defaults::deep_max_depth")]
    pub max_depth: u32,

    #[serde(default = "defaults::deep_max_pages")]
    pub max_pages: u32,

    #[serde(default = "defaults::strategy")]
    pub crawl_strategy: String,

    #[serde(default)]
    pub include_external: bool,

    #[serde(default)]
    pub url_pattern: Option<String>,

    #[serde(default = "defaults::score_threshold")]
    pub score_threshold: f64,

    #[serde(default)]
    pub extract_media: bool,
}

impl DeepCrawlArgs {
    pub fn strategy(&self) -> CrawlStrategy {
        CrawlStrategy::from_name(&self.crawl_strategy)
    }
}

/// Arguments of `intelligent_extract`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntelligentExtractArgs {
    pub url: String,

    /// What to extract (e.g. "product information")
    pub extraction_goal: String,

    #[serde(default = "defaults::content_filter")]
    pub content_filter: String,

    #[serde(default)]
    pub filter_query: Option<String>,

    #[serde(default)]
    pub chunk_content: bool,

    #[serde(default = "defaults::yes")]
    pub use_llm: bool,

    #[serde(default = "defaults::llm_provider")]
    pub llm_provider: String,

    #[serde(default = "defaults::llm_model")]
    pub llm_model: String,

    #[serde(default)]
    pub custom_instructions: Option<String>,
}

/// Arguments of `extract_entities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractEntitiesArgs {
    pub url: String,

    /// Built-in entity types (emails, phones, urls, ...)
    pub entity_types: Vec<String>,

    /// Extra named regex patterns
    #[serde(default)]
    pub custom_patterns: Option<BTreeMap<String, String>>,

    #[serde(default = "defaults::yes")]
    pub include_context: bool,

    #[serde(default = "defaults::yes")]
    pub deduplicate: bool,
}

/// Arguments of `batch_crawl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchCrawlArgs {
    pub urls: Vec<String>,

    /// Crawl options applied to every URL
    #[serde(default)]
    pub config: Option<Params>,
}

/// Arguments of `search_and_crawl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchAndCrawlArgs {
    pub search_query: String,

    #[serde(default = "defaults::search_results")]
    pub num_search_results: u32,

    #[serde(default = "defaults::crawl_top_results")]
    pub crawl_top_results: u32,

    #[serde(default)]
    pub extract_media: bool,

    #[serde(default = "defaults::yes")]
    pub generate_markdown: bool,

    #[serde(default)]
    pub search_genre: Option<String>,
}

mod defaults {
    pub fn yes() -> bool {
        true
    }
    pub fn crawl_timeout() -> u64 {
        30
    }
    pub fn crawl_max_pages() -> Option<u32> {
        Some(10)
    }
    pub fn strategy() -> String {
        "bfs".into()
    }
    pub fn score_threshold() -> f64 {
        0.3
    }
    pub fn chunk_strategy() -> String {
        "topic".into()
    }
    pub fn chunk_size() -> usize {
        1000
    }
    pub fn overlap_rate() -> f64 {
        0.1
    }
    pub fn cache_mode() -> String {
        "enabled".into()
    }
    pub fn extraction_type() -> String {
        "css".into()
    }
    pub fn llm_provider() -> String {
        "openai".into()
    }
    pub fn llm_model() -> String {
        "gpt-3.5-turbo".into()
    }
    pub fn llm_provider_opt() -> Option<String> {
        Some(llm_provider())
    }
    pub fn llm_model_opt() -> Option<String> {
        Some(llm_model())
    }
    pub fn max_size_mb() -> u32 {
        100
    }
    pub fn num_results() -> u32 {
        10
    }
    pub fn search_concurrency() -> u32 {
        3
    }
    pub fn language() -> String {
        "en".into()
    }
    pub fn region() -> String {
        "us".into()
    }
    pub fn deep_max_depth() -> u32 {
        2
    }
    pub fn deep_max_pages() -> u32 {
        20
    }
    pub fn content_filter() -> String {
        "bm25".into()
    }
    pub fn search_results() -> u32 {
        5
    }
    pub fn crawl_top_results() -> u32 {
        3
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_crawl_request_defaults() {
        let req: CrawlRequest = serde_json::from_value(json!({ "url": "https://example.com" })).unwrap();
        assert!(req.generate_markdown);
        assert!(!req.extract_media);
        assert_eq!(req.timeout, 30);
        assert_eq!(req.max_pages, Some(10));
        assert_eq!(req.strategy(), CrawlStrategy::Bfs);
        assert!(req.deep_depth().is_none());
    }

    #[test]
    fn test_crawl_request_ignores_unknown_fields() {
        let req: CrawlRequest =
            serde_json::from_value(json!({ "url": "https://example.com", "colour": "blue" }))
                .unwrap();
        assert_eq!(req.url, "https://example.com");
    }

    #[test]
    fn test_crawl_request_requires_url() {
        let result = serde_json::from_value::<CrawlRequest>(json!({ "timeout": 5 }));
        assert!(result.unwrap_err().to_string().contains("missing field `url`"));
    }

    #[test]
    fn test_for_url() {
        let req = CrawlRequest::for_url("https://example.com/a");
        assert_eq!(req.url, "https://example.com/a");
        assert_eq!(req.chunk_size, 1000);
    }

    #[test]
    fn test_keyword_args_reject_unknown_fields() {
        let result = serde_json::from_value::<DeepCrawlArgs>(
            json!({ "url": "https://docs.example.com", "depth": 3 }),
        );
        assert!(result.unwrap_err().to_string().contains("unknown field `depth`"));
    }

    #[test]
    fn test_deep_crawl_defaults() {
        let args: DeepCrawlArgs =
            serde_json::from_value(json!({ "url": "https://docs.example.com", "crawl_strategy": "DFS" }))
                .unwrap();
        assert_eq!(args.max_depth, 2);
        assert_eq!(args.max_pages, 20);
        assert_eq!(args.strategy(), CrawlStrategy::Dfs);
    }

    #[test]
    fn test_unknown_strategy_falls_back_to_bfs() {
        assert_eq!(CrawlStrategy::from_name("random"), CrawlStrategy::Bfs);
        assert_eq!(CrawlStrategy::from_name("best_first"), CrawlStrategy::BestFirst);
    }
}
