// src/services/native.rs

//! Native implementations of the page operations.
//!
//! Fetching, traversal, filtering and pattern extraction run in-process.
//! Operations that need a browser, a language model or a search backend
//! are forwarded to the upstream tool server when one is configured.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use regex::Regex;
use reqwest::Client;
use serde_json::{Value, json};

use super::page::select_fields;
use super::{CrawlTools, EntityExtractor, PageSnapshot, RemoteTools};
use crate::error::{AppError, Result};
use crate::models::{
    BatchCrawlArgs, Config, CrawlRequest, CrawlResponse, CrawlStrategy, CrawlerConfig,
    DeepCrawlArgs, EntityMetadata, EntityReport, ExtractEntitiesArgs, FileProcessRequest,
    GoogleBatchSearchRequest, GoogleSearchRequest, IntelligentExtractArgs, OperationName, Params,
    PageSummary, SearchAndCrawlArgs, SearchAndCrawlReport, SiteMap, StructuredExtractionRequest,
};
use crate::utils::http::{FetchOptions, FetchedPage, create_async_client, fetch_page_async};
use crate::utils::text::{self, preview};
use crate::utils::url::{glob_to_regex, normalize, path_depth, same_domain, section_of};

/// Characters kept in page previews.
const PREVIEW_CHARS: usize = 200;

/// User agent tried when the default one is refused.
const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Upper bound on the timeout of the last fallback attempt.
const FALLBACK_MAX_TIMEOUT_SECS: u64 = 120;

/// In-process operation backend.
#[derive(Debug, Clone)]
pub struct NativeTools {
    crawler: CrawlerConfig,
    client: Client,
    entities: EntityExtractor,
    upstream: Option<RemoteTools>,
}

impl NativeTools {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_async_client(&config.crawler)?,
            entities: EntityExtractor::new()?,
            upstream: RemoteTools::from_config(&config.upstream, &config.crawler.user_agent)?,
            crawler: config.crawler.clone(),
        })
    }

    /// Replace the HTTP client used for page fetches.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_upstream(mut self, upstream: Option<RemoteTools>) -> Self {
        self.upstream = upstream;
        self
    }

    fn upstream(&self, operation: OperationName) -> Result<&RemoteTools> {
        self.upstream.as_ref().ok_or_else(|| {
            AppError::unavailable(
                operation.as_str(),
                "it requires an upstream tool server and none is configured",
            )
        })
    }

    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage> {
        fetch_page_async(&self.client, url, options, self.crawler.max_body_bytes).await
    }

    async fn snapshot(
        &self,
        url: &str,
        options: &FetchOptions,
        css_selector: Option<&str>,
    ) -> Result<PageSnapshot> {
        let page = self.fetch(url, options).await?;
        PageSnapshot::parse(&page.url, &page.body, css_selector)
    }

    /// Crawl one request, reporting failures inside the response.
    async fn crawl(&self, request: &CrawlRequest) -> CrawlResponse {
        self.try_crawl(request).await.unwrap_or_else(|e| {
            log::warn!("Crawl of {} failed: {}", request.url, e);
            CrawlResponse::failure(&request.url, format!("Crawling error: {e}"))
        })
    }

    async fn try_crawl(&self, request: &CrawlRequest) -> Result<CrawlResponse> {
        ignore_browser_options(request);
        match request.deep_depth() {
            Some(depth) => self.crawl_deep(request, depth).await,
            None => self.crawl_single(request).await,
        }
    }

    async fn crawl_single(&self, request: &CrawlRequest) -> Result<CrawlResponse> {
        let page = self
            .snapshot(
                &request.url,
                &fetch_options(request),
                request.css_selector.as_deref(),
            )
            .await?;

        let content = shape_text(&page.text, request);
        let markdown = request
            .generate_markdown
            .then(|| shape_text(&page.markdown, request));
        let extracted_data = request
            .chunk_content
            .then(|| Value::Object(chunk_data(&content, request)));

        Ok(CrawlResponse {
            success: true,
            url: request.url.clone(),
            title: page.title,
            content: Some(content),
            markdown,
            media: request.extract_media.then_some(page.media),
            screenshot: None,
            extracted_data,
            error: None,
        })
    }

    async fn crawl_deep(&self, request: &CrawlRequest, depth: u32) -> Result<CrawlResponse> {
        let plan = WalkPlan {
            start: &request.url,
            max_depth: depth,
            max_pages: self.page_cap(request.max_pages.unwrap_or(self.crawler.max_pages_limit)),
            strategy: request.strategy(),
            include_external: request.include_external,
            url_filter: request.url_pattern.as_deref().map(glob_to_regex).transpose()?,
            score_threshold: request.score_threshold,
            css_selector: request.css_selector.as_deref(),
            options: fetch_options(request),
        };
        let walk = self.walk(&plan).await?;

        let content = shape_text(&join_pages(&walk.pages, |p| p.text.as_str()), request);
        let markdown = request
            .generate_markdown
            .then(|| shape_text(&join_pages(&walk.pages, |p| p.markdown.as_str()), request));

        let mut data = Params::new();
        data.insert("crawled_pages".into(), json!(walk.pages.len()));
        data.insert(
            "pages".into(),
            Value::Array(
                walk.pages
                    .iter()
                    .map(|visit| {
                        json!({
                            "url": visit.page.url,
                            "title": visit.page.title,
                            "depth": visit.depth,
                        })
                    })
                    .collect(),
            ),
        );
        if !walk.failed.is_empty() {
            data.insert("failed_urls".into(), json!(walk.failed));
        }
        if request.chunk_content {
            data.extend(chunk_data(&content, request));
        }

        let first = walk.pages.first().map(|visit| &visit.page);
        Ok(CrawlResponse {
            success: true,
            url: request.url.clone(),
            title: first.and_then(|page| page.title.clone()),
            content: Some(content),
            markdown,
            media: request.extract_media.then(|| {
                let mut media = Vec::new();
                for visit in &walk.pages {
                    for item in &visit.page.media {
                        if !media.contains(item) {
                            media.push(item.clone());
                        }
                    }
                }
                media
            }),
            screenshot: None,
            extracted_data: Some(Value::Object(data)),
            error: None,
        })
    }

    fn page_cap(&self, requested: u32) -> usize {
        requested.min(self.crawler.max_pages_limit).max(1) as usize
    }

    /// Traverse a site from `plan.start`.
    ///
    /// Fails only when the starting page cannot be fetched. Later failures
    /// are collected in `failed`.
    async fn walk(&self, plan: &WalkPlan<'_>) -> Result<Walk> {
        let start = normalize(plan.start)
            .ok_or_else(|| AppError::validation(format!("Invalid URL: {}", plan.start)))?;

        let mut frontier = VecDeque::from([Candidate {
            url: plan.start.to_string(),
            depth: 0,
            score: 1.0,
        }]);
        let mut seen: HashSet<String> = HashSet::from([start]);
        let mut hashes: HashSet<String> = HashSet::new();
        let mut walk = Walk::default();

        while walk.pages.len() < plan.max_pages {
            let Some(next) = take_next(&mut frontier, plan.strategy) else {
                break;
            };

            let page = match self
                .snapshot(&next.url, &plan.options, plan.css_selector)
                .await
            {
                Ok(page) => page,
                Err(e) if next.depth == 0 => return Err(e),
                Err(e) => {
                    log::warn!("Skipping {}: {}", next.url, e);
                    walk.failed.push(next.url);
                    continue;
                }
            };

            let hash = page.content_hash();
            if !hashes.insert(hash.clone()) {
                log::debug!("Duplicate content at {}", next.url);
                walk.duplicates += 1;
                continue;
            }

            if next.depth < plan.max_depth {
                let mut children = Vec::new();
                for link in &page.links {
                    if !plan.admits(link) {
                        continue;
                    }
                    let Some(key) = normalize(link) else {
                        continue;
                    };
                    let score = relevance(plan.start, link);
                    if plan.strategy == CrawlStrategy::BestFirst && score < plan.score_threshold {
                        continue;
                    }
                    if seen.insert(key) {
                        children.push(Candidate {
                            url: link.clone(),
                            depth: next.depth + 1,
                            score,
                        });
                    }
                }
                if plan.strategy == CrawlStrategy::Dfs {
                    children.reverse();
                }
                frontier.extend(children);
            }

            walk.pages.push(Visit {
                depth: next.depth,
                hash,
                page,
            });
        }

        log::info!(
            "Walked {} pages from {} ({} duplicates, {} failed)",
            walk.pages.len(),
            plan.start,
            walk.duplicates,
            walk.failed.len()
        );
        Ok(walk)
    }

    async fn crawl_css(
        &self,
        request: &StructuredExtractionRequest,
        selectors: &BTreeMap<String, String>,
    ) -> Result<CrawlResponse> {
        let fetched = self.fetch(&request.url, &FetchOptions::default()).await?;
        let fields = select_fields(&fetched.body, selectors)?;
        let page = PageSnapshot::parse(&fetched.url, &fetched.body, None)?;
        Ok(CrawlResponse {
            success: true,
            url: request.url.clone(),
            title: page.title,
            content: Some(page.text),
            markdown: Some(page.markdown),
            extracted_data: Some(Value::Object(fields)),
            ..Default::default()
        })
    }

    async fn crawl_all(&self, requests: Vec<CrawlRequest>) -> Vec<CrawlResponse> {
        stream::iter(requests)
            .map(|request| async move { self.crawl(&request).await })
            .buffered(self.crawler.max_concurrent.max(1))
            .collect()
            .await
    }
}

#[async_trait]
impl CrawlTools for NativeTools {
    async fn crawl_url(&self, request: CrawlRequest) -> Result<CrawlResponse> {
        Ok(self.crawl(&request).await)
    }

    async fn crawl_url_with_fallback(&self, request: CrawlRequest) -> Result<CrawlResponse> {
        let mut last_error = String::new();
        for (i, attempt) in fallback_plan(&request).iter().enumerate() {
            let n = i + 1;
            match self.try_crawl(attempt).await {
                Ok(response) if response.success => {
                    if n > 1 {
                        log::info!("{} succeeded with fallback strategy {}", request.url, n);
                    }
                    return Ok(response);
                }
                Ok(response) => {
                    last_error = format!(
                        "Strategy {n} failed: {}",
                        response.error.unwrap_or_default()
                    );
                }
                Err(e) => last_error = format!("Strategy {n} error: {e}"),
            }
            log::warn!("{}", last_error);
        }
        Ok(CrawlResponse::failure(
            &request.url,
            format!("All crawling strategies failed. Last error: {last_error}"),
        ))
    }

    async fn deep_crawl_site(&self, args: DeepCrawlArgs) -> Result<SiteMap> {
        let strategy = args.strategy();
        let plan = WalkPlan {
            start: &args.url,
            max_depth: args.max_depth,
            max_pages: self.page_cap(args.max_pages),
            strategy,
            include_external: args.include_external,
            url_filter: args.url_pattern.as_deref().map(glob_to_regex).transpose()?,
            score_threshold: args.score_threshold,
            css_selector: None,
            options: FetchOptions::default(),
        };

        let walk = match self.walk(&plan).await {
            Ok(walk) => walk,
            Err(e) => {
                return Ok(SiteMap::failure(
                    &args.url,
                    strategy.as_str(),
                    format!("Deep crawl error: {e}"),
                ));
            }
        };

        let mut site_structure: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut total_chars = 0;
        let pages: Vec<PageSummary> = walk
            .pages
            .into_iter()
            .map(|visit| {
                let page = visit.page;
                let content_length = page.text.chars().count();
                total_chars += content_length;
                site_structure
                    .entry(section_of(&page.url))
                    .or_default()
                    .push(page.url.clone());
                PageSummary {
                    title: page.title.unwrap_or_default(),
                    depth: visit.depth,
                    content_length,
                    links_found: page.links.len(),
                    content_preview: preview(&page.text, PREVIEW_CHARS),
                    markdown_preview: preview(&page.markdown, PREVIEW_CHARS),
                    content_hash: visit.hash,
                    media: if args.extract_media {
                        page.media
                    } else {
                        Vec::new()
                    },
                    url: page.url,
                }
            })
            .collect();

        Ok(SiteMap {
            success: true,
            starting_url: args.url,
            strategy_used: strategy.as_str().to_string(),
            total_pages_crawled: pages.len(),
            content_summary: format!(
                "Crawled {} pages with {} characters of content",
                pages.len(),
                total_chars
            ),
            pages,
            site_structure,
            duplicates_skipped: walk.duplicates,
            failed_urls: walk.failed,
            error: None,
        })
    }

    async fn intelligent_extract(&self, args: IntelligentExtractArgs) -> Result<Value> {
        if args.use_llm {
            return self
                .upstream(OperationName::IntelligentExtract)?
                .intelligent_extract(args)
                .await;
        }

        let page = match self.snapshot(&args.url, &FetchOptions::default(), None).await {
            Ok(page) => page,
            Err(e) => {
                return Ok(json!({
                    "success": false,
                    "url": args.url,
                    "error": format!("Intelligent extraction error: {e}"),
                }));
            }
        };

        let query = args
            .filter_query
            .as_deref()
            .unwrap_or(args.extraction_goal.as_str());
        let content = text::filter_content(&page.text, &args.content_filter, Some(query));
        let mut result = json!({
            "success": true,
            "url": args.url,
            "title": page.title,
            "extraction_goal": args.extraction_goal,
            "content_filter": args.content_filter,
            "content": content,
        });
        if args.chunk_content {
            let chunks = text::chunk(&content, "topic", 1000, 0.1);
            result["chunk_count"] = json!(chunks.len());
            result["chunks"] = json!(chunks);
        }
        Ok(result)
    }

    async fn extract_entities(&self, args: ExtractEntitiesArgs) -> Result<EntityReport> {
        let requested = args.entity_types.clone();
        let patterns = match self
            .entities
            .patterns(&args.entity_types, args.custom_patterns.as_ref())
        {
            Ok(patterns) => patterns,
            Err(e) => {
                return Ok(EntityReport::failure(
                    args.url,
                    requested,
                    format!("Invalid custom pattern: {e}"),
                ));
            }
        };
        if patterns.is_empty() {
            let mut report = EntityReport::failure(
                args.url,
                requested,
                "No valid entity types or patterns provided",
            );
            report.available_types = Some(self.entities.available_types());
            return Ok(report);
        }

        let page = match self.snapshot(&args.url, &FetchOptions::default(), None).await {
            Ok(page) => page,
            Err(e) => {
                return Ok(EntityReport::failure(
                    args.url,
                    requested,
                    format!("Entity extraction error: {e}"),
                ));
            }
        };

        let groups = self
            .entities
            .extract(&page.text, &patterns, args.deduplicate, args.include_context);
        Ok(EntityReport {
            url: args.url,
            success: true,
            entity_types_requested: requested,
            total_entities_found: Some(groups.values().map(|g| g.count).sum()),
            entities: Some(groups),
            metadata: Some(EntityMetadata {
                title: page.title,
                content_length: page.text.chars().count(),
                deduplicated: args.deduplicate,
                context_included: args.include_context,
            }),
            error: None,
            available_types: None,
        })
    }

    async fn extract_structured_data(
        &self,
        request: StructuredExtractionRequest,
    ) -> Result<CrawlResponse> {
        match request.extraction_type.trim().to_lowercase().as_str() {
            "llm" => {
                self.upstream(OperationName::ExtractStructuredData)?
                    .extract_structured_data(request)
                    .await
            }
            "css" => match request.css_selectors.as_ref().filter(|s| !s.is_empty()) {
                Some(selectors) => Ok(self
                    .crawl_css(&request, selectors)
                    .await
                    .unwrap_or_else(|e| {
                        CrawlResponse::failure(
                            &request.url,
                            format!("Structured extraction error: {e}"),
                        )
                    })),
                None => Ok(CrawlResponse::failure(
                    &request.url,
                    "Invalid extraction type or missing CSS selectors",
                )),
            },
            _ => Ok(CrawlResponse::failure(
                &request.url,
                "Invalid extraction type or missing CSS selectors",
            )),
        }
    }

    async fn process_file(&self, request: FileProcessRequest) -> Result<Value> {
        self.upstream(OperationName::ProcessFile)?
            .process_file(request)
            .await
    }

    async fn extract_youtube_transcript(&self, params: Params) -> Result<Value> {
        self.upstream(OperationName::ExtractYoutubeTranscript)?
            .extract_youtube_transcript(params)
            .await
    }

    async fn batch_extract_youtube_transcripts(&self, params: Params) -> Result<Value> {
        self.upstream(OperationName::BatchExtractYoutubeTranscripts)?
            .batch_extract_youtube_transcripts(params)
            .await
    }

    async fn search_google(&self, request: GoogleSearchRequest) -> Result<Value> {
        self.upstream(OperationName::SearchGoogle)?
            .search_google(request)
            .await
    }

    async fn batch_search_google(&self, request: GoogleBatchSearchRequest) -> Result<Value> {
        self.upstream(OperationName::BatchSearchGoogle)?
            .batch_search_google(request)
            .await
    }

    async fn search_and_crawl(&self, args: SearchAndCrawlArgs) -> Result<SearchAndCrawlReport> {
        let mut search = GoogleSearchRequest::new(&args.search_query);
        search.num_results = args.num_search_results;
        search.search_genre = args.search_genre.clone();
        let results = self.search_google(search).await?;

        if results.get("success").and_then(Value::as_bool) == Some(false) {
            return Ok(SearchAndCrawlReport {
                success: false,
                search_query: args.search_query,
                search_results: results,
                crawled_pages: Vec::new(),
                total_crawled: 0,
            });
        }

        let requests: Vec<CrawlRequest> = result_urls(&results)
            .into_iter()
            .take(args.crawl_top_results as usize)
            .map(|url| {
                let mut request = CrawlRequest::for_url(url);
                request.extract_media = args.extract_media;
                request.generate_markdown = args.generate_markdown;
                request
            })
            .collect();
        let crawled_pages = self.crawl_all(requests).await;

        Ok(SearchAndCrawlReport {
            success: true,
            search_query: args.search_query,
            search_results: results,
            total_crawled: crawled_pages.len(),
            crawled_pages,
        })
    }

    async fn batch_crawl(&self, args: BatchCrawlArgs) -> Result<Vec<CrawlResponse>> {
        let template = args.config.unwrap_or_default();
        let requests = args
            .urls
            .iter()
            .map(|url| {
                let mut params = template.clone();
                params.insert("url".into(), Value::String(url.clone()));
                serde_json::from_value::<CrawlRequest>(Value::Object(params))
                    .map_err(|e| AppError::shaping(OperationName::BatchCrawl.as_str(), e))
            })
            .collect::<Result<Vec<_>>>()?;

        log::info!("Batch crawling {} URLs", requests.len());
        Ok(self.crawl_all(requests).await)
    }
}

/// Traversal parameters shared by deep crawls.
struct WalkPlan<'a> {
    start: &'a str,
    max_depth: u32,
    max_pages: usize,
    strategy: CrawlStrategy,
    include_external: bool,
    url_filter: Option<Regex>,
    score_threshold: f64,
    css_selector: Option<&'a str>,
    options: FetchOptions,
}

impl WalkPlan<'_> {
    fn admits(&self, link: &str) -> bool {
        if !self.include_external && !same_domain(self.start, link) {
            return false;
        }
        self.url_filter
            .as_ref()
            .is_none_or(|filter| filter.is_match(link))
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    url: String,
    depth: u32,
    score: f64,
}

struct Visit {
    depth: u32,
    hash: String,
    page: PageSnapshot,
}

#[derive(Default)]
struct Walk {
    pages: Vec<Visit>,
    failed: Vec<String>,
    duplicates: usize,
}

fn join_pages(pages: &[Visit], render: impl Fn(&PageSnapshot) -> &str) -> String {
    pages
        .iter()
        .map(|visit| format!("=== {} ===\n{}", visit.page.url, render(&visit.page)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn take_next(frontier: &mut VecDeque<Candidate>, strategy: CrawlStrategy) -> Option<Candidate> {
    match strategy {
        CrawlStrategy::Bfs => frontier.pop_front(),
        CrawlStrategy::Dfs => frontier.pop_back(),
        CrawlStrategy::BestFirst => {
            let mut best: Option<(usize, f64)> = None;
            for (i, candidate) in frontier.iter().enumerate() {
                if best.is_none_or(|(_, score)| candidate.score > score) {
                    best = Some((i, candidate.score));
                }
            }
            best.and_then(|(i, _)| frontier.remove(i))
        }
    }
}

/// Pages close to the starting path score higher.
fn relevance(start: &str, link: &str) -> f64 {
    let extra = path_depth(link).saturating_sub(path_depth(start));
    1.0 / (1.0 + extra as f64)
}

fn fetch_options(request: &CrawlRequest) -> FetchOptions {
    FetchOptions {
        timeout: Some(Duration::from_secs(request.timeout.max(1))),
        user_agent: request.user_agent.clone(),
        headers: request.headers.clone().unwrap_or_default(),
        cookies: request.cookies.clone().unwrap_or_default(),
        auth_token: request.auth_token.clone(),
    }
}

fn ignore_browser_options(request: &CrawlRequest) {
    if request.take_screenshot
        || request.execute_js.is_some()
        || request.wait_for_js
        || request.wait_for_selector.is_some()
        || request.simulate_user
        || request.xpath.is_some()
    {
        log::debug!(
            "{}: browser-only options are not evaluated by the native crawler",
            request.url
        );
    }
}

fn shape_text(raw: &str, request: &CrawlRequest) -> String {
    match request.content_filter.as_deref() {
        Some(filter) => text::filter_content(raw, filter, request.filter_query.as_deref()),
        None => raw.to_string(),
    }
}

fn chunk_data(content: &str, request: &CrawlRequest) -> Params {
    let chunks = text::chunk(
        content,
        &request.chunk_strategy,
        request.chunk_size,
        request.overlap_rate,
    );
    let mut data = Params::new();
    data.insert("chunk_count".into(), json!(chunks.len()));
    data.insert("chunks".into(), json!(chunks));
    data
}

/// The attempts made by `crawl_url_with_fallback`, in order.
fn fallback_plan(request: &CrawlRequest) -> Vec<CrawlRequest> {
    let mut simplified = request.clone();
    simplified.css_selector = None;
    simplified.wait_for_selector = None;
    simplified.execute_js = None;
    simplified.content_filter = None;
    simplified.user_agent = Some(FALLBACK_USER_AGENT.to_string());

    let mut minimal = simplified.clone();
    minimal.headers = None;
    minimal.cookies = None;
    minimal.auth_token = None;
    minimal.max_depth = None;
    minimal.chunk_content = false;
    minimal.timeout = (request.timeout.max(1) * 2).min(FALLBACK_MAX_TIMEOUT_SECS);

    vec![request.clone(), simplified, minimal]
}

/// Result URLs of a search payload, in rank order.
fn result_urls(search: &Value) -> Vec<String> {
    search
        .get("results")
        .and_then(Value::as_array)
        .or_else(|| search.as_array())
        .into_iter()
        .flatten()
        .filter_map(|item| {
            item.get("url")
                .or_else(|| item.get("link"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .collect()
}
