// src/gateway/registry.rs

//! Operation registry: one entry per operation, built once.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{
    BatchCrawlArgs, CrawlRequest, DeepCrawlArgs, ExtractEntitiesArgs, FileProcessRequest,
    GoogleBatchSearchRequest, GoogleSearchRequest, IntelligentExtractArgs, OperationName, Params,
    SearchAndCrawlArgs, StructuredExtractionRequest,
};
use crate::services::CrawlTools;

/// One operation invocation with its parameters bound.
pub type WorkUnit = BoxFuture<'static, Result<Value>>;

type Invoker = Box<dyn Fn(Arc<dyn CrawlTools>, Params) -> Result<WorkUnit> + Send + Sync>;

/// How an operation receives its parameter bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    /// Built into a request object; unknown keys are ignored.
    Typed,
    /// Expanded into named arguments; unknown keys are rejected.
    Keyword,
    /// Handed over untouched.
    Raw,
}

pub struct OperationEntry {
    pub name: OperationName,
    pub mode: ParamMode,
    invoker: Invoker,
}

impl OperationEntry {
    fn shaped<P, R, F, Fut>(name: OperationName, mode: ParamMode, call: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<dyn CrawlTools>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let invoker: Invoker = Box::new(move |tools, params| {
            let args: P = serde_json::from_value(Value::Object(params))
                .map_err(|e| AppError::shaping(name.as_str(), e))?;
            let pending = call(tools, args);
            Ok(async move { Ok(serde_json::to_value(pending.await?)?) }.boxed())
        });
        Self {
            name,
            mode,
            invoker,
        }
    }

    fn typed<P, R, F, Fut>(name: OperationName, call: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<dyn CrawlTools>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::shaped(name, ParamMode::Typed, call)
    }

    fn keyword<P, R, F, Fut>(name: OperationName, call: F) -> Self
    where
        P: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: Fn(Arc<dyn CrawlTools>, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        Self::shaped(name, ParamMode::Keyword, call)
    }

    fn raw<F, Fut>(name: OperationName, call: F) -> Self
    where
        F: Fn(Arc<dyn CrawlTools>, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let invoker: Invoker = Box::new(move |tools, params| Ok(call(tools, params).boxed()));
        Self {
            name,
            mode: ParamMode::Raw,
            invoker,
        }
    }

    /// Shape `params` and bind them into a work unit.
    pub fn bind(&self, tools: Arc<dyn CrawlTools>, params: Params) -> Result<WorkUnit> {
        (self.invoker)(tools, params)
    }
}

impl fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEntry")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Immutable table of the dispatchable operations.
pub struct OperationRegistry {
    tools: Arc<dyn CrawlTools>,
    entries: Vec<OperationEntry>,
}

impl OperationRegistry {
    pub fn new(tools: Arc<dyn CrawlTools>) -> Self {
        use OperationName::*;

        let entries = vec![
            OperationEntry::typed(CrawlUrl, |tools, request: CrawlRequest| async move {
                tools.crawl_url(request).await
            }),
            OperationEntry::typed(
                CrawlUrlWithFallback,
                |tools, request: CrawlRequest| async move {
                    tools.crawl_url_with_fallback(request).await
                },
            ),
            OperationEntry::keyword(DeepCrawlSite, |tools, args: DeepCrawlArgs| async move {
                tools.deep_crawl_site(args).await
            }),
            OperationEntry::keyword(
                IntelligentExtract,
                |tools, args: IntelligentExtractArgs| async move {
                    tools.intelligent_extract(args).await
                },
            ),
            OperationEntry::keyword(
                ExtractEntities,
                |tools, args: ExtractEntitiesArgs| async move { tools.extract_entities(args).await },
            ),
            OperationEntry::typed(
                ExtractStructuredData,
                |tools, request: StructuredExtractionRequest| async move {
                    tools.extract_structured_data(request).await
                },
            ),
            OperationEntry::typed(ProcessFile, |tools, request: FileProcessRequest| async move {
                tools.process_file(request).await
            }),
            OperationEntry::raw(ExtractYoutubeTranscript, |tools, params| async move {
                tools.extract_youtube_transcript(params).await
            }),
            OperationEntry::raw(BatchExtractYoutubeTranscripts, |tools, params| async move {
                tools.batch_extract_youtube_transcripts(params).await
            }),
            OperationEntry::typed(SearchGoogle, |tools, request: GoogleSearchRequest| async move {
                tools.search_google(request).await
            }),
            OperationEntry::typed(
                BatchSearchGoogle,
                |tools, request: GoogleBatchSearchRequest| async move {
                    tools.batch_search_google(request).await
                },
            ),
            OperationEntry::keyword(
                SearchAndCrawl,
                |tools, args: SearchAndCrawlArgs| async move { tools.search_and_crawl(args).await },
            ),
            OperationEntry::keyword(BatchCrawl, |tools, args: BatchCrawlArgs| async move {
                tools.batch_crawl(args).await
            }),
        ];

        Self { tools, entries }
    }

    pub fn get(&self, name: &str) -> Option<&OperationEntry> {
        self.entries.iter().find(|entry| entry.name.as_str() == name)
    }

    /// Registered operation names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.name.as_str().to_string())
            .collect()
    }

    pub fn entries(&self) -> &[OperationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `name` and bind `params` into a work unit.
    pub fn prepare(&self, name: &str, params: Params) -> Result<WorkUnit> {
        let entry = self.get(name).ok_or_else(|| AppError::UnknownOperation {
            name: name.to_string(),
            available: self.names(),
        })?;
        entry.bind(Arc::clone(&self.tools), params)
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("entries", &self.entries)
            .finish()
    }
}
