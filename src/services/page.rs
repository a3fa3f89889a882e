// src/services/page.rs

//! HTML page analysis.
//!
//! Turns a fetched document into plain text, a markdown rendering, the
//! outgoing links and the referenced media.

use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Node, Selector};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::{MediaItem, Params};
use crate::utils::{resolve, text};

/// Elements whose content never reaches the text output.
const SKIPPED: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "head", "iframe", "canvas",
];

/// Elements rendered on lines of their own.
const BLOCKS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "ul", "ol",
    "table", "tr", "form", "figure", "dl", "dt", "dd", "hr",
];

/// The analyzed content of one page.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
    pub markdown: String,
    /// Absolute http(s) links in document order, without duplicates
    pub links: Vec<String>,
    pub media: Vec<MediaItem>,
}

impl PageSnapshot {
    /// Parse `html` fetched from `url`.
    ///
    /// With a `css_selector`, text and markdown cover only the matching
    /// elements. Links and media always cover the whole document.
    pub fn parse(url: &str, html: &str, css_selector: Option<&str>) -> Result<Self> {
        let document = Html::parse_document(html);

        let title_selector = parse_selector("title")?;
        let title = document
            .select(&title_selector)
            .next()
            .map(|el| text::normalize_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty());

        let scope: Vec<ElementRef> = match css_selector.map(str::trim).filter(|s| !s.is_empty()) {
            Some(css) => {
                let selector = parse_selector(css)?;
                document.select(&selector).collect()
            }
            None => {
                let body = parse_selector("body")?;
                document
                    .select(&body)
                    .next()
                    .map(|el| vec![el])
                    .unwrap_or_else(|| vec![document.root_element()])
            }
        };

        let mut plain = Renderer::new(url, false);
        let mut markdown = Renderer::new(url, true);
        for element in &scope {
            plain.element(*element);
            plain.block_break();
            markdown.element(*element);
            markdown.block_break();
        }

        Ok(Self {
            url: url.to_string(),
            title,
            text: plain.finish(),
            markdown: markdown.finish(),
            links: collect_links(&document, url)?,
            media: collect_media(&document, url)?,
        })
    }

    /// Hex-encoded SHA-256 of the page text.
    pub fn content_hash(&self) -> String {
        hex::encode(Sha256::digest(self.text.as_bytes()))
    }
}

/// Text of the elements matched by each field's selector.
///
/// A field matching nothing is `null`, one match is a string and several
/// matches are an array.
pub fn select_fields(html: &str, fields: &BTreeMap<String, String>) -> Result<Params> {
    let document = Html::parse_document(html);
    let mut extracted = Params::new();
    for (field, css) in fields {
        let selector = parse_selector(css)?;
        let mut values: Vec<Value> = document
            .select(&selector)
            .map(|el| text::normalize_whitespace(&el.text().collect::<String>()))
            .filter(|t| !t.is_empty())
            .map(Value::String)
            .collect();
        let value = match values.len() {
            0 => Value::Null,
            1 => values.remove(0),
            _ => Value::Array(values),
        };
        extracted.insert(field.clone(), value);
    }
    Ok(extracted)
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::selector(css, e))
}

fn collect_links(document: &Html, base: &str) -> Result<Vec<String>> {
    let selector = parse_selector("a[href]")?;
    let mut links: Vec<String> = Vec::new();
    for href in document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
    {
        if let Some(link) = resolve(base, href) {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    Ok(links)
}

fn collect_media(document: &Html, base: &str) -> Result<Vec<MediaItem>> {
    let selector = parse_selector("img[src], video[src], video source[src], audio[src], audio source[src]")?;
    let mut media: Vec<MediaItem> = Vec::new();
    for element in document.select(&selector) {
        let Some(src) = element.value().attr("src").and_then(|s| resolve(base, s)) else {
            continue;
        };
        if media.iter().any(|m| m.src == src) {
            continue;
        }
        let kind = match element.value().name() {
            "img" => "image",
            "audio" => "audio",
            "video" => "video",
            _ => match element
                .parent()
                .and_then(ElementRef::wrap)
                .map(|p| p.value().name())
            {
                Some("audio") => "audio",
                _ => "video",
            },
        };
        media.push(MediaItem {
            kind: kind.to_string(),
            src,
            alt: element
                .value()
                .attr("alt")
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(String::from),
        });
    }
    Ok(media)
}

/// Walks an element tree into text, optionally with markdown markup.
struct Renderer<'a> {
    base: &'a str,
    markdown: bool,
    out: String,
}

impl<'a> Renderer<'a> {
    fn new(base: &'a str, markdown: bool) -> Self {
        Self {
            base,
            markdown,
            out: String::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        let collapsed = text::normalize_whitespace(text);
        if collapsed.is_empty() {
            if text.chars().any(char::is_whitespace) {
                self.space();
            }
            return;
        }
        if text.starts_with(char::is_whitespace) {
            self.space();
        }
        self.out.push_str(&collapsed);
        if text.ends_with(char::is_whitespace) {
            self.space();
        }
    }

    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with([' ', '\n']) {
            self.out.push(' ');
        }
    }

    fn line_break(&mut self) {
        trim_trailing_spaces(&mut self.out);
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn block_break(&mut self) {
        trim_trailing_spaces(&mut self.out);
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn children(&mut self, element: ElementRef) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef) {
        let name = element.value().name();
        if SKIPPED.contains(&name) {
            return;
        }

        match name {
            "br" => self.line_break(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.block_break();
                if self.markdown {
                    let level = name[1..].parse::<usize>().unwrap_or(1);
                    self.out.push_str(&"#".repeat(level));
                    self.out.push(' ');
                }
                self.children(element);
                self.block_break();
            }
            "li" => {
                self.line_break();
                if self.markdown {
                    self.out.push_str("- ");
                }
                self.children(element);
                self.line_break();
            }
            "pre" => {
                self.block_break();
                let code: String = element.text().collect();
                if self.markdown {
                    self.out.push_str("```\n");
                    self.out.push_str(code.trim_end());
                    self.out.push_str("\n```");
                } else {
                    self.out.push_str(code.trim_end());
                }
                self.block_break();
            }
            "blockquote" => {
                self.block_break();
                if self.markdown {
                    self.out.push_str("> ");
                }
                self.children(element);
                self.block_break();
            }
            "a" if self.markdown => {
                let href = element.value().attr("href").and_then(|h| resolve(self.base, h));
                match href {
                    Some(href) => {
                        let label = text::normalize_whitespace(&element.text().collect::<String>());
                        if label.is_empty() {
                            return;
                        }
                        self.space_if_word();
                        self.out.push_str(&format!("[{label}]({href})"));
                    }
                    None => self.children(element),
                }
            }
            "strong" | "b" if self.markdown => self.wrapped(element, "**"),
            "em" | "i" if self.markdown => self.wrapped(element, "_"),
            "code" if self.markdown => self.wrapped(element, "`"),
            "td" | "th" => {
                self.children(element);
                self.space();
            }
            _ if BLOCKS.contains(&name) => {
                self.block_break();
                self.children(element);
                self.block_break();
            }
            _ => self.children(element),
        }
    }

    fn space_if_word(&mut self) {
        if self.out.ends_with(|c: char| c.is_alphanumeric()) {
            self.out.push(' ');
        }
    }

    fn wrapped(&mut self, element: ElementRef, marker: &str) {
        let inner = text::normalize_whitespace(&element.text().collect::<String>());
        if inner.is_empty() {
            return;
        }
        self.space_if_word();
        self.out.push_str(marker);
        self.out.push_str(&inner);
        self.out.push_str(marker);
    }

    fn finish(mut self) -> String {
        trim_trailing_spaces(&mut self.out);
        self.out.trim().to_string()
    }
}

fn trim_trailing_spaces(out: &mut String) {
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title> Example   Docs </title>
  <style>body { color: red; }</style>
</head>
<body>
  <nav><a href="/">Home</a> <a href="mailto:team@example.com">Mail</a></nav>
  <main id="content">
    <h1>Getting started</h1>
    <p>Install the <strong>tool</strong> and read the <a href="guide.html#top">guide</a>.</p>
    <ul><li>First step</li><li>Second step</li></ul>
    <pre>cargo run</pre>
    <img src="/img/logo.png" alt="Logo">
    <video><source src="intro.mp4"></video>
  </main>
  <script>var hidden = "secret";</script>
  <footer><a href="/docs/guide.html">Guide again</a></footer>
</body>
</html>"#;

    fn snapshot(selector: Option<&str>) -> PageSnapshot {
        PageSnapshot::parse("https://example.com/docs/index.html", PAGE, selector).unwrap()
    }

    #[test]
    fn test_title_is_normalized() {
        assert_eq!(snapshot(None).title.as_deref(), Some("Example Docs"));
    }

    #[test]
    fn test_text_skips_scripts_and_styles() {
        let page = snapshot(None);
        assert!(page.text.contains("Getting started"));
        assert!(page.text.contains("Install the tool and read the guide."));
        assert!(!page.text.contains("secret"));
        assert!(!page.text.contains("color: red"));
    }

    #[test]
    fn test_markdown_rendering() {
        let page = snapshot(None);
        assert!(page.markdown.contains("# Getting started"));
        assert!(page.markdown.contains("**tool**"));
        assert!(
            page.markdown
                .contains("[guide](https://example.com/docs/guide.html)")
        );
        assert!(page.markdown.contains("- First step\n- Second step"));
        assert!(page.markdown.contains("```\ncargo run\n```"));
    }

    #[test]
    fn test_selector_scopes_content() {
        let page = snapshot(Some("main#content"));
        assert!(page.text.contains("Getting started"));
        assert!(!page.text.contains("Home"));
        assert!(!page.text.contains("Guide again"));
        // Links still cover the whole document.
        assert!(page.links.contains(&"https://example.com/".to_string()));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let result = PageSnapshot::parse("https://example.com", PAGE, Some("main[["));
        assert!(matches!(result, Err(AppError::Selector { .. })));
    }

    #[test]
    fn test_links_are_resolved_and_deduplicated() {
        let page = snapshot(None);
        assert_eq!(
            page.links,
            vec![
                "https://example.com/".to_string(),
                "https://example.com/docs/guide.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_media_collection() {
        let page = snapshot(None);
        assert_eq!(page.media.len(), 2);
        assert_eq!(page.media[0].kind, "image");
        assert_eq!(page.media[0].src, "https://example.com/img/logo.png");
        assert_eq!(page.media[0].alt.as_deref(), Some("Logo"));
        assert_eq!(page.media[1].kind, "video");
        assert_eq!(page.media[1].src, "https://example.com/docs/intro.mp4");
    }

    #[test]
    fn test_select_fields() {
        let fields = BTreeMap::from([
            ("heading".to_string(), "h1".to_string()),
            ("steps".to_string(), "li".to_string()),
            ("price".to_string(), ".price".to_string()),
        ]);
        let extracted = select_fields(PAGE, &fields).unwrap();
        assert_eq!(extracted["heading"], Value::from("Getting started"));
        assert_eq!(
            extracted["steps"],
            Value::from(vec!["First step", "Second step"])
        );
        assert_eq!(extracted["price"], Value::Null);
    }

    #[test]
    fn test_content_hash_tracks_text() {
        let a = PageSnapshot::parse("https://a.com", "<p>same</p>", None).unwrap();
        let b = PageSnapshot::parse("https://b.com", "<div><p>same</p></div>", None).unwrap();
        let c = PageSnapshot::parse("https://c.com", "<p>other</p>", None).unwrap();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }
}
