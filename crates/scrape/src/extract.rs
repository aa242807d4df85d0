//! Content extraction heuristics
//!
//! Runs a chain of CSS-selector fallbacks over a parsed HTML document:
//! semantic containers first (`article`, `main`), then common content class
//! names, then the whole `<body>` with navigation noise stripped.

use crate::ScrapedPage;
use linkstash_common::errors::{AppError, Result};
use linkstash_common::models::{DocumentMetadata, DocumentMetrics};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Content containers tried in order; first non-empty match wins
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    ".post-content",
    ".content",
    "#content",
    "body",
];

/// Elements whose text is never page content
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "svg", "form",
];

/// Bound on the derived summary length in characters
const SUMMARY_MAX_CHARS: usize = 300;

/// Extract a page from raw HTML. Pure; no network access.
pub fn extract_page(html: &str, url: &Url, max_content_chars: usize) -> Result<ScrapedPage> {
    let doc = Html::parse_document(html);

    let domain = url.host_str().unwrap_or("unknown").to_string();

    let title = meta_content(&doc, "meta[property=\"og:title\"]")
        .or_else(|| first_text(&doc, "title"))
        .or_else(|| first_text(&doc, "h1"))
        .unwrap_or_else(|| domain.clone());

    let content = extract_content(&doc, max_content_chars);
    if content.is_empty() {
        return Err(AppError::Extraction {
            url: url.to_string(),
            message: "page contained no extractable text".to_string(),
        });
    }

    let description = meta_content(&doc, "meta[property=\"og:description\"]")
        .or_else(|| meta_content(&doc, "meta[name=\"description\"]"));

    let summary = description
        .clone()
        .unwrap_or_else(|| truncate_chars(&content, SUMMARY_MAX_CHARS));

    let author = meta_content(&doc, "meta[name=\"author\"]")
        .or_else(|| meta_content(&doc, "meta[property=\"article:author\"]"));

    let published_at = meta_content(&doc, "meta[property=\"article:published_time\"]");

    let language = attr_value(&doc, "html", "lang");

    let tags = meta_content(&doc, "meta[name=\"keywords\"]")
        .map(|kw| {
            kw.split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let metrics = DocumentMetrics {
        word_count: content.split_whitespace().count(),
        content_length: content.chars().count(),
    };

    Ok(ScrapedPage {
        title,
        summary,
        metadata: DocumentMetadata {
            domain,
            description,
            author,
            published_at,
            tags,
            language,
        },
        metrics,
        content,
    })
}

/// Walk the selector fallback chain and return the first non-empty text
fn extract_content(doc: &Html, max_content_chars: usize) -> String {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            let mut raw = String::new();
            collect_text(element, &mut raw);
            let cleaned = collapse_whitespace(&raw);
            if !cleaned.is_empty() {
                return truncate_chars(&cleaned, max_content_chars);
            }
        }
    }
    String::new()
}

/// Recursively collect text under an element, skipping noise subtrees
fn collect_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            if NOISE_TAGS.contains(&child_el.value().name()) {
                continue;
            }
            collect_text(child_el, out);
        }
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate on a character boundary
fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn meta_content(doc: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_text(doc: &Html, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    doc.select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|v| !v.is_empty())
}

fn attr_value(doc: &Html, selector_str: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://blog.example.com/posts/rust-async").unwrap()
    }

    #[test]
    fn test_prefers_article_over_body() {
        let html = r#"
            <html><head><title>Fallback Title</title></head>
            <body>
                <nav>Home About Contact</nav>
                <article>The actual article text lives here and is long enough.</article>
                <footer>Copyright</footer>
            </body></html>
        "#;

        let page = extract_page(html, &url(), 50_000).unwrap();
        assert_eq!(
            page.content,
            "The actual article text lives here and is long enough."
        );
        assert_eq!(page.title, "Fallback Title");
    }

    #[test]
    fn test_og_title_wins_over_title_tag() {
        let html = r#"
            <html><head>
                <title>Tag Title</title>
                <meta property="og:title" content="Open Graph Title">
            </head>
            <body><main>Some content.</main></body></html>
        "#;

        let page = extract_page(html, &url(), 50_000).unwrap();
        assert_eq!(page.title, "Open Graph Title");
    }

    #[test]
    fn test_body_fallback_strips_noise() {
        let html = r#"
            <html><body>
                <script>var x = "never extracted";</script>
                <nav>Menu items</nav>
                <div>Plain page text without semantic containers.</div>
            </body></html>
        "#;

        let page = extract_page(html, &url(), 50_000).unwrap();
        assert!(page.content.contains("Plain page text"));
        assert!(!page.content.contains("never extracted"));
        assert!(!page.content.contains("Menu items"));
    }

    #[test]
    fn test_metadata_extraction() {
        let html = r#"
            <html lang="en"><head>
                <title>T</title>
                <meta name="description" content="A page about things.">
                <meta name="author" content="Jane Doe">
                <meta name="keywords" content="rust, async,  web ">
                <meta property="article:published_time" content="2024-05-01T00:00:00Z">
            </head>
            <body><article>Body text.</article></body></html>
        "#;

        let page = extract_page(html, &url(), 50_000).unwrap();
        assert_eq!(page.metadata.domain, "blog.example.com");
        assert_eq!(page.metadata.description.as_deref(), Some("A page about things."));
        assert_eq!(page.metadata.author.as_deref(), Some("Jane Doe"));
        assert_eq!(page.metadata.language.as_deref(), Some("en"));
        assert_eq!(page.metadata.tags, vec!["rust", "async", "web"]);
        assert_eq!(
            page.metadata.published_at.as_deref(),
            Some("2024-05-01T00:00:00Z")
        );
        // Summary prefers the description over a content prefix
        assert_eq!(page.summary, "A page about things.");
    }

    #[test]
    fn test_content_cap_respected() {
        let body = "word ".repeat(10_000);
        let html = format!("<html><body><article>{}</article></body></html>", body);

        let page = extract_page(&html, &url(), 100).unwrap();
        assert_eq!(page.content.chars().count(), 100);
        assert_eq!(page.metrics.content_length, 100);
    }

    #[test]
    fn test_empty_page_is_an_error() {
        let html = "<html><body><script>only code</script></body></html>";
        assert!(extract_page(html, &url(), 50_000).is_err());
    }

    #[test]
    fn test_word_count() {
        let html = "<html><body><article>one two three</article></body></html>";
        let page = extract_page(html, &url(), 50_000).unwrap();
        assert_eq!(page.metrics.word_count, 3);
    }
}
