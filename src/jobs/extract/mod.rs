//! Extraction strategies for HTML-scraped sources.
//!
//! A scraped board fetches one search page and runs an ordered chain of
//! extractors over it: the AI extractor first (when configured), then the
//! site-specific pattern parser. The first strategy that yields a non-empty,
//! schema-valid result wins; a strategy failure of any kind just moves the
//! chain along.

pub mod ai;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::jobs::types::{JobListing, JobSource};

/// Per-page context handed to every strategy.
pub struct ExtractContext {
    pub source: JobSource,
    /// Prepended to relative listing URLs.
    pub base_url: &'static str,
    pub country: &'static str,
    pub limit: usize,
}

#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Extract listings from `html`. An empty Ok result counts as a miss.
    async fn extract(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>>;
    fn name(&self) -> &'static str;
}

/// Ordered list of strategies tried until one produces listings.
pub struct ExtractorChain {
    strategies: Vec<Box<dyn Extractor>>,
}

impl ExtractorChain {
    pub fn new(strategies: Vec<Box<dyn Extractor>>) -> Self {
        Self { strategies }
    }

    /// Runs the chain. Returns the winning strategy's listings and its name,
    /// or an empty vec when every strategy missed.
    pub async fn run(&self, html: &str, ctx: &ExtractContext) -> (Vec<JobListing>, Option<&'static str>) {
        for strategy in &self.strategies {
            match strategy.extract(html, ctx).await {
                Ok(listings) if !listings.is_empty() => {
                    tracing::debug!(
                        source = ctx.source.as_str(),
                        strategy = strategy.name(),
                        count = listings.len(),
                        "extractor hit"
                    );
                    return (listings, Some(strategy.name()));
                }
                Ok(_) => {
                    tracing::debug!(
                        source = ctx.source.as_str(),
                        strategy = strategy.name(),
                        "extractor returned nothing, trying next"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        source = ctx.source.as_str(),
                        strategy = strategy.name(),
                        error = ?e,
                        "extractor failed, trying next"
                    );
                }
            }
        }
        (Vec::new(), None)
    }
}

/// Strip a page down to what a language model needs: no script/style/noscript
/// blocks, no HTML comments, collapsed whitespace, hard length cap.
pub fn clean_html_for_model(html: &str, max_chars: usize) -> String {
    static RE_NOISE: OnceCell<Regex> = OnceCell::new();
    let re_noise = RE_NOISE.get_or_init(|| {
        // No backreferences in the regex crate; spell the closers out.
        Regex::new(
            r"(?is)<script\b.*?</script>|<style\b.*?</style>|<noscript\b.*?</noscript>|<svg\b.*?</svg>|<iframe\b.*?</iframe>|<!--.*?-->",
        )
        .unwrap()
    });
    let mut out = re_noise.replace_all(html, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[ \t]{2,}|\n\s*\n").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    if out.chars().count() > max_chars {
        out = out.chars().take(max_chars).collect();
        // Do not end mid-tag; the model copes better with a clean cut.
        if let Some(pos) = out.rfind('<') {
            if !out[pos..].contains('>') {
                out.truncate(pos);
            }
        }
    }
    out
}

/// Decode entities and drop any markup left inside an extracted fragment.
pub fn strip_tags(fragment: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let no_tags = re_tags.replace_all(fragment, " ");
    let decoded = html_escape::decode_html_entities(&no_tags).to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Absolute URL for a possibly-relative href.
pub fn absolutize(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{base_url}{href}")
    } else {
        format!("{base_url}/{href}")
    }
}
