//! Shared plumbing for HTML-scraped job boards: fetch the search page, then
//! run the extraction strategy chain over it. A network failure surfaces as
//! the adapter's error; an exhausted chain is just an empty result.

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};

use crate::jobs::extract::{ExtractContext, ExtractorChain};
use crate::jobs::types::{JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind};

/// Static description of one scraped board.
pub struct BoardProfile {
    pub source: JobSource,
    pub name: &'static str,
    pub base_url: &'static str,
    pub country: &'static str,
    pub build_search_url: fn(&JobSearchParams) -> String,
}

pub struct ScrapedBoard {
    profile: &'static BoardProfile,
    chain: ExtractorChain,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl ScrapedBoard {
    pub fn new(profile: &'static BoardProfile, chain: ExtractorChain, client: reqwest::Client) -> Self {
        Self {
            profile,
            chain,
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(profile: &'static BoardProfile, chain: ExtractorChain, html: &str) -> Self {
        Self {
            profile,
            chain,
            mode: Mode::Fixture(html.to_string()),
        }
    }

    async fn extract_from(&self, html: &str, params: &JobSearchParams) -> Vec<JobListing> {
        let t0 = std::time::Instant::now();
        let ctx = ExtractContext {
            source: self.profile.source,
            base_url: self.profile.base_url,
            country: self.profile.country,
            limit: params.limit.unwrap_or(50),
        };
        let (jobs, strategy) = self.chain.run(html, &ctx).await;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => self.profile.name).record(ms);
        counter!("source_jobs_total", "source" => self.profile.name).increment(jobs.len() as u64);
        tracing::info!(
            source = self.profile.name,
            strategy = strategy.unwrap_or("none"),
            count = jobs.len(),
            "scrape extraction done"
        );
        jobs
    }
}

#[async_trait]
impl JobFetcher for ScrapedBoard {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        match &self.mode {
            Mode::Fixture(html) => Ok(self.extract_from(html, params).await),
            Mode::Http { client } => {
                let url = (self.profile.build_search_url)(params);
                let html = client
                    .get(&url)
                    .send()
                    .await
                    .with_context(|| format!("{} http get", self.profile.name))?
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.profile.name))?
                    .text()
                    .await
                    .with_context(|| format!("{} http body", self.profile.name))?;
                Ok(self.extract_from(&html, params).await)
            }
        }
    }

    fn name(&self) -> &'static str {
        self.profile.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Country(self.profile.country)
    }
}
