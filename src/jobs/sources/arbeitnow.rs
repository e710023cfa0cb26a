use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::jobs::types::{
    matches_keyword, JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind,
};

const API_URL: &str = "https://www.arbeitnow.com/api/job-board-api";

#[derive(Debug, Deserialize)]
struct Payload {
    data: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    slug: String,
    company_name: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    remote: bool,
    url: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_types: Vec<String>,
    #[serde(default)]
    location: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    created_at: Option<u64>,
}

/// Arbeitnow job board API: keyless, no server-side search, so the keyword
/// filter runs client-side against title/company/tags/description.
pub struct ArbeitnowSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl ArbeitnowSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http { client },
        }
    }

    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_payload(s: &str, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        let t0 = std::time::Instant::now();
        let payload: Payload = serde_json::from_str(s).context("parsing arbeitnow json")?;

        let mut out = Vec::with_capacity(payload.data.len());
        for it in payload.data {
            let listing = JobListing {
                id: format!("arbeitnow-{}", it.slug),
                source: JobSource::Arbeitnow,
                title: it.title,
                company: it.company_name,
                company_logo: None,
                description: it.description,
                url: it.url,
                location: it.location.filter(|s| !s.is_empty()),
                job_type: if it.remote {
                    Some("Remote".to_string())
                } else {
                    it.job_types.first().cloned()
                },
                salary: None,
                tags: it.tags,
                posted_at: it.created_at,
                country: None,
            };
            let keep = params
                .keyword
                .as_deref()
                .map_or(true, |kw| matches_keyword(&listing, kw));
            if keep {
                out.push(listing);
            }
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => "arbeitnow").record(ms);
        counter!("source_jobs_total", "source" => "arbeitnow").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobFetcher for ArbeitnowSource {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s, params),
            Mode::Http { client } => {
                let body = client
                    .get(API_URL)
                    .send()
                    .await
                    .context("arbeitnow http get")?
                    .error_for_status()
                    .context("arbeitnow http status")?
                    .text()
                    .await
                    .context("arbeitnow http body")?;
                Self::parse_payload(&body, params)
            }
        }
    }

    fn name(&self) -> &'static str {
        "arbeitnow"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "data": [
            {"slug": "rust-dev-berlin", "company_name": "Ferris GmbH", "title": "Rust Developer",
             "description": "Systems work", "remote": true, "url": "https://arbeitnow.com/jobs/rust-dev-berlin",
             "tags": ["Rust"], "job_types": ["full-time"], "location": "Berlin", "created_at": 1700000000},
            {"slug": "php-dev", "company_name": "Web AG", "title": "PHP Developer",
             "description": "CMS work", "remote": false, "url": "https://arbeitnow.com/jobs/php-dev",
             "tags": ["PHP"], "job_types": ["full-time"], "location": "Hamburg", "created_at": 1700000100}
        ]
    }"#;

    #[test]
    fn keyword_filter_is_applied_client_side() {
        let params = JobSearchParams {
            keyword: Some("rust".into()),
            ..Default::default()
        };
        let jobs = ArbeitnowSource::parse_payload(FIXTURE, &params).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "arbeitnow-rust-dev-berlin");
        assert_eq!(jobs[0].posted_at, Some(1_700_000_000));
        assert_eq!(jobs[0].job_type.as_deref(), Some("Remote"));
    }

    #[test]
    fn no_keyword_keeps_everything() {
        let jobs =
            ArbeitnowSource::parse_payload(FIXTURE, &JobSearchParams::default()).unwrap();
        assert_eq!(jobs.len(), 2);
    }
}
