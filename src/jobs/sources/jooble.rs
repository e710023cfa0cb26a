use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

use crate::jobs::extract::strip_tags;
use crate::jobs::types::{JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind};

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    keywords: &'a str,
    location: &'a str,
}

#[derive(Debug, Deserialize)]
struct Payload {
    jobs: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: serde_json::Number,
    title: String,
    #[serde(default)]
    location: Option<String>,
    /// HTML snippet of the posting.
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    salary: Option<String>,
    #[serde(rename = "type", default)]
    job_type: Option<String>,
    link: String,
    #[serde(default)]
    company: Option<String>,
    /// RFC 3339 with offset.
    #[serde(default)]
    updated: Option<String>,
}

fn parse_updated(ts: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Jooble aggregator API: POST with the key in the URL path; invoked once per
/// selected country (country code subdomain).
pub struct JoobleSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        api_key: String,
    },
}

impl JoobleSource {
    pub fn new(client: reqwest::Client, api_key: String) -> Self {
        Self {
            mode: Mode::Http { client, api_key },
        }
    }

    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_payload(s: &str, country: &str) -> Result<Vec<JobListing>> {
        let t0 = std::time::Instant::now();
        let payload: Payload = serde_json::from_str(s).context("parsing jooble json")?;

        let mut out = Vec::with_capacity(payload.jobs.len());
        for it in payload.jobs {
            out.push(JobListing {
                id: format!("jooble-{}", it.id),
                source: JobSource::Jooble,
                title: it.title,
                company: it
                    .company
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "Unknown company".to_string()),
                company_logo: None,
                description: strip_tags(&it.snippet),
                url: it.link,
                location: it.location.filter(|l| !l.trim().is_empty()),
                job_type: it.job_type.filter(|t| !t.trim().is_empty()),
                salary: it.salary.filter(|s| !s.trim().is_empty()),
                tags: Vec::new(),
                posted_at: it.updated.as_deref().and_then(parse_updated),
                country: Some(country.to_string()),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => "jooble").record(ms);
        counter!("source_jobs_total", "source" => "jooble").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobFetcher for JoobleSource {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        let country = params.country.as_deref().unwrap_or("us");
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s, country),
            Mode::Http { client, api_key } => {
                let url = format!("https://{}.jooble.org/api/{}", country.to_lowercase(), api_key);
                let body = SearchBody {
                    keywords: params.keyword.as_deref().unwrap_or(""),
                    location: params.location.as_deref().unwrap_or(""),
                };
                let text = client
                    .post(&url)
                    .json(&body)
                    .send()
                    .await
                    .context("jooble http post")?
                    .error_for_status()
                    .context("jooble http status")?
                    .text()
                    .await
                    .context("jooble http body")?;
                Self::parse_payload(&text, country)
            }
        }
    }

    fn name(&self) -> &'static str {
        "jooble"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PerCountry
    }
}
