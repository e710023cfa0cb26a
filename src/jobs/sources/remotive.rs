use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::jobs::types::{JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind};

const API_URL: &str = "https://remotive.com/api/remote-jobs";

#[derive(Debug, Deserialize)]
struct Payload {
    jobs: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: u64,
    url: String,
    title: String,
    company_name: String,
    #[serde(default)]
    company_logo: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_type: Option<String>,
    /// "2024-02-03T08:10:20", no timezone; treated as UTC.
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    candidate_required_location: Option<String>,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default)]
    description: String,
}

fn parse_publication_date(ts: &str) -> Option<u64> {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Remotive public API: keyless, remote-only listings.
pub struct RemotiveSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RemotiveSource {
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
        let payload: Payload = serde_json::from_str(s).context("parsing remotive json")?;

        let mut out = Vec::with_capacity(payload.jobs.len());
        for it in payload.jobs {
            if let Some(cat) = params.category.as_deref() {
                let matches = it
                    .category
                    .as_deref()
                    .is_some_and(|c| c.eq_ignore_ascii_case(cat));
                if !matches {
                    continue;
                }
            }
            out.push(JobListing {
                id: format!("remotive-{}", it.id),
                source: JobSource::Remotive,
                title: it.title,
                company: it.company_name,
                company_logo: it.company_logo.filter(|s| !s.is_empty()),
                description: it.description,
                url: it.url,
                location: it.candidate_required_location.filter(|s| !s.is_empty()),
                job_type: it.job_type.filter(|s| !s.is_empty()),
                salary: it.salary.filter(|s| !s.is_empty()),
                tags: it.tags,
                posted_at: it.publication_date.as_deref().and_then(parse_publication_date),
                country: None,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => "remotive").record(ms);
        counter!("source_jobs_total", "source" => "remotive").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobFetcher for RemotiveSource {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s, params),
            Mode::Http { client } => {
                let mut req = client.get(API_URL);
                if let Some(kw) = params.keyword.as_deref() {
                    req = req.query(&[("search", kw)]);
                }
                if let Some(limit) = params.limit {
                    req = req.query(&[("limit", limit.to_string())]);
                }
                let body = req
                    .send()
                    .await
                    .context("remotive http get")?
                    .error_for_status()
                    .context("remotive http status")?
                    .text()
                    .await
                    .context("remotive http body")?;
                Self::parse_payload(&body, params)
            }
        }
    }

    fn name(&self) -> &'static str {
        "remotive"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publication_date_parses_to_unix_utc() {
        assert_eq!(
            parse_publication_date("2024-02-03T08:10:20"),
            Some(1_706_947_820)
        );
        assert_eq!(parse_publication_date("not-a-date"), None);
    }
}
