use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::jobs::types::{JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind};

#[derive(Debug, Deserialize)]
struct Payload {
    results: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    redirect_url: String,
    #[serde(default)]
    company: Option<Named>,
    #[serde(default)]
    location: Option<Named>,
    #[serde(default)]
    category: Option<Labeled>,
    #[serde(default)]
    salary_min: Option<f64>,
    #[serde(default)]
    salary_max: Option<f64>,
    #[serde(default)]
    contract_time: Option<String>,
    /// RFC 3339, e.g. "2024-01-15T09:30:00Z".
    #[serde(default)]
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Labeled {
    #[serde(default)]
    label: Option<String>,
}

fn parse_created(ts: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn format_salary(min: Option<f64>, max: Option<f64>) -> Option<String> {
    match (min, max) {
        (Some(a), Some(b)) if a > 0.0 && b > 0.0 => Some(format!("{:.0} - {:.0}", a, b)),
        (Some(a), _) if a > 0.0 => Some(format!("from {:.0}", a)),
        (_, Some(b)) if b > 0.0 => Some(format!("up to {:.0}", b)),
        _ => None,
    }
}

/// Adzuna aggregator API: requires an app id + key pair; invoked once per
/// selected country (the country code is part of the URL path).
pub struct AdzunaSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        client: reqwest::Client,
        app_id: String,
        app_key: String,
    },
}

impl AdzunaSource {
    pub fn new(client: reqwest::Client, app_id: String, app_key: String) -> Self {
        Self {
            mode: Mode::Http {
                client,
                app_id,
                app_key,
            },
        }
    }

    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    fn parse_payload(s: &str, country: &str) -> Result<Vec<JobListing>> {
        let t0 = std::time::Instant::now();
        let payload: Payload = serde_json::from_str(s).context("parsing adzuna json")?;

        let mut out = Vec::with_capacity(payload.results.len());
        for it in payload.results {
            let mut tags = Vec::new();
            if let Some(label) = it.category.and_then(|c| c.label) {
                tags.push(label);
            }
            out.push(JobListing {
                id: format!("adzuna-{}", it.id),
                source: JobSource::Adzuna,
                title: it.title,
                company: it
                    .company
                    .and_then(|c| c.display_name)
                    .unwrap_or_else(|| "Unknown company".to_string()),
                company_logo: None,
                description: it.description,
                url: it.redirect_url,
                location: it.location.and_then(|l| l.display_name),
                job_type: it.contract_time,
                salary: format_salary(it.salary_min, it.salary_max),
                tags,
                posted_at: it.created.as_deref().and_then(parse_created),
                country: Some(country.to_string()),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("source_parse_ms", "source" => "adzuna").record(ms);
        counter!("source_jobs_total", "source" => "adzuna").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobFetcher for AdzunaSource {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        let country = params.country.as_deref().unwrap_or("gb");
        match &self.mode {
            Mode::Fixture(s) => Self::parse_payload(s, country),
            Mode::Http {
                client,
                app_id,
                app_key,
            } => {
                let url = format!(
                    "https://api.adzuna.com/v1/api/jobs/{}/search/1",
                    country.to_lowercase()
                );
                let per_page = params.limit.unwrap_or(50).min(50).to_string();
                let mut req = client.get(&url).query(&[
                    ("app_id", app_id.as_str()),
                    ("app_key", app_key.as_str()),
                    ("results_per_page", per_page.as_str()),
                    ("content-type", "application/json"),
                ]);
                if let Some(kw) = params.keyword.as_deref() {
                    req = req.query(&[("what", kw)]);
                }
                if let Some(loc) = params.location.as_deref() {
                    req = req.query(&[("where", loc)]);
                }
                let body = req
                    .send()
                    .await
                    .context("adzuna http get")?
                    .error_for_status()
                    .context("adzuna http status")?
                    .text()
                    .await
                    .context("adzuna http body")?;
                Self::parse_payload(&body, country)
            }
        }
    }

    fn name(&self) -> &'static str {
        "adzuna"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PerCountry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salary_range_formats() {
        assert_eq!(
            format_salary(Some(5000.0), Some(8000.0)).as_deref(),
            Some("5000 - 8000")
        );
        assert_eq!(format_salary(Some(5000.0), None).as_deref(), Some("from 5000"));
        assert_eq!(format_salary(None, None), None);
        assert_eq!(format_salary(Some(0.0), Some(0.0)), None);
    }

    #[test]
    fn created_parses_rfc3339() {
        assert_eq!(parse_created("2024-01-15T09:30:00Z"), Some(1_705_311_000));
    }
}
