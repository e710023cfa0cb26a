use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::jobs::extract::strip_tags;
use crate::jobs::types::{
    listing_id, matches_keyword, JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind,
};

const FEED_URL: &str = "https://weworkremotely.com/categories/remote-programming-jobs.rss";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "region", default)]
    region: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

/// Item titles read "Company: Job Title".
fn split_title(raw: &str) -> (String, String) {
    match raw.split_once(": ") {
        Some((company, title)) => (company.trim().to_string(), title.trim().to_string()),
        None => (String::new(), raw.trim().to_string()),
    }
}

/// We Work Remotely RSS feed (programming category): keyless, remote-only.
pub struct WeWorkRemotelySource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl WeWorkRemotelySource {
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

    fn parse_feed(s: &str, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(s).context("parsing weworkremotely rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let raw_title = match it.title.as_deref() {
                Some(t) if !t.trim().is_empty() => t,
                _ => continue,
            };
            let url = match it.link {
                Some(u) if !u.is_empty() => u,
                _ => continue,
            };
            let (company, title) = split_title(raw_title);
            let listing = JobListing {
                id: listing_id(JobSource::Weworkremotely, &url),
                source: JobSource::Weworkremotely,
                title,
                company: if company.is_empty() {
                    "Unknown company".to_string()
                } else {
                    company
                },
                company_logo: None,
                description: it
                    .description
                    .as_deref()
                    .map(strip_tags)
                    .unwrap_or_default(),
                url,
                location: it.region.filter(|r| !r.is_empty()),
                job_type: Some("Remote".to_string()),
                salary: None,
                tags: Vec::new(),
                posted_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
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
        histogram!("source_parse_ms", "source" => "weworkremotely").record(ms);
        counter!("source_jobs_total", "source" => "weworkremotely").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobFetcher for WeWorkRemotelySource {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_feed(s, params),
            Mode::Http { client } => {
                let body = client
                    .get(FEED_URL)
                    .send()
                    .await
                    .context("weworkremotely http get")?
                    .error_for_status()
                    .context("weworkremotely http status")?
                    .text()
                    .await
                    .context("weworkremotely http body")?;
                Self::parse_feed(&body, params)
            }
        }
    }

    fn name(&self) -> &'static str {
        "weworkremotely"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2822_dates_parse() {
        assert_eq!(
            parse_rfc2822_to_unix("Fri, 03 Nov 2023 10:00:00 +0000"),
            Some(1_699_005_600)
        );
        assert_eq!(parse_rfc2822_to_unix("garbage"), None);
    }

    #[test]
    fn title_splits_into_company_and_role() {
        let (company, title) = split_title("Acme Corp: Senior Rust Engineer");
        assert_eq!(company, "Acme Corp");
        assert_eq!(title, "Senior Rust Engineer");

        let (company, title) = split_title("Just a title");
        assert_eq!(company, "");
        assert_eq!(title, "Just a title");
    }
}
