// src/jobs/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Origin of a listing. Serialized in lowercase, matching the `source`
/// query-parameter vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSource {
    Remotive,
    Arbeitnow,
    Weworkremotely,
    Adzuna,
    Jooble,
    Geekhunter,
    Vagas,
}

impl JobSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobSource::Remotive => "remotive",
            JobSource::Arbeitnow => "arbeitnow",
            JobSource::Weworkremotely => "weworkremotely",
            JobSource::Adzuna => "adzuna",
            JobSource::Jooble => "jooble",
            JobSource::Geekhunter => "geekhunter",
            JobSource::Vagas => "vagas",
        }
    }
}

/// One normalized listing. Constructed per request, never persisted.
/// `id` is source-prefixed so it stays unique across the merged response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobListing {
    pub id: String,
    pub source: JobSource,
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    pub description: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Unix seconds. Absent when the source does not publish a date; such
    /// listings are never age-filtered and sort as oldest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Input contract shared by every source adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSearchParams {
    pub keyword: Option<String>,
    pub location: Option<String>,
    /// Single code, comma-joined list, or "all". "remote" is a pseudo-country.
    pub country: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
    /// When > 0, listings with a known `posted_at` older than this many days
    /// are dropped.
    pub max_age_days: Option<u32>,
}

/// Per-source outcome of one aggregated search. Lets callers tell "no jobs
/// exist" apart from "every source failed".
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SourceStatus {
    Ok { count: usize },
    Failed { reason: String },
    Disabled { reason: String },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceReport {
    /// Adapter label; per-country invocations read like "adzuna:br".
    pub source: String,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Merged result of one aggregated search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub jobs: Vec<JobListing>,
    pub sources: Vec<SourceReport>,
}

/// How the planner schedules an adapter across the selected countries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Listings are location-independent; runs when "remote" is selected.
    Remote,
    /// Runs once per selected country with cloned params.
    PerCountry,
    /// Tied to one country's job market; runs when that code is selected.
    Country(&'static str),
}

/// One external job-data origin.
///
/// Adapters do their own fetching and parsing and may fail; the aggregator
/// catches the error, logs it, and folds it into a `Failed` report. They must
/// not panic on malformed payloads.
#[async_trait::async_trait]
pub trait JobFetcher: Send + Sync {
    async fn fetch(&self, params: &JobSearchParams) -> Result<Vec<JobListing>>;
    fn name(&self) -> &'static str;
    fn kind(&self) -> SourceKind;
}

/// Case-insensitive match of `keyword` against a listing's searchable text.
/// Sources whose API cannot filter server-side call this client-side.
pub fn matches_keyword(listing: &JobListing, keyword: &str) -> bool {
    let kw = keyword.to_lowercase();
    if kw.is_empty() {
        return true;
    }
    listing.title.to_lowercase().contains(&kw)
        || listing.company.to_lowercase().contains(&kw)
        || listing.description.to_lowercase().contains(&kw)
        || listing.tags.iter().any(|t| t.to_lowercase().contains(&kw))
}

/// Stable listing id: source prefix + short hash of the listing URL, so the
/// same job gets the same id regardless of which extraction path found it.
pub fn listing_id(source: JobSource, url: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(source.as_str().len() + 13);
    out.push_str(source.as_str());
    out.push('-');
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
