// src/jobs/mod.rs
//! Multi-source job search: fan the request out to every applicable adapter,
//! join all of them, and fold the settled results into one deduplicated,
//! recency-filtered, sorted listing plus a per-source status report.

pub mod extract;
pub mod smart;
pub mod sources;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

use crate::jobs::sources::SourceRegistry;
use crate::jobs::types::{
    JobFetcher, JobListing, JobSearchParams, SearchOutcome, SourceKind, SourceReport, SourceStatus,
};

/// Per-country sources swept under `country=all`.
pub const DEFAULT_SWEEP_COUNTRIES: [&str; 2] = ["br", "pt"];

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_requests_total", "Aggregated searches served.");
        describe_counter!("search_jobs_found_total", "Listings returned after the pipeline.");
        describe_counter!("source_jobs_total", "Listings parsed, per source.");
        describe_counter!("source_errors_total", "Adapter fetch/parse failures, per source.");
        describe_histogram!("source_parse_ms", "Adapter parse time in milliseconds.");
    });
}

/// Which sources the caller asked for: `all` (or nothing) means every
/// registered adapter; otherwise a comma list of adapter names.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SourceSelection {
    All,
    Named(Vec<String>),
}

impl SourceSelection {
    fn parse(arg: Option<&str>) -> Self {
        match arg.map(str::trim) {
            None | Some("") | Some("all") => SourceSelection::All,
            Some(list) => SourceSelection::Named(
                list.split(',')
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
        }
    }

    fn includes(&self, name: &str) -> bool {
        match self {
            SourceSelection::All => true,
            SourceSelection::Named(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Country selection; "remote" is a pseudo-country, "all" selects remote plus
/// the default per-country sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CountrySelection {
    codes: Vec<String>,
    remote: bool,
    all: bool,
}

impl CountrySelection {
    fn parse(arg: Option<&str>) -> Self {
        let raw = match arg.map(str::trim) {
            None | Some("") | Some("all") => {
                return Self {
                    codes: Vec::new(),
                    remote: true,
                    all: true,
                }
            }
            Some(list) => list,
        };
        let mut codes = Vec::new();
        let mut remote = false;
        for part in raw.split(',') {
            let code = part.trim().to_ascii_lowercase();
            if code.is_empty() {
                continue;
            }
            if code == "remote" {
                remote = true;
            } else if !codes.contains(&code) {
                codes.push(code);
            }
        }
        Self {
            codes,
            remote,
            all: false,
        }
    }

    fn selects_country(&self, code: &str) -> bool {
        self.all || self.codes.iter().any(|c| c == code)
    }
}

struct PlannedCall {
    label: String,
    fetcher: Arc<dyn JobFetcher>,
    params: JobSearchParams,
}

/// Build the fan-out list: one invocation per (adapter, country) pair that the
/// selection admits. Remote-only adapters run at most once.
fn plan_calls(
    fetchers: &[Arc<dyn JobFetcher>],
    selection: &SourceSelection,
    countries: &CountrySelection,
    params: &JobSearchParams,
) -> Vec<PlannedCall> {
    let mut calls = Vec::new();
    for fetcher in fetchers {
        if !selection.includes(fetcher.name()) {
            continue;
        }
        match fetcher.kind() {
            SourceKind::Remote => {
                if countries.remote || countries.all {
                    let mut p = params.clone();
                    p.country = None;
                    calls.push(PlannedCall {
                        label: fetcher.name().to_string(),
                        fetcher: fetcher.clone(),
                        params: p,
                    });
                }
            }
            SourceKind::PerCountry => {
                let codes: Vec<String> = if countries.all {
                    DEFAULT_SWEEP_COUNTRIES.iter().map(|s| s.to_string()).collect()
                } else {
                    countries.codes.clone()
                };
                for code in codes {
                    let mut p = params.clone();
                    p.country = Some(code.clone());
                    calls.push(PlannedCall {
                        label: format!("{}:{}", fetcher.name(), code),
                        fetcher: fetcher.clone(),
                        params: p,
                    });
                }
            }
            SourceKind::Country(code) => {
                if countries.selects_country(code) {
                    let mut p = params.clone();
                    p.country = Some(code.to_string());
                    calls.push(PlannedCall {
                        label: fetcher.name().to_string(),
                        fetcher: fetcher.clone(),
                        params: p,
                    });
                }
            }
        }
    }
    calls
}

/// Drop repeated ids, first occurrence wins.
fn dedup_by_id(jobs: Vec<JobListing>) -> Vec<JobListing> {
    let mut seen: HashSet<String> = HashSet::with_capacity(jobs.len());
    let mut out = Vec::with_capacity(jobs.len());
    for job in jobs {
        if seen.insert(job.id.clone()) {
            out.push(job);
        }
    }
    out
}

/// Keep listings younger than `max_age_days`. Undated listings are always
/// kept: their staleness cannot be proven.
fn filter_by_age(jobs: Vec<JobListing>, now_secs: u64, max_age_days: u32) -> Vec<JobListing> {
    if max_age_days == 0 {
        return jobs;
    }
    let cutoff = now_secs.saturating_sub(u64::from(max_age_days) * 86_400);
    jobs.into_iter()
        .filter(|j| j.posted_at.map_or(true, |ts| ts >= cutoff))
        .collect()
}

/// Newest first; undated listings order as oldest. Stable, so equal dates keep
/// their merge order.
fn sort_newest_first(jobs: &mut [JobListing]) {
    jobs.sort_by(|a, b| b.posted_at.unwrap_or(0).cmp(&a.posted_at.unwrap_or(0)));
}

/// Fan-out/fan-in coordinator over a fixed adapter registry. Holds no mutable
/// state; each search is independent.
pub struct JobAggregator {
    registry: Arc<SourceRegistry>,
}

impl JobAggregator {
    pub fn new(registry: Arc<SourceRegistry>) -> Self {
        ensure_metrics_described();
        Self { registry }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run one aggregated search. Total: adapter failures become `Failed`
    /// reports with empty contributions, never an error of the whole search.
    pub async fn search(&self, params: &JobSearchParams, source: Option<&str>) -> SearchOutcome {
        let now_secs = chrono::Utc::now().timestamp().max(0) as u64;
        self.search_at(now_secs, params, source).await
    }

    /// Time-parameterized variant for deterministic age-filter tests.
    pub async fn search_at(
        &self,
        now_secs: u64,
        params: &JobSearchParams,
        source: Option<&str>,
    ) -> SearchOutcome {
        counter!("search_requests_total").increment(1);

        let selection = SourceSelection::parse(source);
        let countries = CountrySelection::parse(params.country.as_deref());
        let calls = plan_calls(self.registry.fetchers(), &selection, &countries, params);

        let settled = futures::future::join_all(calls.into_iter().map(|call| async move {
            let result = call.fetcher.fetch(&call.params).await;
            (call.label, result)
        }))
        .await;

        let mut jobs: Vec<JobListing> = Vec::new();
        let mut reports: Vec<SourceReport> = Vec::new();
        for (label, result) in settled {
            match result {
                Ok(found) => {
                    reports.push(SourceReport {
                        source: label,
                        status: SourceStatus::Ok { count: found.len() },
                    });
                    jobs.extend(found);
                }
                Err(e) => {
                    tracing::warn!(source = %label, error = ?e, "source failed");
                    counter!("source_errors_total", "source" => label.clone()).increment(1);
                    reports.push(SourceReport {
                        source: label,
                        status: SourceStatus::Failed {
                            reason: e.to_string(),
                        },
                    });
                }
            }
        }
        // Keyed sources without configuration show up as disabled, so callers
        // can tell "nothing found" from "not even asked".
        for report in self.registry.disabled() {
            if selection.includes(report.source.as_str()) {
                reports.push(report.clone());
            }
        }

        let mut jobs = dedup_by_id(jobs);
        if let Some(days) = params.max_age_days {
            jobs = filter_by_age(jobs, now_secs, days);
        }
        sort_newest_first(&mut jobs);
        if let Some(limit) = params.limit {
            jobs.truncate(limit);
        }

        counter!("search_jobs_found_total").increment(jobs.len() as u64);
        SearchOutcome { jobs, sources: reports }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobSource;

    fn job(id: &str, posted_at: Option<u64>) -> JobListing {
        JobListing {
            id: id.to_string(),
            source: JobSource::Remotive,
            title: "t".into(),
            company: "c".into(),
            company_logo: None,
            description: String::new(),
            url: format!("https://x/{id}"),
            location: None,
            job_type: None,
            salary: None,
            tags: Vec::new(),
            posted_at,
            country: None,
        }
    }

    #[test]
    fn source_selection_parses_all_and_lists() {
        assert_eq!(SourceSelection::parse(None), SourceSelection::All);
        assert_eq!(SourceSelection::parse(Some("all")), SourceSelection::All);
        let named = SourceSelection::parse(Some("Remotive, jooble"));
        assert!(named.includes("remotive"));
        assert!(named.includes("jooble"));
        assert!(!named.includes("adzuna"));
    }

    #[test]
    fn country_selection_handles_remote_and_lists() {
        let all = CountrySelection::parse(Some("all"));
        assert!(all.all && all.remote);

        let multi = CountrySelection::parse(Some("br, pt"));
        assert_eq!(multi.codes, vec!["br", "pt"]);
        assert!(!multi.remote && !multi.all);

        let mixed = CountrySelection::parse(Some("remote,br"));
        assert!(mixed.remote);
        assert_eq!(mixed.codes, vec!["br"]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let jobs = vec![job("a", Some(1)), job("b", None), job("a", Some(2))];
        let out = dedup_by_id(jobs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].posted_at, Some(1));
    }

    #[test]
    fn age_filter_keeps_undated_listings() {
        let now = 20 * 86_400;
        let jobs = vec![
            job("old", Some(5 * 86_400)),  // 15 days old
            job("new", Some(15 * 86_400)), // 5 days old
            job("undated", None),
        ];
        let out = filter_by_age(jobs, now, 7);
        let ids: Vec<&str> = out.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "undated"]);
    }

    #[test]
    fn sort_puts_undated_last() {
        let mut jobs = vec![job("undated", None), job("old", Some(10)), job("new", Some(99))];
        sort_newest_first(&mut jobs);
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
