// tests/smart_search.rs
//
// Resume-driven search over a stub adapter: keyword derivation, cross-query
// dedup, and term-overlap re-ranking.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use jobscout::jobs::smart::{smart_search, Certification, ResumeData, Skill, SmartSearchOptions};
use jobscout::jobs::sources::SourceRegistry;
use jobscout::jobs::types::{JobFetcher, JobListing, JobSearchParams, JobSource, SourceKind};
use jobscout::jobs::JobAggregator;

fn listing(id: &str, title: &str, description: &str, tags: &[&str]) -> JobListing {
    JobListing {
        id: id.to_string(),
        source: JobSource::Arbeitnow,
        title: title.to_string(),
        company: "Acme".into(),
        company_logo: None,
        description: description.to_string(),
        url: format!("https://example.com/{id}"),
        location: None,
        job_type: None,
        salary: None,
        tags: tags.iter().map(|s| s.to_string()).collect(),
        posted_at: None,
        country: None,
    }
}

/// Returns the same catalogue for every query, so the same ids come back for
/// each derived keyword and the dedup step has real work to do.
struct Catalogue {
    listings: Vec<JobListing>,
}

#[async_trait]
impl JobFetcher for Catalogue {
    async fn fetch(&self, _params: &JobSearchParams) -> Result<Vec<JobListing>> {
        Ok(self.listings.clone())
    }

    fn name(&self) -> &'static str {
        "catalogue"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }
}

fn resume() -> ResumeData {
    ResumeData {
        title: Some("Backend Developer".into()),
        skills: vec![
            Skill {
                name: "Rust".into(),
                proficiency: 90,
            },
            Skill {
                name: "PostgreSQL".into(),
                proficiency: 70,
            },
        ],
        certifications: vec![Certification {
            name: "AWS Certified Developer".into(),
        }],
    }
}

fn aggregator(listings: Vec<JobListing>) -> JobAggregator {
    JobAggregator::new(Arc::new(SourceRegistry::from_fetchers(vec![Arc::new(
        Catalogue { listings },
    )])))
}

#[tokio::test]
async fn ranks_by_keyword_overlap_and_dedups_across_queries() {
    let agg = aggregator(vec![
        listing("a", "Office Manager", "spreadsheets", &[]),
        listing(
            "b",
            "Rust Backend Developer",
            "postgresql on aws",
            &["rust"],
        ),
        listing("c", "Backend Engineer", "postgresql services", &[]),
    ]);

    let outcome = smart_search(&agg, &resume(), &SmartSearchOptions::default()).await;

    // Derived keywords lead with the strongest skill.
    assert_eq!(outcome.keywords[0], "rust");
    assert!(outcome.keywords.contains(&"aws".to_string()));

    // Three queries hit the same catalogue; each id must appear once.
    assert_eq!(outcome.jobs.len(), 3);

    // "b" matches rust+postgresql+backend+developer+aws, "c" two terms,
    // "a" none.
    let ids: Vec<&str> = outcome.jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn empty_resume_searches_nothing() {
    let agg = aggregator(vec![listing("a", "Any", "", &[])]);
    let outcome = smart_search(&agg, &ResumeData::default(), &SmartSearchOptions::default()).await;
    assert!(outcome.jobs.is_empty());
    assert!(outcome.keywords.is_empty());
    assert!(outcome.sources.is_empty());
}

#[tokio::test]
async fn limit_applies_after_reranking() {
    let agg = aggregator(vec![
        listing("low", "Office Manager", "", &[]),
        listing("high", "Rust Developer", "rust and postgresql", &[]),
    ]);
    let options = SmartSearchOptions {
        limit: Some(1),
        ..Default::default()
    };
    let outcome = smart_search(&agg, &resume(), &options).await;
    assert_eq!(outcome.jobs.len(), 1);
    assert_eq!(outcome.jobs[0].id, "high");
}
