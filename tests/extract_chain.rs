// tests/extract_chain.rs
//
// Strategy-chain behavior for scraped boards: an earlier strategy failing or
// returning nothing hands the page to the next one; the first non-empty,
// valid result wins.

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use jobscout::jobs::extract::{ExtractContext, Extractor, ExtractorChain};
use jobscout::jobs::sources::geekhunter::{self, GeekHunterPattern};
use jobscout::jobs::types::{JobListing, JobSource};

const PAGE: &str = include_str!("fixtures/geekhunter.html");

fn ctx() -> ExtractContext {
    ExtractContext {
        source: JobSource::Geekhunter,
        base_url: geekhunter::PROFILE.base_url,
        country: "br",
        limit: 50,
    }
}

/// Stands in for the AI strategy without any network: fails, returns nothing,
/// or returns one canned listing.
struct Canned {
    outcome: Outcome,
}

enum Outcome {
    Fail,
    Empty,
    One,
}

#[async_trait]
impl Extractor for Canned {
    async fn extract(&self, _html: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>> {
        match self.outcome {
            Outcome::Fail => Err(anyhow!("model unavailable")),
            Outcome::Empty => Ok(Vec::new()),
            Outcome::One => Ok(vec![JobListing {
                id: "geekhunter-canned".into(),
                source: ctx.source,
                title: "Canned listing".into(),
                company: "Model Co".into(),
                company_logo: None,
                description: String::new(),
                url: "https://www.geekhunter.com.br/vagas/canned".into(),
                location: None,
                job_type: None,
                salary: None,
                tags: Vec::new(),
                posted_at: None,
                country: Some("br".into()),
            }]),
        }
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

#[tokio::test]
async fn failing_first_strategy_falls_back_to_pattern() {
    let chain = ExtractorChain::new(vec![
        Box::new(Canned {
            outcome: Outcome::Fail,
        }),
        Box::new(GeekHunterPattern),
    ]);
    let (jobs, winner) = chain.run(PAGE, &ctx()).await;
    assert_eq!(winner, Some("pattern"));
    assert_eq!(jobs.len(), 2); // fixture has two distinct cards
    assert_eq!(jobs[0].company, "Stone Pagamentos");
}

#[tokio::test]
async fn empty_first_strategy_also_falls_through() {
    let chain = ExtractorChain::new(vec![
        Box::new(Canned {
            outcome: Outcome::Empty,
        }),
        Box::new(GeekHunterPattern),
    ]);
    let (jobs, winner) = chain.run(PAGE, &ctx()).await;
    assert_eq!(winner, Some("pattern"));
    assert!(!jobs.is_empty());
}

#[tokio::test]
async fn first_non_empty_strategy_wins_and_stops_the_chain() {
    let chain = ExtractorChain::new(vec![
        Box::new(Canned {
            outcome: Outcome::One,
        }),
        Box::new(GeekHunterPattern),
    ]);
    let (jobs, winner) = chain.run(PAGE, &ctx()).await;
    assert_eq!(winner, Some("canned"));
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].id, "geekhunter-canned");
}

#[tokio::test]
async fn exhausted_chain_yields_empty() {
    let chain = ExtractorChain::new(vec![
        Box::new(Canned {
            outcome: Outcome::Fail,
        }),
        Box::new(Canned {
            outcome: Outcome::Empty,
        }),
    ]);
    let (jobs, winner) = chain.run(PAGE, &ctx()).await;
    assert!(jobs.is_empty());
    assert_eq!(winner, None);
}
