// src/jobs/smart.rs
//! Resume-driven search: derive candidate keywords from a structured resume,
//! fan a handful of queries through the regular pipeline, and re-rank the
//! merged results by plain term overlap.

use serde::{Deserialize, Serialize};

use crate::jobs::types::{JobListing, JobSearchParams, SourceReport};
use crate::jobs::JobAggregator;

/// Structured resume fields the keyword derivation reads. Mirrors what the
/// portfolio stores; everything is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResumeData {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Skill {
    pub name: String,
    /// 0-100; higher ranks first.
    #[serde(default)]
    pub proficiency: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Certification {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmartSearchOptions {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub max_age_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartSearchOutcome {
    pub jobs: Vec<JobListing>,
    pub keywords: Vec<String>,
    pub sources: Vec<SourceReport>,
}

const MAX_SKILL_KEYWORDS: usize = 8;
const MAX_QUERIES: usize = 3;

/// Title noise that never makes a useful query term.
const TITLE_STOPWORDS: &[&str] = &[
    "senior", "junior", "pleno", "lead", "staff", "principal", "the", "and", "for", "com", "de",
    "do", "da", "em",
];

/// Technology names recognized inside certification titles.
const CERT_TECH: &[&str] = &[
    "aws", "azure", "gcp", "kubernetes", "docker", "terraform", "linux", "java", "python", "rust",
    "react", "node", "typescript", "go", "scrum", "security",
];

/// Candidate keywords, strongest first: skills by proficiency, then
/// title-derived role words, then certification technologies. Deduplicated,
/// order-preserving, all lowercase.
pub fn derive_keywords(resume: &ResumeData) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |kw: String| {
        let kw = kw.trim().to_lowercase();
        if !kw.is_empty() && !out.contains(&kw) {
            out.push(kw);
        }
    };

    let mut skills = resume.skills.clone();
    skills.sort_by(|a, b| b.proficiency.cmp(&a.proficiency));
    for skill in skills.into_iter().take(MAX_SKILL_KEYWORDS) {
        push(skill.name);
    }

    if let Some(title) = &resume.title {
        for word in title.split_whitespace() {
            let w: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if w.chars().count() >= 3 && !TITLE_STOPWORDS.contains(&w.as_str()) {
                push(w);
            }
        }
    }

    for cert in &resume.certifications {
        let name = cert.name.to_lowercase();
        for tech in CERT_TECH {
            if name.contains(tech) {
                push(tech.to_string());
            }
        }
    }

    out
}

/// One query per leading keyword, capped.
fn build_queries(keywords: &[String]) -> Vec<String> {
    keywords.iter().take(MAX_QUERIES).cloned().collect()
}

/// How many of the derived keywords appear in the listing's title,
/// description, or tags. No weighting.
fn keyword_overlap(listing: &JobListing, keywords: &[String]) -> usize {
    let haystack = format!(
        "{} {} {}",
        listing.title.to_lowercase(),
        listing.description.to_lowercase(),
        listing.tags.join(" ").to_lowercase()
    );
    keywords.iter().filter(|kw| haystack.contains(kw.as_str())).count()
}

/// Fan the derived queries through the aggregator, merge, dedup by id, and
/// re-rank by term overlap (stable, so ties keep their merge order).
pub async fn smart_search(
    aggregator: &JobAggregator,
    resume: &ResumeData,
    options: &SmartSearchOptions,
) -> SmartSearchOutcome {
    let keywords = derive_keywords(resume);
    let queries = build_queries(&keywords);
    if queries.is_empty() {
        return SmartSearchOutcome {
            jobs: Vec::new(),
            keywords,
            sources: Vec::new(),
        };
    }

    let outcomes = futures::future::join_all(queries.iter().map(|query| {
        let params = JobSearchParams {
            keyword: Some(query.clone()),
            country: options.country.clone(),
            max_age_days: options.max_age_days,
            ..Default::default()
        };
        let source = options.source.clone();
        async move { aggregator.search(&params, source.as_deref()).await }
    }))
    .await;

    let mut sources = Vec::new();
    let mut merged: Vec<JobListing> = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for outcome in outcomes {
        sources.extend(outcome.sources);
        for job in outcome.jobs {
            if seen.insert(job.id.clone()) {
                merged.push(job);
            }
        }
    }

    merged.sort_by_key(|job| std::cmp::Reverse(keyword_overlap(job, &keywords)));
    if let Some(limit) = options.limit {
        merged.truncate(limit);
    }

    SmartSearchOutcome {
        jobs: merged,
        keywords,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobSource;

    fn resume() -> ResumeData {
        ResumeData {
            title: Some("Senior Backend Developer".into()),
            skills: vec![
                Skill {
                    name: "PHP".into(),
                    proficiency: 40,
                },
                Skill {
                    name: "Rust".into(),
                    proficiency: 95,
                },
                Skill {
                    name: "PostgreSQL".into(),
                    proficiency: 80,
                },
            ],
            certifications: vec![Certification {
                name: "AWS Certified Solutions Architect".into(),
            }],
        }
    }

    #[test]
    fn keywords_rank_skills_by_proficiency_then_title_then_certs() {
        let kws = derive_keywords(&resume());
        assert_eq!(kws[0], "rust");
        assert_eq!(kws[1], "postgresql");
        assert_eq!(kws[2], "php");
        assert!(kws.contains(&"backend".to_string()));
        assert!(kws.contains(&"developer".to_string()));
        assert!(kws.contains(&"aws".to_string()));
        // "senior" is title noise.
        assert!(!kws.contains(&"senior".to_string()));
    }

    #[test]
    fn keywords_dedup_preserving_first_position() {
        let mut r = resume();
        r.certifications.push(Certification {
            name: "Rust Professional Certificate".into(),
        });
        let kws = derive_keywords(&r);
        assert_eq!(kws.iter().filter(|k| k.as_str() == "rust").count(), 1);
        assert_eq!(kws[0], "rust");
    }

    #[test]
    fn queries_are_capped() {
        let kws = derive_keywords(&resume());
        assert_eq!(build_queries(&kws).len(), MAX_QUERIES);
    }

    #[test]
    fn overlap_counts_distinct_keywords_only() {
        let listing = JobListing {
            id: "x".into(),
            source: JobSource::Remotive,
            title: "Rust Backend Engineer".into(),
            company: "Acme".into(),
            company_logo: None,
            description: "rust rust rust".into(),
            url: "https://x".into(),
            location: None,
            job_type: None,
            salary: None,
            tags: vec!["postgresql".into()],
            posted_at: None,
            country: None,
        };
        let kws = vec!["rust".to_string(), "postgresql".into(), "kubernetes".into()];
        // "rust" counts once no matter how often it appears.
        assert_eq!(keyword_overlap(&listing, &kws), 2);
    }
}
