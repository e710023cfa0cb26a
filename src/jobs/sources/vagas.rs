//! Vagas.com.br scraped board. Listings sit in `<li>` rows around an anchor
//! with the `link-detalhes-vaga` class; the row also carries the company,
//! location, and seniority level classes the pattern parser keys on.

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::jobs::extract::{absolutize, strip_tags, ExtractContext, Extractor, ExtractorChain};
use crate::jobs::sources::scraped::{BoardProfile, ScrapedBoard};
use crate::jobs::types::{listing_id, JobListing, JobSource};

pub static PROFILE: BoardProfile = BoardProfile {
    source: JobSource::Vagas,
    name: "vagas",
    base_url: "https://www.vagas.com.br",
    country: "br",
    build_search_url: |params| {
        let kw = params.keyword.as_deref().unwrap_or("desenvolvedor");
        let slug = kw.trim().replace(' ', "-").to_lowercase();
        format!("https://www.vagas.com.br/vagas-de-{slug}")
    },
};

pub fn board(chain: ExtractorChain, client: reqwest::Client) -> ScrapedBoard {
    ScrapedBoard::new(&PROFILE, chain, client)
}

/// Fixed pattern parser for Vagas.com.br list markup.
pub struct VagasPattern;

fn re_row() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"(?is)<li\b.*?</li>").unwrap())
}

fn re_link() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*class="[^"]*link-detalhes-vaga[^"]*"[^>]*>"#).unwrap()
    })
}

fn re_href() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?is)href="(?P<h>[^"]+)""#).unwrap())
}

fn re_title_attr() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"(?is)title="(?P<t>[^"]*)""#).unwrap())
}

fn re_company() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:emprVaga|empresa)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

fn re_location() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:vaga-local|local)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

fn re_level() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:nivelVaga|nivel)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

#[async_trait::async_trait]
impl Extractor for VagasPattern {
    async fn extract(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>> {
        let mut jobs = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();

        for row in re_row().find_iter(html) {
            let row = row.as_str();
            let link_tag = match re_link().find(row) {
                Some(m) => m.as_str(),
                None => continue,
            };
            let href = match re_href().captures(link_tag).and_then(|c| c.name("h")) {
                Some(m) => m.as_str(),
                None => continue,
            };
            let title = re_title_attr()
                .captures(link_tag)
                .and_then(|c| c.name("t"))
                .map(|m| strip_tags(m.as_str()))
                .unwrap_or_default();
            if title.is_empty() {
                continue;
            }

            let url = absolutize(ctx.base_url, href);
            if !seen_urls.insert(url.clone()) {
                continue;
            }

            let field = |re: &Regex| {
                re.captures(row)
                    .and_then(|c| c.name("t"))
                    .map(|m| strip_tags(m.as_str()))
                    .filter(|s| !s.is_empty())
            };
            let level = field(re_level());

            jobs.push(JobListing {
                id: listing_id(ctx.source, &url),
                source: ctx.source,
                title,
                company: field(re_company()).unwrap_or_else(|| "Empresa confidencial".into()),
                company_logo: None,
                description: level
                    .as_deref()
                    .map(|l| format!("Nivel: {l}"))
                    .unwrap_or_default(),
                url,
                location: Some(field(re_location()).unwrap_or_else(|| "Brasil".into())),
                job_type: Some("On-site".into()),
                salary: None,
                tags: level.into_iter().collect(),
                posted_at: None,
                country: Some(ctx.country.to_string()),
            });
            if jobs.len() >= ctx.limit {
                break;
            }
        }
        Ok(jobs)
    }

    fn name(&self) -> &'static str {
        "pattern"
    }
}
