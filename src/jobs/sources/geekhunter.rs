//! GeekHunter (geekhunter.com.br) scraped board. The site is a React SPA, so
//! the server-rendered markup is sparse; the pattern parser keys on the
//! `/vagas/` listing anchors and the card classes around them.

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::jobs::extract::{absolutize, strip_tags, ExtractContext, Extractor, ExtractorChain};
use crate::jobs::sources::scraped::{BoardProfile, ScrapedBoard};
use crate::jobs::types::{listing_id, JobListing, JobSource};

pub static PROFILE: BoardProfile = BoardProfile {
    source: JobSource::Geekhunter,
    name: "geekhunter",
    base_url: "https://www.geekhunter.com.br",
    country: "br",
    build_search_url: |params| {
        let kw = params.keyword.as_deref().unwrap_or("desenvolvedor");
        format!("https://www.geekhunter.com.br/vagas?search={kw}")
    },
};

pub fn board(chain: ExtractorChain, client: reqwest::Client) -> ScrapedBoard {
    ScrapedBoard::new(&PROFILE, chain, client)
}

/// Fixed pattern parser for GeekHunter's card markup.
pub struct GeekHunterPattern;

fn re_card() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\b[^>]*href="(?P<href>(?:https?://www\.geekhunter\.com\.br)?/vagas/[^"]+)"[^>]*>(?P<body>.*?)</a>"#)
            .unwrap()
    })
}

fn re_title() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<(?:h2|h3)[^>]*>(?P<t>.*?)</(?:h2|h3)>"#).unwrap()
    })
}

fn re_company() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:company|empresa)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

fn re_location() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:location|local)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

fn re_salary() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:salary|salario)[^"]*"[^>]*>(?P<t>[^<]+)"#).unwrap()
    })
}

fn re_tag() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)class="[^"]*(?:tag|skill)[^"]*"[^>]*>(?P<t>[^<]+)<"#).unwrap()
    })
}

#[async_trait::async_trait]
impl Extractor for GeekHunterPattern {
    async fn extract(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>> {
        let mut jobs = Vec::new();
        let mut seen_urls = std::collections::HashSet::new();

        for caps in re_card().captures_iter(html) {
            let href = caps.name("href").map(|m| m.as_str()).unwrap_or_default();
            let body = caps.name("body").map(|m| m.as_str()).unwrap_or_default();

            let url = absolutize(ctx.base_url, href);
            if !seen_urls.insert(url.clone()) {
                continue;
            }

            let title = re_title()
                .captures(body)
                .and_then(|c| c.name("t"))
                .map(|m| strip_tags(m.as_str()))
                .unwrap_or_else(|| strip_tags(body));
            if title.chars().count() < 5 {
                continue;
            }

            let field = |re: &Regex| {
                re.captures(body)
                    .and_then(|c| c.name("t"))
                    .map(|m| strip_tags(m.as_str()))
                    .filter(|s| !s.is_empty())
            };

            let tags: Vec<String> = re_tag()
                .captures_iter(body)
                .filter_map(|c| c.name("t").map(|m| strip_tags(m.as_str())))
                .filter(|t| !t.is_empty())
                .take(10)
                .collect();

            jobs.push(JobListing {
                id: listing_id(ctx.source, &url),
                source: ctx.source,
                title,
                company: field(re_company()).unwrap_or_else(|| "Empresa nao identificada".into()),
                company_logo: None,
                description: String::new(),
                url,
                location: Some(field(re_location()).unwrap_or_else(|| "Brasil".into())),
                job_type: Some("On-site".into()),
                salary: field(re_salary()),
                tags,
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

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"
        <html><body>
        <div class="job-list">
          <a href="/vagas/dev-rust-1234" class="job-card">
            <h2 class="job-title">Desenvolvedor(a) Rust Senior</h2>
            <span class="company-name">Nubank</span>
            <span class="job-location">Sao Paulo</span>
            <span class="salary-range">R$ 15.000</span>
            <div class="tech-stack"><span class="tag">Rust</span><span class="tag">AWS</span></div>
          </a>
          <a href="/vagas/dev-rust-1234" class="job-card"><h2>Duplicate card anchor text</h2></a>
          <a href="/vagas/x" class="job-card"><h2>abc</h2></a>
          <a href="/sobre">About us</a>
        </div>
        </body></html>"#;

    fn ctx() -> ExtractContext {
        ExtractContext {
            source: JobSource::Geekhunter,
            base_url: PROFILE.base_url,
            country: "br",
            limit: 50,
        }
    }

    #[tokio::test]
    async fn parses_cards_skipping_dupes_and_short_titles() {
        let jobs = GeekHunterPattern.extract(HTML, &ctx()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        let j = &jobs[0];
        assert_eq!(j.title, "Desenvolvedor(a) Rust Senior");
        assert_eq!(j.company, "Nubank");
        assert_eq!(j.location.as_deref(), Some("Sao Paulo"));
        assert_eq!(j.salary.as_deref(), Some("R$ 15.000"));
        assert_eq!(j.tags, vec!["Rust".to_string(), "AWS".to_string()]);
        assert_eq!(j.url, "https://www.geekhunter.com.br/vagas/dev-rust-1234");
        assert_eq!(j.country.as_deref(), Some("br"));
    }

    #[tokio::test]
    async fn empty_page_yields_empty_vec() {
        let jobs = GeekHunterPattern
            .extract("<html><body>nothing here</body></html>", &ctx())
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }
}
