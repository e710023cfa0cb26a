//! AI extraction strategy: hand a stripped-down page to a chat-completions
//! model with a strict JSON-array-only instruction and parse whatever array
//! comes back. Any failure (no key, HTTP error, malformed output, no array)
//! is an `Err`, which sends the chain on to the pattern parser.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::jobs::extract::{absolutize, clean_html_for_model, ExtractContext, Extractor};
use crate::jobs::types::{listing_id, JobListing};

const MAX_HTML_CHARS: usize = 12_000;

pub struct AiExtractor {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl AiExtractor {
    /// Reads `OPENAI_API_KEY`; an extractor built without a key fails fast in
    /// `extract` so the chain falls through to the pattern parser.
    pub fn from_env() -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default(), None)
    }

    pub fn new(api_key: String, model_override: Option<&str>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("jobscout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn build_prompt(html: &str, source: &str, max_jobs: usize) -> String {
        format!(
            "Extract the job listings from this {source} HTML.\n\
             For each listing return a JSON object with:\n\
             - title: job title\n\
             - company: company name\n\
             - location: city/state or \"Remote\"\n\
             - url: listing URL (the link href)\n\
             - salary: salary if mentioned (or null)\n\
             - tags: array of mentioned technologies/skills\n\n\
             Return ONLY a valid JSON array, no extra text. Extract at most {max_jobs} listings.\n\n\
             Example response:\n\
             [{{\"title\": \"Dev Python\", \"company\": \"TechCorp\", \"location\": \"Remote\", \"url\": \"/vagas/123\", \"salary\": null, \"tags\": [\"Python\", \"Django\"]}}]\n\n\
             HTML:\n{html}"
        )
    }

    /// Parse the model reply: find the first JSON array, decode it, and keep
    /// only schema-valid items (a non-empty title).
    pub(crate) fn parse_reply(content: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>> {
        static RE_ARRAY: OnceCell<Regex> = OnceCell::new();
        let re_array = RE_ARRAY.get_or_init(|| Regex::new(r"(?s)\[.*\]").unwrap());
        let raw = re_array
            .find(content)
            .ok_or_else(|| anyhow!("no JSON array in model reply"))?
            .as_str();

        #[derive(Deserialize)]
        struct RawJob {
            #[serde(default)]
            title: String,
            #[serde(default)]
            company: String,
            #[serde(default)]
            location: Option<String>,
            #[serde(default)]
            url: String,
            #[serde(default)]
            salary: Option<String>,
            #[serde(default)]
            tags: Vec<String>,
        }

        let items: Vec<RawJob> = serde_json::from_str(raw).context("decoding model JSON array")?;

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let title = item.title.trim().to_string();
            if title.is_empty() {
                continue;
            }
            let url = if item.url.is_empty() {
                String::new()
            } else {
                absolutize(ctx.base_url, &item.url)
            };
            // Same id scheme as the pattern parsers, so the listing dedups
            // identically whichever strategy found it.
            let id = if url.is_empty() {
                format!("{}-ai-{}", ctx.source.as_str(), i)
            } else {
                listing_id(ctx.source, &url)
            };
            out.push(JobListing {
                id,
                source: ctx.source,
                title,
                company: if item.company.trim().is_empty() {
                    "Unknown company".to_string()
                } else {
                    item.company.trim().to_string()
                },
                company_logo: None,
                description: String::new(),
                url,
                location: item.location.filter(|l| !l.trim().is_empty()),
                job_type: None,
                salary: item.salary.filter(|s| !s.trim().is_empty()),
                tags: item.tags,
                posted_at: None,
                country: Some(ctx.country.to_string()),
            });
            if out.len() >= ctx.limit {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl Extractor for AiExtractor {
    async fn extract(&self, html: &str, ctx: &ExtractContext) -> Result<Vec<JobListing>> {
        if !self.is_enabled() {
            return Err(anyhow!("OPENAI_API_KEY not configured"));
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let cleaned = clean_html_for_model(html, MAX_HTML_CHARS);
        let prompt = Self::build_prompt(&cleaned, ctx.source.as_str(), ctx.limit);
        let req = Req {
            model: &self.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.1,
            max_tokens: 2000,
        };

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("ai extractor http post")?;

        if !resp.status().is_success() {
            return Err(anyhow!("ai extractor non-2xx: {}", resp.status()));
        }
        let body: Resp = resp.json().await.context("ai extractor response json")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");

        Self::parse_reply(content, ctx)
    }

    fn name(&self) -> &'static str {
        "ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobSource;

    fn ctx() -> ExtractContext {
        ExtractContext {
            source: JobSource::Geekhunter,
            base_url: "https://www.geekhunter.com.br",
            country: "br",
            limit: 50,
        }
    }

    #[test]
    fn parse_reply_reads_array_with_surrounding_prose() {
        let reply = r#"Here you go:
[{"title": "Dev Rust", "company": "Acme", "location": "Remoto", "url": "/vagas/9", "salary": null, "tags": ["Rust"]}]
Hope that helps."#;
        let jobs = AiExtractor::parse_reply(reply, &ctx()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://www.geekhunter.com.br/vagas/9");
        assert_eq!(jobs[0].country.as_deref(), Some("br"));
        assert!(jobs[0].id.starts_with("geekhunter-"));
    }

    #[test]
    fn parse_reply_skips_titleless_items() {
        let reply = r#"[{"title": "", "company": "A"}, {"title": "Real", "company": "B", "url": "/v/1"}]"#;
        let jobs = AiExtractor::parse_reply(reply, &ctx()).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].title, "Real");
    }

    #[test]
    fn parse_reply_errors_without_an_array() {
        let err = AiExtractor::parse_reply("sorry, the page has no jobs", &ctx()).unwrap_err();
        assert!(err.to_string().contains("no JSON array"));
    }

    #[test]
    fn parse_reply_errors_on_malformed_json() {
        assert!(AiExtractor::parse_reply("[{not json]", &ctx()).is_err());
    }
}
