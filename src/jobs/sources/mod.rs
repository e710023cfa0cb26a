// src/jobs/sources/mod.rs
pub mod adzuna;
pub mod arbeitnow;
pub mod geekhunter;
pub mod jooble;
pub mod remotive;
pub mod scraped;
pub mod vagas;
pub mod wwr_rss;

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::jobs::extract::ai::AiExtractor;
use crate::jobs::extract::{Extractor, ExtractorChain};
use crate::jobs::types::{JobFetcher, SourceReport, SourceStatus};

/// The adapters one process runs with, fixed at boot. Keyed sources whose
/// environment variables are absent land in `disabled` instead of `fetchers`
/// ("degrade to nothing", reported rather than silent).
pub struct SourceRegistry {
    fetchers: Vec<Arc<dyn JobFetcher>>,
    disabled: Vec<SourceReport>,
}

impl SourceRegistry {
    pub fn from_config(config: &AppConfig, whitelist: &[String]) -> Self {
        let api_client = reqwest::Client::builder()
            .user_agent("jobscout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .expect("reqwest client");
        let scrape_client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) jobscout/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.scrape_timeout_secs))
            .build()
            .expect("reqwest client");

        let enabled = |name: &str| whitelist.is_empty() || whitelist.iter().any(|w| w == name);

        let mut fetchers: Vec<Arc<dyn JobFetcher>> = Vec::new();
        let mut disabled: Vec<SourceReport> = Vec::new();

        if enabled("remotive") {
            fetchers.push(Arc::new(remotive::RemotiveSource::new(api_client.clone())));
        }
        if enabled("arbeitnow") {
            fetchers.push(Arc::new(arbeitnow::ArbeitnowSource::new(api_client.clone())));
        }
        if enabled("weworkremotely") {
            fetchers.push(Arc::new(wwr_rss::WeWorkRemotelySource::new(
                api_client.clone(),
            )));
        }

        if enabled("adzuna") {
            match config.adzuna_keys() {
                Some((id, key)) => fetchers.push(Arc::new(adzuna::AdzunaSource::new(
                    api_client.clone(),
                    id,
                    key,
                ))),
                None => disabled.push(SourceReport {
                    source: "adzuna".to_string(),
                    status: SourceStatus::Disabled {
                        reason: "ADZUNA_APP_ID / ADZUNA_APP_KEY not set".to_string(),
                    },
                }),
            }
        }
        if enabled("jooble") {
            match &config.jooble_api_key {
                Some(key) => fetchers.push(Arc::new(jooble::JoobleSource::new(
                    api_client.clone(),
                    key.clone(),
                ))),
                None => disabled.push(SourceReport {
                    source: "jooble".to_string(),
                    status: SourceStatus::Disabled {
                        reason: "JOOBLE_API_KEY not set".to_string(),
                    },
                }),
            }
        }

        if enabled("geekhunter") {
            let chain = extraction_chain(config, Box::new(geekhunter::GeekHunterPattern));
            fetchers.push(Arc::new(geekhunter::board(chain, scrape_client.clone())));
        }
        if enabled("vagas") {
            let chain = extraction_chain(config, Box::new(vagas::VagasPattern));
            fetchers.push(Arc::new(vagas::board(chain, scrape_client.clone())));
        }

        Self { fetchers, disabled }
    }

    /// Registry over explicit fetchers; used by tests and by smart search
    /// wrappers that reuse an already-built adapter set.
    pub fn from_fetchers(fetchers: Vec<Arc<dyn JobFetcher>>) -> Self {
        Self {
            fetchers,
            disabled: Vec::new(),
        }
    }

    pub fn fetchers(&self) -> &[Arc<dyn JobFetcher>] {
        &self.fetchers
    }

    pub fn disabled(&self) -> &[SourceReport] {
        &self.disabled
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fetchers.iter().map(|f| f.name()).collect()
    }
}

/// Strategy order for scraped boards: AI first when a key is configured, the
/// site pattern parser as the terminal fallback.
fn extraction_chain(config: &AppConfig, pattern: Box<dyn Extractor>) -> ExtractorChain {
    let mut strategies: Vec<Box<dyn Extractor>> = Vec::new();
    if let Some(key) = &config.openai_api_key {
        strategies.push(Box::new(AiExtractor::new(key.clone(), None)));
    }
    strategies.push(pattern);
    ExtractorChain::new(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyless_config_disables_keyed_sources_only() {
        let config = AppConfig::default();
        let reg = SourceRegistry::from_config(&config, &[]);
        let names = reg.names();
        assert!(names.contains(&"remotive"));
        assert!(names.contains(&"geekhunter"));
        assert!(!names.contains(&"adzuna"));
        assert!(!names.contains(&"jooble"));
        assert_eq!(reg.disabled().len(), 2);
    }

    #[test]
    fn whitelist_restricts_registry() {
        let config = AppConfig::default();
        let wl = vec!["remotive".to_string(), "vagas".to_string()];
        let reg = SourceRegistry::from_config(&config, &wl);
        assert_eq!(reg.names(), vec!["remotive", "vagas"]);
        // Keyed sources outside the whitelist do not even report disabled.
        assert!(reg.disabled().is_empty());
    }

    #[test]
    fn keys_enable_keyed_sources() {
        let config = AppConfig {
            adzuna_app_id: Some("id".into()),
            adzuna_app_key: Some("key".into()),
            jooble_api_key: Some("jk".into()),
            ..AppConfig::default()
        };
        let reg = SourceRegistry::from_config(&config, &[]);
        assert!(reg.names().contains(&"adzuna"));
        assert!(reg.names().contains(&"jooble"));
        assert!(reg.disabled().is_empty());
    }
}
