// src/config.rs
//! Environment-driven configuration. Presence or absence of the API-key
//! variables silently enables or disables the corresponding keyed adapters;
//! nothing here ever fails the boot.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_SOURCES_PATH: &str = "JOBS_SOURCES_PATH";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub jooble_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Timeout for structured API calls, seconds.
    pub api_timeout_secs: u64,
    /// Timeout for scraping-heavy fetches, seconds.
    pub scrape_timeout_secs: u64,
    pub default_limit: usize,
    pub max_limit: usize,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            adzuna_app_id: None,
            adzuna_app_key: None,
            jooble_api_key: None,
            openai_api_key: None,
            api_timeout_secs: 10,
            scrape_timeout_secs: 30,
            default_limit: 50,
            max_limit: 100,
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            adzuna_app_id: env_opt("ADZUNA_APP_ID"),
            adzuna_app_key: env_opt("ADZUNA_APP_KEY"),
            jooble_api_key: env_opt("JOOBLE_API_KEY"),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            api_timeout_secs: env_parse("API_TIMEOUT_SECS", d.api_timeout_secs),
            scrape_timeout_secs: env_parse("SCRAPER_TIMEOUT", d.scrape_timeout_secs),
            default_limit: env_parse("DEFAULT_LIMIT", d.default_limit),
            max_limit: env_parse("MAX_LIMIT", d.max_limit),
            bind_addr: env_opt("BIND_ADDR").unwrap_or(d.bind_addr),
        }
    }

    pub fn adzuna_keys(&self) -> Option<(String, String)> {
        match (&self.adzuna_app_id, &self.adzuna_app_key) {
            (Some(id), Some(key)) => Some((id.clone(), key.clone())),
            _ => None,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Load the enabled-source whitelist from an explicit path. Supports TOML
/// (`sources = [...]`) or a JSON string array. An empty list means "all".
pub fn load_sources_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load the whitelist using env var + fallbacks:
/// 1) $JOBS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("JOBS_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("sources");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<String>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
