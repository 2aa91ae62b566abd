use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::constants::{DEFAULT_MAX_CYCLES, DEFAULT_MIN_CYCLES};
use super::error::EngineError;

/// On-disk shape of `ire-engine.json`. Every field is optional; a missing
/// field falls through to its environment-variable override and then to a
/// hardcoded default, mirroring `cortex-scout.json`'s `ShadowConfig`
/// cascade in the teacher's `core/config.rs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShadowEngineConfig {
    pub lm_studio_url: Option<String>,
    pub research_model: Option<String>,
    pub synthesis_model: Option<String>,
    pub embedding_model: Option<String>,
    pub search_url: Option<String>,
    pub max_cycles: Option<u32>,
    pub min_cycles: Option<u32>,
    pub temperature: Option<f32>,
    /// Comma-separated list of enabled academic providers, e.g.
    /// `"pubmed,hal,arxiv"`. Mirrors the Python `ENABLED`/`ACADEMIC_DATABASES`
    /// valve from `academia.py`.
    pub enabled: Option<String>,
    pub knowledge_db_root: Option<String>,
    /// Comma-separated `domain_substring:multiplier` pairs consulted by the
    /// search orchestrator's domain-priority step (§4.L).
    pub domain_priorities: Option<String>,
}

/// Fully resolved engine configuration, after the JSON → env → default
/// cascade has been applied. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub lm_studio_url: String,
    pub research_model: String,
    pub synthesis_model: String,
    pub embedding_model: String,
    pub search_url: String,
    pub max_cycles: u32,
    pub min_cycles: u32,
    pub temperature: f32,
    pub enabled_academic_providers: Vec<String>,
    pub knowledge_db_root: PathBuf,
    pub domain_priorities: Vec<(String, f32)>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            lm_studio_url: "http://localhost:1234/v1".to_string(),
            research_model: "local-research-model".to_string(),
            synthesis_model: "local-synthesis-model".to_string(),
            embedding_model: "local-embedding-model".to_string(),
            search_url: "http://localhost:8080/search?q=".to_string(),
            max_cycles: DEFAULT_MAX_CYCLES,
            min_cycles: DEFAULT_MIN_CYCLES,
            temperature: 0.7,
            enabled_academic_providers: default_academic_providers(),
            knowledge_db_root: PathBuf::from("./DBs"),
            domain_priorities: default_domain_priorities(),
        }
    }
}

fn default_academic_providers() -> Vec<String> {
    "pubmed,hal,openedition,pepite,theses,cairn,arxiv,crossref"
        .split(',')
        .map(str::to_string)
        .collect()
}

fn default_domain_priorities() -> Vec<(String, f32)> {
    vec![
        ("ncbi.nlm.nih.gov".to_string(), 1.3),
        ("arxiv.org".to_string(), 1.25),
        (".gov".to_string(), 1.2),
        (".edu".to_string(), 1.15),
        ("scholar.google".to_string(), 1.1),
    ]
}

fn parse_domain_priorities(raw: &str) -> Vec<(String, f32)> {
    raw.split(',')
        .filter_map(|pair| {
            let (domain, mult) = pair.split_once(':')?;
            let domain = domain.trim();
            let mult: f32 = mult.trim().parse().ok()?;
            if domain.is_empty() {
                return None;
            }
            Some((domain.to_string(), mult))
        })
        .collect()
}

impl ShadowEngineConfig {
    fn resolve_lm_studio_url(&self) -> String {
        self.lm_studio_url
            .clone()
            .or_else(|| env::var("LM_STUDIO_URL").ok())
            .unwrap_or_else(|| EngineConfig::default().lm_studio_url)
    }

    fn resolve_research_model(&self) -> String {
        self.research_model
            .clone()
            .or_else(|| env::var("RESEARCH_MODEL").ok())
            .unwrap_or_else(|| EngineConfig::default().research_model)
    }

    fn resolve_synthesis_model(&self) -> String {
        self.synthesis_model
            .clone()
            .or_else(|| env::var("SYNTHESIS_MODEL").ok())
            .unwrap_or_else(|| EngineConfig::default().synthesis_model)
    }

    fn resolve_embedding_model(&self) -> String {
        self.embedding_model
            .clone()
            .or_else(|| env::var("EMBEDDING_MODEL").ok())
            .unwrap_or_else(|| EngineConfig::default().embedding_model)
    }

    fn resolve_search_url(&self) -> String {
        self.search_url
            .clone()
            .or_else(|| env::var("SEARCH_URL").ok())
            .unwrap_or_else(|| EngineConfig::default().search_url)
    }

    fn resolve_max_cycles(&self) -> u32 {
        self.max_cycles
            .or_else(|| env::var("MAX_CYCLES").ok().and_then(|v| v.parse().ok()))
            .unwrap_or(DEFAULT_MAX_CYCLES)
    }

    fn resolve_min_cycles(&self) -> u32 {
        self.min_cycles.unwrap_or(DEFAULT_MIN_CYCLES)
    }

    fn resolve_temperature(&self) -> Result<f32, EngineError> {
        if let Some(t) = self.temperature {
            return validate_temperature(t);
        }
        if let Ok(raw) = env::var("TEMPERATURE") {
            let parsed: f32 = raw
                .parse()
                .map_err(|_| EngineError::Config(format!("TEMPERATURE is not a number: {raw}")))?;
            return validate_temperature(parsed);
        }
        Ok(EngineConfig::default().temperature)
    }

    fn resolve_enabled_providers(&self) -> Vec<String> {
        let raw = self.enabled.clone().or_else(|| env::var("ENABLED").ok());
        match raw {
            Some(s) if !s.trim().is_empty() => s
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            _ => default_academic_providers(),
        }
    }

    fn resolve_knowledge_db_root(&self) -> PathBuf {
        self.knowledge_db_root
            .clone()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./DBs"))
    }

    fn resolve_domain_priorities(&self) -> Vec<(String, f32)> {
        match &self.domain_priorities {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed = parse_domain_priorities(raw);
                if parsed.is_empty() {
                    default_domain_priorities()
                } else {
                    parsed
                }
            }
            _ => default_domain_priorities(),
        }
    }

    pub fn into_resolved(self) -> Result<EngineConfig, EngineError> {
        Ok(EngineConfig {
            lm_studio_url: self.resolve_lm_studio_url(),
            research_model: self.resolve_research_model(),
            synthesis_model: self.resolve_synthesis_model(),
            embedding_model: self.resolve_embedding_model(),
            search_url: self.resolve_search_url(),
            max_cycles: self.resolve_max_cycles(),
            min_cycles: self.resolve_min_cycles(),
            temperature: self.resolve_temperature()?,
            enabled_academic_providers: self.resolve_enabled_providers(),
            knowledge_db_root: self.resolve_knowledge_db_root(),
            domain_priorities: self.resolve_domain_priorities(),
        })
    }
}

fn validate_temperature(t: f32) -> Result<f32, EngineError> {
    if !(0.0..=2.0).contains(&t) {
        return Err(EngineError::Config(format!(
            "temperature out of range [0, 2]: {t}"
        )));
    }
    Ok(t)
}

/// Loads `ire-engine.json`, searching cwd, then its parent, then the path
/// named by `IRE_ENGINE_CONFIG`, falling back to defaults if none is found.
/// Mirrors `core/config.rs::load_shadow_config` in the teacher.
pub fn load_engine_config() -> Result<EngineConfig, EngineError> {
    let shadow = find_config_file()
        .map(|path| read_shadow_config(&path))
        .transpose()?
        .unwrap_or_default();
    shadow.into_resolved()
}

fn find_config_file() -> Option<PathBuf> {
    const FILENAME: &str = "ire-engine.json";

    let cwd_candidate = PathBuf::from(FILENAME);
    if cwd_candidate.exists() {
        return Some(cwd_candidate);
    }

    if let Ok(cwd) = env::current_dir() {
        if let Some(parent) = cwd.parent() {
            let parent_candidate = parent.join(FILENAME);
            if parent_candidate.exists() {
                return Some(parent_candidate);
            }
        }
    }

    if let Ok(env_path) = env::var("IRE_ENGINE_CONFIG") {
        let candidate = PathBuf::from(env_path);
        if candidate.exists() {
            return Some(candidate);
        }
        warn!("IRE_ENGINE_CONFIG points at a non-existent file: {candidate:?}");
    }

    None
}

fn read_shadow_config(path: &Path) -> Result<ShadowEngineConfig, EngineError> {
    debug!("loading engine config from {path:?}");
    let raw = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("failed to read {path:?}: {e}")))?;
    serde_json::from_str(&raw)
        .map_err(|e| EngineError::Config(format!("failed to parse {path:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert!(cfg.max_cycles >= cfg.min_cycles);
        assert!(cfg.enabled_academic_providers.contains(&"pubmed".to_string()));
    }

    #[test]
    fn temperature_validation_rejects_out_of_range() {
        assert!(validate_temperature(3.5).is_err());
        assert!(validate_temperature(0.7).is_ok());
    }

    #[test]
    fn enabled_providers_parse_comma_list() {
        let shadow = ShadowEngineConfig {
            enabled: Some("pubmed, arxiv ,crossref".to_string()),
            ..Default::default()
        };
        assert_eq!(
            shadow.resolve_enabled_providers(),
            vec!["pubmed".to_string(), "arxiv".to_string(), "crossref".to_string()]
        );
    }
}
