use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use qna_core::{MatchPolicy, ACCEPT_THRESHOLD, FALLBACK_CONTEXT_SIZE};
use qna_kb::EntrySource;
use qna_llm::{LlmClient, LlmProvider};

const DEFAULT_CONFIG: &str = "qna.toml";
const DEFAULT_KB_TTL_SECS: u64 = 300;

/// Engine configuration: TOML file merged with `QNA_*` environment
/// overrides. Every field has a default so a missing file is not an error.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub accept_threshold: f64,
    pub fallback_context_size: usize,
    pub kb_url: Option<String>,
    pub kb_path: Option<PathBuf>,
    pub kb_ttl: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    provider: Option<String>,
    model: Option<String>,
    accept_threshold: Option<f64>,
    fallback_context_size: Option<usize>,
    kb_url: Option<String>,
    kb_path: Option<PathBuf>,
    kb_ttl_secs: Option<u64>,
}

impl EngineConfig {
    /// Load from `path`, or `QNA_CONFIG`, or `./qna.toml`; a missing file
    /// yields defaults. Environment variables override file values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(
                env::var("QNA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG.to_string()),
            ),
        };
        let file = if resolved.exists() {
            let raw = fs::read_to_string(&resolved)
                .with_context(|| format!("failed to read config {}", resolved.display()))?;
            toml::from_str::<FileConfig>(&raw)
                .with_context(|| format!("invalid config {}", resolved.display()))?
        } else {
            FileConfig::default()
        };
        let mut config = Self::from_file(file)?;
        config.apply_env_overrides()?;
        if !(0.0..=1.0).contains(&config.accept_threshold) {
            return Err(anyhow!(
                "accept_threshold must be within [0, 1], got {}",
                config.accept_threshold
            ));
        }
        Ok(config)
    }

    fn from_file(file: FileConfig) -> Result<Self> {
        let provider = match file.provider {
            Some(name) => LlmProvider::from_str(&name)
                .ok_or_else(|| anyhow!("unknown provider {name}"))?,
            None => LlmProvider::OpenRouter,
        };
        Ok(Self {
            model: file
                .model
                .unwrap_or_else(|| provider.default_model().to_string()),
            provider,
            accept_threshold: file.accept_threshold.unwrap_or(ACCEPT_THRESHOLD),
            fallback_context_size: file.fallback_context_size.unwrap_or(FALLBACK_CONTEXT_SIZE),
            kb_url: file.kb_url,
            kb_path: file.kb_path,
            kb_ttl: Duration::from_secs(file.kb_ttl_secs.unwrap_or(DEFAULT_KB_TTL_SECS)),
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(name) = env::var("QNA_PROVIDER") {
            self.provider =
                LlmProvider::from_str(&name).ok_or_else(|| anyhow!("unknown provider {name}"))?;
            self.model = self.provider.default_model().to_string();
        }
        if let Ok(model) = env::var("QNA_MODEL") {
            self.model = model;
        }
        if let Ok(raw) = env::var("QNA_ACCEPT_THRESHOLD") {
            self.accept_threshold = raw
                .parse()
                .with_context(|| format!("invalid QNA_ACCEPT_THRESHOLD {raw}"))?;
        }
        if let Ok(raw) = env::var("QNA_FALLBACK_CONTEXT") {
            self.fallback_context_size = raw
                .parse()
                .with_context(|| format!("invalid QNA_FALLBACK_CONTEXT {raw}"))?;
        }
        if let Ok(url) = env::var("QNA_KB_URL") {
            self.kb_url = Some(url);
        }
        if let Ok(path) = env::var("QNA_KB_PATH") {
            self.kb_path = Some(PathBuf::from(path));
        }
        if let Ok(raw) = env::var("QNA_KB_TTL_SECS") {
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("invalid QNA_KB_TTL_SECS {raw}"))?;
            self.kb_ttl = Duration::from_secs(secs);
        }
        Ok(())
    }

    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            accept_threshold: self.accept_threshold,
            fallback_context_size: self.fallback_context_size,
        }
    }

    /// URL takes precedence over a local path when both are configured.
    pub fn entry_source(&self) -> Result<EntrySource> {
        if let Some(url) = &self.kb_url {
            return Ok(EntrySource::sheet(url.clone()));
        }
        if let Some(path) = &self.kb_path {
            return Ok(EntrySource::file(path.clone()));
        }
        Err(anyhow!(
            "no knowledge base configured: set kb_url or kb_path (or QNA_KB_URL / QNA_KB_PATH)"
        ))
    }

    pub fn llm_client(&self) -> Result<LlmClient> {
        LlmClient::new(self.provider, self.model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_file_is_empty() {
        let config = EngineConfig::from_file(FileConfig::default()).unwrap();
        assert_eq!(config.provider, LlmProvider::OpenRouter);
        assert_eq!(config.model, "openrouter/auto");
        assert_eq!(config.accept_threshold, ACCEPT_THRESHOLD);
        assert_eq!(config.fallback_context_size, FALLBACK_CONTEXT_SIZE);
        assert_eq!(config.kb_ttl, Duration::from_secs(DEFAULT_KB_TTL_SECS));
        assert!(config.entry_source().is_err());
    }

    #[test]
    fn file_values_are_honored() {
        let file: FileConfig = toml::from_str(
            r#"
            provider = "local"
            accept_threshold = 0.5
            fallback_context_size = 3
            kb_path = "kb.csv"
            kb_ttl_secs = 60
            "#,
        )
        .unwrap();
        let config = EngineConfig::from_file(file).unwrap();
        assert_eq!(config.provider, LlmProvider::Local);
        assert_eq!(config.model, "local");
        assert_eq!(config.accept_threshold, 0.5);
        assert_eq!(config.fallback_context_size, 3);
        assert_eq!(config.kb_ttl, Duration::from_secs(60));
        assert!(config.entry_source().is_ok());
    }

    #[test]
    fn unknown_provider_in_file_is_rejected() {
        let file: FileConfig = toml::from_str(r#"provider = "petals""#).unwrap();
        assert!(EngineConfig::from_file(file).is_err());
    }

    #[test]
    fn load_reads_an_explicit_toml_file() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        std::io::Write::write_all(
            &mut file,
            b"provider = \"local\"\nkb_path = \"kb.csv\"\naccept_threshold = 0.7\n",
        )
        .unwrap();
        let config = EngineConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.provider, LlmProvider::Local);
        assert_eq!(config.accept_threshold, 0.7);
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let mut file = tempfile::NamedTempFile::with_suffix(".toml").unwrap();
        std::io::Write::write_all(&mut file, b"accept_threshold = 1.5\n").unwrap();
        assert!(EngineConfig::load(Some(file.path())).is_err());
    }
}
