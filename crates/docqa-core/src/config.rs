use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data_processor::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(Path::new("."), &env_name)
    }

    /// Load `config.toml` + `config.<env>.toml` from `base`, then `APP_*` env vars.
    pub fn load_for_env(base: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(base.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(base.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(base.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(base.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like [`Config::get`] but falls back to `T::default()` when the section is absent.
    pub fn get_or_default<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        self.get_or_default("pipeline")
    }

    pub fn chunking(&self) -> anyhow::Result<ChunkingConfig> {
        self.get_or_default("chunking")
    }

    pub fn store(&self) -> anyhow::Result<StoreConfig> {
        self.get_or_default("store")
    }

    pub fn llm(&self) -> anyhow::Result<LlmConfig> {
        self.get_or_default("llm")
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let pipeline = self.pipeline()?;
        pipeline.validate()?;
        match env {
            "prod" | "production" => {
                if !pipeline.sentence_check {
                    anyhow::bail!("pipeline.sentence_check must stay enabled in production");
                }
            }
            "dev" | "development" => {}
            "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

/// Which score the relevance threshold is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceBasis {
    /// Query-chunk cosine similarity.
    #[default]
    Similarity,
    /// Reciprocal-rank-fusion score.
    Fused,
}

/// Tunables of one question-answer cycle. Passed in by value; the pipeline
/// never reads the environment itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Candidates requested from the similarity retriever.
    pub top_k: usize,
    /// Candidates selected by the diversity (MMR) retriever.
    pub mmr_top_k: usize,
    /// Survivors kept after thresholding.
    pub rerank_k: usize,
    pub min_relevance: f64,
    pub relevance_basis: RelevanceBasis,
    /// RRF damping constant.
    pub rrf_k: u32,
    /// MMR weight; 1.0 is pure relevance, 0.0 pure diversity.
    pub mmr_lambda: f32,
    /// MMR candidate pool is `mmr_top_k * mmr_fetch_factor`.
    pub mmr_fetch_factor: usize,
    pub context_max_chars: usize,
    /// Fused candidates consulted for "closest documents" when nothing survived.
    pub closest_docs_k: usize,
    /// Query characters echoed back in the no-answer message.
    pub query_display_chars: usize,
    /// Strip validator sentences whose terms are not covered by the context.
    pub sentence_check: bool,
    pub min_sentence_support: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 14,
            mmr_top_k: 14,
            rerank_k: 8,
            min_relevance: 0.35,
            relevance_basis: RelevanceBasis::Similarity,
            rrf_k: 60,
            mmr_lambda: 0.7,
            mmr_fetch_factor: 3,
            context_max_chars: 12_000,
            closest_docs_k: 3,
            query_display_chars: 70,
            sentence_check: true,
            min_sentence_support: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.top_k == 0 || self.mmr_top_k == 0 {
            return invalid("top_k and mmr_top_k must be at least 1".into());
        }
        if self.rerank_k == 0 {
            return invalid("rerank_k must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.mmr_lambda) {
            return invalid(format!("mmr_lambda must be within [0, 1], got {}", self.mmr_lambda));
        }
        if self.min_relevance.is_nan() || self.min_relevance < 0.0 {
            return invalid(format!("min_relevance must be non-negative, got {}", self.min_relevance));
        }
        if self.context_max_chars == 0 {
            return invalid("context_max_chars must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.min_sentence_support) {
            return invalid(format!("min_sentence_support must be within [0, 1], got {}", self.min_sentence_support));
        }
        if self.relevance_basis == RelevanceBasis::Fused && self.min_relevance > self.max_fused_score() {
            return invalid(format!(
                "min_relevance {} is unreachable for fused scores (max {:.4} with rrf_k {})",
                self.min_relevance,
                self.max_fused_score(),
                self.rrf_k
            ));
        }
        Ok(())
    }

    /// Best possible RRF score: rank 1 in both lists.
    pub fn max_fused_score(&self) -> f64 {
        2.0 / (f64::from(self.rrf_k) + 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON snapshot of the chunk store; `~` and `$VAR` are expanded.
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: "data/store.json".to_string() }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    pub embedding_dim: usize,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Explicit key; takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            generation_model: "gemini-2.5-pro".to_string(),
            embedding_model: "models/embedding-001".to_string(),
            embedding_dim: 768,
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 120,
            temperature: 0.0,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
