//! Configuration loader, typed search settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are addressed with a double underscore, e.g.
//! `APP_EMBEDDING__BATCH_SIZE`. Paths accept `~` and `${VAR}`.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::DEFAULT_K;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    /// Typed search settings, defaults filled in for every missing key.
    pub fn search_settings(&self) -> Result<SearchSettings> {
        let defaults = Serialized::defaults(SearchSettings::default());
        let mut settings: SearchSettings = Figment::from(defaults)
            .merge(self.figment.clone())
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("Failed to read search settings: {e}")))?;
        // Legacy switch honoured by the embedding crate since its first release.
        if let Ok(v) = env::var("APP_USE_FAKE_EMBEDDINGS") {
            if v == "1" || v.eq_ignore_ascii_case("true") {
                settings.embedding.use_fake = true;
            }
        }
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> Result<()> {
        let settings = self.search_settings()?;
        match env {
            "prod" | "production" if settings.embedding.use_fake => Err(Error::InvalidConfig(
                "fake embeddings are not allowed in production".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Select the vector-database semantic backend instead of the local index.
    pub use_vector_db: bool,
    pub keyword_enabled: bool,
    /// Root directory of the keyword indexes.
    pub keyword_url: String,
    /// lancedb URI: a local path or an object-store URI.
    pub vector_db_url: String,
    pub vector_db_batch_size: usize,
    /// Directory holding the local semantic index files.
    pub index_base_dir: String,
    pub default_k: usize,
    pub weight_semantic: f32,
    pub weight_keyword: f32,
    pub embedding: EmbeddingSettings,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            use_vector_db: false,
            keyword_enabled: true,
            keyword_url: "data/keyword".to_string(),
            vector_db_url: "data/vectordb".to_string(),
            vector_db_batch_size: 100,
            index_base_dir: "data".to_string(),
            default_k: DEFAULT_K,
            weight_semantic: 0.7,
            weight_keyword: 0.3,
            embedding: EmbeddingSettings::default(),
        }
    }
}

impl SearchSettings {
    fn validate(&self) -> Result<()> {
        if self.weight_semantic < 0.0 || self.weight_keyword < 0.0 {
            return Err(Error::InvalidConfig("hybrid weights must be non-negative".to_string()));
        }
        if self.weight_semantic + self.weight_keyword <= 0.0 {
            return Err(Error::InvalidConfig("hybrid weights must not both be zero".to_string()));
        }
        Ok(())
    }

    pub fn keyword_root(&self) -> PathBuf { expand_path(&self.keyword_url) }

    pub fn index_dir(&self) -> PathBuf { expand_path(&self.index_base_dir) }

    /// lancedb URI with `~`/env expansion applied to local paths.
    pub fn vector_db_uri(&self) -> String {
        if self.vector_db_url.contains("://") {
            self.vector_db_url.clone()
        } else {
            expand_path(&self.vector_db_url).to_string_lossy().into_owned()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub batch_size: usize,
    pub max_len: usize,
    pub use_fake: bool,
    pub fake_dim: usize,
    pub show_progress: bool,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_dir: None,
            batch_size: 32,
            max_len: 256,
            use_fake: false,
            fake_dim: 1024,
            show_progress: false,
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

