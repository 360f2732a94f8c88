//! Search settings persistence.
//!
//! Settings live in a JSON file. A missing file yields defaults, and a few
//! fields can be overridden from the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::extract::DEFAULT_EXTRACTION_TIMEOUT;
use crate::filter::CompileOptions;
use crate::temporal::DEFAULT_FUZZY_HALF_WIDTH;

pub const SETTINGS_PATH_ENV: &str = "FILESEARCH_SETTINGS_PATH";
pub const EXTRACTOR_ENV: &str = "FILESEARCH_EXTRACTOR";
pub const EXTRACTION_TIMEOUT_ENV: &str = "FILESEARCH_EXTRACTION_TIMEOUT_MS";

pub const DEFAULT_MAX_RESULTS: usize = 20;
pub const DEFAULT_VECTOR_TOP_K: usize = 15;

/// Which extraction backend drives query parsing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    #[default]
    RuleBased,
    Model,
}

impl FromStr for ExtractorKind {
    type Err = SearchError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rule_based" | "rules" => Ok(Self::RuleBased),
            "model" | "llm" => Ok(Self::Model),
            other => Err(SearchError::Settings(format!(
                "unknown extractor: {other:?}"
            ))),
        }
    }
}

/// Persisted search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub extractor: ExtractorKind,
    /// Upper bound on one extraction call, in milliseconds.
    pub extraction_timeout_ms: u64,
    pub fuzzy_half_width: f64,
    pub category_climb_levels: usize,
    pub max_results: usize,
    pub vector_top_k: usize,
    /// Roots searched by metadata sources; empty means everywhere.
    pub scopes: Vec<PathBuf>,
    /// JSON type table replacing the built-in hierarchy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_hierarchy_path: Option<PathBuf>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            extractor: ExtractorKind::default(),
            extraction_timeout_ms: DEFAULT_EXTRACTION_TIMEOUT.as_millis() as u64,
            fuzzy_half_width: DEFAULT_FUZZY_HALF_WIDTH,
            category_climb_levels: 1,
            max_results: DEFAULT_MAX_RESULTS,
            vector_top_k: DEFAULT_VECTOR_TOP_K,
            scopes: Vec::new(),
            type_hierarchy_path: None,
        }
    }
}

impl SearchSettings {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_millis(self.extraction_timeout_ms)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            category_climb_levels: self.category_climb_levels,
            fuzzy_half_width: self.fuzzy_half_width,
        }
    }

    /// Applies `FILESEARCH_EXTRACTOR` and `FILESEARCH_EXTRACTION_TIMEOUT_MS`.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(EXTRACTOR_ENV).filter(|value| !value.trim().is_empty()) {
            self.extractor = value.parse()?;
        }
        if let Some(value) = lookup(EXTRACTION_TIMEOUT_ENV).filter(|value| !value.trim().is_empty())
        {
            self.extraction_timeout_ms = value.trim().parse().map_err(|_| {
                SearchError::Settings(format!(
                    "{EXTRACTION_TIMEOUT_ENV} must be a number of milliseconds, got {value:?}"
                ))
            })?;
        }
        Ok(())
    }

    /// Rejects values that would make searches meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.extraction_timeout_ms == 0 {
            return Err(SearchError::Settings(
                "extraction_timeout_ms must be positive".to_string(),
            ));
        }
        if !self.fuzzy_half_width.is_finite() || self.fuzzy_half_width < 0.0 {
            return Err(SearchError::Settings(format!(
                "fuzzy_half_width must be a non-negative number, got {}",
                self.fuzzy_half_width
            )));
        }
        if self.max_results == 0 || self.vector_top_k == 0 {
            return Err(SearchError::Settings(
                "max_results and vector_top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings store that persists to disk.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Uses `FILESEARCH_SETTINGS_PATH`, or `filesearch/settings.json` under
    /// the platform config directory.
    pub fn default_location() -> Self {
        let path = env::var(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("filesearch")
                    .join("settings.json")
            });
        Self::new(path)
    }

    /// Loads settings, returning defaults if the file does not exist.
    /// Environment overrides are applied on top.
    pub fn load(&self) -> Result<SearchSettings> {
        let mut settings = if self.path.exists() {
            let data = fs::read_to_string(&self.path)?;
            serde_json::from_str(&data).map_err(|error| {
                SearchError::Settings(format!("{}: {error}", self.path.display()))
            })?
        } else {
            log::debug!("settings file missing, using defaults path={}", self.path.display());
            SearchSettings::default()
        };
        settings.apply_env_overrides()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, settings: &SearchSettings) -> Result<()> {
        settings.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let settings = SearchSettings::default();
        assert_eq!(settings.extractor, ExtractorKind::RuleBased);
        assert_eq!(settings.extraction_timeout(), Duration::from_secs(3));
        assert_eq!(settings.fuzzy_half_width, 0.2);
        assert_eq!(settings.compile_options(), CompileOptions::default());
        assert_eq!(settings.max_results, 20);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: SearchSettings =
            serde_json::from_str(r#"{"extractor":"model","max_results":5}"#).expect("parse");
        assert_eq!(settings.extractor, ExtractorKind::Model);
        assert_eq!(settings.max_results, 5);
        assert_eq!(settings.vector_top_k, 15);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
        let loaded = store.load().expect("load");
        let mut expected = SearchSettings::default();
        expected.apply_env_overrides().expect("env");
        assert_eq!(loaded, expected);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = SettingsStore::new(dir.path().join("nested").join("settings.json"));
        let settings = SearchSettings {
            category_climb_levels: 2,
            scopes: vec![PathBuf::from("/Users/ana/Documents")],
            ..SearchSettings::default()
        };
        store.save(&settings).expect("save");
        assert!(store.path().exists());

        let raw = fs::read_to_string(store.path()).expect("read");
        let reloaded: SearchSettings = serde_json::from_str(&raw).expect("parse");
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn invalid_file_is_a_settings_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write");
        let error = SettingsStore::new(path).load().expect_err("invalid");
        assert!(matches!(error, SearchError::Settings(_)));
    }

    #[test]
    fn overrides_replace_fields() {
        let vars = HashMap::from([
            (EXTRACTOR_ENV, "llm"),
            (EXTRACTION_TIMEOUT_ENV, "1500"),
        ]);
        let mut settings = SearchSettings::default();
        settings
            .apply_overrides(|key| vars.get(key).map(|value| value.to_string()))
            .expect("overrides");
        assert_eq!(settings.extractor, ExtractorKind::Model);
        assert_eq!(settings.extraction_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn bad_overrides_are_rejected() {
        let mut settings = SearchSettings::default();
        let error = settings
            .apply_overrides(|key| (key == EXTRACTION_TIMEOUT_ENV).then(|| "soon".to_string()))
            .expect_err("bad timeout");
        assert!(matches!(error, SearchError::Settings(_)));

        assert!("regex".parse::<ExtractorKind>().is_err());
        assert_eq!("Rule-Based".parse::<ExtractorKind>().ok(), Some(ExtractorKind::RuleBased));
    }

    #[test]
    fn validation_catches_nonsense() {
        let settings = SearchSettings {
            fuzzy_half_width: -1.0,
            ..SearchSettings::default()
        };
        assert!(settings.validate().is_err());
        let settings = SearchSettings {
            extraction_timeout_ms: 0,
            ..SearchSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
