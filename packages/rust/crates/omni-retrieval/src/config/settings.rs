//! Retrieval settings loader.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/retrieval.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-dev-fusion/retrieval.yaml`
//!
//! Merge precedence is user over system. Unset values fall back to
//! [`RetrievalConfig::default`].

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::RetrievalConfig;
use crate::error::ConfigError;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/retrieval.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-dev-fusion/retrieval.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";

/// Raw settings as written in YAML. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub timeouts: TimeoutSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoringSettings {
    pub min_confidence_score: Option<f32>,
    pub keyword_boost_factor: Option<f32>,
    pub keyword_base_score: Option<f32>,
    pub span_overlap_threshold: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitSettings {
    pub top_k: Option<usize>,
    pub max_top_k: Option<usize>,
    pub vector_top_k: Option<usize>,
    pub keyword_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeoutSettings {
    pub embed_ms: Option<u64>,
    pub vector_ms: Option<u64>,
    pub keyword_ms: Option<u64>,
    pub directory_ms: Option<u64>,
}

impl RetrievalSettings {
    /// Layer `overlay` on top of `self`; values set in `overlay` win.
    #[must_use]
    pub fn merge(self, overlay: Self) -> Self {
        Self {
            scoring: self.scoring.merge(overlay.scoring),
            limits: self.limits.merge(overlay.limits),
            timeouts: self.timeouts.merge(overlay.timeouts),
        }
    }

    /// Apply defaults for unset values and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a configured value is out of range.
    pub fn into_config(self) -> Result<RetrievalConfig, ConfigError> {
        let defaults = RetrievalConfig::default();
        let config = RetrievalConfig {
            min_confidence_score: self
                .scoring
                .min_confidence_score
                .unwrap_or(defaults.min_confidence_score),
            keyword_boost_factor: self
                .scoring
                .keyword_boost_factor
                .unwrap_or(defaults.keyword_boost_factor),
            keyword_base_score: self
                .scoring
                .keyword_base_score
                .unwrap_or(defaults.keyword_base_score),
            span_overlap_threshold: self
                .scoring
                .span_overlap_threshold
                .unwrap_or(defaults.span_overlap_threshold),
            top_k: self.limits.top_k.unwrap_or(defaults.top_k),
            max_top_k: self.limits.max_top_k.unwrap_or(defaults.max_top_k),
            vector_top_k: self.limits.vector_top_k.unwrap_or(defaults.vector_top_k),
            keyword_limit: self.limits.keyword_limit.unwrap_or(defaults.keyword_limit),
            embed_timeout: self
                .timeouts
                .embed_ms
                .map_or(defaults.embed_timeout, Duration::from_millis),
            vector_timeout: self
                .timeouts
                .vector_ms
                .map_or(defaults.vector_timeout, Duration::from_millis),
            keyword_timeout: self
                .timeouts
                .keyword_ms
                .map_or(defaults.keyword_timeout, Duration::from_millis),
            directory_timeout: self
                .timeouts
                .directory_ms
                .map_or(defaults.directory_timeout, Duration::from_millis),
        };
        config.validate()?;
        Ok(config)
    }
}

impl ScoringSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            min_confidence_score: overlay.min_confidence_score.or(self.min_confidence_score),
            keyword_boost_factor: overlay.keyword_boost_factor.or(self.keyword_boost_factor),
            keyword_base_score: overlay.keyword_base_score.or(self.keyword_base_score),
            span_overlap_threshold: overlay
                .span_overlap_threshold
                .or(self.span_overlap_threshold),
        }
    }
}

impl LimitSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            top_k: overlay.top_k.or(self.top_k),
            max_top_k: overlay.max_top_k.or(self.max_top_k),
            vector_top_k: overlay.vector_top_k.or(self.vector_top_k),
            keyword_limit: overlay.keyword_limit.or(self.keyword_limit),
        }
    }
}

impl TimeoutSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            embed_ms: overlay.embed_ms.or(self.embed_ms),
            vector_ms: overlay.vector_ms.or(self.vector_ms),
            keyword_ms: overlay.keyword_ms.or(self.keyword_ms),
            directory_ms: overlay.directory_ms.or(self.directory_ms),
        }
    }
}

impl From<&RetrievalConfig> for RetrievalSettings {
    fn from(config: &RetrievalConfig) -> Self {
        let millis = |duration: Duration| u64::try_from(duration.as_millis()).ok();
        Self {
            scoring: ScoringSettings {
                min_confidence_score: Some(config.min_confidence_score),
                keyword_boost_factor: Some(config.keyword_boost_factor),
                keyword_base_score: Some(config.keyword_base_score),
                span_overlap_threshold: Some(config.span_overlap_threshold),
            },
            limits: LimitSettings {
                top_k: Some(config.top_k),
                max_top_k: Some(config.max_top_k),
                vector_top_k: Some(config.vector_top_k),
                keyword_limit: Some(config.keyword_limit),
            },
            timeouts: TimeoutSettings {
                embed_ms: millis(config.embed_timeout),
                vector_ms: millis(config.vector_timeout),
                keyword_ms: millis(config.keyword_timeout),
                directory_ms: millis(config.directory_timeout),
            },
        }
    }
}

/// Load system + user settings from the default locations.
pub fn load_retrieval_settings() -> RetrievalSettings {
    let (system_path, user_path) = retrieval_settings_paths();
    load_retrieval_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn retrieval_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_retrieval_settings_from_paths(system: &Path, user: &Path) -> RetrievalSettings {
    load_retrieval_settings_file(system).merge(load_retrieval_settings_file(user))
}

/// Load a single settings file. Missing, unreadable, or invalid files yield defaults.
pub fn load_retrieval_settings_file(path: &Path) -> RetrievalSettings {
    if !path.exists() {
        return RetrievalSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                event = "retrieval.settings.read_failed",
                path = %path.display(),
                error = %error,
                "failed to read retrieval settings file; ignoring"
            );
            return RetrievalSettings::default();
        }
    };
    if raw.trim().is_empty() {
        return RetrievalSettings::default();
    }
    match serde_yaml::from_str::<RetrievalSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                event = "retrieval.settings.parse_failed",
                path = %path.display(),
                error = %error,
                "failed to parse retrieval settings yaml; ignoring file"
            );
            RetrievalSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}
