use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_HIGH_CONFIDENCE: i32 = 8;
pub const DEFAULT_MEDIUM_CONFIDENCE: i32 = 5;

/// Project-level settings: explicit cross-language bridges, resolver tuning
/// and cache sizing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub bridges: Vec<BridgeConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// A declared `<language>:<module-pattern>` to `<language>:<module-pattern>` link.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BridgeConfig {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolverConfig {
    /// Globs over reference names that are always treated as local.
    #[serde(default)]
    pub excluded_patterns: Vec<String>,
    #[serde(default = "default_high_confidence")]
    pub high_confidence_threshold: i32,
    #[serde(default = "default_medium_confidence")]
    pub medium_confidence_threshold: i32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            excluded_patterns: Vec::new(),
            high_confidence_threshold: DEFAULT_HIGH_CONFIDENCE,
            medium_confidence_threshold: DEFAULT_MEDIUM_CONFIDENCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

fn default_high_confidence() -> i32 {
    DEFAULT_HIGH_CONFIDENCE
}

fn default_medium_confidence() -> i32 {
    DEFAULT_MEDIUM_CONFIDENCE
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl ProjectConfig {
    /// Load from disk; `.yaml`/`.yml` files are read as YAML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let config = if is_yaml {
            Self::from_yaml_str(&data)
        } else {
            Self::from_json_str(&data)
        };
        config.with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(data)?)
    }
}
