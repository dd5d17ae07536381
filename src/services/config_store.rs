// Configuration Storage Service
// Analyzer weight table / threshold config, with JSON file read-write

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Immutable scoring configuration injected into the scoring engine.
/// Defaults mirror the shipped heuristic; tests and deployments may override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerConfig {
    #[serde(default = "default_base_score")]
    pub base_score: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_score")]
    pub max_score: f64,
    #[serde(default = "default_ocr_timeout_ms")]
    pub ocr_timeout_ms: u64,
    #[serde(default)]
    pub weights: ScoreWeights,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            base_score: default_base_score(),
            threshold: default_threshold(),
            max_score: default_max_score(),
            ocr_timeout_ms: default_ocr_timeout_ms(),
            weights: ScoreWeights::default(),
        }
    }
}

/// Per-category weight ceilings. A triggered category adds exactly its weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWeights {
    #[serde(default = "default_w_metadata_hits")]
    pub metadata_hits: f64,
    #[serde(default = "default_w_ocr_hits")]
    pub ocr_hits: f64,
    #[serde(default = "default_w_ocr_hits")]
    pub keyword_hits: f64,
    #[serde(default = "default_w_signal")]
    pub low_entropy: f64,
    #[serde(default = "default_w_signal")]
    pub low_edge_density: f64,
    #[serde(default = "default_w_signal")]
    pub low_ela_mean: f64,
    #[serde(default = "default_w_signal")]
    pub low_color_uniqueness: f64,
    #[serde(default = "default_w_signal")]
    pub missing_exif: f64,
    #[serde(default = "default_w_signal")]
    pub low_laplacian: f64,
    #[serde(default = "default_w_signal")]
    pub flat_blocks: f64,
    #[serde(default = "default_w_signal")]
    pub very_smooth_low_blockiness: f64,
    #[serde(default = "default_w_repetition")]
    pub high_repetition_low_ttr: f64,
    #[serde(default = "default_w_signal")]
    pub avg_sentence_len_mid: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            metadata_hits: default_w_metadata_hits(),
            ocr_hits: default_w_ocr_hits(),
            keyword_hits: default_w_ocr_hits(),
            low_entropy: default_w_signal(),
            low_edge_density: default_w_signal(),
            low_ela_mean: default_w_signal(),
            low_color_uniqueness: default_w_signal(),
            missing_exif: default_w_signal(),
            low_laplacian: default_w_signal(),
            flat_blocks: default_w_signal(),
            very_smooth_low_blockiness: default_w_signal(),
            high_repetition_low_ttr: default_w_repetition(),
            avg_sentence_len_mid: default_w_signal(),
        }
    }
}

fn default_base_score() -> f64 { 0.45 }
fn default_threshold() -> f64 { 0.70 }
fn default_max_score() -> f64 { 0.98 }
fn default_ocr_timeout_ms() -> u64 { 10_000 }
fn default_w_metadata_hits() -> f64 { 0.35 }
fn default_w_ocr_hits() -> f64 { 0.25 }
fn default_w_signal() -> f64 { 0.05 }
fn default_w_repetition() -> f64 { 0.10 }

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to create config dir: {0}")]
    CreateDir(std::io::Error),
    #[error("failed to read config: {0}")]
    Read(std::io::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("proofguard"))
    }

    /// Load configuration from file; missing file yields the shipped defaults
    pub fn load(&self) -> Result<AnalyzerConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AnalyzerConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(ConfigError::Read)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AnalyzerConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir).map_err(ConfigError::CreateDir)?;

        let content = serde_json::to_string_pretty(config)?;
        fs::write(&self.config_file, content).map_err(ConfigError::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.base_score, 0.45);
        assert_eq!(config.threshold, 0.70);
        assert_eq!(config.max_score, 0.98);
        assert_eq!(config.weights.metadata_hits, 0.35);
        assert_eq!(config.weights.ocr_hits, 0.25);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"threshold": 0.8}"#).unwrap();
        assert_eq!(config.threshold, 0.8);
        assert_eq!(config.base_score, 0.45);
        assert_eq!(config.weights.low_entropy, 0.05);
    }

    #[test]
    fn test_config_serialization() {
        let config = AnalyzerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AnalyzerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.threshold, config.threshold);
        assert_eq!(parsed.weights.high_repetition_low_ttr, 0.10);
    }
}
