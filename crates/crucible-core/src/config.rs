//! Configuration management for Crucible
//!
//! Settings live in `crucible.toml` next to where the tool is run. Every
//! section is optional; missing values fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{CrucibleError, Result, RetryPolicy, Role, SamplingParameters};

/// File name looked up by [`CrucibleConfig::load_or_default`]
pub const CONFIG_FILE_NAME: &str = "crucible.toml";

/// Accepted range for `run.max_iterations`
pub const MAX_ITERATIONS_RANGE: std::ops::RangeInclusive<usize> = 1..=20;

/// Accepted range for `run.quality_threshold`
pub const QUALITY_THRESHOLD_RANGE: std::ops::RangeInclusive<f64> = 50.0..=100.0;

/// Top-level Crucible configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrucibleConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub limits: PromptLimits,

    #[serde(default)]
    pub run: RunConfig,
}

/// Where the generation backend lives and how long to wait for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for a single generation request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for the preflight probes (connection check, model list)
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

/// Backend model per role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_architect_model")]
    pub architect: String,
    #[serde(default = "default_developer_model")]
    pub developer: String,
    #[serde(default = "default_reviewer_model")]
    pub reviewer: String,
    #[serde(default = "default_security_model")]
    pub security: String,
    #[serde(default = "default_tester_model")]
    pub tester: String,
    #[serde(default = "default_documentation_model")]
    pub documentation: String,
}

/// Sampling temperature per role plus shared nucleus/top-k settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_architect_temperature")]
    pub architect: f32,
    #[serde(default = "default_developer_temperature")]
    pub developer: f32,
    #[serde(default = "default_reviewer_temperature")]
    pub reviewer: f32,
    #[serde(default = "default_security_temperature")]
    pub security: f32,
    #[serde(default = "default_tester_temperature")]
    pub tester: f32,
    #[serde(default = "default_documentation_temperature")]
    pub documentation: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

/// Character caps applied to each prompt section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptLimits {
    #[serde(default = "default_architecture_context")]
    pub architecture_context: usize,
    #[serde(default = "default_code_context")]
    pub code_context: usize,
    #[serde(default = "default_requirements_context")]
    pub requirements_context: usize,
}

/// Loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Overall score (0-100) at which the loop stops
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Language the developer agent writes code in
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Opaque to the loop; only the exporter uses it
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

// Default value providers
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_architect_model() -> String {
    Role::Architect.default_model().to_string()
}

fn default_developer_model() -> String {
    Role::Developer.default_model().to_string()
}

fn default_reviewer_model() -> String {
    Role::Reviewer.default_model().to_string()
}

fn default_security_model() -> String {
    Role::Security.default_model().to_string()
}

fn default_tester_model() -> String {
    Role::Tester.default_model().to_string()
}

fn default_documentation_model() -> String {
    Role::Documentation.default_model().to_string()
}

fn default_architect_temperature() -> f32 {
    Role::Architect.default_temperature()
}

fn default_developer_temperature() -> f32 {
    Role::Developer.default_temperature()
}

fn default_reviewer_temperature() -> f32 {
    Role::Reviewer.default_temperature()
}

fn default_security_temperature() -> f32 {
    Role::Security.default_temperature()
}

fn default_tester_temperature() -> f32 {
    Role::Tester.default_temperature()
}

fn default_documentation_temperature() -> f32 {
    Role::Documentation.default_temperature()
}

fn default_top_p() -> f32 {
    0.9
}

fn default_top_k() -> u32 {
    40
}

fn default_architecture_context() -> usize {
    2000
}

fn default_code_context() -> usize {
    3000
}

fn default_requirements_context() -> usize {
    1000
}

fn default_max_iterations() -> usize {
    15
}

fn default_quality_threshold() -> f64 {
    90.0
}

fn default_target_language() -> String {
    "python".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

impl CrucibleConfig {
    /// Load configuration from `crucible.toml` in `dir`, or use defaults
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            CrucibleError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write default configuration to `crucible.toml` in `dir`
    pub fn write_default(dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let config_path = dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| CrucibleError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Check every bounded setting
    pub fn validate(&self) -> Result<()> {
        if !MAX_ITERATIONS_RANGE.contains(&self.run.max_iterations) {
            return Err(CrucibleError::Config(format!(
                "max_iterations must be between {} and {}, got {}",
                MAX_ITERATIONS_RANGE.start(),
                MAX_ITERATIONS_RANGE.end(),
                self.run.max_iterations
            )));
        }

        if !QUALITY_THRESHOLD_RANGE.contains(&self.run.quality_threshold) {
            return Err(CrucibleError::Config(format!(
                "quality_threshold must be between {} and {}, got {}",
                QUALITY_THRESHOLD_RANGE.start(),
                QUALITY_THRESHOLD_RANGE.end(),
                self.run.quality_threshold
            )));
        }

        if self.retry.max_attempts == 0 {
            return Err(CrucibleError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.retry.backoff_multiplier < 1.0 {
            return Err(CrucibleError::Config(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }

        for role in Role::ALL {
            let temperature = self.sampling.temperature(role);
            if !(0.0..=2.0).contains(&temperature) {
                return Err(CrucibleError::Config(format!(
                    "sampling.{} temperature must be between 0 and 2, got {}",
                    role, temperature
                )));
            }
        }

        Ok(())
    }

    /// Sampling parameters for a role: its model, temperature and shared settings
    pub fn sampling_for(&self, role: Role) -> SamplingParameters {
        SamplingParameters::new(self.models.model(role), self.sampling.temperature(role))
            .with_top_p(self.sampling.top_p)
            .with_top_k(self.sampling.top_k)
    }
}

impl ModelConfig {
    pub fn model(&self, role: Role) -> &str {
        match role {
            Role::Architect => &self.architect,
            Role::Developer => &self.developer,
            Role::Reviewer => &self.reviewer,
            Role::Security => &self.security,
            Role::Tester => &self.tester,
            Role::Documentation => &self.documentation,
        }
    }
}

impl SamplingConfig {
    pub fn temperature(&self, role: Role) -> f32 {
        match role {
            Role::Architect => self.architect,
            Role::Developer => self.developer,
            Role::Reviewer => self.reviewer,
            Role::Security => self.security,
            Role::Tester => self.tester,
            Role::Documentation => self.documentation,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            architect: default_architect_model(),
            developer: default_developer_model(),
            reviewer: default_reviewer_model(),
            security: default_security_model(),
            tester: default_tester_model(),
            documentation: default_documentation_model(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            architect: default_architect_temperature(),
            developer: default_developer_temperature(),
            reviewer: default_reviewer_temperature(),
            security: default_security_temperature(),
            tester: default_tester_temperature(),
            documentation: default_documentation_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
        }
    }
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            architecture_context: default_architecture_context(),
            code_context: default_code_context(),
            requirements_context: default_requirements_context(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            quality_threshold: default_quality_threshold(),
            target_language: default_target_language(),
            output_dir: default_output_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CrucibleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.base_url, "http://localhost:11434");
        assert_eq!(config.run.max_iterations, 15);
        assert_eq!(config.run.quality_threshold, 90.0);
        assert_eq!(config.limits.code_context, 3000);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CrucibleConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.models.developer, "codellama");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[run]
max_iterations = 5

[models]
reviewer = "llama3"

[sampling]
security = 0.1
"#,
        )
        .unwrap();

        let config = CrucibleConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config.run.max_iterations, 5);
        assert_eq!(config.run.quality_threshold, 90.0);
        assert_eq!(config.models.reviewer, "llama3");
        assert_eq!(config.models.architect, "mistral");

        let params = config.sampling_for(Role::Security);
        assert_eq!(params.model, "mistral");
        assert_eq!(params.temperature, 0.1);
        assert_eq!(params.top_k, 40);
    }

    #[test]
    fn test_write_default_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = CrucibleConfig::write_default(dir.path()).unwrap();
        assert!(path.exists());

        let config = CrucibleConfig::load(&path).unwrap();
        assert_eq!(config.limits, PromptLimits::default());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[run\nmax_iterations = ").unwrap();
        let err = CrucibleConfig::load_or_default(dir.path()).unwrap_err();
        assert!(matches!(err, CrucibleError::Config(_)));
    }

    #[test]
    fn test_validate_bounds() {
        let mut config = CrucibleConfig::default();
        config.run.max_iterations = 0;
        assert!(config.validate().is_err());
        config.run.max_iterations = 21;
        assert!(config.validate().is_err());
        config.run.max_iterations = 20;
        assert!(config.validate().is_ok());

        config.run.quality_threshold = 49.9;
        assert!(config.validate().is_err());
        config.run.quality_threshold = 100.0;
        assert!(config.validate().is_ok());

        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
        config.retry.max_attempts = 1;

        config.sampling.tester = 2.5;
        assert!(config.validate().is_err());
    }
}
