//! quizmark configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::BatchConfig;
use crate::model::TenantId;
use crate::orchestrator::{OrchestratorConfig, DEFAULT_MAX_ANSWERS_PER_ATTEMPT};
use crate::parser::DEFAULT_TENANT_ID;

/// Top-level quizmark configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizmarkConfig {
    /// Tenant used when a command does not name one.
    #[serde(default = "default_tenant")]
    pub default_tenant: TenantId,
    /// Max attempts graded concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Upper bound on answers per attempt.
    #[serde(default = "default_max_answers")]
    pub max_answers_per_attempt: usize,
    /// Output directory for gradebooks.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_tenant() -> TenantId {
    DEFAULT_TENANT_ID
}
fn default_parallelism() -> usize {
    4
}
fn default_max_answers() -> usize {
    DEFAULT_MAX_ANSWERS_PER_ATTEMPT
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("./quizmark-results")
}

impl Default for QuizmarkConfig {
    fn default() -> Self {
        Self {
            default_tenant: default_tenant(),
            parallelism: default_parallelism(),
            max_answers_per_attempt: default_max_answers(),
            output_dir: default_output_dir(),
        }
    }
}

impl QuizmarkConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            max_answers_per_attempt: self.max_answers_per_attempt,
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            parallelism: self.parallelism,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizmark.toml` in the current directory
/// 2. `~/.config/quizmark/config.toml`
///
/// Environment variable overrides: `QUIZMARK_TENANT`, `QUIZMARK_PARALLELISM`.
pub fn load_config() -> Result<QuizmarkConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizmarkConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizmark.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<QuizmarkConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => QuizmarkConfig::default(),
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn apply_env_overrides(config: &mut QuizmarkConfig) -> Result<()> {
    if let Ok(tenant) = std::env::var("QUIZMARK_TENANT") {
        config.default_tenant = tenant
            .trim()
            .parse()
            .with_context(|| format!("invalid QUIZMARK_TENANT: '{tenant}'"))?;
    }

    if let Ok(parallelism) = std::env::var("QUIZMARK_PARALLELISM") {
        config.parallelism = parallelism
            .trim()
            .parse()
            .with_context(|| format!("invalid QUIZMARK_PARALLELISM: '{parallelism}'"))?;
    }

    let output_dir = config.output_dir.to_string_lossy().into_owned();
    if output_dir.contains("${") {
        config.output_dir = PathBuf::from(resolve_env_vars(&output_dir));
    }

    anyhow::ensure!(config.parallelism >= 1, "parallelism must be at least 1");
    anyhow::ensure!(
        config.max_answers_per_attempt >= 1,
        "max_answers_per_attempt must be at least 1"
    );
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizmark"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZMARK_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZMARK_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZMARK_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${unclosed"), "${unclosed");
        std::env::remove_var("_QUIZMARK_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizmarkConfig::default();
        assert_eq!(config.default_tenant, DEFAULT_TENANT_ID);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.max_answers_per_attempt, 1000);
        assert_eq!(config.orchestrator_config().max_answers_per_attempt, 1000);
        assert_eq!(config.batch_config().parallelism, 4);
    }

    #[test]
    fn parse_partial_config() {
        let toml_str = r#"
default_tenant = 12
parallelism = 8
"#;
        let config: QuizmarkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.default_tenant, 12);
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.max_answers_per_attempt, 1000);
        assert_eq!(config.output_dir, PathBuf::from("./quizmark-results"));
    }

    #[test]
    fn load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizmark.toml");
        std::fs::write(&path, "max_answers_per_attempt = 50\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.max_answers_per_attempt, 50);
    }

    #[test]
    fn load_missing_explicit_path_fails() {
        let err = load_config_from(Some(Path::new("/nonexistent/quizmark.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn rejects_zero_limits() {
        let mut config = QuizmarkConfig {
            max_answers_per_attempt: 0,
            ..Default::default()
        };
        assert!(apply_env_overrides(&mut config).is_err());
    }
}
