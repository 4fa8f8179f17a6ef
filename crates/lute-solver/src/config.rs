//! Solver configuration.
//!
//! Values are resolved in priority order (highest first):
//!
//! 1. Environment variables (`LUTE_*`)
//! 2. A JSON configuration file
//! 3. Built-in defaults
//!
//! ```rust,no_run
//! use lute_solver::config::SolverConfig;
//! use std::path::Path;
//!
//! let config = SolverConfig::build(Some(Path::new("/etc/lute/solver.json")), true).unwrap();
//! println!("Iteration cap: {}", config.max_iterations);
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{Result, SolverError};

/// Default cap on solver loop iterations
pub const DEFAULT_MAX_ITERATIONS: u32 = 100_000;

/// Tunables for [`Solver`](crate::solver::Solver)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SolverConfig {
    /// Upper bound on decide/propagate rounds before giving up
    pub max_iterations: u32,
    /// Fail with a cyclic dependency error when requirements form a loop
    pub reject_cycles: bool,
    /// Emit "must not be installed" assertions for conflicting identities
    pub emit_conflicts: bool,
    /// Also assert "not installed" for installed or universe packages that
    /// directly require something in the solution
    pub include_dependents: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            reject_cycles: true,
            emit_conflicts: true,
            include_dependents: false,
        }
    }
}

impl SolverConfig {
    /// Build a configuration from an optional file and, optionally, the environment
    pub fn build(path: Option<&Path>, use_environment: bool) -> Result<Self> {
        let loader = ConfigLoader::new(use_environment);

        let config = match path {
            Some(path) => loader.load_config_file(path)?,
            None => Self::default(),
        };

        loader.apply_env(config)
    }

    /// Parse a configuration from JSON; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file, falling back to defaults when it does not exist
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        ConfigLoader::new(false).load_config_file(path)
    }

    /// Apply `LUTE_*` environment overrides on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self> {
        ConfigLoader::new(true).apply_env(self)
    }
}

/// Loads [`SolverConfig`] from files and the environment
#[derive(Debug)]
pub struct ConfigLoader {
    use_environment: bool,
}

impl ConfigLoader {
    pub fn new(use_environment: bool) -> Self {
        Self { use_environment }
    }

    /// Get a LUTE_* environment variable, ignoring empty values
    pub fn get_lute_env(&self, var: &str) -> Option<String> {
        if !self.use_environment {
            return None;
        }

        env::var(var).ok().filter(|s| !s.is_empty())
    }

    /// Get a configuration value from the environment.
    /// Converts "max-iterations" to "LUTE_MAX_ITERATIONS"
    pub fn get_env_config(&self, key: &str) -> Option<String> {
        self.get_lute_env(&Self::env_var_name(key))
    }

    /// Load configuration from a JSON file
    pub fn load_config_file<P: AsRef<Path>>(&self, path: P) -> Result<SolverConfig> {
        let path = path.as_ref();

        if !path.exists() {
            log::debug!("No solver config at {}, using defaults", path.display());
            return Ok(SolverConfig::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| SolverError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| SolverError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Overlay environment values on a configuration
    pub fn apply_env(&self, config: SolverConfig) -> Result<SolverConfig> {
        self.apply_with(config, |key| self.get_env_config(key))
    }

    fn apply_with<F>(&self, mut config: SolverConfig, lookup: F) -> Result<SolverConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("max-iterations") {
            config.max_iterations = value.trim().parse().map_err(|_| {
                SolverError::Config(format!(
                    "{} must be a positive integer, got {:?}",
                    Self::env_var_name("max-iterations"),
                    value
                ))
            })?;
        }

        if let Some(value) = lookup("reject-cycles") {
            config.reject_cycles = parse_bool("reject-cycles", &value)?;
        }

        if let Some(value) = lookup("emit-conflicts") {
            config.emit_conflicts = parse_bool("emit-conflicts", &value)?;
        }

        if let Some(value) = lookup("include-dependents") {
            config.include_dependents = parse_bool("include-dependents", &value)?;
        }

        Ok(config)
    }

    fn env_var_name(key: &str) -> String {
        format!("LUTE_{}", key.replace('-', "_").to_uppercase())
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(SolverError::Config(format!(
            "{} must be a boolean, got {:?}",
            ConfigLoader::env_var_name(key),
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert!(config.reject_cycles);
        assert!(config.emit_conflicts);
        assert!(!config.include_dependents);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SolverConfig::from_json_str(r#"{"max-iterations": 10}"#).unwrap();
        assert_eq!(config.max_iterations, 10);
        assert!(config.reject_cycles);
    }

    #[test]
    fn test_invalid_json() {
        let err = SolverConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SolverError::JsonParse(_)));
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(ConfigLoader::env_var_name("max-iterations"), "LUTE_MAX_ITERATIONS");
        assert_eq!(ConfigLoader::env_var_name("emit-conflicts"), "LUTE_EMIT_CONFLICTS");
    }

    #[test]
    fn test_env_disabled() {
        let loader = ConfigLoader::new(false);
        assert_eq!(loader.get_lute_env("LUTE_MAX_ITERATIONS"), None);
        assert_eq!(loader.get_env_config("reject-cycles"), None);
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            ("max-iterations", "250"),
            ("reject-cycles", "false"),
            ("emit-conflicts", "0"),
            ("include-dependents", "on"),
        ]
        .into_iter()
        .collect();

        let loader = ConfigLoader::new(true);
        let config = loader
            .apply_with(SolverConfig::default(), |key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.max_iterations, 250);
        assert!(!config.reject_cycles);
        assert!(!config.emit_conflicts);
        assert!(config.include_dependents);
    }

    #[test]
    fn test_apply_invalid_integer() {
        let loader = ConfigLoader::new(true);
        let err = loader
            .apply_with(SolverConfig::default(), |key| {
                (key == "max-iterations").then(|| "lots".to_string())
            })
            .unwrap_err();

        assert!(matches!(err, SolverError::Config(_)));
        assert!(err.to_string().contains("LUTE_MAX_ITERATIONS"));
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("reject-cycles", "1").unwrap());
        assert!(parse_bool("reject-cycles", "true").unwrap());
        assert!(parse_bool("reject-cycles", " YES ").unwrap());
        assert!(!parse_bool("reject-cycles", "off").unwrap());
        assert!(!parse_bool("reject-cycles", "False").unwrap());
    }

    #[test]
    fn test_apply_invalid_bool() {
        for garbage in ["flase", "2", "enabled"] {
            let loader = ConfigLoader::new(true);
            let err = loader
                .apply_with(SolverConfig::default(), |key| {
                    (key == "reject-cycles").then(|| garbage.to_string())
                })
                .unwrap_err();

            assert!(matches!(err, SolverError::Config(_)));
            assert!(err.to_string().contains("LUTE_REJECT_CYCLES"));
            assert!(err.to_string().contains(garbage));
        }
    }
}
