//! Configuration management for the assembler
//!
//! Settings are loaded from TOML or JSON files, overridden from `READSCAN_*`
//! environment variables, and validated before use.

use crate::error::{AssemblyError, Result};
use crate::kmer::{MAX_K, MIN_K};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::Path;
use validator::{Validate, ValidationError, ValidationErrors};

/// Top-level assembler configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblerConfig {
    pub filter: FilterSettings,
    pub graph: GraphSettings,
    pub output: OutputSettings,
    pub logging: LoggingConfig,
}

/// Presence filter settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct FilterSettings {
    /// Requested filter size in bits; rounded up to a power of two
    #[validate(range(min = 64, max = 1_099_511_627_776_u64))]
    pub bits: u64,

    /// Number of hash functions
    #[validate(range(min = 1, max = 10))]
    pub hash_count: usize,

    /// User seed for the hash functions
    pub seed: u64,

    /// Answer membership from an explicit k-mer set instead of the bits
    pub exact: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            bits: 1 << 28,
            hash_count: 4,
            seed: 0,
            exact: false,
        }
    }
}

/// Junction scanning and graph simplification settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct GraphSettings {
    /// K-mer length, odd
    #[validate(range(min = 3, max = 31))]
    pub k: usize,

    /// Depth of the false-positive lookahead
    #[validate(range(min = 0, max = 64))]
    pub lookahead: usize,

    /// Bound on the sink search past a read end
    #[validate(range(min = 1, max = 1000000))]
    pub max_read_length: usize,

    /// Dangling contigs shorter than this are removed as tips
    pub max_tip_length: usize,

    /// Bound on a single walk through the filter
    #[validate(range(min = 1))]
    pub max_contig_length: usize,

    /// Merge pass-through nodes after tip removal
    pub collapse: bool,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            k: 31,
            lookahead: 3,
            max_read_length: 250,
            max_tip_length: 100,
            max_contig_length: 1_000_000,
            collapse: true,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Path prefix for every output file
    #[validate(length(min = 1))]
    pub prefix: String,

    /// Shortest contig written to the FASTA output
    pub min_contig_length: usize,

    /// Write the junction map before building the graph
    pub write_junctions: bool,

    /// Write the contig graph as FastG
    pub write_fastg: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            prefix: "readscan".to_string(),
            min_contig_length: 100,
            write_junctions: false,
            write_fastg: true,
        }
    }
}

impl OutputSettings {
    pub fn path(&self, suffix: &str) -> String {
        format!("{}.{}", self.prefix, suffix)
    }
}

fn validate_odd_k(k: usize) -> std::result::Result<(), ValidationError> {
    if k % 2 == 1 && (MIN_K..=MAX_K).contains(&k) {
        Ok(())
    } else {
        let mut error = ValidationError::new("odd_k");
        error.message = Some(format!("k must be odd and between {} and {}, got {}", MIN_K, MAX_K, k).into());
        Err(error)
    }
}

impl Validate for AssemblerConfig {
    fn validate(&self) -> std::result::Result<(), ValidationErrors> {
        self.filter.validate()?;
        self.graph.validate()?;
        self.output.validate()?;
        if let Err(e) = validate_odd_k(self.graph.k) {
            let mut errors = ValidationErrors::new();
            errors.add("k", e);
            return Err(errors);
        }
        Ok(())
    }
}

/// Named preset applied on top of the defaults
#[derive(Debug, Clone)]
pub struct ConfigProfile {
    pub description: &'static str,
    pub config: AssemblerConfig,
}

/// Loads, overrides, validates and saves [`AssemblerConfig`]
pub struct ConfigManager {
    config: AssemblerConfig,
    profiles: HashMap<&'static str, ConfigProfile>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::with_config(AssemblerConfig::default())
    }

    fn with_config(config: AssemblerConfig) -> Self {
        let mut manager = Self {
            config,
            profiles: HashMap::new(),
        };
        manager.load_builtin_profiles();
        manager
    }

    /// Load a `.toml` or `.json` file and validate it
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: AssemblerConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)
                .map_err(|e| AssemblyError::config(format!("TOML parse error: {}", e)))?,
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| AssemblyError::config(format!("JSON parse error: {}", e)))?,
            _ => {
                return Err(AssemblyError::config(
                    "Unsupported config file format. Use .toml or .json",
                ));
            }
        };

        config
            .validate()
            .map_err(|e| AssemblyError::config(format!("Configuration validation failed: {}", e)))?;

        Ok(Self::with_config(config))
    }

    /// Apply `READSCAN_*` overrides, then validate
    pub fn load_from_env(&mut self) -> Result<()> {
        if let Some(k) = env_parse("READSCAN_K")? {
            self.config.graph.k = k;
        }
        if let Some(bits) = env_parse("READSCAN_FILTER_BITS")? {
            self.config.filter.bits = bits;
        }
        if let Some(seed) = env_parse("READSCAN_SEED")? {
            self.config.filter.seed = seed;
        }
        if let Some(lookahead) = env_parse("READSCAN_LOOKAHEAD")? {
            self.config.graph.lookahead = lookahead;
        }
        if let Some(level) = env_parse("READSCAN_LOG_LEVEL")? {
            self.config.logging.level = level;
        }
        if let Some(json) = env_parse("READSCAN_JSON_LOGS")? {
            self.config.logging.json_format = json;
        }
        if let Ok(prefix) = env::var("READSCAN_OUTPUT_PREFIX") {
            self.config.output.prefix = prefix;
        }

        self.config.validate().map_err(|e| {
            AssemblyError::config(format!("Configuration validation failed after env override: {}", e))
        })?;
        Ok(())
    }

    pub fn apply_profile(&mut self, name: &str) -> Result<()> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| AssemblyError::config(format!("Unknown profile: {}", name)))?;
        self.config = profile.config.clone();
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn profile_description(&self, name: &str) -> Option<&str> {
        self.profiles.get(name).map(|p| p.description)
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AssemblerConfig {
        &mut self.config
    }

    /// Write the current configuration; format follows the extension
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::to_string_pretty(&self.config)
                .map_err(|e| AssemblyError::config(format!("TOML serialize error: {}", e)))?,
            Some("json") => serde_json::to_string_pretty(&self.config)
                .map_err(|e| AssemblyError::config(format!("JSON serialize error: {}", e)))?,
            _ => {
                return Err(AssemblyError::config(
                    "Unsupported config file format. Use .toml or .json",
                ));
            }
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    fn load_builtin_profiles(&mut self) {
        let mut fast = AssemblerConfig::default();
        fast.filter.hash_count = 3;
        fast.graph.lookahead = 1;
        self.profiles.insert(
            "fast",
            ConfigProfile {
                description: "Shallow lookahead, fewer hash functions",
                config: fast,
            },
        );

        let mut sensitive = AssemblerConfig::default();
        sensitive.filter.hash_count = 6;
        sensitive.graph.lookahead = 5;
        sensitive.graph.max_tip_length = 2 * sensitive.graph.k + 1;
        self.profiles.insert(
            "sensitive",
            ConfigProfile {
                description: "Deeper lookahead to reject more false branches",
                config: sensitive,
            },
        );
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|e| AssemblyError::config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::io::Write;
    use tempfile::{Builder, TempDir};

    #[test]
    fn test_default_config_is_valid() {
        assert!(AssemblerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AssemblerConfig::default();
        config.graph.k = 30;
        assert!(config.validate().is_err());

        config.graph.k = 33;
        assert!(config.validate().is_err());

        config.graph.k = 21;
        config.filter.hash_count = 11;
        assert!(config.validate().is_err());

        config.filter.hash_count = 4;
        config.output.prefix.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_file_loading() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"graph": {"k": 21}, "filter": {"exact": true}}"#)
            .unwrap();
        file.flush().unwrap();

        let manager = ConfigManager::load_from_file(file.path()).unwrap();
        assert_eq!(manager.config().graph.k, 21);
        assert!(manager.config().filter.exact);
        assert_eq!(manager.config().graph.lookahead, 3);
    }

    #[test]
    fn test_rejects_unknown_extension_and_even_k() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("config.yaml");
        std::fs::write(&yaml, "graph: {}").unwrap();
        assert!(matches!(
            ConfigManager::load_from_file(&yaml),
            Err(AssemblyError::Config(_))
        ));

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, "[graph]\nk = 20\n").unwrap();
        assert!(ConfigManager::load_from_file(&toml_path).is_err());
    }

    #[test]
    fn test_profiles() {
        let mut manager = ConfigManager::new();
        assert_eq!(manager.list_profiles(), vec!["fast", "sensitive"]);
        assert!(manager.profile_description("fast").is_some());
        assert!(manager.apply_profile("nonexistent").is_err());

        manager.apply_profile("sensitive").unwrap();
        assert_eq!(manager.config().graph.lookahead, 5);
        assert!(manager.config().validate().is_ok());
    }

    #[test]
    fn test_environment_variable_override() {
        let mut manager = ConfigManager::new();

        // SAFETY: only this test touches READSCAN_* variables
        unsafe {
            env::set_var("READSCAN_K", "25");
            env::set_var("READSCAN_LOG_LEVEL", "debug");
            env::set_var("READSCAN_JSON_LOGS", "true");
        }
        let result = manager.load_from_env();
        unsafe {
            env::remove_var("READSCAN_K");
            env::remove_var("READSCAN_LOG_LEVEL");
            env::remove_var("READSCAN_JSON_LOGS");
        }

        result.unwrap();
        assert_eq!(manager.config().graph.k, 25);
        assert_eq!(manager.config().logging.level, LogLevel::Debug);
        assert!(manager.config().logging.json_format);
    }
}
