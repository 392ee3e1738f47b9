//! Configuration file parsing for jitprof.toml.

use jitprof_core::ProfilerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file names searched in the current directory and its parents
const CONFIG_NAMES: &[&str] = &["jitprof.toml", ".jitprofrc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Report limits
    #[serde(default)]
    pub report: ProfilerConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Report format
    #[serde(default)]
    pub format: OutputFormat,
}

/// How the report is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Load configuration from a file or search for a default config file.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => std::env::current_dir()
            .ok()
            .and_then(|cwd| find_config_file(&cwd)),
    };

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            tracing::debug!("Loaded config from {:?}", path);
            Ok(config)
        }
        Some(path) => Err(anyhow::anyhow!("Config file {} not found", path.display())),
        None => Ok(Config::default()),
    }
}

/// Search for a configuration file in `start` and its ancestors.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.report, ProfilerConfig::default());
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[report]
max_sites = 10
min_misses = 3

[output]
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.report.max_sites, 10);
        assert_eq!(config.report.min_misses, 3);
        assert_eq!(config.report.max_layouts, 5);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_find_config_in_parent() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("jitprof.toml"), "[report]\nmax_sites = 2\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, dir.path().join("jitprof.toml"));

        let config = load_config(Some(&found)).unwrap();
        assert_eq!(config.report.max_sites, 2);
    }

    #[test]
    fn test_explicit_missing_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_invalid_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jitprof.toml");
        std::fs::write(&path, "[report]\nmax_sites = \"many\"\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
