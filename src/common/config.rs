//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Debug adapter configurations
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,

    /// Default settings
    #[serde(default)]
    pub defaults: Defaults,

    /// Fixture build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,
}

/// Configuration for a debug adapter
#[derive(Debug, Deserialize, Clone)]
pub struct AdapterConfig {
    /// Path to the adapter executable
    pub path: PathBuf,

    /// Additional arguments to pass to the adapter
    #[serde(default)]
    pub args: Vec<String>,
}

/// Default settings
#[derive(Debug, Deserialize)]
pub struct Defaults {
    /// Default adapter to use
    #[serde(default = "default_adapter")]
    pub adapter: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            adapter: default_adapter(),
        }
    }
}

fn default_adapter() -> String {
    "lldb-dap".to_string()
}

/// Fixture build settings
#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    /// Compiler used for source fixtures
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Flags always passed to the compiler
    #[serde(default = "default_flags")]
    pub flags: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            flags: default_flags(),
        }
    }
}

fn default_compiler() -> String {
    "clang++".to_string()
}

fn default_flags() -> Vec<String> {
    vec!["-g".to_string(), "-O0".to_string()]
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for DAP initialize request
    #[serde(default = "default_initialize")]
    pub initialize_secs: u64,

    /// Timeout for general DAP requests
    #[serde(default = "default_request")]
    pub request_secs: u64,

    /// Timeout for waiting on a stop event
    #[serde(default = "default_stop")]
    pub stop_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            initialize_secs: default_initialize(),
            request_secs: default_request(),
            stop_secs: default_stop(),
        }
    }
}

fn default_initialize() -> u64 {
    10
}
fn default_request() -> u64 {
    30
}
fn default_stop() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    super::Error::FileRead {
                        path: path.display().to_string(),
                        error: e.to_string(),
                    }
                })?;
                return toml::from_str(&content)
                    .map_err(|e| super::Error::ConfigParse(e.to_string()));
            }
        }
        Ok(Self::default())
    }

    /// Get adapter configuration by name
    ///
    /// Falls back to searching PATH if not explicitly configured
    pub fn get_adapter(&self, name: &str) -> Option<AdapterConfig> {
        if let Some(config) = self.adapters.get(name) {
            return Some(config.clone());
        }

        which::which(name).ok().map(|path| AdapterConfig {
            path,
            args: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.defaults.adapter, "lldb-dap");
        assert_eq!(config.build.compiler, "clang++");
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_parse_config_file() {
        let config: Config = toml::from_str(
            r#"
[adapters.lldb-dap]
path = "/usr/bin/lldb-dap"
args = ["--port", "0"]

[defaults]
adapter = "lldb-dap"

[build]
compiler = "g++"
flags = ["-g", "-O0", "-std=c++17"]

[timeouts]
initialize_secs = 5
"#,
        )
        .unwrap();

        let adapter = config.adapters.get("lldb-dap").unwrap();
        assert_eq!(adapter.path, PathBuf::from("/usr/bin/lldb-dap"));
        assert_eq!(adapter.args, vec!["--port", "0"]);
        assert_eq!(config.build.compiler, "g++");
        assert_eq!(config.timeouts.initialize_secs, 5);
        // Unspecified timeouts keep their defaults
        assert_eq!(config.timeouts.stop_secs, 30);
    }

    #[test]
    fn test_get_adapter_prefers_explicit_config() {
        let mut config = Config::default();
        config.adapters.insert(
            "my-adapter".to_string(),
            AdapterConfig {
                path: PathBuf::from("/opt/my-adapter"),
                args: vec![],
            },
        );

        let adapter = config.get_adapter("my-adapter").unwrap();
        assert_eq!(adapter.path, PathBuf::from("/opt/my-adapter"));
    }
}
