use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
/// Top-level configuration struct.
pub struct Config {
    #[serde(default)]
    /// The main configuration section for sinktrace.
    pub sinktrace: SinktraceConfig,
}

#[derive(Debug, Deserialize, Default, Clone)]
/// Configuration options for sinktrace.
pub struct SinktraceConfig {
    /// List of folders to exclude.
    pub exclude_folders: Option<Vec<String>>,
    /// List of folders to force-include.
    pub include_folders: Option<Vec<String>>,
    /// Whether to include test files.
    pub include_tests: Option<bool>,
    /// Whether to run the line-level pattern matcher.
    pub patterns: Option<bool>,
    /// Whether to run annotation inference.
    pub inference: Option<bool>,
    /// Whether to emit a JAIF export per analysis.
    pub jaif: Option<bool>,
    /// Benchmark mode: relax the test/sample file skip rules.
    pub benchmark: Option<bool>,
    /// Whether a critical finding fails the run (non-zero exit).
    pub fail_on_critical: Option<bool>,
    /// Custom taint source function names.
    #[serde(default)]
    pub custom_sources: Vec<String>,
    /// Custom sink function names.
    #[serde(default)]
    pub custom_sinks: Vec<String>,
    /// Custom sanitizer function names.
    #[serde(default)]
    pub custom_sanitizers: Vec<String>,
}

/// `package.json` shape carrying a `"sinktrace"` table.
#[derive(Debug, Deserialize, Clone)]
struct PackageJson {
    sinktrace: SinktraceConfig,
}

impl Config {
    /// Loads configuration from default locations in the current directory.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// Checks `.sinktrace.toml` first, then a `"sinktrace"` key inside
    /// `package.json`, walking parent directories until one is found.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            // 1. Try .sinktrace.toml
            let sinktrace_toml = current.join(".sinktrace.toml");
            if sinktrace_toml.exists() {
                if let Ok(content) = fs::read_to_string(&sinktrace_toml) {
                    if let Ok(config) = toml::from_str::<Config>(&content) {
                        return config;
                    }
                }
            }

            // 2. Try package.json
            let package_json = current.join("package.json");
            if package_json.exists() {
                if let Ok(content) = fs::read_to_string(&package_json) {
                    if let Ok(pkg) = serde_json::from_str::<PackageJson>(&content) {
                        return Config {
                            sinktrace: pkg.sinktrace,
                        };
                    }
                }
            }

            if !current.pop() {
                break;
            }
        }

        Config::default()
    }
}
