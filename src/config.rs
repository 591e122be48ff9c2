//! Configuration management for xdna-prof.
//!
//! Configuration is loaded from multiple sources in priority order:
//! 1. Environment variables (XDNA_PROF_CONFIG, etc.)
//! 2. Project-local config file (`./xdna-prof.toml`)
//! 3. User config file (`~/.config/xdna-prof/config.toml`)
//! 4. Built-in defaults
//!
//! # Config File Format
//!
//! ```toml
//! # xdna-prof.toml
//!
//! # Hardware generation to open
//! generation = "aie2"
//!
//! # Tile metric settings, same syntax as the runtime ini entries
//! profile_metrics = "all:heat_map"
//! trace_metrics = "{0,0}:{3,0}:functions"
//! ```

use crate::device::AieGen;
use crate::trace::tables::CounterScheme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Global cached configuration.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// xdna-prof configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Hardware generation of the device to open.
    pub generation: Option<AieGen>,

    /// Array clock in MHz.
    /// Converts trace start times like "50us" into cycle counts.
    pub clock_freq_mhz: Option<f64>,

    /// Tile metric settings for profiling.
    pub profile_metrics: Option<String>,

    /// Interface-tile metric settings for profiling.
    pub interface_metrics: Option<String>,

    /// Tile metric settings for trace.
    pub trace_metrics: Option<String>,

    /// Trace start delay, e.g. "500ms" or a bare cycle count.
    pub trace_start: Option<String>,

    /// Graph iteration count that starts the trace.
    pub trace_iterations: Option<u32>,

    /// Trace counter scheme, "es1" or "es2".
    pub counter_scheme: Option<String>,

    /// Leave trace start and stop to user events fired by the kernel.
    pub user_control: Option<bool>,
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. File named by `XDNA_PROF_CONFIG`
    /// 3. Project-local `xdna-prof.toml`
    /// 4. User config `~/.config/xdna-prof/config.toml`
    /// 5. Defaults
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load user config first (lowest priority of file configs)
        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        // Load project-local config (higher priority)
        if let Some(local_config) = Self::load_local_config() {
            config.merge(local_config);
        }

        // An explicitly named file beats both
        if let Ok(path) = std::env::var("XDNA_PROF_CONFIG") {
            if let Some(named_config) = Self::load_from_file(Path::new(&path)) {
                config.merge(named_config);
            }
        }

        // Environment variables override everything
        config.apply_env_overrides();

        config
    }

    /// Get the cached global configuration.
    ///
    /// Loads configuration on first call and caches it.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(|| {
            let config = Self::load();
            log::debug!("Loaded configuration: {:?}", config);
            config
        })
    }

    /// Get the hardware generation, with fallback to AIE-ML.
    pub fn generation(&self) -> AieGen {
        self.generation.unwrap_or(AieGen::Aie2)
    }

    /// Get the array clock in MHz, with fallback to 1 GHz.
    pub fn clock_freq_mhz(&self) -> f64 {
        self.clock_freq_mhz.unwrap_or(1000.0)
    }

    /// Get the profiling metric settings, with fallback to heat maps
    /// everywhere.
    pub fn profile_metrics(&self) -> String {
        self.profile_metrics
            .clone()
            .unwrap_or_else(|| "all:heat_map".to_string())
    }

    /// Get the interface metric settings, with fallback to input
    /// throughputs everywhere.
    pub fn interface_metrics(&self) -> String {
        self.interface_metrics
            .clone()
            .unwrap_or_else(|| "all:input_throughputs".to_string())
    }

    /// Get the trace metric settings, with fallback to function trace
    /// everywhere.
    pub fn trace_metrics(&self) -> String {
        self.trace_metrics
            .clone()
            .unwrap_or_else(|| "all:functions".to_string())
    }

    /// Get the trace counter scheme, with fallback to the default
    /// scheme on an unknown name.
    pub fn counter_scheme(&self) -> CounterScheme {
        let Some(name) = &self.counter_scheme else {
            return CounterScheme::default();
        };
        match CounterScheme::from_name(&name.to_lowercase()) {
            Some(scheme) => scheme,
            None => {
                log::warn!("Unknown counter scheme \"{}\", using default", name);
                CounterScheme::default()
            }
        }
    }

    /// Load user configuration from ~/.config/xdna-prof/config.toml
    fn load_user_config() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        let config_path = config_dir.join("xdna-prof").join("config.toml");
        Self::load_from_file(&config_path)
    }

    /// Load project-local configuration from ./xdna-prof.toml
    fn load_local_config() -> Option<Self> {
        // Try current directory
        let local_path = Path::new("xdna-prof.toml");
        if let Some(config) = Self::load_from_file(local_path) {
            return Some(config);
        }

        // Try to find project root by looking for Cargo.toml
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let project_path = Path::new(&manifest_dir).join("xdna-prof.toml");
            if let Some(config) = Self::load_from_file(&project_path) {
                return Some(config);
            }
        }

        None
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Merge another config into this one.
    /// Only overrides fields that are Some in the other config.
    fn merge(&mut self, other: Self) {
        if other.generation.is_some() {
            self.generation = other.generation;
        }
        if other.clock_freq_mhz.is_some() {
            self.clock_freq_mhz = other.clock_freq_mhz;
        }
        if other.profile_metrics.is_some() {
            self.profile_metrics = other.profile_metrics;
        }
        if other.interface_metrics.is_some() {
            self.interface_metrics = other.interface_metrics;
        }
        if other.trace_metrics.is_some() {
            self.trace_metrics = other.trace_metrics;
        }
        if other.trace_start.is_some() {
            self.trace_start = other.trace_start;
        }
        if other.trace_iterations.is_some() {
            self.trace_iterations = other.trace_iterations;
        }
        if other.counter_scheme.is_some() {
            self.counter_scheme = other.counter_scheme;
        }
        if other.user_control.is_some() {
            self.user_control = other.user_control;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(name) = std::env::var("XDNA_PROF_GENERATION") {
            match AieGen::from_name(&name.to_lowercase()) {
                Some(gen) => {
                    log::info!("Using generation from environment: {:?}", gen);
                    self.generation = Some(gen);
                }
                None => log::warn!("Ignoring unknown XDNA_PROF_GENERATION \"{}\"", name),
            }
        }
        if let Ok(metrics) = std::env::var("XDNA_PROF_TRACE_METRICS") {
            log::info!("Using trace metrics from environment: {}", metrics);
            self.trace_metrics = Some(metrics);
        }
        if let Ok(start) = std::env::var("XDNA_PROF_TRACE_START") {
            log::info!("Using trace start from environment: {}", start);
            self.trace_start = Some(start);
        }
    }

    /// Get the path to the user config file (for display/creation).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("xdna-prof").join("config.toml"))
    }

    /// Generate a sample config file content.
    pub fn sample_config() -> String {
        r#"# xdna-prof configuration
# Place this file at ~/.config/xdna-prof/config.toml or ./xdna-prof.toml

# Hardware generation: aie1, aie2, aie2ps or npu3
generation = "aie2"

# Array clock in MHz, used to convert trace start times to cycles
clock_freq_mhz = 1000.0

# Tile metric settings, same syntax as the runtime ini entries
profile_metrics = "all:heat_map"
# interface_metrics = "all:input_throughputs"
# trace_metrics = "{0,0}:{3,0}:functions"

# Trace start control: a delay ("500ms", "10000" cycles), a graph
# iteration count, or user events fired by the kernel
# trace_start = "50us"
# trace_iterations = 3
# user_control = false

# Trace counter scheme on AIE1 class devices: es1 or es2
# counter_scheme = "es2"
"#
        .to_string()
    }
}
