use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Application configuration for the wirekit tools.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Which manifest to resolve.
    #[serde(default)]
    pub manifest: ManifestConfig,
    /// How results are printed.
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestConfig {
    /// `.yaml`, `.yml` or `.json` file. Relative paths are resolved against the
    /// directory of the config file that set them.
    pub path: Option<String>,
    /// Root module name; overrides the manifest's own `root`.
    pub root: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Tree,
    Json,
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tree" => Ok(Self::Tree),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!(
                "unknown output format '{other}', expected tree, json or yaml"
            )),
        }
    }
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/wirekit.log", empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration: console only.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "warn".to_string(),
            file: String::new(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            manifest: ManifestConfig::default(),
            output: OutputConfig::default(),
            logging: Some(default_logging_config()),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    ///
    /// A relative `manifest.path` from the YAML file is resolved against the
    /// file's directory; one from the environment is kept as given.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let config_path = config_path.as_ref();

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path))
            .extract()
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

        if let Some(dir) = config_path.parent() {
            config.manifest.resolve_relative_to(dir);
        }

        // Example: WIREKIT__OUTPUT__FORMAT=json maps to output.format
        config
            .merge_layer(Env::prefixed("WIREKIT__").split("__"))
            .with_context(|| format!("Failed to load config from {}", config_path.display()))
    }

    fn merge_layer(self, layer: impl figment::Provider) -> Result<Self> {
        use figment::{providers::Serialized, Figment};

        Figment::from(Serialized::defaults(self))
            .merge(layer)
            .extract()
            .map_err(Into::into)
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(path) = &args.manifest {
            self.manifest.path = Some(path.clone());
        }
        if let Some(root) = &args.root {
            self.manifest.root = Some(root.clone());
        }
        if let Some(format) = args.format {
            self.output.format = format;
        }

        // Set logging level based on verbose flags for "default" section.
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "info".to_string(),
                2 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    /// Manifest path, or an error naming both ways to provide it.
    pub fn manifest_path(&self) -> Result<PathBuf> {
        self.manifest
            .path
            .as_deref()
            .map(PathBuf::from)
            .context("No manifest given: pass --manifest or set manifest.path in the config file")
    }
}

impl ManifestConfig {
    fn resolve_relative_to(&mut self, dir: &Path) {
        if let Some(path) = self.path.as_mut() {
            let p = Path::new(path.as_str());
            if p.is_relative() && !dir.as_os_str().is_empty() {
                *path = dir.join(p).to_string_lossy().into_owned();
            }
        }
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub manifest: Option<String>,
    pub root: Option<String>,
    pub format: Option<OutputFormat>,
    pub verbose: u8,
}

#[cfg(test)]
mod tests;
