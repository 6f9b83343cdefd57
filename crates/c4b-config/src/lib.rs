//! Configuration management for c4b.
//!
//! Parses `c4b.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `project.repo_name`
//! - `site.theme`
//! - `pdf.converter`
//! - `diagrams.mermaid_cli`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override source directory.
    pub root_folder: Option<PathBuf>,
    /// Override destination directory.
    pub dist_folder: Option<PathBuf>,
    /// Override Mermaid embedding for Markdown output.
    pub embed_mermaid_diagrams: Option<bool>,
    /// Override site cache enabled flag.
    pub cache_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "c4b.toml";

/// Name of the content cache file inside the project directory.
const CACHE_FILENAME: &str = ".c4b-cache.json";

/// Value older configuration files use for an unset destination.
const UNSET_FOLDER: &str = "undefined";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Project identity.
    pub project: ProjectConfig,
    /// Source and destination folders (relative strings from TOML).
    paths: PathsConfigRaw,
    /// Markdown bundle options.
    pub markdown: MarkdownConfig,
    /// Docsify site options.
    pub site: SiteConfig,
    /// PDF options (stylesheet path is a relative string from TOML).
    pdf: PdfConfigRaw,
    /// External diagram renderer.
    pub diagrams: DiagramsConfig,

    /// Resolved folders (set after loading).
    #[serde(skip)]
    pub paths_resolved: PathsConfig,
    /// Resolved PDF configuration (set after loading).
    #[serde(skip)]
    pub pdf_resolved: PdfConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_base(Path::new("."))
    }
}

/// Project identity.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project name, used as document title and PDF file name.
    pub name: String,
    /// Display name of the root directory.
    pub homepage_name: String,
    /// Repository shown by the docsify corner link. Empty for none.
    pub repo_name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "My Project".to_owned(),
            homepage_name: "Overview".to_owned(),
            repo_name: String::new(),
        }
    }
}

/// Raw folder configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PathsConfigRaw {
    root_folder: Option<String>,
    dist_folder: Option<String>,
}

/// Resolved folder configuration.
#[derive(Debug, Default, Clone)]
pub struct PathsConfig {
    /// Directory containing the Markdown/Mermaid sources.
    pub root_folder: PathBuf,
    /// Directory receiving the generated output. Empty when unset.
    pub dist_folder: PathBuf,
    /// Directory holding the config file (or the working directory).
    pub project_dir: PathBuf,
}

impl PathsConfig {
    /// Whether a destination folder has been configured.
    #[must_use]
    pub fn has_dist_folder(&self) -> bool {
        !self.dist_folder.as_os_str().is_empty() && self.dist_folder != Path::new(UNSET_FOLDER)
    }
}

/// Markdown bundle configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Splice `.mmd` files in as fenced `mermaid` blocks instead of images.
    pub embed_mermaid_diagrams: bool,
    /// Write one `README.md` for the whole tree instead of one per directory.
    pub single_file: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            embed_mermaid_diagrams: false,
            single_file: true,
        }
    }
}

/// Docsify site configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Stylesheet URL for the docsify theme.
    pub theme: String,
    /// Whether the docsify search plugin is loaded.
    pub search: bool,
    /// Registered template name or path to a template file.
    pub template: String,
    /// Whether unchanged directories are skipped on rebuild.
    pub cache_enabled: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            theme: "//unpkg.com/docsify/lib/themes/vue.css".to_owned(),
            search: true,
            template: "docsify".to_owned(),
            cache_enabled: true,
        }
    }
}

/// Raw PDF configuration as parsed from TOML.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct PdfConfigRaw {
    css: Option<String>,
    converter: String,
}

impl Default for PdfConfigRaw {
    fn default() -> Self {
        Self {
            css: None,
            converter: DEFAULT_PDF_CONVERTER.to_owned(),
        }
    }
}

const DEFAULT_PDF_CONVERTER: &str = "md-to-pdf";

/// Resolved PDF configuration.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Stylesheet passed to the converter.
    pub css: Option<PathBuf>,
    /// Markdown-to-PDF executable.
    pub converter: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            css: None,
            converter: DEFAULT_PDF_CONVERTER.to_owned(),
        }
    }
}

/// External diagram renderer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DiagramsConfig {
    /// Mermaid CLI executable.
    pub mermaid_cli: String,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            mermaid_cli: "mmdc".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`diagrams.mermaid_cli`").
        field: String,
        /// Error message (e.g., "${`MMDC`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `c4b.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Default configuration with every path relative to `base`.
    #[must_use]
    pub fn with_base(base: &Path) -> Self {
        Self {
            project: ProjectConfig::default(),
            paths: PathsConfigRaw::default(),
            markdown: MarkdownConfig::default(),
            site: SiteConfig::default(),
            pdf: PdfConfigRaw::default(),
            diagrams: DiagramsConfig::default(),
            paths_resolved: PathsConfig {
                root_folder: base.join("src"),
                dist_folder: base.join("docs"),
                project_dir: base.to_path_buf(),
            },
            pdf_resolved: PdfConfig::default(),
            config_path: None,
        }
    }

    /// Location of the persisted content cache.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.paths_resolved.project_dir.join(CACHE_FILENAME)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(root_folder) = &settings.root_folder {
            self.paths_resolved.root_folder.clone_from(root_folder);
        }
        if let Some(dist_folder) = &settings.dist_folder {
            self.paths_resolved.dist_folder.clone_from(dist_folder);
        }
        if let Some(embed) = settings.embed_mermaid_diagrams {
            self.markdown.embed_mermaid_diagrams = embed;
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.site.cache_enabled = cache_enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_base(&cwd)
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.project.name, "project.name")?;
        require_non_empty(&self.project.homepage_name, "project.homepage_name")?;
        require_non_empty(&self.site.template, "site.template")?;
        require_non_empty(&self.pdf_resolved.converter, "pdf.converter")?;
        require_non_empty(&self.diagrams.mermaid_cli, "diagrams.mermaid_cli")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.project.repo_name = expand::expand_env(&self.project.repo_name, "project.repo_name")?;
        self.site.theme = expand::expand_env(&self.site.theme, "site.theme")?;
        self.pdf.converter = expand::expand_env(&self.pdf.converter, "pdf.converter")?;
        self.diagrams.mermaid_cli =
            expand::expand_env(&self.diagrams.mermaid_cli, "diagrams.mermaid_cli")?;
        Ok(())
    }

    /// Resolve relative paths against the config directory.
    ///
    /// An empty or `undefined` destination stays unset so that output
    /// preparation can reject it.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let dist_folder = match self.paths.dist_folder.as_deref() {
            Some(raw) if raw.is_empty() || raw == UNSET_FOLDER => PathBuf::new(),
            Some(raw) => config_dir.join(raw),
            None => config_dir.join("docs"),
        };

        self.paths_resolved = PathsConfig {
            root_folder: config_dir.join(self.paths.root_folder.as_deref().unwrap_or("src")),
            dist_folder,
            project_dir: config_dir.to_path_buf(),
        };

        self.pdf_resolved = PdfConfig {
            css: self.pdf.css.as_deref().map(|css| config_dir.join(css)),
            converter: self.pdf.converter.clone(),
        };
    }
}
