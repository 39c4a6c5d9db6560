//! Atelier configuration system
//!
//! This crate provides centralized configuration management for the editor,
//! loading settings from `atelier.toml` with environment variable overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default configuration file name, resolved against the current directory.
pub const CONFIG_FILE: &str = "atelier.toml";

/// Errors raised while loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AtelierConfig {
    /// Site identity and page defaults
    pub site: SiteConfig,
    /// Undo/redo history settings
    pub history: HistoryConfig,
    /// Sandbox preview settings
    pub preview: PreviewConfig,
    /// Folder/page hierarchy settings
    pub hierarchy: HierarchyConfig,
    /// External collaborator endpoints
    pub collaborators: CollaboratorConfig,
    /// Intent classification policy
    pub intent: IntentConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Label appended to every page title ("About - My Website")
    pub label: String,
    /// Page that can never be deleted
    pub root_page: String,
    /// Theme assigned to pages created without one
    pub default_theme: String,
    /// Notice written into synthesized footers
    pub footer_notice: String,
}

/// History configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of entries kept per page (unbounded when unset)
    pub limit: Option<usize>,
}

/// Preview configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Origins accepted for inbound sandbox messages. An opaque sandboxed
    /// frame reports the literal origin `"null"`.
    pub allowed_origins: Vec<String>,
    /// Target origin the sandbox script uses when posting to the host
    pub host_origin: String,
    /// Quiet period before a burst of code edits re-renders the sandbox
    pub render_debounce_ms: u64,
}

/// Hierarchy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// Quiet period before hierarchy changes reach the persistence collaborator
    pub persist_debounce_ms: u64,
}

/// Collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    /// Base URL of the collaborator backend (e.g. "http://localhost:5000")
    pub base_url: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub generate_endpoint: String,
    pub images_endpoint: String,
    pub geocode_endpoint: String,
    pub map_endpoint: String,
    pub upload_endpoint: String,
    pub hierarchy_endpoint: String,
}

/// Intent classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentConfig {
    /// Phrases that make a request apply to every page
    pub all_pages_markers: Vec<String>,
    /// Phrases that signal a map request
    pub map_markers: Vec<String>,
    /// Phrases that signal a street address
    pub address_markers: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter directive (e.g. "info,atelier_store=debug")
    pub filter: Option<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            label: "My Website".to_string(),
            root_page: "index.html".to_string(),
            default_theme: "modern".to_string(),
            footer_notice: "All rights reserved.".to_string(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["null".to_string()],
            host_origin: "*".to_string(),
            render_debounce_ms: 150,
        }
    }
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            persist_debounce_ms: 500,
        }
    }
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
            generate_endpoint: "/api/generate".to_string(),
            images_endpoint: "/api/add-image".to_string(),
            geocode_endpoint: "/api/geocode".to_string(),
            map_endpoint: "/api/add-map".to_string(),
            upload_endpoint: "/api/upload".to_string(),
            hierarchy_endpoint: "/api/update-hierarchy".to_string(),
        }
    }
}

impl Default for IntentConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            all_pages_markers: strings(&[
                "all pages",
                "every page",
                "each page",
                "toutes les pages",
                "chaque page",
            ]),
            map_markers: strings(&[
                "map",
                "carte",
                "location",
                "localisation",
                "geographic",
                "géographique",
            ]),
            address_markers: strings(&[
                "street",
                "avenue",
                "boulevard",
                "blvd",
                "road",
                "city",
                "town",
                "rue",
                "place",
                "impasse",
                "allée",
                "route",
            ]),
        }
    }
}

impl AtelierConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from the default location (atelier.toml in the current directory)
    /// or return default configuration if file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        if let Ok(label) = std::env::var("ATELIER_SITE_LABEL") {
            self.site.label = label;
        }
        if let Ok(root) = std::env::var("ATELIER_ROOT_PAGE") {
            self.site.root_page = root;
        }

        if let Ok(val) = std::env::var("ATELIER_HISTORY_LIMIT") {
            if let Ok(limit) = val.parse::<usize>() {
                self.history.limit = Some(limit).filter(|l| *l > 0);
            }
        }

        if let Ok(val) = std::env::var("ATELIER_ALLOWED_ORIGINS") {
            self.preview.allowed_origins = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(val) = std::env::var("ATELIER_RENDER_DEBOUNCE_MS") {
            if let Ok(ms) = val.parse::<u64>() {
                self.preview.render_debounce_ms = ms;
            }
        }

        if let Ok(url) = std::env::var("ATELIER_COLLABORATOR_URL") {
            self.collaborators.base_url = Some(url).filter(|u| !u.trim().is_empty());
        }

        if let Ok(filter) = std::env::var("ATELIER_LOG") {
            self.logging.filter = Some(filter);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from atelier.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}
