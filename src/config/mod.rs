use crate::core::{StitchError, StitchResult};
use crate::di::ConfigProvider;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use stitch_core::{Lifetime, Severity};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "stitch.yaml";

/// What to do when a Singleton/Scoped instance captures a shorter lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    #[default]
    Warning,
    Error,
    Ignore,
}

impl MismatchPolicy {
    /// Severity to report with, `None` when the mismatch is ignored
    pub fn severity(self) -> Option<Severity> {
        match self {
            MismatchPolicy::Warning => Some(Severity::Warning),
            MismatchPolicy::Error => Some(Severity::Error),
            MismatchPolicy::Ignore => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Lifetime used for auto-bound concrete types
    #[serde(default)]
    pub default_lifetime: Lifetime,

    /// Resolve unbound concrete classes/structs to themselves
    #[serde(default = "default_true")]
    pub auto_bind: bool,

    /// Guard Singleton/Scoped initialization and Lazy values in persistent
    /// blocks against concurrent first access
    #[serde(default = "default_true")]
    pub thread_safe: bool,

    /// Report informational diagnostics (e.g. shadowed bindings)
    #[serde(default)]
    pub verbose: bool,

    /// Prefix for persistent storage field names
    #[serde(default = "default_field_prefix")]
    pub field_prefix: String,

    /// Severity of lifetime mismatches
    /// - "warning": report and proceed (default)
    /// - "error": report as an error
    /// - "ignore": do not report
    #[serde(default)]
    pub lifetime_mismatch: MismatchPolicy,

    /// Include the dependency graph snapshot in `generate` output
    #[serde(default)]
    pub emit_graph: bool,
}

fn default_field_prefix() -> String {
    "_".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_lifetime: Lifetime::Transient,
            auto_bind: true,
            thread_safe: true,
            verbose: false,
            field_prefix: default_field_prefix(),
            lifetime_mismatch: MismatchPolicy::Warning,
            emit_graph: false,
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from `stitch.yaml` in the
    /// working directory. Falls back to defaults when no file exists.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(path: Option<&Path>) -> StitchResult<Self> {
        let config_path = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(StitchError::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => {
                let default_path = PathBuf::from(CONFIG_FILE);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        Self::load_from(&config_path)
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> StitchResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> StitchResult<Self> {
        // An empty file means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| StitchError::Config(format!("Failed to parse config: {}", e)))
    }
}

// Implement ConfigProvider trait
impl ConfigProvider for Config {
    fn default_lifetime(&self) -> Lifetime {
        self.default_lifetime
    }

    fn auto_bind(&self) -> bool {
        self.auto_bind
    }

    fn thread_safe(&self) -> bool {
        self.thread_safe
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn field_prefix(&self) -> &str {
        &self.field_prefix
    }

    fn lifetime_mismatch(&self) -> MismatchPolicy {
        self.lifetime_mismatch
    }

    fn emit_graph(&self) -> bool {
        self.emit_graph
    }
}
