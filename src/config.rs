//! Analysis configuration: which analyses run, which pointer-analysis
//! context discipline they run under, and where to find a taint-rule
//! file. Grounded on the teacher's `Config`/TOML-loading pattern
//! (`smarthunt::engine::config::Config`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which [`crate::pta::context::ContextSelector`] the pointer analysis
/// runs under (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextSensitivity {
    Insensitive,
    CallSite1,
    CallSite2,
    Object1,
    Object2,
}

impl Default for ContextSensitivity {
    fn default() -> Self {
        ContextSensitivity::Insensitive
    }
}

/// Main configuration for a flowengine run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Fully-qualified name (`Class.method(paramTypes)`) of the analysis
    /// entry point.
    pub entry_method: String,

    /// Run interprocedural constant propagation (spec §4.4).
    #[serde(default = "default_true")]
    pub enable_const_propagation: bool,

    /// Run the pointer analysis and on-the-fly call-graph construction
    /// (spec §4.5-4.7). When `false`, the call graph is CHA-only.
    #[serde(default = "default_true")]
    pub enable_pointer_analysis: bool,

    /// Run dead-code detection (spec §4.9). Depends on constant
    /// propagation having run first.
    #[serde(default = "default_true")]
    pub enable_dead_code: bool,

    /// Run the taint-tracking overlay (spec §6). Requires
    /// `taint_rules_file` when enabled.
    #[serde(default)]
    pub enable_taint_tracking: bool,

    /// Pointer-analysis context discipline.
    #[serde(default)]
    pub context_sensitivity: ContextSensitivity,

    /// Path to a JSON file describing taint sources/sinks/transfers.
    #[serde(default)]
    pub taint_rules_file: Option<PathBuf>,

    /// Path to write the JSON report to; stdout when unset.
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entry_method: String::new(),
            enable_const_propagation: true,
            enable_pointer_analysis: true,
            enable_dead_code: true,
            enable_taint_tracking: false,
            context_sensitivity: ContextSensitivity::default(),
            taint_rules_file: None,
            output_file: None,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates cross-field constraints a plain `Deserialize` can't
    /// express (a dead-code pass needs const propagation's results; a
    /// taint pass needs a rules file).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_method.trim().is_empty() {
            return Err(ConfigError::UnresolvableMethod("entry_method is empty".into()));
        }
        if self.enable_dead_code && !self.enable_const_propagation {
            return Err(ConfigError::UnknownAnalysis(
                "enable_dead_code requires enable_const_propagation".into(),
            ));
        }
        if self.enable_taint_tracking && self.taint_rules_file.is_none() {
            return Err(ConfigError::UnknownAnalysis(
                "enable_taint_tracking requires taint_rules_file".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_the_core_pipeline_but_not_taint() {
        let cfg = Config::default();
        assert!(cfg.enable_const_propagation);
        assert!(cfg.enable_pointer_analysis);
        assert!(cfg.enable_dead_code);
        assert!(!cfg.enable_taint_tracking);
        assert_eq!(cfg.context_sensitivity, ContextSensitivity::Insensitive);
    }

    #[test]
    fn round_trips_through_toml() {
        let toml_src = r#"
            entry_method = "Main.main()"
            context_sensitivity = "object-1"
            enable_taint_tracking = true
            taint_rules_file = "rules.json"
        "#;
        let cfg = Config::from_toml(toml_src).unwrap();
        assert_eq!(cfg.entry_method, "Main.main()");
        assert_eq!(cfg.context_sensitivity, ContextSensitivity::Object1);
        assert!(cfg.enable_taint_tracking);
    }

    #[test]
    fn taint_without_rules_file_fails_validation() {
        let mut cfg = Config::default();
        cfg.entry_method = "Main.main()".into();
        cfg.enable_taint_tracking = true;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn dead_code_without_const_prop_fails_validation() {
        let mut cfg = Config::default();
        cfg.entry_method = "Main.main()".into();
        cfg.enable_const_propagation = false;
        assert!(cfg.validate().is_err());
    }
}
