use crate::schema::ParamMap;
use crate::types::RuleInvocation;
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

const BUILTIN_PRESETS: &str = include_str!("../presets/builtin.yaml");

// Default value functions for serde
fn default_true() -> bool {
    true
}

/// Read-only view of a preset file.
///
/// `rule_defaults` holds per-rule parameters shared by every preset; each
/// preset lists its rules in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetCatalog {
    #[serde(default)]
    pub rule_defaults: IndexMap<String, ParamMap>,
    #[serde(default)]
    pub presets: IndexMap<String, Preset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Rule id → entry, in execution order
    #[serde(default)]
    pub rules: IndexMap<String, PresetRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRule {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub parameters: ParamMap,
}

impl PresetCatalog {
    /// Presets shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_PRESETS).context("built-in presets are malformed")
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let catalog: PresetCatalog = serde_yaml::from_str(content)?;
        Ok(catalog)
    }

    /// Load a catalog from a YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read preset file {}", path.display()))?;
        let catalog = Self::from_yaml(&content)
            .with_context(|| format!("failed to parse preset file {}", path.display()))?;
        debug!(path = %path.display(), presets = catalog.presets.len(), "preset file loaded");
        Ok(catalog)
    }

    /// Load from `path`, falling back to the built-in presets when it is
    /// absent or unreadable.
    pub fn load_with_fallback(path: Option<&Path>) -> Self {
        if let Some(path) = path {
            match Self::load_from_file(path) {
                Ok(catalog) => return catalog,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to load presets, using built-in presets");
                }
            }
        }
        Self::builtin().unwrap_or_else(|e| {
            warn!(error = %e, "built-in presets unavailable, using an empty catalog");
            Self::default()
        })
    }

    pub fn preset(&self, id: &str) -> Option<&Preset> {
        self.presets.get(id)
    }

    pub fn preset_ids(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }

    /// Flattens one preset into an ordered invocation list.
    ///
    /// Disabled entries are dropped. Each rule's shared defaults sit under
    /// the preset's own parameters, and a stray `enabled` key is removed.
    pub fn invocations_for(&self, preset_id: &str) -> Result<Vec<RuleInvocation>> {
        let preset = self
            .preset(preset_id)
            .ok_or_else(|| anyhow!("unknown preset `{preset_id}`"))?;

        let invocations = preset
            .rules
            .iter()
            .filter(|(_, entry)| entry.enabled)
            .map(|(rule_id, entry)| {
                let mut params = self.rule_defaults.get(rule_id).cloned().unwrap_or_default();
                for (name, value) in &entry.parameters {
                    params.insert(name.clone(), value.clone());
                }
                params.remove("enabled");
                RuleInvocation::with_params(rule_id, params)
            })
            .collect();
        Ok(invocations)
    }
}
