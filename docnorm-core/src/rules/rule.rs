use crate::context::DocumentContext;
use crate::error::{ApplyError, ValidationError};
use crate::schema::{ParamMap, RuleConfigSchema};
use crate::types::{RgbColor, RuleDescriptor, RuleResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Font,
    Paragraph,
    Table,
    Page,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Font => "font",
            Self::Paragraph => "paragraph",
            Self::Table => "table",
            Self::Page => "page",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity, metadata and live configuration of one rule instance.
///
/// Every rule owns one of these. The configuration always holds every
/// declared parameter: overrides are merged on top of the schema defaults,
/// or on top of literal defaults for rules without a schema.
#[derive(Debug, Clone)]
pub struct RuleState {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: RuleCategory,
    pub enabled: bool,
    schema: Option<RuleConfigSchema>,
    params: ParamMap,
}

impl RuleState {
    pub fn with_schema(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        category: RuleCategory,
        schema: RuleConfigSchema,
        overrides: Option<ParamMap>,
    ) -> Self {
        let params = schema.defaults();
        let mut state = Self {
            id,
            name,
            description,
            category,
            enabled: true,
            schema: Some(schema),
            params,
        };
        if let Some(overrides) = overrides {
            state.merge(&overrides);
        }
        state
    }

    pub fn with_defaults(
        id: &'static str,
        name: &'static str,
        description: &'static str,
        category: RuleCategory,
        defaults: ParamMap,
        overrides: Option<ParamMap>,
    ) -> Self {
        let mut state = Self {
            id,
            name,
            description,
            category,
            enabled: true,
            schema: None,
            params: defaults,
        };
        if let Some(overrides) = overrides {
            state.merge(&overrides);
        }
        state
    }

    pub fn schema(&self) -> Option<&RuleConfigSchema> {
        self.schema.as_ref()
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Overlays `overrides` onto the live configuration without validating.
    pub fn merge(&mut self, overrides: &ParamMap) {
        for (name, value) in overrides {
            self.params.insert(name.clone(), value.clone());
        }
    }

    /// Validates `overrides` merged over the live configuration. Never mutates.
    pub fn check(&self, overrides: &ParamMap) -> Vec<ValidationError> {
        let Some(schema) = &self.schema else {
            return Vec::new();
        };
        let mut candidate = self.params.clone();
        for (name, value) in overrides {
            candidate.insert(name.clone(), value.clone());
        }
        schema.validate(&candidate)
    }

    /// Merges and validates; restores the previous configuration on failure.
    pub fn update(&mut self, overrides: ParamMap) -> Vec<ValidationError> {
        let previous = self.params.clone();
        self.merge(&overrides);
        let errors = match &self.schema {
            Some(schema) => schema.validate(&self.params),
            None => Vec::new(),
        };
        if !errors.is_empty() {
            self.params = previous;
        }
        errors
    }

    pub fn describe(&self) -> RuleDescriptor {
        RuleDescriptor {
            id: self.id.to_string(),
            name: self.name.to_string(),
            description: self.description.to_string(),
            category: self.category.to_string(),
            enabled: self.enabled,
            params: self.params.clone(),
            param_schema: self.schema.as_ref().map(RuleConfigSchema::to_ui_schema),
        }
    }

    // ============== Typed parameter access ==============

    fn value(&self, name: &str) -> Result<&Value, ApplyError> {
        match self.params.get(name) {
            Some(Value::Null) | None => Err(ApplyError::MissingParam(name.to_string())),
            Some(value) => Ok(value),
        }
    }

    pub fn f64_param(&self, name: &str) -> Result<f64, ApplyError> {
        let value = self.value(name)?;
        value.as_f64().ok_or_else(|| invalid(name, "a number", value))
    }

    pub fn bool_param(&self, name: &str) -> Result<bool, ApplyError> {
        let value = self.value(name)?;
        value.as_bool().ok_or_else(|| invalid(name, "a boolean", value))
    }

    pub fn str_param(&self, name: &str) -> Result<&str, ApplyError> {
        let value = self.value(name)?;
        value.as_str().ok_or_else(|| invalid(name, "a string", value))
    }

    /// String parameter that may be absent, null or blank.
    pub fn optional_str_param(&self, name: &str) -> Result<Option<&str>, ApplyError> {
        match self.params.get(name) {
            Some(Value::Null) | None => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(invalid(name, "a string", other)),
        }
    }

    pub fn color_param(&self, name: &str) -> Result<RgbColor, ApplyError> {
        let value = self.value(name)?;
        value
            .as_str()
            .and_then(RgbColor::parse)
            .ok_or_else(|| invalid(name, "a colour like #RRGGBB", value))
    }

    pub fn u32_param(&self, name: &str) -> Result<u32, ApplyError> {
        let value = self.value(name)?;
        value
            .as_f64()
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64)
            .map(|n| n as u32)
            .ok_or_else(|| invalid(name, "a non-negative integer", value))
    }
}

fn invalid(name: &str, expected: &'static str, found: &Value) -> ApplyError {
    ApplyError::InvalidParam {
        name: name.to_string(),
        expected,
        found: found.to_string(),
    }
}

/// A document transformation.
///
/// `apply` must be idempotent on an already-conforming document: it compares
/// each current value against its target before counting it as fixed.
pub trait Rule: Send + Sync {
    fn state(&self) -> &RuleState;
    fn state_mut(&mut self) -> &mut RuleState;
    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError>;

    fn id(&self) -> &str {
        self.state().id
    }

    fn enabled(&self) -> bool {
        self.state().enabled
    }

    fn config(&self) -> &ParamMap {
        self.state().params()
    }

    fn metadata(&self) -> RuleDescriptor {
        self.state().describe()
    }

    fn update_config(&mut self, overrides: ParamMap) -> Vec<ValidationError> {
        self.state_mut().update(overrides)
    }
}

/// Assigns `target` to `slot` unless it already holds it. Returns whether it changed.
pub(crate) fn assign<T: PartialEq>(slot: &mut T, target: T) -> bool {
    if *slot == target {
        return false;
    }
    *slot = target;
    true
}

pub(crate) use crate::types::assign_length;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{bool_param, range_param};
    use serde_json::json;

    fn schema_state() -> RuleState {
        RuleState::with_schema(
            "SampleRule",
            "Sample",
            "",
            RuleCategory::Paragraph,
            RuleConfigSchema::new(vec![
                range_param("indent", "Indent", 1.0, 0.0, 5.0, 0.1, "cm", ""),
                bool_param("bold", "Bold", true, ""),
            ]),
            None,
        )
    }

    fn params(value: Value) -> ParamMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_construction_yields_schema_defaults() {
        let state = schema_state();
        assert_eq!(state.params(), &state.schema().unwrap().defaults());
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let state = RuleState::with_schema(
            "SampleRule",
            "Sample",
            "",
            RuleCategory::Paragraph,
            RuleConfigSchema::new(vec![bool_param("bold", "Bold", true, "")]),
            Some(params(json!({"bold": false, "extra": 1}))),
        );
        assert_eq!(state.params()["bold"], json!(false));
        assert_eq!(state.params()["extra"], json!(1));
    }

    #[test]
    fn test_update_rolls_back_on_bound_violation() {
        let mut state = schema_state();
        let before = state.params().clone();
        let errors = state.update(params(json!({"indent": 9.0, "bold": false})));
        assert_eq!(errors.len(), 1);
        assert_eq!(state.params(), &before);

        assert!(state.update(params(json!({"indent": 2.5}))).is_empty());
        assert_eq!(state.params()["indent"], json!(2.5));
    }

    #[test]
    fn test_literal_defaults_never_fail_validation() {
        let mut state = RuleState::with_defaults(
            "LiteralRule",
            "Literal",
            "",
            RuleCategory::Table,
            params(json!({"border_size": 4})),
            None,
        );
        assert!(state.update(params(json!({"border_size": -1}))).is_empty());
        assert_eq!(state.params()["border_size"], json!(-1));
        assert!(state.describe().param_schema.is_none());
    }

    #[test]
    fn test_typed_getters_report_problems() {
        let mut state = schema_state();
        state.merge(&params(json!({"indent": "wide", "bold": null})));
        assert!(matches!(
            state.f64_param("indent"),
            Err(ApplyError::InvalidParam { .. })
        ));
        assert!(matches!(state.bool_param("bold"), Err(ApplyError::MissingParam(_))));
        assert_eq!(state.optional_str_param("absent").unwrap(), None);
    }
}
