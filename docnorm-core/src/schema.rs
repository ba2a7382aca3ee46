//! Declarative parameter schemas shared between rules and their callers.
//!
//! A [`RuleConfigSchema`] is an ordered list of [`ParamSpec`]s. It yields the
//! default configuration of a rule, a UI-renderable description of every
//! option, and validates caller-supplied configurations without mutating them.

use crate::error::{ValidationError, ValidationErrorKind};
use crate::types::RgbColor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rule configuration: parameter name → value.
pub type ParamMap = serde_json::Map<String, Value>;

/// Declared kind of a parameter. Decides which input control a front end renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
    Enum,
    Color,
    Font,
    Range,
}

impl ParamKind {
    fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Integer | Self::Range)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamOption {
    pub value: Value,
    pub label: String,
}

impl ParamOption {
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: Value::from(value),
            label: label.to_string(),
        }
    }
}

/// One configurable option of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub display_name: String,
    #[serde(rename = "param_type")]
    pub kind: ParamKind,
    pub default: Option<Value>,
    pub description: String,
    #[serde(rename = "min_value", default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(rename = "max_value", default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ParamOption>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ParamSpec {
    pub fn new(name: &str, display_name: &str, kind: ParamKind) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
            default: None,
            description: String::new(),
            min: None,
            max: None,
            step: None,
            options: None,
            placeholder: None,
            unit: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_unit(mut self, unit: &str) -> Self {
        if !unit.is_empty() {
            self.unit = Some(unit.to_string());
        }
        self
    }

    pub fn with_options(mut self, options: Vec<ParamOption>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Checks one value against this spec. `None` and `null` count as absent.
    pub fn check(&self, value: Option<&Value>) -> Vec<ValidationError> {
        let value = match value {
            Some(Value::Null) | None => {
                return match self.default {
                    Some(Value::Null) | None => {
                        vec![ValidationError::new(&self.name, ValidationErrorKind::Required)]
                    }
                    Some(_) => Vec::new(),
                };
            }
            Some(value) => value,
        };

        let mut errors = Vec::new();
        if let Some(expected) = self.type_mismatch(value) {
            errors.push(ValidationError::new(
                &self.name,
                ValidationErrorKind::WrongType { expected },
            ));
            return errors;
        }

        if self.kind.is_numeric() {
            if let Some(number) = value.as_f64() {
                if let Some(min) = self.min.filter(|min| number < *min) {
                    errors.push(ValidationError::new(
                        &self.name,
                        ValidationErrorKind::BelowMinimum { value: number, min },
                    ));
                }
                if let Some(max) = self.max.filter(|max| number > *max) {
                    errors.push(ValidationError::new(
                        &self.name,
                        ValidationErrorKind::AboveMaximum { value: number, max },
                    ));
                }
            }
        }

        if self.kind == ParamKind::Enum {
            if let Some(options) = &self.options {
                if !options.iter().any(|option| &option.value == value) {
                    errors.push(ValidationError::new(
                        &self.name,
                        ValidationErrorKind::NotAChoice {
                            value: display_value(value),
                            choices: options.iter().map(|o| display_value(&o.value)).collect(),
                        },
                    ));
                }
            }
        }

        errors
    }

    fn type_mismatch(&self, value: &Value) -> Option<&'static str> {
        match self.kind {
            ParamKind::Number | ParamKind::Range if !value.is_number() => Some("a number"),
            ParamKind::Integer
                if !(value.is_i64() || value.is_u64()
                    || value.as_f64().is_some_and(|n| n.fract() == 0.0)) =>
            {
                Some("an integer")
            }
            ParamKind::Boolean if !value.is_boolean() => Some("a boolean"),
            ParamKind::String | ParamKind::Font if !value.is_string() => Some("a string"),
            ParamKind::Color if value.as_str().and_then(RgbColor::parse).is_none() => {
                Some("a colour like #RRGGBB")
            }
            _ => None,
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Ordered set of parameter specs for one rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleConfigSchema {
    pub params: Vec<ParamSpec>,
}

impl RuleConfigSchema {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        let schema = Self { params };
        debug_assert!(
            schema.duplicate_name().is_none(),
            "duplicate parameter name in schema: {:?}",
            schema.duplicate_name()
        );
        schema
    }

    pub fn spec(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }

    /// First parameter name declared twice, if any.
    pub fn duplicate_name(&self) -> Option<&str> {
        self.params.iter().enumerate().find_map(|(index, param)| {
            self.params[..index]
                .iter()
                .any(|earlier| earlier.name == param.name)
                .then_some(param.name.as_str())
        })
    }

    /// Every declared name mapped to its default (`null` when none is declared).
    pub fn defaults(&self) -> ParamMap {
        self.params
            .iter()
            .map(|param| (param.name.clone(), param.default.clone().unwrap_or(Value::Null)))
            .collect()
    }

    pub fn to_ui_schema(&self) -> Vec<Value> {
        self.params
            .iter()
            .filter_map(|param| serde_json::to_value(param).ok())
            .collect()
    }

    /// Validates a full configuration. Never mutates.
    pub fn validate(&self, config: &ParamMap) -> Vec<ValidationError> {
        self.params
            .iter()
            .flat_map(|param| param.check(config.get(&param.name)))
            .collect()
    }
}

// ============== Parameter factories ==============

pub fn font_param(name: &str, display_name: &str, default: &str, description: &str) -> ParamSpec {
    let fonts = [
        "宋体",
        "黑体",
        "楷体",
        "仿宋",
        "微软雅黑",
        "Arial",
        "Times New Roman",
    ];
    ParamSpec::new(name, display_name, ParamKind::Font)
        .with_default(default)
        .describe(description)
        .with_options(fonts.iter().map(|font| ParamOption::new(font, font)).collect())
}

#[allow(clippy::too_many_arguments)]
pub fn size_param(
    name: &str,
    display_name: &str,
    default: f64,
    min: f64,
    max: f64,
    step: f64,
    description: &str,
) -> ParamSpec {
    ParamSpec::new(name, display_name, ParamKind::Range)
        .with_default(default)
        .with_bounds(min, max)
        .with_step(step)
        .with_unit("pt")
        .describe(description)
}

pub fn color_param(name: &str, display_name: &str, default: &str, description: &str) -> ParamSpec {
    ParamSpec::new(name, display_name, ParamKind::Color)
        .with_default(default)
        .describe(description)
}

pub fn bool_param(name: &str, display_name: &str, default: bool, description: &str) -> ParamSpec {
    ParamSpec::new(name, display_name, ParamKind::Boolean)
        .with_default(default)
        .describe(description)
}

/// Enumeration parameter. Defaults to the first option when `default` is `None`.
pub fn enum_param(
    name: &str,
    display_name: &str,
    options: &[(&str, &str)],
    default: Option<&str>,
    description: &str,
) -> ParamSpec {
    let spec = ParamSpec::new(name, display_name, ParamKind::Enum)
        .with_options(
            options
                .iter()
                .map(|(value, label)| ParamOption::new(value, label))
                .collect(),
        )
        .describe(description);
    match default.or_else(|| options.first().map(|(value, _)| *value)) {
        Some(default) => spec.with_default(default),
        None => spec,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn range_param(
    name: &str,
    display_name: &str,
    default: f64,
    min: f64,
    max: f64,
    step: f64,
    unit: &str,
    description: &str,
) -> ParamSpec {
    ParamSpec::new(name, display_name, ParamKind::Range)
        .with_default(default)
        .with_bounds(min, max)
        .with_step(step)
        .with_unit(unit)
        .describe(description)
}

pub fn string_param(name: &str, display_name: &str, default: &str, description: &str) -> ParamSpec {
    ParamSpec::new(name, display_name, ParamKind::String)
        .with_default(default)
        .describe(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            range_param("width", "Width", 95.0, 50.0, 100.0, 5.0, "%", "Table width"),
            enum_param(
                "align",
                "Alignment",
                &[("center", "Center"), ("left", "Left")],
                None,
                "",
            ),
            ParamSpec::new("label", "Label", ParamKind::String),
        ])
    }

    #[test]
    fn test_defaults_cover_every_param() {
        let defaults = sample_schema().defaults();
        assert_eq!(defaults.len(), 3);
        assert_eq!(defaults["width"], json!(95.0));
        assert_eq!(defaults["align"], json!("center"));
        assert_eq!(defaults["label"], Value::Null);
    }

    #[test]
    fn test_ui_schema_omits_unset_fields() {
        let ui = sample_schema().to_ui_schema();
        assert_eq!(ui[0]["param_type"], json!("range"));
        assert_eq!(ui[0]["min_value"], json!(50.0));
        assert_eq!(ui[0]["unit"], json!("%"));
        assert!(ui[2].get("min_value").is_none());
        assert!(ui[2].get("options").is_none());
        assert_eq!(ui[2]["default"], Value::Null);
    }

    #[test]
    fn test_missing_value_without_default_is_required() {
        let schema = sample_schema();
        let mut config = schema.defaults();
        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].param, "label");
        assert_eq!(errors[0].kind, ValidationErrorKind::Required);

        config.insert("label".into(), json!("caption"));
        assert!(schema.validate(&config).is_empty());
    }

    #[test]
    fn test_bounds_are_checked() {
        let schema = sample_schema();
        let mut config = schema.defaults();
        config.insert("label".into(), json!("x"));
        config.insert("width".into(), json!(120));
        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ValidationErrorKind::AboveMaximum { .. }));

        config.insert("width".into(), json!(10));
        let errors = schema.validate(&config);
        assert!(matches!(errors[0].kind, ValidationErrorKind::BelowMinimum { .. }));
    }

    #[test]
    fn test_enum_value_must_be_a_choice() {
        let schema = sample_schema();
        let mut config = schema.defaults();
        config.insert("label".into(), json!("x"));
        config.insert("align".into(), json!("diagonal"));
        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "align: `diagonal` is not one of [center, left]");
    }

    #[test]
    fn test_wrong_type_reported_once() {
        let schema = sample_schema();
        let mut config = schema.defaults();
        config.insert("label".into(), json!("x"));
        config.insert("width".into(), json!("wide"));
        let errors = schema.validate(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].kind,
            ValidationErrorKind::WrongType { expected: "a number" }
        );
    }

    #[test]
    fn test_validate_does_not_mutate() {
        let schema = sample_schema();
        let config = schema.defaults();
        let before = config.clone();
        let _ = schema.validate(&config);
        assert_eq!(config, before);
    }

    #[test]
    fn test_colour_params_are_parsed() {
        let spec = color_param("color", "Color", "#000000", "");
        assert!(spec.check(Some(&json!("#1A2B3C"))).is_empty());
        assert_eq!(spec.check(Some(&json!("red"))).len(), 1);
    }

    #[test]
    fn test_duplicate_name_detection() {
        let schema = RuleConfigSchema {
            params: vec![
                bool_param("bold", "Bold", true, ""),
                bool_param("bold", "Bold again", false, ""),
            ],
        };
        assert_eq!(schema.duplicate_name(), Some("bold"));
        assert_eq!(sample_schema().duplicate_name(), None);
    }
}
