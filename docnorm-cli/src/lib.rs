// All rule logic lives in docnorm-core.
// This crate turns command-line arguments into engine calls.

use anyhow::{anyhow, bail, Context, Result};
use docnorm_core::{ParamMap, PresetCatalog, RuleInvocation};
use serde_json::Value;
use std::path::Path;

// Re-export core types for convenience
pub use docnorm_core::*;

/// Parses a JSON object given on the command line.
pub fn parse_params(raw: &str) -> Result<ParamMap> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("parameters are not valid JSON: {raw}"))?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("parameters must be a JSON object, got {other}"),
    }
}

/// Parses `RuleId` or `RuleId={"param": value}`.
pub fn parse_rule_arg(raw: &str) -> Result<RuleInvocation> {
    let (rule_id, params) = match raw.split_once('=') {
        Some((rule_id, params)) => (rule_id.trim(), parse_params(params)?),
        None => (raw.trim(), ParamMap::new()),
    };
    if rule_id.is_empty() {
        return Err(anyhow!("empty rule id in `{raw}`"));
    }
    Ok(RuleInvocation::with_params(rule_id, params))
}

/// Builds the invocation list of a run.
///
/// Preset entries come first, followed by explicit `--rule` arguments.
/// Returns `None` when neither was given so the engine runs every enabled
/// rule.
pub fn plan_invocations(
    preset_file: Option<&Path>,
    preset: Option<&str>,
    rules: &[String],
) -> Result<Option<Vec<RuleInvocation>>> {
    let mut invocations = Vec::new();

    if let Some(preset_id) = preset {
        let catalog = match preset_file {
            Some(path) => PresetCatalog::load_from_file(path)?,
            None => PresetCatalog::builtin()?,
        };
        invocations.extend(catalog.invocations_for(preset_id)?);
    } else if preset_file.is_some() {
        bail!("--preset-file needs --preset to pick a preset");
    }

    for raw in rules {
        invocations.push(parse_rule_arg(raw)?);
    }

    if preset.is_none() && rules.is_empty() {
        Ok(None)
    } else {
        Ok(Some(invocations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rule_arg_with_and_without_params() {
        let bare = parse_rule_arg("TitleBoldRule").unwrap();
        assert_eq!(bare.rule_id, "TitleBoldRule");
        assert!(bare.params.is_empty());

        let with = parse_rule_arg(r##"FontColorRule={"text_color": "#FF0000"}"##).unwrap();
        assert_eq!(with.rule_id, "FontColorRule");
        assert_eq!(with.params["text_color"], json!("#FF0000"));
    }

    #[test]
    fn test_parse_rule_arg_rejects_bad_input() {
        assert!(parse_rule_arg("=").is_err());
        assert!(parse_rule_arg("FontSizeRule={oops").is_err());
        assert!(parse_rule_arg("FontSizeRule=[1, 2]").is_err());
    }

    #[test]
    fn test_plan_defaults_to_engine_selection() {
        assert!(plan_invocations(None, None, &[]).unwrap().is_none());
    }

    #[test]
    fn test_plan_appends_rules_after_preset() {
        let plan = plan_invocations(None, Some("minimal"), &["TitleBoldRule".to_string()])
            .unwrap()
            .unwrap();
        let ids: Vec<_> = plan.iter().map(|i| i.rule_id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["HorizontalRuleRemovalRule", "FontColorRule", "TitleBoldRule"]
        );
    }

    #[test]
    fn test_preset_file_without_preset_is_rejected() {
        assert!(plan_invocations(Some(Path::new("presets.yaml")), None, &[]).is_err());
    }
}
