use super::rule::Rule;
use super::{RuleRegistration, BUILTIN_RULES};
use crate::context::DocumentContext;
use crate::error::{DocumentLoadError, EngineError, InvocationError, ValidationError};
use crate::schema::ParamMap;
use crate::storage::{DocumentStore, JsonDocumentStore};
use crate::types::{
    ExecutionReport, RuleDescriptor, RuleInvocation, RuleResult, RunStatus, RunSummary,
};
use chrono::Utc;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Registry of rules plus the execution of runs against documents.
///
/// Construct one per process and pass it to whoever needs it.
pub struct RuleEngine {
    rules: IndexMap<String, Box<dyn Rule>>,
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleEngine {
    /// Engine holding every built-in rule, persisting through the JSON store.
    pub fn new() -> Result<Self, EngineError> {
        Self::from_registrations(BUILTIN_RULES, Arc::new(JsonDocumentStore))
    }

    /// Engine with no rules registered.
    pub fn empty() -> Self {
        Self {
            rules: IndexMap::new(),
            store: Arc::new(JsonDocumentStore),
        }
    }

    /// Populates the registry from a registration table.
    ///
    /// A constructor that fails is skipped with a warning. Duplicate ids in
    /// the table, or a constructor producing a rule under a different id,
    /// are errors.
    pub fn from_registrations(
        registrations: &[RuleRegistration],
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, EngineError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = registrations.iter().find(|r| !seen.insert(r.id)) {
            return Err(EngineError::DuplicateRule(duplicate.id.to_string()));
        }

        let mut engine = Self {
            rules: IndexMap::with_capacity(registrations.len()),
            store,
        };
        for registration in registrations {
            let rule = match (registration.construct)(None) {
                Ok(rule) => rule,
                Err(e) => {
                    warn!(rule_id = registration.id, error = %e, "skipping rule that failed to construct");
                    continue;
                }
            };
            if rule.id() != registration.id {
                return Err(EngineError::RegistrationMismatch {
                    registered: registration.id.to_string(),
                    constructed: rule.id().to_string(),
                });
            }
            engine.rules.insert(registration.id.to_string(), rule);
        }
        info!(count = engine.rules.len(), "rule registry ready");
        Ok(engine)
    }

    /// Replaces the document store used by later runs.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    /// Registers `rule`, replacing any entry with the same id in place.
    /// Returns the replaced rule.
    pub fn register(&mut self, rule: Box<dyn Rule>) -> Option<Box<dyn Rule>> {
        let id = rule.id().to_string();
        let previous = self.rules.insert(id.clone(), rule);
        if previous.is_some() {
            debug!(rule_id = %id, "rule re-registered");
        }
        previous
    }

    pub fn rule(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.get(id).map(|rule| rule.as_ref())
    }

    pub fn rule_mut(&mut self, id: &str) -> Option<&mut (dyn Rule + 'static)> {
        self.rules.get_mut(id).map(|rule| rule.as_mut())
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn list_rules(&self) -> Vec<RuleDescriptor> {
        self.rules.values().map(|rule| rule.metadata()).collect()
    }

    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<(), EngineError> {
        let rule = self
            .rule_mut(id)
            .ok_or_else(|| EngineError::UnknownRule(id.to_string()))?;
        rule.state_mut().enabled = enabled;
        Ok(())
    }

    /// Checks `params` merged over the rule's live configuration. Never mutates.
    pub fn validate_config(
        &self,
        id: &str,
        params: &ParamMap,
    ) -> Result<Vec<ValidationError>, EngineError> {
        let rule = self
            .rule(id)
            .ok_or_else(|| EngineError::UnknownRule(id.to_string()))?;
        Ok(rule.state().check(params))
    }

    /// Merges and validates; the rule keeps its previous configuration when
    /// errors are returned.
    pub fn update_config(
        &mut self,
        id: &str,
        params: ParamMap,
    ) -> Result<Vec<ValidationError>, EngineError> {
        let rule = self
            .rule_mut(id)
            .ok_or_else(|| EngineError::UnknownRule(id.to_string()))?;
        Ok(rule.update_config(params))
    }

    /// Runs `invocations` in order against the document at `path`, or every
    /// enabled rule in registry order when `invocations` is `None`, then
    /// saves the document back to `path`.
    ///
    /// Only a document that cannot be opened is an error; rule failures and
    /// save failures are reported inside the returned report.
    pub fn execute_rules(
        &mut self,
        path: &Path,
        invocations: Option<&[RuleInvocation]>,
    ) -> Result<ExecutionReport, DocumentLoadError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let timer = Instant::now();

        let mut context = DocumentContext::open(path, Arc::clone(&self.store)).map_err(|e| {
            error!(%run_id, error = %e, "failed to open document");
            e
        })?;

        let plan: Vec<RuleInvocation> = match invocations {
            Some(list) => list.to_vec(),
            None => self
                .rules
                .values()
                .filter(|rule| rule.enabled())
                .map(|rule| RuleInvocation::new(rule.id()))
                .collect(),
        };
        info!(%run_id, path = %path.display(), invocations = plan.len(), "run started");

        let mut results = Vec::with_capacity(plan.len());
        for invocation in &plan {
            let result = match self.invoke(invocation, &mut context) {
                Ok(result) => {
                    debug!(rule_id = %result.rule_id, fixed = result.fixed_count, "rule applied");
                    result
                }
                Err(e) => {
                    warn!(rule_id = %invocation.rule_id, error = %e, "rule invocation failed");
                    RuleResult::failure(&invocation.rule_id, e.to_string())
                }
            };
            results.push(result);
        }

        let total_fixed: usize = results
            .iter()
            .filter(|result| result.success)
            .map(|result| result.fixed_count)
            .sum();

        let (save_success, save_error, saved_to) = match context.save(None) {
            Ok(saved_to) => (true, None, saved_to),
            Err(e) => {
                error!(%run_id, error = %e, "failed to save document");
                (false, Some(e.to_string()), path.to_path_buf())
            }
        };

        let elapsed = timer.elapsed();
        info!(
            %run_id,
            total_fixed,
            save_success,
            elapsed_ms = elapsed.as_millis() as u64,
            "run finished"
        );

        Ok(ExecutionReport {
            run_id,
            started_at,
            status: if save_success {
                RunStatus::Success
            } else {
                RunStatus::Error
            },
            summary: RunSummary {
                total_fixed,
                time_taken: format!("{:.2}s", elapsed.as_secs_f64()),
            },
            elapsed_ms: elapsed.as_millis() as u64,
            results,
            save_success,
            saved_to,
            save_error,
        })
    }

    /// One invocation: params are merged into the live configuration without
    /// validation, then the rule is applied.
    fn invoke(
        &mut self,
        invocation: &RuleInvocation,
        context: &mut DocumentContext,
    ) -> Result<RuleResult, InvocationError> {
        let rule = self
            .rules
            .get_mut(&invocation.rule_id)
            .ok_or_else(|| InvocationError::UnknownRule(invocation.rule_id.clone()))?;
        if !invocation.params.is_empty() {
            rule.state_mut().merge(&invocation.params);
        }
        rule.apply(context).map_err(|source| InvocationError::Apply {
            rule_id: invocation.rule_id.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{FontColorRule, TitleBoldRule};
    use serde_json::json;

    fn failing(_: Option<ParamMap>) -> anyhow::Result<Box<dyn Rule>> {
        anyhow::bail!("font table unavailable")
    }

    #[test]
    fn test_builtin_registry_order() {
        let engine = RuleEngine::new().unwrap();
        assert_eq!(engine.len(), 13);
        let ids: Vec<_> = engine.rule_ids().collect();
        assert_eq!(ids.first(), Some(&"PageLayoutRule"));
        assert_eq!(ids.last(), Some(&"TableBordersRule"));
        let page = ids.iter().position(|id| *id == "PageLayoutRule");
        let width = ids.iter().position(|id| *id == "TableWidthRule");
        assert!(page < width);
    }

    #[test]
    fn test_failed_constructor_is_skipped() {
        let registrations = [
            RuleRegistration {
                id: "BrokenRule",
                construct: failing,
            },
            BUILTIN_RULES[0],
        ];
        let engine =
            RuleEngine::from_registrations(&registrations, Arc::new(JsonDocumentStore)).unwrap();
        assert_eq!(engine.rule_ids().collect::<Vec<_>>(), vec!["PageLayoutRule"]);
    }

    #[test]
    fn test_duplicate_and_mismatched_registrations_fail() {
        let duplicated = [BUILTIN_RULES[0], BUILTIN_RULES[0]];
        assert!(matches!(
            RuleEngine::from_registrations(&duplicated, Arc::new(JsonDocumentStore)),
            Err(EngineError::DuplicateRule(id)) if id == "PageLayoutRule"
        ));

        let mismatched = [RuleRegistration {
            id: "SomethingElse",
            construct: BUILTIN_RULES[0].construct,
        }];
        assert!(matches!(
            RuleEngine::from_registrations(&mismatched, Arc::new(JsonDocumentStore)),
            Err(EngineError::RegistrationMismatch { .. })
        ));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut engine = RuleEngine::empty();
        engine.register(Box::new(FontColorRule::new(None)));
        engine.register(Box::new(TitleBoldRule::new(None)));
        let replaced = engine.register(Box::new(FontColorRule::new(Some(
            json!({"text_color": "#FF0000"}).as_object().cloned().unwrap(),
        ))));
        assert!(replaced.is_some());
        assert_eq!(
            engine.rule_ids().collect::<Vec<_>>(),
            vec!["FontColorRule", "TitleBoldRule"]
        );
        assert_eq!(
            engine.rule("FontColorRule").unwrap().config()["text_color"],
            json!("#FF0000")
        );
    }

    #[test]
    fn test_validate_config_is_pure() {
        let engine = RuleEngine::new().unwrap();
        let bad = json!({"font_size_body": 100}).as_object().cloned().unwrap();
        let errors = engine.validate_config("FontSizeRule", &bad).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].param, "font_size_body");
        assert_eq!(
            engine.rule("FontSizeRule").unwrap().config()["font_size_body"],
            json!(12.0)
        );
        assert!(matches!(
            engine.validate_config("NoSuchRule", &bad),
            Err(EngineError::UnknownRule(_))
        ));
    }

    #[test]
    fn test_set_enabled_and_listing() {
        let mut engine = RuleEngine::new().unwrap();
        engine.set_enabled("TitleBoldRule", false).unwrap();
        let listing = engine.list_rules();
        let bold = listing.iter().find(|d| d.id == "TitleBoldRule").unwrap();
        assert!(!bold.enabled);
        assert!(bold.param_schema.is_some());
        let borders = listing.iter().find(|d| d.id == "TableBordersRule").unwrap();
        assert!(borders.param_schema.is_none());
        assert!(engine.set_enabled("Nope", true).is_err());
    }
}
