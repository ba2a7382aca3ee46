use super::rule::{Rule, RuleCategory, RuleState};
use crate::context::DocumentContext;
use crate::error::ApplyError;
use crate::schema::{enum_param, range_param, ParamMap, RuleConfigSchema};
use crate::types::{lengths_match, RuleResult, Section};
use tracing::debug;

/// Named paper sizes as (width, height) in cm.
pub const PAPER_SIZES: &[(&str, f64, f64)] = &[
    ("a4", 21.0, 29.7),
    ("letter", 21.6, 27.9),
    ("a3", 29.7, 42.0),
    ("b5", 17.6, 25.0),
];

pub fn paper_size(name: &str) -> Option<(f64, f64)> {
    PAPER_SIZES
        .iter()
        .find(|(id, _, _)| *id == name)
        .map(|(_, width, height)| (*width, *height))
}

pub struct PageLayoutRule {
    state: RuleState,
}

impl PageLayoutRule {
    pub const ID: &'static str = "PageLayoutRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            enum_param(
                "page_size",
                "Paper size",
                &[
                    ("a4", "A4 (21.0 x 29.7 cm)"),
                    ("letter", "Letter (21.6 x 27.9 cm)"),
                    ("a3", "A3 (29.7 x 42.0 cm)"),
                    ("b5", "B5 (17.6 x 25.0 cm)"),
                    ("custom", "Custom"),
                ],
                Some("a4"),
                "Paper size; custom uses the width and height below",
            ),
            range_param("page_width_cm", "Page width", 21.0, 10.0, 50.0, 0.1, "cm", "Page width for custom paper"),
            range_param("page_height_cm", "Page height", 29.7, 10.0, 100.0, 0.1, "cm", "Page height for custom paper"),
            range_param("page_margin_top_cm", "Top margin", 2.54, 0.5, 5.0, 0.1, "cm", "Top page margin"),
            range_param("page_margin_bottom_cm", "Bottom margin", 2.54, 0.5, 5.0, 0.1, "cm", "Bottom page margin"),
            range_param("page_margin_left_cm", "Left margin", 2.54, 0.5, 5.0, 0.1, "cm", "Left page margin"),
            range_param("page_margin_right_cm", "Right margin", 2.54, 0.5, 5.0, 0.1, "cm", "Right page margin"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Page layout",
                "Sets paper size and margins of every section",
                RuleCategory::Page,
                Self::schema(),
                config,
            ),
        }
    }

    fn target_section(&self) -> Result<Section, ApplyError> {
        let (page_width_cm, page_height_cm) = match paper_size(self.state.str_param("page_size")?) {
            Some(size) => size,
            None => (
                self.state.f64_param("page_width_cm")?,
                self.state.f64_param("page_height_cm")?,
            ),
        };
        Ok(Section {
            page_width_cm,
            page_height_cm,
            margin_top_cm: self.state.f64_param("page_margin_top_cm")?,
            margin_bottom_cm: self.state.f64_param("page_margin_bottom_cm")?,
            margin_left_cm: self.state.f64_param("page_margin_left_cm")?,
            margin_right_cm: self.state.f64_param("page_margin_right_cm")?,
        })
    }
}

fn same_geometry(a: &Section, b: &Section) -> bool {
    [
        (a.page_width_cm, b.page_width_cm),
        (a.page_height_cm, b.page_height_cm),
        (a.margin_top_cm, b.margin_top_cm),
        (a.margin_bottom_cm, b.margin_bottom_cm),
        (a.margin_left_cm, b.margin_left_cm),
        (a.margin_right_cm, b.margin_right_cm),
    ]
    .iter()
    .all(|(current, target)| lengths_match(Some(*current), *target))
}

impl Rule for PageLayoutRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let target = self.target_section()?;

        let mut fixed_count = 0;
        for section in &mut context.document_mut().sections {
            if !same_geometry(section, &target) {
                *section = target.clone();
                fixed_count += 1;
            }
        }
        let available = context.refresh_available_width();
        debug!(available_width_cm = available, "page geometry applied");

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!(
                    "Page size: {:.1}cm x {:.1}cm",
                    target.page_width_cm, target.page_height_cm
                ),
                format!(
                    "Margins: top {:.1}cm, bottom {:.1}cm, left {:.1}cm, right {:.1}cm",
                    target.margin_top_cm,
                    target.margin_bottom_cm,
                    target.margin_left_cm,
                    target.margin_right_cm
                ),
                format!("Updated {fixed_count} sections"),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::context_with;
    use crate::types::Document;
    use serde_json::json;

    fn letter_document() -> Document {
        Document {
            sections: vec![
                Section {
                    page_width_cm: 21.6,
                    page_height_cm: 27.9,
                    ..Section::default()
                },
                Section::default(),
            ],
            ..Document::default()
        }
    }

    #[test]
    fn test_counts_only_changed_sections() {
        let rule = PageLayoutRule::new(None);
        let mut context = context_with(letter_document());
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 1);
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_geometry_change_refreshes_available_width() {
        let rule = PageLayoutRule::new(Some(
            json!({"page_size": "a3", "page_margin_left_cm": 3.0, "page_margin_right_cm": 2.0})
                .as_object()
                .cloned()
                .unwrap(),
        ));
        let mut context = context_with(letter_document());
        rule.apply(&mut context).unwrap();
        assert!((context.available_width_cm() - 24.7).abs() < 1e-9);
    }

    #[test]
    fn test_custom_size_uses_explicit_dimensions() {
        let rule = PageLayoutRule::new(Some(
            json!({"page_size": "custom", "page_width_cm": 30.0, "page_height_cm": 40.0})
                .as_object()
                .cloned()
                .unwrap(),
        ));
        let mut context = context_with(letter_document());
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 2);
        assert!(context
            .sections()
            .iter()
            .all(|s| s.page_width_cm == 30.0 && s.page_height_cm == 40.0));
    }
}
