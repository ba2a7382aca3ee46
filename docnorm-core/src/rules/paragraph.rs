use super::rule::{assign, assign_length, Rule, RuleCategory, RuleState};
use crate::classifier::{classify_line, indent_level_for, MarkerKind};
use crate::context::DocumentContext;
use crate::error::ApplyError;
use crate::schema::{
    bool_param, color_param, enum_param, font_param, range_param, size_param, ParamMap,
    RuleConfigSchema,
};
use crate::types::{
    Alignment, IndentLevel, ListItem, ListKind, ParagraphScope, RuleResult, CM_PER_PT,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;

const ALIGNMENT_CHOICES: &[(&str, &str)] = &[
    ("center", "Center"),
    ("left", "Left"),
    ("right", "Right"),
    ("justify", "Justify"),
];

pub struct ParagraphSpacingRule {
    state: RuleState,
}

impl ParagraphSpacingRule {
    pub const ID: &'static str = "ParagraphSpacingRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            range_param("body_left_indent", "Body left indent", 0.0, 0.0, 5.0, 0.1, "cm", "Left indent of body paragraphs"),
            range_param("body_right_indent", "Body right indent", 0.0, 0.0, 5.0, 0.1, "cm", "Right indent of body paragraphs"),
            range_param("body_space_before", "Space before", 0.0, 0.0, 2.0, 0.1, "cm", "Space above body paragraphs"),
            range_param("body_space_after", "Space after", 0.33, 0.0, 2.0, 0.01, "cm", "Space below body paragraphs"),
            range_param("body_line_spacing", "Line spacing", 1.5, 1.0, 3.0, 0.1, "x", "Line spacing multiple of body paragraphs"),
            range_param("table_left_indent", "Table left indent", 0.2, 0.0, 2.0, 0.1, "cm", "Left indent of paragraphs in table cells"),
            range_param("table_right_indent", "Table right indent", 0.2, 0.0, 2.0, 0.1, "cm", "Right indent of paragraphs in table cells"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Paragraph spacing",
                "Unifies indents, spacing and line spacing of body and table paragraphs",
                RuleCategory::Paragraph,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for ParagraphSpacingRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let left = self.state.f64_param("body_left_indent")?;
        let right = self.state.f64_param("body_right_indent")?;
        let before = self.state.f64_param("body_space_before")?;
        let after = self.state.f64_param("body_space_after")?;
        let line_spacing = self.state.f64_param("body_line_spacing")?;
        let table_left = self.state.f64_param("table_left_indent")?;
        let table_right = self.state.f64_param("table_right_indent")?;

        let mut fixed_count = 0;
        context.document_mut().for_each_paragraph_mut(|paragraph, scope| {
            let format = &mut paragraph.format;
            let changed = match scope {
                ParagraphScope::Body if paragraph.style.starts_with("Heading") => false,
                // List items keep the indentation ListNumberingRule gave them.
                ParagraphScope::Body if paragraph.list.is_some() => false,
                ParagraphScope::Body => {
                    // Non-short-circuiting: every field is written.
                    assign_length(&mut format.left_indent_cm, left)
                        | assign_length(&mut format.right_indent_cm, right)
                        | assign_length(&mut format.space_before_cm, before)
                        | assign_length(&mut format.space_after_cm, after)
                        | assign_length(&mut format.line_spacing, line_spacing)
                }
                ParagraphScope::TableCell => {
                    assign_length(&mut format.left_indent_cm, table_left)
                        | assign_length(&mut format.right_indent_cm, table_right)
                }
            };
            if changed {
                fixed_count += 1;
            }
        });

        let details = if fixed_count > 0 {
            vec![
                format!("Unified spacing and indents of {fixed_count} paragraphs"),
                format!("Line spacing: {line_spacing}x"),
            ]
        } else {
            vec!["No paragraph needed spacing changes".to_string()]
        };
        Ok(RuleResult::success(self.state.id, fixed_count, details))
    }
}

pub struct TitleBoldRule {
    state: RuleState,
}

impl TitleBoldRule {
    pub const ID: &'static str = "TitleBoldRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![bool_param(
            "bold",
            "Bold headings",
            true,
            "Headings are rendered bold when on",
        )])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Heading weight",
                "Turns bold on or off for every heading",
                RuleCategory::Paragraph,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for TitleBoldRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let bold = self.state.bool_param("bold")?;

        let mut fixed_count = 0;
        for paragraph in context.document_mut().paragraphs_mut() {
            if !paragraph.is_heading() {
                continue;
            }
            for run in &mut paragraph.runs {
                if assign(&mut run.font.bold, Some(bold)) {
                    fixed_count += 1;
                }
            }
        }

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Headings bold: {bold}"),
                format!("Updated {fixed_count} heading runs"),
            ],
        ))
    }
}

pub struct TitleAlignmentRule {
    state: RuleState,
}

impl TitleAlignmentRule {
    pub const ID: &'static str = "TitleAlignmentRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            enum_param(
                "heading1_align",
                "Heading 1 alignment",
                ALIGNMENT_CHOICES,
                Some("center"),
                "Alignment of level-1 headings",
            ),
            enum_param(
                "other_heading_align",
                "Other heading alignment",
                ALIGNMENT_CHOICES,
                Some("left"),
                "Alignment of level-2 and deeper headings",
            ),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Heading alignment",
                "Aligns level-1 headings apart from the other levels",
                RuleCategory::Paragraph,
                Self::schema(),
                config,
            ),
        }
    }

    fn alignment(&self, name: &str, fallback: Alignment) -> Result<Alignment, ApplyError> {
        Ok(Alignment::from_name(self.state.str_param(name)?).unwrap_or(fallback))
    }
}

impl Rule for TitleAlignmentRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let first = self.alignment("heading1_align", Alignment::Center)?;
        let other = self.alignment("other_heading_align", Alignment::Left)?;

        let mut fixed_count = 0;
        for paragraph in context.document_mut().paragraphs_mut() {
            if !paragraph.is_heading() {
                continue;
            }
            let target = if paragraph.style == "Heading 1" { first } else { other };
            if assign(&mut paragraph.alignment, Some(target)) {
                fixed_count += 1;
            }
        }

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Heading 1: {first:?}, other headings: {other:?}"),
                format!("Realigned {fixed_count} headings"),
            ],
        ))
    }
}

/// Hanging indent of a list item, in cm.
pub const LIST_FIRST_LINE_INDENT_CM: f64 = -0.64;
/// Space after a numbered item, in pt.
pub const NUMBERED_SPACE_AFTER_PT: f64 = 6.0;
pub const LIST_STYLE: &str = "List Paragraph";

pub struct ListNumberingRule {
    state: RuleState,
}

impl ListNumberingRule {
    pub const ID: &'static str = "ListNumberingRule";
    /// Cache key holding the number of paragraphs converted in this run.
    pub const CACHE_KEY: &'static str = "list_numbering.converted";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            font_param("chinese_font", "East-Asian font", "宋体", "East-Asian font of list items"),
            font_param("western_font", "Western font", "Arial", "Western font of list items"),
            size_param("font_size_body", "List size", 12.0, 8.0, 24.0, 0.5, "Size of list item text"),
            color_param("text_color", "Text colour", "#000000", "Colour of list item text"),
            range_param("list_indent", "List indent", 1.27, 0.5, 3.0, 0.01, "cm", "Left indent of first-level items"),
            range_param("line_spacing", "Line spacing", 1.5, 1.0, 3.0, 0.1, "x", "Line spacing multiple of list items"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "List numbering",
                "Turns typed bullets and numbers into formatted list items",
                RuleCategory::Paragraph,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for ListNumberingRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let east_asian = self.state.str_param("chinese_font")?;
        let western = self.state.str_param("western_font")?;
        let size = self.state.f64_param("font_size_body")?;
        let color = self.state.color_param("text_color")?;
        let list_indent = self.state.f64_param("list_indent")?;
        let line_spacing = self.state.f64_param("line_spacing")?;

        let has_list_style = context.document().has_style(LIST_STYLE);
        let mut bullets = 0;
        let mut numbered = 0;

        for paragraph in context.document_mut().paragraphs_mut() {
            if paragraph.list.is_some() {
                continue;
            }
            let text = paragraph.text();
            let Some(classified) = classify_line(&text, paragraph.is_heading()) else {
                continue;
            };
            let content = classified.content.to_string();
            let level = indent_level_for(classified.kind);

            paragraph.clear();
            let run = paragraph.add_run(&content);
            run.font.name = Some(western.to_string());
            run.font.east_asia = Some(east_asian.to_string());
            run.font.color = Some(color);
            run.font.size_pt = Some(size);

            let format = &mut paragraph.format;
            format.left_indent_cm = Some(match level {
                IndentLevel::Primary => list_indent,
                IndentLevel::Secondary => list_indent * 2.0,
            });
            format.first_line_indent_cm = Some(LIST_FIRST_LINE_INDENT_CM);
            format.line_spacing = Some(line_spacing);

            let kind = match classified.kind {
                MarkerKind::Bullet => {
                    if has_list_style {
                        paragraph.style = LIST_STYLE.to_string();
                    }
                    bullets += 1;
                    ListKind::Bullet
                }
                MarkerKind::Numbering(_) => {
                    paragraph.style = if has_list_style { LIST_STYLE } else { "Normal" }.to_string();
                    format.space_before_cm = Some(0.0);
                    format.space_after_cm = Some(NUMBERED_SPACE_AFTER_PT * CM_PER_PT);
                    numbered += 1;
                    ListKind::Numbered
                }
            };
            paragraph.list = Some(ListItem {
                kind,
                pattern: classified.kind.id().to_string(),
                level,
            });
        }

        let fixed_count = bullets + numbered;
        context.set_cache(Self::CACHE_KEY, json!(fixed_count));
        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Converted {bullets} bulleted and {numbered} numbered paragraphs"),
                format!("Converted {fixed_count} list paragraphs in total"),
            ],
        ))
    }
}

lazy_static! {
    static ref HORIZONTAL_RULE_PATTERNS: Vec<Regex> = [
        r"^\s*[-]{3,}\s*$",
        r"^\s*[*]{3,}\s*$",
        r"^\s*[_]{3,}\s*$",
        r"^\s*[-\s]{3,}\s*$",
        r"^\s*[*\s]{3,}\s*$",
        r"^\s*[_\s]{3,}\s*$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect();
}

/// True for text consisting only of a `---`, `***` or `___` style divider.
pub fn is_horizontal_rule(text: &str) -> bool {
    // Whitespace-only lines would satisfy the spaced patterns.
    !text.trim().is_empty() && HORIZONTAL_RULE_PATTERNS.iter().any(|regex| regex.is_match(text))
}

pub struct HorizontalRuleRemovalRule {
    state: RuleState,
}

impl HorizontalRuleRemovalRule {
    pub const ID: &'static str = "HorizontalRuleRemovalRule";

    pub fn new(config: Option<ParamMap>) -> Self {
        let defaults = json!({"remove_horizontal_rules": true});
        Self {
            state: RuleState::with_defaults(
                Self::ID,
                "Divider removal",
                "Deletes divider paragraphs left behind by markdown conversion",
                RuleCategory::Paragraph,
                defaults.as_object().cloned().unwrap_or_default(),
                config,
            ),
        }
    }
}

impl Rule for HorizontalRuleRemovalRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        if !self.state.bool_param("remove_horizontal_rules")? {
            return Ok(RuleResult::success(
                self.state.id,
                0,
                vec!["Divider removal is switched off".to_string()],
            ));
        }

        let removed = context
            .document_mut()
            .remove_paragraphs(|paragraph| is_horizontal_rule(&paragraph.text()));

        let details = if removed > 0 {
            vec![format!("Removed {removed} divider paragraphs")]
        } else {
            vec!["No dividers found".to_string()]
        };
        Ok(RuleResult::success(self.state.id, removed, details))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::context_with;
    use crate::types::{Block, Document, Paragraph, Table};
    use pretty_assertions::assert_eq;

    fn document(texts: &[&str]) -> Document {
        Document {
            body: texts
                .iter()
                .map(|text| Block::Paragraph(Paragraph::body(text)))
                .collect(),
            ..Document::default()
        }
    }

    #[test]
    fn test_spacing_skips_headings_and_indents_cells() {
        let mut doc = document(&["body"]);
        doc.body.insert(0, Block::Paragraph(Paragraph::heading(1, "Title")));
        doc.body.push(Block::Table(Table::from_texts(&[&["a", "b"]])));
        let rule = ParagraphSpacingRule::new(None);
        let mut context = context_with(doc);

        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 3);
        let heading = context.paragraphs().next().unwrap();
        assert_eq!(heading.format.line_spacing, None);
        let body = context.paragraphs().nth(1).unwrap();
        assert_eq!(body.format.space_after_cm, Some(0.33));
        let cell = &context.tables().next().unwrap().rows[0].cells[1].paragraphs[0];
        assert_eq!(cell.format.left_indent_cm, Some(0.2));
        assert_eq!(cell.format.line_spacing, None);

        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_bold_and_alignment_are_idempotent() {
        let mut doc = document(&["body"]);
        doc.body.push(Block::Paragraph(Paragraph::heading(1, "One")));
        doc.body.push(Block::Paragraph(Paragraph::heading(2, "Two")));
        let mut context = context_with(doc);

        let bold = TitleBoldRule::new(None);
        assert_eq!(bold.apply(&mut context).unwrap().fixed_count, 2);
        assert_eq!(bold.apply(&mut context).unwrap().fixed_count, 0);

        let align = TitleAlignmentRule::new(None);
        assert_eq!(align.apply(&mut context).unwrap().fixed_count, 2);
        let alignments: Vec<_> = context.paragraphs().map(|p| p.alignment).collect();
        assert_eq!(
            alignments,
            vec![None, Some(Alignment::Center), Some(Alignment::Left)]
        );
        assert_eq!(align.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_list_numbering_rewrites_markers() {
        let mut doc = document(&["· Hello", "1. First", "a. Sub", "Plain text"]);
        doc.styles.push(LIST_STYLE.to_string());
        let rule = ListNumberingRule::new(None);
        let mut context = context_with(doc);

        let result = rule.apply(&mut context).unwrap();
        assert_eq!(result.fixed_count, 3);
        assert_eq!(context.get_cache(ListNumberingRule::CACHE_KEY, json!(0)), json!(3));

        let paragraphs: Vec<_> = context.paragraphs().collect();
        assert_eq!(paragraphs[0].text(), "Hello");
        assert_eq!(paragraphs[0].style, LIST_STYLE);
        assert_eq!(paragraphs[0].list.as_ref().unwrap().kind, ListKind::Bullet);
        assert_eq!(paragraphs[1].text(), "First");
        assert_eq!(paragraphs[1].format.left_indent_cm, Some(1.27));
        assert_eq!(paragraphs[2].format.left_indent_cm, Some(2.54));
        assert_eq!(paragraphs[2].list.as_ref().unwrap().level, IndentLevel::Secondary);
        assert_eq!(paragraphs[3].text(), "Plain text");
        assert!(paragraphs[3].list.is_none());

        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_spacing_leaves_list_items_alone() {
        let mut context = context_with(document(&["1. First", "Plain text"]));
        let lists = ListNumberingRule::new(None);
        let spacing = ParagraphSpacingRule::new(None);
        lists.apply(&mut context).unwrap();

        assert_eq!(spacing.apply(&mut context).unwrap().fixed_count, 1);
        let paragraphs: Vec<_> = context.paragraphs().collect();
        assert_eq!(paragraphs[0].format.left_indent_cm, Some(1.27));
        assert_eq!(paragraphs[1].format.left_indent_cm, Some(0.0));

        assert_eq!(lists.apply(&mut context).unwrap().fixed_count, 0);
        assert_eq!(spacing.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_numbered_items_fall_back_to_normal_style() {
        let mut doc = document(&["2) Second"]);
        if let Block::Paragraph(paragraph) = &mut doc.body[0] {
            paragraph.style = "Body Text".to_string();
        }
        let mut context = context_with(doc);
        ListNumberingRule::new(None).apply(&mut context).unwrap();
        let paragraph = context.paragraphs().next().unwrap();
        assert_eq!(paragraph.style, "Normal");
        assert_eq!(paragraph.format.space_before_cm, Some(0.0));
    }

    #[test]
    fn test_divider_detection() {
        assert!(is_horizontal_rule("---"));
        assert!(is_horizontal_rule("  * * *  "));
        assert!(is_horizontal_rule("_____"));
        assert!(!is_horizontal_rule("--"));
        assert!(!is_horizontal_rule("    "));
        assert!(!is_horizontal_rule("- item"));
    }

    #[test]
    fn test_divider_removal_respects_switch() {
        let doc = document(&["intro", "---", "body", "***"]);
        let mut context = context_with(doc.clone());
        let rule = HorizontalRuleRemovalRule::new(None);
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 2);
        assert_eq!(context.paragraphs().count(), 2);
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);

        let off = HorizontalRuleRemovalRule::new(Some(
            json!({"remove_horizontal_rules": false}).as_object().cloned().unwrap(),
        ));
        let mut context = context_with(doc);
        assert_eq!(off.apply(&mut context).unwrap().fixed_count, 0);
        assert_eq!(context.paragraphs().count(), 4);
    }
}
