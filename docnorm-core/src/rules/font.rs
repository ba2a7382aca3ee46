use super::rule::{assign, Rule, RuleCategory, RuleState};
use crate::context::DocumentContext;
use crate::error::ApplyError;
use crate::schema::{color_param, font_param, range_param, size_param, ParamMap, RuleConfigSchema};
use crate::types::{ParagraphScope, RuleResult};

/// Western font forced onto heading runs.
pub const HEADING_WESTERN_FONT: &str = "Arial";

pub struct FontColorRule {
    state: RuleState,
}

impl FontColorRule {
    pub const ID: &'static str = "FontColorRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![color_param(
            "text_color",
            "Text colour",
            "#000000",
            "Colour applied to every text run",
        )])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Font colour",
                "Unifies the colour of all text, including table text",
                RuleCategory::Font,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for FontColorRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let color = self.state.color_param("text_color")?;
        let mut fixed_count = 0;
        context.document_mut().for_each_paragraph_mut(|paragraph, _| {
            for run in &mut paragraph.runs {
                if assign(&mut run.font.color, Some(color)) {
                    fixed_count += 1;
                }
            }
        });

        let details = if fixed_count > 0 {
            vec![format!("Recoloured {fixed_count} runs to {color}")]
        } else {
            vec![format!("All text is already {color}")]
        };
        Ok(RuleResult::success(self.state.id, fixed_count, details))
    }
}

pub struct FontNameRule {
    state: RuleState,
}

impl FontNameRule {
    pub const ID: &'static str = "FontNameRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            font_param("chinese_font", "East-Asian font", "宋体", "Font for East-Asian text"),
            font_param("western_font", "Western font", "Arial", "Font for Latin text and digits"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Font names",
                "Sets one East-Asian and one western font for the whole document",
                RuleCategory::Font,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for FontNameRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let east_asian = self.state.str_param("chinese_font")?;
        let western = self.state.str_param("western_font")?;

        let mut fixed_count = 0;
        context.document_mut().for_each_paragraph_mut(|paragraph, _| {
            for run in &mut paragraph.runs {
                let renamed = assign(&mut run.font.name, Some(western.to_string()));
                let east_asia_renamed = assign(&mut run.font.east_asia, Some(east_asian.to_string()));
                if renamed || east_asia_renamed {
                    fixed_count += 1;
                }
            }
        });

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("East-Asian font: {east_asian}, western font: {western}"),
                format!("Updated the font of {fixed_count} runs"),
            ],
        ))
    }
}

pub struct TitleFontRule {
    state: RuleState,
}

impl TitleFontRule {
    pub const ID: &'static str = "TitleFontRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![font_param(
            "title_font",
            "Heading East-Asian font",
            "黑体",
            "East-Asian font used by headings",
        )])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Heading font",
                "Gives headings a dedicated font",
                RuleCategory::Font,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for TitleFontRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let title_font = self.state.str_param("title_font")?;

        let mut fixed_count = 0;
        context.document_mut().for_each_paragraph_mut(|paragraph, scope| {
            if scope != ParagraphScope::Body || !paragraph.is_heading() {
                return;
            }
            for run in &mut paragraph.runs {
                let renamed = assign(&mut run.font.name, Some(HEADING_WESTERN_FONT.to_string()));
                let east_asia_renamed = assign(&mut run.font.east_asia, Some(title_font.to_string()));
                if renamed || east_asia_renamed {
                    fixed_count += 1;
                }
            }
        });

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Heading font: {title_font}"),
                format!("Updated the font of {fixed_count} heading runs"),
            ],
        ))
    }
}

pub struct FontSizeRule {
    state: RuleState,
}

impl FontSizeRule {
    pub const ID: &'static str = "FontSizeRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            size_param("font_size_body", "Body size", 12.0, 8.0, 36.0, 0.5, "Body text size"),
            size_param("font_size_title1", "Heading 1 size", 22.0, 12.0, 48.0, 1.0, "Size of level-1 headings"),
            size_param("font_size_title2", "Heading 2 size", 18.0, 10.0, 36.0, 1.0, "Size of level-2 headings"),
            size_param("font_size_title3", "Heading 3 size", 16.0, 10.0, 30.0, 1.0, "Size of level-3 headings"),
            range_param(
                "min_font_size",
                "Minimum size",
                10.0,
                6.0,
                16.0,
                1.0,
                "pt",
                "Body text smaller than this is raised to the body size",
            ),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Font sizes",
                "Sets body and heading sizes",
                RuleCategory::Font,
                Self::schema(),
                config,
            ),
        }
    }
}

impl Rule for FontSizeRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let body = self.state.f64_param("font_size_body")?;
        let heading_sizes = [
            self.state.f64_param("font_size_title1")?,
            self.state.f64_param("font_size_title2")?,
            self.state.f64_param("font_size_title3")?,
        ];
        let minimum = self.state.f64_param("min_font_size")?;

        let mut fixed_count = 0;
        context.document_mut().for_each_paragraph_mut(|paragraph, scope| {
            if scope != ParagraphScope::Body {
                return;
            }
            if paragraph.is_heading() {
                let target = paragraph
                    .heading_level()
                    .and_then(|level| heading_sizes.get(usize::from(level).checked_sub(1)?))
                    .copied()
                    .unwrap_or(body);
                for run in &mut paragraph.runs {
                    if !run.font.size_matches(target) {
                        run.font.size_pt = Some(target);
                        fixed_count += 1;
                    }
                }
            } else {
                for run in &mut paragraph.runs {
                    let too_small = run.font.size_pt.map_or(true, |size| size < minimum);
                    if too_small && !run.font.size_matches(body) {
                        run.font.size_pt = Some(body);
                        fixed_count += 1;
                    }
                }
            }
        });

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Body size: {body}pt"),
                format!(
                    "Heading sizes: {}pt / {}pt / {}pt",
                    heading_sizes[0], heading_sizes[1], heading_sizes[2]
                ),
                format!("Resized {fixed_count} runs"),
            ],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::context_with;
    use crate::types::{Block, Document, Paragraph, RgbColor, Table};
    use serde_json::json;

    fn sample() -> Document {
        let mut small = Paragraph::body("small print");
        small.runs[0].font.size_pt = Some(8.0);
        let mut fine = Paragraph::body("fine");
        fine.runs[0].font.size_pt = Some(11.0);
        Document {
            body: vec![
                Block::Paragraph(Paragraph::heading(1, "Title")),
                Block::Paragraph(Paragraph::heading(4, "Deep")),
                Block::Paragraph(small),
                Block::Paragraph(fine),
                Block::Table(Table::from_texts(&[&["cell"]])),
            ],
            ..Document::default()
        }
    }

    #[test]
    fn test_color_covers_tables_and_is_idempotent() {
        let rule = FontColorRule::new(Some(
            json!({"text_color": "#1F3864"}).as_object().cloned().unwrap(),
        ));
        let mut context = context_with(sample());
        let first = rule.apply(&mut context).unwrap();
        assert_eq!(first.fixed_count, 5);
        let table = context.tables().next().unwrap();
        assert_eq!(
            table.rows[0].cells[0].paragraphs[0].runs[0].font.color,
            Some(RgbColor(0x1F, 0x38, 0x64))
        );
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_font_names_set_both_scripts() {
        let rule = FontNameRule::new(None);
        let mut context = context_with(sample());
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 5);
        let run = &context.paragraphs().next().unwrap().runs[0];
        assert_eq!(run.font.name.as_deref(), Some("Arial"));
        assert_eq!(run.font.east_asia.as_deref(), Some("宋体"));
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_title_font_only_touches_headings() {
        let rule = TitleFontRule::new(None);
        let mut context = context_with(sample());
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 2);
        let body_run = &context.paragraphs().nth(2).unwrap().runs[0];
        assert_eq!(body_run.font.east_asia, None);
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_font_sizes_by_level_and_minimum() {
        let rule = FontSizeRule::new(None);
        let mut context = context_with(sample());
        let result = rule.apply(&mut context).unwrap();
        // two headings plus the 8pt run; the 11pt run is above the minimum
        assert_eq!(result.fixed_count, 3);

        let sizes: Vec<_> = context
            .paragraphs()
            .map(|p| p.runs[0].font.size_pt)
            .collect();
        assert_eq!(sizes, vec![Some(22.0), Some(12.0), Some(12.0), Some(11.0)]);
        assert_eq!(rule.apply(&mut context).unwrap().fixed_count, 0);
    }

    #[test]
    fn test_bad_color_is_an_apply_error() {
        let mut rule = FontColorRule::new(None);
        rule.state_mut()
            .merge(&json!({"text_color": "blue"}).as_object().cloned().unwrap());
        let mut context = context_with(sample());
        assert!(matches!(
            rule.apply(&mut context),
            Err(ApplyError::InvalidParam { .. })
        ));
    }
}
