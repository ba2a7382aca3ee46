use super::rule::{assign, assign_length, Rule, RuleCategory, RuleState};
use crate::context::DocumentContext;
use crate::error::ApplyError;
use crate::layout::{has_merged_cells, layout_table, LayoutOptions, TableLayout};
use crate::schema::{
    bool_param, color_param, enum_param, font_param, range_param, size_param, string_param,
    ParamMap, RuleConfigSchema,
};
use crate::types::{Alignment, Cell, CellBorders, RgbColor, RuleResult, VerticalAlignment};
use serde_json::json;
use tracing::debug;

pub struct TableWidthRule {
    state: RuleState,
}

impl TableWidthRule {
    pub const ID: &'static str = "TableWidthRule";
    /// Cache key holding the resolved layouts of this run.
    pub const CACHE_KEY: &'static str = "table_width.layouts";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            range_param(
                "table_width_percent",
                "Table width",
                95.0,
                50.0,
                100.0,
                5.0,
                "%",
                "Table width as a share of the page content width",
            ),
            enum_param(
                "table_alignment",
                "Table alignment",
                &[("center", "Center"), ("left", "Left"), ("right", "Right")],
                Some("center"),
                "Horizontal placement of tables",
            ),
            bool_param(
                "auto_adjust_columns",
                "Fit columns to content",
                true,
                "Size columns by their content instead of splitting evenly",
            ),
            string_param(
                "column_weights",
                "Column weights",
                "",
                "Comma-separated relative column widths; used when the count matches the table",
            )
            .with_placeholder("2,1,1"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Table width",
                "Sets table width and alignment and sizes columns, including nested tables",
                RuleCategory::Table,
                Self::schema(),
                config,
            ),
        }
    }

    fn column_weights(&self) -> Result<Option<Vec<f64>>, ApplyError> {
        let Some(raw) = self.state.optional_str_param("column_weights")? else {
            return Ok(None);
        };
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<f64>()
                    .ok()
                    .filter(|weight| weight.is_finite() && *weight >= 0.0)
                    .ok_or_else(|| ApplyError::InvalidParam {
                        name: "column_weights".to_string(),
                        expected: "comma-separated non-negative numbers",
                        found: raw.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

impl Rule for TableWidthRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let percent = self.state.f64_param("table_width_percent")?;
        let alignment = Alignment::from_name(self.state.str_param("table_alignment")?)
            .unwrap_or(Alignment::Center);
        let options = LayoutOptions {
            auto_adjust: self.state.bool_param("auto_adjust_columns")?,
            column_weights: self.column_weights()?,
            alignment: Some(alignment),
        };

        let available = context.available_width_cm();
        let target = available * percent / 100.0;

        let mut fixed_count = 0;
        let mut details = Vec::new();
        let mut layouts: Vec<TableLayout> = Vec::new();
        for (index, table) in context.document_mut().tables_mut().enumerate() {
            let merged = has_merged_cells(table);
            let layout = layout_table(table, target, &options, available);
            if layout.column_widths_cm.is_empty() {
                details.push(format!("Table {}: empty, skipped", index + 1));
                continue;
            }
            debug!(
                table = index + 1,
                width_cm = layout.table_width_cm,
                columns = ?layout.column_widths_cm,
                merged,
                "table laid out"
            );
            details.push(format!(
                "Table {}: {:.2}cm, columns [{}]{}{}",
                index + 1,
                layout.table_width_cm,
                layout
                    .column_widths_cm
                    .iter()
                    .map(|width| format!("{width:.2}"))
                    .collect::<Vec<_>>()
                    .join(", "),
                if merged { ", merged cells" } else { "" },
                if layout.nested.is_empty() {
                    String::new()
                } else {
                    format!(", {} nested", layout.nested.len())
                },
            ));
            if layout.changed {
                fixed_count += 1;
            }
            layouts.push(layout);
        }

        context.set_cache(Self::CACHE_KEY, json!(layouts));
        details.push(format!("Resized {fixed_count} tables"));
        Ok(RuleResult::success(self.state.id, fixed_count, details))
    }
}

/// Indent applied to the first paragraph of every cell, in cm.
pub const CELL_PADDING_CM: f64 = 0.2;

pub struct TableBorderRule {
    state: RuleState,
}

impl TableBorderRule {
    pub const ID: &'static str = "TableBorderRule";

    pub fn schema() -> RuleConfigSchema {
        RuleConfigSchema::new(vec![
            range_param("border_size", "Border width", 4.0, 1.0, 12.0, 1.0, "1/8 pt", "Cell border width"),
            color_param("border_color", "Border colour", "#000000", "Cell border colour"),
            bool_param("add_table_header_format", "Format header row", true, "Shade and embolden the first row"),
            color_param("table_header_bg_color", "Header background", "#E3E3E3", "Fill of the header row"),
            size_param("font_size_table_header", "Header size", 14.0, 10.0, 24.0, 0.5, "Text size of the header row"),
            size_param("font_size_table_content", "Content size", 12.0, 8.0, 20.0, 0.5, "Text size of the other rows"),
            font_param("chinese_font", "East-Asian font", "宋体", "East-Asian font of table text"),
            font_param("western_font", "Western font", "Arial", "Western font of table text"),
        ])
    }

    pub fn new(config: Option<ParamMap>) -> Self {
        Self {
            state: RuleState::with_schema(
                Self::ID,
                "Table borders and header",
                "Adds cell borders, formats the header row and unifies table fonts",
                RuleCategory::Table,
                Self::schema(),
                config,
            ),
        }
    }
}

struct CellStyle<'a> {
    borders: CellBorders,
    header: bool,
    header_fill: RgbColor,
    header_size: f64,
    content_size: f64,
    east_asian: &'a str,
    western: &'a str,
}

impl CellStyle<'_> {
    /// Formats one cell; returns whether anything changed.
    fn apply(&self, cell: &mut Cell, is_header_row: bool) -> bool {
        let header = self.header && is_header_row;
        let mut changed = assign(&mut cell.borders, Some(self.borders.clone()));
        changed |= assign(&mut cell.vertical_alignment, Some(VerticalAlignment::Center));

        for paragraph in &mut cell.paragraphs {
            for run in &mut paragraph.runs {
                let font = &mut run.font;
                changed |= assign(&mut font.name, Some(self.western.to_string()));
                changed |= assign(&mut font.east_asia, Some(self.east_asian.to_string()));
                changed |= assign(&mut font.color, Some(RgbColor::BLACK));
                if header {
                    changed |= assign_length(&mut font.size_pt, self.header_size);
                    changed |= assign(&mut font.bold, Some(true));
                } else {
                    changed |= assign_length(&mut font.size_pt, self.content_size);
                }
            }
        }

        if header {
            changed |= assign(&mut cell.shading, Some(self.header_fill));
        }
        if let Some(first) = cell.paragraphs.first_mut() {
            changed |= assign_length(&mut first.format.left_indent_cm, CELL_PADDING_CM);
            changed |= assign_length(&mut first.format.right_indent_cm, CELL_PADDING_CM);
        }
        changed
    }
}

impl Rule for TableBorderRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let style = CellStyle {
            borders: CellBorders::single(
                self.state.u32_param("border_size")?,
                self.state.color_param("border_color")?,
            ),
            header: self.state.bool_param("add_table_header_format")?,
            header_fill: self.state.color_param("table_header_bg_color")?,
            header_size: self.state.f64_param("font_size_table_header")?,
            content_size: self.state.f64_param("font_size_table_content")?,
            east_asian: self.state.str_param("chinese_font")?,
            western: self.state.str_param("western_font")?,
        };

        let mut table_count = 0;
        let mut fixed_count = 0;
        for table in context.document_mut().tables_mut() {
            table_count += 1;
            for (row_index, row) in table.rows.iter_mut().enumerate() {
                for cell in &mut row.cells {
                    if style.apply(cell, row_index == 0) {
                        fixed_count += 1;
                    }
                }
            }
        }

        let details = if table_count == 0 {
            vec!["No tables found".to_string()]
        } else {
            vec![
                format!("Formatted {table_count} tables"),
                format!("Updated {fixed_count} cells"),
            ]
        };
        Ok(RuleResult::success(self.state.id, fixed_count, details))
    }
}

pub struct TableBordersRule {
    state: RuleState,
}

impl TableBordersRule {
    pub const ID: &'static str = "TableBordersRule";

    pub fn new(config: Option<ParamMap>) -> Self {
        let defaults = json!({
            "border_size": 4,
            "border_color": "000000",
            "vertical_alignment": "center"
        });
        Self {
            state: RuleState::with_defaults(
                Self::ID,
                "Uniform table borders",
                "Gives every table cell the same border and vertical alignment",
                RuleCategory::Table,
                defaults.as_object().cloned().unwrap_or_default(),
                config,
            ),
        }
    }
}

impl Rule for TableBordersRule {
    fn state(&self) -> &RuleState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RuleState {
        &mut self.state
    }

    fn apply(&self, context: &mut DocumentContext) -> Result<RuleResult, ApplyError> {
        let size = self.state.u32_param("border_size")?;
        let color = self.state.color_param("border_color")?;
        let vertical_name = self.state.str_param("vertical_alignment")?;
        let vertical = VerticalAlignment::from_name(vertical_name).unwrap_or(VerticalAlignment::Center);
        let borders = CellBorders::single(size, color);

        let mut fixed_count = 0;
        for table in context.document_mut().tables_mut() {
            for cell in table.cells_mut() {
                let aligned = assign(&mut cell.vertical_alignment, Some(vertical));
                let bordered = assign(&mut cell.borders, Some(borders.clone()));
                if aligned || bordered {
                    fixed_count += 1;
                }
            }
        }

        Ok(RuleResult::success(
            self.state.id,
            fixed_count,
            vec![
                format!("Unified the borders of {fixed_count} cells"),
                format!("Border: {size}/8pt {color}, vertical alignment: {vertical_name}"),
            ],
        ))
    }
}
