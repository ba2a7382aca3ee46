use crate::schema::ParamMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Centimetres per typographic point. Linear dimensions are centimetres
/// throughout the core, font sizes are points.
pub const CM_PER_PT: f64 = 2.54 / 72.0;

/// Tolerance used when comparing stored lengths against target lengths.
pub const LENGTH_EPSILON: f64 = 1e-4;

pub fn lengths_match(current: Option<f64>, target: f64) -> bool {
    current.is_some_and(|value| (value - target).abs() < LENGTH_EPSILON)
}

/// Writes `target` into `slot` unless it already matches within
/// [`LENGTH_EPSILON`]. Returns whether it changed.
pub fn assign_length(slot: &mut Option<f64>, target: f64) -> bool {
    if lengths_match(*slot, target) {
        return false;
    }
    *slot = Some(target);
    true
}

/// Upper bound on grid columns of one table; Word refuses wider tables.
pub const MAX_GRID_COLUMNS: usize = 63;

// ===== DOCUMENT TREE =====
// The in-memory model handed over by the document store. Container
// parsing and serialization live behind `DocumentStore`.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub body: Vec<Block>,
    /// Style names defined by the document (e.g. "Normal", "List Paragraph")
    #[serde(default)]
    pub styles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl Document {
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.body.iter().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        })
    }

    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.body.iter_mut().filter_map(|block| match block {
            Block::Paragraph(paragraph) => Some(paragraph),
            Block::Table(_) => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.body.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.body.iter_mut().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            Block::Paragraph(_) => None,
        })
    }

    pub fn has_style(&self, name: &str) -> bool {
        self.styles.iter().any(|style| style == name)
    }

    /// Removes every top-level paragraph matching `predicate`, returning how many went.
    pub fn remove_paragraphs<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Paragraph) -> bool,
    {
        let before = self.body.len();
        self.body.retain(|block| match block {
            Block::Paragraph(paragraph) => !predicate(paragraph),
            Block::Table(_) => true,
        });
        before - self.body.len()
    }

    /// Visits every paragraph in document order, descending into tables.
    pub fn for_each_paragraph_mut<F>(&mut self, mut visit: F)
    where
        F: FnMut(&mut Paragraph, ParagraphScope),
    {
        for block in &mut self.body {
            match block {
                Block::Paragraph(paragraph) => visit(paragraph, ParagraphScope::Body),
                Block::Table(table) => table.for_each_paragraph_mut(&mut |paragraph: &mut Paragraph| {
                    visit(paragraph, ParagraphScope::TableCell)
                }),
            }
        }
    }

    /// Available content width of the first section, if the document has one.
    pub fn available_width_cm(&self) -> Option<f64> {
        self.sections.first().map(Section::available_width_cm)
    }
}

/// Where a visited paragraph lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphScope {
    Body,
    TableCell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub page_width_cm: f64,
    pub page_height_cm: f64,
    pub margin_top_cm: f64,
    pub margin_bottom_cm: f64,
    pub margin_left_cm: f64,
    pub margin_right_cm: f64,
}

impl Default for Section {
    fn default() -> Self {
        // A4 with one-inch margins
        Self {
            page_width_cm: 21.0,
            page_height_cm: 29.7,
            margin_top_cm: 2.54,
            margin_bottom_cm: 2.54,
            margin_left_cm: 2.54,
            margin_right_cm: 2.54,
        }
    }
}

impl Section {
    pub fn available_width_cm(&self) -> f64 {
        self.page_width_cm - self.margin_left_cm - self.margin_right_cm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "justify" => Some(Self::Justify),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "top" => Some(Self::Top),
            "center" => Some(Self::Center),
            "bottom" => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// Indentation tier of a list item when rendered as a structured list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndentLevel {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Numbered,
}

/// Marks a paragraph that has been re-rendered as a structured list item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub kind: ListKind,
    /// Identifier of the marker pattern the item was recognised by
    pub pattern: String,
    pub level: IndentLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphFormat {
    #[serde(default)]
    pub left_indent_cm: Option<f64>,
    #[serde(default)]
    pub right_indent_cm: Option<f64>,
    #[serde(default)]
    pub first_line_indent_cm: Option<f64>,
    #[serde(default)]
    pub space_before_cm: Option<f64>,
    #[serde(default)]
    pub space_after_cm: Option<f64>,
    /// Line spacing as a multiple of single spacing
    #[serde(default)]
    pub line_spacing: Option<f64>,
}

fn default_style() -> String {
    "Normal".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default = "default_style")]
    pub style: String,
    #[serde(default)]
    pub runs: Vec<Run>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
    #[serde(default)]
    pub format: ParagraphFormat,
    #[serde(default)]
    pub list: Option<ListItem>,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self {
            style: default_style(),
            runs: Vec::new(),
            alignment: None,
            format: ParagraphFormat::default(),
            list: None,
        }
    }
}

impl Paragraph {
    pub fn new(style: &str, text: &str) -> Self {
        let mut paragraph = Self {
            style: style.to_string(),
            ..Self::default()
        };
        if !text.is_empty() {
            paragraph.runs.push(Run::new(text));
        }
        paragraph
    }

    pub fn body(text: &str) -> Self {
        Self::new("Normal", text)
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Self::new(&format!("Heading {level}"), text)
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    pub fn is_heading(&self) -> bool {
        self.style.starts_with("Heading")
    }

    /// Numeric level of a "Heading N" style.
    pub fn heading_level(&self) -> Option<u8> {
        self.style
            .strip_prefix("Heading")
            .and_then(|rest| rest.trim().parse().ok())
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    pub fn add_run(&mut self, text: &str) -> &mut Run {
        self.runs.push(Run::new(text));
        let last = self.runs.len() - 1;
        &mut self.runs[last]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    #[serde(default)]
    pub font: Font,
}

impl Run {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            font: Font::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Font {
    /// Western (ASCII) font name
    #[serde(default)]
    pub name: Option<String>,
    /// East-Asian font name
    #[serde(default)]
    pub east_asia: Option<String>,
    #[serde(default)]
    pub size_pt: Option<f64>,
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub color: Option<RgbColor>,
}

impl Font {
    pub fn size_matches(&self, target_pt: f64) -> bool {
        self.size_pt
            .is_some_and(|size| (size - target_pt).abs() < LENGTH_EPSILON)
    }
}

/// 24-bit colour stored as a hex string (`RRGGBB`) when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor(pub u8, pub u8, pub u8);

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor(0, 0, 0);

    /// Parses `#RRGGBB` or `RRGGBB`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

impl TryFrom<String> for RgbColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid colour `{value}`"))
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_hex()
    }
}

// ===== TABLES =====

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Logical grid columns
    #[serde(default)]
    pub columns: Vec<GridColumn>,
    #[serde(default)]
    pub width_cm: Option<f64>,
    #[serde(default)]
    pub alignment: Option<Alignment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    #[serde(default)]
    pub width_cm: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub cells: Vec<Cell>,
}

impl Table {
    /// Builds a table from a grid of cell texts, one grid column per cell.
    pub fn from_texts(rows: &[&[&str]]) -> Self {
        let column_count = rows.iter().map(|row| row.len()).max().unwrap_or(0);
        Self {
            rows: rows
                .iter()
                .map(|row| Row {
                    cells: row.iter().map(|text| Cell::new(text)).collect(),
                })
                .collect(),
            columns: vec![GridColumn::default(); column_count],
            width_cm: None,
            alignment: None,
        }
    }

    /// Number of logical grid columns. Falls back to the widest row when
    /// the grid is not declared.
    pub fn column_count(&self) -> usize {
        if !self.columns.is_empty() {
            return self.columns.len();
        }
        self.rows
            .iter()
            .map(|row| {
                row.cells
                    .iter()
                    .map(Cell::grid_span)
                    .fold(0_usize, usize::saturating_add)
            })
            .max()
            .unwrap_or(0)
            .min(MAX_GRID_COLUMNS)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.rows.iter_mut().flat_map(|row| row.cells.iter_mut())
    }

    pub fn has_nested_tables(&self) -> bool {
        self.cells().any(|cell| !cell.tables.is_empty())
    }

    /// Visits every paragraph inside the table, descending into nested tables.
    pub fn for_each_paragraph_mut<F>(&mut self, visit: &mut F)
    where
        F: FnMut(&mut Paragraph),
    {
        for cell in self.cells_mut() {
            for paragraph in &mut cell.paragraphs {
                visit(paragraph);
            }
            for nested in &mut cell.tables {
                nested.for_each_paragraph_mut(visit);
            }
        }
    }
}

/// A raw cell-property element (e.g. `w:gridSpan`, `w:vMerge`) as exposed by
/// the document model. Tags and attribute keys may carry namespace prefixes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl PropertyElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellBorders {
    pub style: String,
    /// Line width in eighths of a point
    pub size: u32,
    pub space: u32,
    pub color: RgbColor,
}

impl CellBorders {
    pub fn single(size: u32, color: RgbColor) -> Self {
        Self {
            style: "single".to_string(),
            size,
            space: 0,
            color,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub properties: Vec<PropertyElement>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub tables: Vec<Table>,
    #[serde(default)]
    pub width_cm: Option<f64>,
    #[serde(default)]
    pub vertical_alignment: Option<VerticalAlignment>,
    #[serde(default)]
    pub shading: Option<RgbColor>,
    #[serde(default)]
    pub borders: Option<CellBorders>,
}

impl Cell {
    pub fn new(text: &str) -> Self {
        Self {
            paragraphs: vec![Paragraph::body(text)],
            ..Self::default()
        }
    }

    /// A cell spanning `span` grid columns.
    pub fn spanning(text: &str, span: usize) -> Self {
        let mut cell = Self::new(text);
        cell.properties
            .push(PropertyElement::new("w:gridSpan").with_attribute("w:val", &span.to_string()));
        cell
    }

    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn grid_span(&self) -> usize {
        crate::layout::grid_span(self)
    }
}

// ===== RULE RESULTS & REPORTS =====

/// Outcome of one rule invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub success: bool,
    pub fixed_count: usize,
    pub details: Vec<String>,
}

impl RuleResult {
    pub fn success(rule_id: &str, fixed_count: usize, details: Vec<String>) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            success: true,
            fixed_count,
            details,
        }
    }

    pub fn failure(rule_id: &str, message: String) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            success: false,
            fixed_count: 0,
            details: vec![message],
        }
    }
}

/// A single `(ruleId, params)` pair submitted to one execution run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleInvocation {
    pub rule_id: String,
    #[serde(default)]
    pub params: ParamMap,
}

impl RuleInvocation {
    pub fn new(rule_id: &str) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            params: ParamMap::new(),
        }
    }

    pub fn with_params(rule_id: &str, params: ParamMap) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_fixed: usize,
    /// Elapsed wall time formatted as seconds, e.g. "0.12s"
    pub time_taken: String,
}

/// Aggregate over one document-processing run. Built fresh per execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub summary: RunSummary,
    pub elapsed_ms: u64,
    pub results: Vec<RuleResult>,
    pub save_success: bool,
    pub saved_to: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl ExecutionReport {
    pub fn failed_results(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|result| !result.success)
    }
}

/// Listing entry for one registered rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub enabled: bool,
    pub params: ParamMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_schema: Option<Vec<serde_json::Value>>,
}
