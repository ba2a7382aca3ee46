//! Table width allocation.
//!
//! Column widths are distributed from a table's target width, either by an
//! explicit weight list or by a content-length estimate per column. Tables
//! nested in cells are sized after their parent's columns are final.

use crate::types::{
    assign_length, Alignment, Cell, GridColumn, Table, LENGTH_EPSILON, MAX_GRID_COLUMNS,
};
use serde::Serialize;

/// Share of the containing cell's width given to a nested table.
pub const NESTED_CELL_RATIO: f64 = 0.9;
/// Share of the available width given to a nested table whose cell width is unknown.
pub const NESTED_FALLBACK_RATIO: f64 = 0.7;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutOptions {
    /// Derive column weights from cell content. Ignored when `column_weights` applies.
    pub auto_adjust: bool,
    /// Explicit per-column weights, used only when the count matches the grid.
    pub column_weights: Option<Vec<f64>>,
    pub alignment: Option<Alignment>,
}

/// Widths resolved for one table, with its nested tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableLayout {
    pub table_width_cm: f64,
    pub column_widths_cm: Vec<f64>,
    pub nested: Vec<TableLayout>,
    /// Whether any width or alignment in this table (or below it) was modified
    pub changed: bool,
}

/// Strips a namespace prefix in either `{uri}name` or `prefix:name` form.
pub fn local_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '}' || c == ':').next().unwrap_or(name)
}

/// Number of grid columns the cell spans; 1 when no span marker is present.
/// Capped at [`MAX_GRID_COLUMNS`].
pub fn grid_span(cell: &Cell) -> usize {
    cell.properties
        .iter()
        .find(|element| local_name(&element.tag) == "gridSpan")
        .and_then(|element| {
            element
                .attributes
                .iter()
                .find(|(key, _)| local_name(key) == "val")
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        })
        .filter(|span| *span > 0)
        .map_or(1, |span| span.min(MAX_GRID_COLUMNS))
}

pub fn is_merged_cell(cell: &Cell) -> bool {
    cell.properties
        .iter()
        .any(|element| matches!(local_name(&element.tag), "vMerge" | "hMerge"))
}

pub fn has_merged_cells(table: &Table) -> bool {
    table.cells().any(is_merged_cell)
}

fn is_east_asian_ideograph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Visual length estimate: 2 units per CJK ideograph, 1 per other character.
pub fn estimate_text_width(text: &str) -> f64 {
    text.trim()
        .chars()
        .map(|c| if is_east_asian_ideograph(c) { 2.0 } else { 1.0 })
        .sum()
}

/// Per-column content weight: the widest cell estimate seen in each column.
///
/// A cell spanning `s` columns contributes `length / s` to each of them.
/// Cells are placed on the grid with a cursor that advances by their span.
pub fn column_weights(table: &Table, column_count: usize) -> Vec<f64> {
    let mut weights = vec![0.0_f64; column_count];
    for row in &table.rows {
        let mut cursor = 0;
        for cell in &row.cells {
            if cursor >= column_count {
                break;
            }
            let span = grid_span(cell);
            let length = estimate_text_width(&cell.text()) / span as f64;
            let end = cursor.saturating_add(span).min(column_count);
            for weight in &mut weights[cursor..end] {
                *weight = weight.max(length);
            }
            cursor = end;
        }
    }
    weights
}

/// Splits `total` proportionally to `weights`, or equally when they sum to zero.
pub fn allocate_widths(total: f64, weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let clamped: Vec<f64> = weights.iter().map(|w| w.max(0.0)).collect();
    let sum: f64 = clamped.iter().sum();
    if sum <= 0.0 {
        let equal = total / weights.len() as f64;
        return vec![equal; weights.len()];
    }
    clamped.iter().map(|w| total * w / sum).collect()
}

/// Resolves and writes the widths of `table` and every table nested in it.
///
/// A table with no rows or no columns is left untouched and yields an empty
/// width vector.
pub fn layout_table(
    table: &mut Table,
    target_width_cm: f64,
    options: &LayoutOptions,
    available_width_cm: f64,
) -> TableLayout {
    let column_count = table.column_count();
    if table.rows.is_empty() || column_count == 0 {
        return TableLayout::default();
    }

    let mut changed = assign_length(&mut table.width_cm, target_width_cm);
    if let Some(alignment) = options.alignment {
        if table.alignment != Some(alignment) {
            table.alignment = Some(alignment);
            changed = true;
        }
    }

    let weights = match &options.column_weights {
        Some(explicit) if explicit.len() == column_count => explicit.clone(),
        _ if options.auto_adjust => column_weights(table, column_count),
        _ => vec![1.0; column_count],
    };
    let widths = allocate_widths(target_width_cm, &weights);

    if table.columns.len() != column_count {
        table.columns.resize(column_count, GridColumn::default());
        changed = true;
    }
    for (column, width) in table.columns.iter_mut().zip(&widths) {
        changed |= assign_length(&mut column.width_cm, *width);
    }

    for row in &mut table.rows {
        let mut cursor = 0;
        for cell in &mut row.cells {
            if cursor >= column_count {
                break;
            }
            let end = cursor.saturating_add(grid_span(cell)).min(column_count);
            let cell_width: f64 = widths[cursor..end].iter().sum();
            changed |= assign_length(&mut cell.width_cm, cell_width);
            cursor = end;
        }
    }

    // Nested tables depend on the cell widths resolved above.
    let nested_options = LayoutOptions {
        column_weights: None,
        ..options.clone()
    };
    let mut nested = Vec::new();
    for cell in table.cells_mut() {
        let nested_width = match cell.width_cm {
            Some(width) if width > LENGTH_EPSILON => width * NESTED_CELL_RATIO,
            _ => available_width_cm * NESTED_FALLBACK_RATIO,
        };
        for inner in &mut cell.tables {
            let layout = layout_table(inner, nested_width, &nested_options, available_width_cm);
            changed |= layout.changed;
            nested.push(layout);
        }
    }

    TableLayout {
        table_width_cm: target_width_cm,
        column_widths_cm: widths,
        nested,
        changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PropertyElement, Row};

    fn auto() -> LayoutOptions {
        LayoutOptions {
            auto_adjust: true,
            ..LayoutOptions::default()
        }
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn test_local_name_strips_prefixes() {
        assert_eq!(local_name("w:vMerge"), "vMerge");
        assert_eq!(
            local_name("{http://schemas.openxmlformats.org/wordprocessingml/2006/main}gridSpan"),
            "gridSpan"
        );
        assert_eq!(local_name("hMerge"), "hMerge");
    }

    #[test]
    fn test_span_and_merge_detection_ignore_namespace() {
        let mut cell = Cell::new("x");
        assert_eq!(grid_span(&cell), 1);
        cell.properties.push(
            PropertyElement::new("{urn:w}gridSpan").with_attribute("{urn:w}val", "3"),
        );
        assert_eq!(grid_span(&cell), 3);
        assert!(!is_merged_cell(&cell));

        cell.properties.push(PropertyElement::new("x:vMerge"));
        assert!(is_merged_cell(&cell));
    }

    #[test]
    fn test_east_asian_glyphs_count_double() {
        assert_eq!(estimate_text_width("ab"), 2.0);
        assert_eq!(estimate_text_width("表格"), 4.0);
        assert_eq!(estimate_text_width("  a表 "), 3.0);
    }

    #[test]
    fn test_widths_are_conserved() {
        let mut table = Table::from_texts(&[
            &["Name", "Description of the item", "Qty"],
            &["Bolt", "M6", "100"],
        ]);
        let layout = layout_table(&mut table, 15.0, &auto(), 16.0);
        assert_eq!(layout.column_widths_cm.len(), 3);
        assert_close(layout.column_widths_cm.iter().sum(), 15.0);
        assert!(layout.column_widths_cm[1] > layout.column_widths_cm[0]);
        assert_eq!(table.width_cm, Some(15.0));
        assert!(layout.changed);
    }

    #[test]
    fn test_spanning_cell_contributes_half_to_each_column() {
        let mut table = Table::from_texts(&[&["a", "b"]]);
        table.rows.push(Row {
            cells: vec![Cell::spanning("abcdefgh", 2)],
        });
        let weights = column_weights(&table, 2);
        assert_eq!(weights, vec![4.0, 4.0]);
    }

    #[test]
    fn test_empty_table_is_a_no_op() {
        let mut table = Table::default();
        let layout = layout_table(&mut table, 10.0, &auto(), 16.0);
        assert!(layout.column_widths_cm.is_empty());
        assert!(!layout.changed);
        assert_eq!(table.width_cm, None);
    }

    #[test]
    fn test_explicit_weights_win_when_count_matches() {
        let mut table = Table::from_texts(&[&["long long text", "x"]]);
        let options = LayoutOptions {
            column_weights: Some(vec![1.0, 3.0]),
            ..auto()
        };
        let layout = layout_table(&mut table, 8.0, &options, 16.0);
        assert_eq!(layout.column_widths_cm, vec![2.0, 6.0]);

        let mismatched = LayoutOptions {
            column_weights: Some(vec![1.0, 2.0, 3.0]),
            auto_adjust: false,
            alignment: None,
        };
        let layout = layout_table(&mut table, 8.0, &mismatched, 16.0);
        assert_eq!(layout.column_widths_cm, vec![4.0, 4.0]);
    }

    #[test]
    fn test_all_empty_cells_allocate_equally() {
        let mut table = Table::from_texts(&[&["", "", ""]]);
        let layout = layout_table(&mut table, 9.0, &auto(), 16.0);
        assert_eq!(layout.column_widths_cm, vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_nested_table_takes_share_of_cell() {
        let mut table = Table::from_texts(&[&["outer", "outer"]]);
        table.rows[0].cells[0].tables.push(Table::from_texts(&[&["in", "ner"]]));
        let options = LayoutOptions::default();
        let layout = layout_table(&mut table, 10.0, &options, 16.0);
        assert_eq!(layout.nested.len(), 1);
        assert_close(layout.nested[0].table_width_cm, 5.0 * NESTED_CELL_RATIO);
        assert_close(table.rows[0].cells[0].tables[0].width_cm.unwrap(), 4.5);
    }

    #[test]
    fn test_rows_without_cells_are_a_no_op() {
        let mut table = Table {
            rows: vec![Row::default(), Row::default()],
            ..Table::default()
        };
        let layout = layout_table(&mut table, 10.0, &auto(), 16.0);
        assert!(layout.column_widths_cm.is_empty());
        assert!(!layout.changed);
        assert!(table.columns.is_empty());
        assert_eq!(table.width_cm, None);
    }

    #[test]
    fn test_nested_table_in_zero_width_cell_uses_available_width() {
        let mut table = Table::from_texts(&[&["host", "other"]]);
        table.rows[0].cells[0].tables.push(Table::from_texts(&[&["in", "ner"]]));
        let options = LayoutOptions {
            column_weights: Some(vec![0.0, 1.0]),
            ..LayoutOptions::default()
        };
        let layout = layout_table(&mut table, 10.0, &options, 16.0);
        assert_eq!(table.rows[0].cells[0].width_cm, Some(0.0));
        assert_close(layout.nested[0].table_width_cm, 16.0 * NESTED_FALLBACK_RATIO);
        // Explicit weights are not handed down to the nested table
        assert_close(layout.nested[0].column_widths_cm[0], 16.0 * NESTED_FALLBACK_RATIO / 2.0);
    }

    #[test]
    fn test_oversized_span_is_capped() {
        let mut cell = Cell::new("wide");
        cell.properties
            .push(PropertyElement::new("w:gridSpan").with_attribute("w:val", "1000000000000"));
        assert_eq!(grid_span(&cell), MAX_GRID_COLUMNS);

        let mut table = Table {
            rows: vec![Row {
                cells: vec![
                    cell,
                    Cell::spanning("also wide", usize::MAX),
                ],
            }],
            ..Table::default()
        };
        assert_eq!(table.column_count(), MAX_GRID_COLUMNS);

        let layout = layout_table(&mut table, 12.6, &auto(), 16.0);
        assert_eq!(layout.column_widths_cm.len(), MAX_GRID_COLUMNS);
        assert_close(layout.column_widths_cm.iter().sum(), 12.6);
        assert_close(table.rows[0].cells[0].width_cm.unwrap(), 12.6);
    }

    #[test]
    fn test_second_layout_reports_no_change() {
        let mut table = Table::from_texts(&[&["a", "bb"], &["ccc", "d"]]);
        layout_table(&mut table, 12.0, &auto(), 16.0);
        let again = layout_table(&mut table, 12.0, &auto(), 16.0);
        assert!(!again.changed);
    }
}
