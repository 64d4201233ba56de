//! Plain-text table rendering for previews and plans.

use std::borrow::Cow;
use std::fmt::Write as _;

use serde::Serialize;

use crate::core::value::Sample;
use crate::source::Dataset;

/// Text shown for NULL cells.
pub const NULL_DISPLAY: &str = "NULL";

/// First rows of a dataset or table, as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TablePreview {
    /// Preview of the first `limit` dataset rows; empty cells are NULL.
    pub fn from_dataset(dataset: &Dataset, limit: usize) -> Self {
        Self {
            columns: dataset.columns.clone(),
            rows: dataset
                .head(limit)
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|cell| (!cell.is_empty()).then(|| cell.clone()))
                        .collect()
                })
                .collect(),
        }
    }

    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            columns: sample.columns.clone(),
            rows: sample.to_text_rows(),
        }
    }

    pub fn render(&self) -> String {
        render_table(&self.columns, &self.rows)
    }
}

/// Render rows under aligned headers. `None` cells print as [`NULL_DISPLAY`].
pub fn render_table(headers: &[String], rows: &[Vec<Option<String>>]) -> String {
    let rows: Vec<Vec<&str>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.as_deref().unwrap_or(NULL_DISPLAY))
                .collect()
        })
        .collect();

    let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }

    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let separator: Vec<&str> = separator.iter().map(String::as_str).collect();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));

    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }

    output
}

fn format_row(values: &[&str], widths: &[usize]) -> String {
    let mut cells = Vec::with_capacity(values.len());
    for (value, width) in values.iter().zip(widths) {
        let sanitized = sanitize_cell(value);
        let padding = width.saturating_sub(display_width(&sanitized));
        let mut cell = sanitized.into_owned();
        cell.push_str(&" ".repeat(padding));
        cells.push(cell);
    }
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_columns() {
        let headers = vec!["id".to_string(), "phone".to_string()];
        let rows = vec![
            vec![Some("1".to_string()), Some("05551234".to_string())],
            vec![Some("22".to_string()), None],
        ];
        let rendered = render_table(&headers, &rows);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id   phone");
        assert_eq!(lines[1], "---  --------");
        assert_eq!(lines[2], "1    05551234");
        assert_eq!(lines[3], "22   NULL");
    }

    #[test]
    fn test_dataset_preview_shows_empty_as_null() {
        let dataset = Dataset::new(
            vec!["a".to_string()],
            vec![vec![String::new()], vec!["x".to_string()], vec!["y".to_string()]],
        );
        let preview = TablePreview::from_dataset(&dataset, 2);
        assert_eq!(preview.rows, vec![vec![None], vec![Some("x".to_string())]]);
        assert!(preview.render().lines().nth(2).unwrap().contains("NULL"));
    }

    #[test]
    fn test_newlines_are_flattened() {
        let rendered = render_table(&["a".to_string()], &[vec![Some("x\ny".to_string())]]);
        assert_eq!(rendered.lines().count(), 3);
    }
}
