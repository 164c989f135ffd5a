//! In-memory table shared by every pipeline stage.
//!
//! A [`Frame`] is an ordered list of column names plus rows of optional
//! [`Value`] cells. The raw source table, the standardized dataset and each
//! filtered view are all frames; stages produce new frames instead of
//! mutating the one they were given.

use anyhow::{Result, ensure};

use crate::data::Value;

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "Row has {} cell(s) but the table has {} column(s)",
            row.len(),
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Index of the first column named `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cells of column `name`, top to bottom, or `None` if the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&Value>> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    pub(crate) fn column_cells_mut(
        &mut self,
        idx: usize,
    ) -> impl Iterator<Item = &mut Option<Value>> + '_ {
        self.rows.iter_mut().map(move |row| &mut row[idx])
    }

    pub(crate) fn rename_column(&mut self, idx: usize, name: &str) {
        if let Some(slot) = self.columns.get_mut(idx) {
            *slot = name.to_string();
        }
    }

    /// Sum of the numeric cells of `name`; `None` when the column is absent.
    pub fn sum(&self, name: &str) -> Option<f64> {
        self.column(name)
            .map(|cells| cells.flatten().filter_map(Value::as_number).sum())
    }

    /// Share of missing cells in column `idx`; `None` for an empty table.
    pub fn missing_fraction(&self, idx: usize) -> Option<f64> {
        if self.rows.is_empty() || idx >= self.columns.len() {
            return None;
        }
        let missing = self.rows.iter().filter(|row| row[idx].is_none()).count();
        Some(missing as f64 / self.rows.len() as f64)
    }

    /// New frame with the same columns, keeping rows accepted by `keep`.
    pub fn filter_rows<F>(&self, mut keep: F) -> Frame
    where
        F: FnMut(&[Option<Value>]) -> bool,
    {
        Frame {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row.as_slice()))
                .cloned()
                .collect(),
        }
    }

    pub fn head(&self, count: usize) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(count).cloned().collect(),
        }
    }

    /// Rows rendered as display strings, missing cells as empty strings.
    pub fn display_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_rows(
            vec!["region".into(), "revenue".into()],
            vec![
                vec![Some(Value::Text("North".into())), Some(Value::Number(10.0))],
                vec![Some(Value::Text("South".into())), None],
                vec![None, Some(Value::Number(5.5))],
            ],
        )
        .expect("frame")
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut frame = Frame::new(vec!["a".into()]);
        assert!(frame.push_row(vec![None, None]).is_err());
        assert!(frame.push_row(vec![None]).is_ok());
    }

    #[test]
    fn sum_skips_missing_cells_and_absent_columns() {
        let frame = sample();
        assert_eq!(frame.sum("revenue"), Some(15.5));
        assert_eq!(frame.sum("cost"), None);
    }

    #[test]
    fn missing_fraction_counts_none_cells() {
        let frame = sample();
        let fraction = frame.missing_fraction(1).unwrap();
        assert!((fraction - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(Frame::new(vec!["a".into()]).missing_fraction(0), None);
    }

    #[test]
    fn filter_rows_keeps_schema() {
        let frame = sample();
        let filtered = frame.filter_rows(|row| row[1].is_some());
        assert_eq!(filtered.columns(), frame.columns());
        assert_eq!(filtered.len(), 2);
    }
}
