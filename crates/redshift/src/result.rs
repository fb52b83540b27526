use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use redquery_core::{FieldValue, NULL_MARKER};

use crate::error::RedshiftError;
use crate::types::ColumnDescriptor;

/// One result row keyed by column name, in column order.
pub type Record = IndexMap<String, FieldValue>;

/// Materialized result set of a finished statement.
///
/// Each inner row has the same length as `columns`, and rows keep the order
/// the service returned them in. Deserialization goes through
/// [`ResultTable::new`], so the width check applies there too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResultTable")]
pub struct ResultTable {
    statement_id: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<FieldValue>>,
}

#[derive(Deserialize)]
struct RawResultTable {
    statement_id: String,
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<FieldValue>>,
}

impl TryFrom<RawResultTable> for ResultTable {
    type Error = RedshiftError;

    fn try_from(raw: RawResultTable) -> Result<Self, Self::Error> {
        ResultTable::new(raw.statement_id, raw.columns, raw.rows)
    }
}

impl ResultTable {
    /// Build a table, rejecting rows whose width differs from the column count.
    pub fn new(
        statement_id: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
        rows: Vec<Vec<FieldValue>>,
    ) -> Result<Self, RedshiftError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(RedshiftError::MalformedResult(format!(
                "row {} has {} fields, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self {
            statement_id: statement_id.into(),
            columns,
            rows,
        })
    }

    /// Table for a statement that produced no result set (DDL / DML).
    pub fn empty(statement_id: impl Into<String>) -> Self {
        Self {
            statement_id: statement_id.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn statement_id(&self) -> &str {
        &self.statement_id
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Zero-based index of a column by name (case-sensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at `row` / `col`; `None` when either is out of range.
    pub fn get(&self, row: usize, col: &str) -> Option<&FieldValue> {
        let col_idx = self.column_index(col)?;
        self.rows.get(row)?.get(col_idx)
    }

    /// Keys used for record maps: the column name, with `_2`, `_3`, ...
    /// appended to repeated names so every column keeps its own field.
    pub fn record_keys(&self) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::with_capacity(self.columns.len());
        self.columns
            .iter()
            .map(|col| {
                let mut key = col.name.clone();
                let mut n = 2;
                while !seen.insert(key.clone()) {
                    key = format!("{}_{}", col.name, n);
                    n += 1;
                }
                key
            })
            .collect()
    }

    /// Rows as ordered column-name → value maps.
    pub fn records(&self) -> Vec<Record> {
        self.map_rows(|value| value.clone())
    }

    /// Rows as column-name → text maps (`NULL` marker for nulls).
    pub fn text_records(&self) -> Vec<IndexMap<String, String>> {
        self.map_rows(FieldValue::as_text)
    }

    fn map_rows<T>(&self, convert: impl Fn(&FieldValue) -> T) -> Vec<IndexMap<String, T>> {
        let keys = self.record_keys();
        self.rows
            .iter()
            .map(|row| keys.iter().cloned().zip(row.iter().map(&convert)).collect())
            .collect()
    }

    /// Pretty-printed JSON array of row objects with text values.
    pub fn to_json(&self) -> Result<String, RedshiftError> {
        Ok(serde_json::to_string_pretty(&self.text_records())?)
    }

    /// Pretty-printed JSON array of row objects with native JSON types.
    pub fn to_typed_json(&self) -> Result<String, RedshiftError> {
        let rows = self.map_rows(FieldValue::to_json_value);
        Ok(serde_json::to_string_pretty(&rows)?)
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "(empty result set)");
        }

        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(FieldValue::as_text).collect())
            .collect();

        // Column widths (minimum = header length).
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.name.len()).collect();
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{:<width$}", col.name, width = widths[i])?;
        }
        writeln!(f)?;

        for (i, w) in widths.iter().enumerate() {
            if i > 0 {
                write!(f, "-+-")?;
            }
            write!(f, "{}", "-".repeat(*w))?;
        }
        writeln!(f)?;

        for row in &cells {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                if i > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{:<width$}", cell, width = widths[i])?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        write!(
            f,
            "Statement {} | {} rows",
            self.statement_id,
            self.rows.len()
        )
    }
}
