//! Columnar table materialization
//!
//! Converts a fetched record set into a column-oriented [`Table`], with
//! optional column renaming and projection applied at finalize time. Values
//! keep their JSON types untouched; nested objects stay nested unless
//! explicitly flattened.

use crate::error::{Error, Result};
use crate::types::{JsonValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A record set materialized into columns.
///
/// The column set is the union of keys seen across the records, in first-seen
/// order; records missing a column hold `null` (sparse values). Row order is
/// the order records were supplied in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
}

impl Table {
    /// Create an explicitly-empty table: zero rows, zero columns
    pub fn empty() -> Self {
        Self::default()
    }

    /// Materialize records into columns.
    ///
    /// Zero records yield an explicitly-empty table rather than an error.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|column| record.remove(column).unwrap_or(JsonValue::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when the table has a column with the given name
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Iterate rows in order
    pub fn rows(&self) -> impl Iterator<Item = &[JsonValue]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Value at the given row and column, if both exist
    pub fn value(&self, row: usize, column: &str) -> Option<&JsonValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&JsonValue>> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| Error::missing_column(name))?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Rename columns according to the given mapping; unknown keys are ignored
    pub fn rename(mut self, mapping: &HashMap<String, String>) -> Self {
        for column in &mut self.columns {
            if let Some(new_name) = mapping.get(column) {
                *column = new_name.clone();
            }
        }
        self
    }

    /// Project onto the requested columns, dropping the rest.
    ///
    /// Requesting a column absent from the table is a caller error.
    pub fn select(self, columns: &[String]) -> Result<Self> {
        let indices: Vec<usize> = columns
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| Error::missing_column(name))
            })
            .collect::<Result<_>>()?;

        let rows = self
            .rows
            .into_iter()
            .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
            .collect();

        Ok(Self {
            columns: columns.to_vec(),
            rows,
        })
    }

    /// Promote one nested-object column's keys into top-level columns.
    ///
    /// The new columns are named `{prefix}.{key}` (the prefix defaults to the
    /// column name), appended after the existing columns, and the original
    /// column is removed. Rows whose value is not an object contribute nulls.
    /// An empty table passes through unchanged.
    pub fn flatten(self, column: &str, prefix: Option<&str>) -> Result<Self> {
        if self.is_empty() {
            return Ok(self);
        }
        let idx = self
            .column_index(column)
            .ok_or_else(|| Error::missing_column(column))?;
        let prefix = prefix.unwrap_or(column);

        let mut keys: Vec<String> = Vec::new();
        for row in &self.rows {
            if let JsonValue::Object(obj) = &row[idx] {
                for key in obj.keys() {
                    if !keys.iter().any(|k| k == key) {
                        keys.push(key.clone());
                    }
                }
            }
        }

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != idx)
            .map(|(_, name)| name.clone())
            .collect();
        columns.extend(keys.iter().map(|key| format!("{prefix}.{key}")));

        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                let nested = row.remove(idx);
                match nested {
                    JsonValue::Object(mut obj) => {
                        row.extend(keys.iter().map(|key| obj.remove(key).unwrap_or(JsonValue::Null)));
                    }
                    _ => row.extend(keys.iter().map(|_| JsonValue::Null)),
                }
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Materialize records and apply finalize-time shaping.
///
/// Rename is applied before projection, so projection columns are named in
/// post-rename terms. Zero records short-circuit to an explicitly-empty table
/// with no shaping applied.
pub fn materialize(
    records: Vec<Record>,
    columns: Option<&[String]>,
    rename: Option<&HashMap<String, String>>,
) -> Result<Table> {
    if records.is_empty() {
        return Ok(Table::empty());
    }
    let mut table = Table::from_records(records);
    if let Some(mapping) = rename {
        table = table.rename(mapping);
    }
    if let Some(columns) = columns {
        table = table.select(columns)?;
    }
    Ok(table)
}
