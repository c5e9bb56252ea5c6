//! Tabular input for training.
//!
//! A [`Table`] is a list of named columns in file order. Each column is typed
//! once, at load time: numeric when every cell parses as a float, text
//! otherwise. The data preparer relies on that storage type to decide whether
//! a categorical column still needs encoding.
//!
//! # Example
//!
//! ```
//! use calories_predictor::dataset::Table;
//!
//! let csv = "User_ID,Gender,Age\n1,male,20\n2,female,30\n";
//! let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
//! assert_eq!(table.column_names(), vec!["User_ID", "Gender", "Age"]);
//! assert_eq!(table.n_rows(), 2);
//! ```

use crate::error::{CaloriesError, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Storage of a single column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(values) => values.len(),
            ColumnData::Text(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_text(&self) -> bool {
        matches!(self, ColumnData::Text(_))
    }

    /// Cell rendered as a join key. Integral floats print without a fraction.
    fn key_at(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(values) => values[row].to_string(),
            ColumnData::Text(values) => values[row].clone(),
        }
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&r| values[r]).collect())
            }
            ColumnData::Text(values) => {
                ColumnData::Text(rows.iter().map(|&r| values[r].clone()).collect())
            }
        }
    }

    fn from_cells(cells: Vec<String>) -> ColumnData {
        let parsed: Option<Vec<f64>> = cells
            .iter()
            .map(|cell| cell.trim().parse::<f64>().ok())
            .collect();
        match parsed {
            Some(values) if !cells.is_empty() => ColumnData::Numeric(values),
            _ => ColumnData::Text(cells),
        }
    }
}

/// A named column.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: &str, values: Vec<&str>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Text(values.into_iter().map(String::from).collect()),
        }
    }
}

/// Ordered collection of equally long columns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table, checking that names are unique and lengths agree.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let n_rows = first.data.len();
            if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
                return Err(CaloriesError::InvalidParameter(format!(
                    "column {} has {} rows, expected {}",
                    bad.name,
                    bad.data.len(),
                    n_rows
                )));
            }
        }
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CaloriesError::InvalidParameter(format!(
                    "duplicate column name {}",
                    column.name
                )));
            }
        }
        Ok(Self { columns })
    }

    /// Load a CSV file with a header row.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(BufReader::new(file))
    }

    /// Parse CSV from any reader with a header row.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for result in rdr.records() {
            let record = result?;
            for (col, value) in record.iter().enumerate() {
                if let Some(column) = cells.get_mut(col) {
                    column.push(value.to_string());
                }
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| Column {
                name,
                data: ColumnData::from_cells(values),
            })
            .collect();
        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len()).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Replace the storage of an existing column.
    pub fn replace_column(&mut self, name: &str, data: ColumnData) -> Result<()> {
        let n_rows = self.n_rows();
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| CaloriesError::MissingField(name.to_string()))?;
        if data.len() != n_rows {
            return Err(CaloriesError::InvalidParameter(format!(
                "replacement for {} has {} rows, expected {}",
                name,
                data.len(),
                n_rows
            )));
        }
        column.data = data;
        Ok(())
    }

    /// Remove a column if present; returns whether it existed.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c.name != name);
        self.columns.len() != before
    }

    /// Inner join on `key`.
    ///
    /// Left row order is preserved; each left row is followed by its right
    /// matches in right order. The key column appears once. Other columns
    /// present on both sides get `_x` / `_y` suffixes.
    pub fn inner_join(&self, other: &Table, key: &str) -> Result<Table> {
        let missing: Vec<String> = [(self, "left"), (other, "right")]
            .iter()
            .filter(|(table, _)| !table.has_column(key))
            .map(|(_, side)| format!("{} ({} table)", key, side))
            .collect();
        if !missing.is_empty() {
            let mut present: Vec<String> =
                self.column_names().iter().map(|s| s.to_string()).collect();
            present.extend(other.column_names().iter().map(|s| s.to_string()));
            return Err(CaloriesError::Schema { missing, present });
        }

        let left_key = self.column(key).map(|c| &c.data);
        let right_key = other.column(key).map(|c| &c.data);
        let (Some(left_key), Some(right_key)) = (left_key, right_key) else {
            return Err(CaloriesError::MissingField(key.to_string()));
        };

        let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
        for row in 0..other.n_rows() {
            right_index.entry(right_key.key_at(row)).or_default().push(row);
        }

        let mut left_rows = Vec::new();
        let mut right_rows = Vec::new();
        for row in 0..self.n_rows() {
            if let Some(matches) = right_index.get(&left_key.key_at(row)) {
                for &r in matches {
                    left_rows.push(row);
                    right_rows.push(r);
                }
            }
        }

        let shared = |name: &str| name != key && self.has_column(name) && other.has_column(name);
        let mut columns = Vec::with_capacity(self.n_columns() + other.n_columns() - 1);
        for column in &self.columns {
            let name = if shared(&column.name) {
                format!("{}_x", column.name)
            } else {
                column.name.clone()
            };
            columns.push(Column {
                name,
                data: column.data.select(&left_rows),
            });
        }
        for column in other.columns.iter().filter(|c| c.name != key) {
            let name = if shared(&column.name) {
                format!("{}_y", column.name)
            } else {
                column.name.clone()
            };
            columns.push(Column {
                name,
                data: column.data.select(&right_rows),
            });
        }
        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_column_types() {
        let csv = "User_ID,Gender,Age,Body_Temp\n10,male,68,40.8\n11,female,20,39.2\n";
        let table = Table::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.n_rows(), 2);
        assert!(table.column("Gender").unwrap().data.is_text());
        assert_eq!(
            table.column("Body_Temp").unwrap().data,
            ColumnData::Numeric(vec![40.8, 39.2])
        );
    }

    #[test]
    fn test_csv_mixed_column_is_text() {
        let csv = "A\n1\nx\n";
        let table = Table::from_csv_reader(csv.as_bytes()).unwrap();
        assert!(table.column("A").unwrap().data.is_text());
    }

    #[test]
    fn test_csv_ragged_rows_error() {
        let csv = "A,B\n1,2\n3\n";
        assert!(Table::from_csv_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_new_rejects_unequal_lengths() {
        let result = Table::new(vec![
            Column::numeric("A", vec![1.0, 2.0]),
            Column::numeric("B", vec![1.0]),
        ]);
        assert!(matches!(result, Err(CaloriesError::InvalidParameter(_))));
    }

    #[test]
    fn test_new_rejects_duplicate_names() {
        let result = Table::new(vec![
            Column::numeric("A", vec![1.0]),
            Column::numeric("A", vec![2.0]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_drop_column() {
        let mut table = Table::new(vec![
            Column::numeric("A", vec![1.0]),
            Column::numeric("B", vec![2.0]),
        ])
        .unwrap();
        assert!(table.drop_column("A"));
        assert!(!table.drop_column("A"));
        assert_eq!(table.column_names(), vec!["B"]);
    }

    #[test]
    fn test_inner_join_keeps_left_order_and_drops_unmatched() {
        let calories = Table::new(vec![
            Column::numeric("User_ID", vec![3.0, 1.0, 2.0]),
            Column::numeric("Calories", vec![30.0, 10.0, 20.0]),
        ])
        .unwrap();
        let exercise = Table::new(vec![
            Column::numeric("User_ID", vec![1.0, 3.0, 4.0]),
            Column::text("Gender", vec!["male", "female", "male"]),
        ])
        .unwrap();

        let merged = calories.inner_join(&exercise, "User_ID").unwrap();
        assert_eq!(merged.column_names(), vec!["User_ID", "Calories", "Gender"]);
        assert_eq!(
            merged.column("User_ID").unwrap().data,
            ColumnData::Numeric(vec![3.0, 1.0])
        );
        assert_eq!(
            merged.column("Gender").unwrap().data,
            ColumnData::Text(vec!["female".into(), "male".into()])
        );
    }

    #[test]
    fn test_inner_join_suffixes_shared_columns() {
        let left = Table::new(vec![
            Column::numeric("User_ID", vec![1.0]),
            Column::numeric("Age", vec![20.0]),
        ])
        .unwrap();
        let right = Table::new(vec![
            Column::numeric("User_ID", vec![1.0]),
            Column::numeric("Age", vec![21.0]),
        ])
        .unwrap();

        let merged = left.inner_join(&right, "User_ID").unwrap();
        assert_eq!(merged.column_names(), vec!["User_ID", "Age_x", "Age_y"]);
    }

    #[test]
    fn test_inner_join_missing_key() {
        let left = Table::new(vec![Column::numeric("User_ID", vec![1.0])]).unwrap();
        let right = Table::new(vec![Column::numeric("Id", vec![1.0])]).unwrap();

        let result = left.inner_join(&right, "User_ID");
        assert!(matches!(result, Err(CaloriesError::Schema { .. })));
    }

    #[test]
    fn test_replace_column_length_checked() {
        let mut table = Table::new(vec![Column::numeric("A", vec![1.0, 2.0])]).unwrap();
        assert!(table
            .replace_column("A", ColumnData::Numeric(vec![1.0]))
            .is_err());
        assert!(table
            .replace_column("A", ColumnData::Numeric(vec![5.0, 6.0]))
            .is_ok());
    }
}
