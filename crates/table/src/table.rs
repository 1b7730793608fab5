use serde::{Deserialize, Serialize};

use crate::value::{ColumnType, Value};

/// A named column of values with a declared type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column, inferring its declared type from the values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = ColumnType::infer(values.iter());
        Self { name: name.into(), dtype, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Overwrite one value. The declared type is not re-inferred; a column
    /// keeps the type it was built with until rebuilt.
    pub fn set(&mut self, row: usize, value: Value) -> Result<(), String> {
        match self.values.get_mut(row) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(format!("row {} out of bounds for column {:?}", row, self.name)),
        }
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Non-null numeric values, in row order.
    pub fn numbers(&self) -> Vec<f64> {
        self.values.iter().filter_map(Value::as_number).collect()
    }
}

/// A rectangular, column-oriented table. All columns have the same length.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self { columns: Vec::new() }
    }

    /// Build a table from columns, enforcing the rectangular invariant.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, String> {
        if let Some(first) = columns.first() {
            let rows = first.len();
            for col in &columns {
                if col.len() != rows {
                    return Err(format!(
                        "column {:?} has {} rows, expected {}",
                        col.name,
                        col.len(),
                        rows
                    ));
                }
            }
        }

        let mut seen = std::collections::HashSet::new();
        for col in &columns {
            if !seen.insert(col.name.clone()) {
                return Err(format!("duplicate column name {:?}", col.name));
            }
        }

        Ok(Self { columns })
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Columns with a numeric declared type.
    pub fn numeric_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.dtype == ColumnType::Number)
            .collect()
    }

    /// Columns with a non-numeric declared type (bool counts as categorical).
    pub fn categorical_columns(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|c| c.dtype != ColumnType::Number)
            .collect()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column).and_then(|c| c.get(row))
    }

    pub fn set(&mut self, row: usize, column: &str, value: Value) -> Result<(), String> {
        match self.column_mut(column) {
            Some(col) => col.set(row, value),
            None => Err(format!("no such column {:?}", column)),
        }
    }

    /// Append a column. Length must match unless the table is empty.
    pub fn add_column(&mut self, column: Column) -> Result<(), String> {
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(format!(
                "column {:?} has {} rows, table has {}",
                column.name,
                column.len(),
                self.n_rows()
            ));
        }
        if self.column(&column.name).is_some() {
            return Err(format!("duplicate column name {:?}", column.name));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), String> {
        let before = self.columns.len();
        self.columns.retain(|c| c.name != name);
        if self.columns.len() == before {
            return Err(format!("no such column {:?}", name));
        }
        Ok(())
    }

    /// Keep only rows whose mask entry is true. Mask length must match.
    pub fn retain_rows(&mut self, keep: &[bool]) -> Result<(), String> {
        if keep.len() != self.n_rows() {
            return Err(format!(
                "mask has {} entries, table has {} rows",
                keep.len(),
                self.n_rows()
            ));
        }
        for col in &mut self.columns {
            let mut row = 0;
            col.values.retain(|_| {
                let kept = keep[row];
                row += 1;
                kept
            });
        }
        Ok(())
    }

    /// Stable sort of all rows by one column.
    pub fn sort_by(&mut self, column: &str, descending: bool) -> Result<(), String> {
        let col = self
            .column(column)
            .ok_or_else(|| format!("no such column {:?}", column))?;

        let mut order: Vec<usize> = (0..self.n_rows()).collect();
        let keys = col.values.clone();
        order.sort_by(|&a, &b| {
            let ord = keys[a].cmp_for_sort(&keys[b]);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });

        for col in &mut self.columns {
            col.values = order.iter().map(|&i| col.values[i].clone()).collect();
        }
        Ok(())
    }

    /// Truncate to the first n rows.
    pub fn head_rows(&mut self, n: usize) {
        for col in &mut self.columns {
            col.values.truncate(n);
        }
    }

    /// Row range as JSON records (column name -> value), in column order.
    pub fn records(&self, range: std::ops::Range<usize>) -> Vec<serde_json::Map<String, serde_json::Value>> {
        let end = range.end.min(self.n_rows());
        let start = range.start.min(end);

        (start..end)
            .map(|row| {
                let mut record = serde_json::Map::new();
                for col in &self.columns {
                    record.insert(col.name.clone(), col.values[row].to_json());
                }
                record
            })
            .collect()
    }

    /// Approximate memory footprint in bytes.
    pub fn mem_estimate(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.name.len() + c.values.iter().map(Value::mem_size).sum::<usize>())
            .sum()
    }

    /// One-line description, used when a table must be stringified.
    pub fn brief(&self) -> String {
        format!("<table {}x{}>", self.n_rows(), self.n_cols())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_table() -> Table {
        Table::from_columns(vec![
            Column::new(
                "a",
                vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)],
            ),
            Column::new(
                "b",
                vec![
                    Value::Text("x".into()),
                    Value::Text("y".into()),
                    Value::Text("z".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_from_columns_rejects_ragged() {
        let result = Table::from_columns(vec![
            Column::new("a", vec![Value::Number(1.0)]),
            Column::new("b", vec![]),
        ]);
        assert!(result.is_err(), "ragged columns must be rejected");
    }

    #[test]
    fn test_from_columns_rejects_duplicate_names() {
        let result = Table::from_columns(vec![
            Column::new("a", vec![Value::Number(1.0)]),
            Column::new("a", vec![Value::Number(2.0)]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_shape_and_lookup() {
        let table = sample_table();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.get(1, "a"), Some(&Value::Number(2.0)));
        assert_eq!(table.get(5, "a"), None);
        assert!(table.column("missing").is_none());
    }

    #[test]
    fn test_numeric_categorical_partition() {
        let table = sample_table();
        assert_eq!(table.numeric_columns().len(), 1);
        assert_eq!(table.categorical_columns().len(), 1);
    }

    #[test]
    fn test_retain_rows() {
        let mut table = sample_table();
        table.retain_rows(&[true, false, true]).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.get(1, "b"), Some(&Value::Text("z".into())));

        // Wrong-sized mask is an error, table untouched
        assert!(table.retain_rows(&[true]).is_err());
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_sort_by_descending() {
        let mut table = sample_table();
        table.sort_by("a", true).unwrap();
        assert_eq!(table.get(0, "a"), Some(&Value::Number(3.0)));
        assert_eq!(table.get(0, "b"), Some(&Value::Text("z".into())));
    }

    #[test]
    fn test_add_and_drop_column() {
        let mut table = sample_table();
        table
            .add_column(Column::new(
                "c",
                vec![Value::Bool(true), Value::Bool(false), Value::Null],
            ))
            .unwrap();
        assert_eq!(table.n_cols(), 3);

        // Length mismatch rejected
        assert!(table.add_column(Column::new("d", vec![Value::Null])).is_err());

        table.drop_column("c").unwrap();
        assert_eq!(table.n_cols(), 2);
        assert!(table.drop_column("c").is_err());
    }

    #[test]
    fn test_records_row_range() {
        let table = sample_table();
        let records = table.records(0..2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], serde_json::json!(1.0));
        assert_eq!(records[1]["b"], serde_json::json!("y"));

        // Range past the end clamps
        assert_eq!(table.records(2..10).len(), 1);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new();
        assert_eq!(table.n_rows(), 0);
        assert_eq!(table.n_cols(), 0);
        assert!(table.records(0..5).is_empty());
    }
}
