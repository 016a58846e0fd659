#![forbid(unsafe_code)]

use crate::problems::AggregatedProblems;
use crate::storage::Column;
use crate::types::{StorageType, Value};

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSchema {
    pub name: String,
    pub column_type: StorageType,
}

/// An immutable table: equally long columns plus the problems found while producing them.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
    problems: AggregatedProblems,
}

impl Table {
    pub fn new(columns: Vec<Column>, problems: AggregatedProblems) -> Self {
        let rows = columns.first().map(Column::len).unwrap_or(0);
        assert!(
            columns.iter().all(|c| c.len() == rows),
            "all table columns must have the same length"
        );
        Self {
            columns,
            rows,
            problems,
        }
    }

    pub fn schema(&self) -> Vec<ColumnSchema> {
        self.columns
            .iter()
            .map(|c| ColumnSchema {
                name: c.name().to_owned(),
                column_type: c.storage_type(),
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.columns.get(col)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn get_cell(&self, row: usize, col: usize) -> Value {
        self.columns
            .get(col)
            .map(|c| c.get(row))
            .unwrap_or(Value::Null)
    }

    pub fn problems(&self) -> &AggregatedProblems {
        &self.problems
    }

    /// Materialize every column as a vector of values (column-major).
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.columns
            .iter()
            .map(|c| c.storage().iter().collect())
            .collect()
    }
}
