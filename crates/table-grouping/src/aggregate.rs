//! Per-output-column aggregations driven by [`crate::MultiValueIndex::make_table`].

use crate::error::AggregateError;
use crate::folding::TextFoldingStrategy;
use crate::key::{GroupKey, UnorderedKey};
use crate::ordering::{DefaultComparator, ValueComparator};
use ahash::RandomState;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use table_columnar::{
    coerce_to_double, AggregatedProblems, Column, Problem, StorageType, Value,
};

/// Computes one output value per group.
///
/// `aggregate` is called once per group with the group's row indices (in scan order). Data-quality
/// issues are recorded in the aggregator's own problems; `Err` is reserved for fatal failures.
pub trait Aggregator {
    /// Name of the output column.
    fn name(&self) -> &str;

    fn output_type(&self) -> StorageType;

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError>;

    fn problems(&self) -> AggregatedProblems {
        AggregatedProblems::new()
    }

    /// Forget state left by an earlier run. Called once before the first group of every
    /// [`crate::MultiValueIndex::make_table`].
    fn reset(&mut self) {}
}

fn unsupported(aggregator: &str, column: &Column) -> AggregateError {
    AggregateError::UnsupportedColumnType {
        aggregator: aggregator.to_owned(),
        column: column.name().to_owned(),
        storage_type: column.storage_type(),
    }
}

fn numeric_column(aggregator: &str, column: &Column) -> Result<(), AggregateError> {
    match column.storage_type() {
        StorageType::Integer(_) | StorageType::Float | StorageType::Mixed => Ok(()),
        _ => Err(unsupported(aggregator, column)),
    }
}

/// The key column value of the group (taken from its first row).
#[derive(Debug, Clone)]
pub struct GroupBy {
    name: String,
    column: Column,
}

impl GroupBy {
    pub fn new(column: Column) -> Self {
        Self {
            name: column.name().to_owned(),
            column,
        }
    }

    pub fn named(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

impl Aggregator for GroupBy {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        self.column.storage_type()
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(rows
            .first()
            .map(|&row| self.column.get(row))
            .unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
pub struct Count {
    name: String,
}

impl Count {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Aggregator for Count {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::INT_64
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(Value::Integer(rows.len() as i64))
    }
}

fn count_missing(column: &Column, rows: &[usize]) -> usize {
    let storage = column.storage();
    rows.iter().filter(|&&row| storage.is_missing(row)).count()
}

#[derive(Debug, Clone)]
pub struct CountMissing {
    name: String,
    column: Column,
}

impl CountMissing {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

impl Aggregator for CountMissing {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::INT_64
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(Value::Integer(count_missing(&self.column, rows) as i64))
    }
}

#[derive(Debug, Clone)]
pub struct CountPresent {
    name: String,
    column: Column,
}

impl CountPresent {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

impl Aggregator for CountPresent {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::INT_64
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(Value::Integer(
            (rows.len() - count_missing(&self.column, rows)) as i64,
        ))
    }
}

/// Number of distinct composite values of `columns` within the group.
#[derive(Debug, Clone)]
pub struct CountDistinct {
    name: String,
    columns: Vec<Column>,
    folding: Arc<[TextFoldingStrategy]>,
    ignore_all_missing: bool,
    problems: AggregatedProblems,
}

impl CountDistinct {
    pub fn new(
        name: impl Into<String>,
        columns: Vec<Column>,
        folding: TextFoldingStrategy,
        ignore_all_missing: bool,
    ) -> Self {
        let folding = vec![folding; columns.len()].into();
        Self {
            name: name.into(),
            columns,
            folding,
            ignore_all_missing,
            problems: AggregatedProblems::new(),
        }
    }
}

impl Aggregator for CountDistinct {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::INT_64
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        let mut seen: HashSet<UnorderedKey, RandomState> = HashSet::default();
        for &row in rows {
            let key = UnorderedKey::new(&self.columns, row, &self.folding);
            if self.ignore_all_missing && key.is_all_null() {
                continue;
            }
            for &column in key.float_column_positions() {
                self.problems.add(Problem::FloatingPointGrouping {
                    column: self.columns[column].name().to_owned(),
                    row,
                });
            }
            seen.insert(key);
        }
        Ok(Value::Integer(seen.len() as i64))
    }

    fn problems(&self) -> AggregatedProblems {
        self.problems.clone()
    }

    fn reset(&mut self) {
        self.problems = AggregatedProblems::with_sample_limit(self.problems.sample_limit());
    }
}

enum NumericTotal {
    Integer(i128),
    Float(f64),
}

/// Sum the non-missing values of `rows`; `None` when every value is missing.
fn numeric_total(
    aggregator: &str,
    column: &Column,
    rows: &[usize],
) -> Result<Option<(NumericTotal, usize)>, AggregateError> {
    let storage = column.storage();
    let mut present = 0usize;

    if let StorageType::Integer(_) = storage.storage_type() {
        let mut total: i128 = 0;
        for &row in rows {
            if let Some(v) = storage.get_long(row) {
                total += v as i128;
                present += 1;
            }
        }
        return Ok((present > 0).then_some((NumericTotal::Integer(total), present)));
    }

    let mut total = 0.0f64;
    if let StorageType::Float = storage.storage_type() {
        for x in rows.iter().filter_map(|&row| storage.get_double(row)) {
            total += x;
            present += 1;
        }
        return Ok((present > 0).then_some((NumericTotal::Float(total), present)));
    }

    for &row in rows {
        let value = storage.get(row);
        if value.is_null() {
            continue;
        }
        let x = coerce_to_double(&value).ok_or_else(|| AggregateError::TypeMismatch {
            aggregator: aggregator.to_owned(),
            expected: "a number",
            value: value.clone(),
        })?;
        total += x;
        present += 1;
    }
    Ok((present > 0).then_some((NumericTotal::Float(total), present)))
}

#[derive(Debug, Clone)]
pub struct Sum {
    name: String,
    column: Column,
    problems: AggregatedProblems,
}

impl Sum {
    pub fn new(name: impl Into<String>, column: Column) -> Result<Self, AggregateError> {
        let name = name.into();
        numeric_column(&name, &column)?;
        Ok(Self {
            name,
            column,
            problems: AggregatedProblems::new(),
        })
    }
}

impl Aggregator for Sum {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        match self.column.storage_type() {
            StorageType::Integer(_) => StorageType::INT_64,
            _ => StorageType::Float,
        }
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        match numeric_total(&self.name, &self.column, rows)? {
            None => Ok(Value::Null),
            Some((NumericTotal::Float(total), _)) => Ok(Value::Float(total)),
            Some((NumericTotal::Integer(total), _)) => match i64::try_from(total) {
                Ok(v) => Ok(Value::Integer(v)),
                Err(_) => {
                    self.problems.add(Problem::ArithmeticOverflow {
                        column: self.column.name().to_owned(),
                    });
                    Ok(Value::Null)
                }
            },
        }
    }

    fn problems(&self) -> AggregatedProblems {
        self.problems.clone()
    }

    fn reset(&mut self) {
        self.problems = AggregatedProblems::with_sample_limit(self.problems.sample_limit());
    }
}

#[derive(Debug, Clone)]
pub struct Average {
    name: String,
    column: Column,
}

impl Average {
    pub fn new(name: impl Into<String>, column: Column) -> Result<Self, AggregateError> {
        let name = name.into();
        numeric_column(&name, &column)?;
        Ok(Self { name, column })
    }
}

impl Aggregator for Average {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::Float
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(match numeric_total(&self.name, &self.column, rows)? {
            None => Value::Null,
            Some((NumericTotal::Integer(total), n)) => Value::Float(total as f64 / n as f64),
            Some((NumericTotal::Float(total), n)) => Value::Float(total / n as f64),
        })
    }
}

/// The non-missing value that sorts furthest towards `wanted`.
fn extremum(column: &Column, rows: &[usize], wanted: Ordering) -> Value {
    let comparator = DefaultComparator::default();
    let mut best = Value::Null;
    for &row in rows {
        let value = column.get(row);
        if value.is_null() {
            continue;
        }
        if best.is_null() || comparator.compare(&value, &best) == wanted {
            best = value;
        }
    }
    best
}

#[derive(Debug, Clone)]
pub struct Minimum {
    name: String,
    column: Column,
}

impl Minimum {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

impl Aggregator for Minimum {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        self.column.storage_type()
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(extremum(&self.column, rows, Ordering::Less))
    }
}

#[derive(Debug, Clone)]
pub struct Maximum {
    name: String,
    column: Column,
}

impl Maximum {
    pub fn new(name: impl Into<String>, column: Column) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }
}

impl Aggregator for Maximum {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        self.column.storage_type()
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(extremum(&self.column, rows, Ordering::Greater))
    }
}

fn pick<'a>(
    column: &Column,
    mut rows: impl Iterator<Item = &'a usize>,
    skip_missing: bool,
) -> Value {
    let found = if skip_missing {
        rows.find(|&&row| !column.storage().is_missing(row))
    } else {
        rows.next()
    };
    found.map(|&row| column.get(row)).unwrap_or(Value::Null)
}

#[derive(Debug, Clone)]
pub struct First {
    name: String,
    column: Column,
    skip_missing: bool,
}

impl First {
    pub fn new(name: impl Into<String>, column: Column, skip_missing: bool) -> Self {
        Self {
            name: name.into(),
            column,
            skip_missing,
        }
    }
}

impl Aggregator for First {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        self.column.storage_type()
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(pick(&self.column, rows.iter(), self.skip_missing))
    }
}

#[derive(Debug, Clone)]
pub struct Last {
    name: String,
    column: Column,
    skip_missing: bool,
}

impl Last {
    pub fn new(name: impl Into<String>, column: Column, skip_missing: bool) -> Self {
        Self {
            name: name.into(),
            column,
            skip_missing,
        }
    }
}

impl Aggregator for Last {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        self.column.storage_type()
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        Ok(pick(&self.column, rows.iter().rev(), self.skip_missing))
    }
}

/// Joins the group's values into one text value.
#[derive(Debug, Clone)]
pub struct Concatenate {
    name: String,
    column: Column,
    separator: String,
    prefix: String,
    suffix: String,
    quote: Option<char>,
    problems: AggregatedProblems,
}

impl Concatenate {
    pub fn new(name: impl Into<String>, column: Column, separator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column,
            separator: separator.into(),
            prefix: String::new(),
            suffix: String::new(),
            quote: None,
            problems: AggregatedProblems::new(),
        }
    }

    pub fn with_prefix_suffix(
        mut self,
        prefix: impl Into<String>,
        suffix: impl Into<String>,
    ) -> Self {
        self.prefix = prefix.into();
        self.suffix = suffix.into();
        self
    }

    /// Quote empty text and values that contain the separator or the quote character.
    pub fn with_quote(mut self, quote: char) -> Self {
        self.quote = Some(quote);
        self
    }
}

/// Append one cell; returns whether it contained the separator and went out unquoted.
fn write_cell(out: &mut String, text: &str, separator: &str, quote: Option<char>) -> bool {
    let has_separator = !separator.is_empty() && text.contains(separator);
    match quote {
        Some(q) if has_separator || text.contains(q) || text.is_empty() => {
            out.push(q);
            for ch in text.chars() {
                if ch == q {
                    out.push(q);
                }
                out.push(ch);
            }
            out.push(q);
            false
        }
        _ => {
            out.push_str(text);
            quote.is_none() && has_separator
        }
    }
}

impl Aggregator for Concatenate {
    fn name(&self) -> &str {
        &self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::Text
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        if rows.is_empty() {
            return Ok(Value::Null);
        }
        let storage = self.column.storage();
        let mut out = self.prefix.clone();
        for (i, &row) in rows.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.separator);
            }
            let rendered;
            let text = match storage.get_text(row) {
                Some(s) => s,
                None if storage.is_missing(row) => continue,
                None => {
                    rendered = storage.get(row).to_string();
                    rendered.as_str()
                }
            };
            if write_cell(&mut out, text, &self.separator, self.quote) {
                self.problems.add(Problem::UnquotedDelimiter {
                    column: self.column.name().to_owned(),
                    cell: text.to_owned(),
                });
            }
        }
        out.push_str(&self.suffix);
        Ok(Value::text(&out))
    }

    fn problems(&self) -> AggregatedProblems {
        self.problems.clone()
    }

    fn reset(&mut self) {
        self.problems = AggregatedProblems::with_sample_limit(self.problems.sample_limit());
    }
}
