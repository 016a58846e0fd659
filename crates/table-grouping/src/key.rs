//! Composite grouping keys.
//!
//! A key is one row's projection onto the grouping columns. Values are read out of the column
//! storage when the key is built, so a key never changes after construction.

use crate::folding::TextFoldingStrategy;
use crate::index::GroupMap;
use crate::ordering::KeyOrdering;
use ahash::RandomState;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use table_columnar::{integral_f64_to_i64, Column, Value};

pub type KeyValues = SmallVec<[Value; 4]>;

/// The capability set shared by ordered and unordered keys.
pub trait GroupKey: Sized {
    /// Strategy shared by every key of one index.
    type Strategy: Clone;
    /// Map from key to the rows of its group.
    type Map: GroupMap<Self>;
    /// Whether floats in this kind of key make group equality unreliable and must be reported.
    const FLAGS_FLOAT_GROUPING: bool;

    fn from_values(values: KeyValues, row: usize, strategy: &Self::Strategy) -> Self;

    /// Number of key columns the strategy is configured for.
    fn strategy_width(strategy: &Self::Strategy) -> usize;

    fn row(&self) -> usize;

    fn values(&self) -> &[Value];

    fn float_column_positions(&self) -> &[usize];

    fn value(&self, column: usize) -> Option<&Value> {
        self.values().get(column)
    }

    fn has_float_values(&self) -> bool {
        !self.float_column_positions().is_empty()
    }
}

pub(crate) fn read_values(columns: &[Column], row: usize) -> KeyValues {
    columns.iter().map(|c| c.get(row)).collect()
}

fn float_positions(values: &[Value]) -> SmallVec<[usize; 2]> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_float())
        .map(|(i, _)| i)
        .collect()
}

/// A value normalized for hashing: numbers compare by value and text is folded.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum KeyPart {
    Null,
    Boolean(bool),
    Integer(i64),
    /// Bits of a non-integral float; every NaN maps to the same bits.
    Float(u64),
    Text(Arc<str>),
}

impl KeyPart {
    fn normalize(value: &Value, folding: TextFoldingStrategy) -> Self {
        match value {
            Value::Null => KeyPart::Null,
            Value::Boolean(b) => KeyPart::Boolean(*b),
            Value::Integer(i) => KeyPart::Integer(*i),
            Value::Float(f) => match integral_f64_to_i64(*f) {
                Some(i) => KeyPart::Integer(i),
                None if f.is_nan() => KeyPart::Float(f64::NAN.to_bits()),
                None => KeyPart::Float(f.to_bits()),
            },
            Value::Text(s) => match folding.fold(s) {
                Cow::Borrowed(_) => KeyPart::Text(s.clone()),
                Cow::Owned(folded) => KeyPart::Text(Arc::from(folded)),
            },
        }
    }
}

/// Hash/equality key: column values compared under a per-column text folding strategy.
#[derive(Clone, Debug)]
pub struct UnorderedKey {
    row: usize,
    values: KeyValues,
    parts: SmallVec<[KeyPart; 4]>,
    float_columns: SmallVec<[usize; 2]>,
}

impl UnorderedKey {
    pub fn new(columns: &[Column], row: usize, folding: &[TextFoldingStrategy]) -> Self {
        Self::build(read_values(columns, row), row, folding)
    }

    fn build(values: KeyValues, row: usize, folding: &[TextFoldingStrategy]) -> Self {
        debug_assert_eq!(values.len(), folding.len());
        let parts = values
            .iter()
            .zip(folding)
            .map(|(v, f)| KeyPart::normalize(v, *f))
            .collect();
        Self {
            row,
            float_columns: float_positions(&values),
            values,
            parts,
        }
    }

    pub fn is_all_null(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, KeyPart::Null))
    }
}

impl PartialEq for UnorderedKey {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for UnorderedKey {}

impl Hash for UnorderedKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl GroupKey for UnorderedKey {
    type Strategy = Arc<[TextFoldingStrategy]>;
    type Map = HashMap<UnorderedKey, Vec<usize>, RandomState>;
    const FLAGS_FLOAT_GROUPING: bool = true;

    fn from_values(values: KeyValues, row: usize, strategy: &Self::Strategy) -> Self {
        Self::build(values, row, strategy)
    }

    fn strategy_width(strategy: &Self::Strategy) -> usize {
        strategy.len()
    }

    fn row(&self) -> usize {
        self.row
    }

    fn values(&self) -> &[Value] {
        &self.values
    }

    fn float_column_positions(&self) -> &[usize] {
        &self.float_columns
    }
}

/// Tree key: column values compared with a [`KeyOrdering`].
#[derive(Clone, Debug)]
pub struct OrderedKey {
    row: usize,
    values: KeyValues,
    float_columns: SmallVec<[usize; 2]>,
    ordering: Arc<KeyOrdering>,
}

impl OrderedKey {
    pub fn new(columns: &[Column], row: usize, ordering: Arc<KeyOrdering>) -> Self {
        Self::from_values(read_values(columns, row), row, &ordering)
    }
}

impl PartialEq for OrderedKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedKey {}

impl PartialOrd for OrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering.compare(&self.values, &other.values)
    }
}

impl GroupKey for OrderedKey {
    type Strategy = Arc<KeyOrdering>;
    type Map = BTreeMap<OrderedKey, Vec<usize>>;
    // Tree lookups only consult the comparator, so float keys group deterministically.
    const FLAGS_FLOAT_GROUPING: bool = false;

    fn from_values(values: KeyValues, row: usize, strategy: &Self::Strategy) -> Self {
        Self {
            row,
            float_columns: float_positions(&values),
            values,
            ordering: Arc::clone(strategy),
        }
    }

    fn strategy_width(strategy: &Self::Strategy) -> usize {
        strategy.directions().len()
    }

    fn row(&self) -> usize {
        self.row
    }

    fn values(&self) -> &[Value] {
        &self.values
    }

    fn float_column_positions(&self) -> &[usize] {
        &self.float_columns
    }
}
