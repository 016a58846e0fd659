#![forbid(unsafe_code)]

use crate::bitmap::BitVec;
use crate::builder::{Builder, BuilderError};
use crate::types::{IntegerType, StorageType, Value};
use std::sync::Arc;

#[derive(Clone, Debug)]
pub(crate) enum StorageData {
    Boolean(BitVec),
    Integer {
        values: Vec<i64>,
        integer_type: IntegerType,
    },
    Float(Vec<f64>),
    Text(Vec<Arc<str>>),
    Mixed(Vec<Value>),
}

impl StorageData {
    fn len(&self) -> usize {
        match self {
            StorageData::Boolean(bits) => bits.len(),
            StorageData::Integer { values, .. } => values.len(),
            StorageData::Float(values) => values.len(),
            StorageData::Text(values) => values.len(),
            StorageData::Mixed(values) => values.len(),
        }
    }
}

/// Immutable, sealed column storage: a typed backing store plus per-row missing flags.
///
/// Slots flagged as missing hold an unspecified placeholder in the backing store and always read
/// back as [`Value::Null`].
#[derive(Clone, Debug)]
pub struct Storage {
    data: StorageData,
    missing: BitVec,
}

impl Storage {
    pub(crate) fn from_parts(data: StorageData, missing: BitVec) -> Self {
        debug_assert_eq!(
            data.len(),
            missing.len(),
            "backing store and missing flags must have the same length"
        );
        Self { data, missing }
    }

    /// Build a storage of type `storage_type` from a sequence of values.
    pub fn from_values(
        storage_type: StorageType,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, BuilderError> {
        let values = values.into_iter();
        let mut builder = Builder::for_type(storage_type, values.size_hint().0);
        for value in values {
            builder.append(&value)?;
        }
        Ok(builder.seal())
    }

    pub fn len(&self) -> usize {
        self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn storage_type(&self) -> StorageType {
        match &self.data {
            StorageData::Boolean(_) => StorageType::Boolean,
            StorageData::Integer { integer_type, .. } => StorageType::Integer(*integer_type),
            StorageData::Float(_) => StorageType::Float,
            StorageData::Text(_) => StorageType::Text,
            StorageData::Mixed(_) => StorageType::Mixed,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        row >= self.len() || self.missing.get(row)
    }

    pub fn missing_count(&self) -> usize {
        self.missing.count_ones()
    }

    /// Value at `row`; out-of-range rows read as [`Value::Null`].
    pub fn get(&self, row: usize) -> Value {
        if self.is_missing(row) {
            return Value::Null;
        }
        match &self.data {
            StorageData::Boolean(bits) => Value::Boolean(bits.get(row)),
            StorageData::Integer { values, .. } => Value::Integer(values[row]),
            StorageData::Float(values) => Value::Float(values[row]),
            StorageData::Text(values) => Value::Text(values[row].clone()),
            StorageData::Mixed(values) => values[row].clone(),
        }
    }

    pub fn get_long(&self, row: usize) -> Option<i64> {
        match &self.data {
            StorageData::Integer { values, .. } if !self.is_missing(row) => Some(values[row]),
            _ => None,
        }
    }

    pub fn get_double(&self, row: usize) -> Option<f64> {
        match &self.data {
            StorageData::Float(values) if !self.is_missing(row) => Some(values[row]),
            _ => None,
        }
    }

    pub fn get_text(&self, row: usize) -> Option<&str> {
        match &self.data {
            StorageData::Text(values) if !self.is_missing(row) => Some(&values[row]),
            StorageData::Mixed(values) if !self.is_missing(row) => values[row].as_text(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        (0..self.len()).map(move |row| self.get(row))
    }

    #[cfg(test)]
    pub(crate) fn backing_len(&self) -> usize {
        self.data.len()
    }
}

/// A named column backed by shared, immutable storage.
#[derive(Clone, Debug)]
pub struct Column {
    name: Arc<str>,
    storage: Arc<Storage>,
}

impl Column {
    pub fn new(name: impl Into<Arc<str>>, storage: Storage) -> Self {
        Self {
            name: name.into(),
            storage: Arc::new(storage),
        }
    }

    pub fn from_shared(name: impl Into<Arc<str>>, storage: Arc<Storage>) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    /// Convenience constructor building the storage from `values`.
    pub fn from_values(
        name: impl Into<Arc<str>>,
        storage_type: StorageType,
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, BuilderError> {
        Ok(Self::new(name, Storage::from_values(storage_type, values)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn storage_type(&self) -> StorageType {
        self.storage.storage_type()
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn get(&self, row: usize) -> Value {
        self.storage.get(row)
    }
}
