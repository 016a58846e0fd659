#![forbid(unsafe_code)]

//! Growable, typed, nullable column buffers.
//!
//! Every builder keeps a typed backing store and a missing-flag bitmap of the same length. The
//! `*_no_grow` appends assume the caller sized the builder up front (debug-asserted); the plain
//! `append` grows the buffers by half their capacity when full.

use crate::bitmap::BitVec;
use crate::coerce::{coerce_to_double, coerce_to_long};
use crate::problems::{AggregatedProblems, Problem};
use crate::storage::{Storage, StorageData};
use crate::types::{IntegerType, StorageType, Value};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuilderError {
    #[error("expected a value of type {expected}, but got {value} of type {}", .value.type_name())]
    ValueTypeMismatch { expected: StorageType, value: Value },
}

fn mismatch(expected: StorageType, value: &Value) -> BuilderError {
    BuilderError::ValueTypeMismatch {
        expected,
        value: value.clone(),
    }
}

#[derive(Debug)]
struct NullableBuffer<T> {
    values: Vec<T>,
    missing: BitVec,
}

impl<T> NullableBuffer<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            missing: BitVec::with_capacity_bits(capacity),
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn grow_if_full(&mut self) {
        if self.values.len() == self.values.capacity() {
            let extra = (self.values.capacity() / 2).max(1);
            self.values.reserve_exact(extra);
            self.missing.reserve_bits(extra);
        }
    }

    fn push_value(&mut self, value: T) {
        debug_assert!(
            self.values.len() < self.values.capacity(),
            "no-grow append past the sized capacity"
        );
        self.values.push(value);
        self.missing.push(false);
    }

    fn push_missing(&mut self, placeholder: T) {
        debug_assert!(
            self.values.len() < self.values.capacity(),
            "no-grow append past the sized capacity"
        );
        self.values.push(placeholder);
        self.missing.push(true);
    }

    fn into_parts(mut self) -> (Vec<T>, BitVec) {
        self.values.shrink_to_fit();
        self.missing.shrink_to_fit();
        (self.values, self.missing)
    }
}

/// Range validation applied by [`LongBuilder`] on its integer fast path.
pub trait RangePolicy: fmt::Debug {
    /// Whether appended integers must be checked against [`RangePolicy::integer_type`].
    const VALIDATES: bool;

    fn integer_type(&self) -> IntegerType;
}

/// Narrow integer targets: values outside the target width become missing and are reported.
#[derive(Debug, Clone, Copy)]
pub struct Checked {
    integer_type: IntegerType,
}

/// 64-bit targets. Nothing wider than the native arithmetic width can reach the fast path, so
/// there is nothing to check.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchecked;

impl RangePolicy for Checked {
    const VALIDATES: bool = true;

    fn integer_type(&self) -> IntegerType {
        self.integer_type
    }
}

impl RangePolicy for Unchecked {
    const VALIDATES: bool = false;

    fn integer_type(&self) -> IntegerType {
        IntegerType::Int64
    }
}

#[derive(Debug)]
pub struct LongBuilder<R: RangePolicy> {
    buffer: NullableBuffer<i64>,
    policy: R,
    problems: AggregatedProblems,
}

impl LongBuilder<Checked> {
    pub fn checked(integer_type: IntegerType, capacity: usize) -> Self {
        Self {
            buffer: NullableBuffer::with_capacity(capacity),
            policy: Checked { integer_type },
            problems: AggregatedProblems::new(),
        }
    }
}

impl LongBuilder<Unchecked> {
    pub fn unchecked(capacity: usize) -> Self {
        Self {
            buffer: NullableBuffer::with_capacity(capacity),
            policy: Unchecked,
            problems: AggregatedProblems::new(),
        }
    }
}

impl<R: RangePolicy> LongBuilder<R> {
    pub fn append_no_grow(&mut self, value: &Value) -> Result<(), BuilderError> {
        if value.is_null() {
            self.buffer.push_missing(0);
            return Ok(());
        }
        let x = coerce_to_long(value).ok_or_else(|| mismatch(self.storage_type(), value))?;
        self.append_long_no_grow(x);
        Ok(())
    }

    #[inline]
    pub fn append_long_no_grow(&mut self, value: i64) {
        if R::VALIDATES && !self.policy.integer_type().fits(value) {
            self.problems.add(Problem::NumberOutOfRange {
                value,
                target: self.policy.integer_type(),
            });
            self.buffer.push_missing(0);
            return;
        }
        self.buffer.push_value(value);
    }

    pub fn append(&mut self, value: &Value) -> Result<(), BuilderError> {
        self.buffer.grow_if_full();
        self.append_no_grow(value)
    }

    pub fn storage_type(&self) -> StorageType {
        StorageType::Integer(self.policy.integer_type())
    }

    pub fn problems(&self) -> &AggregatedProblems {
        &self.problems
    }

    fn seal(self) -> Storage {
        let integer_type = self.policy.integer_type();
        let (values, missing) = self.buffer.into_parts();
        Storage::from_parts(
            StorageData::Integer {
                values,
                integer_type,
            },
            missing,
        )
    }
}

#[derive(Debug)]
pub struct DoubleBuilder {
    buffer: NullableBuffer<f64>,
}

impl DoubleBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: NullableBuffer::with_capacity(capacity),
        }
    }

    pub fn append_no_grow(&mut self, value: &Value) -> Result<(), BuilderError> {
        if value.is_null() {
            self.buffer.push_missing(0.0);
            return Ok(());
        }
        let x = coerce_to_double(value).ok_or_else(|| mismatch(StorageType::Float, value))?;
        self.append_double_no_grow(x);
        Ok(())
    }

    #[inline]
    pub fn append_double_no_grow(&mut self, value: f64) {
        self.buffer.push_value(value);
    }

    fn seal(self) -> Storage {
        let (values, missing) = self.buffer.into_parts();
        Storage::from_parts(StorageData::Float(values), missing)
    }
}

#[derive(Debug)]
pub struct BoolBuilder {
    values: BitVec,
    missing: BitVec,
}

impl BoolBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            values: BitVec::with_capacity_bits(capacity),
            missing: BitVec::with_capacity_bits(capacity),
        }
    }

    fn grow_if_full(&mut self) {
        if self.values.len() == self.values.capacity_bits() {
            let extra = (self.values.capacity_bits() / 2).max(1);
            self.values.reserve_bits(extra);
            self.missing.reserve_bits(extra);
        }
    }

    pub fn append_no_grow(&mut self, value: &Value) -> Result<(), BuilderError> {
        match value {
            Value::Null => {
                self.values.push(false);
                self.missing.push(true);
                Ok(())
            }
            Value::Boolean(b) => {
                self.append_bool_no_grow(*b);
                Ok(())
            }
            other => Err(mismatch(StorageType::Boolean, other)),
        }
    }

    #[inline]
    pub fn append_bool_no_grow(&mut self, value: bool) {
        self.values.push(value);
        self.missing.push(false);
    }

    fn seal(mut self) -> Storage {
        self.values.shrink_to_fit();
        self.missing.shrink_to_fit();
        Storage::from_parts(StorageData::Boolean(self.values), self.missing)
    }
}

#[derive(Debug)]
pub struct TextBuilder {
    buffer: NullableBuffer<Arc<str>>,
    placeholder: Arc<str>,
}

impl TextBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: NullableBuffer::with_capacity(capacity),
            placeholder: Arc::<str>::from(""),
        }
    }

    pub fn append_no_grow(&mut self, value: &Value) -> Result<(), BuilderError> {
        match value {
            Value::Null => {
                self.buffer.push_missing(self.placeholder.clone());
                Ok(())
            }
            Value::Text(s) => {
                self.buffer.push_value(s.clone());
                Ok(())
            }
            other => Err(mismatch(StorageType::Text, other)),
        }
    }

    fn seal(self) -> Storage {
        let (values, missing) = self.buffer.into_parts();
        Storage::from_parts(StorageData::Text(values), missing)
    }
}

/// Accepts values of any kind.
#[derive(Debug)]
pub struct MixedBuilder {
    buffer: NullableBuffer<Value>,
}

impl MixedBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: NullableBuffer::with_capacity(capacity),
        }
    }

    pub fn append_no_grow(&mut self, value: &Value) {
        if value.is_null() {
            self.buffer.push_missing(Value::Null);
        } else {
            self.buffer.push_value(value.clone());
        }
    }

    fn seal(self) -> Storage {
        let (values, missing) = self.buffer.into_parts();
        Storage::from_parts(StorageData::Mixed(values), missing)
    }
}

/// A column builder for one concrete [`StorageType`].
#[derive(Debug)]
pub enum Builder {
    Boolean(BoolBuilder),
    Long(LongBuilder<Checked>),
    LongUnchecked(LongBuilder<Unchecked>),
    Double(DoubleBuilder),
    Text(TextBuilder),
    Mixed(MixedBuilder),
}

impl Builder {
    /// Create a builder for `storage_type` sized for `capacity` rows.
    pub fn for_type(storage_type: StorageType, capacity: usize) -> Self {
        match storage_type {
            StorageType::Boolean => Builder::Boolean(BoolBuilder::new(capacity)),
            StorageType::Integer(IntegerType::Int64) => {
                Builder::LongUnchecked(LongBuilder::unchecked(capacity))
            }
            StorageType::Integer(integer_type) => {
                Builder::Long(LongBuilder::checked(integer_type, capacity))
            }
            StorageType::Float => Builder::Double(DoubleBuilder::new(capacity)),
            StorageType::Text => Builder::Text(TextBuilder::new(capacity)),
            StorageType::Mixed => Builder::Mixed(MixedBuilder::new(capacity)),
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Builder::Boolean(_) => StorageType::Boolean,
            Builder::Long(b) => b.storage_type(),
            Builder::LongUnchecked(b) => b.storage_type(),
            Builder::Double(_) => StorageType::Float,
            Builder::Text(_) => StorageType::Text,
            Builder::Mixed(_) => StorageType::Mixed,
        }
    }

    pub fn current_size(&self) -> usize {
        match self {
            Builder::Boolean(b) => b.values.len(),
            Builder::Long(b) => b.buffer.len(),
            Builder::LongUnchecked(b) => b.buffer.len(),
            Builder::Double(b) => b.buffer.len(),
            Builder::Text(b) => b.buffer.len(),
            Builder::Mixed(b) => b.buffer.len(),
        }
    }

    /// Append a possibly-null value into pre-sized capacity.
    ///
    /// On a type mismatch nothing is appended.
    pub fn append_no_grow(&mut self, value: &Value) -> Result<(), BuilderError> {
        match self {
            Builder::Boolean(b) => b.append_no_grow(value),
            Builder::Long(b) => b.append_no_grow(value),
            Builder::LongUnchecked(b) => b.append_no_grow(value),
            Builder::Double(b) => b.append_no_grow(value),
            Builder::Text(b) => b.append_no_grow(value),
            Builder::Mixed(b) => {
                b.append_no_grow(value);
                Ok(())
            }
        }
    }

    /// Append a native integer into pre-sized capacity, skipping the boxed-value dispatch where
    /// the target can hold integers directly.
    pub fn append_long_no_grow(&mut self, value: i64) -> Result<(), BuilderError> {
        match self {
            Builder::Long(b) => {
                b.append_long_no_grow(value);
                Ok(())
            }
            Builder::LongUnchecked(b) => {
                b.append_long_no_grow(value);
                Ok(())
            }
            other => other.append_no_grow(&Value::Integer(value)),
        }
    }

    /// Append a value, growing the buffers when they are full.
    pub fn append(&mut self, value: &Value) -> Result<(), BuilderError> {
        match self {
            Builder::Boolean(b) => b.grow_if_full(),
            Builder::Long(b) => b.buffer.grow_if_full(),
            Builder::LongUnchecked(b) => b.buffer.grow_if_full(),
            Builder::Double(b) => b.buffer.grow_if_full(),
            Builder::Text(b) => b.buffer.grow_if_full(),
            Builder::Mixed(b) => b.buffer.grow_if_full(),
        }
        self.append_no_grow(value)
    }

    pub fn append_nulls(&mut self, count: usize) {
        for _ in 0..count {
            // Null is accepted by every builder kind.
            let _ = self.append(&Value::Null);
        }
    }

    /// Problems found while appending (only range-checked integer builders report any).
    pub fn problems(&self) -> Option<&AggregatedProblems> {
        match self {
            Builder::Long(b) => Some(b.problems()),
            Builder::LongUnchecked(b) => Some(b.problems()),
            _ => None,
        }
    }

    /// Finalize into immutable storage sized exactly to [`Builder::current_size`].
    pub fn seal(self) -> Storage {
        let storage_type = self.storage_type();
        let storage = match self {
            Builder::Boolean(b) => b.seal(),
            Builder::Long(b) => b.seal(),
            Builder::LongUnchecked(b) => b.seal(),
            Builder::Double(b) => b.seal(),
            Builder::Text(b) => b.seal(),
            Builder::Mixed(b) => b.seal(),
        };
        log::trace!(
            "sealed {storage_type} column: {} rows, {} missing",
            storage.len(),
            storage.missing_count()
        );
        storage
    }
}
