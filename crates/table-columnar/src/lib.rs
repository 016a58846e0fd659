//! Column storage for the table engine.
//!
//! This crate focuses on:
//! - Typed, nullable column storage (a typed backing store plus a missing-flag bitmap).
//! - Builders that grow column buffers incrementally and seal them into immutable storage.
//! - Numeric coercion shared by builders and aggregations.
//! - Non-fatal problem reporting for data-quality issues found while scanning cells.

#![forbid(unsafe_code)]

mod bitmap;
mod builder;
mod coerce;
mod problems;
mod storage;
mod table;
mod types;

pub use crate::bitmap::BitVec;
pub use crate::builder::{
    BoolBuilder, Builder, BuilderError, Checked, DoubleBuilder, LongBuilder, MixedBuilder,
    RangePolicy, TextBuilder, Unchecked,
};
pub use crate::coerce::{coerce_to_double, coerce_to_long, integral_f64_to_i64};
pub use crate::problems::{
    AggregatedProblems, DetailedProblemAggregator, Problem, ProblemAggregator, ProblemError,
    ProblemKind, SimplifiedProblemAggregator, DEFAULT_SAMPLE_LIMIT,
};
pub use crate::storage::{Column, Storage};
pub use crate::table::{ColumnSchema, Table};
pub use crate::types::{IntegerType, StorageType, Value};
