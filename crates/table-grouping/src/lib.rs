//! Grouping and aggregation over column storage.
//!
//! [`MultiValueIndex`] partitions the rows of a table by a composite key built from one or more
//! key columns, either in a hash map ([`UnorderedKey`], with per-column text folding) or in a tree
//! map ([`OrderedKey`], enumerating groups in key order). [`MultiValueIndex::make_table`] then
//! runs a set of [`Aggregator`]s over every group and collects the results into a
//! [`table_columnar::Table`].
//!
//! Long-running scans are cancellable through a [`CancellationToken`]; data-quality issues are
//! reported as problems rather than errors.

#![forbid(unsafe_code)]

mod aggregate;
mod cancel;
mod error;
mod folding;
mod index;
mod key;
mod ordering;

pub use crate::aggregate::{
    Aggregator, Average, Concatenate, Count, CountDistinct, CountMissing, CountPresent, First,
    GroupBy, Last, Maximum, Minimum, Sum,
};
pub use crate::cancel::{CancellationToken, Cancelled};
pub use crate::error::{AggregateError, GroupingError, GroupingResult};
pub use crate::folding::TextFoldingStrategy;
pub use crate::index::{GroupMap, MultiValueIndex};
pub use crate::key::{GroupKey, KeyValues, OrderedKey, UnorderedKey};
pub use crate::ordering::{DefaultComparator, KeyOrdering, SortDirection, ValueComparator};
