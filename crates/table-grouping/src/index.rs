//! Group-by partition over the rows of a table.
//!
//! [`MultiValueIndex`] scans rows once, builds one composite key per row and buckets the row
//! index under it. Ordered indexes keep their groups in a `BTreeMap` (so groups enumerate in key
//! order); unordered indexes use a hash map and enumerate in an unspecified order.

use crate::aggregate::Aggregator;
use crate::cancel::CancellationToken;
use crate::error::{GroupingError, GroupingResult};
use crate::folding::TextFoldingStrategy;
use crate::key::{read_values, GroupKey, KeyValues, OrderedKey, UnorderedKey};
use crate::ordering::KeyOrdering;
use std::collections::{btree_map, hash_map, BTreeMap, HashMap, HashSet};
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use table_columnar::{
    AggregatedProblems, Builder, Column, DetailedProblemAggregator, Problem, ProblemAggregator,
    Table,
};

/// Storage of key → rows used by an index.
pub trait GroupMap<K>: Default {
    type Iter<'a>: Iterator<Item = (&'a K, &'a Vec<usize>)>
    where
        Self: 'a,
        K: 'a;

    /// Rows of the group for `key`, creating an empty group if none exists.
    fn rows_mut(&mut self, key: K) -> &mut Vec<usize>;

    fn rows(&self, key: &K) -> Option<&Vec<usize>>;

    fn len(&self) -> usize;

    fn iter(&self) -> Self::Iter<'_>;
}

impl<K: Ord> GroupMap<K> for BTreeMap<K, Vec<usize>> {
    type Iter<'a>
        = btree_map::Iter<'a, K, Vec<usize>>
    where
        Self: 'a,
        K: 'a;

    fn rows_mut(&mut self, key: K) -> &mut Vec<usize> {
        self.entry(key).or_default()
    }

    fn rows(&self, key: &K) -> Option<&Vec<usize>> {
        self.get(key)
    }

    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    fn iter(&self) -> Self::Iter<'_> {
        BTreeMap::iter(self)
    }
}

impl<K, S> GroupMap<K> for HashMap<K, Vec<usize>, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    type Iter<'a>
        = hash_map::Iter<'a, K, Vec<usize>>
    where
        Self: 'a,
        K: 'a;

    fn rows_mut(&mut self, key: K) -> &mut Vec<usize> {
        self.entry(key).or_default()
    }

    fn rows(&self, key: &K) -> Option<&Vec<usize>> {
        self.get(key)
    }

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn iter(&self) -> Self::Iter<'_> {
        HashMap::iter(self)
    }
}

/// Partition of row indices `0..row_count` into groups of equal composite key.
pub struct MultiValueIndex<K: GroupKey, P: ProblemAggregator = DetailedProblemAggregator> {
    key_columns: Vec<Column>,
    strategy: K::Strategy,
    groups: K::Map,
    problems: P,
}

impl MultiValueIndex<OrderedKey> {
    /// Group rows with a tree map; groups enumerate in key order.
    pub fn ordered(
        key_columns: &[Column],
        row_count: usize,
        ordering: KeyOrdering,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        Self::build(
            key_columns,
            row_count,
            Arc::new(ordering),
            DetailedProblemAggregator::new(),
            token,
        )
    }
}

impl<P: ProblemAggregator> MultiValueIndex<OrderedKey, P> {
    pub fn ordered_with_problems(
        key_columns: &[Column],
        row_count: usize,
        ordering: KeyOrdering,
        problems: P,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        Self::build(key_columns, row_count, Arc::new(ordering), problems, token)
    }
}

impl MultiValueIndex<UnorderedKey> {
    /// Group rows with a hash map, folding text per column.
    pub fn unordered(
        key_columns: &[Column],
        row_count: usize,
        folding: Vec<TextFoldingStrategy>,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        Self::build(
            key_columns,
            row_count,
            folding.into(),
            DetailedProblemAggregator::new(),
            token,
        )
    }

    /// Like [`MultiValueIndex::unordered`] with one folding strategy for every key column.
    pub fn unordered_with_common_folding(
        key_columns: &[Column],
        row_count: usize,
        folding: TextFoldingStrategy,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        Self::unordered(
            key_columns,
            row_count,
            vec![folding; key_columns.len()],
            token,
        )
    }
}

impl<P: ProblemAggregator> MultiValueIndex<UnorderedKey, P> {
    pub fn unordered_with_problems(
        key_columns: &[Column],
        row_count: usize,
        folding: Vec<TextFoldingStrategy>,
        problems: P,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        Self::build(key_columns, row_count, folding.into(), problems, token)
    }
}

impl<K: GroupKey, P: ProblemAggregator> MultiValueIndex<K, P> {
    fn build(
        key_columns: &[Column],
        row_count: usize,
        strategy: K::Strategy,
        mut problems: P,
        token: &CancellationToken,
    ) -> GroupingResult<Self> {
        let width = K::strategy_width(&strategy);
        if width != key_columns.len() {
            return Err(GroupingError::StrategyCountMismatch {
                expected: key_columns.len(),
                actual: width,
            });
        }
        if let Some(column) = key_columns.iter().find(|c| c.len() != row_count) {
            return Err(GroupingError::RowCountMismatch {
                column: column.name().to_owned(),
                expected: row_count,
                actual: column.len(),
            });
        }

        let mut groups = K::Map::default();
        let mut float_problems = 0usize;

        if key_columns.is_empty() {
            // Aggregate-the-whole-table mode: one implicit group in original row order.
            if row_count > 0 {
                groups
                    .rows_mut(K::from_values(KeyValues::new(), 0, &strategy))
                    .extend(0..row_count);
            }
        } else {
            for row in 0..row_count {
                let key = K::from_values(read_values(key_columns, row), row, &strategy);

                if K::FLAGS_FLOAT_GROUPING {
                    for &column in key.float_column_positions() {
                        float_problems += 1;
                        problems.report(Problem::FloatingPointGrouping {
                            column: key_columns[column].name().to_owned(),
                            row,
                        });
                    }
                }

                groups.rows_mut(key).push(row);
                token.safepoint()?;
            }
        }

        log::debug!(
            "built group index over {row_count} rows and {} key columns: {} groups, {float_problems} floating-point key values",
            key_columns.len(),
            groups.len(),
        );

        Ok(Self {
            key_columns: key_columns.to_vec(),
            strategy,
            groups,
            problems,
        })
    }

    pub fn key_column_count(&self) -> usize {
        self.key_columns.len()
    }

    /// Build a key with this index's strategy, for use with [`Self::contains`] and [`Self::get`].
    ///
    /// Fails with [`GroupingError::StrategyCountMismatch`] unless exactly one value is given per
    /// key column.
    pub fn key_for(
        &self,
        values: impl IntoIterator<Item = table_columnar::Value>,
    ) -> GroupingResult<K> {
        let values: KeyValues = values.into_iter().collect();
        let width = K::strategy_width(&self.strategy);
        if values.len() != width {
            return Err(GroupingError::StrategyCountMismatch {
                expected: width,
                actual: values.len(),
            });
        }
        Ok(K::from_values(values, 0, &self.strategy))
    }

    /// Distinct group keys, in group enumeration order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.groups.iter().map(|(k, _)| k)
    }

    /// Groups as (key, rows) pairs; rows are in scan order.
    pub fn groups(&self) -> impl Iterator<Item = (&K, &[usize])> + '_ {
        self.groups.iter().map(|(k, rows)| (k, rows.as_slice()))
    }

    pub fn contains(&self, key: &K) -> bool {
        self.groups.rows(key).is_some()
    }

    /// Rows of the group equal to `key`, or `None` when no row has that key.
    pub fn get(&self, key: &K) -> Option<&[usize]> {
        self.groups.rows(key).map(Vec::as_slice)
    }

    pub fn size(&self) -> usize {
        self.groups.len()
    }

    pub fn problems(&self) -> &P {
        &self.problems
    }

    /// Run every aggregator over every group and collect the results into a table.
    ///
    /// Output columns appear in aggregator order and rows in group enumeration order. With no
    /// key columns and no rows, every aggregator still runs once over an empty group, so the
    /// result has exactly one row.
    pub fn make_table(
        &self,
        aggregators: &mut [Box<dyn Aggregator + '_>],
        token: &CancellationToken,
    ) -> GroupingResult<Table> {
        let mut names = HashSet::with_capacity(aggregators.len());
        for aggregator in aggregators.iter() {
            if !names.insert(aggregator.name().to_owned()) {
                return Err(GroupingError::DuplicateColumn {
                    name: aggregator.name().to_owned(),
                });
            }
        }

        for aggregator in aggregators.iter_mut() {
            aggregator.reset();
        }

        let empty_scenario = self.groups.len() == 0 && self.key_columns.is_empty();
        let rows_out = if empty_scenario { 1 } else { self.groups.len() };

        let mut builders: Vec<Builder> = aggregators
            .iter()
            .map(|a| Builder::for_type(a.output_type(), rows_out))
            .collect();

        if empty_scenario {
            for (aggregator, builder) in aggregators.iter_mut().zip(builders.iter_mut()) {
                let value = aggregator.aggregate(&[])?;
                builder.append_no_grow(&value)?;
                token.safepoint()?;
            }
        } else {
            for (_, rows) in self.groups.iter() {
                for (aggregator, builder) in aggregators.iter_mut().zip(builders.iter_mut()) {
                    let value = aggregator.aggregate(rows)?;
                    builder.append_no_grow(&value)?;
                    token.safepoint()?;
                }
            }
        }

        let mut merged = self.problems.aggregated_problems()?;
        for aggregator in aggregators.iter() {
            merged.merge_from(&aggregator.problems());
        }
        for builder in &builders {
            if let Some(p) = builder.problems() {
                merged.merge_from(p);
            }
        }

        let columns: Vec<Column> = aggregators
            .iter()
            .zip(builders)
            .map(|(aggregator, builder)| Column::new(aggregator.name(), builder.seal()))
            .collect();

        log::debug!(
            "aggregated {} groups into {} columns ({} problems)",
            rows_out,
            columns.len(),
            merged.count()
        );
        Ok(Table::new(columns, merged))
    }

    /// Concatenate the rows of every group, in group enumeration order.
    ///
    /// The result is a permutation of `0..row_count` that places each group's rows together.
    /// An index with no groups yields an empty map.
    pub fn make_order_map(
        &self,
        row_count: usize,
        token: &CancellationToken,
    ) -> GroupingResult<Vec<usize>> {
        if self.groups.len() == 0 {
            return Ok(Vec::new());
        }

        let mut out = Vec::with_capacity(row_count);
        for (_, rows) in self.groups.iter() {
            for &row in rows {
                out.push(row);
                token.safepoint()?;
            }
        }

        if out.len() != row_count {
            return Err(GroupingError::OrderMapSize {
                expected: row_count,
                actual: out.len(),
            });
        }
        Ok(out)
    }
}

impl<K: GroupKey, P: ProblemAggregator> std::fmt::Debug for MultiValueIndex<K, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiValueIndex")
            .field("key_columns", &self.key_columns.len())
            .field("groups", &self.groups.len())
            .field("has_problems", &self.problems.has_problems())
            .finish()
    }
}

/// Index problems as a plain record; convenience for detailed indexes.
impl<K: GroupKey> MultiValueIndex<K, DetailedProblemAggregator> {
    pub fn aggregated_problems(&self) -> &AggregatedProblems {
        self.problems.problems()
    }
}
