use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use table_columnar::{
    Column, ProblemAggregator, ProblemKind, SimplifiedProblemAggregator, StorageType, Value,
};
use table_grouping::{
    CancellationToken, DefaultComparator, GroupKey, GroupingError, KeyOrdering, MultiValueIndex,
    SortDirection, TextFoldingStrategy,
};

const CASES: u32 = 64;

type Row = (Option<i64>, Option<&'static str>);

fn key_columns(rows: &[Row]) -> Vec<Column> {
    vec![
        Column::from_values("n", StorageType::INT_64, rows.iter().map(|(n, _)| Value::from(*n)))
            .unwrap(),
        Column::from_values("s", StorageType::Text, rows.iter().map(|(_, s)| Value::from(*s)))
            .unwrap(),
    ]
}

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
        (
            prop::option::of(0i64..4),
            prop::option::of(prop::sample::select(vec!["a", "A", "b", "é", "É"])),
        ),
        0..150,
    )
}

fn assert_partition(groups: Vec<&[usize]>, row_count: usize) {
    let mut seen: Vec<usize> = Vec::with_capacity(row_count);
    for rows in groups {
        assert!(!rows.is_empty());
        assert!(rows.windows(2).all(|w| w[0] < w[1]), "rows must stay in scan order");
        seen.extend_from_slice(rows);
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..row_count).collect::<Vec<_>>());
}

/// Integers and integral floats straddling the last exactly representable float integer.
fn numbers_near_float_precision() -> Vec<Value> {
    let big = 1i64 << 53;
    vec![
        Value::Integer(big + 1),
        Value::Float(big as f64),
        Value::Integer(big),
        Value::Integer(big + 1),
        Value::Float(big as f64),
        Value::Float((big + 2) as f64),
        Value::Integer(big + 2),
    ]
}

fn exact_number(value: &Value) -> i128 {
    match value {
        Value::Integer(i) => i128::from(*i),
        Value::Float(f) => *f as i128,
        other => panic!("not a number: {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn ordered_numeric_groups_ignore_scan_order(
        values in Just(numbers_near_float_precision()).prop_shuffle()
    ) {
        let column = Column::from_values("m", StorageType::Mixed, values.clone()).unwrap();
        let token = CancellationToken::new();
        let index =
            MultiValueIndex::ordered(&[column], values.len(), KeyOrdering::ascending(1), &token)
                .unwrap();

        prop_assert_eq!(index.size(), 3);
        for (_, rows) in index.groups() {
            let expected = exact_number(&values[rows[0]]);
            for &row in rows {
                prop_assert_eq!(exact_number(&values[row]), expected);
            }
        }
    }

    #[test]
    fn unordered_index_partitions_rows(rows in rows_strategy()) {
        let columns = key_columns(&rows);
        let token = CancellationToken::new();
        let index = MultiValueIndex::unordered(
            &columns,
            rows.len(),
            vec![TextFoldingStrategy::Exact, TextFoldingStrategy::CaseInsensitive],
            &token,
        )
        .unwrap();

        assert_partition(index.groups().map(|(_, r)| r).collect(), rows.len());

        let distinct: HashSet<(Option<i64>, Option<String>)> = rows
            .iter()
            .map(|(n, s)| (*n, s.map(|s| s.to_uppercase())))
            .collect();
        prop_assert_eq!(index.size(), distinct.len());

        for (key, group) in index.groups() {
            for &row in group {
                let key_of_row = index
                    .key_for([Value::from(rows[row].0), Value::from(rows[row].1)])
                    .unwrap();
                prop_assert!(&key_of_row == key);
            }
            prop_assert_eq!(key.row(), group[0]);
        }

        let mut order = index.make_order_map(rows.len(), &token).unwrap();
        order.sort_unstable();
        prop_assert_eq!(order, (0..rows.len()).collect::<Vec<_>>());
    }

    #[test]
    fn ordered_index_enumerates_keys_in_order(rows in rows_strategy()) {
        let columns = key_columns(&rows);
        let token = CancellationToken::new();
        let ordering = KeyOrdering::new(
            vec![SortDirection::Descending, SortDirection::Ascending],
            Arc::new(DefaultComparator::default()),
        );
        let index =
            MultiValueIndex::ordered(&columns, rows.len(), ordering.clone(), &token).unwrap();

        assert_partition(index.groups().map(|(_, r)| r).collect(), rows.len());

        let distinct: HashSet<Row> = rows.iter().copied().collect();
        prop_assert_eq!(index.size(), distinct.len());

        let keys: Vec<_> = index.keys().collect();
        for pair in keys.windows(2) {
            prop_assert_eq!(
                ordering.compare(pair[0].values(), pair[1].values()),
                Ordering::Less
            );
        }
        prop_assert!(!index.problems().has_problems());
    }
}

#[test]
fn folding_merges_case_and_accent_variants() {
    let column = Column::from_values(
        "name",
        StorageType::Text,
        ["Été", "ete", "ETE", "Etc"].into_iter().map(Value::text),
    )
    .unwrap();
    let token = CancellationToken::new();

    let exact = MultiValueIndex::unordered_with_common_folding(
        &[column.clone()],
        4,
        TextFoldingStrategy::Exact,
        &token,
    )
    .unwrap();
    assert_eq!(exact.size(), 4);

    let folded = MultiValueIndex::unordered_with_common_folding(
        &[column],
        4,
        TextFoldingStrategy::CaseAndAccentInsensitive,
        &token,
    )
    .unwrap();
    assert_eq!(folded.size(), 2);
    let key = folded.key_for([Value::text("ete")]).unwrap();
    assert_eq!(folded.get(&key), Some(&[0usize, 1, 2][..]));
    // The group reports the representation of its first row.
    assert_eq!(folded.keys().find(|k| k.row() == 0).unwrap().values(), &[Value::text("Été")]);
}

#[test]
fn float_key_values_are_reported_per_row_and_column() {
    let x = Column::from_values(
        "x",
        StorageType::Float,
        vec![Value::Float(1.5), Value::Null, Value::Float(2.0), Value::Float(1.5)],
    )
    .unwrap();
    let y = Column::from_values(
        "y",
        StorageType::Float,
        vec![Value::Float(0.5), Value::Float(0.5), Value::Null, Value::Float(0.5)],
    )
    .unwrap();
    let token = CancellationToken::new();

    let unordered = MultiValueIndex::unordered_with_common_folding(
        &[x.clone(), y.clone()],
        4,
        TextFoldingStrategy::Exact,
        &token,
    )
    .unwrap();
    assert_eq!(unordered.size(), 3);
    let problems = unordered.aggregated_problems();
    assert_eq!(problems.count_of(ProblemKind::FloatingPointGrouping), 6);
    assert_eq!(problems.count(), 6);

    let ordered =
        MultiValueIndex::ordered(&[x, y], 4, KeyOrdering::ascending(2), &token).unwrap();
    assert_eq!(ordered.size(), 3);
    assert!(ordered.aggregated_problems().is_empty());
}

#[test]
fn integral_floats_group_with_integers_in_mixed_columns() {
    let column = Column::from_values(
        "m",
        StorageType::Mixed,
        vec![Value::Integer(2), Value::Float(2.0), Value::text("2"), Value::Null],
    )
    .unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered_with_common_folding(
        &[column],
        4,
        TextFoldingStrategy::Exact,
        &token,
    )
    .unwrap();

    assert_eq!(index.size(), 3);
    assert_eq!(
        index.get(&index.key_for([Value::Integer(2)]).unwrap()),
        Some(&[0usize, 1][..])
    );
    assert_eq!(index.get(&index.key_for([Value::Null]).unwrap()), Some(&[3usize][..]));
}

#[test]
fn simplified_problems_only_remember_that_something_happened() {
    let x = Column::from_values("x", StorageType::Float, vec![Value::Float(0.25)]).unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered_with_problems(
        &[x],
        1,
        vec![TextFoldingStrategy::Exact],
        SimplifiedProblemAggregator::new(),
        &token,
    )
    .unwrap();
    assert!(index.problems().has_problems());
    assert!(index.problems().aggregated_problems().is_err());
}

#[test]
fn cancelled_scan_stops_with_an_error() {
    let column = Column::from_values("n", StorageType::INT_64, (0..100).map(Value::Integer))
        .unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let err = MultiValueIndex::ordered(&[column], 100, KeyOrdering::ascending(1), &token)
        .unwrap_err();
    assert!(matches!(err, GroupingError::Cancelled(_)));
}

#[test]
fn cancelling_from_another_thread_is_observed() {
    let column = Column::from_values("n", StorageType::INT_64, (0..10).map(Value::Integer))
        .unwrap();
    let token = CancellationToken::new();
    let remote = token.clone();
    std::thread::spawn(move || remote.cancel()).join().unwrap();

    assert!(token.is_cancelled());
    assert!(matches!(
        MultiValueIndex::unordered_with_common_folding(
            &[column],
            10,
            TextFoldingStrategy::Exact,
            &token,
        ),
        Err(GroupingError::Cancelled(_))
    ));
}
