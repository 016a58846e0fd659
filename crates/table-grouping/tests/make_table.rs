use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;
use table_columnar::{
    Column, ProblemError, ProblemKind, SimplifiedProblemAggregator, StorageType, Value,
};
use table_grouping::{
    AggregateError, Aggregator, Average, CancellationToken, Concatenate, Count, CountDistinct,
    CountMissing, CountPresent, First, GroupBy, GroupingError, KeyOrdering, Last, Maximum,
    Minimum, MultiValueIndex, Sum, TextFoldingStrategy,
};

fn sales() -> (Column, Column, Column) {
    let city = Column::from_values(
        "city",
        StorageType::Text,
        ["b", "a", "b", "c", "a"].into_iter().map(Value::text),
    )
    .unwrap();
    let amount = Column::from_values(
        "amount",
        StorageType::INT_64,
        vec![
            Value::Integer(10),
            Value::Integer(1),
            Value::Null,
            Value::Integer(5),
            Value::Integer(4),
        ],
    )
    .unwrap();
    let price = Column::from_values(
        "price",
        StorageType::Float,
        vec![
            Value::Float(1.0),
            Value::Float(2.0),
            Value::Float(3.0),
            Value::Null,
            Value::Float(2.0),
        ],
    )
    .unwrap();
    (city, amount, price)
}

/// Counts how often `make_table` asks it for a value.
struct CallCounter {
    name: &'static str,
    calls: Rc<Cell<usize>>,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl CallCounter {
    fn new(name: &'static str, calls: Rc<Cell<usize>>) -> Self {
        Self {
            name,
            calls,
            cancel_on_call: None,
        }
    }
}

impl Aggregator for CallCounter {
    fn name(&self) -> &str {
        self.name
    }

    fn output_type(&self) -> StorageType {
        StorageType::INT_64
    }

    fn aggregate(&mut self, rows: &[usize]) -> Result<Value, AggregateError> {
        self.calls.set(self.calls.get() + 1);
        if let Some((n, token)) = &self.cancel_on_call {
            if self.calls.get() == *n {
                token.cancel();
            }
        }
        Ok(Value::Integer(rows.len() as i64))
    }
}

#[test]
fn ordered_group_by_produces_one_row_per_key() {
    let (city, amount, price) = sales();
    let token = CancellationToken::new();
    let index = MultiValueIndex::ordered(
        std::slice::from_ref(&city),
        5,
        KeyOrdering::ascending(1),
        &token,
    )
    .unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(GroupBy::new(city.clone())),
        Box::new(Count::new("count")),
        Box::new(Sum::new("total", amount.clone()).unwrap()),
        Box::new(Average::new("avg_price", price.clone()).unwrap()),
        Box::new(CountMissing::new("missing", amount.clone())),
        Box::new(CountPresent::new("present", price.clone())),
        Box::new(Minimum::new("min", amount.clone())),
        Box::new(Maximum::new("max", amount.clone())),
        Box::new(First::new("first", amount.clone(), true)),
        Box::new(Last::new("last", amount, false)),
    ];
    let table = index.make_table(&mut aggregators, &token).unwrap();

    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table
            .schema()
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect::<Vec<_>>(),
        vec![
            ("city", StorageType::Text),
            ("count", StorageType::INT_64),
            ("total", StorageType::INT_64),
            ("avg_price", StorageType::Float),
            ("missing", StorageType::INT_64),
            ("present", StorageType::INT_64),
            ("min", StorageType::INT_64),
            ("max", StorageType::INT_64),
            ("first", StorageType::INT_64),
            ("last", StorageType::INT_64),
        ]
    );

    let i = Value::Integer;
    let f = Value::Float;
    assert_eq!(
        table.to_values(),
        vec![
            vec![Value::text("a"), Value::text("b"), Value::text("c")],
            vec![i(2), i(2), i(1)],
            vec![i(5), i(10), i(5)],
            vec![f(2.0), f(2.0), Value::Null],
            vec![i(0), i(1), i(0)],
            vec![i(2), i(2), i(0)],
            vec![i(1), i(10), i(5)],
            vec![i(4), i(10), i(5)],
            vec![i(1), i(10), i(5)],
            vec![i(4), Value::Null, i(5)],
        ]
    );
    assert!(table.problems().is_empty());
}

#[test]
fn whole_table_aggregation_without_key_columns() {
    let (_, amount, _) = sales();
    let token = CancellationToken::new();
    let index = MultiValueIndex::ordered(&[], 5, KeyOrdering::ascending(0), &token).unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(Count::new("count")),
        Box::new(Sum::new("total", amount).unwrap()),
    ];
    let table = index.make_table(&mut aggregators, &token).unwrap();
    assert_eq!(table.to_values(), vec![vec![Value::Integer(5)], vec![Value::Integer(20)]]);
}

#[test]
fn empty_input_without_keys_still_yields_one_row() {
    let calls = Rc::new(Cell::new(0));
    let empty = Column::from_values("amount", StorageType::INT_64, Vec::<Value>::new()).unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered(&[], 0, Vec::new(), &token).unwrap();
    assert_eq!(index.size(), 0);

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(CallCounter::new("calls", Rc::clone(&calls))),
        Box::new(Count::new("count")),
        Box::new(Sum::new("total", empty).unwrap()),
    ];
    let table = index.make_table(&mut aggregators, &token).unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(table.row_count(), 1);
    assert_eq!(
        table.to_values(),
        vec![
            vec![Value::Integer(0)],
            vec![Value::Integer(0)],
            vec![Value::Null],
        ]
    );
}

#[test]
fn empty_input_with_keys_yields_no_rows() {
    let calls = Rc::new(Cell::new(0));
    let key = Column::from_values("k", StorageType::Text, Vec::<Value>::new()).unwrap();
    let token = CancellationToken::new();
    let index =
        MultiValueIndex::ordered(&[key], 0, KeyOrdering::ascending(1), &token).unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(CallCounter::new("calls", Rc::clone(&calls)))];
    let table = index.make_table(&mut aggregators, &token).unwrap();
    assert_eq!(calls.get(), 0);
    assert_eq!(table.row_count(), 0);
    assert_eq!(table.column_count(), 1);
}

#[test]
fn duplicate_output_names_are_rejected() {
    let (city, _, _) = sales();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered_with_common_folding(
        &[city],
        5,
        TextFoldingStrategy::Exact,
        &token,
    )
    .unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(Count::new("n")), Box::new(Count::new("n"))];
    let err = index.make_table(&mut aggregators, &token).unwrap_err();
    assert!(matches!(err, GroupingError::DuplicateColumn { name } if name == "n"));
}

#[test]
fn problems_from_index_and_aggregators_are_merged() {
    let ratio = Column::from_values(
        "ratio",
        StorageType::Float,
        vec![Value::Float(0.5), Value::Float(0.5), Value::Float(1.5)],
    )
    .unwrap();
    let label = Column::from_values(
        "label",
        StorageType::Text,
        ["x,y", "z", "w"].into_iter().map(Value::text),
    )
    .unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered_with_common_folding(
        std::slice::from_ref(&ratio),
        3,
        TextFoldingStrategy::Exact,
        &token,
    )
    .unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(GroupBy::new(ratio.clone())),
        Box::new(Concatenate::new("labels", label, ",")),
        Box::new(CountDistinct::new(
            "distinct",
            vec![ratio],
            TextFoldingStrategy::Exact,
            false,
        )),
    ];
    let table = index.make_table(&mut aggregators, &token).unwrap();

    assert_eq!(table.row_count(), 2);
    let problems = table.problems();
    // Three from the index scan, three from the distinct count.
    assert_eq!(problems.count_of(ProblemKind::FloatingPointGrouping), 6);
    assert_eq!(problems.count_of(ProblemKind::UnquotedDelimiter), 1);
}

#[test]
fn rerunning_make_table_does_not_double_count_problems() {
    let ratio = Column::from_values(
        "ratio",
        StorageType::Float,
        vec![Value::Float(0.5), Value::Float(1.5)],
    )
    .unwrap();
    let label = Column::from_values(
        "label",
        StorageType::Text,
        ["a,b", "c"].into_iter().map(Value::text),
    )
    .unwrap();
    let amount = Column::from_values(
        "amount",
        StorageType::INT_64,
        vec![Value::Integer(i64::MAX), Value::Integer(i64::MAX)],
    )
    .unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::ordered(&[], 2, KeyOrdering::ascending(0), &token).unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![
        Box::new(Concatenate::new("labels", label, ",")),
        Box::new(CountDistinct::new(
            "distinct",
            vec![ratio],
            TextFoldingStrategy::Exact,
            false,
        )),
        Box::new(Sum::new("total", amount).unwrap()),
    ];
    let first = index.make_table(&mut aggregators, &token).unwrap();
    let second = index.make_table(&mut aggregators, &token).unwrap();

    assert_eq!(first.problems(), second.problems());
    assert_eq!(second.problems().count_of(ProblemKind::UnquotedDelimiter), 1);
    assert_eq!(second.problems().count_of(ProblemKind::FloatingPointGrouping), 2);
    assert_eq!(second.problems().count_of(ProblemKind::ArithmeticOverflow), 1);
    assert_eq!(second.to_values(), first.to_values());
}

#[test]
fn detail_free_problem_tracking_cannot_build_a_table() {
    let (city, _, _) = sales();
    let token = CancellationToken::new();
    let index = MultiValueIndex::unordered_with_problems(
        &[city],
        5,
        vec![TextFoldingStrategy::Exact],
        SimplifiedProblemAggregator::new(),
        &token,
    )
    .unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![Box::new(Count::new("count"))];
    let err = index.make_table(&mut aggregators, &token).unwrap_err();
    assert!(matches!(
        err,
        GroupingError::Problems(ProblemError::DetailNotTracked)
    ));
}

#[test]
fn cancellation_during_aggregation_aborts_make_table() {
    let (city, _, _) = sales();
    let token = CancellationToken::new();
    let index = MultiValueIndex::ordered(&[city], 5, KeyOrdering::ascending(1), &token).unwrap();

    let calls = Rc::new(Cell::new(0));
    let mut counter = CallCounter::new("calls", Rc::clone(&calls));
    counter.cancel_on_call = Some((2, token.clone()));
    let mut aggregators: Vec<Box<dyn Aggregator>> = vec![Box::new(counter)];

    let err = index.make_table(&mut aggregators, &token).unwrap_err();
    assert!(matches!(err, GroupingError::Cancelled(_)));
    assert_eq!(calls.get(), 2);
}

#[test]
fn fatal_aggregation_errors_propagate() {
    let mixed = Column::from_values(
        "m",
        StorageType::Mixed,
        vec![Value::Integer(1), Value::text("oops")],
    )
    .unwrap();
    let token = CancellationToken::new();
    let index = MultiValueIndex::ordered(&[], 2, KeyOrdering::ascending(0), &token).unwrap();

    let mut aggregators: Vec<Box<dyn Aggregator>> =
        vec![Box::new(Sum::new("total", mixed).unwrap())];
    let err = index.make_table(&mut aggregators, &token).unwrap_err();
    assert!(matches!(
        err,
        GroupingError::Aggregate(AggregateError::TypeMismatch { .. })
    ));
}
