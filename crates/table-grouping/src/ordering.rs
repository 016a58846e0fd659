use crate::folding::TextFoldingStrategy;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use table_columnar::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ord: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    }
}

/// A total order over cell values.
pub trait ValueComparator: Send + Sync {
    fn compare(&self, a: &Value, b: &Value) -> Ordering;
}

impl<F> ValueComparator for F
where
    F: Fn(&Value, &Value) -> Ordering + Send + Sync,
{
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self(a, b)
    }
}

/// Orders `Null < Boolean < numbers < Text`.
///
/// Integers and floats compare by numeric value (NaN sorts after every other number); text
/// compares after folding with `text_folding`, so folded-equal strings are order-equal.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultComparator {
    pub text_folding: TextFoldingStrategy,
}

impl DefaultComparator {
    pub fn new(text_folding: TextFoldingStrategy) -> Self {
        Self { text_folding }
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Boolean(_) => 1,
        Value::Integer(_) | Value::Float(_) => 2,
        Value::Text(_) => 3,
    }
}

/// 2^63, the first float above every `i64`.
const I64_END: f64 = 9_223_372_036_854_775_808.0;

/// Exact comparison of an integer with a float; NaN sorts after every integer.
fn cmp_int_float(int: i64, float: f64) -> Ordering {
    if float.is_nan() || float >= I64_END {
        return Ordering::Less;
    }
    if float < -I64_END {
        return Ordering::Greater;
    }
    // `float` now lies in [-2^63, 2^63), so its integral part is an exact `i64`.
    let whole = float.trunc();
    int.cmp(&(whole as i64)).then_with(|| {
        let fraction = float - whole;
        if fraction > 0.0 {
            Ordering::Less
        } else if fraction < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    })
}

fn cmp_numbers(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
        (Value::Integer(a), Value::Float(b)) => cmp_int_float(*a, *b),
        (Value::Float(a), Value::Integer(b)) => cmp_int_float(*b, *a).reverse(),
        (Value::Float(a), Value::Float(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
        _ => Ordering::Equal,
    }
}

impl ValueComparator for DefaultComparator {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => self
                .text_folding
                .fold(a)
                .as_ref()
                .cmp(self.text_folding.fold(b).as_ref()),
            _ if rank(a) == 2 && rank(b) == 2 => cmp_numbers(a, b),
            _ => rank(a).cmp(&rank(b)),
        }
    }
}

/// Per-column sort directions plus the comparator shared by all key columns.
#[derive(Clone)]
pub struct KeyOrdering {
    directions: Vec<SortDirection>,
    comparator: Arc<dyn ValueComparator>,
}

impl KeyOrdering {
    pub fn new(directions: Vec<SortDirection>, comparator: Arc<dyn ValueComparator>) -> Self {
        Self {
            directions,
            comparator,
        }
    }

    /// All columns ascending, compared with [`DefaultComparator`].
    pub fn ascending(columns: usize) -> Self {
        Self::new(
            vec![SortDirection::Ascending; columns],
            Arc::new(DefaultComparator::default()),
        )
    }

    pub fn directions(&self) -> &[SortDirection] {
        &self.directions
    }

    /// Compare two key tuples column by column, left to right.
    pub fn compare(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((x, y), direction) in a.iter().zip(b).zip(&self.directions) {
            let ord = direction.apply(self.comparator.compare(x, y));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Debug for KeyOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyOrdering")
            .field("directions", &self.directions)
            .finish_non_exhaustive()
    }
}
