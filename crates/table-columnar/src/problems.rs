//! Non-fatal data-quality problems.
//!
//! Problems are never raised as errors: scans keep going and the final result carries the
//! accumulated problems next to the computed output. [`AggregatedProblems`] keeps an exact count
//! per [`ProblemKind`] and a bounded list of detailed samples, so a column with millions of bad
//! cells does not turn into millions of diagnostics.

use crate::types::IntegerType;
use std::collections::BTreeMap;
use std::fmt;

/// Default number of detailed samples kept per problem kind.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProblemKind {
    InvalidFormat,
    MismatchedQuote,
    FloatingPointGrouping,
    NumberOutOfRange,
    ArithmeticOverflow,
    UnquotedDelimiter,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Problem {
    InvalidFormat {
        column: Option<String>,
        cell: String,
    },
    MismatchedQuote {
        cell_text: String,
    },
    /// A floating-point value took part in equality-based grouping.
    FloatingPointGrouping {
        column: String,
        row: usize,
    },
    NumberOutOfRange {
        value: i64,
        target: IntegerType,
    },
    ArithmeticOverflow {
        column: String,
    },
    UnquotedDelimiter {
        column: String,
        cell: String,
    },
}

impl Problem {
    pub fn kind(&self) -> ProblemKind {
        match self {
            Problem::InvalidFormat { .. } => ProblemKind::InvalidFormat,
            Problem::MismatchedQuote { .. } => ProblemKind::MismatchedQuote,
            Problem::FloatingPointGrouping { .. } => ProblemKind::FloatingPointGrouping,
            Problem::NumberOutOfRange { .. } => ProblemKind::NumberOutOfRange,
            Problem::ArithmeticOverflow { .. } => ProblemKind::ArithmeticOverflow,
            Problem::UnquotedDelimiter { .. } => ProblemKind::UnquotedDelimiter,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::InvalidFormat {
                column: Some(column),
                cell,
            } => write!(f, "invalid format in column {column}: {cell:?}"),
            Problem::InvalidFormat { column: None, cell } => {
                write!(f, "invalid format: {cell:?}")
            }
            Problem::MismatchedQuote { cell_text } => {
                write!(f, "mismatched quote in cell {cell_text:?}")
            }
            Problem::FloatingPointGrouping { column, row } => write!(
                f,
                "grouping on floating-point value in column {column} at row {row}; equality of floats is unreliable"
            ),
            Problem::NumberOutOfRange { value, target } => {
                write!(f, "{value} does not fit in {target}; stored as missing")
            }
            Problem::ArithmeticOverflow { column } => {
                write!(f, "arithmetic overflow while aggregating column {column}")
            }
            Problem::UnquotedDelimiter { column, cell } => write!(
                f,
                "value {cell:?} in column {column} contains the delimiter but no quote character is set"
            ),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Occurrences {
    count: usize,
    samples: Vec<Problem>,
}

/// Problems grouped by kind: exact counts plus up to `sample_limit` samples per kind.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregatedProblems {
    by_kind: BTreeMap<ProblemKind, Occurrences>,
    sample_limit: usize,
}

impl Default for AggregatedProblems {
    fn default() -> Self {
        Self::with_sample_limit(DEFAULT_SAMPLE_LIMIT)
    }
}

impl AggregatedProblems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self {
            by_kind: BTreeMap::new(),
            sample_limit,
        }
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }

    pub fn add(&mut self, problem: Problem) {
        let entry = self.by_kind.entry(problem.kind()).or_default();
        entry.count += 1;
        if entry.samples.len() < self.sample_limit {
            entry.samples.push(problem);
        }
    }

    /// Fold `other` into `self`. Counts add up exactly; samples fill the remaining budget.
    pub fn merge_from(&mut self, other: &AggregatedProblems) {
        for (kind, theirs) in &other.by_kind {
            let ours = self.by_kind.entry(*kind).or_default();
            ours.count += theirs.count;
            let room = self.sample_limit.saturating_sub(ours.samples.len());
            ours.samples.extend(theirs.samples.iter().take(room).cloned());
        }
    }

    /// Merge every part into a new record that keeps the first part's sample limit.
    pub fn merge<'a>(parts: impl IntoIterator<Item = &'a AggregatedProblems>) -> Self {
        let mut parts = parts.into_iter();
        let Some(first) = parts.next() else {
            return Self::default();
        };
        let mut merged = Self::with_sample_limit(first.sample_limit);
        merged.merge_from(first);
        for part in parts {
            merged.merge_from(part);
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }

    /// Total number of problem occurrences, including those without a kept sample.
    pub fn count(&self) -> usize {
        self.by_kind.values().map(|o| o.count).sum()
    }

    pub fn count_of(&self, kind: ProblemKind) -> usize {
        self.by_kind.get(&kind).map(|o| o.count).unwrap_or(0)
    }

    pub fn samples(&self, kind: ProblemKind) -> &[Problem] {
        self.by_kind
            .get(&kind)
            .map(|o| o.samples.as_slice())
            .unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = ProblemKind> + '_ {
        self.by_kind.keys().copied()
    }

    /// All kept samples, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = &Problem> + '_ {
        self.by_kind.values().flat_map(|o| o.samples.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemError {
    #[error("problem details are not tracked by a simplified problem aggregator")]
    DetailNotTracked,
}

/// Sink for data-quality problems found while scanning cells.
pub trait ProblemAggregator {
    fn report(&mut self, problem: Problem);

    fn report_invalid_format(&mut self, cell: &str) {
        self.report(Problem::InvalidFormat {
            column: None,
            cell: cell.to_owned(),
        });
    }

    fn report_mismatched_quote(&mut self, cell_text: &str) {
        self.report(Problem::MismatchedQuote {
            cell_text: cell_text.to_owned(),
        });
    }

    fn has_problems(&self) -> bool;

    fn aggregated_problems(&self) -> Result<AggregatedProblems, ProblemError>;
}

/// Records every problem occurrence.
#[derive(Clone, Debug, Default)]
pub struct DetailedProblemAggregator {
    problems: AggregatedProblems,
}

impl DetailedProblemAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_limit(sample_limit: usize) -> Self {
        Self {
            problems: AggregatedProblems::with_sample_limit(sample_limit),
        }
    }

    pub fn problems(&self) -> &AggregatedProblems {
        &self.problems
    }

    pub fn into_problems(self) -> AggregatedProblems {
        self.problems
    }
}

impl ProblemAggregator for DetailedProblemAggregator {
    fn report(&mut self, problem: Problem) {
        self.problems.add(problem);
    }

    fn has_problems(&self) -> bool {
        !self.problems.is_empty()
    }

    fn aggregated_problems(&self) -> Result<AggregatedProblems, ProblemError> {
        Ok(self.problems.clone())
    }
}

/// Only remembers whether any problem occurred.
///
/// Meant for hot paths whose callers never need diagnostics; asking it for details is a bug in
/// the caller and fails with [`ProblemError::DetailNotTracked`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SimplifiedProblemAggregator {
    has_problems: bool,
}

impl SimplifiedProblemAggregator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProblemAggregator for SimplifiedProblemAggregator {
    fn report(&mut self, _problem: Problem) {
        self.has_problems = true;
    }

    fn has_problems(&self) -> bool {
        self.has_problems
    }

    fn aggregated_problems(&self) -> Result<AggregatedProblems, ProblemError> {
        Err(ProblemError::DetailNotTracked)
    }
}
