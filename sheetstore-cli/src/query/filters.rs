//! In-memory predicate evaluation over scanned records

use serde::Serialize;

use super::coerce::{is_true_cell, to_number};
use crate::store::Record;

/// A single test against one record. Absent columns read as `""`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Predicate {
    /// Case-insensitive substring match
    Contains { column: String, needle: String },
    /// Inclusive numeric bounds; unparsable cells read as 0
    NumberRange {
        column: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// Inclusive lexical bounds, meaningful for ISO `YYYY-MM-DD` dates
    DateRange {
        column: String,
        from: Option<String>,
        to: Option<String>,
    },
    /// Whether the cell reads exactly `TRUE` equals `expected`
    BoolEquals { column: String, expected: bool },
    /// Exact, case-sensitive equality
    Equals { column: String, value: String },
    /// Numeric `column <= limit_column` within the same record
    AtOrBelow { column: String, limit_column: String },
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Contains { column, needle } => record
                .get_or_empty(column)
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Predicate::NumberRange { column, min, max } => {
                let n = to_number(record.get_or_empty(column));
                min.is_none_or(|min| n >= min) && max.is_none_or(|max| n <= max)
            }
            Predicate::DateRange { column, from, to } => {
                let cell = record.get_or_empty(column);
                from.as_deref().is_none_or(|from| cell >= from)
                    && to.as_deref().is_none_or(|to| cell <= to)
            }
            Predicate::BoolEquals { column, expected } => {
                is_true_cell(record.get_or_empty(column)) == *expected
            }
            Predicate::Equals { column, value } => record.get_or_empty(column) == value,
            Predicate::AtOrBelow {
                column,
                limit_column,
            } => to_number(record.get_or_empty(column)) <= to_number(record.get_or_empty(limit_column)),
        }
    }
}

/// Predicates combined with AND. An empty set matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn contains(self, column: &str, needle: &str) -> Self {
        self.with(Predicate::Contains {
            column: column.to_string(),
            needle: needle.to_string(),
        })
    }

    pub fn number_range(self, column: &str, min: Option<f64>, max: Option<f64>) -> Self {
        self.with(Predicate::NumberRange {
            column: column.to_string(),
            min,
            max,
        })
    }

    pub fn date_range(self, column: &str, from: Option<&str>, to: Option<&str>) -> Self {
        self.with(Predicate::DateRange {
            column: column.to_string(),
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        })
    }

    pub fn bool_equals(self, column: &str, expected: bool) -> Self {
        self.with(Predicate::BoolEquals {
            column: column.to_string(),
            expected,
        })
    }

    pub fn equals(self, column: &str, value: &str) -> Self {
        self.with(Predicate::Equals {
            column: column.to_string(),
            value: value.to_string(),
        })
    }

    pub fn at_or_below(self, column: &str, limit_column: &str) -> Self {
        self.with(Predicate::AtOrBelow {
            column: column.to_string(),
            limit_column: limit_column.to_string(),
        })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }
}

/// Records passing every predicate, in input order
pub fn filter(rows: &[Record], set: &FilterSet) -> Vec<Record> {
    rows.iter().filter(|r| set.matches(r)).cloned().collect()
}
