//! Match predicates.

use regex::{Regex, RegexBuilder};

use crate::types::{Document, Value};

use super::{StoreError, StoreResult};

/// Sort direction for [`super::Stage::Sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A match predicate over documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field is present and equal to the value. The empty marker equals `""`.
    Eq { field: String, value: Value },
    /// Field is a string (or the empty marker, read as `""`) matching the regular expression.
    Regex {
        field: String,
        pattern: String,
        case_insensitive: bool,
    },
    /// Every inner filter matches.
    And(Vec<Filter>),
}

impl Filter {
    /// Equality on one field.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive match of a literal prefix. Regex metacharacters in `prefix` are escaped.
    pub fn prefix(field: impl Into<String>, prefix: &str) -> Self {
        Filter::Regex {
            field: field.into(),
            pattern: format!("^{}", regex::escape(prefix)),
            case_insensitive: true,
        }
    }

    /// Compile patterns once so the predicate can be evaluated per document.
    pub fn compile(&self) -> StoreResult<CompiledFilter> {
        Ok(match self {
            Filter::All => CompiledFilter::All,
            Filter::Eq { field, value } => CompiledFilter::Eq {
                field: field.clone(),
                value: value.clone(),
            },
            Filter::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                let re = RegexBuilder::new(pattern)
                    .case_insensitive(*case_insensitive)
                    .build()
                    .map_err(|e| StoreError::InvalidPredicate(e.to_string()))?;
                CompiledFilter::Regex {
                    field: field.clone(),
                    re,
                }
            }
            Filter::And(inner) => CompiledFilter::And(
                inner
                    .iter()
                    .map(Filter::compile)
                    .collect::<StoreResult<Vec<_>>>()?,
            ),
        })
    }
}

/// A [`Filter`] with its patterns compiled.
#[derive(Debug, Clone)]
pub enum CompiledFilter {
    All,
    Eq { field: String, value: Value },
    Regex { field: String, re: Regex },
    And(Vec<CompiledFilter>),
}

impl CompiledFilter {
    /// Evaluate against one document.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            CompiledFilter::All => true,
            CompiledFilter::Eq { field, value } => doc.get(field).is_some_and(|v| v.matches(value)),
            CompiledFilter::Regex { field, re } => doc
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|s| re.is_match(s)),
            CompiledFilter::And(inner) => inner.iter().all(|f| f.matches(doc)),
        }
    }
}
