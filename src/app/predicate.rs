//! Composable filter predicates over reference rows
//!
//! The original tooling narrowed its reference table by concatenating query
//! strings. That is rebuilt here as a small tagged union of predicates
//! evaluated directly against typed rows, which makes the "all sentinel
//! absorbs" and the legacy/5G OR-split rules testable in isolation and
//! removes the injection-style string building. The rendered form of a
//! predicate is still human-readable so an empty result can echo exactly
//! which filter was applied.

use regex::Regex;

use crate::app::catalog::ReferenceRow;
use crate::constants::catalog::ALL_SENTINEL;
use crate::errors::{RequestError, RequestResult};

/// A filterable column of a [`ReferenceRow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Subcategory,
    TechnologyType,
    TechnologyCode,
    SpeedTier,
    StateFips,
    ProviderId,
    FileType,
}

impl Field {
    /// Column name as rendered in filter expressions
    pub fn name(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::TechnologyType => "technology_type",
            Self::TechnologyCode => "technology_code",
            Self::SpeedTier => "speed_tier",
            Self::StateFips => "state_fips",
            Self::ProviderId => "provider_id",
            Self::FileType => "file_type",
        }
    }

    /// Extract the field value from a row. `None` only for an absent
    /// speed tier.
    fn value<'a>(&self, row: &'a ReferenceRow) -> Option<&'a str> {
        match self {
            Self::Category => Some(row.category.as_str()),
            Self::Subcategory => Some(row.subcategory.as_str()),
            Self::TechnologyType => Some(row.technology_type.as_str()),
            Self::TechnologyCode => Some(row.technology_code.as_str()),
            Self::SpeedTier => row.speed_tier.as_deref(),
            Self::StateFips => Some(row.state_fips.as_str()),
            Self::ProviderId => Some(row.provider_id.as_str()),
            Self::FileType => Some(row.file_type.as_str()),
        }
    }
}

/// A filter over reference rows, composed from narrowing steps and applied
/// as one combined expression
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Matches every row
    True,
    /// Field equals a value exactly
    Equals { field: Field, value: String },
    /// Field equals any of the values (dimension union)
    OneOf { field: Field, values: Vec<String> },
    /// Field is absent (null speed tier)
    IsNull { field: Field },
    /// Field cell contains one of the code tokens on a word boundary,
    /// case-insensitive. Guards against substring collisions between
    /// codes like "40" and "400" in combined cells.
    TokenMatch {
        field: Field,
        codes: Vec<String>,
        regex: Regex,
    },
    /// All sub-predicates match
    And(Vec<Predicate>),
    /// Any sub-predicate matches
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn equals(field: Field, value: impl Into<String>) -> Self {
        Self::Equals {
            field,
            value: value.into(),
        }
    }

    pub fn one_of(field: Field, values: Vec<String>) -> Self {
        Self::OneOf { field, values }
    }

    pub fn is_null(field: Field) -> Self {
        Self::IsNull { field }
    }

    /// Build a word-boundary token matcher. The code tokens are escaped,
    /// so the pattern cannot be influenced by user input.
    pub fn token_match(field: Field, codes: Vec<String>) -> Self {
        let alternatives = codes
            .iter()
            .map(|code| regex::escape(code))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?i)\b(?:{alternatives})\b");
        let regex = Regex::new(&pattern).expect("escaped token pattern is always valid");
        Self::TokenMatch {
            field,
            codes,
            regex,
        }
    }

    /// Conjunction, flattening `True` operands away
    pub fn and(predicates: Vec<Predicate>) -> Self {
        let mut kept: Vec<Predicate> = predicates
            .into_iter()
            .filter(|p| !matches!(p, Predicate::True))
            .collect();
        match kept.len() {
            0 => Predicate::True,
            1 => kept.remove(0),
            _ => Predicate::And(kept),
        }
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        let mut kept = predicates;
        match kept.len() {
            0 => Predicate::True,
            1 => kept.remove(0),
            _ => Predicate::Or(kept),
        }
    }

    /// Evaluate against one row
    pub fn matches(&self, row: &ReferenceRow) -> bool {
        match self {
            Self::True => true,
            Self::Equals { field, value } => field.value(row) == Some(value.as_str()),
            Self::OneOf { field, values } => match field.value(row) {
                Some(cell) => values.iter().any(|v| v == cell),
                None => false,
            },
            Self::IsNull { field } => field.value(row).is_none(),
            Self::TokenMatch { field, regex, .. } => match field.value(row) {
                Some(cell) => regex.is_match(cell),
                None => false,
            },
            Self::And(children) => children.iter().all(|p| p.matches(row)),
            Self::Or(children) => children.iter().any(|p| p.matches(row)),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "*"),
            Self::Equals { field, value } => write!(f, "{} == '{}'", field.name(), value),
            Self::OneOf { field, values } => {
                let rendered = values
                    .iter()
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} in [{}]", field.name(), rendered)
            }
            Self::IsNull { field } => write!(f, "{}.isna()", field.name()),
            Self::TokenMatch { field, codes, .. } => {
                write!(f, "{} has code [{}]", field.name(), codes.join(", "))
            }
            Self::And(children) => {
                let rendered = children
                    .iter()
                    .map(|p| format!("({p})"))
                    .collect::<Vec<_>>()
                    .join(" and ");
                f.write_str(&rendered)
            }
            Self::Or(children) => {
                let rendered = children
                    .iter()
                    .map(|p| format!("({p})"))
                    .collect::<Vec<_>>()
                    .join(" or ");
                f.write_str(&rendered)
            }
        }
    }
}

/// A user-supplied dimension list after sentinel resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dimension {
    /// The list was, or contained, the "all" sentinel: no restriction
    Unrestricted,
    /// Concrete values to union over
    Values(Vec<String>),
}

impl Dimension {
    /// Resolve a raw dimension list.
    ///
    /// An empty list is a request error, not "no restriction" — only the
    /// literal sentinel means that. When the sentinel appears among other
    /// values it absorbs them, unless `sentinel_conflicts` is set, in
    /// which case the mix is rejected (the fixed-coverage technology
    /// dimension forbids it).
    pub fn resolve(
        name: &'static str,
        raw: &[String],
        sentinel_conflicts: bool,
    ) -> RequestResult<Self> {
        if raw.is_empty() {
            return Err(RequestError::MissingDimension { dimension: name });
        }
        let has_sentinel = raw.iter().any(|v| v.eq_ignore_ascii_case(ALL_SENTINEL));
        if has_sentinel {
            if sentinel_conflicts && raw.len() > 1 {
                return Err(RequestError::conflicting(format!(
                    "'{ALL_SENTINEL}' cannot be combined with explicit {name} values"
                )));
            }
            return Ok(Self::Unrestricted);
        }
        Ok(Self::Values(
            raw.iter().map(|v| v.trim().to_string()).collect(),
        ))
    }

    /// Equality predicate over the dimension: no-op when unrestricted,
    /// exact match for one value, union for several
    pub fn equality_predicate(&self, field: Field) -> Predicate {
        match self {
            Self::Unrestricted => Predicate::True,
            Self::Values(values) if values.len() == 1 => {
                Predicate::equals(field, values[0].clone())
            }
            Self::Values(values) => Predicate::one_of(field, values.clone()),
        }
    }

    /// Word-boundary token predicate over the dimension, for code cells
    /// that may hold several joined tokens
    pub fn token_predicate(&self, field: Field) -> Predicate {
        match self {
            Self::Unrestricted => Predicate::True,
            Self::Values(values) => Predicate::token_match(field, values.clone()),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Concrete values, empty when unrestricted
    pub fn values(&self) -> &[String] {
        match self {
            Self::Unrestricted => &[],
            Self::Values(values) => values,
        }
    }

    /// Whether the dimension's concrete values include `value`
    pub fn contains(&self, value: &str) -> bool {
        self.values().iter().any(|v| v == value)
    }
}
