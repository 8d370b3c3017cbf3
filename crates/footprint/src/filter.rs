//! Filter engine: validates and applies an (attribute, operator, value)
//! triple against joined records.
//!
//! Records whose target attribute is null never match. Numeric comparisons
//! use exact equality for `=`; there is no tolerance, so a height computed
//! by subtraction may miss a literal that looks equal.

use crate::dataset::coerce_number;
use crate::error::FilterError;
use crate::join::JoinedRecord;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Height,
    AssessedValue,
    LandUseDesignation,
    YearOfConstruction,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::Height,
        Attribute::AssessedValue,
        Attribute::LandUseDesignation,
        Attribute::YearOfConstruction,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::Height => "height",
            Attribute::AssessedValue => "assessed_value",
            Attribute::LandUseDesignation => "land_use_designation",
            Attribute::YearOfConstruction => "year_of_construction",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, Attribute::LandUseDesignation)
    }

    pub fn supports(self, operator: Operator) -> bool {
        match operator {
            Operator::Gt | Operator::Lt => self.is_numeric(),
            Operator::Eq => true,
            Operator::Contains => !self.is_numeric(),
        }
    }
}

impl FromStr for Attribute {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| FilterError::UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "contains")]
    Contains,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Eq => "=",
            Operator::Contains => "contains",
        }
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            "=" => Ok(Operator::Eq),
            "contains" => Ok(Operator::Contains),
            other => Err(FilterError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter operand, typed once at validation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{n}"),
            FilterValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterSpec {
    pub attribute: Attribute,
    pub operator: Operator,
    pub value: FilterValue,
}

impl FilterSpec {
    /// Validates a loosely-typed triple: the attribute and operator must be
    /// known and compatible, and numeric attributes need a numeric value.
    pub fn parse(attribute: &str, operator: &str, value: &Value) -> Result<Self, FilterError> {
        let attribute: Attribute = attribute.parse()?;
        let operator: Operator = operator.parse()?;
        check_supported(attribute, operator)?;

        let value = if attribute.is_numeric() {
            let n = coerce_number(value).ok_or_else(|| FilterError::InvalidFilterValue {
                attribute: attribute.as_str(),
                value: value.to_string(),
            })?;
            FilterValue::Number(n)
        } else {
            match value {
                Value::String(s) => FilterValue::Text(s.clone()),
                Value::Number(n) => FilterValue::Text(n.to_string()),
                Value::Bool(b) => FilterValue::Text(b.to_string()),
                other => {
                    return Err(FilterError::InvalidFilterValue {
                        attribute: attribute.as_str(),
                        value: other.to_string(),
                    })
                }
            }
        };

        Ok(Self {
            attribute,
            operator,
            value,
        })
    }
}

impl FilterSpec {
    /// Rejects attribute/operator pairs no record could be matched with.
    ///
    /// `parse` already enforces this; specs assembled elsewhere, such as by
    /// a [`FilterResolver`](crate::resolver::FilterResolver) implementation,
    /// are checked again before use.
    pub fn validate(&self) -> Result<(), FilterError> {
        check_supported(self.attribute, self.operator)
    }
}

fn check_supported(attribute: Attribute, operator: Operator) -> Result<(), FilterError> {
    if attribute.supports(operator) {
        Ok(())
    } else {
        Err(FilterError::UnsupportedFilter {
            attribute: attribute.as_str(),
            operator: operator.as_str(),
        })
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.attribute, self.operator, self.value)
    }
}

/// Result of applying a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOutcome {
    Matched(Vec<JoinedRecord>),
    /// Matching failed; `records` is every record with a non-null target
    /// attribute, unfiltered otherwise.
    Lenient {
        records: Vec<JoinedRecord>,
        error: FilterError,
    },
}

impl FilterOutcome {
    pub fn records(&self) -> &[JoinedRecord] {
        match self {
            FilterOutcome::Matched(records) | FilterOutcome::Lenient { records, .. } => records,
        }
    }

    pub fn into_records(self) -> Vec<JoinedRecord> {
        match self {
            FilterOutcome::Matched(records) | FilterOutcome::Lenient { records, .. } => records,
        }
    }
}

#[derive(Clone, Copy)]
enum Target<'a> {
    Number(f64),
    Text(&'a str),
}

fn target(record: &JoinedRecord, attribute: Attribute) -> Option<Target<'_>> {
    match attribute {
        Attribute::Height => record.height.map(Target::Number),
        Attribute::AssessedValue => record.assessed_value.map(Target::Number),
        Attribute::YearOfConstruction => record
            .year_of_construction
            .map(|y| Target::Number(f64::from(y))),
        Attribute::LandUseDesignation => record.land_use_designation.as_deref().map(Target::Text),
    }
}

fn evaluate(target: Target<'_>, spec: &FilterSpec) -> Result<bool, FilterError> {
    match (target, spec.operator, &spec.value) {
        (Target::Number(x), Operator::Gt, FilterValue::Number(v)) => Ok(x > *v),
        (Target::Number(x), Operator::Lt, FilterValue::Number(v)) => Ok(x < *v),
        (Target::Number(x), Operator::Eq, FilterValue::Number(v)) => Ok(x == *v),
        (Target::Text(s), Operator::Eq, FilterValue::Text(v)) => Ok(s.to_lowercase() == v.to_lowercase()),
        (Target::Text(s), Operator::Contains, FilterValue::Text(v)) => {
            Ok(s.to_lowercase().contains(&v.to_lowercase()))
        }
        (Target::Number(_), _, FilterValue::Text(v)) => Err(FilterError::InvalidFilterValue {
            attribute: spec.attribute.as_str(),
            value: format!("{v:?}"),
        }),
        _ => Err(FilterError::UnsupportedFilter {
            attribute: spec.attribute.as_str(),
            operator: spec.operator.as_str(),
        }),
    }
}

/// Returns the records matching `spec`, in input order.
///
/// An unsupported attribute/operator pair is rejected before any record is
/// looked at. Specs built through [`FilterSpec::parse`] always match
/// cleanly; a spec assembled by hand with a value that does not fit its
/// attribute yields [`FilterOutcome::Lenient`] carrying the null-filtered
/// records.
pub fn apply_filter(records: &[JoinedRecord], spec: &FilterSpec) -> Result<FilterOutcome, FilterError> {
    spec.validate()?;

    let candidates: Vec<(&JoinedRecord, Target<'_>)> = records
        .iter()
        .filter_map(|r| target(r, spec.attribute).map(|t| (r, t)))
        .collect();

    let mut matched = Vec::new();
    let mut failure = None;
    for (record, value) in &candidates {
        match evaluate(*value, spec) {
            Ok(true) => matched.push((*record).clone()),
            Ok(false) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    Ok(match failure {
        None => FilterOutcome::Matched(matched),
        Some(error) => {
            tracing::warn!(
                filter = %spec,
                error = %error,
                "Filter failed, returning null-filtered records"
            );
            FilterOutcome::Lenient {
                records: candidates.into_iter().map(|(r, _)| r.clone()).collect(),
                error,
            }
        }
    })
}
