//! Error types for the footprint pipeline.
//!
//! Each stage owns its error type so callers can tell a per-record skip
//! apart from a run-aborting failure.

use thiserror::Error;

/// Why a single record's geometry was rejected during ingestion.
///
/// Never aborts a run; the record is logged and skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry field '{0}' is missing or null")]
    Missing(String),

    #[error("malformed geometry: {0}")]
    Malformed(String),

    #[error("unsupported geometry type '{0}'")]
    UnsupportedType(String),

    #[error("degenerate geometry: {0}")]
    Degenerate(&'static str),

    #[error("geometry contains non-finite coordinates")]
    NonFinite,
}

/// Failure fetching an entire upstream source.
///
/// Always escalates: a run never continues with a partial dataset.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error from {source_name}: {message}")]
    Transport {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name} returned HTTP {status}")]
    Status {
        source_name: &'static str,
        status: u16,
    },

    #[error("failed to decode {source_name} response: {message}")]
    Decode {
        source_name: &'static str,
        message: String,
    },
}

/// Failure inside the spatial join. Caught by the engine and turned into
/// degraded output.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JoinError {
    #[error("reprojection of parcel {index} produced non-finite coordinates")]
    Reprojection { index: usize },

    #[error("building {building_id} has an invalid footprint")]
    InvalidFootprint { building_id: String },
}

/// A filter triple that cannot be applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown filter attribute '{0}'")]
    UnknownAttribute(String),

    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{operator}' is not supported for attribute '{attribute}'")]
    UnsupportedFilter {
        attribute: &'static str,
        operator: &'static str,
    },

    #[error("invalid value {value} for attribute '{attribute}'")]
    InvalidFilterValue {
        attribute: &'static str,
        value: String,
    },
}

/// Failure turning free text into a filter.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("resolver request failed: {0}")]
    Transport(String),

    #[error("unexpected resolver response format")]
    UnexpectedFormat,

    #[error("failed to parse resolver output as JSON: {0}")]
    MalformedOutput(String),

    #[error("resolver output is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("resolver returned an invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),
}

/// Failure of a whole ingest → build → join run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to fetch {source_name} data: {error}")]
    Fetch {
        source_name: &'static str,
        #[source]
        error: FetchError,
    },
}

impl From<FetchError> for PipelineError {
    fn from(error: FetchError) -> Self {
        let source_name = match &error {
            FetchError::Transport { source_name, .. }
            | FetchError::Status { source_name, .. }
            | FetchError::Decode { source_name, .. } => *source_name,
        };
        PipelineError::Fetch { source_name, error }
    }
}
