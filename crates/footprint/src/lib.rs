//! Footprint: municipal building footprints joined with property assessments.
//!
//! Pipeline, per region:
//!   fetch    : page both open-data sources concurrently (`source`)
//!   ingest   : decode GeoJSON geometry, skip bad records (`ingest`)
//!   build    : typed, normalized datasets (`dataset`)
//!   join     : left join buildings to the first intersecting parcel (`join`)
//!   cache    : keep the last region's result (`cache`)
//!
//! Queries run over the cached result: structured filters (`filter`) and
//! free-text filters turned into structured ones by a resolver (`resolver`).
//! Output is a GeoJSON FeatureCollection (`feature`).

pub mod cache;
pub mod crs;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod filter;
pub mod geometry;
pub mod ingest;
pub mod join;
pub mod pipeline;
pub mod region;
pub mod resolver;
pub mod schema;
pub mod source;

pub use cache::{CacheEntry, Lookup, RegionCache};
pub use error::{FetchError, FilterError, GeometryError, JoinError, PipelineError, ResolveError};
pub use feature::FeatureCollection;
pub use filter::{apply_filter, Attribute, FilterOutcome, FilterSpec, FilterValue, Operator};
pub use join::{JoinMode, JoinedRecord};
pub use pipeline::{JoinedDataset, Pipeline};
pub use region::BoundingBox;
pub use resolver::FilterResolver;
pub use source::{PageRequest, RecordSource};
