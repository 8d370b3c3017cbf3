//! Geometry ingestion: raw source records in, records with typed geometry out.
//!
//! A record whose geometry is missing or unusable is dropped and logged
//! with its natural identifier. Nothing here fails a run.

use crate::error::GeometryError;
use crate::geometry::Areal;
use crate::schema::SourceSchema;
use serde_json::{Map, Value};

/// One record as the data source returned it.
pub type RawRecord = Map<String, Value>;

/// A record whose geometry column has been parsed and removed from the
/// attribute map.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedRecord {
    pub attributes: RawRecord,
    pub geometry: Areal,
}

#[derive(Debug, Default)]
pub struct Ingested {
    pub records: Vec<IngestedRecord>,
    pub dropped: usize,
}

/// Parses the geometry column of `record`.
pub fn parse_record(
    mut record: RawRecord,
    schema: &SourceSchema,
) -> Result<IngestedRecord, GeometryError> {
    let geometry = match record.remove(schema.geometry_column) {
        None | Some(Value::Null) => {
            return Err(GeometryError::Missing(schema.geometry_column.to_string()))
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(GeometryError::Missing(schema.geometry_column.to_string()))
        }
        Some(Value::Object(o)) if o.is_empty() => {
            return Err(GeometryError::Missing(schema.geometry_column.to_string()))
        }
        Some(value) => Areal::from_geojson(value)?,
    };
    Ok(IngestedRecord {
        attributes: record,
        geometry,
    })
}

/// Like [`parse_record`], but a rejected record is logged and dropped.
pub fn ingest_record(record: RawRecord, schema: &SourceSchema) -> Option<IngestedRecord> {
    let label = record_label(&record, schema);
    match parse_record(record, schema) {
        Ok(ingested) => Some(ingested),
        Err(e) => {
            tracing::warn!(
                source = schema.name,
                record_id = %label,
                error = %e,
                "Dropping record with unusable geometry"
            );
            None
        }
    }
}

pub fn ingest_all(records: Vec<RawRecord>, schema: &SourceSchema) -> Ingested {
    let total = records.len();
    let records: Vec<_> = records
        .into_iter()
        .filter_map(|record| ingest_record(record, schema))
        .collect();
    let dropped = total - records.len();

    if dropped > 0 {
        tracing::warn!(
            source = schema.name,
            kept = records.len(),
            dropped,
            "Some records were dropped during ingestion"
        );
    } else {
        tracing::debug!(source = schema.name, kept = records.len(), "Ingested records");
    }

    Ingested { records, dropped }
}

/// Natural identifier of a record, for diagnostics.
pub fn record_label(record: &RawRecord, schema: &SourceSchema) -> String {
    match record.get(schema.id_column) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "<no id>".to_string(),
        Some(other) => other.to_string(),
    }
}
