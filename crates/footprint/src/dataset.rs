//! Dataset builder: typed collections from ingested records.
//!
//! Declared numeric columns are coerced (anything unparsable becomes `None`,
//! never an error) and every declared column is present after
//! normalization. An empty input still yields a dataset that reports the
//! full declared column list.

use crate::crs::Crs;
use crate::geometry::Areal;
use crate::ingest::{record_label, IngestedRecord, RawRecord};
use crate::schema::{SourceSchema, ASSESSMENTS, BUILDINGS};
use serde_json::{Number, Value};
use std::collections::HashSet;

/// Coerces a JSON value to a finite number: numbers pass through, numeric
/// strings are parsed, everything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerces a JSON value to text. Null and empty strings are `None`.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_year(value: &Value) -> Option<i32> {
    let n = coerce_number(value)?;
    (n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64).then_some(n as i32)
}

fn field<'a>(attributes: &'a RawRecord, column: &str) -> &'a Value {
    attributes.get(column).unwrap_or(&Value::Null)
}

/// Fills every declared column of `schema` (missing → `null`) and rewrites
/// numeric columns as JSON numbers or `null`.
pub fn normalize_attributes(attributes: &mut RawRecord, schema: &SourceSchema) {
    for column in schema.attribute_columns() {
        let slot = attributes.entry(column).or_insert(Value::Null);
        if schema.is_numeric(column) {
            *slot = coerce_number(slot)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
    }
}

/// A typed row built from one ingested record.
pub trait Entity: Sized {
    const SCHEMA: &'static SourceSchema;

    /// Builds a row from normalized attributes. `None` drops the record.
    fn from_record(record: IngestedRecord) -> Option<Self>;

    /// Identity used to drop duplicates; `None` keeps every row.
    fn unique_key(&self) -> Option<&str> {
        None
    }

    fn geometry(&self) -> &Areal;

    fn set_geometry(&mut self, geometry: Areal);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: String,
    pub ground_elevation: Option<f64>,
    pub roof_elevation: Option<f64>,
    /// `roof_elevation - ground_elevation` when both are known.
    pub height: Option<f64>,
    pub footprint: Areal,
}

impl Building {
    pub fn new(
        id: impl Into<String>,
        ground_elevation: Option<f64>,
        roof_elevation: Option<f64>,
        footprint: Areal,
    ) -> Self {
        let height = match (ground_elevation, roof_elevation) {
            (Some(ground), Some(roof)) => Some(roof - ground),
            _ => None,
        };
        Self {
            id: id.into(),
            ground_elevation,
            roof_elevation,
            height,
            footprint,
        }
    }
}

impl Entity for Building {
    const SCHEMA: &'static SourceSchema = &BUILDINGS;

    fn from_record(record: IngestedRecord) -> Option<Self> {
        let a = &record.attributes;
        let Some(id) = coerce_text(field(a, "struct_id")) else {
            tracing::warn!(source = BUILDINGS.name, "Dropping building without struct_id");
            return None;
        };
        Some(Building::new(
            id,
            coerce_number(field(a, "grd_elev_min_z")),
            coerce_number(field(a, "rooftop_elev_z")),
            record.geometry,
        ))
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.id)
    }

    fn geometry(&self) -> &Areal {
        &self.footprint
    }

    fn set_geometry(&mut self, geometry: Areal) {
        self.footprint = geometry;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub roll_number: Option<String>,
    pub address: Option<String>,
    pub assessed_value: Option<f64>,
    pub land_use_designation: Option<String>,
    pub year_of_construction: Option<i32>,
    pub parcel: Areal,
}

impl Entity for Assessment {
    const SCHEMA: &'static SourceSchema = &ASSESSMENTS;

    fn from_record(record: IngestedRecord) -> Option<Self> {
        let a = &record.attributes;
        Some(Assessment {
            roll_number: coerce_text(field(a, "roll_number")),
            address: coerce_text(field(a, "address")),
            assessed_value: coerce_number(field(a, "assessed_value")),
            land_use_designation: coerce_text(field(a, "land_use_designation")),
            year_of_construction: coerce_year(field(a, "year_of_construction")),
            parcel: record.geometry,
        })
    }

    fn geometry(&self) -> &Areal {
        &self.parcel
    }

    fn set_geometry(&mut self, geometry: Areal) {
        self.parcel = geometry;
    }
}

/// Typed rows of one source, tagged with their coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    pub crs: Crs,
    rows: Vec<T>,
}

impl<T: Entity> Dataset<T> {
    /// Builds a WGS84 dataset from ingested records.
    pub fn build(records: Vec<IngestedRecord>) -> Self {
        let schema = T::SCHEMA;
        let mut seen = HashSet::new();
        let mut rows = Vec::with_capacity(records.len());

        for mut record in records {
            normalize_attributes(&mut record.attributes, schema);
            let label = record_label(&record.attributes, schema);
            let Some(row) = T::from_record(record) else {
                continue;
            };
            if let Some(key) = row.unique_key() {
                if !seen.insert(key.to_string()) {
                    tracing::warn!(
                        source = schema.name,
                        record_id = %label,
                        "Dropping duplicate record"
                    );
                    continue;
                }
            }
            rows.push(row);
        }

        tracing::debug!(source = schema.name, rows = rows.len(), "Built dataset");
        Self::from_rows(rows, Crs::Wgs84)
    }

    pub fn from_rows(rows: Vec<T>, crs: Crs) -> Self {
        Self { crs, rows }
    }

    pub fn empty() -> Self {
        Self::from_rows(Vec::new(), Crs::Wgs84)
    }

    /// Declared attribute columns, present even when the dataset is empty.
    pub fn columns(&self) -> Vec<&'static str> {
        T::SCHEMA.attribute_columns()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Entity> Default for Dataset<T> {
    fn default() -> Self {
        Self::empty()
    }
}
