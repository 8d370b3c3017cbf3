//! GeoJSON output for joined records.
//!
//! Properties carry every non-geometry field of a [`JoinedRecord`]; missing
//! values are explicit `null`s, never omitted keys.

use crate::geometry::Areal;
use crate::join::JoinedRecord;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    pub id: &'a str,
    pub geometry: &'a Areal,
    pub properties: &'a JoinedRecord,
}

#[derive(Debug, Serialize)]
pub struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature<'a>>,
    /// Foreign member explaining an empty result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl<'a> FeatureCollection<'a> {
    pub fn new(records: &'a [JoinedRecord]) -> Self {
        Self {
            kind: "FeatureCollection",
            features: records
                .iter()
                .map(|record| Feature {
                    kind: "Feature",
                    id: &record.building_id,
                    geometry: &record.footprint,
                    properties: record,
                })
                .collect(),
            message: None,
        }
    }

    /// Attaches `message` when the collection has no features.
    pub fn with_empty_message(mut self, message: &'static str) -> Self {
        if self.features.is_empty() {
            self.message = Some(message);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
