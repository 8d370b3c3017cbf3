//! Spatial join of building footprints against assessment parcels.
//!
//! Left join: every building appears exactly once, in input order. A
//! building that intersects several parcels takes the first one in
//! assessment input order. That order is whatever the data source returned,
//! so the attached parcel can change between runs when parcels overlap.
//!
//! The engine never fails. When there is nothing to join against, or the
//! join itself hits bad geometry, it returns buildings-only output and says
//! why in [`JoinMode::Degraded`].

use crate::crs::Crs;
use crate::dataset::{Assessment, Building, Dataset, Entity};
use crate::error::JoinError;
use crate::geometry::Areal;
use rstar::{RTree, RTreeObject, AABB};
use serde::Serialize;
use std::fmt;

/// One building with the attributes of at most one parcel attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedRecord {
    pub building_id: String,
    pub height: Option<f64>,
    pub roll_number: Option<String>,
    pub address: Option<String>,
    pub assessed_value: Option<f64>,
    pub land_use_designation: Option<String>,
    pub year_of_construction: Option<i32>,
    #[serde(skip)]
    pub footprint: Areal,
}

impl JoinedRecord {
    pub fn unmatched(building: Building) -> Self {
        Self {
            building_id: building.id,
            height: building.height,
            roll_number: None,
            address: None,
            assessed_value: None,
            land_use_designation: None,
            year_of_construction: None,
            footprint: building.footprint,
        }
    }

    pub fn matched(building: Building, assessment: &Assessment) -> Self {
        Self {
            roll_number: assessment.roll_number.clone(),
            address: assessment.address.clone(),
            assessed_value: assessment.assessed_value,
            land_use_designation: assessment.land_use_designation.clone(),
            year_of_construction: assessment.year_of_construction,
            ..Self::unmatched(building)
        }
    }

    pub fn has_assessment(&self) -> bool {
        self.roll_number.is_some()
            || self.address.is_some()
            || self.assessed_value.is_some()
            || self.land_use_designation.is_some()
            || self.year_of_construction.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DegradedReason {
    NoAssessments,
    NoUsableParcels,
    Failed(JoinError),
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::NoAssessments => write!(f, "no assessment records"),
            DegradedReason::NoUsableParcels => write!(f, "no assessment has usable geometry"),
            DegradedReason::Failed(e) => write!(f, "join failed: {e}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinMode {
    /// Intersection join ran; `matched` buildings received parcel attributes.
    Joined { matched: usize },
    /// Buildings only, every assessment field is null.
    Degraded(DegradedReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    pub records: Vec<JoinedRecord>,
    pub mode: JoinMode,
}

impl JoinOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self.mode, JoinMode::Degraded(_))
    }
}

struct ParcelEnvelope {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for ParcelEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(areal: &Areal) -> Option<AABB<[f64; 2]>> {
    let rect = areal.bounding_rect()?;
    Some(AABB::from_corners(
        [rect.min().x, rect.min().y],
        [rect.max().x, rect.max().y],
    ))
}

/// Joins `buildings` against `assessments`. `|records| == |buildings|`.
pub fn spatial_join(buildings: Dataset<Building>, assessments: Dataset<Assessment>) -> JoinOutcome {
    if assessments.is_empty() {
        return degraded(buildings, DegradedReason::NoAssessments);
    }
    if !assessments
        .rows()
        .iter()
        .any(|a| a.parcel.bounding_rect().is_some())
    {
        return degraded(buildings, DegradedReason::NoUsableParcels);
    }

    let target = buildings.crs;
    let parcels = match align(assessments, target) {
        Ok(parcels) => parcels,
        Err(e) => return degraded(buildings, DegradedReason::Failed(e)),
    };
    let matches = match match_parcels(buildings.rows(), &parcels) {
        Ok(matches) => matches,
        Err(e) => return degraded(buildings, DegradedReason::Failed(e)),
    };

    let mut matched = 0;
    let records: Vec<_> = buildings
        .into_rows()
        .into_iter()
        .zip(matches)
        .map(|(building, parcel)| match parcel {
            Some(index) => {
                matched += 1;
                JoinedRecord::matched(building, &parcels[index])
            }
            None => JoinedRecord::unmatched(building),
        })
        .collect();

    tracing::info!(
        buildings = records.len(),
        parcels = parcels.len(),
        matched,
        "Spatial join complete"
    );
    JoinOutcome {
        records,
        mode: JoinMode::Joined { matched },
    }
}

fn degraded(buildings: Dataset<Building>, reason: DegradedReason) -> JoinOutcome {
    tracing::warn!(
        buildings = buildings.len(),
        reason = %reason,
        "Proceeding with building data only"
    );
    JoinOutcome {
        records: buildings
            .into_rows()
            .into_iter()
            .map(JoinedRecord::unmatched)
            .collect(),
        mode: JoinMode::Degraded(reason),
    }
}

/// Brings parcels into `target`. Buildings never move.
fn align(assessments: Dataset<Assessment>, target: Crs) -> Result<Vec<Assessment>, JoinError> {
    let source = assessments.crs;
    if source == target {
        return Ok(assessments.into_rows());
    }

    tracing::warn!(
        assessments = %source,
        buildings = %target,
        "CRS mismatch, aligning assessments to buildings"
    );
    assessments
        .into_rows()
        .into_iter()
        .enumerate()
        .map(|(index, mut assessment)| {
            let parcel = source.reproject(assessment.geometry(), target);
            if !parcel.is_finite() {
                return Err(JoinError::Reprojection { index });
            }
            assessment.set_geometry(parcel);
            Ok(assessment)
        })
        .collect()
}

/// For each building, the index of the first parcel (in `parcels` order)
/// whose geometry intersects its footprint.
fn match_parcels(
    buildings: &[Building],
    parcels: &[Assessment],
) -> Result<Vec<Option<usize>>, JoinError> {
    let tree = RTree::bulk_load(
        parcels
            .iter()
            .enumerate()
            .filter_map(|(index, a)| {
                envelope_of(&a.parcel).map(|envelope| ParcelEnvelope { index, envelope })
            })
            .collect(),
    );

    buildings
        .iter()
        .map(|building| {
            let invalid = || JoinError::InvalidFootprint {
                building_id: building.id.clone(),
            };
            if !building.footprint.is_finite() {
                return Err(invalid());
            }
            let envelope = envelope_of(&building.footprint).ok_or_else(invalid)?;
            Ok(tree
                .locate_in_envelope_intersecting(&envelope)
                .filter(|candidate| parcels[candidate.index].parcel.intersects(&building.footprint))
                .map(|candidate| candidate.index)
                .min())
        })
        .collect()
}
