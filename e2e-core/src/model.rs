use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array2;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::metadata::MetadataDictionary;

/// `(patient_db_id, study_id, series_id)`: identifies one imaging series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub patient_db_id: u32,
    pub study_id: u32,
    pub series_id: u32,
}

impl SeriesKey {
    pub fn new(patient_db_id: u32, study_id: u32, series_id: u32) -> Self {
        Self { patient_db_id, study_id, series_id }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.patient_db_id, self.study_id, self.series_id)
    }
}

// Serialized as its string form so it can key JSON maps.
impl Serialize for SeriesKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Laterality {
    #[serde(rename = "R")]
    Right,
    #[serde(rename = "L")]
    Left,
}

impl Laterality {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Laterality::Right),
            'L' => Some(Laterality::Left),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PatientRecord {
    pub patient_id: Option<String>,
    pub first_name: Option<String>,
    pub surname: Option<String>,
    pub sex: Option<String>,
    pub birthdate: Option<NaiveDate>,
}

/// How the slices of a volume were ordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SliceOrder {
    /// Placed by slice index using the directory's slice table.
    Indexed,
    /// The series key never appeared in the directory; slices are in file order.
    Appearance,
}

/// Per contour name, one slot per slice. A slot holds the layer depth for each
/// A-scan, NaN where the device marked the point invalid.
pub type ContourSet = BTreeMap<String, Vec<Option<Vec<f32>>>>;

#[derive(Clone, Debug)]
pub struct OctVolume {
    pub series_key: SeriesKey,
    pub slices: Vec<Array2<f64>>,
    pub slice_order: SliceOrder,
    pub patient: PatientRecord,
    pub acquisition: Option<NaiveDateTime>,
    pub laterality: Option<Laterality>,
    pub contours: Option<ContourSet>,
    /// `[x, y, z]` in mm; `None` when the file holds no B-scan metadata.
    pub pixel_spacing: Option<[f64; 3]>,
    pub metadata: Arc<MetadataDictionary>,
}

impl OctVolume {
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }
}

#[derive(Clone, Debug)]
pub struct FundusImage {
    /// Series key string, suffixed with `_` for repeated captures.
    pub image_key: String,
    pub series_key: SeriesKey,
    pub image: Array2<u8>,
    pub patient_id: Option<String>,
    pub laterality: Option<Laterality>,
    pub pixel_spacing: [f64; 2],
    pub metadata: Arc<MetadataDictionary>,
}
