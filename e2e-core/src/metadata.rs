//! The metadata pass: every understood chunk, grouped by category.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::chunk::{Chunk, ChunkKind, IND_FUNDUS};
use crate::directory::Directory;
use crate::error::{DecodeError, DecodeResult};
use crate::model::SeriesKey;
use crate::records::{
    BscanMetadata, ContourHeader, DeviceText, EyeData, ImageHeader, LateralityData, PatientData,
    RawRecord, TextList, UidRecord,
};
use crate::scan::scan;

/// Every category of metadata found in a file.
///
/// The four per-series text maps keep the first value seen for a series; all
/// other categories keep every occurrence in file order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MetadataDictionary {
    pub patient_data: Vec<PatientData>,
    pub bscan_data: Vec<BscanMetadata>,
    /// Headers of OCT B-scan images.
    pub image_data: Vec<ImageHeader>,
    /// Headers of fundus photos.
    pub fundus_data: Vec<ImageHeader>,
    pub laterality_data: Vec<LateralityData>,
    pub contour_data: Vec<ContourHeader>,
    pub device_data: Vec<TextList>,
    pub examined_structure: BTreeMap<SeriesKey, String>,
    pub scan_pattern: BTreeMap<SeriesKey, String>,
    pub enface_modality: BTreeMap<SeriesKey, String>,
    pub oct_modality: BTreeMap<SeriesKey, String>,
    pub localizer: Vec<RawRecord>,
    pub eye_data: Vec<EyeData>,
    pub uid_data: Vec<UidRecord>,
    pub time_data: Vec<RawRecord>,
    pub additional_device_data: Vec<DeviceRecord>,
}

/// Chunk types 1005 to 1007.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DeviceRecord {
    Text(DeviceText),
    Raw(RawRecord),
}

/// One decoded metadata chunk.
#[derive(Clone, Debug, PartialEq)]
pub enum MetadataEntry {
    Patient(PatientData),
    Bscan(BscanMetadata),
    Image { ind: u16, header: ImageHeader },
    Laterality(LateralityData),
    Contour(ContourHeader),
    DeviceName(TextList),
    ExaminedStructure(SeriesKey, String),
    ScanPattern(SeriesKey, String),
    EnfaceModality(SeriesKey, String),
    OctModality(SeriesKey, String),
    Localizer(RawRecord),
    EyeData(EyeData),
    TimeData(RawRecord),
    Uid(UidRecord),
    Device(DeviceRecord),
}

/// The `i`-th string of a text list chunk.
fn text_at(chunk: &Chunk<'_>, i: usize) -> DecodeResult<String> {
    let list = TextList::parse(chunk.payload)?;
    list.get(i)
        .map(str::to_owned)
        .ok_or_else(|| DecodeError::Layout(format!("text list has no entry {i}")))
}

impl MetadataEntry {
    /// `Ok(None)` for chunk kinds that carry no metadata.
    pub fn decode(chunk: &Chunk<'_>) -> DecodeResult<Option<Self>> {
        let code = chunk.header.chunk_type;
        let key = chunk.series_key();
        let entry = match chunk.kind {
            ChunkKind::Patient => Self::Patient(PatientData::parse(chunk.payload)?),
            ChunkKind::Bscan => Self::Bscan(BscanMetadata::parse(chunk.payload)?),
            ChunkKind::Image => Self::Image {
                ind: chunk.header.ind,
                header: ImageHeader::parse(chunk.payload)?,
            },
            ChunkKind::Laterality => Self::Laterality(LateralityData::parse(chunk.payload)?),
            ChunkKind::Contour => Self::Contour(ContourHeader::parse(chunk.payload)?),
            ChunkKind::DeviceName => Self::DeviceName(TextList::parse(chunk.payload)?),
            ChunkKind::ExaminedStructure => Self::ExaminedStructure(key, text_at(chunk, 0)?),
            ChunkKind::ScanPattern => Self::ScanPattern(key, text_at(chunk, 0)?),
            ChunkKind::EnfaceModality => Self::EnfaceModality(key, text_at(chunk, 1)?),
            ChunkKind::OctModality => Self::OctModality(key, text_at(chunk, 0)?),
            ChunkKind::Localizer => Self::Localizer(RawRecord::new(code, chunk.sized_payload())),
            ChunkKind::EyeData => Self::EyeData(EyeData::parse(chunk.payload)?),
            ChunkKind::TimeData => Self::TimeData(RawRecord::new(code, chunk.sized_payload())),
            ChunkKind::Uid => Self::Uid(UidRecord::parse(code, chunk.sized_payload())?),
            ChunkKind::DeviceText => {
                Self::Device(DeviceRecord::Text(DeviceText::parse(code, chunk.sized_payload())?))
            }
            ChunkKind::DeviceRaw => {
                Self::Device(DeviceRecord::Raw(RawRecord::new(code, chunk.sized_payload())))
            }
            ChunkKind::Preamble | ChunkKind::Unknown(_) => return Ok(None),
        };
        Ok(Some(entry))
    }
}

impl MetadataDictionary {
    pub fn absorb(&mut self, entry: MetadataEntry) {
        match entry {
            MetadataEntry::Patient(p) => self.patient_data.push(p),
            MetadataEntry::Bscan(b) => self.bscan_data.push(b),
            MetadataEntry::Image { ind, header } if ind == IND_FUNDUS => {
                self.fundus_data.push(header)
            }
            MetadataEntry::Image { header, .. } => self.image_data.push(header),
            MetadataEntry::Laterality(l) => self.laterality_data.push(l),
            MetadataEntry::Contour(c) => self.contour_data.push(c),
            MetadataEntry::DeviceName(t) => self.device_data.push(t),
            MetadataEntry::ExaminedStructure(k, s) => {
                self.examined_structure.entry(k).or_insert(s);
            }
            MetadataEntry::ScanPattern(k, s) => {
                self.scan_pattern.entry(k).or_insert(s);
            }
            MetadataEntry::EnfaceModality(k, s) => {
                self.enface_modality.entry(k).or_insert(s);
            }
            MetadataEntry::OctModality(k, s) => {
                self.oct_modality.entry(k).or_insert(s);
            }
            MetadataEntry::Localizer(r) => self.localizer.push(r),
            MetadataEntry::EyeData(e) => self.eye_data.push(e),
            MetadataEntry::TimeData(r) => self.time_data.push(r),
            MetadataEntry::Uid(u) => self.uid_data.push(u),
            MetadataEntry::Device(d) => self.additional_device_data.push(d),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serialize metadata")
    }
}

/// Run the metadata pass over `data`.
pub fn collect(data: &[u8], dir: &Directory) -> MetadataDictionary {
    let entries = scan(data, dir, |chunk| match MetadataEntry::decode(chunk) {
        Ok(entry) => entry,
        Err(e) => {
            log::debug!(
                "metadata: chunk type {} at {} skipped: {e}",
                chunk.header.chunk_type,
                chunk.header.pos
            );
            None
        }
    });
    let mut dict = MetadataDictionary::default();
    for entry in entries {
        dict.absorb(entry);
    }
    dict
}
