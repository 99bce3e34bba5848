use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::chunk::{read_chunk, Chunk, ChunkKind};
use crate::directory::Directory;
use crate::error::DecodeError;
use crate::julian;
use crate::model::{Laterality, PatientRecord, SeriesKey};
use crate::records::{BscanMetadata, PatientData, Preamble};

/// Decode every data chunk listed by `dir`, in parallel, and return the
/// decoded values in file order.
///
/// Chunks whose header does not parse are skipped. `decode` returns `None` for
/// chunks the pass does not care about.
pub fn scan<T, F>(data: &[u8], dir: &Directory, decode: F) -> Vec<T>
where
    T: Send,
    F: Fn(&Chunk<'_>) -> Option<T> + Sync,
{
    let locations = dir.chunk_locations(data);
    let decoded: Vec<Option<T>> = locations
        .par_iter()
        .map(|&loc| match read_chunk(data, dir.byte_skip, loc) {
            Ok(chunk) => decode(&chunk),
            Err(e) => {
                log::debug!("skipping chunk at {}: {e}", loc.start);
                None
            }
        })
        .collect();
    let out: Vec<T> = decoded.into_iter().flatten().collect();
    log::debug!("scanned {} chunk(s), kept {}", locations.len(), out.len());
    out
}

/// Laterality as read from one preamble chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreambleLaterality {
    Known(Laterality),
    /// Parsed, but the flag is neither `R` nor `L`.
    Other,
    Unreadable,
}

impl PreambleLaterality {
    pub fn decode(chunk: &Chunk<'_>) -> Self {
        match Preamble::parse(chunk.sized_payload()) {
            Ok(p) => p.laterality().map_or(PreambleLaterality::Other, PreambleLaterality::Known),
            Err(_) => PreambleLaterality::Unreadable,
        }
    }
}

/// Per-series laterality.
///
/// The last known flag carries over: a preamble without a usable flag still
/// tags a new series with the most recent `R`/`L` seen, unless the preamble
/// could not be read at all, which clears it. The first flag assigned to a
/// series sticks.
#[derive(Clone, Debug, Default)]
pub struct LateralityTracker {
    last: Option<Laterality>,
    by_key: HashMap<SeriesKey, Laterality>,
}

impl LateralityTracker {
    pub fn observe(&mut self, key: SeriesKey, seen: PreambleLaterality) {
        match seen {
            PreambleLaterality::Known(l) => self.last = Some(l),
            PreambleLaterality::Other => {}
            PreambleLaterality::Unreadable => self.last = None,
        }
        if let Some(l) = self.last {
            self.by_key.entry(key).or_insert(l);
        }
    }

    pub fn get(&self, key: &SeriesKey) -> Option<Laterality> {
        self.by_key.get(key).copied()
    }
}

pub fn decode_patient(chunk: &Chunk<'_>) -> Result<PatientRecord, DecodeError> {
    let p = PatientData::parse(chunk.payload)?;
    Ok(PatientRecord {
        birthdate: p.decoded_birthdate(),
        patient_id: Some(p.patient_id),
        first_name: Some(p.first_name),
        surname: Some(p.surname),
        sex: Some(p.sex),
    })
}

/// Fields the volume pass takes from B-scan metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BscanSummary {
    pub acquisition: Option<NaiveDateTime>,
    pub scale_y: f32,
}

pub fn decode_bscan(chunk: &Chunk<'_>) -> Result<BscanSummary, DecodeError> {
    let b = BscanMetadata::parse(chunk.payload)?;
    Ok(BscanSummary {
        acquisition: julian::windows_ticks_to_datetime(b.acquisition_time),
        scale_y: b.scale_y,
    })
}

/// What a volume or fundus pass carries between chunks.
///
/// Patient fields: the last readable patient chunk wins. Acquisition time and
/// y spacing: the first B-scan chunk wins.
#[derive(Clone, Debug, Default)]
pub struct PassState {
    pub patient: PatientRecord,
    pub acquisition: Option<NaiveDateTime>,
    pub scale_y: Option<f32>,
    pub laterality: LateralityTracker,
    pub unknown_chunks: usize,
}

impl PassState {
    pub fn patient(&mut self, record: PatientRecord) {
        self.patient = record;
    }

    pub fn bscan(&mut self, summary: BscanSummary) {
        if self.acquisition.is_none() {
            self.acquisition = summary.acquisition;
        }
        if self.scale_y.is_none() {
            self.scale_y = Some(summary.scale_y);
        }
    }

    pub fn note_kind(&mut self, kind: ChunkKind) {
        if let ChunkKind::Unknown(code) = kind {
            self.unknown_chunks += 1;
            log::trace!("ignoring chunk type {code}");
        }
    }
}
