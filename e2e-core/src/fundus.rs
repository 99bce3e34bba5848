//! The fundus photo pass.

use ndarray::Array2;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chunk::{Chunk, ChunkKind, IND_FUNDUS};
use crate::directory::Directory;
use crate::error::DecodeError;
use crate::metadata::MetadataDictionary;
use crate::model::{FundusImage, PatientRecord, SeriesKey};
use crate::options::FundusOptions;
use crate::records::ImageHeader;
use crate::scan::{self, PassState, PreambleLaterality};

enum FundusEvent {
    Patient(PatientRecord),
    Preamble(SeriesKey, PreambleLaterality),
    Image(SeriesKey, Array2<u8>),
}

fn decode_event(chunk: &Chunk<'_>) -> Option<FundusEvent> {
    let key = chunk.series_key();
    match chunk.kind {
        ChunkKind::Patient => match scan::decode_patient(chunk) {
            Ok(p) => Some(FundusEvent::Patient(p)),
            Err(e) => {
                log::debug!("patient chunk at {} skipped: {e}", chunk.header.pos);
                None
            }
        },
        ChunkKind::Preamble => Some(FundusEvent::Preamble(key, PreambleLaterality::decode(chunk))),
        ChunkKind::Image if chunk.header.ind == IND_FUNDUS => {
            match ImageHeader::parse(chunk.payload).and_then(|h| h.decode_fundus(chunk.payload)) {
                Ok(image) => Some(FundusEvent::Image(key, image)),
                Err(e @ DecodeError::Shape { available, .. }) if available > 0 => {
                    log::warn!("could not reshape fundus image for {key}: {e}");
                    None
                }
                Err(e) => {
                    log::debug!("fundus image for {key} skipped: {e}");
                    None
                }
            }
        }
        _ => None,
    }
}

/// Images in insertion order, addressable by image key.
#[derive(Default)]
struct KeyedImages {
    items: Vec<(String, SeriesKey, Array2<u8>)>,
    index: HashMap<String, usize>,
}

impl KeyedImages {
    /// Store `image` under the series key string. A repeated key either
    /// replaces the earlier image in place or, with `keep_repeats`, gets `_`
    /// appended until it is unique.
    fn insert(&mut self, key: SeriesKey, image: Array2<u8>, keep_repeats: bool) {
        let mut name = key.to_string();
        if keep_repeats {
            while self.index.contains_key(&name) {
                name.push('_');
            }
        }
        match self.index.get(&name) {
            Some(&i) => self.items[i] = (name, key, image),
            None => {
                self.index.insert(name.clone(), self.items.len());
                self.items.push((name, key, image));
            }
        }
    }
}

/// Run the fundus pass over `data`.
pub fn assemble(
    data: &[u8],
    dir: &Directory,
    opts: &FundusOptions,
    metadata: Arc<MetadataDictionary>,
) -> Vec<FundusImage> {
    let events = scan::scan(data, dir, decode_event);

    let mut state = PassState::default();
    let mut images = KeyedImages::default();
    for event in events {
        match event {
            FundusEvent::Patient(p) => state.patient(p),
            FundusEvent::Preamble(key, seen) => state.laterality.observe(key, seen),
            FundusEvent::Image(key, image) => images.insert(key, image, opts.extract_scan_repeats),
        }
    }

    let out: Vec<_> = images
        .items
        .into_iter()
        .map(|(image_key, series_key, image)| FundusImage {
            image_key,
            series_key,
            image,
            patient_id: state.patient.patient_id.clone(),
            laterality: state.laterality.get(&series_key),
            pixel_spacing: [opts.scale_x, opts.scale_x],
            metadata: Arc::clone(&metadata),
        })
        .collect();
    log::debug!("assembled {} fundus image(s)", out.len());
    out
}
