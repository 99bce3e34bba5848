//! The OCT volume pass.

use ndarray::Array2;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::chunk::{Chunk, ChunkKind, IND_OCT};
use crate::directory::Directory;
use crate::error::DecodeError;
use crate::intensity;
use crate::layout::DirectoryEntry;
use crate::metadata::MetadataDictionary;
use crate::model::{ContourSet, OctVolume, PatientRecord, SeriesKey, SliceOrder};
use crate::options::VolumeOptions;
use crate::records::{ContourHeader, ImageHeader};
use crate::scan::{self, BscanSummary, PassState, PreambleLaterality};
use crate::ufloat16::UFloat16Table;

/// Highest `slice_id` per series key across all directory entries, placeholder
/// entries included, in first-seen key order.
#[derive(Clone, Debug, Default)]
pub struct SliceTable {
    order: Vec<SeriesKey>,
    max_slice_id: HashMap<SeriesKey, i32>,
}

impl SliceTable {
    pub fn from_entries(entries: &[DirectoryEntry]) -> Self {
        let mut table = SliceTable::default();
        for e in entries {
            let key = e.series_key();
            match table.max_slice_id.get_mut(&key) {
                Some(max) => *max = (*max).max(e.slice_id),
                None => {
                    table.order.push(key);
                    table.max_slice_id.insert(key, e.slice_id);
                }
            }
        }
        table
    }

    pub fn keys(&self) -> &[SeriesKey] {
        &self.order
    }

    /// Number of volume slots to allocate; `None` unless some slice id is
    /// positive.
    pub fn volume_slots(&self, key: &SeriesKey) -> Option<usize> {
        let max = *self.max_slice_id.get(key)?;
        (max > 0).then(|| (max / 2) as usize + 1)
    }

    /// Number of contour slots for a key listed in the directory.
    pub fn contour_slots(&self, key: &SeriesKey) -> Option<usize> {
        let max = *self.max_slice_id.get(key)?;
        usize::try_from(max / 2 + 1).ok().filter(|&n| n > 0)
    }
}

enum VolumeEvent {
    Patient(PatientRecord),
    Bscan(BscanSummary),
    Preamble(SeriesKey, PreambleLaterality),
    Contour { key: SeriesKey, slice: i32, name: String, values: Vec<f32> },
    Slice { key: SeriesKey, slice: i32, image: Array2<f64> },
    Ignored(ChunkKind),
}

fn decode_event(chunk: &Chunk<'_>, opts: &VolumeOptions) -> Option<VolumeEvent> {
    let key = chunk.series_key();
    let slice = chunk.header.slice_index();
    let event = match chunk.kind {
        ChunkKind::Patient => match scan::decode_patient(chunk) {
            Ok(p) => VolumeEvent::Patient(p),
            Err(e) => return skip(chunk, e),
        },
        ChunkKind::Bscan => match scan::decode_bscan(chunk) {
            Ok(b) => VolumeEvent::Bscan(b),
            Err(e) => return skip(chunk, e),
        },
        ChunkKind::Preamble => VolumeEvent::Preamble(key, PreambleLaterality::decode(chunk)),
        ChunkKind::Contour => {
            let read = ContourHeader::parse(chunk.payload)
                .and_then(|h| Ok((h.width, h.name(), h.read_values(chunk.payload)?)));
            match read {
                Ok((0, name, _)) => {
                    log::debug!("empty {name} for {key} slice {slice}");
                    return None;
                }
                Ok((_, name, values)) => VolumeEvent::Contour { key, slice, name, values },
                Err(e) => {
                    log::warn!("could not read contour for {key} slice {slice}: {e}");
                    return None;
                }
            }
        }
        ChunkKind::Image if chunk.header.ind == IND_OCT => {
            let decoded = ImageHeader::parse(chunk.payload)
                .and_then(|h| h.decode_oct(chunk.payload, UFloat16Table::shared()));
            match decoded {
                Ok(mut image) => {
                    intensity::apply(&mut image, opts.legacy_intensity_transform);
                    VolumeEvent::Slice { key, slice, image }
                }
                Err(DecodeError::Shape { height: 0, .. } | DecodeError::Shape { width: 0, .. }) => {
                    log::debug!("empty OCT image for {key} slice {slice}");
                    return None;
                }
                Err(e) => {
                    log::warn!("could not reshape OCT image for {key} slice {slice}: {e}");
                    return None;
                }
            }
        }
        kind => VolumeEvent::Ignored(kind),
    };
    Some(event)
}

fn skip<T>(chunk: &Chunk<'_>, e: DecodeError) -> Option<T> {
    log::debug!("chunk type {} at {} skipped: {e}", chunk.header.chunk_type, chunk.header.pos);
    None
}

/// Contour slices for one series, before sizing.
type PendingContours = BTreeMap<String, BTreeMap<i32, Vec<f32>>>;

/// One past the highest non-negative slice index.
fn extent<'a>(indices: impl Iterator<Item = &'a i32>) -> usize {
    indices.filter_map(|&i| usize::try_from(i).ok()).max().map_or(0, |i| i + 1)
}

/// Contour length for a key listed in the directory. The listed slot count
/// is capped at the slices that actually carry an image or a contour.
fn listed_contour_len(
    key: &SeriesKey,
    table: &SliceTable,
    pending: &PendingContours,
    image_extent: usize,
) -> Option<usize> {
    let listed = table.contour_slots(key)?;
    let seen = pending.values().map(|by_slice| extent(by_slice.keys())).max().unwrap_or(0);
    let cap = seen.max(image_extent);
    if listed > cap {
        log::warn!("{key}: directory lists {listed} slice(s) but only {cap} are present");
    }
    Some(listed.min(cap))
}

fn size_contours(key: &SeriesKey, pending: PendingContours, listed: Option<usize>) -> ContourSet {
    pending
        .into_iter()
        .map(|(name, by_slice)| {
            let len = listed.unwrap_or_else(|| extent(by_slice.keys()).max(by_slice.len()));
            let mut slots = vec![None; len];
            for (slice, values) in by_slice {
                match usize::try_from(slice).ok().filter(|&i| i < len) {
                    Some(i) => slots[i] = Some(values),
                    None => log::warn!("{name} of {key}: slice {slice} outside 0..{len}, dropped"),
                }
            }
            (name, slots)
        })
        .collect()
}

/// Indexed slots for one series; only filled slots are stored.
struct Slots {
    len: usize,
    filled: BTreeMap<usize, Array2<f64>>,
}

impl Slots {
    fn extent(&self) -> usize {
        self.filled.keys().next_back().map_or(0, |&i| i + 1)
    }
}

#[derive(Default)]
struct Slices {
    allocated: HashMap<SeriesKey, Slots>,
    overflow_order: Vec<SeriesKey>,
    overflow: HashMap<SeriesKey, Vec<Array2<f64>>>,
}

impl Slices {
    fn new(table: &SliceTable) -> Self {
        let allocated = table
            .keys()
            .iter()
            .filter_map(|k| {
                let len = table.volume_slots(k)?;
                Some((*k, Slots { len, filled: BTreeMap::new() }))
            })
            .collect();
        Slices { allocated, ..Default::default() }
    }

    fn place(&mut self, key: SeriesKey, slice: i32, image: Array2<f64>) {
        if let Some(slots) = self.allocated.get_mut(&key) {
            match usize::try_from(slice).ok().filter(|&i| i < slots.len) {
                Some(i) => {
                    slots.filled.insert(i, image);
                    return;
                }
                None => log::debug!(
                    "{key}: slice {slice} outside {} slot(s), kept in file order",
                    slots.len
                ),
            }
        }
        let list = self.overflow.entry(key).or_default();
        if list.is_empty() {
            self.overflow_order.push(key);
        }
        list.push(image);
    }
}

/// Run the volume pass over `data`.
pub fn assemble(
    data: &[u8],
    dir: &Directory,
    opts: &VolumeOptions,
    metadata: Arc<MetadataDictionary>,
) -> Vec<OctVolume> {
    // 1) slot counts from the directory
    let table = SliceTable::from_entries(&dir.entries(data));
    // 2) decode chunks in parallel, file order kept
    let events = scan::scan(data, dir, |chunk| decode_event(chunk, opts));

    // 3) fold in file order
    let mut state = PassState::default();
    let mut slices = Slices::new(&table);
    let mut contours: HashMap<SeriesKey, PendingContours> = HashMap::new();
    for event in events {
        match event {
            VolumeEvent::Patient(p) => state.patient(p),
            VolumeEvent::Bscan(b) => state.bscan(b),
            VolumeEvent::Preamble(key, seen) => state.laterality.observe(key, seen),
            VolumeEvent::Contour { key, slice, name, values } => {
                contours.entry(key).or_default().entry(name).or_default().insert(slice, values);
            }
            VolumeEvent::Slice { key, slice, image } => slices.place(key, slice, image),
            VolumeEvent::Ignored(kind) => state.note_kind(kind),
        }
    }
    if state.unknown_chunks > 0 {
        log::debug!("{} chunk(s) of unknown type ignored", state.unknown_chunks);
    }

    // 4) emit volumes: directory order first, then overflow in appearance order
    let pixel_spacing =
        state.scale_y.map(|y| [opts.scale_x, f64::from(y), opts.slice_thickness]);
    let Slices { mut allocated, overflow_order, mut overflow } = slices;
    let image_extent: HashMap<SeriesKey, usize> =
        allocated.iter().map(|(k, slots)| (*k, slots.extent())).collect();
    let build = |key: SeriesKey, images: Vec<Array2<f64>>, order: SliceOrder| {
        let contours = contours.get(&key).map(|pending| {
            let seen = image_extent.get(&key).copied().unwrap_or(0);
            let listed = listed_contour_len(&key, &table, pending, seen);
            size_contours(&key, pending.clone(), listed)
        });
        OctVolume {
            series_key: key,
            slices: images,
            slice_order: order,
            patient: state.patient.clone(),
            acquisition: state.acquisition,
            laterality: state.laterality.get(&key),
            contours,
            pixel_spacing,
            metadata: Arc::clone(&metadata),
        }
    };

    let mut volumes = Vec::new();
    for key in table.keys() {
        let Some(slots) = allocated.remove(key) else { continue };
        let images: Vec<_> = slots.filled.into_values().collect();
        if !images.is_empty() {
            volumes.push(build(*key, images, SliceOrder::Indexed));
        }
    }
    for key in overflow_order {
        if let Some(images) = overflow.remove(&key) {
            volumes.push(build(key, images, SliceOrder::Appearance));
        }
    }
    log::debug!("assembled {} volume(s)", volumes.len());
    volumes
}
