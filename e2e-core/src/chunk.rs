use crate::bytes::Cursor;
use crate::error::DecodeResult;
use crate::layout::{ChunkHeader, CHUNK_HEADER_LEN};
use crate::model::SeriesKey;

pub const TYPE_PREAMBLE: u32 = 3;
pub const TYPE_EYE_DATA: u32 = 7;
pub const TYPE_PATIENT: u32 = 9;
pub const TYPE_LATERALITY: u32 = 11;
pub const TYPE_TIME_DATA: u32 = 39;
pub const TYPE_DEVICE_NAME: u32 = 9001;
pub const TYPE_EXAMINED_STRUCTURE: u32 = 9005;
pub const TYPE_SCAN_PATTERN: u32 = 9006;
pub const TYPE_ENFACE_MODALITY: u32 = 9007;
pub const TYPE_OCT_MODALITY: u32 = 9008;
pub const TYPE_BSCAN: u32 = 10004;
pub const TYPE_CONTOUR: u32 = 10019;
pub const TYPE_LOCALIZER: u32 = 10025;
pub const TYPE_IMAGE: u32 = 1_073_741_824;

/// `ind` value of an OCT B-scan under [`TYPE_IMAGE`].
pub const IND_OCT: u16 = 1;
/// `ind` value of a fundus photo under [`TYPE_IMAGE`].
pub const IND_FUNDUS: u16 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkKind {
    Preamble,
    EyeData,
    Patient,
    Laterality,
    TimeData,
    Uid,
    DeviceText,
    DeviceRaw,
    DeviceName,
    ExaminedStructure,
    ScanPattern,
    EnfaceModality,
    OctModality,
    Bscan,
    Contour,
    Localizer,
    Image,
    Unknown(u32),
}

impl ChunkKind {
    pub fn from_code(code: u32) -> Self {
        match code {
            TYPE_PREAMBLE => ChunkKind::Preamble,
            TYPE_EYE_DATA => ChunkKind::EyeData,
            TYPE_PATIENT => ChunkKind::Patient,
            TYPE_LATERALITY => ChunkKind::Laterality,
            TYPE_TIME_DATA => ChunkKind::TimeData,
            52 | 54 | 1000 | 1001 => ChunkKind::Uid,
            1005 | 1006 => ChunkKind::DeviceText,
            1007 => ChunkKind::DeviceRaw,
            TYPE_DEVICE_NAME => ChunkKind::DeviceName,
            TYPE_EXAMINED_STRUCTURE => ChunkKind::ExaminedStructure,
            TYPE_SCAN_PATTERN => ChunkKind::ScanPattern,
            TYPE_ENFACE_MODALITY => ChunkKind::EnfaceModality,
            TYPE_OCT_MODALITY => ChunkKind::OctModality,
            TYPE_BSCAN => ChunkKind::Bscan,
            TYPE_CONTOUR => ChunkKind::Contour,
            TYPE_LOCALIZER => ChunkKind::Localizer,
            TYPE_IMAGE => ChunkKind::Image,
            other => ChunkKind::Unknown(other),
        }
    }
}

/// Where a data chunk starts, as listed by a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkLocation {
    pub start: u32,
    pub size: u32,
}

/// A chunk whose header parsed. `payload` runs from the end of the header to
/// the end of the file; decoders take what their layout needs.
#[derive(Clone, Debug)]
pub struct Chunk<'a> {
    pub header: ChunkHeader,
    pub kind: ChunkKind,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    pub fn series_key(&self) -> SeriesKey {
        self.header.series_key()
    }

    /// The first `header.size` payload bytes, or fewer at end of file.
    pub fn sized_payload(&self) -> &'a [u8] {
        let n = (self.header.size as usize).min(self.payload.len());
        &self.payload[..n]
    }
}

/// Parse the chunk header at `location`. Anonymized files sometimes carry
/// chunks whose header is empty or garbled; those come back as `Err` and the
/// caller moves on.
pub fn read_chunk(data: &[u8], byte_skip: u64, location: ChunkLocation) -> DecodeResult<Chunk<'_>> {
    let offset = usize::try_from(u64::from(location.start) + byte_skip).unwrap_or(usize::MAX);
    let tail = data.get(offset..).unwrap_or(&[]);
    let mut c = Cursor::new(tail, "chunk header");
    let header = ChunkHeader::parse(c.take(CHUNK_HEADER_LEN)?)?;
    let kind = ChunkKind::from_code(header.chunk_type);
    Ok(Chunk { header, kind, payload: &tail[CHUNK_HEADER_LEN..] })
}
