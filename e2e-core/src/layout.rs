//! Fixed-size structural records of the `.e2e` container.
//!
//! ```text
//! [E2EMultipleVolumeFile .. 64 B]?   optional multi-volume prefix
//! [file header          36 B]
//! [main directory       52 B]        `current` points at the newest directory
//! ...
//! [main directory       52 B][entry 44 B] x num_entries   linked through `prev`
//! ...
//! [chunk header         60 B][payload]                     addressed by entry.start
//! ```
//! All integers are little-endian. Offsets stored in the file are relative to
//! the byte skip.

use crate::bytes::Cursor;
use crate::error::DecodeResult;
use crate::model::SeriesKey;

pub const MULTI_VOLUME_MAGIC: &[u8] = b"E2EMultipleVolumeFile"; // 21 bytes
pub const MULTI_VOLUME_SKIP: u64 = 64;

pub const FILE_HEADER_LEN: usize = 36;
pub const MAIN_DIRECTORY_LEN: usize = 52;
pub const DIRECTORY_ENTRY_LEN: usize = 44;
pub const CHUNK_HEADER_LEN: usize = 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub magic: String,
    pub version: u32,
}

impl FileHeader {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "file header");
        let magic = c.ascii(12)?;
        let version = c.u32()?;
        c.skip(20)?;
        Ok(Self { magic, version })
    }
}

/// Head of one directory block; `num_entries` entry records follow it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MainDirectory {
    pub magic: String,
    pub version: u32,
    pub num_entries: u32,
    pub current: u32,
    pub prev: u32,
}

impl MainDirectory {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "main directory");
        let magic = c.ascii(12)?;
        let version = c.u32()?;
        c.skip(20)?;
        let num_entries = c.u32()?;
        let current = c.u32()?;
        let prev = c.u32()?;
        c.skip(4)?;
        Ok(Self { magic, version, num_entries, current, prev })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub pos: u32,
    pub start: u32,
    pub size: u32,
    pub patient_db_id: u32,
    pub study_id: u32,
    pub series_id: u32,
    pub slice_id: i32,
    pub chunk_type: u32,
}

impl DirectoryEntry {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "directory entry");
        let pos = c.u32()?;
        let start = c.u32()?;
        let size = c.u32()?;
        c.skip(4)?;
        let patient_db_id = c.u32()?;
        let study_id = c.u32()?;
        let series_id = c.u32()?;
        let slice_id = c.i32()?;
        c.skip(4)?; // two u16 of unknown meaning
        let chunk_type = c.u32()?;
        c.skip(4)?;
        Ok(Self { pos, start, size, patient_db_id, study_id, series_id, slice_id, chunk_type })
    }

    /// Entries whose data start does not lie past their own position are
    /// references, not data.
    pub fn holds_data(&self) -> bool {
        self.start > self.pos
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(self.patient_db_id, self.study_id, self.series_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub magic: String,
    pub pos: u32,
    pub size: u32,
    pub patient_db_id: u32,
    pub study_id: u32,
    pub series_id: u32,
    pub slice_id: i32,
    pub ind: u16,
    pub chunk_type: u32,
}

impl ChunkHeader {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "chunk header");
        let magic = c.ascii(12)?;
        c.skip(8)?;
        let pos = c.u32()?;
        let size = c.u32()?;
        c.skip(4)?;
        let patient_db_id = c.u32()?;
        let study_id = c.u32()?;
        let series_id = c.u32()?;
        let slice_id = c.i32()?;
        let ind = c.u16()?;
        c.skip(2)?;
        let chunk_type = c.u32()?;
        c.skip(4)?;
        Ok(Self {
            magic,
            pos,
            size,
            patient_db_id,
            study_id,
            series_id,
            slice_id,
            ind,
            chunk_type,
        })
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(self.patient_db_id, self.study_id, self.series_id)
    }

    /// Slice position within the series. The format stores it doubled.
    pub fn slice_index(&self) -> i32 {
        self.slice_id / 2
    }
}
