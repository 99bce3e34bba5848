#![allow(dead_code)]

use e2e_core::chunk::{
    TYPE_BSCAN, TYPE_CONTOUR, TYPE_IMAGE, TYPE_PATIENT, TYPE_PREAMBLE, IND_FUNDUS, IND_OCT,
};
use e2e_core::layout::{
    CHUNK_HEADER_LEN, DIRECTORY_ENTRY_LEN, FILE_HEADER_LEN, MAIN_DIRECTORY_LEN, MULTI_VOLUME_MAGIC,
};
use e2e_core::SeriesKey;
use std::path::{Path, PathBuf};

/// Code that decodes to exactly 1.0 (exponent 63, mantissa 0).
pub const CODE_ONE: u16 = 63 << 10;
/// Code that decodes to 2^-63, which the display curve clips to 0.
pub const CODE_TINY: u16 = 0;

pub fn key(p: u32, s: u32, r: u32) -> SeriesKey {
    SeriesKey::new(p, s, r)
}

enum Body {
    Chunk { chunk_type: u32, ind: u16, payload: Vec<u8> },
    /// Bytes written verbatim where the chunk header would be.
    Raw(Vec<u8>),
    Placeholder,
}

struct Item {
    key: SeriesKey,
    /// Key written into the chunk header when it differs from the directory's.
    header_key: Option<SeriesKey>,
    slice_id: i32,
    body: Body,
}

/// Writes a synthetic `.e2e` byte stream: file header, a head directory
/// record, a chain of directory blocks, then the chunks they list.
#[derive(Default)]
pub struct FileBuilder {
    items: Vec<Item>,
    blocks: usize,
    multi_volume: bool,
    cyclic: bool,
}

fn padded(s: &str, n: usize) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    v.resize(n, 0);
    v
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl FileBuilder {
    pub fn new() -> Self {
        Self { blocks: 1, ..Default::default() }
    }

    pub fn multi_volume(mut self) -> Self {
        self.multi_volume = true;
        self
    }

    /// Spread the entries over `n` directory blocks.
    pub fn blocks(mut self, n: usize) -> Self {
        self.blocks = n.max(1);
        self
    }

    /// Point the last block back at the first.
    pub fn cyclic(mut self) -> Self {
        self.cyclic = true;
        self
    }

    pub fn chunk(
        mut self,
        key: SeriesKey,
        slice_id: i32,
        ind: u16,
        chunk_type: u32,
        payload: Vec<u8>,
    ) -> Self {
        let body = Body::Chunk { chunk_type, ind, payload };
        self.items.push(Item { key, header_key: None, slice_id, body });
        self
    }

    /// Give the last chunk's header a different key from its directory entry.
    pub fn header_key(mut self, key: SeriesKey) -> Self {
        if let Some(item) = self.items.last_mut() {
            item.header_key = Some(key);
        }
        self
    }

    pub fn raw_chunk(mut self, bytes: Vec<u8>) -> Self {
        let body = Body::Raw(bytes);
        self.items.push(Item { key: key(0, 0, 0), header_key: None, slice_id: 0, body });
        self
    }

    /// A directory entry that lists no data.
    pub fn placeholder(mut self, key: SeriesKey, slice_id: i32) -> Self {
        self.items.push(Item { key, header_key: None, slice_id, body: Body::Placeholder });
        self
    }

    pub fn patient(self, key: SeriesKey, payload: Vec<u8>) -> Self {
        self.chunk(key, 0, 0, TYPE_PATIENT, payload)
    }

    pub fn preamble(self, key: SeriesKey, laterality: u8) -> Self {
        self.chunk(key, 0, 0, TYPE_PREAMBLE, preamble(laterality))
    }

    pub fn bscan(self, key: SeriesKey, slice_id: i32, scale_y: f32, ticks: u64) -> Self {
        self.chunk(key, slice_id, 0, TYPE_BSCAN, bscan(scale_y, ticks))
    }

    pub fn oct(self, key: SeriesKey, slice_id: i32, height: u32, width: u32, code: u16) -> Self {
        let codes = vec![code; (height * width) as usize];
        self.chunk(key, slice_id, IND_OCT, TYPE_IMAGE, oct_image(height, width, &codes))
    }

    pub fn fundus(self, key: SeriesKey, height: u32, width: u32, fill: u8) -> Self {
        let pixels = vec![fill; (height * width) as usize];
        self.chunk(key, 0, IND_FUNDUS, TYPE_IMAGE, fundus_image(height, width, &pixels))
    }

    pub fn contour(self, key: SeriesKey, slice_id: i32, id: u32, values: &[f32]) -> Self {
        self.chunk(key, slice_id, 0, TYPE_CONTOUR, contour(id, values))
    }

    pub fn build(&self) -> Vec<u8> {
        let n = self.items.len();
        let per_block = if n == 0 { 0 } else { (n + self.blocks - 1) / self.blocks };
        let groups: Vec<&[Item]> = if n == 0 {
            vec![&[][..]; self.blocks]
        } else {
            let mut g: Vec<&[Item]> = self.items.chunks(per_block).collect();
            g.resize(self.blocks, &[]);
            g
        };

        let mut block_offsets = Vec::new();
        let mut at = FILE_HEADER_LEN + MAIN_DIRECTORY_LEN;
        for g in &groups {
            block_offsets.push(at);
            at += MAIN_DIRECTORY_LEN + DIRECTORY_ENTRY_LEN * g.len();
        }
        let mut chunk_offsets = Vec::new();
        for item in &self.items {
            chunk_offsets.push(at);
            at += match &item.body {
                Body::Chunk { payload, .. } => CHUNK_HEADER_LEN + payload.len(),
                Body::Raw(bytes) => bytes.len(),
                Body::Placeholder => 0,
            };
        }

        let mut out = Vec::with_capacity(at + 64);
        if self.multi_volume {
            out.extend_from_slice(MULTI_VOLUME_MAGIC);
            out.resize(64, 0);
        }
        let skip = out.len();
        out.extend(padded("CMDb", 12));
        put_u32(&mut out, 100);
        out.resize(out.len() + 20, 0);
        main_directory(&mut out, 0, block_offsets.first().copied().unwrap_or(0) as u32, 0);

        let mut index = 0;
        for (b, g) in groups.iter().enumerate() {
            let prev = match block_offsets.get(b + 1) {
                Some(&next) => next as u32,
                None if self.cyclic => block_offsets[0] as u32,
                None => 0,
            };
            main_directory(&mut out, g.len() as u32, block_offsets[b] as u32, prev);
            for item in g.iter() {
                let entry_pos = (out.len() - skip) as u32;
                let (start, size, chunk_type) = match &item.body {
                    Body::Chunk { chunk_type, payload, .. } => {
                        (chunk_offsets[index] as u32, payload.len() as u32, *chunk_type)
                    }
                    Body::Raw(bytes) => (chunk_offsets[index] as u32, bytes.len() as u32, 0),
                    Body::Placeholder => (0, 0, 0),
                };
                put_u32(&mut out, entry_pos);
                put_u32(&mut out, start);
                put_u32(&mut out, size);
                put_u32(&mut out, 0);
                put_u32(&mut out, item.key.patient_db_id);
                put_u32(&mut out, item.key.study_id);
                put_u32(&mut out, item.key.series_id);
                out.extend_from_slice(&item.slice_id.to_le_bytes());
                put_u32(&mut out, 0);
                put_u32(&mut out, chunk_type);
                put_u32(&mut out, 0);
                index += 1;
            }
        }

        for (item, &offset) in self.items.iter().zip(&chunk_offsets) {
            match &item.body {
                Body::Chunk { chunk_type, ind, payload } => {
                    out.extend(padded("MDbData", 12));
                    out.resize(out.len() + 8, 0);
                    put_u32(&mut out, offset as u32);
                    put_u32(&mut out, payload.len() as u32);
                    put_u32(&mut out, 0);
                    let header_key = item.header_key.unwrap_or(item.key);
                    put_u32(&mut out, header_key.patient_db_id);
                    put_u32(&mut out, header_key.study_id);
                    put_u32(&mut out, header_key.series_id);
                    out.extend_from_slice(&item.slice_id.to_le_bytes());
                    out.extend_from_slice(&ind.to_le_bytes());
                    out.extend_from_slice(&0u16.to_le_bytes());
                    put_u32(&mut out, *chunk_type);
                    put_u32(&mut out, 0);
                    out.extend_from_slice(payload);
                }
                Body::Raw(bytes) => out.extend_from_slice(bytes),
                Body::Placeholder => {}
            }
        }
        out
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

fn main_directory(out: &mut Vec<u8>, num_entries: u32, current: u32, prev: u32) {
    out.extend(padded("MDbMDir", 12));
    put_u32(out, 100);
    out.resize(out.len() + 20, 0);
    put_u32(out, num_entries);
    put_u32(out, current);
    put_u32(out, prev);
    put_u32(out, 0);
}

pub fn patient(first: &str, surname: &str, birthdate: u32, sex: &str, id: &str) -> Vec<u8> {
    let mut v = padded(first, 31);
    v.extend(padded(surname, 66));
    v.extend_from_slice(&birthdate.to_le_bytes());
    v.extend(padded(sex, 1));
    v.extend(padded(id, 25));
    v
}

pub fn bscan(scale_y: f32, ticks: u64) -> Vec<u8> {
    let mut v = vec![0u8; 104];
    v[36..40].copy_from_slice(&scale_y.to_le_bytes());
    v[88..96].copy_from_slice(&ticks.to_le_bytes());
    v
}

pub fn preamble(laterality: u8) -> Vec<u8> {
    let mut v = vec![0u8; 20];
    v[14] = laterality;
    v
}

pub fn contour(id: u32, values: &[f32]) -> Vec<u8> {
    let mut v = Vec::new();
    for x in [0, id, 0, values.len() as u32] {
        put_u32(&mut v, x);
    }
    for x in values {
        v.extend_from_slice(&x.to_le_bytes());
    }
    v
}

fn image_header(height: u32, width: u32, pixel_bytes: usize) -> Vec<u8> {
    let mut v = Vec::new();
    for x in [pixel_bytes as u32, 0, 0, width, height] {
        put_u32(&mut v, x);
    }
    v
}

pub fn oct_image(height: u32, width: u32, codes: &[u16]) -> Vec<u8> {
    let mut v = image_header(height, width, codes.len() * 2);
    for c in codes {
        v.extend_from_slice(&c.to_le_bytes());
    }
    v
}

pub fn fundus_image(height: u32, width: u32, pixels: &[u8]) -> Vec<u8> {
    let mut v = image_header(height, width, pixels.len());
    v.extend_from_slice(pixels);
    v
}

/// UTF-16LE strings, each padded to `string_size` bytes.
pub fn text_list(strings: &[&str], string_size: u32) -> Vec<u8> {
    let mut v = Vec::new();
    put_u32(&mut v, strings.len() as u32);
    put_u32(&mut v, string_size);
    for s in strings {
        let mut raw: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        raw.resize(string_size as usize, 0);
        v.extend(raw);
    }
    v
}
