use std::collections::HashSet;

use crate::bytes::Cursor;
use crate::chunk::ChunkLocation;
use crate::error::DecodeResult;
use crate::layout::{
    DirectoryEntry, FileHeader, MainDirectory, DIRECTORY_ENTRY_LEN, FILE_HEADER_LEN,
    MAIN_DIRECTORY_LEN, MULTI_VOLUME_MAGIC, MULTI_VOLUME_SKIP,
};

/// The resolved directory chain: offsets of every main-directory record,
/// newest first, plus the byte skip that applies to all stored offsets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    pub byte_skip: u64,
    pub offsets: Vec<u32>,
}

/// `len` bytes at stored offset `offset`, shifted by `byte_skip`.
fn block_at(data: &[u8], byte_skip: u64, offset: u64, len: usize) -> DecodeResult<&[u8]> {
    let start = usize::try_from(offset + byte_skip).unwrap_or(usize::MAX);
    Cursor::new(data.get(start..).unwrap_or(&[]), "directory block").take(len)
}

impl Directory {
    /// Follow `current` and then `prev` pointers until a zero pointer.
    ///
    /// A header or record that does not parse ends the walk with whatever was
    /// collected so far. A pointer back to a record already visited ends it too.
    pub fn walk(data: &[u8]) -> Self {
        let byte_skip = if data.starts_with(MULTI_VOLUME_MAGIC) { MULTI_VOLUME_SKIP } else { 0 };
        let mut dir = Directory { byte_skip, offsets: Vec::new() };

        let head = block_at(data, byte_skip, 0, FILE_HEADER_LEN + MAIN_DIRECTORY_LEN)
            .and_then(|raw| {
                let header = FileHeader::parse(&raw[..FILE_HEADER_LEN])?;
                let main = MainDirectory::parse(&raw[FILE_HEADER_LEN..])?;
                Ok((header, main))
            });
        let (header, main) = match head {
            Ok(h) => h,
            Err(e) => {
                log::debug!("no directory chain: {e}");
                return dir;
            }
        };
        log::debug!("file header {:?} version {}", header.magic, header.version);

        let mut visited = HashSet::new();
        let mut current = main.current;
        while current != 0 {
            if !visited.insert(current) {
                log::warn!("directory chain loops back to offset {current}; stopping");
                break;
            }
            let record = block_at(data, byte_skip, u64::from(current), MAIN_DIRECTORY_LEN)
                .and_then(MainDirectory::parse);
            match record {
                Ok(rec) => {
                    dir.offsets.push(current);
                    current = rec.prev;
                }
                Err(e) => {
                    log::warn!("directory record at {current} unreadable ({e}); stopping");
                    break;
                }
            }
        }
        dir
    }

    /// Every entry of every directory record, in chain order.
    pub fn entries(&self, data: &[u8]) -> Vec<DirectoryEntry> {
        let mut out = Vec::new();
        for &offset in &self.offsets {
            let offset = u64::from(offset);
            let Ok(main) = block_at(data, self.byte_skip, offset, MAIN_DIRECTORY_LEN)
                .and_then(MainDirectory::parse)
            else {
                continue;
            };
            for i in 0..u64::from(main.num_entries) {
                let at = offset + MAIN_DIRECTORY_LEN as u64 + DIRECTORY_ENTRY_LEN as u64 * i;
                match block_at(data, self.byte_skip, at, DIRECTORY_ENTRY_LEN)
                    .and_then(DirectoryEntry::parse)
                {
                    Ok(entry) => out.push(entry),
                    Err(e) => {
                        log::warn!(
                            "directory at {offset}: entry {i} of {} unreadable ({e})",
                            main.num_entries
                        );
                        break;
                    }
                }
            }
        }
        out
    }

    /// Start offsets of chunks that hold data, in directory order.
    pub fn chunk_locations(&self, data: &[u8]) -> Vec<ChunkLocation> {
        self.entries(data)
            .into_iter()
            .filter(DirectoryEntry::holds_data)
            .map(|e| ChunkLocation { start: e.start, size: e.size })
            .collect()
    }
}
