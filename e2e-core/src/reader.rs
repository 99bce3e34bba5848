use anyhow::{Context, Result};
use memmap2::Mmap;
use std::fs::File;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::directory::Directory;
use crate::fundus;
use crate::metadata::{self, MetadataDictionary};
use crate::model::{FundusImage, OctVolume};
use crate::options::{FundusOptions, VolumeOptions};
use crate::volume;

#[derive(Clone, Debug)]
enum Source {
    Path(PathBuf),
    Memory(Arc<[u8]>),
}

/// File contents for the duration of one pass.
enum Bytes {
    Mapped(Mmap),
    Shared(Arc<[u8]>),
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Bytes::Mapped(m) => m,
            Bytes::Shared(b) => b,
        }
    }
}

fn map_file(path: &Path) -> Result<Bytes> {
    let file = File::open(path).with_context(|| format!("open {:?}", path))?;
    let len = file.metadata().with_context(|| format!("stat {:?}", path))?.len();
    // mapping a zero-length file fails on some platforms
    if len == 0 {
        return Ok(Bytes::Shared(Arc::from(Vec::new())));
    }
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {:?}", path))?;
    Ok(Bytes::Mapped(map))
}

/// A Heidelberg `.e2e` container.
///
/// Opening walks the directory chain once and keeps the offsets; each `read_*`
/// call maps the file again and rescans every chunk.
#[derive(Clone, Debug)]
pub struct E2eFile {
    source: Source,
    directory: Directory,
}

impl E2eFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = map_file(path)?;
        let directory = Directory::walk(&bytes);
        log::info!(
            "opened {:?}: {} byte(s), {} directory record(s)",
            path,
            bytes.len(),
            directory.offsets.len()
        );
        Ok(Self { source: Source::Path(path.to_path_buf()), directory })
    }

    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        let directory = Directory::walk(&bytes);
        Self { source: Source::Memory(bytes), directory }
    }

    /// `None` for in-memory files.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::Path(p) => Some(p),
            Source::Memory(_) => None,
        }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    fn load(&self) -> Result<Bytes> {
        match &self.source {
            Source::Path(p) => map_file(p),
            Source::Memory(b) => Ok(Bytes::Shared(Arc::clone(b))),
        }
    }

    /// Every OCT volume in the file, with contours and the file's metadata.
    pub fn read_oct_volumes(&self, opts: &VolumeOptions) -> Result<Vec<OctVolume>> {
        let bytes = self.load()?;
        let metadata = Arc::new(metadata::collect(&bytes, &self.directory));
        Ok(volume::assemble(&bytes, &self.directory, opts, metadata))
    }

    pub fn read_fundus_images(&self, opts: &FundusOptions) -> Result<Vec<FundusImage>> {
        let bytes = self.load()?;
        let metadata = Arc::new(metadata::collect(&bytes, &self.directory));
        Ok(fundus::assemble(&bytes, &self.directory, opts, metadata))
    }

    pub fn read_all_metadata(&self) -> Result<MetadataDictionary> {
        let bytes = self.load()?;
        Ok(metadata::collect(&bytes, &self.directory))
    }
}
