//! Decoder for Heidelberg Engineering `.e2e` exports: OCT volumes, fundus
//! photos, layer contours and the metadata records around them.

pub mod bytes;
pub mod chunk;
pub mod directory;
pub mod error;
pub mod fundus;
pub mod intensity;
pub mod julian;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod options;
pub mod reader;
pub mod records;
pub mod scan;
pub mod ufloat16;
pub mod volume;

pub use error::{DecodeError, DecodeResult};
pub use metadata::MetadataDictionary;
pub use model::{FundusImage, Laterality, OctVolume, PatientRecord, SeriesKey, SliceOrder};
pub use options::{FundusOptions, VolumeOptions};
pub use reader::E2eFile;
