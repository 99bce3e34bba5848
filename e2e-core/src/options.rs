use serde::{Deserialize, Serialize};

/// Settings for [`crate::reader::E2eFile::read_oct_volumes`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct VolumeOptions {
    /// Use the plain `v^(1/2.4)` curve of older releases instead of the
    /// log display curve.
    pub legacy_intensity_transform: bool,
    /// x spacing in mm; the file does not record it.
    pub scale_x: f64,
    /// z spacing (distance between B-scans) in mm.
    pub slice_thickness: f64,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self { legacy_intensity_transform: false, scale_x: 0.01, slice_thickness: 0.05 }
    }
}

/// Settings for [`crate::reader::E2eFile::read_fundus_images`].
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(default)]
pub struct FundusOptions {
    /// Keep every capture of a series instead of only the last one.
    pub extract_scan_repeats: bool,
    pub scale_x: f64,
}

impl Default for FundusOptions {
    fn default() -> Self {
        Self { extract_scan_repeats: false, scale_x: 0.01 }
    }
}
