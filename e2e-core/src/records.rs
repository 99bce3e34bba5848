//! Payload layouts for each chunk type.
//!
//! Every decoder takes the bytes that follow the 60-byte chunk header and
//! reads only what its layout needs.

use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Serialize, Serializer};

use crate::bytes::{ascii_field, Cursor};
use crate::error::{DecodeError, DecodeResult};
use crate::julian;
use crate::model::Laterality;
use crate::ufloat16::UFloat16Table;

/// Type 9.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientData {
    pub first_name: String,
    pub surname: String,
    pub birthdate: u32,
    pub sex: String,
    pub patient_id: String,
}

impl PatientData {
    pub const LEN: usize = 127;

    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "patient data");
        Ok(Self {
            first_name: c.ascii(31)?,
            surname: c.ascii(66)?,
            birthdate: c.u32()?,
            sex: c.ascii(1)?,
            patient_id: c.ascii(25)?,
        })
    }

    pub fn decoded_birthdate(&self) -> Option<NaiveDate> {
        julian::decode_birthdate(u64::from(self.birthdate))
    }
}

/// Type 10004: per B-scan acquisition geometry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BscanMetadata {
    pub unknown1: u32,
    pub img_size_x: u32,
    pub img_size_y: u32,
    pub pos_x1: f32,
    pub pos_x2: f32,
    pub pos_y1: f32,
    pub pos_y2: f32,
    pub zero1: u32,
    pub unknown2: f32,
    pub scale_y: f32,
    pub unknown3: f32,
    pub zero2: u32,
    pub unknown4: [f32; 2],
    pub zero3: u32,
    pub img_size_width: u32,
    pub num_images: u32,
    pub akt_image: u32,
    pub scan_type: u32,
    pub centre_pos_x: f32,
    pub centre_pos_y: f32,
    pub unknown5: u32,
    /// Windows FILETIME ticks.
    pub acquisition_time: u64,
    pub num_ave: u32,
    pub quality: f32,
}

impl BscanMetadata {
    pub const LEN: usize = 104;

    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "b-scan metadata");
        Ok(Self {
            unknown1: c.u32()?,
            img_size_x: c.u32()?,
            img_size_y: c.u32()?,
            pos_x1: c.f32()?,
            pos_x2: c.f32()?,
            pos_y1: c.f32()?,
            pos_y2: c.f32()?,
            zero1: c.u32()?,
            unknown2: c.f32()?,
            scale_y: c.f32()?,
            unknown3: c.f32()?,
            zero2: c.u32()?,
            unknown4: [c.f32()?, c.f32()?],
            zero3: c.u32()?,
            img_size_width: c.u32()?,
            num_images: c.u32()?,
            akt_image: c.u32()?,
            scan_type: c.u32()?,
            centre_pos_x: c.f32()?,
            centre_pos_y: c.f32()?,
            unknown5: c.u32()?,
            acquisition_time: c.u64()?,
            num_ave: c.u32()?,
            quality: c.f32()?,
        })
    }
}

/// Type 3: scan preamble. Only the laterality character is understood.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preamble {
    /// Empty when the field is NUL.
    pub laterality_code: String,
}

impl Preamble {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "preamble");
        c.skip(14)?;
        Ok(Self { laterality_code: c.ascii(1)? })
    }

    pub fn laterality(&self) -> Option<Laterality> {
        self.laterality_code.chars().next().and_then(Laterality::from_char)
    }
}

/// Type 10019, fixed part. `width` f32 depths follow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContourHeader {
    pub unknown0: u32,
    pub id: u32,
    pub unknown1: u32,
    pub width: u32,
}

impl ContourHeader {
    pub const LEN: usize = 16;

    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "contour header");
        Ok(Self { unknown0: c.u32()?, id: c.u32()?, unknown1: c.u32()?, width: c.u32()? })
    }

    pub fn name(&self) -> String {
        format!("contour{}", self.id)
    }

    /// Read the depth values that follow the header. Points below 1e-9 or
    /// equal to `f32::MAX` are invalid and come back as NaN.
    pub fn read_values(&self, payload: &[u8]) -> DecodeResult<Vec<f32>> {
        let mut c = Cursor::new(payload, "contour values");
        c.skip(Self::LEN)?;
        let raw = c.take(self.width as usize * 4)?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .map(|v| if v < 1e-9 || v == f32::MAX { f32::NAN } else { v })
            .collect())
    }
}

/// Type 1073741824, fixed part. Pixel data follows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ImageHeader {
    pub size: u32,
    #[serde(rename = "type")]
    pub image_type: u32,
    pub unknown: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageHeader {
    pub const LEN: usize = 20;

    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "image header");
        Ok(Self {
            size: c.u32()?,
            image_type: c.u32()?,
            unknown: c.u32()?,
            width: c.u32()?,
            height: c.u32()?,
        })
    }

    /// `None` for an empty image or when `height * width` overflows.
    pub fn pixel_count(&self) -> Option<usize> {
        (self.height as usize).checked_mul(self.width as usize).filter(|&n| n > 0)
    }

    fn shape(&self) -> (usize, usize) {
        (self.height as usize, self.width as usize)
    }

    fn shape_error(&self, available: usize) -> DecodeError {
        DecodeError::Shape { height: self.height, width: self.width, available }
    }

    /// OCT slice: `height * width` custom-float codes, decoded through `table`.
    pub fn decode_oct(&self, payload: &[u8], table: &UFloat16Table) -> DecodeResult<Array2<f64>> {
        let pixels = &payload[Self::LEN.min(payload.len())..];
        let count = self.pixel_count().ok_or_else(|| self.shape_error(0))?;
        let needed = count.checked_mul(2).filter(|&n| n <= pixels.len());
        let Some(needed) = needed else {
            return Err(self.shape_error(pixels.len() / 2));
        };
        let values = table.decode_le_bytes(&pixels[..needed]);
        Array2::from_shape_vec(self.shape(), values).map_err(|_| self.shape_error(count))
    }

    /// Fundus photo: `height * width` 8-bit samples.
    pub fn decode_fundus(&self, payload: &[u8]) -> DecodeResult<Array2<u8>> {
        let pixels = &payload[Self::LEN.min(payload.len())..];
        let count = self.pixel_count().ok_or_else(|| self.shape_error(0))?;
        if count > pixels.len() {
            return Err(self.shape_error(pixels.len()));
        }
        Array2::from_shape_vec(self.shape(), pixels[..count].to_vec())
            .map_err(|_| self.shape_error(count))
    }
}

/// Type 11.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LateralityData {
    pub laterality_byte: u8,
    pub laterality: Option<Laterality>,
}

impl LateralityData {
    pub const LEN: usize = 20;

    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "laterality data");
        c.skip(14)?;
        let laterality_byte = c.u8()?;
        c.skip(1)?;
        Ok(Self { laterality_byte, laterality: Laterality::from_char(laterality_byte as char) })
    }
}

/// Types 9001 and 9005–9008: a counted list of fixed-width UTF-16 strings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextList {
    pub n_strings: u32,
    pub string_size: u32,
    pub text: Vec<String>,
}

impl TextList {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "text list");
        let n_strings = c.u32()?;
        let string_size = c.u32()?;
        if n_strings > 0 && string_size == 0 {
            return Err(DecodeError::Layout(format!("{n_strings} strings of zero width")));
        }
        let total = (n_strings as usize).checked_mul(string_size as usize);
        if total.map_or(true, |t| t > c.remaining()) {
            return Err(DecodeError::Truncated {
                what: "text list",
                need: total.unwrap_or(usize::MAX),
                have: c.remaining(),
            });
        }
        let text = (0..n_strings)
            .map(|_| c.utf16(string_size as usize))
            .collect::<DecodeResult<Vec<_>>>()?;
        Ok(Self { n_strings, string_size, text })
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.text.get(i).map(String::as_str)
    }
}

/// Type 7: refraction and examination values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EyeData {
    pub eye_side: String,
    pub iop_mmhg: f64,
    pub refraction_dpt: f64,
    pub c_curve_mm: f64,
    pub vfield_mean: f64,
    pub vfield_var: f64,
    pub cylinder_dpt: f64,
    pub axis_deg: f64,
    pub correction: f64,
    pub pupil_size_mm: f64,
}

impl EyeData {
    pub fn parse(raw: &[u8]) -> DecodeResult<Self> {
        let mut c = Cursor::new(raw, "eye data");
        Ok(Self {
            eye_side: c.ascii(1)?,
            iop_mmhg: c.f64()?,
            refraction_dpt: c.f64()?,
            c_curve_mm: c.f64()?,
            vfield_mean: c.f64()?,
            vfield_var: c.f64()?,
            cylinder_dpt: c.f64()?,
            axis_deg: c.f64()?,
            correction: c.f64()?,
            pupil_size_mm: c.f64()?,
        })
    }
}

/// Types 52, 54, 1000, 1001.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UidRecord {
    pub chunk_type: u32,
    pub uid: String,
}

impl UidRecord {
    pub fn parse(chunk_type: u32, raw: &[u8]) -> DecodeResult<Self> {
        Ok(Self { chunk_type, uid: ascii_field(raw, "uid")? })
    }
}

/// Types 1005 and 1006: free-form device strings (servicers, distributors).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceText {
    pub chunk_type: u32,
    pub text: String,
}

impl DeviceText {
    pub fn parse(chunk_type: u32, raw: &[u8]) -> DecodeResult<Self> {
        let text =
            std::str::from_utf8(raw).map_err(|_| DecodeError::Text { what: "device text" })?;
        Ok(Self { chunk_type, text: text.trim_end_matches('\0').to_string() })
    }
}

/// A payload whose layout is not understood, kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawRecord {
    pub chunk_type: u32,
    #[serde(serialize_with = "hex")]
    pub bytes: Vec<u8>,
}

impl RawRecord {
    pub fn new(chunk_type: u32, raw: &[u8]) -> Self {
        Self { chunk_type, bytes: raw.to_vec() }
    }
}

fn hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    const LUT: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        s.push(LUT[(b >> 4) as usize] as char);
        s.push(LUT[(b & 0xF) as usize] as char);
    }
    serializer.serialize_str(&s)
}
