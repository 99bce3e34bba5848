use ndarray::Array2;

const LOG_OFFSET: f64 = 2.44e-4;
const LOG_SHIFT: f64 = 8.3;
const LOG_SCALE: f64 = 8.285;
const LEGACY_GAMMA: f64 = 1.0 / 2.4;

/// Display curve for decoded OCT intensities.
///
/// Values at or below 1 are log-compressed, the `f32::MAX` sentinel becomes 0,
/// and the result is clipped to `[0, 1]`.
pub fn display_transform(v: f64) -> f64 {
    let out = if v == f32::MAX as f64 {
        0.0
    } else if v <= 1.0 {
        ((v + LOG_OFFSET).ln() + LOG_SHIFT) / LOG_SCALE
    } else {
        v
    };
    out.clamp(0.0, 1.0)
}

/// Transform used by older releases: plain gamma, no clipping.
pub fn legacy_transform(v: f64) -> f64 {
    v.powf(LEGACY_GAMMA)
}

pub fn apply(image: &mut Array2<f64>, legacy: bool) {
    if legacy {
        image.mapv_inplace(legacy_transform);
    } else {
        image.mapv_inplace(display_transform);
    }
}
