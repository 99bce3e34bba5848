use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Offset between the device's birthdate counter (after dividing by 64) and
/// the Julian day number.
const BIRTHDATE_JULIAN_OFFSET: f64 = 14_558_805.0;
const BIRTHDATE_DIVISOR: f64 = 64.0;

const WINDOWS_TICKS_PER_SECOND: u64 = 10_000_000;
const WINDOWS_TO_UNIX_SECONDS: i64 = 11_644_473_600;

/// Julian day number to proleptic Gregorian date (Richards' algorithm).
///
/// Every division is a floor division. Returns `None` when the resulting
/// date is outside what chrono can represent.
pub fn julian_to_ymd(jd: i64) -> Option<NaiveDate> {
    const Y: i64 = 4716;
    const J: i64 = 1401;
    const M: i64 = 2;
    const N: i64 = 12;
    const R: i64 = 4;
    const P: i64 = 1461;
    const V: i64 = 3;
    const U: i64 = 5;
    const S: i64 = 153;
    const W: i64 = 2;
    const B: i64 = 274_277;
    const C: i64 = -38;

    let f = jd
        .checked_add(J)?
        .checked_add(((jd.checked_mul(4)?.checked_add(B)?).div_euclid(146_097) * 3).div_euclid(4))?
        .checked_add(C)?;
    let e = f.checked_mul(R)?.checked_add(V)?;
    let g = e.rem_euclid(P).div_euclid(R);
    let h = U * g + W;

    let day = h.rem_euclid(S).div_euclid(U) + 1;
    let month = (h.div_euclid(S) + M).rem_euclid(N) + 1;
    let year = e.div_euclid(P) - Y + (N + M - month).div_euclid(N);

    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month as u32, day as u32)
}

/// Fractional Julian day to proleptic Gregorian date.
///
/// Same algorithm as [`julian_to_ymd`], carried out in floating point with
/// quotients truncated toward zero. The fraction of a day still moves `f`,
/// so a value just short of the next whole day can land on that day.
pub fn fractional_julian_to_ymd(jd: f64) -> Option<NaiveDate> {
    if !jd.is_finite() {
        return None;
    }
    let f = jd + 1401.0 + (((4.0 * jd + 274_277.0) / 146_097.0).trunc() * 3.0 / 4.0).trunc() - 38.0;
    let e = 4.0 * f + 3.0;
    let g = (e.rem_euclid(1461.0) / 4.0).trunc();
    let h = 5.0 * g + 2.0;

    let day = (h.rem_euclid(153.0) / 5.0).trunc() + 1.0;
    let month = ((h / 153.0).trunc() + 2.0).rem_euclid(12.0) + 1.0;
    let year = (e / 1461.0).trunc() - 4716.0 + ((14.0 - month) / 12.0).trunc();

    // `as` saturates; chrono rejects the saturated year
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
}

/// Decode the patient birthdate field.
///
/// Two encodings are seen in the wild with no way to tell them apart up
/// front: a plain `YYYYMMDD` integer, and a counter that becomes a Julian day
/// after `/ 64 - 14558805`. Eight decimal digits selects the first. The
/// division is exact, so the low six bits survive as a fraction of a day.
pub fn decode_birthdate(raw: u64) -> Option<NaiveDate> {
    let date = if (10_000_000..=99_999_999).contains(&raw) {
        let (year, month, day) = (raw / 10_000, (raw / 100) % 100, raw % 100);
        NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)
    } else {
        let julian = raw as f64 / BIRTHDATE_DIVISOR - BIRTHDATE_JULIAN_OFFSET;
        fractional_julian_to_ymd(julian)
    };
    if date.is_none() {
        log::warn!("birthdate field {raw} does not decode to a calendar date; leaving it unknown");
    }
    date
}

/// Windows FILETIME ticks (100 ns since 1601-01-01 UTC) to a naive UTC
/// timestamp, truncated to whole seconds.
pub fn windows_ticks_to_datetime(ticks: u64) -> Option<NaiveDateTime> {
    let secs = (ticks / WINDOWS_TICKS_PER_SECOND) as i64 - WINDOWS_TO_UNIX_SECONDS;
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}
