//! GPS payload encoding for the camera's metadata pipeline.
//!
//! The camera expects a 48-byte little-endian block:
//!
//! ```text
//! offset  type  field
//! 0       i32   date as yyyymmdd
//! 4       i32   time-of-day as hhmmss, hour biased +8 (firmware quirk)
//! 8       i32   longitude, degrees x 1e7
//! 12      i32   latitude, degrees x 1e7
//! 16      i32   height above ellipsoid, mm
//! 20      f32   speed toward north, cm/s
//! 24      f32   speed toward east, cm/s
//! 28      f32   speed downward, cm/s
//! 32      u32   vertical accuracy estimate, mm
//! 36      u32   horizontal accuracy estimate, mm
//! 40      u32   speed accuracy estimate, mm/s
//! 44      u32   satellite count
//! ```

use bytes::{Buf, BufMut, BytesMut};
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::error::{Result, WireError};

/// Fixed size of the encoded GPS block.
pub const GPS_PAYLOAD_SIZE: usize = 48;

/// Degrees-to-fixed-point scale used by the firmware.
const DEG_SCALE: f64 = 1e7;

/// Hour bias the firmware applies to the time-of-day field.
const HOUR_BIAS: u32 = 8;

/// An external GPS fix, immutable once constructed.
///
/// Out-of-range values are clamped at encode time rather than silently
/// truncated: latitude saturates at +/-90 degrees, longitude at +/-180,
/// metric fields at the fixed-point range of their wire field. Non-finite
/// floats are rejected as [`WireError::GpsOutOfRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct GpsFix {
    /// Latitude in degrees, north positive.
    pub latitude_deg: f64,
    /// Longitude in degrees, east positive.
    pub longitude_deg: f64,
    /// Altitude in metres.
    pub altitude_m: f64,
    /// Horizontal speed in metres per second.
    pub speed_mps: f64,
    /// Course over ground in degrees clockwise from north.
    pub heading_deg: f64,
    /// Horizontal accuracy estimate in metres.
    pub horizontal_accuracy_m: f64,
    /// Vertical accuracy estimate in metres.
    pub vertical_accuracy_m: f64,
    /// Number of satellites used for the fix.
    pub satellites: u32,
    /// UTC timestamp of the fix.
    pub timestamp: DateTime<Utc>,
}

/// Encode a fix into the camera's GPS block, appending to `dst`.
pub fn encode_gps_payload(fix: &GpsFix, dst: &mut BytesMut) -> Result<()> {
    for (value, name) in [
        (fix.latitude_deg, "latitude"),
        (fix.longitude_deg, "longitude"),
        (fix.altitude_m, "altitude"),
        (fix.speed_mps, "speed"),
        (fix.heading_deg, "heading"),
        (fix.horizontal_accuracy_m, "horizontal accuracy"),
        (fix.vertical_accuracy_m, "vertical accuracy"),
    ] {
        if !value.is_finite() {
            return Err(WireError::GpsOutOfRange(name));
        }
    }

    let date = fix.timestamp.year() * 10_000 + fix.timestamp.month() as i32 * 100
        + fix.timestamp.day() as i32;
    let time = (fix.timestamp.hour() + HOUR_BIAS) * 10_000
        + fix.timestamp.minute() * 100
        + fix.timestamp.second();

    let lat = fix.latitude_deg.clamp(-90.0, 90.0);
    let lon = fix.longitude_deg.clamp(-180.0, 180.0);

    let heading = fix.heading_deg.to_radians();
    let speed_cms = fix.speed_mps.max(0.0) * 100.0;
    let speed_north = (speed_cms * heading.cos()) as f32;
    let speed_east = (speed_cms * heading.sin()) as f32;

    dst.reserve(GPS_PAYLOAD_SIZE);
    dst.put_i32_le(date);
    dst.put_i32_le(time as i32);
    dst.put_i32_le((lon * DEG_SCALE).round() as i32);
    dst.put_i32_le((lat * DEG_SCALE).round() as i32);
    dst.put_i32_le(clamp_to_i32(fix.altitude_m * 1000.0));
    dst.put_f32_le(speed_north);
    dst.put_f32_le(speed_east);
    dst.put_f32_le(0.0); // downward speed: not part of the fix
    dst.put_u32_le(clamp_to_u32(fix.vertical_accuracy_m * 1000.0));
    dst.put_u32_le(clamp_to_u32(fix.horizontal_accuracy_m * 1000.0));
    dst.put_u32_le(0); // speed accuracy: not part of the fix
    dst.put_u32_le(fix.satellites);

    Ok(())
}

/// Decode a GPS block back into a fix.
///
/// Inverse of [`encode_gps_payload`] within the fixed-point precision of the
/// wire fields.
pub fn decode_gps_payload(src: &[u8]) -> Result<GpsFix> {
    if src.len() != GPS_PAYLOAD_SIZE {
        return Err(WireError::GpsPayloadSize {
            expected: GPS_PAYLOAD_SIZE,
            actual: src.len(),
        });
    }

    let mut buf = src;
    let date = buf.get_i32_le();
    let time = buf.get_i32_le();
    let lon = buf.get_i32_le();
    let lat = buf.get_i32_le();
    let height_mm = buf.get_i32_le();
    let speed_north = f64::from(buf.get_f32_le());
    let speed_east = f64::from(buf.get_f32_le());
    let _speed_down = buf.get_f32_le();
    let vert_acc_mm = buf.get_u32_le();
    let horiz_acc_mm = buf.get_u32_le();
    let _speed_acc = buf.get_u32_le();
    let satellites = buf.get_u32_le();

    let (year, month, day) = (date / 10_000, (date / 100 % 100) as u32, (date % 100) as u32);
    let hour = (time / 10_000) as u32;
    let (minute, second) = ((time / 100 % 100) as u32, (time % 100) as u32);
    let timestamp = Utc
        .with_ymd_and_hms(
            year,
            month,
            day,
            hour.checked_sub(HOUR_BIAS)
                .ok_or(WireError::GpsOutOfRange("timestamp"))?,
            minute,
            second,
        )
        .single()
        .ok_or(WireError::GpsOutOfRange("timestamp"))?;

    let speed_cms = speed_north.hypot(speed_east);
    let heading = if speed_cms > 0.0 {
        speed_east.atan2(speed_north).to_degrees().rem_euclid(360.0)
    } else {
        0.0
    };

    Ok(GpsFix {
        latitude_deg: f64::from(lat) / DEG_SCALE,
        longitude_deg: f64::from(lon) / DEG_SCALE,
        altitude_m: f64::from(height_mm) / 1000.0,
        speed_mps: speed_cms / 100.0,
        heading_deg: heading,
        horizontal_accuracy_m: f64::from(horiz_acc_mm) / 1000.0,
        vertical_accuracy_m: f64::from(vert_acc_mm) / 1000.0,
        satellites,
        timestamp,
    })
}

fn clamp_to_i32(value: f64) -> i32 {
    value.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

fn clamp_to_u32(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}
