//! Conversions between host and device value ranges.

/// Color temperature range used by the host, in mireds.
pub const HOST_MIRED_MIN: f64 = 140.0;
pub const HOST_MIRED_MAX: f64 = 500.0;

/// Color temperature range used by the device, as a percentage.
pub const DEVICE_TEMPERATURE_MIN: f64 = 0.0;
pub const DEVICE_TEMPERATURE_MAX: f64 = 100.0;

/// Affinely rescale `value` from `[in_start, in_end]` onto `[out_start, out_end]`.
///
/// Values outside the input range are extrapolated, not clamped.
pub fn map_range(value: f64, in_start: f64, in_end: f64, out_start: f64, out_end: f64) -> f64 {
    let in_range = in_end - in_start;
    let out_range = out_end - out_start;

    (value - in_start) * out_range / in_range + out_start
}

/// Host mireds to device temperature percentage.
pub fn mired_to_device(mired: f64) -> f64 {
    map_range(
        mired,
        HOST_MIRED_MIN,
        HOST_MIRED_MAX,
        DEVICE_TEMPERATURE_MIN,
        DEVICE_TEMPERATURE_MAX,
    )
}

/// Device temperature percentage to host mireds.
pub fn device_to_mired(percent: f64) -> f64 {
    map_range(
        percent,
        DEVICE_TEMPERATURE_MIN,
        DEVICE_TEMPERATURE_MAX,
        HOST_MIRED_MIN,
        HOST_MIRED_MAX,
    )
}
