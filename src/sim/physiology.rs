//! Stress → sensor readings.

/// Heart rate (bpm) for a (delayed) stress value.
pub fn heartbeat(stress: f64) -> f64 {
    60.0 + 1.8 * stress
}

/// Crying intensity (0–100) for the current stress value.
pub fn crying(stress: f64) -> f64 {
    if stress >= 50.0 {
        100.0
    } else if stress >= 10.0 {
        2.5 * stress - 25.0
    } else {
        0.0
    }
}

/// Round a model value onto the one-byte wire reading.
pub fn to_reading(value: f64) -> u8 {
    value.round().clamp(0.0, f64::from(u8::MAX)) as u8
}
