//! Weight rounding and the rep-out adjustment table

/// Round `value` to the nearest multiple of `increment`.
/// A non-positive increment leaves the value untouched.
pub fn round_to(value: f64, increment: f64) -> f64 {
    if increment <= 0.0 {
        return value;
    }
    (value / increment).round() * increment
}

/// Bookkeeping rounding for training maxes (two decimal places)
pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Training-max adjustment for reps achieved over (or under) the rep-out target.
///
/// | delta | adjustment |
/// |-------|------------|
/// | <= -2 | -5%        |
/// | -1    | -2%        |
/// | 0     | 0%         |
/// | +1    | +0.5%      |
/// | +2    | +1%        |
/// | +3    | +1.5%      |
/// | +4    | +2%        |
/// | >= +5 | +3%        |
pub fn adjustment_for_delta(delta: i32) -> f64 {
    match delta {
        i32::MIN..=-2 => -0.05,
        -1 => -0.02,
        0 => 0.0,
        1 => 0.005,
        2 => 0.01,
        3 => 0.015,
        4 => 0.02,
        _ => 0.03,
    }
}
