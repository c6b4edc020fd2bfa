/// Straight line through `(x_low, y_low)` and `(x_high, y_high)`, evaluated at `input`.
pub fn linear_remap(input: f64, x_low: f64, x_high: f64, y_low: f64, y_high: f64) -> f64 {
    y_low + (input - x_low) * (y_high - y_low) / (x_high - x_low)
}

/// Like [`linear_remap`] but holds `y_low` below `x_low` and `y_high` above `x_high`.
///
/// `x_high == x_low` is rejected when the configuration is validated, so it is
/// never reached from the control loop.
pub fn linear_clamp_remap(input: f64, x_low: f64, x_high: f64, y_low: f64, y_high: f64) -> f64 {
    if input <= x_low {
        y_low
    } else if input <= x_high {
        linear_remap(input, x_low, x_high, y_low, y_high)
    } else {
        y_high
    }
}
