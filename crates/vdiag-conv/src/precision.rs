//! Floating point precision handling
//!
//! Every floating-point value leaving the engine is rounded to two decimal
//! places, so formulas like `A*100/255` report `47.06` rather than
//! `47.05882352941177`.

/// Decimal places used for all reported floating-point values
pub const RESULT_PRECISION: u8 = 2;

/// Round a value to the specified number of decimal places
pub fn round_to_precision(value: f64, precision: u8) -> f64 {
    if precision == 0 {
        value.round()
    } else {
        let factor = 10_f64.powi(precision as i32);
        (value * factor).round() / factor
    }
}

/// Round a value to the reporting precision
pub fn round_result(value: f64) -> f64 {
    round_to_precision(value, RESULT_PRECISION)
}
