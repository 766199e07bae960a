// Utility functions for ensemble-service

/// Square root of a submission score
pub fn sqrt_score(score: f64) -> f64 {
    score.sqrt()
}

/// Natural log of a submission score.
///
/// A zero score maps to negative infinity, which never wins a strict
/// greater-than comparison.
pub fn log_score(score: f64) -> f64 {
    score.ln()
}

/// Fraction helper that defines an empty denominator as zero
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
