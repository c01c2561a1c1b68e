//! Numeric helpers centralizing float sanitization and safe casts.

use glam::Vec3;
use num_traits::cast::cast;

/// Replace NaN or infinite values with 0.0.
#[must_use]
pub fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

/// Sanitize then clamp into `[0, 1]`.
#[must_use]
pub fn unit_clamp(value: f32) -> f32 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

/// Replace a vector carrying any non-finite component with zero.
#[must_use]
pub fn finite_vec_or_zero(value: Vec3) -> Vec3 {
    if value.is_finite() { value } else { Vec3::ZERO }
}

/// Horizontal (XZ-plane) component of a vector.
#[must_use]
pub const fn flatten(value: Vec3) -> Vec3 {
    Vec3::new(value.x, 0.0, value.z)
}

/// Convert a count into f32 for averaging, returning 0.0 if unrepresentable.
#[must_use]
pub fn usize_to_f32(value: usize) -> f32 {
    cast::<usize, f32>(value).unwrap_or(0.0)
}

/// Mean of a slice, 0.0 when empty.
#[must_use]
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f32>() / usize_to_f32(values.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_become_zero() {
        assert!(finite_or_zero(f32::NAN).abs() < f32::EPSILON);
        assert!(finite_or_zero(f32::INFINITY).abs() < f32::EPSILON);
        assert!((finite_or_zero(0.25) - 0.25).abs() < f32::EPSILON);
        assert!(unit_clamp(f32::NEG_INFINITY).abs() < f32::EPSILON);
        assert!((unit_clamp(3.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn vectors_are_sanitized_and_flattened() {
        assert_eq!(finite_vec_or_zero(Vec3::new(f32::NAN, 1.0, 0.0)), Vec3::ZERO);
        assert_eq!(flatten(Vec3::new(1.0, 5.0, -2.0)), Vec3::new(1.0, 0.0, -2.0));
    }

    #[test]
    fn mean_handles_empty_and_values() {
        assert!(mean(&[]).abs() < f32::EPSILON);
        assert!((mean(&[0.2, 0.4]) - 0.3).abs() < 1e-6);
    }
}
