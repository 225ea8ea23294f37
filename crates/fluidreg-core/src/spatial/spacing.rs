//! Physical distance between adjacent samples along each axis.

use super::Vector;

/// Spacing between adjacent voxels along each axis.
///
/// Type alias to Vector for semantic clarity. Every component must be
/// strictly positive; `is_valid` checks that.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Same spacing on every axis.
    pub fn uniform(value: f64) -> Self {
        let mut spacing = Vector::zeros();
        for i in 0..D {
            spacing[i] = value;
        }
        spacing
    }

    /// All components finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        (0..D).all(|i| self[i].is_finite() && self[i] > 0.0)
    }

    /// Spacing after resizing an axis of `old` samples to `new` samples,
    /// keeping the physical extent unchanged.
    pub fn rescaled(&self, old_shape: [usize; D], new_shape: [usize; D]) -> Self {
        let mut out = *self;
        for i in 0..D {
            out[i] = self[i] * old_shape[i] as f64 / new_shape[i] as f64;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        assert_eq!(Spacing3::uniform(1.5), Spacing3::new([1.5, 1.5, 1.5]));
    }

    #[test]
    fn test_spacing_validity() {
        assert!(Spacing3::new([1.0, 0.5, 2.0]).is_valid());
        assert!(!Spacing3::new([1.0, 0.0, 2.0]).is_valid());
        assert!(!Spacing3::new([1.0, f64::NAN, 2.0]).is_valid());
    }

    #[test]
    fn test_spacing_rescaled_preserves_extent() {
        let s = Spacing3::new([1.0, 2.0, 0.5]);
        let r = s.rescaled([10, 20, 40], [5, 40, 10]);
        assert!((r[0] - 2.0).abs() < 1e-12);
        assert!((r[1] - 1.0).abs() < 1e-12);
        assert!((r[2] - 2.0).abs() < 1e-12);
    }
}
