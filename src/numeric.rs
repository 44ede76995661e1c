//! Basic numerical concepts used throughout the crate

#![allow(missing_docs)]

// Floating-point precision is configured here
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f32")]
pub use std::f32 as reals;
#[cfg(not(feature = "f32"))]
pub type Float = f64;
#[cfg(not(feature = "f32"))]
pub use std::f64 as reals;

/// Mathematical functions
pub mod functions {
    use super::Float;
    use prefix_num_ops::real::*;

    /// Map an unbounded discriminant score into the open interval (-1, 1)
    ///
    /// This is `2 / (1 + exp(-2x)) - 1`, i.e. a rescaled logistic function,
    /// which is how some MVA trainings publish their working point thresholds.
    ///
    /// The bounds are only exclusive in exact arithmetic. In double precision
    /// the result rounds to exactly ±1 once |x| exceeds about 19 (about 9 in
    /// single precision), so a threshold of 1 can never be passed.
    ///
    pub fn logistic_transform(score: Float) -> Float {
        2. / (1. + exp(-2. * score)) - 1.
    }
}

#[cfg(test)]
mod tests {
    use super::{functions::logistic_transform, Float};
    use approx::assert_relative_eq;

    #[test]
    fn logistic_transform_is_odd_and_bounded() {
        assert_eq!(logistic_transform(0.), 0.);
        assert_relative_eq!(logistic_transform(1.), -logistic_transform(-1.), epsilon = 1e-6);
        assert_relative_eq!(logistic_transform(0.5), (0.5 as Float).tanh(), epsilon = 1e-6);
        assert!(logistic_transform(5.) < 1.);
        assert!(logistic_transform(-5.) > -1.);
    }

    #[test]
    fn logistic_transform_saturates() {
        assert_eq!(logistic_transform(40.), 1.);
        assert_eq!(logistic_transform(-40.), -1.);
        assert!(logistic_transform(Float::INFINITY) == 1.);
    }
}
