//! This module implements some domain-specific 4-momentum handling logic.

use crate::numeric::{reals, Float};
use nalgebra::{vector, SVector};
use prefix_num_ops::real::*;

/// 4-momentum dimension
pub const MOMENTUM_DIM: usize = 4;

/// Relativistic 4-momentum
pub type Momentum = SVector<Float, MOMENTUM_DIM>;

/// Convenience const for accessing the X coordinate of a 4-vector
pub const X: usize = 0;

/// Convenience const for accessing the Y coordinate of a 4-vector
pub const Y: usize = 1;

/// Convenience const for accessing the Z coordinate of a 4-vector
pub const Z: usize = 2;

/// Convenience const for accessing the E coordinate of a 4-vector
pub const E: usize = 3;

/// Build a massless 4-momentum from collider coordinates
pub fn from_pt_eta_phi(pt: Float, eta: Float, phi: Float) -> Momentum {
    let (sin_phi, cos_phi) = phi.sin_cos();
    vector![
        pt * cos_phi,
        pt * sin_phi,
        pt * eta.sinh(),
        pt * eta.cosh()
    ]
}

/// Momentum component transverse to the beam axis
pub fn transverse_momentum(p: &Momentum) -> Float {
    sqrt(p[X] * p[X] + p[Y] * p[Y])
}

/// Pseudo-rapidity of a 4-momentum
///
/// A momentum that is aligned with the beam axis has an infinite
/// pseudo-rapidity, which is saturated to the largest finite value so that
/// downstream comparisons stay well-defined.
///
pub fn pseudo_rapidity(p: &Momentum) -> Float {
    let pt = transverse_momentum(p);
    if pt > 0. {
        (p[Z] / pt).asinh()
    } else if p[Z] == 0. {
        0.
    } else {
        reals::MAX.copysign(p[Z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn collider_coordinates_round_trip() {
        let p = from_pt_eta_phi(40., -1.2, 0.7);
        assert_relative_eq!(transverse_momentum(&p), 40., epsilon = 1e-9);
        assert_relative_eq!(pseudo_rapidity(&p), -1.2, epsilon = 1e-9);
        assert_relative_eq!(p[E], 40. * (1.2 as Float).cosh(), epsilon = 1e-9);
    }

    #[test]
    fn beam_aligned_momentum_saturates() {
        let p = vector![0., 0., -10., 10.];
        assert_eq!(transverse_momentum(&p), 0.);
        assert_eq!(pseudo_rapidity(&p), -reals::MAX);
        assert_eq!(pseudo_rapidity(&Momentum::zeros()), 0.);
    }
}
