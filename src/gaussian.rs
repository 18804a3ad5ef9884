// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Gaussian splat primitive for confidence heatmaps.

#![allow(clippy::cast_precision_loss)]

use ndarray::{ArrayViewMut2, Zip};

/// Draws a gaussian bump onto a 2D canvas.
///
/// Implementations must be symmetric around `center`, reach exactly 1 at the center,
/// fall off monotonically with distance, and merge into the canvas by elementwise maximum.
pub trait GaussianSplat: Send + Sync {
    /// Splat a gaussian of spread `sigma` centered at `(x, y)` into `canvas` (shape `(H, W)`).
    fn splat(&self, canvas: ArrayViewMut2<'_, f32>, center: (f32, f32), sigma: f32);
}

/// Dense isotropic gaussian `exp(-d² / 2σ²)` evaluated at every pixel center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsotropicGaussian;

impl GaussianSplat for IsotropicGaussian {
    fn splat(&self, canvas: ArrayViewMut2<'_, f32>, center: (f32, f32), sigma: f32) {
        let (cx, cy) = center;
        let inv_two_sigma_sq = 1.0 / (2.0 * sigma * sigma);
        Zip::indexed(canvas).for_each(|(y, x), value| {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let g = (-dx.mul_add(dx, dy * dy) * inv_two_sigma_sq).exp();
            if g > *value {
                *value = g;
            }
        });
    }
}
