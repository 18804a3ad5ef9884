// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Part affinity fields.
//!
//! Every limb `(a, b)` gets two channels holding the x and y components of the unit
//! vector from joint `a` to joint `b`, written into a band of half-width `band_width`
//! around the segment and averaged over the instances that label both endpoints.

use ndarray::parallel::prelude::*;
use ndarray::{Array3, Array4, ArrayView2, ArrayViewMut3, Axis, Zip};
use rayon::prelude::*;

use crate::error::{Result, TargetError};
use crate::keypoints::{instances, is_labeled};

/// Build `(L, 2, height, width)` part affinity fields from `(N, J, 3)` keypoints.
///
/// An instance contributes to limb `(a, b)` when both joints are labeled and distinct.
/// A pixel `p` is on the limb when its projection onto the unit direction `u`,
/// measured from `a`, lies in `[0, |b - a|]` and its distance from the limb line is at
/// most `band_width`. Each contributing instance adds `u` to its on-pixels and counts once;
/// both channels are then divided by `count + epsilon`.
///
/// Coincident endpoints have no direction: such an instance is skipped for that limb
/// and does not increase its count.
///
/// # Errors
///
/// Returns [`TargetError::ShapeError`] if the keypoint array is not `(N, J, 3)` or a
/// limb references a joint outside `0..J`.
pub fn build_pafs(
    height: usize,
    width: usize,
    keypoints: &Array3<f32>,
    limbs: &[[usize; 2]],
    band_width: f32,
    epsilon: f32,
) -> Result<Array4<f32>> {
    let (_, num_joints, fields) = keypoints.dim();
    if fields != 3 {
        return Err(TargetError::ShapeError(format!(
            "keypoints must be (N, J, 3), got last axis of {fields}"
        )));
    }
    if let Some([a, b]) = limbs.iter().find(|[a, b]| *a >= num_joints || *b >= num_joints) {
        return Err(TargetError::ShapeError(format!(
            "limb ({a}, {b}) references a joint outside 0..{num_joints}"
        )));
    }

    let mut pafs = Array4::<f32>::zeros((limbs.len(), 2, height, width));

    pafs.axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(limbs.par_iter())
        .for_each(|(mut field, &[a, b])| {
            let mut contributors = 0u32;
            for instance in instances(keypoints) {
                if accumulate_limb(field.view_mut(), instance, a, b, band_width) {
                    contributors += 1;
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let divisor = contributors as f32 + epsilon;
            field.mapv_inplace(|v| v / divisor);
        });

    Ok(pafs)
}

/// Add one instance's unit vector to the on-pixels of `field` (`(2, H, W)`).
///
/// Returns `true` if the instance contributed.
fn accumulate_limb(
    field: ArrayViewMut3<'_, f32>,
    instance: ArrayView2<'_, f32>,
    a: usize,
    b: usize,
    band_width: f32,
) -> bool {
    let (ax, ay, av) = (instance[[a, 0]], instance[[a, 1]], instance[[a, 2]]);
    let (bx, by, bv) = (instance[[b, 0]], instance[[b, 1]], instance[[b, 2]]);
    if !is_labeled(ax, ay, av) || !is_labeled(bx, by, bv) {
        return false;
    }

    let (dx, dy) = (bx - ax, by - ay);
    let length = dx.hypot(dy);
    if length == 0.0 || !length.is_finite() {
        return false;
    }
    let (ux, uy) = (dx / length, dy / length);
    // perpendicular is (uy, -ux)

    let (x_half, y_half) = field.split_at(Axis(0), 1);
    let x_channel = x_half.index_axis_move(Axis(0), 0);
    let y_channel = y_half.index_axis_move(Axis(0), 0);

    Zip::indexed(x_channel)
        .and(y_channel)
        .for_each(|(row, col), px, py| {
            #[allow(clippy::cast_precision_loss)]
            let (rx, ry) = (col as f32 - ax, row as f32 - ay);
            let along = ux.mul_add(rx, uy * ry);
            let across = uy.mul_add(rx, -ux * ry).abs();
            if (0.0..=length).contains(&along) && across <= band_width {
                *px += ux;
                *py += uy;
            }
        });

    true
}
