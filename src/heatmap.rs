// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-joint confidence heatmaps.

use ndarray::parallel::prelude::*;
use ndarray::{Array3, Axis, s};

use crate::error::{Result, TargetError};
use crate::gaussian::GaussianSplat;
use crate::keypoints::{instances, is_labeled};

/// Build `(J + 1, height, width)` heatmaps from `(N, J, 3)` keypoints.
///
/// Channel `j < J` holds the elementwise maximum of one gaussian per labeled joint `j`
/// across all instances. Channel `J` is the background, `1 - sum(channels 0..J)`, and is
/// not clamped: it goes negative where gaussians of different joints overlap strongly.
///
/// # Errors
///
/// Returns [`TargetError::ShapeError`] if the last keypoint axis is not 3.
pub fn build_heatmaps(
    height: usize,
    width: usize,
    keypoints: &Array3<f32>,
    sigma: f32,
    splat: &dyn GaussianSplat,
) -> Result<Array3<f32>> {
    let (_, num_joints, fields) = keypoints.dim();
    if fields != 3 {
        return Err(TargetError::ShapeError(format!(
            "keypoints must be (N, J, 3), got last axis of {fields}"
        )));
    }

    let mut heatmaps = Array3::<f32>::zeros((num_joints + 1, height, width));

    heatmaps
        .slice_mut(s![..num_joints, .., ..])
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(joint, mut channel)| {
            for instance in instances(keypoints) {
                let (x, y, v) = (instance[[joint, 0]], instance[[joint, 1]], instance[[joint, 2]]);
                if is_labeled(x, y, v) {
                    splat.splat(channel.view_mut(), (x, y), sigma);
                }
            }
        });

    let joint_sum = heatmaps.slice(s![..num_joints, .., ..]).sum_axis(Axis(0));
    heatmaps
        .index_axis_mut(Axis(0), num_joints)
        .assign(&joint_sum.mapv(|total| 1.0 - total));

    Ok(heatmaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaussian::IsotropicGaussian;
    use ndarray::Array2;

    fn keypoints(rows: &[[f32; 3]], num_joints: usize) -> Array3<f32> {
        let mut data = vec![0.0; num_joints * 3];
        for (j, row) in rows.iter().enumerate() {
            data[j * 3..j * 3 + 3].copy_from_slice(row);
        }
        Array3::from_shape_vec((1, num_joints, 3), data).unwrap()
    }

    fn assert_background_complements(heatmaps: &Array3<f32>) {
        let joints = heatmaps.shape()[0] - 1;
        let sum = heatmaps.slice(s![..joints, .., ..]).sum_axis(Axis(0));
        let background = heatmaps.index_axis(Axis(0), joints);
        for (total, bg) in sum.iter().zip(background.iter()) {
            assert_eq!(bg.to_bits(), (1.0 - total).to_bits());
        }
    }

    #[test]
    fn test_no_instances() {
        let heatmaps =
            build_heatmaps(12, 9, &Array3::zeros((0, 17, 3)), 7.0, &IsotropicGaussian).unwrap();
        assert_eq!(heatmaps.shape(), &[18, 12, 9]);
        assert!(heatmaps.slice(s![..17, .., ..]).iter().all(|&v| v == 0.0));
        assert!(heatmaps.index_axis(Axis(0), 17).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_peak_and_unlabeled_channels() {
        let kp = keypoints(&[[4.0, 6.0, 2.0], [1.0, 1.0, 0.0], [8.0, 2.0, 1.0]], 3);
        let heatmaps = build_heatmaps(10, 10, &kp, 2.0, &IsotropicGaussian).unwrap();
        assert_eq!(heatmaps.shape(), &[4, 10, 10]);
        assert!((heatmaps[[0, 6, 4]] - 1.0).abs() < 1e-6);
        assert!(heatmaps.index_axis(Axis(0), 1).iter().all(|&v| v == 0.0));
        assert!((heatmaps[[2, 2, 8]] - 1.0).abs() < 1e-6);
        assert_background_complements(&heatmaps);
    }

    #[test]
    fn test_instances_merge_by_max() {
        let mut kp = Array3::<f32>::zeros((2, 1, 3));
        kp.slice_mut(s![0, 0, ..]).assign(&ndarray::arr1(&[5.0, 5.0, 2.0]));
        kp.slice_mut(s![1, 0, ..]).assign(&ndarray::arr1(&[6.0, 5.0, 2.0]));
        let heatmaps = build_heatmaps(10, 12, &kp, 3.0, &IsotropicGaussian).unwrap();
        let channel: Array2<f32> = heatmaps.index_axis(Axis(0), 0).to_owned();
        assert!(channel.iter().all(|&v| v <= 1.0 + 1e-6));
        assert!((channel[[5, 5]] - 1.0).abs() < 1e-6);
        assert!((channel[[5, 6]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_background_unclamped() {
        // two different joints at the same spot sum to 2 at the peak
        let kp = keypoints(&[[5.0, 5.0, 2.0], [5.0, 5.0, 2.0]], 2);
        let heatmaps = build_heatmaps(11, 11, &kp, 2.0, &IsotropicGaussian).unwrap();
        assert!((heatmaps[[2, 5, 5]] + 1.0).abs() < 1e-6);
        assert_background_complements(&heatmaps);
    }

    #[test]
    fn test_rejects_bad_shape() {
        let result = build_heatmaps(4, 4, &Array3::zeros((1, 17, 2)), 7.0, &IsotropicGaussian);
        assert!(matches!(result, Err(TargetError::ShapeError(_))));
    }
}
