// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint extraction from annotation records.

use ndarray::{Array3, ArrayView2, Axis};

use crate::annotation::Annotation;
use crate::error::{Result, TargetError};

/// Stack the flat `(x, y, visibility)` keypoints of every annotation into an
/// `(N, num_joints, 3)` array.
///
/// # Errors
///
/// Returns [`TargetError::ShapeError`] if an annotation does not carry exactly
/// `3 * num_joints` values.
pub fn extract_keypoints<'a, I>(annotations: I, num_joints: usize) -> Result<Array3<f32>>
where
    I: IntoIterator<Item = &'a Annotation>,
{
    let expected = 3 * num_joints;
    let mut data = Vec::new();
    let mut count = 0usize;

    for annotation in annotations {
        if annotation.keypoints.len() != expected {
            return Err(TargetError::ShapeError(format!(
                "annotation {} has {} keypoint values, expected {expected} ({num_joints} joints x 3)",
                annotation.id,
                annotation.keypoints.len()
            )));
        }
        data.extend_from_slice(&annotation.keypoints);
        count += 1;
    }

    Ok(Array3::from_shape_vec((count, num_joints, 3), data)?)
}

/// Whether a keypoint `(x, y, visibility)` is labeled and usable.
#[must_use]
pub fn is_labeled(x: f32, y: f32, visibility: f32) -> bool {
    visibility > 0.0 && x.is_finite() && y.is_finite()
}

/// Check that a keypoint array is `(N, num_joints, 3)`.
///
/// # Errors
///
/// Returns [`TargetError::ShapeError`] on any other shape.
pub fn check_shape(keypoints: &Array3<f32>, num_joints: usize) -> Result<()> {
    let shape = keypoints.shape();
    if shape[1] != num_joints || shape[2] != 3 {
        return Err(TargetError::ShapeError(format!(
            "keypoint array has shape {shape:?}, expected (N, {num_joints}, 3)"
        )));
    }
    Ok(())
}

/// Iterate instances of a keypoint array as `(num_joints, 3)` views.
pub fn instances(keypoints: &Array3<f32>) -> impl Iterator<Item = ArrayView2<'_, f32>> {
    keypoints.axis_iter(Axis(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::person;

    #[test]
    fn test_extract_keypoints_shape() {
        let a = person(1, 1, (0..51).map(|v| v as f32).collect());
        let b = person(2, 1, vec![1.0; 51]);
        let keypoints = extract_keypoints([&a, &b], 17).unwrap();
        assert_eq!(keypoints.shape(), &[2, 17, 3]);
        assert!((keypoints[[0, 1, 0]] - 3.0).abs() < f32::EPSILON);
        assert!((keypoints[[0, 16, 2]] - 50.0).abs() < f32::EPSILON);
        assert!((keypoints[[1, 5, 1]] - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_extract_keypoints_empty() {
        let keypoints = extract_keypoints(std::iter::empty(), 17).unwrap();
        assert_eq!(keypoints.shape(), &[0, 17, 3]);
    }

    #[test]
    fn test_extract_keypoints_bad_length() {
        let bad = person(9, 1, vec![0.0; 50]);
        let err = extract_keypoints([&bad], 17).unwrap_err();
        assert!(matches!(err, TargetError::ShapeError(ref msg) if msg.contains("annotation 9")));
    }

    #[test]
    fn test_is_labeled() {
        assert!(is_labeled(1.0, 2.0, 1.0));
        assert!(is_labeled(1.0, 2.0, 2.0));
        assert!(!is_labeled(1.0, 2.0, 0.0));
        assert!(!is_labeled(f32::NAN, 2.0, 2.0));
    }

    #[test]
    fn test_check_shape() {
        assert!(check_shape(&Array3::zeros((2, 17, 3)), 17).is_ok());
        assert!(check_shape(&Array3::zeros((2, 16, 3)), 17).is_err());
        assert!(check_shape(&Array3::zeros((2, 17, 2)), 17).is_err());
    }
}
