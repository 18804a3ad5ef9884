// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Ignore regions for crowd annotations.

use ndarray::Array2;

use crate::annotation::{Annotation, AnnotationFilter, ImageInfo};
use crate::database::AnnotationDatabase;
use crate::error::Result;

/// Build the `(height, width)` ignore mask of an image.
///
/// Every annotation is rasterized once. Pixels of crowd annotations that are not
/// covered by any eligible annotation are marked. Crowd annotations never pass the
/// filter, so they only ever subtract from supervision.
///
/// # Errors
///
/// Propagates rasterization failures from the database.
pub fn build_ignore_mask<D: AnnotationDatabase + ?Sized>(
    db: &D,
    image: &ImageInfo,
    annotations: &[Annotation],
    filter: &AnnotationFilter,
) -> Result<Array2<bool>> {
    let shape = (image.height as usize, image.width as usize);

    let masks = annotations
        .iter()
        .map(|annotation| db.annotation_mask(annotation, image.height, image.width))
        .collect::<Result<Vec<_>>>()?;

    let mut eligible_union = Array2::from_elem(shape, false);
    for (annotation, mask) in annotations.iter().zip(&masks) {
        if filter.is_eligible(annotation) {
            eligible_union.zip_mut_with(mask, |u, &m| *u |= m);
        }
    }

    let mut ignore = Array2::from_elem(shape, false);
    for (annotation, mask) in annotations.iter().zip(&masks) {
        if annotation.is_crowd() {
            ndarray::Zip::from(&mut ignore)
                .and(mask)
                .and(&eligible_union)
                .for_each(|i, &m, &u| *i |= m && !u);
        }
    }

    Ok(ignore)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{RleCounts, RleSegmentation, Segmentation, person};
    use crate::database::{CocoDatabase, CocoFile};

    const H: u32 = 4;
    const W: u32 = 5;

    fn image() -> ImageInfo {
        ImageInfo {
            id: 1,
            width: W,
            height: H,
            file_name: String::new(),
        }
    }

    fn with_rle(mut annotation: Annotation, counts: Vec<u32>) -> Annotation {
        annotation.segmentation = Segmentation::Rle(RleSegmentation {
            size: [H, W],
            counts: RleCounts::Uncompressed(counts),
        });
        annotation
    }

    fn crowd(id: u64, counts: Vec<u32>) -> Annotation {
        let mut annotation = with_rle(person(id, 1, vec![]), counts);
        annotation.iscrowd = 1;
        annotation.num_keypoints = 0;
        annotation
    }

    fn eligible(id: u64, counts: Vec<u32>) -> Annotation {
        let mut annotation = with_rle(person(id, 1, vec![]), counts);
        annotation.num_keypoints = 10;
        annotation
    }

    fn run(annotations: &[Annotation]) -> Array2<bool> {
        let db = CocoDatabase::new(CocoFile::default());
        build_ignore_mask(&db, &image(), annotations, &AnnotationFilter::default()).unwrap()
    }

    #[test]
    fn test_no_crowd_no_ignore() {
        let mask = run(&[eligible(1, vec![0, 20])]);
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn test_crowd_minus_eligible() {
        // crowd covers columns 0-1, eligible person covers column 1
        let mask = run(&[crowd(1, vec![0, 8, 12]), eligible(2, vec![4, 4, 12])]);
        assert!((0..4).all(|row| mask[[row, 0]]));
        assert!((0..4).all(|row| !mask[[row, 1]]));
        assert_eq!(mask.iter().filter(|&&m| m).count(), 4);
    }

    #[test]
    fn test_crowd_inside_eligible_union() {
        let mask = run(&[eligible(1, vec![0, 12, 8]), crowd(2, vec![4, 4, 12])]);
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn test_small_instance_does_not_shield_crowd() {
        let mut small = eligible(2, vec![0, 20]);
        small.area = 100.0;
        let mask = run(&[crowd(1, vec![0, 8, 12]), small]);
        assert_eq!(mask.iter().filter(|&&m| m).count(), 8);
    }

    #[test]
    fn test_multiple_crowds_union() {
        let mask = run(&[crowd(1, vec![0, 4, 16]), crowd(2, vec![16, 4])]);
        assert!((0..4).all(|row| mask[[row, 0]] && mask[[row, 4]]));
        assert_eq!(mask.iter().filter(|&&m| m).count(), 8);
    }

    #[test]
    fn test_rasterization_failure_propagates() {
        let db = CocoDatabase::new(CocoFile::default());
        let mut bad = crowd(1, vec![20]);
        bad.segmentation = Segmentation::Rle(RleSegmentation {
            size: [9, 9],
            counts: RleCounts::Uncompressed(vec![81]),
        });
        assert!(build_ignore_mask(&db, &image(), &[bad], &AnnotationFilter::default()).is_err());
    }
}
