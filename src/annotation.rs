// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! COCO annotation records and the eligibility filter.
//!
//! The record types mirror the COCO keypoint JSON layout so that they can be read
//! straight from `person_keypoints_<split>.json` files with `serde_json`.

use serde::{Deserialize, Serialize};

use crate::config::{MIN_AREA, MIN_KEYPOINTS, TargetConfig};

/// Image entry of a COCO file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    /// Image id.
    pub id: u64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// File name relative to the split's image directory.
    #[serde(default)]
    pub file_name: String,
}

/// Category entry of a COCO file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category id.
    pub id: u64,
    /// Category name (e.g. "person").
    pub name: String,
    /// Parent category name.
    #[serde(default)]
    pub supercategory: String,
}

/// Run-length counts, either as a list or in the compact string form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RleCounts {
    /// Plain column-major run lengths.
    Uncompressed(Vec<u32>),
    /// LEB128-like compressed string used by the COCO API.
    Compressed(String),
}

/// Run-length encoded segmentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RleSegmentation {
    /// Mask size as `[height, width]`.
    pub size: [u32; 2],
    /// Run lengths.
    pub counts: RleCounts,
}

/// Instance segmentation in one of the COCO encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One or more polygons as flat `[x0, y0, x1, y1, ...]` lists.
    Polygons(Vec<Vec<f64>>),
    /// Run-length encoding, used for crowd regions.
    Rle(RleSegmentation),
}

impl Default for Segmentation {
    fn default() -> Self {
        Self::Polygons(Vec::new())
    }
}

/// A single person annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Annotation id.
    pub id: u64,
    /// Id of the image this annotation belongs to.
    pub image_id: u64,
    /// Category id.
    #[serde(default)]
    pub category_id: u64,
    /// Number of labeled keypoints.
    #[serde(default)]
    pub num_keypoints: u32,
    /// Instance area in pixels.
    #[serde(default)]
    pub area: f64,
    /// 1 for crowd regions, 0 otherwise.
    #[serde(default)]
    pub iscrowd: u8,
    /// Flat `(x, y, visibility)` triplets.
    #[serde(default)]
    pub keypoints: Vec<f32>,
    /// Bounding box `[x, y, w, h]`.
    #[serde(default)]
    pub bbox: [f64; 4],
    /// Instance segmentation.
    #[serde(default)]
    pub segmentation: Segmentation,
}

impl Annotation {
    /// Whether this annotation marks a crowd region.
    #[must_use]
    pub const fn is_crowd(&self) -> bool {
        self.iscrowd == 1
    }
}

/// Decides whether an annotation is used for positive supervision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationFilter {
    /// Minimum labeled keypoint count (inclusive).
    pub min_keypoints: u32,
    /// Minimum instance area (exclusive).
    pub min_area: f64,
}

impl Default for AnnotationFilter {
    fn default() -> Self {
        Self {
            min_keypoints: MIN_KEYPOINTS,
            min_area: MIN_AREA,
        }
    }
}

impl AnnotationFilter {
    /// Create a filter with explicit thresholds.
    #[must_use]
    pub const fn new(min_keypoints: u32, min_area: f64) -> Self {
        Self {
            min_keypoints,
            min_area,
        }
    }

    /// Create a filter from the thresholds of a [`TargetConfig`].
    #[must_use]
    pub const fn from_config(config: &TargetConfig) -> Self {
        Self::new(config.min_keypoints, config.min_area)
    }

    /// True iff the annotation has enough keypoints, a large enough area and is not a crowd.
    #[must_use]
    pub fn is_eligible(&self, annotation: &Annotation) -> bool {
        annotation.num_keypoints >= self.min_keypoints
            && annotation.area > self.min_area
            && !annotation.is_crowd()
    }
}

#[cfg(test)]
pub(crate) fn person(id: u64, image_id: u64, keypoints: Vec<f32>) -> Annotation {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let num_keypoints = keypoints.chunks_exact(3).filter(|k| k[2] > 0.0).count() as u32;
    Annotation {
        id,
        image_id,
        category_id: 1,
        num_keypoints,
        area: 5000.0,
        iscrowd: 0,
        keypoints,
        bbox: [0.0; 4],
        segmentation: Segmentation::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(num_keypoints: u32, area: f64, iscrowd: u8) -> Annotation {
        Annotation {
            num_keypoints,
            area,
            iscrowd,
            ..person(1, 1, vec![0.0; 51])
        }
    }

    #[test]
    fn test_filter_thresholds() {
        let filter = AnnotationFilter::default();
        assert!(filter.is_eligible(&annotation(5, 1025.0, 0)));
        assert!(!filter.is_eligible(&annotation(4, 5000.0, 0)));
        assert!(!filter.is_eligible(&annotation(17, 1024.0, 0)));
    }

    #[test]
    fn test_filter_monotonic() {
        let filter = AnnotationFilter::default();
        for num_keypoints in 5..=17 {
            for area in [1024.5, 2000.0, 1e6] {
                assert!(filter.is_eligible(&annotation(num_keypoints, area, 0)));
                assert!(!filter.is_eligible(&annotation(num_keypoints, area, 1)));
            }
        }
    }

    #[test]
    fn test_filter_from_config() {
        let config = TargetConfig::new().with_min_keypoints(1).with_min_area(0.0);
        let filter = AnnotationFilter::from_config(&config);
        assert!(filter.is_eligible(&annotation(1, 1.0, 0)));
    }

    #[test]
    fn test_deserialize_polygon_annotation() {
        let json = r#"{
            "id": 7, "image_id": 3, "category_id": 1, "num_keypoints": 2,
            "area": 1500.5, "iscrowd": 0, "bbox": [1, 2, 30, 40],
            "keypoints": [10, 20, 2, 0, 0, 0, 30, 40, 1],
            "segmentation": [[0, 0, 10, 0, 10, 10]]
        }"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.id, 7);
        assert_eq!(annotation.keypoints.len(), 9);
        assert!(matches!(annotation.segmentation, Segmentation::Polygons(ref p) if p.len() == 1));
    }

    #[test]
    fn test_deserialize_crowd_annotation() {
        let json = r#"{
            "id": 8, "image_id": 3, "category_id": 1, "area": 900, "iscrowd": 1,
            "segmentation": {"size": [4, 5], "counts": [3, 4, 13]}
        }"#;
        let annotation: Annotation = serde_json::from_str(json).unwrap();
        assert!(annotation.is_crowd());
        assert_eq!(annotation.num_keypoints, 0);
        match annotation.segmentation {
            Segmentation::Rle(rle) => {
                assert_eq!(rle.size, [4, 5]);
                assert_eq!(rle.counts, RleCounts::Uncompressed(vec![3, 4, 13]));
            }
            Segmentation::Polygons(_) => panic!("expected RLE"),
        }
    }
}
