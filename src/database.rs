// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Annotation database access.
//!
//! [`AnnotationDatabase`] is the narrow interface the target builders and the
//! eligible-image index need from a dataset. [`CocoDatabase`] implements it over a
//! COCO keypoint JSON file held in memory.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, Category, ImageInfo};
use crate::error::{Result, TargetError};
use crate::mask::segmentation_to_mask;

/// Read access to images, annotations and segmentation masks of one dataset split.
pub trait AnnotationDatabase: Sync {
    /// Ids of the categories with the given names, in category order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn category_ids(&self, names: &[&str]) -> Result<Vec<u64>>;

    /// Ids of images carrying annotations of every given category, ascending.
    /// An empty list selects all images.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::LookupError`] for an unknown category id.
    fn image_ids(&self, category_ids: &[u64]) -> Result<Vec<u64>>;

    /// Ids of all annotations of an image.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::LookupError`] for an unknown image id.
    fn annotation_ids(&self, image_id: u64) -> Result<Vec<u64>>;

    /// Full records for the given annotation ids, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::LookupError`] for an unknown annotation id.
    fn load_annotations(&self, ids: &[u64]) -> Result<Vec<Annotation>>;

    /// Size and file name of an image.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::LookupError`] for an unknown image id.
    fn image_info(&self, image_id: u64) -> Result<ImageInfo>;

    /// Rasterize an annotation's segmentation to a `(height, width)` mask.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::LookupError`] if the segmentation cannot be rasterized
    /// at this size.
    fn annotation_mask(
        &self,
        annotation: &Annotation,
        height: u32,
        width: u32,
    ) -> Result<Array2<bool>> {
        segmentation_to_mask(&annotation.segmentation, height, width).map_err(|e| {
            TargetError::LookupError(format!(
                "failed to rasterize annotation {}: {e}",
                annotation.id
            ))
        })
    }

    /// All annotation records of an image.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Self::annotation_ids`] and [`Self::load_annotations`].
    fn image_annotations(&self, image_id: u64) -> Result<Vec<Annotation>> {
        let ids = self.annotation_ids(image_id)?;
        self.load_annotations(&ids)
    }
}

/// On-disk layout of a COCO annotation file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoFile {
    /// Image entries.
    #[serde(default)]
    pub images: Vec<ImageInfo>,
    /// Annotation entries.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Category entries.
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// In-memory index over a COCO file.
#[derive(Debug, Clone, Default)]
pub struct CocoDatabase {
    images: BTreeMap<u64, ImageInfo>,
    annotations: HashMap<u64, Annotation>,
    categories: Vec<Category>,
    image_to_annotations: HashMap<u64, Vec<u64>>,
    category_to_images: HashMap<u64, BTreeSet<u64>>,
}

impl CocoDatabase {
    /// Build the index from parsed COCO content.
    #[must_use]
    pub fn new(coco: CocoFile) -> Self {
        let mut image_to_annotations: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut category_to_images: HashMap<u64, BTreeSet<u64>> = coco
            .categories
            .iter()
            .map(|c| (c.id, BTreeSet::new()))
            .collect();

        for annotation in &coco.annotations {
            image_to_annotations
                .entry(annotation.image_id)
                .or_default()
                .push(annotation.id);
            category_to_images
                .entry(annotation.category_id)
                .or_default()
                .insert(annotation.image_id);
        }

        Self {
            images: coco.images.into_iter().map(|i| (i.id, i)).collect(),
            annotations: coco.annotations.into_iter().map(|a| (a.id, a)).collect(),
            categories: coco.categories,
            image_to_annotations,
            category_to_images,
        }
    }

    /// Load and index a COCO JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not valid COCO JSON.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            TargetError::LookupError(format!(
                "failed to open annotation file {}: {e}",
                path.display()
            ))
        })?;
        let coco: CocoFile = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self::new(coco))
    }

    /// Number of images.
    #[must_use]
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Number of annotations.
    #[must_use]
    pub fn num_annotations(&self) -> usize {
        self.annotations.len()
    }
}

impl AnnotationDatabase for CocoDatabase {
    fn category_ids(&self, names: &[&str]) -> Result<Vec<u64>> {
        Ok(self
            .categories
            .iter()
            .filter(|c| names.is_empty() || names.contains(&c.name.as_str()))
            .map(|c| c.id)
            .collect())
    }

    fn image_ids(&self, category_ids: &[u64]) -> Result<Vec<u64>> {
        let Some((first, rest)) = category_ids.split_first() else {
            return Ok(self.images.keys().copied().collect());
        };

        let lookup = |id: &u64| {
            self.category_to_images
                .get(id)
                .ok_or_else(|| TargetError::LookupError(format!("unknown category id {id}")))
        };

        let mut ids = lookup(first)?.clone();
        for id in rest {
            let other = lookup(id)?;
            ids.retain(|image_id| other.contains(image_id));
        }
        Ok(ids.into_iter().collect())
    }

    fn annotation_ids(&self, image_id: u64) -> Result<Vec<u64>> {
        if !self.images.contains_key(&image_id) {
            return Err(TargetError::LookupError(format!(
                "unknown image id {image_id}"
            )));
        }
        Ok(self
            .image_to_annotations
            .get(&image_id)
            .cloned()
            .unwrap_or_default())
    }

    fn load_annotations(&self, ids: &[u64]) -> Result<Vec<Annotation>> {
        ids.iter()
            .map(|id| {
                self.annotations.get(id).cloned().ok_or_else(|| {
                    TargetError::LookupError(format!("unknown annotation id {id}"))
                })
            })
            .collect()
    }

    fn image_info(&self, image_id: u64) -> Result<ImageInfo> {
        self.images
            .get(&image_id)
            .cloned()
            .ok_or_else(|| TargetError::LookupError(format!("unknown image id {image_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{RleCounts, RleSegmentation, Segmentation, person};

    fn sample() -> CocoDatabase {
        let image = |id| ImageInfo {
            id,
            width: 8,
            height: 6,
            file_name: format!("{id:012}.jpg"),
        };
        let mut crowd = person(12, 30, vec![]);
        crowd.iscrowd = 1;
        crowd.segmentation = Segmentation::Rle(RleSegmentation {
            size: [6, 8],
            counts: RleCounts::Uncompressed(vec![6, 6, 36]),
        });
        let mut ball = person(13, 20, vec![]);
        ball.category_id = 37;

        CocoDatabase::new(CocoFile {
            images: vec![image(30), image(10), image(20)],
            annotations: vec![
                person(11, 30, vec![0.0; 51]),
                crowd,
                person(14, 10, vec![0.0; 51]),
                ball,
            ],
            categories: vec![
                Category {
                    id: 1,
                    name: "person".to_string(),
                    supercategory: "person".to_string(),
                },
                Category {
                    id: 37,
                    name: "sports ball".to_string(),
                    supercategory: "sports".to_string(),
                },
            ],
        })
    }

    #[test]
    fn test_category_and_image_ids() {
        let db = sample();
        assert_eq!(db.category_ids(&["person"]).unwrap(), vec![1]);
        assert_eq!(db.category_ids(&[]).unwrap(), vec![1, 37]);
        assert_eq!(db.image_ids(&[1]).unwrap(), vec![10, 30]);
        assert_eq!(db.image_ids(&[]).unwrap(), vec![10, 20, 30]);
        assert!(db.image_ids(&[1, 37]).unwrap().is_empty());
        assert!(db.image_ids(&[99]).is_err());
    }

    #[test]
    fn test_annotations_of_image() {
        let db = sample();
        assert_eq!(db.annotation_ids(30).unwrap(), vec![11, 12]);
        assert!(db.annotation_ids(20).unwrap().len() == 1);
        assert!(matches!(
            db.annotation_ids(999),
            Err(TargetError::LookupError(_))
        ));
        let annotations = db.image_annotations(30).unwrap();
        assert_eq!(annotations.len(), 2);
        assert!(annotations[1].is_crowd());
        assert!(db.load_annotations(&[11, 404]).is_err());
    }

    #[test]
    fn test_annotation_mask() {
        let db = sample();
        let crowd = &db.load_annotations(&[12]).unwrap()[0];
        let mask = db.annotation_mask(crowd, 6, 8).unwrap();
        assert_eq!(mask.shape(), &[6, 8]);
        // second column fully covered
        assert!((0..6).all(|row| mask[[row, 1]]));
        assert_eq!(mask.iter().filter(|&&m| m).count(), 6);
        assert!(matches!(
            db.annotation_mask(crowd, 5, 8),
            Err(TargetError::LookupError(_))
        ));
    }

    #[test]
    fn test_parse_coco_json() {
        let json = r#"{
            "images": [{"id": 1, "width": 4, "height": 3, "file_name": "a.jpg"}],
            "annotations": [{"id": 5, "image_id": 1, "category_id": 1, "num_keypoints": 0,
                             "area": 4.0, "iscrowd": 0, "keypoints": [],
                             "segmentation": [[0, 0, 2, 0, 2, 2]]}],
            "categories": [{"id": 1, "name": "person"}]
        }"#;
        let coco: CocoFile = serde_json::from_str(json).unwrap();
        let db = CocoDatabase::new(coco);
        assert_eq!(db.num_images(), 1);
        assert_eq!(db.num_annotations(), 1);
        assert_eq!(db.image_info(1).unwrap().width, 4);
    }
}
