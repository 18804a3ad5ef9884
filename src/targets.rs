// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-image training target assembly.
//!
//! [`TargetBuilder`] ties the keypoint extractor, heatmap builder, PAF builder and
//! ignore-mask builder to one [`TargetConfig`]:
//!
//! ```no_run
//! use pose_targets::{CocoDatabase, TargetBuilder, TargetConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = CocoDatabase::from_path("annotations/person_keypoints_val2017.json")?;
//! let builder = TargetBuilder::new(TargetConfig::default())?;
//! let targets = builder.build(&db, 785)?;
//! println!("{} instances", targets.num_instances());
//! # Ok(())
//! # }
//! ```

use ndarray::{Array2, Array3, Array4};
use rayon::prelude::*;

use crate::annotation::{Annotation, AnnotationFilter, ImageInfo};
use crate::config::TargetConfig;
use crate::database::AnnotationDatabase;
use crate::error::Result;
use crate::gaussian::{GaussianSplat, IsotropicGaussian};
use crate::heatmap::build_heatmaps;
use crate::ignore_mask::build_ignore_mask;
use crate::keypoints::{check_shape, extract_keypoints};
use crate::paf::build_pafs;

/// All training targets of one image.
#[derive(Debug, Clone)]
pub struct Targets {
    /// Source image id.
    pub image_id: u64,
    /// `(N, J, 3)` keypoints of the eligible instances.
    pub keypoints: Array3<f32>,
    /// `(J + 1, H, W)` joint heatmaps followed by the background channel.
    pub heatmaps: Array3<f32>,
    /// `(L, 2, H, W)` part affinity fields.
    pub pafs: Array4<f32>,
    /// `(H, W)` pixels excluded from supervision.
    pub ignore_mask: Array2<bool>,
}

impl Targets {
    /// Number of eligible instances.
    #[must_use]
    pub fn num_instances(&self) -> usize {
        self.keypoints.shape()[0]
    }

    /// Image height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.ignore_mask.nrows()
    }

    /// Image width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.ignore_mask.ncols()
    }

    /// Number of ignored pixels.
    #[must_use]
    pub fn ignored_pixels(&self) -> usize {
        self.ignore_mask.iter().filter(|&&m| m).count()
    }
}

/// Builds training targets with one configuration and gaussian primitive.
pub struct TargetBuilder {
    config: TargetConfig,
    filter: AnnotationFilter,
    splat: Box<dyn GaussianSplat>,
}

impl TargetBuilder {
    /// Create a builder using [`IsotropicGaussian`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ConfigError`] if the configuration is invalid.
    pub fn new(config: TargetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            filter: AnnotationFilter::from_config(&config),
            config,
            splat: Box::new(IsotropicGaussian),
        })
    }

    /// Replace the gaussian primitive.
    #[must_use]
    pub fn with_splat<G: GaussianSplat + 'static>(mut self, splat: G) -> Self {
        self.splat = Box::new(splat);
        self
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// The annotation filter derived from the configuration.
    #[must_use]
    pub const fn filter(&self) -> &AnnotationFilter {
        &self.filter
    }

    /// Stack keypoints of the given annotations, ignoring eligibility.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ShapeError`] on a keypoint length mismatch.
    pub fn keypoints<'a, I>(&self, annotations: I) -> Result<Array3<f32>>
    where
        I: IntoIterator<Item = &'a Annotation>,
    {
        extract_keypoints(annotations, self.config.topology.num_joints())
    }

    /// Heatmaps for an image of `height x width`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ShapeError`] if `keypoints` does not match the topology.
    pub fn heatmaps(
        &self,
        height: usize,
        width: usize,
        keypoints: &Array3<f32>,
    ) -> Result<Array3<f32>> {
        check_shape(keypoints, self.config.topology.num_joints())?;
        build_heatmaps(
            height,
            width,
            keypoints,
            self.config.heatmap_sigma,
            self.splat.as_ref(),
        )
    }

    /// Part affinity fields for an image of `height x width`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TargetError::ShapeError`] if `keypoints` does not match the topology.
    pub fn pafs(
        &self,
        height: usize,
        width: usize,
        keypoints: &Array3<f32>,
    ) -> Result<Array4<f32>> {
        check_shape(keypoints, self.config.topology.num_joints())?;
        build_pafs(
            height,
            width,
            keypoints,
            self.config.topology.limbs(),
            self.config.paf_width,
            self.config.paf_epsilon,
        )
    }

    /// Ignore mask of `image` from all of its annotations.
    ///
    /// # Errors
    ///
    /// Propagates rasterization failures from the database.
    pub fn ignore_mask<D: AnnotationDatabase + ?Sized>(
        &self,
        db: &D,
        image: &ImageInfo,
        annotations: &[Annotation],
    ) -> Result<Array2<bool>> {
        build_ignore_mask(db, image, annotations, &self.filter)
    }

    /// Build all targets of one image.
    ///
    /// Heatmaps and PAFs come from eligible annotations only; the ignore mask sees
    /// every annotation of the image.
    ///
    /// # Errors
    ///
    /// Returns a lookup error for an unknown image, a shape error for malformed
    /// keypoints of an eligible annotation, and propagates rasterization failures.
    pub fn build<D: AnnotationDatabase + ?Sized>(&self, db: &D, image_id: u64) -> Result<Targets> {
        let image = db.image_info(image_id)?;
        let annotations = db.image_annotations(image_id)?;
        let (height, width) = (image.height as usize, image.width as usize);

        let eligible = annotations.iter().filter(|a| self.filter.is_eligible(a));
        let keypoints = self.keypoints(eligible)?;
        let heatmaps = self.heatmaps(height, width, &keypoints)?;
        let pafs = self.pafs(height, width, &keypoints)?;
        let ignore_mask = self.ignore_mask(db, &image, &annotations)?;

        Ok(Targets {
            image_id,
            keypoints,
            heatmaps,
            pafs,
            ignore_mask,
        })
    }

    /// Build targets for many images in parallel.
    ///
    /// Results are in the order of `image_ids`.
    ///
    /// # Errors
    ///
    /// Returns an error if any image fails.
    pub fn build_batch<D: AnnotationDatabase + ?Sized>(
        &self,
        db: &D,
        image_ids: &[u64],
    ) -> Result<Vec<Targets>> {
        image_ids
            .par_iter()
            .map(|&image_id| self.build(db, image_id))
            .collect()
    }
}
