// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose Training Targets
//!
//! Builds the supervision targets of bottom-up multi-person pose estimation from
//! COCO keypoint annotations: per-joint confidence heatmaps, part affinity fields
//! (PAFs) and an ignore mask for unlabeled crowd regions.
//!
//! ## Features
//!
//! - **Annotation filtering** - Keeps instances with enough labeled keypoints and a large enough area
//! - **Eligible-image index** - Scans a split once and caches the eligible image ids per split
//! - **Heatmaps** - One gaussian channel per joint, merged by maximum, plus a background channel
//! - **Part affinity fields** - Unit limb direction inside a band around each limb, averaged over instances
//! - **Ignore masks** - Crowd regions not covered by any eligible instance
//! - **Parallel** - Channels and batches are built with rayon
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use pose_targets::{
//!     AnnotationFilter, CocoDatabase, EligibleIndex, FileIdStore, TargetBuilder, TargetConfig,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = CocoDatabase::from_path("annotations/person_keypoints_train2017.json")?;
//!
//!     // Eligible images are computed once and cached in data/train_ids.json
//!     let index = EligibleIndex::new(FileIdStore::new("data"), AnnotationFilter::default());
//!     let ids = index.eligible_image_ids(&db, "train")?;
//!
//!     let builder = TargetBuilder::new(TargetConfig::default())?;
//!     for targets in builder.build_batch(&db, &ids[..8])? {
//!         println!(
//!             "image {}: {} instances, heatmaps {:?}, pafs {:?}",
//!             targets.image_id,
//!             targets.num_instances(),
//!             targets.heatmaps.shape(),
//!             targets.pafs.shape()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Index a split (cached in data/train_ids.json)
//! pose-targets index --annotations person_keypoints_train2017.json --data-path data --split train
//!
//! # Build targets for one image and write previews to runs/targets/build
//! pose-targets build --annotations person_keypoints_val2017.json --image-id 785
//! ```
//!
//! **Build Options:**
//!
//! | Option | Short | Description | Default |
//! |--------|-------|-------------|---------|
//! | `--annotations` | `-a` | COCO keypoint annotation file | |
//! | `--image-id` | `-i` | Image to build targets for | |
//! | `--output` | `-o` | Preview directory | `runs/targets/build*` |
//! | `--sigma` | | Heatmap gaussian spread | `7.0` |
//! | `--paf-width` | | Limb band half-width | `5.0` |
//! | `--verbose` | | Show verbose output | `true` |
//!
//! ## Custom Configuration
//!
//! ```rust
//! use pose_targets::TargetConfig;
//!
//! let config = TargetConfig::new()
//!     .with_min_keypoints(8)    // Labeled keypoints required
//!     .with_min_area(48.0 * 48.0) // Area threshold (exclusive)
//!     .with_heatmap_sigma(5.0)  // Gaussian spread
//!     .with_paf_width(3.0);     // Limb band half-width
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`annotation`] | COCO records and the [`AnnotationFilter`] |
//! | [`database`] | [`AnnotationDatabase`] trait and the in-memory [`CocoDatabase`] |
//! | [`index`] | [`EligibleIndex`] with [`FileIdStore`] / [`MemoryIdStore`] caches |
//! | [`keypoints`] | Keypoint extraction into `(N, J, 3)` arrays |
//! | [`heatmap`] | Joint heatmaps and background channel |
//! | [`paf`] | Part affinity fields |
//! | [`ignore_mask`] | Crowd ignore masks |
//! | [`targets`] | [`TargetBuilder`] and [`Targets`] |
//! | [`mask`] | Polygon and RLE rasterization |
//! | [`topology`] | Joint count and limb table |
//! | [`config`] | [`TargetConfig`] and default thresholds |
//! | [`error`] | Error types ([`TargetError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | PNG previews of targets (default) |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod annotation;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod gaussian;
pub mod heatmap;
pub mod ignore_mask;
pub mod index;
pub mod keypoints;
pub mod mask;
pub mod paf;
#[cfg(feature = "annotate")]
pub mod render;
pub mod targets;
pub mod topology;

// Re-export main types for convenience
pub use annotation::{Annotation, AnnotationFilter, Category, ImageInfo, Segmentation};
pub use config::TargetConfig;
pub use database::{AnnotationDatabase, CocoDatabase, CocoFile};
pub use error::{Result, TargetError};
pub use gaussian::{GaussianSplat, IsotropicGaussian};
pub use index::{EligibleIndex, FileIdStore, IdStore, MemoryIdStore};
pub use targets::{TargetBuilder, Targets};
pub use topology::Topology;

// Re-export the individual builders
pub use heatmap::build_heatmaps;
pub use ignore_mask::build_ignore_mask;
pub use keypoints::extract_keypoints;
pub use paf::build_pafs;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
