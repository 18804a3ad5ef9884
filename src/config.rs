// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Target construction configuration.
//!
//! This module defines [`TargetConfig`], which holds the eligibility thresholds,
//! the gaussian and limb-band widths, and the joint [`Topology`] used by every builder.

use crate::error::{Result, TargetError};
use crate::topology::Topology;

/// Minimum number of labeled keypoints for an annotation to be supervised.
pub const MIN_KEYPOINTS: u32 = 5;

/// Minimum instance area in pixels (32x32), exclusive.
pub const MIN_AREA: f64 = 32.0 * 32.0;

/// Spread of the per-joint gaussian in pixels.
pub const HEATMAP_SIGMA: f32 = 7.0;

/// Half-width of the band around a limb in pixels.
pub const PAF_WIDTH: f32 = 5.0;

/// Added to the per-limb instance count before normalizing.
pub const PAF_EPSILON: f32 = 1e-8;

/// Configuration for target construction.
///
/// # Example
///
/// ```rust
/// use pose_targets::TargetConfig;
///
/// let config = TargetConfig::new()
///     .with_min_keypoints(8)
///     .with_heatmap_sigma(5.0)
///     .with_paf_width(3.0);
/// assert_eq!(config.min_keypoints, 8);
/// ```
#[derive(Debug, Clone)]
pub struct TargetConfig {
    /// Annotations need at least this many labeled keypoints.
    pub min_keypoints: u32,
    /// Annotations need an area strictly above this value.
    pub min_area: f64,
    /// Gaussian spread for heatmaps.
    pub heatmap_sigma: f32,
    /// Maximum perpendicular distance from a limb for a pixel to be on it.
    pub paf_width: f32,
    /// Normalization epsilon for part affinity fields.
    pub paf_epsilon: f32,
    /// Joint layout and limb definitions.
    pub topology: Topology,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            min_keypoints: MIN_KEYPOINTS,
            min_area: MIN_AREA,
            heatmap_sigma: HEATMAP_SIGMA,
            paf_width: PAF_WIDTH,
            paf_epsilon: PAF_EPSILON,
            topology: Topology::coco(),
        }
    }
}

impl TargetConfig {
    /// Create a new configuration with COCO defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum labeled keypoint count.
    #[must_use]
    pub const fn with_min_keypoints(mut self, min_keypoints: u32) -> Self {
        self.min_keypoints = min_keypoints;
        self
    }

    /// Set the minimum (exclusive) instance area.
    #[must_use]
    pub const fn with_min_area(mut self, min_area: f64) -> Self {
        self.min_area = min_area;
        self
    }

    /// Set the heatmap gaussian spread.
    #[must_use]
    pub const fn with_heatmap_sigma(mut self, sigma: f32) -> Self {
        self.heatmap_sigma = sigma;
        self
    }

    /// Set the limb band half-width.
    #[must_use]
    pub const fn with_paf_width(mut self, width: f32) -> Self {
        self.paf_width = width;
        self
    }

    /// Set the part affinity field normalization epsilon.
    #[must_use]
    pub const fn with_paf_epsilon(mut self, epsilon: f32) -> Self {
        self.paf_epsilon = epsilon;
        self
    }

    /// Replace the joint topology.
    #[must_use]
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Check that the numeric parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ConfigError`] if a spread, width or epsilon is not a
    /// positive finite number, or the minimum area is negative.
    pub fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(TargetError::ConfigError(format!(
                    "{name} must be positive and finite, got {value}"
                )))
            }
        };
        positive("heatmap_sigma", self.heatmap_sigma)?;
        positive("paf_width", self.paf_width)?;
        positive("paf_epsilon", self.paf_epsilon)?;
        if self.min_area.is_nan() || self.min_area < 0.0 {
            return Err(TargetError::ConfigError(format!(
                "min_area must be non-negative, got {}",
                self.min_area
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = TargetConfig::default();
        assert_eq!(config.min_keypoints, 5);
        assert!((config.min_area - 1024.0).abs() < f64::EPSILON);
        assert!((config.heatmap_sigma - 7.0).abs() < f32::EPSILON);
        assert!((config.paf_width - 5.0).abs() < f32::EPSILON);
        assert_eq!(config.topology.num_limbs(), 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let topology = Topology::new(2, vec![[0, 1]]).unwrap();
        let config = TargetConfig::new()
            .with_min_keypoints(1)
            .with_min_area(0.0)
            .with_heatmap_sigma(2.0)
            .with_paf_width(1.5)
            .with_topology(topology.clone());

        assert_eq!(config.min_keypoints, 1);
        assert!(config.min_area.abs() < f64::EPSILON);
        assert!((config.heatmap_sigma - 2.0).abs() < f32::EPSILON);
        assert!((config.paf_width - 1.5).abs() < f32::EPSILON);
        assert_eq!(config.topology, topology);
    }

    #[test]
    fn test_config_validate_rejects_bad_values() {
        assert!(TargetConfig::new().with_heatmap_sigma(0.0).validate().is_err());
        assert!(TargetConfig::new().with_paf_width(f32::NAN).validate().is_err());
        assert!(TargetConfig::new().with_min_area(-1.0).validate().is_err());
    }
}
