// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Joint layouts and limb definitions.

use crate::error::{Result, TargetError};

/// Number of joints in the COCO keypoint layout.
pub const COCO_NUM_JOINTS: usize = 17;

/// COCO body parts used for part affinity fields (pairs of keypoint indices).
/// Unlike the drawing skeleton, the head is linked to the shoulders through the nose
/// and the hips are not linked to each other.
pub const COCO_BODY_PARTS: [[usize; 2]; 16] = [
    [0, 1],   // nose to left eye
    [0, 2],   // nose to right eye
    [1, 3],   // left eye to left ear
    [2, 4],   // right eye to right ear
    [0, 5],   // nose to left shoulder
    [0, 6],   // nose to right shoulder
    [5, 7],   // left shoulder to left elbow
    [6, 8],   // right shoulder to right elbow
    [7, 9],   // left elbow to left wrist
    [8, 10],  // right elbow to right wrist
    [5, 11],  // left shoulder to left hip
    [6, 12],  // right shoulder to right hip
    [11, 13], // left hip to left knee
    [12, 14], // right hip to right knee
    [13, 15], // left knee to left ankle
    [14, 16], // right knee to right ankle
];

/// Joint count plus the ordered limb list of a skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    num_joints: usize,
    limbs: Vec<[usize; 2]>,
}

impl Topology {
    /// Create a topology, checking every limb endpoint against `num_joints`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError::ShapeError`] if `num_joints` is zero or a limb references
    /// a joint index outside `0..num_joints`.
    pub fn new(num_joints: usize, limbs: Vec<[usize; 2]>) -> Result<Self> {
        if num_joints == 0 {
            return Err(TargetError::ShapeError(
                "topology needs at least one joint".to_string(),
            ));
        }
        if let Some((i, limb)) = limbs
            .iter()
            .enumerate()
            .find(|(_, [a, b])| *a >= num_joints || *b >= num_joints)
        {
            return Err(TargetError::ShapeError(format!(
                "limb {i} ({}, {}) references a joint outside 0..{num_joints}",
                limb[0], limb[1]
            )));
        }
        Ok(Self { num_joints, limbs })
    }

    /// The 17-joint, 16-limb COCO person layout.
    #[must_use]
    pub fn coco() -> Self {
        Self {
            num_joints: COCO_NUM_JOINTS,
            limbs: COCO_BODY_PARTS.to_vec(),
        }
    }

    /// Number of joints per instance.
    #[must_use]
    pub const fn num_joints(&self) -> usize {
        self.num_joints
    }

    /// Number of limbs (PAF channel pairs).
    #[must_use]
    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    /// Ordered limb definitions.
    #[must_use]
    pub fn limbs(&self) -> &[[usize; 2]] {
        &self.limbs
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::coco()
    }
}
