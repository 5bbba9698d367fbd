//! Skeleton definition as served by `GET /sessions/{id}/skeleton`
//!
//! Parallel arrays: entry `i` of every array describes bone `i`.

use serde::{Deserialize, Serialize};

use marionette_core::{BoneIndex, MarionetteResult, SkeletonFault};

/// Parent marker for root bones
pub const NO_PARENT: i64 = -1;

/// Rest transforms, one entry per bone
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BindPose {
    pub positions: Vec<[f64; 3]>,
    /// Quaternions in x, y, z, w order
    pub rotations: Vec<[f64; 4]>,
    pub scales: Vec<[f64; 3]>,
}

/// Name and parent of one bone
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoneDefinition {
    pub name: String,
    pub parent_index: i64,
}

/// Complete skeleton description
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkeletonDefinition {
    pub bone_names: Vec<String>,
    pub parents: Vec<i64>,
    pub bind_pose: BindPose,
}

impl SkeletonDefinition {
    /// Number of bones declared by the name array
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bone_names.len()
    }

    /// Iterate over (name, parent) pairs
    pub fn bones(&self) -> impl Iterator<Item = BoneDefinition> + '_ {
        self.bone_names
            .iter()
            .zip(self.parents.iter())
            .map(|(name, &parent_index)| BoneDefinition {
                name: name.clone(),
                parent_index,
            })
    }

    /// Check the definition can be built in a single forward pass
    ///
    /// Every array has the same length, and every parent is either
    /// [`NO_PARENT`] or an index strictly below the bone's own.
    pub fn validate(&self) -> MarionetteResult<()> {
        let count = self.bone_names.len();
        let pose = &self.bind_pose;

        if self.parents.len() != count
            || pose.positions.len() != count
            || pose.rotations.len() != count
            || pose.scales.len() != count
        {
            return Err(SkeletonFault::LengthMismatch {
                names: count,
                parents: self.parents.len(),
                positions: pose.positions.len(),
                rotations: pose.rotations.len(),
                scales: pose.scales.len(),
            }
            .into());
        }

        for (bone, &parent) in self.parents.iter().enumerate() {
            resolve_parent(bone, parent, count)?;
        }

        Ok(())
    }
}

/// Resolve a raw parent entry to an arena index
pub(crate) fn resolve_parent(
    bone: BoneIndex,
    parent: i64,
    count: usize,
) -> Result<Option<BoneIndex>, SkeletonFault> {
    if parent == NO_PARENT {
        return Ok(None);
    }
    if parent < 0 || parent as u64 >= count as u64 {
        return Err(SkeletonFault::ParentOutOfRange {
            bone,
            parent,
            count,
        });
    }

    let parent = parent as BoneIndex;
    if parent >= bone {
        return Err(SkeletonFault::ForwardParent { bone, parent });
    }
    Ok(Some(parent))
}
