//! Bone hierarchy
//!
//! Bones live in a flat arena addressed by their definition index. Parent and
//! child links are indices into that arena; root bones hang off a synthetic
//! root group. Topology is fixed by [`SkeletonHierarchy::build`]; afterwards
//! only transforms change.
//!
//! World matrices come straight from the server. The hierarchy never walks
//! parent chains to recompute them.

use glam::{DMat4, DQuat, DVec3};

use marionette_core::{BoneIndex, MarionetteError, MarionetteResult};

use crate::definition::resolve_parent;
use crate::{SkeletonDefinition, Trs};

/// A node of the skeleton
#[derive(Clone, Debug)]
pub struct Bone {
    index: BoneIndex,
    name: String,
    parent: Option<BoneIndex>,
    children: Vec<BoneIndex>,
    bind_pose: Trs,
    /// Local position / rotation / scale
    pub local: Trs,
    /// Column-major world matrix
    pub world: DMat4,
}

impl Bone {
    #[inline]
    pub fn index(&self) -> BoneIndex {
        self.index
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn parent(&self) -> Option<BoneIndex> {
        self.parent
    }

    /// Parent index in definition form (-1 for roots)
    pub fn parent_index(&self) -> i64 {
        self.parent.map_or(-1, |p| p as i64)
    }

    #[inline]
    pub fn children(&self) -> &[BoneIndex] {
        &self.children
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Rest transform applied at build time
    #[inline]
    pub fn bind_pose(&self) -> &Trs {
        &self.bind_pose
    }

    /// World-space position
    pub fn world_position(&self) -> DVec3 {
        self.world.w_axis.truncate()
    }
}

/// Copy of one bone's pose, detached from the hierarchy
#[derive(Clone, Debug, PartialEq)]
pub struct BoneSnapshot {
    pub index: BoneIndex,
    pub name: String,
    pub parent: Option<BoneIndex>,
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
    pub world: DMat4,
}

/// Fixed-topology, mutable-pose bone tree
#[derive(Clone, Debug)]
pub struct SkeletonHierarchy {
    bones: Vec<Bone>,
    /// Children of the synthetic root group
    roots: Vec<BoneIndex>,
}

impl SkeletonHierarchy {
    /// Build the hierarchy from a server definition
    ///
    /// The definition is validated in full before any bone is allocated, so a
    /// malformed definition never yields a partial hierarchy.
    pub fn build(definition: &SkeletonDefinition) -> MarionetteResult<Self> {
        definition.validate()?;
        let count = definition.bone_count();

        // Pass 1: allocate
        let mut bones: Vec<Bone> = definition
            .bone_names
            .iter()
            .enumerate()
            .map(|(index, name)| Bone {
                index,
                name: name.clone(),
                parent: None,
                children: Vec::new(),
                bind_pose: Trs::IDENTITY,
                local: Trs::IDENTITY,
                world: DMat4::IDENTITY,
            })
            .collect();

        // Pass 2: link
        let mut roots = Vec::new();
        for (index, &raw_parent) in definition.parents.iter().enumerate() {
            match resolve_parent(index, raw_parent, count)? {
                Some(parent) => {
                    bones[index].parent = Some(parent);
                    bones[parent].children.push(index);
                }
                None => roots.push(index),
            }
        }

        // Pass 3: seed with the bind pose
        let pose = &definition.bind_pose;
        for (index, bone) in bones.iter_mut().enumerate() {
            let trs = Trs::from_arrays(
                pose.positions[index],
                pose.rotations[index],
                pose.scales[index],
            );
            bone.bind_pose = trs;
            bone.local = trs;
        }

        Ok(SkeletonHierarchy { bones, roots })
    }

    #[inline]
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    #[inline]
    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    #[inline]
    pub fn bone(&self, index: BoneIndex) -> Option<&Bone> {
        self.bones.get(index)
    }

    /// Bones attached directly to the synthetic root group
    #[inline]
    pub fn roots(&self) -> &[BoneIndex] {
        &self.roots
    }

    /// Find a bone by name
    pub fn find(&self, name: &str) -> Option<BoneIndex> {
        self.bones.iter().position(|b| b.name == name)
    }

    /// Number of ancestors between a bone and the root group
    pub fn depth(&self, index: BoneIndex) -> Option<usize> {
        let mut bone = self.bones.get(index)?;
        let mut depth = 0;
        while let Some(parent) = bone.parent {
            bone = &self.bones[parent];
            depth += 1;
        }
        Some(depth)
    }

    /// Replace a bone's world matrix and re-derive its TRS from it
    pub fn apply_world_transform(&mut self, index: BoneIndex, matrix: DMat4) -> MarionetteResult<()> {
        let count = self.bones.len();
        let bone = self
            .bones
            .get_mut(index)
            .ok_or(MarionetteError::BoneOutOfRange { index, count })?;

        bone.world = matrix;
        bone.local = Trs::from_matrix(&matrix);
        Ok(())
    }

    /// World-space line segments from each parent to each child
    pub fn segments(&self) -> Vec<(DVec3, DVec3)> {
        self.bones
            .iter()
            .filter_map(|b| {
                b.parent
                    .map(|p| (self.bones[p].world_position(), b.world_position()))
            })
            .collect()
    }

    /// Copy the current pose out of the hierarchy
    pub fn snapshot(&self) -> Vec<BoneSnapshot> {
        self.bones
            .iter()
            .map(|b| BoneSnapshot {
                index: b.index,
                name: b.name.clone(),
                parent: b.parent,
                position: b.local.translation,
                rotation: b.local.rotation,
                scale: b.local.scale,
                world: b.world,
            })
            .collect()
    }
}

impl TryFrom<&SkeletonDefinition> for SkeletonHierarchy {
    type Error = MarionetteError;

    fn try_from(definition: &SkeletonDefinition) -> MarionetteResult<Self> {
        SkeletonHierarchy::build(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BindPose;
    use marionette_core::SkeletonFault;
    use proptest::prelude::*;

    fn definition(parents: Vec<i64>) -> SkeletonDefinition {
        let n = parents.len();
        SkeletonDefinition {
            bone_names: (0..n).map(|i| format!("bone{i}")).collect(),
            parents,
            bind_pose: BindPose {
                positions: (0..n).map(|i| [0.0, i as f64 * 10.0, 0.0]).collect(),
                rotations: vec![[0.0, 0.0, 0.0, 1.0]; n],
                scales: vec![[1.0; 3]; n],
            },
        }
    }

    #[test]
    fn test_build_two_bones() {
        let hierarchy = SkeletonHierarchy::build(&definition(vec![-1, 0])).unwrap();

        assert_eq!(hierarchy.bone_count(), 2);
        assert_eq!(hierarchy.roots(), &[0]);
        assert_eq!(hierarchy.bone(0).unwrap().children(), &[1]);
        assert_eq!(hierarchy.bone(1).unwrap().parent(), Some(0));
        assert_eq!(hierarchy.bone(0).unwrap().parent_index(), -1);
        assert_eq!(hierarchy.find("bone1"), Some(1));
        assert_eq!(hierarchy.depth(1), Some(1));
    }

    #[test]
    fn test_bind_pose_seeds_local_transform() {
        let hierarchy = SkeletonHierarchy::build(&definition(vec![-1, 0, 1])).unwrap();
        let bone = hierarchy.bone(2).unwrap();

        assert_eq!(bone.local.translation, DVec3::new(0.0, 20.0, 0.0));
        assert_eq!(bone.bind_pose(), &bone.local);
        assert_eq!(bone.world, DMat4::IDENTITY);
    }

    #[test]
    fn test_forest_has_multiple_roots() {
        let hierarchy = SkeletonHierarchy::build(&definition(vec![-1, 0, -1, 2])).unwrap();
        assert_eq!(hierarchy.roots(), &[0, 2]);
        assert_eq!(hierarchy.segments().len(), 2);
    }

    #[test]
    fn test_empty_definition_builds_empty_hierarchy() {
        let hierarchy = SkeletonHierarchy::build(&SkeletonDefinition::default()).unwrap();
        assert!(hierarchy.is_empty());
        assert!(hierarchy.roots().is_empty());
    }

    #[test]
    fn test_apply_world_transform() {
        let mut hierarchy = SkeletonHierarchy::build(&definition(vec![-1, 0])).unwrap();
        let rotation = DQuat::from_rotation_z(0.5);
        let m = DMat4::from_scale_rotation_translation(DVec3::splat(2.0), rotation, DVec3::new(1.0, 2.0, 3.0));

        hierarchy.apply_world_transform(1, m).unwrap();
        let bone = hierarchy.bone(1).unwrap();

        assert_eq!(bone.world, m);
        assert!(bone.local.translation.abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), 1e-9));
        assert!(bone.local.scale.abs_diff_eq(DVec3::splat(2.0), 1e-9));
        assert!(bone.local.rotation.abs_diff_eq(rotation, 1e-9));

        // Parent is untouched
        assert_eq!(hierarchy.bone(0).unwrap().world, DMat4::IDENTITY);
    }

    #[test]
    fn test_apply_world_transform_out_of_range() {
        let mut hierarchy = SkeletonHierarchy::build(&definition(vec![-1])).unwrap();
        let err = hierarchy.apply_world_transform(1, DMat4::IDENTITY).unwrap_err();
        assert!(matches!(err, MarionetteError::BoneOutOfRange { index: 1, count: 1 }));
    }

    #[test]
    fn test_snapshot_matches_bones() {
        let mut hierarchy = SkeletonHierarchy::build(&definition(vec![-1, 0])).unwrap();
        hierarchy
            .apply_world_transform(0, DMat4::from_translation(DVec3::new(5.0, 0.0, 0.0)))
            .unwrap();

        let snapshot = hierarchy.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].position, DVec3::new(5.0, 0.0, 0.0));
        assert_eq!(snapshot[1].parent, Some(0));
        assert_eq!(snapshot[1].name, "bone1");
    }

    #[test]
    fn test_malformed_builds_nothing() {
        let err = SkeletonHierarchy::build(&definition(vec![-1, 1])).unwrap_err();
        assert!(matches!(
            err,
            MarionetteError::MalformedSkeleton(SkeletonFault::ForwardParent { bone: 1, parent: 1 })
        ));
    }

    /// Parent lists where every parent is -1 or below the bone's own index
    fn valid_parents() -> impl Strategy<Value = Vec<i64>> {
        (1usize..48).prop_flat_map(|n| {
            (0..n)
                .map(|i| (-1i64..i as i64).boxed())
                .collect::<Vec<_>>()
        })
    }

    proptest! {
        #[test]
        fn prop_valid_definitions_build(parents in valid_parents()) {
            let def = definition(parents.clone());
            let hierarchy = SkeletonHierarchy::build(&def).unwrap();

            prop_assert_eq!(hierarchy.bone_count(), parents.len());
            for (i, bone) in hierarchy.bones().iter().enumerate() {
                prop_assert_eq!(bone.index(), i);
                prop_assert_eq!(bone.parent_index(), parents[i]);
                prop_assert_eq!(bone.local.translation, DVec3::new(0.0, i as f64 * 10.0, 0.0));
                for &child in bone.children() {
                    prop_assert_eq!(hierarchy.bone(child).unwrap().parent(), Some(i));
                }
            }
            for &root in hierarchy.roots() {
                prop_assert_eq!(parents[root], -1);
            }
            let roots = parents.iter().filter(|&&p| p == -1).count();
            prop_assert_eq!(hierarchy.roots().len(), roots);
        }

        #[test]
        fn prop_forward_parents_rejected(parents in valid_parents(), bone in any::<prop::sample::Index>(), offset in 0i64..4) {
            let mut parents = parents;
            let bone = bone.index(parents.len());
            parents[bone] = bone as i64 + offset;

            let err = SkeletonHierarchy::build(&definition(parents)).unwrap_err();
            let is_malformed = matches!(err, MarionetteError::MalformedSkeleton(_));
            prop_assert!(is_malformed);
        }
    }
}
