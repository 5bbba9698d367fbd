//! Skeletons and frames shared by tests and benchmarks

use bytes::Bytes;
use glam::{DMat4, DQuat, DVec3};

use marionette_skeleton::{BindPose, SkeletonDefinition, NO_PARENT};
use marionette_wire::{encode_frame, FrameBuilder};

const IDENTITY_ROTATION: [f64; 4] = [0.0, 0.0, 0.0, 1.0];
const UNIT_SCALE: [f64; 3] = [1.0, 1.0, 1.0];

/// Build a definition from (name, parent, local offset) triples
pub fn definition_from(bones: &[(&str, i64, [f64; 3])]) -> SkeletonDefinition {
    SkeletonDefinition {
        bone_names: bones.iter().map(|(name, _, _)| name.to_string()).collect(),
        parents: bones.iter().map(|(_, parent, _)| *parent).collect(),
        bind_pose: BindPose {
            positions: bones.iter().map(|(_, _, offset)| *offset).collect(),
            rotations: vec![IDENTITY_ROTATION; bones.len()],
            scales: vec![UNIT_SCALE; bones.len()],
        },
    }
}

/// `root` with a single `child` one unit above it
pub fn two_bone_definition() -> SkeletonDefinition {
    definition_from(&[("root", NO_PARENT, [0.0, 0.0, 0.0]), ("child", 0, [0.0, 1.0, 0.0])])
}

/// Linear chain `bone0 <- bone1 <- ...`, one unit apart along +Y
pub fn chain_definition(count: usize) -> SkeletonDefinition {
    let names: Vec<String> = (0..count).map(|i| format!("bone{i}")).collect();
    SkeletonDefinition {
        parents: (0..count as i64).map(|i| i - 1).collect(),
        bind_pose: BindPose {
            positions: (0..count)
                .map(|i| if i == 0 { [0.0; 3] } else { [0.0, 1.0, 0.0] })
                .collect(),
            rotations: vec![IDENTITY_ROTATION; count],
            scales: vec![UNIT_SCALE; count],
        },
        bone_names: names,
    }
}

/// BVH-style humanoid rig (25 bones)
pub fn humanoid_definition() -> SkeletonDefinition {
    definition_from(&[
        ("Hips", NO_PARENT, [0.0, 0.95, 0.0]),
        ("Spine", 0, [0.0, 0.1, 0.0]),
        ("Spine1", 1, [0.0, 0.15, 0.0]),
        ("Spine2", 2, [0.0, 0.15, 0.0]),
        ("Neck", 3, [0.0, 0.15, 0.0]),
        ("Head", 4, [0.0, 0.1, 0.0]),
        ("LeftShoulder", 3, [0.05, 0.1, 0.0]),
        ("LeftArm", 6, [0.12, 0.0, 0.0]),
        ("LeftForeArm", 7, [0.28, 0.0, 0.0]),
        ("LeftHand", 8, [0.25, 0.0, 0.0]),
        ("RightShoulder", 3, [-0.05, 0.1, 0.0]),
        ("RightArm", 10, [-0.12, 0.0, 0.0]),
        ("RightForeArm", 11, [-0.28, 0.0, 0.0]),
        ("RightHand", 12, [-0.25, 0.0, 0.0]),
        ("LeftUpLeg", 0, [0.1, -0.05, 0.0]),
        ("LeftLeg", 14, [0.0, -0.42, 0.0]),
        ("LeftFoot", 15, [0.0, -0.42, 0.0]),
        ("LeftToeBase", 16, [0.0, -0.05, 0.12]),
        ("RightUpLeg", 0, [-0.1, -0.05, 0.0]),
        ("RightLeg", 18, [0.0, -0.42, 0.0]),
        ("RightFoot", 19, [0.0, -0.42, 0.0]),
        ("RightToeBase", 20, [0.0, -0.05, 0.12]),
        ("LeftHandThumb", 9, [0.03, 0.0, 0.03]),
        ("RightHandThumb", 13, [-0.03, 0.0, 0.03]),
        ("HeadTop", 5, [0.0, 0.15, 0.0]),
    ])
}

/// Frame of `bones` identity matrices
pub fn identity_frame(bones: usize) -> Bytes {
    FrameBuilder::with_capacity(bones).identity(bones).build()
}

/// Frame placing each bone at the given world position
pub fn translation_frame(positions: &[DVec3]) -> Bytes {
    let matrices: Vec<DMat4> = positions.iter().map(|p| DMat4::from_translation(*p)).collect();
    encode_frame(&matrices)
}

/// Animated frame: every bone turns about +Y by `phase` radians and sits
/// `index` units above the origin
pub fn animated_frame(bones: usize, phase: f64) -> Bytes {
    let matrices: Vec<DMat4> = (0..bones)
        .map(|i| {
            DMat4::from_scale_rotation_translation(
                DVec3::ONE,
                DQuat::from_rotation_y(phase + i as f64 * 0.1),
                DVec3::new(0.0, i as f64, 0.0),
            )
        })
        .collect();
    encode_frame(&matrices)
}
