//! Translation / rotation / scale transforms
//!
//! Matrices are column-major `DMat4` (the renderer convention). Conversion
//! from the row-major wire layout happens in the wire crate, never here.

use glam::{DMat3, DMat4, DQuat, DVec3};

/// Determinant magnitude under which a basis is treated as degenerate
const DEGENERATE_EPSILON: f64 = 1e-12;

/// Decomposed affine transform
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trs {
    pub translation: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
}

impl Default for Trs {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Trs {
    pub const IDENTITY: Trs = Trs {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
        scale: DVec3::ONE,
    };

    pub fn new(translation: DVec3, rotation: DQuat, scale: DVec3) -> Self {
        Trs {
            translation,
            rotation,
            scale,
        }
    }

    /// Build from the bind-pose array layout (quaternion as x, y, z, w)
    pub fn from_arrays(position: [f64; 3], rotation: [f64; 4], scale: [f64; 3]) -> Self {
        Trs {
            translation: DVec3::from_array(position),
            rotation: DQuat::from_array(rotation),
            scale: DVec3::from_array(scale),
        }
    }

    /// Compose into a column-major matrix
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Decompose an affine matrix
    ///
    /// Translation is the fourth column. Scale is the length of each basis
    /// column, with x negated when the basis is mirrored. Rotation is taken
    /// from the basis once the scale is divided out. A degenerate basis
    /// (zero scale on some axis) yields an identity rotation.
    pub fn from_matrix(m: &DMat4) -> Self {
        let translation = m.w_axis.truncate();

        let basis = DMat3::from_mat4(*m);
        let det = basis.determinant();
        let mut scale = DVec3::new(
            basis.x_axis.length(),
            basis.y_axis.length(),
            basis.z_axis.length(),
        );
        if det < 0.0 {
            scale.x = -scale.x;
        }

        if det.abs() < DEGENERATE_EPSILON || !det.is_finite() {
            return Trs {
                translation,
                rotation: DQuat::IDENTITY,
                scale,
            };
        }

        let rotation = DQuat::from_mat3(&DMat3::from_cols(
            basis.x_axis / scale.x,
            basis.y_axis / scale.y,
            basis.z_axis / scale.z,
        ))
        .normalize();

        Trs {
            translation,
            rotation,
            scale,
        }
    }

    /// Component-wise comparison within `epsilon`
    ///
    /// Quaternions `q` and `-q` describe the same rotation and compare equal.
    pub fn abs_diff_eq(&self, other: &Trs, epsilon: f64) -> bool {
        let same_rotation = self.rotation.abs_diff_eq(other.rotation, epsilon)
            || self.rotation.abs_diff_eq(-other.rotation, epsilon);
        self.translation.abs_diff_eq(other.translation, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            && same_rotation
    }
}
