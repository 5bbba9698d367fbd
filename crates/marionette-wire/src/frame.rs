//! Pose frame decoding
//!
//! Frame = N x (16 x f64 LE, row-major) + up to 127 unused trailing bytes

use bytes::Buf;
use glam::DMat4;

use marionette_core::MarionetteResult;
use marionette_skeleton::SkeletonHierarchy;

/// Values per bone matrix
pub const MATRIX_LEN: usize = 16;

/// Size of one value on the wire
pub const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Size of one bone matrix on the wire
pub const MATRIX_SIZE: usize = MATRIX_LEN * VALUE_SIZE;

/// Convert a row-major matrix into the column-major convention
///
/// Reading row-major values as columns yields the transpose, so one explicit
/// transpose restores the intended matrix.
#[inline]
pub fn row_major_to_column_major(values: &[f64; MATRIX_LEN]) -> DMat4 {
    DMat4::from_cols_array(values).transpose()
}

/// Convert a column-major matrix into row-major wire order
#[inline]
pub fn column_major_to_row_major(matrix: &DMat4) -> [f64; MATRIX_LEN] {
    matrix.transpose().to_cols_array()
}

/// Zero-copy view of a received frame
#[derive(Clone, Copy, Debug)]
pub struct PoseFrameView<'a> {
    buf: &'a [u8],
}

impl<'a> PoseFrameView<'a> {
    /// Wrap a buffer of any length; whole matrices are counted, the rest ignored
    pub fn new(buf: &'a [u8]) -> Self {
        PoseFrameView { buf }
    }

    /// Number of whole matrices in the buffer
    #[inline]
    pub fn matrix_count(&self) -> usize {
        (self.buf.len() / VALUE_SIZE) / MATRIX_LEN
    }

    /// Bytes past the last whole matrix
    #[inline]
    pub fn trailing_bytes(&self) -> usize {
        self.buf.len() - self.matrix_count() * MATRIX_SIZE
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.buf.len()
    }

    /// Raw row-major values of matrix `index`
    pub fn row_major(&self, index: usize) -> Option<[f64; MATRIX_LEN]> {
        if index >= self.matrix_count() {
            return None;
        }
        let mut chunk = &self.buf[index * MATRIX_SIZE..(index + 1) * MATRIX_SIZE];
        let mut values = [0.0f64; MATRIX_LEN];
        for v in values.iter_mut() {
            *v = chunk.get_f64_le();
        }
        Some(values)
    }

    /// Matrix `index`, already transposed to column-major
    pub fn matrix(&self, index: usize) -> Option<DMat4> {
        self.row_major(index).map(|values| row_major_to_column_major(&values))
    }

    /// Iterate over all whole matrices in column-major form
    pub fn matrices(&self) -> impl Iterator<Item = DMat4> + 'a {
        let view = *self;
        (0..view.matrix_count()).filter_map(move |i| view.matrix(i))
    }
}

/// What a decode did to the hierarchy
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodeOutcome {
    /// Whole matrices present in the frame
    pub available: usize,
    /// Bones in the target hierarchy
    pub bone_count: usize,
    /// Bones actually updated: `min(available, bone_count)`
    pub applied: usize,
    /// Unused bytes after the last whole matrix
    pub trailing_bytes: usize,
}

impl DecodeOutcome {
    /// Frame and hierarchy disagree on the bone count
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.available != self.bone_count
    }

    /// Nothing was applied
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.applied == 0
    }
}

/// Decode a pose frame into a hierarchy
///
/// Updates the first `min(available, bone_count)` bones in index order and
/// leaves the rest at their prior pose. Short frames, long frames and
/// trailing bytes are tolerated, not errors. The only failure is a bone
/// index rejected by the hierarchy, which cannot happen for in-range updates.
pub fn decode(buf: &[u8], hierarchy: &mut SkeletonHierarchy) -> MarionetteResult<DecodeOutcome> {
    let view = PoseFrameView::new(buf);
    let available = view.matrix_count();
    let bone_count = hierarchy.bone_count();
    let applied = available.min(bone_count);

    for (index, matrix) in view.matrices().take(applied).enumerate() {
        hierarchy.apply_world_transform(index, matrix)?;
    }

    Ok(DecodeOutcome {
        available,
        bone_count,
        applied,
        trailing_bytes: view.trailing_bytes(),
    })
}
