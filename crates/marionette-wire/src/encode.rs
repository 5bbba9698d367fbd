//! Pose frame encoding
//!
//! The client only ever decodes; the encoder exists for simulators, test
//! servers and benchmarks that need byte-exact frames.

use bytes::{BufMut, Bytes, BytesMut};
use glam::DMat4;

use marionette_skeleton::SkeletonHierarchy;

use crate::{column_major_to_row_major, MATRIX_SIZE};

/// Frame builder for convenient construction
#[derive(Debug, Default)]
pub struct FrameBuilder {
    buf: BytesMut,
}

impl FrameBuilder {
    pub fn new() -> Self {
        FrameBuilder {
            buf: BytesMut::new(),
        }
    }

    pub fn with_capacity(bones: usize) -> Self {
        FrameBuilder {
            buf: BytesMut::with_capacity(bones * MATRIX_SIZE),
        }
    }

    /// Append one column-major matrix, written row-major
    pub fn matrix(mut self, matrix: DMat4) -> Self {
        put_matrix(&mut self.buf, &matrix);
        self
    }

    /// Append `count` identity matrices
    pub fn identity(mut self, count: usize) -> Self {
        for _ in 0..count {
            put_matrix(&mut self.buf, &DMat4::IDENTITY);
        }
        self
    }

    /// Append raw row-major values as they would arrive on the wire
    pub fn raw(mut self, values: &[f64]) -> Self {
        for &v in values {
            self.buf.put_f64_le(v);
        }
        self
    }

    /// Number of whole matrices written so far
    pub fn matrix_count(&self) -> usize {
        self.buf.len() / MATRIX_SIZE
    }

    pub fn build(self) -> Bytes {
        self.buf.freeze()
    }
}

fn put_matrix(buf: &mut BytesMut, matrix: &DMat4) {
    buf.reserve(MATRIX_SIZE);
    for v in column_major_to_row_major(matrix) {
        buf.put_f64_le(v);
    }
}

/// Encode a list of world matrices as one frame
pub fn encode_frame(matrices: &[DMat4]) -> Bytes {
    matrices
        .iter()
        .fold(FrameBuilder::with_capacity(matrices.len()), |b, m| b.matrix(*m))
        .build()
}

/// Encode the current world pose of a hierarchy
pub fn encode_hierarchy(hierarchy: &SkeletonHierarchy) -> Bytes {
    hierarchy
        .bones()
        .iter()
        .fold(FrameBuilder::with_capacity(hierarchy.bone_count()), |b, bone| b.matrix(bone.world))
        .build()
}
