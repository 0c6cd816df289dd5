//! Conversion between the vision camera frame and the renderer's view matrix.
//!
//! The vision frame has X right, Y down and Z pointing into the scene. The
//! renderer is right-handed with Y up and the camera looking down -Z, so Y and
//! Z flip. The renderer reads matrices column-major, so the row-structured
//! `[R | t; 0 0 0 1]` is handed over transposed.

use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Per-row sign mask applied to `[R | t; 0 0 0 1]`.
pub const VISION_TO_GL_SIGNS: [f64; 4] = [1.0, -1.0, -1.0, 1.0];

/// Model-view matrix in the renderer's convention.
///
/// Internally this is the logical (row-structured) matrix after the sign
/// mask. Serialises as the 16 column-major values the renderer consumes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 16]", into = "[f64; 16]")]
pub struct ViewMatrix {
    m: Matrix4<f64>,
}

impl ViewMatrix {
    pub fn from_matrix(m: Matrix4<f64>) -> Self {
        Self { m }
    }

    /// Rebuild from the 16 values a renderer would receive.
    pub fn from_column_major(values: [f64; 16]) -> Self {
        Self {
            m: Matrix4::from_column_slice(&values),
        }
    }

    /// The transposed matrix flattened row by row, i.e. the logical matrix in
    /// column-major order. This is the layout `glLoadMatrixd` expects.
    pub fn to_column_major(&self) -> [f64; 16] {
        let mut out = [0.0; 16];
        out.copy_from_slice(self.m.as_slice());
        out
    }

    /// Rows of the transposed matrix.
    pub fn transposed_rows(&self) -> [[f64; 4]; 4] {
        let t = self.m.transpose();
        std::array::from_fn(|r| std::array::from_fn(|c| t[(r, c)]))
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.m
    }

    pub fn bottom_row(&self) -> [f64; 4] {
        std::array::from_fn(|c| self.m[(3, c)])
    }
}

impl From<[f64; 16]> for ViewMatrix {
    fn from(values: [f64; 16]) -> Self {
        Self::from_column_major(values)
    }
}

impl From<ViewMatrix> for [f64; 16] {
    fn from(v: ViewMatrix) -> Self {
        v.to_column_major()
    }
}

/// Build the renderer view matrix from a vision-frame pose.
///
/// Assembles `[R | t; 0 0 0 1]`, multiplies each row by
/// [`VISION_TO_GL_SIGNS`] and stores the result for column-major hand-off.
pub fn vision_to_view_matrix(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> ViewMatrix {
    let mut m = Matrix4::<f64>::identity();
    m.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
    for (r, sign) in VISION_TO_GL_SIGNS.iter().enumerate() {
        m.row_mut(r).scale_mut(*sign);
    }
    ViewMatrix::from_matrix(m)
}

/// Exact inverse of [`vision_to_view_matrix`].
pub fn view_matrix_to_vision(view: &ViewMatrix) -> (Matrix3<f64>, Vector3<f64>) {
    let mut m = *view.matrix();
    for (r, sign) in VISION_TO_GL_SIGNS.iter().enumerate() {
        m.row_mut(r).scale_mut(*sign);
    }
    let rotation: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
    let translation: Vector3<f64> = m.fixed_view::<3, 1>(0, 3).into_owned();
    (rotation, translation)
}
