use thiserror::Error;

/// Errors produced by the linear algebra utilities.
#[derive(Debug, Error, PartialEq)]
pub enum LinalgError {
    /// Source and destination slices must have the same length.
    #[error("source ({src}) and destination ({dst}) slices must have the same length")]
    MismatchedSliceLengths {
        /// Length of the source slice.
        src: usize,
        /// Length of the destination slice.
        dst: usize,
    },

    /// A zero-magnitude vector cannot be normalized.
    #[error("cannot normalize a zero-magnitude vector")]
    ZeroVector,
}

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A rotation matrix mapping the source to the destination frame.
/// * `dst_t_src` - A translation vector in the destination frame.
/// * `dst_points` - A pre-allocated slice of the same length as `src_points`
///   receiving the transformed points.
///
/// Example:
///
/// ```no_run
/// use cylseg_3d::linalg::transform_points3d;
///
/// let src_points = vec![[2.0, 2.0, 2.0], [3.0, 4.0, 5.0]];
/// let rotation = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
/// let translation = [0.0, 0.0, 0.0];
/// let mut dst_points = vec![[0.0; 3]; src_points.len()];
/// transform_points3d(&src_points, &rotation, &translation, &mut dst_points).unwrap();
/// ```
pub fn transform_points3d(
    src_points: &[[f64; 3]],
    dst_r_src: &[[f64; 3]; 3],
    dst_t_src: &[f64; 3],
    dst_points: &mut [[f64; 3]],
) -> Result<(), LinalgError> {
    if src_points.len() != dst_points.len() {
        return Err(LinalgError::MismatchedSliceLengths {
            src: src_points.len(),
            dst: dst_points.len(),
        });
    }

    // create a view of the rotation matrix
    let dst_r_src_mat = {
        let dst_r_src_slice = unsafe {
            std::slice::from_raw_parts(dst_r_src.as_ptr() as *const f64, dst_r_src.len() * 3)
        };
        faer::mat::from_row_major_slice(dst_r_src_slice, 3, 3)
    };

    // create a view of the source points
    let points_in_src = {
        let src_points_slice = unsafe {
            std::slice::from_raw_parts(src_points.as_ptr() as *const f64, src_points.len() * 3)
        };
        // SAFETY: src_points_slice is an Nx3 matrix where each row is a 3D point
        faer::mat::from_row_major_slice(src_points_slice, src_points.len(), 3)
    };

    // create a mutable view of the destination points
    let mut points_in_dst = {
        let dst_points_slice = unsafe {
            std::slice::from_raw_parts_mut(
                dst_points.as_mut_ptr() as *mut f64,
                dst_points.len() * 3,
            )
        };
        // SAFETY: dst_points_slice is a 3xN matrix where each column is a 3D point
        faer::mat::from_column_major_slice_mut(dst_points_slice, 3, dst_points.len())
    };

    // rotate all points with a single matrix multiplication
    faer::linalg::matmul::matmul(
        &mut points_in_dst,
        dst_r_src_mat,
        points_in_src.transpose(),
        None,
        1.0,
        faer::Parallelism::None,
    );

    let [tx, ty, tz] = *dst_t_src;
    for mut col in points_in_dst.col_iter_mut() {
        col.write(0, col.read(0) + tx);
        col.write(1, col.read(1) + ty);
        col.write(2, col.read(2) + tz);
    }

    Ok(())
}

/// Apply a 4x4 homogeneous transform to a 3D point.
///
/// The point is promoted to `(x, y, z, 1)`, so both the rotation and the
/// translation parts of the transform act on it.
pub fn transform_point_homogeneous(dst_t_src: &[[f64; 4]; 4], point: &[f64; 3]) -> [f64; 3] {
    let [x, y, z] = *point;
    [
        dst_t_src[0][0] * x + dst_t_src[0][1] * y + dst_t_src[0][2] * z + dst_t_src[0][3],
        dst_t_src[1][0] * x + dst_t_src[1][1] * y + dst_t_src[1][2] * z + dst_t_src[1][3],
        dst_t_src[2][0] * x + dst_t_src[2][1] * y + dst_t_src[2][2] * z + dst_t_src[2][3],
    ]
}

/// Apply a 4x4 homogeneous transform to a 3D direction.
///
/// The direction is promoted to `(x, y, z, 0)`, so only the rotation part
/// of the transform acts on it.
pub fn transform_direction_homogeneous(dst_t_src: &[[f64; 4]; 4], direction: &[f64; 3]) -> [f64; 3] {
    let [x, y, z] = *direction;
    [
        dst_t_src[0][0] * x + dst_t_src[0][1] * y + dst_t_src[0][2] * z,
        dst_t_src[1][0] * x + dst_t_src[1][1] * y + dst_t_src[1][2] * z,
        dst_t_src[2][0] * x + dst_t_src[2][1] * y + dst_t_src[2][2] * z,
    ]
}

/// Dot product of two 3D vectors.
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3D vectors.
pub fn cross_product3(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean norm of a 3D vector.
pub fn norm3(a: &[f64; 3]) -> f64 {
    dot_product3(a, a).sqrt()
}

/// Normalize a 3D vector to unit length.
pub fn normalize3(a: &[f64; 3]) -> Result<[f64; 3], LinalgError> {
    let norm = norm3(a);
    if norm < 1e-10 {
        return Err(LinalgError::ZeroVector);
    }
    Ok([a[0] / norm, a[1] / norm, a[2] / norm])
}

/// Eigendecomposition of a symmetric 3x3 matrix given by its upper
/// triangle `[a11, a12, a13, a22, a23, a33]`.
///
/// Returns the eigenvalues in descending order together with the matching
/// unit eigenvectors. Closed-form solution of the characteristic
/// polynomial; eigenvectors come from the largest cross product of rows
/// of `A - lambda * I`.
pub fn sym_eigen3(upper: &[f64; 6]) -> ([f64; 3], [[f64; 3]; 3]) {
    let [a11, a12, a13, a22, a23, a33] = *upper;

    let q = (a11 + a22 + a33) / 3.0;
    let p1 = a12 * a12 + a13 * a13 + a23 * a23;

    let eigenvalues = if p1 < 1e-30 {
        // already diagonal
        let mut evs = [a11, a22, a33];
        evs.sort_unstable_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        evs
    } else {
        let p2 = (a11 - q) * (a11 - q) + (a22 - q) * (a22 - q) + (a33 - q) * (a33 - q) + 2.0 * p1;
        let p = (p2 / 6.0).sqrt();
        let inv_p = 1.0 / p;

        let b11 = (a11 - q) * inv_p;
        let b12 = a12 * inv_p;
        let b13 = a13 * inv_p;
        let b22 = (a22 - q) * inv_p;
        let b23 = a23 * inv_p;
        let b33 = (a33 - q) * inv_p;

        let half_det = (b11 * b22 * b33 + 2.0 * b12 * b13 * b23
            - b11 * b23 * b23
            - b22 * b13 * b13
            - b33 * b12 * b12)
            / 2.0;

        let phi = half_det.clamp(-1.0, 1.0).acos() / 3.0;

        let e1 = q + 2.0 * p * phi.cos();
        let e3 = q + 2.0 * p * (phi + std::f64::consts::TAU / 3.0).cos();
        let e2 = 3.0 * q - e1 - e3;
        [e1, e2, e3]
    };

    let eigenvectors = [
        eigenvector_at(upper, eigenvalues[0]),
        eigenvector_at(upper, eigenvalues[1]),
        eigenvector_at(upper, eigenvalues[2]),
    ];

    (eigenvalues, eigenvectors)
}

/// Unit eigenvector of a symmetric 3x3 matrix at a given eigenvalue.
fn eigenvector_at(upper: &[f64; 6], lambda: f64) -> [f64; 3] {
    let m00 = upper[0] - lambda;
    let m01 = upper[1];
    let m02 = upper[2];
    let m11 = upper[3] - lambda;
    let m12 = upper[4];
    let m22 = upper[5] - lambda;

    // candidate eigenvectors: cross products of pairs of rows of A - lambda I
    let v0 = [
        m01 * m12 - m02 * m11,
        m02 * m01 - m00 * m12,
        m00 * m11 - m01 * m01,
    ];
    let v1 = [
        m01 * m22 - m02 * m12,
        m02 * m02 - m00 * m22,
        m00 * m12 - m01 * m02,
    ];
    let v2 = [
        m11 * m22 - m12 * m12,
        m12 * m02 - m01 * m22,
        m01 * m12 - m11 * m02,
    ];

    let mag0 = dot_product3(&v0, &v0);
    let mag1 = dot_product3(&v1, &v1);
    let mag2 = dot_product3(&v2, &v2);

    let (v, mag) = if mag0 >= mag1 && mag0 >= mag2 {
        (v0, mag0)
    } else if mag1 >= mag2 {
        (v1, mag1)
    } else {
        (v2, mag2)
    };

    if mag < 1e-30 {
        // repeated eigenvalue, any basis vector works
        return [0.0, 0.0, 1.0];
    }

    let inv = 1.0 / mag.sqrt();
    [v[0] * inv, v[1] * inv, v[2] * inv]
}
