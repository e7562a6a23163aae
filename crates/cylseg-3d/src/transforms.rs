use crate::linalg::{normalize3, LinalgError};

/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation; any non-zero magnitude.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```no_run
/// use cylseg_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = [1.0, 0.0, 0.0];
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(&axis, angle).unwrap();
/// assert_eq!(rotation, [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]]);
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], LinalgError> {
    let [x, y, z] = normalize3(axis)?;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    let m00 = c + x * x * t;
    let m11 = c + y * y * t;
    let m22 = c + z * z * t;

    let tmp1 = x * y * t;
    let tmp2 = z * s;

    let m10 = tmp1 + tmp2;
    let m01 = tmp1 - tmp2;

    let tmp3 = x * z * t;
    let tmp4 = y * s;

    let m20 = tmp3 - tmp4;
    let m02 = tmp3 + tmp4;

    let tmp5 = y * z * t;
    let tmp6 = x * s;

    let m12 = tmp5 - tmp6;
    let m21 = tmp5 + tmp6;

    Ok([[m00, m01, m02], [m10, m11, m12], [m20, m21, m22]])
}

/// Build a 4x4 homogeneous transform from a rotation matrix and a
/// translation vector.
pub fn homogeneous_from_parts(
    rotation: &[[f64; 3]; 3],
    translation: &[f64; 3],
) -> [[f64; 4]; 4] {
    let mut t = [[0.0; 4]; 4];
    for (row, rot_row) in t.iter_mut().zip(rotation.iter()) {
        row[..3].copy_from_slice(rot_row);
    }
    t[0][3] = translation[0];
    t[1][3] = translation[1];
    t[2][3] = translation[2];
    t[3][3] = 1.0;
    t
}
