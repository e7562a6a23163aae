use cylseg_3d::linalg::{cross_product3, dot_product3, norm3, normalize3};

/// Two sampled normals closer than this to parallel give no usable axis.
const PARALLEL_NORMALS_EPS: f64 = 1e-8;

/// Coefficients of an infinite cylinder: a point on the axis, the axis
/// direction, and the radius.
///
/// Models produced by the fitter keep `axis` unit length. The all-zero
/// default stands for "no cylinder found" and must not be interpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CylinderModel {
    /// A point on the cylinder axis.
    pub point_on_axis: [f64; 3],
    /// Direction of the cylinder axis; unit length for fitted models.
    pub axis: [f64; 3],
    /// Cylinder radius.
    pub radius: f64,
}

impl CylinderModel {
    /// Distance from a point to the cylinder axis line.
    ///
    /// PRECONDITION: `axis` is unit length.
    pub fn distance_to_axis(&self, point: &[f64; 3]) -> f64 {
        let delta = [
            point[0] - self.point_on_axis[0],
            point[1] - self.point_on_axis[1],
            point[2] - self.point_on_axis[2],
        ];
        norm3(&cross_product3(&delta, &self.axis))
    }

    /// Unsigned distance from a point to the cylinder surface.
    pub fn distance_to_surface(&self, point: &[f64; 3]) -> f64 {
        (self.distance_to_axis(point) - self.radius).abs()
    }

    /// Angle in `[0, pi/2]` between a point's surface normal and the
    /// radial direction the model predicts at that point.
    ///
    /// Sign-insensitive: an inward-facing normal scores the same as an
    /// outward-facing one. A point on the axis has no radial direction
    /// and scores the worst case.
    ///
    /// PRECONDITION: `normal` and `axis` are unit length.
    pub fn normal_deviation(&self, point: &[f64; 3], normal: &[f64; 3]) -> f64 {
        let delta = [
            point[0] - self.point_on_axis[0],
            point[1] - self.point_on_axis[1],
            point[2] - self.point_on_axis[2],
        ];
        let height = dot_product3(&delta, &self.axis);
        let radial = [
            delta[0] - height * self.axis[0],
            delta[1] - height * self.axis[1],
            delta[2] - height * self.axis[2],
        ];
        match normalize3(&radial) {
            Ok(radial) => dot_product3(&radial, normal).abs().min(1.0).acos(),
            Err(_) => std::f64::consts::FRAC_PI_2,
        }
    }

    /// Hypothesize a cylinder from two surface points and their normals.
    ///
    /// On a cylinder surface every normal line crosses the axis, so the
    /// axis runs along `n1 x n2` through the closest points of the two
    /// normal lines; the radius is the distance of `p1` to that axis.
    ///
    /// Returns `None` when the normals are near parallel and the
    /// construction degenerates.
    pub fn from_point_normal_pair(
        p1: &[f64; 3],
        n1: &[f64; 3],
        p2: &[f64; 3],
        n2: &[f64; 3],
    ) -> Option<Self> {
        // closest points of the lines p1 + s*n1 and p2 + t*n2
        let w = [p1[0] - p2[0], p1[1] - p2[1], p1[2] - p2[2]];
        let a = dot_product3(n1, n1);
        let b = dot_product3(n1, n2);
        let c = dot_product3(n2, n2);
        let d = dot_product3(n1, &w);
        let e = dot_product3(n2, &w);
        let denominator = a * c - b * b;
        if denominator.abs() < PARALLEL_NORMALS_EPS {
            return None;
        }
        let s = (b * e - c * d) / denominator;
        let t = (a * e - b * d) / denominator;

        let q1 = [p1[0] + s * n1[0], p1[1] + s * n1[1], p1[2] + s * n1[2]];
        let q2 = [p2[0] + t * n2[0], p2[1] + t * n2[1], p2[2] + t * n2[2]];

        let axis = normalize3(&cross_product3(n1, n2)).ok()?;
        let mut model = Self {
            point_on_axis: [
                (q1[0] + q2[0]) / 2.0,
                (q1[1] + q2[1]) / 2.0,
                (q1[2] + q2[2]) / 2.0,
            ],
            axis,
            radius: 0.0,
        };
        model.radius = model.distance_to_axis(p1);
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_z_cylinder(radius: f64) -> CylinderModel {
        CylinderModel {
            point_on_axis: [0.0, 0.0, 0.0],
            axis: [0.0, 0.0, 1.0],
            radius,
        }
    }

    #[test]
    fn test_distance_to_surface() {
        let model = unit_z_cylinder(0.5);
        assert_relative_eq!(model.distance_to_surface(&[0.5, 0.0, 3.0]), 0.0);
        assert_relative_eq!(model.distance_to_surface(&[1.0, 0.0, -2.0]), 0.5);
        assert_relative_eq!(model.distance_to_surface(&[0.0, 0.0, 1.0]), 0.5);
    }

    #[test]
    fn test_normal_deviation() {
        let model = unit_z_cylinder(0.5);

        // radial normal, outward and inward
        assert_relative_eq!(
            model.normal_deviation(&[0.5, 0.0, 1.0], &[1.0, 0.0, 0.0]),
            0.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            model.normal_deviation(&[0.5, 0.0, 1.0], &[-1.0, 0.0, 0.0]),
            0.0,
            epsilon = 1e-12
        );

        // axial normal is maximally wrong
        assert_relative_eq!(
            model.normal_deviation(&[0.5, 0.0, 1.0], &[0.0, 0.0, 1.0]),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );

        // a point on the axis has no radial direction
        assert_relative_eq!(
            model.normal_deviation(&[0.0, 0.0, 2.0], &[1.0, 0.0, 0.0]),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_from_point_normal_pair_exact() {
        // two points on a radius 0.5 cylinder around the z axis
        let model = CylinderModel::from_point_normal_pair(
            &[0.5, 0.0, 0.0],
            &[1.0, 0.0, 0.0],
            &[0.0, 0.5, 1.0],
            &[0.0, 1.0, 0.0],
        )
        .unwrap();

        assert_relative_eq!(model.radius, 0.5, epsilon = 1e-12);
        assert_relative_eq!(model.axis[2].abs(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(model.point_on_axis[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(model.point_on_axis[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_from_point_normal_pair_parallel() {
        let hypothesis = CylinderModel::from_point_normal_pair(
            &[0.0, 0.0, 0.0],
            &[0.0, 0.0, 1.0],
            &[1.0, 0.0, 0.0],
            &[0.0, 0.0, -1.0],
        );
        assert!(hypothesis.is_none());
    }
}
