use rayon::prelude::*;
use thiserror::Error;

use crate::extract::extract_indices;
use crate::model::CylinderModel;
use crate::normals::estimate_normals;
use crate::sac::{segment_cylinder, SacError, SacParams};
use cylseg_3d::linalg::{transform_direction_homogeneous, transform_point_homogeneous};
use cylseg_3d::pointcloud::PointCloud;

/// Transformed axes with a smaller y component than this never cross the
/// target frame's y = 0 plane; the projection is singular.
const SINGULAR_AXIS_EPS: f64 = 1e-9;

/// Tolerance on the bottom row of the frame transform and on the
/// determinant of its rotation block.
const TRANSFORM_EPS: f64 = 1e-12;

/// Configuration of the detection pipeline, supplied once per call.
#[derive(Debug, Clone)]
pub struct DetectionParams {
    /// Neighborhood radius of the surface normal estimation.
    pub normal_radius_search: f64,
    /// Blend factor in `[0, 1]` between normal deviation and surface
    /// distance in the cylinder fit.
    pub normal_distance_weight: f64,
    /// Largest acceptable cylinder radius.
    pub cylinder_max_radius: f64,
    /// Smallest accepted inlier cloud.
    pub min_cylinder_size: usize,
    /// Fixed seed for reproducible fits; per-cluster seeds derive from
    /// it. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// An accepted cylinder detection.
#[derive(Debug, Clone)]
pub struct CylinderDetection {
    /// Fitted cylinder coefficients, in the cluster frame.
    pub model: CylinderModel,
    /// The inlier points supporting the fit, in the cluster frame.
    pub cloud: PointCloud,
    /// Crossing of the transformed axis line with the target frame's
    /// y = 0 plane, expressed in the frame's (x, z) plane.
    pub pose: [f64; 2],
}

/// Errors of the detection entry point.
#[derive(Debug, Error, PartialEq)]
pub enum DetectError {
    /// A parameter that must be positive was not.
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The frame transform must be affine.
    #[error("frame transform is not affine: bottom row is {0:?}, expected [0, 0, 0, 1]")]
    NonAffineTransform([f64; 4]),

    /// The rotation block of the frame transform must be invertible.
    #[error("frame transform is singular: rotation block determinant is {0}")]
    SingularTransform(f64),

    /// Internal segmentation failure.
    #[error(transparent)]
    Sac(#[from] SacError),
}

/// Fit a cylinder to every cluster and keep the detections that pass the
/// acceptance filter.
///
/// Clusters are processed independently (in parallel, each with its own
/// normal and inlier buffers) and the accepted detections keep the
/// relative order of their clusters. A cluster yields at most one
/// detection; clusters with no cylindrical component, with too few
/// supporting points, or whose transformed axis cannot cross the target
/// ground plane are skipped.
///
/// # Arguments
///
/// * `clusters` - Pre-segmented point clusters, one candidate object each.
/// * `target_t_cluster` - Homogeneous transform from the cluster frame to
///   the target frame, applied identically to every detection.
/// * `params` - Detection parameters.
///
/// # Errors
///
/// Fails atomically on malformed configuration or a malformed frame
/// transform. Per-cluster anomalies never escalate: for well-formed
/// input the call always returns a (possibly empty) list.
pub fn detect_cylinders(
    clusters: &[PointCloud],
    target_t_cluster: &[[f64; 4]; 4],
    params: &DetectionParams,
) -> Result<Vec<CylinderDetection>, DetectError> {
    validate_params(params)?;
    validate_transform(target_t_cluster)?;

    let candidates = clusters
        .par_iter()
        .enumerate()
        .map(|(idx, cluster)| detect_in_cluster(idx, cluster, target_t_cluster, params))
        .collect::<Result<Vec<_>, DetectError>>()?;

    Ok(candidates.into_iter().flatten().collect())
}

/// Transform a cylinder axis into the target frame and project it to the
/// point where the axis line crosses the frame's y = 0 plane, expressed
/// in the frame's (x, z) plane.
///
/// Returns `None` when the transformed axis is (near) parallel to the
/// plane and the crossing is undefined.
pub fn project_axis_crossing(
    target_t_cluster: &[[f64; 4]; 4],
    point_on_axis: &[f64; 3],
    axis: &[f64; 3],
) -> Option<[f64; 2]> {
    let p = transform_point_homogeneous(target_t_cluster, point_on_axis);
    let a = transform_direction_homogeneous(target_t_cluster, axis);
    if a[1].abs() <= SINGULAR_AXIS_EPS {
        return None;
    }
    Some([
        p[0] - p[1] * (a[0] / a[1]),
        p[2] - p[1] * (a[2] / a[1]),
    ])
}

fn detect_in_cluster(
    idx: usize,
    cluster: &PointCloud,
    target_t_cluster: &[[f64; 4]; 4],
    params: &DetectionParams,
) -> Result<Option<CylinderDetection>, DetectError> {
    let normals = estimate_normals(cluster.points(), params.normal_radius_search);

    let sac_params = SacParams {
        normal_distance_weight: params.normal_distance_weight,
        radius_limits: (0.0, params.cylinder_max_radius),
        seed: params.seed.map(|seed| seed.wrapping_add(idx as u64)),
        ..SacParams::default()
    };
    let fit = segment_cylinder(cluster.points(), &normals, &sac_params)?;

    let cloud = extract_indices(cluster, &fit.inliers);
    if cloud.is_empty() {
        log::debug!("cluster {idx}: no cylindrical component found");
        return Ok(None);
    }
    if cloud.len() < params.min_cylinder_size {
        log::debug!(
            "cluster {idx}: cylinder with {} points is below the minimum size {}",
            cloud.len(),
            params.min_cylinder_size
        );
        return Ok(None);
    }

    let Some(pose) =
        project_axis_crossing(target_t_cluster, &fit.model.point_on_axis, &fit.model.axis)
    else {
        log::warn!(
            "cluster {idx}: transformed cylinder axis is parallel to the target ground plane, \
             dropping detection"
        );
        return Ok(None);
    };

    Ok(Some(CylinderDetection {
        model: fit.model,
        cloud,
        pose,
    }))
}

fn validate_params(params: &DetectionParams) -> Result<(), DetectError> {
    if !(params.normal_radius_search > 0.0) {
        return Err(DetectError::NonPositiveParameter {
            name: "normal_radius_search",
            value: params.normal_radius_search,
        });
    }
    if !(params.cylinder_max_radius > 0.0) {
        return Err(DetectError::NonPositiveParameter {
            name: "cylinder_max_radius",
            value: params.cylinder_max_radius,
        });
    }
    if params.min_cylinder_size == 0 {
        return Err(DetectError::NonPositiveParameter {
            name: "min_cylinder_size",
            value: 0.0,
        });
    }
    Ok(())
}

fn validate_transform(t: &[[f64; 4]; 4]) -> Result<(), DetectError> {
    let bottom = t[3];
    if bottom[0].abs() > TRANSFORM_EPS
        || bottom[1].abs() > TRANSFORM_EPS
        || bottom[2].abs() > TRANSFORM_EPS
        || (bottom[3] - 1.0).abs() > TRANSFORM_EPS
    {
        return Err(DetectError::NonAffineTransform(bottom));
    }

    // triple product of the rotation block rows
    let det = t[0][0] * (t[1][1] * t[2][2] - t[1][2] * t[2][1])
        - t[0][1] * (t[1][0] * t[2][2] - t[1][2] * t[2][0])
        + t[0][2] * (t[1][0] * t[2][1] - t[1][1] * t[2][0]);
    if det.abs() < TRANSFORM_EPS {
        return Err(DetectError::SingularTransform(det));
    }

    Ok(())
}
