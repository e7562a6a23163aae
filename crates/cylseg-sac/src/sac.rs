use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::model::CylinderModel;
use crate::normals::DEGENERATE_NORMAL;
use cylseg_3d::linalg::{cross_product3, dot_product3, normalize3, sym_eigen3};

/// Errors produced by the segmentation entry points.
#[derive(Debug, Error, PartialEq)]
pub enum SacError {
    /// The cloud and its normals must pair up index-wise.
    #[error("points ({points}) and normals ({normals}) must have the same length")]
    MismatchedLengths {
        /// Number of points.
        points: usize,
        /// Number of normals.
        normals: usize,
    },
}

/// Parameters of the sample consensus cylinder search.
#[derive(Debug, Clone)]
pub struct SacParams {
    /// Blend factor in `[0, 1]` between the angular normal deviation and
    /// the Euclidean surface distance in the inlier test.
    pub normal_distance_weight: f64,
    /// Number of hypotheses to evaluate. The search always runs the full
    /// budget.
    pub max_iterations: usize,
    /// Inlier threshold on the blended distance.
    pub distance_threshold: f64,
    /// Acceptable `(min, max)` cylinder radius; hypotheses outside the
    /// range are discarded.
    pub radius_limits: (f64, f64),
    /// Reference axis prior. The zero vector disables the prior.
    pub axis: [f64; 3],
    /// Maximum angle in radians between a hypothesis axis and the prior.
    /// Non-positive values disable the prior.
    pub eps_angle: f64,
    /// Fixed seed for reproducible sampling; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SacParams {
    fn default() -> Self {
        Self {
            normal_distance_weight: 0.1,
            max_iterations: 10_000,
            distance_threshold: 0.2,
            radius_limits: (0.0, f64::INFINITY),
            axis: [0.0, 0.0, 1.0],
            eps_angle: 15.0_f64.to_radians(),
            seed: None,
        }
    }
}

/// Outcome of [`segment_cylinder`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SacResult {
    /// Indices into the input cloud judged consistent with the model,
    /// in ascending order. Empty when no cylinder was found.
    pub inliers: Vec<usize>,
    /// Fitted cylinder coefficients; the zero model when `inliers` is
    /// empty.
    pub model: CylinderModel,
}

/// Search for the cylinder model that best explains a cloud under a
/// robust inlier count.
///
/// Repeatedly samples two points with informative normals, hypothesizes
/// a cylinder through them, discards hypotheses outside the radius
/// limits or the axis prior, and keeps the hypothesis with the most
/// inliers under the blended distance test. The winner is polished by a
/// least squares fit over its inliers and the inlier set re-selected
/// once under the polished model.
///
/// Finding no cylinder is a normal outcome and yields an empty result,
/// not an error. The search is best-effort: it runs the full iteration
/// budget and never retries.
///
/// # Arguments
///
/// * `points` - The cluster to segment.
/// * `normals` - Per-point surface normals, index-aligned with `points`.
///   Degenerate (zero) normals are tolerated and never sampled.
/// * `params` - Search parameters.
pub fn segment_cylinder(
    points: &[[f64; 3]],
    normals: &[[f64; 3]],
    params: &SacParams,
) -> Result<SacResult, SacError> {
    if points.len() != normals.len() {
        return Err(SacError::MismatchedLengths {
            points: points.len(),
            normals: normals.len(),
        });
    }
    if points.len() < 2 {
        return Ok(SacResult::default());
    }

    let axis_prior = match (params.eps_angle > 0.0, normalize3(&params.axis)) {
        (true, Ok(axis)) => Some((axis, params.eps_angle.cos())),
        _ => None,
    };

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut best_count = 0;
    let mut best_model: Option<CylinderModel> = None;

    for iteration in 0..params.max_iterations {
        let sample = rand::seq::index::sample(&mut rng, points.len(), 2);
        let (i, j) = (sample.index(0), sample.index(1));
        if normals[i] == DEGENERATE_NORMAL || normals[j] == DEGENERATE_NORMAL {
            continue;
        }

        let Some(model) =
            CylinderModel::from_point_normal_pair(&points[i], &normals[i], &points[j], &normals[j])
        else {
            continue;
        };
        if model.radius < params.radius_limits.0 || model.radius > params.radius_limits.1 {
            continue;
        }
        if let Some((axis, min_cos)) = &axis_prior {
            if dot_product3(&model.axis, axis).abs() < *min_cos {
                continue;
            }
        }

        let count = count_within_distance(points, normals, &model, params);
        if count > best_count {
            log::debug!(
                "iteration {iteration}: best hypothesis now {count} inliers, radius {:.4}",
                model.radius
            );
            best_count = count;
            best_model = Some(model);
        }
    }

    let Some(model) = best_model else {
        return Ok(SacResult::default());
    };

    let inliers = select_within_distance(points, normals, &model, params);
    let (model, inliers) = match refine_model(points, &inliers, &model, params) {
        Some(refined) => {
            let refined_inliers = select_within_distance(points, normals, &refined, params);
            if refined_inliers.is_empty() {
                (model, inliers)
            } else {
                (refined, refined_inliers)
            }
        }
        None => (model, inliers),
    };

    Ok(SacResult { inliers, model })
}

/// Blended point-to-model distance: `w * angular + (1 - w) * euclidean`.
///
/// A degenerate normal contributes no angular information and falls back
/// to the Euclidean term alone.
fn blended_distance(
    model: &CylinderModel,
    point: &[f64; 3],
    normal: &[f64; 3],
    weight: f64,
) -> f64 {
    let d_euclid = model.distance_to_surface(point);
    if *normal == DEGENERATE_NORMAL {
        return d_euclid;
    }
    let d_normal = model.normal_deviation(point, normal);
    (weight * d_normal + (1.0 - weight) * d_euclid).abs()
}

fn count_within_distance(
    points: &[[f64; 3]],
    normals: &[[f64; 3]],
    model: &CylinderModel,
    params: &SacParams,
) -> usize {
    points
        .iter()
        .zip(normals.iter())
        .filter(|&(point, normal)| {
            blended_distance(model, point, normal, params.normal_distance_weight)
                < params.distance_threshold
        })
        .count()
}

fn select_within_distance(
    points: &[[f64; 3]],
    normals: &[[f64; 3]],
    model: &CylinderModel,
    params: &SacParams,
) -> Vec<usize> {
    points
        .iter()
        .zip(normals.iter())
        .enumerate()
        .filter_map(|(idx, (point, normal))| {
            (blended_distance(model, point, normal, params.normal_distance_weight)
                < params.distance_threshold)
                .then_some(idx)
        })
        .collect()
}

/// Least squares polish of the winning hypothesis over its inliers.
///
/// The axis direction is re-estimated as the principal direction of the
/// inlier scatter when that direction stays close to the hypothesis axis
/// (a short or poorly covered cylinder has no trustworthy principal
/// direction). The axis point and radius then come from a Kasa circle
/// fit of the inliers projected onto the plane orthogonal to the axis.
///
/// Returns `None` when the fit degenerates or leaves the radius limits;
/// the caller keeps the unpolished model in that case.
fn refine_model(
    points: &[[f64; 3]],
    inliers: &[usize],
    model: &CylinderModel,
    params: &SacParams,
) -> Option<CylinderModel> {
    if inliers.len() < 3 {
        return None;
    }
    let n = inliers.len() as f64;

    let mut centroid = [0.0; 3];
    for &idx in inliers {
        centroid[0] += points[idx][0];
        centroid[1] += points[idx][1];
        centroid[2] += points[idx][2];
    }
    centroid[0] /= n;
    centroid[1] /= n;
    centroid[2] /= n;

    let mut cov = [0.0; 6];
    for &idx in inliers {
        let dx = points[idx][0] - centroid[0];
        let dy = points[idx][1] - centroid[1];
        let dz = points[idx][2] - centroid[2];
        cov[0] += dx * dx;
        cov[1] += dx * dy;
        cov[2] += dx * dz;
        cov[3] += dy * dy;
        cov[4] += dy * dz;
        cov[5] += dz * dz;
    }
    for c in cov.iter_mut() {
        *c /= n;
    }

    let (_, eigenvectors) = sym_eigen3(&cov);
    let principal = eigenvectors[0];
    let alignment = dot_product3(&principal, &model.axis);
    let axis = if alignment.abs() >= 15.0_f64.to_radians().cos() {
        // keep the orientation of the hypothesis
        if alignment < 0.0 {
            [-principal[0], -principal[1], -principal[2]]
        } else {
            principal
        }
    } else {
        model.axis
    };

    // orthonormal basis spanning the plane orthogonal to the axis
    let helper = if axis[0].abs() < 0.9 {
        [1.0, 0.0, 0.0]
    } else {
        [0.0, 1.0, 0.0]
    };
    let u = normalize3(&cross_product3(&axis, &helper)).ok()?;
    let v = cross_product3(&axis, &u);

    // Kasa circle fit in the (u, v) plane: minimize
    // sum((x^2 + y^2) + a*x + b*y + c)^2 over (a, b, c)
    let origin = model.point_on_axis;
    let (mut sx, mut sy, mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    let (mut sz, mut sxz, mut syz, mut sh) = (0.0, 0.0, 0.0, 0.0);
    for &idx in inliers {
        let delta = [
            points[idx][0] - origin[0],
            points[idx][1] - origin[1],
            points[idx][2] - origin[2],
        ];
        let x = dot_product3(&delta, &u);
        let y = dot_product3(&delta, &v);
        let z = x * x + y * y;
        sx += x;
        sy += y;
        sxx += x * x;
        sxy += x * y;
        syy += y * y;
        sz += z;
        sxz += x * z;
        syz += y * z;
        sh += dot_product3(&delta, &axis);
    }

    let lhs = [[sxx, sxy, sx], [sxy, syy, sy], [sx, sy, n]];
    let rhs = [-sxz, -syz, -sz];
    let [a, b, c] = solve3(&lhs, &rhs)?;

    let cx = -a / 2.0;
    let cy = -b / 2.0;
    let r_sq = cx * cx + cy * cy - c;
    if r_sq <= 0.0 || !r_sq.is_finite() {
        return None;
    }
    let radius = r_sq.sqrt();
    if radius < params.radius_limits.0 || radius > params.radius_limits.1 {
        return None;
    }

    let mean_h = sh / n;
    let point_on_axis = [
        origin[0] + cx * u[0] + cy * v[0] + mean_h * axis[0],
        origin[1] + cx * u[1] + cy * v[1] + mean_h * axis[1],
        origin[2] + cx * u[2] + cy * v[2] + mean_h * axis[2],
    ];

    Some(CylinderModel {
        point_on_axis,
        axis,
        radius,
    })
}

/// Solve a 3x3 linear system by Cramer's rule. `None` when the system is
/// close to singular.
fn solve3(lhs: &[[f64; 3]; 3], rhs: &[f64; 3]) -> Option<[f64; 3]> {
    let det = det3(lhs);
    if det.abs() < 1e-12 {
        return None;
    }

    let mut solution = [0.0; 3];
    for (col, value) in solution.iter_mut().enumerate() {
        let mut m = *lhs;
        for row in 0..3 {
            m[row][col] = rhs[row];
        }
        *value = det3(&m) / det;
    }
    Some(solution)
}

fn det3(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}
