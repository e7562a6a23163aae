use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use cylseg_3d::linalg::sym_eigen3;

/// The normal of a point whose neighborhood gave no support for an
/// estimate. Consumers must treat it as non-informative.
pub const DEGENERATE_NORMAL: [f64; 3] = [0.0; 3];

/// Minimum neighborhood size (query point included) for a PCA normal.
const MIN_NEIGHBORS: usize = 3;

/// Estimate one surface normal per point from its radius neighborhood.
///
/// Builds a k-d tree over the points and runs a PCA per neighborhood:
/// the normal is the unit eigenvector of the smallest eigenvalue of the
/// neighborhood covariance, the direction in which the local surface is
/// thinnest. Normal signs are arbitrary (no viewpoint orientation).
///
/// A point with fewer than 3 neighbors inside `radius` (itself included)
/// gets [`DEGENERATE_NORMAL`].
///
/// # Arguments
///
/// * `points` - The cluster to estimate normals for.
/// * `radius` - Neighborhood search radius.
///
/// # Returns
///
/// One normal per input point, index-aligned with `points`.
pub fn estimate_normals(points: &[[f64; 3]], radius: f64) -> Vec<[f64; 3]> {
    if points.is_empty() {
        return Vec::new();
    }

    let kdtree: ImmutableKdTree<f64, u32, 3, 32> = ImmutableKdTree::new_from_slice(points);
    let radius_sq = radius * radius;

    points
        .iter()
        .map(|point| {
            let neighbors = kdtree.within_unsorted::<SquaredEuclidean>(point, radius_sq);
            if neighbors.len() < MIN_NEIGHBORS {
                return DEGENERATE_NORMAL;
            }

            let mut centroid = [0.0; 3];
            for nn in &neighbors {
                let q = points[nn.item as usize];
                centroid[0] += q[0];
                centroid[1] += q[1];
                centroid[2] += q[2];
            }
            let inv_n = 1.0 / neighbors.len() as f64;
            centroid[0] *= inv_n;
            centroid[1] *= inv_n;
            centroid[2] *= inv_n;

            // covariance upper triangle [xx, xy, xz, yy, yz, zz]
            let mut cov = [0.0; 6];
            for nn in &neighbors {
                let q = points[nn.item as usize];
                let dx = q[0] - centroid[0];
                let dy = q[1] - centroid[1];
                let dz = q[2] - centroid[2];
                cov[0] += dx * dx;
                cov[1] += dx * dy;
                cov[2] += dx * dz;
                cov[3] += dy * dy;
                cov[4] += dy * dz;
                cov[5] += dz * dz;
            }
            for c in cov.iter_mut() {
                *c *= inv_n;
            }

            // eigenvalues come out descending, the normal spans the
            // thinnest direction of the neighborhood
            let (_, eigenvectors) = sym_eigen3(&cov);
            eigenvectors[2]
        })
        .collect()
}
