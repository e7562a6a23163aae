use cylseg_3d::pointcloud::PointCloud;

/// Extract the points at `indices` from a cloud into a new cloud,
/// preserving the order of the indices.
///
/// Pure and deterministic: the same cloud and indices always produce the
/// same output. An empty index set yields an empty cloud; indices out of
/// range are skipped.
pub fn extract_indices(cloud: &PointCloud, indices: &[usize]) -> PointCloud {
    let points = indices
        .iter()
        .filter_map(|&idx| cloud.points().get(idx).copied())
        .collect();
    PointCloud::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cloud() -> PointCloud {
        PointCloud::new(vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
        ])
    }

    #[test]
    fn test_extract_indices_preserves_order() {
        let cloud = sample_cloud();
        let extracted = extract_indices(&cloud, &[3, 0, 2]);
        assert_eq!(
            extracted.points(),
            &[[3.0, 0.0, 0.0], [0.0, 0.0, 0.0], [2.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_extract_indices_empty() {
        let cloud = sample_cloud();
        let extracted = extract_indices(&cloud, &[]);
        assert!(extracted.is_empty());
    }

    #[test]
    fn test_extract_indices_out_of_range() {
        let cloud = sample_cloud();
        let extracted = extract_indices(&cloud, &[1, 7]);
        assert_eq!(extracted.points(), &[[1.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_extract_indices_deterministic() {
        let cloud = sample_cloud();
        let indices = [2, 1];
        let first = extract_indices(&cloud, &indices);
        let second = extract_indices(&cloud, &indices);
        assert_eq!(first, second);
    }
}
