//! Cosine similarity and threshold selection shared by tagging and retrieval

/// Cosine similarity of two vectors.
///
/// Returns 0.0 when either vector has zero magnitude or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Euclidean magnitude of a vector
pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Pick the positions of scores strictly above `threshold`, best first.
///
/// `scores` is given in insertion order; equal scores keep that order because
/// the sort is stable. At most `cap` positions are returned.
pub fn select_above(scores: &[f32], threshold: f32, cap: usize) -> Vec<usize> {
    let mut candidates: Vec<(usize, f32)> = scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, score)| *score > threshold)
        .collect();

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    candidates.truncate(cap);

    candidates.into_iter().map(|(pos, _)| pos).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_vectors() {
        let v = vec![0.3, -0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_length_mismatch_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_select_above_is_strict() {
        let scores = [0.85, 0.86, 0.5];
        assert_eq!(select_above(&scores, 0.85, 5), vec![1]);
    }

    #[test]
    fn test_select_above_orders_and_caps() {
        let scores = [0.9, 0.95, 0.9, 0.99, 0.1];
        assert_eq!(select_above(&scores, 0.8, 3), vec![3, 1, 0]);
        // ties keep insertion order
        assert_eq!(select_above(&scores, 0.8, 5), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_select_above_empty() {
        assert!(select_above(&[], 0.8, 5).is_empty());
        assert!(select_above(&[0.2, 0.3], 0.8, 5).is_empty());
    }
}
