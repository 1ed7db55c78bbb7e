//! Vector similarity.

/// Cosine similarity: `dot(a, b) / (|a| * |b|)`.
///
/// Returns 0 when either vector has zero magnitude or the lengths differ,
/// rather than dividing by zero or truncating.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_yields_zero_not_nan() {
        let v = vec![1.0, 2.0, 3.0];
        let zero = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine(&v, &zero), 0.0);
        assert_eq!(cosine(&zero, &zero), 0.0);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!((cosine(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_score_negative_one() {
        let v = vec![1.0, 2.0];
        let w = vec![-1.0, -2.0];
        assert!((cosine(&v, &w) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn length_mismatch_scores_zero() {
        assert_eq!(cosine(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
