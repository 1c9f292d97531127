use std::cmp::Ordering;

/// Cosine similarity; empty, zero-norm or length-mismatched inputs score 0.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.is_empty() || query.len() != candidate.len() {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(candidate).map(|(x, y)| x * y).sum();
    let query_norm = l2_norm(query);
    let candidate_norm = l2_norm(candidate);
    let denom = query_norm * candidate_norm;
    if denom <= f32::EPSILON {
        return 0.0;
    }

    (dot / denom).clamp(-1.0, 1.0)
}

/// `1 - cosine_similarity`, in `[0, 2]`. Larger means less similar.
pub fn cosine_distance(query: &[f32], candidate: &[f32]) -> f32 {
    1.0 - cosine_similarity(query, candidate)
}

pub fn rank_ascending_by_distance(query: &[f32], candidates: &[Vec<f32>]) -> Vec<(usize, f32)> {
    let mut scores: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_distance(query, candidate)))
        .collect();

    scores.sort_by(|left, right| left.1.partial_cmp(&right.1).unwrap_or(Ordering::Equal));
    scores
}

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}
