pub mod validation;

/// Cosine similarity over raw slices; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

pub fn clamp(value: f32, low: f32, high: f32) -> f32 {
    value.max(low).min(high)
}

/// Maps a raw similarity or normalized rule score onto the display band.
pub fn to_match_percentage(raw: f32) -> f32 {
    clamp(65.0 + raw * 30.0, 65.0, 95.0)
}

/// Lowercases, strips punctuation other than hyphens, collapses whitespace.
/// All catalog text passes through here before vectorization or keyword
/// matching so the two paths agree on what a token is.
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);

        let a = vec![1.0, 1.0];
        let b = vec![1.0, 1.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_match_percentage_band() {
        assert_eq!(to_match_percentage(0.0), 65.0);
        assert_eq!(to_match_percentage(1.0), 95.0);
        assert_eq!(to_match_percentage(5.0), 95.0);
        assert_eq!(to_match_percentage(-1.0), 65.0);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("Reduces stress,  improves MOOD!"),
            "reduces stress improves mood"
        );
        assert_eq!(normalize_text("low-impact (gentle)"), "low-impact gentle");
    }
}
