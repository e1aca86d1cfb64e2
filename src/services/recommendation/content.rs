use crate::algorithms::TfidfVectorizer;
use crate::models::{Activity, Intensity, UserProfile};
use crate::services::catalog::ActivityCatalog;
use crate::utils::{cosine_similarity, normalize_text};
use nalgebra::DVector;
use tracing::debug;

/// Content-similarity scorer: a TF-IDF space over activity text, queried
/// with a pseudo-document synthesized from the user's profile. This path is
/// fully deterministic for a fixed catalog and profile.
pub struct ContentScorer {
    vectorizer: TfidfVectorizer,
    activity_vectors: Vec<DVector<f32>>,
    activity_ids: Vec<i64>,
}

impl ContentScorer {
    pub fn fit(catalog: &ActivityCatalog, max_vocabulary: usize) -> Self {
        let documents: Vec<String> = catalog
            .iter()
            .map(|activity| {
                normalize_text(&format!(
                    "{} {} {} {} {}",
                    activity.activity_type,
                    activity.category,
                    activity.intensity,
                    activity.benefits,
                    activity.short_description
                ))
            })
            .collect();

        let mut vectorizer = TfidfVectorizer::new(max_vocabulary);
        let activity_vectors = vectorizer.fit_transform(&documents);
        let activity_ids = catalog.iter().map(|a| a.id).collect();

        debug!(
            activities = activity_vectors.len(),
            vocabulary = vectorizer.vocabulary_len(),
            "content scorer fitted"
        );

        Self {
            vectorizer,
            activity_vectors,
            activity_ids,
        }
    }

    /// Adjusted similarity per activity id, descending. The raw cosine is
    /// multiplied by compounding per-signal boosts before ranking.
    pub fn score(&self, catalog: &ActivityCatalog, profile: &UserProfile) -> Vec<(i64, f32)> {
        let query = self.vectorizer.transform(&self.pseudo_document(profile));

        let mut scored: Vec<(i64, f32)> = self
            .activity_ids
            .iter()
            .zip(self.activity_vectors.iter())
            .map(|(&id, vector)| {
                let similarity = cosine_similarity(query.as_slice(), vector.as_slice());
                let adjusted = match catalog.get_by_id(id) {
                    Some(activity) => similarity * Self::adjustment(activity, profile),
                    None => similarity,
                };
                (id, adjusted)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    /// Builds the weighted query document. Keyword repetition counts scale
    /// with the signal value so a linear vectorizer can express magnitude.
    fn pseudo_document(&self, profile: &UserProfile) -> String {
        let mut keywords: Vec<&str> = Vec::new();

        if profile.stress > 4.0 {
            let reps = profile.stress as usize;
            keywords.extend(std::iter::repeat("stress relief").take(reps));
            keywords.extend(std::iter::repeat("calm").take(reps));
            keywords.extend(["relaxation", "tension release"]);
        }

        if profile.anxiety > 4.0 {
            let reps = profile.anxiety as usize;
            keywords.extend(std::iter::repeat("anxiety relief").take(reps));
            keywords.extend(std::iter::repeat("calm mind").take(reps));
            keywords.extend(["grounding", "worried", "panic"]);
        }

        if profile.depression > 4.0 {
            let reps = profile.depression as usize;
            keywords.extend(std::iter::repeat("mood boost").take(reps));
            keywords.extend(std::iter::repeat("energy").take(reps));
            keywords.extend(["motivation", "depression", "sad"]);
        }

        if profile.sleep_hours < 6.0 {
            keywords.extend(["sleep improvement", "insomnia", "rest", "relax"]);
        }

        if profile.steps_per_day < 3000.0 {
            keywords.extend(["gentle exercise", "walking", "beginner", "low impact"]);
        } else {
            keywords.extend(["active", "energetic", "vigorous", "challenging"]);
        }

        if profile.stress > 7.0 || profile.anxiety > 7.0 || profile.depression > 7.0 {
            keywords.extend(["mental health support", "emotional wellness", "self-care"]);
        }

        // The query is never empty: without triggered signals, fall back to
        // a generic wellness document.
        if keywords.is_empty() {
            keywords.extend(["mental health", "wellness", "self-care"]);
        }

        normalize_text(&keywords.join(" "))
    }

    /// Multiplicative boost product. Each factor applies only when the
    /// signal clears its threshold and the activity text carries the
    /// matching keyword.
    fn adjustment(activity: &Activity, profile: &UserProfile) -> f32 {
        let benefits = activity.benefits.to_lowercase();
        let category = activity.category.to_lowercase();
        let mut adjustment = 1.0;

        if profile.stress > 5.0 {
            if benefits.contains("stress") {
                adjustment *= 1.0 + profile.stress * 0.05;
            }
            if category.contains("stress") {
                adjustment *= 1.0 + profile.stress * 0.03;
            }
        }

        if profile.anxiety > 5.0 {
            if benefits.contains("anxiety") {
                adjustment *= 1.0 + profile.anxiety * 0.04;
            }
            if category.contains("anxiety") {
                adjustment *= 1.0 + profile.anxiety * 0.03;
            }
        }

        if profile.depression > 5.0 {
            if benefits.contains("depression") || benefits.contains("mood") {
                adjustment *= 1.0 + profile.depression * 0.05;
            }
            if category.contains("mood") || category.contains("depression") {
                adjustment *= 1.0 + profile.depression * 0.03;
            }
        }

        if profile.sleep_hours < 6.0 && benefits.contains("sleep") {
            adjustment *= 1.3;
        }

        if profile.depression > 6.0 && activity.intensity == Intensity::High {
            adjustment *= 1.2;
        }
        if profile.anxiety > 6.0 && activity.intensity == Intensity::Low {
            adjustment *= 1.2;
        }
        if profile.stress > 6.0 && activity.intensity != Intensity::High {
            adjustment *= 1.1;
        }

        adjustment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stressed_profile() -> UserProfile {
        UserProfile {
            stress: 9.0,
            anxiety: 2.0,
            depression: 2.0,
            sleep_hours: 8.0,
            steps_per_day: 9000.0,
        }
    }

    #[test]
    fn test_stress_profile_favors_calming_activities() {
        let catalog = ActivityCatalog::sample();
        let scorer = ContentScorer::fit(&catalog, 500);

        let scored = scorer.score(&catalog, &stressed_profile());
        let rank = |id: i64| scored.iter().position(|&(i, _)| i == id).unwrap();

        // Deep Breathing (2) and Progressive Muscle Relaxation (4) carry
        // stress and anxiety benefit text; Dance Movement (9) does not lead.
        assert!(rank(2) < rank(9) || rank(4) < rank(9));
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let catalog = ActivityCatalog::sample();
        let scorer = ContentScorer::fit(&catalog, 500);
        let profile = stressed_profile();

        let first = scorer.score(&catalog, &profile);
        let second = scorer.score(&catalog, &profile);
        assert_eq!(first, second);
    }

    #[test]
    fn test_neutral_profile_still_scores() {
        let catalog = ActivityCatalog::sample();
        let scorer = ContentScorer::fit(&catalog, 500);
        let profile = UserProfile {
            stress: 1.0,
            anxiety: 1.0,
            depression: 1.0,
            sleep_hours: 8.0,
            steps_per_day: 5000.0,
        };

        let scored = scorer.score(&catalog, &profile);
        assert_eq!(scored.len(), catalog.len());
    }
}
