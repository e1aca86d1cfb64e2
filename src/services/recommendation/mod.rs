use crate::config::RecommendationConfig;
use crate::models::{
    Recommendation, RecommendationRequest, ScoreMethod, UserProfile,
};
use crate::services::catalog::{ActivityCatalog, ActivityFormatter};
use crate::services::training::TrainingService;
use crate::utils::{clamp, to_match_percentage};
use rand::Rng;
use serde_json::Value;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub mod content;
pub mod heuristic;

pub use content::ContentScorer;
pub use heuristic::HeuristicScorer;

/// Questionnaire answers mapped to score contributions.
fn answer_value(answer: &str) -> f32 {
    match answer {
        "Sometimes" => 0.5,
        "Often" => 0.75,
        "Almost Always" => 1.0,
        _ => 0.0,
    }
}

/// Front door of the recommender: resolves the profile, dispatches to the
/// requested scoring method, and merges scorer outputs on the hybrid path.
pub struct RecommendationService {
    catalog: Arc<ActivityCatalog>,
    content: ContentScorer,
    heuristic: HeuristicScorer,
    training: Arc<TrainingService>,
    config: RecommendationConfig,
}

impl RecommendationService {
    pub fn new(
        catalog: Arc<ActivityCatalog>,
        training: Arc<TrainingService>,
        config: RecommendationConfig,
    ) -> Self {
        let content = ContentScorer::fit(&catalog, config.max_vocabulary);
        let heuristic = HeuristicScorer::new(config.jitter_max);
        Self {
            catalog,
            content,
            heuristic,
            training,
            config,
        }
    }

    /// Resolves the request into a concrete profile. Explicit signal values
    /// win; otherwise stress/anxiety/depression are derived from raw
    /// questionnaire answers when any are present.
    pub fn resolve_profile(&self, request: &RecommendationRequest) -> UserProfile {
        let assessed = Self::assessment_scores(&request.assessment);

        let pick = |explicit: Option<f32>, derived: Option<f32>| {
            explicit.or(derived).unwrap_or(5.0)
        };

        UserProfile {
            stress: pick(request.stress, assessed.map(|(s, _, _)| s)),
            anxiety: pick(request.anxiety, assessed.map(|(_, a, _)| a)),
            depression: pick(request.depression, assessed.map(|(_, _, d)| d)),
            sleep_hours: request.sleep_hours.unwrap_or(7.0),
            steps_per_day: request.steps_per_day.unwrap_or(5000.0),
        }
    }

    /// Sums questionnaire answers ("stress_1".."depression_10") into the
    /// three score signals, capped at 10. None when no answer keys exist.
    fn assessment_scores(answers: &HashMap<String, Value>) -> Option<(f32, f32, f32)> {
        let mut scores = [0.0f32; 3];
        let mut answered = false;

        for (slot, prefix) in ["stress", "anxiety", "depression"].iter().enumerate() {
            for i in 1..=10 {
                if let Some(Value::String(answer)) = answers.get(&format!("{prefix}_{i}")) {
                    scores[slot] += answer_value(answer);
                    answered = true;
                }
            }
        }

        if !answered {
            return None;
        }

        let cap = |v: f32| ((v * 100.0).round() / 100.0).min(10.0);
        Some((cap(scores[0]), cap(scores[1]), cap(scores[2])))
    }

    /// Runs the requested scoring method. The returned method tag reflects
    /// what actually ran, which may differ from the request when a tier
    /// degraded.
    pub fn recommend<R: Rng>(
        &self,
        profile: &UserProfile,
        method: ScoreMethod,
        top_n: usize,
        rng: &mut R,
    ) -> (ScoreMethod, Vec<Recommendation>) {
        match method {
            ScoreMethod::Content => (ScoreMethod::Content, self.content_cards(profile, top_n)),
            ScoreMethod::Heuristic => {
                (ScoreMethod::Heuristic, self.heuristic_cards(profile, top_n, rng))
            }
            ScoreMethod::Learned => self.learned_cards(profile, top_n, rng),
            ScoreMethod::Hybrid | ScoreMethod::Fallback => {
                (ScoreMethod::Hybrid, self.hybrid_cards(profile, top_n, rng))
            }
        }
    }

    fn content_cards(&self, profile: &UserProfile, top_n: usize) -> Vec<Recommendation> {
        self.content
            .score(&self.catalog, profile)
            .into_iter()
            .take(top_n)
            .map(|(id, similarity)| {
                let activity = self.catalog.get_by_id_or_default(id);
                ActivityFormatter::format(activity, to_match_percentage(similarity), ScoreMethod::Content)
            })
            .collect()
    }

    fn heuristic_cards<R: Rng>(
        &self,
        profile: &UserProfile,
        top_n: usize,
        rng: &mut R,
    ) -> Vec<Recommendation> {
        self.heuristic
            .score(&self.catalog, profile, rng)
            .into_iter()
            .take(top_n)
            .map(|(id, percentage)| {
                let activity = self.catalog.get_by_id_or_default(id);
                ActivityFormatter::format(activity, percentage, ScoreMethod::Heuristic)
            })
            .collect()
    }

    /// Learned-model path. Degrades to the heuristic scorer with an explicit
    /// fallback tag when no artifact exists or prediction fails; the caller
    /// never sees an error on the read path.
    fn learned_cards<R: Rng>(
        &self,
        profile: &UserProfile,
        top_n: usize,
        rng: &mut R,
    ) -> (ScoreMethod, Vec<Recommendation>) {
        let Some(artifact) = self.training.artifact() else {
            warn!("no trained artifact, degrading to heuristic fallback");
            return (ScoreMethod::Fallback, self.fallback_cards(profile, top_n, rng));
        };

        match artifact.predict_catalog(&self.catalog, profile) {
            Ok(predictions) => {
                let cards = predictions
                    .into_iter()
                    .take(top_n)
                    .map(|(id, rating)| {
                        let activity = self.catalog.get_by_id_or_default(id);
                        // Rescale the [1,5] rating into the display band.
                        let display = clamp(65.0 + (rating - 1.0) / 4.0 * 30.0, 65.0, 95.0);
                        let mut card =
                            ActivityFormatter::format(activity, display, ScoreMethod::Learned);
                        card.predicted_rating = Some(rating);
                        card
                    })
                    .collect();
                (ScoreMethod::Learned, cards)
            }
            Err(e) => {
                warn!(error = %e, "learned prediction failed, degrading to heuristic fallback");
                (ScoreMethod::Fallback, self.fallback_cards(profile, top_n, rng))
            }
        }
    }

    fn fallback_cards<R: Rng>(
        &self,
        profile: &UserProfile,
        top_n: usize,
        rng: &mut R,
    ) -> Vec<Recommendation> {
        let mut cards = self.heuristic_cards(profile, top_n, rng);
        for card in cards.iter_mut() {
            card.method = ScoreMethod::Fallback;
        }
        cards
    }

    /// Merges the heuristic (primary) and content candidate pools: shared
    /// picks average their scores and earn a consensus bonus, then a second
    /// boost pass rewards activities matching the user's elevated signals.
    fn hybrid_cards<R: Rng>(
        &self,
        profile: &UserProfile,
        top_n: usize,
        rng: &mut R,
    ) -> Vec<Recommendation> {
        let pool = self.config.candidate_pool.max(top_n);
        let primary = self.heuristic_cards(profile, pool, rng);
        let secondary = self.content_cards(profile, pool);

        let mut combined: HashMap<i64, Recommendation> = HashMap::new();

        for mut card in primary {
            card.source = Some("heuristic".to_string());
            combined.insert(card.id, card);
        }

        for mut card in secondary {
            match combined.entry(card.id) {
                Entry::Occupied(mut entry) => {
                    let merged = entry.get_mut();
                    let averaged = (merged.match_score + card.match_score) / 2.0;
                    // Consensus bonus for being picked by both scorers.
                    merged.match_score = (averaged + 5.0).min(95.0);
                    merged.method = ScoreMethod::Hybrid;
                    merged.source = Some("hybrid".to_string());
                }
                Entry::Vacant(entry) => {
                    card.source = Some("content".to_string());
                    entry.insert(card);
                }
            }
        }

        let mut cards: Vec<Recommendation> = combined.into_values().collect();
        for card in cards.iter_mut() {
            Self::apply_signal_boosts(card, profile);
            card.match_percentage = format!("{:.1}%", card.match_score);
        }

        cards.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        cards.truncate(top_n);

        debug!(cards = cards.len(), "hybrid merge complete");
        cards
    }

    fn apply_signal_boosts(card: &mut Recommendation, profile: &UserProfile) {
        let name = card.name.to_lowercase();
        let benefits = card.benefits.to_lowercase();

        if profile.stress > 6.0 && (name.contains("stress") || benefits.contains("stress")) {
            card.match_score = (card.match_score + 8.0).min(95.0);
        }
        if profile.anxiety > 6.0 && (name.contains("anxiety") || benefits.contains("anxiety")) {
            card.match_score = (card.match_score + 8.0).min(95.0);
        }
        if profile.depression > 6.0
            && (name.contains("mood") || benefits.contains("depress") || benefits.contains("mood"))
        {
            card.match_score = (card.match_score + 8.0).min(95.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn service() -> RecommendationService {
        let config = Config::default();
        let catalog = Arc::new(ActivityCatalog::sample());
        let training = Arc::new(TrainingService::new(
            config.training,
            std::env::temp_dir().join("wellrec-recommendation-tests-no-artifact"),
            Vec::new(),
        ));
        RecommendationService::new(catalog, training, config.recommendation)
    }

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
    fn test_assessment_scores_from_answers() {
        let mut answers = HashMap::new();
        answers.insert("stress_1".to_string(), Value::String("Almost Always".into()));
        answers.insert("stress_2".to_string(), Value::String("Often".into()));
        answers.insert("anxiety_1".to_string(), Value::String("Sometimes".into()));
        answers.insert("depression_1".to_string(), Value::String("Never".into()));

        let (stress, anxiety, depression) =
            RecommendationService::assessment_scores(&answers).unwrap();
        assert!((stress - 1.75).abs() < 1e-6);
        assert!((anxiety - 0.5).abs() < 1e-6);
        assert_eq!(depression, 0.0);
    }

    #[test]
    fn test_resolve_profile_prefers_explicit_signals() {
        let svc = service();
        let mut request = RecommendationRequest {
            stress: Some(8.0),
            ..Default::default()
        };
        request
            .assessment
            .insert("stress_1".to_string(), Value::String("Never".into()));

        let profile = svc.resolve_profile(&request);
        assert_eq!(profile.stress, 8.0);
        assert_eq!(profile.sleep_hours, 7.0);
    }

    #[test]
    fn test_hybrid_returns_sorted_cards_in_band() {
        let svc = service();
        let mut rng = StdRng::seed_from_u64(11);

        let (method, cards) =
            svc.recommend(&stressed_profile(), ScoreMethod::Hybrid, 5, &mut rng);
        assert_eq!(method, ScoreMethod::Hybrid);
        assert!(!cards.is_empty() && cards.len() <= 5);
        for pair in cards.windows(2) {
            assert!(pair[0].match_score >= pair[1].match_score);
        }
        for card in &cards {
            assert!((65.0..=98.0).contains(&card.match_score));
        }
    }

    #[test]
    fn test_learned_without_artifact_degrades_to_fallback() {
        let svc = service();
        let mut rng = StdRng::seed_from_u64(11);

        let (method, cards) =
            svc.recommend(&stressed_profile(), ScoreMethod::Learned, 5, &mut rng);
        assert_eq!(method, ScoreMethod::Fallback);
        assert!(cards.iter().all(|c| c.method == ScoreMethod::Fallback));
        assert!(!cards.is_empty());
    }

    #[test]
    fn test_consensus_pick_carries_hybrid_source() {
        let svc = service();
        let mut rng = StdRng::seed_from_u64(11);

        // With a 10-activity catalog and pool of 8 per source, overlap is
        // guaranteed.
        let (_, cards) = svc.recommend(&stressed_profile(), ScoreMethod::Hybrid, 10, &mut rng);
        assert!(cards
            .iter()
            .any(|c| c.source.as_deref() == Some("hybrid") && c.method == ScoreMethod::Hybrid));
    }

    #[test]
    fn test_content_method_is_deterministic() {
        let svc = service();
        let mut rng = StdRng::seed_from_u64(11);
        let profile = stressed_profile();

        let (_, first) = svc.recommend(&profile, ScoreMethod::Content, 5, &mut rng);
        let (_, second) = svc.recommend(&profile, ScoreMethod::Content, 5, &mut rng);
        let ids = |cards: &[Recommendation]| cards.iter().map(|c| c.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }
}
