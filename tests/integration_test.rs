use wellrec::models::*;
use wellrec::services::catalog::{ActivityCatalog, ActivityFormatter};
use wellrec::services::feedback::FeedbackStore;
use wellrec::services::recommendation::{ContentScorer, HeuristicScorer, RecommendationService};
use wellrec::services::training::TrainingService;
use wellrec::Config;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

fn stressed_profile() -> UserProfile {
    UserProfile {
        stress: 9.0,
        anxiety: 3.0,
        depression: 2.0,
        sleep_hours: 7.5,
        steps_per_day: 8000.0,
    }
}

fn small_training_config() -> wellrec::config::TrainingConfig {
    let mut training = Config::default().training;
    // Keep the forest small so training-heavy tests stay fast.
    training.n_estimators = 10;
    training.max_depth = 6;
    training
}

fn seeded_ratings(store: &FeedbackStore, count: usize) {
    let profile = stressed_profile();
    for i in 0..count {
        let user_id = (i / 10 + 1) as i64;
        let activity_id = (i % 10 + 1) as i64;
        let rating = 1.0 + (i % 5) as f32;
        store
            .upsert(Some(user_id), activity_id, rating, &profile, "")
            .unwrap();
    }
}

#[test]
fn test_recommendation_flow() {
    let config = Config::default();
    let catalog = Arc::new(ActivityCatalog::sample());
    let training = Arc::new(TrainingService::new(
        small_training_config(),
        std::env::temp_dir().join("wellrec-integration-no-artifact"),
        Vec::new(),
    ));
    let service = RecommendationService::new(catalog, training, config.recommendation);
    let mut rng = StdRng::seed_from_u64(7);

    let request = RecommendationRequest {
        stress: Some(9.0),
        anxiety: Some(3.0),
        top_n: Some(5),
        ..Default::default()
    };
    let profile = service.resolve_profile(&request);
    assert_eq!(profile.stress, 9.0);
    assert_eq!(profile.depression, 5.0);

    let (method, cards) = service.recommend(&profile, ScoreMethod::Hybrid, 5, &mut rng);
    assert_eq!(method, ScoreMethod::Hybrid);
    assert!((1..=5).contains(&cards.len()));

    for pair in cards.windows(2) {
        assert!(pair[0].match_score >= pair[1].match_score);
    }
    for card in &cards {
        assert!((65.0..=98.0).contains(&card.match_score));
        assert!(card.match_percentage.ends_with('%'));
        assert!(!card.one_line_description.is_empty());
        assert!(!card.video_link.is_empty());
    }
}

#[test]
fn test_content_scoring_is_deterministic() {
    let catalog = ActivityCatalog::sample();
    let scorer = ContentScorer::fit(&catalog, 500);
    let profile = stressed_profile();

    let first = scorer.score(&catalog, &profile);
    let second = scorer.score(&catalog, &profile);
    assert_eq!(
        first.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        second.iter().map(|(id, _)| *id).collect::<Vec<_>>()
    );
}

#[test]
fn test_stressed_profile_prefers_calming_activities() {
    let catalog = ActivityCatalog::sample();
    let profile = stressed_profile();

    // Content: breathing (2) or muscle relaxation (4) should outrank dance (9).
    let scorer = ContentScorer::fit(&catalog, 500);
    let ranked = scorer.score(&catalog, &profile);
    let rank = |id: i64| ranked.iter().position(|(a, _)| *a == id).unwrap();
    assert!(rank(2).min(rank(4)) < rank(9));

    // Heuristic, jitter-free: same ordering holds.
    let breathing = catalog.get_by_id(2).unwrap();
    let dance = catalog.get_by_id(9).unwrap();
    let gap = HeuristicScorer::raw_score(breathing, &profile)
        - HeuristicScorer::raw_score(dance, &profile);
    assert!(gap > 8.0, "jitter could reorder a gap of {gap}");
}

#[test]
fn test_heuristic_scores_stay_in_band() {
    let catalog = ActivityCatalog::sample();
    let scorer = HeuristicScorer::new(8.0);
    let mut rng = StdRng::seed_from_u64(21);

    let ranked = scorer.score(&catalog, &stressed_profile(), &mut rng);
    assert_eq!(ranked.len(), catalog.len());
    assert_eq!(ranked[0].1, 95.0);
    for (_, score) in &ranked {
        assert!((65.0..=95.0).contains(score));
    }
}

#[test]
fn test_feedback_upsert_and_user_allocation() {
    let store = FeedbackStore::open_in_memory().unwrap();
    assert_eq!(store.next_user_id().unwrap(), 1);

    let profile = stressed_profile();
    let first = store.upsert(None, 3, 4.0, &profile, "felt calmer").unwrap();
    assert_eq!(first, 1);

    // Re-rating the same pair replaces the row.
    store.upsert(Some(1), 3, 2.0, &profile, "").unwrap();
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.rating_for(1, 3).unwrap(), Some(2.0));

    store.upsert(Some(7), 5, 5.0, &profile, "").unwrap();
    assert_eq!(store.next_user_id().unwrap(), 8);
}

#[test]
fn test_training_regime_selection() {
    let catalog = ActivityCatalog::sample();
    let interaction = InteractionRecord {
        user_id: Some(1),
        profile: stressed_profile(),
    };

    // 50 ratings: pure real training.
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::open_in_memory().unwrap();
    seeded_ratings(&store, 50);
    let service = TrainingService::new(
        small_training_config(),
        dir.path().to_path_buf(),
        vec![interaction.clone(); 12],
    );
    assert_eq!(service.train(&store, &catalog).unwrap(), TrainingRegime::Real);

    // 49 ratings: hybrid.
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::open_in_memory().unwrap();
    seeded_ratings(&store, 49);
    let service = TrainingService::new(
        small_training_config(),
        dir.path().to_path_buf(),
        vec![interaction.clone(); 12],
    );
    assert_eq!(service.train(&store, &catalog).unwrap(), TrainingRegime::Hybrid);

    // 9 ratings but interaction history: enhanced synthetic.
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::open_in_memory().unwrap();
    seeded_ratings(&store, 9);
    let service = TrainingService::new(
        small_training_config(),
        dir.path().to_path_buf(),
        vec![interaction; 12],
    );
    assert_eq!(
        service.train(&store, &catalog).unwrap(),
        TrainingRegime::EnhancedSynthetic
    );

    // Nothing at all: minimal synthetic.
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::open_in_memory().unwrap();
    let service = TrainingService::new(
        small_training_config(),
        dir.path().to_path_buf(),
        Vec::new(),
    );
    assert_eq!(
        service.train(&store, &catalog).unwrap(),
        TrainingRegime::MinimalSynthetic
    );
}

#[test]
fn test_learned_recommendations_after_training() {
    let config = Config::default();
    let catalog = Arc::new(ActivityCatalog::sample());
    let dir = tempfile::tempdir().unwrap();
    let store = FeedbackStore::open_in_memory().unwrap();
    seeded_ratings(&store, 50);

    let training = Arc::new(TrainingService::new(
        small_training_config(),
        dir.path().to_path_buf(),
        Vec::new(),
    ));
    training.train(&store, &catalog).unwrap();

    let service = RecommendationService::new(catalog, training, config.recommendation);
    let mut rng = StdRng::seed_from_u64(7);
    let (method, cards) = service.recommend(&stressed_profile(), ScoreMethod::Learned, 3, &mut rng);

    assert_eq!(method, ScoreMethod::Learned);
    assert_eq!(cards.len(), 3);
    for card in &cards {
        let rating = card.predicted_rating.unwrap();
        assert!((1.0..=5.0).contains(&rating));
        assert!((65.0..=95.0).contains(&card.match_score));
    }
}

#[test]
fn test_catalog_lookup_and_summaries() {
    let catalog = ActivityCatalog::sample();
    assert_eq!(catalog.len(), 10);

    for id in 1..=10 {
        assert_eq!(catalog.get_by_id(id).unwrap().id, id);
    }
    // Unknown ids degrade to the first catalog entry instead of erroring.
    assert_eq!(catalog.get_by_id_or_default(999).id, 1);

    let summaries = catalog.summaries(3);
    assert_eq!(summaries.len(), 3);
    assert!(!summaries[0].description.is_empty());
}

#[test]
fn test_formatter_fills_sparse_activities() {
    let activity = Activity {
        id: 42,
        activity_type: "Meditation - Guided".to_string(),
        category: "Anxiety Relief".to_string(),
        duration_minutes: 10,
        intensity: Intensity::Low,
        benefits: String::new(),
        short_description: String::new(),
        recommended_when: String::new(),
        instructions: String::new(),
        tips: String::new(),
        precautions: String::new(),
        equipment: String::new(),
        video_link: String::new(),
    };

    let card = ActivityFormatter::format(&activity, 120.0, ScoreMethod::Content);
    assert_eq!(card.name, "Meditation - Anxiety Reduction");
    assert_eq!(card.match_score, 98.0);
    assert!(card.benefits.starts_with('-'));
    assert!(card.video_link.contains("youtube.com/results"));
    assert!(!card.one_line_description.is_empty());
}

#[test]
fn test_validation_rejects_bad_input() {
    use wellrec::utils::validation::*;

    let request = FeedbackRequest {
        user_id: Some(1),
        activity_id: 3,
        rating: 6.0,
        stress: None,
        anxiety: None,
        depression: None,
        sleep_hours: None,
        steps_per_day: None,
        mood_description: None,
    };
    assert!(validate_feedback(&request).is_err());

    assert!(validate_top_n(0).is_err());
    assert!(validate_top_n(101).is_err());
    assert!(validate_top_n(5).is_ok());

    let profile = UserProfile {
        stress: f32::NAN,
        ..UserProfile::default()
    };
    assert!(validate_profile(&profile).is_err());
}
