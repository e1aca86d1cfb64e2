use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use wellrec::models::UserProfile;
use wellrec::services::catalog::ActivityCatalog;
use wellrec::services::recommendation::{ContentScorer, HeuristicScorer};
use wellrec::services::training::TrainingService;
use wellrec::services::feedback::FeedbackStore;
use wellrec::Config;

fn bench_profile() -> UserProfile {
    UserProfile {
        stress: 8.0,
        anxiety: 6.0,
        depression: 4.0,
        sleep_hours: 5.5,
        steps_per_day: 3500.0,
    }
}

fn benchmark_content_scoring(c: &mut Criterion) {
    let catalog = ActivityCatalog::sample();
    let profile = bench_profile();

    c.bench_function("content_scorer_fit", |b| {
        b.iter(|| {
            black_box(ContentScorer::fit(&catalog, 500));
        });
    });

    let scorer = ContentScorer::fit(&catalog, 500);
    c.bench_function("content_scorer_score", |b| {
        b.iter(|| {
            black_box(scorer.score(&catalog, &profile));
        });
    });
}

fn benchmark_heuristic_scoring(c: &mut Criterion) {
    let catalog = ActivityCatalog::sample();
    let profile = bench_profile();
    let scorer = HeuristicScorer::new(8.0);

    c.bench_function("heuristic_raw_score", |b| {
        let activity = catalog.get_by_id_or_default(2);
        b.iter(|| {
            black_box(HeuristicScorer::raw_score(activity, &profile));
        });
    });

    c.bench_function("heuristic_scorer_score", |b| {
        let mut rng = StdRng::seed_from_u64(42);
        b.iter(|| {
            black_box(scorer.score(&catalog, &profile, &mut rng));
        });
    });
}

fn benchmark_training(c: &mut Criterion) {
    let catalog = ActivityCatalog::sample();
    let mut training = Config::default().training;
    training.n_estimators = 20;
    training.max_depth = 8;

    c.bench_function("train_minimal_synthetic", |b| {
        b.iter(|| {
            let dir = tempfile::tempdir().unwrap();
            let store = FeedbackStore::open_in_memory().unwrap();
            let service =
                TrainingService::new(training.clone(), dir.path().to_path_buf(), Vec::new());
            black_box(service.train(&store, &catalog).unwrap());
        });
    });
}

criterion_group!(
    benches,
    benchmark_content_scoring,
    benchmark_heuristic_scoring,
    benchmark_training
);
criterion_main!(benches);
