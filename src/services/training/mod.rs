use crate::algorithms::{KMeans, RandomForestRegressor, StandardScaler};
use crate::config::TrainingConfig;
use crate::error::{RecommendError, Result};
use crate::models::{Activity, InteractionRecord, TrainingRegime, UserProfile};
use crate::services::catalog::ActivityCatalog;
use crate::services::feedback::FeedbackStore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

mod synthetic;

pub use synthetic::synthetic_rating;

const KMEANS_FILE: &str = "kmeans_model.json";
const FOREST_FILE: &str = "rating_model.json";
const CLUSTER_SCALER_FILE: &str = "scaler_cluster.json";
const RATING_SCALER_FILE: &str = "scaler_rating.json";
const META_FILE: &str = "artifact.json";

/// The fitted clusterer, regressor and their two scalers as one unit.
/// Retraining always replaces the whole artifact; nothing is updated in
/// place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub kmeans: KMeans,
    pub forest: RandomForestRegressor,
    pub scaler_cluster: StandardScaler,
    pub scaler_rating: StandardScaler,
    pub regime: TrainingRegime,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactMeta {
    regime: TrainingRegime,
    trained_at: DateTime<Utc>,
}

impl ModelArtifact {
    /// Cluster label for a profile. An unfit cluster scaler falls back to
    /// cluster 0 so this can never fail a request.
    pub fn cluster_label(&self, profile: &UserProfile) -> usize {
        if !self.scaler_cluster.is_fitted() {
            return 0;
        }
        let scaled = self.scaler_cluster.transform(&profile.cluster_features());
        self.kmeans.predict(&scaled)
    }

    /// Predicted rating in [1, 5] for the profile. Unlike the cluster path,
    /// an unfit rating scaler has no safe default and fails the prediction.
    pub fn predict_rating(&self, profile: &UserProfile) -> Result<f32> {
        if !self.scaler_rating.is_fitted() {
            return Err(RecommendError::ModelNotFitted("rating scaler"));
        }
        if !self.forest.is_fitted() {
            return Err(RecommendError::ModelNotFitted("rating model"));
        }

        let cluster = self.cluster_label(profile) as f32;
        let features = feature_vector(profile, cluster);
        let scaled = self.scaler_rating.transform(&features);
        Ok(self.forest.predict(&scaled))
    }

    /// Predicted rating per catalog activity, descending. The feature vector
    /// is profile-derived, so predictions vary by user rather than by
    /// activity; ties preserve catalog order.
    pub fn predict_catalog(
        &self,
        catalog: &ActivityCatalog,
        profile: &UserProfile,
    ) -> Result<Vec<(i64, f32)>> {
        if catalog.is_empty() {
            return Err(RecommendError::DataUnavailable("empty catalog".to_string()));
        }

        let rating = self.predict_rating(profile)?;
        let mut predictions: Vec<(i64, f32)> =
            catalog.iter().map(|activity| (activity.id, rating)).collect();
        predictions
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        Ok(predictions)
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;

        let pieces: [(&str, String); 5] = [
            (KMEANS_FILE, serde_json::to_string(&self.kmeans)?),
            (FOREST_FILE, serde_json::to_string(&self.forest)?),
            (CLUSTER_SCALER_FILE, serde_json::to_string(&self.scaler_cluster)?),
            (RATING_SCALER_FILE, serde_json::to_string(&self.scaler_rating)?),
            (
                META_FILE,
                serde_json::to_string(&ArtifactMeta {
                    regime: self.regime,
                    trained_at: self.trained_at,
                })?,
            ),
        ];

        for (name, blob) in pieces {
            std::fs::write(dir.join(name), blob)?;
        }

        info!(dir = %dir.display(), regime = %self.regime, "model artifact saved");
        Ok(())
    }

    /// Loads the artifact as a set; any missing piece means no artifact.
    pub fn load(dir: &Path) -> Option<Self> {
        let read = |name: &str| std::fs::read_to_string(dir.join(name)).ok();

        let kmeans: KMeans = serde_json::from_str(&read(KMEANS_FILE)?).ok()?;
        let forest: RandomForestRegressor = serde_json::from_str(&read(FOREST_FILE)?).ok()?;
        let scaler_cluster: StandardScaler =
            serde_json::from_str(&read(CLUSTER_SCALER_FILE)?).ok()?;
        let scaler_rating: StandardScaler =
            serde_json::from_str(&read(RATING_SCALER_FILE)?).ok()?;
        let meta: ArtifactMeta = serde_json::from_str(&read(META_FILE)?).ok()?;

        Some(Self {
            kmeans,
            forest,
            scaler_cluster,
            scaler_rating,
            regime: meta.regime,
            trained_at: meta.trained_at,
        })
    }
}

fn feature_vector(profile: &UserProfile, cluster: f32) -> Vec<f32> {
    let mut features = profile.cluster_features().to_vec();
    features.push(cluster);
    features
}

/// Owns the trained artifact and the training pipeline. The artifact is
/// read-mostly and swapped wholesale on retrain, so in-flight requests keep
/// the prior model while a new one is being fit.
pub struct TrainingService {
    config: TrainingConfig,
    model_dir: PathBuf,
    interactions: Vec<InteractionRecord>,
    artifact: RwLock<Option<Arc<ModelArtifact>>>,
}

impl TrainingService {
    pub fn new(
        config: TrainingConfig,
        model_dir: PathBuf,
        interactions: Vec<InteractionRecord>,
    ) -> Self {
        let artifact = ModelArtifact::load(&model_dir).map(Arc::new);
        if let Some(artifact) = &artifact {
            info!(
                regime = %artifact.regime,
                trained_at = %artifact.trained_at,
                "loaded persisted model artifact"
            );
        }
        Self {
            config,
            model_dir,
            interactions,
            artifact: RwLock::new(artifact),
        }
    }

    pub fn artifact(&self) -> Option<Arc<ModelArtifact>> {
        self.artifact.read().clone()
    }

    /// Trains a fresh artifact, choosing the regime from available real
    /// feedback volume, and swaps it in. Regimes that yield too few rows
    /// fall through to more synthetic ones rather than failing.
    pub fn train(&self, store: &FeedbackStore, catalog: &ActivityCatalog) -> Result<TrainingRegime> {
        let count = store.count()?;
        let regime = if count >= self.config.real_regime_threshold {
            TrainingRegime::Real
        } else if count >= self.config.hybrid_regime_threshold {
            TrainingRegime::Hybrid
        } else if !self.interactions.is_empty() {
            TrainingRegime::EnhancedSynthetic
        } else {
            TrainingRegime::MinimalSynthetic
        };

        info!(feedback_rows = count, regime = %regime, "training rating model");
        let artifact = self.train_regime(regime, store, catalog)?;
        let regime = artifact.regime;

        artifact.save(&self.model_dir)?;
        *self.artifact.write() = Some(Arc::new(artifact));
        Ok(regime)
    }

    /// Retrains when enough feedback accumulated since the current
    /// artifact's training timestamp. Returns whether a retrain ran.
    pub fn maybe_retrain(&self, store: &FeedbackStore, catalog: &ActivityCatalog) -> Result<bool> {
        let new_rows = match self.artifact() {
            Some(artifact) => store.count_newer_than(artifact.trained_at)?,
            None => store.count()?,
        };

        if new_rows < self.config.retrain_threshold {
            return Ok(false);
        }

        info!(new_rows, "feedback threshold reached, retraining");
        self.train(store, catalog)?;
        Ok(true)
    }

    fn train_regime(
        &self,
        regime: TrainingRegime,
        store: &FeedbackStore,
        catalog: &ActivityCatalog,
    ) -> Result<ModelArtifact> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(self.config.seed);

        match regime {
            TrainingRegime::Real => {
                let (scaler_cluster, kmeans, user_clusters) = self.fit_clustering(&mut rng);
                let (rows, labels) = self.real_rows(store, &user_clusters)?;
                if rows.len() < self.config.min_training_rows {
                    warn!(
                        rows = rows.len(),
                        "too few real training rows, falling through to enhanced synthetic"
                    );
                    return self.train_regime(TrainingRegime::EnhancedSynthetic, store, catalog);
                }
                self.fit_artifact(TrainingRegime::Real, rows, labels, scaler_cluster, kmeans, &mut rng)
            }
            TrainingRegime::Hybrid => {
                let (scaler_cluster, kmeans, user_clusters) = self.fit_clustering(&mut rng);
                let (mut rows, mut labels) = self.real_rows(store, &user_clusters)?;
                if rows.len() < 5 || self.interactions.is_empty() {
                    return self.train_regime(TrainingRegime::EnhancedSynthetic, store, catalog);
                }

                let activities: Vec<&Activity> = catalog.iter().collect();
                let needed = self.config.synthetic_floor.saturating_sub(rows.len());
                for _ in 0..needed {
                    let (Some(interaction), Some(&activity)) =
                        (self.interactions.choose(&mut rng), activities.choose(&mut rng))
                    else {
                        break;
                    };
                    let cluster = cluster_of(&scaler_cluster, &kmeans, &interaction.profile);
                    rows.push(feature_vector(&interaction.profile, cluster as f32));
                    labels.push(synthetic_rating(&interaction.profile, activity, &mut rng));
                }

                if rows.len() < self.config.min_training_rows {
                    return self.train_regime(TrainingRegime::EnhancedSynthetic, store, catalog);
                }
                self.fit_artifact(TrainingRegime::Hybrid, rows, labels, scaler_cluster, kmeans, &mut rng)
            }
            TrainingRegime::EnhancedSynthetic => {
                let (scaler_cluster, kmeans, _) = self.fit_clustering(&mut rng);
                let (rows, labels) =
                    self.enhanced_rows(store, catalog, &scaler_cluster, &kmeans, &mut rng)?;
                if rows.len() < self.config.min_training_rows {
                    warn!(
                        rows = rows.len(),
                        "too few synthetic rows, falling through to minimal synthetic"
                    );
                    return self.train_regime(TrainingRegime::MinimalSynthetic, store, catalog);
                }
                self.fit_artifact(
                    TrainingRegime::EnhancedSynthetic,
                    rows,
                    labels,
                    scaler_cluster,
                    kmeans,
                    &mut rng,
                )
            }
            TrainingRegime::MinimalSynthetic => {
                let (scaler_cluster, kmeans) = self.fit_minimal_clustering(&mut rng);
                let (rows, labels) = minimal_rows(&mut rng);
                self.fit_artifact(
                    TrainingRegime::MinimalSynthetic,
                    rows,
                    labels,
                    scaler_cluster,
                    kmeans,
                    &mut rng,
                )
            }
        }
    }

    /// Fits the cluster scaler and k-means over historical interaction
    /// profiles, returning the user id to cluster label mapping.
    fn fit_clustering(
        &self,
        rng: &mut rand::rngs::StdRng,
    ) -> (StandardScaler, KMeans, HashMap<i64, usize>) {
        if self.interactions.len() < self.config.cluster_count {
            return {
                let (scaler, kmeans) = self.fit_minimal_clustering(rng);
                (scaler, kmeans, HashMap::new())
            };
        }

        let features: Vec<Vec<f32>> = self
            .interactions
            .iter()
            .map(|i| i.profile.cluster_features().to_vec())
            .collect();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&features);

        let mut kmeans = KMeans::new(self.config.cluster_count, self.config.seed);
        kmeans.fit(&scaled);

        let mut user_clusters = HashMap::new();
        for (interaction, row) in self.interactions.iter().zip(scaled.iter()) {
            if let Some(user_id) = interaction.user_id {
                user_clusters.insert(user_id, kmeans.predict(row));
            }
        }

        info!(
            profiles = features.len(),
            clusters = kmeans.cluster_count(),
            "clustered interaction history"
        );
        (scaler, kmeans, user_clusters)
    }

    /// Clustering stand-in when there is no usable history: fit over a small
    /// batch of random profiles so downstream transforms stay total.
    fn fit_minimal_clustering(&self, rng: &mut rand::rngs::StdRng) -> (StandardScaler, KMeans) {
        let profiles: Vec<Vec<f32>> = (0..20).map(|_| random_profile(rng).cluster_features().to_vec()).collect();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&profiles);
        let mut kmeans = KMeans::new(3, self.config.seed);
        kmeans.fit(&scaled);
        (scaler, kmeans)
    }

    fn real_rows(
        &self,
        store: &FeedbackStore,
        user_clusters: &HashMap<i64, usize>,
    ) -> Result<(Vec<Vec<f32>>, Vec<f32>)> {
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for event in store.all()? {
            let cluster = user_clusters.get(&event.user_id).copied().unwrap_or(0);
            rows.push(feature_vector(&event.profile, cluster as f32));
            labels.push(event.rating);
        }
        Ok((rows, labels))
    }

    /// Cross-joins interaction profiles with sampled activities. A real
    /// rating for the exact (user, activity) pair always wins over the
    /// synthetic estimate.
    fn enhanced_rows(
        &self,
        store: &FeedbackStore,
        catalog: &ActivityCatalog,
        scaler_cluster: &StandardScaler,
        kmeans: &KMeans,
        rng: &mut rand::rngs::StdRng,
    ) -> Result<(Vec<Vec<f32>>, Vec<f32>)> {
        let activities: Vec<&Activity> = catalog.iter().collect();
        let mut rows = Vec::new();
        let mut labels = Vec::new();

        for interaction in &self.interactions {
            let cluster = cluster_of(scaler_cluster, kmeans, &interaction.profile);
            let sample_size = self.config.samples_per_interaction.min(activities.len());

            for &activity in activities.choose_multiple(rng, sample_size) {
                let rating = match interaction.user_id {
                    Some(user_id) => match store.rating_for(user_id, activity.id)? {
                        Some(real) => real,
                        None => synthetic_rating(&interaction.profile, activity, rng),
                    },
                    None => synthetic_rating(&interaction.profile, activity, rng),
                };

                rows.push(feature_vector(&interaction.profile, cluster as f32));
                labels.push(rating);
            }
        }
        Ok((rows, labels))
    }

    fn fit_artifact(
        &self,
        regime: TrainingRegime,
        rows: Vec<Vec<f32>>,
        mut labels: Vec<f32>,
        scaler_cluster: StandardScaler,
        kmeans: KMeans,
        rng: &mut rand::rngs::StdRng,
    ) -> Result<ModelArtifact> {
        if rows.is_empty() {
            return Err(RecommendError::DataUnavailable(
                "no training rows".to_string(),
            ));
        }

        // A near-constant target trains a useless regressor; widen it.
        let std = label_std(&labels);
        if std < self.config.label_noise_std {
            warn!(std, "low label variance, injecting gaussian noise");
            for label in labels.iter_mut() {
                *label = (*label + gaussian(rng) * self.config.label_noise_std).clamp(1.0, 5.0);
            }
        }

        let mut scaler_rating = StandardScaler::new();
        let scaled = scaler_rating.fit_transform(&rows);

        let mut forest = RandomForestRegressor::new(
            self.config.n_estimators,
            self.config.max_depth,
            self.config.min_samples_split,
            self.config.min_samples_leaf,
            self.config.seed,
        );
        forest.fit(&scaled, &labels);

        info!(
            regime = %regime,
            rows = rows.len(),
            label_std = format!("{:.3}", label_std(&labels)),
            "rating model fitted"
        );

        Ok(ModelArtifact {
            kmeans,
            forest,
            scaler_cluster,
            scaler_rating,
            regime,
            trained_at: Utc::now(),
        })
    }
}

fn cluster_of(scaler: &StandardScaler, kmeans: &KMeans, profile: &UserProfile) -> usize {
    if !scaler.is_fitted() {
        return 0;
    }
    kmeans.predict(&scaler.transform(&profile.cluster_features()))
}

fn random_profile(rng: &mut impl Rng) -> UserProfile {
    UserProfile {
        stress: rng.gen_range(1.0..10.0),
        anxiety: rng.gen_range(1.0..10.0),
        depression: rng.gen_range(1.0..10.0),
        sleep_hours: rng.gen_range(4.0..10.0),
        steps_per_day: rng.gen_range(1000.0..15000.0),
    }
}

/// Last-resort training rows: random profiles with loosely signal-linked
/// ratings, only there to keep the regressor non-null.
fn minimal_rows(rng: &mut impl Rng) -> (Vec<Vec<f32>>, Vec<f32>) {
    let mut rows = Vec::with_capacity(50);
    let mut labels = Vec::with_capacity(50);

    for _ in 0..50 {
        let profile = random_profile(rng);
        let cluster = rng.gen_range(0..4) as f32;

        let mut rating: f32 = 3.5;
        if profile.stress > 7.0 {
            rating += 0.3;
        }
        if profile.anxiety > 7.0 {
            rating += 0.2;
        }
        if profile.depression > 7.0 {
            rating += 0.2;
        }
        rating += rng.gen_range(-0.5..0.5);

        rows.push(feature_vector(&profile, cluster));
        labels.push(rating.clamp(1.0, 5.0));
    }
    (rows, labels)
}

fn label_std(labels: &[f32]) -> f32 {
    if labels.is_empty() {
        return 0.0;
    }
    let mean = labels.iter().sum::<f32>() / labels.len() as f32;
    let variance = labels.iter().map(|l| (l - mean).powi(2)).sum::<f32>() / labels.len() as f32;
    variance.sqrt()
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut impl Rng) -> f32 {
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen::<f32>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}
