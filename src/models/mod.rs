use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Canonical catalog entry. Source records come in with inconsistent key
/// casing and missing columns; everything is normalized into this shape once
/// at load time and downstream code reads only these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: i64,
    pub activity_type: String,
    pub category: String,
    pub duration_minutes: u32,
    pub intensity: Intensity,
    pub benefits: String,
    pub short_description: String,
    pub recommended_when: String,
    pub instructions: String,
    pub tips: String,
    pub precautions: String,
    pub equipment: String,
    pub video_link: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Lenient parse; anything unrecognized lands on Medium.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Intensity::Low,
            "high" => Intensity::High,
            _ => Intensity::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request self-reported profile. Score signals live in [0, 10]; not
/// persisted unless attached to a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "Stress_Level")]
    pub stress: f32,
    #[serde(rename = "Anxiety_Score")]
    pub anxiety: f32,
    #[serde(rename = "Depression_Score")]
    pub depression: f32,
    #[serde(rename = "Sleep_Hours")]
    pub sleep_hours: f32,
    #[serde(rename = "Steps_Per_Day")]
    pub steps_per_day: f32,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            stress: 0.0,
            anxiety: 0.0,
            depression: 0.0,
            sleep_hours: 7.0,
            steps_per_day: 5000.0,
        }
    }
}

impl UserProfile {
    /// The five cluster features, in the order the clusterer is fit on.
    pub fn cluster_features(&self) -> [f32; 5] {
        [
            self.stress,
            self.anxiety,
            self.depression,
            self.sleep_hours,
            self.steps_per_day,
        ]
    }
}

/// One durable rating. At most one live row per (user_id, activity_id);
/// resubmission overwrites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackEvent {
    pub user_id: i64,
    pub activity_id: i64,
    pub rating: f32,
    pub profile: UserProfile,
    pub mood_description: String,
    pub timestamp: DateTime<Utc>,
}

/// Historical interaction row from the interactions dataset; the clustering
/// model is fit over these profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: Option<i64>,
    pub profile: UserProfile,
}

/// Training-data strategy, selected by available real-feedback volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingRegime {
    Real,
    Hybrid,
    EnhancedSynthetic,
    MinimalSynthetic,
}

impl fmt::Display for TrainingRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrainingRegime::Real => "real",
            TrainingRegime::Hybrid => "hybrid",
            TrainingRegime::EnhancedSynthetic => "enhanced_synthetic",
            TrainingRegime::MinimalSynthetic => "minimal_synthetic",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMethod {
    Content,
    Heuristic,
    Learned,
    Hybrid,
    Fallback,
}

impl fmt::Display for ScoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScoreMethod::Content => "content",
            ScoreMethod::Heuristic => "heuristic",
            ScoreMethod::Learned => "learned",
            ScoreMethod::Hybrid => "hybrid",
            ScoreMethod::Fallback => "fallback",
        };
        f.write_str(s)
    }
}

/// Formatted activity card returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    /// Display title, "{activity type} - {main benefit}".
    pub name: String,
    #[serde(rename = "type")]
    pub activity_type: String,
    pub category: String,
    pub duration: u32,
    pub intensity: String,
    pub benefits: String,
    pub one_line_description: String,
    pub recommended_when: String,
    pub instructions: String,
    pub tips: String,
    pub precautions: String,
    pub equipment: String,
    pub video_link: String,
    /// Display confidence in [65, 98].
    pub match_score: f32,
    pub match_percentage: String,
    pub method: ScoreMethod,
    /// Which merged path produced this card, when the hybrid aggregator ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Raw model rating in [1, 5] when the learned path scored this card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted_rating: Option<f32>,
}

/// Incoming recommendation request. Score signals may be given directly or
/// derived from raw assessment answers ("stress_1".."depression_10").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationRequest {
    #[serde(rename = "Stress_Level")]
    pub stress: Option<f32>,
    #[serde(rename = "Anxiety_Score")]
    pub anxiety: Option<f32>,
    #[serde(rename = "Depression_Score")]
    pub depression: Option<f32>,
    #[serde(rename = "Sleep_Hours")]
    pub sleep_hours: Option<f32>,
    #[serde(rename = "Steps_Per_Day")]
    pub steps_per_day: Option<f32>,
    pub method: Option<ScoreMethod>,
    pub top_n: Option<usize>,
    /// Raw questionnaire answers, e.g. "stress_3" -> "Often".
    #[serde(flatten)]
    pub assessment: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationResponse {
    pub assessment_scores: UserProfile,
    pub recommendations: Vec<Recommendation>,
    pub recommendations_count: usize,
    pub method: ScoreMethod,
    pub next_available_user_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub user_id: Option<i64>,
    pub activity_id: i64,
    pub rating: f32,
    #[serde(rename = "Stress_Level", alias = "stress_level")]
    pub stress: Option<f32>,
    #[serde(rename = "Anxiety_Score", alias = "anxiety_score")]
    pub anxiety: Option<f32>,
    #[serde(rename = "Depression_Score", alias = "depression_score")]
    pub depression: Option<f32>,
    #[serde(rename = "Sleep_Hours", alias = "sleep_hours")]
    pub sleep_hours: Option<f32>,
    #[serde(rename = "Steps_Per_Day", alias = "steps_per_day")]
    pub steps_per_day: Option<f32>,
    #[serde(rename = "Mood_Description", alias = "mood_description")]
    pub mood_description: Option<String>,
}

impl FeedbackRequest {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            stress: self.stress.unwrap_or(0.0),
            anxiety: self.anxiety.unwrap_or(0.0),
            depression: self.depression.unwrap_or(0.0),
            sleep_hours: self.sleep_hours.unwrap_or(7.0),
            steps_per_day: self.steps_per_day.unwrap_or(5000.0),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
}

/// Abbreviated activity view for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub duration: u32,
    pub intensity: String,
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intensity_parse_is_lenient() {
        assert_eq!(Intensity::parse("LOW"), Intensity::Low);
        assert_eq!(Intensity::parse(" high "), Intensity::High);
        assert_eq!(Intensity::parse("moderate"), Intensity::Medium);
        assert_eq!(Intensity::parse(""), Intensity::Medium);
    }

    #[test]
    fn test_cluster_feature_order() {
        let profile = UserProfile {
            stress: 1.0,
            anxiety: 2.0,
            depression: 3.0,
            sleep_hours: 4.0,
            steps_per_day: 5.0,
        };
        assert_eq!(profile.cluster_features(), [1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_regime_tag_round_trip() {
        let tag = serde_json::to_string(&TrainingRegime::EnhancedSynthetic).unwrap();
        assert_eq!(tag, "\"enhanced_synthetic\"");
        let back: TrainingRegime = serde_json::from_str(&tag).unwrap();
        assert_eq!(back, TrainingRegime::EnhancedSynthetic);
    }
}
