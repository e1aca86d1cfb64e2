use crate::models::{Activity, Intensity, UserProfile};
use rand::Rng;

/// Rule-based rating estimate for a (profile, activity) pair, used wherever
/// a real rating is missing. Starts at 3.0, accumulates signal-weighted
/// adjustments plus a small jitter, and clamps to the rating scale.
pub fn synthetic_rating<R: Rng>(profile: &UserProfile, activity: &Activity, rng: &mut R) -> f32 {
    let benefits = activity.benefits.to_lowercase();
    let activity_type = activity.activity_type.to_lowercase();
    let duration = activity.duration_minutes as f32;

    let base_rating = 3.0;
    let mut adjustment = 0.0;

    // Elevated signals above 7 push their own matches a little harder.
    let stress_weight = if profile.stress > 7.0 { 1.2 } else { 1.0 };
    let anxiety_weight = if profile.anxiety > 7.0 { 1.3 } else { 1.0 };
    let depression_weight = if profile.depression > 7.0 { 1.1 } else { 1.0 };

    if benefits.contains("stress") && profile.stress > 5.0 {
        adjustment += (profile.stress - 5.0) * 0.1 * stress_weight;
    }
    if benefits.contains("anxiety") && profile.anxiety > 5.0 {
        adjustment += (profile.anxiety - 5.0) * 0.12 * anxiety_weight;
    }
    if benefits.contains("depression") && profile.depression > 5.0 {
        adjustment += (profile.depression - 5.0) * 0.1 * depression_weight;
    }
    if benefits.contains("mood") && profile.depression > 4.0 {
        adjustment += 0.3;
    }
    if benefits.contains("sleep") && profile.sleep_hours < 6.0 {
        adjustment += 0.4;
    }
    if benefits.contains("energy") && profile.steps_per_day < 4000.0 {
        adjustment += 0.3;
    }

    if activity_type.contains("meditation") && profile.anxiety > 6.0 {
        adjustment += 0.5;
    }
    if activity_type.contains("yoga") && profile.stress > 5.0 {
        adjustment += 0.4;
    }
    if activity_type.contains("exercise") && profile.depression > 5.0 {
        adjustment += 0.4;
    }
    if activity_type.contains("breathing") && (profile.anxiety > 6.0 || profile.stress > 6.0) {
        adjustment += 0.5;
    }

    // Short-sleep users rate long activities down; very active users rate
    // very short ones down. Asymmetric thresholds, kept as observed in
    // collected ratings.
    if profile.sleep_hours < 6.0 && duration > 30.0 {
        adjustment -= 0.3;
    }
    if profile.steps_per_day > 10000.0 && duration < 15.0 {
        adjustment -= 0.2;
    }

    if activity.intensity == Intensity::High && (profile.stress > 8.0 || profile.anxiety > 8.0) {
        adjustment -= 0.4;
    }
    if activity.intensity == Intensity::Low && profile.depression > 7.0 {
        adjustment -= 0.2;
    }

    adjustment += rng.gen_range(-0.2..=0.2);

    let rating = (base_rating + adjustment).clamp(1.0, 5.0);
    (rating * 100.0).round() / 100.0
}
