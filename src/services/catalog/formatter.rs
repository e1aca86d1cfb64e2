use crate::models::{Activity, Recommendation, ScoreMethod};
use crate::utils::clamp;

/// Benefit keywords mapped to display categories, checked in order against
/// the lowercased benefits text.
const BENEFIT_KEYWORDS: &[(&str, &str)] = &[
    ("stress", "Stress Relief"),
    ("anxiety", "Anxiety Reduction"),
    ("depress", "Mood Enhancement"),
    ("mood", "Mood Boost"),
    ("sleep", "Sleep Improvement"),
    ("energy", "Energy Boost"),
    ("focus", "Focus Improvement"),
    ("relax", "Relaxation"),
    ("calm", "Calmness"),
    ("tension", "Tension Release"),
    ("peace", "Inner Peace"),
    ("happiness", "Happiness"),
    ("motivation", "Motivation"),
    ("clarity", "Mental Clarity"),
];

const DEFAULT_BENEFITS: &str = "- Promotes mental wellness\n- Reduces stress\n- Improves mood";

/// Turns canonical activities into display cards: title, one-line
/// description, bulleted benefits, match percentage.
pub struct ActivityFormatter;

impl ActivityFormatter {
    /// Card title in the form "Activity Type - Main Benefit".
    pub fn title(activity: &Activity) -> String {
        // Strip an existing suffix so titles never carry two dashes.
        let activity_type = activity
            .activity_type
            .split(" - ")
            .next()
            .unwrap_or(&activity.activity_type)
            .trim();
        format!("{} - {}", activity_type, Self::main_benefit(&activity.benefits))
    }

    /// First matching benefit keyword wins; no match means "General Wellness".
    pub fn main_benefit(benefits: &str) -> &'static str {
        let lower = benefits.to_lowercase();
        BENEFIT_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|&(_, category)| category)
            .unwrap_or("General Wellness")
    }

    /// One sentence about the activity itself. Prefers a substantive short
    /// description, then the first long-enough benefits sentence, then a
    /// default keyed off the activity type.
    pub fn one_line_description(activity: &Activity) -> String {
        let short = activity.short_description.trim();
        if short.len() > 20 {
            return short.to_string();
        }

        let benefits = activity.benefits.replace([';', ':'], ".");
        for sentence in benefits.split('.') {
            let sentence = sentence.trim().trim_matches(['-', '•', '*', ' ']);
            if sentence.len() > 15 {
                return sentence.to_string();
            }
        }

        let type_lower = activity.activity_type.to_lowercase();
        let default = if type_lower.contains("breath") {
            "Deep breathing techniques to calm your nervous system"
        } else if type_lower.contains("meditat") {
            "Mindfulness meditation practice for inner peace"
        } else if type_lower.contains("exercise") {
            "Cognitive exercises to improve mental function"
        } else if type_lower.contains("yoga") {
            "Gentle yoga poses for relaxation and flexibility"
        } else if type_lower.contains("walk") {
            "Mindful walking to connect with the present moment"
        } else if type_lower.contains("journal") {
            "Writing practice to cultivate gratitude and positivity"
        } else if type_lower.contains("dance") {
            "Free movement to express emotions and boost energy"
        } else if type_lower.contains("nature") {
            "Connecting with nature to reduce stress and improve mood"
        } else {
            return format!(
                "{} activity for overall mental wellbeing",
                activity.activity_type
            );
        };
        default.to_string()
    }

    /// Benefits as a bulleted list, at most five bullets; empty text gets a
    /// generic default so the card never renders blank.
    pub fn bulleted_benefits(benefits: &str) -> String {
        let cleaned = benefits.replace([';', ':'], ".");
        let bullets: Vec<String> = cleaned
            .split('.')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(5)
            .map(|s| format!("- {s}"))
            .collect();

        if bullets.is_empty() {
            DEFAULT_BENEFITS.to_string()
        } else {
            bullets.join("\n")
        }
    }

    /// Video link for the card, substituting a YouTube search when the
    /// catalog has none.
    pub fn video_link(activity: &Activity) -> String {
        let link = activity.video_link.trim();
        if !link.is_empty() {
            return link.to_string();
        }
        let query = activity.activity_type.replace(' ', "+");
        format!("https://www.youtube.com/results?search_query={query}+mental+health")
    }

    /// Full display card. The match score is clamped into the display band.
    pub fn format(activity: &Activity, match_score: f32, method: ScoreMethod) -> Recommendation {
        let match_score = clamp(match_score, 65.0, 98.0);

        Recommendation {
            id: activity.id,
            name: Self::title(activity),
            activity_type: activity
                .activity_type
                .split(" - ")
                .next()
                .unwrap_or(&activity.activity_type)
                .trim()
                .to_string(),
            category: activity.category.clone(),
            duration: activity.duration_minutes,
            intensity: activity.intensity.to_string(),
            benefits: Self::bulleted_benefits(&activity.benefits),
            one_line_description: Self::one_line_description(activity),
            recommended_when: activity.recommended_when.clone(),
            instructions: activity.instructions.clone(),
            tips: activity.tips.clone(),
            precautions: activity.precautions.clone(),
            equipment: activity.equipment.clone(),
            video_link: Self::video_link(activity),
            match_score,
            match_percentage: format!("{match_score:.1}%"),
            method,
            source: None,
            predicted_rating: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intensity;

    fn bare_activity() -> Activity {
        Activity {
            id: 1,
            activity_type: "Box Breathing".to_string(),
            category: "Wellness".to_string(),
            duration_minutes: 20,
            intensity: Intensity::Medium,
            benefits: String::new(),
            short_description: String::new(),
            recommended_when: String::new(),
            instructions: String::new(),
            tips: String::new(),
            precautions: String::new(),
            equipment: String::new(),
            video_link: String::new(),
        }
    }

    #[test]
    fn test_main_benefit_priority_order() {
        assert_eq!(
            ActivityFormatter::main_benefit("improves mood, reduces stress"),
            "Stress Relief"
        );
        assert_eq!(ActivityFormatter::main_benefit("boosts mood"), "Mood Boost");
        assert_eq!(ActivityFormatter::main_benefit(""), "General Wellness");
    }

    #[test]
    fn test_empty_benefits_never_breaks_card() {
        let card = ActivityFormatter::format(&bare_activity(), 80.0, ScoreMethod::Heuristic);
        assert_eq!(card.name, "Box Breathing - General Wellness");
        assert_eq!(
            card.benefits,
            "- Promotes mental wellness\n- Reduces stress\n- Improves mood"
        );
        assert_eq!(
            card.one_line_description,
            "Deep breathing techniques to calm your nervous system"
        );
    }

    #[test]
    fn test_missing_video_gets_search_link() {
        let card = ActivityFormatter::format(&bare_activity(), 80.0, ScoreMethod::Content);
        assert_eq!(
            card.video_link,
            "https://www.youtube.com/results?search_query=Box+Breathing+mental+health"
        );
    }

    #[test]
    fn test_title_strips_existing_dash_suffix() {
        let mut activity = bare_activity();
        activity.activity_type = "Yoga - Morning Flow".to_string();
        activity.benefits = "reduces stress".to_string();
        assert_eq!(ActivityFormatter::title(&activity), "Yoga - Stress Relief");
    }

    #[test]
    fn test_match_score_clamped_to_display_band() {
        let card = ActivityFormatter::format(&bare_activity(), 120.0, ScoreMethod::Hybrid);
        assert_eq!(card.match_score, 98.0);
        assert_eq!(card.match_percentage, "98.0%");

        let card = ActivityFormatter::format(&bare_activity(), 10.0, ScoreMethod::Hybrid);
        assert_eq!(card.match_score, 65.0);
    }

    #[test]
    fn test_bulleted_benefits_caps_at_five() {
        let text = "one benefit here; two benefit here; three benefit here; four benefit here; five benefit here; six benefit here";
        let bullets = ActivityFormatter::bulleted_benefits(text);
        assert_eq!(bullets.lines().count(), 5);
        assert!(bullets.lines().all(|l| l.starts_with("- ")));
    }
}
