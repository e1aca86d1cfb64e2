use crate::models::{Activity, ActivitySummary, Intensity, InteractionRecord, UserProfile};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

mod formatter;

pub use formatter::ActivityFormatter;

/// Field names tried, in order, when resolving an activity id from a raw
/// record.
const ID_COLUMNS: &[&str] = &["Activity_ID", "activity_id", "ID", "id", "ActivityID"];

/// Field name candidates for each canonical column, tried in order.
const TYPE_COLUMNS: &[&str] = &["Activity_Type", "activity_type", "type", "Type"];
const CATEGORY_COLUMNS: &[&str] = &["Activity_Category", "activity_category", "category", "Category"];
const DURATION_COLUMNS: &[&str] = &["Duration_Minutes", "duration_minutes", "duration", "Duration"];
const INTENSITY_COLUMNS: &[&str] = &["Intensity_Level", "intensity_level", "intensity", "Intensity"];
const BENEFITS_COLUMNS: &[&str] = &["Benefits", "benefits"];
const DESCRIPTION_COLUMNS: &[&str] = &["Short_Description", "short_description", "description"];
const RECOMMENDED_COLUMNS: &[&str] = &["Recommended_When", "recommended_when"];
const INSTRUCTION_COLUMNS: &[&str] = &["Step_By_Step_Instructions", "instructions", "Instructions"];
const TIPS_COLUMNS: &[&str] = &["Tips", "tips"];
const PRECAUTION_COLUMNS: &[&str] = &["Precautions", "precautions"];
const EQUIPMENT_COLUMNS: &[&str] = &["Required_Equipment", "equipment", "Equipment"];
const VIDEO_COLUMNS: &[&str] = &["Video Link", "Video_Link", "VideoLink", "Video_URL", "Video URL", "video_link"];

/// Read-only catalog of wellness activities, normalized from heterogeneous
/// source records into canonical entries at load time.
#[derive(Debug, Clone)]
pub struct ActivityCatalog {
    activities: Vec<Activity>,
}

impl ActivityCatalog {
    /// Loads the catalog from a CSV file. A missing or unreadable file falls
    /// back to the built-in sample catalog so the system is never inoperable.
    pub fn load(path: &Path) -> Self {
        match Self::read_csv(path) {
            Ok(records) if !records.is_empty() => {
                let catalog = Self::from_records(records);
                info!(
                    activities = catalog.len(),
                    path = %path.display(),
                    "loaded activity catalog"
                );
                catalog
            }
            Ok(_) => {
                warn!(path = %path.display(), "activity file is empty, using sample catalog");
                Self::sample()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read activities, using sample catalog");
                Self::sample()
            }
        }
    }

    /// Normalizes raw key-value records into canonical activities. Ids are
    /// resolved over the known id column names; rows without a parseable id
    /// get their 1-based position.
    pub fn from_records(records: Vec<HashMap<String, String>>) -> Self {
        let activities = records
            .iter()
            .enumerate()
            .map(|(row_index, record)| {
                let id = resolve_id(record).unwrap_or(row_index as i64 + 1);
                Activity {
                    id,
                    activity_type: field(record, TYPE_COLUMNS).unwrap_or_else(|| "Activity".to_string()),
                    category: field(record, CATEGORY_COLUMNS).unwrap_or_else(|| "Wellness".to_string()),
                    duration_minutes: field(record, DURATION_COLUMNS)
                        .and_then(|v| v.parse::<f64>().ok())
                        .map(|v| v as u32)
                        .unwrap_or(20),
                    intensity: Intensity::parse(&field(record, INTENSITY_COLUMNS).unwrap_or_default()),
                    benefits: field(record, BENEFITS_COLUMNS).unwrap_or_default(),
                    short_description: field(record, DESCRIPTION_COLUMNS).unwrap_or_default(),
                    recommended_when: field(record, RECOMMENDED_COLUMNS)
                        .unwrap_or_else(|| "When you need mental support".to_string()),
                    instructions: field(record, INSTRUCTION_COLUMNS)
                        .unwrap_or_else(|| "Follow the guided instructions.".to_string()),
                    tips: field(record, TIPS_COLUMNS)
                        .unwrap_or_else(|| "Practice regularly for best results.".to_string()),
                    precautions: field(record, PRECAUTION_COLUMNS)
                        .unwrap_or_else(|| "Consult healthcare provider if needed.".to_string()),
                    equipment: field(record, EQUIPMENT_COLUMNS)
                        .unwrap_or_else(|| "None required".to_string()),
                    video_link: field(record, VIDEO_COLUMNS)
                        .filter(|v| {
                            let lower = v.to_lowercase();
                            lower != "none" && lower != "nan"
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self { activities }
    }

    fn read_csv(path: &Path) -> anyhow::Result<Vec<HashMap<String, String>>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = match row {
                Ok(row) => row,
                // Tolerate malformed rows rather than losing the whole file.
                Err(_) => continue,
            };
            let record: HashMap<String, String> = headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.clone(), v.trim().to_string()))
                .collect();
            records.push(record);
        }
        Ok(records)
    }

    /// Loads historical interaction profiles from a CSV file. Rows with
    /// unparseable signal values default rather than drop, matching the
    /// tolerance of the activity loader.
    pub fn load_interactions(path: &Path) -> Vec<InteractionRecord> {
        let records = match Self::read_csv(path) {
            Ok(records) => records,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not read interaction history");
                return Vec::new();
            }
        };

        let interactions: Vec<InteractionRecord> = records
            .iter()
            .map(|record| InteractionRecord {
                user_id: field(record, &["User_ID", "user_id"])
                    .and_then(|v| v.parse::<f64>().ok())
                    .map(|v| v as i64),
                profile: UserProfile {
                    stress: numeric_field(record, "Stress_Level", 0.0),
                    anxiety: numeric_field(record, "Anxiety_Score", 0.0),
                    depression: numeric_field(record, "Depression_Score", 0.0),
                    sleep_hours: numeric_field(record, "Sleep_Hours", 7.0),
                    steps_per_day: numeric_field(record, "Steps_Per_Day", 5000.0),
                },
            })
            .collect();

        info!(interactions = interactions.len(), path = %path.display(), "loaded interaction history");
        interactions
    }

    pub fn get_by_id(&self, id: i64) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    /// Total lookup for callers that must always format something. An unknown
    /// id degrades to the first catalog entry, trading correctness for
    /// availability on the read path.
    pub fn get_by_id_or_default(&self, id: i64) -> &Activity {
        self.get_by_id(id).unwrap_or(&self.activities[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn summaries(&self, limit: usize) -> Vec<ActivitySummary> {
        self.activities
            .iter()
            .take(limit)
            .map(|activity| ActivitySummary {
                id: activity.id,
                name: ActivityFormatter::title(activity),
                description: ActivityFormatter::one_line_description(activity),
                duration: activity.duration_minutes,
                intensity: activity.intensity.to_string(),
                category: activity.category.clone(),
            })
            .collect()
    }

    /// Built-in ten-activity sample catalog used when no data file is
    /// available.
    pub fn sample() -> Self {
        let entries: &[(i64, &str, &str, u32, Intensity, &str, &str, &str, &str, &str, &str, &str, &str)] = &[
            (
                1,
                "Cognitive Exercise",
                "Brain Health",
                25,
                Intensity::Medium,
                "Improves focus, enhances memory, reduces stress, boosts mood",
                "Brain training exercises to improve cognitive function and reduce stress",
                "When feeling mentally fatigued or stressed",
                "1. Choose a cognitive exercise like puzzles or memory games\n2. Set timer for 25 minutes\n3. Focus completely on the task\n4. Take short breaks if needed\n5. Track your progress",
                "Practice daily for best results, vary exercises to challenge different cognitive skills",
                "Stop if experiencing headaches, take breaks to avoid eye strain",
                "Puzzle book or cognitive training app",
                "https://www.youtube.com/watch?v=q6b6fz9Jh1A",
            ),
            (
                2,
                "Deep Breathing",
                "Stress Relief",
                10,
                Intensity::Low,
                "Reduces anxiety, lowers blood pressure, promotes relaxation, improves focus",
                "Controlled breathing techniques to calm the nervous system",
                "When feeling anxious or overwhelmed",
                "1. Sit comfortably with straight back\n2. Inhale deeply through nose for 4 counts\n3. Hold breath for 4 counts\n4. Exhale slowly through mouth for 6 counts\n5. Repeat for 10 minutes",
                "Practice in quiet environment, focus on belly breathing",
                "Stop if feeling dizzy",
                "None",
                "https://www.youtube.com/watch?v=tEmt1Znux58",
            ),
            (
                3,
                "Mindful Walking",
                "Mindfulness",
                20,
                Intensity::Low,
                "Reduces stress, improves mood, increases mindfulness, connects with nature",
                "Walking meditation to bring awareness to the present moment",
                "When feeling disconnected or need mental clarity",
                "1. Walk at natural pace\n2. Notice sensations in feet\n3. Pay attention to breathing\n4. Observe surroundings without judgment\n5. Continue for 20 minutes",
                "Walk in nature if possible, leave phone behind",
                "Stay aware of surroundings",
                "Comfortable shoes",
                "https://www.youtube.com/watch?v=5TiGackg35s",
            ),
            (
                4,
                "Progressive Muscle Relaxation",
                "Anxiety Relief",
                15,
                Intensity::Low,
                "Releases tension, reduces anxiety symptoms, promotes better sleep",
                "Systematic tensing and relaxing of muscle groups to relieve tension",
                "When feeling physically tense or anxious",
                "1. Lie down comfortably\n2. Tense feet muscles for 5 seconds\n3. Release and notice relaxation\n4. Move upward through body\n5. End with facial muscles",
                "Practice before bed for better sleep",
                "Avoid over-tensing",
                "Yoga mat or comfortable surface",
                "https://www.youtube.com/watch?v=86HUcX8ZtAk",
            ),
            (
                5,
                "Gratitude Journaling",
                "Positive Psychology",
                10,
                Intensity::Low,
                "Increases happiness, reduces depression, improves outlook on life",
                "Writing down things you are grateful for to boost positivity",
                "When feeling negative or pessimistic",
                "1. Write date and time\n2. List 3 specific things grateful for\n3. Describe why grateful for each\n4. Reflect on feelings",
                "Be specific rather than general",
                "None",
                "Journal and pen",
                "https://www.youtube.com/watch?v=WPPPFqsECz0",
            ),
            (
                6,
                "Gentle Yoga",
                "Stress Management",
                20,
                Intensity::Medium,
                "Reduces stress, improves flexibility, increases body awareness",
                "Gentle yoga poses to relax body and calm mind",
                "When feeling stiff or mentally fatigued",
                "1. Start with child pose\n2. Move to cat-cow\n3. Practice downward dog\n4. End with corpse pose\n5. Focus on deep breathing",
                "Move slowly and mindfully",
                "Modify poses as needed",
                "Yoga mat",
                "https://www.youtube.com/watch?v=v7AYKMP6rOE",
            ),
            (
                7,
                "Guided Meditation",
                "Meditation",
                15,
                Intensity::Low,
                "Reduces anxiety, improves focus, promotes emotional health",
                "Audio-guided meditation for relaxation and mindfulness",
                "When mind is racing or anxious",
                "1. Find quiet space\n2. Follow guided audio\n3. Focus on breath\n4. Observe thoughts without judgment",
                "Use headphones for better immersion",
                "Stop if feeling uncomfortable",
                "Headphones (optional)",
                "https://www.youtube.com/watch?v=inpok4MKVLM",
            ),
            (
                8,
                "Nature Connection",
                "Eco Therapy",
                30,
                Intensity::Low,
                "Reduces stress, improves mood, increases vitamin D, connects with nature",
                "Spending time in nature to reduce stress and improve wellbeing",
                "When feeling indoor fatigue or disconnected",
                "1. Go to park or natural area\n2. Leave devices behind\n3. Engage all five senses\n4. Walk slowly and mindfully",
                "Touch plants gently, listen to natural sounds",
                "Be aware of allergies",
                "None",
                "https://www.youtube.com/watch?v=iwQkHQmB-6s",
            ),
            (
                9,
                "Dance Movement",
                "Mood Enhancement",
                15,
                Intensity::High,
                "Boosts mood, increases energy, reduces stress, improves coordination",
                "Free-form dance to music for emotional expression and mood boost",
                "When feeling low energy or need mood lift",
                "1. Play favorite music\n2. Start with simple movements\n3. Gradually increase intensity\n4. Express emotions through movement",
                "No need to be perfect, focus on enjoyment",
                "Clear space for safety",
                "Music player",
                "https://www.youtube.com/watch?v=Zy6vBxqlapw",
            ),
            (
                10,
                "Self-Compassion Break",
                "Emotional Health",
                5,
                Intensity::Low,
                "Reduces self-criticism, increases self-worth, improves emotional resilience",
                "Brief practice of self-kindness during difficult moments",
                "When being self-critical or experiencing shame",
                "1. Place hand on heart\n2. Acknowledge your suffering\n3. Remind yourself all humans suffer\n4. Offer kind words to yourself",
                "Use loving-kindness phrases",
                "None",
                "None",
                "https://www.youtube.com/watch?v=IvtZBUSplr4",
            ),
        ];

        let activities = entries
            .iter()
            .map(
                |&(
                    id,
                    activity_type,
                    category,
                    duration,
                    intensity,
                    benefits,
                    short_description,
                    recommended_when,
                    instructions,
                    tips,
                    precautions,
                    equipment,
                    video_link,
                )| Activity {
                    id,
                    activity_type: activity_type.to_string(),
                    category: category.to_string(),
                    duration_minutes: duration,
                    intensity,
                    benefits: benefits.to_string(),
                    short_description: short_description.to_string(),
                    recommended_when: recommended_when.to_string(),
                    instructions: instructions.to_string(),
                    tips: tips.to_string(),
                    precautions: precautions.to_string(),
                    equipment: equipment.to_string(),
                    video_link: if video_link == "None" {
                        String::new()
                    } else {
                        video_link.to_string()
                    },
                },
            )
            .collect();

        Self { activities }
    }
}

fn field(record: &HashMap<String, String>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|&name| record.get(name))
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn numeric_field(record: &HashMap<String, String>, name: &str, default: f32) -> f32 {
    record
        .get(name)
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn resolve_id(record: &HashMap<String, String>) -> Option<i64> {
    ID_COLUMNS
        .iter()
        .filter_map(|&name| record.get(name))
        .find_map(|v| v.trim().parse::<f64>().ok())
        .map(|v| v as i64)
}
