use crate::error::Result;
use crate::models::{FeedbackEvent, UserProfile};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

/// Durable log of activity ratings, one live row per (user_id, activity_id).
/// This is the source of truth for retraining and for learning insights.
pub struct FeedbackStore {
    conn: Mutex<Connection>,
    /// Guards read-max-then-increment user id allocation, so two concurrent
    /// submissions cannot claim the same id.
    allocation_lock: Mutex<()>,
}

impl FeedbackStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            // Missing data directory is not an error worth failing startup over.
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!(path = %path.display(), "feedback store ready");
        Ok(Self {
            conn: Mutex::new(conn),
            allocation_lock: Mutex::new(()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            allocation_lock: Mutex::new(()),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS activity_ratings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                activity_id INTEGER NOT NULL,
                rating REAL NOT NULL,
                stress_level REAL,
                anxiety_score REAL,
                depression_score REAL,
                sleep_hours REAL,
                steps_per_day REAL,
                mood_description TEXT,
                timestamp TEXT NOT NULL,
                UNIQUE(user_id, activity_id)
            );
            CREATE INDEX IF NOT EXISTS idx_user_activity
                ON activity_ratings(user_id, activity_id);
            CREATE INDEX IF NOT EXISTS idx_activity
                ON activity_ratings(activity_id);",
        )?;
        Ok(())
    }

    /// Inserts or replaces the rating for (user_id, activity_id). When no
    /// user id is given, one is allocated as max existing + 1 under the
    /// allocation lock. Returns the user id the row was stored under.
    pub fn upsert(
        &self,
        user_id: Option<i64>,
        activity_id: i64,
        rating: f32,
        profile: &UserProfile,
        mood_description: &str,
    ) -> Result<i64> {
        let _guard = self.allocation_lock.lock();

        let user_id = match user_id {
            Some(id) => id,
            None => self.next_user_id_locked()?,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO activity_ratings
             (user_id, activity_id, rating, stress_level, anxiety_score,
              depression_score, sleep_hours, steps_per_day, mood_description, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user_id,
                activity_id,
                rating as f64,
                profile.stress as f64,
                profile.anxiety as f64,
                profile.depression as f64,
                profile.sleep_hours as f64,
                profile.steps_per_day as f64,
                mood_description,
                Utc::now().to_rfc3339(),
            ],
        )?;

        info!(user_id, activity_id, rating, "stored feedback rating");
        Ok(user_id)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM activity_ratings", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Feedback rows newer than the given instant, used for the retrain
    /// trigger.
    pub fn count_newer_than(&self, since: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM activity_ratings WHERE timestamp > ?1",
            params![since.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// All ratings, most recent first.
    pub fn all(&self) -> Result<Vec<FeedbackEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id, activity_id, rating, stress_level, anxiety_score,
                    depression_score, sleep_hours, steps_per_day, mood_description, timestamp
             FROM activity_ratings
             ORDER BY timestamp DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let timestamp: String = row.get(9)?;
            Ok(FeedbackEvent {
                user_id: row.get(0)?,
                activity_id: row.get(1)?,
                rating: row.get::<_, f64>(2)? as f32,
                profile: UserProfile {
                    stress: row.get::<_, f64>(3)? as f32,
                    anxiety: row.get::<_, f64>(4)? as f32,
                    depression: row.get::<_, f64>(5)? as f32,
                    sleep_hours: row.get::<_, f64>(6)? as f32,
                    steps_per_day: row.get::<_, f64>(7)? as f32,
                },
                mood_description: row.get(8)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut events = Vec::new();
        for event in rows {
            events.push(event?);
        }
        Ok(events)
    }

    pub fn rating_for(&self, user_id: i64, activity_id: i64) -> Result<Option<f32>> {
        let conn = self.conn.lock();
        let rating: Option<f64> = conn
            .query_row(
                "SELECT rating FROM activity_ratings WHERE user_id = ?1 AND activity_id = ?2",
                params![user_id, activity_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rating.map(|r| r as f32))
    }

    /// Per-activity (mean rating, rating count), highest mean first.
    pub fn activity_aggregates(&self) -> Result<Vec<(i64, f32, usize)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT activity_id, AVG(rating), COUNT(*)
             FROM activity_ratings
             GROUP BY activity_id
             ORDER BY AVG(rating) DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, f64>(1)? as f32,
                row.get::<_, i64>(2)? as usize,
            ))
        })?;

        let mut aggregates = Vec::new();
        for row in rows {
            aggregates.push(row?);
        }
        Ok(aggregates)
    }

    /// Next user id: max existing + 1, or 1 on an empty store.
    pub fn next_user_id(&self) -> Result<i64> {
        let _guard = self.allocation_lock.lock();
        self.next_user_id_locked()
    }

    fn next_user_id_locked(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let max_id: Option<i64> = conn.query_row(
            "SELECT MAX(user_id) FROM activity_ratings",
            [],
            |row| row.get(0),
        )?;
        Ok(max_id.unwrap_or(0) + 1)
    }
}

/// Segment filter for per-profile-group reporting.
#[derive(Debug, Clone, Copy)]
pub enum Segment {
    HighStress,
    HighAnxiety,
    HighDepression,
}

impl FeedbackStore {
    /// Per-activity mean ratings within a high-signal user segment
    /// (signal > 7), highest mean first.
    pub fn segment_aggregates(&self, segment: Segment) -> Result<Vec<(i64, f32, usize)>> {
        let column = match segment {
            Segment::HighStress => "stress_level",
            Segment::HighAnxiety => "anxiety_score",
            Segment::HighDepression => "depression_score",
        };
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT activity_id, AVG(rating), COUNT(*)
             FROM activity_ratings
             WHERE {column} > 7
             GROUP BY activity_id
             ORDER BY AVG(rating) DESC"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, f64>(1)? as f32,
                row.get::<_, i64>(2)? as usize,
            ))
        })?;

        let mut aggregates = Vec::new();
        for row in rows {
            aggregates.push(row?);
        }
        Ok(aggregates)
    }

    /// Logs a short learning report: top-rated activities overall and what
    /// works for high-signal segments. Skipped below five ratings, where the
    /// aggregates are mostly noise.
    pub fn log_learning_insights(&self, catalog: &crate::services::catalog::ActivityCatalog) {
        let total = match self.count() {
            Ok(total) if total >= 5 => total,
            _ => return,
        };

        info!(ratings = total, "learning insights from accumulated feedback");

        if let Ok(aggregates) = self.activity_aggregates() {
            let overall_mean = aggregates
                .iter()
                .map(|(_, mean, count)| mean * *count as f32)
                .sum::<f32>()
                / total as f32;
            if let Some((activity_id, _, count)) =
                aggregates.iter().max_by_key(|(_, _, count)| *count)
            {
                info!(
                    overall_mean = format!("{overall_mean:.2}"),
                    most_rated_activity = activity_id,
                    most_rated_count = count,
                    "rating distribution"
                );
            }
        }

        if let Ok(aggregates) = self.activity_aggregates() {
            for (activity_id, mean, count) in
                aggregates.iter().filter(|(_, _, count)| *count >= 2).take(5)
            {
                let name = catalog
                    .get_by_id(*activity_id)
                    .map(|a| a.activity_type.clone())
                    .unwrap_or_else(|| format!("Activity {activity_id}"));
                info!(activity = %name, mean_rating = format!("{mean:.2}"), count, "top rated");
            }
        }

        for (segment, label) in [
            (Segment::HighAnxiety, "high anxiety"),
            (Segment::HighStress, "high stress"),
        ] {
            if let Ok(aggregates) = self.segment_aggregates(segment) {
                for (activity_id, mean, _) in aggregates.iter().take(3) {
                    let name = catalog
                        .get_by_id(*activity_id)
                        .map(|a| a.activity_type.clone())
                        .unwrap_or_else(|| format!("Activity {activity_id}"));
                    info!(segment = label, activity = %name, mean_rating = format!("{mean:.2}"), "segment favorite");
                }
            }
        }
    }
}
