//! Interview history storage and retrieval using SQLite.
//!
//! Persists one record per completed practice session with timestamps, and
//! provides querying for the dashboard.

use anyhow::Result;
use chrono::{DateTime, Local};
use regex::Regex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Overall tone of a session's feedback, derived from its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    pub fn all() -> &'static [Sentiment] {
        &[Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A completed interview session in the history.
#[derive(Debug, Clone)]
pub struct InterviewRecord {
    pub id: i64,
    pub recorded_at: DateTime<Local>,
    /// Role the user was practicing for
    pub role: String,
    pub duration_min: i64,
    /// 0-100; 0 when the feedback carried no score
    pub score: u8,
    pub sentiment: Sentiment,
    pub topics: Vec<String>,
    /// Markdown feedback, all questions concatenated
    pub feedback: String,
}

/// Fields supplied when recording a newly finished session. Score and
/// sentiment are derived from the feedback text.
#[derive(Debug, Clone)]
pub struct NewInterviewRecord {
    pub role: String,
    pub duration_min: i64,
    pub topics: Vec<String>,
    pub feedback: String,
}

/// Manages the interview history database.
pub struct HistoryStore {
    /// Path to the SQLite database file
    database_path: PathBuf,
    /// Connection to the database (lazy-loaded)
    connection: Option<Connection>,
}

impl HistoryStore {
    /// Creates a history store for the given data directory.
    ///
    /// # Errors
    /// - If the data directory cannot be created
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let database_path = data_dir.join("interview_history.db");

        Ok(Self {
            database_path,
            connection: None,
        })
    }

    /// Default data directory: `~/.local/share/viva`.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    pub fn default_data_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
        Ok(home.join(".local").join("share").join("viva"))
    }

    /// Initializes database connection and creates tables if necessary.
    fn get_connection(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            let connection = Connection::open(&self.database_path)?;

            connection.execute(
                "CREATE TABLE IF NOT EXISTS interviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recorded_at TEXT NOT NULL,
                    role TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    score INTEGER NOT NULL,
                    sentiment TEXT NOT NULL,
                    topics TEXT NOT NULL,
                    feedback TEXT NOT NULL
                )",
                [],
            )?;

            self.connection = Some(connection);
        }

        Ok(self.connection.as_ref().unwrap())
    }

    /// Saves a completed session to the history database.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If insertion fails
    pub fn save_interview(&mut self, record: &NewInterviewRecord) -> Result<()> {
        let score = parse_score(&record.feedback);
        let sentiment = sentiment_for_score(score);
        let connection = self.get_connection()?;
        let timestamp = Local::now().to_rfc3339();

        connection.execute(
            "INSERT INTO interviews
                (recorded_at, role, duration_min, score, sentiment, topics, feedback)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                timestamp,
                record.role,
                record.duration_min,
                score.unwrap_or(0),
                sentiment.as_str(),
                record.topics.join(","),
                record.feedback,
            ],
        )?;

        tracing::debug!("Interview session saved to history");
        Ok(())
    }

    /// Retrieves all sessions ordered by most recent first.
    ///
    /// # Errors
    /// - If database connection fails
    /// - If query execution or timestamp parsing fails
    pub fn all_interviews(&mut self) -> Result<Vec<InterviewRecord>> {
        let connection = self.get_connection()?;

        let mut statement = connection.prepare(
            "SELECT id, recorded_at, role, duration_min, score, sentiment, topics, feedback
             FROM interviews ORDER BY recorded_at DESC",
        )?;

        let records = statement
            .query_map([], |row| {
                let id = row.get::<_, i64>(0)?;
                let timestamp_str = row.get::<_, String>(1)?;
                let role = row.get::<_, String>(2)?;
                let duration_min = row.get::<_, i64>(3)?;
                let score = row.get::<_, i64>(4)?.clamp(0, 100) as u8;
                let sentiment_str = row.get::<_, String>(5)?;
                let topics_str = row.get::<_, String>(6)?;
                let feedback = row.get::<_, String>(7)?;

                let recorded_at = DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Local))
                    .map_err(|_| {
                        rusqlite::Error::InvalidParameterName(
                            "Invalid timestamp format".to_string(),
                        )
                    })?;

                let sentiment =
                    Sentiment::from_str(&sentiment_str).unwrap_or(Sentiment::Neutral);
                let topics = topics_str
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();

                Ok(InterviewRecord {
                    id,
                    recorded_at,
                    role,
                    duration_min,
                    score,
                    sentiment,
                    topics,
                    feedback,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

/// Extracts a `Score: NN` style mark from feedback text, when present.
pub fn parse_score(feedback: &str) -> Option<u8> {
    static SCORE_RE: OnceLock<Regex> = OnceLock::new();
    let re = SCORE_RE
        .get_or_init(|| Regex::new(r"(?i)\bscore\b[^0-9]{0,10}(\d{1,3})").expect("valid regex"));

    let captures = re.captures(feedback)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    if value > 100 {
        return None;
    }
    Some(value as u8)
}

/// Maps a score to its sentiment bucket; feedback without a score is neutral.
pub fn sentiment_for_score(score: Option<u8>) -> Sentiment {
    match score {
        Some(s) if s >= 70 => Sentiment::Positive,
        Some(s) if s >= 60 => Sentiment::Neutral,
        Some(_) => Sentiment::Negative,
        None => Sentiment::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_parsed_from_common_phrasings() {
        assert_eq!(parse_score("**Score:** 74/100"), Some(74));
        assert_eq!(parse_score("Overall score - 68"), Some(68));
        assert_eq!(parse_score("score: 100"), Some(100));
        assert_eq!(parse_score("no mark here"), None);
        assert_eq!(parse_score("score: 250"), None);
    }

    #[test]
    fn sentiment_buckets_follow_score_thresholds() {
        assert_eq!(sentiment_for_score(Some(86)), Sentiment::Positive);
        assert_eq!(sentiment_for_score(Some(70)), Sentiment::Positive);
        assert_eq!(sentiment_for_score(Some(68)), Sentiment::Neutral);
        assert_eq!(sentiment_for_score(Some(59)), Sentiment::Negative);
        assert_eq!(sentiment_for_score(None), Sentiment::Neutral);
    }

    #[test]
    fn saved_interviews_round_trip_through_sqlite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = HistoryStore::new(dir.path()).expect("store");

        store
            .save_interview(&NewInterviewRecord {
                role: "Backend Engineer".to_string(),
                duration_min: 8,
                topics: vec!["API Design".to_string(), "GCP".to_string()],
                feedback: "Great answer. **Score:** 81".to_string(),
            })
            .expect("save");

        let records = store.all_interviews().expect("load");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.role, "Backend Engineer");
        assert_eq!(record.duration_min, 8);
        assert_eq!(record.score, 81);
        assert_eq!(record.sentiment, Sentiment::Positive);
        assert_eq!(record.topics, vec!["API Design", "GCP"]);
    }

    #[test]
    fn empty_topics_round_trip_as_empty_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = HistoryStore::new(dir.path()).expect("store");

        store
            .save_interview(&NewInterviewRecord {
                role: "AI Engineer".to_string(),
                duration_min: 5,
                topics: Vec::new(),
                feedback: "Unclear on vector stores.".to_string(),
            })
            .expect("save");

        let records = store.all_interviews().expect("load");
        assert!(records[0].topics.is_empty());
        assert_eq!(records[0].score, 0);
        assert_eq!(records[0].sentiment, Sentiment::Neutral);
    }
}
