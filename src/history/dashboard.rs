//! Dashboard filtering and aggregation.
//!
//! Pure functions over the in-memory record list: a free-text/sentiment/role
//! filter and the aggregates the dashboard renders (totals, score trend,
//! sentiment buckets). Kept free of UI so they are testable in isolation.

use crate::history::storage::{InterviewRecord, Sentiment};
use chrono::{DateTime, Local};

/// Active dashboard filters; all three compose conjunctively.
#[derive(Debug, Clone, Default)]
pub struct DashboardFilter {
    /// Case-insensitive free text matched against role, feedback, topics, id
    pub query: String,
    /// Restrict to one sentiment; `None` means all
    pub sentiment: Option<Sentiment>,
    /// Restrict to one role; `None` means all
    pub role: Option<String>,
}

/// Aggregates over the filtered record set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Totals {
    pub count: usize,
    /// Rounded mean score; 0 when no records match
    pub average_score: u32,
    pub total_minutes: i64,
}

/// Applies the filter, preserving the input order.
pub fn filter_records<'a>(
    records: &'a [InterviewRecord],
    filter: &DashboardFilter,
) -> Vec<&'a InterviewRecord> {
    let query = filter.query.trim().to_lowercase();

    records
        .iter()
        .filter(|record| {
            let matches_query = query.is_empty()
                || record.role.to_lowercase().contains(&query)
                || record.feedback.to_lowercase().contains(&query)
                || record
                    .topics
                    .iter()
                    .any(|topic| topic.to_lowercase().contains(&query))
                || record.id.to_string().contains(&query);

            let matches_sentiment = filter
                .sentiment
                .map_or(true, |sentiment| record.sentiment == sentiment);

            let matches_role = filter
                .role
                .as_ref()
                .map_or(true, |role| &record.role == role);

            matches_query && matches_sentiment && matches_role
        })
        .collect()
}

/// Count, rounded average score, and total minutes of the filtered set.
pub fn totals(filtered: &[&InterviewRecord]) -> Totals {
    let count = filtered.len();
    let average_score = if count == 0 {
        0
    } else {
        let sum: u32 = filtered.iter().map(|r| r.score as u32).sum();
        (sum as f64 / count as f64).round() as u32
    };
    let total_minutes = filtered.iter().map(|r| r.duration_min).sum();

    Totals {
        count,
        average_score,
        total_minutes,
    }
}

/// Scores ordered by recording date ascending, for the trend view.
pub fn score_trend(filtered: &[&InterviewRecord]) -> Vec<(DateTime<Local>, u8)> {
    let mut points: Vec<_> = filtered
        .iter()
        .map(|r| (r.recorded_at, r.score))
        .collect();
    points.sort_by_key(|(date, _)| *date);
    points
}

/// How many filtered records fall into each sentiment bucket.
pub fn sentiment_buckets(filtered: &[&InterviewRecord]) -> [(Sentiment, usize); 3] {
    let count_of = |sentiment: Sentiment| {
        filtered
            .iter()
            .filter(|r| r.sentiment == sentiment)
            .count()
    };
    [
        (Sentiment::Positive, count_of(Sentiment::Positive)),
        (Sentiment::Neutral, count_of(Sentiment::Neutral)),
        (Sentiment::Negative, count_of(Sentiment::Negative)),
    ]
}

/// Distinct roles across all records, in first-seen order.
pub fn distinct_roles(records: &[InterviewRecord]) -> Vec<String> {
    let mut roles: Vec<String> = Vec::new();
    for record in records {
        if !roles.contains(&record.role) {
            roles.push(record.role.clone());
        }
    }
    roles
}
