use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;

use crate::models::{MoodEntry, Rating};
use crate::{MoodError, MoodResult};

/// Durable store of mood entries.
///
/// Implementations enforce `(user, day)` uniqueness on `create` themselves.
#[async_trait]
pub trait MoodLedger: Send + Sync {
    /// Fails with `Conflict` if the user already has an entry for `entry.day`.
    async fn create(&self, entry: &MoodEntry) -> MoodResult<()>;

    /// Only the owner can update; anything else is `NotFound`.
    async fn update_rating(
        &self,
        user: &str,
        id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> MoodResult<MoodEntry>;

    async fn find_by_day(&self, user: &str, day: NaiveDate) -> MoodResult<Option<MoodEntry>>;

    /// Entries with `start <= created_at <= end`, newest first.
    async fn list_range(
        &self,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MoodResult<Vec<MoodEntry>>;
}

pub(crate) fn insert_unique(entries: &mut Vec<MoodEntry>, entry: &MoodEntry) -> MoodResult<()> {
    if entries.iter().any(|e| e.day == entry.day) {
        return Err(MoodError::Conflict {
            user: entry.user.clone(),
            day: entry.day,
        });
    }
    entries.push(entry.clone());
    Ok(())
}

pub(crate) fn apply_rating(
    entries: &mut [MoodEntry],
    id: &str,
    rating: Rating,
    now: DateTime<Utc>,
) -> MoodResult<MoodEntry> {
    let entry = entries
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| MoodError::NotFound { id: id.to_string() })?;
    entry.rating = rating;
    entry.updated_at = now;
    Ok(entry.clone())
}

pub(crate) fn select_range(
    entries: &[MoodEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<MoodEntry> {
    let mut selected: Vec<MoodEntry> = entries
        .iter()
        .filter(|e| e.created_at >= start && e.created_at <= end)
        .cloned()
        .collect();
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected
}

#[derive(Debug, Default)]
pub struct InMemoryMoodLedger {
    entries: DashMap<String, Vec<MoodEntry>>,
}

impl InMemoryMoodLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, user: &str) -> usize {
        self.entries.get(user).map(|e| e.len()).unwrap_or(0)
    }
}

#[async_trait]
impl MoodLedger for InMemoryMoodLedger {
    async fn create(&self, entry: &MoodEntry) -> MoodResult<()> {
        let mut entries = self.entries.entry(entry.user.clone()).or_default();
        insert_unique(&mut entries, entry)
    }

    async fn update_rating(
        &self,
        user: &str,
        id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> MoodResult<MoodEntry> {
        match self.entries.get_mut(user) {
            Some(mut entries) => apply_rating(&mut entries, id, rating, now),
            None => Err(MoodError::NotFound { id: id.to_string() }),
        }
    }

    async fn find_by_day(&self, user: &str, day: NaiveDate) -> MoodResult<Option<MoodEntry>> {
        Ok(self
            .entries
            .get(user)
            .and_then(|entries| entries.iter().find(|e| e.day == day).cloned()))
    }

    async fn list_range(
        &self,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MoodResult<Vec<MoodEntry>> {
        Ok(self
            .entries
            .get(user)
            .map(|entries| select_range(&entries, start, end))
            .unwrap_or_default())
    }
}
