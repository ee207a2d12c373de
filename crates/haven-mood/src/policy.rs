use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use haven_core::KeyedLocks;
use tracing::{debug, warn};

use crate::ledger::MoodLedger;
use crate::models::{MoodEntry, Rating};
use crate::timezone::TimezonePolicy;
use crate::{MoodError, MoodResult};

/// One mood entry per user per calendar day, plus the date arithmetic for queries.
pub struct MoodTemporalPolicy {
    ledger: Arc<dyn MoodLedger>,
    timezone: TimezonePolicy,
    locks: KeyedLocks<(String, NaiveDate)>,
}

impl MoodTemporalPolicy {
    pub fn new(ledger: Arc<dyn MoodLedger>, timezone: TimezonePolicy) -> Self {
        Self {
            ledger,
            timezone,
            locks: KeyedLocks::new(),
        }
    }

    pub fn timezone(&self) -> TimezonePolicy {
        self.timezone
    }

    pub fn day_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        self.timezone.day_of(timestamp)
    }

    /// Half-open `[start_of_day, start_of_next_day)` containing `timestamp`.
    pub fn day_bounds(&self, timestamp: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let day = self.day_of(timestamp);
        let start = self.timezone.start_of(day);
        let end = day
            .succ_opt()
            .map(|next| self.timezone.start_of(next))
            .unwrap_or(start + Duration::days(1));
        (start, end)
    }

    pub async fn can_create(&self, user: &str, timestamp: DateTime<Utc>) -> MoodResult<bool> {
        let day = self.day_of(timestamp);
        Ok(self.ledger.find_by_day(user, day).await?.is_none())
    }

    /// Check and write under one `(user, day)` critical section.
    pub async fn create(
        &self,
        user: &str,
        rating: Rating,
        timestamp: DateTime<Utc>,
    ) -> MoodResult<MoodEntry> {
        let day = self.day_of(timestamp);
        let _guard = self.locks.lock((user.to_string(), day)).await;

        if !self.can_create(user, timestamp).await? {
            warn!("Mood already recorded for {} on {}", user, day);
            return Err(MoodError::Conflict {
                user: user.to_string(),
                day,
            });
        }

        let entry = MoodEntry::new(user, rating, day, timestamp);
        self.ledger.create(&entry).await?;
        debug!("Created mood {} for {} on {}", entry.id, user, day);
        Ok(entry)
    }

    /// `[reference - days_back, reference]`
    pub fn range_bounds(
        &self,
        days_back: u32,
        reference: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (reference - Duration::days(days_back as i64), reference)
    }
}
