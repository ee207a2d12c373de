use std::sync::Arc;

use haven_core::Clock;
use tracing::info;

use crate::aggregator::MoodAggregator;
use crate::ledger::MoodLedger;
use crate::models::{MoodEntry, MoodSummary, Rating};
use crate::policy::MoodTemporalPolicy;
use crate::MoodResult;

/// Mood operations for one request, all evaluated against the injected clock.
pub struct MoodService {
    policy: MoodTemporalPolicy,
    ledger: Arc<dyn MoodLedger>,
    clock: Arc<dyn Clock>,
    window_days: u32,
}

impl MoodService {
    pub fn new(
        ledger: Arc<dyn MoodLedger>,
        policy: MoodTemporalPolicy,
        clock: Arc<dyn Clock>,
        window_days: u32,
    ) -> Self {
        Self {
            policy,
            ledger,
            clock,
            window_days,
        }
    }

    pub fn policy(&self) -> &MoodTemporalPolicy {
        &self.policy
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub async fn create(&self, user: &str, rating: i64) -> MoodResult<MoodEntry> {
        let rating = Rating::new(rating)?;
        let entry = self.policy.create(user, rating, self.clock.now()).await?;
        info!("Recorded mood {} for {}", entry.rating.value(), user);
        Ok(entry)
    }

    pub async fn update(&self, user: &str, id: &str, rating: i64) -> MoodResult<MoodEntry> {
        let rating = Rating::new(rating)?;
        self.ledger
            .update_rating(user, id, rating, self.clock.now())
            .await
    }

    pub async fn list_recent(&self, user: &str) -> MoodResult<Vec<MoodEntry>> {
        let (start, end) = self.policy.range_bounds(self.window_days, self.clock.now());
        self.ledger.list_range(user, start, end).await
    }

    pub async fn today(&self, user: &str) -> MoodResult<Option<MoodEntry>> {
        let day = self.policy.day_of(self.clock.now());
        self.ledger.find_by_day(user, day).await
    }

    pub async fn stats(&self, user: &str) -> MoodResult<MoodSummary> {
        let entries = self.list_recent(user).await?;
        Ok(MoodAggregator::summarize(&entries))
    }
}
