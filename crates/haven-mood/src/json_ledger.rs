use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use haven_core::{file_safe_name, KeyedLocks};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::ledger::{apply_rating, insert_unique, select_range, MoodLedger};
use crate::models::{MoodEntry, Rating};
use crate::{MoodError, MoodResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserMoods {
    user: String,
    #[serde(default)]
    entries: Vec<MoodEntry>,
    updated_at: DateTime<Utc>,
}

impl UserMoods {
    /// Empty document, stamped on first save.
    fn empty(user: &str) -> Self {
        Self {
            user: user.to_string(),
            entries: Vec::new(),
            updated_at: DateTime::<Utc>::default(),
        }
    }
}

/// One JSON document per user under `<root>/moods/`.
///
/// Read-modify-write cycles are serialized per user, so uniqueness checks and
/// updates never interleave.
#[derive(Debug, Clone)]
pub struct JsonFileMoodLedger {
    root: PathBuf,
    locks: KeyedLocks<String>,
}

impl JsonFileMoodLedger {
    pub async fn new(base_path: impl Into<PathBuf>) -> MoodResult<Self> {
        let base = base_path.into().to_string_lossy().to_string();
        let root = PathBuf::from(shellexpand::tilde(&base).as_ref()).join("moods");
        fs::create_dir_all(&root).await?;
        info!("JsonFileMoodLedger initialized at {:?}", root);
        Ok(Self {
            root,
            locks: KeyedLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for_user(&self, user: &str) -> PathBuf {
        self.root.join(format!("{}.json", file_safe_name(user)))
    }

    async fn load(&self, user: &str) -> MoodResult<UserMoods> {
        let path = self.path_for_user(user);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(UserMoods::empty(user)),
            Err(err) => Err(MoodError::Io(err)),
        }
    }

    /// `at` comes from the caller's clock, never the wall clock.
    async fn save(&self, moods: &mut UserMoods, at: DateTime<Utc>) -> MoodResult<()> {
        moods.updated_at = at;
        let path = self.path_for_user(&moods.user);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(moods)?;
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl MoodLedger for JsonFileMoodLedger {
    async fn create(&self, entry: &MoodEntry) -> MoodResult<()> {
        let _guard = self.locks.lock(entry.user.clone()).await;
        let mut moods = self.load(&entry.user).await?;
        insert_unique(&mut moods.entries, entry)?;
        self.save(&mut moods, entry.updated_at).await?;
        debug!("Stored mood {} for {} on {}", entry.id, entry.user, entry.day);
        Ok(())
    }

    async fn update_rating(
        &self,
        user: &str,
        id: &str,
        rating: Rating,
        now: DateTime<Utc>,
    ) -> MoodResult<MoodEntry> {
        let _guard = self.locks.lock(user.to_string()).await;
        let mut moods = self.load(user).await?;
        let updated = apply_rating(&mut moods.entries, id, rating, now)?;
        self.save(&mut moods, now).await?;
        Ok(updated)
    }

    async fn find_by_day(&self, user: &str, day: NaiveDate) -> MoodResult<Option<MoodEntry>> {
        let _guard = self.locks.lock(user.to_string()).await;
        let moods = self.load(user).await?;
        Ok(moods.entries.into_iter().find(|e| e.day == day))
    }

    async fn list_range(
        &self,
        user: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> MoodResult<Vec<MoodEntry>> {
        let _guard = self.locks.lock(user.to_string()).await;
        let moods = self.load(user).await?;
        Ok(select_range(&moods.entries, start, end))
    }
}
