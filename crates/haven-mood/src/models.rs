use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{MoodError, MoodResult};

/// A mood rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Out-of-range values are rejected, never clamped.
    pub fn new(value: i64) -> MoodResult<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(MoodError::validation(
                "rating",
                format!("must be an integer between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = MoodError;

    fn try_from(value: i64) -> MoodResult<Self> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoodEntry {
    pub id: String,
    pub user: String,
    pub rating: Rating,
    pub day: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MoodEntry {
    pub fn new(user: impl Into<String>, rating: Rating, day: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user: user.into(),
            rating,
            day,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoodSummary {
    pub average: f64,
    pub total: usize,
    pub distribution: BTreeMap<u8, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bounds() {
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(5).unwrap().value(), 5);

        for bad in [0, 6, -1, 255, 261] {
            match Rating::new(bad) {
                Err(MoodError::Validation { field, .. }) => assert_eq!(field, "rating"),
                other => panic!("expected validation error for {}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_entry_json_shape() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let entry = MoodEntry::new("u1", Rating::new(4).unwrap(), day, Utc::now());
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["rating"], 4);
        assert_eq!(json["day"], "2024-02-29");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_some());

        let mut bad = json.clone();
        bad["rating"] = serde_json::json!(9);
        assert!(serde_json::from_value::<MoodEntry>(bad).is_err());
    }
}
