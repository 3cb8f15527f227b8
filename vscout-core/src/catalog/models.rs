use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked competitor channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelRecord {
    pub id: String,
    pub youtube_id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl ChannelRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            youtube_id: row.get("youtube_id")?,
            name: row.get("name")?,
            thumbnail_url: row.get("thumbnail_url")?,
            subscriber_count: row.get("subscriber_count")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Channel insert payload, built from a resolved profile.
#[derive(Debug, Clone)]
pub struct NewChannel {
    pub youtube_id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<i64>,
}

/// A stored long-form upload. `youtube_id` is the reconciliation key; `id`
/// and `first_seen_at` survive every re-fetch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    pub id: String,
    pub channel_id: String,
    pub youtube_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i64,
    pub view_count: i64,
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
    pub first_seen_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            channel_id: row.get("channel_id")?,
            youtube_id: row.get("youtube_id")?,
            title: row.get("title")?,
            thumbnail_url: row.get("thumbnail_url")?,
            duration_seconds: row.get("duration_seconds")?,
            view_count: row.get("view_count")?,
            published_at: row.get("published_at")?,
            fetched_at: row.get("fetched_at")?,
            first_seen_at: row.get("first_seen_at")?,
        })
    }
}

/// A classified video waiting to be reconciled into the catalog. Owning
/// channel and fetch stamp are supplied by the reconciler for the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDraft {
    pub youtube_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: i64,
    pub view_count: i64,
    pub published_at: DateTime<Utc>,
}

impl VideoDraft {
    /// Request-scoped record for the availability path when persistence
    /// failed; never written to the catalog.
    pub fn into_transient_record(
        self,
        channel_id: &str,
        fetched_at: DateTime<Utc>,
    ) -> VideoRecord {
        VideoRecord {
            id: Uuid::new_v4().to_string(),
            channel_id: channel_id.to_string(),
            youtube_id: self.youtube_id,
            title: self.title,
            thumbnail_url: self.thumbnail_url,
            duration_seconds: self.duration_seconds,
            view_count: self.view_count,
            published_at: self.published_at,
            fetched_at,
            first_seen_at: fetched_at,
        }
    }
}

/// A saved idea referencing a stored video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IdeaRecord {
    pub id: String,
    pub video_id: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IdeaRecord {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            video_id: row.get("video_id")?,
            note: row.get("note")?,
            created_at: row.get("created_at")?,
        })
    }
}
