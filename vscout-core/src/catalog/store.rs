use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OpenFlags, OptionalExtension};
use uuid::Uuid;

use crate::sqlite::configure_connection;

use super::error::{CatalogError, CatalogResult};
use super::models::{ChannelRecord, IdeaRecord, NewChannel, VideoDraft, VideoRecord};

const CATALOG_SCHEMA: &str = include_str!("../../../sql/catalog.sql");

#[derive(Debug, Clone)]
pub struct SqliteCatalogStoreBuilder {
    path: Option<PathBuf>,
    read_only: bool,
    create_if_missing: bool,
}

impl Default for SqliteCatalogStoreBuilder {
    fn default() -> Self {
        Self {
            path: None,
            read_only: false,
            create_if_missing: true,
        }
    }
}

impl SqliteCatalogStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    pub fn build(self) -> CatalogResult<SqliteCatalogStore> {
        let path = self.path.ok_or(CatalogError::MissingPath)?;
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };

        if !self.read_only && self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        Ok(SqliteCatalogStore { path, flags })
    }
}

/// Durable store for channels, their long-form uploads, and saved ideas.
/// Opens a fresh connection per operation; the upsert reconciler is the only
/// multi-statement writer and runs in a transaction.
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    path: PathBuf,
    flags: OpenFlags,
}

impl SqliteCatalogStore {
    pub fn builder() -> SqliteCatalogStoreBuilder {
        SqliteCatalogStoreBuilder::new()
    }

    pub fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        SqliteCatalogStoreBuilder::new().path(path).build()
    }

    fn open(&self) -> CatalogResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, self.flags).map_err(|source| {
            CatalogError::OpenDatabase {
                path: self.path.clone(),
                source,
            }
        })?;
        configure_connection(&conn).map_err(|source| CatalogError::OpenDatabase {
            path: self.path.clone(),
            source,
        })?;
        Ok(conn)
    }

    pub fn initialize(&self) -> CatalogResult<()> {
        let conn = self.open()?;
        conn.execute_batch(CATALOG_SCHEMA)?;
        Ok(())
    }

    pub fn add_channel(
        &self,
        channel: &NewChannel,
        now: DateTime<Utc>,
    ) -> CatalogResult<ChannelRecord> {
        let conn = self.open()?;
        let record = ChannelRecord {
            id: Uuid::new_v4().to_string(),
            youtube_id: channel.youtube_id.clone(),
            name: channel.name.clone(),
            thumbnail_url: channel.thumbnail_url.clone(),
            subscriber_count: channel.subscriber_count,
            created_at: now,
        };
        let result = conn.execute(
            "INSERT INTO channels (id, youtube_id, name, thumbnail_url, subscriber_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                record.id,
                record.youtube_id,
                record.name,
                record.thumbnail_url,
                record.subscriber_count,
                record.created_at,
            ],
        );
        match result {
            Ok(_) => Ok(record),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(CatalogError::DuplicateChannel {
                    youtube_id: channel.youtube_id.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn channel(&self, id: &str) -> CatalogResult<Option<ChannelRecord>> {
        let conn = self.open()?;
        let record = conn
            .query_row(
                "SELECT * FROM channels WHERE id = ?1",
                [id],
                ChannelRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn channel_by_external_id(&self, youtube_id: &str) -> CatalogResult<Option<ChannelRecord>> {
        let conn = self.open()?;
        let record = conn
            .query_row(
                "SELECT * FROM channels WHERE youtube_id = ?1",
                [youtube_id],
                ChannelRecord::from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn list_channels(&self) -> CatalogResult<Vec<ChannelRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT * FROM channels ORDER BY created_at DESC")?;
        let rows = stmt
            .query_map([], ChannelRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Cascades to videos and ideas through the schema's foreign keys.
    pub fn remove_channel(&self, id: &str) -> CatalogResult<()> {
        let conn = self.open()?;
        let affected = conn.execute("DELETE FROM channels WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(CatalogError::ChannelNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Overwrites display name and thumbnail with freshly resolved values.
    /// These are the only channel fields a resolution cycle may mutate.
    pub fn update_channel_profile(
        &self,
        id: &str,
        name: &str,
        thumbnail_url: Option<&str>,
    ) -> CatalogResult<()> {
        let conn = self.open()?;
        let affected = conn.execute(
            "UPDATE channels SET name = ?2, thumbnail_url = ?3 WHERE id = ?1",
            params![id, name, thumbnail_url],
        )?;
        if affected == 0 {
            return Err(CatalogError::ChannelNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Most recent fetch stamp across the channel's videos; the freshness
    /// gate's single input.
    pub fn latest_fetch_timestamp(
        &self,
        channel_id: &str,
    ) -> CatalogResult<Option<DateTime<Utc>>> {
        let conn = self.open()?;
        let stamp = conn
            .query_row(
                "SELECT fetched_at FROM videos
                 WHERE channel_id = ?1
                 ORDER BY fetched_at DESC
                 LIMIT 1",
                [channel_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stamp)
    }

    pub fn cached_videos(
        &self,
        channel_id: &str,
        min_duration_seconds: i64,
        limit: usize,
    ) -> CatalogResult<Vec<VideoRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM videos
             WHERE channel_id = ?1 AND duration_seconds >= ?2
             ORDER BY published_at DESC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(
                params![channel_id, min_duration_seconds, limit as i64],
                VideoRecord::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Idempotent merge keyed by the external video id: unseen videos are
    /// inserted with a fresh internal key and `first_seen_at`; re-observed
    /// ones keep both and get their mutable fields and `fetched_at`
    /// overwritten. Returns the stored rows in batch order.
    pub fn reconcile_videos(
        &self,
        channel_id: &str,
        drafts: &[VideoDraft],
        fetched_at: DateTime<Utc>,
    ) -> CatalogResult<Vec<VideoRecord>> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let mut records = Vec::with_capacity(drafts.len());
        for draft in drafts {
            tx.execute(
                "INSERT INTO videos (
                    id, channel_id, youtube_id, title, thumbnail_url,
                    duration_seconds, view_count, published_at, fetched_at, first_seen_at
                ) VALUES (
                    :id, :channel_id, :youtube_id, :title, :thumbnail_url,
                    :duration_seconds, :view_count, :published_at, :fetched_at, :first_seen_at
                )
                ON CONFLICT(youtube_id) DO UPDATE SET
                    title = excluded.title,
                    thumbnail_url = excluded.thumbnail_url,
                    duration_seconds = excluded.duration_seconds,
                    view_count = excluded.view_count,
                    published_at = excluded.published_at,
                    fetched_at = excluded.fetched_at",
                rusqlite::named_params! {
                    ":id": Uuid::new_v4().to_string(),
                    ":channel_id": channel_id,
                    ":youtube_id": draft.youtube_id,
                    ":title": draft.title,
                    ":thumbnail_url": draft.thumbnail_url,
                    ":duration_seconds": draft.duration_seconds,
                    ":view_count": draft.view_count,
                    ":published_at": draft.published_at,
                    ":fetched_at": fetched_at,
                    ":first_seen_at": fetched_at,
                },
            )?;
            let record = tx.query_row(
                "SELECT * FROM videos WHERE youtube_id = ?1",
                [&draft.youtube_id],
                VideoRecord::from_row,
            )?;
            records.push(record);
        }
        tx.commit()?;
        Ok(records)
    }

    pub fn save_idea(
        &self,
        video_id: &str,
        note: Option<&str>,
        now: DateTime<Utc>,
    ) -> CatalogResult<IdeaRecord> {
        let conn = self.open()?;
        let record = IdeaRecord {
            id: Uuid::new_v4().to_string(),
            video_id: video_id.to_string(),
            note: note.map(str::to_string),
            created_at: now,
        };
        let result = conn.execute(
            "INSERT INTO ideas (id, video_id, note, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![record.id, record.video_id, record.note, record.created_at],
        );
        match result {
            Ok(_) => Ok(record),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(CatalogError::VideoNotFound(video_id.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn list_ideas(&self) -> CatalogResult<Vec<IdeaRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT * FROM ideas ORDER BY created_at DESC")?;
        let rows = stmt
            .query_map([], IdeaRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn remove_idea(&self, id: &str) -> CatalogResult<()> {
        let conn = self.open()?;
        let affected = conn.execute("DELETE FROM ideas WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(CatalogError::IdeaNotFound(id.to_string()));
        }
        Ok(())
    }
}
