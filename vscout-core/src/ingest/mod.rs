pub mod error;
pub mod resolve;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::catalog::{SqliteCatalogStore, VideoDraft, VideoRecord};
use crate::clock::Clock;
use crate::identifier::ChannelIdentifier;
use crate::youtube::duration::decode_iso8601_duration;
use crate::youtube::{VideoDetail, VideoPlatform};

pub use error::{IngestError, IngestResult};
pub use resolve::resolve_channel;

/// Stored videos younger than this are served without a remote fetch.
pub const CACHE_TTL_HOURS: i64 = 24;
/// Anything strictly shorter is short-form and never reaches the catalog.
pub const SHORT_FORM_MAX_SECONDS: i64 = 180;
/// Single uploads-feed page, provider maximum.
pub const UPLOADS_PAGE_SIZE: u32 = 50;
/// Response contract: newest first, at most this many.
pub const RESPONSE_LIMIT: usize = 20;

/// Inbound ingestion request from the UI collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequest {
    /// Internal catalog key of the tracked channel.
    pub channel_key: String,
    /// The stored external identifier (canonical id or bare handle).
    pub external_id: String,
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub videos: Vec<VideoRecord>,
    pub cached: bool,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    UseCache,
    MustFetch,
}

/// The freshness gate. Concurrent requests may both see `MustFetch`; that is
/// accepted, the reconciler converges duplicate writers.
pub fn freshness_decision(
    latest_fetch: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    force_refresh: bool,
) -> CacheDecision {
    if force_refresh {
        return CacheDecision::MustFetch;
    }
    match latest_fetch {
        Some(stamp) if now - stamp < Duration::hours(CACHE_TTL_HOURS) => CacheDecision::UseCache,
        _ => CacheDecision::MustFetch,
    }
}

/// Keep exactly the uploads that meet the long-form threshold.
pub fn is_long_form(duration_seconds: i64) -> bool {
    duration_seconds >= SHORT_FORM_MAX_SECONDS
}

/// Stateless per request; safe to share across tasks and channels. All
/// collaborators are injected so tests can run against fakes.
pub struct Ingestor {
    store: SqliteCatalogStore,
    platform: Arc<dyn VideoPlatform>,
    clock: Arc<dyn Clock>,
}

impl Ingestor {
    pub fn new(
        store: SqliteCatalogStore,
        platform: Arc<dyn VideoPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            platform,
            clock,
        }
    }

    /// One full ingestion cycle: gate check, then either the cached short
    /// path or resolve → enumerate → aggregate → classify → reconcile →
    /// assemble.
    pub async fn fetch_channel_videos(&self, request: &FetchRequest) -> IngestResult<FetchOutcome> {
        if request.channel_key.trim().is_empty() || request.external_id.trim().is_empty() {
            return Err(IngestError::InvalidRequest(
                "channel_key and external_id are required".to_string(),
            ));
        }

        let now = self.clock.now();
        let latest = self.store.latest_fetch_timestamp(&request.channel_key)?;
        if freshness_decision(latest, now, request.force_refresh) == CacheDecision::UseCache {
            let videos = self.store.cached_videos(
                &request.channel_key,
                SHORT_FORM_MAX_SECONDS,
                RESPONSE_LIMIT,
            )?;
            return Ok(FetchOutcome {
                videos,
                cached: true,
                fetched_at: latest.unwrap_or(now),
            });
        }

        let identifier = ChannelIdentifier::from_stored(&request.external_id);
        let profile = resolve::resolve_channel(self.platform.as_ref(), &identifier).await?;

        // The catalog always reflects the provider's latest metadata, not
        // whatever identifier the user originally typed.
        if let Err(error) = self.store.update_channel_profile(
            &request.channel_key,
            &profile.title,
            profile.thumbnail_url.as_deref(),
        ) {
            warn!(channel = %request.channel_key, %error, "channel profile refresh failed");
        }

        let upload_ids = self
            .platform
            .playlist_video_ids(&profile.uploads_playlist_id, UPLOADS_PAGE_SIZE)
            .await?;
        if upload_ids.is_empty() {
            // "No uploads" is a valid terminal state, not an error.
            return Ok(FetchOutcome {
                videos: Vec::new(),
                cached: false,
                fetched_at: now,
            });
        }

        let details = self.platform.video_details(&upload_ids).await?;
        let drafts = classify_details(details);

        let videos = match self
            .store
            .reconcile_videos(&request.channel_key, &drafts, now)
        {
            Ok(records) => records,
            Err(error) => {
                // Availability over durability: the caller still gets the
                // freshly fetched batch even when the write failed.
                warn!(
                    channel = %request.channel_key,
                    count = drafts.len(),
                    %error,
                    "video reconciliation failed, returning unpersisted batch"
                );
                drafts
                    .into_iter()
                    .map(|draft| draft.into_transient_record(&request.channel_key, now))
                    .collect()
            }
        };

        Ok(FetchOutcome {
            videos: assemble(videos),
            cached: false,
            fetched_at: now,
        })
    }
}

/// Decodes each upload's wire duration and drops short-form content before
/// it can reach the catalog.
fn classify_details(details: Vec<VideoDetail>) -> Vec<VideoDraft> {
    details
        .into_iter()
        .filter_map(|detail| {
            let duration_seconds =
                decode_iso8601_duration(&detail.duration).unwrap_or(0) as i64;
            if !is_long_form(duration_seconds) {
                trace!(video = %detail.video_id, duration_seconds, "dropping short-form upload");
                return None;
            }
            Some(VideoDraft {
                youtube_id: detail.video_id,
                title: detail.title,
                thumbnail_url: detail.thumbnail_url,
                duration_seconds,
                view_count: detail.view_count,
                published_at: detail.published_at,
            })
        })
        .collect()
}

fn assemble(mut videos: Vec<VideoRecord>) -> Vec<VideoRecord> {
    videos.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    videos.truncate(RESPONSE_LIMIT);
    videos
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tempfile::TempDir;

    use crate::catalog::NewChannel;
    use crate::youtube::{ChannelProfile, YouTubeError, YouTubeResult};

    use super::*;

    struct ManualClock(DateTime<Utc>);

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct FakePlatform {
        by_id: HashMap<String, ChannelProfile>,
        by_handle: HashMap<String, ChannelProfile>,
        search_hits: HashMap<String, String>,
        uploads: HashMap<String, Vec<String>>,
        details: HashMap<String, VideoDetail>,
        handle_lookup_fails: bool,
    }

    #[async_trait]
    impl VideoPlatform for FakePlatform {
        async fn channel_by_id(&self, channel_id: &str) -> YouTubeResult<Option<ChannelProfile>> {
            Ok(self.by_id.get(channel_id).cloned())
        }

        async fn channel_by_handle(&self, handle: &str) -> YouTubeResult<Option<ChannelProfile>> {
            if self.handle_lookup_fails {
                return Err(YouTubeError::Api {
                    status: 503,
                    message: "backend unavailable".to_string(),
                });
            }
            Ok(self.by_handle.get(handle).cloned())
        }

        async fn search_channel_id(&self, query: &str) -> YouTubeResult<Option<String>> {
            Ok(self.search_hits.get(query).cloned())
        }

        async fn playlist_video_ids(
            &self,
            playlist_id: &str,
            _max_results: u32,
        ) -> YouTubeResult<Vec<String>> {
            Ok(self.uploads.get(playlist_id).cloned().unwrap_or_default())
        }

        async fn video_details(&self, video_ids: &[String]) -> YouTubeResult<Vec<VideoDetail>> {
            Ok(video_ids
                .iter()
                .filter_map(|id| self.details.get(id).cloned())
                .collect())
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn profile() -> ChannelProfile {
        ChannelProfile {
            channel_id: "UCBJycsmduvYEL83R_U4JriQ".to_string(),
            title: "Creator".to_string(),
            thumbnail_url: Some("https://i.ytimg.com/ch.jpg".to_string()),
            subscriber_count: Some(500),
            uploads_playlist_id: "UUBJycsmduvYEL83R_U4JriQ".to_string(),
        }
    }

    fn detail(video_id: &str, duration: &str, published_at: DateTime<Utc>) -> VideoDetail {
        VideoDetail {
            video_id: video_id.to_string(),
            title: format!("video {video_id}"),
            thumbnail_url: None,
            duration: duration.to_string(),
            view_count: 42,
            published_at,
        }
    }

    fn platform_with_uploads(handle: &str) -> FakePlatform {
        let profile = profile();
        let mut fake = FakePlatform::default();
        fake.uploads.insert(
            profile.uploads_playlist_id.clone(),
            vec!["vid-a".to_string(), "vid-b".to_string(), "vid-c".to_string()],
        );
        fake.details.insert(
            "vid-a".to_string(),
            detail("vid-a", "PT45S", base_time() - Duration::hours(1)),
        );
        fake.details.insert(
            "vid-b".to_string(),
            detail("vid-b", "PT10M", base_time() - Duration::hours(3)),
        );
        fake.details.insert(
            "vid-c".to_string(),
            detail("vid-c", "PT3M", base_time() - Duration::hours(2)),
        );
        fake.by_handle.insert(handle.to_string(), profile);
        fake
    }

    fn tracked_channel(store: &SqliteCatalogStore) -> String {
        store
            .add_channel(
                &NewChannel {
                    youtube_id: "creator-handle".to_string(),
                    name: "stale name".to_string(),
                    thumbnail_url: None,
                    subscriber_count: None,
                },
                base_time() - Duration::days(30),
            )
            .unwrap()
            .id
    }

    fn ingestor(store: &SqliteCatalogStore, fake: FakePlatform, now: DateTime<Utc>) -> Ingestor {
        Ingestor::new(store.clone(), Arc::new(fake), Arc::new(ManualClock(now)))
    }

    fn test_store() -> (TempDir, SqliteCatalogStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteCatalogStore::new(temp.path().join("catalog.sqlite")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn request(channel_key: &str) -> FetchRequest {
        FetchRequest {
            channel_key: channel_key.to_string(),
            external_id: "creator-handle".to_string(),
            force_refresh: false,
        }
    }

    #[test]
    fn gate_respects_ttl_and_force() {
        let now = base_time();
        assert_eq!(
            freshness_decision(Some(now - Duration::hours(23)), now, false),
            CacheDecision::UseCache
        );
        assert_eq!(
            freshness_decision(Some(now - Duration::hours(25)), now, false),
            CacheDecision::MustFetch
        );
        assert_eq!(
            freshness_decision(Some(now - Duration::minutes(1)), now, true),
            CacheDecision::MustFetch
        );
        assert_eq!(freshness_decision(None, now, false), CacheDecision::MustFetch);
    }

    #[test]
    fn classifier_keeps_exact_threshold() {
        assert!(!is_long_form(179));
        assert!(is_long_form(180));
        assert!(is_long_form(181));
    }

    #[tokio::test]
    async fn fresh_fetch_filters_shorts_and_sorts_newest_first() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let ingestor = ingestor(&store, platform_with_uploads("creator-handle"), base_time());

        let outcome = ingestor
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        assert!(!outcome.cached);
        assert_eq!(outcome.fetched_at, base_time());
        let ids: Vec<&str> = outcome
            .videos
            .iter()
            .map(|v| v.youtube_id.as_str())
            .collect();
        // the 45s short is gone; remaining two are newest first
        assert_eq!(ids, vec!["vid-c", "vid-b"]);

        // persisted, and the channel profile was overwritten with resolved data
        assert_eq!(store.cached_videos(&channel_key, 180, 20).unwrap().len(), 2);
        let channel = store.channel(&channel_key).unwrap().unwrap();
        assert_eq!(channel.name, "Creator");
        assert_eq!(
            channel.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/ch.jpg")
        );
    }

    #[tokio::test]
    async fn search_fallback_resolves_when_handle_lookup_is_empty() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let mut fake = platform_with_uploads("creator-handle");
        // handle lookup misses; search produces the canonical id
        let profile = fake.by_handle.remove("creator-handle").unwrap();
        fake.search_hits
            .insert("creator-handle".to_string(), profile.channel_id.clone());
        fake.by_id.insert(profile.channel_id.clone(), profile);

        let outcome = ingestor(&store, fake, base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        assert_eq!(outcome.videos.len(), 2);
        assert!(!outcome.cached);
    }

    #[tokio::test]
    async fn exhausted_strategies_surface_not_found_without_persisting() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let outcome = ingestor(&store, FakePlatform::default(), base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await;

        assert!(matches!(outcome, Err(IngestError::ChannelNotFound)));
        assert_eq!(store.cached_videos(&channel_key, 0, 50).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn transport_error_during_handle_lookup_is_fatal() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let mut fake = platform_with_uploads("creator-handle");
        fake.handle_lookup_fails = true;
        // even with a search hit available, the error must not fall through
        fake.search_hits.insert(
            "creator-handle".to_string(),
            "UCBJycsmduvYEL83R_U4JriQ".to_string(),
        );

        let outcome = ingestor(&store, fake, base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await;

        assert!(matches!(
            outcome,
            Err(IngestError::Platform(YouTubeError::Api { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn cache_hit_serves_stored_rows_without_fetching() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let seeded_at = base_time() - Duration::hours(23);

        // seed through a real cycle, then move the clock within the TTL
        ingestor(&store, platform_with_uploads("creator-handle"), seeded_at)
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        // no platform data at all: a remote call would return nothing
        let outcome = ingestor(&store, FakePlatform::default(), base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        assert!(outcome.cached);
        assert_eq!(outcome.fetched_at, seeded_at);
        assert_eq!(outcome.videos.len(), 2);
    }

    #[tokio::test]
    async fn stale_cache_triggers_a_fresh_fetch() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let seeded_at = base_time() - Duration::hours(25);

        ingestor(&store, platform_with_uploads("creator-handle"), seeded_at)
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        let outcome = ingestor(&store, platform_with_uploads("creator-handle"), base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        assert!(!outcome.cached);
        assert_eq!(outcome.fetched_at, base_time());
        assert_eq!(
            store.latest_fetch_timestamp(&channel_key).unwrap(),
            Some(base_time())
        );
    }

    #[tokio::test]
    async fn force_refresh_bypasses_a_fresh_cache() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let seeded_at = base_time() - Duration::hours(1);

        ingestor(&store, platform_with_uploads("creator-handle"), seeded_at)
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        let mut forced = request(&channel_key);
        forced.force_refresh = true;
        let outcome = ingestor(&store, platform_with_uploads("creator-handle"), base_time())
            .fetch_channel_videos(&forced)
            .await
            .unwrap();

        assert!(!outcome.cached);
        assert_eq!(outcome.fetched_at, base_time());
    }

    #[tokio::test]
    async fn empty_uploads_feed_is_a_valid_terminal_state() {
        let (_temp, store) = test_store();
        let channel_key = tracked_channel(&store);
        let mut fake = platform_with_uploads("creator-handle");
        fake.uploads.clear();

        let outcome = ingestor(&store, fake, base_time())
            .fetch_channel_videos(&request(&channel_key))
            .await
            .unwrap();

        assert!(outcome.videos.is_empty());
        assert!(!outcome.cached);
    }

    #[tokio::test]
    async fn reconciliation_failure_still_returns_fetched_videos() {
        let (_temp, store) = test_store();
        // the request references a channel key the catalog has never seen,
        // so the video insert hits a foreign-key violation
        let ingestor = ingestor(&store, platform_with_uploads("creator-handle"), base_time());

        let outcome = ingestor
            .fetch_channel_videos(&request("ghost-channel"))
            .await
            .unwrap();

        assert_eq!(outcome.videos.len(), 2);
        assert!(!outcome.cached);
        assert_eq!(store.cached_videos("ghost-channel", 0, 50).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn blank_request_fields_fail_before_any_remote_call() {
        let (_temp, store) = test_store();
        let ingestor = ingestor(&store, FakePlatform::default(), base_time());
        let outcome = ingestor
            .fetch_channel_videos(&FetchRequest {
                channel_key: "key".to_string(),
                external_id: "  ".to_string(),
                force_refresh: false,
            })
            .await;
        assert!(matches!(outcome, Err(IngestError::InvalidRequest(_))));
    }
}
