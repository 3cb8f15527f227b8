pub mod duration;
pub mod error;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::YouTubeSection;

pub use error::{YouTubeError, YouTubeResult};

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// The Data API rejects batch requests with more than 50 ids.
const DETAILS_BATCH_LIMIT: usize = 50;

/// Canonical channel descriptor as resolved against the provider.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChannelProfile {
    pub channel_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub subscriber_count: Option<i64>,
    pub uploads_playlist_id: String,
}

/// One upload's full metadata as returned by the batch details call. The
/// duration stays in its wire encoding; decoding and classification happen in
/// the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub duration: String,
    pub view_count: i64,
    pub published_at: DateTime<Utc>,
}

/// Remote video platform boundary. Lookup methods return `Ok(None)` for an
/// empty result set so the resolver can distinguish "no match" from a
/// transport failure.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn channel_by_id(&self, channel_id: &str) -> YouTubeResult<Option<ChannelProfile>>;
    async fn channel_by_handle(&self, handle: &str) -> YouTubeResult<Option<ChannelProfile>>;
    /// Keyword search constrained to channel results; top hit's canonical id
    /// only (search results carry partial data).
    async fn search_channel_id(&self, query: &str) -> YouTubeResult<Option<String>>;
    async fn playlist_video_ids(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> YouTubeResult<Vec<String>>;
    async fn video_details(&self, video_ids: &[String]) -> YouTubeResult<Vec<VideoDetail>>;
}

/// YouTube Data API v3 client.
pub struct YouTubeDataApi {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl YouTubeDataApi {
    pub fn new(config: &YouTubeSection) -> YouTubeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(
            client,
            config.api_key.clone(),
            config.api_base.clone(),
        ))
    }

    pub fn with_client(client: reqwest::Client, api_key: String, api_base: String) -> Self {
        Self {
            client,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    async fn get_json<T>(&self, resource: &str, query: &[(&str, &str)]) -> YouTubeResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_base, resource);
        debug!(resource, "youtube api request");
        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error)
                .map(|body| body.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    fn profile_from_item(item: ChannelItem) -> YouTubeResult<ChannelProfile> {
        let uploads_playlist_id = item
            .content_details
            .and_then(|details| details.related_playlists)
            .and_then(|playlists| playlists.uploads)
            .ok_or_else(|| {
                YouTubeError::InvalidResponse(format!(
                    "channel {} has no uploads playlist",
                    item.id
                ))
            })?;
        let subscriber_count = item.statistics.and_then(|stats| {
            if stats.hidden_subscriber_count {
                None
            } else {
                stats.subscriber_count.and_then(|raw| raw.parse().ok())
            }
        });
        Ok(ChannelProfile {
            channel_id: item.id,
            title: item.snippet.title,
            thumbnail_url: item.snippet.thumbnails.default.map(|t| t.url),
            subscriber_count,
            uploads_playlist_id,
        })
    }

    async fn channel_lookup(
        &self,
        selector: (&str, &str),
    ) -> YouTubeResult<Option<ChannelProfile>> {
        let response: ChannelListResponse = self
            .get_json(
                "channels",
                &[("part", "snippet,contentDetails,statistics"), selector],
            )
            .await?;
        response
            .items
            .into_iter()
            .next()
            .map(Self::profile_from_item)
            .transpose()
    }
}

#[async_trait]
impl VideoPlatform for YouTubeDataApi {
    async fn channel_by_id(&self, channel_id: &str) -> YouTubeResult<Option<ChannelProfile>> {
        self.channel_lookup(("id", channel_id)).await
    }

    async fn channel_by_handle(&self, handle: &str) -> YouTubeResult<Option<ChannelProfile>> {
        self.channel_lookup(("forHandle", handle)).await
    }

    async fn search_channel_id(&self, query: &str) -> YouTubeResult<Option<String>> {
        let response: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "channel"),
                    ("q", query),
                    ("maxResults", "1"),
                ],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.snippet.channel_id))
    }

    async fn playlist_video_ids(
        &self,
        playlist_id: &str,
        max_results: u32,
    ) -> YouTubeResult<Vec<String>> {
        let max = max_results.to_string();
        let response: PlaylistItemsResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails"),
                    ("playlistId", playlist_id),
                    ("maxResults", max.as_str()),
                ],
            )
            .await?;
        Ok(response
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect())
    }

    async fn video_details(&self, video_ids: &[String]) -> YouTubeResult<Vec<VideoDetail>> {
        let mut details = Vec::with_capacity(video_ids.len());
        for chunk in video_ids.chunks(DETAILS_BATCH_LIMIT) {
            let ids = chunk.join(",");
            let response: VideoListResponse = self
                .get_json(
                    "videos",
                    &[
                        ("part", "snippet,contentDetails,statistics"),
                        ("id", ids.as_str()),
                    ],
                )
                .await?;
            for item in response.items {
                details.push(VideoDetail::try_from(item)?);
            }
        }
        Ok(details)
    }
}

impl TryFrom<VideoItem> for VideoDetail {
    type Error = YouTubeError;

    fn try_from(item: VideoItem) -> YouTubeResult<Self> {
        let published_at = DateTime::parse_from_rfc3339(&item.snippet.published_at)
            .map_err(|err| {
                YouTubeError::InvalidResponse(format!(
                    "bad publish timestamp for video {}: {err}",
                    item.id
                ))
            })?
            .with_timezone(&Utc);
        let thumbnail_url = item
            .snippet
            .thumbnails
            .medium
            .or(item.snippet.thumbnails.default)
            .map(|t| t.url);
        let view_count = item
            .statistics
            .and_then(|stats| stats.view_count)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(0);
        Ok(VideoDetail {
            video_id: item.id,
            title: item.snippet.title,
            thumbnail_url,
            duration: item.content_details.duration,
            view_count,
            published_at,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    snippet: ChannelSnippet,
    content_details: Option<ChannelContentDetails>,
    statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    #[serde(default)]
    hidden_subscriber_count: bool,
    subscriber_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    content_details: VideoContentDetails,
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: String,
    published_at: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_item_maps_to_detail_with_medium_thumbnail() {
        let payload = r#"{
            "id": "vid123",
            "snippet": {
                "title": "A long-form video",
                "publishedAt": "2024-03-01T12:00:00Z",
                "thumbnails": {
                    "default": {"url": "https://i.ytimg.com/default.jpg"},
                    "medium": {"url": "https://i.ytimg.com/medium.jpg"}
                }
            },
            "contentDetails": {"duration": "PT10M"},
            "statistics": {"viewCount": "1234"}
        }"#;
        let item: VideoItem = serde_json::from_str(payload).unwrap();
        let detail = VideoDetail::try_from(item).unwrap();
        assert_eq!(detail.video_id, "vid123");
        assert_eq!(
            detail.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/medium.jpg")
        );
        assert_eq!(detail.view_count, 1234);
        assert_eq!(detail.duration, "PT10M");
    }

    #[test]
    fn missing_view_count_defaults_to_zero() {
        let payload = r#"{
            "id": "vid456",
            "snippet": {"title": "No stats", "publishedAt": "2024-03-01T12:00:00Z"},
            "contentDetails": {"duration": "PT4M"}
        }"#;
        let item: VideoItem = serde_json::from_str(payload).unwrap();
        let detail = VideoDetail::try_from(item).unwrap();
        assert_eq!(detail.view_count, 0);
        assert_eq!(detail.thumbnail_url, None);
    }

    #[test]
    fn hidden_subscriber_count_is_suppressed() {
        let payload = r#"{
            "id": "UCBJycsmduvYEL83R_U4JriQ",
            "snippet": {"title": "Channel", "thumbnails": {"default": {"url": "https://i.ytimg.com/ch.jpg"}}},
            "contentDetails": {"relatedPlaylists": {"uploads": "UUBJycsmduvYEL83R_U4JriQ"}},
            "statistics": {"hiddenSubscriberCount": true, "subscriberCount": "100"}
        }"#;
        let item: ChannelItem = serde_json::from_str(payload).unwrap();
        let profile = YouTubeDataApi::profile_from_item(item).unwrap();
        assert_eq!(profile.subscriber_count, None);
        assert_eq!(profile.uploads_playlist_id, "UUBJycsmduvYEL83R_U4JriQ");
    }

    #[test]
    fn channel_without_uploads_playlist_is_invalid() {
        let payload = r#"{
            "id": "UCBJycsmduvYEL83R_U4JriQ",
            "snippet": {"title": "Channel"},
            "contentDetails": {}
        }"#;
        let item: ChannelItem = serde_json::from_str(payload).unwrap();
        assert!(matches!(
            YouTubeDataApi::profile_from_item(item),
            Err(YouTubeError::InvalidResponse(_))
        ));
    }
}
