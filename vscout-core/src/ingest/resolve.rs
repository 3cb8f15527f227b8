use tracing::debug;

use crate::identifier::ChannelIdentifier;
use crate::youtube::{ChannelProfile, VideoPlatform};

use super::error::{IngestError, IngestResult};

/// One attempt at turning an identifier into a canonical channel profile.
/// Strategies share uniform semantics: `Ok(Some)` wins, `Ok(None)` falls
/// through to the next strategy, `Err` aborts the whole resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStrategy {
    LookupById(String),
    LookupByHandle(String),
    SearchThenResolve(String),
}

impl ResolveStrategy {
    async fn execute(&self, platform: &dyn VideoPlatform) -> IngestResult<Option<ChannelProfile>> {
        match self {
            ResolveStrategy::LookupById(id) => Ok(platform.channel_by_id(id).await?),
            ResolveStrategy::LookupByHandle(handle) => {
                Ok(platform.channel_by_handle(handle).await?)
            }
            ResolveStrategy::SearchThenResolve(query) => {
                // Search hits carry partial data only; re-resolve the
                // canonical id for the full descriptor.
                match platform.search_channel_id(query).await? {
                    Some(channel_id) => Ok(platform.channel_by_id(&channel_id).await?),
                    None => Ok(None),
                }
            }
        }
    }
}

pub fn strategies_for(identifier: &ChannelIdentifier) -> Vec<ResolveStrategy> {
    match identifier {
        ChannelIdentifier::Id(id) => vec![ResolveStrategy::LookupById(id.clone())],
        ChannelIdentifier::Handle(handle) => vec![
            ResolveStrategy::LookupByHandle(handle.clone()),
            ResolveStrategy::SearchThenResolve(handle.clone()),
        ],
        ChannelIdentifier::Custom(name) => vec![
            ResolveStrategy::LookupByHandle(name.clone()),
            ResolveStrategy::SearchThenResolve(name.clone()),
        ],
    }
}

/// Runs the fallback chain for `identifier`. Exhausting every strategy
/// without a match is the typed `ChannelNotFound` outcome, distinct from a
/// transport error at any step.
pub async fn resolve_channel(
    platform: &dyn VideoPlatform,
    identifier: &ChannelIdentifier,
) -> IngestResult<ChannelProfile> {
    for strategy in strategies_for(identifier) {
        if let Some(profile) = strategy.execute(platform).await? {
            debug!(channel = %profile.channel_id, ?strategy, "channel resolved");
            return Ok(profile);
        }
    }
    Err(IngestError::ChannelNotFound)
}
