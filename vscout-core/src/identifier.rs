use std::fmt;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// A channel reference extracted from user input, before any remote
/// resolution has happened.
///
/// Exactly one variant is produced per successful parse:
/// - `Id`: canonical channel id (`UC` prefix, 24 chars)
/// - `Handle`: modern `@handle`
/// - `Custom`: legacy `/c/name` or `/user/name` custom route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelIdentifier {
    Id(String),
    Handle(String),
    Custom(String),
}

impl ChannelIdentifier {
    pub fn value(&self) -> &str {
        match self {
            ChannelIdentifier::Id(value)
            | ChannelIdentifier::Handle(value)
            | ChannelIdentifier::Custom(value) => value,
        }
    }

    /// Classifies an identifier already persisted in the catalog. Stored
    /// values are bare (no URL), so anything that is not shaped like a
    /// canonical id is treated as a handle and resolved with the handle
    /// lookup plus search fallback.
    pub fn from_stored(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_canonical_channel_id(trimmed) {
            ChannelIdentifier::Id(trimmed.to_string())
        } else {
            ChannelIdentifier::Handle(trimmed.to_string())
        }
    }
}

impl fmt::Display for ChannelIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelIdentifier::Id(value) => write!(f, "channel:{value}"),
            ChannelIdentifier::Handle(value) => write!(f, "@{value}"),
            ChannelIdentifier::Custom(value) => write!(f, "c/{value}"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("empty channel input")]
    Empty,
    #[error("not a youtube url: {0}")]
    ForeignHost(String),
    #[error("unrecognized channel url or id: {0}")]
    Unrecognized(String),
}

/// `UC` prefix plus 22 id chars, 24 total.
pub fn is_canonical_channel_id(value: &str) -> bool {
    value.len() == 24
        && value.starts_with("UC")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Parses free-form channel input: a raw canonical id, or a channel URL in
/// any of the supported shapes (`/channel/UC…`, `/@handle`, `/c/name`,
/// `/user/name`). Pure string work, no network.
#[derive(Debug)]
pub struct ChannelInputParser {
    channel_path: Regex,
    handle_path: Regex,
    custom_path: Regex,
}

impl Default for ChannelInputParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelInputParser {
    pub fn new() -> Self {
        let channel_path = Regex::new(r"/channel/(UC[\w-]{22})").expect("valid regex");
        let handle_path = Regex::new(r"/@([\w.\-]+)").expect("valid regex");
        let custom_path = Regex::new(r"/(?:c|user)/([\w.\-]+)").expect("valid regex");
        Self {
            channel_path,
            handle_path,
            custom_path,
        }
    }

    pub fn parse(&self, input: &str) -> Result<ChannelIdentifier, IdentifierError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        if is_canonical_channel_id(trimmed) {
            return Ok(ChannelIdentifier::Id(trimmed.to_string()));
        }

        let with_scheme = if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        };
        let url = Url::parse(&with_scheme)
            .map_err(|_| IdentifierError::Unrecognized(trimmed.to_string()))?;

        let host = url
            .host_str()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !host.contains("youtube.com") && !host.contains("youtu.be") {
            return Err(IdentifierError::ForeignHost(trimmed.to_string()));
        }

        // Query strings and trailing slashes fall away with Url::path().
        let path = url.path();

        if let Some(captures) = self.channel_path.captures(path) {
            return Ok(ChannelIdentifier::Id(captures[1].to_string()));
        }
        if let Some(captures) = self.handle_path.captures(path) {
            return Ok(ChannelIdentifier::Handle(captures[1].to_string()));
        }
        if let Some(captures) = self.custom_path.captures(path) {
            return Ok(ChannelIdentifier::Custom(captures[1].to_string()));
        }

        Err(IdentifierError::Unrecognized(trimmed.to_string()))
    }
}
