pub mod cache;
pub mod errors;
pub mod http;
pub mod manager;
pub mod proxy;
pub mod sources;
pub mod traits;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::errors::SourceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Series,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, MediaType::Series)
    }
}

impl std::str::FromStr for MediaType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "series" | "serial" => Ok(MediaType::Series),
            _ => Err(format!("Invalid media type: {s}")),
        }
    }
}

/// A single resolvable unit: a movie, or one episode of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRequest {
    pub content_id: String,
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl PlayerRequest {
    pub fn movie(content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            media_type: MediaType::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(content_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            content_id: content_id.into(),
            media_type: MediaType::Series,
            season: Some(season),
            episode: Some(episode),
        }
    }

    pub fn with_content_id(&self, content_id: impl Into<String>) -> Self {
        Self {
            content_id: content_id.into(),
            ..self.clone()
        }
    }

    /// Cache key for a resolved player. Every component that changes the
    /// upstream response must be part of the key.
    pub fn fingerprint(&self, source: &str) -> String {
        format!(
            "{source}:player:{}:{}:{}:{}",
            self.content_id,
            self.media_type.as_str(),
            self.season.map_or_else(|| "-".to_string(), |s| s.to_string()),
            self.episode.map_or_else(|| "-".to_string(), |e| e.to_string()),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Hls,
    Dash,
    Progressive,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Hls => "hls",
            StreamKind::Dash => "dash",
            StreamKind::Progressive => "progressive",
        }
    }

    /// Classify a stream URL by extension/keyword.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_ascii_lowercase();
        if lower.contains(".m3u8") || lower.contains(":hls:") {
            StreamKind::Hls
        } else if lower.contains(".mpd") || lower.contains("dash") {
            StreamKind::Dash
        } else {
            StreamKind::Progressive
        }
    }
}

/// One playable stream option (quality or voice track) within a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamVariant {
    pub url: String,
    pub kind: StreamKind,
    /// Quality or voice-track name, e.g. "1080p" or a dub studio.
    pub label: String,
    /// Extra request headers a player must send to fetch this stream.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl StreamVariant {
    pub fn new(url: impl Into<String>, kind: StreamKind, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            label: label.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Outcome of a player resolution. `success` implies a non-empty `url` or a
/// non-empty `variants` list; variant order is significant, the first entry is
/// the preferred default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerResponse {
    pub success: bool,
    pub url: Option<String>,
    pub variants: Vec<StreamVariant>,
    pub error: Option<SourceError>,
}

impl PlayerResponse {
    pub fn ok(url: impl Into<String>, variants: Vec<StreamVariant>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            variants,
            error: None,
        }
    }

    pub fn fail(error: SourceError) -> Self {
        Self {
            success: false,
            url: None,
            variants: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
    pub id: String,
    pub name: String,
    pub media_type: MediaType,
    pub year: Option<i32>,
    pub poster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResponse {
    pub results: Vec<SearchItem>,
    pub error: Option<SourceError>,
}

impl SearchResponse {
    pub fn of(results: Vec<SearchItem>) -> Self {
        Self {
            results,
            error: None,
        }
    }

    pub fn fail(error: SourceError) -> Self {
        Self {
            results: Vec::new(),
            error: Some(error),
        }
    }
}

/// Season number mapped to its episode numbers, ascending and duplicate-free.
pub type SeriesIndex = BTreeMap<u32, Vec<u32>>;
