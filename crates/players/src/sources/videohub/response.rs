use serde::{Deserialize, Serialize};

/// Stage-1 playlist: voice/episode candidates plus a serial flag.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    #[serde(default, alias = "serial")]
    pub is_serial: bool,
    #[serde(default, alias = "playlist")]
    pub items: Vec<PlaylistEntry>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    /// Opaque secondary id the stage-2 request is keyed by.
    #[serde(default, alias = "id", deserialize_with = "string_or_number")]
    pub vk_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default, alias = "voice")]
    pub voice_type: Option<String>,
    #[serde(default, alias = "studio")]
    pub voice_studio: Option<String>,
}

impl PlaylistEntry {
    pub fn voice_name(&self) -> Option<&str> {
        self.voice_type
            .as_deref()
            .filter(|v| !v.is_empty())
            .or_else(|| self.voice_studio.as_deref().filter(|v| !v.is_empty()))
    }
}

/// Stage-2 video descriptor. Sources either nest under `sources` or sit at
/// the top level; field names drift between `hls`/`hlsUrl` shapes.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    #[serde(default)]
    pub sources: VideoSources,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSources {
    #[serde(default, alias = "hls")]
    pub hls_url: String,
    #[serde(default, alias = "dash", alias = "dasha")]
    pub dash_url: String,
    #[serde(default, alias = "mpeg4k")]
    pub mpeg4k_url: String,
    #[serde(default, alias = "mpeg2k")]
    pub mpeg2k_url: String,
    #[serde(default, alias = "mpegFullHd")]
    pub mpeg_full_hd_url: String,
    #[serde(default, alias = "mpegHigh")]
    pub mpeg_high_url: String,
    #[serde(default, alias = "mpegMedium")]
    pub mpeg_medium_url: String,
    #[serde(default, alias = "mpegLow")]
    pub mpeg_low_url: String,
    #[serde(default, alias = "mpegLowest")]
    pub mpeg_lowest_url: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_serial_aliases() {
        let body = r#"{"serial":true,"playlist":[{"id":99,"season":1,"episode":2,"voice":"LostFilm"}]}"#;
        let parsed: PlaylistResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.is_serial);
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].vk_id, "99");
        assert_eq!(parsed.items[0].voice_name(), Some("LostFilm"));
    }

    #[test]
    fn test_playlist_camel_case_fields() {
        let body = r#"{"isSerial":false,"items":[{"vkId":"abc","voiceStudio":"HDVB"}]}"#;
        let parsed: PlaylistResponse = serde_json::from_str(body).unwrap();
        assert!(!parsed.is_serial);
        assert_eq!(parsed.items[0].vk_id, "abc");
        assert_eq!(parsed.items[0].voice_name(), Some("HDVB"));
    }

    #[test]
    fn test_video_sources_aliases() {
        let body = r#"{"sources":{"hls":"https://cdn.example/x.m3u8","mpegFullHd":"https://cdn.example/1080.mp4"}}"#;
        let parsed: VideoResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.sources.hls_url, "https://cdn.example/x.m3u8");
        assert_eq!(parsed.sources.mpeg_full_hd_url, "https://cdn.example/1080.mp4");
    }
}
