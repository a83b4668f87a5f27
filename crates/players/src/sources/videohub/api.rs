use crate::errors::SourceError;
use crate::{StreamKind, StreamVariant};

use super::response::{PlaylistResponse, VideoResponse, VideoSources};

/// Fixed progressive tiers the stage-2 descriptor may carry, best first.
const PROGRESSIVE_TIERS: [&str; 7] = ["4K", "2K", "Full HD", "HD", "Medium", "Low", "Lowest"];

pub fn parse_playlist_response(body: &str) -> Result<PlaylistResponse, SourceError> {
    let playlist: PlaylistResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("invalid playlist json: {e}"), body))?;
    if let Some(error) = playlist.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(SourceError::Upstream(error.to_string()));
    }
    Ok(playlist)
}

/// The video descriptor usually nests its URLs under `sources`, but flat
/// top-level bodies have been observed as well.
pub fn parse_video_response(body: &str) -> Result<VideoResponse, SourceError> {
    let mut video: VideoResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("invalid video json: {e}"), body))?;
    if let Some(error) = video.error.as_deref().filter(|e| !e.is_empty()) {
        return Err(SourceError::Upstream(error.to_string()));
    }
    if video.sources == VideoSources::default() {
        if let Ok(flat) = serde_json::from_str::<VideoSources>(body) {
            video.sources = flat;
        }
    }
    Ok(video)
}

/// All stream variants a descriptor offers: HLS first, then DASH, then the
/// progressive tiers.
pub fn build_variants(sources: &VideoSources, voice: Option<&str>) -> Vec<StreamVariant> {
    let mut variants = Vec::new();

    if !sources.hls_url.is_empty() {
        variants.push(StreamVariant::new(
            sources.hls_url.as_str(),
            StreamKind::Hls,
            label("HLS", voice),
        ));
    }
    if !sources.dash_url.is_empty() {
        variants.push(StreamVariant::new(
            sources.dash_url.as_str(),
            StreamKind::Dash,
            label("DASH", voice),
        ));
    }

    let tiers = [
        &sources.mpeg4k_url,
        &sources.mpeg2k_url,
        &sources.mpeg_full_hd_url,
        &sources.mpeg_high_url,
        &sources.mpeg_medium_url,
        &sources.mpeg_low_url,
        &sources.mpeg_lowest_url,
    ];
    for (quality, url) in PROGRESSIVE_TIERS.iter().zip(tiers) {
        if !url.is_empty() {
            variants.push(StreamVariant::new(
                url.as_str(),
                StreamKind::Progressive,
                label(quality, voice),
            ));
        }
    }

    variants
}

/// Preferred default: HLS, then DASH, then the common progressive tiers.
pub fn primary_url(sources: &VideoSources) -> Option<String> {
    [
        &sources.hls_url,
        &sources.dash_url,
        &sources.mpeg_full_hd_url,
        &sources.mpeg_high_url,
    ]
    .into_iter()
    .find(|url| !url.is_empty())
    .cloned()
}

fn label(quality: &str, voice: Option<&str>) -> String {
    match voice {
        Some(voice) => format!("{quality} ({voice})"),
        None => quality.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_response_nested_and_flat() {
        let nested = r#"{"sources":{"hls":"https://cdn.example/x.m3u8"}}"#;
        let flat = r#"{"hls":"https://cdn.example/x.m3u8"}"#;
        for body in [nested, flat] {
            let video = parse_video_response(body).unwrap();
            assert_eq!(video.sources.hls_url, "https://cdn.example/x.m3u8", "body: {body}");
        }
    }

    #[test]
    fn test_parse_video_response_error_body() {
        let err = parse_video_response(r#"{"error":"video removed"}"#).unwrap_err();
        assert_eq!(err, SourceError::Upstream("video removed".to_string()));
    }

    #[test]
    fn test_build_variants_order_and_labels() {
        let sources = VideoSources {
            hls_url: "https://cdn.example/x.m3u8".to_string(),
            dash_url: "https://cdn.example/x.mpd".to_string(),
            mpeg_full_hd_url: "https://cdn.example/1080.mp4".to_string(),
            mpeg_low_url: "https://cdn.example/360.mp4".to_string(),
            ..VideoSources::default()
        };
        let variants = build_variants(&sources, Some("LostFilm"));
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "HLS (LostFilm)",
                "DASH (LostFilm)",
                "Full HD (LostFilm)",
                "Low (LostFilm)"
            ]
        );
        assert_eq!(variants[0].kind, StreamKind::Hls);
        assert_eq!(variants[2].kind, StreamKind::Progressive);
    }

    #[test]
    fn test_descriptor_with_only_hls_resolves_to_hls_player() {
        let video = parse_video_response(r#"{"hls": "https://cdn.example/x.m3u8"}"#).unwrap();
        let variants = build_variants(&video.sources, None);
        assert_eq!(
            primary_url(&video.sources).as_deref(),
            Some("https://cdn.example/x.m3u8")
        );
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].kind, StreamKind::Hls);
        assert_eq!(variants[0].url, "https://cdn.example/x.m3u8");
    }

    #[test]
    fn test_primary_url_chain() {
        let mut sources = VideoSources {
            hls_url: "https://cdn.example/x.m3u8".to_string(),
            mpeg_high_url: "https://cdn.example/720.mp4".to_string(),
            ..VideoSources::default()
        };
        assert_eq!(
            primary_url(&sources).as_deref(),
            Some("https://cdn.example/x.m3u8")
        );

        sources.hls_url.clear();
        assert_eq!(
            primary_url(&sources).as_deref(),
            Some("https://cdn.example/720.mp4")
        );

        sources.mpeg_high_url.clear();
        assert_eq!(primary_url(&sources), None);
    }
}
