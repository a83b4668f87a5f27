use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::errors::SourceError;
use crate::SeriesIndex;

/// Embed URL for a content id. The backend routes by id shape: IMDB ids
/// (`tt…`), short numeric Kinopoisk ids, and its own opaque ids.
pub fn embed_url(base: &str, content_id: &str) -> String {
    if content_id.starts_with("tt") {
        format!("{base}/embed/imdb/{content_id}")
    } else if content_id.len() < 10 && content_id.chars().all(|c| c.is_ascii_digit()) {
        format!("{base}/embed/kp/{content_id}")
    } else {
        format!("{base}/embed/movie/{content_id}")
    }
}

/// The backend occasionally answers a challenge page instead of the player.
pub fn detect_challenge(html: &str) -> Option<SourceError> {
    let lower = html.to_lowercase();
    if lower.contains("captcha") {
        return Some(SourceError::Blocked(
            "captcha challenge returned instead of the player page".to_string(),
        ));
    }
    None
}

/// The player config embeds stream URLs as inline-script literals. The field
/// spelling drifts (`hls:`, quoted `"hls"`), so patterns are tried in order.
pub fn extract_hls(content: &str) -> Option<String> {
    first_capture(
        content,
        &[
            r#"hls:\s+"(https?://[^"]+\.m3u[^"]+)"#,
            r#"hls:\s*"([^"]+)"#,
            r#"["']hls["']:\s*["']([^"']+)"#,
        ],
    )
}

/// Same drift handling for DASH; the backend has been seen spelling the field
/// `dasha` as well as `dash`.
pub fn extract_dash(content: &str) -> Option<String> {
    first_capture(
        content,
        &[
            r#"dasha?:\s+"(https?://[^"]+\.mp[^"]+)"#,
            r#"dasha?:\s*"([^"]+)"#,
            r#"["']dash["']:\s*["']([^"']+)"#,
        ],
    )
}

fn first_capture(content: &str, patterns: &[&str]) -> Option<String> {
    for pattern in patterns {
        if let Some(caps) = Regex::new(pattern).unwrap().captures(content) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
    }
    None
}

/// Voice-track name from the player's audio config.
pub fn extract_voice_name(content: &str) -> String {
    Regex::new(r#"audio:\s*\{\s*"names"\s*:\s*\["([^"]+)"#)
        .unwrap()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "Default".to_string())
}

/// Last-resort stream URL extraction when the known literals are absent.
pub fn extract_any_stream_url(content: &str) -> Option<String> {
    Regex::new(r#"(https?://[^"'\s]+\.(m3u8|mp4|mpd))"#)
        .unwrap()
        .captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// JSON-escaped URLs come with `&` ampersands and escaped slashes.
pub fn unescape_url(url: &str) -> String {
    url.replace("\\u0026", "&").replace('\\', "")
}

/// The serial embed page carries a `seasons:` literal with the full episode
/// tree. Returns the parsed JSON value when present.
pub fn extract_seasons_block(content: &str) -> Option<Value> {
    let index = content.find("seasons:")?;
    parse_first_json_value(&content[index + "seasons:".len()..])
}

fn parse_first_json_value(raw: &str) -> Option<Value> {
    let start = raw.find('[').or_else(|| raw.find('{'))?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw[start..]);
    Value::deserialize(&mut deserializer).ok()
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Per-episode iframe URL from the seasons tree. Field names drift between
/// `season`/`number` and `iframe`/`url`.
pub fn find_episode_iframe(seasons: &Value, season: u32, episode: u32) -> Option<String> {
    for entry in seasons.as_array()? {
        let number = entry
            .get("season")
            .or_else(|| entry.get("number"))
            .and_then(as_u64);
        if number != Some(u64::from(season)) {
            continue;
        }
        let episodes = entry.get("episodes").and_then(Value::as_array)?;
        for item in episodes {
            let episode_number = item
                .get("episode")
                .or_else(|| item.get("number"))
                .and_then(as_u64);
            if episode_number != Some(u64::from(episode)) {
                continue;
            }
            return item
                .get("iframe")
                .or_else(|| item.get("url"))
                .and_then(Value::as_str)
                .map(unescape_url);
        }
    }
    None
}

/// Stream URLs from an episode's iframe page: data attributes when present,
/// a plain player src as fallback.
pub fn extract_iframe_streams(html: &str) -> (Option<String>, Option<String>, Option<String>) {
    let hls = first_capture(html, &[r#"data-hls="([^"]+)"#]);
    let dash = first_capture(html, &[r#"data-dash="([^"]+)"#]);
    let src = first_capture(html, &[r#"src="([^"]+)"#]);
    (hls, dash, src)
}

/// Season/episode index from the `/franchise/details` metadata body. Season
/// numbers arrive as `season` or `number`; episode lists as plain numbers or
/// objects.
pub fn parse_franchise_seasons(body: &str) -> Option<SeriesIndex> {
    let json: Value = serde_json::from_str(body).ok()?;
    let seasons = json.get("seasons")?.as_array()?;

    let mut index = SeriesIndex::new();
    for season in seasons {
        let Some(number) = season
            .get("season")
            .or_else(|| season.get("number"))
            .and_then(as_u64)
        else {
            continue;
        };
        let Some(episodes) = season.get("episodes").and_then(Value::as_array) else {
            continue;
        };
        let mut numbers: Vec<u32> = episodes
            .iter()
            .filter_map(|episode| {
                as_u64(episode).or_else(|| {
                    episode
                        .get("episode")
                        .or_else(|| episode.get("number"))
                        .and_then(as_u64)
                })
            })
            .map(|n| n as u32)
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        if !numbers.is_empty() {
            index.insert(number as u32, numbers);
        }
    }

    if index.is_empty() {
        None
    } else {
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_url_by_id_shape() {
        let base = "https://api.backend.me";
        assert_eq!(
            embed_url(base, "tt1375666"),
            "https://api.backend.me/embed/imdb/tt1375666"
        );
        assert_eq!(
            embed_url(base, "258687"),
            "https://api.backend.me/embed/kp/258687"
        );
        assert_eq!(
            embed_url(base, "9f8e7d6c5b4a39281706"),
            "https://api.backend.me/embed/movie/9f8e7d6c5b4a39281706"
        );
    }

    #[test]
    fn test_extract_hls_variants() {
        let spaced = r#"hls: "https://cdn.example/master.m3u8?sig=1""#;
        let compact = r#"hls:"https://cdn.example/master.m3u8""#;
        let quoted = r#""hls": "https://cdn.example/master.m3u8""#;
        for content in [spaced, compact, quoted] {
            assert!(
                extract_hls(content)
                    .is_some_and(|url| url.starts_with("https://cdn.example/master.m3u8")),
                "failed on: {content}"
            );
        }
    }

    #[test]
    fn test_extract_dash_tolerates_dasha() {
        let drifted = r#"dasha: "https://cdn.example/manifest.mpd""#;
        assert_eq!(
            extract_dash(drifted).as_deref(),
            Some("https://cdn.example/manifest.mpd")
        );
    }

    #[test]
    fn test_extract_voice_name() {
        let content = r#"audio: {"names":["LostFilm","Original"]}"#;
        assert_eq!(extract_voice_name(content), "LostFilm");
        assert_eq!(extract_voice_name("no audio here"), "Default");
    }

    #[test]
    fn test_unescape_url() {
        assert_eq!(
            unescape_url(r"https:\/\/cdn.example\/x.m3u8?a=1&b=2"),
            "https://cdn.example/x.m3u8?a=1&b=2"
        );
    }

    #[test]
    fn test_detect_challenge() {
        assert!(detect_challenge("<div class=\"g-recaptcha\"></div>").is_some());
        assert!(detect_challenge("<video></video>").is_none());
    }

    const SERIAL_EMBED: &str = r#"
        makePlayer({
            seasons: [{"season":1,"episodes":[{"episode":1,"iframe":"https://api.backend.me/iframe/s1e1"},{"episode":2,"iframe":"https://api.backend.me/iframe/s1e2"}]},{"number":2,"episodes":[{"number":1,"url":"https://api.backend.me/iframe/s2e1"}]}],
        });
    "#;

    #[test]
    fn test_find_episode_iframe() {
        let seasons = extract_seasons_block(SERIAL_EMBED).unwrap();
        assert_eq!(
            find_episode_iframe(&seasons, 1, 2).as_deref(),
            Some("https://api.backend.me/iframe/s1e2")
        );
        // Field-name drift: season as "number", url instead of iframe.
        assert_eq!(
            find_episode_iframe(&seasons, 2, 1).as_deref(),
            Some("https://api.backend.me/iframe/s2e1")
        );
        assert_eq!(find_episode_iframe(&seasons, 3, 1), None);
    }

    #[test]
    fn test_extract_iframe_streams() {
        let html = r#"<div data-hls="https://cdn.example/x.m3u8" data-dash="https://cdn.example/x.mpd"><iframe src="https://cdn.example/player"></iframe></div>"#;
        let (hls, dash, src) = extract_iframe_streams(html);
        assert_eq!(hls.as_deref(), Some("https://cdn.example/x.m3u8"));
        assert_eq!(dash.as_deref(), Some("https://cdn.example/x.mpd"));
        assert!(src.is_some());
    }

    #[test]
    fn test_parse_franchise_seasons_mixed_shapes() {
        let body = r#"{"seasons":[
            {"season":1,"episodes":[3,1,2,2]},
            {"number":2,"episodes":[{"episode":1},{"episode":2}]},
            {"season":3}
        ]}"#;
        let index = parse_franchise_seasons(body).unwrap();
        assert_eq!(index.get(&1), Some(&vec![1, 2, 3]));
        assert_eq!(index.get(&2), Some(&vec![1, 2]));
        assert!(!index.contains_key(&3));
    }

    #[test]
    fn test_parse_franchise_seasons_rejects_empty() {
        assert!(parse_franchise_seasons(r#"{"seasons":[]}"#).is_none());
        assert!(parse_franchise_seasons("not json").is_none());
    }
}
