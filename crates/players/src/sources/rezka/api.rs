use regex::Regex;

use crate::errors::SourceError;
use crate::{MediaType, SearchItem, SeriesIndex};

pub(super) const SEARCH_ROW_MARKER: &str = "\"b-content__inline_item\"";

/// Lowercase and strip everything except latin/cyrillic letters and digits,
/// so search matching survives punctuation and spacing differences.
pub fn normalize_search_name(name: &str) -> String {
    let lower = name.to_lowercase();
    Regex::new("[^a-zа-яё0-9]")
        .unwrap()
        .replace_all(&lower, "")
        .to_string()
}

/// The backend serves an "access error" page instead of content when it
/// blocks a client. Surfaced as a distinct error so callers can skip the
/// source without retrying.
pub fn detect_access_block(html: &str) -> Option<SourceError> {
    if !html.contains("class=\"error-code\"") || !html.to_lowercase().contains("ошибка доступа") {
        return None;
    }
    let message = if html.contains("(105)") || html.contains(">105<") || html.contains("(403)") {
        "access error (105), IP address is blocked"
    } else if html.contains("(101)") || html.contains(">101<") {
        "access error (101), account is blocked"
    } else {
        "access error"
    };
    Some(SourceError::Blocked(message.to_string()))
}

/// Parse search result rows out of the search page HTML. Rows are delimited
/// by a stable item-class marker; href, title, year and poster are pulled
/// with row-local regexes. Only titles matching the normalized query are
/// kept.
pub fn parse_search_rows(html: &str, query: &str) -> Vec<SearchItem> {
    let row_regex =
        Regex::new(r#"href="https?://[^/]+/([^"]+)">([^<]+)</a> ?<div>([0-9]{4})"#).unwrap();
    let img_regex = Regex::new(r#"<img src="([^"]+)""#).unwrap();
    let normalized_query = normalize_search_name(query);

    let mut results = Vec::new();
    for row in html.split(SEARCH_ROW_MARKER).skip(1) {
        let Some(caps) = row_regex.captures(row) else {
            continue;
        };
        let href = caps.get(1).map_or("", |m| m.as_str());
        let title = caps.get(2).map_or("", |m| m.as_str()).trim();
        if href.is_empty() || title.is_empty() {
            continue;
        }

        let normalized_title = normalize_search_name(title);
        if !normalized_title.contains(&normalized_query)
            && !normalized_query.contains(&normalized_title)
        {
            continue;
        }

        let media_type = if row.contains("series") || row.contains("сериал") {
            MediaType::Series
        } else {
            MediaType::Movie
        };
        results.push(SearchItem {
            id: href.to_string(),
            name: title.to_string(),
            media_type,
            year: caps.get(3).and_then(|m| m.as_str().parse().ok()),
            poster: img_regex
                .captures(row)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        });
    }
    results
}

/// Pull the obfuscated stream payload out of the AJAX response body. The
/// backend answers `{url}` on success and `{error}` (or `url: false`) when it
/// has nothing to serve.
pub fn extract_stream_payload(body: &str) -> Result<String, SourceError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| SourceError::parse(format!("invalid stream response json: {e}"), body))?;

    if let Some(error) = json.get("error").and_then(|v| v.as_str()) {
        if !error.is_empty() {
            return Err(SourceError::Upstream(error.to_string()));
        }
    }

    let url = json.get("url").and_then(|v| v.as_str()).unwrap_or_default();
    if url.is_empty() || url.eq_ignore_ascii_case("false") {
        return Err(SourceError::parse("no url in stream response", body));
    }
    Ok(url.to_string())
}

/// Season and episode numbers from the content page's season/episode links.
pub fn parse_series_links(html: &str) -> Option<SeriesIndex> {
    let season_regex = Regex::new(r#"<a href="[^"]*\?s=(\d+)[^"]*">([^<]+)</a>"#).unwrap();

    let mut index = SeriesIndex::new();
    for caps in season_regex.captures_iter(html) {
        let Some(season) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) else {
            continue;
        };
        if index.contains_key(&season) {
            continue;
        }
        let episode_regex =
            Regex::new(&format!(r#"<a href="[^"]*\?s={season}&e=(\d+)[^"]*">([^<]+)</a>"#))
                .unwrap();
        let mut episodes: Vec<u32> = episode_regex
            .captures_iter(html)
            .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse().ok()))
            .collect();
        episodes.sort_unstable();
        episodes.dedup();
        if !episodes.is_empty() {
            index.insert(season, episodes);
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

    const SEARCH_HTML: &str = r#"
        <div class="b-content__inline_item"><a href="https://hdrezka.ag/films/fiction/1-inception-2010.html">Начало</a> <div>2010</div><img src="https://static.example/inception.jpg"></div>
        <div class="b-content__inline_item"><a href="https://hdrezka.ag/series/2-breaking-bad.html">Breaking Bad</a> <div>2008</div> сериал <img src="https://static.example/bb.jpg"></div>
        <div class="b-content__inline_item"><a href="https://hdrezka.ag/films/3-unrelated.html">Something Else</a> <div>2015</div></div>
    "#;

    #[test]
    fn test_parse_search_rows_filters_by_query() {
        let results = parse_search_rows(SEARCH_HTML, "Breaking Bad");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "series/2-breaking-bad.html");
        assert_eq!(results[0].name, "Breaking Bad");
        assert_eq!(results[0].media_type, MediaType::Series);
        assert_eq!(results[0].year, Some(2008));
        assert_eq!(
            results[0].poster.as_deref(),
            Some("https://static.example/bb.jpg")
        );
    }

    #[test]
    fn test_parse_search_rows_matches_cyrillic() {
        let results = parse_search_rows(SEARCH_HTML, "Начало!");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].media_type, MediaType::Movie);
    }

    #[test]
    fn test_normalize_search_name() {
        assert_eq!(normalize_search_name("Breaking Bad (2008)!"), "breakingbad2008");
        assert_eq!(normalize_search_name("Во все тяжкие"), "вовсетяжкие");
    }

    #[test]
    fn test_detect_access_block() {
        let blocked = r#"<div class="error-code">105</div> Ошибка доступа (105)"#;
        match detect_access_block(blocked) {
            Some(SourceError::Blocked(message)) => assert!(message.contains("105")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(detect_access_block("<html>regular page</html>").is_none());
    }

    #[test]
    fn test_extract_stream_payload() {
        assert_eq!(
            extract_stream_payload(r##"{"success":true,"url":"#hABC"}"##).unwrap(),
            "#hABC"
        );
        assert!(matches!(
            extract_stream_payload(r#"{"error":"Video not found"}"#),
            Err(SourceError::Upstream(_))
        ));
        assert!(matches!(
            extract_stream_payload(r#"{"url":false}"#),
            Err(SourceError::Parse { .. })
        ));
        assert!(matches!(
            extract_stream_payload("<html>not json</html>"),
            Err(SourceError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_series_links() {
        let html = r#"
            <a href="/breaking-bad.html?s=1&e=1">Episode 1</a>
            <a href="/breaking-bad.html?s=1&e=2">Episode 2</a>
            <a href="/breaking-bad.html?s=1&e=2">Episode 2 again</a>
            <a href="/breaking-bad.html?s=2&e=1">Episode 1</a>
            <a href="/breaking-bad.html?s=1">Season 1</a>
            <a href="/breaking-bad.html?s=2">Season 2</a>
        "#;
        let index = parse_series_links(html).unwrap();
        assert_eq!(index.get(&1), Some(&vec![1, 2]));
        assert_eq!(index.get(&2), Some(&vec![1]));
    }

    #[test]
    fn test_parse_series_links_empty() {
        assert!(parse_series_links("<html>no seasons</html>").is_none());
    }
}
