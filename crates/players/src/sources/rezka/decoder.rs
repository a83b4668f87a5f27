use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use regex::Regex;

use crate::{StreamKind, StreamVariant};

/// Junk substrings the backend splices into its payloads, always introduced
/// by the segment separator.
const TRASH_TOKENS: [&str; 5] = [
    "JCQhIUAkJEBeIUAjJCRA",
    "QEBAQEAhIyMhXl5e",
    "IyMjI14hISMjIUBA",
    "Xl5eIUAjIyEhIyM=",
    "JCQjISFAIyFAIyM=",
];

const SEGMENT_SEPARATOR: &str = "//_//";

/// Known quality labels, best first. The first extracted variant is the
/// preferred default.
const QUALITY_LADDER: [&str; 5] = ["2160p", "1080p", "720p", "480p", "360p"];

/// Reverse the backend's payload obfuscation: a `#`/`#h` sentinel followed by
/// base64 content interleaved with trash substrings. Decode strategies are
/// tried in order, first success wins; when every strategy fails the original
/// input is returned so the caller can still attempt direct URL extraction.
pub fn decode(raw: &str) -> String {
    if !raw.starts_with('#') {
        return raw.to_string();
    }

    let body = match raw.strip_prefix("#h") {
        Some(rest) => rest,
        None => raw.trim_start_matches('#'),
    };

    // Trash tokens can be nested, a second pass catches the ones a first
    // removal re-forms.
    let mut cleaned = body.to_string();
    for _ in 0..2 {
        for trash in TRASH_TOKENS {
            cleaned = cleaned.replace(&format!("{SEGMENT_SEPARATOR}{trash}"), "");
        }
    }
    if let Some(text) = decode_base64_utf8(&cleaned) {
        return text;
    }

    let stripped = Regex::new("//[^/]+_//")
        .unwrap()
        .replace_all(&cleaned, "")
        .replace(SEGMENT_SEPARATOR, "");
    if let Some(text) = decode_base64_utf8(&stripped) {
        return text;
    }

    if let Some(text) = decode_segments(&cleaned) {
        return text;
    }

    raw.to_string()
}

/// Split on the separator and decode each segment independently,
/// concatenating whatever decodes. Tolerates partially corrupted payloads.
fn decode_segments(body: &str) -> Option<String> {
    let mut decoded = String::new();
    let mut any = false;
    for segment in body.split(SEGMENT_SEPARATOR) {
        let segment = strip_trash_prefix(segment);
        if segment.is_empty() {
            continue;
        }
        if let Some(text) = decode_base64_utf8(segment) {
            decoded.push_str(&text);
            any = true;
        }
    }
    if any && !decoded.is_empty() {
        Some(decoded)
    } else {
        None
    }
}

fn strip_trash_prefix(segment: &str) -> &str {
    for trash in TRASH_TOKENS {
        if let Some(rest) = segment.strip_prefix(trash) {
            return rest;
        }
    }
    segment
}

fn decode_base64_utf8(data: &str) -> Option<String> {
    let bytes = BASE64.decode(data.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Extract quality-tagged stream variants from a decoded payload using the
/// `[label]url` grammar, best quality first. An empty result means the
/// payload held no recognizable stream, which is a parse-level failure for
/// the caller, never a network one.
pub fn extract_variants(decoded: &str) -> Vec<StreamVariant> {
    let mut variants = Vec::new();

    for quality in QUALITY_LADDER {
        let pattern =
            Regex::new(&format!(r"\[({quality}|[^\]]*{quality}[^\]]*)\]([^,\[]+)")).unwrap();
        let Some(caps) = pattern.captures(decoded) else {
            continue;
        };
        let line = caps.get(2).map_or("", |m| m.as_str());
        if !line.contains(".mp4") && !line.contains(".m3u8") {
            continue;
        }
        if let Some(url) = first_url(line) {
            let kind = StreamKind::from_url(&url);
            variants.push(StreamVariant::new(url, kind, quality));
        }
    }

    if variants.is_empty() {
        if let Some(url) = first_url(decoded) {
            let kind = StreamKind::from_url(&url);
            variants.push(StreamVariant::new(url, kind, "auto"));
        }
    }

    variants
}

fn first_url(text: &str) -> Option<String> {
    Regex::new(r"(https?://[^\[\n\r, ]+)")
        .unwrap()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(payload: &str) -> String {
        BASE64.encode(payload.as_bytes())
    }

    #[test]
    fn test_decode_passthrough_without_sentinel() {
        let plain = "[1080p]https://cdn.example/v.mp4";
        assert_eq!(decode(plain), plain);
        assert_eq!(decode(""), "");
    }

    #[test]
    fn test_decode_simple_payload() {
        let payload = "[1080p]https://cdn.example/v.mp4";
        let obfuscated = format!("#h{}", encode(payload));
        assert_eq!(decode(&obfuscated), payload);
    }

    #[test]
    fn test_decode_strips_every_trash_token() {
        let payload = "[720p]https://cdn.example/v.mp4,[1080p]https://cdn.example/b.mp4";
        let encoded = encode(payload);
        for trash in TRASH_TOKENS {
            // Interleave in the middle and at the end.
            let half = encoded.len() / 2;
            let obfuscated = format!(
                "#h{}//_//{}{}//_//{}",
                &encoded[..half],
                trash,
                &encoded[half..],
                trash
            );
            assert_eq!(decode(&obfuscated), payload, "trash token {trash}");
        }
    }

    #[test]
    fn test_decode_repeated_trash_tokens() {
        let payload = "[480p]https://cdn.example/v.mp4";
        let encoded = encode(payload);
        let obfuscated = format!(
            "#h//_//{}//_//{}{}",
            TRASH_TOKENS[0], TRASH_TOKENS[1], encoded
        );
        assert_eq!(decode(&obfuscated), payload);
    }

    #[test]
    fn test_decode_segment_fallback_skips_corrupt_segment() {
        // Two valid base64 segments around one corrupt segment. The whole
        // string is not valid base64, so only the per-segment strategy works.
        let obfuscated = format!(
            "#h{}//_//!!corrupt!!//_//{}",
            encode("[1080p]https://cdn.example/a"),
            encode(".mp4")
        );
        assert_eq!(decode(&obfuscated), "[1080p]https://cdn.example/a.mp4");
    }

    #[test]
    fn test_decode_returns_raw_when_undecodable() {
        let garbage = "#h!!not-base64-at-all!!";
        assert_eq!(decode(garbage), garbage);
    }

    #[test]
    fn test_extract_variants_orders_best_first() {
        let decoded = "[360p]https://cdn.example/low.mp4,[1080p]https://cdn.example/high.mp4,[720p]https://cdn.example/mid.mp4";
        let variants = extract_variants(decoded);
        let labels: Vec<&str> = variants.iter().map(|v| v.label.as_str()).collect();
        assert_eq!(labels, vec!["1080p", "720p", "360p"]);
        assert_eq!(variants[0].url, "https://cdn.example/high.mp4");
    }

    #[test]
    fn test_extract_variants_classifies_kind() {
        let decoded =
            "[1080p]https://cdn.example/master.m3u8,[720p]https://cdn.example/video.mp4";
        let variants = extract_variants(decoded);
        assert_eq!(variants[0].kind, StreamKind::Hls);
        assert_eq!(variants[1].kind, StreamKind::Progressive);
    }

    #[test]
    fn test_extract_variants_labeled_quality() {
        let decoded = "[1080p Ultra]https://cdn.example/v.mp4";
        let variants = extract_variants(decoded);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "1080p");
    }

    #[test]
    fn test_extract_variants_any_url_fallback() {
        let decoded = "no brackets here https://cdn.example/stream.m3u8 trailing";
        let variants = extract_variants(decoded);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].label, "auto");
        assert_eq!(variants[0].url, "https://cdn.example/stream.m3u8");
        assert_eq!(variants[0].kind, StreamKind::Hls);
    }

    #[test]
    fn test_extract_variants_empty_when_no_url() {
        assert!(extract_variants("nothing playable").is_empty());
    }
}
