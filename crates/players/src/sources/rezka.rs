pub mod api;
pub mod decoder;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::cache::MemoryCache;
use crate::errors::SourceError;
use crate::http;
use crate::proxy::ProxyPool;
use crate::sources::SourceType;
use crate::traits::SourceParser;
use crate::{PlayerRequest, PlayerResponse, SearchResponse, SeriesIndex, StreamKind, StreamVariant};

const PLAYER_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RezkaSettings {
    pub host: String,
    /// CORS relay the real host is routed through; `None` talks to the host
    /// directly.
    pub cors_host: Option<String>,
    /// Rewrite progressive stream URLs to their HLS manifests.
    pub hls: bool,
    pub real_ip: Option<String>,
    /// Send the backend's mobile-app marker header.
    pub x_app: bool,
    pub proxies: Vec<String>,
}

impl Default for RezkaSettings {
    fn default() -> Self {
        Self {
            host: "https://hdrezka.ag".to_string(),
            cors_host: Some("https://cors.apn.monster".to_string()),
            hls: true,
            real_ip: None,
            x_app: false,
            proxies: Vec::new(),
        }
    }
}

impl RezkaSettings {
    fn base_url(&self) -> String {
        http::relay_base(self.cors_host.as_deref(), &self.host)
    }
}

/// Adapter for the scraped-HTML backend: search results come from an HTML
/// fragment, streams from a form-POST endpoint answering an obfuscated
/// payload.
pub struct RezkaParser {
    settings: RezkaSettings,
    client: reqwest::Client,
    proxies: ProxyPool,
    cache: Arc<MemoryCache<PlayerResponse>>,
}

impl Default for RezkaParser {
    fn default() -> Self {
        Self::new(RezkaSettings::default())
    }
}

impl RezkaParser {
    pub fn new(settings: RezkaSettings) -> Self {
        Self::with_cache(settings, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(settings: RezkaSettings, cache: Arc<MemoryCache<PlayerResponse>>) -> Self {
        let proxies = ProxyPool::new(settings.proxies.clone());
        Self {
            settings,
            client: http::default_client(),
            proxies,
            cache,
        }
    }

    fn proxied_client(&self) -> reqwest::Client {
        match self.proxies.current() {
            Some(proxy) => http::client_for_proxy(Some(proxy)),
            None => self.client.clone(),
        }
    }

    async fn resolve_uncached(&self, request: &PlayerRequest) -> PlayerResponse {
        match self.fetch_streams(request).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("rezka resolve failed for {}: {err}", request.content_id);
                if err.is_network() {
                    self.proxies.advance();
                }
                PlayerResponse::fail(err)
            }
        }
    }

    async fn fetch_streams(&self, request: &PlayerRequest) -> Result<PlayerResponse, SourceError> {
        let base = self.settings.base_url();
        let id = &request.content_id;

        let data = if request.media_type.is_series() {
            match (request.season, request.episode) {
                (Some(season), Some(episode)) => format!(
                    "id={id}&translator_id=1&season={season}&episode={episode}&favs=&action=get_stream"
                ),
                _ => {
                    return Err(SourceError::MissingParameter(
                        "season and episode are required for series".to_string(),
                    ))
                }
            }
        } else {
            format!("id={id}&translator_id=1&is_camrip=0&is_ads=0&is_director=0&favs=&action=get_movie")
        };

        // Cache-busting suffix the web player appends to the AJAX endpoint.
        let timestamp = Utc::now().timestamp();
        let suffix: u32 = rand::rng().random_range(101..=999);
        let api_url = format!("{base}/ajax/get_cdn_series/?t={timestamp}{suffix}");

        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            "application/json, text/javascript, */*; q=0.01".parse().unwrap(),
        );
        headers.insert("Cache-Control", "no-cache".parse().unwrap());
        headers.insert("DNT", "1".parse().unwrap());
        headers.insert("Pragma", "no-cache".parse().unwrap());
        headers.insert("Sec-Fetch-Dest", "empty".parse().unwrap());
        headers.insert("Sec-Fetch-Mode", "cors".parse().unwrap());
        headers.insert("Sec-Fetch-Site", "same-origin".parse().unwrap());
        headers.insert("X-Requested-With", "XMLHttpRequest".parse().unwrap());
        http::insert_header(&mut headers, "Origin", &base);
        http::insert_header(&mut headers, "Referer", &format!("{base}/{id}"));
        if self.settings.x_app {
            headers.insert("X-App-Hdrezka-App", "1".parse().unwrap());
        }
        if let Some(real_ip) = self.settings.real_ip.as_deref() {
            http::insert_header(&mut headers, "X-Real-IP", real_ip);
            http::insert_header(&mut headers, "X-Forwarded-For", real_ip);
        }

        let client = self.proxied_client();
        let body = http::post_form(&client, &api_url, &data, headers).await?;

        let payload = api::extract_stream_payload(&body)?;
        let decoded = decoder::decode(&payload);
        let mut variants = decoder::extract_variants(&decoded);
        if variants.is_empty() {
            return Err(SourceError::parse(
                format!("no streams in decoded payload ({} bytes)", decoded.len()),
                &decoded,
            ));
        }

        for variant in &mut variants {
            self.apply_hls_preference(variant);
        }
        let primary = variants[0].url.clone();
        Ok(PlayerResponse::ok(primary, variants))
    }

    fn apply_hls_preference(&self, variant: &mut StreamVariant) {
        if self.settings.hls {
            if !variant.url.ends_with(".m3u8") {
                variant.url.push_str(":hls:manifest.m3u8");
                variant.kind = StreamKind::Hls;
            }
        } else if variant.url.contains(":hls:manifest.m3u8") {
            variant.url = variant.url.replace(":hls:manifest.m3u8", "");
            variant.kind = StreamKind::from_url(&variant.url);
        }
    }
}

#[async_trait]
impl SourceParser for RezkaParser {
    fn name(&self) -> &'static str {
        SourceType::Rezka.as_str()
    }

    async fn search(&self, query: &str) -> SearchResponse {
        let base = self.settings.base_url();
        let url = format!(
            "{base}/search/?do=search&subaction=search&q={}",
            urlencoding::encode(query)
        );

        let mut headers = HeaderMap::new();
        headers.insert(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert("Cache-Control", "no-cache".parse().unwrap());
        headers.insert("DNT", "1".parse().unwrap());
        headers.insert("Pragma", "no-cache".parse().unwrap());
        let referer = self
            .settings
            .cors_host
            .as_deref()
            .unwrap_or(&self.settings.host);
        http::insert_header(&mut headers, "Referer", &format!("{referer}/"));

        let html = match http::get(&self.client, &url, headers).await {
            Ok(html) => html,
            Err(err) => return SearchResponse::fail(err),
        };
        if let Some(block) = api::detect_access_block(&html) {
            return SearchResponse::fail(block);
        }

        SearchResponse::of(api::parse_search_rows(&html, query))
    }

    async fn resolve_player(&self, request: &PlayerRequest) -> PlayerResponse {
        if request.media_type.is_series()
            && (request.season.is_none() || request.episode.is_none())
        {
            return PlayerResponse::fail(SourceError::MissingParameter(
                "season and episode are required for series".to_string(),
            ));
        }

        let key = request.fingerprint(self.name());
        self.cache
            .get_or_load(&key, PLAYER_CACHE_TTL, self.resolve_uncached(request))
            .await
    }

    async fn series_index(&self, content_id: &str) -> Option<SeriesIndex> {
        let url = format!("{}/{content_id}", self.settings.base_url());
        let html = http::get(&self.client, &url, HeaderMap::new()).await.ok()?;
        api::parse_series_links(&html)
    }
}
