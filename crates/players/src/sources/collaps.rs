pub mod api;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::cache::MemoryCache;
use crate::errors::SourceError;
use crate::http;
use crate::proxy::ProxyPool;
use crate::sources::SourceType;
use crate::traits::SourceParser;
use crate::{
    MediaType, PlayerRequest, PlayerResponse, SearchItem, SearchResponse, SeriesIndex, StreamKind,
    StreamVariant,
};

const PLAYER_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollapsSettings {
    pub api_host: String,
    pub token: String,
    /// Prefer the DASH manifest over HLS when both are present.
    pub use_dash: bool,
    /// Player revision toggle; DASH preference only applies to the newer one.
    pub two: bool,
    pub cors_host: Option<String>,
    pub proxies: Vec<String>,
}

impl Default for CollapsSettings {
    fn default() -> Self {
        Self {
            api_host: "https://api.bhcesh.me".to_string(),
            token: "eedefb541aeba871dcfc756e6b31c02e".to_string(),
            use_dash: false,
            two: true,
            cors_host: Some("https://cors.apn.monster".to_string()),
            proxies: Vec::new(),
        }
    }
}

impl CollapsSettings {
    fn base_url(&self) -> String {
        http::relay_base(self.cors_host.as_deref(), &self.api_host)
    }
}

/// Adapter for the token-gated JSON/embed backend: search is a JSON list
/// endpoint, streams live as inline-script literals inside embed pages.
pub struct CollapsParser {
    settings: CollapsSettings,
    client: reqwest::Client,
    proxies: ProxyPool,
    cache: Arc<MemoryCache<PlayerResponse>>,
}

impl Default for CollapsParser {
    fn default() -> Self {
        Self::new(CollapsSettings::default())
    }
}

impl CollapsParser {
    pub fn new(settings: CollapsSettings) -> Self {
        Self::with_cache(settings, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(settings: CollapsSettings, cache: Arc<MemoryCache<PlayerResponse>>) -> Self {
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
                log::warn!("collaps resolve failed for {}: {err}", request.content_id);
                if err.is_network() {
                    self.proxies.advance();
                }
                PlayerResponse::fail(err)
            }
        }
    }

    async fn fetch_streams(&self, request: &PlayerRequest) -> Result<PlayerResponse, SourceError> {
        let embed_url = api::embed_url(&self.settings.base_url(), &request.content_id);
        let client = self.proxied_client();
        let content = http::get(&client, &embed_url, HeaderMap::new()).await?;

        if let Some(block) = api::detect_challenge(&content) {
            return Err(block);
        }

        if let Some(seasons) = api::extract_seasons_block(&content) {
            return match (request.season, request.episode) {
                (Some(season), Some(episode)) => {
                    self.fetch_episode_streams(&client, &seasons, season, episode)
                        .await
                }
                _ => Err(SourceError::MissingParameter(
                    "series detected, season and episode are required".to_string(),
                )),
            };
        }
        if request.media_type.is_series() {
            return Err(SourceError::NotFound(format!(
                "no seasons data in embed for {}",
                request.content_id
            )));
        }

        self.movie_streams(&content, &embed_url)
    }

    fn movie_streams(
        &self,
        content: &str,
        embed_url: &str,
    ) -> Result<PlayerResponse, SourceError> {
        let voice = api::extract_voice_name(content);
        let hls = api::extract_hls(content).map(|url| api::unescape_url(&url));
        let dash = api::extract_dash(content).map(|url| api::unescape_url(&url));
        let use_dash = self.settings.two && self.settings.use_dash;

        let (url, kind) = if use_dash && dash.is_some() {
            (dash.unwrap_or_default(), StreamKind::Dash)
        } else if let Some(hls) = hls {
            (hls, StreamKind::Hls)
        } else if let Some(url) = api::extract_any_stream_url(content) {
            let kind = StreamKind::from_url(&url);
            (url, kind)
        } else {
            return Err(SourceError::parse(
                format!(
                    "no stream literals in embed content ({} bytes)",
                    content.len()
                ),
                content,
            ));
        };

        let variant = self.variant_with_referer(&url, kind, &voice, embed_url);
        Ok(PlayerResponse::ok(url, vec![variant]))
    }

    async fn fetch_episode_streams(
        &self,
        client: &reqwest::Client,
        seasons: &serde_json::Value,
        season: u32,
        episode: u32,
    ) -> Result<PlayerResponse, SourceError> {
        let iframe_url = api::find_episode_iframe(seasons, season, episode).ok_or_else(|| {
            SourceError::NotFound(format!("episode S{season}E{episode} not found"))
        })?;

        let html = http::get(client, &iframe_url, HeaderMap::new()).await?;
        let (hls, dash, src) = api::extract_iframe_streams(&html);

        let mut variants = Vec::new();
        if let Some(hls) = hls {
            let url = api::unescape_url(&hls);
            variants.push(self.variant_with_referer(&url, StreamKind::Hls, "HLS", &iframe_url));
        }
        if let Some(dash) = dash {
            let url = api::unescape_url(&dash);
            variants.push(self.variant_with_referer(&url, StreamKind::Dash, "DASH", &iframe_url));
        }
        if variants.is_empty() {
            if let Some(src) = src.filter(|src| src.starts_with("http")) {
                let url = api::unescape_url(&src);
                let kind = StreamKind::from_url(&url);
                variants.push(self.variant_with_referer(&url, kind, "Auto", &iframe_url));
            }
        }

        if variants.is_empty() {
            return Err(SourceError::parse(
                format!("no streams in episode iframe for S{season}E{episode}"),
                &html,
            ));
        }
        let primary = variants[0].url.clone();
        Ok(PlayerResponse::ok(primary, variants))
    }

    /// Collaps CDNs refuse requests without the player page as Referer, so
    /// every variant carries it.
    fn variant_with_referer(
        &self,
        url: &str,
        kind: StreamKind,
        label: &str,
        page_url: &str,
    ) -> StreamVariant {
        let variant = StreamVariant::new(url, kind, label);
        match referer_origin(page_url) {
            Some(origin) => variant.with_header("Referer", origin),
            None => variant,
        }
    }
}

fn referer_origin(page_url: &str) -> Option<String> {
    let parsed = url::Url::parse(page_url).ok()?;
    Some(format!("{}://{}/", parsed.scheme(), parsed.host_str()?))
}

#[async_trait]
impl SourceParser for CollapsParser {
    fn name(&self) -> &'static str {
        SourceType::Collaps.as_str()
    }

    async fn search(&self, query: &str) -> SearchResponse {
        let url = format!(
            "{}/list?token={}&name={}",
            self.settings.base_url(),
            self.settings.token,
            urlencoding::encode(query)
        );

        let body = match http::get(&self.client, &url, HeaderMap::new()).await {
            Ok(body) => body,
            Err(err) => return SearchResponse::fail(err),
        };

        let parsed: response::ListResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(err) => {
                return SearchResponse::fail(SourceError::parse(
                    format!("invalid search response json: {err}"),
                    &body,
                ))
            }
        };
        if let Some(error) = parsed.error.filter(|e| !e.is_empty()) {
            return SearchResponse::fail(SourceError::Upstream(error));
        }

        let results = parsed
            .results
            .into_iter()
            .filter(|entry| !entry.id.is_empty())
            .map(|entry| SearchItem {
                media_type: entry.kind.parse().unwrap_or(MediaType::Movie),
                id: entry.id,
                name: entry.name,
                year: entry.year,
                poster: entry.poster,
            })
            .collect();
        SearchResponse::of(results)
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
        let url = format!(
            "{}/franchise/details?token={}&kinopoisk_id={}",
            self.settings.base_url(),
            self.settings.token,
            urlencoding::encode(content_id)
        );
        let body = http::get(&self.client, &url, HeaderMap::new()).await.ok()?;
        api::parse_franchise_seasons(&body)
    }
}
