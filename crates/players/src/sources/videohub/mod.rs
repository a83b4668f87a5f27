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
use crate::{PlayerRequest, PlayerResponse, SearchResponse, SeriesIndex};

use self::response::PlaylistEntry;

const PLAYER_CACHE_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoHubSettings {
    pub api_host: String,
    /// Publisher id the playlist endpoint is keyed by.
    pub pub_id: String,
    /// Aggregator the content ids belong to.
    pub aggr: String,
    pub cors_host: Option<String>,
    pub proxies: Vec<String>,
}

impl Default for VideoHubSettings {
    fn default() -> Self {
        Self {
            api_host: "https://plapi.cdnvideohub.com/api/v1/player/sv".to_string(),
            pub_id: "12".to_string(),
            aggr: "kp".to_string(),
            cors_host: Some("https://cors.apn.monster".to_string()),
            proxies: Vec::new(),
        }
    }
}

impl VideoHubSettings {
    fn base_url(&self) -> String {
        http::relay_base(self.cors_host.as_deref(), &self.api_host)
    }
}

/// Adapter for the two-stage JSON backend: a playlist of voice/episode
/// candidates first, then one video-descriptor request per candidate.
pub struct VideoHubParser {
    settings: VideoHubSettings,
    client: reqwest::Client,
    proxies: ProxyPool,
    cache: Arc<MemoryCache<PlayerResponse>>,
}

impl Default for VideoHubParser {
    fn default() -> Self {
        Self::new(VideoHubSettings::default())
    }
}

impl VideoHubParser {
    pub fn new(settings: VideoHubSettings) -> Self {
        Self::with_cache(settings, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(
        settings: VideoHubSettings,
        cache: Arc<MemoryCache<PlayerResponse>>,
    ) -> Self {
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

    async fn fetch_playlist(
        &self,
        client: &reqwest::Client,
        content_id: &str,
    ) -> Result<response::PlaylistResponse, SourceError> {
        let url = format!(
            "{}/playlist?pub={}&aggr={}&id={}",
            self.settings.base_url(),
            self.settings.pub_id,
            self.settings.aggr,
            urlencoding::encode(content_id)
        );
        let body = http::get(client, &url, HeaderMap::new()).await?;
        api::parse_playlist_response(&body)
    }

    async fn resolve_uncached(&self, request: &PlayerRequest) -> PlayerResponse {
        match self.fetch_streams(request).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("videohub resolve failed for {}: {err}", request.content_id);
                if err.is_network() {
                    self.proxies.advance();
                }
                PlayerResponse::fail(err)
            }
        }
    }

    async fn fetch_streams(&self, request: &PlayerRequest) -> Result<PlayerResponse, SourceError> {
        let client = self.proxied_client();
        let playlist = self.fetch_playlist(&client, &request.content_id).await?;

        if playlist.is_serial && (request.season.is_none() || request.episode.is_none()) {
            return Err(SourceError::MissingParameter(
                "series detected, season and episode are required".to_string(),
            ));
        }

        let candidates: Vec<&PlaylistEntry> = if playlist.is_serial {
            playlist
                .items
                .iter()
                .filter(|item| item.season == request.season && item.episode == request.episode)
                .collect()
        } else {
            playlist.items.iter().collect()
        };
        if candidates.is_empty() {
            return Err(match (request.season, request.episode) {
                (Some(season), Some(episode)) if playlist.is_serial => SourceError::NotFound(
                    format!("episode S{season}E{episode} not found in playlist"),
                ),
                _ => SourceError::NotFound("playlist has no entries".to_string()),
            });
        }

        // Each candidate resolves independently; one bad voice track must not
        // sink the others.
        let base = self.settings.base_url();
        let mut variants = Vec::new();
        let mut primary = None;
        let mut last_error = None;
        for candidate in candidates {
            if candidate.vk_id.is_empty() {
                continue;
            }
            let url = format!("{base}/video/{}", candidate.vk_id);
            let video = match http::get(&client, &url, HeaderMap::new()).await {
                Ok(body) => match api::parse_video_response(&body) {
                    Ok(video) => video,
                    Err(err) => {
                        log::warn!("videohub candidate {} unparseable: {err}", candidate.vk_id);
                        last_error = Some(err);
                        continue;
                    }
                },
                Err(err) => {
                    log::warn!("videohub candidate {} failed: {err}", candidate.vk_id);
                    last_error = Some(err);
                    continue;
                }
            };

            let candidate_variants = api::build_variants(&video.sources, candidate.voice_name());
            if candidate_variants.is_empty() {
                last_error = Some(SourceError::NotFound(format!(
                    "no stream urls for candidate {}",
                    candidate.vk_id
                )));
                continue;
            }
            if primary.is_none() {
                primary = api::primary_url(&video.sources)
                    .or_else(|| Some(candidate_variants[0].url.clone()));
            }
            variants.extend(candidate_variants);
        }

        if variants.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| SourceError::NotFound("no candidates resolved".to_string())));
        }
        let primary = primary.unwrap_or_else(|| variants[0].url.clone());
        Ok(PlayerResponse::ok(primary, variants))
    }

    /// Distinct voice-track names offered for a title, `None` when the
    /// playlist is unreachable or carries none.
    pub async fn voices(&self, content_id: &str) -> Option<Vec<String>> {
        let client = self.proxied_client();
        let playlist = self.fetch_playlist(&client, content_id).await.ok()?;

        let mut voices: Vec<String> = Vec::new();
        for item in &playlist.items {
            if let Some(voice) = item.voice_name() {
                if !voices.iter().any(|known| known == voice) {
                    voices.push(voice.to_string());
                }
            }
        }
        if voices.is_empty() {
            None
        } else {
            Some(voices)
        }
    }
}

#[async_trait]
impl SourceParser for VideoHubParser {
    fn name(&self) -> &'static str {
        SourceType::VideoHub.as_str()
    }

    async fn search(&self, _query: &str) -> SearchResponse {
        // The backend has no search endpoint; the aggregate search still gets
        // an entry for this source.
        SearchResponse::fail(SourceError::NotFound(
            "search is not supported by videohub".to_string(),
        ))
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
        let client = self.proxied_client();
        let playlist = self.fetch_playlist(&client, content_id).await.ok()?;
        if !playlist.is_serial {
            return None;
        }

        let mut index = SeriesIndex::new();
        for item in &playlist.items {
            if let (Some(season), Some(episode)) = (item.season, item.episode) {
                index.entry(season).or_insert_with(Vec::new).push(episode);
            }
        }
        for episodes in index.values_mut() {
            episodes.sort_unstable();
            episodes.dedup();
        }
        if index.is_empty() {
            None
        } else {
            Some(index)
        }
    }
}
