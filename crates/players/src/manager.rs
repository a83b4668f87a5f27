use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SourceError;
use crate::sources::collaps::CollapsParser;
use crate::sources::rezka::RezkaParser;
use crate::sources::videohub::VideoHubParser;
use crate::traits::SourceParser;
use crate::{PlayerRequest, PlayerResponse, SearchResponse, SeriesIndex};

/// Single entry point over every registered source: named dispatch, ordered
/// fallback across sources, and parallel search fan-out.
pub struct PlayersManager {
    parsers: HashMap<String, Arc<dyn SourceParser>>,
}

impl Default for PlayersManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl PlayersManager {
    /// Empty registry; callers register the adapters they want.
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Registry with the three built-in sources under default settings.
    pub fn with_defaults() -> Self {
        let mut manager = Self::new();
        manager.register(Arc::new(RezkaParser::default()));
        manager.register(Arc::new(CollapsParser::default()));
        manager.register(Arc::new(VideoHubParser::default()));
        manager
    }

    /// Register an adapter under its own name, replacing a previous one.
    pub fn register(&mut self, parser: Arc<dyn SourceParser>) {
        self.parsers.insert(parser.name().to_lowercase(), parser);
    }

    pub fn parser(&self, source: &str) -> Option<Arc<dyn SourceParser>> {
        self.parsers.get(&source.to_lowercase()).cloned()
    }

    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.parsers.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn search(&self, source: &str, query: &str) -> SearchResponse {
        match self.parser(source) {
            Some(parser) => parser.search(query).await,
            None => SearchResponse::fail(SourceError::UnknownSource(source.to_string())),
        }
    }

    /// Search every registered source concurrently. Every source gets a map
    /// entry; a failing source contributes its error instead of sinking the
    /// aggregate. Dropping the returned future cancels all in-flight
    /// searches.
    pub async fn search_all(&self, query: &str) -> HashMap<String, SearchResponse> {
        let searches = self.parsers.iter().map(|(name, parser)| {
            let name = name.clone();
            let parser = parser.clone();
            async move { (name, parser.search(query).await) }
        });
        futures::future::join_all(searches).await.into_iter().collect()
    }

    pub async fn resolve_player(&self, source: &str, request: &PlayerRequest) -> PlayerResponse {
        match self.parser(source) {
            Some(parser) => parser.resolve_player(request).await,
            None => PlayerResponse::fail(SourceError::UnknownSource(source.to_string())),
        }
    }

    /// Try sources strictly in the given order until one succeeds. The id in
    /// `request` is the shared default; `id_overrides` substitutes
    /// per-source ids for backends keyed differently. The first successful
    /// response wins and later sources are never consulted; when every
    /// source fails the last error is reported.
    pub async fn resolve_from_priority_list(
        &self,
        sources: &[&str],
        request: &PlayerRequest,
        id_overrides: &HashMap<String, String>,
    ) -> PlayerResponse {
        let mut last_error = None;

        for source in sources {
            let effective = match id_overrides.get(&source.to_lowercase()) {
                Some(id) => request.with_content_id(id.clone()),
                None => request.clone(),
            };

            let response = self.resolve_player(source, &effective).await;
            if response.success {
                return response;
            }
            if let Some(error) = &response.error {
                log::debug!("{source} failed: {error}");
            }
            last_error = response.error.or(last_error);
        }

        PlayerResponse::fail(
            last_error.unwrap_or_else(|| SourceError::NotFound("all sources failed".to_string())),
        )
    }

    pub async fn series_index(&self, source: &str, content_id: &str) -> Option<SeriesIndex> {
        self.parser(source)?.series_index(content_id).await
    }
}
