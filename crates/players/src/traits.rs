use async_trait::async_trait;

use crate::{PlayerRequest, PlayerResponse, SearchResponse, SeriesIndex};

/// Capability set shared by every source backend. Implementations never
/// panic past this boundary; failures travel inside the returned values.
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// Registry name of this source, e.g. "rezka".
    fn name(&self) -> &'static str;

    /// Search the backend's catalogue.
    async fn search(&self, query: &str) -> SearchResponse;

    /// Resolve playable stream URLs for a movie or a series episode. Series
    /// requests must carry both season and episode; that is checked before
    /// any network request is made.
    async fn resolve_player(&self, request: &PlayerRequest) -> PlayerResponse;

    /// Season/episode index for a series, `None` when the backend has no
    /// series data for this id.
    async fn series_index(&self, content_id: &str) -> Option<SeriesIndex>;
}
