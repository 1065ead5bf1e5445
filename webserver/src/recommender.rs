//! Local catalog recommender
//!
//! The simpler built-in algorithm the proxy falls back to when the
//! companion service is unusable. Works over an in-memory track catalog
//! loaded once at boot; ranking is play-count order with a little random
//! sampling so repeated requests vary. Responses use the same shape as
//! the companion service, so callers cannot tell the paths apart.

use std::path::Path;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;

use shared::ProxiedResponse;

use crate::error::{WebServerError, WebServerResult};

/// One track as exposed by recommendation responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    pub creator: String,
    pub genre: String,
    pub play_count: u64,
}

#[derive(Clone)]
pub struct CatalogRecommender {
    tracks: Arc<Vec<TrackSummary>>,
    default_limit: usize,
}

impl CatalogRecommender {
    pub fn new(tracks: Vec<TrackSummary>) -> Self {
        Self {
            tracks: Arc::new(tracks),
            default_limit: 10,
        }
    }

    /// Load the catalog from a JSON array on disk
    pub fn from_json_file(path: &Path) -> WebServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let tracks: Vec<TrackSummary> = serde_json::from_str(&raw)?;
        Ok(Self::new(tracks))
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Most-played tracks, lightly shuffled for variety
    pub fn general(&self, limit: Option<usize>) -> WebServerResult<ProxiedResponse> {
        let limit = limit.unwrap_or(self.default_limit);

        let mut ranked: Vec<&TrackSummary> = self.tracks.iter().collect();
        ranked.sort_by(|a, b| b.play_count.cmp(&a.play_count));

        // Sample from a pool wider than the limit so the order varies
        let pool: Vec<TrackSummary> = ranked
            .into_iter()
            .take(limit.saturating_mul(2))
            .cloned()
            .collect();
        let mut picks: Vec<TrackSummary> = pool
            .choose_multiple(&mut rand::thread_rng(), limit)
            .cloned()
            .collect();
        picks.sort_by(|a, b| b.play_count.cmp(&a.play_count));

        Ok(ProxiedResponse::ok(json!({ "tracks": picks })))
    }

    /// Tracks sharing genre or creator with the seed, most played first
    pub fn similar(&self, track_id: &str, limit: Option<usize>) -> WebServerResult<ProxiedResponse> {
        let limit = limit.unwrap_or(self.default_limit);

        let seed = self
            .tracks
            .iter()
            .find(|track| track.id == track_id)
            .ok_or_else(|| WebServerError::recommendation(format!("unknown track: {track_id}")))?;

        let mut related: Vec<TrackSummary> = self
            .tracks
            .iter()
            .filter(|track| {
                track.id != seed.id && (track.genre == seed.genre || track.creator == seed.creator)
            })
            .cloned()
            .collect();
        related.sort_by(|a, b| b.play_count.cmp(&a.play_count));
        related.truncate(limit);

        Ok(ProxiedResponse::ok(json!({ "tracks": related })))
    }

    /// Without listening history the personalized feed is a diverse sample
    pub fn personalized(&self, _user_id: Option<&str>, limit: Option<usize>) -> WebServerResult<ProxiedResponse> {
        let limit = limit.unwrap_or(self.default_limit);

        let picks: Vec<TrackSummary> = self
            .tracks
            .choose_multiple(&mut rand::thread_rng(), limit)
            .cloned()
            .collect();

        Ok(ProxiedResponse::ok(json!({ "tracks": picks })))
    }
}
