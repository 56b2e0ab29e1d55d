//! Sprite Loading
//!
//! Fetches one pre-authored asset holding every feedback sound at a known
//! offset. Candidates are tried in order; the first decode that succeeds wins
//! and the catalog is never reloaded for the rest of the session.

use super::context::AudioResourceManager;
use super::events::FeedbackEvent;
use crate::platform::{
    AssetFetcher, AudioGraph, DecodedBuffer, MediaElementFactory, MediaHandle, PlatformError,
    SpriteSegment,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// Where each event's sound sits inside the sprite asset.
pub fn sprite_segment(event: FeedbackEvent) -> SpriteSegment {
    match event {
        FeedbackEvent::RestComplete => SpriteSegment::from_millis(0, 1000),
        FeedbackEvent::WorkoutStart => SpriteSegment::from_millis(1500, 1000),
        FeedbackEvent::WorkoutComplete => SpriteSegment::from_millis(3000, 2000),
        FeedbackEvent::PersonalRecord => SpriteSegment::from_millis(5500, 2000),
        FeedbackEvent::ButtonClick => SpriteSegment::from_millis(8000, 100),
        FeedbackEvent::TestSound => SpriteSegment::from_millis(8500, 1000),
    }
}

/// The decoded sprite, in whichever form loaded.
pub enum SpriteSource {
    /// Decoded into the audio graph's buffer format
    Graph(DecodedBuffer),
    /// Loaded into a shared simple-media element
    Media(Arc<dyn MediaHandle>),
}

/// Event → segment mapping into the loaded asset.
pub struct SpriteCatalog {
    url: String,
    source: SpriteSource,
}

impl SpriteCatalog {
    pub fn new(url: impl Into<String>, source: SpriteSource) -> Self {
        Self {
            url: url.into(),
            source,
        }
    }

    /// Segment for `event`, if the asset covers it.
    pub fn segment(&self, event: FeedbackEvent) -> Option<SpriteSegment> {
        let segment = sprite_segment(event);
        match &self.source {
            SpriteSource::Graph(buffer) if segment.offset >= buffer.duration() => None,
            _ => Some(segment),
        }
    }

    pub fn buffer(&self) -> Option<&DecodedBuffer> {
        match &self.source {
            SpriteSource::Graph(buffer) => Some(buffer),
            SpriteSource::Media(_) => None,
        }
    }

    pub fn media(&self) -> Option<&Arc<dyn MediaHandle>> {
        match &self.source {
            SpriteSource::Media(handle) => Some(handle),
            SpriteSource::Graph(_) => None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Result of one loading strategy across all candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyOutcome {
    #[default]
    NotAttempted,
    Failed,
    Succeeded,
}

/// Per-strategy record of the last load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub graph: StrategyOutcome,
    pub media: StrategyOutcome,
    pub loaded_from: Option<String>,
}

/// Loads the sprite at most once per session.
pub struct SpriteLoader {
    candidates: Vec<String>,
    fetcher: Arc<dyn AssetFetcher>,
    media: Option<Arc<dyn MediaElementFactory>>,
    resources: Arc<AudioResourceManager>,
    media_timeout: Duration,
    catalog: RwLock<Option<Arc<SpriteCatalog>>>,
    report: Mutex<LoadReport>,
    /// Every candidate failed; do not refetch this session
    exhausted: AtomicBool,
    load_lock: tokio::sync::Mutex<()>,
}

impl SpriteLoader {
    pub fn new(
        candidates: Vec<String>,
        fetcher: Arc<dyn AssetFetcher>,
        media: Option<Arc<dyn MediaElementFactory>>,
        resources: Arc<AudioResourceManager>,
        media_timeout: Duration,
    ) -> Self {
        Self {
            candidates,
            fetcher,
            media,
            resources,
            media_timeout,
            catalog: RwLock::new(None),
            report: Mutex::new(LoadReport::default()),
            exhausted: AtomicBool::new(false),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The loaded catalog, if any.
    pub fn catalog(&self) -> Option<Arc<SpriteCatalog>> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn report(&self) -> LoadReport {
        self.report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Try every candidate. Returns `false` when nothing could be loaded,
    /// which is an expected outcome. A full failed pass is not repeated.
    pub async fn load(&self) -> bool {
        if self.catalog().is_some() {
            return true;
        }
        if self.exhausted.load(Ordering::Acquire) {
            return false;
        }

        let _guard = self.load_lock.lock().await;
        if self.catalog().is_some() {
            return true;
        }
        if self.exhausted.load(Ordering::Acquire) {
            return false;
        }

        let profile = self.resources.profile();
        let mut report = LoadReport::default();

        for url in &self.candidates {
            let source = if profile.audio_graph {
                let Some(graph) = self.resources.ready_graph() else {
                    tracing::debug!("Sprite graph decode skipped: audio graph not ready");
                    return false;
                };
                match self.decode_with_graph(graph.as_ref(), url).await {
                    Ok(buffer) => Some(SpriteSource::Graph(buffer)),
                    Err(e) => {
                        tracing::debug!("Sprite {} not usable via graph: {}", url, e);
                        report.graph = StrategyOutcome::Failed;
                        None
                    }
                }
            } else if let (true, Some(media)) = (profile.simple_media, &self.media) {
                match self.load_with_media(media.as_ref(), url).await {
                    Ok(handle) => Some(SpriteSource::Media(handle)),
                    Err(e) => {
                        tracing::debug!("Sprite {} not usable via media: {}", url, e);
                        report.media = StrategyOutcome::Failed;
                        None
                    }
                }
            } else {
                return false;
            };

            if let Some(source) = source {
                match source {
                    SpriteSource::Graph(_) => report.graph = StrategyOutcome::Succeeded,
                    SpriteSource::Media(_) => report.media = StrategyOutcome::Succeeded,
                }
                report.loaded_from = Some(url.clone());
                tracing::info!("Loaded feedback sprite from {}", url);

                *self.catalog.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::new(SpriteCatalog::new(url.clone(), source)));
                *self.report.lock().unwrap_or_else(PoisonError::into_inner) = report;
                return true;
            }
        }

        tracing::info!("No feedback sprite available; falling back to synthesis");
        self.exhausted.store(true, Ordering::Release);
        *self.report.lock().unwrap_or_else(PoisonError::into_inner) = report;
        false
    }

    async fn decode_with_graph(
        &self,
        graph: &dyn AudioGraph,
        url: &str,
    ) -> Result<DecodedBuffer, PlatformError> {
        let bytes = self.fetcher.fetch(url).await?;
        graph.decode(bytes).await
    }

    async fn load_with_media(
        &self,
        media: &dyn MediaElementFactory,
        url: &str,
    ) -> Result<Arc<dyn MediaHandle>, PlatformError> {
        tokio::time::timeout(self.media_timeout, media.load(url, self.media_timeout))
            .await
            .map_err(|_| PlatformError::Timeout(self.media_timeout))?
    }
}
