use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use vidlens_common::config::SearchConfig;
use vidlens_common::{ImageAnalysis, Result, ScoredResult, SearchOutcome, SearchWarning, Video};

use crate::indexer::{InsightSource, VideoCatalog};
use crate::scorer::{score, MatchOrder};
use crate::tags::TagSet;

#[derive(Debug, Clone)]
pub enum QueryInput {
    Text(String),
    Image(ImageAnalysis),
}

impl QueryInput {
    pub fn is_image(&self) -> bool {
        matches!(self, QueryInput::Image(_))
    }
}

/// Ranks catalog videos against a text or image query.
///
/// Holds no per-query state; concurrent `search` calls are independent and
/// dropping the returned future abandons its outstanding requests.
pub struct SearchOrchestrator {
    catalog: Arc<dyn VideoCatalog>,
    insights: Arc<dyn InsightSource>,
    max_in_flight: usize,
    image_result_limit: usize,
}

impl SearchOrchestrator {
    pub fn new(catalog: Arc<dyn VideoCatalog>, insights: Arc<dyn InsightSource>, config: &SearchConfig) -> Self {
        Self {
            catalog,
            insights,
            max_in_flight: config.max_in_flight.max(1),
            image_result_limit: config.image_result_limit,
        }
    }

    pub async fn search(&self, query: &QueryInput) -> Result<SearchOutcome> {
        let (tags, candidates, order, limit) = match query {
            QueryInput::Text(text) if text.trim().is_empty() => {
                return self.list_all().await;
            }
            QueryInput::Text(text) => {
                let candidates = self.catalog.search_videos(text.trim()).await?;
                (TagSet::from_query_text(text), candidates, MatchOrder::Candidate, None)
            }
            QueryInput::Image(analysis) => {
                // No server-side narrowing exists for image tags.
                let candidates = self.catalog.list_videos().await?;
                (
                    TagSet::from_image_analysis(analysis),
                    candidates,
                    MatchOrder::Query,
                    Some(self.image_result_limit),
                )
            }
        };

        tracing::info!(
            "Ranking {} candidates against {} query tags (image: {})",
            candidates.len(),
            tags.len(),
            query.is_image()
        );

        let mut outcome = self.rank(&tags, candidates, order).await;
        if let Some(limit) = limit {
            outcome.results.truncate(limit);
        }
        if outcome.is_partial() {
            tracing::warn!("Search returned partial results: {} candidates dropped", outcome.warnings.len());
        }
        Ok(outcome)
    }

    /// Identity listing for an empty text query.
    async fn list_all(&self) -> Result<SearchOutcome> {
        let videos = self.catalog.list_videos().await?;
        let results = videos
            .into_iter()
            .map(|video| ScoredResult { video, matching_tags: Vec::new(), score: 1.0 })
            .collect();
        Ok(SearchOutcome { results, warnings: Vec::new() })
    }

    async fn rank(&self, query: &TagSet, candidates: Vec<Video>, order: MatchOrder) -> SearchOutcome {
        let fetched: Vec<_> = stream::iter(candidates.into_iter().enumerate())
            .map(|(position, video)| {
                let source = self.insights.clone();
                async move {
                    let insights = source.video_insights(&video.id).await;
                    (position, video, insights)
                }
            })
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await;

        let mut ranked = Vec::with_capacity(fetched.len());
        let mut failed = Vec::new();
        for (position, video, insights) in fetched {
            match insights {
                Ok(insights) => {
                    let relevance = score(query, &TagSet::from_insights(&insights), order);
                    ranked.push((
                        position,
                        ScoredResult { video, matching_tags: relevance.matches, score: relevance.score },
                    ));
                }
                Err(e) => {
                    tracing::warn!("Dropping video {} from ranking: {}", video.id, e);
                    failed.push((position, SearchWarning { video_id: video.id, message: e.to_string() }));
                }
            }
        }

        sort_ranked(&mut ranked);
        failed.sort_by_key(|(position, _)| *position);

        SearchOutcome {
            results: ranked.into_iter().map(|(_, r)| r).collect(),
            warnings: failed.into_iter().map(|(_, w)| w).collect(),
        }
    }
}

/// Score descending; ties keep catalog position so the order does not depend
/// on which insight fetch finished first.
pub fn sort_ranked(results: &mut [(usize, ScoredResult)]) {
    results.sort_by(|a, b| b.1.score.total_cmp(&a.1.score).then(a.0.cmp(&b.0)));
}

/// Monotonic tags for overlapping searches so a slow, superseded response
/// cannot replace fresher results.
#[derive(Debug, Default)]
pub struct SearchEpochs {
    latest: AtomicU64,
}

impl SearchEpochs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == epoch
    }

    /// Returns `value` only if no newer epoch began since `epoch`.
    pub fn accept<T>(&self, epoch: u64, value: T) -> Option<T> {
        if self.is_current(epoch) {
            Some(value)
        } else {
            tracing::debug!("Discarding stale search response (epoch {})", epoch);
            None
        }
    }
}

impl SearchOrchestrator {
    /// Runs `search` under a fresh epoch; `Ok(None)` means a newer search
    /// started before this one finished.
    pub async fn search_latest(&self, epochs: &SearchEpochs, query: &QueryInput) -> Result<Option<SearchOutcome>> {
        let epoch = epochs.begin();
        let outcome = self.search(query).await?;
        Ok(epochs.accept(epoch, outcome))
    }
}
