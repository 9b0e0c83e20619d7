//! In-process collaborators for unit tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use vidlens_common::{Keyframe, NamedInsight, Result, SummarizedInsights, VidlensError, Video, VideoInsights};

use crate::indexer::{InsightSource, MediaStore, VideoCatalog};

pub fn video(id: &str, thumbnail_id: Option<&str>) -> Video {
    Video {
        id: id.to_string(),
        name: format!("video {}", id),
        duration_in_seconds: 10.0,
        thumbnail_id: thumbnail_id.map(str::to_string),
        created: None,
    }
}

pub fn insights(id: &str, labels: &[&str], keywords: &[&str], topics: &[&str]) -> VideoInsights {
    let named = |names: &[&str]| -> Vec<NamedInsight> {
        names.iter().map(|n| NamedInsight { name: n.to_string(), appearances: vec![] }).collect()
    };
    VideoInsights {
        id: id.to_string(),
        name: format!("video {}", id),
        duration_in_seconds: 10.0,
        summarized_insights: SummarizedInsights {
            labels: named(labels),
            keywords: named(keywords),
            topics: named(topics),
            ..Default::default()
        },
    }
}

#[derive(Default)]
pub struct FakeIndexer {
    pub videos: Vec<Video>,
    pub search_hits: Option<Vec<Video>>,
    insights: HashMap<String, VideoInsights>,
    failing_insights: HashSet<String>,
    thumbnails: HashMap<String, Bytes>,
    failing_thumbnails: HashSet<String>,
    delay: Option<Duration>,
    pub insight_calls: AtomicUsize,
    pub search_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight_seen: AtomicUsize,
}

impl FakeIndexer {
    pub fn new(videos: Vec<Video>) -> Self {
        Self { videos, ..Default::default() }
    }

    pub fn with_insights(mut self, insights: VideoInsights) -> Self {
        self.insights.insert(insights.id.clone(), insights);
        self
    }

    pub fn failing_insights(mut self, video_id: &str) -> Self {
        self.failing_insights.insert(video_id.to_string());
        self
    }

    pub fn with_search_hits(mut self, hits: Vec<Video>) -> Self {
        self.search_hits = Some(hits);
        self
    }

    pub fn with_thumbnail(mut self, video_id: &str, data: &'static [u8]) -> Self {
        self.thumbnails.insert(video_id.to_string(), Bytes::from_static(data));
        self
    }

    pub fn failing_thumbnail(mut self, video_id: &str) -> Self {
        self.failing_thumbnails.insert(video_id.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insight_calls(&self) -> usize {
        self.insight_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoCatalog for FakeIndexer {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        Ok(self.videos.clone())
    }

    async fn search_videos(&self, _query: &str) -> Result<Vec<Video>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.search_hits.clone().unwrap_or_else(|| self.videos.clone()))
    }
}

#[async_trait]
impl InsightSource for FakeIndexer {
    async fn video_insights(&self, video_id: &str) -> Result<VideoInsights> {
        self.insight_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_seen.fetch_max(current, Ordering::SeqCst);

        match self.delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_insights.contains(video_id) {
            return Err(VidlensError::upstream("Failed to fetch video insights", 500, "Internal Server Error", "boom"));
        }
        Ok(self
            .insights
            .get(video_id)
            .cloned()
            .unwrap_or_else(|| insights(video_id, &[], &[], &[])))
    }
}

#[async_trait]
impl MediaStore for FakeIndexer {
    async fn thumbnail(&self, video_id: &str, _thumbnail_id: &str) -> Result<Bytes> {
        if self.failing_thumbnails.contains(video_id) {
            return Err(VidlensError::upstream("Failed to generate thumbnail", 500, "Internal Server Error", ""));
        }
        self.thumbnails
            .get(video_id)
            .cloned()
            .ok_or_else(|| VidlensError::upstream("Failed to generate thumbnail", 404, "Not Found", ""))
    }

    async fn keyframes(&self, _video_id: &str) -> Result<Vec<Keyframe>> {
        Ok(Vec::new())
    }

    async fn download_url(&self, video_id: &str) -> Result<String> {
        Ok(format!("https://media.test/{}.mp4", video_id))
    }

    async fn streaming_url(&self, video_id: &str) -> Result<String> {
        Ok(format!("https://media.test/{}.mp4", video_id))
    }

    async fn upload_video(&self, name: &str, _file_name: &str, _data: Bytes) -> Result<String> {
        Ok(format!("uploaded-{}", name))
    }
}
