pub mod client;

pub use client::{AccessTokenEndpoint, VideoIndexerClient};

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use vidlens_common::config::IndexerConfig;
use vidlens_common::{Keyframe, Result, Video, VideoInsights};

/// Lists videos and runs the service's own free-text search.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    async fn list_videos(&self) -> Result<Vec<Video>>;
    async fn search_videos(&self, query: &str) -> Result<Vec<Video>>;
}

#[async_trait]
pub trait InsightSource: Send + Sync {
    async fn video_insights(&self, video_id: &str) -> Result<VideoInsights>;
}

/// Pass-through media calls that share the indexing session.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn thumbnail(&self, video_id: &str, thumbnail_id: &str) -> Result<Bytes>;
    async fn keyframes(&self, video_id: &str) -> Result<Vec<Keyframe>>;
    async fn download_url(&self, video_id: &str) -> Result<String>;
    async fn streaming_url(&self, video_id: &str) -> Result<String>;
    async fn upload_video(&self, name: &str, file_name: &str, data: Bytes) -> Result<String>;
}

pub fn create_indexer_client(config: &IndexerConfig) -> Arc<VideoIndexerClient> {
    Arc::new(VideoIndexerClient::new(config))
}
