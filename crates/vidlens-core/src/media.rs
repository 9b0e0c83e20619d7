use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use vidlens_common::Video;

use crate::indexer::MediaStore;

/// JPEG preview of one video. The bytes are released when the value drops.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub video_id: String,
    pub data: Bytes,
}

impl Thumbnail {
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.data))
    }
}

/// Fetches thumbnails for `videos`, at most `max_in_flight` at a time.
///
/// The output keeps the input order. A video without a thumbnail id, or whose
/// thumbnail fetch fails, is returned with `None`.
pub async fn attach_thumbnails(
    media: Arc<dyn MediaStore>,
    videos: Vec<Video>,
    max_in_flight: usize,
) -> Vec<(Video, Option<Thumbnail>)> {
    stream::iter(videos)
        .map(|video| {
            let media = media.clone();
            async move {
                let thumb = match video.thumbnail_id.as_deref() {
                    Some(thumbnail_id) => match media.thumbnail(&video.id, thumbnail_id).await {
                        Ok(data) => Some(Thumbnail { video_id: video.id.clone(), data }),
                        Err(e) => {
                            tracing::warn!("Error generating thumbnail for video {}: {}", video.id, e);
                            None
                        }
                    },
                    None => None,
                };
                (video, thumb)
            }
        })
        .buffered(max_in_flight.max(1))
        .collect()
        .await
}
