use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use vidlens_common::config::VisionConfig;
use vidlens_common::{ImageAnalysis, Result, VidlensError};

/// Turns raw image bytes into caption tags and classified tags.
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(&self, image: Bytes) -> Result<ImageAnalysis>;
}

pub struct ComputerVisionClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ComputerVisionClient {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl ImageAnalyzer for ComputerVisionClient {
    async fn analyze(&self, image: Bytes) -> Result<ImageAnalysis> {
        let context = "Image analysis failed";
        let url = format!("{}/vision/v3.2/analyze", self.endpoint);

        let res = self.client.post(&url)
            .query(&[("visualFeatures", "Tags,Description")])
            .header("Content-Type", "application/octet-stream")
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .body(image)
            .send()
            .await
            .map_err(|e| VidlensError::transport(context, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| VidlensError::transport(context, e))?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %body, "Computer Vision API error");
            return Err(VidlensError::upstream(
                context,
                status.as_u16(),
                status.canonical_reason().unwrap_or(""),
                body,
            ));
        }

        let analysis: ImageAnalysis = serde_json::from_str(&body)
            .map_err(|e| VidlensError::decode(context, e))?;
        tracing::debug!(
            "Image analysis produced {} caption tags and {} classified tags",
            analysis.description.tags.len(),
            analysis.tags.len()
        );
        Ok(analysis)
    }
}

pub fn create_image_analyzer(config: &VisionConfig) -> Arc<dyn ImageAnalyzer> {
    Arc::new(ComputerVisionClient::new(
        config.endpoint.clone(),
        config.api_key.clone(),
        Duration::from_secs(config.request_timeout_secs),
    ))
}
