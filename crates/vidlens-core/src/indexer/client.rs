use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use vidlens_common::config::IndexerConfig;
use vidlens_common::{Keyframe, Result, VidlensError, Video, VideoInsights, VideoPage};

use super::{InsightSource, MediaStore, VideoCatalog};
use crate::credential::{CredentialCache, TokenIssuer};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

/// Sends the request and turns a non-success status into `VidlensError::Upstream`.
async fn send_checked(request: RequestBuilder, context: &str) -> Result<Response> {
    let res = request
        .send()
        .await
        .map_err(|e| VidlensError::transport(context, e))?;

    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    let body = res.text().await.unwrap_or_default();
    tracing::error!(
        status = status.as_u16(),
        status_text = status.canonical_reason().unwrap_or(""),
        body = %body,
        "{}", context
    );
    Err(VidlensError::upstream(
        context,
        status.as_u16(),
        status.canonical_reason().unwrap_or(""),
        body,
    ))
}

fn parse_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| VidlensError::decode(context, e))
}

/// Bodies that carry a single string come back JSON-quoted; accept raw text too.
fn parse_string_body(body: &str) -> String {
    serde_json::from_str::<String>(body).unwrap_or_else(|_| body.trim().to_string())
}

/// The identity endpoint that issues account access tokens.
pub struct AccessTokenEndpoint {
    client: Client,
    base_url: String,
    location: String,
    account_id: String,
    api_key: String,
}

impl AccessTokenEndpoint {
    pub fn new(client: Client, config: &IndexerConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            location: config.location.clone(),
            account_id: config.account_id.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl TokenIssuer for AccessTokenEndpoint {
    async fn issue_token(&self) -> Result<String> {
        let url = format!(
            "{}/Auth/{}/Accounts/{}/AccessToken",
            self.base_url, self.location, self.account_id
        );
        tracing::debug!("Requesting access token from: {}", url);

        let req = self
            .client
            .get(&url)
            .query(&[("allowEdit", "true")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key);

        let context = "Failed to get access token";
        let body = send_checked(req, context)
            .await?
            .text()
            .await
            .map_err(|e| VidlensError::transport(context, e))?;

        Ok(parse_string_body(&body))
    }
}

/// Client for the video indexing service. One instance per process; every
/// call reuses the same credential cache.
pub struct VideoIndexerClient {
    client: Client,
    base_url: String,
    location: String,
    account_id: String,
    api_key: String,
    language: String,
    credentials: Arc<CredentialCache>,
}

impl VideoIndexerClient {
    pub fn new(config: &IndexerConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();

        let issuer = Arc::new(AccessTokenEndpoint::new(client.clone(), config));
        let credentials = Arc::new(CredentialCache::new(issuer));
        Self::with_credentials(client, config, credentials)
    }

    pub fn with_credentials(client: Client, config: &IndexerConfig, credentials: Arc<CredentialCache>) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            location: config.location.clone(),
            account_id: config.account_id.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            credentials,
        }
    }

    fn account_url(&self, path: &str) -> String {
        format!(
            "{}/{}/Accounts/{}/{}",
            self.base_url, self.location, self.account_id, path
        )
    }

    /// Attaches the access token and subscription key. The URL is logged
    /// before the token is added.
    async fn authorized(&self, request: RequestBuilder, url: &str) -> Result<RequestBuilder> {
        let cred = self.credentials.acquire(false).await?;
        tracing::debug!("Calling indexer: {}", url);
        Ok(request
            .query(&[("accessToken", cred.token.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.api_key))
    }

    async fn execute(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        match send_checked(request, context).await {
            Err(err @ VidlensError::Upstream { status: 401, .. }) => {
                // The service rejected the token; make the next caller re-authenticate.
                self.credentials.invalidate().await;
                Err(err)
            }
            other => other,
        }
    }

    async fn get_text(&self, path: &str, params: &[(&str, &str)], context: &str) -> Result<String> {
        let url = self.account_url(path);
        let req = self.authorized(self.client.get(&url).query(params), &url).await?;
        self.execute(req, context)
            .await?
            .text()
            .await
            .map_err(|e| VidlensError::transport(context, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)], context: &str) -> Result<T> {
        let body = self.get_text(path, params, context).await?;
        parse_json(&body, context)
    }

    async fn index_record(&self, video_id: &str, context: &str) -> Result<String> {
        let path = format!("Videos/{}/Index", video_id);
        self.get_text(&path, &[("language", self.language.as_str())], context).await
    }
}

#[async_trait]
impl VideoCatalog for VideoIndexerClient {
    async fn list_videos(&self) -> Result<Vec<Video>> {
        let page: VideoPage = self.get_json("Videos", &[], "Failed to fetch videos").await?;
        Ok(page.into_videos())
    }

    async fn search_videos(&self, query: &str) -> Result<Vec<Video>> {
        let page: VideoPage = self
            .get_json("Videos/Search", &[("query", query)], "Failed to search videos")
            .await?;
        Ok(page.into_videos())
    }
}

#[async_trait]
impl InsightSource for VideoIndexerClient {
    async fn video_insights(&self, video_id: &str) -> Result<VideoInsights> {
        let context = "Failed to fetch video insights";
        let body = self.index_record(video_id, context).await?;
        parse_json(&body, context)
    }
}

#[async_trait]
impl MediaStore for VideoIndexerClient {
    async fn thumbnail(&self, video_id: &str, thumbnail_id: &str) -> Result<Bytes> {
        let context = "Failed to generate thumbnail";
        let url = self.account_url(&format!("Videos/{}/Thumbnails/{}", video_id, thumbnail_id));
        let req = self
            .authorized(self.client.get(&url).query(&[("format", "Jpeg")]), &url)
            .await?;
        self.execute(req, context)
            .await?
            .bytes()
            .await
            .map_err(|e| VidlensError::transport(context, e))
    }

    async fn keyframes(&self, video_id: &str) -> Result<Vec<Keyframe>> {
        let context = "Failed to fetch video keyframes";
        let body = self.index_record(video_id, context).await?;
        let record: serde_json::Value = parse_json(&body, context)?;

        match record.pointer("/videos/0/insights/keyFrames") {
            Some(frames) if !frames.is_null() => {
                serde_json::from_value(frames.clone()).map_err(|e| VidlensError::decode(context, e))
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn download_url(&self, video_id: &str) -> Result<String> {
        let path = format!("Videos/{}/SourceFile/DownloadUrl", video_id);
        let body = self.get_text(&path, &[], "Failed to fetch video download URL").await?;
        Ok(parse_string_body(&body))
    }

    async fn streaming_url(&self, video_id: &str) -> Result<String> {
        // The service serves playback from the same source-file URL.
        let path = format!("Videos/{}/SourceFile/DownloadUrl", video_id);
        let body = self.get_text(&path, &[], "Failed to fetch video streaming URL").await?;
        Ok(parse_string_body(&body))
    }

    async fn upload_video(&self, name: &str, file_name: &str, data: Bytes) -> Result<String> {
        let context = "Failed to upload video";
        let url = self.account_url("Videos");

        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let req = self
            .client
            .post(&url)
            .query(&[("name", name), ("videoUrl", "")])
            .multipart(form);
        let req = self.authorized(req, &url).await?;

        let body = self
            .execute(req, context)
            .await?
            .text()
            .await
            .map_err(|e| VidlensError::transport(context, e))?;
        let parsed: UploadResponse = parse_json(&body, context)?;
        tracing::info!("Uploaded video '{}' as {}", name, parsed.id);
        Ok(parsed.id)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
