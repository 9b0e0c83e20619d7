#[cfg(test)]
mod tests {
    use crate::credential::CredentialCache;
    use crate::indexer::{AccessTokenEndpoint, InsightSource, MediaStore, VideoCatalog, VideoIndexerClient};
    use std::sync::Arc;
    use bytes::Bytes;
    use serde_json::json;
    use vidlens_common::config::IndexerConfig;
    use vidlens_common::VidlensError;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_ACCOUNT: &str = "acct-1";
    const TEST_LOCATION: &str = "trial";
    const TEST_API_KEY: &str = "sub-key";
    const TEST_TOKEN: &str = "opaque-access-token";

    fn config(base_url: String) -> IndexerConfig {
        IndexerConfig {
            base_url,
            account_id: TEST_ACCOUNT.to_string(),
            location: TEST_LOCATION.to_string(),
            api_key: TEST_API_KEY.to_string(),
            language: "English".to_string(),
            request_timeout_secs: 5,
        }
    }

    fn account_path(rest: &str) -> String {
        format!("/{}/Accounts/{}/{}", TEST_LOCATION, TEST_ACCOUNT, rest)
    }

    async fn mount_auth(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/Auth/{}/Accounts/{}/AccessToken", TEST_LOCATION, TEST_ACCOUNT)))
            .and(query_param("allowEdit", "true"))
            .and(header("Ocp-Apim-Subscription-Key", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(TEST_TOKEN)))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_list_videos_reuses_token() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos")))
            .and(query_param("accessToken", TEST_TOKEN))
            .and(header("Ocp-Apim-Subscription-Key", TEST_API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"id": "v1", "name": "Beach", "durationInSeconds": 12.0, "thumbnailId": "t1", "created": "2024-05-01T10:00:00+00:00"},
                    {"id": "v2", "name": "City", "durationInSeconds": 30.5}
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));

        let videos = client.list_videos().await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].thumbnail_id.as_deref(), Some("t1"));
        assert!(videos[1].thumbnail_id.is_none());

        // Second call must not hit the auth endpoint again (expect(1) above).
        client.list_videos().await.unwrap();
    }

    #[tokio::test]
    async fn test_search_without_results_is_empty() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/Search")))
            .and(query_param("query", "red car"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let videos = client.search_videos("red car").await.unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn test_video_insights_success() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/v1/Index")))
            .and(query_param("language", "English"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "v1",
                "name": "Beach",
                "durationInSeconds": 12.0,
                "summarizedInsights": {
                    "labels": [{"name": "Beach", "appearances": [{"startTime": "0:00:00", "endTime": "0:00:05"}]}],
                    "keywords": [{"name": "sunset", "appearances": []}],
                    "topics": [{"name": "Travel", "appearances": []}]
                }
            })))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let insights = client.video_insights("v1").await.unwrap();
        assert_eq!(insights.id, "v1");
        assert_eq!(insights.summarized_insights.labels[0].name, "Beach");
        assert_eq!(insights.summarized_insights.topics[0].name, "Travel");
    }

    #[tokio::test]
    async fn test_upstream_error_carries_status_and_body() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/missing/Index")))
            .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"ErrorType":"VIDEO_NOT_FOUND"}"#))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let err = client.video_insights("missing").await.unwrap_err();
        match err {
            VidlensError::Upstream { status, status_text, body, context } => {
                assert_eq!(status, 404);
                assert_eq!(status_text, "Not Found");
                assert!(body.contains("VIDEO_NOT_FOUND"));
                assert_eq!(context, "Failed to fetch video insights");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_auth_failure_surfaces_as_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/Auth/{}/Accounts/{}/AccessToken", TEST_LOCATION, TEST_ACCOUNT)))
            .respond_with(ResponseTemplate::new(401).set_body_string("Access denied"))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let err = client.list_videos().await.unwrap_err();
        assert!(matches!(err, VidlensError::Auth(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_rejected_token_is_refreshed_on_next_call() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 2).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos")))
            .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(account_path("Videos")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        assert!(client.list_videos().await.is_err());
        assert!(client.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyframes_from_index_record() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/v1/Index")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "v1",
                "videos": [{
                    "insights": {
                        "keyFrames": [
                            {"id": 1, "instances": [{"start": "0:00:01", "thumbnailId": "kf-1"}]}
                        ]
                    }
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let frames = client.keyframes("v1").await.unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].instances[0].thumbnail_id, "kf-1");
    }

    #[tokio::test]
    async fn test_keyframes_absent_is_empty() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/v1/Index")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "v1", "videos": [{"insights": {}}]})))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        assert!(client.keyframes("v1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_thumbnail_and_download_url() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos/v1/Thumbnails/t1")))
            .and(query_param("format", "Jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path(account_path("Videos/v1/SourceFile/DownloadUrl")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!("https://media.example/v1.mp4")))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let thumb = client.thumbnail("v1", "t1").await.unwrap();
        assert_eq!(thumb, Bytes::from_static(&[0xFF, 0xD8, 0xFF]));

        assert_eq!(client.download_url("v1").await.unwrap(), "https://media.example/v1.mp4");
        assert_eq!(client.streaming_url("v1").await.unwrap(), "https://media.example/v1.mp4");
    }

    #[tokio::test]
    async fn test_upload_video_returns_id() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("POST"))
            .and(path(account_path("Videos")))
            .and(query_param("name", "holiday"))
            .and(query_param("accessToken", TEST_TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-video", "state": "Uploaded"})))
            .mount(&mock_server)
            .await;

        let client = VideoIndexerClient::new(&config(mock_server.uri()));
        let id = client
            .upload_video("holiday", "holiday.mp4", Bytes::from_static(b"fake-mp4"))
            .await
            .unwrap();
        assert_eq!(id, "new-video");
    }

    #[tokio::test]
    async fn test_clients_sharing_a_cache_authenticate_once() {
        let mock_server = MockServer::start().await;
        mount_auth(&mock_server, 1).await;

        Mock::given(method("GET"))
            .and(path(account_path("Videos")))
            .and(query_param("accessToken", TEST_TOKEN))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(2)
            .mount(&mock_server)
            .await;

        let cfg = config(mock_server.uri());
        let http = reqwest::Client::new();
        let cache = Arc::new(CredentialCache::new(Arc::new(AccessTokenEndpoint::new(http.clone(), &cfg))));
        let first = VideoIndexerClient::with_credentials(http.clone(), &cfg, cache.clone());
        let second = VideoIndexerClient::with_credentials(http, &cfg, cache);

        first.list_videos().await.unwrap();
        second.list_videos().await.unwrap();
    }
}
