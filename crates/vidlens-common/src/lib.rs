use serde::{Deserialize, Deserializer, Serialize};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};

pub mod config;
pub mod error;

pub use error::{Result, VidlensError};

/// Safety margin subtracted from a credential's expiry before it is considered stale.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 5 * 60;

/// Lifetime assumed for a token whose payload carries no readable expiry.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// A video as listed by the indexing service. Owned by the remote catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration_in_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp", skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Accepts RFC 3339, or an offset-less timestamp taken as UTC. Anything
/// else becomes `None` so one odd record cannot fail a whole listing.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(text) = raw.as_ref().and_then(|v| v.as_str()) else {
        return Ok(None);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    Ok(NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc()))
}

/// Envelope returned by the catalog list and search endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoPage {
    #[serde(default)]
    pub results: Option<Vec<Video>>,
}

impl VideoPage {
    pub fn into_videos(self) -> Vec<Video> {
        self.results.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appearance {
    #[serde(default)]
    pub start_time: String,
    #[serde(default)]
    pub end_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NamedInsight {
    pub name: String,
    #[serde(default)]
    pub appearances: Vec<Appearance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentInsight {
    pub sentiment_key: String,
    #[serde(default)]
    pub appearances: Vec<Appearance>,
}

/// Emotions and audio effects are keyed by `type` rather than `name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypedInsight {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub appearances: Vec<Appearance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SummarizedInsights {
    #[serde(default)]
    pub sentiments: Vec<SentimentInsight>,
    #[serde(default)]
    pub emotions: Vec<TypedInsight>,
    #[serde(default)]
    pub audio_effects: Vec<TypedInsight>,
    #[serde(default)]
    pub labels: Vec<NamedInsight>,
    #[serde(default)]
    pub faces: Vec<NamedInsight>,
    #[serde(default)]
    pub keywords: Vec<NamedInsight>,
    #[serde(default)]
    pub topics: Vec<NamedInsight>,
}

/// Machine-generated insight record for one video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoInsights {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub duration_in_seconds: f64,
    #[serde(default)]
    pub summarized_insights: SummarizedInsights,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeInstance {
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub thumbnail_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    pub id: serde_json::Value,
    #[serde(default)]
    pub instances: Vec<KeyframeInstance>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Caption {
    pub text: String,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageDescription {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub captions: Vec<Caption>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedTag {
    pub name: String,
    #[serde(default)]
    pub confidence: f64,
}

/// Result of the image-analysis collaborator: caption tags plus classified tags.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageAnalysis {
    #[serde(default)]
    pub description: ImageDescription,
    #[serde(default)]
    pub tags: Vec<ClassifiedTag>,
}

/// Bearer token for the indexing service together with its expiry instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(token: String, expires_at: DateTime<Utc>) -> Self {
        Self { token, expires_at }
    }

    /// True while `now + 5min < expires_at`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

/// One ranked video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredResult {
    pub video: Video,
    pub matching_tags: Vec<String>,
    pub score: f64,
}

/// A candidate that could not be ranked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchWarning {
    pub video_id: String,
    pub message: String,
}

/// Ranked results plus the candidates dropped along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    pub results: Vec<ScoredResult>,
    #[serde(default)]
    pub warnings: Vec<SearchWarning>,
}

impl SearchOutcome {
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Drops rows with no overlap at all.
    pub fn without_zero_scores(mut self) -> Self {
        self.results.retain(|r| r.score > 0.0);
        self
    }
}
