pub mod credential;
pub mod indexer;
pub mod media;
pub mod scorer;
pub mod search;
pub mod tags;
pub mod vision;

#[cfg(test)]
pub(crate) mod testing;

pub use credential::{CredentialCache, TokenIssuer};
pub use indexer::{create_indexer_client, InsightSource, MediaStore, VideoCatalog, VideoIndexerClient};
pub use media::{attach_thumbnails, Thumbnail};
pub use scorer::{score, MatchOrder, Relevance};
pub use search::{QueryInput, SearchEpochs, SearchOrchestrator};
pub use tags::TagSet;
pub use vision::{create_image_analyzer, ComputerVisionClient, ImageAnalyzer};

// Re-export common types for convenience
pub use vidlens_common::{ImageAnalysis, ScoredResult, SearchOutcome, SearchWarning, Video, VideoInsights};
