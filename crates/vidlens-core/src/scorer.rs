use crate::tags::TagSet;

/// Which side's enumeration order the match list follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOrder {
    /// Candidate tag order (free-text search).
    Candidate,
    /// Query tag order (image search).
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    pub matches: Vec<String>,
    pub score: f64,
}

/// Precision of `candidate` against `query`: `|query ∩ candidate| / |query|`.
///
/// Extra candidate tags do not lower the score. An empty query scores 0.
pub fn score(query: &TagSet, candidate: &TagSet, order: MatchOrder) -> Relevance {
    if query.is_empty() {
        return Relevance { matches: Vec::new(), score: 0.0 };
    }

    let matches: Vec<String> = match order {
        MatchOrder::Candidate => candidate.iter().filter(|t| query.contains(t)).map(str::to_string).collect(),
        MatchOrder::Query => query.iter().filter(|t| candidate.contains(t)).map(str::to_string).collect(),
    };
    let score = matches.len() as f64 / query.len() as f64;

    Relevance { matches, score }
}
