use std::collections::HashSet;
use vidlens_common::{ImageAnalysis, VideoInsights};

/// Case-folded set of tags that remembers first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct TagSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower-cases `tag` and adds it unless empty or already present.
    pub fn insert(&mut self, tag: &str) -> bool {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() || self.members.contains(&tag) {
            return false;
        }
        self.members.insert(tag.clone());
        self.order.push(tag);
        true
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.members.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Whitespace-separated terms of a free-text query.
    pub fn from_query_text(text: &str) -> Self {
        text.split_whitespace().collect()
    }

    /// Caption tags followed by classified tag names.
    pub fn from_image_analysis(analysis: &ImageAnalysis) -> Self {
        analysis
            .description
            .tags
            .iter()
            .map(String::as_str)
            .chain(analysis.tags.iter().map(|t| t.name.as_str()))
            .collect()
    }

    /// Label, keyword and topic names of a video, in that order.
    pub fn from_insights(insights: &VideoInsights) -> Self {
        let summary = &insights.summarized_insights;
        summary
            .labels
            .iter()
            .chain(summary.keywords.iter())
            .chain(summary.topics.iter())
            .map(|entity| entity.name.as_str())
            .collect()
    }
}

impl<'a> FromIterator<&'a str> for TagSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl PartialEq for TagSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for TagSet {}
