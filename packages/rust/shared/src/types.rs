//! Core domain types for ingested content.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when neither the page nor its URL yields one.
pub const UNTITLED: &str = "Untitled";

/// Team id the original upload endpoints used when the caller supplied none.
pub const DEFAULT_TEAM_ID: &str = "aline123";

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// How an item was produced. Set by the producing strategy, never inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A web page discovered through a feed, sitemap, or listing crawl.
    Blog,
    /// A chunk of an uploaded document.
    Book,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blog => f.write_str("blog"),
            Self::Book => f.write_str("book"),
        }
    }
}

/// One normalized unit of ingested text.
///
/// Every field is always serialized, so downstream consumers see a fixed
/// six-key shape even when most values are empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Display title; never empty.
    pub title: String,
    /// Markdown body; empty when extraction failed.
    pub content: String,
    /// Producing pipeline.
    pub content_type: ContentType,
    /// Originating page URL, or empty for document chunks.
    pub source_url: String,
    /// Reserved; carried through unchanged.
    pub author: String,
    /// Reserved; carried through unchanged.
    pub user_id: String,
}

impl ContentItem {
    /// A web item scraped from `source_url`.
    pub fn blog(title: impl Into<String>, content: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self::new(title, content, ContentType::Blog, source_url)
    }

    /// A document chunk. Document items carry no source URL.
    pub fn book(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(title, content, ContentType::Book, String::new())
    }

    fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        content_type: ContentType,
        source_url: impl Into<String>,
    ) -> Self {
        let title = title.into();
        Self {
            title: if title.trim().is_empty() {
                UNTITLED.to_string()
            } else {
                title
            },
            content: content.into(),
            content_type,
            source_url: source_url.into(),
            author: String::new(),
            user_id: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Team ids
// ---------------------------------------------------------------------------

/// Supplies the team id attached to an ingestion batch.
pub trait TeamIdGenerator: Send + Sync {
    /// Produce the id for the next batch.
    fn next_id(&self) -> String;
}

/// Generates a fresh time-sortable UUID v7 per batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTeamIds;

impl TeamIdGenerator for UuidTeamIds {
    fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }
}

/// Always hands out the same caller-chosen id.
#[derive(Debug, Clone)]
pub struct FixedTeamId(pub String);

impl Default for FixedTeamId {
    fn default() -> Self {
        Self(DEFAULT_TEAM_ID.to_string())
    }
}

impl TeamIdGenerator for FixedTeamId {
    fn next_id(&self) -> String {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// IngestBatch
// ---------------------------------------------------------------------------

/// The envelope returned to callers of the ingestion entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestBatch {
    /// Team the batch is attributed to.
    pub team_id: String,
    /// Items in production order.
    pub items: Vec<ContentItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes_all_six_fields() {
        let item = ContentItem::book("Book Chapter 1", "");
        let json = serde_json::to_value(&item).expect("serialize");
        let obj = json.as_object().expect("object");

        assert_eq!(obj.len(), 6);
        for key in ["title", "content", "content_type", "source_url", "author", "user_id"] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(obj["content_type"], "book");
        assert_eq!(obj["source_url"], "");
    }

    #[test]
    fn blank_title_becomes_placeholder() {
        let item = ContentItem::blog("   ", "body", "https://example.com/a");
        assert_eq!(item.title, UNTITLED);
        assert_eq!(item.content_type, ContentType::Blog);
    }

    #[test]
    fn batch_roundtrip() {
        let batch = IngestBatch {
            team_id: FixedTeamId::default().next_id(),
            items: vec![ContentItem::blog("Post", "Body", "https://blog.test/blog/post")],
        };
        let json = serde_json::to_string(&batch).expect("serialize");
        let parsed: IngestBatch = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.team_id, "aline123");
        assert_eq!(parsed.items, batch.items);
    }

    #[test]
    fn uuid_ids_are_unique() {
        let ids = UuidTeamIds;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
