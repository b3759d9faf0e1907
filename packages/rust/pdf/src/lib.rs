//! PDF documents to book chunks.
//!
//! The full text of a document is split into fixed-size character windows;
//! only the first [`MAX_CHUNKS`] windows become items.

use tracing::{debug, instrument, warn};

use contentmill_shared::{ContentItem, ContentMillError, Result};

/// Upper bound on items produced per document.
pub const MAX_CHUNKS: usize = 8;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// Extract a document's text and chunk it into book items.
///
/// Never fails: unreadable documents (including ones that make the parser
/// panic) produce an empty list.
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub async fn extract_chunks(bytes: Vec<u8>, chunk_size: usize) -> Vec<ContentItem> {
    match extract_text(bytes).await {
        Ok(text) => {
            let items = chunk_text(&text, chunk_size);
            debug!(chars = text.chars().count(), items = items.len(), "document chunked");
            items
        }
        Err(e) => {
            warn!(error = %e, "PDF extraction failed");
            Vec::new()
        }
    }
}

/// Full text of all pages, in page order.
///
/// Runs on the blocking pool; a parser panic surfaces as [`ContentMillError::Pdf`].
pub async fn extract_text(bytes: Vec<u8>) -> Result<String> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| {
            if e.is_panic() {
                ContentMillError::Pdf("PDF parser panicked".into())
            } else {
                ContentMillError::Pdf(format!("extraction task failed: {e}"))
            }
        })?
        .map_err(|e| ContentMillError::Pdf(e.to_string()))
}

/// Split `text` into non-overlapping windows of `chunk_size` characters.
///
/// Produces `min(8, ceil(chars / chunk_size))` items titled
/// `Book Chapter 1..`, each trimmed. A zero `chunk_size` yields nothing.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<ContentItem> {
    if chunk_size == 0 {
        warn!("chunk_size is 0, no chunks produced");
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size)
        .take(MAX_CHUNKS)
        .enumerate()
        .map(|(i, window)| {
            let content: String = window.iter().collect();
            ContentItem::book(format!("Book Chapter {}", i + 1), content.trim())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contentmill_shared::ContentType;

    #[test]
    fn long_text_is_capped_at_eight_chapters() {
        let text = "a".repeat(17_000);
        let items = chunk_text(&text, 2000);

        assert_eq!(items.len(), 8);
        for (i, item) in items.iter().enumerate() {
            assert_eq!(item.title, format!("Book Chapter {}", i + 1));
            assert_eq!(item.content_type, ContentType::Book);
            assert_eq!(item.source_url, "");
            assert_eq!(item.content.len(), 2000);
        }
    }

    #[test]
    fn count_is_ceiling_of_length_over_chunk_size() {
        for (len, size, expected) in [(0, 10, 0), (1, 10, 1), (10, 10, 1), (11, 10, 2), (35, 10, 4), (500, 10, 8)] {
            let text = "x".repeat(len);
            assert_eq!(chunk_text(&text, size).len(), expected, "len={len} size={size}");
        }
    }

    #[test]
    fn windows_count_characters_not_bytes() {
        let text = "é".repeat(5);
        let items = chunk_text(&text, 2);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].content, "éé");
        assert_eq!(items[2].content, "é");
    }

    #[test]
    fn chunk_content_is_trimmed() {
        let items = chunk_text("  one  two  ", 6);
        assert_eq!(items[0].content, "one");
        assert_eq!(items[1].content, "two");
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(200);
        let first: Vec<_> = chunk_text(&text, 700).into_iter().map(|i| i.content).collect();
        let second: Vec<_> = chunk_text(&text, 700).into_iter().map(|i| i.content).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_chunk_size_yields_nothing() {
        assert!(chunk_text("text", 0).is_empty());
    }

    #[tokio::test]
    async fn invalid_pdf_yields_empty_list() {
        let items = extract_chunks(b"definitely not a pdf".to_vec(), DEFAULT_CHUNK_SIZE).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn invalid_pdf_text_is_an_error() {
        let err = extract_text(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ContentMillError::Pdf(_)));
    }
}
