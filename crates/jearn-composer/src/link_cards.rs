//! Filling in link card metadata.
//!
//! Cards are placed in the loading state. Their metadata arrives later and
//! is written into every card with the same URL. It is not an edit the user
//! made, so it does not create an undo step.

use jearn_composer_core::{ComposerState, Document, LinkCardAttrs, LinkCardStatus};

use crate::collab::{LinkMetadata, MetadataEndpoint};
use crate::error::MetadataFetchError;

/// URLs of cards still waiting for metadata, deduplicated.
pub fn loading_urls(doc: &Document) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for card in doc.link_cards() {
        if card.status == LinkCardStatus::Loading && !urls.contains(&card.url) {
            urls.push(card.url.clone());
        }
    }
    urls
}

fn fill(card: &mut LinkCardAttrs, result: &Result<LinkMetadata, MetadataFetchError>) {
    match result {
        Ok(meta) => {
            card.title = meta.title.clone();
            card.description = meta.description.clone();
            card.image = meta.image.clone();
            card.site_name = meta.site_name.clone();
            card.status = LinkCardStatus::Ready;
        }
        Err(_) => card.status = LinkCardStatus::Error,
    }
}

/// Write a fetch result into the cards for `url`. Returns how many cards
/// in the live document changed.
pub fn apply(
    state: &mut ComposerState,
    url: &str,
    result: &Result<LinkMetadata, MetadataFetchError>,
) -> usize {
    state
        .body_mut_silent()
        .update_link_cards(url, |card| fill(card, result))
}

/// Fetch metadata for each URL in turn. Failures are logged and returned,
/// never propagated.
pub async fn fetch_all(
    endpoint: &impl MetadataEndpoint,
    urls: Vec<String>,
) -> Vec<(String, Result<LinkMetadata, MetadataFetchError>)> {
    let mut results = Vec::with_capacity(urls.len());
    for url in urls {
        let result = endpoint.fetch(&url).await;
        match &result {
            Ok(meta) => tracing::debug!(%url, title = ?meta.title, "link metadata resolved"),
            Err(err) => tracing::warn!(%url, %err, "link metadata unavailable"),
        }
        results.push((url, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use jearn_composer_core::{Block, HistoryConfig, UndoManager};

    fn state_with_cards() -> ComposerState {
        let doc = Document::from_blocks(vec![
            Block::link_card(LinkCardAttrs::loading("https://example.com/a")),
            Block::link_card(LinkCardAttrs::loading("https://example.com/b")),
            Block::link_card(LinkCardAttrs::loading("https://example.com/a")),
        ]);
        ComposerState::new("t".into(), doc, HistoryConfig::default())
    }

    #[test]
    fn test_loading_urls_dedup() {
        let state = state_with_cards();
        assert_eq!(
            loading_urls(state.document()),
            vec!["https://example.com/a", "https://example.com/b"]
        );
    }

    #[test]
    fn test_apply_success_and_failure() {
        let mut state = state_with_cards();
        let ok = Ok(LinkMetadata {
            title: Some("A".into()),
            ..Default::default()
        });
        assert_eq!(apply(&mut state, "https://example.com/a", &ok), 2);

        let err = Err(MetadataFetchError {
            url: "https://example.com/b".into(),
            message: "timeout".into(),
        });
        assert_eq!(apply(&mut state, "https://example.com/b", &err), 1);

        let cards = state.document().link_cards();
        assert_eq!(cards[0].status, LinkCardStatus::Ready);
        assert_eq!(cards[0].label(), "A");
        assert_eq!(cards[1].status, LinkCardStatus::Error);
        assert_eq!(cards[1].label(), "https://example.com/b");
        assert!(!state.body().can_undo());
        assert!(loading_urls(state.document()).is_empty());
    }
}
