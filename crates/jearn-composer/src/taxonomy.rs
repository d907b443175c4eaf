//! Category suggestions and selection for a post.

use jearn_composer_core::{Document, extract};
use smol_str::SmolStr;

use crate::collab::{CategorySuggestion, TaxonomyEndpoint};
use crate::error::TaxonomyError;

/// Text sent to the suggestion endpoint, or `None` when there is nothing
/// to categorize yet.
pub fn check_text(title: &str, doc: &Document, poll_options: &[String]) -> Option<String> {
    let text = extract::plain_text(doc);
    let poll_text = poll_options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if title.trim().is_empty() && text.is_empty() && poll_text.is_empty() && !extract::has_media(doc) {
        return None;
    }
    Some(format!("title: {}\n{}\n{}", title.trim(), text, poll_text))
}

#[derive(Clone, Debug)]
pub struct CategoryPicker {
    max_selected: usize,
    visible_count: usize,
    suggestions: Vec<CategorySuggestion>,
    selected: Vec<SmolStr>,
    ready: bool,
}

impl CategoryPicker {
    pub fn new(max_selected: usize, visible_count: usize) -> Self {
        Self {
            max_selected,
            visible_count,
            suggestions: Vec::new(),
            selected: Vec::new(),
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn selected(&self) -> &[SmolStr] {
        &self.selected
    }

    /// Ask the endpoint for fresh suggestions.
    pub async fn refresh(&mut self, endpoint: &impl TaxonomyEndpoint, text: Option<&str>) {
        let result = match text {
            Some(text) => Some(endpoint.suggest(text).await),
            None => None,
        };
        self.apply(result);
    }

    /// Take a fetch result. `None` means nothing was worth asking about.
    /// Failure is logged and leaves the picker not ready with no suggestions.
    /// Selections are kept either way.
    pub fn apply(&mut self, result: Option<Result<Vec<CategorySuggestion>, TaxonomyError>>) {
        match result {
            Some(Ok(mut suggestions)) => {
                suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
                tracing::debug!(count = suggestions.len(), "category suggestions received");
                self.suggestions = suggestions;
                self.ready = true;
            }
            Some(Err(err)) => {
                tracing::warn!(%err, "category suggestions unavailable");
                self.suggestions.clear();
                self.ready = false;
            }
            None => {
                self.suggestions.clear();
                self.ready = false;
            }
        }
    }

    /// Select or unselect `id`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> bool {
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
            return false;
        }
        if self.selected.len() >= self.max_selected {
            return false;
        }
        self.selected.push(SmolStr::new(id));
        true
    }

    /// Selected first in selection order, then the rest by score.
    pub fn ordered(&self) -> Vec<&CategorySuggestion> {
        let mut out: Vec<&CategorySuggestion> = self
            .selected
            .iter()
            .filter_map(|id| self.suggestions.iter().find(|s| &s.id == id))
            .collect();
        out.extend(
            self.suggestions
                .iter()
                .filter(|s| !self.selected.contains(&s.id)),
        );
        out
    }

    pub fn visible(&self) -> Vec<&CategorySuggestion> {
        let mut ordered = self.ordered();
        ordered.truncate(self.visible_count.max(self.selected.len()));
        ordered
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.suggestions.clear();
        self.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jearn_composer_core::{Block, Inline};

    struct Fixed(Result<Vec<CategorySuggestion>, TaxonomyError>);

    impl TaxonomyEndpoint for Fixed {
        async fn suggest(&self, _text: &str) -> Result<Vec<CategorySuggestion>, TaxonomyError> {
            self.0.clone()
        }
    }

    fn suggestion(id: &str, score: f32) -> CategorySuggestion {
        CategorySuggestion {
            id: id.into(),
            label: id.to_uppercase(),
            score,
        }
    }

    #[test]
    fn test_check_text_format() {
        let doc = Document::from_blocks(vec![Block::paragraph(vec![
            Inline::text("x = "),
            Inline::math("y^2"),
        ])]);
        assert_eq!(
            check_text("Hi", &doc, &["a".into(), " ".into(), "b".into()]).as_deref(),
            Some("title: Hi\nx = y^2\na\nb")
        );
        assert_eq!(check_text(" ", &Document::new(), &[]), None);
    }

    #[tokio::test]
    async fn test_selection_is_capped_and_ordered() {
        let mut picker = CategoryPicker::new(3, 5);
        let endpoint = Fixed(Ok(vec![
            suggestion("a", 0.1),
            suggestion("b", 0.9),
            suggestion("c", 0.5),
            suggestion("d", 0.3),
        ]));
        picker.refresh(&endpoint, Some("text")).await;
        assert!(picker.is_ready());

        assert!(picker.toggle("a"));
        assert!(picker.toggle("d"));
        assert!(picker.toggle("c"));
        assert!(!picker.toggle("b"));
        let ids: Vec<&str> = picker.ordered().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d", "c", "b"]);

        assert!(!picker.toggle("d"));
        assert_eq!(picker.selected(), &[SmolStr::new("a"), SmolStr::new("c")]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_ready() {
        let mut picker = CategoryPicker::new(3, 5);
        picker
            .refresh(&Fixed(Err(TaxonomyError("down".into()))), Some("text"))
            .await;
        assert!(!picker.is_ready());
        assert!(picker.ordered().is_empty());
    }
}
