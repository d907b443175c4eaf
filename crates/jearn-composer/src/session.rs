//! A live composer bound to one draft scope.
//!
//! The session owns exactly one [`ComposerState`] at a time. Switching scope
//! remounts a fresh state rather than mutating the old one, and bumps a
//! generation counter. Anything async that started under an older
//! generation (a restore, a save, a metadata fetch) checks the counter
//! before touching the live state and backs off if it changed.
//!
//! Editing operations are synchronous. Each one that changes content arms a
//! debounced autosave: the draft is written once edits have been quiet for
//! the configured window, reading whatever the content is at that moment.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use jearn_composer_core::counter::{self, CharacterCount, is_zero_width};
use jearn_composer_core::{
    BodyEditor, Classified, Clipboard, ComposerState, CoordinatorMode, Document, DocumentError,
    FocusArea, ImageLifecycle, Instant, InternalLinkChoice, LocalImageId, PendingInternalLink,
    PreviewHandle, Shortcut, UndoOutcome, UrlClassifier,
};
use smol_str::SmolStr;

use crate::backend::DraftBackend;
use crate::collab::{
    BroadcastChannel, CategorySuggestion, CreatedPost, MetadataEndpoint, PostEndpoint, Progress,
    TaxonomyEndpoint, UploadEndpoint,
};
use crate::config::ComposerConfig;
use crate::error::{ComposerError, SubmitError};
use crate::link_cards;
use crate::record::DraftContent;
use crate::scope::ScopeKey;
use crate::store::{DraftSource, DraftStore, SaveOutcome};
use crate::submit::{Poll, SubmissionPipeline, SubmitRequest, VideoAttachment};
use crate::taxonomy::{self, CategoryPicker};

/// Content to mount when a scope has no saved draft, e.g. a post being edited.
#[derive(Clone, Debug, Default)]
pub struct InitialContent {
    pub title: String,
    pub body: Document,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// A saved draft was mounted and this many image previews were bound.
    Restored { images: usize },
    /// No draft existed; the initial content is mounted.
    Fresh,
    /// The scope changed again while loading; nothing was applied.
    Superseded,
}

/// Attachments that live next to the document rather than inside it.
#[derive(Clone, Debug, Default)]
pub struct Attachments {
    pub poll: Option<Poll>,
    pub video: Option<VideoAttachment>,
}

#[derive(Debug)]
struct LiveDraft {
    scope: ScopeKey,
    state: ComposerState,
    images: ImageLifecycle,
    picker: CategoryPicker,
}

impl LiveDraft {
    fn mount(scope: ScopeKey, title: String, body: Document, config: &ComposerConfig) -> Self {
        Self {
            scope,
            state: ComposerState::new(title, body, config.history()),
            images: ImageLifecycle::new(),
            picker: CategoryPicker::new(
                config.limits.max_categories,
                config.limits.visible_categories,
            ),
        }
    }

    /// What a save writes right now. Images without a placeholder are left
    /// out but stay in memory, since undo can bring their placeholder back.
    fn content(&self) -> DraftContent {
        let referenced = self.state.document().image_ids();
        DraftContent {
            title: self.state.title().to_string(),
            body: self.state.document().clone(),
            pending_images: self
                .images
                .pending()
                .iter()
                .filter(|image| referenced.contains(&image.id))
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    live: Option<LiveDraft>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    match inner.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Reads the live content when a queued save finally runs.
struct LiveSource {
    inner: Arc<Mutex<Inner>>,
    generation: u64,
}

impl DraftSource for LiveSource {
    fn current(&self) -> Option<DraftContent> {
        let inner = lock(&self.inner);
        if inner.generation != self.generation {
            return None;
        }
        inner.live.as_ref().map(LiveDraft::content)
    }
}

pub struct ComposerSession<B> {
    store: Arc<DraftStore<B>>,
    config: Arc<ComposerConfig>,
    classifier: Arc<UrlClassifier>,
    inner: Arc<Mutex<Inner>>,
    /// Latest armed autosave; older timers see a newer value and back off.
    autosave: Arc<AtomicU64>,
}

impl<B> Clone for ComposerSession<B> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
            classifier: self.classifier.clone(),
            inner: self.inner.clone(),
            autosave: self.autosave.clone(),
        }
    }
}

impl<B> ComposerSession<B>
where
    B: DraftBackend + Send + 'static,
{
    pub fn new(store: Arc<DraftStore<B>>, config: ComposerConfig) -> Self {
        let classifier = Arc::new(config.classifier());
        Self {
            store,
            config: Arc::new(config),
            classifier,
            inner: Arc::new(Mutex::new(Inner::default())),
            autosave: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &DraftStore<B> {
        &self.store
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn classifier(&self) -> &UrlClassifier {
        &self.classifier
    }

    pub fn scope(&self) -> Option<ScopeKey> {
        lock(&self.inner).live.as_ref().map(|live| live.scope.clone())
    }

    pub fn generation(&self) -> u64 {
        lock(&self.inner).generation
    }

    fn with_live<R>(&self, f: impl FnOnce(&mut LiveDraft) -> R) -> Result<R, ComposerError> {
        let mut inner = lock(&self.inner);
        let live = inner.live.as_mut().ok_or(ComposerError::NoActiveScope)?;
        Ok(f(live))
    }

    /// Remount the composer for `scope` and restore its draft.
    ///
    /// The initial content (zero-width markers removed) is mounted at once.
    /// If a draft exists it replaces it in two phases: body and title
    /// first, then image previews bound to the mounted placeholders.
    pub async fn switch_scope(
        &self,
        scope: ScopeKey,
        initial: InitialContent,
    ) -> Result<RestoreOutcome, ComposerError> {
        let generation = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            let mut body = initial.body;
            body.strip_zero_width();
            let title: String = initial.title.chars().filter(|c| !is_zero_width(*c)).collect();
            inner.live = Some(LiveDraft::mount(scope.clone(), title, body, &self.config));
            inner.generation
        };
        tracing::debug!(%scope, generation, "composer scope switched");

        let record = self.store.load(&scope).await?;

        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            tracing::debug!(%scope, generation, current = inner.generation, "suppressing stale restore");
            return Ok(RestoreOutcome::Superseded);
        }
        let Some(record) = record else {
            return Ok(RestoreOutcome::Fresh);
        };
        let Some(live) = inner.live.as_mut() else {
            return Ok(RestoreOutcome::Superseded);
        };
        *live = LiveDraft::mount(scope, record.title, record.body, &self.config);
        let bound = live
            .images
            .rehydrate(record.pending_images, live.state.document());
        tracing::debug!(scope = %live.scope, images = bound.len(), "draft restored");
        Ok(RestoreOutcome::Restored {
            images: bound.len(),
        })
    }

    pub fn title(&self) -> Result<String, ComposerError> {
        self.with_live(|live| live.state.title().to_string())
    }

    pub fn document(&self) -> Result<Document, ComposerError> {
        self.with_live(|live| live.state.document().clone())
    }

    pub fn character_count(&self) -> Result<CharacterCount, ComposerError> {
        let max = self.config.limits.max_chars;
        self.with_live(|live| counter::measure(live.state.document(), max))
    }

    pub fn mode(&self) -> Result<CoordinatorMode, ComposerError> {
        self.with_live(|live| live.state.mode())
    }

    pub fn focus(&self) -> Result<FocusArea, ComposerError> {
        self.with_live(|live| live.state.focus())
    }

    pub fn can_undo(&self) -> Result<bool, ComposerError> {
        self.with_live(|live| live.state.can_undo())
    }

    pub fn can_redo(&self) -> Result<bool, ComposerError> {
        self.with_live(|live| live.state.can_redo())
    }

    pub fn preview(&self, id: &LocalImageId) -> Result<Option<PreviewHandle>, ComposerError> {
        self.with_live(|live| live.images.preview(id).cloned())
    }

    pub fn set_focus(&self, area: FocusArea) -> Result<(), ComposerError> {
        self.with_live(|live| live.state.set_focus(area))
    }

    pub fn blur(&self) -> Result<(), ComposerError> {
        self.with_live(|live| live.state.blur())
    }

    pub fn edit_title(&self, text: &str, now: Instant) -> Result<bool, ComposerError> {
        let changed = self.with_live(|live| live.state.edit_title(text, now))?;
        if changed {
            self.autosave();
        }
        Ok(changed)
    }

    /// Run a normal body edit.
    pub fn edit_body<R>(
        &self,
        f: impl FnOnce(&mut BodyEditor) -> Result<R, DocumentError>,
    ) -> Result<R, ComposerError> {
        let out = self.with_live(|live| f(live.state.body_mut()))??;
        self.autosave();
        Ok(out)
    }

    pub fn paste(&self, clipboard: &Clipboard, now: Instant) -> Result<Classified, ComposerError> {
        let classifier = &self.classifier;
        let out =
            self.with_live(|live| classifier.handle_paste(live.state.body_mut(), clipboard, now))??;
        self.autosave();
        Ok(out)
    }

    /// Offer a typed boundary character to the URL classifier.
    pub fn boundary(&self, ch: char, now: Instant) -> Result<Classified, ComposerError> {
        let classifier = &self.classifier;
        let out =
            self.with_live(|live| classifier.handle_boundary(live.state.body_mut(), ch, now))??;
        self.autosave();
        Ok(out)
    }

    pub fn resolve_internal(
        &self,
        pending: &PendingInternalLink,
        choice: InternalLinkChoice,
        now: Instant,
    ) -> Result<(), ComposerError> {
        let classifier = &self.classifier;
        self.with_live(|live| {
            classifier.resolve_internal(live.state.body_mut(), pending, choice, now)
        })??;
        self.autosave();
        Ok(())
    }

    pub fn insert_image(
        &self,
        bytes: Bytes,
        hint: Option<&str>,
        now: Instant,
    ) -> Result<LocalImageId, ComposerError> {
        let id = self.with_live(|live| {
            let LiveDraft { state, images, .. } = live;
            images.insert_local(state.body_mut(), bytes, hint, now)
        })??;
        self.autosave();
        Ok(id)
    }

    pub fn undo(&self) -> Result<UndoOutcome, ComposerError> {
        let outcome = self.with_live(|live| live.state.undo())?;
        self.autosave_if(!outcome.is_noop());
        Ok(outcome)
    }

    pub fn redo(&self) -> Result<UndoOutcome, ComposerError> {
        let outcome = self.with_live(|live| live.state.redo())?;
        self.autosave_if(!outcome.is_noop());
        Ok(outcome)
    }

    pub fn shortcut(&self, shortcut: Shortcut) -> Result<UndoOutcome, ComposerError> {
        match shortcut {
            Shortcut::Undo => self.undo(),
            Shortcut::Redo => self.redo(),
        }
    }

    /// Persist the live content for the active scope.
    ///
    /// The returned future owns everything it needs. The content is read
    /// when the save actually runs, and nothing is written if the scope
    /// changed in the meantime.
    pub fn save(&self) -> impl Future<Output = Result<SaveOutcome, ComposerError>> + Send + use<B> {
        let store = self.store.clone();
        let target = {
            let inner = lock(&self.inner);
            inner
                .live
                .as_ref()
                .map(|live| (live.scope.clone(), inner.generation))
        };
        let inner = self.inner.clone();
        async move {
            let (scope, generation) = target.ok_or(ComposerError::NoActiveScope)?;
            let source = LiveSource { inner, generation };
            Ok(store.save(&scope, &source).await?)
        }
    }

    /// Arm the debounced autosave.
    ///
    /// Every call restarts the quiet window, so a burst of edits produces a
    /// single save once it ends. Failures are logged. Without an async
    /// runtime nothing is scheduled and the caller has to [`Self::save`].
    pub fn autosave(&self) {
        let ticket = self.autosave.fetch_add(1, Ordering::SeqCst) + 1;
        if tokio::runtime::Handle::try_current().is_err() {
            tracing::debug!(ticket, "no runtime, autosave not scheduled");
            return;
        }
        let latest = self.autosave.clone();
        let delay = self.config.autosave_debounce();
        let save = self.save();
        n0_future::task::spawn(async move {
            tokio::time::sleep(delay).await;
            if latest.load(Ordering::SeqCst) != ticket {
                tracing::trace!(ticket, "autosave re-armed");
                return;
            }
            match save.await {
                Ok(outcome) => tracing::trace!(?outcome, "autosave finished"),
                Err(err) => tracing::warn!(%err, "autosave failed"),
            }
        });
    }

    fn autosave_if(&self, changed: bool) {
        if changed {
            self.autosave();
        }
    }

    /// Drop any armed autosave.
    fn cancel_autosave(&self) {
        self.autosave.fetch_add(1, Ordering::SeqCst);
    }

    /// Wipe title and body as one undoable step, then persist the empty
    /// content.
    pub async fn clear(&self) -> Result<SaveOutcome, ComposerError> {
        self.with_live(|live| live.state.clear())?;
        self.cancel_autosave();
        self.save().await
    }

    /// Fetch metadata for every card still loading. Returns how many cards
    /// changed.
    pub async fn resolve_link_cards(
        &self,
        endpoint: &impl MetadataEndpoint,
    ) -> Result<usize, ComposerError> {
        let (generation, urls) = {
            let inner = lock(&self.inner);
            let live = inner.live.as_ref().ok_or(ComposerError::NoActiveScope)?;
            (
                inner.generation,
                link_cards::loading_urls(live.state.document()),
            )
        };
        if urls.is_empty() {
            return Ok(0);
        }

        let results = link_cards::fetch_all(endpoint, urls).await;

        let changed: usize = {
            let mut inner = lock(&self.inner);
            if inner.generation != generation {
                tracing::debug!(generation, "dropping link metadata for a previous scope");
                return Ok(0);
            }
            let Some(live) = inner.live.as_mut() else {
                return Ok(0);
            };
            results
                .iter()
                .map(|(url, result)| link_cards::apply(&mut live.state, url, result))
                .sum()
        };
        self.autosave_if(changed > 0);
        Ok(changed)
    }

    /// Ask for category suggestions for the current content. Returns whether
    /// the picker is ready afterwards.
    pub async fn refresh_categories(
        &self,
        endpoint: &impl TaxonomyEndpoint,
        poll_options: &[String],
    ) -> Result<bool, ComposerError> {
        let (generation, text) = {
            let inner = lock(&self.inner);
            let live = inner.live.as_ref().ok_or(ComposerError::NoActiveScope)?;
            (
                inner.generation,
                taxonomy::check_text(live.state.title(), live.state.document(), poll_options),
            )
        };
        let result = match text {
            Some(text) => Some(endpoint.suggest(&text).await),
            None => None,
        };

        let mut inner = lock(&self.inner);
        if inner.generation != generation {
            return Ok(false);
        }
        let live = inner.live.as_mut().ok_or(ComposerError::NoActiveScope)?;
        live.picker.apply(result);
        Ok(live.picker.is_ready())
    }

    pub fn toggle_category(&self, id: &str) -> Result<bool, ComposerError> {
        self.with_live(|live| live.picker.toggle(id))
    }

    pub fn categories(&self) -> Result<Vec<CategorySuggestion>, ComposerError> {
        self.with_live(|live| live.picker.visible().into_iter().cloned().collect())
    }

    pub fn selected_categories(&self) -> Result<Vec<SmolStr>, ComposerError> {
        self.with_live(|live| live.picker.selected().to_vec())
    }

    /// Submit the live draft. On success the draft is deleted and a fresh
    /// composer is mounted for the same scope; on failure nothing changes.
    pub async fn submit<U, P>(
        &self,
        uploads: &U,
        posts: &P,
        channel: &dyn BroadcastChannel,
        attachments: Attachments,
        progress: Progress<'_>,
    ) -> Result<CreatedPost, ComposerError>
    where
        U: UploadEndpoint,
        P: PostEndpoint,
    {
        let (generation, request) = {
            let inner = lock(&self.inner);
            let live = inner.live.as_ref().ok_or(ComposerError::NoActiveScope)?;
            let request = SubmitRequest {
                scope: live.scope.clone(),
                title: live.state.title().to_string(),
                body: live.state.document().clone(),
                taxonomy: live.picker.selected().to_vec(),
                pending_images: live.images.pending().to_vec(),
                poll: attachments.poll,
                video: attachments.video,
            };
            (inner.generation, request)
        };
        let scope = request.scope.clone();

        let pipeline = SubmissionPipeline::new(
            uploads,
            posts,
            channel,
            &self.classifier,
            self.config.limits.max_title_chars,
        );
        let created = pipeline.run(request, progress).await?;
        self.cancel_autosave();

        {
            let mut inner = lock(&self.inner);
            if inner.generation == generation {
                inner.live = Some(LiveDraft::mount(
                    scope.clone(),
                    String::new(),
                    Document::new(),
                    &self.config,
                ));
            }
        }
        self.store
            .clear(&scope)
            .await
            .map_err(SubmitError::Store)?;
        Ok(created)
    }

    /// Unmount the composer. A draft left cleared and empty is deleted;
    /// anything else is saved one last time.
    pub async fn close(&self) -> Result<(), ComposerError> {
        let discard = {
            let inner = lock(&self.inner);
            inner.live.as_ref().map(|live| {
                (
                    live.scope.clone(),
                    live.state.mode().is_clear_locked() && live.state.is_empty(),
                )
            })
        };
        let Some((scope, discard)) = discard else {
            return Ok(());
        };
        self.cancel_autosave();
        if discard {
            self.store.clear(&scope).await?;
            tracing::debug!(%scope, "discarded cleared draft");
        } else {
            self.save().await?;
        }
        let mut inner = lock(&self.inner);
        inner.live = None;
        inner.generation += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::scope::PostCategory;
    use jearn_composer_core::{Block, Inline};

    fn session() -> ComposerSession<MemoryBackend> {
        ComposerSession::new(
            Arc::new(DraftStore::new(MemoryBackend::new())),
            ComposerConfig::default(),
        )
    }

    fn post_scope() -> ScopeKey {
        ScopeKey::new("u1", PostCategory::Post, None).unwrap()
    }

    #[tokio::test]
    async fn test_inactive_session_errors() {
        let session = session();
        assert!(matches!(
            session.title(),
            Err(ComposerError::NoActiveScope)
        ));
        assert!(matches!(
            session.save().await,
            Err(ComposerError::NoActiveScope)
        ));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_fresh_scope_strips_zero_width() {
        let session = session();
        let outcome = session
            .switch_scope(
                post_scope(),
                InitialContent {
                    title: "Ti\u{200B}tle".into(),
                    body: Document::from_blocks(vec![Block::paragraph(vec![Inline::text(
                        "a\u{FEFF}b",
                    )])]),
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Fresh);
        assert_eq!(session.title().unwrap(), "Title");
        assert_eq!(session.character_count().unwrap().count, 2);
    }

    #[tokio::test]
    async fn test_save_then_restore() {
        let session = session();
        session
            .switch_scope(post_scope(), InitialContent::default())
            .await
            .unwrap();
        let now = Instant::now();
        session.edit_title("Draft", now).unwrap();
        session.edit_body(|body| body.insert_text("hello", now)).unwrap();
        assert_eq!(session.save().await.unwrap(), SaveOutcome::Written);

        let other = ComposerSession::new(session.store.clone(), ComposerConfig::default());
        let outcome = other
            .switch_scope(post_scope(), InitialContent::default())
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored { images: 0 });
        assert_eq!(other.title().unwrap(), "Draft");
        assert_eq!(other.document().unwrap(), session.document().unwrap());
    }

    #[tokio::test]
    async fn test_clear_then_close_discards() {
        let session = session();
        session
            .switch_scope(post_scope(), InitialContent::default())
            .await
            .unwrap();
        session.edit_title("Draft", Instant::now()).unwrap();
        session.save().await.unwrap();

        session.clear().await.unwrap();
        assert_eq!(session.mode().unwrap(), CoordinatorMode::ClearLocked);
        session.close().await.unwrap();
        assert!(session.store().load(&post_scope()).await.unwrap().is_none());
        assert_eq!(session.scope(), None);
    }
}
