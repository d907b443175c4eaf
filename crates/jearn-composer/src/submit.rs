//! Turning a finished draft into a post.
//!
//! Validation happens first and never touches the network. Then every
//! image that is still local is uploaded, one at a time in document order,
//! and its placeholder is pointed at the remote URL. A single failed upload
//! aborts the whole submission before anything is created.

use std::collections::HashMap;

use bytes::Bytes;
use jearn_composer_core::document::Node;
use jearn_composer_core::{
    Document, ImageStatus, Inline, LocalImageId, PendingImage, UrlClassifier, extract, html,
};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use crate::collab::{
    BroadcastChannel, CreatedPost, PostEndpoint, Progress, UploadEndpoint, UploadedMedia,
};
use crate::error::{SubmitError, UploadError, ValidationError};
use crate::scope::{PostCategory, ScopeKey};

const MIN_POLL_OPTIONS: usize = 2;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub options: Vec<String>,
}

impl Poll {
    /// Options with surrounding whitespace removed, blanks dropped.
    pub fn filled_options(&self) -> Vec<String> {
        self.options
            .iter()
            .map(|o| o.trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoAttachment {
    pub bytes: Bytes,
    pub mime_type: SmolStr,
}

/// Everything the composer hands over at submission time.
#[derive(Clone, Debug)]
pub struct SubmitRequest {
    pub scope: ScopeKey,
    pub title: String,
    pub body: Document,
    pub taxonomy: Vec<SmolStr>,
    pub pending_images: Vec<PendingImage>,
    pub poll: Option<Poll>,
    pub video: Option<VideoAttachment>,
}

/// Payload for the post creation endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPayload {
    pub category: PostCategory,
    pub author_id: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SmolStr>,
    pub title: String,
    /// Rendered HTML. Empty for poll posts.
    pub content: String,
    pub taxonomy: Vec<SmolStr>,
    pub tags: Vec<SmolStr>,
    pub mentions: Vec<SmolStr>,
    pub references: Vec<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<UploadedMedia>,
}

/// Check a request without any network access.
pub fn validate(request: &SubmitRequest, max_title_chars: usize) -> Result<(), ValidationError> {
    let category = request.scope.category();
    let title = request.title.trim();
    if category.requires_title() && title.is_empty() {
        return Err(ValidationError::MissingTitle);
    }
    if title.chars().count() > max_title_chars {
        return Err(ValidationError::TitleTooLong {
            max: max_title_chars,
        });
    }
    if category.requires_taxonomy() && request.taxonomy.is_empty() {
        return Err(ValidationError::MissingCategory);
    }
    if let Some(poll) = &request.poll {
        if poll.filled_options().len() < MIN_POLL_OPTIONS {
            return Err(ValidationError::PollTooShort);
        }
    }
    if category == PostCategory::Video && request.video.is_none() {
        return Err(ValidationError::MissingVideo);
    }
    if title.is_empty()
        && request.body.is_empty()
        && request.poll.is_none()
        && request.video.is_none()
    {
        return Err(ValidationError::Empty);
    }
    Ok(())
}

/// Ids of placeholders that still point at local bytes, in document order.
fn local_image_ids(doc: &Document) -> Vec<LocalImageId> {
    let mut ids = Vec::new();
    doc.walk(&mut |node| {
        if let Node::Inline(Inline::ImagePlaceholder { attrs }) = node {
            if attrs.is_local() && !ids.contains(&attrs.local_id) {
                ids.push(attrs.local_id.clone());
            }
        }
    });
    ids
}

pub struct SubmissionPipeline<'a, U, P> {
    uploads: &'a U,
    posts: &'a P,
    channel: &'a dyn BroadcastChannel,
    classifier: &'a UrlClassifier,
    max_title_chars: usize,
}

impl<'a, U, P> SubmissionPipeline<'a, U, P>
where
    U: UploadEndpoint,
    P: PostEndpoint,
{
    pub fn new(
        uploads: &'a U,
        posts: &'a P,
        channel: &'a dyn BroadcastChannel,
        classifier: &'a UrlClassifier,
        max_title_chars: usize,
    ) -> Self {
        Self {
            uploads,
            posts,
            channel,
            classifier,
            max_title_chars,
        }
    }

    async fn upload_one(
        &self,
        index: usize,
        total: usize,
        bytes: Bytes,
        mime_type: &str,
        progress: Progress<'_>,
    ) -> Result<UploadedMedia, SubmitError> {
        let scaled = move |fraction: f32| {
            progress((index as f32 + fraction.clamp(0.0, 1.0)) / total as f32);
        };
        self.uploads
            .upload(bytes, mime_type, &scaled)
            .await
            .map_err(|source| {
                tracing::warn!(index, %source, "media upload failed");
                SubmitError::Upload { index, source }
            })
    }

    /// Upload local images, then the video, and build the payload.
    pub async fn prepare(
        &self,
        request: SubmitRequest,
        progress: Progress<'_>,
    ) -> Result<PostPayload, SubmitError> {
        validate(&request, self.max_title_chars)?;

        let SubmitRequest {
            scope,
            title,
            mut body,
            taxonomy,
            pending_images,
            poll,
            video,
        } = request;

        let local = local_image_ids(&body);
        let total = local.len() + usize::from(video.is_some());
        let mut remote: HashMap<LocalImageId, String> = HashMap::new();

        for (index, id) in local.iter().enumerate() {
            let Some(image) = pending_images.iter().find(|i| &i.id == id) else {
                tracing::warn!(%id, "placeholder has no stored bytes");
                return Err(SubmitError::Upload {
                    index,
                    source: UploadError::MissingBytes(id.to_string()),
                });
            };
            let uploaded = self
                .upload_one(index, total, image.bytes.clone(), &image.mime_type, progress)
                .await?;
            tracing::debug!(%id, url = %uploaded.url, "image uploaded");
            remote.insert(id.clone(), uploaded.url);
        }

        body.for_each_image_mut(&mut |attrs| {
            if let Some(url) = remote.get(&attrs.local_id) {
                attrs.remote_url = Some(url.clone());
                attrs.status = ImageStatus::Uploaded;
            }
        });

        let video = match video {
            Some(video) => Some(
                self.upload_one(local.len(), total, video.bytes, &video.mime_type, progress)
                    .await?,
            ),
            None => None,
        };
        progress(1.0);

        let poll = poll.map(|p| p.filled_options());
        let content = if poll.is_some() {
            String::new()
        } else {
            html::to_html(&body)
        };

        Ok(PostPayload {
            category: scope.category(),
            author_id: SmolStr::new(scope.user_id()),
            parent_id: scope.parent_id().map(SmolStr::new),
            title: title.trim().to_string(),
            content,
            taxonomy,
            tags: extract::tags(&body),
            mentions: extract::mentioned_user_ids(&body),
            references: extract::references(&body, self.classifier),
            poll,
            video,
        })
    }

    /// Validate, upload and create the post.
    pub async fn run(
        &self,
        request: SubmitRequest,
        progress: Progress<'_>,
    ) -> Result<CreatedPost, SubmitError> {
        let payload = self.prepare(request, progress).await?;
        let token = Uuid::now_v7();
        self.channel.remember(token);
        let created = self.posts.create(&payload, token).await?;
        tracing::info!(
            id = %created.id,
            category = %payload.category,
            tags = payload.tags.len(),
            "post created"
        );
        Ok(created)
    }
}
