//! Draft scope keys.
//!
//! A scope is the identity of one draft: the author, the kind of content
//! being written and, for replies, what is being replied to.
//!
//! Storage keys look like `post-draft:{user}:{Category}` or
//! `post-draft:{user}:{Category}:{parent}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ScopeError;

/// Prefix for all draft storage keys.
pub const DRAFT_KEY_PREFIX: &str = "post-draft:";

/// Kind of content being composed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PostCategory {
    Post,
    Question,
    Answer,
    Comment,
    #[serde(rename = "VIDEO")]
    Video,
}

impl PostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::Post => "Post",
            PostCategory::Question => "Question",
            PostCategory::Answer => "Answer",
            PostCategory::Comment => "Comment",
            PostCategory::Video => "VIDEO",
        }
    }

    /// Replies are scoped to what they reply to.
    pub fn requires_parent(&self) -> bool {
        matches!(self, PostCategory::Answer | PostCategory::Comment)
    }

    pub fn requires_title(&self) -> bool {
        !self.requires_parent()
    }

    pub fn requires_taxonomy(&self) -> bool {
        !matches!(
            self,
            PostCategory::Answer | PostCategory::Comment | PostCategory::Video
        )
    }
}

impl fmt::Display for PostCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostCategory {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Post" => Ok(PostCategory::Post),
            "Question" => Ok(PostCategory::Question),
            "Answer" => Ok(PostCategory::Answer),
            "Comment" => Ok(PostCategory::Comment),
            "VIDEO" => Ok(PostCategory::Video),
            other => Err(ScopeError::BadKey(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeKey {
    user_id: SmolStr,
    category: PostCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<SmolStr>,
}

impl ScopeKey {
    /// Build a key. A parent id is required for replies and dropped for
    /// every other category.
    pub fn new(
        user_id: impl Into<SmolStr>,
        category: PostCategory,
        parent_id: Option<&str>,
    ) -> Result<Self, ScopeError> {
        let user_id = user_id.into();
        if user_id.trim().is_empty() {
            return Err(ScopeError::EmptyUser);
        }
        let parent_id = if category.requires_parent() {
            match parent_id.map(str::trim).filter(|p| !p.is_empty()) {
                Some(parent) => Some(SmolStr::new(parent)),
                None => {
                    return Err(ScopeError::MissingParent {
                        category: category.as_str(),
                    });
                }
            }
        } else {
            None
        };
        Ok(Self {
            user_id,
            category,
            parent_id,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn category(&self) -> PostCategory {
        self.category
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn storage_key(&self) -> String {
        match &self.parent_id {
            Some(parent) => format!(
                "{}{}:{}:{}",
                DRAFT_KEY_PREFIX, self.user_id, self.category, parent
            ),
            None => format!("{}{}:{}", DRAFT_KEY_PREFIX, self.user_id, self.category),
        }
    }

    /// Inverse of [`Self::storage_key`].
    pub fn parse_storage_key(key: &str) -> Result<Self, ScopeError> {
        let rest = key
            .strip_prefix(DRAFT_KEY_PREFIX)
            .ok_or_else(|| ScopeError::BadKey(key.to_string()))?;
        let mut parts = rest.splitn(3, ':');
        let user = parts.next().unwrap_or_default();
        let category = parts
            .next()
            .ok_or_else(|| ScopeError::BadKey(key.to_string()))?
            .parse()?;
        Self::new(user, category, parts.next())
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_format() {
        let post = ScopeKey::new("u1", PostCategory::Post, None).unwrap();
        assert_eq!(post.storage_key(), "post-draft:u1:Post");

        let answer = ScopeKey::new("u1", PostCategory::Answer, Some("q9")).unwrap();
        assert_eq!(answer.storage_key(), "post-draft:u1:Answer:q9");

        let video = ScopeKey::new("u1", PostCategory::Video, Some("ignored")).unwrap();
        assert_eq!(video.storage_key(), "post-draft:u1:VIDEO");
    }

    #[test]
    fn test_replies_need_parent() {
        assert_eq!(
            ScopeKey::new("u1", PostCategory::Answer, None),
            Err(ScopeError::MissingParent { category: "Answer" })
        );
        assert!(ScopeKey::new("u1", PostCategory::Comment, Some("  ")).is_err());
        assert_eq!(
            ScopeKey::new(" ", PostCategory::Post, None),
            Err(ScopeError::EmptyUser)
        );
    }

    #[test]
    fn test_storage_key_parses_back() {
        let key = ScopeKey::new("u1", PostCategory::Comment, Some("p:1")).unwrap();
        assert_eq!(ScopeKey::parse_storage_key(&key.storage_key()).unwrap(), key);
        assert!(ScopeKey::parse_storage_key("notes:u1:Post").is_err());
    }
}
