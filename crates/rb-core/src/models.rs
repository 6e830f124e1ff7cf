//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Blog.
//! We use UUID v7 for time-ordered, globally unique identification.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// A registered writer. `username` is unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A named category posts can be filed under (e.g., /group/vova/)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    /// The URL slug, unique per group
    pub slug: String,
    pub title: String,
    pub description: String,
}

/// The fundamental unit of publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    /// Owning author, fixed at creation
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub text: String,
    /// Opaque reference handed out by an external image store
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A post joined with the names needed to display it in a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: Post,
    /// Username of the owning author
    pub author: String,
    /// Slug of the group, if any
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: String,
}

/// Directed subscription: `follower_id` reads the posts of `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowEdge {
    pub id: Uuid,
    pub follower_id: Uuid,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The acting principal of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(Author),
}

impl Identity {
    pub fn author(&self) -> Option<&Author> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(author) => Some(author),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }
}

/// Typed selection of posts understood by every `BlogRepo` implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by anyone the given author follows
    FollowedBy(Uuid),
}

/// Submitted fields for creating or editing a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    /// Group slug; `None` files the post under no group
    #[serde(default)]
    pub group: Option<String>,
    /// On edit, `None` keeps the current image
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}
