//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use crate::models::{Author, Comment, CommentView, FollowEdge, Group, Post, PostFilter, PostView};
use crate::pagination::{Page, PageRequest};
use uuid::Uuid;

/// Data persistence contract for authors, groups, posts, comments and follows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // Author Operations
    /// Returns `false` when the username is already taken.
    async fn create_author(&self, author: Author) -> anyhow::Result<bool>;
    async fn get_author(&self, id: Uuid) -> anyhow::Result<Option<Author>>;
    async fn get_author_by_username(&self, username: &str) -> anyhow::Result<Option<Author>>;

    // Group Operations
    /// Returns `false` when the slug is already taken.
    async fn create_group(&self, group: Group) -> anyhow::Result<bool>;
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>>;
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>>;

    // Post Operations
    async fn create_post(&self, post: Post) -> anyhow::Result<()>;
    /// Persists the mutable fields (text, group, image) of an existing post.
    async fn update_post(&self, post: Post) -> anyhow::Result<()>;
    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostView>>;
    async fn count_posts(&self, filter: PostFilter) -> anyhow::Result<u64>;
    /// Newest first, ties broken by id descending.
    async fn list_posts_paginated(&self, filter: PostFilter, limit: i64, offset: i64) -> anyhow::Result<Vec<PostView>>;

    // Comment Operations
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentView>>;

    // Follow Operations
    /// Returns `false` when the (follower, author) pair already exists,
    /// including when a concurrent insert won the uniqueness race.
    async fn insert_follow(&self, edge: FollowEdge) -> anyhow::Result<bool>;
    /// Returns `false` when there was nothing to delete.
    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn count_followers(&self, author_id: Uuid) -> anyhow::Result<u64>;
    async fn count_following(&self, follower_id: Uuid) -> anyhow::Result<u64>;
}

/// Memo of rendered global feed pages.
///
/// Implementations are best effort: a miss is always acceptable, but after
/// `invalidate` returns no earlier entry may be served.
///
/// Every `invalidate` starts a new generation. A page built while the
/// generation was `g` is only stored by `set(.., g)` if no invalidation has
/// happened since, so a slow reader cannot put back a page from before a
/// write.
#[cfg_attr(test, mockall::automock)]
pub trait FeedCache: Send + Sync {
    fn generation(&self) -> u64;
    fn get(&self, page: PageRequest) -> Option<Page<PostView>>;
    /// Returns whether the page was stored.
    fn set(&self, page: PageRequest, value: Page<PostView>, generation: u64) -> bool;
    fn invalidate(&self);
}

/// A `FeedCache` that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFeedCache;

impl FeedCache for NoopFeedCache {
    fn generation(&self) -> u64 {
        0
    }

    fn get(&self, _page: PageRequest) -> Option<Page<PostView>> {
        None
    }

    fn set(&self, _page: PageRequest, _value: Page<PostView>, _generation: u64) -> bool {
        false
    }

    fn invalidate(&self) {}
}
