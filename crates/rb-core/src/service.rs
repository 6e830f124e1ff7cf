//! # BlogService
//!
//! The facade the API layer talks to. Every write runs the guard first, then
//! the store, then clears the global feed cache when the feed could change.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::feed::{FeedComposer, FeedScope};
use crate::follow::{FollowGraph, FollowOutcome};
use crate::guard;
use crate::models::{
    Author, Comment, CommentForm, CommentView, Group, Identity, Post, PostFilter, PostForm,
    PostView,
};
use crate::pagination::{Page, PageRequest};
use crate::traits::{BlogRepo, FeedCache};

#[derive(Debug, Clone, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostView>,
}

/// A profile page: the author's posts plus follow statistics.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorFeed {
    pub author: Author,
    pub page: Page<PostView>,
    pub followers: u64,
    pub following: u64,
    /// Whether the caller follows this author; `None` for anonymous callers.
    pub is_following: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub author: Author,
    /// Total posts by the same author
    pub post_count: u64,
    pub comments: Vec<CommentView>,
}

#[derive(Clone)]
pub struct BlogService {
    repo: Arc<dyn BlogRepo>,
    cache: Arc<dyn FeedCache>,
    feeds: FeedComposer,
    graph: FollowGraph,
}

fn require_author(identity: &Identity) -> Result<&Author> {
    identity.author().ok_or(AppError::Unauthenticated)
}

fn require_text(text: &str, field: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::ValidationError(format!("{field} must not be blank")));
    }
    Ok(text.to_string())
}

/// Treats blank form values the way an empty HTML field is submitted.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl BlogService {
    pub fn new(repo: Arc<dyn BlogRepo>, cache: Arc<dyn FeedCache>) -> Self {
        Self {
            feeds: FeedComposer::new(repo.clone()),
            graph: FollowGraph::new(repo.clone()),
            repo,
            cache,
        }
    }

    pub fn feeds(&self) -> &FeedComposer {
        &self.feeds
    }

    pub fn graph(&self) -> &FollowGraph {
        &self.graph
    }

    // Provisioning

    pub async fn register_author(&self, username: &str) -> Result<Author> {
        let username = require_text(username, "username")?;
        let author = Author { id: Uuid::now_v7(), username, created_at: Utc::now() };
        // Uniqueness is enforced by the store, not by a prior lookup.
        if !self.repo.create_author(author.clone()).await? {
            return Err(AppError::Conflict(format!("username '{}' is taken", author.username)));
        }
        tracing::info!(author = %author.username, "author registered");
        Ok(author)
    }

    pub async fn create_group(&self, slug: &str, title: &str, description: &str) -> Result<Group> {
        let group = Group {
            id: Uuid::now_v7(),
            slug: require_text(slug, "slug")?,
            title: require_text(title, "title")?,
            description: description.trim().to_string(),
        };
        if !self.repo.create_group(group.clone()).await? {
            return Err(AppError::Conflict(format!("group '{}' already exists", group.slug)));
        }
        Ok(group)
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        Ok(self.repo.list_groups().await?)
    }

    /// Unknown or missing usernames resolve to the anonymous identity.
    pub async fn resolve_identity(&self, username: Option<&str>) -> Result<Identity> {
        let Some(username) = non_blank(username) else {
            return Ok(Identity::Anonymous);
        };
        match self.repo.get_author_by_username(username).await? {
            Some(author) => Ok(Identity::Authenticated(author)),
            None => {
                tracing::warn!(username, "unknown identity, treating as anonymous");
                Ok(Identity::Anonymous)
            }
        }
    }

    // Feeds

    /// The only cached feed: same content for every visitor.
    pub async fn global_feed(&self, request: PageRequest) -> Result<Page<PostView>> {
        if let Some(page) = self.cache.get(request) {
            tracing::debug!(page = request.number(), "global feed cache hit");
            return Ok(page);
        }
        // Taken before reading so a write landing mid-read voids the store.
        let generation = self.cache.generation();
        let page = self.feeds.compose(FeedScope::Global, request).await?;
        if !self.cache.set(request, page.clone(), generation) {
            tracing::debug!(page = request.number(), generation, "global feed page not cached");
        }
        Ok(page)
    }

    pub async fn group_feed(&self, slug: &str, request: PageRequest) -> Result<GroupFeed> {
        let group = self
            .repo
            .get_group(slug)
            .await?
            .ok_or_else(|| AppError::not_found("group", slug))?;
        let page = self.feeds.paginate(PostFilter::Group(group.id), request).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn author_feed(
        &self,
        identity: &Identity,
        username: &str,
        request: PageRequest,
    ) -> Result<AuthorFeed> {
        let author = self.author_by_username(username).await?;
        let page = self.feeds.paginate(PostFilter::Author(author.id), request).await?;
        let is_following = match identity.author() {
            Some(viewer) => Some(self.graph.is_following(viewer.id, author.id).await?),
            None => None,
        };
        Ok(AuthorFeed {
            followers: self.repo.count_followers(author.id).await?,
            following: self.repo.count_following(author.id).await?,
            author,
            page,
            is_following,
        })
    }

    pub async fn followed_feed(&self, identity: &Identity, request: PageRequest) -> Result<Page<PostView>> {
        self.feeds.compose(FeedScope::Followed(identity), request).await
    }

    pub async fn post_detail(&self, username: &str, post_id: Uuid) -> Result<PostDetail> {
        let post = self.find_post(username, post_id).await?;
        let author = self
            .repo
            .get_author(post.post.author_id)
            .await?
            .ok_or_else(|| AppError::not_found("author", username))?;
        Ok(PostDetail {
            post_count: self.repo.count_posts(PostFilter::Author(author.id)).await?,
            comments: self.repo.list_comments(post_id).await?,
            post,
            author,
        })
    }

    // Writes

    pub async fn create_post(&self, identity: &Identity, form: PostForm) -> Result<Post> {
        if let Err(err) = guard::can_create(identity).require("create post") {
            tracing::warn!("anonymous post creation rejected");
            return Err(err);
        }
        let author = require_author(identity)?;

        let post = Post {
            id: Uuid::now_v7(),
            author_id: author.id,
            group_id: self.group_for_form(form.group.as_deref()).await?,
            text: require_text(&form.text, "text")?,
            image: non_blank(form.image.as_deref()).map(str::to_string),
            created_at: Utc::now(),
        };
        self.repo.create_post(post.clone()).await?;
        self.cache.invalidate();

        tracing::info!(post_id = %post.id, author = %author.username, "post created");
        Ok(post)
    }

    /// Replaces text and group; the image is only replaced when one is given.
    pub async fn edit_post(
        &self,
        identity: &Identity,
        username: &str,
        post_id: Uuid,
        form: PostForm,
    ) -> Result<Post> {
        let editor = require_author(identity)?;
        let current = self.find_post(username, post_id).await?.post;
        if let Err(err) = guard::can_modify(identity, &current).require("only the author may edit this post") {
            tracing::warn!(%post_id, editor = %editor.username, "post edit rejected");
            return Err(err);
        }

        let post = Post {
            group_id: self.group_for_form(form.group.as_deref()).await?,
            text: require_text(&form.text, "text")?,
            image: non_blank(form.image.as_deref())
                .map(str::to_string)
                .or(current.image.clone()),
            ..current
        };
        self.repo.update_post(post.clone()).await?;
        self.cache.invalidate();

        tracing::info!(%post_id, "post edited");
        Ok(post)
    }

    /// Comments never appear in feeds, so the cache is left alone.
    pub async fn add_comment(
        &self,
        identity: &Identity,
        username: &str,
        post_id: Uuid,
        form: CommentForm,
    ) -> Result<Comment> {
        guard::can_comment(identity).require("comment")?;
        let author = require_author(identity)?;
        let post = self.find_post(username, post_id).await?;

        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: post.post.id,
            author_id: author.id,
            text: require_text(&form.text, "text")?,
            created_at: Utc::now(),
        };
        self.repo.create_comment(comment.clone()).await?;
        tracing::info!(%post_id, author = %author.username, "comment added");
        Ok(comment)
    }

    pub async fn follow(&self, identity: &Identity, username: &str) -> Result<FollowOutcome> {
        let follower = require_author(identity)?;
        self.graph.follow(follower, username).await
    }

    pub async fn unfollow(&self, identity: &Identity, username: &str) -> Result<bool> {
        let follower = require_author(identity)?;
        self.graph.unfollow(follower, username).await
    }

    // Lookups

    async fn author_by_username(&self, username: &str) -> Result<Author> {
        self.repo
            .get_author_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("author", username))
    }

    /// A post only exists under its own author's username.
    async fn find_post(&self, username: &str, post_id: Uuid) -> Result<PostView> {
        self.repo
            .get_post(post_id)
            .await?
            .filter(|view| view.author == username)
            .ok_or_else(|| AppError::not_found("post", post_id.to_string()))
    }

    async fn group_for_form(&self, slug: Option<&str>) -> Result<Option<Uuid>> {
        let Some(slug) = non_blank(slug) else {
            return Ok(None);
        };
        match self.repo.get_group(slug).await? {
            Some(group) => Ok(Some(group.id)),
            None => Err(AppError::ValidationError(format!("unknown group '{slug}'"))),
        }
    }
}
