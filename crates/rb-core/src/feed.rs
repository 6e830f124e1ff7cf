//! # Feed Composer
//!
//! Builds paginated, newest-first slices of posts for one of four scopes.
//! Scopes are resolved to a typed `PostFilter` before the store is queried.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Identity, PostFilter, PostView};
use crate::pagination::{Page, PageRequest, Paginator, PAGE_SIZE};
use crate::traits::BlogRepo;

/// Which posts a feed shows.
#[derive(Debug, Clone, Copy)]
pub enum FeedScope<'a> {
    Global,
    /// Group slug
    Group(&'a str),
    /// Author username
    Author(&'a str),
    /// Authors followed by the identity; anonymous callers are rejected.
    Followed(&'a Identity),
}

#[derive(Clone)]
pub struct FeedComposer {
    repo: Arc<dyn BlogRepo>,
}

impl FeedComposer {
    pub fn new(repo: Arc<dyn BlogRepo>) -> Self {
        Self { repo }
    }

    pub async fn compose(&self, scope: FeedScope<'_>, request: PageRequest) -> Result<Page<PostView>> {
        let filter = self.resolve(scope).await?;
        self.paginate(filter, request).await
    }

    /// Maps a scope onto a store filter, failing with `NotFound` for unknown
    /// slugs and usernames.
    pub async fn resolve(&self, scope: FeedScope<'_>) -> Result<PostFilter> {
        match scope {
            FeedScope::Global => Ok(PostFilter::All),
            FeedScope::Group(slug) => {
                let group = self
                    .repo
                    .get_group(slug)
                    .await?
                    .ok_or_else(|| AppError::not_found("group", slug))?;
                Ok(PostFilter::Group(group.id))
            }
            FeedScope::Author(username) => {
                let author = self
                    .repo
                    .get_author_by_username(username)
                    .await?
                    .ok_or_else(|| AppError::not_found("author", username))?;
                Ok(PostFilter::Author(author.id))
            }
            FeedScope::Followed(identity) => identity
                .author()
                .map(|author| PostFilter::FollowedBy(author.id))
                .ok_or(AppError::Unauthenticated),
        }
    }

    pub async fn paginate(&self, filter: PostFilter, request: PageRequest) -> Result<Page<PostView>> {
        let total = self.repo.count_posts(filter).await?;
        let paginator = Paginator::new(total, PAGE_SIZE);
        let number = paginator.resolve(request);

        let items = if total == 0 {
            Vec::new()
        } else {
            let (limit, offset) = paginator.window(number);
            self.repo
                .list_posts_paginated(filter, limit as i64, offset as i64)
                .await?
        };

        tracing::debug!(?filter, total, page = number, "feed page composed");
        Ok(paginator.page(number, items))
    }
}
