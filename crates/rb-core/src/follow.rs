//! # Follow Graph
//!
//! Follow edges are unique per (follower, author) pair. Following yourself is
//! blocked by comparing usernames, so the rule lives here and not in the
//! store.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Author, FollowEdge};
use crate::traits::BlogRepo;

/// What a follow request did. None of these is an error for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Clone)]
pub struct FollowGraph {
    repo: Arc<dyn BlogRepo>,
}

impl FollowGraph {
    pub fn new(repo: Arc<dyn BlogRepo>) -> Self {
        Self { repo }
    }

    async fn target(&self, username: &str) -> Result<Author> {
        self.repo
            .get_author_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("author", username))
    }

    pub async fn follow(&self, follower: &Author, username: &str) -> Result<FollowOutcome> {
        let author = self.target(username).await?;

        if follower.username == username {
            return Ok(FollowOutcome::SelfFollowIgnored);
        }
        if self.repo.is_following(follower.id, author.id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let edge = FollowEdge {
            id: Uuid::now_v7(),
            follower_id: follower.id,
            author_id: author.id,
            created_at: Utc::now(),
        };
        // A concurrent request may have inserted the same pair in between.
        if self.repo.insert_follow(edge).await? {
            tracing::info!(follower = %follower.username, author = %username, "follow created");
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Idempotent: returns whether an edge was actually removed.
    pub async fn unfollow(&self, follower: &Author, username: &str) -> Result<bool> {
        let author = self.target(username).await?;
        let removed = self.repo.delete_follow(follower.id, author.id).await?;
        if removed {
            tracing::info!(follower = %follower.username, author = %username, "follow removed");
        }
        Ok(removed)
    }

    pub async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> Result<bool> {
        Ok(self.repo.is_following(follower_id, author_id).await?)
    }
}
