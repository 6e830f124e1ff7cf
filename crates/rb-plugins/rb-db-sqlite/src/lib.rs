//! # rb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `rb-core` domain models.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rb_core::models::{Author, Comment, CommentView, FollowEdge, Group, Post, PostFilter, PostView};
use rb_core::traits::BlogRepo;
use sqlx::sqlite::{
    SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteQueryResult, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;

const POST_COLUMNS: &str = "p.id, p.author_id, p.group_id, p.text, p.image, p.created_at, \
     a.username AS author_username, g.slug AS group_slug \
     FROM posts p \
     JOIN authors a ON a.id = p.author_id \
     LEFT JOIN blog_groups g ON g.id = p.group_id";

pub struct SqliteBlogRepo {
    pool: SqlitePool,
}

impl SqliteBlogRepo {
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, 5).await
    }

    /// Opens the pool and applies the embedded migrations.
    ///
    /// In-memory databases live and die with a single connection, so the
    /// pool is pinned to one connection that never expires.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections.max(1));
        if url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        }

        let pool = pool_options.connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!(url, "sqlite store ready");
        Ok(Self { pool })
    }
}

/// SQL condition and bind value for a feed filter.
fn filter_clause(filter: PostFilter) -> (&'static str, Option<Uuid>) {
    match filter {
        PostFilter::All => ("", None),
        PostFilter::Group(id) => ("WHERE p.group_id = ?", Some(id)),
        PostFilter::Author(id) => ("WHERE p.author_id = ?", Some(id)),
        PostFilter::FollowedBy(id) => (
            "WHERE p.author_id IN (SELECT author_id FROM follows WHERE follower_id = ?)",
            Some(id),
        ),
    }
}

fn author_from_row(row: &SqliteRow) -> sqlx::Result<Author> {
    Ok(Author {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

fn group_from_row(row: &SqliteRow) -> sqlx::Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
    })
}

fn post_view_from_row(row: &SqliteRow) -> sqlx::Result<PostView> {
    Ok(PostView {
        post: Post {
            id: row.try_get("id")?,
            author_id: row.try_get("author_id")?,
            group_id: row.try_get("group_id")?,
            text: row.try_get("text")?,
            image: row.try_get("image")?,
            created_at: row.try_get("created_at")?,
        },
        author: row.try_get("author_username")?,
        group: row.try_get("group_slug")?,
    })
}

fn comment_view_from_row(row: &SqliteRow) -> sqlx::Result<CommentView> {
    Ok(CommentView {
        comment: Comment {
            id: row.try_get("id")?,
            post_id: row.try_get("post_id")?,
            author_id: row.try_get("author_id")?,
            text: row.try_get("text")?,
            created_at: row.try_get("created_at")?,
        },
        author: row.try_get("username")?,
    })
}

/// `Ok(false)` when the insert lost to a UNIQUE constraint.
fn inserted_unless_duplicate(
    result: sqlx::Result<SqliteQueryResult>,
    kind: &str,
    key: &str,
) -> anyhow::Result<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            tracing::debug!(kind, key, "insert hit unique constraint");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl BlogRepo for SqliteBlogRepo {
    async fn create_author(&self, author: Author) -> anyhow::Result<bool> {
        let result = sqlx::query("INSERT INTO authors (id, username, created_at) VALUES (?, ?, ?)")
            .bind(author.id)
            .bind(&author.username)
            .bind(author.created_at)
            .execute(&self.pool)
            .await;
        inserted_unless_duplicate(result, "author", &author.username)
    }

    async fn get_author(&self, id: Uuid) -> anyhow::Result<Option<Author>> {
        let row = sqlx::query("SELECT id, username, created_at FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(author_from_row).transpose()?)
    }

    async fn get_author_by_username(&self, username: &str) -> anyhow::Result<Option<Author>> {
        let row = sqlx::query("SELECT id, username, created_at FROM authors WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(author_from_row).transpose()?)
    }

    async fn create_group(&self, group: Group) -> anyhow::Result<bool> {
        let result = sqlx::query("INSERT INTO blog_groups (id, slug, title, description) VALUES (?, ?, ?, ?)")
            .bind(group.id)
            .bind(&group.slug)
            .bind(group.title)
            .bind(group.description)
            .execute(&self.pool)
            .await;
        inserted_unless_duplicate(result, "group", &group.slug)
    }

    /// Retrieves a group by its slug.
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query("SELECT id, slug, title, description FROM blog_groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(group_from_row).transpose()?)
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, slug, title, description FROM blog_groups ORDER BY title, slug")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(group_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO posts (id, author_id, group_id, text, image, created_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(post.id)
            .bind(post.author_id)
            .bind(post.group_id)
            .bind(post.text)
            .bind(post.image)
            .bind(post.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Author and creation time are never rewritten.
    async fn update_post(&self, post: Post) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE posts SET group_id = ?, text = ?, image = ? WHERE id = ?")
            .bind(post.group_id)
            .bind(post.text)
            .bind(post.image)
            .bind(post.id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("post {} vanished during update", post.id);
        }
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostView>> {
        let sql = format!("SELECT {POST_COLUMNS} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(post_view_from_row).transpose()?)
    }

    async fn count_posts(&self, filter: PostFilter) -> anyhow::Result<u64> {
        let (clause, value) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM posts p {clause}");
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        if let Some(id) = value {
            query = query.bind(id);
        }
        let count = query.fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn list_posts_paginated(&self, filter: PostFilter, limit: i64, offset: i64) -> anyhow::Result<Vec<PostView>> {
        let (clause, value) = filter_clause(filter);
        let sql = format!(
            "SELECT {POST_COLUMNS} {clause} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query(&sql);
        if let Some(id) = value {
            query = query.bind(id);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(post_view_from_row).collect::<sqlx::Result<_>>()?)
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO comments (id, post_id, author_id, text, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.text)
            .bind(comment.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentView>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created_at, a.username \
             FROM comments c JOIN authors a ON a.id = c.author_id \
             WHERE c.post_id = ? ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_view_from_row).collect::<sqlx::Result<_>>()?)
    }

    /// The UNIQUE (follower_id, author_id) constraint settles concurrent
    /// follows; the loser sees `Ok(false)`.
    async fn insert_follow(&self, edge: FollowEdge) -> anyhow::Result<bool> {
        let result = sqlx::query("INSERT INTO follows (id, follower_id, author_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(edge.id)
            .bind(edge.follower_id)
            .bind(edge.author_id)
            .bind(edge.created_at)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                tracing::debug!(follower = %edge.follower_id, author = %edge.author_id, "follow already present");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND author_id = ?")
            .bind(follower_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = ? AND author_id = ?)",
        )
        .bind(follower_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count_followers(&self, author_id: Uuid) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn count_following(&self, follower_id: Uuid) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = ?")
            .bind(follower_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};

    async fn repo() -> SqliteBlogRepo {
        SqliteBlogRepo::new("sqlite::memory:").await.unwrap()
    }

    async fn author(repo: &SqliteBlogRepo, name: &str) -> Author {
        let author = Author { id: Uuid::now_v7(), username: name.into(), created_at: Utc::now() };
        repo.create_author(author.clone()).await.unwrap();
        author
    }

    fn post(author: &Author, group: Option<&Group>, text: &str, minutes: i64) -> Post {
        Post {
            id: Uuid::now_v7(),
            author_id: author.id,
            group_id: group.map(|g| g.id),
            text: text.into(),
            image: None,
            created_at: Utc::now() - ChronoDuration::days(1) + ChronoDuration::minutes(minutes),
        }
    }

    fn edge(follower: &Author, author: &Author) -> FollowEdge {
        FollowEdge {
            id: Uuid::now_v7(),
            follower_id: follower.id,
            author_id: author.id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_follow_is_absorbed() {
        let repo = repo().await;
        let sarah = author(&repo, "sarah").await;
        let terminator = author(&repo, "terminator").await;

        assert!(repo.insert_follow(edge(&terminator, &sarah)).await.unwrap());
        assert!(!repo.insert_follow(edge(&terminator, &sarah)).await.unwrap());
        assert_eq!(repo.count_followers(sarah.id).await.unwrap(), 1);
        assert_eq!(repo.count_following(terminator.id).await.unwrap(), 1);

        assert!(repo.delete_follow(terminator.id, sarah.id).await.unwrap());
        assert!(!repo.delete_follow(terminator.id, sarah.id).await.unwrap());
        assert!(!repo.is_following(terminator.id, sarah.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_and_slug_are_reported() {
        let repo = repo().await;
        author(&repo, "sarah").await;

        let twin = Author { id: Uuid::now_v7(), username: "sarah".into(), created_at: Utc::now() };
        assert!(!repo.create_author(twin).await.unwrap());

        let group = |id| Group { id, slug: "vova".into(), title: "Volodya".into(), description: String::new() };
        assert!(repo.create_group(group(Uuid::now_v7())).await.unwrap());
        assert!(!repo.create_group(group(Uuid::now_v7())).await.unwrap());
        assert_eq!(repo.list_groups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first_with_names() {
        let repo = repo().await;
        let sarah = author(&repo, "sarah").await;
        let group = Group {
            id: Uuid::now_v7(),
            slug: "vova".into(),
            title: "Volodya".into(),
            description: "blablablb".into(),
        };
        repo.create_group(group.clone()).await.unwrap();

        repo.create_post(post(&sarah, None, "older", 1)).await.unwrap();
        repo.create_post(post(&sarah, Some(&group), "newer", 2)).await.unwrap();

        let all = repo.list_posts_paginated(PostFilter::All, 10, 0).await.unwrap();
        let texts: Vec<_> = all.iter().map(|v| v.post.text.as_str()).collect();
        assert_eq!(texts, ["newer", "older"]);
        assert_eq!(all[0].author, "sarah");
        assert_eq!(all[0].group.as_deref(), Some("vova"));
        assert_eq!(all[1].group, None);

        assert_eq!(repo.count_posts(PostFilter::Group(group.id)).await.unwrap(), 1);
        assert_eq!(repo.count_posts(PostFilter::Author(sarah.id)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_followed_filter_tracks_edges() {
        let repo = repo().await;
        let sarah = author(&repo, "sarah").await;
        let terminator = author(&repo, "terminator").await;
        repo.create_post(post(&sarah, None, "No future for you", 1)).await.unwrap();

        let filter = PostFilter::FollowedBy(terminator.id);
        assert_eq!(repo.count_posts(filter).await.unwrap(), 0);

        repo.insert_follow(edge(&terminator, &sarah)).await.unwrap();
        let feed = repo.list_posts_paginated(filter, 10, 0).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].post.text, "No future for you");
    }

    #[tokio::test]
    async fn test_update_post_keeps_author_and_timestamp() {
        let repo = repo().await;
        let sarah = author(&repo, "sarah").await;
        let original = post(&sarah, None, "No future for you", 1);
        repo.create_post(original.clone()).await.unwrap();

        let edited = Post { text: "Daskolkojmojno?".into(), image: Some("posts/image.png".into()), ..original.clone() };
        repo.update_post(edited).await.unwrap();

        let stored = repo.get_post(original.id).await.unwrap().unwrap();
        assert_eq!(stored.post.text, "Daskolkojmojno?");
        assert_eq!(stored.post.author_id, sarah.id);
        assert_eq!(stored.post.created_at, original.created_at);
        assert_eq!(stored.post.image.as_deref(), Some("posts/image.png"));
    }

    #[tokio::test]
    async fn test_comments_oldest_first() {
        let repo = repo().await;
        let sarah = author(&repo, "sarah").await;
        let target = post(&sarah, None, "post", 1);
        repo.create_post(target.clone()).await.unwrap();

        for (text, minutes) in [("second", 2), ("first", 1)] {
            repo.create_comment(Comment {
                id: Uuid::now_v7(),
                post_id: target.id,
                author_id: sarah.id,
                text: text.into(),
                created_at: Utc::now() + ChronoDuration::minutes(minutes),
            })
            .await
            .unwrap();
        }

        let comments = repo.list_comments(target.id).await.unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.comment.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
        assert_eq!(comments[0].author, "sarah");
    }
}
