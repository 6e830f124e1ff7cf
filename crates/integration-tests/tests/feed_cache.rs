use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use integration_tests::post_form;
use rb_cache_memory::MemoryFeedCache;
use rb_core::error::AppError;
use rb_core::models::{
    Author, Comment, CommentView, FollowEdge, Group, Identity, Post, PostFilter, PostView,
};
use rb_core::pagination::PageRequest;
use rb_core::service::BlogService;
use rb_core::traits::BlogRepo;
use rb_db_sqlite::SqliteBlogRepo;
use tokio::sync::Notify;
use uuid::Uuid;

/// Holds the next post listing after its rows are read, until released.
struct PausingRepo {
    inner: SqliteBlogRepo,
    armed: AtomicBool,
    listed: Notify,
    release: Notify,
}

impl PausingRepo {
    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlogRepo for PausingRepo {
    async fn create_author(&self, author: Author) -> anyhow::Result<bool> {
        self.inner.create_author(author).await
    }
    async fn get_author(&self, id: Uuid) -> anyhow::Result<Option<Author>> {
        self.inner.get_author(id).await
    }
    async fn get_author_by_username(&self, username: &str) -> anyhow::Result<Option<Author>> {
        self.inner.get_author_by_username(username).await
    }
    async fn create_group(&self, group: Group) -> anyhow::Result<bool> {
        self.inner.create_group(group).await
    }
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>> {
        self.inner.get_group(slug).await
    }
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        self.inner.list_groups().await
    }
    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        self.inner.create_post(post).await
    }
    async fn update_post(&self, post: Post) -> anyhow::Result<()> {
        self.inner.update_post(post).await
    }
    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<PostView>> {
        self.inner.get_post(id).await
    }
    async fn count_posts(&self, filter: PostFilter) -> anyhow::Result<u64> {
        self.inner.count_posts(filter).await
    }
    async fn list_posts_paginated(&self, filter: PostFilter, limit: i64, offset: i64) -> anyhow::Result<Vec<PostView>> {
        let rows = self.inner.list_posts_paginated(filter, limit, offset).await?;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.listed.notify_one();
            self.release.notified().await;
        }
        Ok(rows)
    }
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        self.inner.create_comment(comment).await
    }
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentView>> {
        self.inner.list_comments(post_id).await
    }
    async fn insert_follow(&self, edge: FollowEdge) -> anyhow::Result<bool> {
        self.inner.insert_follow(edge).await
    }
    async fn delete_follow(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        self.inner.delete_follow(follower_id, author_id).await
    }
    async fn is_following(&self, follower_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        self.inner.is_following(follower_id, author_id).await
    }
    async fn count_followers(&self, author_id: Uuid) -> anyhow::Result<u64> {
        self.inner.count_followers(author_id).await
    }
    async fn count_following(&self, follower_id: Uuid) -> anyhow::Result<u64> {
        self.inner.count_following(follower_id).await
    }
}

async fn pausing_blog() -> (BlogService, Arc<PausingRepo>, Arc<MemoryFeedCache>) {
    let repo = Arc::new(PausingRepo {
        inner: SqliteBlogRepo::new("sqlite::memory:").await.unwrap(),
        armed: AtomicBool::new(false),
        listed: Notify::new(),
        release: Notify::new(),
    });
    let cache = Arc::new(MemoryFeedCache::default());
    let blog = BlogService::new(repo.clone(), cache.clone());
    (blog, repo, cache)
}

#[tokio::test]
async fn test_edit_during_global_read_is_not_undone_by_the_read() {
    let (blog, repo, cache) = pausing_blog().await;
    let sarah = Identity::Authenticated(blog.register_author("sarah").await.unwrap());
    let post = blog.create_post(&sarah, post_form("old text", None)).await.unwrap();

    repo.arm();
    let reader = {
        let blog = blog.clone();
        tokio::spawn(async move { blog.global_feed(PageRequest::default()).await })
    };
    repo.listed.notified().await;

    blog.edit_post(&sarah, "sarah", post.id, post_form("new text", None))
        .await
        .unwrap();
    repo.release.notify_one();

    // The reader still answers with what it read, but must not cache it.
    let raced = reader.await.unwrap().unwrap();
    assert_eq!(raced.items[0].post.text, "old text");
    assert!(cache.is_empty());

    let fresh = blog.global_feed(PageRequest::default()).await.unwrap();
    assert_eq!(fresh.items[0].post.text, "new text");
    let again = blog.global_feed(PageRequest::default()).await.unwrap();
    assert_eq!(again.items[0].post.text, "new text");
}

#[tokio::test]
async fn test_create_during_global_read_shows_on_next_read() {
    let (blog, repo, _cache) = pausing_blog().await;
    let sarah = Identity::Authenticated(blog.register_author("sarah").await.unwrap());
    blog.create_post(&sarah, post_form("first", None)).await.unwrap();

    repo.arm();
    let reader = {
        let blog = blog.clone();
        tokio::spawn(async move { blog.global_feed(PageRequest::default()).await })
    };
    repo.listed.notified().await;
    blog.create_post(&sarah, post_form("second", None)).await.unwrap();
    repo.release.notify_one();
    reader.await.unwrap().unwrap();

    let page = blog.global_feed(PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].post.text, "second");
}

#[tokio::test]
async fn test_concurrent_registrations_yield_one_conflict() {
    let (blog, _repo, _cache) = pausing_blog().await;

    let (a, b) = tokio::join!(blog.register_author("kyle"), blog.register_author("kyle"));
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));

    let (a, b) = tokio::join!(
        blog.create_group("vova", "Volodya", ""),
        blog.create_group("vova", "Volodya", "")
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(r, Err(AppError::Conflict(_)))));
    assert_eq!(blog.list_groups().await.unwrap().len(), 1);
}
