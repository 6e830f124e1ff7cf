//! Shared fixtures for the end-to-end suites: a `BlogService` over an
//! in-memory SQLite store with the two authors and the group used throughout.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rb_cache_memory::MemoryFeedCache;
use rb_core::models::{Group, Identity, Post, PostForm};
use rb_core::service::BlogService;
use rb_core::traits::BlogRepo;
use rb_db_sqlite::SqliteBlogRepo;
use uuid::Uuid;

pub struct Fixture {
    pub blog: BlogService,
    pub repo: Arc<SqliteBlogRepo>,
    pub cache: Arc<MemoryFeedCache>,
    pub sarah: Identity,
    pub terminator: Identity,
    pub group: Group,
}

impl Fixture {
    pub async fn new() -> anyhow::Result<Self> {
        let repo = Arc::new(SqliteBlogRepo::new("sqlite::memory:").await?);
        let cache = Arc::new(MemoryFeedCache::default());
        let blog = BlogService::new(repo.clone(), cache.clone());

        let sarah = Identity::Authenticated(blog.register_author("sarah").await?);
        let terminator = Identity::Authenticated(blog.register_author("terminator").await?);
        let group = blog.create_group("vova", "Volodya", "blablablb").await?;

        Ok(Self { blog, repo, cache, sarah, terminator, group })
    }

    /// Inserts `count` posts by `author`, one minute apart, oldest first.
    /// Text is `post {i}` with `i` counting from 1.
    pub async fn seed_posts(&self, author: &Identity, count: usize) -> anyhow::Result<Vec<Post>> {
        let author = author
            .author()
            .ok_or_else(|| anyhow::anyhow!("seeding requires an author"))?;
        let start = Utc::now() - Duration::days(1);

        let mut posts = Vec::with_capacity(count);
        for i in 1..=count {
            let post = Post {
                id: Uuid::now_v7(),
                author_id: author.id,
                group_id: Some(self.group.id),
                text: format!("post {i}"),
                image: None,
                created_at: start + Duration::minutes(i as i64),
            };
            self.repo.create_post(post.clone()).await?;
            posts.push(post);
        }
        Ok(posts)
    }
}

pub fn post_form(text: &str, group: Option<&str>) -> PostForm {
    PostForm {
        text: text.to_string(),
        group: group.map(str::to_string),
        image: None,
    }
}
