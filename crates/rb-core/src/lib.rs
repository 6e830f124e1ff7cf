//! rusty-blog/crates/rb-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Rusty-Blog.

pub mod models;
pub mod traits;
pub mod error;
pub mod guard;
pub mod pagination;
pub mod feed;
pub mod follow;
pub mod service;

// Re-exporting for easier access in other crates
pub use models::*;
pub use traits::*;
pub use error::*;
pub use feed::{FeedComposer, FeedScope};
pub use follow::{FollowGraph, FollowOutcome};
pub use pagination::{Page, PageRequest, Paginator, PAGE_SIZE};
pub use service::{AuthorFeed, BlogService, GroupFeed, PostDetail};
