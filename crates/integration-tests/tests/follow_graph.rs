use integration_tests::{post_form, Fixture};
use rb_core::error::AppError;
use rb_core::follow::FollowOutcome;
use rb_core::models::Identity;
use rb_core::pagination::PageRequest;
use rb_core::traits::BlogRepo;

#[tokio::test]
async fn test_double_follow_leaves_one_edge() {
    let fx = Fixture::new().await.unwrap();

    let first = fx.blog.follow(&fx.terminator, "sarah").await.unwrap();
    let second = fx.blog.follow(&fx.terminator, "sarah").await.unwrap();
    assert_eq!(first, FollowOutcome::Followed);
    assert_eq!(second, FollowOutcome::AlreadyFollowing);

    let sarah = fx.sarah.author().unwrap();
    assert_eq!(fx.repo.count_followers(sarah.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unfollow_removes_posts_from_follow_feed() {
    let fx = Fixture::new().await.unwrap();
    fx.blog
        .create_post(&fx.sarah, post_form("No future for you", Some("vova")))
        .await
        .unwrap();

    fx.blog.follow(&fx.terminator, "sarah").await.unwrap();
    let feed = fx.blog.followed_feed(&fx.terminator, PageRequest::default()).await.unwrap();
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].post.text, "No future for you");

    assert!(fx.blog.unfollow(&fx.terminator, "sarah").await.unwrap());
    let sarah = fx.sarah.author().unwrap();
    assert_eq!(fx.repo.count_followers(sarah.id).await.unwrap(), 0);

    let feed = fx.blog.followed_feed(&fx.terminator, PageRequest::default()).await.unwrap();
    assert!(feed.items.is_empty());
}

#[tokio::test]
async fn test_follow_unfollow_follow_leaves_exactly_one_edge() {
    let fx = Fixture::new().await.unwrap();
    let (follower, author) = (fx.terminator.author().unwrap(), fx.sarah.author().unwrap());

    fx.blog.follow(&fx.terminator, "sarah").await.unwrap();
    fx.blog.unfollow(&fx.terminator, "sarah").await.unwrap();
    assert!(!fx.blog.unfollow(&fx.terminator, "sarah").await.unwrap());
    let again = fx.blog.follow(&fx.terminator, "sarah").await.unwrap();

    assert_eq!(again, FollowOutcome::Followed);
    assert!(fx.blog.graph().is_following(follower.id, author.id).await.unwrap());
    assert_eq!(fx.repo.count_following(follower.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_self_follow_is_ignored() {
    let fx = Fixture::new().await.unwrap();

    let outcome = fx.blog.follow(&fx.sarah, "sarah").await.unwrap();
    assert_eq!(outcome, FollowOutcome::SelfFollowIgnored);

    let sarah = fx.sarah.author().unwrap();
    assert_eq!(fx.repo.count_following(sarah.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_follow_requires_identity_and_known_author() {
    let fx = Fixture::new().await.unwrap();

    assert!(matches!(
        fx.blog.follow(&Identity::Anonymous, "sarah").await,
        Err(AppError::Unauthenticated)
    ));
    assert!(matches!(
        fx.blog.unfollow(&Identity::Anonymous, "sarah").await,
        Err(AppError::Unauthenticated)
    ));
    assert!(matches!(
        fx.blog.follow(&fx.terminator, "ghost").await,
        Err(AppError::NotFound("author", _))
    ));
    assert!(matches!(
        fx.blog.followed_feed(&Identity::Anonymous, PageRequest::default()).await,
        Err(AppError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_concurrent_follows_settle_on_one_edge() {
    let fx = Fixture::new().await.unwrap();
    let graph = fx.blog.graph().clone();
    let follower = fx.terminator.author().unwrap().clone();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let graph = graph.clone();
            let follower = follower.clone();
            tokio::spawn(async move { graph.follow(&follower, "sarah").await })
        })
        .collect();

    let mut created = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == FollowOutcome::Followed {
            created += 1;
        }
    }
    assert_eq!(created, 1);
    assert_eq!(fx.repo.count_following(follower.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_profile_reports_follow_state() {
    let fx = Fixture::new().await.unwrap();
    fx.blog.follow(&fx.terminator, "sarah").await.unwrap();

    let seen_by_follower = fx
        .blog
        .author_feed(&fx.terminator, "sarah", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(seen_by_follower.is_following, Some(true));
    assert_eq!(seen_by_follower.followers, 1);

    let seen_by_anonymous = fx
        .blog
        .author_feed(&Identity::Anonymous, "sarah", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(seen_by_anonymous.is_following, None);

    let follower_profile = fx
        .blog
        .author_feed(&fx.sarah, "terminator", PageRequest::default())
        .await
        .unwrap();
    assert_eq!(follower_profile.following, 1);
    assert_eq!(follower_profile.is_following, Some(false));
}
