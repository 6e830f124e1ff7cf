//! # rb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and the core
//! `BlogService`. Reads answer with JSON; writes answer with a redirect to the
//! resource they touched.

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use rb_core::error::AppError;
use rb_core::models::{CommentForm, PostForm};
use rb_core::pagination::PageRequest;
use rb_core::service::BlogService;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub blog: BlogService,
    /// Lower-case name of the header carrying the caller's username
    pub identity_header: String,
    pub login_url: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    fn request(&self) -> PageRequest {
        PageRequest::parse(self.page.as_deref())
    }
}

type HandlerResult = Result<HttpResponse, ApiError>;

fn see_other(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// An unreadable body is treated as an empty form, so the guard still runs
/// first and blank fields fail validation.
fn form_or_default<T: Default>(form: Option<web::Form<T>>) -> T {
    form.map(web::Form::into_inner).unwrap_or_default()
}

fn post_url(username: &str, post_id: Uuid) -> String {
    format!("/{username}/{post_id}")
}

/// Anonymous writers go to the login page and come back afterwards.
fn login_redirect(data: &AppState, req: &HttpRequest) -> HttpResponse {
    see_other(format!("{}?next={}", data.login_url, req.path()))
}

/// Redirect contract for writes: login on `Unauthenticated`, `fallback` on
/// `Forbidden` when one is given, the error response otherwise.
fn redirect_denied(
    err: AppError,
    data: &AppState,
    req: &HttpRequest,
    fallback: Option<String>,
) -> HandlerResult {
    match (err, fallback) {
        (AppError::Unauthenticated, _) => Ok(login_redirect(data, req)),
        (AppError::Forbidden(_), Some(location)) => Ok(see_other(location)),
        (err, _) => Err(err.into()),
    }
}

/// Global feed (e.g., /?page=2). Cached for every visitor alike.
pub async fn index(data: web::Data<AppState>, query: web::Query<PageQuery>) -> HandlerResult {
    let page = data.blog.global_feed(query.request()).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn list_groups(data: web::Data<AppState>) -> HandlerResult {
    let groups = data.blog.list_groups().await?;
    Ok(HttpResponse::Ok().json(groups))
}

/// Group feed (e.g., /group/vova)
pub async fn group_posts(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> HandlerResult {
    let feed = data.blog.group_feed(&path.into_inner(), query.request()).await?;
    Ok(HttpResponse::Ok().json(feed))
}

/// Profile feed (e.g., /sarah), with the follow flag for signed-in callers.
pub async fn profile(
    data: web::Data<AppState>,
    user: CurrentUser,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> HandlerResult {
    let feed = data
        .blog
        .author_feed(&user.0, &path.into_inner(), query.request())
        .await?;
    Ok(HttpResponse::Ok().json(feed))
}

/// Posts by everyone the caller follows.
pub async fn follow_index(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> HandlerResult {
    match data.blog.followed_feed(&user.0, query.request()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(page)),
        Err(err) => redirect_denied(err, &data, &req, None),
    }
}

/// Single post with its comments (e.g., /sarah/<uuid>)
pub async fn post_view(
    data: web::Data<AppState>,
    path: web::Path<(String, Uuid)>,
) -> HandlerResult {
    let (username, post_id) = path.into_inner();
    let detail = data.blog.post_detail(&username, post_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

pub async fn new_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    form: Option<web::Form<PostForm>>,
) -> HandlerResult {
    match data.blog.create_post(&user.0, form_or_default(form)).await {
        Ok(_) => Ok(see_other("/")),
        Err(err) => redirect_denied(err, &data, &req, None),
    }
}

/// Non-owners are sent back to the post they tried to edit.
pub async fn post_edit(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<(String, Uuid)>,
    form: Option<web::Form<PostForm>>,
) -> HandlerResult {
    let (username, post_id) = path.into_inner();
    let target = post_url(&username, post_id);
    match data.blog.edit_post(&user.0, &username, post_id, form_or_default(form)).await {
        Ok(_) => Ok(see_other(target)),
        Err(err) => redirect_denied(err, &data, &req, Some(target)),
    }
}

pub async fn add_comment(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<(String, Uuid)>,
    form: Option<web::Form<CommentForm>>,
) -> HandlerResult {
    let (username, post_id) = path.into_inner();
    match data.blog.add_comment(&user.0, &username, post_id, form_or_default(form)).await {
        Ok(_) => Ok(see_other(post_url(&username, post_id))),
        Err(err) => redirect_denied(err, &data, &req, None),
    }
}

/// Duplicate and self follows still land on the profile.
pub async fn profile_follow(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<String>,
) -> HandlerResult {
    let username = path.into_inner();
    match data.blog.follow(&user.0, &username).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, author = %username, "follow request handled");
            Ok(see_other(format!("/{username}")))
        }
        Err(err) => redirect_denied(err, &data, &req, None),
    }
}

pub async fn profile_unfollow(
    data: web::Data<AppState>,
    req: HttpRequest,
    user: CurrentUser,
    path: web::Path<String>,
) -> HandlerResult {
    let username = path.into_inner();
    match data.blog.unfollow(&user.0, &username).await {
        Ok(_) => Ok(see_other(format!("/{username}"))),
        Err(err) => redirect_denied(err, &data, &req, None),
    }
}
