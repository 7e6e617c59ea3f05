use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::blog::{self, PostFields};
use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{id}", get(show_post).post(add_comment))
        .route("/make-post", get(make_post_page).post(make_post_submit))
        .route("/edit_post/{id}", get(edit_post_page).post(edit_post_submit))
        .route("/delete/{id}", get(delete_post))
}

#[derive(Template)]
#[template(path = "pages/post.html")]
struct PostTemplate {
    post: Option<Post>,
    comments: Vec<Comment>,
    logged_in: bool,
    notice: Option<String>,
}

/// One form serves both creating and editing; `action` points it at the
/// right endpoint.
#[derive(Template)]
#[template(path = "pages/post_form.html")]
struct PostFormTemplate {
    heading: String,
    action: String,
    title: String,
    subtitle: String,
    img_url: String,
    body: String,
    notice: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentForm {
    comment: String,
}

#[derive(Deserialize)]
pub struct PostForm {
    title: String,
    subtitle: String,
    img_url: String,
    body: String,
}

impl PostForm {
    fn fields(&self) -> PostFields {
        PostFields {
            title: self.title.trim().to_string(),
            subtitle: self.subtitle.trim().to_string(),
            body: self.body.clone(),
            img_url: self.img_url.trim().to_string(),
        }
    }

    /// Required-field and URL checks; Some(message) when invalid.
    fn problem(&self) -> Option<&'static str> {
        if self.title.trim().is_empty()
            || self.subtitle.trim().is_empty()
            || self.body.trim().is_empty()
            || self.img_url.trim().is_empty()
        {
            return Some("All fields are required.");
        }
        let url = self.img_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Some("The image URL must be a valid http(s) URL.");
        }
        None
    }
}

pub async fn show_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: MaybeUser,
) -> AppResult<impl IntoResponse> {
    render_post_page(&state, id, user.0.is_some(), None)
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    user: MaybeUser,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let Some(user) = user.0 else {
        return Ok(Redirect::to("/login?from=comment").into_response());
    };

    let text = form.comment.trim();
    if text.is_empty() {
        let page = render_post_page(
            &state,
            id,
            true,
            Some("Comment cannot be empty.".to_string()),
        )?;
        return Ok(page.into_response());
    }

    blog::add_comment(&state.db, id, user.id, text)?;
    Ok(Redirect::to("/").into_response())
}

fn render_post_page(
    state: &AppState,
    id: i64,
    logged_in: bool,
    notice: Option<String>,
) -> AppResult<Html<PostTemplate>> {
    // An unknown id renders an absent-post page, never an error
    let post = blog::get_post(&state.db, id)?;
    let comments = match &post {
        Some(post) => blog::list_comments(&state.db, post.id)?,
        None => Vec::new(),
    };
    Ok(Html(PostTemplate {
        post,
        comments,
        logged_in,
        notice,
    }))
}

pub async fn make_post_page(_admin: AdminUser) -> impl IntoResponse {
    Html(blank_form("New post", "/make-post", None))
}

pub async fn make_post_submit(
    State(state): State<AppState>,
    admin: AdminUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    if let Some(problem) = form.problem() {
        return Ok(Html(filled_form("New post", "/make-post", &form, problem)).into_response());
    }

    match blog::create_post(&state.db, &form.fields(), admin.0.id) {
        Ok(_) => Ok(Redirect::to("/").into_response()),
        Err(AppError::DuplicateTitle) => Ok(Html(filled_form(
            "New post",
            "/make-post",
            &form,
            "A post with that title already exists.",
        ))
        .into_response()),
        Err(e) => Err(e),
    }
}

pub async fn edit_post_page(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let post = blog::get_post(&state.db, id)?.ok_or(AppError::NotFound)?;
    Ok(Html(PostFormTemplate {
        heading: "Edit post".to_string(),
        action: format!("/edit_post/{}", id),
        title: post.title,
        subtitle: post.subtitle,
        img_url: post.img_url,
        body: post.body,
        notice: None,
    }))
}

pub async fn edit_post_submit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _admin: AdminUser,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let action = format!("/edit_post/{}", id);

    if let Some(problem) = form.problem() {
        return Ok(Html(filled_form("Edit post", &action, &form, problem)).into_response());
    }

    match blog::update_post(&state.db, id, &form.fields()) {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(AppError::DuplicateTitle) => Ok(Html(filled_form(
            "Edit post",
            &action,
            &form,
            "A post with that title already exists.",
        ))
        .into_response()),
        Err(e) => Err(e),
    }
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    _admin: AdminUser,
) -> AppResult<Response> {
    match blog::delete_post(&state.db, id) {
        // Already gone is fine; the end state is the same
        Ok(()) | Err(AppError::NotFound) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e),
    }
}

fn blank_form(heading: &str, action: &str, notice: Option<String>) -> PostFormTemplate {
    PostFormTemplate {
        heading: heading.to_string(),
        action: action.to_string(),
        title: String::new(),
        subtitle: String::new(),
        img_url: String::new(),
        body: String::new(),
        notice,
    }
}

fn filled_form(heading: &str, action: &str, form: &PostForm, notice: &str) -> PostFormTemplate {
    PostFormTemplate {
        heading: heading.to_string(),
        action: action.to_string(),
        title: form.title.clone(),
        subtitle: form.subtitle.clone(),
        img_url: form.img_url.clone(),
        body: form.body.clone(),
        notice: Some(notice.to_string()),
    }
}
