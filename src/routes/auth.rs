use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::extractors;
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", get(logout))
}

#[derive(Template)]
#[template(path = "pages/login.html")]
struct LoginTemplate {
    notice: Option<String>,
}

#[derive(Template)]
#[template(path = "pages/register.html")]
struct RegisterTemplate {
    notice: Option<String>,
}

/// Why the visitor landed on the login page; mapped to a notice.
#[derive(Deserialize)]
pub struct LoginQuery {
    from: Option<String>,
    registered: Option<u8>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    name: String,
    email: String,
    password: String,
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> impl IntoResponse {
    let notice = if query.registered.is_some() {
        Some("Registration successful. Log in to continue.".to_string())
    } else {
        match query.from.as_deref() {
            Some("comment") => Some("You need to login or register to comment.".to_string()),
            Some("contact") => Some("You need to login to send the message.".to_string()),
            Some("duplicate") => {
                Some("That email is already registered. Log in instead.".to_string())
            }
            _ => None,
        }
    };
    Html(LoginTemplate { notice })
}

pub async fn login_submit(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let email = form.email.trim();
    if email.is_empty() || form.password.is_empty() {
        return Ok(login_notice("Email and password are required."));
    }

    match auth::login(&state.db, email, &form.password) {
        Ok(user) => {
            let token =
                auth::session::create_session(&state.db, user.id, state.config.auth.session_hours)?;
            let cookie = format!(
                "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
                state.config.auth.cookie_name,
                token,
                state.config.auth.session_hours * 3600
            );
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
        }
        Err(AppError::UnknownEmail) => Ok(login_notice("The email you entered is not registered.")),
        Err(AppError::BadPassword) => Ok(login_notice(
            "The password you entered does not match your email.",
        )),
        Err(e) => Err(e),
    }
}

fn login_notice(msg: &str) -> Response {
    Html(LoginTemplate {
        notice: Some(msg.to_string()),
    })
    .into_response()
}

pub async fn register_page() -> impl IntoResponse {
    Html(RegisterTemplate { notice: None })
}

pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let email = form.email.trim();
    let name = form.name.trim();
    if email.is_empty() || name.is_empty() || form.password.is_empty() {
        return Ok(Html(RegisterTemplate {
            notice: Some("Name, email and password are all required.".to_string()),
        })
        .into_response());
    }

    match auth::register(&state.db, email, &form.password, name) {
        // No auto-login: send the new user to the login page
        Ok(_) => Ok(Redirect::to("/login?registered=1").into_response()),
        Err(AppError::DuplicateEmail) => Ok(Redirect::to("/login?from=duplicate").into_response()),
        Err(e) => Err(e),
    }
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    if let Some(token) = extractors::session_token(&headers, &state.config.auth.cookie_name) {
        auth::session::delete_session(&state.db, &token)?;
    }
    // Expire the cookie regardless of whether a session existed
    let cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        state.config.auth.cookie_name
    );
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to("/")).into_response())
}
