use std::time::Duration;

use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::auth;
use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::mail::{self, Delivery};
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/my/blog/send/emails/",
        get(send_mail_page).post(send_mail_submit),
    )
}

#[derive(Template)]
#[template(path = "pages/send_mail.html")]
struct SendMailTemplate {
    recipient_count: usize,
    notice: Option<String>,
}

#[derive(Deserialize)]
pub struct MailForm {
    subject: String,
    message: String,
}

pub async fn send_mail_page(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let recipient_count = auth::list_users(&state.db)?.len();
    Ok(Html(SendMailTemplate {
        recipient_count,
        notice: None,
    }))
}

pub async fn send_mail_submit(
    State(state): State<AppState>,
    _user: CurrentUser,
    Form(form): Form<MailForm>,
) -> AppResult<Response> {
    let subject = form.subject.trim();
    if subject.is_empty() || form.message.trim().is_empty() {
        let recipient_count = auth::list_users(&state.db)?.len();
        return Ok(Html(SendMailTemplate {
            recipient_count,
            notice: Some("Subject and message are required.".to_string()),
        })
        .into_response());
    }

    let recipients: Vec<String> = auth::list_users(&state.db)?
        .into_iter()
        .map(|u| u.email)
        .collect();

    let report = mail::broadcast(
        state.mailer.as_ref(),
        &recipients,
        subject,
        &form.message,
        Duration::from_millis(state.config.mail.pacing_ms),
    )
    .await;

    let failed = report
        .iter()
        .filter(|r| matches!(r.outcome, Delivery::Failed(_)))
        .count();
    tracing::info!(
        "Broadcast '{}' attempted for {} recipients, {} failed",
        subject,
        report.len(),
        failed
    );

    Ok(Redirect::to("/").into_response())
}
