use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::mail;
use crate::routes::home::Html;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", get(contact_page).post(contact_submit))
}

#[derive(Template)]
#[template(path = "pages/contact.html")]
struct ContactTemplate {
    notice: Option<String>,
}

#[derive(Deserialize)]
pub struct ContactForm {
    name: String,
    email: String,
    message: String,
}

pub async fn contact_page() -> impl IntoResponse {
    Html(ContactTemplate { notice: None })
}

pub async fn contact_submit(
    State(state): State<AppState>,
    user: MaybeUser,
    Form(form): Form<ContactForm>,
) -> AppResult<Response> {
    if user.0.is_none() {
        return Ok(Redirect::to("/login?from=contact").into_response());
    }

    let name = form.name.trim();
    let email = form.email.trim();
    let message = form.message.trim();
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Ok(notice("All fields are required."));
    }

    let outgoing = mail::contact_mail(&state.config.mail, name, email, message);
    match state.mailer.send(&outgoing).await {
        Ok(()) => Ok(Redirect::to("/").into_response()),
        Err(e) => {
            // The single contact send surfaces its failure to the submitter
            tracing::warn!("Contact mail failed: {}", e);
            Ok(notice(
                "Your message could not be sent. Please try again later.",
            ))
        }
    }
}

fn notice(msg: &str) -> Response {
    Html(ContactTemplate {
        notice: Some(msg.to_string()),
    })
    .into_response()
}
