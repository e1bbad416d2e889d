use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use super::with_deadline;
use crate::auth::Identity;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::{Delivery, MailMessage, Tip};
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/mail/send",
    tag = "notifications",
    request_body = MailMessage,
    responses(
        (status = 200, description = "Mail handed to the mail collaborator", body = Delivery),
        (status = 400, description = "Invalid message", body = ErrorResponse),
        (status = 502, description = "Mail collaborator failed", body = ErrorResponse)
    )
)]
pub async fn send_mail(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    ValidatedJson(message): ValidatedJson<MailMessage>,
) -> Result<impl IntoResponse, HttpAppError> {
    message.validate()?;

    with_deadline(
        "send mail",
        state.deadlines.notify,
        state.notifier.send_mail(identity.as_str(), &message),
    )
    .await?;

    Ok(Json(Delivery {
        delivered: true,
        channel: "mail".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/slack/tip",
    tag = "notifications",
    request_body = Tip,
    responses(
        (status = 200, description = "Tip posted to the chat collaborator", body = Delivery),
        (status = 400, description = "Invalid tip", body = ErrorResponse),
        (status = 502, description = "Chat collaborator failed", body = ErrorResponse)
    )
)]
pub async fn post_tip(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    ValidatedJson(tip): ValidatedJson<Tip>,
) -> Result<impl IntoResponse, HttpAppError> {
    tip.validate()?;

    with_deadline(
        "post tip",
        state.deadlines.notify,
        state.notifier.post_tip(identity.as_str(), &tip),
    )
    .await?;

    Ok(Json(Delivery {
        delivered: true,
        channel: "slack".to_string(),
    }))
}
