use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use murmur_types::api::{Claims, ToggleReactionRequest};
use murmur_types::events::GatewayEvent;

use crate::auth::AppStateInner;
use crate::error::ApiError;
use crate::view;

/// POST /api/messages/reactions — toggle the caller's reaction on a message.
/// The read-modify-write runs as one transaction in the store, so two
/// concurrent toggles by different users both land.
pub async fn toggle_reaction(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message_id = req
        .message_id
        .ok_or_else(|| ApiError::Validation("messageId is required".into()))?;
    let emoji = req
        .emoji
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("emoji is required".into()))?;

    let db = state.db.clone();
    let mid = message_id.to_string();
    let uid = claims.sub.to_string();
    let emoji_db = emoji.clone();
    let toggled = tokio::task::spawn_blocking(move || db.toggle_reaction(&mid, &uid, &emoji_db))
        .await
        .map_err(ApiError::join)??;

    let (row, reaction_rows) = toggled.ok_or(ApiError::NotFound("message"))?;
    let response = view::message_response(row, view::group_reactions(&reaction_rows));

    // Goes to every connected client, not just the conversation's two
    // participants — upstream product behavior, kept as-is (see DESIGN.md).
    state
        .dispatcher
        .broadcast(GatewayEvent::MessageReaction(response.clone()));

    Ok(Json(response))
}
