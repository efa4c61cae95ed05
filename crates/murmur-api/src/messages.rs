use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::debug;
use uuid::Uuid;

use murmur_db::models::{MessageRow, ReactionRow};
use murmur_types::api::{Claims, ConversationResponse, MessageResponse, SendMessageRequest};
use murmur_types::events::GatewayEvent;

use crate::auth::AppStateInner;
use crate::error::ApiError;
use crate::view;

/// POST /api/messages — the message delivery protocol:
/// conversation upsert, image resolution (aborts the send on failure, before
/// anything is persisted), message append with lastMessage cache refresh,
/// then a best-effort realtime push to the recipient. The HTTP response
/// reports durability, never delivery.
pub async fn send_message(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = req
        .recipient_id
        .ok_or_else(|| ApiError::Validation("recipientId is required".into()))?;
    if recipient == claims.sub {
        return Err(ApiError::Validation(
            "cannot start a conversation with yourself".into(),
        ));
    }

    let img_payload = req.img.as_deref().filter(|s| !s.is_empty());
    if req.message.is_empty() && img_payload.is_none() {
        return Err(ApiError::Validation(
            "message text or an image is required".into(),
        ));
    }

    let img_url = match img_payload {
        Some(payload) => match &state.image_store {
            Some(store) => store.upload(payload).await?,
            None => {
                return Err(ApiError::Upstream("no image store configured".into()));
            }
        },
        None => String::new(),
    };

    let db = state.db.clone();
    let sender_id = claims.sub.to_string();
    let recipient_id = recipient.to_string();
    let text = req.message.clone();
    let conversation_id = Uuid::new_v4().to_string();
    let message_id = Uuid::new_v4().to_string();
    let img = img_url.clone();
    let row = tokio::task::spawn_blocking(move || {
        let conversation =
            db.find_or_create_conversation(&conversation_id, &sender_id, &recipient_id, &text, &sender_id)?;
        db.append_message(&message_id, &conversation.id, &sender_id, &text, &img)
    })
    .await
    .map_err(ApiError::join)??;

    let response = view::message_response(row, vec![]);

    // The message is already durable; a missed push only means the recipient
    // catches up on their next conversation fetch.
    let delivered = state
        .dispatcher
        .send_to_user(recipient, GatewayEvent::NewMessage(response.clone()))
        .await;
    if !delivered {
        debug!("{} offline, message {} queued for next fetch", recipient, response.id);
    }

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/messages/{other_user_id} — full history with the peer, in
/// authoritative (creation) order. 404 when no conversation exists for the
/// pair.
pub async fn get_messages(
    State(state): State<Arc<AppStateInner>>,
    Path(other_user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();
    let other = other_user_id.to_string();

    let fetched: Option<(Vec<MessageRow>, Vec<ReactionRow>)> =
        tokio::task::spawn_blocking(move || {
            let conversation = match db.conversation_for_pair(&me, &other)? {
                Some(c) => c,
                None => return Ok(None),
            };
            let rows = db.list_messages(&conversation.id)?;
            let message_ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            let reaction_rows = db.get_reactions_for_messages(&message_ids)?;
            anyhow::Ok(Some((rows, reaction_rows)))
        })
        .await
        .map_err(ApiError::join)??;

    let (rows, reaction_rows) = fetched.ok_or(ApiError::NotFound("conversation"))?;

    // Partition reaction rows per message, preserving their created_at order.
    let mut per_message: HashMap<String, Vec<ReactionRow>> = HashMap::new();
    for row in reaction_rows {
        per_message.entry(row.message_id.clone()).or_default().push(row);
    }

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| {
            let reactions = per_message
                .get(&row.id)
                .map(|rows| view::group_reactions(rows))
                .unwrap_or_default();
            view::message_response(row, reactions)
        })
        .collect();

    Ok(Json(messages))
}

/// GET /api/messages/conversations — every conversation the caller is part
/// of, most recently active first, with the peer's profile resolved and the
/// caller filtered out of the participants projection.
pub async fn get_conversations(
    State(state): State<Arc<AppStateInner>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let me = claims.sub.to_string();

    let rows = tokio::task::spawn_blocking(move || db.list_conversations_for_user(&me))
        .await
        .map_err(ApiError::join)??;

    let conversations: Vec<ConversationResponse> = rows
        .into_iter()
        .map(|(row, profile)| view::conversation_response(row, claims.sub, profile))
        .collect();

    Ok(Json(conversations))
}
