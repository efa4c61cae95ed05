use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LastMessage, Profile, ReactionGroup};

// -- JWT Claims --

/// JWT claims shared across murmur-api (REST middleware) and murmur-gateway
/// (WebSocket Identify handshake). Canonical definition lives here in
/// murmur-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(default)]
    pub avatar: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Messages --

/// Body of POST /api/messages. `message` may be empty when `img` carries an
/// image payload; the handler rejects requests where both are empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Option<Uuid>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub img: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender: Uuid,
    pub text: String,
    /// Resolved durable URL, empty when the message carries no image.
    #[serde(default)]
    pub img: String,
    pub seen: bool,
    pub reactions: Vec<ReactionGroup>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of GET /api/messages/conversations. `participants` holds only
/// the *other* party — the caller's own identity is filtered out of the
/// projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub id: Uuid,
    pub participants: Vec<Profile>,
    pub last_message: LastMessage,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// -- Reactions --

/// Body of POST /api/messages/reactions. Both fields are required; they are
/// Options so a missing field surfaces as a 400 from validation rather than
/// a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleReactionRequest {
    pub message_id: Option<Uuid>,
    pub emoji: Option<String>,
}
