use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public profile fields of a user, as resolved into conversation listings.
/// The auth subsystem owns the full user record; this is the projection the
/// messaging core needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
}

/// Denormalized snapshot of a conversation's most recent message.
/// A rendering hint for list views, never the source of truth — the Messages
/// table is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub text: String,
    pub sender: Uuid,
    pub seen: bool,
}

/// One emoji with the set of users currently reacting with it.
/// A user appears in at most one group per message; groups with no users are
/// pruned rather than serialized empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub users: Vec<Uuid>,
}
