/// Database row types — these map directly to SQLite rows.
/// Distinct from murmur-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub avatar: String,
    pub created_at: String,
}

pub struct ConversationRow {
    pub id: String,
    pub participant_a: String,
    pub participant_b: String,
    pub last_message_text: String,
    pub last_message_sender: String,
    pub last_message_seen: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub img: String,
    pub seen: bool,
    pub created_at: String,
    pub updated_at: String,
}

pub struct ReactionRow {
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
    pub created_at: String,
}

/// Other participant's profile as joined into a conversation listing.
/// `None` when the peer's user row is missing (identity issued elsewhere and
/// never seen by this process).
pub struct ProfileRow {
    pub id: String,
    pub username: String,
    pub avatar: String,
}
