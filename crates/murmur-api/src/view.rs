use tracing::warn;
use uuid::Uuid;

use murmur_db::models::{ConversationRow, MessageRow, ProfileRow, ReactionRow};
use murmur_types::api::{ConversationResponse, MessageResponse};
use murmur_types::models::{LastMessage, Profile, ReactionGroup};

/// Row-to-API conversions. Stored uuids/timestamps are parsed with a logged
/// fallback rather than failing a whole listing over one corrupt row.

pub fn parse_uuid(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str, what: &str) -> chrono::DateTime<chrono::Utc> {
    raw.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') default stores "YYYY-MM-DD HH:MM:SS"
            // without timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", what, raw, e);
            chrono::DateTime::default()
        })
}

/// Materialize per-user reaction rows into grouped-by-emoji wire form.
/// Group order follows the earliest reaction per emoji; users keep their
/// reaction order within a group. Rows must arrive in created_at order
/// (the queries guarantee this).
pub fn group_reactions(rows: &[ReactionRow]) -> Vec<ReactionGroup> {
    let mut groups: Vec<ReactionGroup> = Vec::new();
    for row in rows {
        let user = parse_uuid(&row.user_id, "reaction user_id");
        match groups.iter_mut().find(|g| g.emoji == row.emoji) {
            Some(group) => group.users.push(user),
            None => groups.push(ReactionGroup {
                emoji: row.emoji.clone(),
                users: vec![user],
            }),
        }
    }
    groups
}

pub fn message_response(row: MessageRow, reactions: Vec<ReactionGroup>) -> MessageResponse {
    MessageResponse {
        id: parse_uuid(&row.id, "message id"),
        conversation_id: parse_uuid(&row.conversation_id, "conversation_id"),
        sender: parse_uuid(&row.sender_id, "sender_id"),
        text: row.text,
        img: row.img,
        seen: row.seen,
        reactions,
        created_at: parse_timestamp(&row.created_at, "message created_at"),
        updated_at: parse_timestamp(&row.updated_at, "message updated_at"),
    }
}

/// Project a conversation for `viewer`: the participants list carries only
/// the other party, with profile fields resolved when a local user row
/// exists.
pub fn conversation_response(
    row: ConversationRow,
    viewer: Uuid,
    profile: Option<ProfileRow>,
) -> ConversationResponse {
    let other_id = if parse_uuid(&row.participant_a, "participant_a") == viewer {
        parse_uuid(&row.participant_b, "participant_b")
    } else {
        parse_uuid(&row.participant_a, "participant_a")
    };

    let other = match profile {
        Some(p) => Profile {
            id: parse_uuid(&p.id, "profile id"),
            username: p.username,
            avatar: p.avatar,
        },
        None => Profile {
            id: other_id,
            username: "unknown".to_string(),
            avatar: String::new(),
        },
    };

    ConversationResponse {
        id: parse_uuid(&row.id, "conversation id"),
        participants: vec![other],
        last_message: LastMessage {
            text: row.last_message_text,
            sender: parse_uuid(&row.last_message_sender, "last_message_sender"),
            seen: row.last_message_seen,
        },
        created_at: parse_timestamp(&row.created_at, "conversation created_at"),
        updated_at: parse_timestamp(&row.updated_at, "conversation updated_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(user: Uuid, emoji: &str, at: &str) -> ReactionRow {
        ReactionRow {
            message_id: "m".into(),
            user_id: user.to_string(),
            emoji: emoji.into(),
            created_at: at.into(),
        }
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![
            row(u1, "👍", "2026-01-01T00:00:00Z"),
            row(u2, "😂", "2026-01-01T00:00:01Z"),
            row(u3, "👍", "2026-01-01T00:00:02Z"),
        ];

        let groups = group_reactions(&rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].emoji, "👍");
        assert_eq!(groups[0].users, vec![u1, u3]);
        assert_eq!(groups[1].emoji, "😂");
        assert_eq!(groups[1].users, vec![u2]);
    }

    #[test]
    fn no_rows_means_no_groups() {
        assert!(group_reactions(&[]).is_empty());
    }

    #[test]
    fn sqlite_default_timestamps_still_parse() {
        let ts = parse_timestamp("2026-03-01 12:30:45", "test");
        assert_eq!(ts.to_rfc3339(), "2026-03-01T12:30:45+00:00");
    }
}
