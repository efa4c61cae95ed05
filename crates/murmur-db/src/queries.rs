use crate::models::{ConversationRow, MessageRow, ProfileRow, ReactionRow, UserRow};
use crate::Database;
use anyhow::Result;
use rusqlite::Connection;

/// Timestamps are written from Rust rather than relying on SQLite's
/// second-granularity `datetime('now')`, so chronological ordering survives
/// bursts of messages within the same second. Ties are broken by rowid.
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Conversations are keyed on the unordered participant pair; storage order
/// is the sorted order.
fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str, password_hash: &str, avatar: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, avatar, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, password_hash, avatar, timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Conversations --

    /// Find the conversation for the unordered pair {a, b}, creating it if
    /// absent. `INSERT OR IGNORE` against the unique pair index makes the
    /// create idempotent: two concurrent first-messages between the same pair
    /// race on the index and both land on the same row.
    ///
    /// A freshly created conversation carries the caller's message as its
    /// initial lastMessage snapshot; an existing one is left untouched here
    /// (append_message refreshes the cache).
    pub fn find_or_create_conversation(
        &self,
        new_id: &str,
        a: &str,
        b: &str,
        initial_text: &str,
        initial_sender: &str,
    ) -> Result<ConversationRow> {
        let (pa, pb) = ordered_pair(a, b);
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp();
            tx.execute(
                "INSERT OR IGNORE INTO conversations
                     (id, participant_a, participant_b,
                      last_message_text, last_message_sender, last_message_seen,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                rusqlite::params![new_id, pa, pb, initial_text, initial_sender, now],
            )?;
            let row = query_conversation_for_pair(&tx, pa, pb)?
                .ok_or_else(|| anyhow::anyhow!("conversation upsert yielded no row"))?;
            tx.commit()?;
            Ok(row)
        })
    }

    pub fn conversation_for_pair(&self, a: &str, b: &str) -> Result<Option<ConversationRow>> {
        let (pa, pb) = ordered_pair(a, b);
        self.with_conn(|conn| query_conversation_for_pair(conn, pa, pb))
    }

    pub fn get_conversation(&self, id: &str) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{CONVERSATION_SELECT} WHERE id = ?1"))?;
            let row = stmt.query_row([id], conversation_from_row).optional()?;
            Ok(row)
        })
    }

    /// All conversations the user participates in, most recently active
    /// first, with the *other* participant's profile joined in. The profile
    /// is `None` when that identity has no local user row.
    pub fn list_conversations_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<(ConversationRow, Option<ProfileRow>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.participant_a, c.participant_b,
                        c.last_message_text, c.last_message_sender, c.last_message_seen,
                        c.created_at, c.updated_at,
                        u.id, u.username, u.avatar
                 FROM conversations c
                 LEFT JOIN users u
                   ON u.id = CASE WHEN c.participant_a = ?1
                                  THEN c.participant_b
                                  ELSE c.participant_a END
                 WHERE ?1 IN (c.participant_a, c.participant_b)
                 ORDER BY c.updated_at DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    let conversation = conversation_from_row(row)?;
                    let profile = match row.get::<_, Option<String>>(8)? {
                        Some(id) => Some(ProfileRow {
                            id,
                            username: row.get(9)?,
                            avatar: row.get(10)?,
                        }),
                        None => None,
                    };
                    Ok((conversation, profile))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Messages --

    /// Insert a message and refresh the owning conversation's lastMessage
    /// cache as one transaction. The cache is a denormalized hint, but doing
    /// both writes in one unit means there is nothing to reconcile on read.
    pub fn append_message(
        &self,
        message_id: &str,
        conversation_id: &str,
        sender_id: &str,
        text: &str,
        img: &str,
    ) -> Result<MessageRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = timestamp();
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, text, img, seen, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
                rusqlite::params![message_id, conversation_id, sender_id, text, img, now],
            )?;
            tx.execute(
                "UPDATE conversations
                 SET last_message_text = ?2, last_message_sender = ?3,
                     last_message_seen = 0, updated_at = ?4
                 WHERE id = ?1",
                rusqlite::params![conversation_id, text, sender_id, now],
            )?;
            let row = query_message(&tx, message_id)?
                .ok_or_else(|| anyhow::anyhow!("inserted message missing: {}", message_id))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Full history for a conversation in authoritative (persistence) order.
    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{MESSAGE_SELECT} WHERE conversation_id = ?1 ORDER BY created_at ASC, rowid ASC"
            ))?;
            let rows = stmt
                .query_map([conversation_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, message_id: &str) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, message_id))
    }

    /// Flip every unseen message in the conversation. Returns how many rows
    /// changed. Deliberately separate from mark_conversation_seen — the two
    /// flags converge without requiring one transaction.
    pub fn mark_messages_seen(&self, conversation_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE messages SET seen = 1, updated_at = ?2
                 WHERE conversation_id = ?1 AND seen = 0",
                rusqlite::params![conversation_id, timestamp()],
            )?;
            Ok(changed)
        })
    }

    pub fn mark_conversation_seen(&self, conversation_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE conversations SET last_message_seen = 1, updated_at = ?2
                 WHERE id = ?1",
                rusqlite::params![conversation_id, timestamp()],
            )?;
            Ok(())
        })
    }

    // -- Reactions --

    /// Toggle semantics, applied as one read-modify-write transaction under
    /// the connection mutex (two concurrent toggles serialize; neither is
    /// lost):
    ///   - no existing reaction by this user     -> insert
    ///   - existing reaction with the same emoji -> delete (toggle off)
    ///   - existing reaction, different emoji    -> update (switch)
    ///
    /// The (message_id, user_id) primary key keeps one-reaction-per-user
    /// structural. Returns the updated message with its reaction rows, or
    /// `None` when the message does not exist.
    pub fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<Option<(MessageRow, Vec<ReactionRow>)>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if query_message(&tx, message_id)?.is_none() {
                return Ok(None);
            }

            let existing: Option<String> = tx
                .query_row(
                    "SELECT emoji FROM reactions WHERE message_id = ?1 AND user_id = ?2",
                    rusqlite::params![message_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            match existing.as_deref() {
                Some(current) if current == emoji => {
                    tx.execute(
                        "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2",
                        rusqlite::params![message_id, user_id],
                    )?;
                }
                Some(_) => {
                    tx.execute(
                        "UPDATE reactions SET emoji = ?3, created_at = ?4
                         WHERE message_id = ?1 AND user_id = ?2",
                        rusqlite::params![message_id, user_id, emoji, timestamp()],
                    )?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO reactions (message_id, user_id, emoji, created_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        rusqlite::params![message_id, user_id, emoji, timestamp()],
                    )?;
                }
            }

            let message = query_message(&tx, message_id)?
                .ok_or_else(|| anyhow::anyhow!("message vanished mid-toggle: {}", message_id))?;
            let reactions = query_reactions(&tx, &[message_id.to_string()])?;
            tx.commit()?;
            Ok(Some((message, reactions)))
        })
    }

    /// Batch-fetch reactions for a set of message IDs (avoids per-message
    /// queries when rendering history).
    pub fn get_reactions_for_messages(&self, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if message_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| query_reactions(conn, message_ids))
    }
}

const CONVERSATION_SELECT: &str = "SELECT id, participant_a, participant_b, \
     last_message_text, last_message_sender, last_message_seen, \
     created_at, updated_at FROM conversations";

const MESSAGE_SELECT: &str = "SELECT id, conversation_id, sender_id, text, img, seen, \
     created_at, updated_at FROM messages";

fn conversation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationRow> {
    Ok(ConversationRow {
        id: row.get(0)?,
        participant_a: row.get(1)?,
        participant_b: row.get(2)?,
        last_message_text: row.get(3)?,
        last_message_sender: row.get(4)?,
        last_message_seen: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        text: row.get(3)?,
        img: row.get(4)?,
        seen: row.get::<_, i64>(5)? != 0,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn query_conversation_for_pair(
    conn: &Connection,
    pa: &str,
    pb: &str,
) -> Result<Option<ConversationRow>> {
    let mut stmt = conn.prepare(&format!(
        "{CONVERSATION_SELECT} WHERE participant_a = ?1 AND participant_b = ?2"
    ))?;
    let row = stmt
        .query_row([pa, pb], conversation_from_row)
        .optional()?;
    Ok(row)
}

fn query_message(conn: &Connection, message_id: &str) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("{MESSAGE_SELECT} WHERE id = ?1"))?;
    let row = stmt.query_row([message_id], message_from_row).optional()?;
    Ok(row)
}

fn query_reactions(conn: &Connection, message_ids: &[String]) -> Result<Vec<ReactionRow>> {
    let placeholders: Vec<String> = (1..=message_ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "SELECT message_id, user_id, emoji, created_at FROM reactions
         WHERE message_id IN ({})
         ORDER BY created_at ASC, rowid ASC",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> = message_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt
        .query_map(params.as_slice(), |row| {
            Ok(ReactionRow {
                message_id: row.get(0)?,
                user_id: row.get(1)?,
                emoji: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, avatar, created_at FROM users WHERE username = ?1",
    )?;
    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                avatar: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .optional()?;
    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
