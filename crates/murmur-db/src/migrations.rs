use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            avatar      TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Participants are stored sorted so the one-conversation-per-pair
        -- invariant is a unique index, not application logic. Concurrent
        -- first-messages between the same pair race on the index instead of
        -- creating duplicates.
        CREATE TABLE IF NOT EXISTS conversations (
            id                   TEXT PRIMARY KEY,
            participant_a        TEXT NOT NULL,
            participant_b        TEXT NOT NULL,
            last_message_text    TEXT NOT NULL DEFAULT '',
            last_message_sender  TEXT NOT NULL DEFAULT '',
            last_message_seen    INTEGER NOT NULL DEFAULT 0,
            created_at           TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at           TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(participant_a, participant_b),
            CHECK(participant_a < participant_b)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id),
            sender_id        TEXT NOT NULL,
            text             TEXT NOT NULL DEFAULT '',
            img              TEXT NOT NULL DEFAULT '',
            seen             INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);

        -- Primary key on (message_id, user_id): a user holds at most one
        -- reaction per message structurally. Switching emoji is an UPDATE,
        -- never a second row.
        CREATE TABLE IF NOT EXISTS reactions (
            message_id  TEXT NOT NULL REFERENCES messages(id),
            user_id     TEXT NOT NULL,
            emoji       TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY(message_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_reactions_message
            ON reactions(message_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
