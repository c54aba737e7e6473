use rusqlite::{params, Connection, OptionalExtension, Row};

use super::repo::ConversationRepository;
use super::{check_swapped, CrmStore};
use crate::error::Result;
use crate::model::{Conversation, ConversationState, Message};

const CONVERSATION_COLUMNS: &str = "id, business_id, client_id, platform_source_id, \
     current_state, pause_reason, is_bot_active, requires_human, human_takeover_reason, \
     lead_score, sentiment_score, message_count, last_activity, closed_at, version, \
     created_at, updated_at";

fn conversation_from_row(row: &Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        business_id: row.get(1)?,
        client_id: row.get(2)?,
        platform_source_id: row.get(3)?,
        current_state: row.get(4)?,
        pause_reason: row.get(5)?,
        is_bot_active: row.get(6)?,
        requires_human: row.get(7)?,
        human_takeover_reason: row.get(8)?,
        lead_score: row.get(9)?,
        sentiment_score: row.get(10)?,
        message_count: row.get(11)?,
        last_activity: row.get(12)?,
        closed_at: row.get(13)?,
        version: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, business_id, sender_type, content, \
     message_type, platform_message_id, message_timestamp, created_at";

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        business_id: row.get(2)?,
        sender_type: row.get(3)?,
        content: row.get(4)?,
        message_type: row.get(5)?,
        platform_message_id: row.get(6)?,
        message_timestamp: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Versioned write of every mutable conversation column.
fn write_conversation(conn: &Connection, c: &Conversation) -> Result<Conversation> {
    let affected = conn.execute(
        r#"UPDATE conversations SET
               current_state = ?, pause_reason = ?, is_bot_active = ?, requires_human = ?,
               human_takeover_reason = ?, lead_score = ?, sentiment_score = ?,
               message_count = ?, last_activity = ?, closed_at = ?, updated_at = ?,
               version = version + 1
           WHERE id = ? AND version = ?"#,
        params![
            c.current_state,
            c.pause_reason,
            c.is_bot_active,
            c.requires_human,
            c.human_takeover_reason,
            c.lead_score,
            c.sentiment_score,
            c.message_count,
            c.last_activity,
            c.closed_at,
            c.updated_at,
            c.id,
            c.version,
        ],
    )?;
    check_swapped(affected, "conversation", &c.id)?;
    Ok(Conversation {
        version: c.version + 1,
        ..c.clone()
    })
}

impl ConversationRepository for CrmStore {
    fn insert_conversation(&self, c: &Conversation) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO conversations ({})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                CONVERSATION_COLUMNS
            ),
            params![
                c.id,
                c.business_id,
                c.client_id,
                c.platform_source_id,
                c.current_state,
                c.pause_reason,
                c.is_bot_active,
                c.requires_human,
                c.human_takeover_reason,
                c.lead_score,
                c.sentiment_score,
                c.message_count,
                c.last_activity,
                c.closed_at,
                c.version,
                c.created_at,
                c.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_conversation(&self, id: &str) -> Result<Option<Conversation>> {
        let conversation = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM conversations WHERE id = ?",
                    CONVERSATION_COLUMNS
                ),
                params![id],
                conversation_from_row,
            )
            .optional()?;
        Ok(conversation)
    }

    fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation> {
        write_conversation(&self.conn, conversation)
    }

    fn append_message(&self, conversation: &Conversation, m: &Message) -> Result<Conversation> {
        let tx = self.conn.unchecked_transaction()?;
        // CAS before the insert; a stale conversation rolls back the whole append
        let updated = write_conversation(&tx, conversation)?;
        tx.execute(
            &format!(
                "INSERT INTO messages ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                MESSAGE_COLUMNS
            ),
            params![
                m.id,
                m.conversation_id,
                m.business_id,
                m.sender_type,
                m.content,
                m.message_type,
                m.platform_message_id,
                m.message_timestamp,
                m.created_at,
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM messages
             WHERE conversation_id = ?
             ORDER BY message_timestamp, created_at",
            MESSAGE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![conversation_id], message_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn list_conversations_in_state(
        &self,
        business_id: &str,
        state: ConversationState,
    ) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM conversations
             WHERE business_id = ? AND current_state = ?
             ORDER BY last_activity",
            CONVERSATION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![business_id, state], conversation_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
