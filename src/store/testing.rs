use rusqlite::{params, Connection, OptionalExtension, Row};

use super::repo::TestSessionRepository;
use super::{check_swapped, CrmStore};
use crate::error::Result;
use crate::model::{TestMessage, TestSession};

const SESSION_COLUMNS: &str = "id, business_id, scenario_name, language_code, status, \
     message_count, started_at, completed_at, version";

fn session_from_row(row: &Row) -> rusqlite::Result<TestSession> {
    Ok(TestSession {
        id: row.get(0)?,
        business_id: row.get(1)?,
        scenario_name: row.get(2)?,
        language_code: row.get(3)?,
        status: row.get(4)?,
        message_count: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
        version: row.get(8)?,
    })
}

fn write_session(conn: &Connection, s: &TestSession) -> Result<TestSession> {
    let affected = conn.execute(
        r#"UPDATE test_sessions SET
               message_count = ?, status = ?, completed_at = ?, version = version + 1
           WHERE id = ? AND version = ?"#,
        params![s.message_count, s.status, s.completed_at, s.id, s.version],
    )?;
    check_swapped(affected, "test session", &s.id)?;
    Ok(TestSession {
        version: s.version + 1,
        ..s.clone()
    })
}

impl TestSessionRepository for CrmStore {
    fn insert_test_session(&self, s: &TestSession) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO test_sessions ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                SESSION_COLUMNS
            ),
            params![
                s.id,
                s.business_id,
                s.scenario_name,
                s.language_code,
                s.status,
                s.message_count,
                s.started_at,
                s.completed_at,
                s.version,
            ],
        )?;
        Ok(())
    }

    fn get_test_session(&self, id: &str) -> Result<Option<TestSession>> {
        let session = self
            .conn
            .query_row(
                &format!("SELECT {} FROM test_sessions WHERE id = ?", SESSION_COLUMNS),
                params![id],
                session_from_row,
            )
            .optional()?;
        Ok(session)
    }

    fn update_test_session(&self, s: &TestSession) -> Result<TestSession> {
        write_session(&self.conn, s)
    }

    fn append_test_message(&self, s: &TestSession, m: &TestMessage) -> Result<TestSession> {
        let tx = self.conn.unchecked_transaction()?;
        let updated = write_session(&tx, s)?;
        tx.execute(
            "INSERT INTO test_messages (id, test_session_id, sequence, sender_type, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                m.id,
                m.test_session_id,
                m.sequence,
                m.sender_type,
                m.content,
                m.created_at
            ],
        )?;
        tx.commit()?;
        Ok(updated)
    }

    fn list_test_messages(&self, session_id: &str) -> Result<Vec<TestMessage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, test_session_id, sequence, sender_type, content, created_at
             FROM test_messages
             WHERE test_session_id = ?
             ORDER BY sequence",
        )?;
        let rows = stmt.query_map(params![session_id], |row| {
            Ok(TestMessage {
                id: row.get(0)?,
                test_session_id: row.get(1)?,
                sequence: row.get(2)?,
                sender_type: row.get(3)?,
                content: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
