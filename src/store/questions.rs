use rusqlite::{params, OptionalExtension, Row};

use super::repo::QuestionRepository;
use super::{check_swapped, json_column, to_json, unique_violation, CrmStore};
use crate::error::Result;
use crate::model::UnansweredQuestion;

const QUESTION_COLUMNS: &str = "id, business_id, question, question_hash, language_code, \
     frequency, status, sources_searched, confidence_scores, resolved_faq_id, first_asked_at, \
     last_asked_at, resolved_at, version";

fn question_from_row(row: &Row) -> rusqlite::Result<UnansweredQuestion> {
    Ok(UnansweredQuestion {
        id: row.get(0)?,
        business_id: row.get(1)?,
        question: row.get(2)?,
        question_hash: row.get(3)?,
        language_code: row.get(4)?,
        frequency: row.get(5)?,
        status: row.get(6)?,
        sources_searched: json_column(row, 7)?,
        confidence_scores: json_column(row, 8)?,
        resolved_faq_id: row.get(9)?,
        first_asked_at: row.get(10)?,
        last_asked_at: row.get(11)?,
        resolved_at: row.get(12)?,
        version: row.get(13)?,
    })
}

impl QuestionRepository for CrmStore {
    fn get_question(&self, id: &str) -> Result<Option<UnansweredQuestion>> {
        let question = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM unanswered_questions WHERE id = ?",
                    QUESTION_COLUMNS
                ),
                params![id],
                question_from_row,
            )
            .optional()?;
        Ok(question)
    }

    fn find_question(
        &self,
        business_id: &str,
        question_hash: &str,
    ) -> Result<Option<UnansweredQuestion>> {
        let question = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM unanswered_questions
                     WHERE business_id = ? AND question_hash = ?",
                    QUESTION_COLUMNS
                ),
                params![business_id, question_hash],
                question_from_row,
            )
            .optional()?;
        Ok(question)
    }

    fn insert_question(&self, q: &UnansweredQuestion) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO unanswered_questions ({})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    QUESTION_COLUMNS
                ),
                params![
                    q.id,
                    q.business_id,
                    q.question,
                    q.question_hash,
                    q.language_code,
                    q.frequency,
                    q.status,
                    to_json(&q.sources_searched)?,
                    to_json(&q.confidence_scores)?,
                    q.resolved_faq_id,
                    q.first_asked_at,
                    q.last_asked_at,
                    q.resolved_at,
                    q.version,
                ],
            )
            .map_err(|e| unique_violation(e, "question already recorded"))?;
        Ok(())
    }

    fn update_question(&self, q: &UnansweredQuestion) -> Result<UnansweredQuestion> {
        let affected = self.conn.execute(
            r#"UPDATE unanswered_questions SET
                   frequency = ?, status = ?, sources_searched = ?, confidence_scores = ?,
                   resolved_faq_id = ?, last_asked_at = ?, resolved_at = ?,
                   version = version + 1
               WHERE id = ? AND version = ?"#,
            params![
                q.frequency,
                q.status,
                to_json(&q.sources_searched)?,
                to_json(&q.confidence_scores)?,
                q.resolved_faq_id,
                q.last_asked_at,
                q.resolved_at,
                q.id,
                q.version,
            ],
        )?;
        check_swapped(affected, "unanswered question", &q.id)?;
        Ok(UnansweredQuestion {
            version: q.version + 1,
            ..q.clone()
        })
    }
}
