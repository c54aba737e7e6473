use rusqlite::{params, OptionalExtension, Row};

use super::repo::LeadRepository;
use super::{check_swapped, json_column, to_json, CrmStore};
use crate::error::Result;
use crate::funnel::Transition;
use crate::model::{Lead, LeadStageHistory};

const LEAD_COLUMNS: &str = "id, business_id, client_id, conversation_id, current_stage, \
     previous_stage, stage_entered_at, stage_progression_count, total_funnel_time, \
     qualification_score, interest_level, engagement_level, lead_source, estimated_value, \
     final_outcome, outcome_date, version, created_at, updated_at";

fn lead_from_row(row: &Row) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        business_id: row.get(1)?,
        client_id: row.get(2)?,
        conversation_id: row.get(3)?,
        current_stage: row.get(4)?,
        previous_stage: row.get(5)?,
        stage_entered_at: row.get(6)?,
        stage_progression_count: row.get(7)?,
        total_funnel_time: row.get(8)?,
        qualification_score: row.get(9)?,
        interest_level: row.get(10)?,
        engagement_level: row.get(11)?,
        lead_source: row.get(12)?,
        estimated_value: row.get(13)?,
        final_outcome: row.get(14)?,
        outcome_date: row.get(15)?,
        version: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

const HISTORY_COLUMNS: &str = "id, lead_id, business_id, from_stage, to_stage, \
     progression_type, confidence_score, qualifying_factors, disqualifying_factors, \
     trigger_event, changed_by, time_in_previous_stage, created_at";

fn history_from_row(row: &Row) -> rusqlite::Result<LeadStageHistory> {
    Ok(LeadStageHistory {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        business_id: row.get(2)?,
        from_stage: row.get(3)?,
        to_stage: row.get(4)?,
        progression_type: row.get(5)?,
        confidence_score: row.get(6)?,
        qualifying_factors: json_column(row, 7)?,
        disqualifying_factors: json_column(row, 8)?,
        trigger_event: row.get(9)?,
        changed_by: row.get(10)?,
        time_in_previous_stage: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl LeadRepository for CrmStore {
    fn insert_lead(&self, l: &Lead) -> Result<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO leads ({})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                LEAD_COLUMNS
            ),
            params![
                l.id,
                l.business_id,
                l.client_id,
                l.conversation_id,
                l.current_stage,
                l.previous_stage,
                l.stage_entered_at,
                l.stage_progression_count,
                l.total_funnel_time,
                l.qualification_score,
                l.interest_level,
                l.engagement_level,
                l.lead_source,
                l.estimated_value,
                l.final_outcome,
                l.outcome_date,
                l.version,
                l.created_at,
                l.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_lead(&self, id: &str) -> Result<Option<Lead>> {
        let lead = self
            .conn
            .query_row(
                &format!("SELECT {} FROM leads WHERE id = ?", LEAD_COLUMNS),
                params![id],
                lead_from_row,
            )
            .optional()?;
        Ok(lead)
    }

    fn apply_transition(&self, transition: &Transition) -> Result<Lead> {
        let Transition { lead: l, history: h } = transition;
        let tx = self.conn.unchecked_transaction()?;

        let affected = tx.execute(
            r#"UPDATE leads SET
                   current_stage = ?, previous_stage = ?, stage_entered_at = ?,
                   stage_progression_count = ?, total_funnel_time = ?,
                   final_outcome = ?, outcome_date = ?, updated_at = ?,
                   version = version + 1
               WHERE id = ? AND version = ?"#,
            params![
                l.current_stage,
                l.previous_stage,
                l.stage_entered_at,
                l.stage_progression_count,
                l.total_funnel_time,
                l.final_outcome,
                l.outcome_date,
                l.updated_at,
                l.id,
                l.version,
            ],
        )?;
        check_swapped(affected, "lead", &l.id)?;

        tx.execute(
            &format!(
                "INSERT INTO lead_stage_history (seq, {})
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                HISTORY_COLUMNS
            ),
            params![
                l.stage_progression_count,
                h.id,
                h.lead_id,
                h.business_id,
                h.from_stage,
                h.to_stage,
                h.progression_type,
                h.confidence_score,
                to_json(&h.qualifying_factors)?,
                to_json(&h.disqualifying_factors)?,
                h.trigger_event,
                h.changed_by,
                h.time_in_previous_stage,
                h.created_at,
            ],
        )?;

        tx.commit()?;
        Ok(Lead {
            version: l.version + 1,
            ..l.clone()
        })
    }

    fn lead_history(&self, lead_id: &str) -> Result<Vec<LeadStageHistory>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lead_stage_history WHERE lead_id = ? ORDER BY seq",
            HISTORY_COLUMNS
        ))?;
        let rows = stmt.query_map(params![lead_id], history_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
