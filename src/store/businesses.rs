use rusqlite::{params, OptionalExtension, Row};

use super::repo::{BusinessRepository, ClientRepository};
use super::{check_swapped, unique_violation, CrmStore};
use crate::error::Result;
use crate::model::{Business, Client, PlatformSource, PlatformType};

// ============================================
// BUSINESSES
// ============================================

const BUSINESS_COLUMNS: &str = "id, name, owner_email, owner_id, primary_language, \
     subscription_plan, subscription_status, onboarding_completed, onboarding_step, \
     created_at, updated_at";

fn business_from_row(row: &Row) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_email: row.get(2)?,
        owner_id: row.get(3)?,
        primary_language: row.get(4)?,
        subscription_plan: row.get(5)?,
        subscription_status: row.get(6)?,
        onboarding_completed: row.get(7)?,
        onboarding_step: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl BusinessRepository for CrmStore {
    fn insert_business(&self, b: &Business) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO businesses ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    BUSINESS_COLUMNS
                ),
                params![
                    b.id,
                    b.name,
                    b.owner_email,
                    b.owner_id,
                    b.primary_language,
                    b.subscription_plan,
                    b.subscription_status,
                    b.onboarding_completed,
                    b.onboarding_step,
                    b.created_at,
                    b.updated_at,
                ],
            )
            .map_err(|e| unique_violation(e, "business owner already has a business"))?;
        Ok(())
    }

    fn get_business(&self, id: &str) -> Result<Option<Business>> {
        let business = self
            .conn
            .query_row(
                &format!("SELECT {} FROM businesses WHERE id = ?", BUSINESS_COLUMNS),
                params![id],
                business_from_row,
            )
            .optional()?;
        Ok(business)
    }

    fn find_business_by_owner_email(&self, owner_email: &str) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM businesses WHERE owner_email = ?",
                params![owner_email],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn find_business_by_owner_id(&self, owner_id: &str) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM businesses WHERE owner_id = ?",
                params![owner_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

// ============================================
// CLIENTS & PLATFORM SOURCES
// ============================================

const CLIENT_COLUMNS: &str = "id, business_id, platform_user_id, platform_type, display_name, \
     relationship_status, engagement_score, lifetime_value, total_conversations, total_leads, \
     version, created_at, updated_at";

fn client_from_row(row: &Row) -> rusqlite::Result<Client> {
    Ok(Client {
        id: row.get(0)?,
        business_id: row.get(1)?,
        platform_user_id: row.get(2)?,
        platform_type: row.get(3)?,
        display_name: row.get(4)?,
        relationship_status: row.get(5)?,
        engagement_score: row.get(6)?,
        lifetime_value: row.get(7)?,
        total_conversations: row.get(8)?,
        total_leads: row.get(9)?,
        version: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

const SOURCE_COLUMNS: &str = "id, business_id, platform_type, name, is_active, created_at";

fn source_from_row(row: &Row) -> rusqlite::Result<PlatformSource> {
    Ok(PlatformSource {
        id: row.get(0)?,
        business_id: row.get(1)?,
        platform_type: row.get(2)?,
        name: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

impl CrmStore {
    fn ids(&self, sql: &str, key: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![key], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl ClientRepository for CrmStore {
    fn insert_client(&self, c: &Client) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO clients ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    CLIENT_COLUMNS
                ),
                params![
                    c.id,
                    c.business_id,
                    c.platform_user_id,
                    c.platform_type,
                    c.display_name,
                    c.relationship_status,
                    c.engagement_score,
                    c.lifetime_value,
                    c.total_conversations,
                    c.total_leads,
                    c.version,
                    c.created_at,
                    c.updated_at,
                ],
            )
            .map_err(|e| unique_violation(e, "client already exists on this platform"))?;
        Ok(())
    }

    fn get_client(&self, id: &str) -> Result<Option<Client>> {
        let client = self
            .conn
            .query_row(
                &format!("SELECT {} FROM clients WHERE id = ?", CLIENT_COLUMNS),
                params![id],
                client_from_row,
            )
            .optional()?;
        Ok(client)
    }

    fn find_client(
        &self,
        business_id: &str,
        platform_user_id: &str,
        platform_type: PlatformType,
    ) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM clients
                 WHERE business_id = ? AND platform_user_id = ? AND platform_type = ?",
                params![business_id, platform_user_id, platform_type],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn update_client(&self, c: &Client) -> Result<Client> {
        let affected = self.conn.execute(
            r#"UPDATE clients SET
                   display_name = ?, relationship_status = ?, engagement_score = ?,
                   lifetime_value = ?, total_conversations = ?, total_leads = ?,
                   updated_at = ?, version = version + 1
               WHERE id = ? AND version = ?"#,
            params![
                c.display_name,
                c.relationship_status,
                c.engagement_score,
                c.lifetime_value,
                c.total_conversations,
                c.total_leads,
                c.updated_at,
                c.id,
                c.version,
            ],
        )?;
        check_swapped(affected, "client", &c.id)?;
        Ok(Client {
            version: c.version + 1,
            ..c.clone()
        })
    }

    fn bump_client_counters(&self, client_id: &str, conversations: i64, leads: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE clients
             SET total_conversations = total_conversations + ?,
                 total_leads = total_leads + ?
             WHERE id = ?",
            params![conversations, leads, client_id],
        )?;
        Ok(())
    }

    fn list_client_ids(&self, business_id: &str) -> Result<Vec<String>> {
        self.ids(
            "SELECT id FROM clients WHERE business_id = ? ORDER BY created_at",
            business_id,
        )
    }

    fn client_conversation_ids(&self, client_id: &str) -> Result<Vec<String>> {
        self.ids(
            "SELECT id FROM conversations WHERE client_id = ? ORDER BY created_at",
            client_id,
        )
    }

    fn client_lead_ids(&self, client_id: &str) -> Result<Vec<String>> {
        self.ids(
            "SELECT id FROM leads WHERE client_id = ? ORDER BY created_at",
            client_id,
        )
    }

    fn insert_platform_source(&self, s: &PlatformSource) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO platform_sources ({}) VALUES (?, ?, ?, ?, ?, ?)",
                    SOURCE_COLUMNS
                ),
                params![
                    s.id,
                    s.business_id,
                    s.platform_type,
                    s.name,
                    s.is_active,
                    s.created_at
                ],
            )
            .map_err(|e| unique_violation(e, "platform source name already in use"))?;
        Ok(())
    }

    fn get_platform_source(&self, id: &str) -> Result<Option<PlatformSource>> {
        let source = self
            .conn
            .query_row(
                &format!("SELECT {} FROM platform_sources WHERE id = ?", SOURCE_COLUMNS),
                params![id],
                source_from_row,
            )
            .optional()?;
        Ok(source)
    }

    fn find_platform_source(
        &self,
        business_id: &str,
        platform_type: PlatformType,
        name: &str,
    ) -> Result<Option<String>> {
        let id = self
            .conn
            .query_row(
                "SELECT id FROM platform_sources
                 WHERE business_id = ? AND platform_type = ? AND name = ?",
                params![business_id, platform_type, name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}
