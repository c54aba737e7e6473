use rusqlite::{params, OptionalExtension, Row};

use super::repo::{ContentRepository, TemplateRepository};
use super::{check_swapped, unique_violation, CrmStore};
use crate::error::Result;
use crate::model::{CharBounds, ContentEntry, ContentKind, SectionTemplate, SectionTemplateTranslation};

// ============================================
// CONTENT ENTRIES
// ============================================

/// Select list for `kind`; FAQ rows carry two extra trailing columns.
fn content_columns(kind: ContentKind) -> String {
    let mut columns = format!(
        "id, business_id, content_key, language_code, content, character_count, word_count, \
         completion_status, character_min, character_max, {}, {}, version, created_at, updated_at",
        kind.access_count_column(),
        kind.last_access_column()
    );
    if kind == ContentKind::Faq {
        columns.push_str(", usage_count, success_rate");
    }
    columns
}

fn content_from_row(kind: ContentKind, row: &Row) -> rusqlite::Result<ContentEntry> {
    let is_faq = kind == ContentKind::Faq;
    Ok(ContentEntry {
        id: row.get(0)?,
        kind,
        business_id: row.get(1)?,
        content_key: row.get(2)?,
        language_code: row.get(3)?,
        content: row.get(4)?,
        character_count: row.get(5)?,
        word_count: row.get(6)?,
        completion_status: row.get(7)?,
        bounds: CharBounds {
            min: row.get(8)?,
            max: row.get(9)?,
        },
        access_count: row.get(10)?,
        last_accessed: row.get(11)?,
        version: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
        usage_count: if is_faq { Some(row.get(15)?) } else { None },
        success_rate: if is_faq { Some(row.get(16)?) } else { None },
    })
}

impl ContentRepository for CrmStore {
    fn get_content(&self, kind: ContentKind, id: &str) -> Result<Option<ContentEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?",
                    content_columns(kind),
                    kind.table()
                ),
                params![id],
                |row| content_from_row(kind, row),
            )
            .optional()?;
        Ok(entry)
    }

    fn find_content(
        &self,
        kind: ContentKind,
        business_id: &str,
        content_key: &str,
        language_code: &str,
    ) -> Result<Option<ContentEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM {}
                     WHERE business_id = ? AND content_key = ? AND language_code = ?",
                    content_columns(kind),
                    kind.table()
                ),
                params![business_id, content_key, language_code],
                |row| content_from_row(kind, row),
            )
            .optional()?;
        Ok(entry)
    }

    fn insert_content(&self, e: &ContentEntry) -> Result<()> {
        let kind = e.kind;
        let result = if kind == ContentKind::Faq {
            self.conn.execute(
                &format!(
                    "INSERT INTO {} ({})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    kind.table(),
                    content_columns(kind)
                ),
                params![
                    e.id,
                    e.business_id,
                    e.content_key,
                    e.language_code,
                    e.content,
                    e.character_count,
                    e.word_count,
                    e.completion_status,
                    e.bounds.min,
                    e.bounds.max,
                    e.access_count,
                    e.last_accessed,
                    e.version,
                    e.created_at,
                    e.updated_at,
                    e.usage_count.unwrap_or(0),
                    e.success_rate.unwrap_or(0.0),
                ],
            )
        } else {
            self.conn.execute(
                &format!(
                    "INSERT INTO {} ({})
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    kind.table(),
                    content_columns(kind)
                ),
                params![
                    e.id,
                    e.business_id,
                    e.content_key,
                    e.language_code,
                    e.content,
                    e.character_count,
                    e.word_count,
                    e.completion_status,
                    e.bounds.min,
                    e.bounds.max,
                    e.access_count,
                    e.last_accessed,
                    e.version,
                    e.created_at,
                    e.updated_at,
                ],
            )
        };
        result.map_err(|err| {
            unique_violation(
                err,
                &format!(
                    "{} '{}' already exists for language {}",
                    kind.entity_name(),
                    e.content_key,
                    e.language_code
                ),
            )
        })?;
        Ok(())
    }

    fn update_content(&self, e: &ContentEntry) -> Result<ContentEntry> {
        let kind = e.kind;
        let tx = self.conn.unchecked_transaction()?;
        let affected = tx.execute(
            &format!(
                r#"UPDATE {} SET
                       content = ?, character_count = ?, word_count = ?, completion_status = ?,
                       character_min = ?, character_max = ?, {} = ?, {} = ?,
                       updated_at = ?, version = version + 1
                   WHERE id = ? AND version = ?"#,
                kind.table(),
                kind.access_count_column(),
                kind.last_access_column()
            ),
            params![
                e.content,
                e.character_count,
                e.word_count,
                e.completion_status,
                e.bounds.min,
                e.bounds.max,
                e.access_count,
                e.last_accessed,
                e.updated_at,
                e.id,
                e.version,
            ],
        )?;
        check_swapped(affected, kind.entity_name(), &e.id)?;

        if kind == ContentKind::Faq {
            tx.execute(
                "UPDATE faq_items SET usage_count = ?, success_rate = ? WHERE id = ?",
                params![e.usage_count.unwrap_or(0), e.success_rate.unwrap_or(0.0), e.id],
            )?;
        }
        tx.commit()?;

        Ok(ContentEntry {
            version: e.version + 1,
            ..e.clone()
        })
    }
}

// ============================================
// SECTION TEMPLATES
// ============================================

const TEMPLATE_COLUMNS: &str = "id, template_key, category, character_min, character_max, \
     display_order, is_required, created_at";

fn template_from_row(row: &Row) -> rusqlite::Result<SectionTemplate> {
    Ok(SectionTemplate {
        id: row.get(0)?,
        template_key: row.get(1)?,
        category: row.get(2)?,
        bounds: CharBounds {
            min: row.get(3)?,
            max: row.get(4)?,
        },
        display_order: row.get(5)?,
        is_required: row.get(6)?,
        created_at: row.get(7)?,
    })
}

impl TemplateRepository for CrmStore {
    fn insert_template(&self, t: &SectionTemplate) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO section_templates ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    TEMPLATE_COLUMNS
                ),
                params![
                    t.id,
                    t.template_key,
                    t.category,
                    t.bounds.min,
                    t.bounds.max,
                    t.display_order,
                    t.is_required,
                    t.created_at,
                ],
            )
            .map_err(|e| unique_violation(e, "template key already exists"))?;
        Ok(())
    }

    fn get_template(&self, id: &str) -> Result<Option<SectionTemplate>> {
        let template = self
            .conn
            .query_row(
                &format!("SELECT {} FROM section_templates WHERE id = ?", TEMPLATE_COLUMNS),
                params![id],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    fn find_template_by_key(&self, template_key: &str) -> Result<Option<SectionTemplate>> {
        let template = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM section_templates WHERE template_key = ?",
                    TEMPLATE_COLUMNS
                ),
                params![template_key],
                template_from_row,
            )
            .optional()?;
        Ok(template)
    }

    fn find_translation(
        &self,
        template_id: &str,
        language_code: &str,
    ) -> Result<Option<SectionTemplateTranslation>> {
        let translation = self
            .conn
            .query_row(
                "SELECT id, template_id, language_code, title, prompt, updated_at
                 FROM section_template_translations
                 WHERE template_id = ? AND language_code = ?",
                params![template_id, language_code],
                |row| {
                    Ok(SectionTemplateTranslation {
                        id: row.get(0)?,
                        template_id: row.get(1)?,
                        language_code: row.get(2)?,
                        title: row.get(3)?,
                        prompt: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(translation)
    }

    fn upsert_translation(&self, t: &SectionTemplateTranslation) -> Result<()> {
        self.conn.execute(
            r#"INSERT INTO section_template_translations
                   (id, template_id, language_code, title, prompt, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(template_id, language_code) DO UPDATE SET
                   title = excluded.title,
                   prompt = excluded.prompt,
                   updated_at = excluded.updated_at"#,
            params![
                t.id,
                t.template_id,
                t.language_code,
                t.title,
                t.prompt,
                t.updated_at
            ],
        )?;
        Ok(())
    }
}
