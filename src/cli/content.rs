//! Content, unanswered-question and template commands

use anyhow::Result;

use super::{print_json, Service};
use crate::model::{
    CharBounds, ContentKind, ContentUpsert, NewSectionTemplate, QuestionStatus,
};
use crate::tenant::TenantContext;

#[allow(clippy::too_many_arguments)]
pub fn upsert(
    service: &Service,
    ctx: &TenantContext,
    kind: ContentKind,
    key: String,
    language: String,
    content: String,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<()> {
    let bounds = if min.is_some() || max.is_some() {
        Some(CharBounds::new(min, max)?)
    } else {
        None
    };
    let entry = service.upsert_content(
        ctx,
        &ContentUpsert {
            kind,
            content_key: key,
            language_code: language,
            content,
            bounds,
        },
    )?;
    println!(
        "{} {} [{}]: {} chars, {} words",
        kind.entity_name(),
        entry.id,
        entry.completion_status,
        entry.character_count,
        entry.word_count
    );
    Ok(())
}

pub fn show(service: &Service, ctx: &TenantContext, kind: ContentKind, id: &str) -> Result<()> {
    print_json(&service.get_content(ctx, kind, id)?)
}

pub fn access(service: &Service, ctx: &TenantContext, kind: ContentKind, id: &str) -> Result<()> {
    let entry = service.record_access(ctx, kind, id)?;
    println!("{} {} accessed {} times", kind.entity_name(), entry.id, entry.access_count);
    Ok(())
}

pub fn outcome(service: &Service, ctx: &TenantContext, faq_id: &str, helpful: bool) -> Result<()> {
    let entry = service.record_outcome(ctx, faq_id, helpful)?;
    println!(
        "FAQ {} success rate {:.1}% over {} answers",
        entry.id,
        entry.success_rate.unwrap_or(0.0),
        entry.usage_count.unwrap_or(0)
    );
    Ok(())
}

pub fn record_question(
    service: &Service,
    ctx: &TenantContext,
    question: &str,
    language: &str,
    sources: &[String],
    confidence: Option<f64>,
) -> Result<()> {
    let record = service.record_unanswered_question(ctx, question, language, sources, confidence)?;
    println!(
        "Question {} asked {} time(s), status {}",
        record.id, record.frequency, record.status
    );
    Ok(())
}

pub fn question_status(
    service: &Service,
    ctx: &TenantContext,
    question_id: &str,
    status: QuestionStatus,
    faq_id: Option<&str>,
) -> Result<()> {
    print_json(&service.set_question_status(ctx, question_id, status, faq_id)?)
}

pub fn create_template(service: &Service, input: NewSectionTemplate) -> Result<()> {
    let template = service.create_section_template(&input)?;
    println!(
        "Template '{}' created with ID: {}",
        template.template_key, template.id
    );
    Ok(())
}

pub fn translate_template(
    service: &Service,
    template_id: &str,
    language: &str,
    title: &str,
    prompt: Option<&str>,
) -> Result<()> {
    print_json(&service.upsert_template_translation(template_id, language, title, prompt)?)
}
