//! Operations exposed to API, webhook and admin collaborators
//!
//! Each call loads what it needs, authorizes it against the caller's
//! tenant, runs the pure state-model function, and writes the result back
//! with a version check. Nothing here retries: a `ConcurrencyConflict`
//! goes back to the caller, who reloads and tries again.

use chrono::Duration;
use tracing::{debug, info, warn};

use crate::aggregate;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::funnel;
use crate::lifecycle;
use crate::model::{
    new_id, Business, CharBounds, Client, ContentEntry, ContentKind, ContentUpsert, Conversation,
    ConversationState, Lead, LeadStage, LeadStageHistory, Message, NewBusiness, NewClient,
    NewConversation, NewLead, NewMessage, NewPlatformSource, NewSectionTemplate, PauseReason,
    PlatformSource, QuestionStatus, RelationshipStatus, SectionTemplate,
    SectionTemplateTranslation, SenderType, StageChange, SubscriptionStatus, TestMessage,
    TestSession, TestSessionStatus, UnansweredQuestion,
};
use crate::model::validate;
use crate::store::CrmRepository;
use crate::tenant::{TenantContext, UniquenessGuard};

pub struct CrmService<S, C> {
    store: S,
    clock: C,
    faq_bounds: CharBounds,
}

impl<S: CrmRepository, C: Clock> CrmService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            faq_bounds: CharBounds::default(),
        }
    }

    /// Character window applied to FAQ answers that carry no bounds of their own
    pub fn with_faq_bounds(mut self, bounds: CharBounds) -> Self {
        self.faq_bounds = bounds;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn guard(&self) -> UniquenessGuard<'_, S> {
        UniquenessGuard::new(&self.store)
    }

    // ============================================
    // LOADERS
    // ============================================

    fn load_client(&self, ctx: &TenantContext, id: &str) -> Result<Client> {
        let client = self
            .store
            .get_client(id)?
            .ok_or_else(|| CoreError::not_found("client", id))?;
        ctx.authorize("client", &client.business_id)?;
        Ok(client)
    }

    fn load_platform_source(&self, ctx: &TenantContext, id: &str) -> Result<PlatformSource> {
        let source = self
            .store
            .get_platform_source(id)?
            .ok_or_else(|| CoreError::not_found("platform source", id))?;
        ctx.authorize("platform source", &source.business_id)?;
        Ok(source)
    }

    pub fn get_conversation(&self, ctx: &TenantContext, id: &str) -> Result<Conversation> {
        let conversation = self
            .store
            .get_conversation(id)?
            .ok_or_else(|| CoreError::not_found("conversation", id))?;
        ctx.authorize("conversation", &conversation.business_id)?;
        Ok(conversation)
    }

    pub fn get_lead(&self, ctx: &TenantContext, id: &str) -> Result<Lead> {
        let lead = self
            .store
            .get_lead(id)?
            .ok_or_else(|| CoreError::not_found("lead", id))?;
        ctx.authorize("lead", &lead.business_id)?;
        Ok(lead)
    }

    pub fn get_content(
        &self,
        ctx: &TenantContext,
        kind: ContentKind,
        id: &str,
    ) -> Result<ContentEntry> {
        let entry = self
            .store
            .get_content(kind, id)?
            .ok_or_else(|| CoreError::not_found(kind.entity_name(), id))?;
        ctx.authorize(kind.entity_name(), &entry.business_id)?;
        Ok(entry)
    }

    fn load_question(&self, ctx: &TenantContext, id: &str) -> Result<UnansweredQuestion> {
        let question = self
            .store
            .get_question(id)?
            .ok_or_else(|| CoreError::not_found("unanswered question", id))?;
        ctx.authorize("unanswered question", &question.business_id)?;
        Ok(question)
    }

    fn load_test_session(&self, ctx: &TenantContext, id: &str) -> Result<TestSession> {
        let session = self
            .store
            .get_test_session(id)?
            .ok_or_else(|| CoreError::not_found("test session", id))?;
        ctx.authorize("test session", &session.business_id)?;
        Ok(session)
    }

    // ============================================
    // BUSINESSES, CLIENTS, SOURCES
    // ============================================

    /// Signup: creates a new tenant root. No tenant context exists yet.
    pub fn create_business(&self, input: &NewBusiness) -> Result<Business> {
        input.validate()?;
        self.guard()
            .business_owner(&input.owner_email, input.owner_id.as_deref())?;

        let now = self.clock.now();
        let business = Business {
            id: new_id(),
            name: input.name.trim().to_string(),
            owner_email: input.owner_email.clone(),
            owner_id: input.owner_id.clone(),
            primary_language: input.primary_language.clone(),
            subscription_plan: input.subscription_plan.clone(),
            subscription_status: SubscriptionStatus::Trial,
            onboarding_completed: false,
            onboarding_step: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_business(&business)?;
        info!(business_id = %business.id, owner = %business.owner_email, "business created");
        Ok(business)
    }

    pub fn get_business(&self, ctx: &TenantContext) -> Result<Business> {
        self.store
            .get_business(ctx.business_id())?
            .ok_or_else(|| CoreError::not_found("business", ctx.business_id()))
    }

    pub fn create_client(&self, ctx: &TenantContext, input: &NewClient) -> Result<Client> {
        input.validate()?;
        self.get_business(ctx)?;
        self.guard()
            .client(ctx, &input.platform_user_id, input.platform_type)?;

        let now = self.clock.now();
        let client = Client {
            id: new_id(),
            business_id: ctx.business_id().to_string(),
            platform_user_id: input.platform_user_id.clone(),
            platform_type: input.platform_type,
            display_name: input.display_name.clone(),
            relationship_status: RelationshipStatus::New,
            engagement_score: 0.0,
            lifetime_value: 0.0,
            total_conversations: 0,
            total_leads: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_client(&client)?;
        debug!(client_id = %client.id, platform = %client.platform_type, "client created");
        Ok(client)
    }

    pub fn get_client(&self, ctx: &TenantContext, id: &str) -> Result<Client> {
        self.load_client(ctx, id)
    }

    pub fn update_client_profile(
        &self,
        ctx: &TenantContext,
        client_id: &str,
        relationship_status: Option<RelationshipStatus>,
        engagement_score: Option<f64>,
        lifetime_value: Option<f64>,
    ) -> Result<Client> {
        let mut client = self.load_client(ctx, client_id)?;
        if let Some(status) = relationship_status {
            client.relationship_status = status;
        }
        if let Some(score) = engagement_score {
            client.set_engagement_score(score)?;
        }
        if let Some(value) = lifetime_value {
            client.set_lifetime_value(value)?;
        }
        client.updated_at = self.clock.now();
        self.store.update_client(&client)
    }

    pub fn create_platform_source(
        &self,
        ctx: &TenantContext,
        input: &NewPlatformSource,
    ) -> Result<PlatformSource> {
        input.validate()?;
        self.get_business(ctx)?;
        self.guard()
            .platform_source(ctx, input.platform_type, &input.name)?;

        let source = PlatformSource {
            id: new_id(),
            business_id: ctx.business_id().to_string(),
            platform_type: input.platform_type,
            name: input.name.clone(),
            is_active: true,
            created_at: self.clock.now(),
        };
        self.store.insert_platform_source(&source)?;
        Ok(source)
    }

    // ============================================
    // CONVERSATIONS
    // ============================================

    pub fn open_conversation(
        &self,
        ctx: &TenantContext,
        input: &NewConversation,
    ) -> Result<Conversation> {
        let client = self.load_client(ctx, &input.client_id)?;
        let source = self.load_platform_source(ctx, &input.platform_source_id)?;
        if !source.is_active {
            return Err(CoreError::ValidationFailed(format!(
                "platform source {} is inactive",
                source.id
            )));
        }

        let conversation = lifecycle::start(ctx.business_id(), input, self.clock.now());
        self.store.insert_conversation(&conversation)?;
        self.store.bump_client_counters(&client.id, 1, 0)?;
        info!(conversation_id = %conversation.id, client_id = %client.id, "conversation opened");
        Ok(conversation)
    }

    /// Append a message and update the conversation's rolling counters.
    pub fn record_message(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
        input: &NewMessage,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let now = self.clock.now();
        let next = lifecycle::record_message(&conversation, input, now).map_err(|e| {
            warn!(conversation_id, error = %e, "message rejected");
            e
        })?;

        let message = Message {
            id: new_id(),
            conversation_id: conversation.id.clone(),
            business_id: conversation.business_id.clone(),
            sender_type: input.sender_type,
            content: input.content.clone(),
            message_type: input.message_type,
            platform_message_id: input.platform_message_id.clone(),
            message_timestamp: input.message_timestamp,
            created_at: now,
        };
        let saved = self.store.append_message(&next, &message)?;
        debug!(
            conversation_id,
            sender = %message.sender_type,
            message_count = saved.message_count,
            "message recorded"
        );
        Ok(saved)
    }

    pub fn conversation_messages(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
    ) -> Result<Vec<Message>> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        self.store.list_messages(&conversation.id)
    }

    pub fn escalate_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
        reason: &str,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next = lifecycle::escalate(&conversation, reason, self.clock.now())?;
        let saved = self.store.update_conversation(&next)?;
        info!(conversation_id, reason, "conversation escalated to a human");
        Ok(saved)
    }

    pub fn pause_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
        reason: PauseReason,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next = lifecycle::pause(&conversation, reason, self.clock.now())?;
        let saved = self.store.update_conversation(&next)?;
        info!(conversation_id, reason = %reason, "conversation paused");
        Ok(saved)
    }

    pub fn resume_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next = lifecycle::resume(&conversation, self.clock.now())?;
        let saved = self.store.update_conversation(&next)?;
        info!(conversation_id, from = %conversation.current_state, "conversation resumed");
        Ok(saved)
    }

    pub fn close_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next = lifecycle::close(&conversation, self.clock.now())?;
        let saved = self.store.update_conversation(&next)?;
        info!(conversation_id, "conversation closed");
        Ok(saved)
    }

    pub fn reopen_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next = lifecycle::reopen(&conversation, self.clock.now())?;
        let saved = self.store.update_conversation(&next)?;
        info!(conversation_id, "conversation reopened");
        Ok(saved)
    }

    pub fn score_conversation(
        &self,
        ctx: &TenantContext,
        conversation_id: &str,
        lead_score: Option<f64>,
        sentiment_score: Option<f64>,
    ) -> Result<Conversation> {
        let conversation = self.get_conversation(ctx, conversation_id)?;
        let next =
            lifecycle::set_scores(&conversation, lead_score, sentiment_score, self.clock.now())?;
        self.store.update_conversation(&next)
    }

    /// Pause every active conversation idle for at least `timeout`.
    ///
    /// Conversations that change underneath the sweep are skipped; the next
    /// sweep picks them up again.
    pub fn pause_idle_conversations(
        &self,
        ctx: &TenantContext,
        timeout: Duration,
    ) -> Result<Vec<Conversation>> {
        let now = self.clock.now();
        let mut paused = Vec::new();
        for conversation in self
            .store
            .list_conversations_in_state(ctx.business_id(), ConversationState::Active)?
        {
            if !lifecycle::is_idle(&conversation, now, timeout) {
                continue;
            }
            let next = lifecycle::pause(&conversation, PauseReason::Inactivity, now)?;
            match self.store.update_conversation(&next) {
                Ok(saved) => paused.push(saved),
                Err(CoreError::ConcurrencyConflict { .. }) => {
                    debug!(conversation_id = %conversation.id, "skipped idle pause after concurrent write");
                }
                Err(e) => return Err(e),
            }
        }
        if !paused.is_empty() {
            info!(count = paused.len(), "paused idle conversations");
        }
        Ok(paused)
    }

    // ============================================
    // LEADS
    // ============================================

    pub fn create_lead(&self, ctx: &TenantContext, input: &NewLead) -> Result<Lead> {
        let client = self.load_client(ctx, &input.client_id)?;
        let conversation = self.get_conversation(ctx, &input.conversation_id)?;
        if conversation.client_id != client.id {
            return Err(CoreError::ValidationFailed(format!(
                "conversation {} does not belong to client {}",
                conversation.id, client.id
            )));
        }

        let lead = funnel::start(ctx.business_id(), input, self.clock.now())?;
        self.store.insert_lead(&lead)?;
        self.store.bump_client_counters(&client.id, 0, 1)?;
        info!(lead_id = %lead.id, client_id = %client.id, "lead created");
        Ok(lead)
    }

    /// Move a lead to `to_stage`, given as its text form.
    ///
    /// Unknown stage names fail with `InvalidStage`.
    pub fn advance_lead_stage(
        &self,
        ctx: &TenantContext,
        lead_id: &str,
        to_stage: &str,
        change: &StageChange,
    ) -> Result<Lead> {
        let to_stage: LeadStage = to_stage.parse()?;
        let lead = self.get_lead(ctx, lead_id)?;
        let transition =
            funnel::advance_stage(&lead, to_stage, change, self.clock.now()).map_err(|e| {
                warn!(lead_id, to = %to_stage, error = %e, "stage change rejected");
                e
            })?;

        let saved = self.store.apply_transition(&transition)?;
        info!(
            lead_id,
            from = %lead.current_stage,
            to = %saved.current_stage,
            progression = %change.progression_type,
            "lead stage advanced"
        );
        Ok(saved)
    }

    pub fn lead_history(&self, ctx: &TenantContext, lead_id: &str) -> Result<Vec<LeadStageHistory>> {
        let lead = self.get_lead(ctx, lead_id)?;
        self.store.lead_history(&lead.id)
    }

    // ============================================
    // CONTENT
    // ============================================

    /// Create or replace tenant content and recompute its derived fields.
    ///
    /// Bounds resolve in order: explicit, previously stored, section
    /// template (template responses), configured FAQ window.
    pub fn upsert_content(&self, ctx: &TenantContext, input: &ContentUpsert) -> Result<ContentEntry> {
        input.validate()?;
        if let Some(bounds) = input.bounds {
            CharBounds::new(bounds.min, bounds.max)?;
        }
        let kind = input.kind;

        let template_bounds = if kind == ContentKind::TemplateResponse {
            let template = self
                .store
                .find_template_by_key(&input.content_key)?
                .ok_or_else(|| CoreError::not_found("section template", &input.content_key))?;
            Some(template.bounds)
        } else {
            None
        };

        let existing = self.store.find_content(
            kind,
            ctx.business_id(),
            &input.content_key,
            &input.language_code,
        )?;

        let now = self.clock.now();
        match existing {
            Some(entry) => {
                ctx.authorize(kind.entity_name(), &entry.business_id)?;
                let stored = (!entry.bounds.is_unbounded()).then_some(entry.bounds);
                let bounds = input
                    .bounds
                    .or(stored)
                    .or(template_bounds)
                    .unwrap_or_else(|| self.default_bounds(kind));

                let next = aggregate::apply_content(&entry, &input.content, bounds, now);
                if next.content == entry.content
                    && next.bounds == entry.bounds
                    && next.completion_status == entry.completion_status
                {
                    debug!(entry_id = %entry.id, "content unchanged, skipping write");
                    return Ok(entry);
                }
                let saved = self.store.update_content(&next)?;
                debug!(
                    entry_id = %saved.id,
                    kind = %kind,
                    characters = saved.character_count,
                    status = %saved.completion_status,
                    "content updated"
                );
                Ok(saved)
            }
            None => {
                self.guard().content(
                    ctx,
                    kind,
                    &input.content_key,
                    &input.language_code,
                    None,
                )?;
                let bounds = input
                    .bounds
                    .or(template_bounds)
                    .unwrap_or_else(|| self.default_bounds(kind));
                let blank = aggregate::blank_entry(
                    kind,
                    ctx.business_id(),
                    &input.content_key,
                    &input.language_code,
                    now,
                );
                let entry = aggregate::apply_content(&blank, &input.content, bounds, now);
                self.store.insert_content(&entry)?;
                info!(entry_id = %entry.id, kind = %kind, key = %entry.content_key, "content created");
                Ok(entry)
            }
        }
    }

    fn default_bounds(&self, kind: ContentKind) -> CharBounds {
        match kind {
            ContentKind::Faq => self.faq_bounds,
            _ => CharBounds::default(),
        }
    }

    /// Content surfaced by a retrieval collaborator
    pub fn record_access(
        &self,
        ctx: &TenantContext,
        kind: ContentKind,
        entry_id: &str,
    ) -> Result<ContentEntry> {
        let entry = self.get_content(ctx, kind, entry_id)?;
        let next = aggregate::record_access(&entry, self.clock.now());
        self.store.update_content(&next)
    }

    pub fn record_outcome(
        &self,
        ctx: &TenantContext,
        faq_id: &str,
        was_helpful: bool,
    ) -> Result<ContentEntry> {
        let entry = self.get_content(ctx, ContentKind::Faq, faq_id)?;
        let next = aggregate::record_outcome(&entry, was_helpful, self.clock.now())?;
        let saved = self.store.update_content(&next)?;
        debug!(
            faq_id,
            was_helpful,
            success_rate = saved.success_rate.unwrap_or(0.0),
            "faq outcome recorded"
        );
        Ok(saved)
    }

    // ============================================
    // UNANSWERED QUESTIONS
    // ============================================

    /// Log a question nothing could answer, merging repeats by hash.
    pub fn record_unanswered_question(
        &self,
        ctx: &TenantContext,
        question: &str,
        language_code: &str,
        sources_searched: &[String],
        confidence: Option<f64>,
    ) -> Result<UnansweredQuestion> {
        validate::non_empty("question", question)?;
        validate::language_code(language_code)?;
        if let Some(score) = confidence {
            validate::in_range("confidence", score, 0.0, 1.0)?;
        }

        let hash = aggregate::question_hash(question);
        let now = self.clock.now();

        match self.store.find_question(ctx.business_id(), &hash)? {
            Some(existing) => {
                let mut next = existing.clone();
                next.frequency += 1;
                next.last_asked_at = now;
                for source in sources_searched {
                    if !next.sources_searched.contains(source) {
                        next.sources_searched.push(source.clone());
                    }
                }
                next.confidence_scores.extend(confidence);
                let saved = self.store.update_question(&next)?;
                debug!(question_id = %saved.id, frequency = saved.frequency, "repeat unanswered question");
                Ok(saved)
            }
            None => {
                let record = UnansweredQuestion {
                    id: new_id(),
                    business_id: ctx.business_id().to_string(),
                    question: question.trim().to_string(),
                    question_hash: hash,
                    language_code: language_code.to_string(),
                    frequency: 1,
                    status: QuestionStatus::Pending,
                    sources_searched: sources_searched.to_vec(),
                    confidence_scores: confidence.into_iter().collect(),
                    resolved_faq_id: None,
                    first_asked_at: now,
                    last_asked_at: now,
                    resolved_at: None,
                    version: 0,
                };
                self.store.insert_question(&record)?;
                info!(question_id = %record.id, "unanswered question logged");
                Ok(record)
            }
        }
    }

    /// Triage a logged question. Resolving may point at the FAQ that now answers it.
    pub fn set_question_status(
        &self,
        ctx: &TenantContext,
        question_id: &str,
        status: QuestionStatus,
        resolved_faq_id: Option<&str>,
    ) -> Result<UnansweredQuestion> {
        let question = self.load_question(ctx, question_id)?;
        if resolved_faq_id.is_some() && status != QuestionStatus::Resolved {
            return Err(CoreError::ValidationFailed(
                "an answering faq can only be linked when resolving".to_string(),
            ));
        }
        if let Some(faq_id) = resolved_faq_id {
            self.get_content(ctx, ContentKind::Faq, faq_id)?;
        }

        let mut next = question.clone();
        next.status = status;
        if status == QuestionStatus::Resolved {
            next.resolved_at = Some(self.clock.now());
            next.resolved_faq_id = resolved_faq_id.map(str::to_string);
        } else {
            next.resolved_at = None;
            next.resolved_faq_id = None;
        }
        let saved = self.store.update_question(&next)?;
        info!(question_id, status = %status, "question status changed");
        Ok(saved)
    }

    // ============================================
    // TEMPLATES
    // ============================================

    pub fn create_section_template(&self, input: &NewSectionTemplate) -> Result<SectionTemplate> {
        input.validate()?;
        self.guard().template_key(&input.template_key)?;
        let template = SectionTemplate {
            id: new_id(),
            template_key: input.template_key.clone(),
            category: input.category.clone(),
            bounds: input.bounds,
            display_order: input.display_order,
            is_required: input.is_required,
            created_at: self.clock.now(),
        };
        self.store.insert_template(&template)?;
        Ok(template)
    }

    pub fn upsert_template_translation(
        &self,
        template_id: &str,
        language_code: &str,
        title: &str,
        prompt: Option<&str>,
    ) -> Result<SectionTemplateTranslation> {
        validate::language_code(language_code)?;
        validate::non_empty("title", title)?;
        self.store
            .get_template(template_id)?
            .ok_or_else(|| CoreError::not_found("section template", template_id))?;

        let id = match self.store.find_translation(template_id, language_code)? {
            Some(existing) => existing.id,
            None => new_id(),
        };
        let translation = SectionTemplateTranslation {
            id,
            template_id: template_id.to_string(),
            language_code: language_code.to_string(),
            title: title.to_string(),
            prompt: prompt.map(str::to_string),
            updated_at: self.clock.now(),
        };
        self.store.upsert_translation(&translation)?;
        Ok(translation)
    }

    // ============================================
    // RECONCILIATION
    // ============================================

    /// Recompute client conversation/lead counters from row counts.
    ///
    /// Returns the clients that were repaired.
    pub fn reconcile_client_counters(&self, ctx: &TenantContext) -> Result<Vec<Client>> {
        let now = self.clock.now();
        let mut repaired = Vec::new();
        for client_id in self.store.list_client_ids(ctx.business_id())? {
            let client = self.load_client(ctx, &client_id)?;
            let conversations = self.store.client_conversation_ids(&client.id)?.len() as i64;
            let leads = self.store.client_lead_ids(&client.id)?.len() as i64;
            if let Some(next) = aggregate::reconcile_client(&client, conversations, leads, now) {
                warn!(
                    client_id = %client.id,
                    stored_conversations = client.total_conversations,
                    stored_leads = client.total_leads,
                    conversations,
                    leads,
                    "client counters drifted"
                );
                repaired.push(self.store.update_client(&next)?);
            }
        }
        Ok(repaired)
    }

    // ============================================
    // SCENARIO TESTS
    // ============================================

    pub fn start_test_session(
        &self,
        ctx: &TenantContext,
        scenario_name: &str,
        language_code: &str,
    ) -> Result<TestSession> {
        validate::non_empty("scenario_name", scenario_name)?;
        validate::language_code(language_code)?;
        self.get_business(ctx)?;
        let session = TestSession {
            id: new_id(),
            business_id: ctx.business_id().to_string(),
            scenario_name: scenario_name.to_string(),
            language_code: language_code.to_string(),
            status: TestSessionStatus::Running,
            message_count: 0,
            started_at: self.clock.now(),
            completed_at: None,
            version: 0,
        };
        self.store.insert_test_session(&session)?;
        Ok(session)
    }

    pub fn add_test_message(
        &self,
        ctx: &TenantContext,
        session_id: &str,
        sender_type: SenderType,
        content: &str,
    ) -> Result<TestMessage> {
        validate::non_empty("content", content)?;
        let session = self.load_test_session(ctx, session_id)?;
        if session.status == TestSessionStatus::Completed {
            return Err(CoreError::InvalidTransition(format!(
                "test session {} is completed",
                session.id
            )));
        }

        let mut next = session.clone();
        next.message_count += 1;
        let message = TestMessage {
            id: new_id(),
            test_session_id: session.id.clone(),
            sequence: next.message_count,
            sender_type,
            content: content.to_string(),
            created_at: self.clock.now(),
        };
        self.store.append_test_message(&next, &message)?;
        Ok(message)
    }

    pub fn complete_test_session(&self, ctx: &TenantContext, session_id: &str) -> Result<TestSession> {
        let session = self.load_test_session(ctx, session_id)?;
        if session.status == TestSessionStatus::Completed {
            return Err(CoreError::InvalidTransition(format!(
                "test session {} is already completed",
                session.id
            )));
        }
        let mut next = session.clone();
        next.status = TestSessionStatus::Completed;
        next.completed_at = Some(self.clock.now());
        self.store.update_test_session(&next)
    }

    pub fn test_transcript(&self, ctx: &TenantContext, session_id: &str) -> Result<Vec<TestMessage>> {
        let session = self.load_test_session(ctx, session_id)?;
        self.store.list_test_messages(&session.id)
    }
}
