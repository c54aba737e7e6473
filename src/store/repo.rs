//! Repository interfaces the service layer is written against
//!
//! Relationships come back as identifiers, never as loaded object graphs.
//! Every `update_*` takes the record as the caller last read it: the stored
//! row must still carry `record.version`, otherwise the write fails with
//! `ConcurrencyConflict`. On success the returned record has the bumped
//! version.

use crate::error::Result;
use crate::funnel::Transition;
use crate::model::{
    Business, Client, ContentEntry, ContentKind, Conversation, Lead, LeadStageHistory, Message,
    PlatformSource, PlatformType, SectionTemplate, SectionTemplateTranslation, TestMessage,
    TestSession, UnansweredQuestion,
};

pub trait BusinessRepository {
    fn insert_business(&self, business: &Business) -> Result<()>;
    fn get_business(&self, id: &str) -> Result<Option<Business>>;
    fn find_business_by_owner_email(&self, owner_email: &str) -> Result<Option<String>>;
    fn find_business_by_owner_id(&self, owner_id: &str) -> Result<Option<String>>;
}

pub trait ClientRepository {
    fn insert_client(&self, client: &Client) -> Result<()>;
    fn get_client(&self, id: &str) -> Result<Option<Client>>;
    fn find_client(
        &self,
        business_id: &str,
        platform_user_id: &str,
        platform_type: PlatformType,
    ) -> Result<Option<String>>;
    fn update_client(&self, client: &Client) -> Result<Client>;
    /// Unconditional counter bump; drift is repaired by reconciliation
    fn bump_client_counters(&self, client_id: &str, conversations: i64, leads: i64) -> Result<()>;
    fn list_client_ids(&self, business_id: &str) -> Result<Vec<String>>;
    fn client_conversation_ids(&self, client_id: &str) -> Result<Vec<String>>;
    fn client_lead_ids(&self, client_id: &str) -> Result<Vec<String>>;

    fn insert_platform_source(&self, source: &PlatformSource) -> Result<()>;
    fn get_platform_source(&self, id: &str) -> Result<Option<PlatformSource>>;
    fn find_platform_source(
        &self,
        business_id: &str,
        platform_type: PlatformType,
        name: &str,
    ) -> Result<Option<String>>;
}

pub trait ConversationRepository {
    fn insert_conversation(&self, conversation: &Conversation) -> Result<()>;
    fn get_conversation(&self, id: &str) -> Result<Option<Conversation>>;
    fn update_conversation(&self, conversation: &Conversation) -> Result<Conversation>;
    /// Insert `message` and write `conversation` in one transaction
    fn append_message(&self, conversation: &Conversation, message: &Message)
        -> Result<Conversation>;
    fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>>;
    fn list_conversations_in_state(
        &self,
        business_id: &str,
        state: crate::model::ConversationState,
    ) -> Result<Vec<Conversation>>;
}

pub trait LeadRepository {
    fn insert_lead(&self, lead: &Lead) -> Result<()>;
    fn get_lead(&self, id: &str) -> Result<Option<Lead>>;
    /// Persist the updated lead and its history row atomically
    fn apply_transition(&self, transition: &Transition) -> Result<Lead>;
    fn lead_history(&self, lead_id: &str) -> Result<Vec<LeadStageHistory>>;
}

pub trait ContentRepository {
    fn get_content(&self, kind: ContentKind, id: &str) -> Result<Option<ContentEntry>>;
    fn find_content(
        &self,
        kind: ContentKind,
        business_id: &str,
        content_key: &str,
        language_code: &str,
    ) -> Result<Option<ContentEntry>>;
    fn insert_content(&self, entry: &ContentEntry) -> Result<()>;
    fn update_content(&self, entry: &ContentEntry) -> Result<ContentEntry>;
}

pub trait TemplateRepository {
    fn insert_template(&self, template: &SectionTemplate) -> Result<()>;
    fn get_template(&self, id: &str) -> Result<Option<SectionTemplate>>;
    fn find_template_by_key(&self, template_key: &str) -> Result<Option<SectionTemplate>>;
    fn find_translation(
        &self,
        template_id: &str,
        language_code: &str,
    ) -> Result<Option<SectionTemplateTranslation>>;
    fn upsert_translation(&self, translation: &SectionTemplateTranslation) -> Result<()>;
}

pub trait QuestionRepository {
    fn get_question(&self, id: &str) -> Result<Option<UnansweredQuestion>>;
    fn find_question(&self, business_id: &str, question_hash: &str)
        -> Result<Option<UnansweredQuestion>>;
    fn insert_question(&self, question: &UnansweredQuestion) -> Result<()>;
    fn update_question(&self, question: &UnansweredQuestion) -> Result<UnansweredQuestion>;
}

pub trait TestSessionRepository {
    fn insert_test_session(&self, session: &TestSession) -> Result<()>;
    fn get_test_session(&self, id: &str) -> Result<Option<TestSession>>;
    fn update_test_session(&self, session: &TestSession) -> Result<TestSession>;
    /// Insert `message` and bump the session's message count in one transaction
    fn append_test_message(&self, session: &TestSession, message: &TestMessage)
        -> Result<TestSession>;
    fn list_test_messages(&self, session_id: &str) -> Result<Vec<TestMessage>>;
}

/// Everything the service layer needs from a store
pub trait CrmRepository:
    BusinessRepository
    + ClientRepository
    + ConversationRepository
    + LeadRepository
    + ContentRepository
    + TemplateRepository
    + QuestionRepository
    + TestSessionRepository
{
}

impl<T> CrmRepository for T where
    T: BusinessRepository
        + ClientRepository
        + ConversationRepository
        + LeadRepository
        + ContentRepository
        + TemplateRepository
        + QuestionRepository
        + TestSessionRepository
{
}
