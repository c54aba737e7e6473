use chrono::{DateTime, Duration, TimeZone, Utc};

use bizcrm::clock::ManualClock;
use bizcrm::model::{
    new_id, CharBounds, Client, CompletionStatus, ContentKind, ContentUpsert, Conversation,
    ConversationState, LeadOutcome, LeadStage, Message, MessageType, NewBusiness, NewClient,
    NewConversation, NewLead, NewMessage, NewPlatformSource, NewSectionTemplate, PauseReason,
    PlatformSource, PlatformType, ProgressionType, QuestionStatus, SenderType, StageChange,
    TestSessionStatus,
};
use bizcrm::store::repo::{ClientRepository, ConversationRepository, LeadRepository};
use bizcrm::{funnel, lifecycle, CoreError, CrmService, CrmStore, TenantContext};

type TestService = CrmService<CrmStore, ManualClock>;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

struct Fixture {
    service: TestService,
    ctx: TenantContext,
    client: Client,
    source: PlatformSource,
    conversation: Conversation,
}

fn business(service: &TestService, email: &str) -> TenantContext {
    let business = service
        .create_business(&NewBusiness {
            name: "Corner Bakery".to_string(),
            owner_email: email.to_string(),
            owner_id: None,
            primary_language: "en".to_string(),
            subscription_plan: "starter".to_string(),
        })
        .unwrap();
    TenantContext::new(business.id)
}

fn setup_with(service: TestService) -> Fixture {
    let ctx = business(&service, "owner@bakery.example");
    let client = service
        .create_client(
            &ctx,
            &NewClient {
                platform_user_id: "+15550100".to_string(),
                platform_type: PlatformType::Whatsapp,
                display_name: Some("Ana".to_string()),
            },
        )
        .unwrap();
    let source = service
        .create_platform_source(
            &ctx,
            &NewPlatformSource {
                platform_type: PlatformType::Whatsapp,
                name: "Main line".to_string(),
            },
        )
        .unwrap();
    let conversation = service
        .open_conversation(
            &ctx,
            &NewConversation {
                client_id: client.id.clone(),
                platform_source_id: source.id.clone(),
            },
        )
        .unwrap();
    Fixture {
        service,
        ctx,
        client,
        source,
        conversation,
    }
}

fn setup() -> Fixture {
    let store = CrmStore::open_in_memory().unwrap();
    setup_with(CrmService::new(store, ManualClock::new(t0())))
}

fn new_lead(f: &Fixture) -> NewLead {
    NewLead {
        client_id: f.client.id.clone(),
        conversation_id: f.conversation.id.clone(),
        qualification_score: 40,
        interest_level: 6,
        engagement_level: 5,
        lead_source: Some("whatsapp".to_string()),
        estimated_value: Some(250.0),
    }
}

fn faq(question: &str, answer: &str) -> ContentUpsert {
    ContentUpsert {
        kind: ContentKind::Faq,
        content_key: question.to_string(),
        language_code: "en".to_string(),
        content: answer.to_string(),
        bounds: None,
    }
}

// ============================================
// LEAD FUNNEL
// ============================================

#[test]
fn test_lead_moves_new_to_qualified() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    assert_eq!(lead.current_stage, LeadStage::New);
    assert!(f.service.lead_history(&f.ctx, &lead.id).unwrap().is_empty());

    f.service.clock().advance(Duration::minutes(10));
    let change = StageChange {
        trigger_event: Some("first reply".to_string()),
        ..StageChange::new(ProgressionType::Automatic)
    };
    f.service
        .advance_lead_stage(&f.ctx, &lead.id, "contacted", &change)
        .unwrap();

    f.service.clock().advance(Duration::minutes(5));
    let lead = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "qualified", &StageChange::default())
        .unwrap();

    assert_eq!(lead.current_stage, LeadStage::Qualified);
    assert_eq!(lead.previous_stage, Some(LeadStage::Contacted));
    assert_eq!(lead.stage_progression_count, 2);
    assert_eq!(lead.total_funnel_time, 15 * 60);
    assert_eq!(lead.version, 2);

    let history = f.service.lead_history(&f.ctx, &lead.id).unwrap();
    assert_eq!(history.len() as i64, lead.stage_progression_count);
    assert_eq!(history[0].from_stage, Some(LeadStage::New));
    assert_eq!(history[0].to_stage, LeadStage::Contacted);
    assert_eq!(history[0].time_in_previous_stage, 600);
    assert_eq!(history[0].trigger_event.as_deref(), Some("first reply"));
    assert_eq!(history[1].to_stage, LeadStage::Qualified);
    assert_eq!(history[1].time_in_previous_stage, 300);
    assert_eq!(
        history.iter().map(|h| h.time_in_previous_stage).sum::<i64>(),
        lead.total_funnel_time
    );
}

#[test]
fn test_stale_lead_transition_writes_nothing() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    let stale = f.service.get_lead(&f.ctx, &lead.id).unwrap();
    f.service
        .advance_lead_stage(&f.ctx, &lead.id, "contacted", &StageChange::default())
        .unwrap();

    let transition =
        funnel::advance_stage(&stale, LeadStage::Qualified, &StageChange::default(), t0())
            .unwrap();
    let err = f.service.store().apply_transition(&transition).unwrap_err();
    assert!(matches!(err, CoreError::ConcurrencyConflict { .. }));

    let stored = f.service.get_lead(&f.ctx, &lead.id).unwrap();
    assert_eq!(stored.current_stage, LeadStage::Contacted);
    assert_eq!(stored.stage_progression_count, 1);
    assert_eq!(f.service.lead_history(&f.ctx, &lead.id).unwrap().len(), 1);
}

#[test]
fn test_terminal_stage_rejects_further_moves() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    let won = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "closed_won", &StageChange::default())
        .unwrap();
    assert_eq!(won.final_outcome, Some(LeadOutcome::Won));
    assert_eq!(won.outcome_date, Some(t0()));

    let err = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "proposal", &StageChange::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));

    let stored = f.service.get_lead(&f.ctx, &lead.id).unwrap();
    assert_eq!(stored.current_stage, LeadStage::ClosedWon);
    assert_eq!(stored.stage_progression_count, 1);
    assert_eq!(f.service.lead_history(&f.ctx, &lead.id).unwrap().len(), 1);
}

#[test]
fn test_unknown_stage_and_same_stage() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();

    let err = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "archived", &StageChange::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidStage(_)));

    let err = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "new", &StageChange::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));
}

#[test]
fn test_out_of_range_confidence_rejected() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    let change = StageChange {
        confidence_score: Some(1.5),
        ..StageChange::default()
    };
    let err = f
        .service
        .advance_lead_stage(&f.ctx, &lead.id, "contacted", &change)
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed(_)));
    assert!(f.service.lead_history(&f.ctx, &lead.id).unwrap().is_empty());
}

#[test]
fn test_lead_requires_matching_conversation_client() {
    let f = setup();
    let other = f
        .service
        .create_client(
            &f.ctx,
            &NewClient {
                platform_user_id: "+15550199".to_string(),
                platform_type: PlatformType::Whatsapp,
                display_name: None,
            },
        )
        .unwrap();
    let input = NewLead {
        client_id: other.id,
        ..new_lead(&f)
    };
    let err = f.service.create_lead(&f.ctx, &input).unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed(_)));
}

// ============================================
// CONVERSATION LIFECYCLE
// ============================================

#[test]
fn test_open_conversation_bumps_client_counter() {
    let f = setup();
    let client = f.service.get_client(&f.ctx, &f.client.id).unwrap();
    assert_eq!(client.total_conversations, 1);

    f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    let client = f.service.get_client(&f.ctx, &f.client.id).unwrap();
    assert_eq!(client.total_leads, 1);
}

#[test]
fn test_messages_count_and_keep_latest_activity() {
    let f = setup();
    let later = t0() + Duration::minutes(20);
    let earlier = t0() + Duration::minutes(5);

    f.service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "Hi, are you open?", later),
        )
        .unwrap();
    let conversation = f
        .service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Bot, "Yes, until 6pm.", earlier),
        )
        .unwrap();

    assert_eq!(conversation.message_count, 2);
    assert_eq!(conversation.last_activity, later);
    assert_eq!(conversation.current_state, ConversationState::Active);

    let messages = f
        .service
        .conversation_messages(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_timestamp, earlier);
    assert_eq!(messages[1].content, "Hi, are you open?");
}

#[test]
fn test_closed_conversation_rejects_messages() {
    let f = setup();
    f.service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "Thanks!", t0()),
        )
        .unwrap();
    let closed = f
        .service
        .close_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(closed.closed_at, Some(t0()));

    let err = f
        .service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "One more thing", t0()),
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::ConversationClosed(_)));

    let stored = f
        .service
        .get_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(stored.message_count, 1);
    assert_eq!(
        f.service
            .conversation_messages(&f.ctx, &f.conversation.id)
            .unwrap()
            .len(),
        1
    );

    let reopened = f
        .service
        .reopen_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(reopened.current_state, ConversationState::Active);
    assert_eq!(reopened.closed_at, None);
}

#[test]
fn test_escalation_hands_off_to_human() {
    let f = setup();
    let escalated = f
        .service
        .escalate_conversation(&f.ctx, &f.conversation.id, "refund request")
        .unwrap();
    assert_eq!(escalated.current_state, ConversationState::Escalated);
    assert!(escalated.requires_human);
    assert!(!escalated.is_bot_active);
    assert_eq!(
        escalated.human_takeover_reason.as_deref(),
        Some("refund request")
    );

    let err = f
        .service
        .escalate_conversation(&f.ctx, &f.conversation.id, "again")
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));

    let resumed = f
        .service
        .resume_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(resumed.current_state, ConversationState::Active);
    assert!(resumed.is_bot_active);
    assert!(!resumed.requires_human);
}

#[test]
fn test_escalating_closed_conversation_fails() {
    let f = setup();
    f.service
        .close_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    let err = f
        .service
        .escalate_conversation(&f.ctx, &f.conversation.id, "angry customer")
        .unwrap_err();
    assert!(matches!(err, CoreError::ConversationClosed(_)));
}

#[test]
fn test_stale_version_is_a_conflict() {
    let f = setup();
    let stale = f
        .service
        .get_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    f.service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "Hello", t0()),
        )
        .unwrap();

    let mut edited = stale.clone();
    edited.lead_score = 80.0;
    let err = f.service.store().update_conversation(&edited).unwrap_err();
    assert!(matches!(err, CoreError::ConcurrencyConflict { .. }));

    let stored = f
        .service
        .get_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(stored.lead_score, 0.0);
    assert_eq!(stored.version, stale.version + 1);
}

#[test]
fn test_backdated_first_message_sets_activity() {
    let f = setup();
    assert_eq!(f.conversation.last_activity, t0());
    let sent = t0() - Duration::minutes(5);
    let conversation = f
        .service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "Sent while offline", sent),
        )
        .unwrap();
    assert_eq!(conversation.message_count, 1);
    assert_eq!(conversation.last_activity, sent);
}

#[test]
fn test_stale_message_append_writes_nothing() {
    let f = setup();
    let stale = f
        .service
        .get_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    f.service
        .record_message(
            &f.ctx,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "Hello", t0()),
        )
        .unwrap();

    let input = NewMessage::text(SenderType::Bot, "Hi! How can we help?", t0());
    let next = lifecycle::record_message(&stale, &input, t0()).unwrap();
    let message = Message {
        id: new_id(),
        conversation_id: stale.id.clone(),
        business_id: stale.business_id.clone(),
        sender_type: input.sender_type,
        content: input.content.clone(),
        message_type: MessageType::Text,
        platform_message_id: None,
        message_timestamp: input.message_timestamp,
        created_at: t0(),
    };
    let err = f
        .service
        .store()
        .append_message(&next, &message)
        .unwrap_err();
    assert!(matches!(err, CoreError::ConcurrencyConflict { .. }));

    let stored = f
        .service
        .get_conversation(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(stored.message_count, 1);
    let messages = f
        .service
        .conversation_messages(&f.ctx, &f.conversation.id)
        .unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Hello");
}

#[test]
fn test_idle_sweep_pauses_only_stale_conversations() {
    let f = setup();
    let busy = f
        .service
        .open_conversation(
            &f.ctx,
            &NewConversation {
                client_id: f.client.id.clone(),
                platform_source_id: f.source.id.clone(),
            },
        )
        .unwrap();

    f.service.clock().advance(Duration::minutes(45));
    f.service
        .record_message(
            &f.ctx,
            &busy.id,
            &NewMessage::text(SenderType::Customer, "Still there?", f.service_now()),
        )
        .unwrap();

    let paused = f
        .service
        .pause_idle_conversations(&f.ctx, Duration::minutes(30))
        .unwrap();
    assert_eq!(paused.len(), 1);
    assert_eq!(paused[0].id, f.conversation.id);
    assert_eq!(paused[0].current_state, ConversationState::Paused);
    assert_eq!(paused[0].pause_reason, Some(PauseReason::Inactivity));

    let busy = f.service.get_conversation(&f.ctx, &busy.id).unwrap();
    assert_eq!(busy.current_state, ConversationState::Active);
}

impl Fixture {
    fn service_now(&self) -> DateTime<Utc> {
        use bizcrm::Clock;
        self.service.clock().now()
    }
}

// ============================================
// TENANCY AND UNIQUENESS
// ============================================

#[test]
fn test_cross_tenant_access_is_rejected() {
    let f = setup();
    let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    let other = business(&f.service, "owner@florist.example");

    let err = f
        .service
        .get_conversation(&other, &f.conversation.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::TenantMismatch { .. }));

    let err = f
        .service
        .advance_lead_stage(&other, &lead.id, "contacted", &StageChange::default())
        .unwrap_err();
    assert!(matches!(err, CoreError::TenantMismatch { .. }));

    let err = f
        .service
        .record_message(
            &other,
            &f.conversation.id,
            &NewMessage::text(SenderType::Customer, "hi", t0()),
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::TenantMismatch { .. }));

    let lead = f.service.get_lead(&f.ctx, &lead.id).unwrap();
    assert_eq!(lead.current_stage, LeadStage::New);
}

#[test]
fn test_duplicate_keys_are_rejected() {
    let f = setup();

    let err = f
        .service
        .create_client(
            &f.ctx,
            &NewClient {
                platform_user_id: "+15550100".to_string(),
                platform_type: PlatformType::Whatsapp,
                display_name: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::UniquenessViolation(_)));

    // Same user on another platform is a different client
    f.service
        .create_client(
            &f.ctx,
            &NewClient {
                platform_user_id: "+15550100".to_string(),
                platform_type: PlatformType::Sms,
                display_name: None,
            },
        )
        .unwrap();

    let err = f
        .service
        .create_business(&NewBusiness {
            name: "Second Bakery".to_string(),
            owner_email: "owner@bakery.example".to_string(),
            owner_id: None,
            primary_language: "en".to_string(),
            subscription_plan: "starter".to_string(),
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::UniquenessViolation(_)));

    let err = f
        .service
        .create_platform_source(
            &f.ctx,
            &NewPlatformSource {
                platform_type: PlatformType::Whatsapp,
                name: "Main line".to_string(),
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::UniquenessViolation(_)));
}

#[test]
fn test_same_content_key_in_two_tenants() {
    let f = setup();
    let other = business(&f.service, "owner@florist.example");
    let a = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "Yes, citywide."))
        .unwrap();
    let b = f
        .service
        .upsert_content(&other, &faq("Do you deliver?", "Only on weekends."))
        .unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(b.business_id, other.business_id());
}

// ============================================
// CONTENT AGGREGATES
// ============================================

#[test]
fn test_upsert_is_idempotent() {
    let f = setup();
    let first = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "Yes, within the city."))
        .unwrap();
    assert_eq!(first.character_count, 21);
    assert_eq!(first.word_count, 4);
    assert_eq!(first.completion_status, CompletionStatus::Incomplete);

    let again = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "Yes, within the city."))
        .unwrap();
    assert_eq!(again.id, first.id);
    assert_eq!(again.version, first.version);
    assert_eq!(again.character_count, first.character_count);

    let changed = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "No."))
        .unwrap();
    assert_eq!(changed.id, first.id);
    assert_eq!(changed.version, first.version + 1);
    assert_eq!(changed.character_count, 3);
}

#[test]
fn test_empty_content_is_incomplete() {
    let f = setup();
    let entry = f
        .service
        .upsert_content(
            &f.ctx,
            &ContentUpsert {
                kind: ContentKind::ContextSection,
                content_key: "opening_hours".to_string(),
                language_code: "en".to_string(),
                content: String::new(),
                bounds: Some(CharBounds::new(Some(10), Some(200)).unwrap()),
            },
        )
        .unwrap();
    assert_eq!(entry.completion_status, CompletionStatus::Incomplete);
    assert_eq!(entry.character_count, 0);
}

#[test]
fn test_configured_faq_bounds_apply() {
    let store = CrmStore::open_in_memory().unwrap();
    let service = CrmService::new(store, ManualClock::new(t0()))
        .with_faq_bounds(CharBounds::new(Some(10), Some(40)).unwrap());
    let f = setup_with(service);

    let short = f
        .service
        .upsert_content(&f.ctx, &faq("Parking?", "Yes."))
        .unwrap();
    assert_eq!(short.completion_status, CompletionStatus::Incomplete);

    let long = f
        .service
        .upsert_content(
            &f.ctx,
            &faq(
                "Allergens?",
                "Every item may contain nuts, gluten, dairy and eggs from shared equipment.",
            ),
        )
        .unwrap();
    assert_eq!(long.completion_status, CompletionStatus::NeedsReview);

    let fine = f
        .service
        .upsert_content(&f.ctx, &faq("Parking?", "Free parking behind the shop."))
        .unwrap();
    assert_eq!(fine.id, short.id);
    assert_eq!(fine.completion_status, CompletionStatus::Complete);
}

#[test]
fn test_template_response_uses_template_bounds() {
    let f = setup();
    let upsert = ContentUpsert {
        kind: ContentKind::TemplateResponse,
        content_key: "about_us".to_string(),
        language_code: "en".to_string(),
        content: "Family bakery since 1987.".to_string(),
        bounds: None,
    };
    let err = f.service.upsert_content(&f.ctx, &upsert).unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));

    f.service
        .create_section_template(&NewSectionTemplate {
            template_key: "about_us".to_string(),
            category: "basics".to_string(),
            bounds: CharBounds::new(Some(50), Some(500)).unwrap(),
            display_order: 1,
            is_required: true,
        })
        .unwrap();

    let entry = f.service.upsert_content(&f.ctx, &upsert).unwrap();
    assert_eq!(entry.bounds.min, Some(50));
    assert_eq!(entry.completion_status, CompletionStatus::Incomplete);
}

#[test]
fn test_success_rate_tracks_outcomes() {
    let f = setup();
    let entry = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "Yes."))
        .unwrap();

    let entry_after = f.service.record_outcome(&f.ctx, &entry.id, true).unwrap();
    assert_eq!(entry_after.success_rate, Some(100.0));

    let entry_after = f.service.record_outcome(&f.ctx, &entry.id, false).unwrap();
    assert_eq!(entry_after.usage_count, Some(2));
    assert_eq!(entry_after.success_rate, Some(50.0));

    let stored = f
        .service
        .get_content(&f.ctx, ContentKind::Faq, &entry.id)
        .unwrap();
    assert_eq!(stored.success_rate, Some(50.0));
    assert_eq!(stored.usage_count, Some(2));
}

#[test]
fn test_record_access_counts_hits() {
    let f = setup();
    let entry = f
        .service
        .upsert_content(&f.ctx, &faq("Do you deliver?", "Yes."))
        .unwrap();
    f.service.clock().advance(Duration::hours(1));
    f.service
        .record_access(&f.ctx, ContentKind::Faq, &entry.id)
        .unwrap();
    let entry = f
        .service
        .record_access(&f.ctx, ContentKind::Faq, &entry.id)
        .unwrap();
    assert_eq!(entry.access_count, 2);
    assert_eq!(entry.last_accessed, Some(t0() + Duration::hours(1)));
    assert_eq!(entry.updated_at, t0() + Duration::hours(1));
    let stored = f
        .service
        .get_content(&f.ctx, ContentKind::Faq, &entry.id)
        .unwrap();
    assert_eq!(stored.updated_at, t0() + Duration::hours(1));
}

#[test]
fn test_outcomes_only_for_faqs() {
    let f = setup();
    let section = f
        .service
        .upsert_content(
            &f.ctx,
            &ContentUpsert {
                kind: ContentKind::ContextSection,
                content_key: "story".to_string(),
                language_code: "en".to_string(),
                content: "We bake at dawn.".to_string(),
                bounds: None,
            },
        )
        .unwrap();
    let err = f
        .service
        .record_outcome(&f.ctx, &section.id, true)
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}

// ============================================
// UNANSWERED QUESTIONS
// ============================================

#[test]
fn test_repeat_questions_merge() {
    let f = setup();
    let first = f
        .service
        .record_unanswered_question(
            &f.ctx,
            "Do you deliver on Sundays?",
            "en",
            &["faq".to_string()],
            Some(0.2),
        )
        .unwrap();
    f.service.clock().advance(Duration::days(1));
    let again = f
        .service
        .record_unanswered_question(
            &f.ctx,
            "  do you DELIVER   on sundays? ",
            "en",
            &["faq".to_string(), "context".to_string()],
            Some(0.35),
        )
        .unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.frequency, 2);
    assert_eq!(again.sources_searched, vec!["faq", "context"]);
    assert_eq!(again.confidence_scores, vec![0.2, 0.35]);
    assert_eq!(again.first_asked_at, t0());
    assert_eq!(again.last_asked_at, t0() + Duration::days(1));
}

#[test]
fn test_resolving_question_links_faq() {
    let f = setup();
    let question = f
        .service
        .record_unanswered_question(&f.ctx, "Gluten free options?", "en", &[], None)
        .unwrap();
    let answer = f
        .service
        .upsert_content(&f.ctx, &faq("Gluten free options?", "Two breads daily."))
        .unwrap();

    let resolved = f
        .service
        .set_question_status(
            &f.ctx,
            &question.id,
            QuestionStatus::Resolved,
            Some(answer.id.as_str()),
        )
        .unwrap();
    assert_eq!(resolved.status, QuestionStatus::Resolved);
    assert_eq!(resolved.resolved_faq_id.as_deref(), Some(answer.id.as_str()));
    assert_eq!(resolved.resolved_at, Some(t0()));

    let err = f
        .service
        .set_question_status(&f.ctx, &question.id, QuestionStatus::Ignored, Some(answer.id.as_str()))
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed(_)));
}

// ============================================
// RECONCILIATION
// ============================================

#[test]
fn test_reconcile_repairs_drifted_counters() {
    let f = setup();
    f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
    f.service
        .store()
        .bump_client_counters(&f.client.id, 3, -1)
        .unwrap();

    let repaired = f.service.reconcile_client_counters(&f.ctx).unwrap();
    assert_eq!(repaired.len(), 1);
    assert_eq!(repaired[0].total_conversations, 1);
    assert_eq!(repaired[0].total_leads, 1);

    assert!(f.service.reconcile_client_counters(&f.ctx).unwrap().is_empty());
}

// ============================================
// TEMPLATES AND SCENARIO TESTS
// ============================================

#[test]
fn test_template_translation_upsert() {
    let f = setup();
    let template = f
        .service
        .create_section_template(&NewSectionTemplate {
            template_key: "opening_hours".to_string(),
            category: "basics".to_string(),
            bounds: CharBounds::default(),
            display_order: 2,
            is_required: false,
        })
        .unwrap();

    let first = f
        .service
        .upsert_template_translation(&template.id, "es", "Horario", None)
        .unwrap();
    let second = f
        .service
        .upsert_template_translation(&template.id, "es", "Horario de apertura", Some("¿Cuándo abren?"))
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.title, "Horario de apertura");

    let err = f
        .service
        .create_section_template(&NewSectionTemplate {
            template_key: "opening_hours".to_string(),
            category: "basics".to_string(),
            bounds: CharBounds::default(),
            display_order: 3,
            is_required: false,
        })
        .unwrap_err();
    assert!(matches!(err, CoreError::UniquenessViolation(_)));
}

#[test]
fn test_scenario_session_lifecycle() {
    let f = setup();
    let session = f
        .service
        .start_test_session(&f.ctx, "delivery questions", "en")
        .unwrap();
    let m1 = f
        .service
        .add_test_message(&f.ctx, &session.id, SenderType::Customer, "Do you deliver?")
        .unwrap();
    let m2 = f
        .service
        .add_test_message(&f.ctx, &session.id, SenderType::Bot, "Yes, citywide.")
        .unwrap();
    assert_eq!((m1.sequence, m2.sequence), (1, 2));

    let done = f.service.complete_test_session(&f.ctx, &session.id).unwrap();
    assert_eq!(done.status, TestSessionStatus::Completed);
    assert_eq!(done.message_count, 2);

    let err = f
        .service
        .add_test_message(&f.ctx, &session.id, SenderType::Customer, "Hello?")
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition(_)));

    let transcript = f.service.test_transcript(&f.ctx, &session.id).unwrap();
    assert_eq!(transcript.len(), 2);

    // Scenario runs never touch real conversation counters
    let client = f.service.store().get_client(&f.client.id).unwrap().unwrap();
    assert_eq!(client.total_conversations, 1);
}

// ============================================
// ON-DISK STORE
// ============================================

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("crm.db");

    let (ctx, lead_id) = {
        let store = CrmStore::open(&path).unwrap();
        let f = setup_with(CrmService::new(store, ManualClock::new(t0())));
        let lead = f.service.create_lead(&f.ctx, &new_lead(&f)).unwrap();
        f.service
            .advance_lead_stage(&f.ctx, &lead.id, "contacted", &StageChange::default())
            .unwrap();
        (f.ctx, lead.id)
    };

    let store = CrmStore::open(&path).unwrap();
    let service = CrmService::new(store, ManualClock::new(t0()));
    let lead = service.get_lead(&ctx, &lead_id).unwrap();
    assert_eq!(lead.current_stage, LeadStage::Contacted);
    assert_eq!(service.lead_history(&ctx, &lead_id).unwrap().len(), 1);
}
