//! SQLite schema definition
//!
//! - Every tenant-scoped table carries `business_id`
//! - Mutable rows carry `version` for compare-and-swap updates
//! - History and message rows are append-only
//! - Composite UNIQUE constraints back the write-time uniqueness guard

pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- ============================================
-- TENANTS
-- ============================================

CREATE TABLE IF NOT EXISTS businesses (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner_email TEXT NOT NULL UNIQUE,
    owner_id TEXT UNIQUE,                   -- NULL allowed many times
    primary_language TEXT NOT NULL DEFAULT 'en',
    subscription_plan TEXT NOT NULL DEFAULT 'starter',
    subscription_status TEXT NOT NULL DEFAULT 'trial',  -- 'trial', 'active', 'past_due', 'cancelled'
    onboarding_completed BOOLEAN NOT NULL DEFAULT FALSE,
    onboarding_step INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS platform_sources (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    platform_type TEXT NOT NULL,            -- 'whatsapp', 'instagram', 'web', ...
    name TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at DATETIME NOT NULL,
    UNIQUE(business_id, platform_type, name),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

-- ============================================
-- CLIENTS
-- ============================================

CREATE TABLE IF NOT EXISTS clients (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    platform_user_id TEXT NOT NULL,
    platform_type TEXT NOT NULL,
    display_name TEXT,
    relationship_status TEXT NOT NULL DEFAULT 'new',
    engagement_score REAL NOT NULL DEFAULT 0 CHECK (engagement_score BETWEEN 0 AND 100),
    lifetime_value REAL NOT NULL DEFAULT 0 CHECK (lifetime_value >= 0),
    total_conversations INTEGER NOT NULL DEFAULT 0,
    total_leads INTEGER NOT NULL DEFAULT 0,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(business_id, platform_user_id, platform_type),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

-- ============================================
-- CONVERSATIONS & MESSAGES
-- ============================================

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    platform_source_id TEXT NOT NULL,
    current_state TEXT NOT NULL DEFAULT 'active',  -- 'active', 'paused', 'closed', 'escalated'
    pause_reason TEXT,                              -- 'manual', 'inactivity'
    is_bot_active BOOLEAN NOT NULL DEFAULT TRUE,
    requires_human BOOLEAN NOT NULL DEFAULT FALSE,
    human_takeover_reason TEXT,
    lead_score REAL NOT NULL DEFAULT 0 CHECK (lead_score BETWEEN 0 AND 100),
    sentiment_score REAL NOT NULL DEFAULT 0 CHECK (sentiment_score BETWEEN -1 AND 1),
    message_count INTEGER NOT NULL DEFAULT 0,
    last_activity DATETIME NOT NULL,
    closed_at DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE,
    FOREIGN KEY(client_id) REFERENCES clients(id) ON DELETE CASCADE,
    FOREIGN KEY(platform_source_id) REFERENCES platform_sources(id) ON DELETE CASCADE
);

-- Immutable: no updated_at
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL,
    business_id TEXT NOT NULL,
    sender_type TEXT NOT NULL,              -- 'customer', 'bot', 'agent', 'system'
    content TEXT NOT NULL,
    message_type TEXT NOT NULL DEFAULT 'text',
    platform_message_id TEXT,
    message_timestamp DATETIME NOT NULL,
    created_at DATETIME NOT NULL,
    FOREIGN KEY(conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

-- ============================================
-- LEADS
-- ============================================

CREATE TABLE IF NOT EXISTS leads (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    client_id TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    current_stage TEXT NOT NULL DEFAULT 'new',
    previous_stage TEXT,
    stage_entered_at DATETIME,
    stage_progression_count INTEGER NOT NULL DEFAULT 0,
    total_funnel_time INTEGER NOT NULL DEFAULT 0,   -- seconds
    qualification_score INTEGER NOT NULL DEFAULT 0 CHECK (qualification_score BETWEEN 0 AND 100),
    interest_level INTEGER NOT NULL DEFAULT 0 CHECK (interest_level BETWEEN 0 AND 10),
    engagement_level INTEGER NOT NULL DEFAULT 0 CHECK (engagement_level BETWEEN 0 AND 10),
    lead_source TEXT,
    estimated_value REAL CHECK (estimated_value >= 0),
    final_outcome TEXT,                     -- 'won', 'lost'
    outcome_date DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE,
    FOREIGN KEY(client_id) REFERENCES clients(id) ON DELETE CASCADE,
    FOREIGN KEY(conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
);

-- Append-only audit log, one row per stage change
CREATE TABLE IF NOT EXISTS lead_stage_history (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL,                   -- per-lead ordering, equals progression count
    lead_id TEXT NOT NULL,
    business_id TEXT NOT NULL,
    from_stage TEXT,
    to_stage TEXT NOT NULL,
    progression_type TEXT NOT NULL,         -- 'automatic', 'manual', 'system'
    confidence_score REAL CHECK (confidence_score BETWEEN 0 AND 1),
    qualifying_factors TEXT NOT NULL DEFAULT '[]',
    disqualifying_factors TEXT NOT NULL DEFAULT '[]',
    trigger_event TEXT,
    changed_by TEXT,
    time_in_previous_stage INTEGER NOT NULL DEFAULT 0 CHECK (time_in_previous_stage >= 0),
    created_at DATETIME NOT NULL,
    UNIQUE(lead_id, seq),
    FOREIGN KEY(lead_id) REFERENCES leads(id) ON DELETE CASCADE
);

-- ============================================
-- CONTENT
-- ============================================

CREATE TABLE IF NOT EXISTS faq_items (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    content_key TEXT NOT NULL,              -- the question
    language_code TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',       -- the answer
    character_count INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    completion_status TEXT NOT NULL DEFAULT 'not_started',
    character_min INTEGER,
    character_max INTEGER,
    search_hits INTEGER NOT NULL DEFAULT 0,
    last_accessed DATETIME,
    usage_count INTEGER NOT NULL DEFAULT 0,
    success_rate REAL NOT NULL DEFAULT 0 CHECK (success_rate BETWEEN 0 AND 100),
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(business_id, content_key, language_code),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS business_context_sections (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    content_key TEXT NOT NULL,              -- section key
    language_code TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    character_count INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    completion_status TEXT NOT NULL DEFAULT 'not_started',
    character_min INTEGER,
    character_max INTEGER,
    usage_count INTEGER NOT NULL DEFAULT 0,
    last_used DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(business_id, content_key, language_code),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS business_template_responses (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    content_key TEXT NOT NULL,              -- section_templates.template_key
    language_code TEXT NOT NULL,
    content TEXT NOT NULL DEFAULT '',
    character_count INTEGER NOT NULL DEFAULT 0,
    word_count INTEGER NOT NULL DEFAULT 0,
    completion_status TEXT NOT NULL DEFAULT 'not_started',
    character_min INTEGER,
    character_max INTEGER,
    usage_count INTEGER NOT NULL DEFAULT 0,
    last_used DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME NOT NULL,
    updated_at DATETIME NOT NULL,
    UNIQUE(business_id, content_key, language_code),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

-- ============================================
-- TEMPLATES (global)
-- ============================================

CREATE TABLE IF NOT EXISTS section_templates (
    id TEXT PRIMARY KEY,
    template_key TEXT NOT NULL UNIQUE,
    category TEXT NOT NULL,
    character_min INTEGER,
    character_max INTEGER,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_required BOOLEAN NOT NULL DEFAULT FALSE,
    created_at DATETIME NOT NULL
);

CREATE TABLE IF NOT EXISTS section_template_translations (
    id TEXT PRIMARY KEY,
    template_id TEXT NOT NULL,
    language_code TEXT NOT NULL,
    title TEXT NOT NULL,
    prompt TEXT,
    updated_at DATETIME NOT NULL,
    UNIQUE(template_id, language_code),
    FOREIGN KEY(template_id) REFERENCES section_templates(id) ON DELETE CASCADE
);

-- ============================================
-- UNANSWERED QUESTIONS
-- ============================================

CREATE TABLE IF NOT EXISTS unanswered_questions (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    question TEXT NOT NULL,
    question_hash TEXT NOT NULL,            -- sha256 of the normalized question
    language_code TEXT NOT NULL,
    frequency INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'pending',
    sources_searched TEXT NOT NULL DEFAULT '[]',
    confidence_scores TEXT NOT NULL DEFAULT '[]',
    resolved_faq_id TEXT,
    first_asked_at DATETIME NOT NULL,
    last_asked_at DATETIME NOT NULL,
    resolved_at DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    UNIQUE(business_id, question_hash),
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE,
    FOREIGN KEY(resolved_faq_id) REFERENCES faq_items(id) ON DELETE SET NULL
);

-- ============================================
-- SCENARIO TESTS
-- ============================================

CREATE TABLE IF NOT EXISTS test_sessions (
    id TEXT PRIMARY KEY,
    business_id TEXT NOT NULL,
    scenario_name TEXT NOT NULL,
    language_code TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'running',
    message_count INTEGER NOT NULL DEFAULT 0,
    started_at DATETIME NOT NULL,
    completed_at DATETIME,
    version INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY(business_id) REFERENCES businesses(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS test_messages (
    id TEXT PRIMARY KEY,
    test_session_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    sender_type TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at DATETIME NOT NULL,
    UNIQUE(test_session_id, sequence),
    FOREIGN KEY(test_session_id) REFERENCES test_sessions(id) ON DELETE CASCADE
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_clients_business ON clients(business_id);
CREATE INDEX IF NOT EXISTS idx_conversations_business_state ON conversations(business_id, current_state);
CREATE INDEX IF NOT EXISTS idx_conversations_client ON conversations(client_id);
CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, message_timestamp);
CREATE INDEX IF NOT EXISTS idx_leads_client ON leads(client_id);
CREATE INDEX IF NOT EXISTS idx_leads_stage ON leads(business_id, current_stage);
CREATE INDEX IF NOT EXISTS idx_history_lead ON lead_stage_history(lead_id, seq);
CREATE INDEX IF NOT EXISTS idx_questions_open ON unanswered_questions(business_id, status);
"#;
