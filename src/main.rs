use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bizcrm::cli::{business, content, conversation, lead, maintenance, tenant, Service};
use bizcrm::clock::SystemClock;
use bizcrm::config::Config;
use bizcrm::model::{
    CharBounds, ContentKind, MessageType, NewLead, NewSectionTemplate, PlatformType,
    ProgressionType, QuestionStatus, RelationshipStatus, SenderType, StageChange,
};
use bizcrm::service::CrmService;
use bizcrm::store::CrmStore;

#[derive(Parser)]
#[command(name = "bizcrm")]
#[command(about = "Multi-tenant CRM core: leads, conversations and business content")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "bizcrm.yaml")]
    config: String,

    /// Business ID the command acts on behalf of
    #[arg(short, long, global = true)]
    business: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Business signup and profile
    Business {
        #[command(subcommand)]
        command: BusinessCommands,
    },

    /// Clients of the current business
    Client {
        #[command(subcommand)]
        command: ClientCommands,
    },

    /// Platform sources of the current business
    Source {
        #[command(subcommand)]
        command: SourceCommands,
    },

    /// Conversation lifecycle
    Conversation {
        #[command(subcommand)]
        command: ConversationCommands,
    },

    /// Lead funnel
    Lead {
        #[command(subcommand)]
        command: LeadCommands,
    },

    /// FAQ items, context sections and template responses
    Content {
        #[command(subcommand)]
        command: ContentCommands,
    },

    /// Questions no content could answer
    Question {
        #[command(subcommand)]
        command: QuestionCommands,
    },

    /// Global section templates
    Template {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// Scenario test sessions
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommands,
    },

    /// Recompute client conversation and lead counters
    Reconcile,

    /// Pause active conversations with no recent activity
    Sweep {
        /// Idle minutes before pausing (defaults to config)
        #[arg(long)]
        timeout_minutes: Option<i64>,
    },
}

#[derive(Subcommand)]
enum BusinessCommands {
    /// Create a new business
    Create {
        /// Business name
        name: String,
        /// Owner email address
        #[arg(long)]
        owner_email: String,
        /// External owner identifier
        #[arg(long)]
        owner_id: Option<String>,
        /// Primary language code
        #[arg(long, default_value = "en")]
        language: String,
        /// Subscription plan
        #[arg(long, default_value = "starter")]
        plan: String,
    },
    /// Show the current business
    Show,
}

#[derive(Subcommand)]
enum ClientCommands {
    /// Register a client
    Create {
        /// User ID on the platform
        platform_user_id: String,
        /// Platform type (whatsapp, instagram, ...)
        #[arg(short, long)]
        platform: PlatformType,
        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Show a client
    Show { client: String },
    /// Update relationship status and scores
    Update {
        client: String,
        #[arg(long)]
        status: Option<RelationshipStatus>,
        #[arg(long)]
        engagement: Option<f64>,
        #[arg(long)]
        lifetime_value: Option<f64>,
    },
}

#[derive(Subcommand)]
enum SourceCommands {
    /// Register a platform source
    Create {
        /// Source name
        name: String,
        /// Platform type
        #[arg(short, long)]
        platform: PlatformType,
    },
}

#[derive(Subcommand)]
enum ConversationCommands {
    /// Open a conversation for a client
    Open {
        #[arg(long)]
        client: String,
        #[arg(long)]
        source: String,
    },
    /// Show a conversation
    Show { conversation: String },
    /// Record an inbound or outbound message
    Message {
        conversation: String,
        /// Message content
        content: String,
        #[arg(short, long, default_value = "customer")]
        sender: SenderType,
        #[arg(long = "type", default_value = "text")]
        message_type: MessageType,
        /// Message ID on the platform
        #[arg(long)]
        platform_id: Option<String>,
        /// Message timestamp (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    /// List messages in order
    Messages { conversation: String },
    /// Hand the conversation to a human
    Escalate {
        conversation: String,
        #[arg(short, long)]
        reason: String,
    },
    /// Pause the bot
    Pause { conversation: String },
    /// Resume a paused or escalated conversation
    Resume { conversation: String },
    /// Close the conversation
    Close { conversation: String },
    /// Re-open a closed conversation
    Reopen { conversation: String },
    /// Set lead and sentiment scores
    Score {
        conversation: String,
        #[arg(long)]
        lead: Option<f64>,
        #[arg(long, allow_hyphen_values = true)]
        sentiment: Option<f64>,
    },
}

#[derive(Subcommand)]
enum LeadCommands {
    /// Create a lead from a conversation
    Create {
        #[arg(long)]
        client: String,
        #[arg(long)]
        conversation: String,
        #[arg(long, default_value_t = 0)]
        qualification: i64,
        #[arg(long, default_value_t = 0)]
        interest: i64,
        #[arg(long, default_value_t = 0)]
        engagement: i64,
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        value: Option<f64>,
    },
    /// Show a lead
    Show { lead: String },
    /// Move a lead to another stage
    Advance {
        lead: String,
        /// Target stage (contacted, qualified, proposal, ...)
        stage: String,
        #[arg(long, default_value = "manual")]
        progression: ProgressionType,
        #[arg(long)]
        confidence: Option<f64>,
        /// Qualifying factor (repeatable)
        #[arg(long = "qualifying")]
        qualifying: Vec<String>,
        /// Disqualifying factor (repeatable)
        #[arg(long = "disqualifying")]
        disqualifying: Vec<String>,
        #[arg(long)]
        trigger: Option<String>,
        #[arg(long)]
        by: Option<String>,
    },
    /// Show stage history
    History { lead: String },
}

#[derive(Subcommand)]
enum ContentCommands {
    /// Create or replace a content entry
    Upsert {
        /// faq, context_section or template_response
        #[arg(short, long)]
        kind: ContentKind,
        /// FAQ question, section key or template key
        #[arg(long)]
        key: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        content: String,
        #[arg(long)]
        min: Option<i64>,
        #[arg(long)]
        max: Option<i64>,
    },
    /// Show a content entry
    Show {
        #[arg(short, long)]
        kind: ContentKind,
        id: String,
    },
    /// Record that retrieval surfaced an entry
    Access {
        #[arg(short, long)]
        kind: ContentKind,
        id: String,
    },
    /// Record whether an FAQ answer helped
    Outcome {
        faq: String,
        #[arg(long, conflicts_with = "unhelpful")]
        helpful: bool,
        #[arg(long)]
        unhelpful: bool,
    },
}

#[derive(Subcommand)]
enum QuestionCommands {
    /// Log a question nothing could answer
    Record {
        question: String,
        #[arg(short, long, default_value = "en")]
        language: String,
        /// Source searched (repeatable)
        #[arg(long = "searched")]
        searched: Vec<String>,
        #[arg(long)]
        confidence: Option<f64>,
    },
    /// Change the status of a logged question
    Status {
        question: String,
        status: QuestionStatus,
        /// FAQ that now answers the question
        #[arg(long)]
        faq: Option<String>,
    },
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// Create a section template
    Create {
        key: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        min: Option<i64>,
        #[arg(long)]
        max: Option<i64>,
        #[arg(long, default_value_t = 0)]
        order: i64,
        #[arg(long)]
        required: bool,
    },
    /// Add or replace a translation
    Translate {
        template: String,
        #[arg(short, long)]
        language: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[derive(Subcommand)]
enum ScenarioCommands {
    /// Start a test session
    Start {
        name: String,
        #[arg(short, long, default_value = "en")]
        language: String,
    },
    /// Add a message to a running session
    Say {
        session: String,
        content: String,
        #[arg(short, long, default_value = "customer")]
        sender: SenderType,
    },
    /// Mark a session completed
    Complete { session: String },
    /// Print the session transcript
    Transcript { session: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load(&cli.config)?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Initialize store
    let store = CrmStore::open(&config.database_path())?;
    let service: Service =
        CrmService::new(store, SystemClock).with_faq_bounds(config.faq_bounds()?);

    let business_id = cli.business.as_deref();

    match cli.command {
        Commands::Business { command } => match command {
            BusinessCommands::Create {
                name,
                owner_email,
                owner_id,
                language,
                plan,
            } => business::create(&service, name, owner_email, owner_id, language, plan)?,
            BusinessCommands::Show => business::show(&service, &tenant(business_id)?)?,
        },
        Commands::Client { command } => {
            let ctx = tenant(business_id)?;
            match command {
                ClientCommands::Create {
                    platform_user_id,
                    platform,
                    name,
                } => business::add_client(&service, &ctx, platform_user_id, platform, name)?,
                ClientCommands::Show { client } => business::show_client(&service, &ctx, &client)?,
                ClientCommands::Update {
                    client,
                    status,
                    engagement,
                    lifetime_value,
                } => business::update_client(
                    &service,
                    &ctx,
                    &client,
                    status,
                    engagement,
                    lifetime_value,
                )?,
            }
        }
        Commands::Source { command } => {
            let ctx = tenant(business_id)?;
            match command {
                SourceCommands::Create { name, platform } => {
                    business::add_source(&service, &ctx, platform, name)?
                }
            }
        }
        Commands::Conversation { command } => {
            let ctx = tenant(business_id)?;
            match command {
                ConversationCommands::Open { client, source } => {
                    conversation::open(&service, &ctx, client, source)?
                }
                ConversationCommands::Show { conversation: id } => {
                    conversation::show(&service, &ctx, &id)?
                }
                ConversationCommands::Message {
                    conversation: id,
                    content,
                    sender,
                    message_type,
                    platform_id,
                    at,
                } => conversation::message(
                    &service,
                    &ctx,
                    &id,
                    sender,
                    content,
                    message_type,
                    platform_id,
                    at,
                )?,
                ConversationCommands::Messages { conversation: id } => {
                    conversation::messages(&service, &ctx, &id)?
                }
                ConversationCommands::Escalate {
                    conversation: id,
                    reason,
                } => conversation::escalate(&service, &ctx, &id, &reason)?,
                ConversationCommands::Pause { conversation: id } => {
                    conversation::pause(&service, &ctx, &id)?
                }
                ConversationCommands::Resume { conversation: id } => {
                    conversation::resume(&service, &ctx, &id)?
                }
                ConversationCommands::Close { conversation: id } => {
                    conversation::close(&service, &ctx, &id)?
                }
                ConversationCommands::Reopen { conversation: id } => {
                    conversation::reopen(&service, &ctx, &id)?
                }
                ConversationCommands::Score {
                    conversation: id,
                    lead,
                    sentiment,
                } => conversation::score(&service, &ctx, &id, lead, sentiment)?,
            }
        }
        Commands::Lead { command } => {
            let ctx = tenant(business_id)?;
            match command {
                LeadCommands::Create {
                    client,
                    conversation,
                    qualification,
                    interest,
                    engagement,
                    source,
                    value,
                } => lead::create(
                    &service,
                    &ctx,
                    NewLead {
                        client_id: client,
                        conversation_id: conversation,
                        qualification_score: qualification,
                        interest_level: interest,
                        engagement_level: engagement,
                        lead_source: source,
                        estimated_value: value,
                    },
                )?,
                LeadCommands::Show { lead: id } => lead::show(&service, &ctx, &id)?,
                LeadCommands::Advance {
                    lead: id,
                    stage,
                    progression,
                    confidence,
                    qualifying,
                    disqualifying,
                    trigger,
                    by,
                } => {
                    let change = StageChange {
                        progression_type: progression,
                        confidence_score: confidence,
                        qualifying_factors: qualifying,
                        disqualifying_factors: disqualifying,
                        trigger_event: trigger,
                        changed_by: by,
                    };
                    lead::advance(&service, &ctx, &id, &stage, change)?
                }
                LeadCommands::History { lead: id } => lead::history(&service, &ctx, &id)?,
            }
        }
        Commands::Content { command } => {
            let ctx = tenant(business_id)?;
            match command {
                ContentCommands::Upsert {
                    kind,
                    key,
                    language,
                    content: text,
                    min,
                    max,
                } => content::upsert(&service, &ctx, kind, key, language, text, min, max)?,
                ContentCommands::Show { kind, id } => content::show(&service, &ctx, kind, &id)?,
                ContentCommands::Access { kind, id } => {
                    content::access(&service, &ctx, kind, &id)?
                }
                ContentCommands::Outcome {
                    faq,
                    helpful,
                    unhelpful,
                } => {
                    if helpful == unhelpful {
                        anyhow::bail!("pass exactly one of --helpful or --unhelpful");
                    }
                    content::outcome(&service, &ctx, &faq, helpful)?
                }
            }
        }
        Commands::Question { command } => {
            let ctx = tenant(business_id)?;
            match command {
                QuestionCommands::Record {
                    question,
                    language,
                    searched,
                    confidence,
                } => content::record_question(
                    &service, &ctx, &question, &language, &searched, confidence,
                )?,
                QuestionCommands::Status {
                    question,
                    status,
                    faq,
                } => content::question_status(&service, &ctx, &question, status, faq.as_deref())?,
            }
        }
        Commands::Template { command } => match command {
            TemplateCommands::Create {
                key,
                category,
                min,
                max,
                order,
                required,
            } => content::create_template(
                &service,
                NewSectionTemplate {
                    template_key: key,
                    category,
                    bounds: CharBounds::new(min, max)?,
                    display_order: order,
                    is_required: required,
                },
            )?,
            TemplateCommands::Translate {
                template,
                language,
                title,
                prompt,
            } => content::translate_template(
                &service,
                &template,
                &language,
                &title,
                prompt.as_deref(),
            )?,
        },
        Commands::Scenario { command } => {
            let ctx = tenant(business_id)?;
            match command {
                ScenarioCommands::Start { name, language } => {
                    maintenance::start_scenario(&service, &ctx, &name, &language)?
                }
                ScenarioCommands::Say {
                    session,
                    content: text,
                    sender,
                } => maintenance::say(&service, &ctx, &session, sender, &text)?,
                ScenarioCommands::Complete { session } => {
                    maintenance::complete_scenario(&service, &ctx, &session)?
                }
                ScenarioCommands::Transcript { session } => {
                    maintenance::transcript(&service, &ctx, &session)?
                }
            }
        }
        Commands::Reconcile => maintenance::reconcile(&service, &tenant(business_id)?)?,
        Commands::Sweep { timeout_minutes } => {
            let timeout = match timeout_minutes {
                Some(minutes) => bizcrm::config::timeout_minutes("--timeout-minutes", minutes)?,
                None => config.inactivity_timeout()?,
            };
            maintenance::sweep(&service, &tenant(business_id)?, timeout)?
        }
    }

    Ok(())
}
