// src/models/automation.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::crm::TicketPriority;
use crate::models::omnibridge::{ChannelType, InboundMessage, Message, MessagePriority};

// --- ENUMS ---

/// Como os gatilhos de uma regra são combinados.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "condition_logic", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConditionLogic {
    And,
    #[default]
    Or,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeywordOperator {
    And,
    #[default]
    Or,
}

// --- GATILHOS ---
// Cada tipo carrega sua própria configuração tipada: {"type": "...", "config": {...}}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "config", rename_all = "snake_case")]
pub enum Trigger {
    Keyword(KeywordTrigger),
    SenderPattern(SenderPatternTrigger),
    Priority(PriorityTrigger),
    TimeWindow(TimeWindowTrigger),
    ContentRegex(ContentRegexTrigger),
    Channel(ChannelTrigger),
}

impl Trigger {
    pub fn type_name(&self) -> &'static str {
        match self {
            Trigger::Keyword(_) => "keyword",
            Trigger::SenderPattern(_) => "sender_pattern",
            Trigger::Priority(_) => "priority",
            Trigger::TimeWindow(_) => "time_window",
            Trigger::ContentRegex(_) => "content_regex",
            Trigger::Channel(_) => "channel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeywordTrigger {
    #[schema(example = json!(["ajuda", "suporte"]))]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub operator: KeywordOperator,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SenderPatternTrigger {
    /// Glob com `*` e `?` (ex: `*@empresa.com.br`)
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriorityTrigger {
    pub priorities: Vec<MessagePriority>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindowTrigger {
    #[schema(example = "18:00")]
    pub start: String,
    #[schema(example = "08:00")]
    pub end: String,
    /// 0 = domingo ... 6 = sábado
    pub days: Option<Vec<u8>>,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentRegexTrigger {
    pub pattern: String,
    #[serde(default = "default_true")]
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTrigger {
    pub channels: Vec<ChannelType>,
}

fn default_true() -> bool {
    true
}

// --- AÇÕES ---
// {"type": "...", "params": {...}, "order": 1}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub order: i32,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl Action {
    pub fn new(order: i32, kind: ActionKind) -> Self {
        Self { order, kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
pub enum ActionKind {
    AutoReply(AutoReplyParams),
    Forward(ForwardParams),
    CreateTicket(CreateTicketParams),
    Notify(NotifyParams),
    AddTags(AddTagsParams),
    AssignAgent(AssignAgentParams),
    Escalate(EscalateParams),
    Archive(ArchiveParams),
    MarkPriority(MarkPriorityParams),
    AiResponse(AiResponseParams),
}

impl ActionKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ActionKind::AutoReply(_) => "auto_reply",
            ActionKind::Forward(_) => "forward",
            ActionKind::CreateTicket(_) => "create_ticket",
            ActionKind::Notify(_) => "notify",
            ActionKind::AddTags(_) => "add_tags",
            ActionKind::AssignAgent(_) => "assign_agent",
            ActionKind::Escalate(_) => "escalate",
            ActionKind::Archive(_) => "archive",
            ActionKind::MarkPriority(_) => "mark_priority",
            ActionKind::AiResponse(_) => "ai_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoReplyParams {
    #[schema(example = "Olá {{senderName}}, recebemos sua mensagem!")]
    pub message: String,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForwardParams {
    pub to: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketParams {
    pub subject: Option<String>,
    pub priority: Option<TicketPriority>,
    pub assign_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyParams {
    pub recipients: Vec<String>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTagsParams {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignAgentParams {
    pub agent_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EscalateParams {
    pub to: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveParams {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPriorityParams {
    pub priority: MessagePriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AiResponseParams {
    #[schema(example = "friendly")]
    pub tone: String,
    #[schema(example = "pt")]
    pub language: String,
    pub template_id: Option<Uuid>,
}

// --- REGRA ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_executions: i64,
    pub successful_executions: i64,
    pub failed_executions: i64,
    pub last_executed: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleMetadata {
    pub created_by: Option<Uuid>,
    pub tags: Vec<String>,
    pub version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    /// Maior prioridade é avaliada primeiro
    pub priority: i32,
    pub condition_logic: ConditionLogic,
    pub stop_on_match: bool,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<Action>,
    pub stats: ExecutionStats,
    pub metadata: RuleMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAutomationRule {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Resposta automática para suporte")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub priority: Option<i32>,
    #[serde(default)]
    pub condition_logic: ConditionLogic,
    #[serde(default)]
    pub stop_on_match: bool,
    pub triggers: Vec<Trigger>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAutomationRule {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub condition_logic: Option<ConditionLogic>,
    pub stop_on_match: Option<bool>,
    pub triggers: Option<Vec<Trigger>>,
    pub actions: Option<Vec<Action>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RuleFilters {
    pub enabled: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestRuleRequest {
    pub message: InboundMessage,
}

// --- RELATÓRIOS DE EXECUÇÃO ---

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResult {
    pub index: usize,
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestResult {
    pub rule_id: Uuid,
    pub matched: bool,
    pub condition_logic: ConditionLogic,
    pub triggers: Vec<TriggerResult>,
    /// Ações que seriam executadas, já ordenadas
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub order: i32,
    #[serde(rename = "type")]
    pub action_type: String,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleExecution {
    pub rule_id: Uuid,
    pub rule_name: String,
    pub success: bool,
    pub actions: Vec<ActionOutcome>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub message_id: Uuid,
    pub evaluated_rules: usize,
    pub matched_rules: Vec<RuleExecution>,
}

/// Resposta de `POST /messages/process`: a mensagem já gravada e o relatório.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedMessage {
    pub message: Message,
    pub evaluation: EvaluationReport,
}
