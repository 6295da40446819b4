// src/services/rule_engine.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::AutomationRuleRepository,
    models::{
        automation::{
            Action, ActionKind, ActionOutcome, AutomationRule, CreateTicketParams, EvaluationReport,
            RuleExecution,
        },
        omnibridge::{Message, MessagePriority, MessageStatus},
        template::{substitute_all, RenderedTemplate},
    },
    services::rule_matcher::rule_matches,
};

/// Efeitos externos das ações. As ações locais (tags, prioridade, arquivar...)
/// alteram apenas a cópia de trabalho da mensagem.
#[async_trait]
pub trait ActionEffects: Send + Sync {
    async fn reply(&self, message: &Message, content: &str) -> Result<(), AppError>;
    async fn forward(&self, message: &Message, to: &str, note: Option<&str>) -> Result<(), AppError>;
    async fn create_ticket(&self, message: &Message, params: &CreateTicketParams) -> Result<Uuid, AppError>;
    async fn notify(
        &self,
        message: &Message,
        rule_id: Uuid,
        recipients: &[String],
        title: &str,
        body: &str,
    ) -> Result<(), AppError>;
    async fn render_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        values: &BTreeMap<String, String>,
    ) -> Result<RenderedTemplate, AppError>;
    async fn generate_response(
        &self,
        message: &Message,
        tone: &str,
        language: &str,
        template: Option<&str>,
    ) -> Result<String, AppError>;
}

pub const ESCALATED_TAG: &str = "escalated";

fn escalated(priority: MessagePriority) -> MessagePriority {
    match priority {
        MessagePriority::Low => MessagePriority::Normal,
        MessagePriority::Normal => MessagePriority::High,
        MessagePriority::High | MessagePriority::Urgent => MessagePriority::Urgent,
    }
}

fn add_tag(message: &mut Message, tag: &str) {
    let tag = tag.trim();
    if !tag.is_empty() && !message.tags.iter().any(|t| t == tag) {
        message.tags.push(tag.to_string());
    }
}

#[derive(Clone)]
pub struct RuleEngine {
    rules: Arc<dyn AutomationRuleRepository>,
    effects: Arc<dyn ActionEffects>,
}

impl RuleEngine {
    pub fn new(rules: Arc<dyn AutomationRuleRepository>, effects: Arc<dyn ActionEffects>) -> Self {
        Self { rules, effects }
    }

    /// Avalia as regras habilitadas do tenant sobre a mensagem.
    /// A mensagem é alterada em memória; quem chama decide quando gravar.
    pub async fn evaluate(&self, message: &mut Message, now: DateTime<Utc>) -> Result<EvaluationReport, AppError> {
        let rules = self.rules.list_enabled(message.tenant_id).await?;

        let mut evaluated_rules = 0;
        let mut matched_rules = Vec::new();

        for rule in rules.iter().filter(|r| r.enabled) {
            evaluated_rules += 1;
            if !rule_matches(rule, message) {
                continue;
            }

            let execution = self.execute_rule(rule, message).await;
            if let Err(e) = self
                .rules
                .record_execution(rule.tenant_id, rule.id, execution.success, now)
                .await
            {
                tracing::warn!("Falha ao registrar execução da regra {}: {}", rule.id, e);
            }

            let stop = execution.success && rule.stop_on_match;
            matched_rules.push(execution);
            if stop {
                break;
            }
        }

        Ok(EvaluationReport {
            message_id: message.id,
            evaluated_rules,
            matched_rules,
        })
    }

    async fn execute_rule(&self, rule: &AutomationRule, message: &mut Message) -> RuleExecution {
        let mut actions: Vec<&Action> = rule.actions.iter().collect();
        actions.sort_by_key(|a| a.order);

        let mut outcomes = Vec::with_capacity(actions.len());
        let mut success = true;
        for action in actions {
            let result = self.execute_action(rule, action, message).await;
            let error = result.err().map(|e| e.to_string());
            if let Some(err) = &error {
                tracing::warn!(
                    "Ação {} da regra \"{}\" falhou: {}",
                    action.kind.type_name(),
                    rule.name,
                    err
                );
            }
            let failed = error.is_some();
            outcomes.push(ActionOutcome {
                order: action.order,
                action_type: action.kind.type_name().to_string(),
                success: !failed,
                error,
            });
            // A primeira falha interrompe as ações restantes desta regra
            if failed {
                success = false;
                break;
            }
        }

        tracing::info!(
            "Regra \"{}\" executada na mensagem {} (sucesso: {})",
            rule.name,
            message.id,
            success
        );
        RuleExecution {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            success,
            actions: outcomes,
        }
    }

    async fn execute_action(&self, rule: &AutomationRule, action: &Action, message: &mut Message) -> Result<(), AppError> {
        match &action.kind {
            ActionKind::AutoReply(params) => {
                let values = message.template_values();
                let content = match params.template_id {
                    Some(template_id) => {
                        self.effects
                            .render_template(message.tenant_id, template_id, &values)
                            .await?
                            .content
                    }
                    None => substitute_all(&params.message, &values),
                };
                self.effects.reply(message, &content).await?;
                message.status = MessageStatus::Replied;
            }
            ActionKind::Forward(params) => {
                self.effects
                    .forward(message, &params.to, params.note.as_deref())
                    .await?;
                message.status = MessageStatus::Forwarded;
            }
            ActionKind::CreateTicket(params) => {
                let ticket_id = self.effects.create_ticket(message, params).await?;
                message.ticket_id = Some(ticket_id);
            }
            ActionKind::Notify(params) => {
                let body = substitute_all(&params.message, &message.template_values());
                let title = format!("Regra \"{}\"", rule.name);
                self.effects
                    .notify(message, rule.id, &params.recipients, &title, &body)
                    .await?;
            }
            ActionKind::AddTags(params) => {
                for tag in &params.tags {
                    add_tag(message, tag);
                }
            }
            ActionKind::AssignAgent(params) => {
                message.assigned_to = Some(params.agent_id.clone());
            }
            ActionKind::Escalate(params) => {
                message.priority = escalated(message.priority);
                add_tag(message, ESCALATED_TAG);
                let body = params
                    .reason
                    .clone()
                    .unwrap_or_else(|| format!("Mensagem de {} escalada pela regra \"{}\".", message.from_address, rule.name));
                self.effects
                    .notify(message, rule.id, std::slice::from_ref(&params.to), "Mensagem escalada", &body)
                    .await?;
            }
            ActionKind::Archive(_) => {
                message.status = MessageStatus::Archived;
            }
            ActionKind::MarkPriority(params) => {
                message.priority = params.priority;
            }
            ActionKind::AiResponse(params) => {
                let template = match params.template_id {
                    Some(template_id) => Some(
                        self.effects
                            .render_template(message.tenant_id, template_id, &message.template_values())
                            .await?
                            .content,
                    ),
                    None => None,
                };
                let text = self
                    .effects
                    .generate_response(message, &params.tone, &params.language, template.as_deref())
                    .await?;
                self.effects.reply(message, &text).await?;
                message.status = MessageStatus::Replied;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAutomationRuleRepository;
    use crate::models::automation::{
        AddTagsParams, AssignAgentParams, AutoReplyParams, ConditionLogic, EscalateParams,
        ExecutionStats, ForwardParams, KeywordOperator, KeywordTrigger, MarkPriorityParams,
        RuleMetadata, Trigger,
    };
    use crate::models::omnibridge::{ChannelType, MessageDirection};
    use chrono::Duration;
    use std::sync::Mutex;

    /// Registra as chamadas; `forward` sempre falha.
    #[derive(Default)]
    struct RecordingEffects {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingEffects {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
        fn push(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ActionEffects for RecordingEffects {
        async fn reply(&self, _message: &Message, content: &str) -> Result<(), AppError> {
            self.push(format!("reply:{content}"));
            Ok(())
        }
        async fn forward(&self, _message: &Message, to: &str, _note: Option<&str>) -> Result<(), AppError> {
            self.push(format!("forward:{to}"));
            Err(AppError::BusinessRule("destino indisponível".into()))
        }
        async fn create_ticket(&self, _message: &Message, _params: &CreateTicketParams) -> Result<Uuid, AppError> {
            self.push("ticket".into());
            Ok(Uuid::nil())
        }
        async fn notify(
            &self,
            _message: &Message,
            _rule_id: Uuid,
            recipients: &[String],
            _title: &str,
            body: &str,
        ) -> Result<(), AppError> {
            self.push(format!("notify:{}:{body}", recipients.join(",")));
            Ok(())
        }
        async fn render_template(
            &self,
            _tenant_id: Uuid,
            _template_id: Uuid,
            _values: &BTreeMap<String, String>,
        ) -> Result<RenderedTemplate, AppError> {
            Ok(RenderedTemplate {
                subject: None,
                content: "do template".into(),
            })
        }
        async fn generate_response(
            &self,
            _message: &Message,
            tone: &str,
            language: &str,
            _template: Option<&str>,
        ) -> Result<String, AppError> {
            Ok(format!("{language}/{tone}"))
        }
    }

    struct Fixture {
        repo: Arc<InMemoryAutomationRuleRepository>,
        effects: Arc<RecordingEffects>,
        engine: RuleEngine,
        tenant: Uuid,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryAutomationRuleRepository::new());
        let effects = Arc::new(RecordingEffects::default());
        Fixture {
            engine: RuleEngine::new(repo.clone(), effects.clone()),
            repo,
            effects,
            tenant: Uuid::new_v4(),
        }
    }

    fn keyword(words: &[&str]) -> Trigger {
        Trigger::Keyword(KeywordTrigger {
            keywords: words.iter().map(|w| w.to_string()).collect(),
            operator: KeywordOperator::Or,
            case_sensitive: false,
        })
    }

    async fn rule(f: &Fixture, name: &str, priority: i32, triggers: Vec<Trigger>, actions: Vec<Action>) -> AutomationRule {
        let now = Utc::now();
        let r = AutomationRule {
            id: Uuid::new_v4(),
            tenant_id: f.tenant,
            name: name.into(),
            description: None,
            enabled: true,
            priority,
            condition_logic: ConditionLogic::Or,
            stop_on_match: false,
            triggers,
            actions,
            stats: ExecutionStats::default(),
            metadata: RuleMetadata {
                created_by: None,
                tags: vec![],
                version: 1,
            },
            created_at: now,
            updated_at: now,
        };
        f.repo.create(&r).await.unwrap()
    }

    fn message(f: &Fixture, content: &str) -> Message {
        let now = Utc::now();
        Message {
            id: Uuid::new_v4(),
            tenant_id: f.tenant,
            channel_id: None,
            channel_type: ChannelType::Email,
            direction: MessageDirection::Inbound,
            from_address: "ana@cliente.com".into(),
            from_name: Some("Ana".into()),
            to_address: None,
            subject: None,
            content: content.into(),
            priority: MessagePriority::Normal,
            status: MessageStatus::Unread,
            tags: vec![],
            is_starred: false,
            assigned_to: None,
            parent_id: None,
            ticket_id: None,
            metadata: serde_json::Value::Null,
            received_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn tags(order: i32, tags: &[&str]) -> Action {
        Action::new(
            order,
            ActionKind::AddTags(AddTagsParams {
                tags: tags.iter().map(|t| t.to_string()).collect(),
            }),
        )
    }

    #[tokio::test]
    async fn matching_rule_counts_once_and_other_rules_are_untouched() {
        let f = fixture();
        let help = rule(&f, "help", 1, vec![keyword(&["help", "support"])], vec![tags(1, &["suporte"])]).await;
        let other = rule(&f, "billing", 1, vec![keyword(&["fatura"])], vec![tags(1, &["financeiro"])]).await;

        let now = Utc::now() + Duration::seconds(5);
        let mut msg = message(&f, "I need help");
        let report = f.engine.evaluate(&mut msg, now).await.unwrap();

        assert_eq!(report.evaluated_rules, 2);
        assert_eq!(report.matched_rules.len(), 1);
        assert_eq!(msg.tags, vec!["suporte".to_string()]);

        let stats = f.repo.find_by_id(f.tenant, help.id).await.unwrap().unwrap().stats;
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.successful_executions, 1);
        assert_eq!(stats.last_executed, Some(now));

        let untouched = f.repo.find_by_id(f.tenant, other.id).await.unwrap().unwrap().stats;
        assert_eq!(untouched.total_executions, 0);
        assert_eq!(untouched.last_executed, None);
    }

    #[tokio::test]
    async fn failing_action_stops_the_rule_but_not_the_next_rule() {
        let f = fixture();
        let failing = rule(
            &f,
            "encaminhar",
            10,
            vec![keyword(&["help"])],
            vec![
                Action::new(
                    1,
                    ActionKind::Forward(ForwardParams {
                        to: "gerente@empresa.com".into(),
                        note: None,
                    }),
                ),
                tags(2, &["nunca"]),
            ],
        )
        .await;
        rule(
            &f,
            "atribuir",
            1,
            vec![keyword(&["help"])],
            vec![Action::new(
                1,
                ActionKind::AssignAgent(AssignAgentParams {
                    agent_id: "agente-7".into(),
                }),
            )],
        )
        .await;

        let mut msg = message(&f, "help");
        let report = f.engine.evaluate(&mut msg, Utc::now()).await.unwrap();

        assert_eq!(report.matched_rules.len(), 2);
        assert!(!report.matched_rules[0].success);
        assert_eq!(report.matched_rules[0].actions.len(), 1);
        assert!(report.matched_rules[1].success);
        assert!(msg.tags.is_empty());
        assert_eq!(msg.assigned_to.as_deref(), Some("agente-7"));

        let stats = f.repo.find_by_id(f.tenant, failing.id).await.unwrap().unwrap().stats;
        assert_eq!(stats.failed_executions, 1);
        assert_eq!(stats.successful_executions, 0);
    }

    #[tokio::test]
    async fn stop_on_match_halts_lower_priority_rules() {
        let f = fixture();
        let first = AutomationRule {
            stop_on_match: true,
            ..rule(&f, "primeira", 5, vec![keyword(&["help"])], vec![tags(1, &["a"])]).await
        };
        f.repo.update(&first).await.unwrap();
        rule(&f, "segunda", 1, vec![keyword(&["help"])], vec![tags(1, &["b"])]).await;

        let mut msg = message(&f, "help");
        let report = f.engine.evaluate(&mut msg, Utc::now()).await.unwrap();
        assert_eq!(report.matched_rules.len(), 1);
        assert_eq!(report.matched_rules[0].rule_name, "primeira");
        assert_eq!(msg.tags, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn actions_run_in_order_and_mutate_the_message() {
        let f = fixture();
        rule(
            &f,
            "completa",
            1,
            vec![keyword(&["help"])],
            vec![
                Action::new(
                    3,
                    ActionKind::AutoReply(AutoReplyParams {
                        message: "Olá {{senderName}}".into(),
                        template_id: None,
                    }),
                ),
                Action::new(
                    1,
                    ActionKind::MarkPriority(MarkPriorityParams {
                        priority: MessagePriority::High,
                    }),
                ),
                Action::new(
                    2,
                    ActionKind::Escalate(EscalateParams {
                        to: "supervisor".into(),
                        reason: Some("cliente VIP".into()),
                    }),
                ),
                Action::new(4, ActionKind::CreateTicket(CreateTicketParams {
                    subject: None,
                    priority: None,
                    assign_to: None,
                })),
            ],
        )
        .await;

        let mut msg = message(&f, "help");
        f.engine.evaluate(&mut msg, Utc::now()).await.unwrap();

        assert_eq!(msg.priority, MessagePriority::Urgent);
        assert_eq!(msg.tags, vec![ESCALATED_TAG.to_string()]);
        assert_eq!(msg.status, MessageStatus::Replied);
        assert_eq!(msg.ticket_id, Some(Uuid::nil()));
        assert_eq!(
            f.effects.calls(),
            vec![
                "notify:supervisor:cliente VIP".to_string(),
                "reply:Olá Ana".to_string(),
                "ticket".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn disabled_rules_are_ignored() {
        let f = fixture();
        let r = rule(&f, "desligada", 1, vec![keyword(&["help"])], vec![tags(1, &["x"])]).await;
        f.repo
            .update(&AutomationRule { enabled: false, ..r })
            .await
            .unwrap();

        let mut msg = message(&f, "help");
        let report = f.engine.evaluate(&mut msg, Utc::now()).await.unwrap();
        assert_eq!(report.evaluated_rules, 0);
        assert!(msg.tags.is_empty());
    }
}
