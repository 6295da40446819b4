// src/services/omnibridge_service.rs

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::{ChannelRepository, MessageRepository, NotificationRepository},
    models::{
        automation::ProcessedMessage,
        omnibridge::{
            Channel, CreateChannel, ForwardMessage, InboundMessage, Message,
            MessageDirection, MessageFilters, MessagePriority, MessageStatus, Notification,
            NotificationFilters, ReplyMessage, SendMessage,
        },
    },
    services::{dispatch::Dispatcher, rule_engine::RuleEngine, template_service::TemplateService},
};

// =========================================================================
//  CANAIS
// =========================================================================

#[derive(Clone)]
pub struct ChannelService {
    repo: Arc<dyn ChannelRepository>,
}

impl ChannelService {
    pub fn new(repo: Arc<dyn ChannelRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, tenant_id: Uuid, payload: CreateChannel) -> Result<Channel, AppError> {
        payload.validate()?;
        let now = Utc::now();
        let channel = Channel {
            id: Uuid::new_v4(),
            tenant_id,
            channel_type: payload.channel_type,
            name: payload.name.trim().to_string(),
            description: trim_opt(payload.description),
            is_enabled: payload.is_enabled,
            config: if payload.config.is_null() {
                Value::Object(Default::default())
            } else {
                payload.config
            },
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&channel).await?;
        tracing::info!(
            "Canal {} criado: {} ({})",
            created.channel_type.as_str(),
            created.name,
            created.id
        );
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Channel, AppError> {
        self.repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Canal não encontrado.".into()))
    }

    pub async fn list(&self, tenant_id: Uuid) -> Result<Vec<Channel>, AppError> {
        self.repo.list(tenant_id).await
    }

    pub async fn toggle(&self, tenant_id: Uuid, id: Uuid) -> Result<Channel, AppError> {
        let mut channel = self.find_by_id(tenant_id, id).await?;
        channel.is_enabled = !channel.is_enabled;
        channel.updated_at = Utc::now();
        self.repo.update(&channel).await
    }

    /// Canal informado precisa existir e estar habilitado.
    pub async fn require_enabled(&self, tenant_id: Uuid, id: Uuid) -> Result<Channel, AppError> {
        let channel = self
            .repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::validation("channelId", "Canal não encontrado."))?;
        if !channel.is_enabled {
            return Err(AppError::BusinessRule(format!(
                "O canal \"{}\" está desabilitado.",
                channel.name
            )));
        }
        Ok(channel)
    }
}

// =========================================================================
//  NOTIFICAÇÕES
// =========================================================================

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &NotificationFilters,
        page: &PageRequest,
    ) -> Result<Page<Notification>, AppError> {
        self.repo.find_with_filters(tenant_id, filters, page).await
    }
}

// =========================================================================
//  MENSAGENS
// =========================================================================

#[derive(Clone)]
pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    channels: ChannelService,
    engine: RuleEngine,
    dispatcher: Dispatcher,
    templates: TemplateService,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        channels: ChannelService,
        engine: RuleEngine,
        dispatcher: Dispatcher,
        templates: TemplateService,
    ) -> Self {
        Self {
            messages,
            channels,
            engine,
            dispatcher,
            templates,
        }
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Message, AppError> {
        self.messages
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Mensagem não encontrada.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &MessageFilters,
        page: &PageRequest,
    ) -> Result<Page<Message>, AppError> {
        self.messages.find_with_filters(tenant_id, filters, page).await
    }

    /// Grava a mensagem recebida, roda as regras e grava o resultado uma vez.
    pub async fn process_inbound(&self, tenant_id: Uuid, payload: InboundMessage) -> Result<ProcessedMessage, AppError> {
        payload.validate()?;
        if let Some(channel_id) = payload.channel_id {
            let channel = self.channels.require_enabled(tenant_id, channel_id).await?;
            if channel.channel_type != payload.channel_type {
                return Err(AppError::validation(
                    "channelType",
                    "O tipo não corresponde ao canal informado.",
                ));
            }
        }

        let now = Utc::now();
        let mut message = self
            .messages
            .create(&payload.into_message(tenant_id, now))
            .await?;
        tracing::info!(
            "Mensagem {} recebida via {} de {}",
            message.id,
            message.channel_type.as_str(),
            message.from_address
        );

        let evaluation = self.engine.evaluate(&mut message, now).await?;
        message.updated_at = Utc::now();
        let message = self.messages.update(&message).await?;

        Ok(ProcessedMessage { message, evaluation })
    }

    pub async fn send(&self, tenant_id: Uuid, payload: SendMessage) -> Result<Message, AppError> {
        payload.validate()?;

        let (channel_id, channel_type) = match payload.channel_id {
            Some(id) => {
                let channel = self.channels.require_enabled(tenant_id, id).await?;
                (Some(channel.id), channel.channel_type)
            }
            None => match payload.channel_type {
                Some(channel_type) => (None, channel_type),
                None => {
                    return Err(AppError::validation(
                        "channelType",
                        "Informe o canal ou o tipo de canal.",
                    ));
                }
            },
        };

        let (subject, content) = match payload.template_id {
            Some(template_id) => {
                let rendered = self
                    .templates
                    .render(tenant_id, template_id, &payload.variables)
                    .await?;
                (trim_opt(payload.subject).or(rendered.subject), rendered.content)
            }
            None => match payload.content.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
                Some(content) => (trim_opt(payload.subject), content),
                None => {
                    return Err(AppError::validation(
                        "content",
                        "Informe o conteúdo ou um template.",
                    ));
                }
            },
        };

        let now = Utc::now();
        let outbound = Message {
            id: Uuid::new_v4(),
            tenant_id,
            channel_id,
            channel_type,
            direction: MessageDirection::Outbound,
            from_address: "omnibridge".to_string(),
            from_name: None,
            to_address: Some(payload.to.trim().to_string()),
            subject,
            content,
            priority: MessagePriority::Normal,
            status: MessageStatus::Sent,
            tags: Vec::new(),
            is_starred: false,
            assigned_to: None,
            parent_id: None,
            ticket_id: None,
            metadata: match payload.template_id {
                Some(id) => serde_json::json!({ "templateId": id }),
                None => Value::Null,
            },
            received_at: now,
            created_at: now,
            updated_at: now,
        };
        self.dispatcher.deliver(outbound).await
    }

    pub async fn reply(&self, tenant_id: Uuid, id: Uuid, payload: ReplyMessage) -> Result<Message, AppError> {
        payload.validate()?;
        let mut original = self.find_by_id(tenant_id, id).await?;
        let sent = self.dispatcher.send_reply(&original, payload.content.trim()).await?;
        original.status = MessageStatus::Replied;
        self.touch(&mut original).await?;
        Ok(sent)
    }

    pub async fn forward(&self, tenant_id: Uuid, id: Uuid, payload: ForwardMessage) -> Result<Message, AppError> {
        payload.validate()?;
        let mut original = self.find_by_id(tenant_id, id).await?;
        let sent = self
            .dispatcher
            .send_forward(&original, payload.to.trim(), payload.note.as_deref())
            .await?;
        original.status = MessageStatus::Forwarded;
        self.touch(&mut original).await?;
        Ok(sent)
    }

    pub async fn archive(&self, tenant_id: Uuid, id: Uuid) -> Result<Message, AppError> {
        let mut message = self.find_by_id(tenant_id, id).await?;
        message.status = MessageStatus::Archived;
        self.touch(&mut message).await
    }

    /// Só mensagens não lidas mudam de status.
    pub async fn mark_read(&self, tenant_id: Uuid, id: Uuid) -> Result<Message, AppError> {
        let mut message = self.find_by_id(tenant_id, id).await?;
        if message.status != MessageStatus::Unread {
            return Ok(message);
        }
        message.status = MessageStatus::Read;
        self.touch(&mut message).await
    }

    pub async fn toggle_star(&self, tenant_id: Uuid, id: Uuid) -> Result<Message, AppError> {
        let mut message = self.find_by_id(tenant_id, id).await?;
        message.is_starred = !message.is_starred;
        self.touch(&mut message).await
    }

    async fn touch(&self, message: &mut Message) -> Result<Message, AppError> {
        message.updated_at = Utc::now();
        self.messages.update(message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Repositories;
    use crate::models::omnibridge::ChannelType;
    use crate::models::automation::{
        Action, ActionKind, AddTagsParams, AutoReplyParams, ConditionLogic, CreateAutomationRule,
        KeywordOperator, KeywordTrigger, Trigger,
    };
    use crate::services::{
        automation_service::RuleService, crm_service::TicketService, outbound::LoggingTransport,
        responder::CannedResponder,
    };

    struct Fixture {
        tenant: Uuid,
        repos: Repositories,
        rules: RuleService,
        channels: ChannelService,
        messages: MessageService,
    }

    fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let templates = TemplateService::new(repos.templates.clone());
        let tickets = TicketService::new(repos.tickets.clone(), repos.companies.clone(), repos.customers.clone());
        let dispatcher = Dispatcher::new(
            repos.messages.clone(),
            repos.notifications.clone(),
            tickets,
            templates.clone(),
            Arc::new(CannedResponder),
            Arc::new(LoggingTransport),
        );
        let engine = RuleEngine::new(repos.rules.clone(), Arc::new(dispatcher.clone()));
        let channels = ChannelService::new(repos.channels.clone());
        let messages = MessageService::new(
            repos.messages.clone(),
            channels.clone(),
            engine,
            dispatcher,
            templates,
        );
        Fixture {
            tenant: Uuid::new_v4(),
            rules: RuleService::new(repos.rules.clone()),
            repos,
            channels,
            messages,
        }
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage {
            channel_id: None,
            channel_type: ChannelType::Email,
            from: "joao@cliente.com".into(),
            from_name: Some("João".into()),
            to: Some("suporte@empresa.com".into()),
            subject: Some("Pedido 42".into()),
            content: content.into(),
            priority: None,
            received_at: None,
            metadata: Value::Null,
        }
    }

    fn help_rule() -> CreateAutomationRule {
        CreateAutomationRule {
            name: "Ajuda".into(),
            description: None,
            enabled: true,
            priority: Some(5),
            condition_logic: ConditionLogic::Or,
            stop_on_match: false,
            triggers: vec![Trigger::Keyword(KeywordTrigger {
                keywords: vec!["ajuda".into()],
                operator: KeywordOperator::Or,
                case_sensitive: false,
            })],
            actions: vec![
                Action::new(
                    2,
                    ActionKind::AutoReply(AutoReplyParams {
                        message: "Olá {{senderName}}, já vamos atender.".into(),
                        template_id: None,
                    }),
                ),
                Action::new(1, ActionKind::AddTags(AddTagsParams { tags: vec!["suporte".into()] })),
            ],
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn process_runs_rules_and_persists_once() {
        let f = fixture();
        let rule = f.rules.create(f.tenant, None, help_rule()).await.unwrap();

        let processed = f
            .messages
            .process_inbound(f.tenant, inbound("Preciso de ajuda"))
            .await
            .unwrap();
        assert_eq!(processed.evaluation.matched_rules.len(), 1);
        assert!(processed.evaluation.matched_rules[0].success);
        assert_eq!(processed.message.status, MessageStatus::Replied);
        assert_eq!(processed.message.tags, vec!["suporte"]);

        let stored = f.messages.find_by_id(f.tenant, processed.message.id).await.unwrap();
        assert_eq!(stored.status, MessageStatus::Replied);

        let outbound = f
            .messages
            .list(
                f.tenant,
                &MessageFilters {
                    direction: Some(MessageDirection::Outbound),
                    ..Default::default()
                },
                &PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(outbound.total, 1);
        assert_eq!(outbound.items[0].content, "Olá João, já vamos atender.");
        assert_eq!(outbound.items[0].subject.as_deref(), Some("Re: Pedido 42"));

        let stats = f.rules.find_by_id(f.tenant, rule.id).await.unwrap().stats;
        assert_eq!(stats.total_executions, 1);
        assert_eq!(stats.successful_executions, 1);
    }

    #[tokio::test]
    async fn message_without_match_stays_unread() {
        let f = fixture();
        f.rules.create(f.tenant, None, help_rule()).await.unwrap();
        let processed = f
            .messages
            .process_inbound(f.tenant, inbound("Obrigado!"))
            .await
            .unwrap();
        assert!(processed.evaluation.matched_rules.is_empty());
        assert_eq!(processed.evaluation.evaluated_rules, 1);
        assert_eq!(processed.message.status, MessageStatus::Unread);
    }

    #[tokio::test]
    async fn disabled_channel_rejects_inbound() {
        let f = fixture();
        let channel = f
            .channels
            .create(
                f.tenant,
                CreateChannel {
                    channel_type: ChannelType::Email,
                    name: "Suporte".into(),
                    description: None,
                    is_enabled: true,
                    config: Value::Null,
                },
            )
            .await
            .unwrap();
        f.channels.toggle(f.tenant, channel.id).await.unwrap();

        let mut msg = inbound("oi");
        msg.channel_id = Some(channel.id);
        let err = f.messages.process_inbound(f.tenant, msg).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn send_requires_content_or_template_and_a_channel() {
        let f = fixture();
        let base = SendMessage {
            channel_id: None,
            channel_type: Some(ChannelType::Sms),
            to: "+5511999990000".into(),
            subject: None,
            content: None,
            template_id: None,
            variables: Default::default(),
        };

        let err = f.messages.send(f.tenant, base.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = f
            .messages
            .send(
                f.tenant,
                SendMessage {
                    channel_type: None,
                    content: Some("Olá".into()),
                    ..base.clone()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let sent = f
            .messages
            .send(
                f.tenant,
                SendMessage {
                    content: Some("Olá".into()),
                    ..base
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.direction, MessageDirection::Outbound);
        assert_eq!(sent.status, MessageStatus::Sent);
        assert_eq!(sent.channel_type, ChannelType::Sms);
    }

    #[tokio::test]
    async fn reply_star_and_read_update_the_original() {
        let f = fixture();
        let processed = f.messages.process_inbound(f.tenant, inbound("oi")).await.unwrap();
        let id = processed.message.id;

        let read = f.messages.mark_read(f.tenant, id).await.unwrap();
        assert_eq!(read.status, MessageStatus::Read);

        let sent = f
            .messages
            .reply(f.tenant, id, ReplyMessage { content: "Resposta".into() })
            .await
            .unwrap();
        assert_eq!(sent.parent_id, Some(id));
        assert_eq!(sent.to_address.as_deref(), Some("joao@cliente.com"));
        assert_eq!(
            f.messages.find_by_id(f.tenant, id).await.unwrap().status,
            MessageStatus::Replied
        );

        // lida depois de respondida não volta para "read"
        let again = f.messages.mark_read(f.tenant, id).await.unwrap();
        assert_eq!(again.status, MessageStatus::Replied);

        assert!(f.messages.toggle_star(f.tenant, id).await.unwrap().is_starred);
        assert!(!f.messages.toggle_star(f.tenant, id).await.unwrap().is_starred);

        let archived = f.messages.archive(f.tenant, id).await.unwrap();
        assert_eq!(archived.status, MessageStatus::Archived);
        assert!(f.repos.messages.find_by_id(Uuid::new_v4(), id).await.unwrap().is_none());
    }
}
