// src/services/dispatch.rs

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{MessageRepository, NotificationRepository},
    models::{
        automation::CreateTicketParams,
        omnibridge::{Message, MessageDirection, MessageStatus, Notification},
        template::RenderedTemplate,
    },
    services::{
        crm_service::TicketService,
        outbound::OutboundTransport,
        responder::ResponseGenerator,
        rule_engine::ActionEffects,
        template_service::TemplateService,
    },
};

/// Executa os efeitos externos: envio, encaminhamento, tickets e notificações.
#[derive(Clone)]
pub struct Dispatcher {
    messages: Arc<dyn MessageRepository>,
    notifications: Arc<dyn NotificationRepository>,
    tickets: TicketService,
    templates: TemplateService,
    responder: Arc<dyn ResponseGenerator>,
    transport: Arc<dyn OutboundTransport>,
}

fn prefixed(prefix: &str, subject: Option<&str>) -> Option<String> {
    subject.map(|s| {
        if s.starts_with(prefix) {
            s.to_string()
        } else {
            format!("{prefix} {s}")
        }
    })
}

/// Monta uma mensagem de saída ligada (ou não) a uma mensagem original.
pub fn outbound_message(
    template: &Message,
    to: &str,
    subject: Option<String>,
    content: String,
    parent_id: Option<Uuid>,
) -> Message {
    let now = Utc::now();
    Message {
        id: Uuid::new_v4(),
        tenant_id: template.tenant_id,
        channel_id: template.channel_id,
        channel_type: template.channel_type,
        direction: MessageDirection::Outbound,
        from_address: template
            .to_address
            .clone()
            .unwrap_or_else(|| "omnibridge".to_string()),
        from_name: None,
        to_address: Some(to.to_string()),
        subject,
        content,
        priority: template.priority,
        status: MessageStatus::Sent,
        tags: Vec::new(),
        is_starred: false,
        assigned_to: None,
        parent_id,
        ticket_id: template.ticket_id,
        metadata: Value::Null,
        received_at: now,
        created_at: now,
        updated_at: now,
    }
}

impl Dispatcher {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        notifications: Arc<dyn NotificationRepository>,
        tickets: TicketService,
        templates: TemplateService,
        responder: Arc<dyn ResponseGenerator>,
        transport: Arc<dyn OutboundTransport>,
    ) -> Self {
        Self {
            messages,
            notifications,
            tickets,
            templates,
            responder,
            transport,
        }
    }

    /// Entrega pelo transporte e grava a mensagem de saída.
    pub async fn deliver(&self, outbound: Message) -> Result<Message, AppError> {
        self.transport.deliver(&outbound).await?;
        self.messages.create(&outbound).await
    }

    pub async fn send_reply(&self, original: &Message, content: &str) -> Result<Message, AppError> {
        let outbound = outbound_message(
            original,
            &original.from_address,
            prefixed("Re:", original.subject.as_deref()),
            content.to_string(),
            Some(original.id),
        );
        self.deliver(outbound).await
    }

    pub async fn send_forward(&self, original: &Message, to: &str, note: Option<&str>) -> Result<Message, AppError> {
        let content = match note.map(str::trim).filter(|n| !n.is_empty()) {
            Some(note) => format!(
                "{}\n\n---------- Mensagem encaminhada ----------\nDe: {}\n\n{}",
                note, original.from_address, original.content
            ),
            None => format!(
                "---------- Mensagem encaminhada ----------\nDe: {}\n\n{}",
                original.from_address, original.content
            ),
        };
        let outbound = outbound_message(
            original,
            to,
            prefixed("Fwd:", original.subject.as_deref()),
            content,
            Some(original.id),
        );
        self.deliver(outbound).await
    }
}

#[async_trait]
impl ActionEffects for Dispatcher {
    async fn reply(&self, message: &Message, content: &str) -> Result<(), AppError> {
        self.send_reply(message, content).await.map(|_| ())
    }

    async fn forward(&self, message: &Message, to: &str, note: Option<&str>) -> Result<(), AppError> {
        self.send_forward(message, to, note).await.map(|_| ())
    }

    async fn create_ticket(&self, message: &Message, params: &CreateTicketParams) -> Result<Uuid, AppError> {
        let ticket = self.tickets.create_from_message(message, params).await?;
        Ok(ticket.id)
    }

    async fn notify(
        &self,
        message: &Message,
        rule_id: Uuid,
        recipients: &[String],
        title: &str,
        body: &str,
    ) -> Result<(), AppError> {
        if recipients.is_empty() {
            return Err(AppError::BusinessRule("Nenhum destinatário para a notificação.".into()));
        }
        for recipient in recipients {
            let notification = Notification {
                id: Uuid::new_v4(),
                tenant_id: message.tenant_id,
                recipient: recipient.clone(),
                title: title.to_string(),
                message: body.to_string(),
                rule_id: Some(rule_id),
                message_id: Some(message.id),
                is_read: false,
                created_at: Utc::now(),
            };
            self.notifications.create(&notification).await?;
        }
        Ok(())
    }

    async fn render_template(
        &self,
        tenant_id: Uuid,
        template_id: Uuid,
        values: &BTreeMap<String, String>,
    ) -> Result<RenderedTemplate, AppError> {
        self.templates.render(tenant_id, template_id, values).await
    }

    async fn generate_response(
        &self,
        message: &Message,
        tone: &str,
        language: &str,
        template: Option<&str>,
    ) -> Result<String, AppError> {
        self.responder.generate(message, tone, language, template).await
    }
}
