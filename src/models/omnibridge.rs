// src/models/omnibridge.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- ENUMS ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "channel_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Email,
    Whatsapp,
    Telegram,
    Sms,
    Webchat,
    Instagram,
    Facebook,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Email => "email",
            ChannelType::Whatsapp => "whatsapp",
            ChannelType::Telegram => "telegram",
            ChannelType::Sms => "sms",
            ChannelType::Webchat => "webchat",
            ChannelType::Instagram => "instagram",
            ChannelType::Facebook => "facebook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_direction", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessagePriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Replied,
    Forwarded,
    Archived,
    Sent,
}

// --- CANAIS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub channel_type: ChannelType,
    pub name: String,
    pub description: Option<String>,
    pub is_enabled: bool,
    #[schema(value_type = Object)]
    pub config: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannel {
    pub channel_type: ChannelType,
    #[validate(length(min = 2, max = 120, message = "O nome deve ter entre 2 e 120 caracteres."))]
    #[schema(example = "WhatsApp Comercial")]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub config: Value,
}

fn default_true() -> bool {
    true
}

// --- MENSAGENS ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub channel_id: Option<Uuid>,
    pub channel_type: ChannelType,
    pub direction: MessageDirection,
    pub from_address: String,
    pub from_name: Option<String>,
    pub to_address: Option<String>,
    pub subject: Option<String>,
    pub content: String,
    pub priority: MessagePriority,
    pub status: MessageStatus,
    pub tags: Vec<String>,
    pub is_starred: bool,
    pub assigned_to: Option<String>,
    pub parent_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub received_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Variáveis disponíveis para respostas automáticas (`{{senderName}}` etc).
    pub fn template_values(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        values.insert("sender".to_string(), self.from_address.clone());
        values.insert(
            "senderName".to_string(),
            self.from_name.clone().unwrap_or_else(|| self.from_address.clone()),
        );
        values.insert("subject".to_string(), self.subject.clone().unwrap_or_default());
        values.insert("channel".to_string(), self.channel_type.as_str().to_string());
        values
    }

    /// Texto usado pelos gatilhos: assunto + conteúdo.
    pub fn searchable_text(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{}\n{}", subject, self.content),
            None => self.content.clone(),
        }
    }
}

/// Mensagem recebida de um canal (entrada do motor de automação).
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub channel_id: Option<Uuid>,
    pub channel_type: ChannelType,
    #[validate(length(min = 1, message = "O remetente é obrigatório."))]
    #[schema(example = "cliente@email.com")]
    pub from: String,
    pub from_name: Option<String>,
    pub to: Option<String>,
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "O conteúdo é obrigatório."))]
    #[schema(example = "Preciso de ajuda com meu pedido")]
    pub content: String,
    pub priority: Option<MessagePriority>,
    pub received_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Value,
}

impl InboundMessage {
    /// Mensagem de entrada ainda não lida, com os campos normalizados.
    pub fn into_message(self, tenant_id: Uuid, now: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            tenant_id,
            channel_id: self.channel_id,
            channel_type: self.channel_type,
            direction: MessageDirection::Inbound,
            from_address: self.from.trim().to_string(),
            from_name: self.from_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            to_address: self.to.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            subject: self.subject.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            content: self.content,
            priority: self.priority.unwrap_or_default(),
            status: MessageStatus::Unread,
            tags: Vec::new(),
            is_starred: false,
            assigned_to: None,
            parent_id: None,
            ticket_id: None,
            metadata: self.metadata,
            received_at: self.received_at.unwrap_or(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub channel_id: Option<Uuid>,
    pub channel_type: Option<ChannelType>,
    #[validate(length(min = 1, message = "O destinatário é obrigatório."))]
    pub to: String,
    pub subject: Option<String>,
    /// Obrigatório quando `templateId` não é informado
    pub content: Option<String>,
    pub template_id: Option<Uuid>,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessage {
    #[validate(length(min = 1, message = "O conteúdo é obrigatório."))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForwardMessage {
    #[validate(length(min = 1, message = "O destinatário é obrigatório."))]
    pub to: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MessageFilters {
    pub status: Option<MessageStatus>,
    pub channel_type: Option<ChannelType>,
    pub direction: Option<MessageDirection>,
    pub priority: Option<MessagePriority>,
    pub is_starred: Option<bool>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

// --- NOTIFICAÇÕES ---

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationFilters {
    pub recipient: Option<String>,
    pub is_read: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub recipient: String,
    pub title: String,
    pub message: String,
    pub rule_id: Option<Uuid>,
    pub message_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
