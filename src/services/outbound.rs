// src/services/outbound.rs

use async_trait::async_trait;

use crate::{common::error::AppError, models::omnibridge::Message};

/// Entrega de mensagens de saída ao canal real (e-mail, WhatsApp...).
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn deliver(&self, message: &Message) -> Result<(), AppError>;
}

/// Apenas registra a entrega no log; integrações com fornecedores ficam de fora.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingTransport;

#[async_trait]
impl OutboundTransport for LoggingTransport {
    async fn deliver(&self, message: &Message) -> Result<(), AppError> {
        tracing::info!(
            "Entrega [{}] mensagem {} para {}",
            message.channel_type.as_str(),
            message.id,
            message.to_address.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}
