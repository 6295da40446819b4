// src/services/responder.rs

use async_trait::async_trait;

use crate::{common::error::AppError, models::omnibridge::Message};

/// Gera o texto da ação `ai_response`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        message: &Message,
        tone: &str,
        language: &str,
        template: Option<&str>,
    ) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    Pt,
    En,
    Es,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Formal,
    Friendly,
    Neutral,
}

fn parse_language(value: &str) -> Language {
    match value.trim().to_lowercase().get(..2) {
        Some("en") => Language::En,
        Some("es") => Language::Es,
        _ => Language::Pt,
    }
}

fn parse_tone(value: &str) -> Tone {
    match value.trim().to_lowercase().as_str() {
        "formal" | "professional" => Tone::Formal,
        "friendly" | "casual" => Tone::Friendly,
        _ => Tone::Neutral,
    }
}

fn greeting(language: Language, tone: Tone, name: &str) -> String {
    match (language, tone) {
        (Language::Pt, Tone::Formal) => format!("Prezado(a) {name},"),
        (Language::Pt, Tone::Friendly) => format!("Oi, {name}! 😊"),
        (Language::Pt, Tone::Neutral) => format!("Olá, {name}."),
        (Language::En, Tone::Formal) => format!("Dear {name},"),
        (Language::En, Tone::Friendly) => format!("Hi {name}! 😊"),
        (Language::En, Tone::Neutral) => format!("Hello, {name}."),
        (Language::Es, Tone::Formal) => format!("Estimado(a) {name}:"),
        (Language::Es, Tone::Friendly) => format!("¡Hola, {name}! 😊"),
        (Language::Es, Tone::Neutral) => format!("Hola, {name}."),
    }
}

fn body(language: Language, tone: Tone) -> &'static str {
    match (language, tone) {
        (Language::Pt, Tone::Formal) => {
            "Agradecemos o seu contato. Sua solicitação foi registrada e será analisada por nossa equipe com a devida atenção."
        }
        (Language::Pt, Tone::Friendly) => {
            "Valeu por falar com a gente! Já recebemos sua mensagem e logo alguém do time te responde."
        }
        (Language::Pt, Tone::Neutral) => "Recebemos sua mensagem e retornaremos em breve.",
        (Language::En, Tone::Formal) => {
            "Thank you for contacting us. Your request has been registered and will be reviewed by our team."
        }
        (Language::En, Tone::Friendly) => {
            "Thanks for reaching out! We got your message and someone from the team will get back to you soon."
        }
        (Language::En, Tone::Neutral) => "We received your message and will reply shortly.",
        (Language::Es, Tone::Formal) => {
            "Le agradecemos su contacto. Su solicitud ha sido registrada y será analizada por nuestro equipo."
        }
        (Language::Es, Tone::Friendly) => {
            "¡Gracias por escribirnos! Ya recibimos tu mensaje y pronto alguien del equipo te responde."
        }
        (Language::Es, Tone::Neutral) => "Recibimos su mensaje y responderemos en breve.",
    }
}

/// Respostas prontas por idioma e tom. Não consulta nenhum serviço externo.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn compose(message: &Message, tone: &str, language: &str, template: Option<&str>) -> String {
        let language = parse_language(language);
        let tone = parse_tone(tone);
        let name = message.from_name.as_deref().unwrap_or(&message.from_address);

        let text = match template.map(str::trim).filter(|t| !t.is_empty()) {
            Some(template) => template.to_string(),
            None => body(language, tone).to_string(),
        };
        format!("{}\n\n{}", greeting(language, tone, name), text)
    }
}

#[async_trait]
impl ResponseGenerator for CannedResponder {
    async fn generate(
        &self,
        message: &Message,
        tone: &str,
        language: &str,
        template: Option<&str>,
    ) -> Result<String, AppError> {
        Ok(Self::compose(message, tone, language, template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::omnibridge::{ChannelType, MessageDirection, MessagePriority, MessageStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn message() -> Message {
        let now = Utc::now();
        Message {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            channel_id: None,
            channel_type: ChannelType::Webchat,
            direction: MessageDirection::Inbound,
            from_address: "ana@cliente.com".into(),
            from_name: Some("Ana".into()),
            to_address: None,
            subject: None,
            content: "Olá".into(),
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

    #[test]
    fn language_and_tone_pick_the_text() {
        let msg = message();
        assert!(CannedResponder::compose(&msg, "formal", "pt-BR", None).starts_with("Prezado(a) Ana,"));
        assert!(CannedResponder::compose(&msg, "friendly", "en", None).starts_with("Hi Ana!"));
        assert!(CannedResponder::compose(&msg, "neutral", "es", None).contains("Recibimos su mensaje"));
    }

    #[test]
    fn unknown_values_fall_back_to_portuguese_neutral() {
        let text = CannedResponder::compose(&message(), "sarcastic", "klingon", None);
        assert_eq!(text, "Olá, Ana.\n\nRecebemos sua mensagem e retornaremos em breve.");
    }

    #[test]
    fn template_replaces_the_body() {
        let text = CannedResponder::compose(&message(), "neutral", "pt", Some("Seu pedido saiu para entrega."));
        assert_eq!(text, "Olá, Ana.\n\nSeu pedido saiu para entrega.");
    }
}
