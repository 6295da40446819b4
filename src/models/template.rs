// src/models/template.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::omnibridge::ChannelType;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    #[default]
    Text,
    Number,
    Date,
    Email,
    Phone,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    #[schema(example = "name")]
    pub name: String,
    #[serde(rename = "type", default)]
    pub var_type: VariableType,
    #[serde(default)]
    pub required: bool,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageTemplate {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub channel_type: Option<ChannelType>,
    pub subject: Option<String>,
    pub content: String,
    pub variables: Vec<TemplateVariable>,
    pub is_active: bool,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTemplate {
    pub subject: Option<String>,
    pub content: String,
}

/// Percorre o texto uma única vez, trocando cada `{{nome}}` reconhecido por
/// `lookup`. Valores inseridos nunca são reexpandidos.
fn expand<'a>(text: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match lookup(&after[..end]) {
            Some(value) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Substitui cada `{{nome}}` declarado pelo valor informado, pelo padrão
/// ou por string vazia. Placeholders não declarados ficam intactos.
pub fn substitute(text: &str, variables: &[TemplateVariable], values: &BTreeMap<String, String>) -> String {
    expand(text, |name| {
        variables.iter().find(|v| v.name == name).map(|var| {
            values
                .get(&var.name)
                .or(var.default_value.as_ref())
                .map(String::as_str)
                .unwrap_or("")
        })
    })
}

/// Versão sem declarações: cada chave do mapa vira uma variável.
pub fn substitute_all(text: &str, values: &BTreeMap<String, String>) -> String {
    expand(text, |name| values.get(name).map(String::as_str))
}

impl MessageTemplate {
    pub fn render(&self, values: &BTreeMap<String, String>) -> RenderedTemplate {
        RenderedTemplate {
            subject: self
                .subject
                .as_ref()
                .map(|s| substitute(s, &self.variables, values)),
            content: substitute(&self.content, &self.variables, values),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplate {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Boas-vindas")]
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub channel_type: Option<ChannelType>,
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "O conteúdo é obrigatório."))]
    #[schema(example = "Olá {{name}}, seja bem-vindo!")]
    pub content: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub channel_type: Option<ChannelType>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub variables: Option<Vec<TemplateVariable>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TemplateFilters {
    pub category: Option<String>,
    pub channel_type: Option<ChannelType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderTemplateRequest {
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, default_value: Option<&str>) -> TemplateVariable {
        TemplateVariable {
            name: name.to_string(),
            var_type: VariableType::Text,
            required: false,
            default_value: default_value.map(str::to_string),
            description: None,
        }
    }

    fn template(content: &str, subject: Option<&str>, variables: Vec<TemplateVariable>) -> MessageTemplate {
        MessageTemplate {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "t".into(),
            description: None,
            category: "custom".into(),
            channel_type: None,
            subject: subject.map(str::to_string),
            content: content.to_string(),
            variables,
            is_active: true,
            usage_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_value_without_default_renders_empty() {
        let t = template(
            "Hello {{name}}, your code is {{code}}",
            None,
            vec![var("name", None), var("code", None)],
        );
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "Ana".to_string());
        assert_eq!(t.render(&values).content, "Hello Ana, your code is ");
    }

    #[test]
    fn default_fills_gap_and_subject_is_rendered() {
        let t = template(
            "Pedido {{order}} de {{name}} {{name}}",
            Some("Pedido {{order}}"),
            vec![var("name", None), var("order", Some("000"))],
        );
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "Ana".to_string());
        let rendered = t.render(&values);
        assert_eq!(rendered.content, "Pedido 000 de Ana Ana");
        assert_eq!(rendered.subject.as_deref(), Some("Pedido 000"));
    }

    #[test]
    fn values_are_not_expanded_again() {
        let t = template(
            "Hi {{name}}",
            Some("{{name}}: {{code}}"),
            vec![var("name", None), var("code", Some("SECRET"))],
        );
        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "{{code}}".to_string());
        let rendered = t.render(&values);
        assert_eq!(rendered.content, "Hi {{code}}");
        assert_eq!(rendered.subject.as_deref(), Some("{{code}}: SECRET"));

        let mut values = BTreeMap::new();
        values.insert("senderName".to_string(), "{{subject}}".to_string());
        values.insert("subject".to_string(), "Pedido".to_string());
        assert_eq!(
            substitute_all("{{senderName}} / {{subject}} / {{x", &values),
            "{{subject}} / Pedido / {{x"
        );
    }

    #[test]
    fn undeclared_placeholders_are_left_alone() {
        let t = template("Oi {{name}} {{other}}", None, vec![var("name", None)]);
        let mut values = BTreeMap::new();
        values.insert("other".to_string(), "x".to_string());
        assert_eq!(t.render(&values).content, "Oi  {{other}}");
    }
}
