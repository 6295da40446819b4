// src/services/template_service.rs

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::TemplateRepository,
    models::template::{
        CreateTemplate, MessageTemplate, RenderedTemplate, TemplateFilters, TemplateVariable,
        UpdateTemplate, VariableType,
    },
    services::company_service::CompanyOnboarding,
    validators::template::{validate_render_values, validate_template},
};

#[derive(Clone)]
pub struct TemplateService {
    repo: Arc<dyn TemplateRepository>,
}

// --- Templates instalados no onboarding ---

fn text_var(name: &str, required: bool) -> TemplateVariable {
    TemplateVariable {
        name: name.to_string(),
        var_type: VariableType::Text,
        required,
        default_value: None,
        description: None,
    }
}

fn default_templates() -> Vec<CreateTemplate> {
    let template = |name: &str, category: &str, subject: Option<&str>, content: &str, variables| {
        CreateTemplate {
            name: name.to_string(),
            description: None,
            category: Some(category.to_string()),
            channel_type: None,
            subject: subject.map(str::to_string),
            content: content.to_string(),
            variables,
            is_active: true,
        }
    };

    vec![
        template(
            "Boas-vindas",
            "greeting",
            Some("Bem-vindo(a), {{senderName}}"),
            "Olá {{senderName}}, obrigado pelo contato! Em breve um de nossos atendentes irá responder.",
            vec![text_var("senderName", false)],
        ),
        template(
            "Confirmação de recebimento",
            "acknowledgement",
            Some("Recebemos sua mensagem"),
            "Olá {{senderName}}, recebemos sua mensagem sobre \"{{subject}}\" e já estamos analisando.",
            vec![text_var("senderName", false), text_var("subject", false)],
        ),
        template(
            "Fora do horário",
            "out_of_hours",
            None,
            "Olá {{senderName}}, nosso horário de atendimento é de segunda a sexta, das 08:00 às 18:00. Responderemos assim que possível.",
            vec![text_var("senderName", false)],
        ),
        template(
            "Ticket aberto",
            "support",
            Some("Ticket {{ticketId}} aberto"),
            "Olá {{senderName}}, abrimos o ticket {{ticketId}} para acompanhar sua solicitação.",
            vec![text_var("senderName", false), text_var("ticketId", true)],
        ),
    ]
}

impl TemplateService {
    pub fn new(repo: Arc<dyn TemplateRepository>) -> Self {
        Self { repo }
    }

    async fn ensure_unique_name(&self, template: &MessageTemplate, exclude_id: Option<Uuid>) -> Result<(), AppError> {
        if self
            .repo
            .name_exists(template.tenant_id, &template.name, exclude_id)
            .await?
        {
            return Err(AppError::Conflict("Já existe um template com este nome.".into()));
        }
        Ok(())
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create(&self, tenant_id: Uuid, payload: CreateTemplate) -> Result<MessageTemplate, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let template = MessageTemplate {
            id: Uuid::new_v4(),
            tenant_id,
            name: payload.name.trim().to_string(),
            description: trim_opt(payload.description),
            category: trim_opt(payload.category).unwrap_or_else(|| "custom".to_string()),
            channel_type: payload.channel_type,
            subject: trim_opt(payload.subject),
            content: payload.content,
            variables: payload.variables,
            is_active: payload.is_active,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        validate_template(&template).into_result()?;
        self.ensure_unique_name(&template, None).await?;

        let created = self.repo.create(&template).await?;
        tracing::info!("Template criado: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<MessageTemplate, AppError> {
        self.repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template não encontrado.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &TemplateFilters,
        page: &PageRequest,
    ) -> Result<Page<MessageTemplate>, AppError> {
        self.repo.find_with_filters(tenant_id, filters, page).await
    }

    pub async fn update(&self, tenant_id: Uuid, id: Uuid, changes: UpdateTemplate) -> Result<MessageTemplate, AppError> {
        let mut template = self.find_by_id(tenant_id, id).await?;

        if let Some(name) = changes.name {
            template.name = name.trim().to_string();
        }
        if changes.description.is_some() {
            template.description = trim_opt(changes.description);
        }
        if let Some(category) = trim_opt(changes.category) {
            template.category = category;
        }
        if changes.channel_type.is_some() {
            template.channel_type = changes.channel_type;
        }
        if changes.subject.is_some() {
            template.subject = trim_opt(changes.subject);
        }
        if let Some(content) = changes.content {
            template.content = content;
        }
        if let Some(variables) = changes.variables {
            template.variables = variables;
        }

        validate_template(&template).into_result()?;
        self.ensure_unique_name(&template, Some(id)).await?;

        template.updated_at = Utc::now();
        self.repo.update(&template).await
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(tenant_id, id).await? {
            return Err(AppError::NotFound("Template não encontrado.".into()));
        }
        tracing::info!("Template removido: {}", id);
        Ok(())
    }

    pub async fn toggle(&self, tenant_id: Uuid, id: Uuid) -> Result<MessageTemplate, AppError> {
        let mut template = self.find_by_id(tenant_id, id).await?;
        template.is_active = !template.is_active;
        template.updated_at = Utc::now();
        self.repo.update(&template).await
    }

    // =========================================================================
    //  USO (instalação e renderização incrementam `usageCount`)
    // =========================================================================

    pub async fn install(&self, tenant_id: Uuid, id: Uuid) -> Result<MessageTemplate, AppError> {
        let mut template = self.find_by_id(tenant_id, id).await?;
        if !template.is_active {
            template.is_active = true;
            template.updated_at = Utc::now();
            self.repo.update(&template).await?;
        }
        self.repo
            .increment_usage(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Template não encontrado.".into()))
    }

    pub async fn render(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        values: &BTreeMap<String, String>,
    ) -> Result<RenderedTemplate, AppError> {
        let template = self.find_by_id(tenant_id, id).await?;
        if !template.is_active {
            return Err(AppError::BusinessRule("O template está inativo.".into()));
        }
        validate_render_values(&template.variables, values).into_result()?;

        let rendered = template.render(values);
        self.repo.increment_usage(tenant_id, id).await?;
        Ok(rendered)
    }

    /// Cria os templates padrão se o tenant ainda não tiver nenhum.
    pub async fn install_defaults(&self, tenant_id: Uuid) -> Result<usize, AppError> {
        if self.repo.count(tenant_id).await? > 0 {
            return Ok(0);
        }
        let mut installed = 0;
        for payload in default_templates() {
            self.create(tenant_id, payload).await?;
            installed += 1;
        }
        tracing::info!("{} templates padrão instalados no tenant {}", installed, tenant_id);
        Ok(installed)
    }
}

#[async_trait]
impl CompanyOnboarding for TemplateService {
    async fn on_first_company(&self, tenant_id: Uuid) -> Result<(), AppError> {
        self.install_defaults(tenant_id).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryTemplateRepository;

    fn service() -> TemplateService {
        TemplateService::new(Arc::new(InMemoryTemplateRepository::new()))
    }

    fn greeting() -> CreateTemplate {
        CreateTemplate {
            name: "Código".into(),
            description: None,
            category: None,
            channel_type: None,
            subject: None,
            content: "Hello {{name}}, your code is {{code}}".into(),
            variables: vec![text_var("name", true), text_var("code", false)],
            is_active: true,
        }
    }

    #[tokio::test]
    async fn render_fills_missing_optional_with_empty_and_counts_usage() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let t = svc.create(tenant, greeting()).await.unwrap();
        assert_eq!(t.category, "custom");

        let mut values = BTreeMap::new();
        values.insert("name".to_string(), "Ana".to_string());
        let rendered = svc.render(tenant, t.id, &values).await.unwrap();
        assert_eq!(rendered.content, "Hello Ana, your code is ");
        assert_eq!(svc.find_by_id(tenant, t.id).await.unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn render_rejects_missing_required_value() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let t = svc.create(tenant, greeting()).await.unwrap();
        let err = svc.render(tenant, t.id, &BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e[0].field == "name"));
        assert_eq!(svc.find_by_id(tenant, t.id).await.unwrap().usage_count, 0);
    }

    #[tokio::test]
    async fn names_are_unique_per_tenant() {
        let svc = service();
        let tenant = Uuid::new_v4();
        svc.create(tenant, greeting()).await.unwrap();
        let err = svc.create(tenant, greeting()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(svc.create(Uuid::new_v4(), greeting()).await.is_ok());
    }

    #[tokio::test]
    async fn install_activates_and_counts_usage() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let mut payload = greeting();
        payload.is_active = false;
        let t = svc.create(tenant, payload).await.unwrap();

        let installed = svc.install(tenant, t.id).await.unwrap();
        assert!(installed.is_active);
        assert_eq!(installed.usage_count, 1);

        let toggled = svc.toggle(tenant, t.id).await.unwrap();
        assert!(!toggled.is_active);
    }

    #[tokio::test]
    async fn onboarding_installs_defaults_only_once() {
        let svc = service();
        let tenant = Uuid::new_v4();
        svc.on_first_company(tenant).await.unwrap();
        let count = svc
            .list(tenant, &TemplateFilters::default(), &PageRequest::default())
            .await
            .unwrap()
            .total;
        assert_eq!(count, default_templates().len() as u64);

        assert_eq!(svc.install_defaults(tenant).await.unwrap(), 0);
    }
}
