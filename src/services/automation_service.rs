// src/services/automation_service.rs

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::AutomationRuleRepository,
    models::automation::{
        AutomationRule, CreateAutomationRule, ExecutionStats, RuleFilters, RuleMetadata,
        RuleTestResult, TestRuleRequest, UpdateAutomationRule,
    },
    services::rule_matcher::dry_run,
    validators::automation::validate_rule,
};

pub const DEFAULT_RULE_PRIORITY: i32 = 1;

#[derive(Clone)]
pub struct RuleService {
    repo: Arc<dyn AutomationRuleRepository>,
}

impl RuleService {
    pub fn new(repo: Arc<dyn AutomationRuleRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        payload: CreateAutomationRule,
    ) -> Result<AutomationRule, AppError> {
        payload.validate()?;
        let name = payload.name.trim().to_string();
        validate_rule(&name, &payload.triggers, &payload.actions).into_result()?;

        let now = Utc::now();
        let rule = AutomationRule {
            id: Uuid::new_v4(),
            tenant_id,
            name,
            description: trim_opt(payload.description),
            enabled: payload.enabled,
            priority: payload.priority.unwrap_or(DEFAULT_RULE_PRIORITY),
            condition_logic: payload.condition_logic,
            stop_on_match: payload.stop_on_match,
            triggers: payload.triggers,
            actions: payload.actions,
            stats: ExecutionStats::default(),
            metadata: RuleMetadata {
                created_by: actor,
                tags: payload.tags,
                version: 1,
            },
            created_at: now,
            updated_at: now,
        };
        let created = self.repo.create(&rule).await?;
        tracing::info!("Regra de automação criada: {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<AutomationRule, AppError> {
        self.repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Regra não encontrada.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &RuleFilters,
        page: &PageRequest,
    ) -> Result<Page<AutomationRule>, AppError> {
        self.repo.find_with_filters(tenant_id, filters, page).await
    }

    /// Toda atualização incrementa `metadata.version`. Contadores não mudam aqui.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        changes: UpdateAutomationRule,
    ) -> Result<AutomationRule, AppError> {
        let mut rule = self.find_by_id(tenant_id, id).await?;

        if let Some(name) = changes.name {
            rule.name = name.trim().to_string();
        }
        if changes.description.is_some() {
            rule.description = trim_opt(changes.description);
        }
        if let Some(enabled) = changes.enabled {
            rule.enabled = enabled;
        }
        if let Some(priority) = changes.priority {
            rule.priority = priority;
        }
        if let Some(logic) = changes.condition_logic {
            rule.condition_logic = logic;
        }
        if let Some(stop) = changes.stop_on_match {
            rule.stop_on_match = stop;
        }
        if let Some(triggers) = changes.triggers {
            rule.triggers = triggers;
        }
        if let Some(actions) = changes.actions {
            rule.actions = actions;
        }
        if let Some(tags) = changes.tags {
            rule.metadata.tags = tags;
        }

        validate_rule(&rule.name, &rule.triggers, &rule.actions).into_result()?;

        rule.metadata.version += 1;
        rule.updated_at = Utc::now();
        self.repo.update(&rule).await
    }

    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.repo.delete(tenant_id, id).await? {
            return Err(AppError::NotFound("Regra não encontrada.".into()));
        }
        tracing::info!("Regra de automação removida: {}", id);
        Ok(())
    }

    pub async fn toggle(&self, tenant_id: Uuid, id: Uuid) -> Result<AutomationRule, AppError> {
        let mut rule = self.find_by_id(tenant_id, id).await?;
        rule.enabled = !rule.enabled;
        rule.updated_at = Utc::now();
        let saved = self.repo.update(&rule).await?;
        tracing::info!(
            "Regra {} {}",
            saved.id,
            if saved.enabled { "habilitada" } else { "desabilitada" }
        );
        Ok(saved)
    }

    /// Simulação: não executa ações nem altera contadores.
    pub async fn test(&self, tenant_id: Uuid, id: Uuid, request: TestRuleRequest) -> Result<RuleTestResult, AppError> {
        request.message.validate()?;
        let rule = self.find_by_id(tenant_id, id).await?;
        let message = request.message.into_message(tenant_id, Utc::now());
        Ok(dry_run(&rule, &message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryAutomationRuleRepository;
    use crate::models::automation::{
        Action, ActionKind, AddTagsParams, ConditionLogic, KeywordOperator, KeywordTrigger, Trigger,
    };
    use crate::models::omnibridge::{ChannelType, InboundMessage};

    fn service() -> RuleService {
        RuleService::new(Arc::new(InMemoryAutomationRuleRepository::new()))
    }

    fn payload() -> CreateAutomationRule {
        CreateAutomationRule {
            name: " Suporte ".into(),
            description: None,
            enabled: true,
            priority: None,
            condition_logic: ConditionLogic::default(),
            stop_on_match: false,
            triggers: vec![Trigger::Keyword(KeywordTrigger {
                keywords: vec!["help".into()],
                operator: KeywordOperator::Or,
                case_sensitive: false,
            })],
            actions: vec![Action::new(
                1,
                ActionKind::AddTags(AddTagsParams {
                    tags: vec!["suporte".into()],
                }),
            )],
            tags: vec![],
        }
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage {
            channel_id: None,
            channel_type: ChannelType::Webchat,
            from: "ana@cliente.com".into(),
            from_name: None,
            to: None,
            subject: None,
            content: content.into(),
            priority: None,
            received_at: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let svc = service();
        let rule = svc.create(Uuid::new_v4(), None, payload()).await.unwrap();
        assert_eq!(rule.name, "Suporte");
        assert_eq!(rule.priority, DEFAULT_RULE_PRIORITY);
        assert_eq!(rule.condition_logic, ConditionLogic::Or);
        assert_eq!(rule.metadata.version, 1);
        assert_eq!(rule.stats, ExecutionStats::default());
    }

    #[tokio::test]
    async fn rule_needs_triggers_and_actions() {
        let svc = service();
        let mut p = payload();
        p.actions.clear();
        let err = svc.create(Uuid::new_v4(), None, p).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_bumps_version_and_rejects_empty_triggers() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let rule = svc.create(tenant, None, payload()).await.unwrap();

        let updated = svc
            .update(
                tenant,
                rule.id,
                UpdateAutomationRule {
                    priority: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.priority, 10);
        assert_eq!(updated.metadata.version, 2);

        let err = svc
            .update(
                tenant,
                rule.id,
                UpdateAutomationRule {
                    triggers: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(svc.find_by_id(tenant, rule.id).await.unwrap().metadata.version, 2);
    }

    #[tokio::test]
    async fn test_is_a_dry_run() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let rule = svc.create(tenant, None, payload()).await.unwrap();

        let result = svc
            .test(tenant, rule.id, TestRuleRequest { message: inbound("help!") })
            .await
            .unwrap();
        assert!(result.matched);
        assert_eq!(result.actions.len(), 1);
        assert_eq!(svc.find_by_id(tenant, rule.id).await.unwrap().stats.total_executions, 0);

        let toggled = svc.toggle(tenant, rule.id).await.unwrap();
        assert!(!toggled.enabled);
        svc.delete(tenant, rule.id).await.unwrap();
        assert!(matches!(svc.find_by_id(tenant, rule.id).await, Err(AppError::NotFound(_))));
    }
}
