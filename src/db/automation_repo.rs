// src/db/automation_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{paginate, Page, PageRequest, SortOrder},
    },
    db::{
        like_pattern,
        memory::{cmp_ci, contains_ci, sort_rows, table, Table},
    },
    models::automation::{
        Action, AutomationRule, ConditionLogic, ExecutionStats, RuleFilters, RuleMetadata, Trigger,
    },
};

const SORTABLE: [&str; 4] = ["priority", "name", "createdAt", "updatedAt"];

#[async_trait]
pub trait AutomationRuleRepository: Send + Sync {
    async fn create(&self, rule: &AutomationRule) -> Result<AutomationRule, AppError>;
    async fn update(&self, rule: &AutomationRule) -> Result<AutomationRule, AppError>;
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<AutomationRule>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &RuleFilters,
        page: &PageRequest,
    ) -> Result<Page<AutomationRule>, AppError>;
    /// Regras habilitadas na ordem de avaliação: prioridade desc, criação asc.
    async fn list_enabled(&self, tenant_id: Uuid) -> Result<Vec<AutomationRule>, AppError>;
    /// Atualiza os contadores numa única instrução.
    async fn record_execution(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        success: bool,
        executed_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

fn sort_column(page: &PageRequest) -> (&'static str, SortOrder) {
    match page.sort_key(&SORTABLE, "priority") {
        "name" => ("name", page.order_or(SortOrder::Asc)),
        "createdAt" => ("created_at", page.order_or(SortOrder::Asc)),
        "updatedAt" => ("updated_at", page.order_or(SortOrder::Asc)),
        _ => ("priority", page.order_or(SortOrder::Desc)),
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

// Gatilhos e ações ficam em JSONB dentro da própria linha da regra
#[derive(FromRow)]
struct RuleRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    enabled: bool,
    priority: i32,
    condition_logic: ConditionLogic,
    stop_on_match: bool,
    triggers: Json<Vec<Trigger>>,
    actions: Json<Vec<Action>>,
    total_executions: i64,
    successful_executions: i64,
    failed_executions: i64,
    last_executed: Option<DateTime<Utc>>,
    created_by: Option<Uuid>,
    tags: Vec<String>,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RuleRow> for AutomationRule {
    fn from(row: RuleRow) -> Self {
        AutomationRule {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            description: row.description,
            enabled: row.enabled,
            priority: row.priority,
            condition_logic: row.condition_logic,
            stop_on_match: row.stop_on_match,
            triggers: row.triggers.0,
            actions: row.actions.0,
            stats: ExecutionStats {
                total_executions: row.total_executions,
                successful_executions: row.successful_executions,
                failed_executions: row.failed_executions,
                last_executed: row.last_executed,
            },
            metadata: RuleMetadata {
                created_by: row.created_by,
                tags: row.tags,
                version: row.version,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgAutomationRuleRepository {
    pool: PgPool,
}

impl PgAutomationRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &RuleFilters) {
    if let Some(enabled) = filters.enabled {
        qb.push(" AND enabled = ").push_bind(enabled);
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl AutomationRuleRepository for PgAutomationRuleRepository {
    async fn create(&self, r: &AutomationRule) -> Result<AutomationRule, AppError> {
        let row = sqlx::query_as::<_, RuleRow>(
            r#"
            INSERT INTO automation_rules (
                id, tenant_id, name, description, enabled, priority, condition_logic, stop_on_match,
                triggers, actions, total_executions, successful_executions, failed_executions,
                last_executed, created_by, tags, version, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(r.id)
        .bind(r.tenant_id)
        .bind(&r.name)
        .bind(&r.description)
        .bind(r.enabled)
        .bind(r.priority)
        .bind(r.condition_logic)
        .bind(r.stop_on_match)
        .bind(Json(&r.triggers))
        .bind(Json(&r.actions))
        .bind(r.stats.total_executions)
        .bind(r.stats.successful_executions)
        .bind(r.stats.failed_executions)
        .bind(r.stats.last_executed)
        .bind(r.metadata.created_by)
        .bind(&r.metadata.tags)
        .bind(r.metadata.version)
        .bind(r.created_at)
        .bind(r.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, r: &AutomationRule) -> Result<AutomationRule, AppError> {
        // Contadores não são tocados aqui; apenas `record_execution` os altera
        let row = sqlx::query_as::<_, RuleRow>(
            r#"
            UPDATE automation_rules SET
                name = $3, description = $4, enabled = $5, priority = $6, condition_logic = $7,
                stop_on_match = $8, triggers = $9, actions = $10, tags = $11, version = $12,
                updated_at = $13
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(r.tenant_id)
        .bind(r.id)
        .bind(&r.name)
        .bind(&r.description)
        .bind(r.enabled)
        .bind(r.priority)
        .bind(r.condition_logic)
        .bind(r.stop_on_match)
        .bind(Json(&r.triggers))
        .bind(Json(&r.actions))
        .bind(&r.metadata.tags)
        .bind(r.metadata.version)
        .bind(r.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Regra não encontrada.".into()))?;
        Ok(row.into())
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM automation_rules WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<AutomationRule>, AppError> {
        let row = sqlx::query_as::<_, RuleRow>(
            "SELECT * FROM automation_rules WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &RuleFilters,
        page: &PageRequest,
    ) -> Result<Page<AutomationRule>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM automation_rules WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let (column, order) = sort_column(page);
        let mut qb = QueryBuilder::new("SELECT * FROM automation_rules WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(" ORDER BY {} {}, created_at ASC, id ASC", column, order.as_sql()));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let rows = qb.build_query_as::<RuleRow>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn list_enabled(&self, tenant_id: Uuid) -> Result<Vec<AutomationRule>, AppError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT * FROM automation_rules
            WHERE tenant_id = $1 AND enabled
            ORDER BY priority DESC, created_at ASC, id ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn record_execution(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        success: bool,
        executed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE automation_rules SET
                total_executions = total_executions + 1,
                successful_executions = successful_executions + CASE WHEN $3 THEN 1 ELSE 0 END,
                failed_executions = failed_executions + CASE WHEN $3 THEN 0 ELSE 1 END,
                last_executed = $4
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .bind(success)
        .bind(executed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryAutomationRuleRepository {
    rules: Table<AutomationRule>,
}

impl InMemoryAutomationRuleRepository {
    pub fn new() -> Self {
        Self { rules: table() }
    }
}

fn evaluation_order(a: &AutomationRule, b: &AutomationRule) -> std::cmp::Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl AutomationRuleRepository for InMemoryAutomationRuleRepository {
    async fn create(&self, rule: &AutomationRule) -> Result<AutomationRule, AppError> {
        self.rules.write().await.insert(rule.id, rule.clone());
        Ok(rule.clone())
    }

    async fn update(&self, rule: &AutomationRule) -> Result<AutomationRule, AppError> {
        let mut rows = self.rules.write().await;
        match rows.get_mut(&rule.id) {
            Some(existing) if existing.tenant_id == rule.tenant_id => {
                let stats = existing.stats.clone();
                *existing = AutomationRule {
                    stats,
                    ..rule.clone()
                };
                Ok(existing.clone())
            }
            _ => Err(AppError::NotFound("Regra não encontrada.".into())),
        }
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.rules.write().await;
        if rows.get(&id).is_some_and(|r| r.tenant_id == tenant_id) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<AutomationRule>, AppError> {
        let rows = self.rules.read().await;
        Ok(rows.get(&id).filter(|r| r.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &RuleFilters,
        page: &PageRequest,
    ) -> Result<Page<AutomationRule>, AppError> {
        let needle = filters
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let rows = self.rules.read().await;
        let mut items: Vec<AutomationRule> = rows
            .values()
            .filter(|r| {
                r.tenant_id == tenant_id
                    && filters.enabled.is_none_or(|e| r.enabled == e)
                    && needle.as_deref().is_none_or(|n| {
                        r.name.to_lowercase().contains(n) || contains_ci(r.description.as_deref(), n)
                    })
            })
            .cloned()
            .collect();
        drop(rows);

        let (column, order) = sort_column(page);
        sort_rows(
            &mut items,
            order,
            |a, b| match column {
                "name" => cmp_ci(&a.name, &b.name),
                "created_at" => a.created_at.cmp(&b.created_at),
                "updated_at" => a.updated_at.cmp(&b.updated_at),
                _ => a.priority.cmp(&b.priority),
            },
            |a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)),
        );
        Ok(paginate(items, page))
    }

    async fn list_enabled(&self, tenant_id: Uuid) -> Result<Vec<AutomationRule>, AppError> {
        let rows = self.rules.read().await;
        let mut items: Vec<AutomationRule> = rows
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.enabled)
            .cloned()
            .collect();
        items.sort_by(evaluation_order);
        Ok(items)
    }

    async fn record_execution(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        success: bool,
        executed_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut rows = self.rules.write().await;
        if let Some(rule) = rows.get_mut(&id).filter(|r| r.tenant_id == tenant_id) {
            rule.stats.total_executions += 1;
            if success {
                rule.stats.successful_executions += 1;
            } else {
                rule.stats.failed_executions += 1;
            }
            rule.stats.last_executed = Some(executed_at);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::{ActionKind, ArchiveParams, ChannelTrigger};
    use crate::models::omnibridge::ChannelType;
    use chrono::Duration;

    fn rule(tenant_id: Uuid, name: &str, priority: i32, created_at: DateTime<Utc>) -> AutomationRule {
        AutomationRule {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            description: None,
            enabled: true,
            priority,
            condition_logic: ConditionLogic::Or,
            stop_on_match: false,
            triggers: vec![Trigger::Channel(ChannelTrigger {
                channels: vec![ChannelType::Email],
            })],
            actions: vec![Action::new(1, ActionKind::Archive(ArchiveParams::default()))],
            stats: ExecutionStats::default(),
            metadata: RuleMetadata {
                version: 1,
                ..Default::default()
            },
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn enabled_rules_come_in_evaluation_order() {
        let repo = InMemoryAutomationRuleRepository::new();
        let tenant = Uuid::new_v4();
        let t0 = Utc::now();
        repo.create(&rule(tenant, "baixa", 1, t0)).await.unwrap();
        repo.create(&rule(tenant, "alta-nova", 10, t0 + Duration::seconds(2))).await.unwrap();
        repo.create(&rule(tenant, "alta-antiga", 10, t0 + Duration::seconds(1))).await.unwrap();
        let mut disabled = rule(tenant, "desligada", 99, t0);
        disabled.enabled = false;
        repo.create(&disabled).await.unwrap();

        let names: Vec<String> = repo
            .list_enabled(tenant)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["alta-antiga", "alta-nova", "baixa"]);
    }

    #[tokio::test]
    async fn listing_by_priority_keeps_oldest_first_on_ties() {
        let repo = InMemoryAutomationRuleRepository::new();
        let tenant = Uuid::new_v4();
        let t0 = Utc::now();
        repo.create(&rule(tenant, "b-nova", 5, t0 + Duration::seconds(2))).await.unwrap();
        repo.create(&rule(tenant, "a-antiga", 5, t0)).await.unwrap();
        repo.create(&rule(tenant, "c-alta", 9, t0 + Duration::seconds(1))).await.unwrap();

        let page = repo
            .find_with_filters(tenant, &RuleFilters::default(), &PageRequest::default())
            .await
            .unwrap();
        let names: Vec<String> = page.items.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["c-alta", "a-antiga", "b-nova"]);
    }

    #[tokio::test]
    async fn record_execution_touches_only_counters() {
        let repo = InMemoryAutomationRuleRepository::new();
        let tenant = Uuid::new_v4();
        let r = repo.create(&rule(tenant, "r", 1, Utc::now())).await.unwrap();
        let at = Utc::now();

        repo.record_execution(tenant, r.id, true, at).await.unwrap();
        repo.record_execution(tenant, r.id, false, at).await.unwrap();

        let stored = repo.find_by_id(tenant, r.id).await.unwrap().unwrap();
        assert_eq!(stored.stats.total_executions, 2);
        assert_eq!(stored.stats.successful_executions, 1);
        assert_eq!(stored.stats.failed_executions, 1);
        assert_eq!(stored.stats.last_executed, Some(at));
        assert_eq!(stored.metadata.version, 1);
    }
}
