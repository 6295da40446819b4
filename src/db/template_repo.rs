// src/db/template_repo.rs

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
    models::{
        omnibridge::ChannelType,
        template::{MessageTemplate, TemplateFilters, TemplateVariable},
    },
};

const SORTABLE: [&str; 5] = ["name", "category", "usageCount", "createdAt", "updatedAt"];
const DUPLICATED: &str = "Já existe um template com este nome.";

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, template: &MessageTemplate) -> Result<MessageTemplate, AppError>;
    async fn update(&self, template: &MessageTemplate) -> Result<MessageTemplate, AppError>;
    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &TemplateFilters,
        page: &PageRequest,
    ) -> Result<Page<MessageTemplate>, AppError>;
    async fn name_exists(&self, tenant_id: Uuid, name: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError>;
    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError>;
    /// `usage_count + 1` atômico; devolve o template atualizado.
    async fn increment_usage(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError>;
}

fn sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&SORTABLE, "name") {
        "category" => "category",
        "usageCount" => "usage_count",
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        _ => "name",
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(FromRow)]
struct TemplateRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    description: Option<String>,
    category: String,
    channel_type: Option<ChannelType>,
    subject: Option<String>,
    content: String,
    variables: Json<Vec<TemplateVariable>>,
    is_active: bool,
    usage_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for MessageTemplate {
    fn from(row: TemplateRow) -> Self {
        MessageTemplate {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            description: row.description,
            category: row.category,
            channel_type: row.channel_type,
            subject: row.subject,
            content: row.content,
            variables: row.variables.0,
            is_active: row.is_active,
            usage_count: row.usage_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgTemplateRepository {
    pool: PgPool,
}

impl PgTemplateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &TemplateFilters) {
    if let Some(category) = &filters.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(channel_type) = filters.channel_type {
        qb.push(" AND channel_type = ").push_bind(channel_type);
    }
    if let Some(is_active) = filters.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
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
impl TemplateRepository for PgTemplateRepository {
    async fn create(&self, t: &MessageTemplate) -> Result<MessageTemplate, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            INSERT INTO message_templates (
                id, tenant_id, name, description, category, channel_type, subject, content,
                variables, is_active, usage_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(t.id)
        .bind(t.tenant_id)
        .bind(&t.name)
        .bind(&t.description)
        .bind(&t.category)
        .bind(t.channel_type)
        .bind(&t.subject)
        .bind(&t.content)
        .bind(Json(&t.variables))
        .bind(t.is_active)
        .bind(t.usage_count)
        .bind(t.created_at)
        .bind(t.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATED))?;
        Ok(row.into())
    }

    async fn update(&self, t: &MessageTemplate) -> Result<MessageTemplate, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            UPDATE message_templates SET
                name = $3, description = $4, category = $5, channel_type = $6, subject = $7,
                content = $8, variables = $9, is_active = $10, updated_at = $11
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(t.tenant_id)
        .bind(t.id)
        .bind(&t.name)
        .bind(&t.description)
        .bind(&t.category)
        .bind(t.channel_type)
        .bind(&t.subject)
        .bind(&t.content)
        .bind(Json(&t.variables))
        .bind(t.is_active)
        .bind(t.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATED))?
        .ok_or_else(|| AppError::NotFound("Template não encontrado.".into()))?;
        Ok(row.into())
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM message_templates WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            "SELECT * FROM message_templates WHERE tenant_id = $1 AND id = $2",
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
        filters: &TemplateFilters,
        page: &PageRequest,
    ) -> Result<Page<MessageTemplate>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM message_templates WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM message_templates WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            sort_column(page),
            page.order_or(SortOrder::Asc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let rows = qb.build_query_as::<TemplateRow>().fetch_all(&self.pool).await?;
        Ok(Page {
            items: rows.into_iter().map(Into::into).collect(),
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn name_exists(&self, tenant_id: Uuid, name: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM message_templates
                WHERE tenant_id = $1 AND name = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message_templates WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }

    async fn increment_usage(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError> {
        let row = sqlx::query_as::<_, TemplateRow>(
            r#"
            UPDATE message_templates SET usage_count = usage_count + 1
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryTemplateRepository {
    templates: Table<MessageTemplate>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self { templates: table() }
    }
}

fn name_taken(rows: &std::collections::HashMap<Uuid, MessageTemplate>, t: &MessageTemplate) -> bool {
    rows.values()
        .any(|other| other.tenant_id == t.tenant_id && other.id != t.id && other.name == t.name)
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn create(&self, template: &MessageTemplate) -> Result<MessageTemplate, AppError> {
        let mut rows = self.templates.write().await;
        if name_taken(&rows, template) {
            return Err(AppError::Conflict(DUPLICATED.into()));
        }
        rows.insert(template.id, template.clone());
        Ok(template.clone())
    }

    async fn update(&self, template: &MessageTemplate) -> Result<MessageTemplate, AppError> {
        let mut rows = self.templates.write().await;
        if name_taken(&rows, template) {
            return Err(AppError::Conflict(DUPLICATED.into()));
        }
        match rows.get_mut(&template.id) {
            Some(existing) if existing.tenant_id == template.tenant_id => {
                let usage_count = existing.usage_count;
                *existing = MessageTemplate {
                    usage_count,
                    ..template.clone()
                };
                Ok(existing.clone())
            }
            _ => Err(AppError::NotFound("Template não encontrado.".into())),
        }
    }

    async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut rows = self.templates.write().await;
        if rows.get(&id).is_some_and(|t| t.tenant_id == tenant_id) {
            rows.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError> {
        let rows = self.templates.read().await;
        Ok(rows.get(&id).filter(|t| t.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &TemplateFilters,
        page: &PageRequest,
    ) -> Result<Page<MessageTemplate>, AppError> {
        let needle = filters
            .search
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let rows = self.templates.read().await;
        let mut items: Vec<MessageTemplate> = rows
            .values()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && filters.category.as_deref().is_none_or(|c| t.category == c)
                    && filters.channel_type.is_none_or(|c| t.channel_type == Some(c))
                    && filters.is_active.is_none_or(|a| t.is_active == a)
                    && needle.as_deref().is_none_or(|n| {
                        t.name.to_lowercase().contains(n) || contains_ci(t.description.as_deref(), n)
                    })
            })
            .cloned()
            .collect();
        drop(rows);

        let column = sort_column(page);
        sort_rows(
            &mut items,
            page.order_or(SortOrder::Asc),
            |a, b| match column {
                "category" => cmp_ci(&a.category, &b.category),
                "usage_count" => a.usage_count.cmp(&b.usage_count),
                "created_at" => a.created_at.cmp(&b.created_at),
                "updated_at" => a.updated_at.cmp(&b.updated_at),
                _ => cmp_ci(&a.name, &b.name),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(paginate(items, page))
    }

    async fn name_exists(&self, tenant_id: Uuid, name: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let rows = self.templates.read().await;
        Ok(rows
            .values()
            .any(|t| t.tenant_id == tenant_id && t.name == name && Some(t.id) != exclude_id))
    }

    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let rows = self.templates.read().await;
        Ok(rows.values().filter(|t| t.tenant_id == tenant_id).count() as u64)
    }

    async fn increment_usage(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MessageTemplate>, AppError> {
        let mut rows = self.templates.write().await;
        Ok(rows.get_mut(&id).filter(|t| t.tenant_id == tenant_id).map(|t| {
            t.usage_count += 1;
            t.clone()
        }))
    }
}
