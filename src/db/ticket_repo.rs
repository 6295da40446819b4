// src/db/ticket_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{paginate, Page, PageRequest, SortOrder},
    },
    db::memory::{sort_rows, table, Table},
    models::crm::{Ticket, TicketFilters},
};

const SORTABLE: [&str; 4] = ["createdAt", "updatedAt", "priority", "status"];

#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn create(&self, ticket: &Ticket) -> Result<Ticket, AppError>;
    async fn update(&self, ticket: &Ticket) -> Result<Ticket, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Ticket>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &TicketFilters,
        page: &PageRequest,
    ) -> Result<Page<Ticket>, AppError>;
    /// Tickets abertos ou em andamento vinculados à empresa.
    async fn count_active_by_company(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError>;
}

fn sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&SORTABLE, "createdAt") {
        "updatedAt" => "updated_at",
        "priority" => "priority",
        "status" => "status",
        _ => "created_at",
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &TicketFilters) {
    if let Some(status) = filters.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filters.priority {
        qb.push(" AND priority = ").push_bind(priority);
    }
    if let Some(company_id) = filters.company_id {
        qb.push(" AND company_id = ").push_bind(company_id);
    }
    if let Some(customer_id) = filters.customer_id {
        qb.push(" AND customer_id = ").push_bind(customer_id);
    }
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    async fn create(&self, t: &Ticket) -> Result<Ticket, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>(
            r#"
            INSERT INTO tickets (
                id, tenant_id, subject, description, status, priority, company_id, customer_id,
                assigned_to, source_message_id, tags, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(t.id)
        .bind(t.tenant_id)
        .bind(&t.subject)
        .bind(&t.description)
        .bind(t.status)
        .bind(t.priority)
        .bind(t.company_id)
        .bind(t.customer_id)
        .bind(&t.assigned_to)
        .bind(t.source_message_id)
        .bind(&t.tags)
        .bind(t.created_at)
        .bind(t.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(ticket)
    }

    async fn update(&self, t: &Ticket) -> Result<Ticket, AppError> {
        sqlx::query_as::<_, Ticket>(
            r#"
            UPDATE tickets SET
                subject = $3, description = $4, status = $5, priority = $6,
                company_id = $7, customer_id = $8, assigned_to = $9, tags = $10, updated_at = $11
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(t.tenant_id)
        .bind(t.id)
        .bind(&t.subject)
        .bind(&t.description)
        .bind(t.status)
        .bind(t.priority)
        .bind(t.company_id)
        .bind(t.customer_id)
        .bind(&t.assigned_to)
        .bind(&t.tags)
        .bind(t.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Ticket não encontrado.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let ticket = sqlx::query_as::<_, Ticket>("SELECT * FROM tickets WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ticket)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &TicketFilters,
        page: &PageRequest,
    ) -> Result<Page<Ticket>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM tickets WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM tickets WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            sort_column(page),
            page.order_or(SortOrder::Desc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<Ticket>().fetch_all(&self.pool).await?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn count_active_by_company(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tickets
            WHERE tenant_id = $1 AND company_id = $2 AND status IN ('open', 'in_progress')
            "#,
        )
        .bind(tenant_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total as u64)
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryTicketRepository {
    tickets: Table<Ticket>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self { tickets: table() }
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn create(&self, ticket: &Ticket) -> Result<Ticket, AppError> {
        self.tickets.write().await.insert(ticket.id, ticket.clone());
        Ok(ticket.clone())
    }

    async fn update(&self, ticket: &Ticket) -> Result<Ticket, AppError> {
        let mut rows = self.tickets.write().await;
        match rows.get_mut(&ticket.id) {
            Some(existing) if existing.tenant_id == ticket.tenant_id => {
                *existing = ticket.clone();
                Ok(ticket.clone())
            }
            _ => Err(AppError::NotFound("Ticket não encontrado.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Ticket>, AppError> {
        let rows = self.tickets.read().await;
        Ok(rows.get(&id).filter(|t| t.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &TicketFilters,
        page: &PageRequest,
    ) -> Result<Page<Ticket>, AppError> {
        let rows = self.tickets.read().await;
        let mut items: Vec<Ticket> = rows
            .values()
            .filter(|t| {
                t.tenant_id == tenant_id
                    && filters.status.is_none_or(|s| t.status == s)
                    && filters.priority.is_none_or(|p| t.priority == p)
                    && filters.company_id.is_none_or(|c| t.company_id == Some(c))
                    && filters.customer_id.is_none_or(|c| t.customer_id == Some(c))
            })
            .cloned()
            .collect();
        drop(rows);

        let column = sort_column(page);
        sort_rows(
            &mut items,
            page.order_or(SortOrder::Desc),
            |a, b| match column {
                "updated_at" => a.updated_at.cmp(&b.updated_at),
                "priority" => (a.priority as u8).cmp(&(b.priority as u8)),
                "status" => (a.status as u8).cmp(&(b.status as u8)),
                _ => a.created_at.cmp(&b.created_at),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(paginate(items, page))
    }

    async fn count_active_by_company(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError> {
        let rows = self.tickets.read().await;
        Ok(rows
            .values()
            .filter(|t| t.tenant_id == tenant_id && t.company_id == Some(company_id) && t.status.is_active())
            .count() as u64)
    }
}
