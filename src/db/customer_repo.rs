// src/db/customer_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
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
    models::crm::{Customer, CustomerFilters},
};

const SORTABLE: [&str; 4] = ["firstName", "lastName", "email", "createdAt"];

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: &Customer) -> Result<Customer, AppError>;
    async fn update(&self, customer: &Customer) -> Result<Customer, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CustomerFilters,
        page: &PageRequest,
    ) -> Result<Page<Customer>, AppError>;
    async fn email_exists(
        &self,
        tenant_id: Uuid,
        email: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError>;
}

fn sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&SORTABLE, "firstName") {
        "lastName" => "last_name",
        "email" => "email",
        "createdAt" => "created_at",
        _ => "first_name",
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &CustomerFilters) {
    if !filters.include_inactive.unwrap_or(false) {
        qb.push(" AND is_active = TRUE");
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (first_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR last_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR cpf ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn create(&self, c: &Customer) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (id, tenant_id, first_name, last_name, email, phone, cpf, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.tenant_id)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.cpf)
        .bind(c.is_active)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um cliente com este e-mail."))
    }

    async fn update(&self, c: &Customer) -> Result<Customer, AppError> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                first_name = $3, last_name = $4, email = $5, phone = $6, cpf = $7,
                is_active = $8, updated_at = $9
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(c.tenant_id)
        .bind(c.id)
        .bind(&c.first_name)
        .bind(&c.last_name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.cpf)
        .bind(c.is_active)
        .bind(c.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um cliente com este e-mail."))?
        .ok_or_else(|| AppError::NotFound("Cliente não encontrado.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CustomerFilters,
        page: &PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM customers WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM customers WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            sort_column(page),
            page.order_or(SortOrder::Asc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<Customer>().fetch_all(&self.pool).await?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn email_exists(&self, tenant_id: Uuid, email: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM customers
                WHERE tenant_id = $1 AND email = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(email)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryCustomerRepository {
    customers: Table<Customer>,
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self { customers: table() }
    }
}

fn matches_filters(c: &Customer, filters: &CustomerFilters) -> bool {
    if !filters.include_inactive.unwrap_or(false) && !c.is_active {
        return false;
    }
    match filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => {
            let needle = search.to_lowercase();
            c.first_name.to_lowercase().contains(&needle)
                || contains_ci(c.last_name.as_deref(), &needle)
                || contains_ci(c.email.as_deref(), &needle)
                || contains_ci(c.cpf.as_deref(), &needle)
        }
        None => true,
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create(&self, customer: &Customer) -> Result<Customer, AppError> {
        let mut rows = self.customers.write().await;
        if let Some(email) = &customer.email {
            let duplicated = rows
                .values()
                .any(|c| c.tenant_id == customer.tenant_id && c.email.as_ref() == Some(email));
            if duplicated {
                return Err(AppError::Conflict("Já existe um cliente com este e-mail.".into()));
            }
        }
        rows.insert(customer.id, customer.clone());
        Ok(customer.clone())
    }

    async fn update(&self, customer: &Customer) -> Result<Customer, AppError> {
        let mut rows = self.customers.write().await;
        match rows.get_mut(&customer.id) {
            Some(existing) if existing.tenant_id == customer.tenant_id => {
                *existing = customer.clone();
                Ok(customer.clone())
            }
            _ => Err(AppError::NotFound("Cliente não encontrado.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let rows = self.customers.read().await;
        Ok(rows.get(&id).filter(|c| c.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CustomerFilters,
        page: &PageRequest,
    ) -> Result<Page<Customer>, AppError> {
        let rows = self.customers.read().await;
        let mut items: Vec<Customer> = rows
            .values()
            .filter(|c| c.tenant_id == tenant_id && matches_filters(c, filters))
            .cloned()
            .collect();
        drop(rows);

        let column = sort_column(page);
        sort_rows(
            &mut items,
            page.order_or(SortOrder::Asc),
            |a, b| match column {
                "last_name" => a.last_name.cmp(&b.last_name),
                "email" => a.email.cmp(&b.email),
                "created_at" => a.created_at.cmp(&b.created_at),
                _ => cmp_ci(&a.first_name, &b.first_name),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(paginate(items, page))
    }

    async fn email_exists(&self, tenant_id: Uuid, email: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let rows = self.customers.read().await;
        Ok(rows.values().any(|c| {
            c.tenant_id == tenant_id && c.email.as_deref() == Some(email) && Some(c.id) != exclude_id
        }))
    }
}
