// src/db/company_repo.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
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
    models::company::{Company, CompanyCustomer, CompanyFilters, CompanyStatistics},
};

const SORTABLE: [&str; 6] = ["name", "createdAt", "updatedAt", "status", "size", "city"];

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn create(&self, company: &Company) -> Result<Company, AppError>;
    async fn update(&self, company: &Company) -> Result<Company, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Company>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CompanyFilters,
        page: &PageRequest,
    ) -> Result<Page<Company>, AppError>;
    /// `exclude_id` ignora a própria empresa numa atualização.
    async fn cnpj_exists(
        &self,
        tenant_id: Uuid,
        cnpj: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError>;
    /// Conta todas as empresas do tenant, inclusive as excluídas.
    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError>;
    async fn statistics(&self, tenant_id: Uuid) -> Result<CompanyStatistics, AppError>;

    // --- Vínculo com clientes ---
    async fn find_customer_link(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<CompanyCustomer>, AppError>;
    /// Cria ou reativa o vínculo. Se `is_primary`, os demais deixam de ser principais.
    async fn link_customer(&self, link: &CompanyCustomer) -> Result<CompanyCustomer, AppError>;
    async fn unlink_customer(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<bool, AppError>;
    async fn list_customer_links(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
    ) -> Result<Vec<CompanyCustomer>, AppError>;
    async fn count_active_customers(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError>;
    /// Usado quando o cliente é excluído.
    async fn deactivate_links_for_customer(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<(), AppError>;
}

fn sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&SORTABLE, "name") {
        "createdAt" => "created_at",
        "updatedAt" => "updated_at",
        "status" => "status",
        "size" => "size",
        "city" => "city",
        _ => "name",
    }
}

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn group_counts(&self, column: &str, tenant_id: Uuid) -> Result<BTreeMap<String, u64>, AppError> {
        // `column` vem sempre de constantes internas
        let sql = format!(
            "SELECT {column}::text, COUNT(*) FROM companies \
             WHERE tenant_id = $1 AND is_active AND {column} IS NOT NULL GROUP BY 1"
        );
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(k, v)| (k, v as u64)).collect())
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &CompanyFilters) {
    if !filters.include_inactive.unwrap_or(false) {
        qb.push(" AND is_active = TRUE");
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR display_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR cnpj ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filters.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(size) = filters.size {
        qb.push(" AND size = ").push_bind(size);
    }
    if let Some(tier) = filters.subscription_tier {
        qb.push(" AND subscription_tier = ").push_bind(tier);
    }
    if let Some(industry) = &filters.industry {
        qb.push(" AND industry ILIKE ").push_bind(industry.clone());
    }
    if let Some(state) = &filters.state {
        qb.push(" AND state = ").push_bind(state.to_uppercase());
    }
    if let Some(city) = &filters.city {
        qb.push(" AND city ILIKE ").push_bind(city.clone());
    }
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create(&self, c: &Company) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (
                id, tenant_id, name, display_name, description, cnpj, industry,
                size, status, subscription_tier, email, phone, website,
                address, address_number, complement, neighborhood, city, state, zip_code, country,
                is_active, created_by, updated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26)
            RETURNING *
            "#,
        )
        .bind(c.id)
        .bind(c.tenant_id)
        .bind(&c.name)
        .bind(&c.display_name)
        .bind(&c.description)
        .bind(&c.cnpj)
        .bind(&c.industry)
        .bind(c.size)
        .bind(c.status)
        .bind(c.subscription_tier)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.website)
        .bind(&c.address)
        .bind(&c.address_number)
        .bind(&c.complement)
        .bind(&c.neighborhood)
        .bind(&c.city)
        .bind(&c.state)
        .bind(&c.zip_code)
        .bind(&c.country)
        .bind(c.is_active)
        .bind(c.created_by)
        .bind(c.updated_by)
        .bind(c.created_at)
        .bind(c.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe uma empresa com este CNPJ."))
    }

    async fn update(&self, c: &Company) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies SET
                name = $3, display_name = $4, description = $5, cnpj = $6, industry = $7,
                size = $8, status = $9, subscription_tier = $10,
                email = $11, phone = $12, website = $13,
                address = $14, address_number = $15, complement = $16, neighborhood = $17,
                city = $18, state = $19, zip_code = $20, country = $21,
                is_active = $22, updated_by = $23, updated_at = $24
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(c.tenant_id)
        .bind(c.id)
        .bind(&c.name)
        .bind(&c.display_name)
        .bind(&c.description)
        .bind(&c.cnpj)
        .bind(&c.industry)
        .bind(c.size)
        .bind(c.status)
        .bind(c.subscription_tier)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.website)
        .bind(&c.address)
        .bind(&c.address_number)
        .bind(&c.complement)
        .bind(&c.neighborhood)
        .bind(&c.city)
        .bind(&c.state)
        .bind(&c.zip_code)
        .bind(&c.country)
        .bind(c.is_active)
        .bind(c.updated_by)
        .bind(c.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe uma empresa com este CNPJ."))?
        .ok_or_else(|| AppError::NotFound("Empresa não encontrada.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Company>, AppError> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT * FROM companies WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(company)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CompanyFilters,
        page: &PageRequest,
    ) -> Result<Page<Company>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM companies WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM companies WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {}, id ASC",
            sort_column(page),
            page.order_or(SortOrder::Asc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<Company>().fetch_all(&self.pool).await?;

        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn cnpj_exists(&self, tenant_id: Uuid, cnpj: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM companies
                WHERE tenant_id = $1 AND cnpj = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(cnpj)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(total as u64)
    }

    async fn statistics(&self, tenant_id: Uuid) -> Result<CompanyStatistics, AppError> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM companies WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CompanyStatistics {
            total: total as u64,
            active: active as u64,
            inactive: (total - active) as u64,
            by_status: self.group_counts("status", tenant_id).await?,
            by_size: self.group_counts("size", tenant_id).await?,
            by_subscription: self.group_counts("subscription_tier", tenant_id).await?,
            by_state: self.group_counts("state", tenant_id).await?,
        })
    }

    async fn find_customer_link(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<CompanyCustomer>, AppError> {
        let link = sqlx::query_as::<_, CompanyCustomer>(
            r#"
            SELECT * FROM company_customers
            WHERE tenant_id = $1 AND company_id = $2 AND customer_id = $3
            "#,
        )
        .bind(tenant_id)
        .bind(company_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn link_customer(&self, link: &CompanyCustomer) -> Result<CompanyCustomer, AppError> {
        let mut tx = self.pool.begin().await?;

        if link.is_primary {
            sqlx::query(
                r#"
                UPDATE company_customers SET is_primary = FALSE
                WHERE tenant_id = $1 AND company_id = $2 AND customer_id <> $3
                "#,
            )
            .bind(link.tenant_id)
            .bind(link.company_id)
            .bind(link.customer_id)
            .execute(&mut *tx)
            .await?;
        }

        let saved = sqlx::query_as::<_, CompanyCustomer>(
            r#"
            INSERT INTO company_customers (company_id, customer_id, tenant_id, role, is_primary, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            ON CONFLICT (company_id, customer_id) DO UPDATE
               SET role = EXCLUDED.role, is_primary = EXCLUDED.is_primary, is_active = TRUE
            RETURNING *
            "#,
        )
        .bind(link.company_id)
        .bind(link.customer_id)
        .bind(link.tenant_id)
        .bind(&link.role)
        .bind(link.is_primary)
        .bind(link.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn unlink_customer(&self, tenant_id: Uuid, company_id: Uuid, customer_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE company_customers SET is_active = FALSE, is_primary = FALSE
            WHERE tenant_id = $1 AND company_id = $2 AND customer_id = $3 AND is_active
            "#,
        )
        .bind(tenant_id)
        .bind(company_id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_customer_links(&self, tenant_id: Uuid, company_id: Uuid) -> Result<Vec<CompanyCustomer>, AppError> {
        let links = sqlx::query_as::<_, CompanyCustomer>(
            r#"
            SELECT * FROM company_customers
            WHERE tenant_id = $1 AND company_id = $2 AND is_active
            ORDER BY is_primary DESC, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(links)
    }

    async fn count_active_customers(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM company_customers WHERE tenant_id = $1 AND company_id = $2 AND is_active",
        )
        .bind(tenant_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(total as u64)
    }

    async fn deactivate_links_for_customer(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE company_customers SET is_active = FALSE, is_primary = FALSE
            WHERE tenant_id = $1 AND customer_id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryCompanyRepository {
    companies: Table<Company>,
    links: Arc<RwLock<HashMap<(Uuid, Uuid), CompanyCustomer>>>,
}

impl InMemoryCompanyRepository {
    pub fn new() -> Self {
        Self {
            companies: table(),
            links: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

fn matches_filters(c: &Company, filters: &CompanyFilters) -> bool {
    if !filters.include_inactive.unwrap_or(false) && !c.is_active {
        return false;
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let needle = search.trim().to_lowercase();
        let hit = c.name.to_lowercase().contains(&needle)
            || contains_ci(c.display_name.as_deref(), &needle)
            || contains_ci(c.cnpj.as_deref(), &needle)
            || contains_ci(c.email.as_deref(), &needle);
        if !hit {
            return false;
        }
    }
    filters.status.is_none_or(|s| c.status == s)
        && filters.size.is_none_or(|s| c.size == s)
        && filters.subscription_tier.is_none_or(|t| c.subscription_tier == t)
        && filters
            .industry
            .as_deref()
            .is_none_or(|i| c.industry.as_deref().is_some_and(|ci| ci.eq_ignore_ascii_case(i)))
        && filters
            .state
            .as_deref()
            .is_none_or(|s| c.state.as_deref().is_some_and(|cs| cs.eq_ignore_ascii_case(s)))
        && filters
            .city
            .as_deref()
            .is_none_or(|city| c.city.as_deref().is_some_and(|cc| cmp_ci(cc, city).is_eq()))
}

fn bump(map: &mut BTreeMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

#[async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn create(&self, company: &Company) -> Result<Company, AppError> {
        let mut rows = self.companies.write().await;
        if let Some(cnpj) = &company.cnpj {
            let duplicated = rows
                .values()
                .any(|c| c.tenant_id == company.tenant_id && c.cnpj.as_ref() == Some(cnpj));
            if duplicated {
                return Err(AppError::Conflict("Já existe uma empresa com este CNPJ.".into()));
            }
        }
        rows.insert(company.id, company.clone());
        Ok(company.clone())
    }

    async fn update(&self, company: &Company) -> Result<Company, AppError> {
        let mut rows = self.companies.write().await;
        match rows.get_mut(&company.id) {
            Some(existing) if existing.tenant_id == company.tenant_id => {
                *existing = company.clone();
                Ok(company.clone())
            }
            _ => Err(AppError::NotFound("Empresa não encontrada.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<Company>, AppError> {
        let rows = self.companies.read().await;
        Ok(rows.get(&id).filter(|c| c.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CompanyFilters,
        page: &PageRequest,
    ) -> Result<Page<Company>, AppError> {
        let rows = self.companies.read().await;
        let mut items: Vec<Company> = rows
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
                "created_at" => a.created_at.cmp(&b.created_at),
                "updated_at" => a.updated_at.cmp(&b.updated_at),
                "status" => a.status.as_str().cmp(b.status.as_str()),
                "size" => a.size.as_str().cmp(b.size.as_str()),
                "city" => a.city.cmp(&b.city),
                _ => cmp_ci(&a.name, &b.name),
            },
            |a, b| a.id.cmp(&b.id),
        );

        Ok(paginate(items, page))
    }

    async fn cnpj_exists(&self, tenant_id: Uuid, cnpj: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let rows = self.companies.read().await;
        Ok(rows.values().any(|c| {
            c.tenant_id == tenant_id && c.cnpj.as_deref() == Some(cnpj) && Some(c.id) != exclude_id
        }))
    }

    async fn count(&self, tenant_id: Uuid) -> Result<u64, AppError> {
        let rows = self.companies.read().await;
        Ok(rows.values().filter(|c| c.tenant_id == tenant_id).count() as u64)
    }

    async fn statistics(&self, tenant_id: Uuid) -> Result<CompanyStatistics, AppError> {
        let rows = self.companies.read().await;
        let mut stats = CompanyStatistics::default();
        for c in rows.values().filter(|c| c.tenant_id == tenant_id) {
            stats.total += 1;
            if !c.is_active {
                stats.inactive += 1;
                continue;
            }
            stats.active += 1;
            bump(&mut stats.by_status, c.status.as_str());
            bump(&mut stats.by_size, c.size.as_str());
            bump(&mut stats.by_subscription, c.subscription_tier.as_str());
            if let Some(state) = &c.state {
                bump(&mut stats.by_state, state);
            }
        }
        Ok(stats)
    }

    async fn find_customer_link(
        &self,
        tenant_id: Uuid,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<CompanyCustomer>, AppError> {
        let links = self.links.read().await;
        Ok(links
            .get(&(company_id, customer_id))
            .filter(|l| l.tenant_id == tenant_id)
            .cloned())
    }

    async fn link_customer(&self, link: &CompanyCustomer) -> Result<CompanyCustomer, AppError> {
        let mut links = self.links.write().await;
        if link.is_primary {
            for other in links
                .values_mut()
                .filter(|l| l.company_id == link.company_id && l.customer_id != link.customer_id)
            {
                other.is_primary = false;
            }
        }
        let saved = links
            .entry((link.company_id, link.customer_id))
            .and_modify(|existing| {
                existing.role = link.role.clone();
                existing.is_primary = link.is_primary;
                existing.is_active = true;
            })
            .or_insert_with(|| CompanyCustomer {
                is_active: true,
                ..link.clone()
            })
            .clone();
        Ok(saved)
    }

    async fn unlink_customer(&self, tenant_id: Uuid, company_id: Uuid, customer_id: Uuid) -> Result<bool, AppError> {
        let mut links = self.links.write().await;
        match links.get_mut(&(company_id, customer_id)) {
            Some(link) if link.tenant_id == tenant_id && link.is_active => {
                link.is_active = false;
                link.is_primary = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_customer_links(&self, tenant_id: Uuid, company_id: Uuid) -> Result<Vec<CompanyCustomer>, AppError> {
        let links = self.links.read().await;
        let mut items: Vec<CompanyCustomer> = links
            .values()
            .filter(|l| l.tenant_id == tenant_id && l.company_id == company_id && l.is_active)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.is_primary
                .cmp(&a.is_primary)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
        Ok(items)
    }

    async fn count_active_customers(&self, tenant_id: Uuid, company_id: Uuid) -> Result<u64, AppError> {
        let links = self.links.read().await;
        Ok(links
            .values()
            .filter(|l| l.tenant_id == tenant_id && l.company_id == company_id && l.is_active)
            .count() as u64)
    }

    async fn deactivate_links_for_customer(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<(), AppError> {
        let mut links = self.links.write().await;
        for link in links
            .values_mut()
            .filter(|l| l.tenant_id == tenant_id && l.customer_id == customer_id)
        {
            link.is_active = false;
            link.is_primary = false;
        }
        Ok(())
    }
}
