// src/db/catalog_repo.rs

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
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
    models::catalog::{
        CatalogFilters, CatalogStatistics, ItemType, MaterialService, PriceHistory, StockMovement,
    },
};

const SORTABLE: [&str; 6] = ["name", "code", "category", "unitPrice", "stockQuantity", "createdAt"];

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create(&self, item: &MaterialService) -> Result<MaterialService, AppError>;
    async fn update(&self, item: &MaterialService) -> Result<MaterialService, AppError>;
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MaterialService>, AppError>;
    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CatalogFilters,
        page: &PageRequest,
    ) -> Result<Page<MaterialService>, AppError>;
    async fn code_exists(&self, tenant_id: Uuid, code: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError>;
    async fn barcode_exists(
        &self,
        tenant_id: Uuid,
        barcode: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<bool, AppError>;
    async fn statistics(&self, tenant_id: Uuid) -> Result<CatalogStatistics, AppError>;

    /// Grava a nova quantidade e a movimentação na mesma transação.
    async fn apply_stock_movement(
        &self,
        item: &MaterialService,
        movement: &StockMovement,
    ) -> Result<MaterialService, AppError>;
    /// Grava o novo preço e o histórico na mesma transação.
    async fn apply_price_change(
        &self,
        item: &MaterialService,
        history: &PriceHistory,
    ) -> Result<MaterialService, AppError>;
    async fn stock_movements(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<StockMovement>, AppError>;
    async fn price_history(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<PriceHistory>, AppError>;
}

fn sort_column(page: &PageRequest) -> &'static str {
    match page.sort_key(&SORTABLE, "name") {
        "code" => "code",
        "category" => "category",
        "unitPrice" => "unit_price",
        "stockQuantity" => "stock_quantity",
        "createdAt" => "created_at",
        _ => "name",
    }
}

const DUPLICATED: &str = "Já existe um item com este código ou código de barras.";

// =========================================================================
//  POSTGRES
// =========================================================================

#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &CatalogFilters) {
    if !filters.include_inactive.unwrap_or(false) {
        qb.push(" AND is_active = TRUE");
    }
    if let Some(search) = filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR code ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR barcode ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR sku ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(item_type) = filters.item_type {
        qb.push(" AND item_type = ").push_bind(item_type);
    }
    if let Some(category) = &filters.category {
        qb.push(" AND category ILIKE ").push_bind(category.clone());
    }
    if let Some(tag) = &filters.tag {
        qb.push(" AND ").push_bind(tag.clone()).push(" = ANY(tags)");
    }
    if filters.low_stock.unwrap_or(false) {
        qb.push(" AND stock_quantity IS NOT NULL AND minimum_stock IS NOT NULL AND stock_quantity <= minimum_stock");
    }
    if let Some(min) = filters.min_price {
        qb.push(" AND unit_price >= ").push_bind(min);
    }
    if let Some(max) = filters.max_price {
        qb.push(" AND unit_price <= ").push_bind(max);
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn create(&self, i: &MaterialService) -> Result<MaterialService, AppError> {
        sqlx::query_as::<_, MaterialService>(
            r#"
            INSERT INTO materials_services (
                id, tenant_id, item_type, category, subcategory, code, name, description, unit,
                unit_price, currency, barcode, sku, manufacturer, supplier,
                stock_quantity, minimum_stock, maximum_stock, stock_location, expiration_date,
                serial_numbers, tags, is_active, created_by, updated_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            RETURNING *
            "#,
        )
        .bind(i.id)
        .bind(i.tenant_id)
        .bind(i.item_type)
        .bind(&i.category)
        .bind(&i.subcategory)
        .bind(&i.code)
        .bind(&i.name)
        .bind(&i.description)
        .bind(&i.unit)
        .bind(i.unit_price)
        .bind(&i.currency)
        .bind(&i.barcode)
        .bind(&i.sku)
        .bind(&i.manufacturer)
        .bind(&i.supplier)
        .bind(i.stock_quantity)
        .bind(i.minimum_stock)
        .bind(i.maximum_stock)
        .bind(&i.stock_location)
        .bind(i.expiration_date)
        .bind(&i.serial_numbers)
        .bind(&i.tags)
        .bind(i.is_active)
        .bind(i.created_by)
        .bind(i.updated_by)
        .bind(i.created_at)
        .bind(i.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATED))
    }

    async fn update(&self, i: &MaterialService) -> Result<MaterialService, AppError> {
        sqlx::query_as::<_, MaterialService>(
            r#"
            UPDATE materials_services SET
                category = $3, subcategory = $4, code = $5, name = $6, description = $7, unit = $8,
                unit_price = $9, currency = $10, barcode = $11, sku = $12, manufacturer = $13,
                supplier = $14, stock_quantity = $15, minimum_stock = $16, maximum_stock = $17,
                stock_location = $18, expiration_date = $19, serial_numbers = $20, tags = $21,
                is_active = $22, updated_by = $23, updated_at = $24
            WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(i.tenant_id)
        .bind(i.id)
        .bind(&i.category)
        .bind(&i.subcategory)
        .bind(&i.code)
        .bind(&i.name)
        .bind(&i.description)
        .bind(&i.unit)
        .bind(i.unit_price)
        .bind(&i.currency)
        .bind(&i.barcode)
        .bind(&i.sku)
        .bind(&i.manufacturer)
        .bind(&i.supplier)
        .bind(i.stock_quantity)
        .bind(i.minimum_stock)
        .bind(i.maximum_stock)
        .bind(&i.stock_location)
        .bind(i.expiration_date)
        .bind(&i.serial_numbers)
        .bind(&i.tags)
        .bind(i.is_active)
        .bind(i.updated_by)
        .bind(i.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, DUPLICATED))?
        .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MaterialService>, AppError> {
        let item = sqlx::query_as::<_, MaterialService>(
            "SELECT * FROM materials_services WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CatalogFilters,
        page: &PageRequest,
    ) -> Result<Page<MaterialService>, AppError> {
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM materials_services WHERE tenant_id = ");
        count_qb.push_bind(tenant_id);
        push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::new("SELECT * FROM materials_services WHERE tenant_id = ");
        qb.push_bind(tenant_id);
        push_filters(&mut qb, filters);
        qb.push(format!(
            " ORDER BY {} {} NULLS LAST, id ASC",
            sort_column(page),
            page.order_or(SortOrder::Asc).as_sql()
        ));
        qb.push(" LIMIT ").push_bind(page.limit as i64);
        qb.push(" OFFSET ").push_bind(page.offset() as i64);

        let items = qb.build_query_as::<MaterialService>().fetch_all(&self.pool).await?;
        Ok(Page {
            items,
            total: total as u64,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn code_exists(&self, tenant_id: Uuid, code: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM materials_services
                WHERE tenant_id = $1 AND code = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(code)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn barcode_exists(&self, tenant_id: Uuid, barcode: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM materials_services
                WHERE tenant_id = $1 AND barcode = $2 AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(tenant_id)
        .bind(barcode)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn statistics(&self, tenant_id: Uuid) -> Result<CatalogStatistics, AppError> {
        let (total, active, materials, services, low_stock, inventory_value): (i64, i64, i64, i64, i64, Decimal) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE is_active),
                    COUNT(*) FILTER (WHERE is_active AND item_type = 'material'),
                    COUNT(*) FILTER (WHERE is_active AND item_type = 'service'),
                    COUNT(*) FILTER (WHERE is_active AND stock_quantity <= minimum_stock),
                    COALESCE(SUM(stock_quantity * unit_price)
                        FILTER (WHERE is_active AND item_type = 'material'), 0)
                FROM materials_services
                WHERE tenant_id = $1
                "#,
            )
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        let by_category: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT category, COUNT(*) FROM materials_services
            WHERE tenant_id = $1 AND is_active
            GROUP BY category
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(CatalogStatistics {
            total: total as u64,
            active: active as u64,
            materials: materials as u64,
            services: services as u64,
            low_stock: low_stock as u64,
            by_category: by_category.into_iter().map(|(k, v)| (k, v as u64)).collect(),
            inventory_value,
        })
    }

    async fn apply_stock_movement(
        &self,
        item: &MaterialService,
        movement: &StockMovement,
    ) -> Result<MaterialService, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, MaterialService>(
            r#"
            UPDATE materials_services
               SET stock_quantity = $3, updated_by = $4, updated_at = $5
             WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(item.tenant_id)
        .bind(item.id)
        .bind(item.stock_quantity)
        .bind(item.updated_by)
        .bind(item.updated_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))?;

        sqlx::query(
            r#"
            INSERT INTO stock_movements (
                id, tenant_id, item_id, movement_type, previous_quantity, new_quantity,
                quantity_changed, reason, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(movement.id)
        .bind(movement.tenant_id)
        .bind(movement.item_id)
        .bind(movement.movement_type)
        .bind(movement.previous_quantity)
        .bind(movement.new_quantity)
        .bind(movement.quantity_changed)
        .bind(&movement.reason)
        .bind(movement.created_by)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn apply_price_change(
        &self,
        item: &MaterialService,
        history: &PriceHistory,
    ) -> Result<MaterialService, AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_as::<_, MaterialService>(
            r#"
            UPDATE materials_services
               SET unit_price = $3, updated_by = $4, updated_at = $5
             WHERE tenant_id = $1 AND id = $2
            RETURNING *
            "#,
        )
        .bind(item.tenant_id)
        .bind(item.id)
        .bind(item.unit_price)
        .bind(item.updated_by)
        .bind(item.updated_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))?;

        sqlx::query(
            r#"
            INSERT INTO price_history (
                id, tenant_id, item_id, previous_price, new_price, currency, reason, changed_by, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(history.id)
        .bind(history.tenant_id)
        .bind(history.item_id)
        .bind(history.previous_price)
        .bind(history.new_price)
        .bind(&history.currency)
        .bind(&history.reason)
        .bind(history.changed_by)
        .bind(history.changed_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn stock_movements(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE tenant_id = $1 AND item_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    async fn price_history(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<PriceHistory>, AppError> {
        let history = sqlx::query_as::<_, PriceHistory>(
            r#"
            SELECT * FROM price_history
            WHERE tenant_id = $1 AND item_id = $2
            ORDER BY changed_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(history)
    }
}

// =========================================================================
//  MEMÓRIA
// =========================================================================

#[derive(Clone, Default)]
pub struct InMemoryCatalogRepository {
    items: Table<MaterialService>,
    movements: Arc<RwLock<Vec<StockMovement>>>,
    prices: Arc<RwLock<Vec<PriceHistory>>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self {
            items: table(),
            ..Default::default()
        }
    }
}

fn matches_filters(i: &MaterialService, filters: &CatalogFilters) -> bool {
    if !filters.include_inactive.unwrap_or(false) && !i.is_active {
        return false;
    }
    if let Some(search) = filters.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        let hit = i.name.to_lowercase().contains(&needle)
            || i.code.to_lowercase().contains(&needle)
            || contains_ci(i.description.as_deref(), &needle)
            || contains_ci(i.barcode.as_deref(), &needle)
            || contains_ci(i.sku.as_deref(), &needle);
        if !hit {
            return false;
        }
    }
    filters.item_type.is_none_or(|t| i.item_type == t)
        && filters
            .category
            .as_deref()
            .is_none_or(|c| i.category.eq_ignore_ascii_case(c))
        && filters.tag.as_deref().is_none_or(|t| i.tags.iter().any(|tag| tag == t))
        && (!filters.low_stock.unwrap_or(false) || i.is_low_stock())
        && filters.min_price.is_none_or(|min| i.unit_price >= min)
        && filters.max_price.is_none_or(|max| i.unit_price <= max)
}

fn unique_clash(rows: &HashMap<Uuid, MaterialService>, item: &MaterialService) -> bool {
    rows.values().any(|other| {
        other.tenant_id == item.tenant_id
            && other.id != item.id
            && (other.code == item.code || (item.barcode.is_some() && other.barcode == item.barcode))
    })
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn create(&self, item: &MaterialService) -> Result<MaterialService, AppError> {
        let mut rows = self.items.write().await;
        if unique_clash(&rows, item) {
            return Err(AppError::Conflict(DUPLICATED.into()));
        }
        rows.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn update(&self, item: &MaterialService) -> Result<MaterialService, AppError> {
        let mut rows = self.items.write().await;
        if unique_clash(&rows, item) {
            return Err(AppError::Conflict(DUPLICATED.into()));
        }
        match rows.get_mut(&item.id) {
            Some(existing) if existing.tenant_id == item.tenant_id => {
                *existing = item.clone();
                Ok(item.clone())
            }
            _ => Err(AppError::NotFound("Item não encontrado.".into())),
        }
    }

    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<MaterialService>, AppError> {
        let rows = self.items.read().await;
        Ok(rows.get(&id).filter(|i| i.tenant_id == tenant_id).cloned())
    }

    async fn find_with_filters(
        &self,
        tenant_id: Uuid,
        filters: &CatalogFilters,
        page: &PageRequest,
    ) -> Result<Page<MaterialService>, AppError> {
        let rows = self.items.read().await;
        let mut items: Vec<MaterialService> = rows
            .values()
            .filter(|i| i.tenant_id == tenant_id && matches_filters(i, filters))
            .cloned()
            .collect();
        drop(rows);

        let column = sort_column(page);
        sort_rows(
            &mut items,
            page.order_or(SortOrder::Asc),
            |a, b| match column {
                "code" => a.code.cmp(&b.code),
                "category" => cmp_ci(&a.category, &b.category),
                "unit_price" => a.unit_price.cmp(&b.unit_price),
                "stock_quantity" => a.stock_quantity.cmp(&b.stock_quantity),
                "created_at" => a.created_at.cmp(&b.created_at),
                _ => cmp_ci(&a.name, &b.name),
            },
            |a, b| a.id.cmp(&b.id),
        );
        Ok(paginate(items, page))
    }

    async fn code_exists(&self, tenant_id: Uuid, code: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let rows = self.items.read().await;
        Ok(rows
            .values()
            .any(|i| i.tenant_id == tenant_id && i.code == code && Some(i.id) != exclude_id))
    }

    async fn barcode_exists(&self, tenant_id: Uuid, barcode: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
        let rows = self.items.read().await;
        Ok(rows.values().any(|i| {
            i.tenant_id == tenant_id && i.barcode.as_deref() == Some(barcode) && Some(i.id) != exclude_id
        }))
    }

    async fn statistics(&self, tenant_id: Uuid) -> Result<CatalogStatistics, AppError> {
        let rows = self.items.read().await;
        let mut stats = CatalogStatistics::default();
        for i in rows.values().filter(|i| i.tenant_id == tenant_id) {
            stats.total += 1;
            if !i.is_active {
                continue;
            }
            stats.active += 1;
            match i.item_type {
                ItemType::Material => {
                    stats.materials += 1;
                    if let Some(qty) = i.stock_quantity {
                        // Satura no limite do Decimal em vez de estourar
                        stats.inventory_value = stats
                            .inventory_value
                            .saturating_add(qty.saturating_mul(i.unit_price));
                    }
                }
                ItemType::Service => stats.services += 1,
            }
            if i.is_low_stock() {
                stats.low_stock += 1;
            }
            *stats.by_category.entry(i.category.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn apply_stock_movement(
        &self,
        item: &MaterialService,
        movement: &StockMovement,
    ) -> Result<MaterialService, AppError> {
        // Mesmo lock para item e histórico: as duas gravações são vistas juntas
        let mut rows = self.items.write().await;
        let existing = rows
            .get_mut(&item.id)
            .filter(|i| i.tenant_id == item.tenant_id)
            .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))?;
        existing.stock_quantity = item.stock_quantity;
        existing.updated_by = item.updated_by;
        existing.updated_at = item.updated_at;
        let updated = existing.clone();
        self.movements.write().await.push(movement.clone());
        Ok(updated)
    }

    async fn apply_price_change(
        &self,
        item: &MaterialService,
        history: &PriceHistory,
    ) -> Result<MaterialService, AppError> {
        let mut rows = self.items.write().await;
        let existing = rows
            .get_mut(&item.id)
            .filter(|i| i.tenant_id == item.tenant_id)
            .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))?;
        existing.unit_price = item.unit_price;
        existing.updated_by = item.updated_by;
        existing.updated_at = item.updated_at;
        let updated = existing.clone();
        self.prices.write().await.push(history.clone());
        Ok(updated)
    }

    async fn stock_movements(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let movements = self.movements.read().await;
        // Inseridos em ordem cronológica; mais recentes primeiro
        Ok(movements
            .iter()
            .rev()
            .filter(|m| m.tenant_id == tenant_id && m.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn price_history(&self, tenant_id: Uuid, item_id: Uuid) -> Result<Vec<PriceHistory>, AppError> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .rev()
            .filter(|p| p.tenant_id == tenant_id && p.item_id == item_id)
            .cloned()
            .collect())
    }
}
