// src/services/catalog_service.rs

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        br_documents::only_digits,
        error::AppError,
        pagination::{Page, PageRequest},
        validation::trim_opt,
    },
    db::CatalogRepository,
    models::catalog::{
        CatalogFilters, CatalogStatistics, CreateMaterialService, ItemType, MaterialService,
        PriceHistory, StockMovement, StockOperation, TagsPayload, UpdateMaterialService,
        UpdatePrice, UpdateStock,
    },
    validators::catalog::validate_catalog_item,
};

#[derive(Clone)]
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
}

// --- Normalização ---

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !result.contains(&tag) {
            result.push(tag);
        }
    }
    result
}

fn normalize_item(item: &mut MaterialService) {
    item.code = item.code.trim().to_uppercase();
    item.name = item.name.trim().to_string();
    item.category = item.category.trim().to_string();
    item.unit = match item.unit.trim() {
        "" => "UN".to_string(),
        unit => unit.to_string(),
    };
    item.currency = match item.currency.trim() {
        "" => "BRL".to_string(),
        currency => currency.to_uppercase(),
    };
    item.barcode = trim_opt(item.barcode.take()).map(|b| only_digits(&b));
    item.subcategory = trim_opt(item.subcategory.take());
    item.description = trim_opt(item.description.take());
    item.sku = trim_opt(item.sku.take());
    item.manufacturer = trim_opt(item.manufacturer.take());
    item.supplier = trim_opt(item.supplier.take());
    item.stock_location = trim_opt(item.stock_location.take());
    item.tags = normalize_tags(std::mem::take(&mut item.tags));
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>) -> Self {
        Self { repo }
    }

    async fn ensure_unique(&self, item: &MaterialService, exclude_id: Option<Uuid>) -> Result<(), AppError> {
        if self.repo.code_exists(item.tenant_id, &item.code, exclude_id).await? {
            return Err(AppError::Conflict(format!(
                "Já existe um item com o código {}.",
                item.code
            )));
        }
        if let Some(barcode) = &item.barcode {
            if self
                .repo
                .barcode_exists(item.tenant_id, barcode, exclude_id)
                .await?
            {
                return Err(AppError::Conflict(
                    "Já existe um item com este código de barras.".into(),
                ));
            }
        }
        Ok(())
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        payload: CreateMaterialService,
    ) -> Result<MaterialService, AppError> {
        payload.validate()?;

        let now = Utc::now();
        let mut item = MaterialService {
            id: Uuid::new_v4(),
            tenant_id,
            item_type: payload.item_type,
            category: payload.category,
            subcategory: payload.subcategory,
            code: payload.code,
            name: payload.name,
            description: payload.description,
            unit: payload.unit.unwrap_or_default(),
            unit_price: payload.unit_price,
            currency: payload.currency.unwrap_or_default(),
            barcode: payload.barcode,
            sku: payload.sku,
            manufacturer: payload.manufacturer,
            supplier: payload.supplier,
            stock_quantity: payload.stock_quantity,
            minimum_stock: payload.minimum_stock,
            maximum_stock: payload.maximum_stock,
            stock_location: payload.stock_location,
            expiration_date: payload.expiration_date,
            serial_numbers: payload.serial_numbers,
            tags: payload.tags,
            is_active: true,
            created_by: actor,
            updated_by: actor,
            created_at: now,
            updated_at: now,
        };
        normalize_item(&mut item);
        validate_catalog_item(&item).into_result()?;
        self.ensure_unique(&item, None).await?;

        let created = self.repo.create(&item).await?;
        tracing::info!(
            "Item de catálogo criado: {} ({}) [{}]",
            created.code,
            created.id,
            created.item_type.as_str()
        );
        Ok(created)
    }

    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<MaterialService, AppError> {
        self.repo
            .find_by_id(tenant_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Item não encontrado.".into()))
    }

    pub async fn list(
        &self,
        tenant_id: Uuid,
        filters: &CatalogFilters,
        page: &PageRequest,
    ) -> Result<Page<MaterialService>, AppError> {
        self.repo.find_with_filters(tenant_id, filters, page).await
    }

    pub async fn search(
        &self,
        tenant_id: Uuid,
        query: &str,
        page: &PageRequest,
    ) -> Result<Page<MaterialService>, AppError> {
        if query.trim().is_empty() {
            return Err(AppError::validation("q", "Informe o termo de busca."));
        }
        let filters = CatalogFilters {
            search: Some(query.trim().to_string()),
            ..Default::default()
        };
        self.repo.find_with_filters(tenant_id, &filters, page).await
    }

    pub async fn statistics(&self, tenant_id: Uuid) -> Result<CatalogStatistics, AppError> {
        self.repo.statistics(tenant_id).await
    }

    /// Atualização parcial. Quantidade e preço alterados aqui não geram histórico;
    /// para isso existem `update_stock` e `update_price`.
    pub async fn update(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        changes: UpdateMaterialService,
    ) -> Result<MaterialService, AppError> {
        let mut item = self.find_by_id(tenant_id, id).await?;

        if changes.item_type.is_some_and(|t| t != item.item_type) {
            return Err(AppError::BusinessRule(
                "O tipo do item não pode ser alterado.".into(),
            ));
        }

        if let Some(v) = changes.category {
            item.category = v;
        }
        if let Some(v) = changes.code {
            item.code = v;
        }
        if let Some(v) = changes.name {
            item.name = v;
        }
        if let Some(v) = changes.unit {
            item.unit = v;
        }
        if let Some(v) = changes.unit_price {
            item.unit_price = v;
        }
        if let Some(v) = changes.currency {
            item.currency = v;
        }
        if changes.subcategory.is_some() {
            item.subcategory = changes.subcategory;
        }
        if changes.description.is_some() {
            item.description = changes.description;
        }
        if changes.barcode.is_some() {
            item.barcode = changes.barcode;
        }
        if changes.sku.is_some() {
            item.sku = changes.sku;
        }
        if changes.manufacturer.is_some() {
            item.manufacturer = changes.manufacturer;
        }
        if changes.supplier.is_some() {
            item.supplier = changes.supplier;
        }
        if changes.stock_quantity.is_some() {
            item.stock_quantity = changes.stock_quantity;
        }
        if changes.minimum_stock.is_some() {
            item.minimum_stock = changes.minimum_stock;
        }
        if changes.maximum_stock.is_some() {
            item.maximum_stock = changes.maximum_stock;
        }
        if changes.stock_location.is_some() {
            item.stock_location = changes.stock_location;
        }
        if changes.expiration_date.is_some() {
            item.expiration_date = changes.expiration_date;
        }
        if let Some(v) = changes.serial_numbers {
            item.serial_numbers = v;
        }
        if let Some(v) = changes.tags {
            item.tags = v;
        }

        normalize_item(&mut item);
        validate_catalog_item(&item).into_result()?;
        self.ensure_unique(&item, Some(id)).await?;

        item.updated_by = actor;
        item.updated_at = Utc::now();
        self.repo.update(&item).await
    }

    pub async fn delete(&self, tenant_id: Uuid, actor: Option<Uuid>, id: Uuid) -> Result<MaterialService, AppError> {
        let mut item = self.find_by_id(tenant_id, id).await?;
        if !item.is_active {
            return Err(AppError::BusinessRule("O item já está inativo.".into()));
        }
        item.is_active = false;
        item.updated_by = actor;
        item.updated_at = Utc::now();
        let deleted = self.repo.update(&item).await?;
        tracing::info!("Item de catálogo excluído: {}", deleted.id);
        Ok(deleted)
    }

    // =========================================================================
    //  ESTOQUE E PREÇO
    // =========================================================================

    pub async fn update_stock(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdateStock,
    ) -> Result<MaterialService, AppError> {
        if payload.quantity.is_sign_negative() {
            return Err(AppError::validation("quantity", "A quantidade não pode ser negativa."));
        }

        let mut item = self.find_by_id(tenant_id, id).await?;
        if item.item_type == ItemType::Service {
            return Err(AppError::BusinessRule("Serviços não possuem controle de estoque.".into()));
        }

        let operation = payload.operation.unwrap_or(StockOperation::Set);
        let previous = item.stock_quantity.unwrap_or(Decimal::ZERO);
        let new_quantity = match operation {
            StockOperation::Set => Some(payload.quantity),
            StockOperation::Add => previous.checked_add(payload.quantity),
            StockOperation::Subtract => previous.checked_sub(payload.quantity),
        };
        let changed = new_quantity.and_then(|q| q.checked_sub(previous));
        let (Some(new_quantity), Some(changed)) = (new_quantity, changed) else {
            return Err(AppError::validation(
                "quantity",
                "A quantidade resultante excede o limite suportado.",
            ));
        };
        if new_quantity.is_sign_negative() {
            return Err(AppError::BusinessRule(format!(
                "Estoque insuficiente: disponível {previous}, solicitado {}.",
                payload.quantity
            )));
        }

        let now = Utc::now();
        item.stock_quantity = Some(new_quantity);
        item.updated_by = actor;
        item.updated_at = now;

        let movement = StockMovement {
            id: Uuid::new_v4(),
            tenant_id,
            item_id: id,
            movement_type: operation,
            previous_quantity: previous,
            new_quantity,
            quantity_changed: changed,
            reason: trim_opt(payload.reason),
            created_by: actor,
            created_at: now,
        };
        let updated = self.repo.apply_stock_movement(&item, &movement).await?;
        if updated.is_low_stock() {
            tracing::warn!("Estoque baixo para o item {} ({})", updated.code, updated.id);
        }
        Ok(updated)
    }

    pub async fn update_price(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        payload: UpdatePrice,
    ) -> Result<MaterialService, AppError> {
        if payload.unit_price.is_sign_negative() {
            return Err(AppError::validation("unitPrice", "O preço não pode ser negativo."));
        }

        let mut item = self.find_by_id(tenant_id, id).await?;
        let previous = item.unit_price;
        let now = Utc::now();
        item.unit_price = payload.unit_price;
        item.updated_by = actor;
        item.updated_at = now;

        let history = PriceHistory {
            id: Uuid::new_v4(),
            tenant_id,
            item_id: id,
            previous_price: previous,
            new_price: payload.unit_price,
            currency: item.currency.clone(),
            reason: trim_opt(payload.reason),
            changed_by: actor,
            changed_at: now,
        };
        let updated = self.repo.apply_price_change(&item, &history).await?;
        tracing::info!(
            "Preço do item {} alterado: {} -> {}",
            updated.code,
            previous,
            updated.unit_price
        );
        Ok(updated)
    }

    pub async fn stock_movements(&self, tenant_id: Uuid, id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        self.find_by_id(tenant_id, id).await?;
        self.repo.stock_movements(tenant_id, id).await
    }

    pub async fn price_history(&self, tenant_id: Uuid, id: Uuid) -> Result<Vec<PriceHistory>, AppError> {
        self.find_by_id(tenant_id, id).await?;
        self.repo.price_history(tenant_id, id).await
    }

    // =========================================================================
    //  TAGS
    // =========================================================================

    pub async fn add_tags(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        payload: TagsPayload,
    ) -> Result<MaterialService, AppError> {
        let mut item = self.find_by_id(tenant_id, id).await?;
        let mut tags = std::mem::take(&mut item.tags);
        tags.extend(payload.tags);
        item.tags = normalize_tags(tags);
        item.updated_by = actor;
        item.updated_at = Utc::now();
        self.repo.update(&item).await
    }

    pub async fn remove_tags(
        &self,
        tenant_id: Uuid,
        actor: Option<Uuid>,
        id: Uuid,
        payload: TagsPayload,
    ) -> Result<MaterialService, AppError> {
        let mut item = self.find_by_id(tenant_id, id).await?;
        let removed = normalize_tags(payload.tags);
        item.tags.retain(|t| !removed.contains(t));
        item.updated_by = actor;
        item.updated_at = Utc::now();
        self.repo.update(&item).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryCatalogRepository;

    fn service() -> CatalogService {
        CatalogService::new(Arc::new(InMemoryCatalogRepository::new()))
    }

    fn material(code: &str) -> CreateMaterialService {
        CreateMaterialService {
            item_type: ItemType::Material,
            category: "Ferramentas".into(),
            subcategory: None,
            code: code.into(),
            name: "Martelo de unha".into(),
            description: None,
            unit: None,
            unit_price: Decimal::new(3990, 2),
            currency: Some("brl".into()),
            barcode: Some("7891234567895".into()),
            sku: None,
            manufacturer: None,
            supplier: None,
            stock_quantity: Some(Decimal::from(10)),
            minimum_stock: Some(Decimal::from(2)),
            maximum_stock: Some(Decimal::from(50)),
            stock_location: None,
            expiration_date: None,
            serial_numbers: vec![],
            tags: vec!["obra".into(), " obra ".into()],
        }
    }

    fn consulting() -> CreateMaterialService {
        CreateMaterialService {
            item_type: ItemType::Service,
            code: "srv-01".into(),
            name: "Consultoria".into(),
            barcode: None,
            stock_quantity: None,
            minimum_stock: None,
            maximum_stock: None,
            tags: vec![],
            ..material("x")
        }
    }

    #[tokio::test]
    async fn create_normalizes_and_rejects_duplicated_code() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let created = svc.create(tenant, None, material("mat-001")).await.unwrap();
        assert_eq!(created.code, "MAT-001");
        assert_eq!(created.currency, "BRL");
        assert_eq!(created.unit, "UN");
        assert_eq!(created.tags, vec!["obra".to_string()]);

        let mut again = material("MAT-001");
        again.barcode = None;
        let err = svc.create(tenant, None, again).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn service_rejects_stock_fields() {
        let svc = service();
        let mut payload = consulting();
        payload.stock_quantity = Some(Decimal::from(1));
        let err = svc.create(Uuid::new_v4(), None, payload).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.iter().any(|f| f.field == "stockQuantity")));

        let ok = svc.create(Uuid::new_v4(), None, consulting()).await.unwrap();
        assert_eq!(ok.code, "SRV-01");
    }

    #[tokio::test]
    async fn minimum_above_maximum_fails() {
        let svc = service();
        let mut payload = material("MAT-002");
        payload.minimum_stock = Some(Decimal::from(100));
        let err = svc.create(Uuid::new_v4(), None, payload).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.iter().any(|f| f.field == "minimumStock")));
    }

    #[tokio::test]
    async fn type_is_immutable() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, material("MAT-003")).await.unwrap();
        let changes = UpdateMaterialService {
            item_type: Some(ItemType::Service),
            ..Default::default()
        };
        let err = svc.update(tenant, None, item.id, changes).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn stock_operations_record_movements() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, material("MAT-004")).await.unwrap();

        let added = svc
            .update_stock(
                tenant,
                None,
                item.id,
                UpdateStock {
                    quantity: Decimal::from(5),
                    operation: Some(StockOperation::Add),
                    reason: Some("Compra".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(added.stock_quantity, Some(Decimal::from(15)));

        let err = svc
            .update_stock(
                tenant,
                None,
                item.id,
                UpdateStock {
                    quantity: Decimal::from(20),
                    operation: Some(StockOperation::Subtract),
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let movements = svc.stock_movements(tenant, item.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].previous_quantity, Decimal::from(10));
        assert_eq!(movements[0].new_quantity, Decimal::from(15));
        assert_eq!(movements[0].quantity_changed, Decimal::from(5));
    }

    #[tokio::test]
    async fn stock_overflow_is_rejected_without_panicking() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, material("MAT-006")).await.unwrap();
        let stock = |quantity, operation| UpdateStock {
            quantity,
            operation: Some(operation),
            reason: None,
        };

        svc.update_stock(tenant, None, item.id, stock(Decimal::MAX, StockOperation::Set))
            .await
            .unwrap();
        let err = svc
            .update_stock(tenant, None, item.id, stock(Decimal::MAX, StockOperation::Add))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref e) if e.iter().any(|f| f.field == "quantity")));

        let current = svc.find_by_id(tenant, item.id).await.unwrap();
        assert_eq!(current.stock_quantity, Some(Decimal::MAX));
        assert_eq!(svc.stock_movements(tenant, item.id).await.unwrap().len(), 1);

        // Valor de inventário satura em vez de estourar
        let stats = svc.statistics(tenant).await.unwrap();
        assert_eq!(stats.inventory_value, Decimal::MAX);
    }

    #[tokio::test]
    async fn services_have_no_stock() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, consulting()).await.unwrap();
        let err = svc
            .update_stock(
                tenant,
                None,
                item.id,
                UpdateStock {
                    quantity: Decimal::from(1),
                    operation: None,
                    reason: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn price_change_is_recorded() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, material("MAT-005")).await.unwrap();
        let updated = svc
            .update_price(
                tenant,
                None,
                item.id,
                UpdatePrice {
                    unit_price: Decimal::new(4500, 2),
                    reason: Some("Reajuste".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.unit_price, Decimal::new(4500, 2));

        let history = svc.price_history(tenant, item.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].previous_price, Decimal::new(3990, 2));
        assert_eq!(history[0].currency, "BRL");
    }

    #[tokio::test]
    async fn tags_are_added_once_and_removed() {
        let svc = service();
        let tenant = Uuid::new_v4();
        let item = svc.create(tenant, None, material("MAT-006")).await.unwrap();
        let tagged = svc
            .add_tags(
                tenant,
                None,
                item.id,
                TagsPayload {
                    tags: vec!["obra".into(), "promo".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(tagged.tags, vec!["obra".to_string(), "promo".to_string()]);

        let untagged = svc
            .remove_tags(
                tenant,
                None,
                item.id,
                TagsPayload {
                    tags: vec!["obra".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(untagged.tags, vec!["promo".to_string()]);
    }
}
