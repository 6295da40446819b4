// src/models/catalog.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// --- 1. Tipo do item ---
// Material tem estoque; serviço não. Imutável após a criação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "catalog_item_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Material,
    Service,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Material => "material",
            ItemType::Service => "service",
        }
    }
}

// --- 2. Material / Serviço ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialService {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(rename = "type")]
    pub item_type: ItemType,

    pub category: String,
    pub subcategory: Option<String>,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub unit_price: Decimal,
    pub currency: String,

    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,

    // Campos de estoque: proibidos para serviços
    pub stock_quantity: Option<Decimal>,
    pub minimum_stock: Option<Decimal>,
    pub maximum_stock: Option<Decimal>,
    pub stock_location: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
    pub serial_numbers: Vec<String>,

    pub tags: Vec<String>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MaterialService {
    pub fn is_low_stock(&self) -> bool {
        match (self.stock_quantity, self.minimum_stock) {
            (Some(qty), Some(min)) => qty <= min,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialService {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    #[schema(example = "Ferramentas")]
    pub category: String,
    pub subcategory: Option<String>,
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    #[schema(example = "MAT-001")]
    pub code: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub currency: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub stock_quantity: Option<Decimal>,
    pub minimum_stock: Option<Decimal>,
    pub maximum_stock: Option<Decimal>,
    pub stock_location: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2027-12-31")]
    pub expiration_date: Option<NaiveDate>,
    #[serde(default)]
    pub serial_numbers: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Atualização parcial; `type` é aceito apenas se igual ao atual.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaterialService {
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub currency: Option<String>,
    pub barcode: Option<String>,
    pub sku: Option<String>,
    pub manufacturer: Option<String>,
    pub supplier: Option<String>,
    pub stock_quantity: Option<Decimal>,
    pub minimum_stock: Option<Decimal>,
    pub maximum_stock: Option<Decimal>,
    pub stock_location: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub expiration_date: Option<NaiveDate>,
    pub serial_numbers: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogFilters {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub item_type: Option<ItemType>,
    pub category: Option<String>,
    pub tag: Option<String>,
    pub low_stock: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStatistics {
    pub total: u64,
    pub active: u64,
    pub materials: u64,
    pub services: u64,
    pub low_stock: u64,
    pub by_category: BTreeMap<String, u64>,
    /// Soma de quantidade x preço dos materiais ativos
    pub inventory_value: Decimal,
}

// --- 3. Movimentações de Estoque (histórico, apenas inserção) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "stock_operation", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StockOperation {
    Set,
    Add,
    Subtract,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub movement_type: StockOperation,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    pub quantity_changed: Decimal,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStock {
    pub quantity: Decimal,
    pub operation: Option<StockOperation>,
    pub reason: Option<String>,
}

// --- 4. Histórico de Preços (apenas inserção) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistory {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub item_id: Uuid,
    pub previous_price: Decimal,
    pub new_price: Decimal,
    pub currency: String,
    pub reason: Option<String>,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrice {
    pub unit_price: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagsPayload {
    pub tags: Vec<String>,
}
