// src/models/company.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::crm::Customer;

// --- ENUMS ---

// Mapeia o CREATE TYPE company_size do banco
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "company_size", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompanySize {
    Micro,
    #[default]
    Small,
    Medium,
    Large,
    Enterprise,
}

impl CompanySize {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanySize::Micro => "micro",
            CompanySize::Small => "small",
            CompanySize::Medium => "medium",
            CompanySize::Large => "large",
            CompanySize::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "company_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    #[default]
    Active,
    Inactive,
    Suspended,
    Pending,
}

impl CompanyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyStatus::Active => "active",
            CompanyStatus::Inactive => "inactive",
            CompanyStatus::Suspended => "suspended",
            CompanyStatus::Pending => "pending",
        }
    }

    /// Transições permitidas:
    /// suspended -> active | suspended
    /// pending   -> active | inactive | suspended
    /// active/inactive -> qualquer status
    pub fn can_transition_to(&self, next: CompanyStatus) -> bool {
        match self {
            CompanyStatus::Suspended => {
                matches!(next, CompanyStatus::Active | CompanyStatus::Suspended)
            }
            CompanyStatus::Pending => matches!(
                next,
                CompanyStatus::Active | CompanyStatus::Inactive | CompanyStatus::Suspended
            ),
            CompanyStatus::Active | CompanyStatus::Inactive => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "subscription_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Basic,
    Premium,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Basic => "basic",
            SubscriptionTier::Premium => "premium",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    pub fn is_premium(&self) -> bool {
        matches!(self, SubscriptionTier::Premium | SubscriptionTier::Enterprise)
    }
}

// --- EMPRESA ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub tenant_id: Uuid,

    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    // Sempre armazenado apenas com dígitos
    pub cnpj: Option<String>,
    pub industry: Option<String>,
    pub size: CompanySize,
    pub status: CompanyStatus,
    pub subscription_tier: SubscriptionTier,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,

    pub address: Option<String>,
    pub address_number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: String,

    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    /// Assinatura premium ativa bloqueia a exclusão.
    pub fn has_active_premium_subscription(&self) -> bool {
        self.subscription_tier.is_premium() && self.status == CompanyStatus::Active
    }
}

// --- DTOs ---

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompany {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Padaria Pão Quente Ltda")]
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[schema(example = "11.222.333/0001-81")]
    pub cnpj: Option<String>,
    pub industry: Option<String>,
    pub size: Option<CompanySize>,
    pub status: Option<CompanyStatus>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub address_number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    #[schema(example = "SP")]
    pub state: Option<String>,
    #[schema(example = "01310-100")]
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

/// Atualização parcial. Campos ausentes não são alterados.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompany {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub cnpj: Option<String>,
    pub industry: Option<String>,
    pub size: Option<CompanySize>,
    pub status: Option<CompanyStatus>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub address_number: Option<String>,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateItem {
    pub id: Uuid,
    #[serde(flatten)]
    pub changes: UpdateCompany,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateCompanies {
    pub items: Vec<BulkUpdateItem>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteCompanies {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkFailure {
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult<T> {
    pub updated: Vec<T>,
    pub failed: Vec<BulkFailure>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CompanyFilters {
    /// Busca em nome, nome fantasia, CNPJ e e-mail
    pub search: Option<String>,
    pub status: Option<CompanyStatus>,
    pub size: Option<CompanySize>,
    pub subscription_tier: Option<SubscriptionTier>,
    pub industry: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    /// Por padrão apenas empresas ativas são listadas
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStatistics {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_size: BTreeMap<String, u64>,
    pub by_subscription: BTreeMap<String, u64>,
    pub by_state: BTreeMap<String, u64>,
}

// --- VÍNCULO EMPRESA x CLIENTE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCustomer {
    pub company_id: Uuid,
    pub customer_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkCustomer {
    pub customer_id: Uuid,
    pub role: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Cliente vinculado, como devolvido em `GET /companies/{id}/customers`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedCustomer {
    #[serde(flatten)]
    pub customer: Customer,
    pub role: Option<String>,
    pub is_primary: bool,
    pub linked_at: DateTime<Utc>,
}
