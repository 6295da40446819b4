// src/handlers/catalog.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::{PageQuery, SearchQuery},
        response::{created, ok, ok_with_message, paginated},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::catalog::{
        CatalogFilters, CatalogStatistics, CreateMaterialService, MaterialService, PriceHistory,
        StockMovement, TagsPayload, UpdateMaterialService, UpdatePrice, UpdateStock,
    },
};

// Todas as rotas ficam sob /api/materials-services-integration/working

// =============================================================================
//  ITENS
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/materials-services-integration/working/items",
    tag = "Catalog",
    request_body = CreateMaterialService,
    responses(
        (status = 201, description = "Item criado", body = MaterialService),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Código ou código de barras já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateMaterialService>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .create(tenant.0, Some(user.user_id), payload)
        .await?;
    Ok(created(item, "Item criado com sucesso."))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items",
    tag = "Catalog",
    params(CatalogFilters, PageQuery),
    responses((status = 200, description = "Lista paginada de itens", body = Vec<MaterialService>)),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<CatalogFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .catalog
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items/search",
    tag = "Catalog",
    params(SearchQuery, PageQuery),
    responses((status = 200, description = "Itens encontrados", body = Vec<MaterialService>)),
    security(("api_jwt" = []))
)]
pub async fn search_items(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(search): Query<SearchQuery>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .catalog
        .search(tenant.0, &search.q, &page.into())
        .await?;
    Ok(paginated(page))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items/statistics",
    tag = "Catalog",
    responses((status = 200, description = "Estatísticas do catálogo", body = CatalogStatistics)),
    security(("api_jwt" = []))
)]
pub async fn item_statistics(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.catalog.statistics(tenant.0).await?;
    Ok(ok(stats))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item", body = MaterialService),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state.catalog.find_by_id(tenant.0, id).await?;
    Ok(ok(item))
}

#[utoipa::path(
    put,
    path = "/api/materials-services-integration/working/items/{id}",
    tag = "Catalog",
    request_body = UpdateMaterialService,
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item atualizado", body = MaterialService),
        (status = 400, description = "Dados inválidos ou troca de tipo"),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMaterialService>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .update(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok_with_message(item, "Item atualizado com sucesso."))
}

#[utoipa::path(
    delete,
    path = "/api/materials-services-integration/working/items/{id}",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item desativado", body = MaterialService),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .delete(tenant.0, Some(user.user_id), id)
        .await?;
    Ok(ok_with_message(item, "Item removido com sucesso."))
}

// =============================================================================
//  ESTOQUE E PREÇO
// =============================================================================

#[utoipa::path(
    put,
    path = "/api/materials-services-integration/working/items/{id}/stock",
    tag = "Catalog",
    request_body = UpdateStock,
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Estoque atualizado", body = MaterialService),
        (status = 400, description = "Quantidade inválida ou item é um serviço")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_stock(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStock>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .update_stock(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok_with_message(item, "Estoque atualizado com sucesso."))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items/{id}/stock-movements",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses((status = 200, description = "Movimentações, mais recentes primeiro", body = Vec<StockMovement>)),
    security(("api_jwt" = []))
)]
pub async fn list_stock_movements(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let movements = app_state.catalog.stock_movements(tenant.0, id).await?;
    Ok(ok(movements))
}

#[utoipa::path(
    put,
    path = "/api/materials-services-integration/working/items/{id}/price",
    tag = "Catalog",
    request_body = UpdatePrice,
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Preço atualizado", body = MaterialService),
        (status = 400, description = "Preço inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_price(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePrice>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .update_price(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok_with_message(item, "Preço atualizado com sucesso."))
}

#[utoipa::path(
    get,
    path = "/api/materials-services-integration/working/items/{id}/price-history",
    tag = "Catalog",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses((status = 200, description = "Histórico de preços, mais recente primeiro", body = Vec<PriceHistory>)),
    security(("api_jwt" = []))
)]
pub async fn list_price_history(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let history = app_state.catalog.price_history(tenant.0, id).await?;
    Ok(ok(history))
}

// =============================================================================
//  TAGS
// =============================================================================

#[utoipa::path(
    post,
    path = "/api/materials-services-integration/working/items/{id}/tags",
    tag = "Catalog",
    request_body = TagsPayload,
    params(("id" = Uuid, Path, description = "ID do item")),
    responses((status = 200, description = "Tags adicionadas", body = MaterialService)),
    security(("api_jwt" = []))
)]
pub async fn add_item_tags(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .add_tags(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok(item))
}

#[utoipa::path(
    delete,
    path = "/api/materials-services-integration/working/items/{id}/tags",
    tag = "Catalog",
    request_body = TagsPayload,
    params(("id" = Uuid, Path, description = "ID do item")),
    responses((status = 200, description = "Tags removidas", body = MaterialService)),
    security(("api_jwt" = []))
)]
pub async fn remove_item_tags(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<TagsPayload>,
) -> Result<impl IntoResponse, AppError> {
    let item = app_state
        .catalog
        .remove_tags(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok(item))
}
