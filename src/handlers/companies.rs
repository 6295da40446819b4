// src/handlers/companies.rs

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
        response::{created, ok, ok_message, ok_with_message, paginated},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::company::{
        BulkDeleteCompanies, BulkResult, BulkUpdateCompanies, Company, CompanyCustomer, CompanyFilters,
        CompanyStatistics, CreateCompany, LinkCustomer, LinkedCustomer, UpdateCompany,
    },
};

// =============================================================================
//  CRUD
// =============================================================================

// POST /api/companies
#[utoipa::path(
    post,
    path = "/api/companies",
    tag = "Companies",
    request_body = CreateCompany,
    responses(
        (status = 201, description = "Empresa criada", body = Company),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "CNPJ já cadastrado")
    ),
    params(("x-tenant-id" = Option<Uuid>, Header, description = "ID do tenant (opcional)")),
    security(("api_jwt" = []))
)]
pub async fn create_company(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateCompany>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state
        .companies
        .create(tenant.0, Some(user.user_id), payload)
        .await?;
    Ok(created(company, "Empresa criada com sucesso."))
}

// GET /api/companies
#[utoipa::path(
    get,
    path = "/api/companies",
    tag = "Companies",
    params(CompanyFilters, PageQuery),
    responses((status = 200, description = "Lista paginada de empresas", body = Vec<Company>)),
    security(("api_jwt" = []))
)]
pub async fn list_companies(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<CompanyFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .companies
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

// GET /api/companies/search?q=
#[utoipa::path(
    get,
    path = "/api/companies/search",
    tag = "Companies",
    params(SearchQuery, PageQuery),
    responses(
        (status = 200, description = "Empresas encontradas", body = Vec<Company>),
        (status = 400, description = "Termo de busca vazio")
    ),
    security(("api_jwt" = []))
)]
pub async fn search_companies(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(search): Query<SearchQuery>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .companies
        .search(tenant.0, &search.q, &page.into())
        .await?;
    Ok(paginated(page))
}

// GET /api/companies/statistics
#[utoipa::path(
    get,
    path = "/api/companies/statistics",
    tag = "Companies",
    responses((status = 200, description = "Estatísticas das empresas", body = CompanyStatistics)),
    security(("api_jwt" = []))
)]
pub async fn company_statistics(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let stats = app_state.companies.statistics(tenant.0).await?;
    Ok(ok(stats))
}

// GET /api/companies/{id}
#[utoipa::path(
    get,
    path = "/api/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 200, description = "Empresa", body = Company),
        (status = 404, description = "Empresa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_company(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state.companies.find_by_id(tenant.0, id).await?;
    Ok(ok(company))
}

// PUT /api/companies/{id}
#[utoipa::path(
    put,
    path = "/api/companies/{id}",
    tag = "Companies",
    request_body = UpdateCompany,
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 200, description = "Empresa atualizada", body = Company),
        (status = 400, description = "Dados inválidos ou transição de status proibida"),
        (status = 404, description = "Empresa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_company(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCompany>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state
        .companies
        .update(tenant.0, Some(user.user_id), id, payload)
        .await?;
    Ok(ok_with_message(company, "Empresa atualizada com sucesso."))
}

// DELETE /api/companies/{id}
#[utoipa::path(
    delete,
    path = "/api/companies/{id}",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 200, description = "Empresa desativada", body = Company),
        (status = 400, description = "Empresa possui vínculos ou assinatura premium ativa"),
        (status = 404, description = "Empresa não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_company(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state
        .companies
        .delete(tenant.0, Some(user.user_id), id)
        .await?;
    Ok(ok_with_message(company, "Empresa removida com sucesso."))
}

// POST /api/companies/{id}/restore
#[utoipa::path(
    post,
    path = "/api/companies/{id}/restore",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 200, description = "Empresa restaurada", body = Company),
        (status = 400, description = "Empresa já está ativa")
    ),
    security(("api_jwt" = []))
)]
pub async fn restore_company(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = app_state
        .companies
        .restore(tenant.0, Some(user.user_id), id)
        .await?;
    Ok(ok_with_message(company, "Empresa restaurada com sucesso."))
}

// =============================================================================
//  OPERAÇÕES EM LOTE
// =============================================================================

// PUT /api/companies/bulk
#[utoipa::path(
    put,
    path = "/api/companies/bulk",
    tag = "Companies",
    request_body = BulkUpdateCompanies,
    responses(
        (status = 200, description = "Resultado por item", body = BulkResult<Company>),
        (status = 400, description = "Algum item é inválido; nada foi alterado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_update_companies(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<BulkUpdateCompanies>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .companies
        .bulk_update(tenant.0, Some(user.user_id), payload)
        .await?;
    Ok(ok(result))
}

// DELETE /api/companies/bulk
#[utoipa::path(
    delete,
    path = "/api/companies/bulk",
    tag = "Companies",
    request_body = BulkDeleteCompanies,
    responses(
        (status = 200, description = "Resultado por item", body = BulkResult<Company>),
        (status = 400, description = "Alguma empresa não pode ser removida; nada foi alterado")
    ),
    security(("api_jwt" = []))
)]
pub async fn bulk_delete_companies(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<BulkDeleteCompanies>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state
        .companies
        .bulk_delete(tenant.0, Some(user.user_id), payload)
        .await?;
    Ok(ok(result))
}

// =============================================================================
//  CLIENTES DA EMPRESA
// =============================================================================

// GET /api/companies/{id}/customers
#[utoipa::path(
    get,
    path = "/api/companies/{id}/customers",
    tag = "Companies",
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses((status = 200, description = "Clientes vinculados", body = Vec<LinkedCustomer>)),
    security(("api_jwt" = []))
)]
pub async fn list_company_customers(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let customers = app_state.companies.list_customers(tenant.0, id).await?;
    Ok(ok(customers))
}

// POST /api/companies/{id}/customers
#[utoipa::path(
    post,
    path = "/api/companies/{id}/customers",
    tag = "Companies",
    request_body = LinkCustomer,
    params(("id" = Uuid, Path, description = "ID da empresa")),
    responses(
        (status = 201, description = "Cliente vinculado", body = CompanyCustomer),
        (status = 409, description = "Cliente já vinculado")
    ),
    security(("api_jwt" = []))
)]
pub async fn link_company_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<LinkCustomer>,
) -> Result<impl IntoResponse, AppError> {
    let link = app_state
        .companies
        .link_customer(tenant.0, id, payload)
        .await?;
    Ok(created(link, "Cliente vinculado à empresa."))
}

// DELETE /api/companies/{id}/customers/{customerId}
#[utoipa::path(
    delete,
    path = "/api/companies/{id}/customers/{customerId}",
    tag = "Companies",
    params(
        ("id" = Uuid, Path, description = "ID da empresa"),
        ("customerId" = Uuid, Path, description = "ID do cliente")
    ),
    responses(
        (status = 200, description = "Vínculo removido"),
        (status = 404, description = "Vínculo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn unlink_company_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path((id, customer_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .companies
        .unlink_customer(tenant.0, id, customer_id)
        .await?;
    Ok(ok_message("Vínculo removido com sucesso."))
}
