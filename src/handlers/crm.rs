// src/handlers/crm.rs

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        pagination::PageQuery,
        response::{created, ok, ok_with_message, paginated},
    },
    config::AppState,
    middleware::tenancy::TenantContext,
    models::crm::{
        CreateCustomer, CreateTicket, Customer, CustomerFilters, Ticket, TicketFilters,
        UpdateCustomer, UpdateTicketStatus,
    },
};

// =============================================================================
//  ÁREA 1: CLIENTES
// =============================================================================

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "CRM",
    request_body = CreateCustomer,
    responses(
        (status = 201, description = "Cliente criado", body = Customer),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "E-mail já cadastrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateCustomer>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.customers.create(tenant.0, payload).await?;
    Ok(created(customer, "Cliente criado com sucesso."))
}

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "CRM",
    params(CustomerFilters, PageQuery),
    responses((status = 200, description = "Lista paginada de clientes", body = Vec<Customer>)),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<CustomerFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .customers
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.customers.find_by_id(tenant.0, id).await?;
    Ok(ok(customer))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "CRM",
    request_body = UpdateCustomer,
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomer>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.customers.update(tenant.0, id, payload).await?;
    Ok(ok_with_message(customer, "Cliente atualizado com sucesso."))
}

// DELETE /api/customers/{id}
#[utoipa::path(
    delete,
    path = "/api/customers/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente desativado", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_customer(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.customers.delete(tenant.0, id).await?;
    Ok(ok_with_message(customer, "Cliente removido com sucesso."))
}

// =============================================================================
//  ÁREA 2: TICKETS
// =============================================================================

// POST /api/tickets
#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "CRM",
    request_body = CreateTicket,
    responses(
        (status = 201, description = "Ticket aberto", body = Ticket),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_ticket(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateTicket>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state.tickets.create(tenant.0, payload).await?;
    Ok(created(ticket, "Ticket criado com sucesso."))
}

// GET /api/tickets
#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "CRM",
    params(TicketFilters, PageQuery),
    responses((status = 200, description = "Lista paginada de tickets", body = Vec<Ticket>)),
    security(("api_jwt" = []))
)]
pub async fn list_tickets(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<TicketFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .tickets
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

// GET /api/tickets/{id}
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "CRM",
    params(("id" = Uuid, Path, description = "ID do ticket")),
    responses(
        (status = 200, description = "Ticket", body = Ticket),
        (status = 404, description = "Ticket não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_ticket(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state.tickets.find_by_id(tenant.0, id).await?;
    Ok(ok(ticket))
}

// PUT /api/tickets/{id}/status
#[utoipa::path(
    put,
    path = "/api/tickets/{id}/status",
    tag = "CRM",
    request_body = UpdateTicketStatus,
    params(("id" = Uuid, Path, description = "ID do ticket")),
    responses(
        (status = 200, description = "Status atualizado", body = Ticket),
        (status = 404, description = "Ticket não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_ticket_status(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTicketStatus>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = app_state
        .tickets
        .update_status(tenant.0, id, payload.status)
        .await?;
    Ok(ok_with_message(ticket, "Status do ticket atualizado."))
}
