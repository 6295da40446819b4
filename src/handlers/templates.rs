// src/handlers/templates.rs

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
        response::{created, ok, ok_message, ok_with_message, paginated},
    },
    config::AppState,
    middleware::tenancy::TenantContext,
    models::template::{
        CreateTemplate, MessageTemplate, RenderTemplateRequest, RenderedTemplate, TemplateFilters,
        UpdateTemplate,
    },
};

#[utoipa::path(
    get,
    path = "/api/omnibridge/templates",
    tag = "Templates",
    params(TemplateFilters, PageQuery),
    responses((status = 200, description = "Templates do tenant", body = Vec<MessageTemplate>)),
    security(("api_jwt" = []))
)]
pub async fn list_templates(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<TemplateFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .templates
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/templates",
    tag = "Templates",
    request_body = CreateTemplate,
    responses(
        (status = 201, description = "Template criado", body = MessageTemplate),
        (status = 400, description = "Variáveis inválidas"),
        (status = 409, description = "Nome já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateTemplate>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.templates.create(tenant.0, payload).await?;
    Ok(created(template, "Template criado com sucesso."))
}

#[utoipa::path(
    get,
    path = "/api/omnibridge/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 200, description = "Template", body = MessageTemplate),
        (status = 404, description = "Template não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.templates.find_by_id(tenant.0, id).await?;
    Ok(ok(template))
}

#[utoipa::path(
    put,
    path = "/api/omnibridge/templates/{id}",
    tag = "Templates",
    request_body = UpdateTemplate,
    params(("id" = Uuid, Path, description = "ID do template")),
    responses((status = 200, description = "Template atualizado", body = MessageTemplate)),
    security(("api_jwt" = []))
)]
pub async fn update_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTemplate>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.templates.update(tenant.0, id, payload).await?;
    Ok(ok_with_message(template, "Template atualizado com sucesso."))
}

#[utoipa::path(
    delete,
    path = "/api/omnibridge/templates/{id}",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 200, description = "Template removido"),
        (status = 404, description = "Template não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.templates.delete(tenant.0, id).await?;
    Ok(ok_message("Template removido com sucesso."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/templates/{id}/install",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses((status = 200, description = "Template ativado e uso contabilizado", body = MessageTemplate)),
    security(("api_jwt" = []))
)]
pub async fn install_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.templates.install(tenant.0, id).await?;
    Ok(ok_with_message(template, "Template instalado."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/templates/{id}/toggle",
    tag = "Templates",
    params(("id" = Uuid, Path, description = "ID do template")),
    responses((status = 200, description = "Template ativado/desativado", body = MessageTemplate)),
    security(("api_jwt" = []))
)]
pub async fn toggle_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let template = app_state.templates.toggle(tenant.0, id).await?;
    Ok(ok(template))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/templates/{id}/render",
    tag = "Templates",
    request_body = RenderTemplateRequest,
    params(("id" = Uuid, Path, description = "ID do template")),
    responses(
        (status = 200, description = "Texto renderizado", body = RenderedTemplate),
        (status = 400, description = "Variável obrigatória ausente ou template inativo")
    ),
    security(("api_jwt" = []))
)]
pub async fn render_template(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RenderTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let rendered = app_state
        .templates
        .render(tenant.0, id, &payload.variables)
        .await?;
    Ok(ok(rendered))
}
