// src/handlers/omnibridge.rs

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
    middleware::{auth::AuthenticatedUser, tenancy::TenantContext},
    models::{
        automation::{
            AutomationRule, CreateAutomationRule, ProcessedMessage, RuleFilters, RuleTestResult,
            TestRuleRequest, UpdateAutomationRule,
        },
        omnibridge::{
            Channel, CreateChannel, ForwardMessage, InboundMessage, Message, MessageFilters,
            Notification, NotificationFilters, ReplyMessage, SendMessage,
        },
    },
};

// Todas as rotas ficam sob /api/omnibridge

// =============================================================================
//  ÁREA 1: REGRAS DE AUTOMAÇÃO
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/omnibridge/automation-rules",
    tag = "OmniBridge",
    params(RuleFilters, PageQuery),
    responses((status = 200, description = "Regras, maior prioridade primeiro", body = Vec<AutomationRule>)),
    security(("api_jwt" = []))
)]
pub async fn list_rules(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<RuleFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.rules.list(tenant.0, &filters, &page.into()).await?;
    Ok(paginated(page))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/automation-rules",
    tag = "OmniBridge",
    request_body = CreateAutomationRule,
    responses(
        (status = 201, description = "Regra criada", body = AutomationRule),
        (status = 400, description = "Gatilhos ou ações inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_rule(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
    tenant: TenantContext,
    Json(payload): Json<CreateAutomationRule>,
) -> Result<impl IntoResponse, AppError> {
    let rule = app_state
        .rules
        .create(tenant.0, Some(user.user_id), payload)
        .await?;
    Ok(created(rule, "Regra criada com sucesso."))
}

#[utoipa::path(
    get,
    path = "/api/omnibridge/automation-rules/{ruleId}",
    tag = "OmniBridge",
    params(("ruleId" = Uuid, Path, description = "ID da regra")),
    responses(
        (status = 200, description = "Regra", body = AutomationRule),
        (status = 404, description = "Regra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_rule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let rule = app_state.rules.find_by_id(tenant.0, rule_id).await?;
    Ok(ok(rule))
}

#[utoipa::path(
    put,
    path = "/api/omnibridge/automation-rules/{ruleId}",
    tag = "OmniBridge",
    request_body = UpdateAutomationRule,
    params(("ruleId" = Uuid, Path, description = "ID da regra")),
    responses(
        (status = 200, description = "Regra atualizada", body = AutomationRule),
        (status = 404, description = "Regra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_rule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<UpdateAutomationRule>,
) -> Result<impl IntoResponse, AppError> {
    let rule = app_state.rules.update(tenant.0, rule_id, payload).await?;
    Ok(ok_with_message(rule, "Regra atualizada com sucesso."))
}

#[utoipa::path(
    delete,
    path = "/api/omnibridge/automation-rules/{ruleId}",
    tag = "OmniBridge",
    params(("ruleId" = Uuid, Path, description = "ID da regra")),
    responses(
        (status = 200, description = "Regra removida"),
        (status = 404, description = "Regra não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_rule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    app_state.rules.delete(tenant.0, rule_id).await?;
    Ok(ok_message("Regra removida com sucesso."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/automation-rules/{ruleId}/toggle",
    tag = "OmniBridge",
    params(("ruleId" = Uuid, Path, description = "ID da regra")),
    responses((status = 200, description = "Regra habilitada/desabilitada", body = AutomationRule)),
    security(("api_jwt" = []))
)]
pub async fn toggle_rule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(rule_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let rule = app_state.rules.toggle(tenant.0, rule_id).await?;
    Ok(ok(rule))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/automation-rules/{ruleId}/test",
    tag = "OmniBridge",
    request_body = TestRuleRequest,
    params(("ruleId" = Uuid, Path, description = "ID da regra")),
    responses((status = 200, description = "Simulação, sem executar ações", body = RuleTestResult)),
    security(("api_jwt" = []))
)]
pub async fn test_rule(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(rule_id): Path<Uuid>,
    Json(payload): Json<TestRuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = app_state.rules.test(tenant.0, rule_id, payload).await?;
    Ok(ok(result))
}

// =============================================================================
//  ÁREA 2: CANAIS
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/omnibridge/channels",
    tag = "OmniBridge",
    responses((status = 200, description = "Canais do tenant", body = Vec<Channel>)),
    security(("api_jwt" = []))
)]
pub async fn list_channels(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let channels = app_state.channels.list(tenant.0).await?;
    Ok(ok(channels))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/channels",
    tag = "OmniBridge",
    request_body = CreateChannel,
    responses(
        (status = 201, description = "Canal criado", body = Channel),
        (status = 409, description = "Nome de canal já usado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_channel(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<CreateChannel>,
) -> Result<impl IntoResponse, AppError> {
    let channel = app_state.channels.create(tenant.0, payload).await?;
    Ok(created(channel, "Canal criado com sucesso."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/channels/{channelId}/toggle",
    tag = "OmniBridge",
    params(("channelId" = Uuid, Path, description = "ID do canal")),
    responses((status = 200, description = "Canal habilitado/desabilitado", body = Channel)),
    security(("api_jwt" = []))
)]
pub async fn toggle_channel(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(channel_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let channel = app_state.channels.toggle(tenant.0, channel_id).await?;
    Ok(ok(channel))
}

// =============================================================================
//  ÁREA 3: MENSAGENS
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/omnibridge/messages",
    tag = "OmniBridge",
    params(MessageFilters, PageQuery),
    responses((status = 200, description = "Caixa unificada", body = Vec<Message>)),
    security(("api_jwt" = []))
)]
pub async fn list_messages(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<MessageFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .messages
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}

#[utoipa::path(
    get,
    path = "/api/omnibridge/messages/{id}",
    tag = "OmniBridge",
    params(("id" = Uuid, Path, description = "ID da mensagem")),
    responses(
        (status = 200, description = "Mensagem", body = Message),
        (status = 404, description = "Mensagem não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.find_by_id(tenant.0, id).await?;
    Ok(ok(message))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/process",
    tag = "OmniBridge",
    request_body = InboundMessage,
    responses(
        (status = 201, description = "Mensagem gravada e regras avaliadas", body = ProcessedMessage),
        (status = 400, description = "Dados inválidos ou canal desabilitado")
    ),
    security(("api_jwt" = []))
)]
pub async fn process_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<InboundMessage>,
) -> Result<impl IntoResponse, AppError> {
    let processed = app_state.messages.process_inbound(tenant.0, payload).await?;
    Ok(created(processed, "Mensagem processada."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/send",
    tag = "OmniBridge",
    request_body = SendMessage,
    responses(
        (status = 201, description = "Mensagem enviada", body = Message),
        (status = 400, description = "Canal, conteúdo ou template inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<SendMessage>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.send(tenant.0, payload).await?;
    Ok(created(message, "Mensagem enviada."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/{id}/reply",
    tag = "OmniBridge",
    request_body = ReplyMessage,
    params(("id" = Uuid, Path, description = "ID da mensagem original")),
    responses((status = 201, description = "Resposta enviada", body = Message)),
    security(("api_jwt" = []))
)]
pub async fn reply_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplyMessage>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.reply(tenant.0, id, payload).await?;
    Ok(created(message, "Resposta enviada."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/{id}/forward",
    tag = "OmniBridge",
    request_body = ForwardMessage,
    params(("id" = Uuid, Path, description = "ID da mensagem original")),
    responses((status = 201, description = "Mensagem encaminhada", body = Message)),
    security(("api_jwt" = []))
)]
pub async fn forward_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ForwardMessage>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.forward(tenant.0, id, payload).await?;
    Ok(created(message, "Mensagem encaminhada."))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/{id}/archive",
    tag = "OmniBridge",
    params(("id" = Uuid, Path, description = "ID da mensagem")),
    responses((status = 200, description = "Mensagem arquivada", body = Message)),
    security(("api_jwt" = []))
)]
pub async fn archive_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.archive(tenant.0, id).await?;
    Ok(ok(message))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/{id}/read",
    tag = "OmniBridge",
    params(("id" = Uuid, Path, description = "ID da mensagem")),
    responses((status = 200, description = "Mensagem marcada como lida", body = Message)),
    security(("api_jwt" = []))
)]
pub async fn read_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.mark_read(tenant.0, id).await?;
    Ok(ok(message))
}

#[utoipa::path(
    post,
    path = "/api/omnibridge/messages/{id}/star",
    tag = "OmniBridge",
    params(("id" = Uuid, Path, description = "ID da mensagem")),
    responses((status = 200, description = "Estrela alternada", body = Message)),
    security(("api_jwt" = []))
)]
pub async fn star_message(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = app_state.messages.toggle_star(tenant.0, id).await?;
    Ok(ok(message))
}

// =============================================================================
//  ÁREA 4: NOTIFICAÇÕES
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/omnibridge/notifications",
    tag = "OmniBridge",
    params(NotificationFilters, PageQuery),
    responses((status = 200, description = "Notificações geradas pelas regras", body = Vec<Notification>)),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(filters): Query<NotificationFilters>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state
        .notifications
        .list(tenant.0, &filters, &page.into())
        .await?;
    Ok(paginated(page))
}
