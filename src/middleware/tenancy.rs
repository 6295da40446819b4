// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::{common::error::AppError, middleware::auth::AuthenticatedUser};

// Cabeçalho opcional; quando presente precisa bater com o tenant do token
const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Tenant da requisição, sempre derivado do token.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if let Some(value) = parts.headers.get(TENANT_ID_HEADER) {
            let requested = value
                .to_str()
                .ok()
                .and_then(|v| Uuid::parse_str(v.trim()).ok())
                .ok_or_else(|| AppError::validation(TENANT_ID_HEADER, "Cabeçalho X-Tenant-ID inválido (não é um UUID)."))?;

            if requested != user.tenant_id {
                tracing::warn!(
                    "Usuário {} tentou acessar o tenant {} com token do tenant {}",
                    user.user_id,
                    requested,
                    user.tenant_id
                );
                return Err(AppError::Forbidden(
                    "Você não tem acesso a este tenant.".into(),
                ));
            }
        }

        Ok(TenantContext(user.tenant_id))
    }
}
