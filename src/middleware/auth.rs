// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub sub: Uuid,       // ID do usuário
    pub tenant_id: Uuid, // Tenant ao qual o token dá acesso
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Usuário já autenticado, colocado nas extensions da requisição pelo `auth_guard`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Option<String>,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant_id,
            role: claims.role,
        }
    }
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    tenant_id: Uuid,
    role: Option<String>,
    ttl: Duration,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: user_id,
        tenant_id,
        exp: (Utc::now() + ttl).timestamp() as usize,
        role,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Falha ao gerar token: {}", e)))
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

// O middleware em si: valida o Bearer e insere o usuário nas extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &app_state)
            .await
            .map_err(|_| AppError::Unauthorized)?;

    let claims = decode_token(&app_state.jwt_secret, bearer.token())?;
    parts.extensions.insert(AuthenticatedUser::from(claims));

    Ok(next.run(Request::from_parts(parts, body)).await)
}

// Extrator para obter o usuário autenticado diretamente nos handlers
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_with_same_secret_only() {
        let user = Uuid::new_v4();
        let tenant = Uuid::new_v4();
        let token = issue_token("segredo", user, tenant, Some("admin".into()), Duration::hours(1)).unwrap();

        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.tenant_id, tenant);
        assert_eq!(claims.role.as_deref(), Some("admin"));

        assert!(matches!(decode_token("outro", &token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("segredo", Uuid::new_v4(), Uuid::new_v4(), None, Duration::hours(-2)).unwrap();
        assert!(matches!(decode_token("segredo", &token), Err(AppError::Unauthorized)));
    }
}
