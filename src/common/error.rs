// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

/// Erro de um campo específico (ex: "cnpj" -> "CNPJ inválido").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// Nosso tipo de erro. Services e repositórios só conhecem este tipo;
// a tradução para HTTP acontece apenas no `IntoResponse` abaixo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Um ou mais campos são inválidos.")]
    Validation(Vec<FieldError>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BusinessRule(String),

    #[error("Token de autenticação inválido ou ausente.")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Erro de banco de dados: {0}")]
    Database(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BusinessRule(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Converte violação de chave única do Postgres em `Conflict`.
    pub fn from_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return AppError::Conflict(message.into());
            }
        }
        err.into()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    FieldError::new(field.to_string(), message)
                })
            })
            .collect();
        // HashMap não garante ordem; ordenamos para respostas estáveis
        details.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(details)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match &self {
            AppError::Validation(errors) => json!({
                "success": false,
                "message": self.to_string(),
                "code": code,
                "errors": errors,
            }),
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                json!({
                    "success": false,
                    "message": self.to_string(),
                    "code": code,
                })
            }
            _ => json!({
                "success": false,
                "message": self.to_string(),
                "code": code,
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 2, message = "O nome deve ter no mínimo 2 caracteres"))]
        name: String,
    }

    #[test]
    fn validator_errors_become_field_errors() {
        let err: AppError = Payload { name: "a".into() }.validate().unwrap_err().into();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "name");
                assert_eq!(fields[0].message, "O nome deve ter no mínimo 2 caracteres");
            }
            other => panic!("esperado Validation, veio {other:?}"),
        }
    }

    #[test]
    fn status_and_code_follow_taxonomy() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(AppError::BusinessRule("x".into()).code(), "BUSINESS_RULE_VIOLATION");
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
