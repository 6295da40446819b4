// src/common/validation.rs

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::common::error::{AppError, FieldError};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("regex de e-mail")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").expect("regex de URL"));

/// Resultado de uma validação de domínio: `{isValid, errors[]}`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(FieldError::new(field, message));
    }

    /// Adiciona o erro apenas quando `condition` é falsa.
    pub fn check(&mut self, condition: bool, field: &str, message: &str) {
        if !condition {
            self.add(field, message);
        }
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

pub fn is_valid_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

/// `Some("  ")` vira `None`; demais valores são aparados.
pub fn trim_opt(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_errors() {
        let mut report = ValidationReport::new();
        report.check(true, "name", "ok");
        assert!(report.is_valid);
        report.check(false, "email", "E-mail inválido");
        assert!(!report.is_valid);
        assert!(report.has_error("email"));
        assert!(matches!(report.into_result(), Err(AppError::Validation(e)) if e.len() == 1));
    }

    #[test]
    fn email_and_url_formats() {
        assert!(is_valid_email("contato@empresa.com.br"));
        assert!(!is_valid_email("contato@empresa"));
        assert!(is_valid_url("https://empresa.com.br"));
        assert!(!is_valid_url("empresa.com.br"));
    }

    #[test]
    fn trim_opt_drops_blank() {
        assert_eq!(trim_opt(Some("  ".into())), None);
        assert_eq!(trim_opt(Some(" a ".into())), Some("a".into()));
    }
}
