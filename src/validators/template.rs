// src/validators/template.rs

use chrono::NaiveDate;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use crate::common::br_documents::only_digits;
use crate::common::validation::{char_len, is_valid_email, ValidationReport};
use crate::models::template::{MessageTemplate, TemplateVariable, VariableType};

static VARIABLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("regex de variável"));

/// Confere se `value` é compatível com o tipo declarado da variável.
pub fn value_matches_type(var_type: VariableType, value: &str) -> bool {
    let value = value.trim();
    match var_type {
        VariableType::Text => true,
        VariableType::Number => value.parse::<f64>().is_ok_and(f64::is_finite),
        VariableType::Date => NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        VariableType::Email => is_valid_email(value),
        VariableType::Phone => {
            let digits = only_digits(value);
            (10..=13).contains(&digits.len())
                && value
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '(' | ')' | '-' | ' '))
        }
    }
}

fn type_label(var_type: VariableType) -> &'static str {
    match var_type {
        VariableType::Text => "texto",
        VariableType::Number => "número",
        VariableType::Date => "data (AAAA-MM-DD)",
        VariableType::Email => "e-mail",
        VariableType::Phone => "telefone",
    }
}

pub fn validate_template(template: &MessageTemplate) -> ValidationReport {
    let mut report = ValidationReport::new();

    let name_len = char_len(template.name.trim());
    report.check(
        (1..=255).contains(&name_len),
        "name",
        "O nome deve ter entre 1 e 255 caracteres.",
    );
    report.check(
        !template.content.trim().is_empty(),
        "content",
        "O conteúdo é obrigatório.",
    );
    report.check(
        !template.category.trim().is_empty(),
        "category",
        "A categoria é obrigatória.",
    );

    let mut seen = HashSet::new();
    for (i, var) in template.variables.iter().enumerate() {
        let field = format!("variables[{i}]");
        if !VARIABLE_NAME_RE.is_match(&var.name) {
            report.add(&field, "Nome de variável inválido.");
            continue;
        }
        if !seen.insert(var.name.as_str()) {
            report.add(&field, &format!("Variável '{}' declarada mais de uma vez.", var.name));
        }
        if let Some(default) = &var.default_value {
            report.check(
                value_matches_type(var.var_type, default),
                &field,
                &format!(
                    "Valor padrão de '{}' deve ser do tipo {}.",
                    var.name,
                    type_label(var.var_type)
                ),
            );
        }
    }

    report
}

/// Checa os valores informados para renderização contra as variáveis declaradas.
pub fn validate_render_values(
    variables: &[TemplateVariable],
    values: &BTreeMap<String, String>,
) -> ValidationReport {
    let mut report = ValidationReport::new();

    for var in variables {
        match values.get(&var.name) {
            Some(value) => report.check(
                value_matches_type(var.var_type, value),
                &var.name,
                &format!("Valor deve ser do tipo {}.", type_label(var.var_type)),
            ),
            None => report.check(
                !var.required || var.default_value.is_some(),
                &var.name,
                "Variável obrigatória não informada.",
            ),
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, var_type: VariableType, required: bool) -> TemplateVariable {
        TemplateVariable {
            name: name.into(),
            var_type,
            required,
            default_value: None,
            description: None,
        }
    }

    #[test]
    fn type_checks() {
        assert!(value_matches_type(VariableType::Number, "12.5"));
        assert!(!value_matches_type(VariableType::Number, "doze"));
        assert!(value_matches_type(VariableType::Date, "2026-10-17"));
        assert!(!value_matches_type(VariableType::Date, "17/10/2026"));
        assert!(value_matches_type(VariableType::Phone, "+55 (11) 98765-4321"));
        assert!(!value_matches_type(VariableType::Phone, "98765"));
        assert!(value_matches_type(VariableType::Email, "ana@empresa.com"));
    }

    #[test]
    fn required_without_value_or_default_is_rejected() {
        let mut with_default = var("code", VariableType::Text, true);
        with_default.default_value = Some("000".into());
        let vars = vec![var("name", VariableType::Text, true), with_default];

        let report = validate_render_values(&vars, &BTreeMap::new());
        assert!(report.has_error("name"));
        assert!(!report.has_error("code"));
    }

    #[test]
    fn rejects_bad_values() {
        let vars = vec![var("total", VariableType::Number, false)];
        let mut values = BTreeMap::new();
        values.insert("total".to_string(), "abc".to_string());
        assert!(!validate_render_values(&vars, &values).is_valid);
    }
}
