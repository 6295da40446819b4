// src/validators/company.rs

use crate::common::br_documents::{validate_cep, validate_cnpj, validate_phone, validate_state};
use crate::common::validation::{char_len, is_valid_email, is_valid_url, ValidationReport};
use crate::models::company::Company;

/// Valida uma empresa já normalizada (CNPJ/telefone/CEP só com dígitos, UF maiúscula).
pub fn validate_company(company: &Company) -> ValidationReport {
    let mut report = ValidationReport::new();

    let name_len = char_len(company.name.trim());
    report.check(
        (2..=255).contains(&name_len),
        "name",
        "O nome deve ter entre 2 e 255 caracteres.",
    );

    if let Some(display_name) = &company.display_name {
        report.check(
            char_len(display_name) <= 255,
            "displayName",
            "O nome fantasia deve ter no máximo 255 caracteres.",
        );
    }

    if let Some(cnpj) = &company.cnpj {
        report.check(validate_cnpj(cnpj), "cnpj", "CNPJ inválido.");
    }

    if let Some(industry) = &company.industry {
        report.check(
            char_len(industry) <= 100,
            "industry",
            "O setor deve ter no máximo 100 caracteres.",
        );
    }

    if let Some(email) = &company.email {
        report.check(is_valid_email(email), "email", "E-mail inválido.");
    }

    if let Some(phone) = &company.phone {
        report.check(
            validate_phone(phone),
            "phone",
            "Telefone deve conter DDD e número (10 ou 11 dígitos).",
        );
    }

    if let Some(website) = &company.website {
        report.check(
            is_valid_url(website),
            "website",
            "Website deve começar com http:// ou https://.",
        );
    }

    if let Some(state) = &company.state {
        report.check(validate_state(state), "state", "UF inválida.");
    }

    if let Some(zip_code) = &company.zip_code {
        report.check(validate_cep(zip_code), "zipCode", "CEP deve conter 8 dígitos.");
    }

    report.check(!company.country.trim().is_empty(), "country", "O país é obrigatório.");

    report
}
