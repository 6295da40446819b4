// src/validators/crm.rs

use crate::common::br_documents::{validate_cpf, validate_phone};
use crate::common::validation::{char_len, is_valid_email, ValidationReport};
use crate::models::crm::Customer;

pub fn validate_customer(customer: &Customer) -> ValidationReport {
    let mut report = ValidationReport::new();

    let first_len = char_len(customer.first_name.trim());
    report.check(
        (1..=120).contains(&first_len),
        "firstName",
        "O nome deve ter entre 1 e 120 caracteres.",
    );

    if let Some(last_name) = &customer.last_name {
        report.check(
            char_len(last_name) <= 120,
            "lastName",
            "O sobrenome deve ter no máximo 120 caracteres.",
        );
    }

    if let Some(email) = &customer.email {
        report.check(is_valid_email(email), "email", "E-mail inválido.");
    }

    if let Some(phone) = &customer.phone {
        report.check(
            validate_phone(phone),
            "phone",
            "Telefone deve conter DDD e número (10 ou 11 dígitos).",
        );
    }

    if let Some(cpf) = &customer.cpf {
        report.check(validate_cpf(cpf), "cpf", "CPF inválido.");
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn customer() -> Customer {
        Customer {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            first_name: "Maria".into(),
            last_name: Some("da Silva".into()),
            email: Some("maria@email.com".into()),
            phone: Some("21998765432".into()),
            cpf: Some("52998224725".into()),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn accepts_valid_customer() {
        assert!(validate_customer(&customer()).is_valid);
    }

    #[test]
    fn rejects_bad_cpf_and_phone() {
        let mut c = customer();
        c.cpf = Some("52998224726".into());
        c.phone = Some("123".into());
        let report = validate_customer(&c);
        assert!(report.has_error("cpf"));
        assert!(report.has_error("phone"));
        assert!(!report.has_error("email"));
    }
}
