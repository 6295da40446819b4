// src/validators/catalog.rs

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

use crate::common::validation::{char_len, ValidationReport};
use crate::models::catalog::{ItemType, MaterialService};

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,50}$").expect("regex de código"));
static CURRENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").expect("regex de moeda"));

const BARCODE_LENGTHS: [usize; 4] = [8, 12, 13, 14];

pub fn is_valid_barcode(barcode: &str) -> bool {
    BARCODE_LENGTHS.contains(&barcode.len()) && barcode.chars().all(|c| c.is_ascii_digit())
}

fn non_negative(report: &mut ValidationReport, value: Option<Decimal>, field: &str) {
    if let Some(v) = value {
        report.check(!v.is_sign_negative(), field, "O valor não pode ser negativo.");
    }
}

/// Valida um item do catálogo (material ou serviço) já normalizado.
pub fn validate_catalog_item(item: &MaterialService) -> ValidationReport {
    let mut report = ValidationReport::new();

    report.check(
        CODE_RE.is_match(&item.code),
        "code",
        "O código deve ter até 50 caracteres (letras, números, '-' ou '_').",
    );

    let name_len = char_len(item.name.trim());
    report.check(
        (2..=255).contains(&name_len),
        "name",
        "O nome deve ter entre 2 e 255 caracteres.",
    );

    let category_len = char_len(item.category.trim());
    report.check(
        (1..=100).contains(&category_len),
        "category",
        "A categoria deve ter entre 1 e 100 caracteres.",
    );

    report.check(!item.unit.trim().is_empty(), "unit", "A unidade é obrigatória.");
    report.check(
        !item.unit_price.is_sign_negative(),
        "unitPrice",
        "O preço não pode ser negativo.",
    );
    report.check(
        CURRENCY_RE.is_match(&item.currency),
        "currency",
        "Moeda deve seguir o padrão ISO-4217 (ex: BRL).",
    );

    if let Some(barcode) = &item.barcode {
        report.check(
            is_valid_barcode(barcode),
            "barcode",
            "Código de barras deve ter 8, 12, 13 ou 14 dígitos.",
        );
    }

    match item.item_type {
        ItemType::Service => {
            let forbidden = [
                ("stockQuantity", item.stock_quantity.is_some()),
                ("minimumStock", item.minimum_stock.is_some()),
                ("maximumStock", item.maximum_stock.is_some()),
                ("expirationDate", item.expiration_date.is_some()),
                ("serialNumbers", !item.serial_numbers.is_empty()),
            ];
            for (field, present) in forbidden {
                report.check(!present, field, "Serviços não possuem controle de estoque.");
            }
        }
        ItemType::Material => {
            non_negative(&mut report, item.stock_quantity, "stockQuantity");
            non_negative(&mut report, item.minimum_stock, "minimumStock");
            non_negative(&mut report, item.maximum_stock, "maximumStock");
        }
    }

    // Vale para qualquer tipo, mesmo que outro erro já tenha sido reportado
    if let (Some(min), Some(max)) = (item.minimum_stock, item.maximum_stock) {
        report.check(
            min <= max,
            "minimumStock",
            "O estoque mínimo não pode ser maior que o máximo.",
        );
    }

    report
}
