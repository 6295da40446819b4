// tests/http_catalog.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

const BASE: &str = "/api/materials-services-integration/working/items";

async fn create_cement(app: &TestApp) -> String {
    let (status, body) = app
        .post(
            BASE,
            json!({
                "type": "material",
                "category": "Construção",
                "code": "cim-50",
                "name": "Cimento CP II 50kg",
                "unitPrice": 32.9,
                "stockQuantity": 10,
                "minimumStock": 5,
                "tags": ["obra"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

fn number(value: &Value) -> f64 {
    value.as_f64().expect("campo numérico")
}

#[tokio::test]
async fn create_normalizes_code_and_defaults() {
    let app = TestApp::new();
    let id = create_cement(&app).await;

    let (status, body) = app.get(&format!("{}/{}", BASE, id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["code"], "CIM-50");
    assert_eq!(body["data"]["unit"], "UN");
    assert_eq!(body["data"]["currency"], "BRL");
    assert_eq!(body["data"]["type"], "material");
}

#[tokio::test]
async fn duplicated_code_conflicts() {
    let app = TestApp::new();
    create_cement(&app).await;

    let (status, body) = app
        .post(
            BASE,
            json!({
                "type": "material",
                "category": "Construção",
                "code": "CIM-50",
                "name": "Outro cimento",
                "unitPrice": 30
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn services_reject_stock_fields() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            BASE,
            json!({
                "type": "service",
                "category": "Mão de obra",
                "code": "INST-01",
                "name": "Instalação",
                "unitPrice": 150,
                "stockQuantity": 3
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn stock_operations_write_movements() {
    let app = TestApp::new();
    let id = create_cement(&app).await;

    let (status, body) = app
        .put(&format!("{}/{}/stock", BASE, id), json!({ "quantity": 5, "operation": "add" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&body["data"]["stockQuantity"]), 15.0);

    let (status, body) = app
        .put(
            &format!("{}/{}/stock", BASE, id),
            json!({ "quantity": 20, "operation": "subtract" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BUSINESS_RULE_VIOLATION");

    // Sem operação: substitui a quantidade
    let (_, body) = app
        .put(&format!("{}/{}/stock", BASE, id), json!({ "quantity": 2 }))
        .await;
    assert_eq!(number(&body["data"]["stockQuantity"]), 2.0);

    let (status, body) = app.get(&format!("{}/{}/stock-movements", BASE, id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn price_change_is_recorded() {
    let app = TestApp::new();
    let id = create_cement(&app).await;

    let (status, body) = app
        .put(
            &format!("{}/{}/price", BASE, id),
            json!({ "unitPrice": 35.5, "reason": "Reajuste do fornecedor" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(number(&body["data"]["unitPrice"]), 35.5);

    let (_, body) = app.get(&format!("{}/{}/price-history", BASE, id)).await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(number(&history[0]["previousPrice"]), 32.9);
    assert_eq!(number(&history[0]["newPrice"]), 35.5);
}

#[tokio::test]
async fn search_requires_term_and_finds_by_name() {
    let app = TestApp::new();
    create_cement(&app).await;

    let (status, _) = app.get(&format!("{}/search", BASE)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get(&format!("{}/search?q=cimento", BASE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);

    let (_, body) = app.get(&format!("{}/search?q=parafuso", BASE)).await;
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn tags_are_merged_and_removed() {
    let app = TestApp::new();
    let id = create_cement(&app).await;

    let (status, body) = app
        .post(&format!("{}/{}/tags", BASE, id), json!({ "tags": ["obra", "promo"] }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!(["obra", "promo"]));

    let (status, body) = app
        .call(
            Method::DELETE,
            &format!("{}/{}/tags", BASE, id),
            Some(json!({ "tags": ["obra"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!(["promo"]));
}

#[tokio::test]
async fn statistics_count_low_stock() {
    let app = TestApp::new();
    let id = create_cement(&app).await;
    app.put(&format!("{}/{}/stock", BASE, id), json!({ "quantity": 1 }))
        .await;

    let (status, body) = app.get(&format!("{}/statistics", BASE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["materials"], 1);
    assert_eq!(body["data"]["lowStock"], 1);
}
