// tests/http_omnibridge.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

const RULES: &str = "/api/omnibridge/automation-rules";

fn urgent_rule() -> Value {
    json!({
        "name": "Urgências viram ticket",
        "priority": 10,
        "triggers": [
            { "type": "keyword", "config": { "keywords": ["urgente"] } }
        ],
        "actions": [
            { "order": 1, "type": "add_tags", "params": { "tags": ["urgente"] } },
            { "order": 2, "type": "create_ticket", "params": { "priority": "high" } },
            { "order": 3, "type": "notify", "params": { "recipients": ["suporte@empresa.com"], "message": "Nova urgência de {{senderEmail}}" } }
        ]
    })
}

fn inbound(content: &str) -> Value {
    json!({
        "channelType": "email",
        "from": "cliente@email.com",
        "fromName": "Cliente",
        "subject": "Pedido 123",
        "content": content
    })
}

#[tokio::test]
async fn rule_crud_bumps_version() {
    let app = TestApp::new();

    let (status, body) = app.post(RULES, urgent_rule()).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["metadata"]["version"], 1);
    assert_eq!(body["data"]["conditionLogic"], "or");

    let (status, body) = app
        .put(&format!("{}/{}", RULES, id), json!({ "name": "Urgências" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Urgências");
    assert_eq!(body["data"]["metadata"]["version"], 2);

    let (status, body) = app
        .call(Method::POST, &format!("{}/{}/toggle", RULES, id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["enabled"], false);

    let (status, _) = app.delete(&format!("{}/{}", RULES, id)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("{}/{}", RULES, id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rule_without_triggers_is_invalid() {
    let app = TestApp::new();
    let mut rule = urgent_rule();
    rule["triggers"] = json!([]);

    let (status, body) = app.post(RULES, rule).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["field"] == "triggers"));
}

#[tokio::test]
async fn dry_run_has_no_side_effects() {
    let app = TestApp::new();
    let (_, body) = app.post(RULES, urgent_rule()).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("{}/{}/test", RULES, id),
            json!({ "message": inbound("Isto é URGENTE, por favor") }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["matched"], true);

    let (_, body) = app.get("/api/omnibridge/messages").await;
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = app.get("/api/tickets").await;
    assert_eq!(body["pagination"]["total"], 0);
    let (_, body) = app.get(&format!("{}/{}", RULES, id)).await;
    assert_eq!(body["data"]["stats"]["totalExecutions"], 0);
}

#[tokio::test]
async fn processing_runs_matching_rules() {
    let app = TestApp::new();
    let (_, body) = app.post(RULES, urgent_rule()).await;
    let rule_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post("/api/omnibridge/messages/process", inbound("Preciso de ajuda urgente!"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let message = &body["data"]["message"];
    assert_eq!(message["tags"], json!(["urgente"]));
    assert!(message["ticketId"].is_string());
    let matched = body["data"]["evaluation"]["matchedRules"].as_array().unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0]["success"], true);

    let message_id = message["id"].as_str().unwrap();
    let (status, body) = app
        .get(&format!("/api/omnibridge/messages/{}", message_id))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["tags"], json!(["urgente"]));

    let (_, body) = app.get("/api/tickets").await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["priority"], "high");

    let (_, body) = app.get("/api/omnibridge/notifications").await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["recipient"], "suporte@empresa.com");

    let (_, body) = app.get(&format!("{}/{}", RULES, rule_id)).await;
    assert_eq!(body["data"]["stats"]["totalExecutions"], 1);
    assert_eq!(body["data"]["stats"]["successfulExecutions"], 1);
}

#[tokio::test]
async fn non_matching_message_stays_unread() {
    let app = TestApp::new();
    app.post(RULES, urgent_rule()).await;

    let (status, body) = app
        .post("/api/omnibridge/messages/process", inbound("Bom dia, tudo certo?"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["message"]["status"], "unread");
    assert!(body["data"]["evaluation"]["matchedRules"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn disabled_channel_rejects_inbound() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/omnibridge/channels",
            json!({ "channelType": "email", "name": "Suporte" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let channel_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/omnibridge/channels/{}/toggle", channel_id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["isEnabled"], false);

    let mut message = inbound("Olá");
    message["channelId"] = json!(channel_id);
    let (status, body) = app.post("/api/omnibridge/messages/process", message).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BUSINESS_RULE_VIOLATION");
}

#[tokio::test]
async fn reply_marks_original_as_replied() {
    let app = TestApp::new();
    let (_, body) = app
        .post("/api/omnibridge/messages/process", inbound("Qual o prazo?"))
        .await;
    let id = body["data"]["message"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/api/omnibridge/messages/{}/reply", id),
            json!({ "content": "Em até 3 dias úteis." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["direction"], "outbound");
    assert_eq!(body["data"]["toAddress"], "cliente@email.com");
    assert_eq!(body["data"]["parentId"], json!(id));

    let (_, body) = app.get(&format!("/api/omnibridge/messages/{}", id)).await;
    assert_eq!(body["data"]["status"], "replied");
}

#[tokio::test]
async fn send_requires_content_or_template() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/omnibridge/messages/send",
            json!({ "channelType": "sms", "to": "+5511999990000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = body["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["field"] == "content"));

    let (status, body) = app
        .post(
            "/api/omnibridge/messages/send",
            json!({ "channelType": "sms", "to": "+5511999990000", "content": "Seu pedido saiu." }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "sent");
    assert_eq!(body["data"]["fromAddress"], "omnibridge");
}

#[tokio::test]
async fn template_render_and_toggle() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/omnibridge/templates",
            json!({
                "name": "Código de acesso",
                "content": "Olá {{name}}, seu código é {{code}}",
                "variables": [
                    { "name": "name", "required": true },
                    { "name": "code", "defaultValue": "0000" }
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            &format!("/api/omnibridge/templates/{}/render", id),
            json!({ "variables": { "name": "Ana" } }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], "Olá Ana, seu código é 0000");

    let (status, _) = app
        .post(&format!("/api/omnibridge/templates/{}/render", id), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.call(Method::POST, &format!("/api/omnibridge/templates/{}/toggle", id), None)
        .await;
    let (status, body) = app
        .post(
            &format!("/api/omnibridge/templates/{}/render", id),
            json!({ "variables": { "name": "Ana" } }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BUSINESS_RULE_VIOLATION");
}
