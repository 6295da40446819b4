// tests/common/mod.rs

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use omnidesk::{build_router, config::AppState, middleware::auth::issue_token};

pub const SECRET: &str = "segredo-de-teste";

/// Aplicação completa com repositórios em memória e um token válido.
pub struct TestApp {
    pub router: Router,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub token: String,
}

impl TestApp {
    pub fn new() -> Self {
        let tenant_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let token = issue_token(SECRET, user_id, tenant_id, None, chrono::Duration::hours(1))
            .expect("token de teste");
        Self {
            router: build_router(AppState::in_memory(SECRET)),
            tenant_id,
            user_id,
            token,
        }
    }

    /// Token de outro tenant, mas servido pela mesma aplicação.
    pub fn token_for(&self, tenant_id: Uuid) -> String {
        issue_token(SECRET, Uuid::new_v4(), tenant_id, None, chrono::Duration::hours(1))
            .expect("token de teste")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("resposta do router");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("corpo da resposta");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send(build_request(method, uri, Some(&self.token), body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.call(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.call(Method::DELETE, uri, None).await
    }
}

pub fn build_request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("requisição de teste")
}
