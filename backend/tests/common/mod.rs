//! Helpers shared by the integration tests

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::{Role, StockItem};
use stockroom_backend::{
    create_app, middleware::Claims, services::ledger::CreateItemInput, services::InventoryLedger,
    AppState, Config,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret";

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// Decimal from a JSON string or number
pub fn json_dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => dec(s),
        other => dec(&other.to_string()),
    }
}

/// Application over a fresh in-memory store
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub company_id: Uuid,
    pub user_id: Uuid,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(Config::in_memory(JWT_SECRET));
        Self {
            router: create_app(state.clone()),
            state,
            company_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
        }
    }

    pub fn ledger(&self) -> InventoryLedger {
        self.state.ledger()
    }

    /// Token for a member of this app's company
    pub fn token(&self, role: Role, permissions: &[&str]) -> String {
        token_for(self.user_id, self.company_id, role, permissions)
    }

    pub fn manager_token(&self) -> String {
        self.token(Role::Manager, &[])
    }

    /// Create an item through the ledger
    pub async fn create_item(&self, body: Value) -> StockItem {
        let input: CreateItemInput = serde_json::from_value(body).unwrap();
        self.ledger()
            .create_item(self.company_id, self.user_id, input)
            .await
            .unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, _, bytes) = self.request_raw(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, bytes.to_vec())
    }
}

pub fn token_for(user_id: Uuid, company_id: Uuid, role: Role, permissions: &[&str]) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        company_id: company_id.to_string(),
        role,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}
