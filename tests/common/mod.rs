// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;

use painel_entregas::{
    build_router,
    clients::{
        DownloadedMedia, GatewayConnector, GatewayReceipt, MediaStorage, OrderSource, OutboundMedia,
        SendError, TemplateMessage, WhatsAppGateway,
    },
    common::error::AppError,
    config::{AppState, GatewaySecrets, Pacing, Settings},
    db::{MemoryStore, Store},
    models::order::ExternalOrder,
    services::credentials::EvolutionCredentials,
};

pub const JWT_SECRET: &str = "segredo-de-teste";
pub const RESCHEDULE_PHONE: &str = "(11) 4000-1234";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text { number: String, text: String },
    Media { number: String, url: String },
    Template { number: String, name: String, parameters: Vec<String> },
}

impl Sent {
    pub fn number(&self) -> &str {
        match self {
            Sent::Text { number, .. } | Sent::Media { number, .. } | Sent::Template { number, .. } => number,
        }
    }
}

/// Gateway que só registra os envios. Números em `unreachable` falham como fora do WhatsApp.
#[derive(Default)]
pub struct FakeGateway {
    pub sent: Mutex<Vec<Sent>>,
    pub unreachable: Mutex<Vec<String>>,
    pub media: Mutex<Option<DownloadedMedia>>,
}

impl FakeGateway {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn make_unreachable(&self, number: &str) {
        self.unreachable.lock().unwrap().push(number.to_string());
    }

    fn record(&self, number: &str, sent: Sent) -> Result<GatewayReceipt, SendError> {
        if self.unreachable.lock().unwrap().iter().any(|n| n == number) {
            return Err(SendError::NumberNotOnWhatsApp);
        }
        let mut log = self.sent.lock().unwrap();
        log.push(sent);
        Ok(GatewayReceipt { message_id: Some(format!("MSG-{}", log.len())) })
    }
}

#[async_trait]
impl WhatsAppGateway for FakeGateway {
    async fn send_text(&self, number: &str, text: &str) -> Result<GatewayReceipt, SendError> {
        self.record(number, Sent::Text { number: number.to_string(), text: text.to_string() })
    }

    async fn send_media(&self, number: &str, media: &OutboundMedia) -> Result<GatewayReceipt, SendError> {
        self.record(number, Sent::Media { number: number.to_string(), url: media.url.clone() })
    }

    async fn send_template(&self, number: &str, template: &TemplateMessage) -> Result<GatewayReceipt, SendError> {
        self.record(
            number,
            Sent::Template {
                number: number.to_string(),
                name: template.name.clone(),
                parameters: template.parameters.clone(),
            },
        )
    }

    async fn fetch_media(&self, _message_id: &str) -> Result<DownloadedMedia, SendError> {
        self.media
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SendError::Gateway("sem mídia".to_string()))
    }
}

pub struct FakeConnector {
    pub gateway: Arc<FakeGateway>,
    pub last_credentials: Mutex<Option<EvolutionCredentials>>,
}

impl GatewayConnector for FakeConnector {
    fn connect(&self, credentials: &EvolutionCredentials) -> Arc<dyn WhatsAppGateway> {
        *self.last_credentials.lock().unwrap() = Some(credentials.clone());
        self.gateway.clone()
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub uploads: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl MediaStorage for FakeStorage {
    async fn upload(&self, path: &str, _bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        self.uploads.lock().unwrap().push((path.to_string(), content_type.to_string()));
        Ok(format!("https://storage.test/whatsapp-media/{}", path))
    }
}

#[derive(Default)]
pub struct FakeOrders {
    pub orders: Mutex<Vec<ExternalOrder>>,
}

#[async_trait]
impl OrderSource for FakeOrders {
    async fn fetch_orders(&self) -> Result<Vec<ExternalOrder>, AppError> {
        Ok(self.orders.lock().unwrap().clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub connector: Arc<FakeConnector>,
    pub storage: Arc<FakeStorage>,
    pub orders: Arc<FakeOrders>,
}

pub fn test_settings() -> Settings {
    Settings {
        jwt_secret: JWT_SECRET.to_string(),
        gateway: GatewaySecrets {
            api_url: Some("https://evo.test".to_string()),
            api_key: Some("chave".to_string()),
            instance_name: Some("entregas".to_string()),
        },
        reschedule_contact_phone: RESCHEDULE_PHONE.to_string(),
        pacing: Pacing::immediate(),
        ..Settings::default()
    }
}

pub fn test_app() -> TestApp {
    test_app_with(MemoryStore::new())
}

pub fn test_app_with(store: MemoryStore) -> TestApp {
    test_app_from(store, test_settings())
}

pub fn test_app_from(store: MemoryStore, settings: Settings) -> TestApp {
    let store = Arc::new(store);
    let gateway = Arc::new(FakeGateway::default());
    let connector = Arc::new(FakeConnector { gateway: gateway.clone(), last_credentials: Mutex::new(None) });
    let storage = Arc::new(FakeStorage::default());
    let orders = Arc::new(FakeOrders::default());

    let dyn_store: Arc<dyn Store> = store.clone();
    let state = AppState::from_parts(settings, dyn_store, connector.clone(), storage.clone(), orders.clone());

    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        gateway,
        connector,
        storage,
        orders,
    }
}

pub fn bearer_token() -> String {
    let claims = json!({
        "sub": "0b7c9a52-6f1e-4d3a-9c55-3e1f2a8b7d10",
        "email": "operador@example.com",
        "aud": "authenticated",
        "exp": 4_102_444_800u64,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

pub fn json_request(method: Method, uri: &str, body: Option<Value>, authenticated: bool) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if authenticated {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer_token()));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn call(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
    (status, body)
}

/// Envelope `messages.upsert` com uma mensagem de texto.
pub fn text_event(remote_jid: &str, id: &str, text: &str) -> Value {
    json!({
        "event": "messages.upsert",
        "instance": "entregas",
        "data": {
            "key": { "remoteJid": remote_jid, "fromMe": false, "id": id },
            "pushName": "Cliente Teste",
            "message": { "conversation": text },
            "messageTimestamp": 1_714_560_000
        }
    })
}

pub async fn post_webhook(app: &TestApp, payload: Value) -> (StatusCode, Value) {
    call(app, json_request(Method::POST, "/api/webhook/whatsapp", Some(payload), false)).await
}
