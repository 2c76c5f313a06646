// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    clients::{
        orders::UnconfiguredOrderSource, storage::DisabledStorage, EvolutionConnector,
        GatewayConnector, HttpOrderSource, MediaStorage, OrderSource, SupabaseStorage,
    },
    db::{PgStore, Store},
};

// Intervalos fixos entre envios para respeitar o limite do gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub campaign: Duration,
    pub survey: Duration,
    pub auto_template: Duration,
    pub bookkeeping_retry: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            campaign: Duration::from_secs(5),
            survey: Duration::from_secs(10),
            auto_template: Duration::from_secs(1),
            bookkeeping_retry: crate::common::retry::BOOKKEEPING_RETRY_DELAY,
        }
    }
}

impl Pacing {
    pub fn immediate() -> Self {
        Self {
            campaign: Duration::ZERO,
            survey: Duration::ZERO,
            auto_template: Duration::ZERO,
            bookkeeping_retry: Duration::ZERO,
        }
    }
}

/// Segredos da instância não oficial (QR code), usados quando não há
/// configuração oficial completa no banco.
#[derive(Debug, Clone, Default)]
pub struct GatewaySecrets {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub instance_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrdersApiSettings {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub media_bucket: String,
    pub gateway: GatewaySecrets,
    pub gateway_timeout: Duration,
    pub orders_api: Option<OrdersApiSettings>,
    pub reschedule_contact_phone: String,
    pub pacing: Pacing,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:3000".to_string(),
            database_url: String::new(),
            jwt_secret: String::new(),
            supabase_url: None,
            supabase_service_key: None,
            media_bucket: "whatsapp-media".to_string(),
            gateway: GatewaySecrets::default(),
            gateway_timeout: Duration::from_secs(30),
            orders_api: None,
            reschedule_contact_phone: "(11) 4000-0000".to_string(),
            pacing: Pacing::default(),
        }
    }
}

impl Settings {
    // Lê o ambiente uma única vez, no boot.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Settings::default();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("SUPABASE_JWT_SECRET").context("SUPABASE_JWT_SECRET deve ser definido")?;

        let orders_api = match (
            optional("ORDERS_API_URL"),
            optional("ORDERS_API_USERNAME"),
            optional("ORDERS_API_PASSWORD"),
        ) {
            (Some(url), Some(username), Some(password)) => Some(OrdersApiSettings { url, username, password }),
            _ => None,
        };

        let pacing = Pacing {
            campaign: seconds("CAMPAIGN_DELAY_SECS", defaults.pacing.campaign)?,
            survey: seconds("SURVEY_DELAY_SECS", defaults.pacing.survey)?,
            auto_template: seconds("AUTO_TEMPLATE_DELAY_SECS", defaults.pacing.auto_template)?,
            bookkeeping_retry: defaults.pacing.bookkeeping_retry,
        };

        Ok(Self {
            server_addr: optional("SERVER_ADDR").unwrap_or(defaults.server_addr),
            database_url,
            jwt_secret,
            supabase_url: optional("SUPABASE_URL"),
            supabase_service_key: optional("SUPABASE_SERVICE_ROLE_KEY"),
            media_bucket: optional("MEDIA_BUCKET").unwrap_or(defaults.media_bucket),
            gateway: GatewaySecrets {
                api_url: optional("EVOLUTION_API_URL"),
                api_key: optional("EVOLUTION_API_KEY"),
                instance_name: optional("EVOLUTION_INSTANCE_NAME"),
            },
            gateway_timeout: seconds("GATEWAY_TIMEOUT_SECS", defaults.gateway_timeout)?,
            orders_api,
            reschedule_contact_phone: optional("RESCHEDULE_CONTACT_PHONE")
                .unwrap_or(defaults.reschedule_contact_phone),
            pacing,
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn seconds(key: &str, default: Duration) -> anyhow::Result<Duration> {
    match optional(key) {
        Some(raw) => {
            let secs: u64 = raw.trim().parse().with_context(|| format!("{} deve ser um número de segundos", key))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(default),
    }
}

pub async fn connect_database(settings: &Settings) -> anyhow::Result<PgPool> {
    // Conecta ao banco de dados, usando '?' para propagar erros
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&settings.database_url)
        .await?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(db_pool)
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub connector: Arc<dyn GatewayConnector>,
    pub media_storage: Arc<dyn MediaStorage>,
    pub order_source: Arc<dyn OrderSource>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings, db_pool: PgPool) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.gateway_timeout)
            .build()
            .context("Falha ao criar o cliente HTTP")?;

        // --- Monta o gráfico de dependências ---
        let store: Arc<dyn Store> = Arc::new(PgStore::new(db_pool));
        let connector: Arc<dyn GatewayConnector> = Arc::new(EvolutionConnector::new(settings.gateway_timeout)?);

        let media_storage: Arc<dyn MediaStorage> = match (&settings.supabase_url, &settings.supabase_service_key) {
            (Some(url), Some(key)) => Arc::new(SupabaseStorage::new(http.clone(), url, key, &settings.media_bucket)),
            _ => {
                tracing::warn!("⚠️ Storage não configurado: mídias recebidas manterão a URL original");
                Arc::new(DisabledStorage)
            }
        };

        let order_source: Arc<dyn OrderSource> = match &settings.orders_api {
            Some(api) => Arc::new(HttpOrderSource::new(http, &api.url, &api.username, &api.password)),
            None => Arc::new(UnconfiguredOrderSource),
        };

        Ok(Self::from_parts(settings, store, connector, media_storage, order_source))
    }

    pub fn from_parts(
        settings: Settings,
        store: Arc<dyn Store>,
        connector: Arc<dyn GatewayConnector>,
        media_storage: Arc<dyn MediaStorage>,
        order_source: Arc<dyn OrderSource>,
    ) -> Self {
        Self {
            store,
            connector,
            media_storage,
            order_source,
            settings: Arc::new(settings),
        }
    }
}
