// src/services/credentials.rs

use crate::{
    common::error::AppError,
    config::{AppState, GatewaySecrets},
    models::settings::{
        EvolutionConfigRow, EvolutionConfigType, FeatureToggles, KEY_AUTO_TEMPLATE_ENABLED,
        KEY_AUTO_TEMPLATE_MIN_DATE,
    },
};

pub const DEFAULT_TEMPLATE_LANGUAGE: &str = "pt_BR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionCredentials {
    pub api_url: String,
    pub api_key: String,
    pub instance_name: String,
    pub is_official: bool,
    pub template_name: Option<String>,
    pub template_language: Option<String>,
}

fn filled(value: &Option<String>) -> Option<String> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Escolhe entre a configuração oficial (banco) e a instância QR (ambiente).
///
/// A linha oficial só vale com os quatro campos preenchidos; qualquer lacuna
/// cai para os segredos do ambiente.
pub fn resolve_credentials(
    active: Option<&EvolutionConfigRow>,
    secrets: &GatewaySecrets,
) -> Result<EvolutionCredentials, AppError> {
    if let Some(row) = active.filter(|r| r.config_type == EvolutionConfigType::Official) {
        if let (Some(api_url), Some(api_key), Some(instance_name), Some(template_name)) = (
            filled(&row.api_url),
            filled(&row.api_key),
            filled(&row.instance_name),
            filled(&row.template_name),
        ) {
            return Ok(EvolutionCredentials {
                api_url,
                api_key,
                instance_name,
                is_official: true,
                template_name: Some(template_name),
                template_language: Some(
                    filled(&row.template_language).unwrap_or_else(|| DEFAULT_TEMPLATE_LANGUAGE.to_string()),
                ),
            });
        }
        tracing::warn!(config_id = %row.id, "⚠️ Configuração oficial incompleta, usando a instância do ambiente");
    }

    match (filled(&secrets.api_url), filled(&secrets.api_key), filled(&secrets.instance_name)) {
        (Some(api_url), Some(api_key), Some(instance_name)) => Ok(EvolutionCredentials {
            api_url,
            api_key,
            instance_name,
            is_official: false,
            template_name: None,
            template_language: None,
        }),
        _ => Err(AppError::Configuration(
            "EVOLUTION_API_URL/EVOLUTION_API_KEY/EVOLUTION_INSTANCE_NAME".to_string(),
        )),
    }
}

/// Tudo o que uma requisição precisa saber da configuração, lido uma única vez.
#[derive(Debug, Clone)]
pub struct InvocationConfig {
    pub credentials: EvolutionCredentials,
    pub toggles: FeatureToggles,
    pub reschedule_phone: String,
}

impl InvocationConfig {
    pub async fn load(state: &AppState) -> Result<Self, AppError> {
        let active = state.store.active_evolution_config().await?;
        let credentials = resolve_credentials(active.as_ref(), &state.settings.gateway)?;

        let enabled = state.store.get_setting(KEY_AUTO_TEMPLATE_ENABLED).await?;
        let min_date = state.store.get_setting(KEY_AUTO_TEMPLATE_MIN_DATE).await?;
        let toggles = FeatureToggles::from_values(enabled.as_deref(), min_date.as_deref());

        Ok(Self {
            credentials,
            toggles,
            reschedule_phone: state.settings.reschedule_contact_phone.clone(),
        })
    }
}
