// src/services/auto_template_service.rs

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    clients::{SendError, TemplateMessage},
    common::{
        error::AppError,
        retry::{with_retry, BOOKKEEPING_RETRIES},
    },
    config::AppState,
    models::{
        order::ExternalOrder,
        settings::KEY_AUTO_TEMPLATE_LAST_RUN,
        template::{AutoTemplateReport, NewAutomaticSend, WhatsAppTemplate},
    },
    services::{
        credentials::InvocationConfig,
        sender_service::{History, OutboundSender},
    },
};

// O livro de envios usa o status já normalizado
fn trigger_key(status: &str) -> String {
    status.trim().to_lowercase()
}

/// Preenche as variáveis do template pelo nome declarado no cadastro.
pub fn template_parameters(template: &WhatsAppTemplate, order: &ExternalOrder) -> Vec<String> {
    template
        .variables
        .iter()
        .map(|variable| match variable.trim().to_lowercase().as_str() {
            "nome" | "cliente" | "customer_name" => order.customer_name.trim().to_string(),
            "pedido" | "order_number" => order.order_number.clone(),
            "motorista" | "driver_name" => order.driver_name.clone().unwrap_or_default(),
            "status" => order.status.clone(),
            _ => String::new(),
        })
        .collect()
}

fn in_window(order: &ExternalOrder, config: &InvocationConfig) -> bool {
    match config.toggles.auto_template_min_date {
        Some(min_date) => order.order_date.is_some_and(|date| date >= min_date),
        None => true,
    }
}

/// Uma rodada do envio automático. `None` quando a funcionalidade está desligada.
pub async fn run_auto_templates(
    state: &AppState,
    config: &InvocationConfig,
) -> Result<Option<AutoTemplateReport>, AppError> {
    if !config.toggles.auto_template_enabled {
        tracing::info!("Envio automático de templates desligado");
        return Ok(None);
    }

    let orders = state.order_source.fetch_orders().await?;
    let sender = OutboundSender::new(state, config);
    let pacing = state.settings.pacing;

    let mut report = AutoTemplateReport::default();
    let mut templates_by_status: HashMap<String, Option<WhatsAppTemplate>> = HashMap::new();
    let mut attempted = 0u32;

    for order in orders {
        report.checked += 1;

        if !in_window(&order, config) {
            report.skipped += 1;
            continue;
        }

        let status = trigger_key(&order.status);
        let template = match templates_by_status.get(&status) {
            Some(cached) => cached.clone(),
            None => {
                let found = state.store.approved_templates_for_trigger(&status).await?.into_iter().next();
                templates_by_status.insert(status.clone(), found.clone());
                found
            }
        };

        let (Some(template), Some(phone)) = (template, order.phone.clone().filter(|p| !p.trim().is_empty())) else {
            report.skipped += 1;
            continue;
        };

        if state.store.automatic_send_exists(&order.order_number, &status).await? {
            report.skipped += 1;
            continue;
        }

        if attempted > 0 {
            tokio::time::sleep(pacing.auto_template).await;
        }
        attempted += 1;

        let message = TemplateMessage {
            name: template.name.clone(),
            language: template.language.clone(),
            parameters: template_parameters(&template, &order),
        };
        let history = History::ByPhone(Some(order.customer_name.clone()).filter(|n| !n.trim().is_empty()));

        match sender.send_template(&phone, &message, history).await {
            Ok(sent) => {
                report.sent += 1;
                let entry = NewAutomaticSend {
                    order_number: order.order_number.clone(),
                    trigger_status: status.clone(),
                    template_name: template.name.clone(),
                    phone: sent.phone,
                };
                let store = &state.store;
                let recorded = with_retry("automatic_template_send", BOOKKEEPING_RETRIES, pacing.bookkeeping_retry, || {
                    store.record_automatic_send(entry.clone())
                })
                .await;
                match recorded {
                    Ok(true) => {}
                    Ok(false) => tracing::warn!(order = %order.order_number, %status, "⚠️ Envio automático já registrado"),
                    Err(e) => tracing::error!(order = %order.order_number, error = ?e, "❌ Envio automático sem registro"),
                }
            }
            Err(SendError::Blacklisted) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(order = %order.order_number, code = e.code(), error = %e, "⚠️ Template automático falhou");
            }
        }
    }

    if let Err(e) = state.store.set_setting(KEY_AUTO_TEMPLATE_LAST_RUN, &Utc::now().to_rfc3339()).await {
        tracing::warn!(error = ?e, "⚠️ Falha ao gravar a última execução");
    }

    tracing::info!(
        checked = report.checked,
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "🤖 Envio automático concluído"
    );
    Ok(Some(report))
}
