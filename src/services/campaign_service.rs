// src/services/campaign_service.rs

use chrono::Utc;
use validator::Validate;

use crate::{
    clients::SendError,
    common::{
        error::AppError,
        phone::normalize,
        retry::{with_retry, BOOKKEEPING_RETRIES},
    },
    config::AppState,
    models::{
        campaign::{
            Campaign, CampaignRecipient, CampaignReport, CampaignSendStatus, CampaignStatus,
            CreateCampaignRequest, NewCampaignSend,
        },
        status::StatusMachine,
    },
    services::{
        credentials::InvocationConfig,
        sender_service::{History, OutboundSender},
    },
};

/// Substitui `{nome}`, `{pedido}` e `{motorista}` pelos dados do destinatário.
pub fn render_message(template: &str, recipient: &CampaignRecipient) -> String {
    template
        .replace("{nome}", recipient.customer_name.trim())
        .replace("{pedido}", recipient.order_number.as_deref().unwrap_or(""))
        .replace("{motorista}", recipient.driver_name.as_deref().unwrap_or(""))
}

/// Cria a campanha já em `sending`. O disparo em si roda em `run_campaign`.
pub async fn start_campaign(state: &AppState, request: &CreateCampaignRequest) -> Result<Campaign, AppError> {
    request.validate()?;

    let total = i32::try_from(request.recipients.len())
        .map_err(|_| AppError::InvalidInput("destinatários demais".to_string()))?;
    let campaign = state
        .store
        .create_campaign(request.name.trim(), &request.message_template, total)
        .await?;

    let next = campaign.status.transition(CampaignStatus::Sending)?;
    if !state.store.set_campaign_status(campaign.id, campaign.status, next).await? {
        return Err(AppError::Conflict(format!("campanha {} já foi iniciada", campaign.id)));
    }

    tracing::info!(campaign_id = %campaign.id, recipients = total, "📣 Campanha iniciada");
    Ok(Campaign { status: next, ..campaign })
}

/// Envia para cada destinatário em sequência, com intervalo fixo entre envios.
pub async fn run_campaign(
    state: AppState,
    config: InvocationConfig,
    campaign: Campaign,
    recipients: Vec<CampaignRecipient>,
) -> CampaignReport {
    let sender = OutboundSender::new(&state, &config);
    let pacing = state.settings.pacing;
    let mut report = CampaignReport { campaign_id: campaign.id, ..Default::default() };

    for (index, recipient) in recipients.into_iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(pacing.campaign).await;
        }

        let text = render_message(&campaign.message_template, &recipient);
        let history = History::ByPhone(Some(recipient.customer_name.clone()));

        let (status, error_message, sent_at) = match sender.send_text(&recipient.phone, &text, history).await {
            Ok(_) => {
                report.success += 1;
                (CampaignSendStatus::Success, None, Some(Utc::now()))
            }
            Err(SendError::Blacklisted) => {
                report.blocked += 1;
                (CampaignSendStatus::Blocked, Some(SendError::Blacklisted.to_string()), None)
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(campaign_id = %campaign.id, phone = %recipient.phone, code = e.code(), "⚠️ Envio falhou");
                (CampaignSendStatus::Failed, Some(e.to_string()), None)
            }
        };

        let input = NewCampaignSend {
            campaign_id: campaign.id,
            customer_phone: normalize(&recipient.phone),
            recipient,
            status,
            error_message,
            sent_at,
        };

        let store = &state.store;
        let recorded = with_retry("campaign_send", BOOKKEEPING_RETRIES, pacing.bookkeeping_retry, || {
            store.insert_campaign_send(input.clone())
        })
        .await;
        if let Err(e) = recorded {
            tracing::error!(campaign_id = %campaign.id, phone = %input.customer_phone, error = ?e, "❌ Envio sem registro");
        }

        if let Err(e) = state
            .store
            .update_campaign_progress(campaign.id, report.success as i32, report.failed as i32, report.blocked as i32)
            .await
        {
            tracing::warn!(campaign_id = %campaign.id, error = ?e, "⚠️ Falha ao atualizar contadores");
        }
    }

    let terminal = CampaignStatus::terminal_for(report.failed);
    match state.store.set_campaign_status(campaign.id, CampaignStatus::Sending, terminal).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(campaign_id = %campaign.id, "⚠️ Campanha não estava mais em envio"),
        Err(e) => tracing::error!(campaign_id = %campaign.id, error = ?e, "❌ Falha ao encerrar campanha"),
    }

    tracing::info!(
        campaign_id = %campaign.id,
        success = report.success,
        failed = report.failed,
        blocked = report.blocked,
        status = %terminal,
        "🏁 Campanha finalizada"
    );
    report
}
