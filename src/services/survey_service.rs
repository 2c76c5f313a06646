// src/services/survey_service.rs

use chrono::{Duration as ChronoDuration, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::Store,
    models::{
        campaign::CampaignSend,
        status::StatusMachine,
        survey::{NewSurvey, SatisfactionSurvey, SurveySendReport, SurveyStatus},
    },
    services::{credentials::InvocationConfig, sender_service::OutboundSender},
};

pub const DEFAULT_EXPIRY_HOURS: i64 = 72;

fn new_survey_for(send: &CampaignSend) -> NewSurvey {
    NewSurvey {
        campaign_send_id: send.id,
        customer_name: send.customer_name.clone(),
        customer_phone: send.customer_phone.clone(),
        driver_name: send.driver_name.clone(),
    }
}

/// Monta a fila de pesquisas: novas para envios sem pesquisa, reenvio para
/// as que falharam. Envios já com pesquisa em andamento ficam de fora.
async fn collect_surveys(
    store: &dyn Store,
    campaign_send_ids: Option<&[Uuid]>,
    report: &mut SurveySendReport,
) -> Result<Vec<SatisfactionSurvey>, AppError> {
    let sends = match campaign_send_ids {
        Some(ids) => store.get_campaign_sends(ids).await?,
        None => store.sends_without_survey().await?,
    };

    let mut queue = Vec::with_capacity(sends.len());
    for send in sends {
        if let Some(existing) = store.active_survey_for_send(send.id).await? {
            if existing.status.can_resend() {
                report.resent_surveys += 1;
                queue.push(existing);
            } else {
                tracing::debug!(send_id = %send.id, status = %existing.status, "Pesquisa já em andamento");
            }
            continue;
        }

        if !send.status.was_delivered() {
            tracing::debug!(send_id = %send.id, status = %send.status, "Envio não entregue, sem pesquisa");
            continue;
        }

        // None: outra requisição criou a pesquisa primeiro (índice único parcial)
        if let Some(created) = store.create_survey(new_survey_for(&send)).await? {
            report.new_surveys += 1;
            queue.push(created);
        }
    }

    Ok(queue)
}

pub async fn send_surveys(
    state: &AppState,
    config: &InvocationConfig,
    campaign_send_ids: Option<&[Uuid]>,
) -> Result<SurveySendReport, AppError> {
    let mut report = SurveySendReport::default();
    let queue = collect_surveys(state.store.as_ref(), campaign_send_ids, &mut report).await?;
    let sender = OutboundSender::new(state, config);

    for (index, survey) in queue.iter().enumerate() {
        if index > 0 {
            tokio::time::sleep(state.settings.pacing.survey).await;
        }

        match sender.send_survey(survey).await {
            Ok(_) => report.surveys_sent += 1,
            Err(e) => {
                report.failed_surveys += 1;
                tracing::warn!(survey_id = %survey.id, code = e.code(), error = %e, "⚠️ Pesquisa não enviada");
            }
        }
    }

    tracing::info!(
        sent = report.surveys_sent,
        new = report.new_surveys,
        resent = report.resent_surveys,
        failed = report.failed_surveys,
        "📊 Envio de pesquisas concluído"
    );
    Ok(report)
}

pub async fn cancel_survey(store: &dyn Store, id: Uuid) -> Result<SatisfactionSurvey, AppError> {
    let survey = store
        .get_survey(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("pesquisa {}", id)))?;

    let next = survey.status.transition(SurveyStatus::Cancelled)?;
    if !store.record_survey_delivery(id, survey.status, next, None).await? {
        return Err(AppError::Conflict(format!("pesquisa {} mudou de status", id)));
    }

    Ok(SatisfactionSurvey { status: next, error_message: None, ..survey })
}

pub async fn expire_surveys(store: &dyn Store, max_age_hours: Option<i64>) -> Result<u64, AppError> {
    let hours = max_age_hours.unwrap_or(DEFAULT_EXPIRY_HOURS);
    if hours <= 0 {
        return Err(AppError::InvalidInput("maxAgeHours deve ser positivo".to_string()));
    }

    let expired = store.expire_surveys(Utc::now() - ChronoDuration::hours(hours)).await?;
    tracing::info!(expired, hours, "⌛ Pesquisas expiradas");
    Ok(expired)
}
