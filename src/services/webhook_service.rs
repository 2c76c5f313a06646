// src/services/webhook_service.rs

// Classificação das mensagens recebidas do gateway.
// Ordem fixa: nota da pesquisa -> resposta de campanha (1/2/3) -> comentário
// da pesquisa -> mensagem comum de conversa. O primeiro ramo que casar encerra.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    clients::{GatewayReceipt, MediaStorage, WhatsAppGateway},
    common::{
        error::AppError,
        phone::{lookup_variants, phones_match},
        side_effect::BestEffort,
    },
    config::AppState,
    db::Store,
    models::{
        blacklist::REASON_WRONG_NUMBER,
        campaign::{CampaignSend, CampaignSendStatus, NewCampaignResponse, ResponseType},
        conversation::{
            Conversation, MessageStatus, NewConversation, NewMessage, SenderType, TAG_CONFIRMED,
            TAG_RESCHEDULE,
        },
        status::StatusMachine,
        survey::{parse_rating, SatisfactionSurvey, SurveyStatus},
        webhook::{InboundMessage, ParsedWebhook, WebhookOutcome},
    },
    services::{credentials::InvocationConfig, sender_service::OutboundSender, webhook_parser::parse_webhook},
};

// --- Respostas automáticas ---
pub const REPLY_RATING_THANKS: &str =
    "Obrigado pela sua avaliação! Se quiser, conte em poucas palavras como foi a sua experiência.";
pub const REPLY_RATING_RETRY: &str = "Por favor, responda apenas com um número de 1 a 5 para avaliar a sua entrega.";
pub const REPLY_CONFIRMED: &str = "Obrigado! Sua entrega está confirmada. ✅";
pub const REPLY_FEEDBACK_THANKS: &str = "Muito obrigado pelo seu comentário! Ele nos ajuda a melhorar.";

const GATEWAY_MISSING: &str = "gateway sem credenciais";

pub fn reschedule_reply(contact_phone: &str) -> String {
    format!(
        "Certo! Para reagendar a sua entrega, ligue para {} e fale com a nossa central.",
        contact_phone
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum WebhookResult {
    Ignored(String),
    Processed(Vec<WebhookOutcome>),
}

pub struct WebhookService {
    store: Arc<dyn Store>,
    // Sem credenciais o webhook ainda grava tudo; só respostas e mídia ficam de fora
    sender: Option<OutboundSender>,
    gateway: Option<Arc<dyn WhatsAppGateway>>,
    media_storage: Arc<dyn MediaStorage>,
    reschedule_phone: String,
}

impl WebhookService {
    pub fn new(state: &AppState, config: &InvocationConfig) -> Self {
        Self {
            store: state.store.clone(),
            sender: Some(OutboundSender::new(state, config)),
            gateway: Some(state.connector.connect(&config.credentials)),
            media_storage: state.media_storage.clone(),
            reschedule_phone: config.reschedule_phone.clone(),
        }
    }

    pub fn without_gateway(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            sender: None,
            gateway: None,
            media_storage: state.media_storage.clone(),
            reschedule_phone: state.settings.reschedule_contact_phone.clone(),
        }
    }

    async fn reply(&self, phone: &str, text: &str) {
        let sent = match &self.sender {
            Some(sender) => sender.reply(phone, text).await,
            None => BestEffort::from_result("resposta automática", Err::<GatewayReceipt, _>(GATEWAY_MISSING)),
        };
        tracing::debug!(phone = %phone, replied = sent.is_done(), "Resposta automática");
    }

    /// Processa o lote inteiro. Uma mensagem com erro de banco não aborta as demais.
    pub async fn handle_messages(&self, messages: Vec<InboundMessage>) -> Vec<WebhookOutcome> {
        let mut outcomes = Vec::with_capacity(messages.len());

        for message in messages {
            match self.classify(&message).await {
                Ok(outcome) => {
                    tracing::info!(phone = %message.phone, ?outcome, "📥 Mensagem processada");
                    outcomes.push(outcome);
                }
                Err(e) => {
                    tracing::error!(phone = %message.phone, error = ?e, "❌ Falha ao processar mensagem recebida");
                }
            }
        }

        outcomes
    }

    async fn classify(&self, message: &InboundMessage) -> Result<WebhookOutcome, AppError> {
        let digit = message.text.trim();

        // 4. Pesquisa enviada aguardando nota
        if let Some(survey) = self.pending_survey(message, SurveyStatus::Sent).await? {
            return self.handle_rating(message, &survey).await;
        }

        // 5. Resposta de campanha
        if matches!(digit, "1" | "2" | "3") {
            let variants = lookup_variants(&message.phone);
            let Some(conversation) = self.store.find_conversation_by_phone(&variants).await? else {
                return Ok(WebhookOutcome::NoConversationForResponse);
            };

            if let Some(send) = self.store.latest_campaign_send_for_phone(&variants).await? {
                return self.handle_campaign_answer(message, digit, &conversation, &send).await;
            }
            // Sem envio de campanha: segue como mensagem comum
        }

        // 6. Comentário livre depois da nota
        if parse_rating(digit).is_none() && has_text(message) {
            if let Some(survey) = self.pending_survey(message, SurveyStatus::AwaitingFeedback).await? {
                if self.store.record_survey_feedback(survey.id, message.text.trim()).await? {
                    self.reply(&message.phone, REPLY_FEEDBACK_THANKS).await;
                    return Ok(WebhookOutcome::FeedbackRecorded);
                }
            }
        }

        // 7. Mensagem de conversa
        self.store_conversation_message(message).await?;
        Ok(WebhookOutcome::ConversationMessage)
    }

    async fn pending_survey(
        &self,
        message: &InboundMessage,
        status: SurveyStatus,
    ) -> Result<Option<SatisfactionSurvey>, AppError> {
        let surveys = self.store.surveys_with_status(status).await?;
        Ok(surveys.into_iter().find(|s| {
            (status != SurveyStatus::Sent || s.rating.is_none()) && phones_match(&s.customer_phone, &message.phone)
        }))
    }

    async fn handle_rating(
        &self,
        message: &InboundMessage,
        survey: &SatisfactionSurvey,
    ) -> Result<WebhookOutcome, AppError> {
        let Some(rating) = parse_rating(&message.text) else {
            self.reply(&message.phone, REPLY_RATING_RETRY).await;
            return Ok(WebhookOutcome::SurveyInvalidRating);
        };

        if self.store.record_survey_rating(survey.id, rating).await? {
            self.reply(&message.phone, REPLY_RATING_THANKS).await;
        } else {
            tracing::warn!(survey_id = %survey.id, "⚠️ Nota já registrada por outra entrega do webhook");
        }
        Ok(WebhookOutcome::SurveyRated)
    }

    async fn handle_campaign_answer(
        &self,
        message: &InboundMessage,
        digit: &str,
        conversation: &Conversation,
        send: &CampaignSend,
    ) -> Result<WebhookOutcome, AppError> {
        // Webhook duplicado: a resposta deste envio já foi registrada
        if self.store.find_campaign_response(send.id).await?.is_some() {
            return Ok(WebhookOutcome::DuplicateCampaignResponse);
        }

        let (response_type, next_status, outcome) = match digit {
            "1" => (ResponseType::Confirmed, CampaignSendStatus::Confirmed, WebhookOutcome::CampaignConfirmed),
            "2" => (
                ResponseType::Reschedule,
                CampaignSendStatus::RescheduleRequested,
                WebhookOutcome::RescheduleRequested,
            ),
            _ => (ResponseType::WrongNumber, CampaignSendStatus::Blocked, WebhookOutcome::WrongNumber),
        };

        // Status e blacklist antes do registro da resposta, que é a trava contra entregas repetidas
        if send.status.allows(next_status) {
            if !self.store.set_campaign_send_status(send.id, send.status, next_status).await? {
                tracing::warn!(send_id = %send.id, "⚠️ Status do envio mudou antes da resposta ser aplicada");
            }
        } else {
            tracing::warn!(send_id = %send.id, from = %send.status, to = %next_status, "⚠️ Transição ignorada");
        }

        if response_type == ResponseType::WrongNumber
            && !self.store.add_to_blacklist(&message.phone, Some(REASON_WRONG_NUMBER)).await?
        {
            tracing::info!(phone = %message.phone, "Telefone já estava na blacklist");
        }

        // A chave única em campaign_response.campaign_send_id fecha a corrida entre entregas simultâneas
        let inserted = self
            .store
            .insert_campaign_response(NewCampaignResponse {
                campaign_send_id: send.id,
                conversation_id: Some(conversation.id),
                phone: message.phone.clone(),
                response_type,
            })
            .await?;
        if !inserted {
            return Ok(WebhookOutcome::DuplicateCampaignResponse);
        }

        // Depois da resposta gravada nada mais aborta: a nova entrega pararia no registro acima
        if let Err(e) = self.record_answer(message, digit, conversation, response_type).await {
            tracing::error!(send_id = %send.id, error = ?e, "❌ Resposta registrada, mas o chat ficou incompleto");
        }

        match response_type {
            ResponseType::Confirmed => self.reply(&message.phone, REPLY_CONFIRMED).await,
            ResponseType::Reschedule => self.reply(&message.phone, &reschedule_reply(&self.reschedule_phone)).await,
            ResponseType::WrongNumber => {}
        }

        Ok(outcome)
    }

    async fn record_answer(
        &self,
        message: &InboundMessage,
        digit: &str,
        conversation: &Conversation,
        response_type: ResponseType,
    ) -> Result<(), AppError> {
        self.store
            .insert_message(customer_message(conversation.id, message, digit.to_string(), None))
            .await?;
        self.store
            .touch_conversation_inbound(conversation.id, message.received_at, message.push_name.as_deref())
            .await?;

        match response_type {
            ResponseType::Confirmed => self.tag(conversation, TAG_CONFIRMED).await,
            ResponseType::Reschedule => self.tag(conversation, TAG_RESCHEDULE).await,
            ResponseType::WrongNumber => Ok(()),
        }
    }

    async fn tag(&self, conversation: &Conversation, tag: &str) -> Result<(), AppError> {
        if conversation.tags.iter().any(|t| t == tag) {
            return Ok(());
        }
        self.store.add_conversation_tag(conversation.id, tag).await
    }

    async fn store_conversation_message(&self, message: &InboundMessage) -> Result<(), AppError> {
        let variants = lookup_variants(&message.phone);
        let conversation_id = match self.store.find_conversation_by_phone(&variants).await? {
            Some(existing) => {
                self.store
                    .touch_conversation_inbound(existing.id, message.received_at, message.push_name.as_deref())
                    .await?;
                existing.id
            }
            None => {
                let created = self
                    .store
                    .create_conversation(NewConversation {
                        phone: message.phone.clone(),
                        name: message.push_name.clone(),
                        last_message_at: message.received_at,
                        unread_count: 1,
                    })
                    .await?;
                tracing::info!(conversation_id = %created.id, phone = %message.phone, "💬 Nova conversa");
                created.id
            }
        };

        let media_url = match &message.media {
            Some(media) => self.reupload_media(message).await.ok().or_else(|| media.url.clone()),
            None => None,
        };

        self.store
            .insert_message(customer_message(conversation_id, message, message.text.clone(), media_url))
            .await?;
        Ok(())
    }

    /// Baixa a mídia do gateway e guarda no Storage em `<telefone>/<id>.<ext>`.
    async fn reupload_media(&self, message: &InboundMessage) -> BestEffort<String> {
        let result = async {
            let media = message
                .media
                .as_ref()
                .ok_or_else(|| AppError::InvalidInput("mensagem sem mídia".into()))?;
            let message_id = message
                .message_id
                .as_deref()
                .ok_or_else(|| AppError::InvalidInput("mensagem sem id".into()))?;

            let gateway = self
                .gateway
                .as_ref()
                .ok_or_else(|| AppError::Configuration(GATEWAY_MISSING.to_string()))?;

            let downloaded = gateway
                .fetch_media(message_id)
                .await
                .map_err(|e| AppError::Gateway(e.to_string()))?;

            let mimetype = downloaded
                .mimetype
                .or_else(|| media.mimetype.clone())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let extension = extension_for(&mimetype).unwrap_or(media.kind.default_extension());
            let path = format!("{}/{}.{}", message.phone, message_id, extension);

            self.media_storage.upload(&path, downloaded.bytes, &mimetype).await
        }
        .await;

        BestEffort::from_result("reenvio de mídia", result)
    }
}

/// Ponto de entrada do webhook: normaliza o envelope e classifica cada mensagem.
pub async fn process_webhook(state: &AppState, payload: &Value) -> Result<WebhookResult, AppError> {
    let parsed = match parse_webhook(payload) {
        ParsedWebhook::Ignored(event) => {
            tracing::debug!(%event, "Evento ignorado");
            return Ok(WebhookResult::Ignored(event));
        }
        ParsedWebhook::Messages(parsed) => parsed,
    };

    let mut messages = Vec::with_capacity(parsed.len());
    for item in parsed {
        match item {
            Ok(message) => messages.push(message),
            Err(reason) => tracing::debug!(?reason, "Mensagem descartada"),
        }
    }

    if messages.is_empty() {
        return Ok(WebhookResult::Processed(Vec::new()));
    }

    let service = match InvocationConfig::load(state).await {
        Ok(config) => WebhookService::new(state, &config),
        Err(AppError::Configuration(missing)) => {
            tracing::warn!(%missing, "⚠️ Gateway sem credenciais: mensagens gravadas sem resposta automática");
            WebhookService::without_gateway(state)
        }
        Err(e) => return Err(e),
    };
    Ok(WebhookResult::Processed(service.handle_messages(messages).await))
}

fn has_text(message: &InboundMessage) -> bool {
    match &message.media {
        Some(media) => media.caption.as_deref().is_some_and(|c| !c.trim().is_empty()),
        None => !message.text.trim().is_empty(),
    }
}

fn customer_message(
    conversation_id: uuid::Uuid,
    message: &InboundMessage,
    content: String,
    media_url: Option<String>,
) -> NewMessage {
    NewMessage {
        conversation_id,
        sender_type: SenderType::Customer,
        content,
        media_type: message.media.as_ref().map(|m| m.kind),
        media_url,
        status: MessageStatus::Received,
        whatsapp_message_id: message.message_id.clone(),
        reply_to: None,
        created_at: message.received_at,
    }
}

fn extension_for(mimetype: &str) -> Option<&'static str> {
    let essence = mimetype.split(';').next().unwrap_or(mimetype).trim();
    match essence {
        "audio/ogg" => Some("ogg"),
        "audio/mpeg" => Some("mp3"),
        "audio/mp4" => Some("m4a"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}
