// src/services/sender_service.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    clients::{GatewayReceipt, OutboundMedia, SendError, TemplateMessage, WhatsAppGateway},
    common::{
        error::AppError,
        phone::{is_valid_length, lookup_variants, normalize, to_whatsapp_format},
        side_effect::BestEffort,
    },
    config::AppState,
    db::Store,
    models::{
        conversation::{MediaKind, Message, MessageStatus, NewConversation, NewMessage, SenderType},
        status::StatusMachine,
        survey::{SatisfactionSurvey, SurveyStatus},
    },
    services::credentials::{InvocationConfig, DEFAULT_TEMPLATE_LANGUAGE},
};

/// Onde a mensagem enviada fica registrada no chat do painel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum History {
    // Respostas automáticas e pesquisas não aparecem no chat
    Skip,
    Into(Uuid),
    // Busca (ou cria) a conversa pelo telefone, com o nome do cliente se houver
    ByPhone(Option<String>),
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub phone: String,
    pub receipt: GatewayReceipt,
    pub message: Option<Message>,
}

#[derive(Clone)]
pub struct OutboundSender {
    store: Arc<dyn Store>,
    gateway: Arc<dyn WhatsAppGateway>,
    template_name: Option<String>,
    template_language: String,
}

impl OutboundSender {
    pub fn new(state: &AppState, config: &InvocationConfig) -> Self {
        let credentials = &config.credentials;
        let template_name = if credentials.is_official { credentials.template_name.clone() } else { None };
        Self {
            store: state.store.clone(),
            gateway: state.connector.connect(credentials),
            template_name,
            template_language: credentials
                .template_language
                .clone()
                .unwrap_or_else(|| DEFAULT_TEMPLATE_LANGUAGE.to_string()),
        }
    }

    /// Formata o destino e consulta a blacklist antes de qualquer chamada ao gateway.
    async fn prepare(&self, phone: &str) -> Result<String, SendError> {
        let formatted = to_whatsapp_format(phone);
        if !is_valid_length(&formatted) {
            return Err(SendError::InvalidPhone(phone.to_string()));
        }

        if self.store.is_blacklisted(&lookup_variants(&formatted)).await? {
            tracing::info!(phone = %formatted, "🚫 Envio bloqueado pela blacklist");
            return Err(SendError::Blacklisted);
        }

        Ok(formatted)
    }

    pub async fn send_text(&self, phone: &str, text: &str, history: History) -> Result<SentMessage, SendError> {
        let number = self.prepare(phone).await?;
        let receipt = self.gateway.send_text(&number, text).await?;
        tracing::info!(phone = %number, "📤 Texto enviado");

        let message = self.record(&number, &history, text, None, &receipt).await;
        Ok(SentMessage { phone: number, receipt, message })
    }

    pub async fn send_media(&self, phone: &str, media: &OutboundMedia, history: History) -> Result<SentMessage, SendError> {
        let number = self.prepare(phone).await?;
        let receipt = self.gateway.send_media(&number, media).await?;
        tracing::info!(phone = %number, kind = %media.kind, "📤 Mídia enviada");

        let content = media
            .caption
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| media.kind.placeholder().to_string());
        let message = self.record(&number, &history, &content, Some((media.kind, media.url.as_str())), &receipt).await;
        Ok(SentMessage { phone: number, receipt, message })
    }

    pub async fn send_template(
        &self,
        phone: &str,
        template: &TemplateMessage,
        history: History,
    ) -> Result<SentMessage, SendError> {
        let number = self.prepare(phone).await?;
        let receipt = self.gateway.send_template(&number, template).await?;
        tracing::info!(phone = %number, template = %template.name, "📤 Template enviado");

        let content = format!("[Template: {}]", template.name);
        let message = self.record(&number, &history, &content, None, &receipt).await;
        Ok(SentMessage { phone: number, receipt, message })
    }

    /// Envia a pesquisa e grava o resultado na própria pesquisa.
    ///
    /// Com a API oficial usa o template configurado (parâmetro: nome do cliente);
    /// na instância QR manda o texto pedindo a nota.
    pub async fn send_survey(&self, survey: &SatisfactionSurvey) -> Result<SentMessage, SendError> {
        let result = match &self.template_name {
            Some(name) => {
                let template = TemplateMessage {
                    name: name.clone(),
                    language: self.template_language.clone(),
                    parameters: vec![survey.customer_name.clone()],
                };
                self.send_template(&survey.customer_phone, &template, History::Skip).await
            }
            None => {
                let prompt = survey_prompt(&survey.customer_name);
                self.send_text(&survey.customer_phone, &prompt, History::Skip).await
            }
        };

        let (to, error) = match &result {
            Ok(_) => (SurveyStatus::Sent, None),
            Err(SendError::Blacklisted) if survey.status.allows(SurveyStatus::NotSent) => {
                (SurveyStatus::NotSent, Some(SendError::Blacklisted.to_string()))
            }
            Err(e) => (SurveyStatus::Failed, Some(e.to_string())),
        };

        match self.store.record_survey_delivery(survey.id, survey.status, to, error.as_deref()).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(survey_id = %survey.id, "⚠️ Pesquisa mudou de status durante o envio"),
            Err(e) => tracing::error!(survey_id = %survey.id, error = ?e, "❌ Falha ao gravar o envio da pesquisa"),
        }

        result
    }

    /// Resposta automática ao cliente: nunca interrompe quem chamou.
    pub async fn reply(&self, phone: &str, text: &str) -> BestEffort<GatewayReceipt> {
        let result = self.send_text(phone, text, History::Skip).await.map(|sent| sent.receipt);
        BestEffort::from_result("resposta automática", result)
    }

    // Falhas aqui não desfazem o envio, que já aconteceu
    async fn record(
        &self,
        number: &str,
        history: &History,
        content: &str,
        media: Option<(MediaKind, &str)>,
        receipt: &GatewayReceipt,
    ) -> Option<Message> {
        if *history == History::Skip {
            return None;
        }

        match self.persist(number, history, content, media, receipt).await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(phone = %number, error = ?e, "❌ Mensagem enviada mas não registrada no chat");
                None
            }
        }
    }

    async fn persist(
        &self,
        number: &str,
        history: &History,
        content: &str,
        media: Option<(MediaKind, &str)>,
        receipt: &GatewayReceipt,
    ) -> Result<Option<Message>, AppError> {
        let now = Utc::now();

        let conversation_id = match history {
            History::Skip => return Ok(None),
            History::Into(id) => *id,
            History::ByPhone(name) => {
                match self.store.find_conversation_by_phone(&lookup_variants(number)).await? {
                    Some(conversation) => conversation.id,
                    None => {
                        let created = self
                            .store
                            .create_conversation(NewConversation {
                                phone: normalize(number),
                                name: name.clone(),
                                last_message_at: now,
                                unread_count: 0,
                            })
                            .await?;
                        created.id
                    }
                }
            }
        };

        let message = self
            .store
            .insert_message(NewMessage {
                conversation_id,
                sender_type: SenderType::Operator,
                content: content.to_string(),
                media_type: media.map(|(kind, _)| kind),
                media_url: media.map(|(_, url)| url.to_string()),
                status: MessageStatus::Sent,
                whatsapp_message_id: receipt.message_id.clone(),
                reply_to: None,
                created_at: now,
            })
            .await?;

        self.store.touch_conversation_outbound(conversation_id, now).await?;
        Ok(Some(message))
    }
}

pub fn survey_prompt(customer_name: &str) -> String {
    let name = customer_name.trim();
    let greeting = if name.is_empty() { "Olá!".to_string() } else { format!("Olá, {}!", name) };
    format!(
        "{} Sua entrega foi concluída. Como você avalia o nosso atendimento? \
         Responda com uma nota de 1 a 5, sendo 1 muito ruim e 5 excelente.",
        greeting
    )
}
