// src/db/memory_store.rs

//! Implementação em memória da porta de armazenamento. Reproduz as mesmas
//! restrições únicas do esquema Postgres (respostas por envio, pesquisa ativa
//! por envio, telefone na lista de bloqueio, livro de envios automáticos).

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    BlacklistStore, CampaignStore, ConversationStore, DashboardStore, SettingsStore, SurveyStore,
    TemplateStore,
};
use crate::{
    common::error::AppError,
    models::{
        blacklist::BlacklistEntry,
        campaign::{
            Campaign, CampaignResponse, CampaignSend, CampaignSendStatus, CampaignStatus,
            NewCampaignResponse, NewCampaignSend,
        },
        conversation::{Conversation, ConversationStatus, Message, NewConversation, NewMessage},
        dashboard::DriverPerformance,
        settings::EvolutionConfigRow,
        survey::{NewSurvey, SatisfactionSurvey, SurveyStatus},
        template::{
            AutomaticTemplateSend, CreateTemplateRequest, NewAutomaticSend, TemplateStatus,
            WhatsAppTemplate,
        },
    },
};

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    messages: Vec<Message>,
    campaigns: Vec<Campaign>,
    campaign_sends: Vec<CampaignSend>,
    campaign_responses: Vec<CampaignResponse>,
    surveys: Vec<SatisfactionSurvey>,
    blacklist: Vec<BlacklistEntry>,
    templates: Vec<WhatsAppTemplate>,
    automatic_sends: Vec<AutomaticTemplateSend>,
    evolution_config: Option<EvolutionConfigRow>,
    settings: HashMap<String, String>,
    reject_messages: bool,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_evolution_config(self, row: EvolutionConfigRow) -> Self {
        self.lock().evolution_config = Some(row);
        self
    }

    // Leituras diretas para conferência em testes
    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock().conversations.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock().messages.clone()
    }

    pub fn campaign_responses(&self) -> Vec<CampaignResponse> {
        self.lock().campaign_responses.clone()
    }

    pub fn campaign_sends(&self) -> Vec<CampaignSend> {
        self.lock().campaign_sends.clone()
    }

    pub fn surveys(&self) -> Vec<SatisfactionSurvey> {
        self.lock().surveys.clone()
    }

    pub fn automatic_sends(&self) -> Vec<AutomaticTemplateSend> {
        self.lock().automatic_sends.clone()
    }

    /// Faz `insert_message` falhar, simulando o banco fora do ar só para o chat.
    pub fn reject_message_inserts(&self, reject: bool) {
        self.lock().reject_messages = reject;
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        // Um teste que entrou em pânico com a trava não invalida os dados
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found(what: &str) -> AppError {
    AppError::NotFound(what.to_string())
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_conversation_by_phone(&self, variants: &[String]) -> Result<Option<Conversation>, AppError> {
        let tables = self.lock();
        Ok(tables
            .conversations
            .iter()
            .filter(|c| variants.contains(&c.phone))
            .max_by_key(|c| c.last_message_at)
            .cloned())
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError> {
        Ok(self.lock().conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn create_conversation(&self, input: NewConversation) -> Result<Conversation, AppError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            phone: input.phone,
            name: input.name,
            status: ConversationStatus::Active,
            unread_count: input.unread_count,
            last_message_at: Some(input.last_message_at),
            tags: Vec::new(),
            created_at: Utc::now(),
        };
        self.lock().conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn touch_conversation_inbound(&self, id: Uuid, at: DateTime<Utc>, name: Option<&str>) -> Result<(), AppError> {
        let mut tables = self.lock();
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| not_found("Conversa"))?;

        conversation.last_message_at = Some(at);
        conversation.unread_count += 1;
        if conversation.name.as_deref().map_or(true, str::is_empty) {
            if let Some(name) = name {
                conversation.name = Some(name.to_string());
            }
        }
        Ok(())
    }

    async fn touch_conversation_outbound(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut tables = self.lock();
        if let Some(conversation) = tables.conversations.iter_mut().find(|c| c.id == id) {
            conversation.last_message_at = Some(at);
        }
        Ok(())
    }

    async fn add_conversation_tag(&self, id: Uuid, tag: &str) -> Result<(), AppError> {
        let mut tables = self.lock();
        if let Some(conversation) = tables.conversations.iter_mut().find(|c| c.id == id) {
            if !conversation.tags.iter().any(|t| t == tag) {
                conversation.tags.push(tag.to_string());
            }
        }
        Ok(())
    }

    async fn set_conversation_status(&self, id: Uuid, from: ConversationStatus, to: ConversationStatus) -> Result<bool, AppError> {
        let mut tables = self.lock();
        match tables.conversations.iter_mut().find(|c| c.id == id && c.status == from) {
            Some(conversation) => {
                conversation.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_conversation_read(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.lock();
        if let Some(conversation) = tables.conversations.iter_mut().find(|c| c.id == id) {
            conversation.unread_count = 0;
        }
        Ok(())
    }

    async fn list_conversations(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>, AppError> {
        let mut list: Vec<Conversation> = self
            .lock()
            .conversations
            .iter()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        list.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        Ok(list)
    }

    async fn insert_message(&self, input: NewMessage) -> Result<Message, AppError> {
        if self.lock().reject_messages {
            return Err(AppError::InternalServerError(anyhow::anyhow!("insert_message indisponível")));
        }
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: input.conversation_id,
            sender_type: input.sender_type,
            content: input.content,
            media_type: input.media_type,
            media_url: input.media_url,
            status: input.status,
            whatsapp_message_id: input.whatsapp_message_id,
            reply_to: input.reply_to,
            created_at: input.created_at,
        };
        self.lock().messages.push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError> {
        let mut list: Vec<Message> = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        list.sort_by_key(|m| m.created_at);
        Ok(list)
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn create_campaign(&self, name: &str, message_template: &str, total_recipients: i32) -> Result<Campaign, AppError> {
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name: name.to_string(),
            message_template: message_template.to_string(),
            status: CampaignStatus::Draft,
            total_recipients,
            sent_count: 0,
            failed_count: 0,
            blocked_count: 0,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.lock().campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError> {
        Ok(self.lock().campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError> {
        let mut list = self.lock().campaigns.clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn set_campaign_status(&self, id: Uuid, from: CampaignStatus, to: CampaignStatus) -> Result<bool, AppError> {
        let mut tables = self.lock();
        match tables.campaigns.iter_mut().find(|c| c.id == id && c.status == from) {
            Some(campaign) => {
                campaign.status = to;
                if matches!(to, CampaignStatus::Completed | CampaignStatus::CompletedWithErrors) {
                    campaign.finished_at = Some(Utc::now());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_campaign_progress(&self, id: Uuid, sent: i32, failed: i32, blocked: i32) -> Result<(), AppError> {
        let mut tables = self.lock();
        if let Some(campaign) = tables.campaigns.iter_mut().find(|c| c.id == id) {
            campaign.sent_count = sent;
            campaign.failed_count = failed;
            campaign.blocked_count = blocked;
        }
        Ok(())
    }

    async fn insert_campaign_send(&self, input: NewCampaignSend) -> Result<CampaignSend, AppError> {
        let recipient = input.recipient;
        let send = CampaignSend {
            id: Uuid::new_v4(),
            campaign_id: input.campaign_id,
            customer_name: recipient.customer_name,
            customer_phone: input.customer_phone,
            driver_name: recipient.driver_name,
            order_number: recipient.order_number,
            total_weight: recipient.total_weight,
            total_value: recipient.total_value,
            sku_count: recipient.sku_count,
            status: input.status,
            error_message: input.error_message,
            sent_at: input.sent_at,
            created_at: Utc::now(),
        };
        self.lock().campaign_sends.push(send.clone());
        Ok(send)
    }

    async fn get_campaign_sends(&self, ids: &[Uuid]) -> Result<Vec<CampaignSend>, AppError> {
        Ok(self
            .lock()
            .campaign_sends
            .iter()
            .filter(|s| ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn latest_campaign_send_for_phone(&self, variants: &[String]) -> Result<Option<CampaignSend>, AppError> {
        let tables = self.lock();
        // Em empate de horário vale o último inserido
        Ok(tables
            .campaign_sends
            .iter()
            .enumerate()
            .filter(|(_, s)| variants.contains(&s.customer_phone))
            .max_by_key(|(pos, s)| (s.sent_at.unwrap_or(s.created_at), *pos))
            .map(|(_, s)| s.clone()))
    }

    async fn set_campaign_send_status(&self, id: Uuid, from: CampaignSendStatus, to: CampaignSendStatus) -> Result<bool, AppError> {
        let mut tables = self.lock();
        match tables.campaign_sends.iter_mut().find(|s| s.id == id && s.status == from) {
            Some(send) => {
                send.status = to;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_campaign_response(&self, campaign_send_id: Uuid) -> Result<Option<CampaignResponse>, AppError> {
        Ok(self
            .lock()
            .campaign_responses
            .iter()
            .find(|r| r.campaign_send_id == campaign_send_id)
            .cloned())
    }

    async fn insert_campaign_response(&self, input: NewCampaignResponse) -> Result<bool, AppError> {
        let mut tables = self.lock();
        if tables.campaign_responses.iter().any(|r| r.campaign_send_id == input.campaign_send_id) {
            return Ok(false);
        }
        tables.campaign_responses.push(CampaignResponse {
            id: Uuid::new_v4(),
            campaign_send_id: input.campaign_send_id,
            conversation_id: input.conversation_id,
            phone: input.phone,
            response_type: input.response_type,
            created_at: Utc::now(),
        });
        Ok(true)
    }
}

#[async_trait]
impl SurveyStore for MemoryStore {
    async fn surveys_with_status(&self, status: SurveyStatus) -> Result<Vec<SatisfactionSurvey>, AppError> {
        Ok(self.lock().surveys.iter().filter(|s| s.status == status).cloned().collect())
    }

    async fn get_survey(&self, id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError> {
        Ok(self.lock().surveys.iter().find(|s| s.id == id).cloned())
    }

    async fn active_survey_for_send(&self, campaign_send_id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError> {
        Ok(self
            .lock()
            .surveys
            .iter()
            .find(|s| s.campaign_send_id == campaign_send_id && s.status != SurveyStatus::Cancelled)
            .cloned())
    }

    async fn create_survey(&self, input: NewSurvey) -> Result<Option<SatisfactionSurvey>, AppError> {
        let mut tables = self.lock();
        let exists = tables
            .surveys
            .iter()
            .any(|s| s.campaign_send_id == input.campaign_send_id && s.status != SurveyStatus::Cancelled);
        if exists {
            return Ok(None);
        }

        let survey = SatisfactionSurvey {
            id: Uuid::new_v4(),
            campaign_send_id: input.campaign_send_id,
            customer_name: input.customer_name,
            customer_phone: input.customer_phone,
            driver_name: input.driver_name,
            status: SurveyStatus::Pending,
            rating: None,
            feedback: None,
            error_message: None,
            sent_at: None,
            responded_at: None,
            created_at: Utc::now(),
        };
        tables.surveys.push(survey.clone());
        Ok(Some(survey))
    }

    async fn sends_without_survey(&self) -> Result<Vec<CampaignSend>, AppError> {
        let tables = self.lock();
        Ok(tables
            .campaign_sends
            .iter()
            .filter(|cs| matches!(cs.status, CampaignSendStatus::Success | CampaignSendStatus::Confirmed))
            .filter(|cs| {
                !tables
                    .surveys
                    .iter()
                    .any(|s| s.campaign_send_id == cs.id && s.status != SurveyStatus::Cancelled)
            })
            .cloned()
            .collect())
    }

    async fn record_survey_rating(&self, id: Uuid, rating: i16) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|s| s.id == id && s.status == SurveyStatus::Sent && s.rating.is_none());
        match survey {
            Some(survey) => {
                survey.rating = Some(rating);
                survey.status = SurveyStatus::AwaitingFeedback;
                survey.responded_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_survey_feedback(&self, id: Uuid, feedback: &str) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let survey = tables
            .surveys
            .iter_mut()
            .find(|s| s.id == id && s.status == SurveyStatus::AwaitingFeedback);
        match survey {
            Some(survey) => {
                survey.feedback = Some(feedback.to_string());
                survey.status = SurveyStatus::Responded;
                survey.responded_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_survey_delivery(&self, id: Uuid, from: SurveyStatus, to: SurveyStatus, error: Option<&str>) -> Result<bool, AppError> {
        let mut tables = self.lock();
        match tables.surveys.iter_mut().find(|s| s.id == id && s.status == from) {
            Some(survey) => {
                survey.status = to;
                survey.error_message = error.map(str::to_string);
                if to == SurveyStatus::Sent {
                    survey.sent_at = Some(Utc::now());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn expire_surveys(&self, older_than: DateTime<Utc>) -> Result<u64, AppError> {
        let mut tables = self.lock();
        let mut expired = 0;
        for survey in tables.surveys.iter_mut() {
            let stale = survey.sent_at.is_some_and(|at| at < older_than);
            if stale && matches!(survey.status, SurveyStatus::Sent | SurveyStatus::AwaitingFeedback) {
                survey.status = SurveyStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

#[async_trait]
impl BlacklistStore for MemoryStore {
    async fn is_blacklisted(&self, variants: &[String]) -> Result<bool, AppError> {
        Ok(self.lock().blacklist.iter().any(|b| variants.contains(&b.phone)))
    }

    async fn add_to_blacklist(&self, phone: &str, reason: Option<&str>) -> Result<bool, AppError> {
        let mut tables = self.lock();
        if tables.blacklist.iter().any(|b| b.phone == phone) {
            return Ok(false);
        }
        tables.blacklist.push(BlacklistEntry {
            id: Uuid::new_v4(),
            phone: phone.to_string(),
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, AppError> {
        Ok(self.lock().blacklist.clone())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn active_evolution_config(&self) -> Result<Option<EvolutionConfigRow>, AppError> {
        Ok(self.lock().evolution_config.clone().filter(|row| row.is_active))
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.lock().settings.get(key).cloned())
    }

    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.lock().settings.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[async_trait]
impl TemplateStore for MemoryStore {
    async fn list_templates(&self) -> Result<Vec<WhatsAppTemplate>, AppError> {
        let mut list = self.lock().templates.clone();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn create_template(&self, input: CreateTemplateRequest) -> Result<WhatsAppTemplate, AppError> {
        let mut tables = self.lock();
        if tables.templates.iter().any(|t| t.name == input.name && t.language == input.language) {
            return Err(AppError::Conflict(format!("O template '{}' já existe.", input.name)));
        }
        let template = WhatsAppTemplate {
            id: Uuid::new_v4(),
            name: input.name,
            language: input.language,
            category: input.category,
            body: input.body,
            variables: input.variables,
            status: TemplateStatus::Pending,
            trigger_status: input.trigger_status,
            created_at: Utc::now(),
        };
        tables.templates.push(template.clone());
        Ok(template)
    }

    async fn get_template(&self, id: Uuid) -> Result<Option<WhatsAppTemplate>, AppError> {
        Ok(self.lock().templates.iter().find(|t| t.id == id).cloned())
    }

    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> Result<(), AppError> {
        let mut tables = self.lock();
        let template = tables
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found("Template"))?;
        template.status = status;
        Ok(())
    }

    async fn approved_templates_for_trigger(&self, trigger_status: &str) -> Result<Vec<WhatsAppTemplate>, AppError> {
        Ok(self
            .lock()
            .templates
            .iter()
            .filter(|t| t.status == TemplateStatus::Approved)
            .filter(|t| {
                t.trigger_status
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(trigger_status))
            })
            .cloned()
            .collect())
    }

    async fn automatic_send_exists(&self, order_number: &str, trigger_status: &str) -> Result<bool, AppError> {
        Ok(self
            .lock()
            .automatic_sends
            .iter()
            .any(|s| s.order_number == order_number && s.trigger_status == trigger_status))
    }

    async fn record_automatic_send(&self, input: NewAutomaticSend) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let exists = tables
            .automatic_sends
            .iter()
            .any(|s| s.order_number == input.order_number && s.trigger_status == input.trigger_status);
        if exists {
            return Ok(false);
        }
        tables.automatic_sends.push(AutomaticTemplateSend {
            id: Uuid::new_v4(),
            order_number: input.order_number,
            trigger_status: input.trigger_status,
            template_name: input.template_name,
            phone: input.phone,
            sent_at: Utc::now(),
        });
        Ok(true)
    }
}

#[async_trait]
impl DashboardStore for MemoryStore {
    async fn driver_performance(&self) -> Result<Vec<DriverPerformance>, AppError> {
        let tables = self.lock();
        let mut by_driver: HashMap<&str, (DriverPerformance, Vec<i16>)> = HashMap::new();

        for send in &tables.campaign_sends {
            let Some(driver) = send.driver_name.as_deref().filter(|d| !d.is_empty()) else {
                continue;
            };
            let (row, ratings) = by_driver.entry(driver).or_insert_with(|| {
                (
                    DriverPerformance {
                        driver_name: driver.to_string(),
                        deliveries: 0,
                        confirmed: 0,
                        reschedules: 0,
                        surveys_answered: 0,
                        average_rating: None,
                    },
                    Vec::new(),
                )
            });

            if send.status.was_delivered() {
                row.deliveries += 1;
            }
            match send.status {
                CampaignSendStatus::Confirmed => row.confirmed += 1,
                CampaignSendStatus::RescheduleRequested => row.reschedules += 1,
                _ => {}
            }
            ratings.extend(
                tables
                    .surveys
                    .iter()
                    .filter(|s| s.campaign_send_id == send.id && s.status != SurveyStatus::Cancelled)
                    .filter_map(|s| s.rating),
            );
        }

        let mut rows: Vec<DriverPerformance> = by_driver
            .into_values()
            .map(|(mut row, ratings)| {
                row.surveys_answered = ratings.len() as i64;
                if !ratings.is_empty() {
                    let total: f64 = ratings.iter().map(|r| f64::from(*r)).sum();
                    row.average_rating = Some(total / ratings.len() as f64);
                }
                row
            })
            .collect();
        rows.sort_by(|a, b| b.deliveries.cmp(&a.deliveries).then_with(|| a.driver_name.cmp(&b.driver_name)));
        Ok(rows)
    }
}
