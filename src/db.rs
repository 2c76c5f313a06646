// src/db.rs

//! Porta de armazenamento. `PgStore` fala com o Postgres do Supabase;
//! `MemoryStore` guarda tudo em memória (testes e execução local).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

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
        template::{CreateTemplateRequest, NewAutomaticSend, TemplateStatus, WhatsAppTemplate},
    },
};

pub mod pg_store;
pub use pg_store::PgStore;
pub mod memory_store;
pub use memory_store::MemoryStore;

pub mod conversation_repo;
pub mod campaign_repo;
pub mod survey_repo;
pub mod blacklist_repo;
pub mod settings_repo;
pub mod template_repo;
pub mod dashboard_repo;

// Telefones são sempre buscados pelas variantes de common::phone::lookup_variants

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn find_conversation_by_phone(&self, variants: &[String]) -> Result<Option<Conversation>, AppError>;
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, AppError>;
    async fn create_conversation(&self, input: NewConversation) -> Result<Conversation, AppError>;
    /// Nova mensagem do cliente: atualiza horário, soma não lidas e preenche o nome se faltava.
    async fn touch_conversation_inbound(&self, id: Uuid, at: DateTime<Utc>, name: Option<&str>) -> Result<(), AppError>;
    async fn touch_conversation_outbound(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;
    async fn add_conversation_tag(&self, id: Uuid, tag: &str) -> Result<(), AppError>;
    async fn set_conversation_status(&self, id: Uuid, from: ConversationStatus, to: ConversationStatus) -> Result<bool, AppError>;
    async fn mark_conversation_read(&self, id: Uuid) -> Result<(), AppError>;
    async fn list_conversations(&self, status: Option<ConversationStatus>) -> Result<Vec<Conversation>, AppError>;
    async fn insert_message(&self, input: NewMessage) -> Result<Message, AppError>;
    async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, AppError>;
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create_campaign(&self, name: &str, message_template: &str, total_recipients: i32) -> Result<Campaign, AppError>;
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, AppError>;
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, AppError>;
    async fn set_campaign_status(&self, id: Uuid, from: CampaignStatus, to: CampaignStatus) -> Result<bool, AppError>;
    async fn update_campaign_progress(&self, id: Uuid, sent: i32, failed: i32, blocked: i32) -> Result<(), AppError>;
    async fn insert_campaign_send(&self, input: NewCampaignSend) -> Result<CampaignSend, AppError>;
    async fn get_campaign_sends(&self, ids: &[Uuid]) -> Result<Vec<CampaignSend>, AppError>;
    async fn latest_campaign_send_for_phone(&self, variants: &[String]) -> Result<Option<CampaignSend>, AppError>;
    async fn set_campaign_send_status(&self, id: Uuid, from: CampaignSendStatus, to: CampaignSendStatus) -> Result<bool, AppError>;
    async fn find_campaign_response(&self, campaign_send_id: Uuid) -> Result<Option<CampaignResponse>, AppError>;
    /// `false` quando já existe resposta para o envio (chave única).
    async fn insert_campaign_response(&self, input: NewCampaignResponse) -> Result<bool, AppError>;
}

#[async_trait]
pub trait SurveyStore: Send + Sync {
    async fn surveys_with_status(&self, status: SurveyStatus) -> Result<Vec<SatisfactionSurvey>, AppError>;
    async fn get_survey(&self, id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError>;
    async fn active_survey_for_send(&self, campaign_send_id: Uuid) -> Result<Option<SatisfactionSurvey>, AppError>;
    /// `None` quando já existe pesquisa ativa para o envio (índice único parcial).
    async fn create_survey(&self, input: NewSurvey) -> Result<Option<SatisfactionSurvey>, AppError>;
    /// Envios entregues que ainda não têm pesquisa ativa.
    async fn sends_without_survey(&self) -> Result<Vec<CampaignSend>, AppError>;
    async fn record_survey_rating(&self, id: Uuid, rating: i16) -> Result<bool, AppError>;
    async fn record_survey_feedback(&self, id: Uuid, feedback: &str) -> Result<bool, AppError>;
    async fn record_survey_delivery(&self, id: Uuid, from: SurveyStatus, to: SurveyStatus, error: Option<&str>) -> Result<bool, AppError>;
    async fn expire_surveys(&self, older_than: DateTime<Utc>) -> Result<u64, AppError>;
}

#[async_trait]
pub trait BlacklistStore: Send + Sync {
    async fn is_blacklisted(&self, variants: &[String]) -> Result<bool, AppError>;
    /// `false` quando o telefone já estava na lista.
    async fn add_to_blacklist(&self, phone: &str, reason: Option<&str>) -> Result<bool, AppError>;
    async fn list_blacklist(&self) -> Result<Vec<BlacklistEntry>, AppError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn active_evolution_config(&self) -> Result<Option<EvolutionConfigRow>, AppError>;
    async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set_setting(&self, key: &str, value: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list_templates(&self) -> Result<Vec<WhatsAppTemplate>, AppError>;
    async fn create_template(&self, input: CreateTemplateRequest) -> Result<WhatsAppTemplate, AppError>;
    async fn get_template(&self, id: Uuid) -> Result<Option<WhatsAppTemplate>, AppError>;
    async fn set_template_status(&self, id: Uuid, status: TemplateStatus) -> Result<(), AppError>;
    async fn approved_templates_for_trigger(&self, trigger_status: &str) -> Result<Vec<WhatsAppTemplate>, AppError>;
    async fn automatic_send_exists(&self, order_number: &str, trigger_status: &str) -> Result<bool, AppError>;
    /// `false` quando o par (pedido, status) já estava no livro.
    async fn record_automatic_send(&self, input: NewAutomaticSend) -> Result<bool, AppError>;
}

#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn driver_performance(&self) -> Result<Vec<DriverPerformance>, AppError>;
}

pub trait Store:
    ConversationStore + CampaignStore + SurveyStore + BlacklistStore + SettingsStore + TemplateStore + DashboardStore
{
}

impl<T> Store for T where
    T: ConversationStore + CampaignStore + SurveyStore + BlacklistStore + SettingsStore + TemplateStore + DashboardStore
{
}
