// tests/webhook_tests.rs

mod common;

use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;

use common::{post_webhook, test_app, test_app_from, test_settings, text_event, Sent, TestApp, RESCHEDULE_PHONE};
use painel_entregas::{
    clients::DownloadedMedia,
    common::phone::lookup_variants,
    config::GatewaySecrets,
    db::{BlacklistStore, CampaignStore, ConversationStore, MemoryStore, SurveyStore},
    models::{
        blacklist::REASON_WRONG_NUMBER,
        campaign::{CampaignRecipient, CampaignSend, CampaignSendStatus, NewCampaignSend, ResponseType},
        conversation::{MediaKind, NewConversation, SenderType, TAG_CONFIRMED, TAG_RESCHEDULE},
        survey::{NewSurvey, SatisfactionSurvey, SurveyStatus},
    },
    services::webhook_service::{
        reschedule_reply, REPLY_CONFIRMED, REPLY_FEEDBACK_THANKS, REPLY_RATING_RETRY, REPLY_RATING_THANKS,
    },
};

const PHONE: &str = "11999998888";
const JID: &str = "5511999998888@s.whatsapp.net";
const GATEWAY_NUMBER: &str = "5511999998888";

async fn seed_send(app: &TestApp, status: CampaignSendStatus) -> CampaignSend {
    let campaign = app.store.create_campaign("Entregas do dia", "Olá {nome}", 1).await.unwrap();
    app.store
        .insert_campaign_send(NewCampaignSend {
            campaign_id: campaign.id,
            recipient: CampaignRecipient {
                customer_name: "Ana".into(),
                phone: PHONE.into(),
                driver_name: Some("Carlos".into()),
                order_number: Some("PED-1".into()),
                total_weight: None,
                total_value: None,
                sku_count: None,
            },
            customer_phone: PHONE.into(),
            status,
            error_message: None,
            sent_at: Some(Utc::now()),
        })
        .await
        .unwrap()
}

async fn seed_conversation(app: &TestApp) {
    app.store
        .create_conversation(NewConversation {
            phone: PHONE.into(),
            name: Some("Ana".into()),
            last_message_at: Utc::now(),
            unread_count: 0,
        })
        .await
        .unwrap();
}

async fn seed_sent_survey(app: &TestApp) -> SatisfactionSurvey {
    let send = seed_send(app, CampaignSendStatus::Success).await;
    let survey = app
        .store
        .create_survey(NewSurvey {
            campaign_send_id: send.id,
            customer_name: "Ana".into(),
            customer_phone: PHONE.into(),
            driver_name: Some("Carlos".into()),
        })
        .await
        .unwrap()
        .unwrap();
    assert!(app
        .store
        .record_survey_delivery(survey.id, SurveyStatus::Pending, SurveyStatus::Sent, None)
        .await
        .unwrap());
    survey
}

fn texts_sent(app: &TestApp) -> Vec<String> {
    app.gateway
        .sent()
        .into_iter()
        .filter_map(|sent| match sent {
            Sent::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn rating_is_recorded_and_thanked() {
    let app = test_app();
    let survey = seed_sent_survey(&app).await;

    let (status, body) = post_webhook(&app, text_event(JID, "WA-1", "4")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);

    let stored = app.store.get_survey(survey.id).await.unwrap().unwrap();
    assert_eq!(stored.rating, Some(4));
    assert_eq!(stored.status, SurveyStatus::AwaitingFeedback);

    assert_eq!(
        app.gateway.sent(),
        vec![Sent::Text { number: GATEWAY_NUMBER.into(), text: REPLY_RATING_THANKS.into() }]
    );
    // A nota não vira mensagem de chat
    assert!(app.store.messages().is_empty());
}

#[tokio::test]
async fn non_numeric_answer_to_survey_asks_again() {
    let app = test_app();
    let survey = seed_sent_survey(&app).await;

    post_webhook(&app, text_event(JID, "WA-1", "foi ótimo")).await;

    let stored = app.store.get_survey(survey.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SurveyStatus::Sent);
    assert!(stored.rating.is_none());
    assert_eq!(texts_sent(&app), vec![REPLY_RATING_RETRY.to_string()]);
}

#[tokio::test]
async fn free_text_after_rating_is_stored_as_feedback() {
    let app = test_app();
    let survey = seed_sent_survey(&app).await;
    post_webhook(&app, text_event(JID, "WA-1", "5")).await;

    post_webhook(&app, text_event(JID, "WA-2", "  Motorista muito educado ")).await;

    let stored = app.store.get_survey(survey.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SurveyStatus::Responded);
    assert_eq!(stored.rating, Some(5));
    assert_eq!(stored.feedback.as_deref(), Some("Motorista muito educado"));
    assert_eq!(
        texts_sent(&app),
        vec![REPLY_RATING_THANKS.to_string(), REPLY_FEEDBACK_THANKS.to_string()]
    );
}

#[tokio::test]
async fn confirmation_is_applied_once_even_if_webhook_repeats() {
    let app = test_app();
    let send = seed_send(&app, CampaignSendStatus::Success).await;
    seed_conversation(&app).await;

    post_webhook(&app, text_event(JID, "WA-1", "1")).await;
    post_webhook(&app, text_event(JID, "WA-1", "1")).await;

    let responses = app.store.campaign_responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].campaign_send_id, send.id);
    assert_eq!(responses[0].response_type, ResponseType::Confirmed);

    let sends = app.store.campaign_sends();
    assert_eq!(sends[0].status, CampaignSendStatus::Confirmed);

    let conversation = &app.store.conversations()[0];
    assert_eq!(conversation.tags, vec![TAG_CONFIRMED.to_string()]);
    assert_eq!(conversation.unread_count, 1);

    let messages = app.store.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_type, SenderType::Customer);
    assert_eq!(messages[0].content, "1");

    assert_eq!(texts_sent(&app), vec![REPLY_CONFIRMED.to_string()]);
}

#[tokio::test]
async fn reschedule_request_tags_and_sends_contact_phone() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;
    seed_conversation(&app).await;

    post_webhook(&app, text_event(JID, "WA-1", "2")).await;

    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::RescheduleRequested);
    assert_eq!(app.store.conversations()[0].tags, vec![TAG_RESCHEDULE.to_string()]);
    assert_eq!(texts_sent(&app), vec![reschedule_reply(RESCHEDULE_PHONE)]);
}

#[tokio::test]
async fn wrong_number_goes_to_blacklist_without_reply() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;
    seed_conversation(&app).await;

    post_webhook(&app, text_event(JID, "WA-1", "3")).await;

    assert!(app.store.is_blacklisted(&lookup_variants(PHONE)).await.unwrap());
    let entries = app.store.list_blacklist().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].reason.as_deref(), Some(REASON_WRONG_NUMBER));

    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Blocked);
    assert_eq!(app.store.campaign_responses()[0].response_type, ResponseType::WrongNumber);
    assert!(app.gateway.sent().is_empty());
}

#[tokio::test]
async fn pending_survey_wins_over_campaign_answer() {
    let app = test_app();
    let survey = seed_sent_survey(&app).await;
    seed_conversation(&app).await;

    // "3" também seria "número errado" para a campanha
    post_webhook(&app, text_event(JID, "WA-1", "3")).await;

    let stored = app.store.get_survey(survey.id).await.unwrap().unwrap();
    assert_eq!(stored.rating, Some(3));
    assert_eq!(stored.status, SurveyStatus::AwaitingFeedback);

    assert!(!app.store.is_blacklisted(&lookup_variants(PHONE)).await.unwrap());
    assert!(app.store.campaign_responses().is_empty());
    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Success);
    assert!(app.store.messages().is_empty());
    assert_eq!(texts_sent(&app), vec![REPLY_RATING_THANKS.to_string()]);
}

#[tokio::test]
async fn wrong_number_survives_a_failed_chat_insert() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;
    seed_conversation(&app).await;
    app.store.reject_message_inserts(true);

    let (status, _) = post_webhook(&app, text_event(JID, "WA-1", "3")).await;
    assert_eq!(status, StatusCode::OK);

    assert!(app.store.is_blacklisted(&lookup_variants(PHONE)).await.unwrap());
    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Blocked);
    assert_eq!(app.store.campaign_responses().len(), 1);
    assert!(app.store.messages().is_empty());

    // Nova entrega do mesmo evento não duplica nada
    app.store.reject_message_inserts(false);
    post_webhook(&app, text_event(JID, "WA-1", "3")).await;
    assert_eq!(app.store.campaign_responses().len(), 1);
    assert_eq!(app.store.list_blacklist().await.unwrap().len(), 1);
}

#[tokio::test]
async fn confirmation_still_replies_when_chat_insert_fails() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;
    seed_conversation(&app).await;
    app.store.reject_message_inserts(true);

    post_webhook(&app, text_event(JID, "WA-1", "1")).await;

    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Confirmed);
    assert_eq!(app.store.campaign_responses()[0].response_type, ResponseType::Confirmed);
    assert_eq!(texts_sent(&app), vec![REPLY_CONFIRMED.to_string()]);
}

#[tokio::test]
async fn messages_are_stored_without_gateway_credentials() {
    let mut settings = test_settings();
    settings.gateway = GatewaySecrets::default();
    let app = test_app_from(MemoryStore::new(), settings);
    seed_send(&app, CampaignSendStatus::Success).await;

    let (status, body) = post_webhook(&app, text_event(JID, "WA-1", "Oi, onde está meu pedido?")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);
    assert_eq!(app.store.messages().len(), 1);
    assert_eq!(app.store.conversations()[0].phone, PHONE);

    // A resposta de campanha também é aplicada; só a mensagem automática fica de fora
    post_webhook(&app, text_event(JID, "WA-2", "1")).await;
    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Confirmed);
    assert_eq!(app.store.conversations()[0].tags, vec![TAG_CONFIRMED.to_string()]);
    assert_eq!(app.store.messages().len(), 2);

    assert!(app.gateway.sent().is_empty());
    assert!(app.connector.last_credentials.lock().unwrap().is_none());
}

#[tokio::test]
async fn campaign_digit_without_conversation_changes_nothing() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;

    let (status, body) = post_webhook(&app, text_event(JID, "WA-1", "1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processed"], 1);

    assert!(app.store.conversations().is_empty());
    assert!(app.store.messages().is_empty());
    assert!(app.store.campaign_responses().is_empty());
    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Success);
}

#[tokio::test]
async fn plain_text_opens_a_conversation() {
    let app = test_app();
    seed_send(&app, CampaignSendStatus::Success).await;

    post_webhook(&app, text_event(JID, "WA-1", "Ótimo atendimento")).await;

    let conversations = app.store.conversations();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].phone, PHONE);
    assert_eq!(conversations[0].name.as_deref(), Some("Cliente Teste"));
    assert_eq!(conversations[0].unread_count, 1);

    let messages = app.store.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "Ótimo atendimento");
    assert_eq!(messages[0].whatsapp_message_id.as_deref(), Some("WA-1"));
    assert!(app.store.campaign_responses().is_empty());
}

#[tokio::test]
async fn inbound_audio_is_copied_to_storage() {
    let app = test_app();
    *app.gateway.media.lock().unwrap() = Some(DownloadedMedia {
        bytes: vec![1, 2, 3],
        mimetype: Some("audio/ogg; codecs=opus".into()),
    });

    let payload = json!({
        "event": "messages.upsert",
        "data": {
            "key": { "remoteJid": JID, "fromMe": false, "id": "AUDIO-1" },
            "message": {
                "audioMessage": { "url": "https://mmg.whatsapp.net/original.enc", "mimetype": "audio/ogg; codecs=opus" }
            }
        }
    });
    post_webhook(&app, payload).await;

    let uploads = app.storage.uploads.lock().unwrap().clone();
    assert_eq!(uploads, vec![(format!("{PHONE}/AUDIO-1.ogg"), "audio/ogg; codecs=opus".to_string())]);

    let messages = app.store.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "[Áudio]");
    assert_eq!(messages[0].media_type, Some(MediaKind::Audio));
    assert_eq!(
        messages[0].media_url.as_deref(),
        Some("https://storage.test/whatsapp-media/11999998888/AUDIO-1.ogg")
    );
}

#[tokio::test]
async fn media_download_failure_keeps_original_url() {
    let app = test_app();
    let payload = json!({
        "event": "messages.upsert",
        "data": {
            "key": { "remoteJid": JID, "fromMe": false, "id": "IMG-1" },
            "message": {
                "imageMessage": { "url": "https://mmg.whatsapp.net/foto.enc", "caption": "comprovante" }
            }
        }
    });
    post_webhook(&app, payload).await;

    let messages = app.store.messages();
    assert_eq!(messages[0].content, "comprovante");
    assert_eq!(messages[0].media_url.as_deref(), Some("https://mmg.whatsapp.net/foto.enc"));
    assert!(app.storage.uploads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn other_events_are_acknowledged_and_ignored() {
    let app = test_app();
    let (status, body) = post_webhook(&app, json!({ "event": "connection.update", "data": { "state": "open" } })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["ignored"], "connection.update");
    assert!(app.store.conversations().is_empty());
}

#[tokio::test]
async fn own_and_group_messages_are_skipped() {
    let app = test_app();
    let mut from_me = text_event(JID, "WA-1", "oi");
    from_me["data"]["key"]["fromMe"] = json!(true);
    let group = text_event("120363025246125888@g.us", "WA-2", "oi grupo");

    let (_, body) = post_webhook(&app, from_me).await;
    assert_eq!(body["processed"], 0);
    let (_, body) = post_webhook(&app, group).await;
    assert_eq!(body["processed"], 0);

    assert!(app.store.conversations().is_empty());
}
