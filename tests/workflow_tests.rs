// tests/workflow_tests.rs

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use chrono::{NaiveDate, Utc};
use serde_json::json;
use uuid::Uuid;

use common::{call, json_request, post_webhook, test_app, test_app_with, text_event, Sent, TestApp};
use painel_entregas::{
    db::{BlacklistStore, CampaignStore, MemoryStore, SettingsStore, SurveyStore, TemplateStore},
    models::{
        campaign::{Campaign, CampaignRecipient, CampaignSend, CampaignSendStatus, CampaignStatus, NewCampaignSend},
        order::ExternalOrder,
        settings::{
            EvolutionConfigRow, EvolutionConfigType, KEY_AUTO_TEMPLATE_ENABLED, KEY_AUTO_TEMPLATE_LAST_RUN,
            KEY_AUTO_TEMPLATE_MIN_DATE,
        },
        survey::{NewSurvey, SatisfactionSurvey, SurveyStatus},
        template::{CreateTemplateRequest, TemplateStatus},
    },
    services::sender_service::survey_prompt,
};

async fn wait_for_campaign(app: &TestApp, id: Uuid) -> Campaign {
    for _ in 0..200 {
        let campaign = app.store.get_campaign(id).await.unwrap().unwrap();
        if campaign.status != CampaignStatus::Sending {
            return campaign;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("campanha {id} não terminou");
}

async fn seed_send(app: &TestApp, name: &str, phone: &str, status: CampaignSendStatus) -> CampaignSend {
    let campaign = app.store.create_campaign("Entregas", "Olá {nome}", 1).await.unwrap();
    app.store
        .insert_campaign_send(NewCampaignSend {
            campaign_id: campaign.id,
            recipient: CampaignRecipient {
                customer_name: name.into(),
                phone: phone.into(),
                driver_name: Some("Carlos".into()),
                order_number: None,
                total_weight: None,
                total_value: None,
                sku_count: None,
            },
            customer_phone: phone.into(),
            status,
            error_message: None,
            sent_at: Some(Utc::now()),
        })
        .await
        .unwrap()
}

async fn seed_survey(app: &TestApp, send: &CampaignSend, status: SurveyStatus) -> SatisfactionSurvey {
    let survey = app
        .store
        .create_survey(NewSurvey {
            campaign_send_id: send.id,
            customer_name: send.customer_name.clone(),
            customer_phone: send.customer_phone.clone(),
            driver_name: send.driver_name.clone(),
        })
        .await
        .unwrap()
        .unwrap();
    if status != SurveyStatus::Pending {
        app.store
            .record_survey_delivery(survey.id, SurveyStatus::Pending, status, None)
            .await
            .unwrap();
    }
    survey
}

#[tokio::test]
async fn campaign_runs_in_background_and_counts_outcomes() {
    let app = test_app();
    app.store.add_to_blacklist("11977776666", None).await.unwrap();

    let body = json!({
        "name": "Rota zona sul",
        "messageTemplate": "Olá {nome}, o pedido {pedido} chega hoje. Responda 1 para confirmar.",
        "recipients": [
            { "customerName": "Ana", "phone": "11999998888", "orderNumber": "PED-1", "driverName": "Carlos" },
            { "customerName": "Bruno", "phone": "123" },
            { "customerName": "Carla", "phone": "(11) 97777-6666" }
        ]
    });
    let (status, created) = call(&app, json_request(Method::POST, "/api/campaigns", Some(body), true)).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(created["status"], "sending");

    let id: Uuid = created["campaignId"].as_str().unwrap().parse().unwrap();
    let campaign = wait_for_campaign(&app, id).await;
    assert_eq!(campaign.status, CampaignStatus::CompletedWithErrors);
    assert_eq!((campaign.sent_count, campaign.failed_count, campaign.blocked_count), (1, 1, 1));
    assert!(campaign.finished_at.is_some());

    let statuses: Vec<_> = app.store.campaign_sends().iter().map(|s| s.status).collect();
    assert_eq!(
        statuses,
        vec![CampaignSendStatus::Success, CampaignSendStatus::Failed, CampaignSendStatus::Blocked]
    );
    assert_eq!(
        app.gateway.sent(),
        vec![Sent::Text {
            number: "5511999998888".into(),
            text: "Olá Ana, o pedido PED-1 chega hoje. Responda 1 para confirmar.".into(),
        }]
    );

    // O envio abriu a conversa, então a resposta do cliente já é reconhecida
    let conversations = app.store.conversations();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].name.as_deref(), Some("Ana"));

    post_webhook(&app, text_event("5511999998888@s.whatsapp.net", "WA-9", "1")).await;
    assert_eq!(app.store.campaign_sends()[0].status, CampaignSendStatus::Confirmed);

    let (status, fetched) = call(&app, json_request(Method::GET, &format!("/api/campaigns/{id}"), None, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "completed_with_errors");
}

#[tokio::test]
async fn campaign_without_failures_completes() {
    let app = test_app();
    let body = json!({
        "name": "Rota única",
        "messageTemplate": "Olá {nome}",
        "recipients": [{ "customerName": "Ana", "phone": "11999998888" }]
    });
    let (_, created) = call(&app, json_request(Method::POST, "/api/campaigns", Some(body), true)).await;
    let id: Uuid = created["campaignId"].as_str().unwrap().parse().unwrap();

    let campaign = wait_for_campaign(&app, id).await;
    assert_eq!(campaign.status, CampaignStatus::Completed);
}

#[tokio::test]
async fn campaign_requires_recipients() {
    let app = test_app();
    let body = json!({ "name": "Vazia", "messageTemplate": "Olá", "recipients": [] });

    let (status, _) = call(&app, json_request(Method::POST, "/api/campaigns", Some(body), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.list_campaigns().await.unwrap().is_empty());
}

#[tokio::test]
async fn survey_batch_reports_new_resent_and_failed() {
    let app = test_app();
    let fresh = seed_send(&app, "Ana", "11911110001", CampaignSendStatus::Success).await;
    let undelivered = seed_send(&app, "Bruno", "11911110002", CampaignSendStatus::Failed).await;
    let retry = seed_send(&app, "Carla", "11911110003", CampaignSendStatus::Confirmed).await;
    let unreachable = seed_send(&app, "Davi", "11911110004", CampaignSendStatus::Success).await;
    let in_progress = seed_send(&app, "Elisa", "11911110005", CampaignSendStatus::Success).await;
    seed_survey(&app, &retry, SurveyStatus::Failed).await;
    seed_survey(&app, &in_progress, SurveyStatus::Sent).await;
    app.gateway.make_unreachable("5511911110004");

    let ids = [fresh.id, undelivered.id, retry.id, unreachable.id, in_progress.id];
    let body = json!({ "campaignSendIds": ids });
    let (status, report) = call(&app, json_request(Method::POST, "/api/surveys/send", Some(body), true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["new_surveys"], 2);
    assert_eq!(report["resent_surveys"], 1);
    assert_eq!(report["surveys_sent"], 2);
    assert_eq!(report["failed_surveys"], 1);

    let status_of = |send_id: Uuid| {
        app.store
            .surveys()
            .into_iter()
            .find(|s| s.campaign_send_id == send_id)
            .map(|s| s.status)
    };
    assert_eq!(status_of(fresh.id), Some(SurveyStatus::Sent));
    assert_eq!(status_of(retry.id), Some(SurveyStatus::Sent));
    assert_eq!(status_of(unreachable.id), Some(SurveyStatus::Failed));
    assert_eq!(status_of(undelivered.id), None);
    assert_eq!(status_of(in_progress.id), Some(SurveyStatus::Sent));

    assert_eq!(
        app.gateway.sent(),
        vec![
            Sent::Text { number: "5511911110001".into(), text: survey_prompt("Ana") },
            Sent::Text { number: "5511911110003".into(), text: survey_prompt("Carla") },
        ]
    );
    // Pesquisas não entram no histórico do chat
    assert!(app.store.messages().is_empty());
}

#[tokio::test]
async fn survey_batch_without_ids_picks_delivered_sends_once() {
    let app = test_app();
    seed_send(&app, "Ana", "11911110001", CampaignSendStatus::Success).await;
    seed_send(&app, "Bruno", "11911110002", CampaignSendStatus::Failed).await;

    let (_, first) = call(&app, json_request(Method::POST, "/api/surveys/send", Some(json!({})), true)).await;
    assert_eq!(first["new_surveys"], 1);
    assert_eq!(first["surveys_sent"], 1);

    let (_, second) = call(&app, json_request(Method::POST, "/api/surveys/send", Some(json!({})), true)).await;
    assert_eq!(second["new_surveys"], 0);
    assert_eq!(second["surveys_sent"], 0);
    assert_eq!(app.store.surveys().len(), 1);
}

#[tokio::test]
async fn blacklisted_customer_survey_is_not_sent() {
    let app = test_app();
    let send = seed_send(&app, "Ana", "11911110001", CampaignSendStatus::Success).await;
    app.store.add_to_blacklist("11911110001", None).await.unwrap();

    let body = json!({ "campaignSendIds": [send.id] });
    let (_, report) = call(&app, json_request(Method::POST, "/api/surveys/send", Some(body), true)).await;
    assert_eq!(report["failed_surveys"], 1);

    let survey = &app.store.surveys()[0];
    assert_eq!(survey.status, SurveyStatus::NotSent);
    assert!(app.gateway.sent().is_empty());
}

#[tokio::test]
async fn official_instance_sends_survey_as_template() {
    let store = MemoryStore::new().with_evolution_config(EvolutionConfigRow {
        id: Uuid::new_v4(),
        config_type: EvolutionConfigType::Official,
        api_url: Some("https://meta.evo.test".into()),
        api_key: Some("chave-oficial".into()),
        instance_name: Some("oficial".into()),
        template_name: Some("pesquisa_satisfacao".into()),
        template_language: Some("pt_BR".into()),
        is_active: true,
        updated_at: None,
    });
    let app = test_app_with(store);
    let send = seed_send(&app, "Ana", "11911110001", CampaignSendStatus::Success).await;

    let body = json!({ "campaignSendIds": [send.id] });
    call(&app, json_request(Method::POST, "/api/surveys/send", Some(body), true)).await;

    assert_eq!(
        app.gateway.sent(),
        vec![Sent::Template {
            number: "5511911110001".into(),
            name: "pesquisa_satisfacao".into(),
            parameters: vec!["Ana".into()],
        }]
    );
    let credentials = app.connector.last_credentials.lock().unwrap().clone().unwrap();
    assert!(credentials.is_official);
    assert_eq!(credentials.instance_name, "oficial");
}

#[tokio::test]
async fn survey_cancel_and_expire() {
    let app = test_app();
    let send = seed_send(&app, "Ana", "11911110001", CampaignSendStatus::Success).await;
    let survey = seed_survey(&app, &send, SurveyStatus::Sent).await;

    let uri = format!("/api/surveys/{}/cancel", survey.id);
    let (status, cancelled) = call(&app, json_request(Method::POST, &uri, None, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, _) = call(&app, json_request(Method::POST, &uri, None, true)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let missing = format!("/api/surveys/{}/cancel", Uuid::new_v4());
    let (status, _) = call(&app, json_request(Method::POST, &missing, None, true)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) =
        call(&app, json_request(Method::POST, "/api/surveys/expire", Some(json!({ "maxAgeHours": 0 })), true)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&app, json_request(Method::POST, "/api/surveys/expire", Some(json!({})), true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expired"], 0);
}

fn order(number: &str, status: &str, phone: Option<&str>, date: (i32, u32, u32)) -> ExternalOrder {
    ExternalOrder {
        order_number: number.into(),
        customer_name: "Ana".into(),
        phone: phone.map(str::to_string),
        status: status.into(),
        order_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        driver_name: Some("Carlos".into()),
    }
}

async fn enable_auto_templates(app: &TestApp) {
    app.store.set_setting(KEY_AUTO_TEMPLATE_ENABLED, "true").await.unwrap();
    app.store.set_setting(KEY_AUTO_TEMPLATE_MIN_DATE, "2024-05-01").await.unwrap();
    let template = app
        .store
        .create_template(CreateTemplateRequest {
            name: "saiu_para_entrega".into(),
            language: "pt_BR".into(),
            category: Some("UTILITY".into()),
            body: "Olá {{1}}, o pedido {{2}} saiu para entrega.".into(),
            variables: vec!["nome".into(), "pedido".into()],
            trigger_status: Some("em_rota".into()),
        })
        .await
        .unwrap();
    app.store.set_template_status(template.id, TemplateStatus::Approved).await.unwrap();
}

#[tokio::test]
async fn auto_templates_send_each_order_status_once() {
    let app = test_app();
    enable_auto_templates(&app).await;
    *app.orders.orders.lock().unwrap() = vec![
        order("O1", "EM_ROTA", Some("11999998888"), (2024, 5, 2)),
        order("O2", "em_rota", Some("11999997777"), (2024, 4, 1)),
        order("O3", "entregue", Some("11999996666"), (2024, 5, 3)),
        order("O4", "em_rota", None, (2024, 5, 3)),
    ];

    let (status, first) = call(&app, json_request(Method::POST, "/api/auto-templates/run", None, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["report"], json!({ "checked": 4, "sent": 1, "skipped": 3, "failed": 0 }));

    let (_, second) = call(&app, json_request(Method::POST, "/api/auto-templates/run", None, true)).await;
    assert_eq!(second["report"], json!({ "checked": 4, "sent": 0, "skipped": 4, "failed": 0 }));

    assert_eq!(
        app.gateway.sent(),
        vec![Sent::Template {
            number: "5511999998888".into(),
            name: "saiu_para_entrega".into(),
            parameters: vec!["Ana".into(), "O1".into()],
        }]
    );
    let ledger = app.store.automatic_sends();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].trigger_status, "em_rota");
    assert!(app.store.get_setting(KEY_AUTO_TEMPLATE_LAST_RUN).await.unwrap().is_some());

    // O envio aparece no chat do cliente
    assert_eq!(app.store.messages()[0].content, "[Template: saiu_para_entrega]");
}

#[tokio::test]
async fn auto_templates_disabled_is_a_no_op() {
    let app = test_app();
    *app.orders.orders.lock().unwrap() = vec![order("O1", "em_rota", Some("11999998888"), (2024, 5, 2))];

    let (status, body) = call(&app, json_request(Method::POST, "/api/auto-templates/run", None, true)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skipped"], true);
    assert!(app.gateway.sent().is_empty());
    assert!(app.store.get_setting(KEY_AUTO_TEMPLATE_LAST_RUN).await.unwrap().is_none());
}
