// src/clients/evolution.rs

// Cliente REST da Evolution API (instância QR ou integração oficial da Meta)

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};

use super::{
    DownloadedMedia, GatewayConnector, GatewayReceipt, OutboundMedia, SendError, TemplateMessage,
    WhatsAppGateway,
};
use crate::{models::conversation::MediaKind, services::credentials::EvolutionCredentials};

#[derive(Clone)]
pub struct EvolutionClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    instance_name: String,
}

impl EvolutionClient {
    pub fn new(http: reqwest::Client, credentials: &EvolutionCredentials) -> Self {
        Self {
            http,
            api_url: credentials.api_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            instance_name: credentials.instance_name.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.api_url, path, self.instance_name)
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value, SendError> {
        let url = self.endpoint(path);

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            tracing::warn!(%status, path, body = %truncate(&text, 300), "⚠️ Gateway recusou a requisição");
            return Err(interpret_failure(status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::Null))
    }
}

#[async_trait]
impl WhatsAppGateway for EvolutionClient {
    async fn send_text(&self, number: &str, text: &str) -> Result<GatewayReceipt, SendError> {
        let body = json!({ "number": number, "text": text });
        let resp = self.post("message/sendText", body).await?;
        Ok(receipt_from(&resp))
    }

    async fn send_media(&self, number: &str, media: &OutboundMedia) -> Result<GatewayReceipt, SendError> {
        // Áudio usa endpoint próprio para chegar como mensagem de voz
        let resp = match media.kind {
            MediaKind::Audio => {
                let body = json!({ "number": number, "audio": media.url });
                self.post("message/sendWhatsAppAudio", body).await?
            }
            MediaKind::Sticker => {
                let body = json!({ "number": number, "sticker": media.url });
                self.post("message/sendSticker", body).await?
            }
            kind => {
                let mut body = json!({
                    "number": number,
                    "mediatype": kind.as_str(),
                    "media": media.url,
                });
                if let Some(file_name) = &media.file_name {
                    body["fileName"] = json!(file_name);
                }
                if let Some(caption) = &media.caption {
                    body["caption"] = json!(caption);
                }
                self.post("message/sendMedia", body).await?
            }
        };
        Ok(receipt_from(&resp))
    }

    async fn send_template(&self, number: &str, template: &TemplateMessage) -> Result<GatewayReceipt, SendError> {
        let parameters: Vec<Value> = template
            .parameters
            .iter()
            .map(|p| json!({ "type": "text", "text": p }))
            .collect();

        let mut components = Vec::new();
        if !parameters.is_empty() {
            components.push(json!({ "type": "body", "parameters": parameters }));
        }

        let body = json!({
            "number": number,
            "name": template.name,
            "language": template.language,
            "components": components,
        });
        let resp = self.post("message/sendTemplate", body).await?;
        Ok(receipt_from(&resp))
    }

    async fn fetch_media(&self, message_id: &str) -> Result<DownloadedMedia, SendError> {
        let body = json!({ "message": { "key": { "id": message_id } }, "convertToMp4": false });
        let resp = self.post("chat/getBase64FromMediaMessage", body).await?;

        let encoded = resp["base64"]
            .as_str()
            .ok_or_else(|| SendError::Gateway("resposta sem base64".to_string()))?;

        // Algumas versões devolvem "data:<mime>;base64,<dados>"
        let encoded = encoded.split_once("base64,").map(|(_, data)| data).unwrap_or(encoded);
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SendError::Gateway(format!("base64 inválido: {}", e)))?;

        Ok(DownloadedMedia {
            bytes,
            mimetype: resp["mimetype"].as_str().map(str::to_string),
        })
    }
}

/// Conector padrão: um `reqwest::Client` compartilhado entre requisições.
#[derive(Clone)]
pub struct EvolutionConnector {
    http: reqwest::Client,
}

impl EvolutionConnector {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl GatewayConnector for EvolutionConnector {
    fn connect(&self, credentials: &EvolutionCredentials) -> Arc<dyn WhatsAppGateway> {
        Arc::new(EvolutionClient::new(self.http.clone(), credentials))
    }
}

fn receipt_from(resp: &Value) -> GatewayReceipt {
    GatewayReceipt {
        message_id: resp["key"]["id"].as_str().map(str::to_string),
    }
}

fn map_transport_error(e: reqwest::Error) -> SendError {
    if e.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Gateway(e.to_string())
    }
}

/// Traduz uma resposta não-2xx do gateway em um motivo tipado.
pub fn interpret_failure(status: u16, body: &str) -> SendError {
    let lower = body.to_lowercase();
    let compact: String = lower.chars().filter(|c| !c.is_whitespace()).collect();

    if compact.contains("\"exists\":false")
        || lower.contains("not on whatsapp")
        || lower.contains("not a whatsapp")
        || lower.contains("não está no whatsapp")
    {
        SendError::NumberNotOnWhatsApp
    } else if lower.contains("mediatype") {
        SendError::InvalidMediaType
    } else if lower.contains("timed out") || status == 504 || status == 408 {
        SendError::Timeout
    } else {
        SendError::Gateway(format!("HTTP {}: {}", status, truncate(body, 200)))
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_numbers_outside_whatsapp() {
        let body = r#"{"status":400,"response":{"message":[{"exists": false,"jid":"5511@s.whatsapp.net"}]}}"#;
        assert_eq!(interpret_failure(400, body), SendError::NumberNotOnWhatsApp);
    }

    #[test]
    fn recognizes_media_type_and_timeouts() {
        let body = r#"{"response":{"message":["mediatype must be one of image, document, video"]}}"#;
        assert_eq!(interpret_failure(400, body), SendError::InvalidMediaType);
        assert_eq!(interpret_failure(500, "Request Timed Out"), SendError::Timeout);
        assert_eq!(interpret_failure(504, ""), SendError::Timeout);
    }

    #[test]
    fn passes_other_errors_through() {
        let err = interpret_failure(401, "Unauthorized");
        assert_eq!(err, SendError::Gateway("HTTP 401: Unauthorized".into()));
        assert_eq!(err.code(), "gateway_error");
    }

    #[test]
    fn builds_instance_endpoints() {
        let credentials = EvolutionCredentials {
            api_url: "https://evo.example.com/".into(),
            api_key: "k".into(),
            instance_name: "entregas".into(),
            is_official: false,
            template_name: None,
            template_language: None,
        };
        let client = EvolutionClient::new(reqwest::Client::new(), &credentials);
        assert_eq!(
            client.endpoint("message/sendText"),
            "https://evo.example.com/message/sendText/entregas"
        );
    }

    #[test]
    fn extracts_message_id_from_receipt() {
        let resp = json!({ "key": { "id": "3EB0" }, "status": "PENDING" });
        assert_eq!(receipt_from(&resp).message_id.as_deref(), Some("3EB0"));
        assert_eq!(receipt_from(&Value::Null), GatewayReceipt::default());
    }
}
