// src/clients/storage.rs

use async_trait::async_trait;

use super::MediaStorage;
use crate::common::error::AppError;

/// Supabase Storage: `POST /storage/v1/object/{bucket}/{path}` com a service role key.
#[derive(Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(http: reqwest::Client, base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }
}

#[async_trait]
impl MediaStorage for SupabaseStorage {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, AppError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!("Storage respondeu {}: {}", status, text)));
        }

        Ok(self.public_url(path))
    }
}

/// Usado quando SUPABASE_URL não está configurada: a mídia fica com a URL original.
pub struct DisabledStorage;

#[async_trait]
impl MediaStorage for DisabledStorage {
    async fn upload(&self, _path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<String, AppError> {
        Err(AppError::Configuration("SUPABASE_URL/SUPABASE_SERVICE_ROLE_KEY".to_string()))
    }
}
