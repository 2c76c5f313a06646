// src/services/template_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::Store,
    models::{
        status::StatusMachine,
        template::{CreateTemplateRequest, TemplateStatus, WhatsAppTemplate},
    },
};

// Todo template nasce pendente até a Meta aprovar
pub async fn create(store: &dyn Store, request: CreateTemplateRequest) -> Result<WhatsAppTemplate, AppError> {
    request.validate()?;
    let template = store.create_template(request).await?;
    tracing::info!(template = %template.name, language = %template.language, "Template cadastrado");
    Ok(template)
}

pub async fn change_status(store: &dyn Store, id: Uuid, to: TemplateStatus) -> Result<WhatsAppTemplate, AppError> {
    let template = store
        .get_template(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("template {}", id)))?;

    let next = template.status.transition(to)?;
    store.set_template_status(id, next).await?;
    Ok(WhatsAppTemplate { status: next, ..template })
}
