// src/services.rs

pub mod credentials;
pub mod sender_service;

pub mod webhook_parser;
pub mod webhook_service;

pub mod campaign_service;
pub mod survey_service;
pub mod auto_template_service;

pub mod conversation_service;
pub mod template_service;
