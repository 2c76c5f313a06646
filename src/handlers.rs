// src/handlers.rs

pub mod webhook;
pub mod whatsapp;
pub mod campaigns;
pub mod surveys;
pub mod auto_templates;
pub mod conversations;
pub mod blacklist;
pub mod templates;
pub mod analytics;
