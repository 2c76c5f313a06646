// src/models.rs

pub mod status;

pub mod blacklist;
pub mod campaign;
pub mod conversation;
pub mod dashboard;
pub mod order;
pub mod settings;
pub mod survey;
pub mod template;
pub mod webhook;
