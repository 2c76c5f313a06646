// src/common.rs

pub mod error;
pub mod phone;
pub mod retry;
pub mod side_effect;
