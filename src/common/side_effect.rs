// src/common/side_effect.rs

use std::fmt::Display;

/// Resultado de um efeito colateral não crítico (resposta automática, reenvio
/// de mídia). A falha é registrada no log na construção e nunca volta a ser erro.
#[derive(Debug)]
#[must_use]
pub enum BestEffort<T> {
    Done(T),
    Failed(String),
}

impl<T> BestEffort<T> {
    pub fn from_result<E: Display>(what: &str, result: Result<T, E>) -> Self {
        match result {
            Ok(value) => BestEffort::Done(value),
            Err(e) => {
                tracing::warn!(what, error = %e, "⚠️ Efeito colateral falhou (ignorado)");
                BestEffort::Failed(e.to_string())
            }
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            BestEffort::Done(value) => Some(value),
            BestEffort::Failed(_) => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, BestEffort::Done(_))
    }
}
