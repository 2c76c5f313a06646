// src/models/status.rs

use std::fmt::Display;

use crate::common::error::AppError;

/// Máquina de estados de uma coluna `status`. Cada entidade declara as
/// transições permitidas em um único lugar (`allows`).
pub trait StatusMachine: Copy + PartialEq + Display {
    const ENTITY: &'static str;

    fn allows(self, next: Self) -> bool;

    fn transition(self, next: Self) -> Result<Self, AppError> {
        if self.allows(next) {
            Ok(next)
        } else {
            Err(AppError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

// Gera `as_str` + `Display` a partir da mesma tabela de nomes usada no banco
macro_rules! status_names {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use status_names;
