// src/common/retry.rs

use std::{fmt::Display, future::Future, time::Duration};

// Registros de controle (linhas de envio) ganham até 2 novas tentativas.
pub const BOOKKEEPING_RETRIES: u32 = 2;
pub const BOOKKEEPING_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Executa `op` e, em caso de erro, tenta de novo até `retries` vezes com espera fixa.
/// Usado só para gravações de controle, nunca para o envio em si.
pub async fn with_retry<T, E, F, Fut>(
    label: &str,
    retries: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                tracing::warn!(label, attempt, error = %e, "⚠️ Falha ao gravar, tentando novamente");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
